//! Scenario files describing a complete run.

use std::{
    collections::{BTreeMap, BTreeSet},
    num::NonZeroU32,
    time::Duration,
};

use horde_core::{
    ConfigurationError, EntityStats, EntityTemplate, EntityTypeDescriptor, EntityTypeId,
    SpawnArea, WaveIndex, DEFAULT_TYPE_CAP,
};
use horde_system_spawning::{SpawnAreaSet, SpawnPacing};
use horde_system_waves::{OrchestratorConfig, WaveSizing};
use serde::Deserialize;

/// Catalog type used by the command-line adapter.
pub(crate) type Catalog = BTreeMap<EntityTypeId, EntityTemplate>;

/// Problems detected while reading a scenario.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ScenarioError {
    /// The file is not valid TOML or does not match the expected layout.
    #[error("could not parse scenario: {0}")]
    Parse(#[from] toml::de::Error),
    /// An entity declares a cap of zero.
    #[error("{0} declares a cap of zero")]
    ZeroCap(EntityTypeId),
    /// Two entities share a type identifier.
    #[error("{0} is declared more than once")]
    DuplicateEntityType(EntityTypeId),
    /// The player cannot take part in the attrition model.
    #[error("player health and damage must be positive and finite")]
    InvalidPlayer,
    /// The orchestrator configuration is unusable.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Parsed and validated scenario.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub(crate) struct Scenario {
    #[serde(default)]
    pub(crate) seed: u64,
    #[serde(default)]
    pub(crate) final_wave: Option<u32>,
    #[serde(default)]
    pub(crate) pacing: PacingSection,
    #[serde(default)]
    pub(crate) sizing: WaveSizing,
    #[serde(default)]
    pub(crate) player: PlayerSection,
    #[serde(default)]
    pub(crate) areas: Vec<SpawnArea>,
    #[serde(default)]
    pub(crate) entities: Vec<EntitySection>,
}

/// Suspensions of the spawn runs, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct PacingSection {
    pub(crate) spawn_interval_ms: u64,
    pub(crate) start_delay_ms: u64,
}

impl Default for PacingSection {
    fn default() -> Self {
        let pacing = SpawnPacing::default();
        Self {
            spawn_interval_ms: duration_ms(pacing.spawn_interval()),
            start_delay_ms: duration_ms(pacing.start_delay()),
        }
    }
}

/// Player used by the attrition model.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct PlayerSection {
    pub(crate) max_hp: f32,
    pub(crate) damage_per_second: f32,
}

impl Default for PlayerSection {
    fn default() -> Self {
        Self {
            max_hp: 100.0,
            damage_per_second: 30.0,
        }
    }
}

/// Entity type declaration. Statistics not listed default to zero.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub(crate) struct EntitySection {
    pub(crate) type_id: u32,
    #[serde(default = "default_cap")]
    pub(crate) cap: u32,
    #[serde(flatten)]
    pub(crate) stats: EntityStats,
}

fn default_cap() -> u32 {
    DEFAULT_TYPE_CAP.get()
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Scenario {
    /// Parses and validates a scenario from TOML text.
    pub(crate) fn from_toml_str(contents: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = toml::from_str(contents)?;
        scenario.validate()?;
        Ok(scenario)
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        self.spawn_areas().validate()?;
        if self.entities.is_empty() {
            return Err(ConfigurationError::NoEntityTypes.into());
        }

        let mut seen = BTreeSet::new();
        for entity in &self.entities {
            let type_id = EntityTypeId::new(entity.type_id);
            if entity.cap == 0 {
                return Err(ScenarioError::ZeroCap(type_id));
            }
            if !seen.insert(type_id) {
                return Err(ScenarioError::DuplicateEntityType(type_id));
            }
        }

        let player = self.player;
        let positive = |value: f32| value.is_finite() && value > 0.0;
        if !positive(player.max_hp) || !positive(player.damage_per_second) {
            return Err(ScenarioError::InvalidPlayer);
        }
        Ok(())
    }

    /// Spawn regions in declaration order.
    pub(crate) fn spawn_areas(&self) -> SpawnAreaSet {
        SpawnAreaSet::new(self.areas.clone())
    }

    /// Pacing applied by every spawn run.
    pub(crate) fn spawn_pacing(&self) -> SpawnPacing {
        SpawnPacing::new(
            Duration::from_millis(self.pacing.spawn_interval_ms),
            Duration::from_millis(self.pacing.start_delay_ms),
        )
    }

    /// Templates keyed by type.
    pub(crate) fn catalog(&self) -> Catalog {
        self.templates()
            .map(|template| (template.type_id(), template))
            .collect()
    }

    /// Orchestrator configuration; types spawn in declaration order.
    pub(crate) fn orchestrator_config(&self, seed: u64) -> OrchestratorConfig {
        OrchestratorConfig {
            areas: self.spawn_areas(),
            spawn_order: self
                .entities
                .iter()
                .map(|entity| EntityTypeId::new(entity.type_id))
                .collect(),
            pacing: self.spawn_pacing(),
            seed,
        }
    }

    /// Wave after which the run ends victorious.
    pub(crate) fn final_wave(&self) -> Option<WaveIndex> {
        self.final_wave.map(WaveIndex::new)
    }

    /// Largest number of entities the caps admit at once.
    pub(crate) fn total_cap(&self) -> u64 {
        self.entities.iter().map(|entity| u64::from(entity.cap)).sum()
    }

    fn templates(&self) -> impl Iterator<Item = EntityTemplate> + '_ {
        self.entities.iter().filter_map(|entity| {
            let cap = NonZeroU32::new(entity.cap)?;
            let descriptor = EntityTypeDescriptor::new(EntityTypeId::new(entity.type_id), cap);
            Some(EntityTemplate::new(descriptor, entity.stats.clone()))
        })
    }
}

#[cfg(test)]
mod tests {
    use horde_core::EntityCatalog;
    use horde_system_waves::WaveSizePolicy;

    use super::*;

    const MINIMAL: &str = r#"
        [[areas]]
        x_min = 0.0
        x_max = 1.0
        y_min = 0.0
        y_max = 1.0

        [[entities]]
        type_id = 3
    "#;

    #[test]
    fn bundled_scenario_is_valid() {
        let scenario = Scenario::from_toml_str(include_str!("../scenarios/default.toml"))
            .expect("bundled scenario parses");

        assert_eq!(scenario.seed, 7);
        assert_eq!(scenario.final_wave(), Some(WaveIndex::new(5)));
        assert_eq!(scenario.areas.len(), 2);
        assert_eq!(
            scenario.sizing,
            WaveSizing::Linear {
                base: 10,
                increment: 2
            }
        );

        let catalog = scenario.catalog();
        let red = catalog.describe(EntityTypeId::new(1)).expect("red slime");
        assert_eq!(red.stats.name, "Red Slime");
        assert_eq!(red.descriptor.cap(), 4);
        assert_eq!(red.stats.drop_items, vec![20_000]);
    }

    #[test]
    fn omitted_sections_use_defaults() {
        let scenario = Scenario::from_toml_str(MINIMAL).expect("minimal scenario parses");

        assert_eq!(scenario.spawn_pacing(), SpawnPacing::default());
        assert_eq!(scenario.sizing, WaveSizing::default());
        assert_eq!(scenario.sizing.target(WaveIndex::new(4)), 10);
        assert_eq!(scenario.entities[0].cap, DEFAULT_TYPE_CAP.get());
        assert_eq!(scenario.entities[0].stats, EntityStats::default());
        assert_eq!(scenario.final_wave(), None);
    }

    #[test]
    fn tiered_sizing_is_selected_by_policy_key() {
        let contents = format!("{MINIMAL}\n[sizing]\npolicy = \"tiered\"\ntier_size = 3\n");
        let scenario = Scenario::from_toml_str(&contents).expect("scenario parses");

        assert_eq!(scenario.sizing.target(WaveIndex::new(7)), 3);
    }

    #[test]
    fn missing_areas_are_rejected() {
        let error = Scenario::from_toml_str("[[entities]]\ntype_id = 0\n").expect_err("no areas");
        assert!(matches!(
            error,
            ScenarioError::Configuration(ConfigurationError::NoSpawnAreas)
        ));
    }

    #[test]
    fn inverted_area_is_reported_with_its_index() {
        let contents = format!("{MINIMAL}\n[[areas]]\nx_min = 4.0\nx_max = 1.0\ny_min = 0.0\ny_max = 1.0\n");
        let error = Scenario::from_toml_str(&contents).expect_err("inverted bounds");
        assert!(matches!(
            error,
            ScenarioError::Configuration(ConfigurationError::MalformedSpawnArea { index: 1 })
        ));
    }

    #[test]
    fn zero_cap_and_duplicate_types_are_rejected() {
        let zero = format!("{MINIMAL}\n[[entities]]\ntype_id = 4\ncap = 0\n");
        assert!(matches!(
            Scenario::from_toml_str(&zero),
            Err(ScenarioError::ZeroCap(type_id)) if type_id == EntityTypeId::new(4)
        ));

        let duplicate = format!("{MINIMAL}\n[[entities]]\ntype_id = 3\n");
        assert!(matches!(
            Scenario::from_toml_str(&duplicate),
            Err(ScenarioError::DuplicateEntityType(type_id)) if type_id == EntityTypeId::new(3)
        ));
    }

    #[test]
    fn unknown_sizing_policy_is_a_parse_error() {
        let contents = format!("{MINIMAL}\n[sizing]\npolicy = \"exponential\"\n");
        assert!(matches!(
            Scenario::from_toml_str(&contents),
            Err(ScenarioError::Parse(_))
        ));
    }
}
