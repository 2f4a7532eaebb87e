//! Rectangular spawn regions.

use horde_core::{ConfigurationError, SpawnArea, SpawnPoint};
use rand::Rng;

/// Ordered collection of rectangles that spawn positions are drawn from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpawnAreaSet {
    areas: Vec<SpawnArea>,
}

impl SpawnAreaSet {
    /// Creates a set from the provided rectangles.
    ///
    /// The set may be empty; [`SpawnAreaSet::validate`] reports that case
    /// when a wave is about to start.
    #[must_use]
    pub fn new(areas: Vec<SpawnArea>) -> Self {
        Self { areas }
    }

    /// Rectangles in configured order.
    #[must_use]
    pub fn areas(&self) -> &[SpawnArea] {
        &self.areas
    }

    /// Reports whether the set holds no rectangles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// Checks that the set can be sampled from.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.areas.is_empty() {
            return Err(ConfigurationError::NoSpawnAreas);
        }
        match self.areas.iter().position(|area| !area.is_well_formed()) {
            Some(index) => Err(ConfigurationError::MalformedSpawnArea { index }),
            None => Ok(()),
        }
    }

    /// Picks a rectangle uniformly, then a point uniformly inside it.
    ///
    /// Fails for an empty set or when the picked rectangle is malformed.
    pub fn sample<R>(&self, rng: &mut R) -> Result<SpawnPoint, ConfigurationError>
    where
        R: Rng + ?Sized,
    {
        if self.areas.is_empty() {
            return Err(ConfigurationError::NoSpawnAreas);
        }
        let index = rng.gen_range(0..self.areas.len());
        let area = self.areas[index];
        if !area.is_well_formed() {
            return Err(ConfigurationError::MalformedSpawnArea { index });
        }
        let x = rng.gen_range(area.x_min()..=area.x_max());
        let y = rng.gen_range(area.y_min()..=area.y_max());
        Ok(SpawnPoint::new(x, y))
    }
}
