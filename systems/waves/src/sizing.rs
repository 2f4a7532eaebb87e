//! Wave sizing policies.

use std::num::NonZeroU32;

use horde_core::WaveIndex;
use serde::{Deserialize, Serialize};

/// Computes the aggregate spawn budget of a wave.
///
/// A result of zero or less marks the wave as empty.
pub trait WaveSizePolicy {
    /// Budget for the provided wave.
    fn target(&self, wave: WaveIndex) -> i64;
}

/// Built-in sizing policies selectable from configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum WaveSizing {
    /// `max(1, base + increment * (wave - 1))`.
    Linear {
        /// Budget of the first wave.
        base: i64,
        /// Budget added by every later wave.
        increment: i64,
    },
    /// `1 + wave / tier_size`: one more entity every `tier_size` waves.
    Tiered {
        /// Number of waves sharing a tier.
        tier_size: NonZeroU32,
    },
}

impl Default for WaveSizing {
    fn default() -> Self {
        Self::Linear {
            base: 10,
            increment: 0,
        }
    }
}

impl WaveSizePolicy for WaveSizing {
    fn target(&self, wave: WaveIndex) -> i64 {
        let index = i64::from(wave.get());
        match *self {
            Self::Linear { base, increment } => {
                let growth = increment.saturating_mul(index - 1);
                base.saturating_add(growth).max(1)
            }
            Self::Tiered { tier_size } => 1 + index / i64::from(tier_size.get()),
        }
    }
}
