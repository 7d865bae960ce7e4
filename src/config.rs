//! Construction parameters for `ProbingHashMap`.

use crate::error::{MapError, Result};

/// Capacity requested by `ProbingHashMap::new` and `clear`. The table rounds
/// it up to the next prime, so a default map has 17 slots.
pub const DEFAULT_CAPACITY: usize = 16;

/// Growth threshold used when none is given.
pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;

/// Initial slot count and growth threshold of a probing hash map.
///
/// The table grows once the number of live entries exceeds
/// `load_factor * capacity`. Values above `1.0` are accepted; the table then
/// grows only when a probe run finds no free slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HashMapConfig {
    pub initial_capacity: usize,
    pub load_factor: f32,
}

impl Default for HashMapConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_CAPACITY,
            load_factor: DEFAULT_LOAD_FACTOR,
        }
    }
}

impl HashMapConfig {
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    pub fn with_load_factor(mut self, load_factor: f32) -> Self {
        self.load_factor = load_factor;
        self
    }

    /// Rejects zero, negative, NaN, infinite and subnormal load factors.
    pub fn validate(&self) -> Result<()> {
        let lf = self.load_factor;
        if !lf.is_normal() || lf < 0.0 {
            return Err(MapError::invalid(
                "load_factor",
                format!("must be a positive, finite, normal number, got {lf}"),
            ));
        }
        Ok(())
    }

    /// Live-entry count above which the table must grow.
    pub(crate) fn threshold(&self, capacity: usize) -> f64 {
        f64::from(self.load_factor) * capacity as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_constants() {
        let c = HashMapConfig::default();
        assert_eq!(c.initial_capacity, 16);
        assert_eq!(c.load_factor, 0.75);
        assert!(c.validate().is_ok());
    }

    /// Invariant: only positive normal load factors validate.
    #[test]
    fn rejects_non_positive_and_degenerate_load_factors() {
        for lf in [0.0, -0.0, -1.0, f32::NAN, f32::INFINITY, f32::MIN_POSITIVE / 2.0] {
            let c = HashMapConfig::default().with_load_factor(lf);
            match c.validate() {
                Err(MapError::InvalidArgument { name, .. }) => assert_eq!(name, "load_factor"),
                Ok(()) => panic!("load factor {lf} must be rejected"),
            }
        }
        for lf in [0.1, 0.5, 1.0, 4.0] {
            assert!(HashMapConfig::default().with_load_factor(lf).validate().is_ok());
        }
    }

    #[test]
    fn threshold_scales_with_capacity() {
        let c = HashMapConfig::default().with_load_factor(0.5);
        assert_eq!(c.threshold(16), 8.0);
        assert_eq!(c.threshold(0), 0.0);
    }
}
