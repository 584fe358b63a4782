//! Arena sizing configuration.

use serde::{Deserialize, Serialize};

use crate::error::{ArenaError, ArenaResult};

/// How an owned arena behaves once its initial capacity is used up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthPolicy {
    /// Never grow; allocations past the initial capacity fail.
    #[default]
    Fixed,
    /// Grow in place inside a reservation of `max_capacity` bytes.
    InPlace,
}

/// Arena configuration, loadable from TOML.
///
/// ```toml
/// initial_capacity = 1048576
/// max_capacity = 67108864
/// growth = "in_place"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Bytes available right after construction.
    pub initial_capacity: usize,
    /// Upper bound for in-place growth.
    pub max_capacity: usize,
    pub growth: GrowthPolicy,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 1024 * 1024,
            max_capacity: 64 * 1024 * 1024,
            growth: GrowthPolicy::Fixed,
        }
    }
}

impl ArenaConfig {
    pub fn fixed(capacity: usize) -> Self {
        Self {
            initial_capacity: capacity,
            max_capacity: capacity,
            growth: GrowthPolicy::Fixed,
        }
    }

    pub fn in_place(initial_capacity: usize, max_capacity: usize) -> Self {
        Self {
            initial_capacity,
            max_capacity,
            growth: GrowthPolicy::InPlace,
        }
    }

    /// Parse from TOML, applying defaults for missing keys.
    pub fn from_toml_str(s: &str) -> ArenaResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| ArenaError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> ArenaResult<String> {
        toml::to_string(self).map_err(|e| ArenaError::Config(e.to_string()))
    }

    pub fn validate(&self) -> ArenaResult<()> {
        if self.growth == GrowthPolicy::InPlace && self.max_capacity < self.initial_capacity {
            return Err(ArenaError::Config(format!(
                "max_capacity ({}) is below initial_capacity ({})",
                self.max_capacity, self.initial_capacity
            )));
        }
        Ok(())
    }

    /// Bytes the arena's reservation must cover.
    pub fn reservation(&self) -> usize {
        match self.growth {
            GrowthPolicy::Fixed => self.initial_capacity,
            GrowthPolicy::InPlace => self.max_capacity,
        }
    }
}
