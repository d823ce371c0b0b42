//! Configuration for the intersection engine.
//!
//! All durations are carried in milliseconds to match the `now_ms`
//! timestamps used throughout the crate. Validation is eager: the engine
//! refuses to construct from a config that fails [`Config::validate`].
//!
//! # Example
//!
//! ```rust
//! use junction::config::{Config, TimingConfig, DensityConfig};
//!
//! // Use defaults
//! let config = Config::default();
//! assert!(config.validate().is_ok());
//!
//! // Or customize
//! let config = Config::default()
//!     .with_lanes(6)
//!     .with_timing(TimingConfig::default().with_min_green_ms(8_000))
//!     .with_density(DensityConfig::default().with_history_size(60));
//! assert!(config.validate().is_ok());
//! ```

use core::fmt;

// ============================================================================
// Errors
// ============================================================================

/// Reasons a configuration is rejected at engine construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConfigError {
    /// `lanes` is zero; an intersection needs at least one approach.
    NoLanes,
    /// A duration field that must be positive is zero.
    ZeroDuration(&'static str),
    /// `min_green_ms` exceeds `max_green_ms`.
    MinGreenExceedsMax {
        /// Configured minimum green in milliseconds
        min_ms: u64,
        /// Configured maximum green in milliseconds
        max_ms: u64,
    },
    /// Density thresholds are not strictly increasing (low < medium < high).
    UnorderedThresholds,
    /// `history_size` is zero; the density buffer must hold at least one sample.
    ZeroHistory,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoLanes => write!(f, "lane count must be at least 1"),
            ConfigError::ZeroDuration(field) => write!(f, "{} must be greater than zero", field),
            ConfigError::MinGreenExceedsMax { min_ms, max_ms } => write!(
                f,
                "min_green_ms ({}) exceeds max_green_ms ({})",
                min_ms, max_ms
            ),
            ConfigError::UnorderedThresholds => {
                write!(f, "density thresholds must satisfy low < medium < high")
            }
            ConfigError::ZeroHistory => write!(f, "history_size must be at least 1"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Main Config
// ============================================================================

/// Complete engine configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Number of approach lanes (lane ids are `0..lanes`)
    pub lanes: usize,
    /// Phase timing configuration
    pub timing: TimingConfig,
    /// Density tracking and congestion classification
    pub density: DensityConfig,
    /// Override (preemption) behavior
    pub overrides: OverrideConfig,
}

impl Config {
    /// Set the number of lanes
    pub fn with_lanes(mut self, lanes: usize) -> Self {
        self.lanes = lanes;
        self
    }

    /// Set timing configuration
    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Set density configuration
    pub fn with_density(mut self, density: DensityConfig) -> Self {
        self.density = density;
        self
    }

    /// Set override configuration
    pub fn with_overrides(mut self, overrides: OverrideConfig) -> Self {
        self.overrides = overrides;
        self
    }

    /// Check the configuration for internal consistency.
    ///
    /// Called by `IntersectionEngine::new`; a failed validation is fatal,
    /// there is no partial or degraded construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lanes == 0 {
            return Err(ConfigError::NoLanes);
        }
        if self.timing.min_green_ms == 0 {
            return Err(ConfigError::ZeroDuration("min_green_ms"));
        }
        if self.timing.yellow_ms == 0 {
            return Err(ConfigError::ZeroDuration("yellow_ms"));
        }
        if self.timing.all_red_ms == 0 {
            return Err(ConfigError::ZeroDuration("all_red_ms"));
        }
        if self.timing.min_green_ms > self.timing.max_green_ms {
            return Err(ConfigError::MinGreenExceedsMax {
                min_ms: self.timing.min_green_ms,
                max_ms: self.timing.max_green_ms,
            });
        }
        if self.overrides.priority_duration_ms == 0 {
            return Err(ConfigError::ZeroDuration("priority_duration_ms"));
        }
        let t = &self.density.thresholds;
        if !(t.low < t.medium && t.medium < t.high) {
            return Err(ConfigError::UnorderedThresholds);
        }
        if self.density.history_size == 0 {
            return Err(ConfigError::ZeroHistory);
        }
        Ok(())
    }
}

// ============================================================================
// Timing Config
// ============================================================================

/// Phase timing configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimingConfig {
    /// Shortest green phase the policy may grant
    pub min_green_ms: u64,
    /// Longest green phase the policy may grant
    pub max_green_ms: u64,
    /// Baseline green used when resolving transit overrides
    pub default_green_ms: u64,
    /// Fixed yellow phase duration
    pub yellow_ms: u64,
    /// Fixed all-red clearance interval between cycles
    pub all_red_ms: u64,
    /// Whether green times adapt to measured density
    pub adaptive: bool,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            min_green_ms: 10_000,
            max_green_ms: 60_000,
            default_green_ms: 30_000,
            yellow_ms: 3_000,
            all_red_ms: 2_000,
            adaptive: true,
        }
    }
}

impl TimingConfig {
    /// Set the minimum green duration
    pub fn with_min_green_ms(mut self, ms: u64) -> Self {
        self.min_green_ms = ms;
        self
    }

    /// Set the maximum green duration
    pub fn with_max_green_ms(mut self, ms: u64) -> Self {
        self.max_green_ms = ms;
        self
    }

    /// Set the baseline green duration
    pub fn with_default_green_ms(mut self, ms: u64) -> Self {
        self.default_green_ms = ms;
        self
    }

    /// Set the yellow duration
    pub fn with_yellow_ms(mut self, ms: u64) -> Self {
        self.yellow_ms = ms;
        self
    }

    /// Set the all-red clearance interval
    pub fn with_all_red_ms(mut self, ms: u64) -> Self {
        self.all_red_ms = ms;
        self
    }

    /// Enable or disable adaptive green timing
    pub fn with_adaptive(mut self, adaptive: bool) -> Self {
        self.adaptive = adaptive;
        self
    }
}

// ============================================================================
// Density Config
// ============================================================================

/// Vehicle-count thresholds separating congestion bands.
///
/// A current count below `low` is free-flowing, below `medium` is light
/// congestion, below `high` is moderate, and anything at or above `high`
/// is heavy.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Thresholds {
    /// Upper bound of the free-flowing band
    pub low: f32,
    /// Upper bound of the light-congestion band
    pub medium: f32,
    /// Lower bound of the heavy-congestion band
    pub high: f32,
}

/// Green-time multipliers applied per congestion band.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Multipliers {
    /// Applied below the medium threshold
    pub low: f32,
    /// Applied between the medium and high thresholds
    pub medium: f32,
    /// Applied at or above the high threshold
    pub high: f32,
}

/// Density tracking configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DensityConfig {
    /// Samples retained per lane (oldest evicted first)
    pub history_size: usize,
    /// Congestion band boundaries
    pub thresholds: Thresholds,
    /// Green-time multipliers per band
    pub multipliers: Multipliers,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            history_size: 30,
            thresholds: Thresholds {
                low: 5.0,
                medium: 15.0,
                high: 30.0,
            },
            multipliers: Multipliers {
                low: 1.0,
                medium: 1.5,
                high: 2.0,
            },
        }
    }
}

impl DensityConfig {
    /// Set the per-lane history capacity
    pub fn with_history_size(mut self, size: usize) -> Self {
        self.history_size = size;
        self
    }

    /// Set the congestion thresholds
    pub fn with_thresholds(mut self, low: f32, medium: f32, high: f32) -> Self {
        self.thresholds = Thresholds { low, medium, high };
        self
    }

    /// Set the green-time multipliers
    pub fn with_multipliers(mut self, low: f32, medium: f32, high: f32) -> Self {
        self.multipliers = Multipliers { low, medium, high };
        self
    }
}

// ============================================================================
// Override Config
// ============================================================================

/// Override (preemption) configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OverrideConfig {
    /// Whether ingested emergency detections raise overrides automatically
    pub emergency_priority: bool,
    /// Lifetime of an accepted override before the TTL sweep removes it
    pub priority_duration_ms: u64,
}

impl Default for OverrideConfig {
    fn default() -> Self {
        Self {
            emergency_priority: true,
            priority_duration_ms: 60_000,
        }
    }
}

impl OverrideConfig {
    /// Enable or disable automatic emergency overrides
    pub fn with_emergency_priority(mut self, enabled: bool) -> Self {
        self.emergency_priority = enabled;
        self
    }

    /// Set the override lifetime
    pub fn with_priority_duration_ms(mut self, ms: u64) -> Self {
        self.priority_duration_ms = ms;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lanes: 4,
            timing: TimingConfig::default(),
            density: DensityConfig::default(),
            overrides: OverrideConfig::default(),
        }
    }
}
