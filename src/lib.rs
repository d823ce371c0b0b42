//! # junction
//!
//! An adaptive traffic signal control engine: per-lane density tracking,
//! density-driven green times, a tick-based phase state machine, and
//! emergency/transit preemption.
//!
//! ## Features
//!
//! - **Density-adaptive timing**: green durations scale with measured
//!   vehicle counts, clamped to configured bounds
//! - **Trend-aware selection**: lanes with rising traffic get a scoring
//!   bonus; the lane that just finished never competes
//! - **Preemption**: emergency vehicles collapse the active green and win
//!   the next selection outright; transit priority waits for the cycle
//! - **Non-blocking**: every phase, including the all-red clearance, is a
//!   timer comparison inside `tick` - nothing ever sleeps
//!
//! ## Architecture
//!
//! - `density` - per-lane ring-buffer histories and derived statistics
//! - `timing` - pure green-time and next-lane selection functions
//! - `signals` - the phase state machine
//! - `overrides` - preemption request lifecycle with TTL sweep
//! - `engine` - the controller that ties everything together
//! - `services` - feature-gated HTTP API and async runner
//!
//! ## Example
//!
//! ```rust
//! use junction::{Config, DensitySample, IntersectionEngine, OverrideKind, SignalState};
//!
//! let mut engine = IntersectionEngine::new(Config::default()).unwrap();
//!
//! // Detector frames arrive per lane; lane 2 is filling up.
//! engine.ingest(&[
//!     DensitySample::vehicles(2),
//!     DensitySample::vehicles(1),
//!     DensitySample::vehicles(18),
//!     DensitySample::vehicles(0),
//! ], 0);
//!
//! // An ambulance shows up on lane 3: the active green collapses.
//! engine.request_override(3, OverrideKind::Emergency, 4_000);
//! let snapshot = engine.tick(4_000);
//! assert_eq!(snapshot.lanes[0].state, SignalState::Yellow);
//! ```

#![warn(missing_docs)]

/// Dense lane index; lanes are numbered `0..config.lanes`.
pub type LaneId = usize;

/// Configuration structs with builder setters and eager validation.
pub mod config;
/// Per-lane vehicle density tracking and derived statistics.
pub mod density;
/// Main intersection controller.
pub mod engine;
/// Preemption override lifecycle.
pub mod overrides;
/// Signal phase state machine.
pub mod signals;
/// Green-time computation and next-lane selection.
pub mod timing;

/// Request message types for the HTTP API (serde-based).
#[cfg(feature = "serde")]
pub mod messages;

/// HTTP API and async runner (feature-gated).
#[cfg(feature = "web")]
pub mod services;

// Re-exports for convenience
pub use config::{
    Config, ConfigError, DensityConfig, Multipliers, OverrideConfig, Thresholds, TimingConfig,
};
pub use density::{CongestionLevel, DensitySample, DensityStats, DensityTracker, Trend};
pub use engine::{EngineStats, IntersectionEngine, LaneSnapshot, SignalSnapshot};
pub use overrides::{Override, OverrideKind, OverrideManager, ResolvedOverride};
pub use signals::{LaneSignal, SignalState, SignalStateMachine};
