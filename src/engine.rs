//! Main intersection controller tying density, timing, signals, and
//! overrides together.
//!
//! # Example
//!
//! ```rust
//! use junction::{Config, DensitySample, IntersectionEngine};
//!
//! let mut engine = IntersectionEngine::new(Config::default()).unwrap();
//!
//! // Feed a detector frame for all four lanes.
//! engine.ingest(&[DensitySample::vehicles(3); 4], 0);
//!
//! // Drive the signal plan from your loop.
//! let snapshot = engine.tick(1_000);
//! assert_eq!(snapshot.active_lane, 0);
//! ```

use crate::config::{Config, ConfigError};
use crate::density::{CongestionLevel, DensitySample, DensityStats, DensityTracker};
use crate::overrides::{Override, OverrideKind, OverrideManager};
use crate::signals::{SignalState, SignalStateMachine};
use crate::LaneId;

// ============================================================================
// Snapshot Types
// ============================================================================

/// One lane's view in a [`SignalSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LaneSnapshot {
    /// Lane id
    pub lane: LaneId,
    /// Current signal aspect
    pub state: SignalState,
    /// Milliseconds left in the lane's current phase
    pub time_remaining_ms: u64,
    /// Congestion band of the lane's latest count
    pub congestion: CongestionLevel,
}

/// Consistent point-in-time view of the whole intersection.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignalSnapshot {
    /// The lane being served (last served during all-red clearance)
    pub active_lane: LaneId,
    /// Completed grants since startup
    pub cycle_count: u64,
    /// Whether an all-red clearance is in progress
    pub in_all_red: bool,
    /// Every lane's phase and congestion
    pub lanes: Vec<LaneSnapshot>,
    /// Live overrides in id order
    pub overrides: Vec<Override>,
}

/// Cumulative counters since engine construction.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineStats {
    /// Sum of all ingested vehicle counts
    pub total_vehicles: u64,
    /// Sum of all ingested emergency vehicle counts
    pub emergency_vehicles: u64,
    /// Per-lane ingested vehicle totals
    pub lane_totals: Vec<u64>,
    /// Number of `tick` calls processed
    pub ticks: u64,
}

// ============================================================================
// Engine
// ============================================================================

/// Adaptive signal controller for one intersection.
///
/// Owns the density tracker, the phase state machine, and the override
/// manager; all methods take an explicit `now_ms` on a caller-chosen
/// monotonic time base starting near construction (phase timestamps
/// begin at 0).
#[derive(Debug)]
pub struct IntersectionEngine {
    config: Config,
    density: DensityTracker,
    signals: SignalStateMachine,
    overrides: OverrideManager,
    stats: EngineStats,
}

impl IntersectionEngine {
    /// Validate `config` and construct the engine. Lane 0 starts GREEN
    /// with the minimum green time.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            density: DensityTracker::new(config.lanes, config.density.history_size),
            signals: SignalStateMachine::new(config.lanes, config.timing.min_green_ms),
            overrides: OverrideManager::new(),
            stats: EngineStats {
                total_vehicles: 0,
                emergency_vehicles: 0,
                lane_totals: vec![0; config.lanes],
                ticks: 0,
            },
            config,
        })
    }

    /// The validated configuration the engine runs with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Cumulative counters.
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    // ========================================================================
    // Detection ingest
    // ========================================================================

    /// Feed one detector frame covering every lane (`samples[i]` is
    /// lane `i`; the slice length must equal the configured lane count).
    ///
    /// When emergency priority is enabled, a lane reporting emergency
    /// vehicles and not already prioritized gets an automatic emergency
    /// override, preempting the active green. The overrides raised this
    /// way are returned.
    pub fn ingest(&mut self, samples: &[DensitySample], now_ms: u64) -> Vec<Override> {
        assert_eq!(
            samples.len(),
            self.config.lanes,
            "frame covers {} lanes, engine has {}",
            samples.len(),
            self.config.lanes
        );

        let mut raised = Vec::new();
        for (lane, sample) in samples.iter().enumerate() {
            self.density.update(lane, *sample);
            self.stats.total_vehicles += u64::from(sample.vehicle_count);
            self.stats.emergency_vehicles += u64::from(sample.emergency_vehicle_count);
            self.stats.lane_totals[lane] += u64::from(sample.vehicle_count);

            if sample.emergency_vehicle_count > 0
                && self.config.overrides.emergency_priority
                && !self.overrides.active_priority_for(lane, now_ms)
            {
                tracing::warn!(lane, "emergency vehicle detected, raising override");
                raised.push(self.request_override(lane, OverrideKind::Emergency, now_ms));
            }
        }
        raised
    }

    // ========================================================================
    // Overrides
    // ========================================================================

    /// Accept a preemption request for `lane`. Emergency requests also
    /// collapse the active green immediately; transit priority waits for
    /// the normal cycle and wins the next selection.
    pub fn request_override(&mut self, lane: LaneId, kind: OverrideKind, now_ms: u64) -> Override {
        assert!(
            lane < self.config.lanes,
            "unknown lane {} (lanes are 0..{})",
            lane,
            self.config.lanes
        );
        let ov = self.overrides.request(lane, kind, now_ms, &self.config);
        if kind == OverrideKind::Emergency {
            self.signals.preempt(lane, now_ms, &self.config);
        }
        ov
    }

    /// Remove an override by id; `false` when the id is unknown.
    pub fn clear_override(&mut self, id: u64) -> bool {
        self.overrides.clear(id)
    }

    /// Drop every override whose TTL has passed. Returns the number
    /// removed. Expiry never interrupts a phase in progress.
    pub fn sweep_expired(&mut self, now_ms: u64) -> usize {
        self.overrides.sweep_expired(now_ms)
    }

    /// Live overrides in id order.
    pub fn active_overrides(&self) -> Vec<Override> {
        self.overrides.active()
    }

    // ========================================================================
    // Tick and snapshots
    // ========================================================================

    /// Advance the signal plan to `now_ms` and return the resulting
    /// snapshot. Safe to call at any cadence.
    pub fn tick(&mut self, now_ms: u64) -> SignalSnapshot {
        let stats: Vec<DensityStats> = (0..self.config.lanes)
            .map(|lane| self.density.stats(lane))
            .collect();
        self.signals
            .tick(now_ms, &self.config, &stats, &self.overrides);
        self.stats.ticks += 1;
        self.snapshot(now_ms)
    }

    /// A consistent view of the intersection at `now_ms`, without
    /// advancing anything.
    pub fn snapshot(&self, now_ms: u64) -> SignalSnapshot {
        let lanes = (0..self.config.lanes)
            .map(|lane| LaneSnapshot {
                lane,
                state: self.signals.lanes()[lane].state,
                time_remaining_ms: self.signals.time_remaining_ms(lane, now_ms),
                congestion: self
                    .density
                    .congestion(lane, &self.config.density.thresholds),
            })
            .collect();

        SignalSnapshot {
            active_lane: self.signals.active_lane(),
            cycle_count: self.signals.cycle_count(),
            in_all_red: self.signals.in_all_red(),
            lanes,
            overrides: self.overrides.active(),
        }
    }

    /// Density statistics for one lane.
    pub fn density(&self, lane: LaneId) -> DensityStats {
        self.density.stats(lane)
    }

    /// Congestion band for one lane.
    pub fn congestion(&self, lane: LaneId) -> CongestionLevel {
        self.density
            .congestion(lane, &self.config.density.thresholds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverrideConfig;

    fn engine() -> IntersectionEngine {
        IntersectionEngine::new(Config::default()).unwrap()
    }

    fn frame(counts: [u32; 4]) -> Vec<DensitySample> {
        counts.iter().map(|&c| DensitySample::vehicles(c)).collect()
    }

    // ========================================================================
    // Construction
    // ========================================================================

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = Config::default().with_lanes(0);
        assert_eq!(
            IntersectionEngine::new(config).unwrap_err(),
            ConfigError::NoLanes
        );
    }

    #[test]
    fn test_initial_snapshot() {
        let engine = engine();
        let snap = engine.snapshot(0);
        assert_eq!(snap.active_lane, 0);
        assert_eq!(snap.cycle_count, 0);
        assert_eq!(snap.lanes.len(), 4);
        assert_eq!(snap.lanes[0].state, SignalState::Green);
        assert_eq!(snap.lanes[0].time_remaining_ms, 10_000);
        assert!(snap.overrides.is_empty());
    }

    // ========================================================================
    // Ingest
    // ========================================================================

    #[test]
    fn test_ingest_updates_density_and_stats() {
        let mut engine = engine();
        engine.ingest(&frame([3, 0, 8, 1]), 0);
        engine.ingest(&frame([4, 0, 9, 1]), 1_000);

        assert_eq!(engine.density(2).current, 9.0);
        assert_eq!(engine.stats().total_vehicles, 26);
        assert_eq!(engine.stats().lane_totals, vec![7, 0, 17, 2]);
    }

    #[test]
    #[should_panic(expected = "frame covers")]
    fn test_ingest_wrong_frame_size_panics() {
        let mut engine = engine();
        engine.ingest(&frame([1, 2, 3, 4])[..3].to_vec(), 0);
    }

    #[test]
    fn test_ingest_raises_emergency_override() {
        let mut engine = engine();
        let mut samples = frame([2, 2, 2, 2]);
        samples[3] = DensitySample::with_emergency(5, 1);

        let raised = engine.ingest(&samples, 1_000);
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].lane, 3);
        assert_eq!(raised[0].kind, OverrideKind::Emergency);
        assert_eq!(engine.stats().emergency_vehicles, 1);

        // Active green collapsed by the auto-preempt.
        assert_eq!(engine.snapshot(1_000).lanes[0].state, SignalState::Yellow);

        // The same lane reporting again does not stack a second override.
        let raised = engine.ingest(&samples, 2_000);
        assert!(raised.is_empty());
        assert_eq!(engine.active_overrides().len(), 1);
    }

    #[test]
    fn test_ingest_ignores_emergency_when_disabled() {
        let config = Config::default()
            .with_overrides(OverrideConfig::default().with_emergency_priority(false));
        let mut engine = IntersectionEngine::new(config).unwrap();

        let mut samples = frame([0, 0, 0, 0]);
        samples[2] = DensitySample::with_emergency(3, 1);
        let raised = engine.ingest(&samples, 0);

        assert!(raised.is_empty());
        assert!(engine.active_overrides().is_empty());
        // The counts still land in the statistics.
        assert_eq!(engine.stats().emergency_vehicles, 1);
    }

    // ========================================================================
    // Overrides through the engine
    // ========================================================================

    #[test]
    fn test_manual_emergency_override_preempts() {
        let mut engine = engine();
        let ov = engine.request_override(2, OverrideKind::Emergency, 3_000);
        assert_eq!(ov.lane, 2);

        let snap = engine.snapshot(3_000);
        assert_eq!(snap.lanes[0].state, SignalState::Yellow);
        assert_eq!(snap.overrides.len(), 1);
    }

    #[test]
    fn test_transit_override_does_not_preempt() {
        let mut engine = engine();
        engine.request_override(2, OverrideKind::PriorityTransport, 3_000);
        // The active green keeps running.
        assert_eq!(engine.snapshot(3_000).lanes[0].state, SignalState::Green);
        assert_eq!(engine.active_overrides().len(), 1);
    }

    #[test]
    #[should_panic(expected = "unknown lane")]
    fn test_override_unknown_lane_panics() {
        let mut engine = engine();
        engine.request_override(7, OverrideKind::Emergency, 0);
    }

    #[test]
    fn test_clear_and_sweep_pass_through() {
        let mut engine = engine();
        let ov = engine.request_override(1, OverrideKind::PriorityTransport, 0);
        assert!(engine.clear_override(ov.id));
        assert!(!engine.clear_override(ov.id));

        engine.request_override(2, OverrideKind::Emergency, 0);
        assert_eq!(engine.sweep_expired(61_000), 1);
        assert!(engine.active_overrides().is_empty());
    }

    // ========================================================================
    // Tick
    // ========================================================================

    #[test]
    fn test_tick_counts_and_progresses() {
        let mut engine = engine();
        engine.ingest(&frame([0, 12, 0, 0]), 0);

        let snap = engine.tick(10_000);
        assert_eq!(snap.lanes[0].state, SignalState::Yellow);
        let snap = engine.tick(13_000);
        assert!(snap.in_all_red);
        let snap = engine.tick(15_000);
        assert_eq!(snap.active_lane, 1);
        assert_eq!(snap.cycle_count, 1);
        assert_eq!(engine.stats().ticks, 3);
    }

    #[test]
    fn test_snapshot_reports_congestion() {
        let mut engine = engine();
        engine.ingest(&frame([0, 6, 20, 40]), 0);
        let snap = engine.snapshot(0);
        assert_eq!(snap.lanes[0].congestion, CongestionLevel::None);
        assert_eq!(snap.lanes[1].congestion, CongestionLevel::Low);
        assert_eq!(snap.lanes[2].congestion, CongestionLevel::Medium);
        assert_eq!(snap.lanes[3].congestion, CongestionLevel::High);
    }
}
