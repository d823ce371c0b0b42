//! Per-lane signal phase state machine.
//!
//! Exactly one lane holds the right of way at any instant. A serving lane
//! walks GREEN -> YELLOW -> ALL_RED; during the all-red clearance every
//! lane reads ALL_RED, then the next lane is selected and granted GREEN.
//!
//! All progression is driven by [`SignalStateMachine::tick`] comparing
//! `now_ms` against phase start times. The tick never sleeps and is
//! idempotent between phase boundaries, so it can be called at any
//! cadence without changing behavior.

use crate::config::Config;
use crate::density::DensityStats;
use crate::overrides::OverrideManager;
use crate::{timing, LaneId};

// ============================================================================
// Phase Types
// ============================================================================

/// Signal aspect shown to a lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SignalState {
    /// Stopped
    Red,
    /// Clearing, about to lose right of way
    Yellow,
    /// Right of way
    Green,
    /// Intersection-wide clearance between cycles
    AllRed,
}

/// One lane's phase, owned exclusively by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LaneSignal {
    /// Current aspect
    pub state: SignalState,
    /// When the current phase began
    pub phase_started_ms: u64,
    /// Planned duration of the current phase (0 for RED)
    pub planned_ms: u64,
}

/// All-red clearance in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AllRedHold {
    started_ms: u64,
    hold_ms: u64,
}

// ============================================================================
// State Machine
// ============================================================================

/// Tick-driven phase state machine over a fixed set of lanes.
#[derive(Debug, Clone)]
pub struct SignalStateMachine {
    lanes: Vec<LaneSignal>,
    active_lane: LaneId,
    all_red: Option<AllRedHold>,
    cycle_count: u64,
}

impl SignalStateMachine {
    /// Create a machine with lane 0 holding an initial green of
    /// `min_green_ms` and every other lane red. Phase timestamps start
    /// at 0; callers feed `now_ms` values on the same time base.
    pub fn new(lane_count: usize, min_green_ms: u64) -> Self {
        assert!(lane_count > 0, "lane count must be at least 1");
        let mut lanes = vec![
            LaneSignal {
                state: SignalState::Red,
                phase_started_ms: 0,
                planned_ms: 0,
            };
            lane_count
        ];
        lanes[0] = LaneSignal {
            state: SignalState::Green,
            phase_started_ms: 0,
            planned_ms: min_green_ms,
        };
        Self {
            lanes,
            active_lane: 0,
            all_red: None,
            cycle_count: 0,
        }
    }

    /// The lane currently being served (the last served lane during
    /// all-red clearance).
    pub fn active_lane(&self) -> LaneId {
        self.active_lane
    }

    /// Completed ALL_RED -> GREEN grants since startup.
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Per-lane phase states.
    pub fn lanes(&self) -> &[LaneSignal] {
        &self.lanes
    }

    /// Whether the intersection is inside an all-red clearance.
    pub fn in_all_red(&self) -> bool {
        self.all_red.is_some()
    }

    /// Milliseconds left in `lane`'s current phase. Zero for lanes
    /// sitting at RED.
    pub fn time_remaining_ms(&self, lane: LaneId, now_ms: u64) -> u64 {
        assert!(lane < self.lanes.len(), "unknown lane {}", lane);
        if let Some(hold) = self.all_red {
            return hold
                .hold_ms
                .saturating_sub(now_ms.saturating_sub(hold.started_ms));
        }
        let signal = &self.lanes[lane];
        match signal.state {
            SignalState::Green | SignalState::Yellow => signal
                .planned_ms
                .saturating_sub(now_ms.saturating_sub(signal.phase_started_ms)),
            SignalState::Red | SignalState::AllRed => 0,
        }
    }

    /// Advance the machine to `now_ms`. Returns `true` when a phase
    /// boundary fired.
    ///
    /// At most one boundary fires per call; between boundaries the call
    /// is a no-op, so repeated ticks with the same timestamp are safe.
    pub fn tick(
        &mut self,
        now_ms: u64,
        config: &Config,
        stats: &[DensityStats],
        overrides: &OverrideManager,
    ) -> bool {
        if let Some(hold) = self.all_red {
            if now_ms.saturating_sub(hold.started_ms) >= hold.hold_ms {
                self.grant_next(now_ms, config, stats, overrides);
                return true;
            }
            return false;
        }

        let active = self.lanes[self.active_lane];
        let elapsed = now_ms.saturating_sub(active.phase_started_ms);
        match active.state {
            SignalState::Green if elapsed >= active.planned_ms => {
                self.lanes[self.active_lane] = LaneSignal {
                    state: SignalState::Yellow,
                    phase_started_ms: now_ms,
                    planned_ms: config.timing.yellow_ms,
                };
                tracing::info!(lane = self.active_lane, "green complete, showing yellow");
                true
            }
            SignalState::Yellow if elapsed >= active.planned_ms => {
                self.enter_all_red(now_ms, config, overrides);
                true
            }
            _ => false,
        }
    }

    /// Collapse the active green so a prioritized lane can be served.
    ///
    /// The active lane goes straight to a fresh YELLOW; a lane is never
    /// granted GREEN while another still shows it. Preempting the active
    /// lane itself, or while a yellow or all-red is already underway, is
    /// a no-op. Returns `true` when a green was collapsed.
    pub fn preempt(&mut self, lane: LaneId, now_ms: u64, config: &Config) -> bool {
        assert!(lane < self.lanes.len(), "unknown lane {}", lane);
        if self.all_red.is_some() || lane == self.active_lane {
            return false;
        }
        let active = &mut self.lanes[self.active_lane];
        if active.state != SignalState::Green {
            return false;
        }
        *active = LaneSignal {
            state: SignalState::Yellow,
            phase_started_ms: now_ms,
            planned_ms: config.timing.yellow_ms,
        };
        tracing::warn!(
            preempted = self.active_lane,
            for_lane = lane,
            "collapsing active green for priority"
        );
        true
    }

    /// Move every lane to ALL_RED and start the clearance hold.
    ///
    /// A finishing lane that held an unexpired override extends the hold
    /// to its resolved clearance time.
    fn enter_all_red(&mut self, now_ms: u64, config: &Config, overrides: &OverrideManager) {
        let hold_ms = if overrides.active_priority_for(self.active_lane, now_ms) {
            overrides
                .active_clear_ms(self.active_lane, now_ms)
                .unwrap_or(config.timing.all_red_ms)
                .max(config.timing.all_red_ms)
        } else {
            config.timing.all_red_ms
        };

        for signal in &mut self.lanes {
            *signal = LaneSignal {
                state: SignalState::AllRed,
                phase_started_ms: now_ms,
                planned_ms: hold_ms,
            };
        }
        self.all_red = Some(AllRedHold {
            started_ms: now_ms,
            hold_ms,
        });
        tracing::info!(after = self.active_lane, hold_ms, "all-red clearance started");
    }

    /// End the clearance: pick the next lane, compute its green, grant it.
    fn grant_next(
        &mut self,
        now_ms: u64,
        config: &Config,
        stats: &[DensityStats],
        overrides: &OverrideManager,
    ) {
        let next = timing::select_next_lane(self.lanes.len(), self.active_lane, stats, |lane| {
            overrides.active_priority_for(lane, now_ms)
        });
        let green_ms = overrides
            .active_green_ms(next, now_ms)
            .unwrap_or_else(|| timing::green_time(&stats[next], config));

        for signal in &mut self.lanes {
            *signal = LaneSignal {
                state: SignalState::Red,
                phase_started_ms: now_ms,
                planned_ms: 0,
            };
        }
        self.lanes[next] = LaneSignal {
            state: SignalState::Green,
            phase_started_ms: now_ms,
            planned_ms: green_ms,
        };
        self.active_lane = next;
        self.all_red = None;
        self.cycle_count += 1;
        tracing::info!(lane = next, green_ms, cycle = self.cycle_count, "green granted");
    }
}
