//! Preemption override lifecycle.
//!
//! An override is an accepted request to prioritize one lane, carrying the
//! timing it was resolved with at acceptance. Overrides live until their
//! TTL sweep removes them or an operator clears them by id; expiry never
//! interrupts a phase already in progress, it only stops influencing
//! future selections.

use std::collections::{BTreeMap, HashMap};

use crate::config::Config;
use crate::LaneId;

/// Clearance hold applied after an emergency-priority green ends.
pub const EMERGENCY_CLEAR_MS: u64 = 10_000;

/// Clearance hold applied after a transit-priority green ends.
pub const TRANSIT_CLEAR_MS: u64 = 5_000;

/// Extra green granted to transit priority on top of the baseline green.
pub const TRANSIT_GREEN_BONUS_MS: u64 = 15_000;

// ============================================================================
// Override Types
// ============================================================================

/// What kind of vehicle the override prioritizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum OverrideKind {
    /// Emergency vehicle (ambulance, fire, police)
    Emergency,
    /// Public transport with signal priority
    PriorityTransport,
}

/// Timing resolved for an override at acceptance. Immutable afterwards;
/// later config changes do not retroactively alter granted overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResolvedOverride {
    /// Green duration the prioritized lane receives when granted
    pub green_ms: u64,
    /// Clearance hold after the prioritized green
    pub clear_ms: u64,
}

impl ResolvedOverride {
    fn for_kind(kind: OverrideKind, config: &Config) -> Self {
        match kind {
            OverrideKind::Emergency => Self {
                green_ms: config.timing.max_green_ms,
                clear_ms: EMERGENCY_CLEAR_MS,
            },
            OverrideKind::PriorityTransport => Self {
                green_ms: config.timing.default_green_ms + TRANSIT_GREEN_BONUS_MS,
                clear_ms: TRANSIT_CLEAR_MS,
            },
        }
    }
}

/// An accepted preemption request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Override {
    /// Monotonically increasing id, unique for the engine's lifetime
    pub id: u64,
    /// The prioritized lane
    pub lane: LaneId,
    /// Request kind
    pub kind: OverrideKind,
    /// When the request was accepted
    pub requested_at_ms: u64,
    /// When the TTL sweep will remove it
    pub expires_at_ms: u64,
    /// Timing resolved at acceptance
    pub resolved: ResolvedOverride,
}

impl Override {
    /// Whether the override still counts at `now_ms`.
    pub fn is_active(&self, now_ms: u64) -> bool {
        self.expires_at_ms > now_ms
    }
}

// ============================================================================
// Override Manager
// ============================================================================

/// Owns all live overrides and their per-lane index.
///
/// At most one override exists per lane; a second request for the same
/// lane replaces the first (new id, new expiry).
#[derive(Debug, Default)]
pub struct OverrideManager {
    next_id: u64,
    active: BTreeMap<u64, Override>,
    by_lane: HashMap<LaneId, u64>,
}

impl OverrideManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            active: BTreeMap::new(),
            by_lane: HashMap::new(),
        }
    }

    /// Accept a preemption request for `lane`.
    ///
    /// The returned override carries its resolved timing and expiry. An
    /// existing override on the same lane is replaced.
    pub fn request(
        &mut self,
        lane: LaneId,
        kind: OverrideKind,
        now_ms: u64,
        config: &Config,
    ) -> Override {
        if let Some(old_id) = self.by_lane.remove(&lane) {
            self.active.remove(&old_id);
            tracing::info!(lane, old_id, "replacing existing override");
        }

        let id = self.next_id;
        self.next_id += 1;

        let ov = Override {
            id,
            lane,
            kind,
            requested_at_ms: now_ms,
            expires_at_ms: now_ms + config.overrides.priority_duration_ms,
            resolved: ResolvedOverride::for_kind(kind, config),
        };
        self.active.insert(id, ov);
        self.by_lane.insert(lane, id);
        tracing::info!(
            id,
            lane,
            ?kind,
            expires_at_ms = ov.expires_at_ms,
            "override accepted"
        );
        ov
    }

    /// Whether an unexpired override targets `lane`.
    pub fn active_priority_for(&self, lane: LaneId, now_ms: u64) -> bool {
        self.by_lane
            .get(&lane)
            .and_then(|id| self.active.get(id))
            .map_or(false, |ov| ov.is_active(now_ms))
    }

    /// Resolved green for `lane`'s unexpired override, if any.
    pub fn active_green_ms(&self, lane: LaneId, now_ms: u64) -> Option<u64> {
        self.by_lane
            .get(&lane)
            .and_then(|id| self.active.get(id))
            .filter(|ov| ov.is_active(now_ms))
            .map(|ov| ov.resolved.green_ms)
    }

    /// Resolved clearance hold for `lane`'s unexpired override, if any.
    pub fn active_clear_ms(&self, lane: LaneId, now_ms: u64) -> Option<u64> {
        self.by_lane
            .get(&lane)
            .and_then(|id| self.active.get(id))
            .filter(|ov| ov.is_active(now_ms))
            .map(|ov| ov.resolved.clear_ms)
    }

    /// Remove every override whose expiry has passed. Returns how many
    /// were removed.
    pub fn sweep_expired(&mut self, now_ms: u64) -> usize {
        let expired: Vec<u64> = self
            .active
            .values()
            .filter(|ov| !ov.is_active(now_ms))
            .map(|ov| ov.id)
            .collect();

        for id in &expired {
            if let Some(ov) = self.active.remove(id) {
                self.by_lane.remove(&ov.lane);
                tracing::info!(id = ov.id, lane = ov.lane, "override expired");
            }
        }
        expired.len()
    }

    /// Remove an override by id. Returns `false` when the id is unknown
    /// (already swept, already cleared, or never issued); clearing twice
    /// is harmless.
    pub fn clear(&mut self, id: u64) -> bool {
        match self.active.remove(&id) {
            Some(ov) => {
                self.by_lane.remove(&ov.lane);
                tracing::info!(id, lane = ov.lane, "override cleared");
                true
            }
            None => false,
        }
    }

    /// Look up an override by id.
    pub fn get(&self, id: u64) -> Option<&Override> {
        self.active.get(&id)
    }

    /// All live overrides in id order.
    pub fn active(&self) -> Vec<Override> {
        self.active.values().copied().collect()
    }

    /// Number of live overrides.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether no overrides are live.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
