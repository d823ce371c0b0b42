//! API request and response types for the HTTP service.

use serde::{Deserialize, Serialize};

use crate::density::CongestionLevel;
use crate::engine::SignalSnapshot;
use crate::overrides::{Override, OverrideKind};
use crate::signals::SignalState;
use crate::LaneId;

// Re-export shared request types from messages module
pub use crate::messages::{DetectionReport, OverrideRequest};

// ============================================================================
// Response Types
// ============================================================================

/// API response wrapper for consistent JSON structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful
    pub success: bool,
    /// Response data (present when success=true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message (present when success=false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response with data
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// One lane's signal state in a [`StateResponse`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneStateResponse {
    /// Lane id
    pub lane: LaneId,
    /// Current signal aspect
    pub state: SignalState,
    /// Seconds left in the lane's current phase
    pub time_remaining_secs: f32,
    /// Congestion band of the lane's latest count
    pub congestion: CongestionLevel,
}

/// A live override in API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideResponse {
    /// Override id (use with DELETE /api/override/:id)
    pub id: u64,
    /// Prioritized lane
    pub lane: LaneId,
    /// Request kind
    pub kind: OverrideKind,
    /// Expiry timestamp on the service time base (milliseconds)
    pub expires_at_ms: u64,
    /// Green the lane receives when granted, in seconds
    pub green_secs: f32,
    /// Clearance hold after the prioritized green, in seconds
    pub clear_secs: f32,
}

impl From<&Override> for OverrideResponse {
    fn from(ov: &Override) -> Self {
        Self {
            id: ov.id,
            lane: ov.lane,
            kind: ov.kind,
            expires_at_ms: ov.expires_at_ms,
            green_secs: ov.resolved.green_ms as f32 / 1000.0,
            clear_secs: ov.resolved.clear_ms as f32 / 1000.0,
        }
    }
}

/// Current intersection state response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateResponse {
    /// The lane being served
    pub active_lane: LaneId,
    /// Completed grants since startup
    pub cycle_count: u64,
    /// Whether an all-red clearance is in progress
    pub in_all_red: bool,
    /// Per-lane signal states
    pub lanes: Vec<LaneStateResponse>,
    /// Live overrides
    pub overrides: Vec<OverrideResponse>,
}

impl From<&SignalSnapshot> for StateResponse {
    fn from(snapshot: &SignalSnapshot) -> Self {
        Self {
            active_lane: snapshot.active_lane,
            cycle_count: snapshot.cycle_count,
            in_all_red: snapshot.in_all_red,
            lanes: snapshot
                .lanes
                .iter()
                .map(|lane| LaneStateResponse {
                    lane: lane.lane,
                    state: lane.state,
                    time_remaining_secs: lane.time_remaining_ms as f32 / 1000.0,
                    congestion: lane.congestion,
                })
                .collect(),
            overrides: snapshot.overrides.iter().map(OverrideResponse::from).collect(),
        }
    }
}

/// Command result response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    /// Whether the command was accepted
    pub accepted: bool,
    /// Result details
    pub result: String,
}

impl CommandResponse {
    /// Create a response for an accepted command
    pub fn accepted(result: impl Into<String>) -> Self {
        Self {
            accepted: true,
            result: result.into(),
        }
    }

    /// Create a response for a rejected command
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            result: reason.into(),
        }
    }
}
