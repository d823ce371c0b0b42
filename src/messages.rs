//! Request message types for the HTTP API.
//!
//! # Example
//!
//! ```
//! use junction::messages::DetectionReport;
//!
//! let json = r#"{"lanes": [{"vehicle_count": 3}, {"vehicle_count": 9, "emergency_vehicle_count": 1}]}"#;
//! let report: DetectionReport = serde_json::from_str(json).unwrap();
//! assert_eq!(report.lanes.len(), 2);
//! assert_eq!(report.lanes[1].emergency_vehicle_count, 1);
//! ```

use serde::{Deserialize, Serialize};

use crate::density::DensitySample;
use crate::overrides::OverrideKind;
use crate::LaneId;

// ============================================================================
// Request Types
// ============================================================================

/// One detector frame covering every lane in lane-id order.
///
/// # JSON Example
///
/// ```json
/// {"lanes": [{"vehicle_count": 3}, {"vehicle_count": 12, "emergency_vehicle_count": 1}]}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Per-lane samples; index `i` is lane `i`
    pub lanes: Vec<DensitySample>,
}

impl DetectionReport {
    /// Create a report from per-lane samples.
    pub fn new(lanes: Vec<DensitySample>) -> Self {
        Self { lanes }
    }
}

/// Request to prioritize a lane.
///
/// # JSON Examples
///
/// ```json
/// {"lane": 3, "kind": "emergency"}
/// {"lane": 1, "kind": "priority_transport"}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRequest {
    /// The lane to prioritize
    pub lane: LaneId,
    /// Request kind; defaults to emergency
    #[serde(default = "default_kind")]
    pub kind: OverrideKind,
}

fn default_kind() -> OverrideKind {
    OverrideKind::Emergency
}

impl OverrideRequest {
    /// Create an emergency request.
    pub fn emergency(lane: LaneId) -> Self {
        Self {
            lane,
            kind: OverrideKind::Emergency,
        }
    }

    /// Create a transit priority request.
    pub fn transit(lane: LaneId) -> Self {
        Self {
            lane,
            kind: OverrideKind::PriorityTransport,
        }
    }
}
