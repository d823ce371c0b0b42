//! Per-lane vehicle density tracking.
//!
//! The tracker keeps a bounded ring of recent vehicle counts for each lane
//! and derives the statistics the timing policy consumes: current count,
//! rolling average, observed maximum, and a short-horizon trend. A lane
//! whose detector goes quiet simply keeps reporting its last buffered
//! window; staleness is not an error here.

use std::collections::VecDeque;

use crate::config::Thresholds;
use crate::LaneId;

/// How many of the newest samples form the trend's "recent" window.
const TREND_WINDOW: usize = 5;

/// Ratio of recent to older mean above which the trend is rising.
const TREND_UP_RATIO: f32 = 1.2;

/// Ratio of recent to older mean below which the trend is falling.
const TREND_DOWN_RATIO: f32 = 0.8;

// ============================================================================
// Sample and Stats Types
// ============================================================================

/// One detector reading for a single lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DensitySample {
    /// Vehicles currently observed in the lane
    pub vehicle_count: u32,
    /// Emergency vehicles among them
    #[cfg_attr(feature = "serde", serde(default))]
    pub emergency_vehicle_count: u32,
}

impl DensitySample {
    /// A reading with no emergency vehicles.
    pub fn vehicles(count: u32) -> Self {
        Self {
            vehicle_count: count,
            emergency_vehicle_count: 0,
        }
    }

    /// A reading that includes emergency vehicles.
    pub fn with_emergency(count: u32, emergency: u32) -> Self {
        Self {
            vehicle_count: count,
            emergency_vehicle_count: emergency,
        }
    }
}

/// Short-horizon direction of a lane's vehicle counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Trend {
    /// Recent counts are meaningfully above the older window
    Increasing,
    /// Recent counts are meaningfully below the older window
    Decreasing,
    /// Not enough data, or no meaningful movement either way
    Stable,
}

/// Congestion band for a lane's current count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CongestionLevel {
    /// Below the low threshold: free-flowing
    None,
    /// Below the medium threshold
    Low,
    /// Below the high threshold
    Medium,
    /// At or above the high threshold
    High,
}

/// Derived statistics over one lane's sample window.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DensityStats {
    /// Most recent vehicle count (0.0 when no samples yet)
    pub current: f32,
    /// Mean count over the buffered window
    pub average: f32,
    /// Maximum count over the buffered window
    pub max: f32,
    /// Short-horizon trend
    pub trend: Trend,
}

impl Default for DensityStats {
    fn default() -> Self {
        Self {
            current: 0.0,
            average: 0.0,
            max: 0.0,
            trend: Trend::Stable,
        }
    }
}

// ============================================================================
// Density Tracker
// ============================================================================

/// Bounded per-lane history of vehicle counts.
///
/// Lane ids are dense indices `0..lanes`; passing an out-of-range lane is a
/// caller bug and panics.
#[derive(Debug, Clone)]
pub struct DensityTracker {
    capacity: usize,
    histories: Vec<VecDeque<u32>>,
}

impl DensityTracker {
    /// Create a tracker for `lanes` lanes holding `capacity` samples each.
    pub fn new(lanes: usize, capacity: usize) -> Self {
        Self {
            capacity,
            histories: (0..lanes).map(|_| VecDeque::with_capacity(capacity)).collect(),
        }
    }

    /// Number of lanes tracked.
    pub fn lanes(&self) -> usize {
        self.histories.len()
    }

    /// Samples currently buffered for `lane`.
    pub fn sample_count(&self, lane: LaneId) -> usize {
        self.history(lane).len()
    }

    /// Push one sample for `lane`, evicting the oldest at capacity.
    pub fn update(&mut self, lane: LaneId, sample: DensitySample) {
        let capacity = self.capacity;
        let history = self.history_mut(lane);
        if history.len() == capacity {
            history.pop_front();
        }
        history.push_back(sample.vehicle_count);
        tracing::debug!(
            lane,
            count = sample.vehicle_count,
            emergency = sample.emergency_vehicle_count,
            "density sample recorded"
        );
    }

    /// Compute statistics over the buffered window for `lane`.
    ///
    /// With an empty buffer every value is zero and the trend is stable.
    pub fn stats(&self, lane: LaneId) -> DensityStats {
        let history = self.history(lane);
        if history.is_empty() {
            return DensityStats::default();
        }

        let len = history.len() as f32;
        let mut sum = 0u64;
        let mut max = 0u32;
        for &count in history {
            sum += u64::from(count);
            max = max.max(count);
        }

        DensityStats {
            current: *history.back().unwrap_or(&0) as f32,
            average: sum as f32 / len,
            max: max as f32,
            trend: trend_of(history),
        }
    }

    /// Classify the lane's current count against the configured thresholds.
    pub fn congestion(&self, lane: LaneId, thresholds: &Thresholds) -> CongestionLevel {
        let current = self.stats(lane).current;
        if current < thresholds.low {
            CongestionLevel::None
        } else if current < thresholds.medium {
            CongestionLevel::Low
        } else if current < thresholds.high {
            CongestionLevel::Medium
        } else {
            CongestionLevel::High
        }
    }

    fn history(&self, lane: LaneId) -> &VecDeque<u32> {
        assert!(
            lane < self.histories.len(),
            "unknown lane {} (lanes are 0..{})",
            lane,
            self.histories.len()
        );
        &self.histories[lane]
    }

    fn history_mut(&mut self, lane: LaneId) -> &mut VecDeque<u32> {
        assert!(
            lane < self.histories.len(),
            "unknown lane {} (lanes are 0..{})",
            lane,
            self.histories.len()
        );
        &mut self.histories[lane]
    }
}

/// Compare the newest [`TREND_WINDOW`] samples against the rest of the buffer.
fn trend_of(history: &VecDeque<u32>) -> Trend {
    if history.len() < TREND_WINDOW {
        return Trend::Stable;
    }
    let split = history.len() - TREND_WINDOW;
    if split == 0 {
        // The whole buffer is the recent window; nothing to compare against.
        return Trend::Stable;
    }

    let older =
        history.iter().take(split).map(|&c| c as f32).sum::<f32>() / split as f32;
    let recent =
        history.iter().skip(split).map(|&c| c as f32).sum::<f32>() / TREND_WINDOW as f32;

    if older == 0.0 {
        // Any traffic after an empty stretch counts as rising.
        return if recent > 0.0 {
            Trend::Increasing
        } else {
            Trend::Stable
        };
    }

    let ratio = recent / older;
    if ratio >= TREND_UP_RATIO {
        Trend::Increasing
    } else if ratio <= TREND_DOWN_RATIO {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(tracker: &mut DensityTracker, lane: LaneId, counts: &[u32]) {
        for &count in counts {
            tracker.update(lane, DensitySample::vehicles(count));
        }
    }

    // ========================================================================
    // Buffering
    // ========================================================================

    #[test]
    fn test_empty_lane_stats_are_zero() {
        let tracker = DensityTracker::new(2, 30);
        let stats = tracker.stats(0);
        assert_eq!(stats.current, 0.0);
        assert_eq!(stats.average, 0.0);
        assert_eq!(stats.max, 0.0);
        assert_eq!(stats.trend, Trend::Stable);
    }

    #[test]
    fn test_current_is_latest_sample() {
        let mut tracker = DensityTracker::new(1, 30);
        feed(&mut tracker, 0, &[3, 7, 12]);
        assert_eq!(tracker.stats(0).current, 12.0);
    }

    #[test]
    fn test_average_and_max() {
        let mut tracker = DensityTracker::new(1, 30);
        feed(&mut tracker, 0, &[2, 4, 6]);
        let stats = tracker.stats(0);
        assert_eq!(stats.average, 4.0);
        assert_eq!(stats.max, 6.0);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut tracker = DensityTracker::new(1, 3);
        feed(&mut tracker, 0, &[100, 1, 2, 3]);
        let stats = tracker.stats(0);
        // The 100 fell out of the window.
        assert_eq!(stats.max, 3.0);
        assert_eq!(stats.average, 2.0);
        assert_eq!(tracker.sample_count(0), 3);
    }

    #[test]
    fn test_lanes_are_independent() {
        let mut tracker = DensityTracker::new(2, 30);
        feed(&mut tracker, 0, &[10]);
        feed(&mut tracker, 1, &[20]);
        assert_eq!(tracker.stats(0).current, 10.0);
        assert_eq!(tracker.stats(1).current, 20.0);
    }

    #[test]
    #[should_panic(expected = "unknown lane")]
    fn test_unknown_lane_update_panics() {
        let mut tracker = DensityTracker::new(2, 30);
        tracker.update(5, DensitySample::vehicles(1));
    }

    #[test]
    #[should_panic(expected = "unknown lane")]
    fn test_unknown_lane_stats_panics() {
        let tracker = DensityTracker::new(2, 30);
        let _ = tracker.stats(2);
    }

    // ========================================================================
    // Trend
    // ========================================================================

    #[test]
    fn test_trend_stable_with_few_samples() {
        let mut tracker = DensityTracker::new(1, 30);
        feed(&mut tracker, 0, &[1, 100, 1, 100]);
        assert_eq!(tracker.stats(0).trend, Trend::Stable);
    }

    #[test]
    fn test_trend_stable_when_whole_buffer_is_recent() {
        let mut tracker = DensityTracker::new(1, 30);
        feed(&mut tracker, 0, &[10, 10, 10, 10, 10]);
        assert_eq!(tracker.stats(0).trend, Trend::Stable);
    }

    #[test]
    fn test_trend_increasing() {
        let mut tracker = DensityTracker::new(1, 30);
        // Older window averages 10, recent window averages 20.
        feed(&mut tracker, 0, &[10, 10, 10, 20, 20, 20, 20, 20]);
        assert_eq!(tracker.stats(0).trend, Trend::Increasing);
    }

    #[test]
    fn test_trend_decreasing() {
        let mut tracker = DensityTracker::new(1, 30);
        feed(&mut tracker, 0, &[20, 20, 20, 10, 10, 10, 10, 10]);
        assert_eq!(tracker.stats(0).trend, Trend::Decreasing);
    }

    #[test]
    fn test_trend_stable_in_band() {
        let mut tracker = DensityTracker::new(1, 30);
        // Recent mean 11 vs older mean 10: inside the dead band.
        feed(&mut tracker, 0, &[10, 10, 10, 11, 11, 11, 11, 11]);
        assert_eq!(tracker.stats(0).trend, Trend::Stable);
    }

    #[test]
    fn test_trend_from_empty_stretch() {
        let mut tracker = DensityTracker::new(1, 30);
        feed(&mut tracker, 0, &[0, 0, 0, 4, 4, 4, 4, 4]);
        assert_eq!(tracker.stats(0).trend, Trend::Increasing);
    }

    #[test]
    fn test_trend_all_zero_is_stable() {
        let mut tracker = DensityTracker::new(1, 30);
        feed(&mut tracker, 0, &[0; 10]);
        assert_eq!(tracker.stats(0).trend, Trend::Stable);
    }

    // ========================================================================
    // Congestion
    // ========================================================================

    #[test]
    fn test_congestion_bands() {
        let thresholds = Thresholds {
            low: 5.0,
            medium: 15.0,
            high: 30.0,
        };
        let mut tracker = DensityTracker::new(1, 30);

        assert_eq!(tracker.congestion(0, &thresholds), CongestionLevel::None);

        feed(&mut tracker, 0, &[4]);
        assert_eq!(tracker.congestion(0, &thresholds), CongestionLevel::None);

        feed(&mut tracker, 0, &[5]);
        assert_eq!(tracker.congestion(0, &thresholds), CongestionLevel::Low);

        feed(&mut tracker, 0, &[15]);
        assert_eq!(tracker.congestion(0, &thresholds), CongestionLevel::Medium);

        feed(&mut tracker, 0, &[30]);
        assert_eq!(tracker.congestion(0, &thresholds), CongestionLevel::High);

        feed(&mut tracker, 0, &[200]);
        assert_eq!(tracker.congestion(0, &thresholds), CongestionLevel::High);
    }
}
