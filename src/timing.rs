//! Green-time computation and next-lane selection.
//!
//! Both operations are pure functions over [`DensityStats`]: the same
//! inputs always produce the same answer, which keeps the state machine's
//! tick fully replayable.

use crate::config::Config;
use crate::density::{DensityStats, Trend};
use crate::LaneId;

/// Score assigned to a lane with a pending override; dwarfs any plausible
/// density so preempted lanes always win selection.
pub const EMERGENCY_SCORE: f32 = 1000.0;

/// Multiplier applied to a lane's score when its trend is rising.
pub const TREND_BONUS: f32 = 1.2;

/// Compute the green duration to grant for the given lane statistics.
///
/// Non-adaptive mode always returns the minimum green. Adaptive mode
/// scales the minimum by the multiplier of the congestion band the
/// current count falls into, then clamps into `[min_green, max_green]`.
///
/// # Example
///
/// ```rust
/// use junction::config::Config;
/// use junction::density::DensityStats;
/// use junction::timing::green_time;
///
/// let config = Config::default(); // min 10 s, multipliers {1.0, 1.5, 2.0}
/// let stats = DensityStats { current: 20.0, ..Default::default() };
/// assert_eq!(green_time(&stats, &config), 15_000);
/// ```
pub fn green_time(stats: &DensityStats, config: &Config) -> u64 {
    let timing = &config.timing;
    if !timing.adaptive {
        return timing.min_green_ms;
    }

    let density = &config.density;
    let multiplier = if stats.current >= density.thresholds.high {
        density.multipliers.high
    } else if stats.current >= density.thresholds.medium {
        density.multipliers.medium
    } else {
        density.multipliers.low
    };

    let scaled = (timing.min_green_ms as f32 * multiplier).round() as u64;
    scaled.clamp(timing.min_green_ms, timing.max_green_ms)
}

/// Score one lane for selection.
///
/// A pending override wins outright with [`EMERGENCY_SCORE`]; otherwise
/// the score is the current count, boosted by [`TREND_BONUS`] when the
/// lane's trend is rising.
pub fn lane_score(stats: &DensityStats, override_pending: bool) -> f32 {
    if override_pending {
        return EMERGENCY_SCORE;
    }
    let mut score = stats.current;
    if stats.trend == Trend::Increasing {
        score *= TREND_BONUS;
    }
    score
}

/// Pick the lane to serve next.
///
/// The lane that just finished its green (`exclude`) never competes, so
/// two lanes alternate even when one dominates. Ties resolve to the
/// lowest lane id (strict-greater argmax over ascending ids). With a
/// single lane there is no other candidate and `exclude` itself is
/// returned, so the cycle never stalls.
pub fn select_next_lane<F>(
    lane_count: usize,
    exclude: LaneId,
    stats: &[DensityStats],
    override_pending: F,
) -> LaneId
where
    F: Fn(LaneId) -> bool,
{
    debug_assert_eq!(stats.len(), lane_count);

    let mut best: Option<(LaneId, f32)> = None;
    for lane in 0..lane_count {
        if lane == exclude {
            continue;
        }
        let score = lane_score(&stats[lane], override_pending(lane));
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((lane, score)),
        }
    }

    best.map(|(lane, _)| lane).unwrap_or(exclude)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimingConfig;
    use crate::density::Trend;

    fn stats(current: f32, trend: Trend) -> DensityStats {
        DensityStats {
            current,
            average: current,
            max: current,
            trend,
        }
    }

    // ========================================================================
    // green_time
    // ========================================================================

    #[test]
    fn test_green_time_low_band() {
        let config = Config::default();
        assert_eq!(green_time(&stats(0.0, Trend::Stable), &config), 10_000);
        assert_eq!(green_time(&stats(14.0, Trend::Stable), &config), 10_000);
    }

    #[test]
    fn test_green_time_medium_band() {
        let config = Config::default();
        // 10 s * 1.5 at density 20
        assert_eq!(green_time(&stats(20.0, Trend::Stable), &config), 15_000);
    }

    #[test]
    fn test_green_time_high_band() {
        let config = Config::default();
        assert_eq!(green_time(&stats(30.0, Trend::Stable), &config), 20_000);
        assert_eq!(green_time(&stats(500.0, Trend::Stable), &config), 20_000);
    }

    #[test]
    fn test_green_time_clamps_to_max() {
        let config = Config::default().with_timing(
            TimingConfig::default()
                .with_min_green_ms(40_000)
                .with_max_green_ms(60_000),
        );
        // 40 s * 2.0 would be 80 s, clamped to 60 s.
        assert_eq!(green_time(&stats(100.0, Trend::Stable), &config), 60_000);
    }

    #[test]
    fn test_green_time_never_below_min() {
        let config = Config::default()
            .with_density(crate::config::DensityConfig::default().with_multipliers(0.1, 0.5, 1.0));
        assert_eq!(green_time(&stats(0.0, Trend::Stable), &config), 10_000);
    }

    #[test]
    fn test_green_time_non_adaptive_is_min() {
        let config =
            Config::default().with_timing(TimingConfig::default().with_adaptive(false));
        assert_eq!(green_time(&stats(100.0, Trend::Increasing), &config), 10_000);
    }

    // ========================================================================
    // lane_score
    // ========================================================================

    #[test]
    fn test_score_is_current_count() {
        assert_eq!(lane_score(&stats(12.0, Trend::Stable), false), 12.0);
        assert_eq!(lane_score(&stats(12.0, Trend::Decreasing), false), 12.0);
    }

    #[test]
    fn test_score_trend_bonus() {
        // 35 * 1.2 = 42
        let score = lane_score(&stats(35.0, Trend::Increasing), false);
        assert!((score - 42.0).abs() < 1e-3);
    }

    #[test]
    fn test_score_override_dominates() {
        assert_eq!(lane_score(&stats(999.0, Trend::Increasing), true), 1000.0);
    }

    // ========================================================================
    // select_next_lane
    // ========================================================================

    #[test]
    fn test_select_highest_density_wins() {
        let all = [
            stats(5.0, Trend::Stable),
            stats(30.0, Trend::Stable),
            stats(10.0, Trend::Stable),
        ];
        assert_eq!(select_next_lane(3, 0, &all, |_| false), 1);
    }

    #[test]
    fn test_select_excludes_finished_lane() {
        let all = [stats(50.0, Trend::Stable), stats(1.0, Trend::Stable)];
        // Lane 0 dominates but just finished its green.
        assert_eq!(select_next_lane(2, 0, &all, |_| false), 1);
    }

    #[test]
    fn test_select_trend_bonus_tips_the_scale() {
        // 35 increasing scores 42 and beats a flat 40.
        let all = [
            stats(0.0, Trend::Stable),
            stats(40.0, Trend::Stable),
            stats(35.0, Trend::Increasing),
        ];
        assert_eq!(select_next_lane(3, 0, &all, |_| false), 2);
    }

    #[test]
    fn test_select_override_beats_any_density() {
        let all = [
            stats(0.0, Trend::Stable),
            stats(900.0, Trend::Increasing),
            stats(0.0, Trend::Stable),
        ];
        assert_eq!(select_next_lane(3, 0, &all, |lane| lane == 2), 2);
    }

    #[test]
    fn test_select_tie_breaks_to_lowest_id() {
        let all = [
            stats(7.0, Trend::Stable),
            stats(7.0, Trend::Stable),
            stats(7.0, Trend::Stable),
        ];
        assert_eq!(select_next_lane(3, 0, &all, |_| false), 1);
        assert_eq!(select_next_lane(3, 1, &all, |_| false), 0);
    }

    #[test]
    fn test_select_single_lane_returns_exclude() {
        let all = [stats(3.0, Trend::Stable)];
        assert_eq!(select_next_lane(1, 0, &all, |_| false), 0);
    }
}
