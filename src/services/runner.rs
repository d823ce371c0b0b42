//! Background runner driving the engine from an async loop.
//!
//! The runner owns three periodic concerns:
//! - draining the detection channel into `ingest` (one channel serializes
//!   every camera feed, so frames never race on ordering)
//! - advancing the signal plan on the tick interval
//! - sweeping expired overrides on the sweep interval
//!
//! Everything runs against the same [`SharedEngineState`] the web
//! handlers use; the tick keeps running even when the detection feed
//! goes quiet.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::density::DensitySample;

use super::shared::SharedEngineState;

/// One detector frame: a sample per lane, in lane-id order.
pub type DetectionFrame = Vec<DensitySample>;

// ============================================================================
// Runner Config
// ============================================================================

/// Cadence configuration for the runner.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// How often the signal plan advances
    pub tick_interval_ms: u64,
    /// How often expired overrides are swept
    pub sweep_interval_ms: u64,
    /// Detection channel depth before senders back-pressure
    pub channel_capacity: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
            sweep_interval_ms: 1_000,
            channel_capacity: 64,
        }
    }
}

impl RunnerConfig {
    /// Set the tick interval
    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = ms;
        self
    }

    /// Set the sweep interval
    pub fn with_sweep_interval_ms(mut self, ms: u64) -> Self {
        self.sweep_interval_ms = ms;
        self
    }

    /// Set the detection channel capacity
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }
}

// ============================================================================
// Engine Runner
// ============================================================================

/// Drives ingest, tick, and sweep for a shared engine.
pub struct EngineRunner {
    state: Arc<SharedEngineState>,
    rx: mpsc::Receiver<DetectionFrame>,
    config: RunnerConfig,
}

impl EngineRunner {
    /// Create a runner and the sender side of its detection channel.
    ///
    /// Clone the sender once per camera feed; frames from all of them
    /// are ingested in arrival order.
    pub fn new(
        state: Arc<SharedEngineState>,
        config: RunnerConfig,
    ) -> (mpsc::Sender<DetectionFrame>, Self) {
        let (tx, rx) = mpsc::channel(config.channel_capacity);
        (tx, Self { state, rx, config })
    }

    /// Run the ingest/tick/sweep loop. Never returns on its own;
    /// intended to be spawned: `tokio::spawn(runner.run())`.
    pub async fn run(mut self) {
        let mut tick = interval(Duration::from_millis(self.config.tick_interval_ms));
        let mut sweep = interval(Duration::from_millis(self.config.sweep_interval_ms));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            tick_ms = self.config.tick_interval_ms,
            sweep_ms = self.config.sweep_interval_ms,
            "engine runner started"
        );

        loop {
            tokio::select! {
                // Branch disabled once the channel closes; ticking continues.
                Some(frame) = self.rx.recv() => {
                    self.ingest(frame);
                }
                _ = tick.tick() => {
                    let now_ms = self.state.now_ms();
                    self.state.with_engine(|engine| {
                        engine.tick(now_ms);
                    });
                }
                _ = sweep.tick() => {
                    let now_ms = self.state.now_ms();
                    let removed = self.state.with_engine(|engine| engine.sweep_expired(now_ms));
                    if removed > 0 {
                        tracing::debug!(removed, "swept expired overrides");
                    }
                }
            }
        }
    }

    /// Ingest one frame, dropping malformed ones instead of panicking.
    fn ingest(&self, frame: DetectionFrame) {
        let lanes = self.state.with_engine(|engine| engine.config().lanes);
        if frame.len() != lanes {
            tracing::warn!(
                got = frame.len(),
                expected = lanes,
                "dropping detection frame with wrong lane count"
            );
            return;
        }
        let now_ms = self.state.now_ms();
        self.state.with_engine(|engine| {
            engine.ingest(&frame, now_ms);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, OverrideConfig};
    use crate::engine::IntersectionEngine;
    use crate::overrides::OverrideKind;

    fn shared(config: Config) -> Arc<SharedEngineState> {
        Arc::new(SharedEngineState::new(
            IntersectionEngine::new(config).unwrap(),
        ))
    }

    fn fast_runner_config() -> RunnerConfig {
        RunnerConfig::default()
            .with_tick_interval_ms(5)
            .with_sweep_interval_ms(5)
    }

    #[tokio::test]
    async fn test_runner_ingests_and_ticks() {
        let state = shared(Config::default());
        let (feed, runner) = EngineRunner::new(Arc::clone(&state), fast_runner_config());
        let handle = tokio::spawn(runner.run());

        feed.send(vec![DensitySample::vehicles(3); 4]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(state.with_engine(|engine| engine.stats().ticks) > 0);
        assert_eq!(state.with_engine(|engine| engine.stats().total_vehicles), 12);
        handle.abort();
    }

    #[tokio::test]
    async fn test_runner_drops_malformed_frames() {
        let state = shared(Config::default());
        let (feed, runner) = EngineRunner::new(Arc::clone(&state), fast_runner_config());
        let handle = tokio::spawn(runner.run());

        // Only 2 samples for a 4-lane intersection.
        feed.send(vec![DensitySample::vehicles(9); 2]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(state.with_engine(|engine| engine.stats().total_vehicles), 0);
        handle.abort();
    }

    #[tokio::test]
    async fn test_runner_sweeps_expired_overrides() {
        let config = Config::default()
            .with_overrides(OverrideConfig::default().with_priority_duration_ms(20));
        let state = shared(config);

        let now = state.now_ms();
        state.with_engine(|engine| {
            engine.request_override(2, OverrideKind::Emergency, now);
        });
        assert_eq!(state.snapshot().overrides.len(), 1);

        let (_feed, runner) = EngineRunner::new(Arc::clone(&state), fast_runner_config());
        let handle = tokio::spawn(runner.run());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(state.snapshot().overrides.is_empty());
        handle.abort();
    }

    #[tokio::test]
    async fn test_runner_keeps_ticking_after_feed_closes() {
        let state = shared(Config::default());
        let (feed, runner) = EngineRunner::new(Arc::clone(&state), fast_runner_config());
        let handle = tokio::spawn(runner.run());

        drop(feed);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(state.with_engine(|engine| engine.stats().ticks) > 0);
        handle.abort();
    }
}
