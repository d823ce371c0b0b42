//! Demo server with a simulated detector feed.
//!
//! Runs the full service stack against one intersection:
//! - HTTP API at http://localhost:8080 (state, detections, overrides)
//! - background runner driving the 1 s tick and the override sweep
//! - a simulated camera feed pushing one detection frame per second
//!
//! # Usage
//!
//! ```sh
//! cargo run --example intersection_server --features web
//! ```
//!
//! Then try:
//!
//! ```sh
//! curl localhost:8080/api/state
//! curl -X POST localhost:8080/api/override \
//!     -H 'Content-Type: application/json' -d '{"lane": 2, "kind": "emergency"}'
//! ```
//!
//! # Configuration
//!
//! Edit the `Config::default()` call in `main()` to customize settings.
//! See the commented example for how to use the builder pattern.

use std::sync::Arc;
use std::time::Duration;

use junction::services::{
    run_server_with_state, DetectionFrame, EngineRunner, RunnerConfig, SharedEngineState,
    WebServerConfig,
};
use junction::{Config, DensitySample, IntersectionEngine};
use tokio::sync::mpsc;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        println!("=================================");
        println!("  junction demo intersection");
        println!("=================================");
        println!();

        // Central configuration - modify this for your setup
        let config = Config::default();
        // Example of customization:
        // let config = Config::default()
        //     .with_lanes(6)
        //     .with_timing(junction::TimingConfig::default()
        //         .with_min_green_ms(8_000)
        //         .with_max_green_ms(45_000))
        //     .with_density(junction::DensityConfig::default()
        //         .with_thresholds(3.0, 10.0, 25.0));

        let lanes = config.lanes;
        let engine = IntersectionEngine::new(config)?;
        let state = Arc::new(SharedEngineState::new(engine));

        let (feed, runner) = EngineRunner::new(Arc::clone(&state), RunnerConfig::default());
        tokio::spawn(runner.run());
        tokio::spawn(simulate_feed(feed, lanes));

        let web_config = WebServerConfig::default();
        println!("API listening on http://{}", web_config.addr);
        run_server_with_state(state, web_config).await?;
        Ok(())
    })
}

/// Push one pseudo-random detection frame per second.
///
/// Lane traffic drifts between quiet and congested; roughly one frame in
/// two hundred carries an emergency vehicle so preemption shows up in
/// the logs now and then.
async fn simulate_feed(feed: mpsc::Sender<DetectionFrame>, lanes: usize) {
    let mut seed: u64 = 0x5DEECE66D;
    let mut next = move || {
        seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        seed >> 33
    };

    let mut interval = tokio::time::interval(Duration::from_secs(1));
    loop {
        interval.tick().await;

        let mut frame = Vec::with_capacity(lanes);
        for lane in 0..lanes {
            // Busier lanes on the low ids to keep the rotation interesting.
            let ceiling = 35 - (lane as u64 * 6).min(25);
            let count = (next() % ceiling) as u32;
            let emergency = u32::from(next() % 200 == 0);
            frame.push(DensitySample::with_emergency(count, emergency));
        }

        if feed.send(frame).await.is_err() {
            break;
        }
    }
}
