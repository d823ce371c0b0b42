//! HTTP API and async runner for the intersection engine.
//!
//! The service layer wraps a single `IntersectionEngine` in
//! `SharedEngineState` (a `Mutex` plus one `Instant` time base) so the
//! web handlers and the background runner all see the same intersection:
//!
//! ```ignore
//! use std::sync::Arc;
//! use junction::services::{EngineRunner, SharedEngineState, build_router};
//!
//! let state = Arc::new(SharedEngineState::new(engine));
//!
//! // HTTP handlers and the runner share the same state
//! let router = build_router(Arc::clone(&state), &web_config);
//! let (feed, runner) = EngineRunner::new(Arc::clone(&state), runner_config);
//! ```
//!
//! Detection feeds are serialized through the runner's mpsc channel, so
//! multiple cameras never race on ingest ordering.

pub mod api;
pub mod runner;
pub mod shared;
pub mod web;

// Re-exports
pub use api::*;
pub use runner::*;
pub use shared::*;
pub use web::*;
