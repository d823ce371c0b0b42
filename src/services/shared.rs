//! Shared state wrapping one engine for all services.
//!
//! `SharedEngineState` gives the HTTP handlers and the background runner
//! thread-safe access to a single `IntersectionEngine`, with one `Instant`
//! time base so every service computes the same `now_ms`.

use std::sync::Mutex;
use std::time::Instant;

use crate::engine::{IntersectionEngine, SignalSnapshot};

/// Thread-safe wrapper around one intersection engine.
///
/// # Thread Safety
///
/// Uses a `Mutex` rather than `RwLock` because the runner writes every
/// second (tick, ingest, sweep), making writer starvation the bigger
/// concern. The closure pattern keeps the lock from being held across
/// await points.
pub struct SharedEngineState {
    /// The engine - needs mutable access for ingest, tick, and overrides
    engine: Mutex<IntersectionEngine>,

    /// Time base for all `now_ms()` calls across all services
    start_time: Instant,
}

impl SharedEngineState {
    /// Create shared state wrapping an engine.
    ///
    /// `start_time` is set to `Instant::now()`, which matches the
    /// engine's phase timestamps beginning at 0: `now_ms()` values start
    /// near zero right after construction.
    pub fn new(engine: IntersectionEngine) -> Self {
        Self {
            engine: Mutex::new(engine),
            start_time: Instant::now(),
        }
    }

    /// Milliseconds elapsed since the state was created.
    ///
    /// The unified time source for handlers and the runner; mixing time
    /// bases would skew phase boundaries and override expiries.
    #[inline]
    pub fn now_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    /// The creation instant (for external time calculations if needed).
    #[inline]
    pub fn start_time(&self) -> Instant {
        self.start_time
    }

    /// Access the engine under the lock.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let now_ms = state.now_ms();
    /// let overrides = state.with_engine(|engine| engine.sweep_expired(now_ms));
    /// ```
    pub fn with_engine<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut IntersectionEngine) -> R,
    {
        let mut guard = self.engine.lock().unwrap();
        f(&mut guard)
    }

    /// A snapshot at the current time, without advancing the plan.
    pub fn snapshot(&self) -> SignalSnapshot {
        let now_ms = self.now_ms();
        let guard = self.engine.lock().unwrap();
        guard.snapshot(now_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::density::DensitySample;
    use crate::overrides::OverrideKind;
    use std::sync::Arc;

    fn shared() -> SharedEngineState {
        SharedEngineState::new(IntersectionEngine::new(Config::default()).unwrap())
    }

    #[test]
    fn test_shared_state_creation() {
        let state = shared();
        assert!(state.now_ms() < 100); // Should be very small right after creation
    }

    #[test]
    fn test_with_engine_access() {
        let state = shared();
        state.with_engine(|engine| {
            assert_eq!(engine.config().lanes, 4);
        });
    }

    #[test]
    fn test_snapshot() {
        let state = shared();
        let snapshot = state.snapshot();
        assert_eq!(snapshot.active_lane, 0);
        assert_eq!(snapshot.lanes.len(), 4);
    }

    #[test]
    fn test_changes_visible_across_accesses() {
        let state = shared();
        let now = state.now_ms();
        state.with_engine(|engine| {
            engine.request_override(2, OverrideKind::Emergency, now);
        });
        assert_eq!(state.snapshot().overrides.len(), 1);
    }

    #[test]
    fn test_start_time_accessible() {
        let state = shared();
        assert!(state.start_time().elapsed().as_millis() < 100);
    }

    #[test]
    fn test_concurrent_access() {
        use std::thread;

        let state = Arc::new(shared());
        let state1 = Arc::clone(&state);
        let state2 = Arc::clone(&state);

        let handle1 = thread::spawn(move || {
            for i in 0..10 {
                let now = state1.now_ms();
                state1.with_engine(|engine| {
                    let frame = vec![DensitySample::vehicles(i); 4];
                    engine.ingest(&frame, now);
                    engine.tick(now);
                });
            }
        });

        let handle2 = thread::spawn(move || {
            for _ in 0..10 {
                let _ = state2.snapshot();
                let _ = state2.now_ms();
            }
        });

        handle1.join().unwrap();
        handle2.join().unwrap();

        // Should complete without deadlock or panic
        assert_eq!(state.snapshot().lanes.len(), 4);
    }
}
