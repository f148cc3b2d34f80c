//! Per-job liveness flag backing the overlap-skip policy.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Tracks whether a job's previous invocation is still in flight.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    running: Arc<AtomicBool>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the job as running.
    ///
    /// Returns `None` when an invocation is already in flight. The flag is
    /// cleared when the returned guard drops, including on panic unwinding.
    pub fn try_begin(&self) -> Option<RunGuard> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard {
                running: Arc::clone(&self.running),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Clears the running flag on drop.
#[derive(Debug)]
pub struct RunGuard {
    running: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_begin_is_refused() {
        let state = RunState::new();
        assert!(!state.is_running());

        let guard = state.try_begin().expect("first begin");
        assert!(state.is_running());
        assert!(state.try_begin().is_none());

        drop(guard);
        assert!(!state.is_running());
        assert!(state.try_begin().is_some());
    }

    #[test]
    fn test_clones_share_flag() {
        let state = RunState::new();
        let other = state.clone();
        let _guard = state.try_begin().unwrap();
        assert!(other.is_running());
        assert!(other.try_begin().is_none());
    }
}
