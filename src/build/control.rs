use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

/// Lifecycle of a route build, observable from other threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Idle,
    BuildingBlocks,
    PostProcessing,
    Finalizing,
    Done,
    Cancelled,
}

/// Shared handle for progress reporting and cooperative cancellation.
/// The builder polls `is_cancelled` between groups of blocks, so a
/// cancel request takes effect at the next block boundary.
#[derive(Debug, Default)]
pub struct BuildControl {
    cancel: AtomicBool,
    progress: AtomicU64,
    phase: AtomicU8,
}

impl BuildControl {
    pub fn new() -> BuildControl {
        Default::default()
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Fraction of the build completed, in `0.0 ..= 1.0`,
    /// monotonically nondecreasing over the build.
    pub fn progress(&self) -> f64 {
        f64::from_bits(self.progress.load(Ordering::SeqCst))
    }

    pub(crate) fn set_progress(&self, value: f64) {
        self.progress.store(value.to_bits(), Ordering::SeqCst);
    }

    pub fn phase(&self) -> BuildPhase {
        match self.phase.load(Ordering::SeqCst) {
            0 => BuildPhase::Idle,
            1 => BuildPhase::BuildingBlocks,
            2 => BuildPhase::PostProcessing,
            3 => BuildPhase::Finalizing,
            4 => BuildPhase::Done,
            _ => BuildPhase::Cancelled,
        }
    }

    pub(crate) fn set_phase(&self, phase: BuildPhase) {
        let value = match phase {
            BuildPhase::Idle => 0,
            BuildPhase::BuildingBlocks => 1,
            BuildPhase::PostProcessing => 2,
            BuildPhase::Finalizing => 3,
            BuildPhase::Done => 4,
            BuildPhase::Cancelled => 5,
        };
        self.phase.store(value, Ordering::SeqCst);
    }
}
