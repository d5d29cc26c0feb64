//! The "at most one active coordinator" flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

static PROCESS_SLOT: LazyLock<Arc<ActivationSlot>> =
    LazyLock::new(|| Arc::new(ActivationSlot::new()));

/// Guards a scope in which at most one [`Coordinator`](crate::Coordinator)
/// may be active.
///
/// Production code uses [`ActivationSlot::process`]. Tests that emulate
/// several ranks inside one process give each emulated rank its own slot.
#[derive(Debug, Default)]
pub struct ActivationSlot {
    active: AtomicBool,
}

impl ActivationSlot {
    /// A fresh, unoccupied slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide slot.
    pub fn process() -> Arc<ActivationSlot> {
        Arc::clone(&PROCESS_SLOT)
    }

    /// Whether a coordinator currently holds this slot.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Claim the slot. Returns `false` if it is already held.
    pub(crate) fn try_acquire(&self) -> bool {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn release(&self) {
        self.active.store(false, Ordering::Release);
    }
}
