//! Critical section handling and execution-context detection
//!
//! Thin layer over the `critical-section` crate. On Cortex-M the
//! implementation registered in `lib.rs` masks interrupts via PRIMASK; on the
//! host the `std` implementation of the crate is used by tests.

use portable_atomic::{AtomicU8, Ordering};

pub use ::critical_section::CriticalSection;

/// Interrupt nesting as marked by [`IsrScope`] on targets without IPSR
static ISR_NESTING: AtomicU8 = AtomicU8::new(0);

/// Execute a closure with interrupts disabled
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(CriticalSection<'_>) -> R,
{
    ::critical_section::with(f)
}

/// Check if currently executing in an interrupt handler
#[inline]
pub fn is_isr_context() -> bool {
    #[cfg(target_arch = "arm")]
    {
        use cortex_m::peripheral::scb::VectActive;
        cortex_m::peripheral::SCB::vect_active() != VectActive::ThreadMode
    }

    #[cfg(not(target_arch = "arm"))]
    {
        ISR_NESTING.load(Ordering::Acquire) > 0
    }
}

/// Marks the enclosed code as running in interrupt context.
///
/// On ARM the hardware already knows; this only matters for host simulation
/// of GPIO interrupts, where it lets code assert it is not called from an
/// interrupt.
pub struct IsrScope {
    _private: (),
}

impl IsrScope {
    #[inline]
    pub fn enter() -> Self {
        ISR_NESTING.fetch_add(1, Ordering::AcqRel);
        IsrScope { _private: () }
    }
}

impl Drop for IsrScope {
    #[inline]
    fn drop(&mut self) {
        ISR_NESTING.fetch_sub(1, Ordering::AcqRel);
    }
}
