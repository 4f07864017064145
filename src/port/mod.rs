//! Port layer - CPU-specific operations
//!
//! The executor itself is portable; only tick generation, the preemption
//! interrupt, the cycle counter used for runtime accounting, the idle wait
//! and the fatal halt touch the core.

#[cfg(target_arch = "arm")]
pub mod cortex_m4;

#[cfg(target_arch = "arm")]
pub use cortex_m4::*;

// Stub implementations for non-ARM targets (for testing)
#[cfg(not(target_arch = "arm"))]
pub mod stub {
    pub fn systick_init(_reload: u32) {}

    pub fn preemption_init() {}

    pub fn request_preempt() {}

    pub fn enable_cycle_counter() {}

    pub fn wait_for_interrupt() {
        core::hint::spin_loop();
    }

    pub fn halt() -> ! {
        panic!("system halted");
    }
}

#[cfg(not(target_arch = "arm"))]
pub use stub::*;
