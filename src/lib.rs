//! Task core for a handheld audio player
//!
//! Four cooperating tasks on one core under a fixed-priority executor:
//! - Supervisor: platform bring-up, health snapshot, low-memory degradation
//! - Storage: card and filesystem, reports its failures to the fault channel
//! - Audio: playback, best effort
//! - Presentation (optional): display redraws and button input
//!
//! Each task locks its one peripheral around every service tick and never
//! holds two locks. Button edges are classified in interrupt context and
//! handed to the presentation task through per-button SPSC queues.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

// ============ Critical Section ============

#[cfg(target_arch = "arm")]
mod cs_impl {
    use cortex_m::interrupt;
    use cortex_m::register::primask;
    use critical_section::{set_impl, Impl, RawRestoreState};

    struct SingleCoreCriticalSection;
    set_impl!(SingleCoreCriticalSection);

    unsafe impl Impl for SingleCoreCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            let was_active = primask::read().is_active();
            interrupt::disable();
            was_active
        }

        unsafe fn release(was_active: RawRestoreState) {
            if was_active {
                unsafe { interrupt::enable() }
            }
        }
    }
}

// ============ Modules ============

pub mod log;
mod lang_items;

pub mod core;
pub mod drivers;
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
pub mod port;
pub mod sync;
pub mod system;
pub mod tasks;

// ============ Re-exports ============

pub use self::core::config;
pub use self::core::config::*;
pub use self::core::critical;
pub use self::core::error;
pub use self::core::error::{BootError, FaultCode, OsError, OsResult};
pub use self::core::fault;
pub use self::core::health;
pub use self::core::kernel;
pub use self::core::kernel::Executor;
pub use self::core::prio;
pub use self::core::sched;
pub use self::core::task;
pub use self::core::time;
pub use self::core::types;
pub use self::core::types::*;
pub use self::system::{Diagnostics, Shared, System, TaskSet};
