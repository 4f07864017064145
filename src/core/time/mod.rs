//! Time management module
//!
//! Provides the system tick, tick/millisecond conversion and the
//! [`TimeSource`] seam the executor reads time through. On target the tick is
//! advanced by the SysTick exception; host simulations supply their own source.

use portable_atomic::{AtomicU32, Ordering};

use crate::config::CFG_TICK_RATE_HZ;
use crate::types::Tick;

/// Where the executor gets the current tick and runtime counter from
pub trait TimeSource {
    /// Current system tick
    fn now(&self) -> Tick;

    /// Free-running counter used for per-task runtime accounting.
    ///
    /// Any unit works as long as it is monotonic modulo wrap-around and finer
    /// than a tick; only differences are used.
    fn runtime_counter(&self) -> u32;
}

/// Tick counter advanced by [`os_tick_handler`]
static TICKS: AtomicU32 = AtomicU32::new(0);

/// Current tick count
#[inline]
pub fn ticks() -> Tick {
    TICKS.load(Ordering::Relaxed)
}

/// Tick handler; call once per tick from the timer interrupt
#[inline]
pub fn os_tick_handler() -> Tick {
    TICKS.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
}

/// Time source backed by the SysTick counter and the DWT cycle counter
#[derive(Debug, Default, Clone, Copy)]
pub struct SysTickTime;

impl TimeSource for SysTickTime {
    #[inline]
    fn now(&self) -> Tick {
        ticks()
    }

    #[inline]
    fn runtime_counter(&self) -> u32 {
        #[cfg(target_arch = "arm")]
        {
            cortex_m::peripheral::DWT::cycle_count()
        }

        #[cfg(not(target_arch = "arm"))]
        {
            ticks()
        }
    }
}

/// Milliseconds to ticks, rounding down
#[inline]
pub const fn ms_to_ticks(ms: u32) -> Tick {
    ((ms as u64 * CFG_TICK_RATE_HZ as u64) / 1000) as Tick
}

/// Ticks to milliseconds, rounding down
#[inline]
pub const fn ticks_to_ms(ticks: Tick) -> u32 {
    ((ticks as u64 * 1000) / CFG_TICK_RATE_HZ as u64) as u32
}

/// Has `now` reached `deadline`, tolerating one wrap of the tick counter
#[inline]
pub const fn tick_reached(now: Tick, deadline: Tick) -> bool {
    (now.wrapping_sub(deadline) as i32) >= 0
}

/// SysTick exception handler
#[cfg(target_arch = "arm")]
#[cortex_m_rt::exception]
fn SysTick() {
    os_tick_handler();
    crate::port::request_preempt();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_tick_is_one_millisecond() {
        assert_eq!(ms_to_ticks(16), 16);
        assert_eq!(ticks_to_ms(1000), 1000);
    }

    #[test]
    fn deadlines_survive_wraparound() {
        assert!(tick_reached(5, 5));
        assert!(!tick_reached(4, 5));
        assert!(tick_reached(3, u32::MAX - 2));
        assert!(!tick_reached(u32::MAX - 2, 3));
    }
}
