//! Cortex-M4 port implementation
//!
//! SysTick advances the tick and pends PendSV. PendSV runs at the lowest
//! exception priority and is where a running step gets preempted: it calls
//! into the executor, which runs every ready task that outranks the step.
//! Steps started from PendSV run to completion before PendSV can fire again,
//! so a further preemption of those waits for their step boundary.

use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::SCB;

/// PendSV lowest, SysTick one level above so ticks keep counting during
/// preempting steps
pub fn preemption_init() {
    // SAFETY: boot-time priority setup, before SysTick is enabled.
    unsafe {
        let mut p = cortex_m::Peripherals::steal();
        p.SCB.set_priority(SystemHandler::PendSV, 0xF0);
        p.SCB.set_priority(SystemHandler::SysTick, 0xE0);
    }
}

/// Ask for a preemption point once the current interrupt returns
#[inline(always)]
pub fn request_preempt() {
    SCB::set_pendsv();
}

#[cortex_m_rt::exception]
fn PendSV() {
    crate::kernel::tick_preempt();
}

/// Initialize SysTick timer for system tick generation
///
/// # Arguments
/// * `reload` - core clock cycles per tick
///
/// # Example
/// For 125MHz clock with 1000Hz tick rate: reload = 125_000_000 / 1000 = 125_000
pub fn systick_init(reload: u32) {
    // SAFETY: called once during boot, before anything else owns SYST.
    let mut p = unsafe { cortex_m::Peripherals::steal() };

    p.SYST.set_reload(reload.saturating_sub(1));
    p.SYST.clear_current();
    p.SYST.set_clock_source(SystClkSource::Core);
    p.SYST.enable_interrupt();
    p.SYST.enable_counter();
}

/// Start the DWT cycle counter used for per-task runtime accounting
pub fn enable_cycle_counter() {
    // SAFETY: DCB and DWT are only touched here, during boot.
    let mut p = unsafe { cortex_m::Peripherals::steal() };

    p.DCB.enable_trace();
    p.DWT.enable_cycle_counter();
}

/// Sleep until the next interrupt
#[inline(always)]
pub fn wait_for_interrupt() {
    cortex_m::asm::wfi();
}

/// Stop for good. Interrupts stay masked so no task runs again.
pub fn halt() -> ! {
    cortex_m::interrupt::disable();
    loop {
        cortex_m::asm::wfi();
    }
}
