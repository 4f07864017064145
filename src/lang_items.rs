//! Language items and default exception handlers

// When defmt feature is enabled on ARM targets, use defmt_rtt and panic_probe
#[cfg(all(feature = "defmt", target_arch = "arm"))]
use defmt_rtt as _;

#[cfg(all(feature = "defmt", target_arch = "arm"))]
use panic_probe as _;

// Defmt panic handler
#[cfg(all(feature = "defmt", target_arch = "arm"))]
#[defmt::panic_handler]
fn defmt_panic() -> ! {
    cortex_m::asm::udf()
}

// Panic handler when defmt is disabled: park the core
#[cfg(all(not(feature = "defmt"), target_arch = "arm"))]
use panic_halt as _;

// A hard fault means memory or bus state can no longer be trusted
#[cfg(target_arch = "arm")]
#[cortex_m_rt::exception]
unsafe fn HardFault(_ef: &cortex_m_rt::ExceptionFrame) -> ! {
    crate::port::halt()
}

// Log lines are stamped with the system tick (milliseconds)
#[cfg(all(feature = "defmt", target_arch = "arm"))]
defmt::timestamp!("{=u32:ms}", crate::time::ticks());
