//! Collaborator interfaces
//!
//! The filesystem, display engine, audio decoder and clock tree are external.
//! Tasks reach them only through these traits; the board crate implements
//! them and the `mocks` module provides host doubles.

use crate::error::{ClockError, DeviceError};
use crate::fault::BlinkPattern;
use crate::health::LoadShed;
use crate::types::ButtonEvent;

/// Removable storage: block device plus the filesystem on it
pub trait StorageDevice {
    /// Power up and identify the card
    fn bring_up(&mut self) -> Result<(), DeviceError>;
    /// Mount the filesystem. Only called after a successful bring-up.
    fn mount(&mut self) -> Result<(), DeviceError>;
    fn service_tick(&mut self);
}

pub trait DisplayDevice {
    fn bring_up(&mut self) -> Result<(), DeviceError>;
    /// Build the initial screen; called once after bring-up
    fn presentation_setup(&mut self);
    fn redraw_tick(&mut self);
    /// Button input routed to the user interface
    fn on_button(&mut self, event: ButtonEvent);
}

pub trait AudioDevice {
    fn bring_up(&mut self) -> Result<(), DeviceError>;
    /// Feed the output buffer; must be called before it underruns
    fn playback_tick(&mut self);
}

/// Board-level services used during boot and by the supervisor
pub trait Platform {
    /// Program the core clock. Failure is fatal.
    fn program_clocks(&mut self, hz: u32) -> Result<(), ClockError>;

    /// Enable instruction and data caches
    fn enable_caches(&mut self) {}

    /// Enable flash prefetch
    fn enable_prefetch(&mut self) {}

    /// Heap/pool memory currently free
    fn free_memory_bytes(&self) -> u32;

    /// Drive the error indicator LED
    fn indicate(&mut self, _pattern: BlinkPattern) {}
}

/// Reaction to free memory falling below the configured threshold.
///
/// Called from the supervisor once per health window while the condition
/// lasts.
pub trait LowMemoryHook {
    fn on_low_memory(&mut self, free_bytes: u32);

    /// First window back above the threshold
    fn on_recovered(&mut self) {}
}

/// Default hook: engage load shedding while memory is low
pub struct ShedLoad<'a> {
    shed: &'a LoadShed,
}

impl<'a> ShedLoad<'a> {
    pub fn new(shed: &'a LoadShed) -> Self {
        Self { shed }
    }
}

impl LowMemoryHook for ShedLoad<'_> {
    fn on_low_memory(&mut self, free_bytes: u32) {
        crate::warn!("Low memory: {} bytes free, shedding load", free_bytes);
        self.shed.engage();
    }

    fn on_recovered(&mut self) {
        crate::info!("Memory recovered, load shedding off");
        self.shed.release();
    }
}

impl<T: StorageDevice + ?Sized> StorageDevice for &mut T {
    fn bring_up(&mut self) -> Result<(), DeviceError> {
        (**self).bring_up()
    }

    fn mount(&mut self) -> Result<(), DeviceError> {
        (**self).mount()
    }

    fn service_tick(&mut self) {
        (**self).service_tick()
    }
}

impl<T: DisplayDevice + ?Sized> DisplayDevice for &mut T {
    fn bring_up(&mut self) -> Result<(), DeviceError> {
        (**self).bring_up()
    }

    fn presentation_setup(&mut self) {
        (**self).presentation_setup()
    }

    fn redraw_tick(&mut self) {
        (**self).redraw_tick()
    }

    fn on_button(&mut self, event: ButtonEvent) {
        (**self).on_button(event)
    }
}

impl<T: AudioDevice + ?Sized> AudioDevice for &mut T {
    fn bring_up(&mut self) -> Result<(), DeviceError> {
        (**self).bring_up()
    }

    fn playback_tick(&mut self) {
        (**self).playback_tick()
    }
}
