//! Mock implementations for testing
//!
//! Deterministic doubles for every collaborator trait plus a simulated clock.
//! The doubles keep their state in `Cell`s and the traits are implemented for
//! shared references, so a test can keep inspecting (and reconfiguring) a
//! device while a task owns a reference to it.

use core::cell::{Cell, RefCell};

use crate::drivers::{AudioDevice, DisplayDevice, LowMemoryHook, Platform, StorageDevice};
use crate::error::{ClockError, DeviceError, OsResult};
use crate::fault::BlinkPattern;
use crate::kernel::{Executor, Preempt};
use crate::time::TimeSource;
use crate::types::{ButtonEvent, Tick};

/// Runtime counter units per simulated tick
pub const SIM_CYCLES_PER_TICK: u32 = 1000;

/// Simulated clock. Time only moves when the test says so.
///
/// Inside [`SimTime::run`] every [`SimTime::advance`] also plays the tick
/// interrupt: a device double that advances time from inside its service
/// call gets preempted exactly as it would on target.
#[derive(Default)]
pub struct SimTime {
    now: Cell<Tick>,
    cycles: Cell<u32>,
    tick_hook: Cell<Option<&'static dyn Preempt>>,
}

impl SimTime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by `ticks`, all of it counted as elapsed cycles, taking the
    /// tick interrupt after each one
    pub fn advance(&self, ticks: Tick) {
        for _ in 0..ticks {
            self.now.set(self.now.get().wrapping_add(1));
            self.cycles.set(self.cycles.get().wrapping_add(SIM_CYCLES_PER_TICK));
            if let Some(exec) = self.tick_hook.get() {
                exec.preempt();
            }
        }
    }

    /// Spend cycles without moving the tick, e.g. inside a task step
    pub fn burn(&self, cycles: u32) {
        self.cycles.set(self.cycles.get().wrapping_add(cycles));
    }

    pub fn now(&self) -> Tick {
        self.now.get()
    }

    /// Poll once per tick for `ticks` ticks, idling between polls
    pub fn run(&self, exec: &Executor<'_, &SimTime>, ticks: Tick) -> OsResult<()> {
        let hook: &dyn Preempt = exec;
        // SAFETY: the extended reference lives only in `tick_hook`, and
        // `_installed` takes it out again before `exec` is released.
        let hook = unsafe { core::mem::transmute::<&dyn Preempt, &'static dyn Preempt>(hook) };
        let _installed = TickHookGuard::install(self, hook);

        for _ in 0..ticks {
            exec.poll()?;
            exec.idle(|| self.advance(1));
        }
        Ok(())
    }
}

struct TickHookGuard<'s> {
    sim: &'s SimTime,
    previous: Option<&'static dyn Preempt>,
}

impl<'s> TickHookGuard<'s> {
    fn install(sim: &'s SimTime, hook: &'static dyn Preempt) -> Self {
        let previous = sim.tick_hook.replace(Some(hook));
        Self { sim, previous }
    }
}

impl Drop for TickHookGuard<'_> {
    fn drop(&mut self) {
        self.sim.tick_hook.set(self.previous);
    }
}

impl TimeSource for &SimTime {
    fn now(&self) -> Tick {
        self.now.get()
    }

    fn runtime_counter(&self) -> u32 {
        self.cycles.get()
    }
}

/// Storage double: configurable bring-up and mount results
pub struct MockStorage {
    init: Cell<Result<(), DeviceError>>,
    mount: Cell<Result<(), DeviceError>>,
    bring_ups: Cell<u32>,
    mounts: Cell<u32>,
    ticks: Cell<u32>,
}

impl MockStorage {
    pub fn new(init: Result<(), DeviceError>, mount: Result<(), DeviceError>) -> Self {
        Self {
            init: Cell::new(init),
            mount: Cell::new(mount),
            bring_ups: Cell::new(0),
            mounts: Cell::new(0),
            ticks: Cell::new(0),
        }
    }

    pub fn healthy() -> Self {
        Self::new(Ok(()), Ok(()))
    }

    /// No card in the slot
    pub fn absent() -> Self {
        Self::new(Err(DeviceError::NoDevice), Ok(()))
    }

    /// Card answers but the filesystem is unreadable
    pub fn corrupt() -> Self {
        Self::new(Ok(()), Err(DeviceError::Corrupt))
    }

    pub fn set_init(&self, result: Result<(), DeviceError>) {
        self.init.set(result);
    }

    pub fn set_mount(&self, result: Result<(), DeviceError>) {
        self.mount.set(result);
    }

    pub fn bring_ups(&self) -> u32 {
        self.bring_ups.get()
    }

    pub fn mounts(&self) -> u32 {
        self.mounts.get()
    }

    pub fn service_ticks(&self) -> u32 {
        self.ticks.get()
    }
}

impl StorageDevice for &MockStorage {
    fn bring_up(&mut self) -> Result<(), DeviceError> {
        self.bring_ups.set(self.bring_ups.get() + 1);
        self.init.get()
    }

    fn mount(&mut self) -> Result<(), DeviceError> {
        self.mounts.set(self.mounts.get() + 1);
        self.mount.get()
    }

    fn service_tick(&mut self) {
        self.ticks.set(self.ticks.get() + 1);
    }
}

pub struct MockAudio {
    init: Cell<Result<(), DeviceError>>,
    ticks: Cell<u32>,
}

impl MockAudio {
    pub fn new(init: Result<(), DeviceError>) -> Self {
        Self {
            init: Cell::new(init),
            ticks: Cell::new(0),
        }
    }

    pub fn healthy() -> Self {
        Self::new(Ok(()))
    }

    pub fn playback_ticks(&self) -> u32 {
        self.ticks.get()
    }
}

impl AudioDevice for &MockAudio {
    fn bring_up(&mut self) -> Result<(), DeviceError> {
        self.init.get()
    }

    fn playback_tick(&mut self) {
        self.ticks.set(self.ticks.get() + 1);
    }
}

/// Display double; records the button events it receives
pub struct MockDisplay {
    init: Cell<Result<(), DeviceError>>,
    setups: Cell<u32>,
    redraws: Cell<u32>,
    buttons: RefCell<heapless::Vec<ButtonEvent, 32>>,
}

impl MockDisplay {
    pub fn new(init: Result<(), DeviceError>) -> Self {
        Self {
            init: Cell::new(init),
            setups: Cell::new(0),
            redraws: Cell::new(0),
            buttons: RefCell::new(heapless::Vec::new()),
        }
    }

    pub fn healthy() -> Self {
        Self::new(Ok(()))
    }

    pub fn setups(&self) -> u32 {
        self.setups.get()
    }

    pub fn redraws(&self) -> u32 {
        self.redraws.get()
    }

    /// Button events received so far, oldest first
    pub fn buttons(&self) -> heapless::Vec<ButtonEvent, 32> {
        self.buttons.borrow().clone()
    }
}

impl DisplayDevice for &MockDisplay {
    fn bring_up(&mut self) -> Result<(), DeviceError> {
        self.init.get()
    }

    fn presentation_setup(&mut self) {
        self.setups.set(self.setups.get() + 1);
    }

    fn redraw_tick(&mut self) {
        self.redraws.set(self.redraws.get() + 1);
    }

    fn on_button(&mut self, event: ButtonEvent) {
        // Oldest events are kept; a test never needs more than the capacity.
        let _ = self.buttons.borrow_mut().push(event);
    }
}

/// Platform double with adjustable free memory
pub struct MockPlatform {
    clocks: Cell<Result<(), ClockError>>,
    programmed_hz: Cell<Option<u32>>,
    caches: Cell<bool>,
    prefetch: Cell<bool>,
    free_memory: Cell<u32>,
    indications: RefCell<heapless::Vec<BlinkPattern, 16>>,
}

impl MockPlatform {
    pub fn new(free_memory: u32) -> Self {
        Self {
            clocks: Cell::new(Ok(())),
            programmed_hz: Cell::new(None),
            caches: Cell::new(false),
            prefetch: Cell::new(false),
            free_memory: Cell::new(free_memory),
            indications: RefCell::new(heapless::Vec::new()),
        }
    }

    /// Clock programming will fail with `err`
    pub fn with_clock_failure(self, err: ClockError) -> Self {
        self.clocks.set(Err(err));
        self
    }

    pub fn set_free_memory(&self, bytes: u32) {
        self.free_memory.set(bytes);
    }

    pub fn programmed_hz(&self) -> Option<u32> {
        self.programmed_hz.get()
    }

    pub fn caches_enabled(&self) -> bool {
        self.caches.get()
    }

    pub fn prefetch_enabled(&self) -> bool {
        self.prefetch.get()
    }

    /// Indicator patterns shown so far, oldest first
    pub fn indications(&self) -> heapless::Vec<BlinkPattern, 16> {
        self.indications.borrow().clone()
    }
}

impl Platform for &MockPlatform {
    fn program_clocks(&mut self, hz: u32) -> Result<(), ClockError> {
        let result = self.clocks.get();
        if result.is_ok() {
            self.programmed_hz.set(Some(hz));
        }
        result
    }

    fn enable_caches(&mut self) {
        self.caches.set(true);
    }

    fn enable_prefetch(&mut self) {
        self.prefetch.set(true);
    }

    fn free_memory_bytes(&self) -> u32 {
        self.free_memory.get()
    }

    fn indicate(&mut self, pattern: BlinkPattern) {
        let _ = self.indications.borrow_mut().push(pattern);
    }
}

/// Low-memory hook that only counts calls
#[derive(Default)]
pub struct RecordingHook {
    low: Cell<u32>,
    recovered: Cell<u32>,
    last_free: Cell<Option<u32>>,
}

impl RecordingHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn low_memory_calls(&self) -> u32 {
        self.low.get()
    }

    pub fn recovered_calls(&self) -> u32 {
        self.recovered.get()
    }

    pub fn last_free(&self) -> Option<u32> {
        self.last_free.get()
    }
}

impl LowMemoryHook for &RecordingHook {
    fn on_low_memory(&mut self, free_bytes: u32) {
        self.low.set(self.low.get() + 1);
        self.last_free.set(Some(free_bytes));
    }

    fn on_recovered(&mut self) {
        self.recovered.set(self.recovered.get() + 1);
    }
}
