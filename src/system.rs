//! System bring-up and wiring
//!
//! [`Shared`] holds the state every task can see: the lock set, the fault
//! channel, the health cell, the load-shed flag and the button registry the
//! GPIO interrupt feeds. It is const-constructible so the board crate can
//! keep it in a `static`.
//!
//! Boot order:
//! 1. validate the configuration
//! 2. program the clocks (fatal on failure)
//! 3. enable caches and prefetch if configured
//! 4. spawn the tasks into an [`Executor`] and run it

use crate::config::{SystemConfig, CFG_TICK_RATE_HZ};
use crate::drivers::{AudioDevice, DisplayDevice, LowMemoryHook, Platform, StorageDevice};
use crate::error::{BootError, FaultCode, OsResult};
use crate::fault::FaultChannel;
use crate::health::{HealthCell, HealthSnapshot, LoadShed};
use crate::kernel::Executor;
use crate::sync::button::{ButtonEvents, ButtonRegistry};
use crate::sync::lock::LockSet;
use crate::tasks::{AudioTask, PresentationTask, StorageTask, SupervisorTask};
use crate::time::TimeSource;
use crate::types::RestartPolicy;

pub struct Shared {
    pub locks: LockSet,
    pub faults: FaultChannel,
    pub health: HealthCell,
    pub load_shed: LoadShed,
    pub buttons: ButtonRegistry,
}

impl Shared {
    pub const fn new() -> Self {
        Self {
            locks: LockSet::new(),
            faults: FaultChannel::new(),
            health: HealthCell::new(),
            load_shed: LoadShed::new(),
            buttons: ButtonRegistry::new(),
        }
    }

    pub fn diagnostics(&self) -> Diagnostics<'_> {
        Diagnostics { shared: self }
    }
}

impl Default for Shared {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view for external diagnostics
#[derive(Clone, Copy)]
pub struct Diagnostics<'a> {
    shared: &'a Shared,
}

impl Diagnostics<'_> {
    pub fn fault(&self) -> FaultCode {
        self.shared.faults.current()
    }

    /// Last published snapshot; stale between recomputations
    pub fn snapshot(&self) -> HealthSnapshot {
        self.shared.health.load()
    }

    pub fn uptime_ms(&self) -> u32 {
        self.snapshot().uptime_ms
    }

    pub fn cpu_utilization_percent(&self) -> u8 {
        self.snapshot().cpu_utilization_percent
    }

    pub fn free_memory_bytes(&self) -> u32 {
        self.snapshot().free_memory_bytes
    }
}

/// A booted system: configuration accepted and clocks running
pub struct System<'a> {
    shared: &'a Shared,
    config: SystemConfig,
}

impl<'a> System<'a> {
    /// Platform bring-up. Nothing is spawned if this fails.
    pub fn boot<P: Platform>(shared: &'a Shared, config: SystemConfig, platform: &mut P) -> Result<Self, BootError> {
        config.validate()?;

        let hz = config.effective_cpu_hz();
        if let Err(err) = platform.program_clocks(hz) {
            crate::error!("clock bring-up at {} Hz failed: {}", hz, err);
            return Err(BootError::Clock(err));
        }

        if config.enable_caches {
            platform.enable_caches();
        }
        if config.enable_prefetch {
            platform.enable_prefetch();
        }

        crate::info!("platform up at {} Hz", hz);
        Ok(Self { shared, config })
    }

    /// [`System::boot`], halting the core on failure
    pub fn boot_or_halt<P: Platform>(shared: &'a Shared, config: SystemConfig, platform: &mut P) -> Self {
        match Self::boot(shared, config, platform) {
            Ok(system) => system,
            Err(_err) => {
                crate::error!("fatal: {}", _err);
                crate::port::halt()
            }
        }
    }

    #[inline]
    pub fn shared(&self) -> &'a Shared {
        self.shared
    }

    #[inline]
    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> Diagnostics<'a> {
        self.shared.diagnostics()
    }

    /// Register every task in `tasks` with `exec`, at the configured
    /// priorities and cadences.
    pub fn spawn<'t, T, P, H, S, A, D>(
        &self,
        exec: &mut Executor<'t, T>,
        tasks: &'t mut TaskSet<'a, P, H, S, A, D>,
    ) -> OsResult<()>
    where
        'a: 't,
        T: TimeSource,
        P: Platform + 't,
        H: LowMemoryHook + 't,
        S: StorageDevice + 't,
        A: AudioDevice + 't,
        D: DisplayDevice + 't,
    {
        exec.add(self.config.supervisor, &mut tasks.supervisor, RestartPolicy::Never)?;
        exec.add(self.config.storage, &mut tasks.storage, self.config.storage_restart)?;
        exec.add(self.config.audio, &mut tasks.audio, RestartPolicy::Never)?;
        if self.config.enable_presentation {
            if let Some(presentation) = tasks.presentation.as_mut() {
                exec.add(self.config.presentation, presentation, RestartPolicy::Never)?;
            }
        }
        Ok(())
    }

    /// Start the tick and run the executor forever, idling between polls.
    /// From here on the tick interrupt preempts running steps.
    pub fn run<T: TimeSource>(&self, exec: &Executor<'_, T>) -> ! {
        // SAFETY: `exec` stays borrowed by this call, which never returns.
        unsafe { crate::kernel::install_tick_hook(exec) };
        crate::port::preemption_init();
        crate::port::enable_cycle_counter();
        crate::port::systick_init(self.config.effective_cpu_hz() / CFG_TICK_RATE_HZ);

        loop {
            if let Err(_err) = exec.poll() {
                crate::error!("executor stopped: {}", _err);
                crate::port::halt();
            }
            exec.idle(crate::port::wait_for_interrupt);
        }
    }
}

/// The four task bodies, built against one [`System`]
pub struct TaskSet<'a, P: Platform, H: LowMemoryHook, S: StorageDevice, A: AudioDevice, D: DisplayDevice> {
    pub supervisor: SupervisorTask<'a, P, H>,
    pub storage: StorageTask<'a, S>,
    pub audio: AudioTask<A>,
    pub presentation: Option<PresentationTask<'a, D>>,
}

impl<'a, P, H, S, A, D> TaskSet<'a, P, H, S, A, D>
where
    P: Platform,
    H: LowMemoryHook,
    S: StorageDevice,
    A: AudioDevice,
    D: DisplayDevice,
{
    /// `display` is ignored when presentation is disabled
    pub fn new(
        system: &System<'a>,
        platform: P,
        hook: H,
        storage: S,
        audio: A,
        display: Option<(D, Option<ButtonEvents<'a>>)>,
    ) -> Self {
        let shared = system.shared;
        let presentation = display
            .filter(|_| system.config.enable_presentation)
            .map(|(device, buttons)| PresentationTask::new(device, buttons, &shared.load_shed));

        Self {
            supervisor: SupervisorTask::new(platform, hook, system.config, &shared.faults, &shared.health),
            storage: StorageTask::new(storage, &shared.faults),
            audio: AudioTask::new(audio),
            presentation,
        }
    }
}
