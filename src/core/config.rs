//! Compile-time constants and the startup configuration
//!
//! The `CFG_*` constants size the executor and the button bridge. The
//! four task descriptors and `SystemConfig` are the tunables handed to the
//! system once at boot and never changed afterwards.

use crate::error::ConfigError;
use crate::types::{Prio, RestartPolicy, StkWords, Tick};

/// Number of priority levels (one bitmap word)
pub const CFG_PRIO_MAX: usize = 32;

/// Idle priority; never given to a task
pub const CFG_PRIO_IDLE: Prio = (CFG_PRIO_MAX - 1) as Prio;

/// System tick rate in Hz
pub const CFG_TICK_RATE_HZ: u32 = 1000;

/// Task table capacity
pub const CFG_MAX_TASKS: usize = 8;

/// Minimum task stack budget, in words
pub const CFG_STK_SIZE_MIN: StkWords = 64;

/// Health snapshot recomputation window
pub const CFG_HEALTH_WINDOW_TICKS: Tick = 1000;

/// Delay between bring-up attempts under `RestartPolicy::Finite`
pub const CFG_RESTART_DELAY_TICKS: Tick = 500;

/// Clock used when `SystemConfig::cpu_frequency_hz` is 0
pub const CFG_DEFAULT_CPU_HZ: u32 = 125_000_000;

/// Number of physical buttons
pub const CFG_BUTTON_COUNT: usize = 5;

/// Per-button event queue slots (the SPSC queue keeps one slot free)
pub const CFG_BUTTON_QUEUE_DEPTH: usize = 8;

/// Default hold time before a release is classified as a long press
pub const CFG_LONG_PRESS_TICKS: Tick = 1000;

/// Button ids on the reference board
pub mod buttons {
    use crate::types::ButtonId;

    pub const PLAY_PAUSE: ButtonId = 0;
    pub const NEXT: ButtonId = 1;
    pub const PREV: ButtonId = 2;
    pub const VOL_UP: ButtonId = 3;
    pub const VOL_DOWN: ButtonId = 4;
}

/// Static description of one task. Immutable after startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskDescriptor {
    pub name: &'static str,
    pub prio: Prio,
    pub stack_words: StkWords,
    pub cadence: Tick,
}

impl TaskDescriptor {
    pub const fn new(name: &'static str, prio: Prio, stack_words: StkWords, cadence: Tick) -> Self {
        Self { name, prio, stack_words, cadence }
    }

    pub const fn with_prio(self, prio: Prio) -> Self {
        Self { prio, ..self }
    }

    pub const fn with_cadence(self, cadence: Tick) -> Self {
        Self { cadence, ..self }
    }
}

pub const SUPERVISOR_TASK: TaskDescriptor = TaskDescriptor::new("SYS", 1, 512, 10);
pub const STORAGE_TASK: TaskDescriptor = TaskDescriptor::new("FS", 2, 1024, 50);
pub const AUDIO_TASK: TaskDescriptor = TaskDescriptor::new("AUDIO", 3, 1024, 5);
/// ~60 redraws per second
pub const PRESENTATION_TASK: TaskDescriptor = TaskDescriptor::new("GUI", 4, 2048, 16);

/// Immutable snapshot of the startup tunables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemConfig {
    /// Target core clock; 0 selects `CFG_DEFAULT_CPU_HZ`
    pub cpu_frequency_hz: u32,
    /// Free memory below this many bytes triggers degradation
    pub low_memory_threshold: u32,
    pub enable_performance_logging: bool,
    pub enable_error_indicator: bool,
    pub enable_presentation: bool,
    pub enable_caches: bool,
    pub enable_prefetch: bool,
    pub supervisor: TaskDescriptor,
    pub storage: TaskDescriptor,
    pub audio: TaskDescriptor,
    pub presentation: TaskDescriptor,
    pub storage_restart: RestartPolicy,
}

impl SystemConfig {
    pub const DEFAULT: SystemConfig = SystemConfig {
        cpu_frequency_hz: 0,
        low_memory_threshold: 4 * 1024,
        enable_performance_logging: true,
        enable_error_indicator: true,
        enable_presentation: true,
        enable_caches: true,
        enable_prefetch: true,
        supervisor: SUPERVISOR_TASK,
        storage: STORAGE_TASK,
        audio: AUDIO_TASK,
        presentation: PRESENTATION_TASK,
        storage_restart: RestartPolicy::Never,
    };

    pub const fn with_cpu_frequency(self, hz: u32) -> Self {
        Self { cpu_frequency_hz: hz, ..self }
    }

    pub const fn with_low_memory_threshold(self, bytes: u32) -> Self {
        Self { low_memory_threshold: bytes, ..self }
    }

    pub const fn with_performance_logging(self, on: bool) -> Self {
        Self { enable_performance_logging: on, ..self }
    }

    pub const fn with_error_indicator(self, on: bool) -> Self {
        Self { enable_error_indicator: on, ..self }
    }

    pub const fn with_presentation(self, on: bool) -> Self {
        Self { enable_presentation: on, ..self }
    }

    pub const fn with_storage_restart(self, policy: RestartPolicy) -> Self {
        Self { storage_restart: policy, ..self }
    }

    /// Clock frequency after applying the default
    pub const fn effective_cpu_hz(&self) -> u32 {
        if self.cpu_frequency_hz == 0 {
            CFG_DEFAULT_CPU_HZ
        } else {
            self.cpu_frequency_hz
        }
    }

    /// Descriptors of the tasks that will be spawned
    pub fn descriptors(&self) -> heapless::Vec<TaskDescriptor, 4> {
        let mut out = heapless::Vec::new();
        // Capacity is 4 and at most 4 are pushed.
        let _ = out.push(self.supervisor);
        let _ = out.push(self.storage);
        let _ = out.push(self.audio);
        if self.enable_presentation {
            let _ = out.push(self.presentation);
        }
        out
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let descs = self.descriptors();
        let mut seen: u32 = 0;
        for desc in descs.iter() {
            if desc.prio >= CFG_PRIO_IDLE {
                return Err(ConfigError::PrioInvalid(desc.prio));
            }
            if seen & (1 << desc.prio) != 0 {
                return Err(ConfigError::DuplicatePrio(desc.prio));
            }
            seen |= 1 << desc.prio;
            if desc.cadence == 0 {
                return Err(ConfigError::ZeroCadence);
            }
            if desc.stack_words < CFG_STK_SIZE_MIN {
                return Err(ConfigError::StackTooSmall);
            }
        }
        if descs.iter().any(|d| d.prio < self.supervisor.prio) {
            return Err(ConfigError::SupervisorNotHighest);
        }
        Ok(())
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
