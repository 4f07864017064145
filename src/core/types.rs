//! Core type definitions
//!
//! Small value types shared by the scheduler, the tasks and the button bridge.

use crate::error::DeviceError;

/// Task priority (0 = highest priority)
pub type Prio = u8;

/// Tick counter type. One tick is one millisecond at the default tick rate.
pub type Tick = u32;

/// Stack budget, in 32-bit words
pub type StkWords = usize;

/// Hardware button identifier
pub type ButtonId = u8;

/// Scheduler-side state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TaskState {
    /// Spawned, bring-up not yet attempted
    BringUp = 0,
    /// Ready to run its next step
    Ready = 1,
    /// Step in progress, possibly preempted by a higher priority
    Running = 2,
    /// Sleeping until its wake tick
    Delayed = 3,
    /// Blocked on a peripheral lock held by someone else
    Pend = 4,
    /// Permanently stopped; never scheduled again
    Terminated = 5,
}

/// The three exclusive peripherals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Resource {
    Storage = 0,
    Display = 1,
    Audio = 2,
}

impl Resource {
    /// All resources, in lock-set order
    pub const ALL: [Resource; 3] = [Resource::Storage, Resource::Display, Resource::Audio];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Resource::Storage => "storage",
            Resource::Display => "display",
            Resource::Audio => "audio",
        }
    }
}

/// Outcome of a peripheral's one-time bring-up, consulted on every tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PeripheralState {
    /// Bring-up not attempted, or hardware not fitted
    Absent,
    /// Bring-up attempted and failed
    Failed(DeviceError),
    /// Up and serviceable
    Ready,
}

impl PeripheralState {
    #[inline]
    pub fn is_ready(self) -> bool {
        self == PeripheralState::Ready
    }
}

/// What the executor does when a task's bring-up fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RestartPolicy {
    /// Terminate permanently
    Never,
    /// Retry up to `n` more times, `CFG_RESTART_DELAY_TICKS` apart
    Finite(u8),
    /// Retry forever, doubling the delay from `initial` up to `max` ticks
    Backoff { initial: Tick, max: Tick },
}

/// Semantic classification of a raw button transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ButtonEventKind {
    Pressed = 0,
    Released = 1,
    LongPress = 2,
}

/// One classified button event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonEvent {
    pub id: ButtonId,
    pub kind: ButtonEventKind,
}

/// Raw electrical level reported by the GPIO edge interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    /// Button held down
    Down,
    /// Button let go
    Up,
}
