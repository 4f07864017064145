//! Task model
//!
//! A task is a [`TaskBody`] plus a static [`TaskDescriptor`]. The executor
//! drives every body through the same lifecycle: one `bring_up` call, then a
//! `service` call per cadence period, with the body's peripheral lock held
//! for exactly the duration of each `service` call.
//!
//! [`TaskDescriptor`]: crate::config::TaskDescriptor

mod tcb;

pub use tcb::{TaskInfo, Tcb};

use crate::error::DeviceError;
use crate::health::RunTimeStats;
use crate::types::{Prio, Resource, Tick};

/// Outcome of a bring-up attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BringUp {
    /// Peripheral is up; start serving
    Ready,
    /// Peripheral did not come up; the restart policy decides what follows
    Failed(DeviceError),
}

/// What a task sees of the scheduler while it runs
#[derive(Debug, Clone, Copy)]
pub struct TaskContext {
    pub now: Tick,
    pub prio: Prio,
    /// Bring-up attempts made before this one
    pub attempt: u16,
    /// Cumulative runtime counters at the start of this step
    pub stats: RunTimeStats,
}

/// The work a task does
pub trait TaskBody {
    /// One-time bring-up of the task's peripheral
    fn bring_up(&mut self, ctx: &TaskContext) -> BringUp;

    /// One service tick. Called with [`TaskBody::resource`] locked.
    fn service(&mut self, ctx: &TaskContext);

    /// Peripheral this task locks around each service tick
    fn resource(&self) -> Option<Resource> {
        None
    }
}
