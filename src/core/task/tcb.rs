//! Task Control Block
//!
//! The TCB is the executor's bookkeeping for one task. Every mutable field is
//! a `Cell` so the executor can be re-entered from the tick interrupt while a
//! lower-priority step is still in progress. The body is moved out while its
//! step runs, so a nested dispatch can never reach it.

use core::cell::Cell;

use crate::config::TaskDescriptor;
use crate::task::TaskBody;
use crate::types::{Prio, Resource, RestartPolicy, TaskState, Tick};

pub struct Tcb<'a> {
    pub desc: TaskDescriptor,
    pub policy: RestartPolicy,
    body: Cell<Option<&'a mut (dyn TaskBody + 'a)>>,
    pub state: Cell<TaskState>,
    /// Tick at which a delayed task becomes ready
    pub wake_at: Cell<Tick>,
    /// Lock the task is pending on
    pub pend_on: Cell<Option<Resource>>,
    /// Bring-up attempts that failed
    pub attempts: Cell<u16>,
    /// Next wake-up retries bring-up instead of serving
    pub retry_pending: Cell<bool>,
    /// Completed service ticks
    pub iterations: Cell<u32>,
    /// Runtime counter units spent in this task, preemptions excluded
    pub runtime: Cell<u64>,
    /// Tick of the most recent service call
    pub last_service: Cell<Option<Tick>>,
}

impl<'a> Tcb<'a> {
    pub fn new(desc: TaskDescriptor, body: &'a mut (dyn TaskBody + 'a), policy: RestartPolicy) -> Self {
        Tcb {
            desc,
            policy,
            body: Cell::new(Some(body)),
            state: Cell::new(TaskState::BringUp),
            wake_at: Cell::new(0),
            pend_on: Cell::new(None),
            attempts: Cell::new(0),
            retry_pending: Cell::new(false),
            iterations: Cell::new(0),
            runtime: Cell::new(0),
            last_service: Cell::new(None),
        }
    }

    #[inline]
    pub fn prio(&self) -> Prio {
        self.desc.prio
    }

    /// Move the body out for the duration of a step
    pub(crate) fn take_body(&self) -> Option<&'a mut (dyn TaskBody + 'a)> {
        self.body.take()
    }

    pub(crate) fn restore_body(&self, body: &'a mut (dyn TaskBody + 'a)) {
        self.body.set(Some(body));
    }

    pub fn info(&self) -> TaskInfo {
        TaskInfo {
            name: self.desc.name,
            prio: self.desc.prio,
            state: self.state.get(),
            iterations: self.iterations.get(),
            runtime: self.runtime.get(),
            attempts: self.attempts.get(),
            last_service: self.last_service.get(),
        }
    }
}

/// Read-only view of a TCB
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskInfo {
    pub name: &'static str,
    pub prio: Prio,
    pub state: TaskState,
    pub iterations: u32,
    pub runtime: u64,
    pub attempts: u16,
    pub last_service: Option<Tick>,
}
