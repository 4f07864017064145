//! Fixed-priority preemptive executor
//!
//! A task's work is cut into steps: one bring-up attempt or one service
//! tick. After a service tick the task sleeps for its cadence. Whenever
//! [`Executor::poll`] is called, every task that is due runs, highest
//! priority first, until nothing is ready; the caller then idles (WFI on
//! target) until the next tick.
//!
//! Steps are preemptible. The tick interrupt calls [`Preempt::preempt`],
//! which runs every ready task that outranks the step in progress, nested on
//! the same stack, before the interrupted step resumes. A step never waits
//! for a lower priority, so nesting is at most one level per priority.
//!
//! A task's peripheral lock is taken immediately before its service tick and
//! released immediately after. If someone else holds it, the task pends on
//! the lock and is readied again once the lock is released. Tasks therefore
//! never hold more than one lock and never hold one across a sleep.
//!
//! Bookkeeping happens inside critical sections. Task bodies run with
//! interrupts enabled.

use core::cell::Cell;
use core::iter::Map;
use core::slice::Iter;

use critical_section::Mutex;
use heapless::Vec;

use crate::config::{TaskDescriptor, CFG_MAX_TASKS, CFG_PRIO_IDLE, CFG_STK_SIZE_MIN};
use crate::error::{OsError, OsResult};
use crate::health::RunTimeStats;
use crate::prio::PrioSet;
use crate::sched;
use crate::sync::lock::LockSet;
use crate::task::{BringUp, TaskBody, TaskContext, TaskInfo, Tcb};
use crate::time::TimeSource;
use crate::types::{Prio, Resource, RestartPolicy, TaskState, Tick};

/// Iterator over [`TaskInfo`] snapshots, in registration order
pub type TaskIter<'e, 'a> = Map<Iter<'e, Tcb<'a>>, fn(&Tcb<'a>) -> TaskInfo>;

/// Entry point for the tick interrupt
pub trait Preempt {
    /// Run ready tasks that outrank the step in progress. Does nothing when
    /// no step is in progress; the thread-level poll loop picks them up.
    fn preempt(&self);
}

enum Phase {
    BringUp,
    Service,
}

enum Outcome {
    Up(BringUp),
    Served,
    Blocked(Resource),
    LockFault(Resource, OsError),
}

/// A step that has been handed its body and is about to run
struct Job<'a> {
    idx: usize,
    phase: Phase,
    body: &'a mut (dyn TaskBody + 'a),
    ctx: TaskContext,
    /// Priority of the step this one preempted
    outer: Option<Prio>,
    outer_preempted: u64,
    start: u32,
}

pub struct Executor<'a, T: TimeSource> {
    time: T,
    locks: &'a LockSet,
    tcbs: Vec<Tcb<'a>, CFG_MAX_TASKS>,
    ready: Cell<PrioSet>,
    /// Priority of the innermost step in progress
    current: Cell<Option<Prio>>,
    /// Runtime spent by steps that preempted the innermost one
    preempted: Cell<u64>,
    total_runtime: Cell<u64>,
    idle_runtime: Cell<Option<u64>>,
    running: Cell<bool>,
}

impl<'a, T: TimeSource> Executor<'a, T> {
    pub fn new(time: T, locks: &'a LockSet) -> Self {
        Self {
            time,
            locks,
            tcbs: Vec::new(),
            ready: Cell::new(PrioSet::EMPTY),
            current: Cell::new(None),
            preempted: Cell::new(0),
            total_runtime: Cell::new(0),
            idle_runtime: Cell::new(None),
            running: Cell::new(false),
        }
    }

    /// Register a task. Its bring-up runs on the next poll.
    ///
    /// # Returns
    /// * `Err(OsError::OsRunning)` - executor has already been polled
    /// * `Err(OsError::PrioInvalid)` - priority is the idle priority or beyond, or zero cadence
    /// * `Err(OsError::PrioExist)` - another task has this priority
    /// * `Err(OsError::StkSizeInvalid)` - stack budget below `CFG_STK_SIZE_MIN`
    /// * `Err(OsError::TaskNoMoreTcb)` - task table is full
    pub fn add(&mut self, desc: TaskDescriptor, body: &'a mut (dyn TaskBody + 'a), policy: RestartPolicy) -> OsResult<()> {
        if self.running.get() {
            return Err(OsError::OsRunning);
        }
        if desc.prio >= CFG_PRIO_IDLE || desc.cadence == 0 {
            return Err(OsError::PrioInvalid);
        }
        if self.tcbs.iter().any(|t| t.prio() == desc.prio) {
            return Err(OsError::PrioExist);
        }
        if desc.stack_words < CFG_STK_SIZE_MIN {
            return Err(OsError::StkSizeInvalid);
        }

        self.tcbs
            .push(Tcb::new(desc, body, policy))
            .map_err(|_| OsError::TaskNoMoreTcb)?;
        self.ready.get_mut().insert(desc.prio);

        crate::debug!("task {} added at prio {}", desc.name, desc.prio);
        Ok(())
    }

    /// Run every task that is due, highest priority first.
    ///
    /// Returns the earliest tick at which a sleeping task wakes, or `None` when
    /// nothing is waiting on time (every task terminated or pending on a lock).
    pub fn poll(&self) -> OsResult<Option<Tick>> {
        if self.tcbs.is_empty() {
            return Err(OsError::OsNoAppTask);
        }
        self.running.set(true);

        self.dispatch();

        Ok(critical_section::with(|_| sched::next_wake(self.tcbs.iter(), self.time.now())))
    }

    /// Run `wait` and book the time it took as idle
    pub fn idle<W: FnOnce()>(&self, wait: W) {
        let start = self.time.runtime_counter();
        wait();
        let spent = self.time.runtime_counter().wrapping_sub(start);
        self.account_idle(spent);
    }

    /// Book `spent` runtime counter units as idle time
    pub fn account_idle(&self, spent: u32) {
        let spent = u64::from(spent);
        critical_section::with(|_| {
            self.idle_runtime.set(Some(self.idle_runtime.get().unwrap_or(0) + spent));
            self.total_runtime.set(self.total_runtime.get() + spent);
        });
    }

    /// Cumulative runtime counters
    pub fn stats(&self) -> RunTimeStats {
        RunTimeStats {
            total: self.total_runtime.get(),
            idle: self.idle_runtime.get(),
        }
    }

    pub fn task_info(&self, prio: Prio) -> OsResult<TaskInfo> {
        self.tcbs
            .iter()
            .find(|t| t.prio() == prio)
            .map(Tcb::info)
            .ok_or(OsError::TaskNotExist)
    }

    pub fn task_info_by_name(&self, name: &str) -> OsResult<TaskInfo> {
        self.tcbs
            .iter()
            .find(|t| t.desc.name == name)
            .map(Tcb::info)
            .ok_or(OsError::TaskNotExist)
    }

    /// Snapshot of every task, in registration order
    pub fn tasks(&self) -> TaskIter<'_, 'a> {
        self.tcbs.iter().map(Tcb::info as fn(&Tcb<'a>) -> TaskInfo)
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    #[inline]
    pub fn time(&self) -> &T {
        &self.time
    }

    /// Run steps until nothing ready outranks the step this call preempted
    fn dispatch(&self) {
        while let Some(mut job) = critical_section::with(|_| self.next_job()) {
            let outcome = Self::execute(self.locks, &mut job);
            critical_section::with(|_| self.finish(job, outcome));
        }
    }

    /// Ready delayed tasks whose time has come and pending tasks whose lock
    /// has been released.
    fn wake(&self, now: Tick) {
        let mut ready = self.ready.get();

        for tcb in self.tcbs.iter() {
            if sched::is_due(tcb, now) {
                let next = if tcb.retry_pending.replace(false) {
                    TaskState::BringUp
                } else {
                    TaskState::Ready
                };
                tcb.state.set(next);
                ready.insert(tcb.prio());
            }
        }

        for resource in Resource::ALL {
            for prio in self.locks.take_waiters_if_free(resource) {
                if let Some(tcb) = self.tcbs.iter().find(|t| t.prio() == prio) {
                    if tcb.state.get() == TaskState::Pend && tcb.pend_on.get() == Some(resource) {
                        tcb.state.set(TaskState::Ready);
                        tcb.pend_on.set(None);
                        ready.insert(prio);
                    }
                }
            }
        }

        self.ready.set(ready);
    }

    /// Pick the highest ready task that outranks the current step and hand
    /// it its body.
    fn next_job(&self) -> Option<Job<'a>> {
        let now = self.time.now();
        self.wake(now);

        loop {
            let prio = sched::next_ready(self.ready.get())?;
            if self.current.get().is_some_and(|running| prio >= running) {
                return None;
            }

            let mut ready = self.ready.get();
            ready.remove(prio);
            self.ready.set(ready);

            let Some(idx) = self.tcbs.iter().position(|t| t.prio() == prio) else {
                continue;
            };
            let tcb = &self.tcbs[idx];
            let phase = match tcb.state.get() {
                TaskState::BringUp => Phase::BringUp,
                TaskState::Ready => Phase::Service,
                _ => continue,
            };
            let Some(body) = tcb.take_body() else {
                continue;
            };
            tcb.state.set(TaskState::Running);

            let ctx = TaskContext {
                now,
                prio,
                attempt: tcb.attempts.get(),
                stats: self.stats(),
            };
            return Some(Job {
                idx,
                phase,
                body,
                ctx,
                outer: self.current.replace(Some(prio)),
                outer_preempted: self.preempted.replace(0),
                start: self.time.runtime_counter(),
            });
        }
    }

    /// Run the body. Interrupts are enabled; the tick may preempt.
    fn execute(locks: &LockSet, job: &mut Job<'a>) -> Outcome {
        match job.phase {
            Phase::BringUp => Outcome::Up(job.body.bring_up(&job.ctx)),
            Phase::Service => {
                let Some(resource) = job.body.resource() else {
                    job.body.service(&job.ctx);
                    return Outcome::Served;
                };
                match locks.try_acquire(resource, job.ctx.prio) {
                    Ok(_guard) => {
                        job.body.service(&job.ctx);
                        Outcome::Served
                    }
                    Err(OsError::LockWouldBlock) => Outcome::Blocked(resource),
                    Err(err) => Outcome::LockFault(resource, err),
                }
            }
        }
    }

    fn finish(&self, job: Job<'a>, outcome: Outcome) {
        let spent = u64::from(self.time.runtime_counter().wrapping_sub(job.start));
        let own = spent.saturating_sub(self.preempted.get());
        self.preempted.set(job.outer_preempted.wrapping_add(spent));
        self.current.set(job.outer);
        self.total_runtime.set(self.total_runtime.get() + own);

        let prio = job.ctx.prio;
        let tcb = &self.tcbs[job.idx];
        tcb.runtime.set(tcb.runtime.get() + own);
        tcb.restore_body(job.body);

        match outcome {
            Outcome::Up(BringUp::Ready) => {
                crate::info!("{} up", tcb.desc.name);
                tcb.state.set(TaskState::Ready);
                let mut ready = self.ready.get();
                ready.insert(prio);
                self.ready.set(ready);
            }
            Outcome::Up(BringUp::Failed(err)) => {
                let attempts = tcb.attempts.get().saturating_add(1);
                tcb.attempts.set(attempts);
                match sched::restart_delay(tcb.policy, attempts) {
                    Some(delay) => {
                        crate::warn!("{} bring-up failed ({}), retry in {} ticks", tcb.desc.name, err, delay);
                        tcb.state.set(TaskState::Delayed);
                        tcb.wake_at.set(self.time.now().wrapping_add(delay));
                        tcb.retry_pending.set(true);
                    }
                    None => {
                        crate::error!("{} bring-up failed ({}), terminated", tcb.desc.name, err);
                        tcb.state.set(TaskState::Terminated);
                    }
                }
            }
            Outcome::Served => {
                tcb.iterations.set(tcb.iterations.get().wrapping_add(1));
                tcb.last_service.set(Some(job.ctx.now));
                tcb.state.set(TaskState::Delayed);
                tcb.wake_at.set(self.time.now().wrapping_add(tcb.desc.cadence));
            }
            Outcome::Blocked(resource) => {
                crate::trace!("{} pends on {}", tcb.desc.name, resource.name());
                self.locks.pend(resource, prio);
                tcb.state.set(TaskState::Pend);
                tcb.pend_on.set(Some(resource));
            }
            Outcome::LockFault(resource, err) => {
                // Someone else holds a lock under this task's owner id. Every
                // later tick would fail the same way.
                crate::error!("{} cannot lock {} ({}), terminated", tcb.desc.name, resource.name(), err);
                tcb.state.set(TaskState::Terminated);
            }
        }
    }
}

impl<T: TimeSource> Preempt for Executor<'_, T> {
    fn preempt(&self) {
        if critical_section::with(|_| self.current.get()).is_some() {
            self.dispatch();
        }
    }
}

/// Executor reachable from the tick interrupt
#[derive(Clone, Copy)]
struct TickHook(&'static dyn Preempt);

// SAFETY: one core. The hook is only invoked from the PendSV handler, which
// does not nest with itself.
unsafe impl Send for TickHook {}

static TICK_HOOK: Mutex<Cell<Option<TickHook>>> = Mutex::new(Cell::new(None));

/// Make `exec` the target of [`tick_preempt`].
///
/// # Safety
/// `exec` must stay alive and in place for as long as the tick interrupt
/// can fire. [`System::run`] satisfies this by never returning.
///
/// [`System::run`]: crate::system::System::run
pub unsafe fn install_tick_hook(exec: &dyn Preempt) {
    // SAFETY: the caller guarantees `exec` outlives every later tick.
    let exec = unsafe { core::mem::transmute::<&dyn Preempt, &'static dyn Preempt>(exec) };
    critical_section::with(|cs| TICK_HOOK.borrow(cs).set(Some(TickHook(exec))));
}

/// Preemption point after every tick; called from the PendSV handler
pub fn tick_preempt() {
    if let Some(TickHook(exec)) = critical_section::with(|cs| TICK_HOOK.borrow(cs).get()) {
        exec.preempt();
    }
}
