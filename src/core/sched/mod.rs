//! Scheduling decisions
//!
//! Pure functions the executor consults: which task runs next, when a delayed
//! task is due and how long to wait before retrying a failed bring-up.

use crate::config::CFG_RESTART_DELAY_TICKS;
use crate::prio::PrioSet;
use crate::task::Tcb;
use crate::time::tick_reached;
use crate::types::{Prio, RestartPolicy, TaskState, Tick};

/// Highest ready priority, if any task is ready
#[inline]
pub fn next_ready(ready: PrioSet) -> Option<Prio> {
    ready.highest()
}

/// Is a delayed task due at `now`
#[inline]
pub fn is_due(tcb: &Tcb<'_>, now: Tick) -> bool {
    tcb.state.get() == TaskState::Delayed && tick_reached(now, tcb.wake_at.get())
}

/// Delay before the next bring-up attempt, or `None` to give up.
///
/// `failures` counts failed attempts so far, including the one that just
/// happened.
pub fn restart_delay(policy: RestartPolicy, failures: u16) -> Option<Tick> {
    match policy {
        RestartPolicy::Never => None,
        RestartPolicy::Finite(retries) => {
            if failures <= u16::from(retries) {
                Some(CFG_RESTART_DELAY_TICKS)
            } else {
                None
            }
        }
        RestartPolicy::Backoff { initial, max } => {
            let shift = u32::from(failures.saturating_sub(1)).min(16);
            let delay = initial.max(1).saturating_mul(1 << shift);
            Some(delay.min(max.max(1)))
        }
    }
}

/// Earliest wake tick among delayed tasks, relative to `now`
pub fn next_wake<'t, 'a: 't>(tcbs: impl Iterator<Item = &'t Tcb<'a>>, now: Tick) -> Option<Tick> {
    tcbs.filter(|t| t.state.get() == TaskState::Delayed)
        .map(|t| t.wake_at.get())
        .min_by_key(|wake| wake.wrapping_sub(now))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_gives_up_immediately() {
        assert_eq!(restart_delay(RestartPolicy::Never, 1), None);
    }

    #[test]
    fn finite_allows_n_retries() {
        let policy = RestartPolicy::Finite(2);
        assert_eq!(restart_delay(policy, 1), Some(CFG_RESTART_DELAY_TICKS));
        assert_eq!(restart_delay(policy, 2), Some(CFG_RESTART_DELAY_TICKS));
        assert_eq!(restart_delay(policy, 3), None);
    }

    #[test]
    fn finite_max_retries_still_terminates() {
        let policy = RestartPolicy::Finite(u8::MAX);
        assert_eq!(restart_delay(policy, 255), Some(CFG_RESTART_DELAY_TICKS));
        assert_eq!(restart_delay(policy, 256), None);
    }

    #[test]
    fn backoff_doubles_up_to_max() {
        let policy = RestartPolicy::Backoff { initial: 100, max: 1000 };
        assert_eq!(restart_delay(policy, 1), Some(100));
        assert_eq!(restart_delay(policy, 2), Some(200));
        assert_eq!(restart_delay(policy, 4), Some(800));
        assert_eq!(restart_delay(policy, 5), Some(1000));
        assert_eq!(restart_delay(policy, 200), Some(1000));
    }
}
