//! Health snapshot and runtime statistics
//!
//! The supervisor recomputes a [`HealthSnapshot`] at most once per
//! `CFG_HEALTH_WINDOW_TICKS` and publishes it through a [`HealthCell`]. Readers
//! get the last published value, stale until the next recomputation.

use core::cell::Cell;

use critical_section::Mutex;
use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use crate::critical::critical_section;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HealthSnapshot {
    pub uptime_ms: u32,
    /// Always within 0..=100
    pub cpu_utilization_percent: u8,
    pub free_memory_bytes: u32,
}

/// Critical-section protected snapshot with a recomputation counter
pub struct HealthCell {
    snapshot: Mutex<Cell<HealthSnapshot>>,
    recomputations: AtomicU32,
}

impl HealthCell {
    pub const fn new() -> Self {
        Self {
            snapshot: Mutex::new(Cell::new(HealthSnapshot {
                uptime_ms: 0,
                cpu_utilization_percent: 0,
                free_memory_bytes: 0,
            })),
            recomputations: AtomicU32::new(0),
        }
    }

    pub fn load(&self) -> HealthSnapshot {
        critical_section(|cs| self.snapshot.borrow(cs).get())
    }

    pub fn store(&self, snapshot: HealthSnapshot) {
        critical_section(|cs| self.snapshot.borrow(cs).set(snapshot));
        self.recomputations.fetch_add(1, Ordering::Relaxed);
    }

    /// How many times a snapshot has been published
    pub fn recomputations(&self) -> u32 {
        self.recomputations.load(Ordering::Relaxed)
    }
}

impl Default for HealthCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Cumulative runtime counters reported by the executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunTimeStats {
    /// Runtime of every task plus idle
    pub total: u64,
    /// Idle runtime; `None` when idle time is not being accounted
    pub idle: Option<u64>,
}

impl RunTimeStats {
    /// Counters accumulated since `earlier`
    pub fn since(self, earlier: RunTimeStats) -> RunTimeStats {
        RunTimeStats {
            total: self.total.saturating_sub(earlier.total),
            idle: match (self.idle, earlier.idle) {
                (Some(now), Some(then)) => Some(now.saturating_sub(then)),
                (Some(now), None) => Some(now),
                (None, _) => None,
            },
        }
    }
}

/// `100 - idle share`, clamped to 0..=100. Unknown idle time reads as 0.
pub fn cpu_utilization(window: RunTimeStats) -> u8 {
    match window.idle {
        Some(idle) if window.total > 0 => {
            let idle_pct = (idle.saturating_mul(100) / window.total).min(100);
            (100 - idle_pct) as u8
        }
        _ => 0,
    }
}

/// Process-wide load-shed state engaged by the low-memory hook
pub struct LoadShed {
    engaged: AtomicBool,
    activations: AtomicU32,
}

impl LoadShed {
    pub const fn new() -> Self {
        Self {
            engaged: AtomicBool::new(false),
            activations: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn is_engaged(&self) -> bool {
        self.engaged.load(Ordering::Acquire)
    }

    pub fn engage(&self) {
        self.engaged.store(true, Ordering::Release);
        self.activations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn release(&self) {
        self.engaged.store(false, Ordering::Release);
    }

    /// Number of `engage` calls so far
    pub fn activations(&self) -> u32 {
        self.activations.load(Ordering::Relaxed)
    }
}

impl Default for LoadShed {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utilization_is_complement_of_idle_share() {
        let window = RunTimeStats { total: 1000, idle: Some(250) };
        assert_eq!(cpu_utilization(window), 75);
    }

    #[test]
    fn unknown_idle_reports_zero() {
        assert_eq!(cpu_utilization(RunTimeStats { total: 1000, idle: None }), 0);
        assert_eq!(cpu_utilization(RunTimeStats { total: 0, idle: Some(0) }), 0);
    }

    #[test]
    fn idle_above_total_clamps() {
        assert_eq!(cpu_utilization(RunTimeStats { total: 10, idle: Some(50) }), 0);
        assert_eq!(cpu_utilization(RunTimeStats { total: 10, idle: Some(0) }), 100);
    }

    #[test]
    fn window_delta() {
        let before = RunTimeStats { total: 100, idle: Some(40) };
        let after = RunTimeStats { total: 300, idle: Some(90) };
        assert_eq!(after.since(before), RunTimeStats { total: 200, idle: Some(50) });
    }

    #[test]
    fn cell_publishes_snapshots() {
        let cell = HealthCell::new();
        let snap = HealthSnapshot { uptime_ms: 1000, cpu_utilization_percent: 12, free_memory_bytes: 2048 };
        cell.store(snap);
        assert_eq!(cell.load(), snap);
        assert_eq!(cell.recomputations(), 1);
    }
}
