//! Supervisor task
//!
//! Highest priority. Platform bring-up (clocks, caches, prefetch) has already
//! happened in [`System::boot`] by the time this task runs; what remains is
//! the periodic work:
//!
//! - once per `CFG_HEALTH_WINDOW_TICKS`, recompute the health snapshot from
//!   the runtime counters accumulated over that window
//! - on every such recomputation with free memory below the threshold, fire
//!   the low-memory hook; `OutOfMemory` is reported when the condition
//!   starts and, when it ends, replaced by whatever code it covered
//! - whenever the fault channel changes, refresh the error indicator
//!
//! [`System::boot`]: crate::system::System::boot

use crate::config::{SystemConfig, CFG_HEALTH_WINDOW_TICKS};
use crate::drivers::{LowMemoryHook, Platform};
use crate::error::FaultCode;
use crate::fault::{BlinkPattern, FaultChannel};
use crate::health::{cpu_utilization, HealthCell, HealthSnapshot, RunTimeStats};
use crate::task::{BringUp, TaskBody, TaskContext};
use crate::time::{tick_reached, ticks_to_ms};
use crate::types::Tick;

pub struct SupervisorTask<'a, P: Platform, H: LowMemoryHook> {
    platform: P,
    hook: H,
    config: SystemConfig,
    faults: &'a FaultChannel,
    health: &'a HealthCell,
    next_window: Tick,
    window_start: RunTimeStats,
    low_memory: bool,
    /// Code that was current when low memory was reported over it
    displaced: FaultCode,
    shown_sequence: u32,
}

impl<'a, P: Platform, H: LowMemoryHook> SupervisorTask<'a, P, H> {
    pub fn new(platform: P, hook: H, config: SystemConfig, faults: &'a FaultChannel, health: &'a HealthCell) -> Self {
        Self {
            platform,
            hook,
            config,
            faults,
            health,
            next_window: CFG_HEALTH_WINDOW_TICKS,
            window_start: RunTimeStats::default(),
            low_memory: false,
            displaced: FaultCode::None,
            shown_sequence: 0,
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Low-memory condition as of the last recomputation
    pub fn is_low_memory(&self) -> bool {
        self.low_memory
    }

    fn recompute(&mut self, ctx: &TaskContext) {
        let window = ctx.stats.since(self.window_start);
        self.window_start = ctx.stats;

        let snapshot = HealthSnapshot {
            uptime_ms: ticks_to_ms(ctx.now),
            cpu_utilization_percent: cpu_utilization(window),
            free_memory_bytes: self.platform.free_memory_bytes(),
        };
        self.health.store(snapshot);

        if self.config.enable_performance_logging {
            crate::info!(
                "System Stats - uptime {} ms, CPU {}%, free {} bytes",
                snapshot.uptime_ms,
                snapshot.cpu_utilization_percent,
                snapshot.free_memory_bytes
            );
        }

        if snapshot.free_memory_bytes < self.config.low_memory_threshold {
            if !self.low_memory {
                self.low_memory = true;
                self.displaced = self.faults.replace(FaultCode::OutOfMemory);
            }
            self.hook.on_low_memory(snapshot.free_memory_bytes);
        } else if self.low_memory {
            self.low_memory = false;
            self.hook.on_recovered();
            // Whatever low memory covered up becomes visible again
            self.faults.replace_if(FaultCode::OutOfMemory, self.displaced);
            self.displaced = FaultCode::None;
        }
    }

    fn refresh_indicator(&mut self) {
        let sequence = self.faults.sequence();
        if sequence == self.shown_sequence {
            return;
        }
        self.shown_sequence = sequence;
        self.platform.indicate(BlinkPattern::for_code(self.faults.current()));
    }
}

impl<P: Platform, H: LowMemoryHook> TaskBody for SupervisorTask<'_, P, H> {
    fn bring_up(&mut self, ctx: &TaskContext) -> BringUp {
        self.next_window = ctx.now.wrapping_add(CFG_HEALTH_WINDOW_TICKS);
        self.window_start = ctx.stats;
        crate::info!("System initialized, CPU {} Hz", self.config.effective_cpu_hz());
        BringUp::Ready
    }

    fn service(&mut self, ctx: &TaskContext) {
        if tick_reached(ctx.now, self.next_window) {
            // Skip windows missed entirely instead of recomputing back to back.
            while tick_reached(ctx.now, self.next_window) {
                self.next_window = self.next_window.wrapping_add(CFG_HEALTH_WINDOW_TICKS);
            }
            self.recompute(ctx);
        }

        if self.config.enable_error_indicator {
            self.refresh_indicator();
        }
    }
}
