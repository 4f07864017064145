//! Fault channel
//!
//! Process-wide "last fault" cell. Any task may report; last write wins; a
//! reported code stays until its reporter explicitly clears it. The code lives
//! in an atomic byte so a reader never sees a torn value, and a report
//! sequence number lets the supervisor notice new reports (including a repeat
//! of the same code) and refresh the indicator.

use portable_atomic::{AtomicU32, AtomicU8, Ordering};

use crate::error::FaultCode;

pub struct FaultChannel {
    code: AtomicU8,
    seq: AtomicU32,
}

impl FaultChannel {
    pub const fn new() -> Self {
        Self {
            code: AtomicU8::new(FaultCode::None as u8),
            seq: AtomicU32::new(0),
        }
    }

    /// Publish `code`, replacing whatever was there
    pub fn report(&self, code: FaultCode) {
        self.replace(code);
    }

    /// Publish `code` and return the code it displaced
    pub fn replace(&self, code: FaultCode) -> FaultCode {
        let previous = self.code.swap(code as u8, Ordering::AcqRel);
        self.seq.fetch_add(1, Ordering::AcqRel);
        crate::error!("System Error: {}", code);
        FaultCode::from_u8(previous)
    }

    /// Last reported code, or `FaultCode::None`
    #[inline]
    pub fn current(&self) -> FaultCode {
        FaultCode::from_u8(self.code.load(Ordering::Acquire))
    }

    /// Reset to `None`, but only if the current code is still `expected`.
    ///
    /// Used by a task that recovered its own peripheral; a fault reported
    /// by someone else in the meantime is left in place.
    pub fn clear_if(&self, expected: FaultCode) -> bool {
        self.replace_if(expected, FaultCode::None)
    }

    /// Put `restored` back, but only if the current code is still `expected`.
    ///
    /// Ends a transient condition that displaced an earlier fault.
    pub fn replace_if(&self, expected: FaultCode, restored: FaultCode) -> bool {
        let swapped = self
            .code
            .compare_exchange(expected as u8, restored as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if swapped {
            self.seq.fetch_add(1, Ordering::AcqRel);
            crate::info!("fault {} cleared, now {}", expected, restored);
        }
        swapped
    }

    /// Report sequence number; changes on every report or clear
    #[inline]
    pub fn sequence(&self) -> u32 {
        self.seq.load(Ordering::Acquire)
    }
}

impl Default for FaultChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Error indicator blink pattern keyed by fault code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BlinkPattern {
    /// Blinks per burst; 0 means indicator off
    pub blinks: u8,
    pub on_ms: u16,
    pub off_ms: u16,
    /// Dark gap between bursts
    pub pause_ms: u16,
}

impl BlinkPattern {
    pub const OFF: BlinkPattern = BlinkPattern { blinks: 0, on_ms: 0, off_ms: 0, pause_ms: 0 };

    /// N short blinks for fault code N; hardware failure blinks slow
    pub const fn for_code(code: FaultCode) -> BlinkPattern {
        match code {
            FaultCode::None => BlinkPattern::OFF,
            FaultCode::HardwareFailure => BlinkPattern { blinks: 6, on_ms: 500, off_ms: 500, pause_ms: 2000 },
            other => BlinkPattern { blinks: other as u8, on_ms: 150, off_ms: 250, pause_ms: 1500 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins() {
        let faults = FaultChannel::new();
        assert_eq!(faults.current(), FaultCode::None);
        faults.report(FaultCode::StorageInitFailed);
        faults.report(FaultCode::OutOfMemory);
        assert_eq!(faults.current(), FaultCode::OutOfMemory);
        assert_eq!(faults.sequence(), 2);
    }

    #[test]
    fn clear_only_removes_own_code() {
        let faults = FaultChannel::new();
        faults.report(FaultCode::StorageMountFailed);
        faults.report(FaultCode::OutOfMemory);
        assert!(!faults.clear_if(FaultCode::StorageMountFailed));
        assert_eq!(faults.current(), FaultCode::OutOfMemory);
        assert!(faults.clear_if(FaultCode::OutOfMemory));
        assert_eq!(faults.current(), FaultCode::None);
    }

    #[test]
    fn transient_code_restores_what_it_displaced() {
        let faults = FaultChannel::new();
        faults.report(FaultCode::StorageMountFailed);
        let displaced = faults.replace(FaultCode::OutOfMemory);
        assert_eq!(displaced, FaultCode::StorageMountFailed);
        assert!(faults.replace_if(FaultCode::OutOfMemory, displaced));
        assert_eq!(faults.current(), FaultCode::StorageMountFailed);

        // A newer report is never overwritten by the restore
        let displaced = faults.replace(FaultCode::OutOfMemory);
        faults.report(FaultCode::HardwareFailure);
        assert!(!faults.replace_if(FaultCode::OutOfMemory, displaced));
        assert_eq!(faults.current(), FaultCode::HardwareFailure);
    }

    #[test]
    fn patterns_are_distinct_per_code() {
        assert_eq!(BlinkPattern::for_code(FaultCode::None), BlinkPattern::OFF);
        assert_eq!(BlinkPattern::for_code(FaultCode::StorageInitFailed).blinks, 1);
        assert_eq!(BlinkPattern::for_code(FaultCode::StorageMountFailed).blinks, 2);
        assert_ne!(
            BlinkPattern::for_code(FaultCode::OutOfMemory),
            BlinkPattern::for_code(FaultCode::AudioInitFailed)
        );
    }
}
