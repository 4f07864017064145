//! Error and fault types
//!
//! Uses Rust's Result pattern for every fallible call. `FaultCode` is the one
//! value that outlives a call: it is the process-wide "last thing that went
//! wrong" published through the fault channel.

/// Process-wide fault code
///
/// Stored in an atomic byte, so the discriminants are part of the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FaultCode {
    /// No fault reported
    None = 0,
    /// Storage peripheral did not come up
    StorageInitFailed = 1,
    /// Storage peripheral is up but the filesystem did not mount
    StorageMountFailed = 2,
    /// Display peripheral did not come up
    DisplayInitFailed = 3,
    /// Audio peripheral did not come up
    AudioInitFailed = 4,
    /// Free memory fell below the configured threshold
    OutOfMemory = 5,
    /// Unclassified hardware failure
    HardwareFailure = 6,
}

impl FaultCode {
    #[inline]
    pub fn is_none(self) -> bool {
        self == FaultCode::None
    }

    #[inline]
    pub fn is_some(self) -> bool {
        self != FaultCode::None
    }

    /// Decode a stored byte. Unknown values read back as `HardwareFailure`.
    pub const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => FaultCode::None,
            1 => FaultCode::StorageInitFailed,
            2 => FaultCode::StorageMountFailed,
            3 => FaultCode::DisplayInitFailed,
            4 => FaultCode::AudioInitFailed,
            5 => FaultCode::OutOfMemory,
            _ => FaultCode::HardwareFailure,
        }
    }
}

/// Status returned by a peripheral collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DeviceError {
    /// Nothing answered on the bus
    NoDevice = 1,
    /// Device answered but refused initialisation
    Init = 2,
    /// Bus or protocol error
    Comm = 3,
    /// Device did not respond in time
    Timeout = 4,
    /// On-media structures are unreadable (bad filesystem)
    Corrupt = 5,
    /// Device is in use
    Busy = 6,
    /// Device needs memory that is not available
    Memory = 7,
}

/// Clock tree programming failure. The one fatal condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError {
    /// Requested frequency cannot be synthesised
    Unreachable { hz: u32 },
    /// PLL did not report lock
    PllLock,
}

/// Startup configuration rejected by `SystemConfig::validate`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Two tasks share a priority
    DuplicatePrio(u8),
    /// Priority outside `0..CFG_PRIO_IDLE`
    PrioInvalid(u8),
    /// Cadence of zero ticks
    ZeroCadence,
    /// Stack budget below `CFG_STK_SIZE_MIN`
    StackTooSmall,
    /// Supervisor must outrank every other task
    SupervisorNotHighest,
}

/// Reasons `System::boot` refuses to start the tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootError {
    Config(ConfigError),
    /// Clock programming failed; the system must halt
    Clock(ClockError),
}

impl From<ConfigError> for BootError {
    fn from(err: ConfigError) -> Self {
        BootError::Config(err)
    }
}

impl From<ClockError> for BootError {
    fn from(err: ClockError) -> Self {
        BootError::Clock(err)
    }
}

/// Executor, lock and registration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum OsError {
    // ============ Lock errors ============
    /// Lock is held by another owner
    LockWouldBlock = 22401,
    /// Owner already holds this lock
    LockOwner = 22402,
    /// Owner already holds a different lock
    LockOrder = 22403,
    /// Caller is not the lock holder
    LockNotOwner = 22404,

    // ============ Object errors ============
    /// Object already created (second button classifier)
    ObjCreated = 24003,

    // ============ OS state errors ============
    /// Executor is already running
    OsRunning = 24202,
    /// No task was added before polling
    OsNoAppTask = 24204,

    // ============ Priority errors ============
    /// Priority already taken
    PrioExist = 25201,
    /// Invalid priority
    PrioInvalid = 25203,

    // ============ Stack errors ============
    /// Stack budget too small
    StkSizeInvalid = 28208,

    // ============ Task errors ============
    /// Task table is full
    TaskNoMoreTcb = 29008,
    /// Task does not exist
    TaskNotExist = 29010,
}

/// Result type alias for executor and lock operations
pub type OsResult<T> = Result<T, OsError>;
