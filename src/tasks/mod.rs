//! The four task bodies
//!
//! Each task owns one collaborator, brings it up once and then serves it on
//! its cadence. Failures stay inside the task: storage reports to the fault
//! channel, audio and display only record them in their [`PeripheralState`].
//!
//! [`PeripheralState`]: crate::types::PeripheralState

pub mod audio;
pub mod presentation;
pub mod storage;
pub mod supervisor;

pub use audio::AudioTask;
pub use presentation::PresentationTask;
pub use storage::StorageTask;
pub use supervisor::SupervisorTask;
