//! Synchronization primitives
//!
//! Peripheral locks and the interrupt-to-task button bridge.

pub mod button;
pub mod lock;
