//! Core modules
//!
//! Configuration, error types, the executor, the task model and the shared
//! fault and health state.

pub mod config;
pub mod critical;
pub mod error;
pub mod fault;
pub mod health;
pub mod kernel;
pub mod prio;
pub mod sched;
pub mod task;
pub mod time;
pub mod types;
