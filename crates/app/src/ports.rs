//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the dispatcher and the host application.
//! They are defined here so that adapters can depend on this crate without
//! the dispatcher knowing anything about them.

pub mod service_executor;

pub use service_executor::ServiceExecutor;
