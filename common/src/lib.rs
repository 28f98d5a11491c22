//! Shared models and configuration for the `addrbatch` workspace.
//!
//! * [`address`]: the address record read from an input source and the
//!   canonical object payload sent to the manager.
//! * [`config`]: connection settings for one provisioning run.
//! * [`log`]: status macros routed through `tracing`.

pub mod address;
pub mod config;
pub mod log;
