//! # Address Provisioning Core
//!
//! * [`input`]: sources of [`AddressRecord`](addrbatch_common::address::record::AddressRecord)s (CSV, random).
//! * [`api`]: the contract against the policy manager and its JSON-RPC adapter.
//! * [`session`]: authentication strategies over an [`api::ManagerApi`].
//! * [`batch`]: the locked, committed provisioning run.

pub mod api;
pub mod batch;
pub mod input;
pub mod session;
