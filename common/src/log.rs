//! Status macros shared by every crate in the workspace.
//!
//! They are thin wrappers over `tracing` so the CLI formatter can pick a
//! prefix per kind of message. `success!` is routed through its own target
//! because `tracing` has no level for it.

#[doc(hidden)]
pub use tracing as __tracing;

/// Target used by the CLI for undecorated lines (headers, separators).
pub const PRINT_TARGET: &str = "addrbatch::print";

/// Target used by [`success!`](crate::success).
pub const SUCCESS_TARGET: &str = "addrbatch::success";

#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::log::__tracing::info!(target: "addrbatch::success", $($arg)*)
    };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::log::__tracing::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::log::__tracing::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::log::__tracing::error!($($arg)*)
    };
}
