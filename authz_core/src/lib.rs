//!
//! Authorization core
//!
//! The catalog-side model of roles, privileges and securable metadata objects,
//! and the plugin seam that reconciliation plugins for external access-control
//! systems implement.
#![deny(missing_docs)]

pub use config::AuthorizationConfig;
pub use error::AuthorizationError;
pub use plugin::AuthorizationPlugin;
pub use registry::PluginRegistry;

pub mod config;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod plugin;
pub mod privileges;
pub mod registry;
pub mod role;

#[macro_export]
/// Time the code inside the macro. Write the elapsed time to debug logs.
/// Derived from https://notes.iveselov.info/programming/time_it-a-case-study-in-rust-macros
macro_rules! log_runtime {
    ($context:expr, $($tt:tt)+) => {
        {
            $crate::logging::debug!("{}: starting", $context);
            let timer = std::time::Instant::now();
            let x =
            $(
                $tt
            )+;
            $crate::logging::debug!("{}: {:?}", $context, timer.elapsed());
            x
        }
    }
}
