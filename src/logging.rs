//! ## Logging Configuration
//!
//! This module sets up logging automatically at program startup using the `ctor` crate.
//! Logging behavior is controlled by the `DEBUG_NYC_TAXI_EDA` environment variable:
//!
//! - **Disabled** (default): If the variable is unset, empty, or explicitly set to `"0"` or `"false"`,
//!   no logging will be initialized.
//! - **Enabled**: Any other value enables logging with a maximum log level of `DEBUG`.
//!
//! ### Usage Example
//!
//! ```sh
//! export DEBUG_NYC_TAXI_EDA=true
//! ```

use ctor::ctor;
use tracing::Level;

/// Environment variable that switches on debug logging.
pub const DEBUG_ENV_VAR: &str = "DEBUG_NYC_TAXI_EDA";

/// Returns true when the given value of [`DEBUG_ENV_VAR`] enables logging.
pub(crate) fn logging_enabled(value: Option<&str>) -> bool {
    value.is_some_and(|v| !(v == "0" || v == "false" || v.is_empty()))
}

#[ctor]
fn set_debug_level() {
    let value = std::env::var(DEBUG_ENV_VAR).ok();
    if logging_enabled(value.as_deref()) {
        // A subscriber may already be installed by the host binary.
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .try_init();
    }
}
