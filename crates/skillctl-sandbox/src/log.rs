//! Quiet-mode aware logging. When SKILLCTL_QUIET=1, suppress progress [INFO] lines.
//! Uses `tracing::info!` so output is captured by the tracing subscriber.

#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {{
        if !$crate::log::is_quiet() {
            tracing::info!($($arg)*);
        }
    }};
}

pub fn is_quiet() -> bool {
    skillctl_core::config::ObservabilityConfig::from_env().quiet
}
