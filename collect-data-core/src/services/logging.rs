//! Logging service
//!
//! Stdout carries the plugin protocol, so every log line goes to stderr.

use crate::models::{LogLevel, StepStatus};
use tracing_subscriber::EnvFilter;

/// Filter directive for the plugin crates at the given level
pub fn filter_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "collect_data=error,collect_data_core=error",
        LogLevel::Warn => "collect_data=warn,collect_data_core=warn",
        LogLevel::Info => "collect_data=info,collect_data_core=info",
        LogLevel::Debug => "collect_data=debug,collect_data_core=debug",
        LogLevel::Trace => "collect_data=trace,collect_data_core=trace",
    }
}

/// Initialize logging with the specified level; `RUST_LOG` takes precedence
pub fn init_logging(level: LogLevel) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
}

/// Log a step status change
pub fn log_step_transition(execution_id: &str, step_id: &str, from: StepStatus, to: StepStatus) {
    tracing::info!(
        execution_id = execution_id,
        step_id = step_id,
        from = %from,
        to = %to,
        "Step status changed"
    );
}

/// Log an incoming protocol request
pub fn log_request(action: &str, details: Option<&str>) {
    tracing::info!(
        action = action,
        details = details.unwrap_or(""),
        "Request received"
    );
}

/// Log a system error
pub fn log_error(error: &str, context: Option<&str>) {
    tracing::error!(
        error = error,
        context = context.unwrap_or(""),
        "System error occurred"
    );
}
