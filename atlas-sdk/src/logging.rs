use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;

use atlas_common::{GatewayError, Result};

/// Target of the structured `EVENT:` lines the coordinator emits.
pub const GATEWAY_TARGET: &str = "gateway";

/// Installs the global subscriber.
///
/// `EVENT:` lines and crate logs go to a daily rolling file under `log_dir`;
/// everything else goes to stdout, filtered by `RUST_LOG`. Keep the guard
/// alive for as long as file logging is wanted.
pub fn init_tracing(log_dir: &str, service: &str) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(log_dir, format!("{}.log", service));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let audit_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            metadata.target() == GATEWAY_TARGET || metadata.target().starts_with("atlas_sdk")
        }));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,atlas_sdk=debug".into()),
        )
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            metadata.target() != GATEWAY_TARGET
        }));

    tracing_subscriber::registry()
        .with(audit_layer)
        .with(stdout_layer)
        .try_init()
        .map_err(|e| GatewayError::Other(format!("failed to install tracing subscriber: {}", e)))?;

    Ok(guard)
}
