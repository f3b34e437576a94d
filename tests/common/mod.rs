//! Shared setup for integration tests

#![allow(dead_code)]

use std::sync::Once;

static LOGGING: Once = Once::new();

/// Route `tracing` output through the test harness. Honors `RUST_LOG`.
pub fn init_test_logging() {
    LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lifeline=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}
