#![allow(dead_code)]
//! Shared integration test utilities.

use proptest::prelude::ProptestConfig;
use std::sync::Once;

static INIT_LOGGING: Once = Once::new();

/// Routes `tracing` output through the test harness. The first call wins;
/// later calls are no-ops.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .with_thread_names(true)
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Property tests spawn threads per case, so keep the case count modest.
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    ProptestConfig {
        cases,
        ..ProptestConfig::default()
    }
}
