//! Shared fixtures for pageflow's integration tests.

pub mod builders;
pub mod fake_executor;
pub mod tasks;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use pageflow::logging::LOG_ENV;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Default guard for async tests.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Install a test-writer subscriber once per test binary.
///
/// Filter comes from `PAGEFLOW_LOG` (e.g. `PAGEFLOW_LOG=pageflow=debug`),
/// falling back to `pageflow=info`. Output is only shown for failing tests.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new("warn,pageflow=info"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Await `f`, failing the test if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    within(TEST_TIMEOUT, f).await
}

/// Await `f`, failing the test after `limit`.
pub async fn within<F, T>(limit: Duration, f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(limit, f).await {
        Ok(value) => value,
        Err(_) => panic!("test timed out after {limit:?}"),
    }
}
