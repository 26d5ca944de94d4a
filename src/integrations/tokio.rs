//! Tokio adapter for async request handlers.
//!
//! Validation does blocking network I/O, so it runs on the blocking pool.
//! The adapter puts an upper bound on how long a handler waits for a
//! verdict; a validation that overruns it is treated as a denial.

use crate::manager::LicenseValidator;
use crate::protocol::platform::{LicenseData, LicenseRequest};
use crate::LicensingError;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Async wrapper around a shared [`LicenseValidator`].
#[derive(Clone)]
pub struct AsyncLicenseValidator {
    inner: Arc<LicenseValidator>,
    timeout: Duration,
}

impl AsyncLicenseValidator {
    /// Wrap `inner`, bounding every validation by `timeout`.
    pub fn new(inner: Arc<LicenseValidator>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// The wrapped validator.
    pub fn inner(&self) -> &Arc<LicenseValidator> {
        &self.inner
    }

    /// Validate license data on the blocking pool.
    ///
    /// A timeout or a panicked validation resolves to `Ok(false)`.
    pub async fn validate(&self, data: LicenseData) -> Result<bool, LicensingError> {
        let platform = data.platform();
        let inner = Arc::clone(&self.inner);
        self.run(platform.as_str(), move || inner.validate(&data)).await
    }

    /// Validate a raw inbound request on the blocking pool.
    pub async fn validate_request(
        &self,
        selector: Option<String>,
        request: LicenseRequest,
    ) -> Result<bool, LicensingError> {
        let inner = Arc::clone(&self.inner);
        self.run("request", move || {
            inner.validate_request(selector.as_deref(), &request)
        })
        .await
    }

    async fn run<F>(&self, what: &'static str, job: F) -> Result<bool, LicensingError>
    where
        F: FnOnce() -> Result<bool, LicensingError> + Send + 'static,
    {
        let handle = ::tokio::task::spawn_blocking(job);

        match ::tokio::time::timeout(self.timeout, handle).await {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(e)) => {
                warn!(error = %e, what, "License validation task failed, denying");
                Ok(false)
            }
            Err(_) => {
                warn!(
                    timeout_ms = timeout_millis(self.timeout),
                    what,
                    "License validation timed out, denying"
                );
                Ok(false)
            }
        }
    }
}

fn timeout_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}
