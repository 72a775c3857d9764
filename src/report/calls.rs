use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::ReportError;

pub(crate) const ENTRY_SOURCE: &str = "entry source";
pub(crate) const CATEGORY_SOURCE: &str = "category source";
pub(crate) const CAP_READER: &str = "cap reader";
pub(crate) const FX_CONVERTER: &str = "fx converter";
pub(crate) const SETTINGS_READER: &str = "settings reader";

/// Wraps every collaborator call so failures and timeouts map onto
/// `ReportError` the same way regardless of which stage made the call.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CallPolicy {
    timeout: Option<Duration>,
}

impl CallPolicy {
    pub(crate) fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    pub(crate) async fn run<T, F>(
        &self,
        collaborator: &'static str,
        fut: F,
    ) -> Result<T, ReportError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        let result = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, fut).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        collaborator,
                        timeout_ms = timeout.as_millis() as u64,
                        "collaborator call timed out"
                    );
                    return Err(ReportError::Timeout {
                        collaborator,
                        timeout,
                    });
                }
            },
            None => fut.await,
        };

        result.map_err(|source| ReportError::Collaborator {
            collaborator,
            source,
        })
    }
}
