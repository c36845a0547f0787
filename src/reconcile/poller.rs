//! Operation Poller
//!
//! Waits for an asynchronous Fusion operation to reach `Succeeded` or
//! `Failed`. Poll cadence follows the `retry_in` hint the service attaches
//! to each status, clamped to the configured bounds.

use crate::domain::ports::{Operation, OperationStatus, OperationsApiRef};
use crate::error::{Error, Result};
use std::time::Duration;
use tracing::{debug, info};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the operation poller
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Sleep used when the service gives no `retry_in` hint
    pub default_interval: Duration,
    /// Lower bound on the sleep between polls
    pub min_interval: Duration,
    /// Upper bound on the sleep between polls
    pub max_interval: Duration,
    /// Give up after this long; `None` waits indefinitely
    pub deadline: Option<Duration>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            default_interval: Duration::from_secs(1),
            min_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(30),
            deadline: None,
        }
    }
}

// =============================================================================
// Poller
// =============================================================================

/// Resolves operation handles to terminal results
pub struct OperationPoller {
    operations: OperationsApiRef,
    config: PollerConfig,
}

impl OperationPoller {
    /// Create a new poller over an operations endpoint
    pub fn new(operations: OperationsApiRef, config: PollerConfig) -> Self {
        Self { operations, config }
    }

    /// Wait for the operation and fail with [`Error::OperationFailed`] if it
    /// did not succeed
    pub async fn await_completion(&self, handle: &Operation) -> Result<Operation> {
        let operation = self.await_terminal(handle).await?;
        if operation.status == OperationStatus::Failed {
            return Err(Error::OperationFailed {
                operation_id: operation.id.clone(),
                error: operation.error.clone().unwrap_or_default(),
            });
        }
        Ok(operation)
    }

    /// Wait for the operation to reach a terminal status, whichever it is
    pub async fn await_terminal(&self, handle: &Operation) -> Result<Operation> {
        match self.config.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.poll(handle))
                .await
                .map_err(|_| Error::OperationTimeout {
                    operation_id: handle.id.clone(),
                    waited: deadline,
                })?,
            None => self.poll(handle).await,
        }
    }

    async fn poll(&self, handle: &Operation) -> Result<Operation> {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let operation = match self.operations.get_operation(&handle.id).await {
                Ok(operation) => operation,
                Err(Error::Transport(source)) => {
                    return Err(Error::OperationWait {
                        operation_id: handle.id.clone(),
                        source,
                    })
                }
                Err(e) => return Err(e),
            };

            debug!(
                "Operation {} is {} (poll {})",
                operation.id, operation.status, attempt
            );

            if operation.status.is_terminal() {
                info!(
                    "Operation {} finished with status {} after {} poll(s)",
                    operation.id, operation.status, attempt
                );
                return Ok(operation);
            }

            tokio::time::sleep(self.interval(&operation)).await;
        }
    }

    /// Sleep before the next poll of `operation`. An inverted min/max pair
    /// resolves to `max_interval`.
    fn interval(&self, operation: &Operation) -> Duration {
        let hinted = operation
            .retry_in
            .map(Duration::from_millis)
            .unwrap_or(self.config.default_interval);
        hinted
            .max(self.config.min_interval)
            .min(self.config.max_interval)
    }
}
