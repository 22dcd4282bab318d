use anyhow::Result;
use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::fleet::Fleet;
use crate::models::vehicle::VehicleUpdate;

#[derive(Debug, Error)]
pub enum PushError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API rejected the update ({0})")]
    Rejected(StatusCode),

    #[error("API failed ({0})")]
    Server(StatusCode),
}

impl PushError {
    /// Client errors will not get better by sending the same body again.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, PushError::Rejected(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Delivered { attempts: u32 },
    Dropped { attempts: u32 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushCounts {
    pub delivered: u64,
    pub retried: u64,
    pub dropped: u64,
}

/// Running totals since the publisher was created.
#[derive(Debug, Default)]
pub struct PushMetrics {
    delivered: AtomicU64,
    retried: AtomicU64,
    dropped: AtomicU64,
}

impl PushMetrics {
    pub fn snapshot(&self) -> PushCounts {
        PushCounts {
            delivered: self.delivered.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Pushes vehicle positions to `POST {api_base}/update/`.
#[derive(Debug)]
pub struct PositionPublisher {
    client: Client,
    endpoint: String,
    policy: RetryPolicy,
    concurrency: usize,
    metrics: PushMetrics,
}

impl PositionPublisher {
    pub fn new(api_base: &str, timeout: Duration, policy: RetryPolicy, concurrency: usize) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/update/", api_base.trim_end_matches('/')),
            policy,
            concurrency: concurrency.max(1),
            metrics: PushMetrics::default(),
        })
    }

    pub fn metrics(&self) -> &PushMetrics {
        &self.metrics
    }

    async fn send_once(&self, update: &VehicleUpdate) -> Result<(), PushError> {
        let response = self.client.post(&self.endpoint).json(update).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status.is_client_error() {
            Err(PushError::Rejected(status))
        } else {
            Err(PushError::Server(status))
        }
    }

    /// Sends one update, retrying up to the policy's limit, then gives up.
    pub async fn publish(&self, update: &VehicleUpdate) -> PushOutcome {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.send_once(update).await {
                Ok(()) => {
                    self.metrics.delivered.fetch_add(1, Ordering::Relaxed);
                    return PushOutcome::Delivered { attempts };
                }
                Err(e) if e.is_retryable() && attempts < self.policy.max_attempts => {
                    debug!(
                        "Push for {:?} failed (attempt {}): {}",
                        update.vehicle_id, attempts, e
                    );
                    self.metrics.retried.fetch_add(1, Ordering::Relaxed);
                    tokio::time::sleep(self.policy.backoff).await;
                }
                Err(e) => {
                    debug!(
                        "Dropping update for {:?} after {} attempt(s): {}",
                        update.vehicle_id, attempts, e
                    );
                    self.metrics.dropped.fetch_add(1, Ordering::Relaxed);
                    return PushOutcome::Dropped { attempts };
                }
            }
        }
    }

    /// Pushes every vehicle's position and waits for all of them.
    pub async fn publish_fleet(&self, fleet: &Fleet) -> PushCounts {
        let before = self.metrics.snapshot();

        let outcomes: Vec<PushOutcome> = stream::iter(fleet.vehicles().iter().map(|v| v.position_update()))
            .map(|update| async move { self.publish(&update).await })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let after = self.metrics.snapshot();
        let tick = PushCounts {
            delivered: after.delivered - before.delivered,
            retried: after.retried - before.retried,
            dropped: after.dropped - before.dropped,
        };
        if tick.dropped > 0 {
            warn!(
                "Dropped {} of {} position updates this tick",
                tick.dropped,
                outcomes.len()
            );
        }
        tick
    }
}
