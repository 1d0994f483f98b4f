//! HTTP polling waiter.
//!
//! Fetches job status on a fixed interval until the job completes, fails,
//! or the attempt budget runs out. Transient network hiccups (matched by
//! the error classifier) consume one attempt and continue; anything else
//! aborts. Cancellation is observed at every suspension point and is never
//! treated as retryable.

use crate::{JobsInterface, TrackingError};
use inscriber_types::{parse_job, ErrorClass, ErrorClassifier, JobStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_MAX_ATTEMPTS: usize = 60;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Polls job status over HTTP until a terminal state or budget exhaustion.
pub struct PollingWaiter {
	jobs: Arc<dyn JobsInterface>,
	classifier: Arc<dyn ErrorClassifier>,
	max_attempts: usize,
	interval: Duration,
}

impl PollingWaiter {
	pub fn new(jobs: Arc<dyn JobsInterface>, classifier: Arc<dyn ErrorClassifier>) -> Self {
		Self {
			jobs,
			classifier,
			max_attempts: DEFAULT_MAX_ATTEMPTS,
			interval: DEFAULT_POLL_INTERVAL,
		}
	}

	pub fn with_budget(mut self, max_attempts: usize, interval: Duration) -> Self {
		self.max_attempts = max_attempts;
		self.interval = interval;
		self
	}

	/// Waits for the job to reach a terminal state.
	pub async fn wait_for_job(
		&self,
		job_id: &str,
		cancel: &CancellationToken,
	) -> Result<JobStatus, TrackingError> {
		let mut last: Option<JobStatus> = None;

		for attempt in 1..=self.max_attempts {
			if cancel.is_cancelled() {
				return Err(TrackingError::Cancelled);
			}

			let fetched = tokio::select! {
				_ = cancel.cancelled() => return Err(TrackingError::Cancelled),
				result = self.jobs.fetch_job(job_id) => result,
			};

			match fetched {
				Ok(raw) => {
					let status = parse_job(&raw);
					if status.is_failed() {
						let message = if status.error_message.is_empty() {
							"inscription failed".to_string()
						} else {
							status.error_message.clone()
						};
						return Err(TrackingError::JobFailed {
							message,
							status: Box::new(status),
						});
					}
					if status.is_completed() {
						tracing::info!(job_id, attempt, "inscription completed");
						return Ok(status);
					}
					tracing::debug!(job_id, attempt, status = %status.status, "job still pending");
					last = Some(status);
				}
				Err(TrackingError::Cancelled) => return Err(TrackingError::Cancelled),
				Err(e) => {
					let message = e.to_string();
					if self.classifier.classify(&message) != ErrorClass::Transient {
						return Err(e);
					}
					tracing::warn!(job_id, attempt, error = %message, "transient fetch error");
				}
			}

			if attempt < self.max_attempts {
				tokio::select! {
					_ = cancel.cancelled() => return Err(TrackingError::Cancelled),
					_ = tokio::time::sleep(self.interval) => {}
				}
			}
		}

		Err(TrackingError::BudgetExhausted {
			attempts: self.max_attempts,
			last: last.map(Box::new),
		})
	}
}
