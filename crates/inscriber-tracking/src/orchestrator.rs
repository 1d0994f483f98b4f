//! Completion orchestration.
//!
//! Entry point for callers: picks the waiting transport from the
//! connection mode and degrades gracefully. Any event-stream failure falls
//! back to HTTP polling once with the same budget; polling-only mode skips
//! the stream entirely.

use crate::polling::PollingWaiter;
use crate::stream::{EventSource, EventStreamWaiter, ProgressCallback};
use crate::{JobsInterface, TrackingError, DEFAULT_INACTIVITY_TIMEOUT};
use crate::{DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL};
use inscriber_types::{parse_job, ErrorClassifier, JobStatus, Secret};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Which transport(s) a wait is allowed to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionMode {
	/// Event stream first, polling on any stream error.
	#[default]
	Auto,
	/// Event stream first, polling on any stream error.
	Stream,
	/// Polling only.
	Http,
}

/// Per-call waiting options.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
	pub mode: ConnectionMode,
	/// When false, fetch the current status once and return immediately.
	pub wait_for_completion: bool,
	pub max_attempts: usize,
	pub interval: Duration,
	pub inactivity_timeout: Duration,
}

impl Default for CompletionOptions {
	fn default() -> Self {
		Self {
			mode: ConnectionMode::Auto,
			wait_for_completion: true,
			max_attempts: DEFAULT_MAX_ATTEMPTS,
			interval: DEFAULT_POLL_INTERVAL,
			inactivity_timeout: DEFAULT_INACTIVITY_TIMEOUT,
		}
	}
}

/// Tracks a job to completion over whichever transport is available.
pub struct CompletionOrchestrator {
	jobs: Arc<dyn JobsInterface>,
	source: Arc<dyn EventSource>,
	classifier: Arc<dyn ErrorClassifier>,
	api_key: Secret,
	endpoint: Option<String>,
}

impl CompletionOrchestrator {
	pub fn new(
		jobs: Arc<dyn JobsInterface>,
		source: Arc<dyn EventSource>,
		classifier: Arc<dyn ErrorClassifier>,
		api_key: Secret,
	) -> Self {
		Self {
			jobs,
			source,
			classifier,
			api_key,
			endpoint: None,
		}
	}

	/// Uses a fixed event-stream endpoint instead of server discovery.
	pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
		self.endpoint = endpoint;
		self
	}

	/// Waits for the job to reach a terminal state, or fetches the current
	/// status once when `wait_for_completion` is off.
	pub async fn wait_for_completion(
		&self,
		job_id: &str,
		options: &CompletionOptions,
		on_progress: Option<&ProgressCallback>,
		cancel: &CancellationToken,
	) -> Result<JobStatus, TrackingError> {
		if !options.wait_for_completion {
			let raw = tokio::select! {
				_ = cancel.cancelled() => return Err(TrackingError::Cancelled),
				result = self.jobs.fetch_job(job_id) => result?,
			};
			return Ok(parse_job(&raw));
		}

		if options.mode != ConnectionMode::Http {
			let stream = EventStreamWaiter::new(
				self.jobs.clone(),
				self.source.clone(),
				self.api_key.clone(),
			)
			.with_endpoint(self.endpoint.clone())
			.with_inactivity_timeout(options.inactivity_timeout);

			match stream.wait_for_job(job_id, on_progress, cancel).await {
				Ok(status) => return Ok(status),
				Err(e) => {
					// Unconditional: stream unavailability of any kind
					// degrades to polling.
					tracing::warn!(job_id, error = %e, "event stream failed, falling back to polling");
				}
			}
		}

		PollingWaiter::new(self.jobs.clone(), self.classifier.clone())
			.with_budget(options.max_attempts, options.interval)
			.wait_for_job(job_id, cancel)
			.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::stream::EventChannels;
	use crate::StreamDiscovery;
	use async_trait::async_trait;
	use inscriber_types::SubstringClassifier;
	use serde_json::{json, Value};
	use std::sync::atomic::{AtomicUsize, Ordering};

	/// Source that always fails to connect, counting attempts.
	struct BrokenSource {
		connects: AtomicUsize,
	}

	#[async_trait]
	impl EventSource for BrokenSource {
		async fn connect(
			&self,
			_server_url: &str,
			_api_key: &Secret,
		) -> Result<EventChannels, TrackingError> {
			self.connects.fetch_add(1, Ordering::SeqCst);
			Err(TrackingError::Stream("connect refused".into()))
		}
	}

	/// Jobs fake that completes after a fixed number of pending fetches.
	struct EventuallyDone {
		pending_fetches: usize,
		fetches: AtomicUsize,
	}

	#[async_trait]
	impl JobsInterface for EventuallyDone {
		async fn fetch_job(&self, _id: &str) -> Result<Value, TrackingError> {
			let n = self.fetches.fetch_add(1, Ordering::SeqCst);
			if n < self.pending_fetches {
				Ok(json!({"status": "processing"}))
			} else {
				Ok(json!({"status": "completed"}))
			}
		}

		async fn stream_servers(&self) -> Result<StreamDiscovery, TrackingError> {
			Ok(StreamDiscovery::default())
		}
	}

	fn orchestrator(
		jobs: Arc<EventuallyDone>,
		source: Arc<BrokenSource>,
	) -> CompletionOrchestrator {
		CompletionOrchestrator::new(
			jobs,
			source,
			Arc::new(SubstringClassifier),
			Secret::from("api-key"),
		)
		.with_endpoint(Some("wss://stream.test".into()))
	}

	#[tokio::test(start_paused = true)]
	async fn falls_back_to_polling_on_stream_failure() {
		let jobs = Arc::new(EventuallyDone {
			pending_fetches: 2,
			fetches: AtomicUsize::new(0),
		});
		let source = Arc::new(BrokenSource {
			connects: AtomicUsize::new(0),
		});

		let status = orchestrator(jobs.clone(), source.clone())
			.wait_for_completion(
				"job-1",
				&CompletionOptions::default(),
				None,
				&CancellationToken::new(),
			)
			.await
			.unwrap();

		assert!(status.completed);
		// One stream attempt, then polling until done.
		assert_eq!(source.connects.load(Ordering::SeqCst), 1);
		assert_eq!(jobs.fetches.load(Ordering::SeqCst), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn http_mode_never_touches_the_stream() {
		let jobs = Arc::new(EventuallyDone {
			pending_fetches: 0,
			fetches: AtomicUsize::new(0),
		});
		let source = Arc::new(BrokenSource {
			connects: AtomicUsize::new(0),
		});

		let options = CompletionOptions {
			mode: ConnectionMode::Http,
			..CompletionOptions::default()
		};
		let status = orchestrator(jobs.clone(), source.clone())
			.wait_for_completion("job-1", &options, None, &CancellationToken::new())
			.await
			.unwrap();

		assert!(status.completed);
		assert_eq!(source.connects.load(Ordering::SeqCst), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn skipping_the_wait_fetches_once() {
		let jobs = Arc::new(EventuallyDone {
			pending_fetches: 10,
			fetches: AtomicUsize::new(0),
		});
		let source = Arc::new(BrokenSource {
			connects: AtomicUsize::new(0),
		});

		let options = CompletionOptions {
			wait_for_completion: false,
			..CompletionOptions::default()
		};
		let status = orchestrator(jobs.clone(), source.clone())
			.wait_for_completion("job-1", &options, None, &CancellationToken::new())
			.await
			.unwrap();

		assert_eq!(status.status, "processing");
		assert!(!status.completed);
		assert_eq!(jobs.fetches.load(Ordering::SeqCst), 1);
		assert_eq!(source.connects.load(Ordering::SeqCst), 0);
	}
}
