//! Event-stream waiter.
//!
//! Listens on a persistent connection for job events instead of polling.
//! Inbound events arrive on one channel per category and are merged at a
//! single select point, which keeps the state machine testable with a fake
//! event source. Events are correlated to the job of interest by normalized
//! transaction id; only relevant events reset the inactivity timer. Any
//! error here is terminal for this attempt — the orchestrator decides
//! whether to fall back to polling.

use crate::{JobsInterface, StreamDiscovery, StreamServer, TrackingError};
use async_trait::async_trait;
use inscriber_types::{normalize_transaction_id, parse_event, JobStatus, Secret};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(30);

/// Invoked with a 0-100 percentage on every relevant progress event.
pub type ProgressCallback = dyn Fn(u8) + Send + Sync;

/// One receiver per event category, fed by the connected source.
pub struct EventChannels {
	/// Transport-level failures (connection dropped, protocol errors).
	pub transport_errors: mpsc::Receiver<String>,
	/// Application-level inscription errors.
	pub inscription_errors: mpsc::Receiver<Value>,
	/// Progress events.
	pub progress: mpsc::Receiver<Value>,
	/// Completion events.
	pub completion: mpsc::Receiver<Value>,
}

/// Trait defining the event-stream transport.
#[async_trait]
pub trait EventSource: Send + Sync {
	/// Opens a connection to the server and starts delivering events.
	async fn connect(
		&self,
		server_url: &str,
		api_key: &Secret,
	) -> Result<EventChannels, TrackingError>;
}

/// Picks the server to connect to: the recommended one when present, then
/// the first active candidate, then the first candidate at all.
pub(crate) fn pick_server(discovery: &StreamDiscovery) -> Option<StreamServer> {
	discovery
		.recommended
		.clone()
		.or_else(|| {
			discovery
				.servers
				.iter()
				.find(|s| s.status.eq_ignore_ascii_case("active"))
				.cloned()
		})
		.or_else(|| discovery.servers.first().cloned())
}

fn progress_percent(payload: &Value) -> u8 {
	let raw = payload
		.get("progressPercent")
		.or_else(|| payload.get("progress"))
		.and_then(Value::as_f64)
		.unwrap_or(0.0);
	raw.clamp(0.0, 100.0) as u8
}

/// True when the payload refers to the target job. An empty target matches
/// everything; a non-empty target requires one of the id fields to match.
fn correlates(target: &str, payload: &Value) -> bool {
	if target.is_empty() {
		return true;
	}
	["jobId", "tx_id", "transactionId"].iter().any(|key| {
		payload
			.get(*key)
			.and_then(Value::as_str)
			.map(|v| normalize_transaction_id(v) == target)
			.unwrap_or(false)
	})
}

/// Waits for job completion over a persistent event stream.
pub struct EventStreamWaiter {
	jobs: Arc<dyn JobsInterface>,
	source: Arc<dyn EventSource>,
	api_key: Secret,
	endpoint: Option<String>,
	inactivity_timeout: Duration,
}

impl EventStreamWaiter {
	pub fn new(jobs: Arc<dyn JobsInterface>, source: Arc<dyn EventSource>, api_key: Secret) -> Self {
		Self {
			jobs,
			source,
			api_key,
			endpoint: None,
			inactivity_timeout: DEFAULT_INACTIVITY_TIMEOUT,
		}
	}

	/// Uses a fixed endpoint instead of querying server discovery.
	pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
		self.endpoint = endpoint;
		self
	}

	pub fn with_inactivity_timeout(mut self, timeout: Duration) -> Self {
		self.inactivity_timeout = timeout;
		self
	}

	async fn resolve_endpoint(&self) -> Result<String, TrackingError> {
		if let Some(endpoint) = &self.endpoint {
			return Ok(endpoint.clone());
		}
		let discovery = self.jobs.stream_servers().await?;
		let server = pick_server(&discovery).ok_or(TrackingError::NoStreamServers)?;
		tracing::debug!(url = %server.url, status = %server.status, "picked event-stream server");
		Ok(server.url)
	}

	/// Waits for the job to complete, correlating inbound events against
	/// its normalized transaction id.
	pub async fn wait_for_job(
		&self,
		job_id: &str,
		on_progress: Option<&ProgressCallback>,
		cancel: &CancellationToken,
	) -> Result<JobStatus, TrackingError> {
		// Discovery and the handshake block too; both observe cancellation.
		let endpoint = tokio::select! {
			_ = cancel.cancelled() => return Err(TrackingError::Cancelled),
			resolved = self.resolve_endpoint() => resolved?,
		};
		let mut channels = tokio::select! {
			_ = cancel.cancelled() => return Err(TrackingError::Cancelled),
			connected = self.source.connect(&endpoint, &self.api_key) => connected?,
		};
		let target = normalize_transaction_id(job_id);

		let mut idle = Box::pin(tokio::time::sleep(self.inactivity_timeout));

		loop {
			tokio::select! {
				_ = cancel.cancelled() => {
					return Err(TrackingError::Cancelled);
				}
				_ = idle.as_mut() => {
					return Err(TrackingError::InactivityTimeout(self.inactivity_timeout));
				}
				Some(message) = channels.transport_errors.recv() => {
					return Err(TrackingError::Stream(message));
				}
				Some(payload) = channels.inscription_errors.recv() => {
					if !correlates(&target, &payload) {
						continue;
					}
					let status = parse_event(&payload);
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
				Some(payload) = channels.progress.recv() => {
					if !correlates(&target, &payload) {
						continue;
					}
					idle.as_mut().reset(Instant::now() + self.inactivity_timeout);
					let percent = progress_percent(&payload);
					tracing::debug!(job_id, percent, "inscription progress");
					if let Some(callback) = on_progress {
						callback(percent);
					}
					let mut status = parse_event(&payload);
					if status.is_completed() || percent >= 100 {
						status.completed = true;
						return Ok(status);
					}
				}
				Some(payload) = channels.completion.recv() => {
					if !correlates(&target, &payload) {
						continue;
					}
					let mut status = parse_event(&payload);
					status.completed = true;
					tracing::info!(job_id, "inscription completed");
					return Ok(status);
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use std::sync::Mutex;

	/// Event source handing out channels prepared by the test.
	struct FakeSource {
		channels: Mutex<Option<EventChannels>>,
		connected_to: Mutex<Vec<String>>,
	}

	impl FakeSource {
		fn new(channels: EventChannels) -> Self {
			Self {
				channels: Mutex::new(Some(channels)),
				connected_to: Mutex::new(Vec::new()),
			}
		}
	}

	#[async_trait]
	impl EventSource for FakeSource {
		async fn connect(
			&self,
			server_url: &str,
			_api_key: &Secret,
		) -> Result<EventChannels, TrackingError> {
			self.connected_to.lock().unwrap().push(server_url.to_string());
			self.channels
				.lock()
				.unwrap()
				.take()
				.ok_or_else(|| TrackingError::Stream("already connected".into()))
		}
	}

	struct NoJobs;

	#[async_trait]
	impl JobsInterface for NoJobs {
		async fn fetch_job(&self, _id: &str) -> Result<Value, TrackingError> {
			Err(TrackingError::Http("not under test".into()))
		}

		async fn stream_servers(&self) -> Result<StreamDiscovery, TrackingError> {
			Ok(StreamDiscovery::default())
		}
	}

	struct Senders {
		transport: mpsc::Sender<String>,
		errors: mpsc::Sender<Value>,
		progress: mpsc::Sender<Value>,
		completion: mpsc::Sender<Value>,
	}

	fn channels() -> (Senders, EventChannels) {
		let (transport, transport_errors) = mpsc::channel(16);
		let (errors, inscription_errors) = mpsc::channel(16);
		let (progress, progress_rx) = mpsc::channel(16);
		let (completion, completion_rx) = mpsc::channel(16);
		(
			Senders {
				transport,
				errors,
				progress,
				completion,
			},
			EventChannels {
				transport_errors,
				inscription_errors,
				progress: progress_rx,
				completion: completion_rx,
			},
		)
	}

	fn waiter(channels: EventChannels) -> EventStreamWaiter {
		EventStreamWaiter::new(
			Arc::new(NoJobs),
			Arc::new(FakeSource::new(channels)),
			Secret::from("api-key"),
		)
		.with_endpoint(Some("wss://stream.test".into()))
	}

	#[tokio::test(start_paused = true)]
	async fn completion_event_resolves_across_id_forms() {
		let (senders, rx) = channels();
		// Target uses the `@` form, event carries the dash form.
		senders
			.completion
			.send(json!({
				"tx_id": "0.0.9-1700-42",
				"status": "completed",
				"topicId": "0.0.55",
			}))
			.await
			.unwrap();

		let status = waiter(rx)
			.wait_for_job("0.0.9@1700.42", None, &CancellationToken::new())
			.await
			.unwrap();

		assert!(status.completed);
		assert_eq!(status.topic_id, "0.0.55");
	}

	#[tokio::test(start_paused = true)]
	async fn unrelated_events_do_not_resolve_or_reset_the_timer() {
		let (senders, rx) = channels();
		let waiter = waiter(rx).with_inactivity_timeout(Duration::from_secs(30));

		senders
			.progress
			.send(json!({"jobId": "0.0.2@1.1", "progressPercent": 50}))
			.await
			.unwrap();

		let start = Instant::now();
		let handle = tokio::spawn(async move {
			let result = waiter
				.wait_for_job("0.0.1@1.1", None, &CancellationToken::new())
				.await;
			(result, Instant::now())
		});

		// A second unrelated event partway through the window.
		tokio::time::sleep(Duration::from_secs(10)).await;
		senders
			.progress
			.send(json!({"transactionId": "0.0.3@1.1", "progressPercent": 99}))
			.await
			.unwrap();
		tokio::time::sleep(Duration::from_secs(25)).await;

		let (result, finished_at) = handle.await.unwrap();
		assert!(matches!(
			result,
			Err(TrackingError::InactivityTimeout(_))
		));
		// Timed out exactly one inactivity window after the start: the
		// unrelated events never reset the timer.
		assert_eq!(finished_at - start, Duration::from_secs(30));
	}

	#[tokio::test(start_paused = true)]
	async fn matching_progress_resets_timer_and_reports_percent() {
		let (senders, rx) = channels();
		let waiter = waiter(rx).with_inactivity_timeout(Duration::from_secs(30));
		let seen: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
		let sink = seen.clone();

		let start = Instant::now();
		let handle = tokio::spawn(async move {
			let callback = move |p: u8| sink.lock().unwrap().push(p);
			let result = waiter
				.wait_for_job("job-7", Some(&callback), &CancellationToken::new())
				.await;
			(result, Instant::now())
		});

		// Progress at t=20 pushes the deadline to t=50.
		tokio::time::sleep(Duration::from_secs(20)).await;
		senders
			.progress
			.send(json!({"jobId": "job-7", "progressPercent": 40}))
			.await
			.unwrap();
		drop(senders);

		let (result, finished_at) = handle.await.unwrap();
		assert!(matches!(
			result,
			Err(TrackingError::InactivityTimeout(_))
		));
		assert_eq!(finished_at - start, Duration::from_secs(50));
		assert_eq!(*seen.lock().unwrap(), vec![40]);
	}

	#[tokio::test(start_paused = true)]
	async fn full_progress_counts_as_completion() {
		let (senders, rx) = channels();
		senders
			.progress
			.send(json!({"jobId": "job-7", "progressPercent": 100, "status": "processing"}))
			.await
			.unwrap();

		let status = waiter(rx)
			.wait_for_job("job-7", None, &CancellationToken::new())
			.await
			.unwrap();
		assert!(status.completed);
	}

	#[tokio::test(start_paused = true)]
	async fn transport_errors_abort() {
		let (senders, rx) = channels();
		senders
			.transport
			.send("connection dropped".into())
			.await
			.unwrap();

		let err = waiter(rx)
			.wait_for_job("job-7", None, &CancellationToken::new())
			.await
			.unwrap_err();
		assert!(matches!(err, TrackingError::Stream(_)));
	}

	#[tokio::test(start_paused = true)]
	async fn inscription_errors_abort_with_job_failure() {
		let (senders, rx) = channels();
		senders
			.errors
			.send(json!({"jobId": "job-7", "error": "chunk rejected", "status": "failed"}))
			.await
			.unwrap();

		let err = waiter(rx)
			.wait_for_job("job-7", None, &CancellationToken::new())
			.await
			.unwrap_err();
		match err {
			TrackingError::JobFailed { message, .. } => assert_eq!(message, "chunk rejected"),
			other => panic!("unexpected error: {}", other),
		}
	}

	/// Event source whose handshake never completes.
	struct StuckSource;

	#[async_trait]
	impl EventSource for StuckSource {
		async fn connect(
			&self,
			_server_url: &str,
			_api_key: &Secret,
		) -> Result<EventChannels, TrackingError> {
			std::future::pending().await
		}
	}

	/// Jobs backend whose server discovery never answers.
	struct StuckJobs;

	#[async_trait]
	impl JobsInterface for StuckJobs {
		async fn fetch_job(&self, _id: &str) -> Result<Value, TrackingError> {
			Err(TrackingError::Http("not under test".into()))
		}

		async fn stream_servers(&self) -> Result<StreamDiscovery, TrackingError> {
			std::future::pending().await
		}
	}

	#[tokio::test(start_paused = true)]
	async fn cancellation_aborts_a_hung_connect() {
		let waiter = EventStreamWaiter::new(
			Arc::new(NoJobs),
			Arc::new(StuckSource),
			Secret::from("api-key"),
		)
		.with_endpoint(Some("wss://stream.test".into()));

		let cancel = CancellationToken::new();
		cancel.cancel();

		let err = waiter
			.wait_for_job("job-7", None, &cancel)
			.await
			.unwrap_err();
		assert!(matches!(err, TrackingError::Cancelled));
	}

	#[tokio::test(start_paused = true)]
	async fn cancellation_aborts_hung_server_discovery() {
		let waiter = EventStreamWaiter::new(
			Arc::new(StuckJobs),
			Arc::new(StuckSource),
			Secret::from("api-key"),
		);

		let cancel = CancellationToken::new();
		let stop = cancel.clone();
		let handle = tokio::spawn(async move {
			waiter.wait_for_job("job-7", None, &stop).await
		});

		tokio::time::sleep(Duration::from_secs(1)).await;
		cancel.cancel();

		let err = handle.await.unwrap().unwrap_err();
		assert!(matches!(err, TrackingError::Cancelled));
	}

	#[tokio::test(start_paused = true)]
	async fn cancellation_wins_over_waiting() {
		let (_senders, rx) = channels();
		let cancel = CancellationToken::new();
		cancel.cancel();

		let err = waiter(rx)
			.wait_for_job("job-7", None, &cancel)
			.await
			.unwrap_err();
		assert!(matches!(err, TrackingError::Cancelled));
	}

	#[test]
	fn server_selection_order() {
		let active = StreamServer {
			url: "wss://b".into(),
			status: "active".into(),
		};
		let draining = StreamServer {
			url: "wss://a".into(),
			status: "draining".into(),
		};
		let recommended = StreamServer {
			url: "wss://r".into(),
			status: "active".into(),
		};

		let discovery = StreamDiscovery {
			recommended: Some(recommended.clone()),
			servers: vec![draining.clone(), active.clone()],
		};
		assert_eq!(pick_server(&discovery), Some(recommended));

		let discovery = StreamDiscovery {
			recommended: None,
			servers: vec![draining.clone(), active.clone()],
		};
		assert_eq!(pick_server(&discovery), Some(active));

		let discovery = StreamDiscovery {
			recommended: None,
			servers: vec![draining.clone()],
		};
		assert_eq!(pick_server(&discovery), Some(draining));

		assert_eq!(pick_server(&StreamDiscovery::default()), None);
	}
}
