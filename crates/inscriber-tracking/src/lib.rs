//! Completion tracking for inscription jobs.
//!
//! An inscription is an asynchronous, multi-stage background job that
//! chunks content into topics; this module tracks one to a terminal state
//! through two interchangeable transports. The event-stream waiter listens
//! on a persistent connection with an inactivity timer; the polling waiter
//! fetches status over HTTP on a fixed interval. The orchestrator tries the
//! stream first (when configured) and degrades to polling on any stream
//! error, so callers see one uniform result either way.

use async_trait::async_trait;
use inscriber_types::JobStatus;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod ws;
}

pub mod orchestrator;
pub mod polling;
pub mod stream;

pub use implementations::http::HttpJobs;
pub use implementations::ws::WsEventSource;
pub use orchestrator::{CompletionOptions, CompletionOrchestrator, ConnectionMode};
pub use polling::{PollingWaiter, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL};
pub use stream::{
	EventChannels, EventSource, EventStreamWaiter, ProgressCallback, DEFAULT_INACTIVITY_TIMEOUT,
};

/// Errors that can occur while tracking a job to completion.
#[derive(Debug, Error)]
pub enum TrackingError {
	/// The caller cancelled the wait.
	#[error("wait cancelled")]
	Cancelled,
	/// The event stream went quiet for longer than the inactivity budget.
	#[error("no event-stream activity for {0:?}")]
	InactivityTimeout(Duration),
	/// The job reached the terminal `failed` state.
	#[error("inscription failed: {message}")]
	JobFailed {
		message: String,
		/// The status record the failure was parsed from.
		status: Box<JobStatus>,
	},
	/// The polling budget ran out before a terminal state.
	#[error("job not finished after {attempts} polling attempts")]
	BudgetExhausted {
		attempts: usize,
		/// Last successfully fetched status, if any.
		last: Option<Box<JobStatus>>,
	},
	/// An HTTP request to the job service failed.
	#[error("job request failed: {0}")]
	Http(String),
	/// The event-stream transport failed.
	#[error("event stream error: {0}")]
	Stream(String),
	/// Server discovery returned no candidates at all.
	#[error("no event-stream servers available")]
	NoStreamServers,
}

/// One candidate event-stream server from the discovery endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StreamServer {
	#[serde(default)]
	pub url: String,
	#[serde(default)]
	pub status: String,
}

/// Discovery response: candidate servers plus an optional recommendation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamDiscovery {
	#[serde(default)]
	pub recommended: Option<StreamServer>,
	#[serde(default)]
	pub servers: Vec<StreamServer>,
}

/// Trait defining the job REST collaborator.
#[async_trait]
pub trait JobsInterface: Send + Sync {
	/// Fetches the raw JSON record for a job.
	async fn fetch_job(&self, id: &str) -> Result<Value, TrackingError>;

	/// Lists candidate event-stream servers.
	async fn stream_servers(&self) -> Result<StreamDiscovery, TrackingError>;
}
