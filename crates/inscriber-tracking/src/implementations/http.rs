//! REST implementation of the job collaborator.
//!
//! Both endpoints authenticate with an `x-api-key` header. Responses are
//! handed back as raw JSON; field mapping happens in the status parsers so
//! the "absent field, zero value" contract stays in one place.

use crate::{JobsInterface, StreamDiscovery, TrackingError};
use async_trait::async_trait;
use inscriber_types::Secret;
use serde_json::Value;

/// Job-service client over REST.
pub struct HttpJobs {
	http: reqwest::Client,
	base_url: String,
	api_key: Secret,
}

impl HttpJobs {
	pub fn new(base_url: impl Into<String>, api_key: Secret) -> Self {
		Self {
			http: reqwest::Client::new(),
			base_url: base_url.into().trim_end_matches('/').to_string(),
			api_key,
		}
	}

	async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, TrackingError> {
		let url = format!("{}{}", self.base_url, path);
		let response = self
			.http
			.get(&url)
			.query(query)
			.header("x-api-key", self.api_key.expose())
			.send()
			.await
			.map_err(|e| TrackingError::Http(e.to_string()))?;

		if !response.status().is_success() {
			return Err(TrackingError::Http(format!(
				"status {} from {}",
				response.status(),
				path
			)));
		}

		response
			.json()
			.await
			.map_err(|e| TrackingError::Http(e.to_string()))
	}
}

#[async_trait]
impl JobsInterface for HttpJobs {
	async fn fetch_job(&self, id: &str) -> Result<Value, TrackingError> {
		self.get("/inscriptions/retrieve-inscription", &[("id", id)])
			.await
	}

	async fn stream_servers(&self) -> Result<StreamDiscovery, TrackingError> {
		let raw = self.get("/inscriptions/websocket-servers", &[]).await?;
		serde_json::from_value(raw).map_err(|e| TrackingError::Http(e.to_string()))
	}
}
