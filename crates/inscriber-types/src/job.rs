//! Normalized inscription job status.
//!
//! Two independent sources produce the same record: the REST retrieval
//! endpoint and the event stream. Field sets differ slightly between the
//! two, and every field is optional in both, so parsing is total: absent or
//! malformed fields simply keep their zero values.

use crate::codec::{decode_transaction_bytes, encode_transaction_bytes};
use serde::Serialize;
use serde_json::Value;

/// Terminal status string for a successful job.
pub const STATUS_COMPLETED: &str = "completed";
/// Terminal status string for a failed job.
pub const STATUS_FAILED: &str = "failed";

/// The latest known state of an inscription job.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobStatus {
	pub id: String,
	pub status: String,
	pub completed: bool,
	pub transaction_id: String,
	pub topic_id: String,
	pub error_message: String,
	pub total_cost: f64,
	pub total_message_count: u64,
	/// Transaction payload re-encoded as standard base64, when present.
	pub transaction_bytes: String,
}

impl JobStatus {
	pub fn is_failed(&self) -> bool {
		self.status.eq_ignore_ascii_case(STATUS_FAILED)
	}

	pub fn is_completed(&self) -> bool {
		self.completed || self.status.eq_ignore_ascii_case(STATUS_COMPLETED)
	}
}

fn str_field(raw: &Value, key: &str) -> String {
	match raw.get(key) {
		Some(Value::String(s)) => s.clone(),
		Some(Value::Number(n)) => n.to_string(),
		_ => String::new(),
	}
}

fn first_str_field(raw: &Value, keys: &[&str]) -> String {
	for key in keys {
		let value = str_field(raw, key);
		if !value.is_empty() {
			return value;
		}
	}
	String::new()
}

/// Parses a REST job payload. Total: never fails, unknown fields ignored,
/// absent fields keep zero values.
pub fn parse_job(raw: &Value) -> JobStatus {
	let status = str_field(raw, "status");
	let completed = raw
		.get("completed")
		.and_then(Value::as_bool)
		.unwrap_or(false)
		|| status.eq_ignore_ascii_case(STATUS_COMPLETED);

	let transaction_bytes = match raw.get("transactionBytes") {
		None | Some(Value::Null) => String::new(),
		Some(field) => decode_transaction_bytes(field)
			.map(|bytes| encode_transaction_bytes(&bytes))
			.unwrap_or_default(),
	};

	JobStatus {
		id: str_field(raw, "id"),
		completed,
		transaction_id: first_str_field(raw, &["tx_id", "transactionId"]),
		topic_id: str_field(raw, "topic_id"),
		error_message: str_field(raw, "error"),
		total_cost: raw.get("totalCost").and_then(Value::as_f64).unwrap_or(0.0),
		total_message_count: raw
			.get("totalMessages")
			.and_then(Value::as_u64)
			.unwrap_or(0),
		transaction_bytes,
		status,
	}
}

/// Parses an event-stream payload into the same record shape.
pub fn parse_event(raw: &Value) -> JobStatus {
	let status = str_field(raw, "status");
	JobStatus {
		id: str_field(raw, "id"),
		completed: status.eq_ignore_ascii_case(STATUS_COMPLETED),
		transaction_id: first_str_field(raw, &["tx_id", "transactionId"]),
		topic_id: first_str_field(raw, &["topicId", "topic_id"]),
		error_message: str_field(raw, "error"),
		status,
		..JobStatus::default()
	}
}
