//! Transaction payload codec.
//!
//! Upstream services hand back the opaque transaction blob in one of two
//! JSON encodings: a base64 string, or a serialized buffer object of the
//! shape `{"type": "Buffer", "data": [..bytes..]}`. Both normalize to raw
//! bytes here; re-serialization always uses standard base64.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::Value;
use thiserror::Error;

/// Errors produced while decoding a transaction payload. All of them are
/// terminal; a malformed payload never becomes valid by retrying.
#[derive(Debug, Error)]
pub enum CodecError {
	#[error("transaction bytes must be base64: {0}")]
	InvalidBase64(String),
	#[error("unsupported buffer tag {0:?}, expected \"Buffer\"")]
	UnsupportedTag(String),
	#[error("buffer data must be an array of byte values")]
	InvalidBufferData,
	#[error("byte value {0} out of range")]
	ByteOutOfRange(i64),
	#[error("unsupported transaction bytes shape")]
	UnsupportedShape,
}

/// Decodes a transaction-bytes JSON field into raw bytes.
pub fn decode_transaction_bytes(field: &Value) -> Result<Vec<u8>, CodecError> {
	match field {
		Value::String(s) => BASE64
			.decode(s.as_bytes())
			.map_err(|e| CodecError::InvalidBase64(e.to_string())),
		Value::Object(map) => {
			let tag = map.get("type").and_then(Value::as_str).unwrap_or_default();
			if tag != "Buffer" {
				return Err(CodecError::UnsupportedTag(tag.to_string()));
			}
			let data = map
				.get("data")
				.and_then(Value::as_array)
				.ok_or(CodecError::InvalidBufferData)?;
			let mut bytes = Vec::with_capacity(data.len());
			for item in data {
				let n = item.as_i64().ok_or(CodecError::InvalidBufferData)?;
				if !(0..=255).contains(&n) {
					return Err(CodecError::ByteOutOfRange(n));
				}
				bytes.push(n as u8);
			}
			Ok(bytes)
		}
		_ => Err(CodecError::UnsupportedShape),
	}
}

/// Encodes raw transaction bytes back to the canonical base64 form.
pub fn encode_transaction_bytes(bytes: &[u8]) -> String {
	BASE64.encode(bytes)
}

/// Decodes a bare base64 string, as supplied by callers of the executor.
pub fn decode_base64(s: &str) -> Result<Vec<u8>, CodecError> {
	BASE64
		.decode(s.as_bytes())
		.map_err(|e| CodecError::InvalidBase64(e.to_string()))
}
