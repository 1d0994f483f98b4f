//! Mirror-node collaborator boundary.
//!
//! The mirror node is a REST-queryable index of ledger history. The only
//! read this core needs is the key-algorithm hint attached to an account,
//! which disambiguates how a raw private-key string should be parsed.

use async_trait::async_trait;
use inscriber_types::{AccountId, Network};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod rest;
}

pub use implementations::rest::RestMirror;

/// Errors that can occur while reading from the mirror node.
#[derive(Debug, Error)]
pub enum MirrorError {
	/// Error that occurs during network communication.
	#[error("mirror request failed: {0}")]
	Request(String),
	/// Error that occurs when the mirror returns an unexpected payload.
	#[error("unexpected mirror response: {0}")]
	Response(String),
}

/// Trait defining the mirror-node reads this core consumes.
#[async_trait]
pub trait MirrorInterface: Send + Sync {
	/// Returns the `_type` hint of the account's key structure, or an empty
	/// string when the mirror record carries none.
	async fn account_key_type(
		&self,
		network: Network,
		account: &AccountId,
	) -> Result<String, MirrorError>;
}
