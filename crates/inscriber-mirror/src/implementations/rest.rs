//! REST implementation of the mirror-node boundary.
//!
//! Resolves the public mirror base URL from the network name and issues a
//! single `GET /api/v1/accounts/{id}` per lookup. No retry here; callers
//! that want retry apply it around the whole operation.

use crate::{MirrorError, MirrorInterface};
use async_trait::async_trait;
use inscriber_types::{AccountId, Network};
use serde_json::Value;

/// Mirror-node client over the public REST endpoints.
pub struct RestMirror {
	http: reqwest::Client,
}

impl RestMirror {
	pub fn new() -> Self {
		Self {
			http: reqwest::Client::new(),
		}
	}

	fn base_url(network: Network) -> &'static str {
		match network {
			Network::Mainnet => "https://mainnet-public.mirrornode.hedera.com",
			Network::Testnet => "https://testnet.mirrornode.hedera.com",
			Network::Previewnet => "https://previewnet.mirrornode.hedera.com",
		}
	}
}

impl Default for RestMirror {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl MirrorInterface for RestMirror {
	async fn account_key_type(
		&self,
		network: Network,
		account: &AccountId,
	) -> Result<String, MirrorError> {
		let url = format!("{}/api/v1/accounts/{}", Self::base_url(network), account);
		tracing::debug!(%url, "fetching account key type");

		let response = self
			.http
			.get(&url)
			.send()
			.await
			.map_err(|e| MirrorError::Request(e.to_string()))?;

		if !response.status().is_success() {
			return Err(MirrorError::Response(format!(
				"status {} for account {}",
				response.status(),
				account
			)));
		}

		let body: Value = response
			.json()
			.await
			.map_err(|e| MirrorError::Response(e.to_string()))?;

		Ok(body
			.pointer("/key/_type")
			.and_then(Value::as_str)
			.unwrap_or_default()
			.to_string())
	}
}
