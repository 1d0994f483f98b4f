//! Operator key resolution.
//!
//! A raw private-key string does not say which algorithm produced it. The
//! mirror node does: account records carry a `_type` hint on the key
//! structure. A confirmed hint parses strictly with no fallback, because
//! the mirror-confirmed type takes precedence over guessing; without a
//! hint we fall back through Ed25519, ECDSA, then an algorithm-agnostic
//! DER parse.

use crate::{DeliveryError, LedgerInterface};
use inscriber_mirror::MirrorInterface;
use inscriber_types::{AccountId, KeyAlgorithm, Network, PrivateKey, Secret};
use std::sync::Arc;

/// Resolves which key algorithm an account uses and parses its key.
pub struct KeyTypeResolver {
	mirror: Arc<dyn MirrorInterface>,
	ledger: Arc<dyn LedgerInterface>,
}

impl KeyTypeResolver {
	pub fn new(mirror: Arc<dyn MirrorInterface>, ledger: Arc<dyn LedgerInterface>) -> Self {
		Self { mirror, ledger }
	}

	/// Looks up the account's key-type hint. May be empty when the mirror
	/// record carries no hint; reaching the mirror at all is a hard error.
	pub async fn key_type(
		&self,
		network: Network,
		account: &AccountId,
	) -> Result<String, DeliveryError> {
		Ok(self.mirror.account_key_type(network, account).await?)
	}

	/// Parses the operator private key, consulting the mirror hint first.
	pub async fn operator_key(
		&self,
		network: Network,
		account: &AccountId,
		raw: &Secret,
	) -> Result<PrivateKey, DeliveryError> {
		let hint = self.key_type(network, account).await?.to_ascii_lowercase();

		if hint.contains("ecdsa") {
			tracing::debug!(%account, "mirror confirmed ECDSA key");
			return self.ledger.parse_private_key(raw.expose(), KeyAlgorithm::Ecdsa);
		}
		if hint.contains("ed25519") {
			tracing::debug!(%account, "mirror confirmed Ed25519 key");
			return self
				.ledger
				.parse_private_key(raw.expose(), KeyAlgorithm::Ed25519);
		}

		// No usable hint: first successful parse wins.
		let mut failures = Vec::new();
		for algorithm in [KeyAlgorithm::Ed25519, KeyAlgorithm::Ecdsa, KeyAlgorithm::Der] {
			match self.ledger.parse_private_key(raw.expose(), algorithm) {
				Ok(key) => return Ok(key),
				Err(e) => failures.push(format!("{}: {}", algorithm, e)),
			}
		}
		Err(DeliveryError::InvalidKey(failures.join("; ")))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use inscriber_mirror::MirrorError;

	struct FixedMirror(String);

	#[async_trait]
	impl MirrorInterface for FixedMirror {
		async fn account_key_type(
			&self,
			_network: Network,
			_account: &AccountId,
		) -> Result<String, MirrorError> {
			Ok(self.0.clone())
		}
	}

	/// Ledger fake that accepts only the listed algorithms.
	struct PickyLedger(Vec<KeyAlgorithm>);

	#[async_trait]
	impl LedgerInterface for PickyLedger {
		fn client(
			&self,
			_network: Network,
		) -> Result<Box<dyn crate::LedgerClient>, DeliveryError> {
			unimplemented!("not used by key tests")
		}

		fn parse_private_key(
			&self,
			raw: &str,
			algorithm: KeyAlgorithm,
		) -> Result<PrivateKey, DeliveryError> {
			if self.0.contains(&algorithm) {
				Ok(PrivateKey::new(algorithm, Secret::from(raw)))
			} else {
				Err(DeliveryError::InvalidKey(format!("not {}", algorithm)))
			}
		}
	}

	fn resolver(hint: &str, accepts: Vec<KeyAlgorithm>) -> KeyTypeResolver {
		KeyTypeResolver::new(
			Arc::new(FixedMirror(hint.to_string())),
			Arc::new(PickyLedger(accepts)),
		)
	}

	#[tokio::test]
	async fn ecdsa_hint_parses_strictly() {
		let account: AccountId = "0.0.100".parse().unwrap();
		let raw = Secret::from("aa");

		let r = resolver("ECDSA_SECP256K1", vec![KeyAlgorithm::Ecdsa]);
		let key = r
			.operator_key(Network::Testnet, &account, &raw)
			.await
			.unwrap();
		assert_eq!(key.algorithm, KeyAlgorithm::Ecdsa);

		// Strict: even though the generic parse would succeed, a confirmed
		// hint that fails to parse is fatal.
		let r = resolver("ECDSA_SECP256K1", vec![KeyAlgorithm::Der]);
		assert!(r.operator_key(Network::Testnet, &account, &raw).await.is_err());
	}

	#[tokio::test]
	async fn ed25519_hint_parses_strictly() {
		let account: AccountId = "0.0.100".parse().unwrap();
		let r = resolver("ED25519", vec![KeyAlgorithm::Ed25519]);
		let key = r
			.operator_key(Network::Testnet, &account, &Secret::from("aa"))
			.await
			.unwrap();
		assert_eq!(key.algorithm, KeyAlgorithm::Ed25519);
	}

	#[tokio::test]
	async fn missing_hint_falls_back_in_order() {
		let account: AccountId = "0.0.100".parse().unwrap();
		let r = resolver("", vec![KeyAlgorithm::Ecdsa, KeyAlgorithm::Der]);
		let key = r
			.operator_key(Network::Testnet, &account, &Secret::from("aa"))
			.await
			.unwrap();
		// Ed25519 fails, ECDSA is the first success.
		assert_eq!(key.algorithm, KeyAlgorithm::Ecdsa);
	}

	#[tokio::test]
	async fn total_parse_failure_reports_all_three() {
		let account: AccountId = "0.0.100".parse().unwrap();
		let r = resolver("", vec![]);
		let err = r
			.operator_key(Network::Testnet, &account, &Secret::from("aa"))
			.await
			.unwrap_err();
		let message = err.to_string();
		for name in ["ed25519", "ecdsa", "der"] {
			assert!(message.contains(name), "missing {} in {}", name, message);
		}
	}
}
