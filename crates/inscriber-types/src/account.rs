//! Ledger identifier types.
//!
//! Accounts are addressed as `shard.realm.num` triples and transactions as
//! `payer@seconds.nanos`. Job payloads carry transaction ids in either the
//! `@`-separated or the fully dash-separated form, so correlation always
//! goes through [`normalize_transaction_id`].

use crate::secret::Secret;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced when parsing identifiers or network names.
#[derive(Debug, Error)]
pub enum IdError {
	#[error("invalid account id {0:?}: expected shard.realm.num")]
	InvalidAccount(String),
	#[error("invalid transaction id {0:?}: expected payer@seconds.nanos")]
	InvalidTransaction(String),
	#[error("unknown network {0:?}")]
	UnknownNetwork(String),
}

/// Ledger environment a client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
	Mainnet,
	Testnet,
	Previewnet,
}

impl FromStr for Network {
	type Err = IdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"mainnet" => Ok(Network::Mainnet),
			"testnet" => Ok(Network::Testnet),
			"previewnet" => Ok(Network::Previewnet),
			other => Err(IdError::UnknownNetwork(other.to_string())),
		}
	}
}

impl fmt::Display for Network {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Network::Mainnet => "mainnet",
			Network::Testnet => "testnet",
			Network::Previewnet => "previewnet",
		};
		write!(f, "{}", name)
	}
}

/// An account identifier in `shard.realm.num` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId {
	pub shard: u64,
	pub realm: u64,
	pub num: u64,
}

impl AccountId {
	pub fn new(shard: u64, realm: u64, num: u64) -> Self {
		Self { shard, realm, num }
	}
}

impl FromStr for AccountId {
	type Err = IdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let parts: Vec<&str> = s.trim().split('.').collect();
		if parts.len() != 3 {
			return Err(IdError::InvalidAccount(s.to_string()));
		}
		let parse = |p: &str| {
			p.parse::<u64>()
				.map_err(|_| IdError::InvalidAccount(s.to_string()))
		};
		Ok(AccountId {
			shard: parse(parts[0])?,
			realm: parse(parts[1])?,
			num: parse(parts[2])?,
		})
	}
}

impl fmt::Display for AccountId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
	}
}

/// A transaction identifier: the paying account plus the valid-start
/// timestamp chosen when the transaction was built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionId {
	pub payer: AccountId,
	/// Valid-start timestamp as `seconds.nanos`.
	pub valid_start: String,
}

impl TransactionId {
	pub fn new(payer: AccountId, valid_start: impl Into<String>) -> Self {
		Self {
			payer,
			valid_start: valid_start.into(),
		}
	}

	/// Dash-separated form used for event correlation and job lookups.
	pub fn normalized(&self) -> String {
		format!("{}-{}", self.payer, self.valid_start.replace('.', "-"))
	}
}

impl FromStr for TransactionId {
	type Err = IdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		// Accept both `0.0.x@sec.nanos` and `0.0.x-sec-nanos`.
		if let Some((payer, ts)) = s.split_once('@') {
			let payer = AccountId::from_str(payer)
				.map_err(|_| IdError::InvalidTransaction(s.to_string()))?;
			return Ok(TransactionId::new(payer, ts));
		}
		let parts: Vec<&str> = s.split('-').collect();
		if parts.len() == 3 {
			let payer = AccountId::from_str(parts[0])
				.map_err(|_| IdError::InvalidTransaction(s.to_string()))?;
			return Ok(TransactionId::new(payer, format!("{}.{}", parts[1], parts[2])));
		}
		Err(IdError::InvalidTransaction(s.to_string()))
	}
}

impl fmt::Display for TransactionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}@{}", self.payer, self.valid_start)
	}
}

/// Normalizes a transaction id string to the dash-separated form, leaving
/// strings that are not transaction ids untouched apart from trimming.
pub fn normalize_transaction_id(raw: &str) -> String {
	let raw = raw.trim();
	match raw.split_once('@') {
		Some((payer, ts)) => format!("{}-{}", payer, ts.replace('.', "-")),
		None => raw.to_string(),
	}
}

/// Key algorithm requested from the ledger collaborator when parsing raw
/// private-key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
	Ed25519,
	Ecdsa,
	/// Algorithm-agnostic DER parse, used when no mirror hint is available.
	Der,
}

impl fmt::Display for KeyAlgorithm {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			KeyAlgorithm::Ed25519 => "ed25519",
			KeyAlgorithm::Ecdsa => "ecdsa",
			KeyAlgorithm::Der => "der",
		};
		write!(f, "{}", name)
	}
}

/// A parsed operator private key as returned by the ledger collaborator.
///
/// The material itself stays opaque to this crate; it is only ever handed
/// back to the same collaborator for signing.
#[derive(Debug, Clone)]
pub struct PrivateKey {
	pub algorithm: KeyAlgorithm,
	pub material: Secret,
}

impl PrivateKey {
	pub fn new(algorithm: KeyAlgorithm, material: Secret) -> Self {
		Self {
			algorithm,
			material,
		}
	}
}
