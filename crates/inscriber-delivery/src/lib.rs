//! Transaction delivery module for the inscriber client.
//!
//! This module handles the submission of pre-built, possibly-unsigned
//! transactions to the ledger. It defines the collaborator traits for the
//! ledger SDK boundary, resolves the operator key algorithm through the
//! mirror node, and drives a fixed sequence of signing strategies with a
//! transfer-rebuild fallback when every strategy is rejected with a
//! signature error.

use async_trait::async_trait;
use inscriber_types::{AccountId, CodecError, KeyAlgorithm, PrivateKey, TransactionId};
use std::time::Duration;
use thiserror::Error;

pub mod executor;
pub mod keys;

pub use executor::{ExecutionAttempt, TransactionExecutor, EXECUTION_ATTEMPTS};
pub use keys::KeyTypeResolver;

/// Errors that can occur during transaction delivery operations.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// Error that occurs when the network name is not recognized.
	#[error("invalid network: {0}")]
	InvalidNetwork(String),
	/// Error that occurs when the account identifier cannot be parsed.
	#[error("invalid account id: {0}")]
	InvalidAccount(String),
	/// Error that occurs when the private key cannot be parsed.
	#[error("invalid private key: {0}")]
	InvalidKey(String),
	/// Error that occurs while decoding the transaction payload.
	#[error("transaction bytes: {0}")]
	Codec(#[from] CodecError),
	/// Error that occurs while reading from the mirror node.
	#[error("mirror node: {0}")]
	Mirror(#[from] inscriber_mirror::MirrorError),
	/// Error surfaced by the ledger collaborator.
	#[error("ledger: {0}")]
	Ledger(String),
	/// Error that occurs when a receipt carries a non-success status.
	#[error("transaction failed with receipt status {status} during {label}")]
	ReceiptStatus { status: String, label: String },
	/// Error that occurs when the rebuild target is not a transfer.
	#[error("unsupported transaction type, expected transfer transaction")]
	NotTransfer,
	/// Error that occurs when the rebuild payer differs from the operator.
	#[error("refusing rebuild: transaction payer {payer} does not match operator {operator}")]
	PayerMismatch { payer: AccountId, operator: AccountId },
	/// Error aggregating every strategy failure plus the rebuild failure.
	#[error("all execution strategies failed: {0}")]
	AllStrategiesFailed(String),
	/// Defensive: the strategy table produced no classified failure at all.
	#[error("no execution strategy succeeded")]
	NoStrategySucceeded,
}

/// A decoded, submittable ledger transaction.
///
/// Opaque to this crate beyond what execution needs: signing, freezing,
/// and the read-only views used for correlation and rebuild.
pub trait LedgerTransaction: Send + Sync {
	/// Adds a signature with the given key.
	fn sign(&mut self, key: &PrivateKey) -> Result<(), DeliveryError>;

	/// Freezes the transaction for signing and submission.
	fn freeze(&mut self) -> Result<(), DeliveryError>;

	/// A transfer view of this transaction, or `None` for any other shape.
	fn transfer_context(&self) -> Option<inscriber_types::TransferContext>;
}

/// Incrementally assembles a fresh transfer transaction.
///
/// The executor replays a decoded [`inscriber_types::TransferContext`]
/// through these methods line item by line item; approved (allowance-
/// spending) transfers are added through their own methods because the
/// ledger encodes them differently from plain ones.
pub trait TransferTransactionBuilder: Send + Sync {
	fn set_transaction_id(&mut self, id: TransactionId);
	fn set_node_account_ids(&mut self, nodes: Vec<AccountId>);
	fn set_memo(&mut self, memo: String);
	fn set_valid_duration(&mut self, duration: Duration);
	/// Maximum fee bound in tinybars.
	fn set_max_fee(&mut self, tinybars: u64);

	/// Adds an HBAR movement in tinybars; negative amounts debit.
	fn add_hbar_transfer(&mut self, account: AccountId, amount: i64);

	fn add_token_transfer(&mut self, token: AccountId, account: AccountId, amount: i64);
	fn add_approved_token_transfer(&mut self, token: AccountId, account: AccountId, amount: i64);

	fn add_nft_transfer(
		&mut self,
		token: AccountId,
		sender: AccountId,
		receiver: AccountId,
		serial: i64,
	);
	fn add_approved_nft_transfer(
		&mut self,
		token: AccountId,
		sender: AccountId,
		receiver: AccountId,
		serial: i64,
	);

	/// Finalizes the builder into a submittable transaction.
	fn build(self: Box<Self>) -> Result<Box<dyn LedgerTransaction>, DeliveryError>;
}

/// Receipt returned by the ledger for an executed transaction.
#[derive(Debug, Clone)]
pub struct TransactionReceipt {
	pub status: String,
	pub transaction_id: TransactionId,
}

/// One network client. Each execution attempt constructs its own so that
/// operator/signing configuration never leaks between attempts.
#[async_trait]
pub trait LedgerClient: Send + Sync {
	/// Binds the payer identity used for automatic signing.
	fn set_operator(&mut self, account: AccountId, key: PrivateKey);

	/// Decodes raw transaction bytes into a transaction object.
	fn decode_transaction(&self, bytes: &[u8]) -> Result<Box<dyn LedgerTransaction>, DeliveryError>;

	/// Starts an empty transfer transaction for the rebuild path.
	fn new_transfer_transaction(&self) -> Box<dyn TransferTransactionBuilder>;

	/// Submits the transaction and fetches its receipt.
	async fn execute(
		&self,
		transaction: Box<dyn LedgerTransaction>,
	) -> Result<TransactionReceipt, DeliveryError>;
}

/// Trait defining the ledger SDK boundary.
#[async_trait]
pub trait LedgerInterface: Send + Sync {
	/// Constructs a fresh client for the network, with no operator set.
	fn client(
		&self,
		network: inscriber_types::Network,
	) -> Result<Box<dyn LedgerClient>, DeliveryError>;

	/// Parses raw private-key material as the requested algorithm.
	fn parse_private_key(
		&self,
		raw: &str,
		algorithm: KeyAlgorithm,
	) -> Result<PrivateKey, DeliveryError>;
}
