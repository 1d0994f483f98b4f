//! Common types module for the inscriber client.
//!
//! This module defines the core data types shared by the execution and
//! completion-tracking crates: ledger identifiers, the opaque transaction
//! payload codec, the normalized job-status record, error classification,
//! and a redacting wrapper for key material.

/// Account, transaction and network identifiers.
pub mod account;
/// Error-text classification into retryability categories.
pub mod classify;
/// Transaction payload codec (base64 and Buffer-object encodings).
pub mod codec;
/// Normalized job-status record and its REST/stream parsers.
pub mod job;
/// Redacting wrapper for private keys and API keys.
pub mod secret;
/// Decoded transfer-transaction view used by the rebuild fallback.
pub mod transfer;

pub use account::{
	normalize_transaction_id, AccountId, IdError, KeyAlgorithm, Network, PrivateKey, TransactionId,
};
pub use classify::{ErrorClass, ErrorClassifier, SubstringClassifier};
pub use codec::{decode_transaction_bytes, encode_transaction_bytes, CodecError};
pub use job::{parse_event, parse_job, JobStatus};
pub use secret::Secret;
pub use transfer::{HbarTransfer, NftTransfer, TokenTransfer, TransferContext};

/// Receipt status string the ledger returns for a successfully executed
/// transaction. Anything else is a terminal failure.
pub const RECEIPT_STATUS_SUCCESS: &str = "SUCCESS";
