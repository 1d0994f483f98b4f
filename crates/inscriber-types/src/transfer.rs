//! Decoded transfer-transaction view.
//!
//! When every signing strategy is rejected with a signature error, the
//! executor rebuilds the transfer from this read-only view of the decoded
//! original and re-signs it end to end. The view carries everything needed
//! to reproduce the exact economic intent: identity, routing, bounds, and
//! every transfer line item.

use crate::account::{AccountId, TransactionId};
use std::time::Duration;

/// A single HBAR movement. Negative amounts debit the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbarTransfer {
	pub account: AccountId,
	/// Amount in tinybars.
	pub amount: i64,
}

/// A fungible-token movement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTransfer {
	pub token: AccountId,
	pub account: AccountId,
	pub amount: i64,
	/// True when the transfer spends a pre-approved allowance.
	pub approved: bool,
}

/// A non-fungible transfer, identified by token and serial number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NftTransfer {
	pub token: AccountId,
	pub sender: AccountId,
	pub receiver: AccountId,
	pub serial: i64,
	pub approved: bool,
}

/// Read-only view of a decoded transfer transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferContext {
	pub transaction_id: TransactionId,
	pub node_account_ids: Vec<AccountId>,
	pub memo: String,
	pub valid_duration: Option<Duration>,
	/// Maximum fee bound in tinybars.
	pub max_fee: Option<u64>,
	pub hbar_transfers: Vec<HbarTransfer>,
	pub token_transfers: Vec<TokenTransfer>,
	pub nft_transfers: Vec<NftTransfer>,
}

impl TransferContext {
	/// The account that pays for (and must sign) this transaction.
	pub fn payer(&self) -> AccountId {
		self.transaction_id.payer
	}
}
