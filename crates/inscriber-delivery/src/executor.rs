//! Transaction execution strategies.
//!
//! Upstream services return transactions built for signing flows that do
//! not always match the operator's configuration, so submission tries a
//! fixed, ordered table of strategies: submit as-is under the operator,
//! re-sign manually under the operator, then pass through unsigned on a
//! bare client. Only a signature rejection advances to the next strategy;
//! any other failure aborts. When all three are rejected for the signature
//! specifically, the transaction is rebuilt from its decoded transfer line
//! items and re-signed end to end, which sidesteps stale signature material
//! while preserving the exact economic intent.

use crate::keys::KeyTypeResolver;
use crate::{DeliveryError, LedgerInterface};
use inscriber_mirror::MirrorInterface;
use inscriber_types::{
	codec::decode_base64, AccountId, ErrorClass, ErrorClassifier, Network, PrivateKey, Secret,
	TransactionId, RECEIPT_STATUS_SUCCESS,
};
use std::sync::Arc;

/// A named signing/execution strategy.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionAttempt {
	/// Whether the client has the operator identity set.
	pub uses_operator: bool,
	/// Whether the transaction is explicitly re-signed before submission.
	pub manual_sign: bool,
	pub label: &'static str,
}

/// The fixed strategy table, tried strictly in order. The earliest
/// successful attempt wins and short-circuits the rest.
pub const EXECUTION_ATTEMPTS: [ExecutionAttempt; 3] = [
	ExecutionAttempt {
		uses_operator: true,
		manual_sign: false,
		label: "operator-auto-sign",
	},
	ExecutionAttempt {
		uses_operator: true,
		manual_sign: true,
		label: "operator-manual-sign",
	},
	ExecutionAttempt {
		uses_operator: false,
		manual_sign: false,
		label: "unsigned-pass-through",
	},
];

/// Drives a pre-built transaction through the strategy table.
pub struct TransactionExecutor {
	ledger: Arc<dyn LedgerInterface>,
	resolver: KeyTypeResolver,
	classifier: Arc<dyn ErrorClassifier>,
}

impl TransactionExecutor {
	pub fn new(
		ledger: Arc<dyn LedgerInterface>,
		mirror: Arc<dyn MirrorInterface>,
		classifier: Arc<dyn ErrorClassifier>,
	) -> Self {
		let resolver = KeyTypeResolver::new(mirror, ledger.clone());
		Self {
			ledger,
			resolver,
			classifier,
		}
	}

	/// Executes base64-encoded transaction bytes and returns the confirmed
	/// transaction id, or a terminal error describing every failed path.
	pub async fn execute_transaction(
		&self,
		network: &str,
		account_id: &str,
		private_key: &Secret,
		transaction_bytes: &str,
	) -> Result<TransactionId, DeliveryError> {
		let network: Network = network
			.parse()
			.map_err(|e| DeliveryError::InvalidNetwork(format!("{}", e)))?;
		let account: AccountId = account_id
			.parse()
			.map_err(|e| DeliveryError::InvalidAccount(format!("{}", e)))?;
		let key = self
			.resolver
			.operator_key(network, &account, private_key)
			.await?;
		let raw = decode_base64(transaction_bytes)?;

		let mut signature_failures: Vec<String> = Vec::new();

		for attempt in &EXECUTION_ATTEMPTS {
			tracing::debug!(strategy = attempt.label, "trying execution strategy");

			// Fresh client per attempt: signing state must not leak.
			let mut client = self.ledger.client(network)?;
			if attempt.uses_operator {
				client.set_operator(account, key.clone());
			}

			// A decode failure at this point means corruption, not a
			// signature problem, so it does not advance the strategy table.
			let mut transaction = client.decode_transaction(&raw)?;
			if attempt.manual_sign {
				transaction.sign(&key)?;
			}

			match client.execute(transaction).await {
				Ok(receipt) => {
					if receipt.status != RECEIPT_STATUS_SUCCESS {
						return Err(DeliveryError::ReceiptStatus {
							status: receipt.status,
							label: attempt.label.to_string(),
						});
					}
					tracing::info!(
						strategy = attempt.label,
						transaction_id = %receipt.transaction_id,
						"transaction executed"
					);
					return Ok(receipt.transaction_id);
				}
				Err(e) => {
					let message = e.to_string();
					if self.classifier.classify(&message) == ErrorClass::InvalidSignature {
						tracing::warn!(
							strategy = attempt.label,
							error = %message,
							"signature rejected, advancing to next strategy"
						);
						signature_failures.push(format!("{}: {}", attempt.label, message));
					} else {
						return Err(e);
					}
				}
			}
		}

		if signature_failures.len() != EXECUTION_ATTEMPTS.len() || signature_failures.is_empty() {
			// Unreachable with the fixed table: anything other than a
			// signature rejection returned early above.
			return Err(DeliveryError::NoStrategySucceeded);
		}

		tracing::warn!("every strategy rejected the signature, rebuilding transfer");
		match self
			.execute_rebuilt_transfer(network, &account, &key, &raw)
			.await
		{
			Ok(id) => Ok(id),
			Err(e) => {
				signature_failures.push(format!("rebuilt-transfer: {}", e));
				Err(DeliveryError::AllStrategiesFailed(
					signature_failures.join("; "),
				))
			}
		}
	}

	/// Last-resort path: reconstruct the transfer from decoded line items
	/// and sign it end to end under the operator.
	async fn execute_rebuilt_transfer(
		&self,
		network: Network,
		operator: &AccountId,
		key: &PrivateKey,
		raw: &[u8],
	) -> Result<TransactionId, DeliveryError> {
		let probe = self.ledger.client(network)?;
		let decoded = probe.decode_transaction(raw)?;
		let context = decoded
			.transfer_context()
			.ok_or(DeliveryError::NotTransfer)?;

		// Never sign and pay for a transaction built for another payer.
		if context.payer() != *operator {
			return Err(DeliveryError::PayerMismatch {
				payer: context.payer(),
				operator: *operator,
			});
		}

		let mut client = self.ledger.client(network)?;
		client.set_operator(*operator, key.clone());

		// Replay the decoded transfer verbatim: same id, routing and
		// bounds, every line item, approved transfers kept approved.
		let mut builder = client.new_transfer_transaction();
		builder.set_transaction_id(context.transaction_id.clone());
		builder.set_node_account_ids(context.node_account_ids.clone());
		builder.set_memo(context.memo.clone());
		if let Some(duration) = context.valid_duration {
			builder.set_valid_duration(duration);
		}
		if let Some(fee) = context.max_fee {
			builder.set_max_fee(fee);
		}
		for transfer in &context.hbar_transfers {
			builder.add_hbar_transfer(transfer.account, transfer.amount);
		}
		for transfer in &context.token_transfers {
			if transfer.approved {
				builder.add_approved_token_transfer(
					transfer.token,
					transfer.account,
					transfer.amount,
				);
			} else {
				builder.add_token_transfer(transfer.token, transfer.account, transfer.amount);
			}
		}
		for transfer in &context.nft_transfers {
			if transfer.approved {
				builder.add_approved_nft_transfer(
					transfer.token,
					transfer.sender,
					transfer.receiver,
					transfer.serial,
				);
			} else {
				builder.add_nft_transfer(
					transfer.token,
					transfer.sender,
					transfer.receiver,
					transfer.serial,
				);
			}
		}

		let mut rebuilt = builder.build()?;
		rebuilt.freeze()?;
		rebuilt.sign(key)?;

		let receipt = client.execute(rebuilt).await?;
		if receipt.status != RECEIPT_STATUS_SUCCESS {
			return Err(DeliveryError::ReceiptStatus {
				status: receipt.status,
				label: "rebuilt-transfer".to_string(),
			});
		}
		tracing::info!(transaction_id = %receipt.transaction_id, "rebuilt transfer executed");
		Ok(receipt.transaction_id)
	}
}
