//! On-chain confirmation of ambiguous submissions.
//!
//! Some RPC/client combinations fail to decode a field of the creation response
//! after the transaction was already broadcast and mined. Re-submitting would
//! create a duplicate contract, so the receipt is checked first.

use std::future::Future;

use alloy_core::primitives::{Address, B256};

use crate::submission::SubmissionError;

/// The part of a transaction receipt recovery reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Receipt {
    pub contract_address: Option<Address>,
    /// `Some(false)` if the transaction reverted. `None` if the node omitted it.
    pub status: Option<bool>,
}

/// Looks up transaction receipts.
pub trait ReceiptProvider {
    /// The receipt of `transaction_hash`, or `None` if the chain does not know it.
    fn get_receipt(
        &self,
        transaction_hash: B256,
    ) -> impl Future<Output = anyhow::Result<Option<Receipt>>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecoveryError {
    #[error("no receipt found for transaction {transaction_hash}")]
    ReceiptNotFound { transaction_hash: B256 },
    #[error("receipt of transaction {transaction_hash} has no contract address")]
    NoContractAddress { transaction_hash: B256 },
    #[error("failed to fetch receipt of transaction {transaction_hash}: {reason}")]
    Lookup {
        transaction_hash: B256,
        reason: String,
    },
}

/// Confirms ambiguous submissions against the chain.
pub struct AmbiguousResponseRecovery<'a, R> {
    receipts: &'a R,
}

impl<'a, R: ReceiptProvider> AmbiguousResponseRecovery<'a, R> {
    pub fn new(receipts: &'a R) -> Self {
        Self { receipts }
    }

    /// The address of the contract created by `transaction_hash`.
    pub async fn recover(&self, transaction_hash: B256) -> Result<Address, RecoveryError> {
        let receipt = self
            .receipts
            .get_receipt(transaction_hash)
            .await
            .map_err(|e| RecoveryError::Lookup {
                transaction_hash,
                reason: format!("{e:#}"),
            })?
            .ok_or(RecoveryError::ReceiptNotFound { transaction_hash })?;

        // A reverted creation may still report the precomputed address.
        if receipt.status == Some(false) {
            return Err(RecoveryError::NoContractAddress { transaction_hash });
        }

        receipt
            .contract_address
            .ok_or(RecoveryError::NoContractAddress { transaction_hash })
    }

    /// Recover the deployment behind `error`, or hand `error` back unchanged.
    ///
    /// The recovery failure itself is only logged: the caller sees the original
    /// submission error.
    pub async fn confirm(
        &self,
        error: SubmissionError,
        transaction_hash: B256,
    ) -> Result<Address, SubmissionError> {
        match self.recover(transaction_hash).await {
            Ok(address) => Ok(address),
            Err(recovery_error) => {
                tracing::warn!(
                    tx_hash = %transaction_hash,
                    error = %recovery_error,
                    "Could not confirm deployment on-chain, surfacing the original error"
                );
                Err(error)
            }
        }
    }
}
