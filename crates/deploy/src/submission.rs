//! The deployment submission boundary.
//!
//! A submitter broadcasts a contract creation and reports either the created
//! address or a [`SubmissionError`]. [`SubmissionOutcome::classify`] turns that
//! result into a tagged value so the one recoverable failure shape is its own
//! branch instead of something callers pick out of an error.

use std::future::Future;

use alloy_core::primitives::{Address, B256};

/// Category of a submission failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A value in the request or response could not be decoded.
    InvalidArgument,
    /// The transaction was mined but reverted.
    CallException,
    /// No answer within the deadline.
    Timeout,
    /// The node rejected the request.
    ServerError,
    UnknownError,
}

/// A failed submission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {reason}")]
pub struct SubmissionError {
    pub code: ErrorCode,
    pub reason: String,
    /// The kind of value that failed to decode, for [`ErrorCode::InvalidArgument`].
    pub argument: Option<String>,
    /// The response field that held the undecodable value.
    pub check_key: Option<String>,
    /// Hash of the broadcast transaction, when it was sent before the failure.
    pub transaction_hash: Option<B256>,
}

impl SubmissionError {
    pub fn new(code: ErrorCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
            argument: None,
            check_key: None,
            transaction_hash: None,
        }
    }

    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.argument = Some(argument.into());
        self
    }

    pub fn with_check_key(mut self, check_key: impl Into<String>) -> Self {
        self.check_key = Some(check_key.into());
        self
    }

    pub fn with_transaction_hash(mut self, transaction_hash: B256) -> Self {
        self.transaction_hash = Some(transaction_hash);
        self
    }

    /// The transaction to check on-chain, if this error may hide a successful deployment.
    ///
    /// Only an address that failed to decode from the response's `to` field
    /// qualifies, and only when the transaction hash is known.
    pub fn ambiguous_transaction(&self) -> Option<B256> {
        let ambiguous = self.code == ErrorCode::InvalidArgument
            && self.argument.as_deref() == Some("address")
            && self.check_key.as_deref() == Some("to");
        if ambiguous {
            self.transaction_hash
        } else {
            None
        }
    }
}

/// A confirmed contract creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submitted {
    pub address: Address,
    pub transaction_hash: B256,
}

/// What to deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    pub contract_name: &'static str,
    pub constructor_args: Vec<Address>,
    /// The deployer account the transaction is sent from.
    pub from: Address,
}

/// Broadcasts contract creations.
pub trait Submitter {
    fn submit(
        &self,
        request: &SubmissionRequest,
    ) -> impl Future<Output = Result<Submitted, SubmissionError>> + Send;
}

/// Tagged result of one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Success(Submitted),
    /// The transaction was broadcast but the response could not be decoded;
    /// whether it deployed is only known on-chain.
    Ambiguous {
        transaction_hash: B256,
        error: SubmissionError,
    },
    Fatal(SubmissionError),
}

impl SubmissionOutcome {
    pub fn classify(result: Result<Submitted, SubmissionError>) -> Self {
        match result {
            Ok(submitted) => SubmissionOutcome::Success(submitted),
            Err(error) => match error.ambiguous_transaction() {
                Some(transaction_hash) => SubmissionOutcome::Ambiguous {
                    transaction_hash,
                    error,
                },
                None => SubmissionOutcome::Fatal(error),
            },
        }
    }
}
