//! Errors surfaced by a unit deployment.

use alloy_core::primitives::{Address, B256};

use crate::{store::StoreError, submission::SubmissionError};

/// The deployer account could not be determined.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("missing named deployer account: {reason}")]
pub struct MissingIdentityError {
    pub reason: String,
}

impl MissingIdentityError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// The network profile lacks, or holds an unusable value for, something a unit requires.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "{config_key} not configured on network {network}. This is required for {contract} deployment"
    )]
    MissingUnitConfig {
        network: String,
        config_key: &'static str,
        contract: &'static str,
    },
    #[error("{field} is required in {config_key} config on network {network}")]
    MissingField {
        network: String,
        config_key: &'static str,
        field: &'static str,
    },
    #[error("{field} in {config_key} config on network {network} is not a valid address: {value:?}")]
    InvalidAddress {
        network: String,
        config_key: &'static str,
        field: &'static str,
        value: String,
    },
}

impl ConfigError {
    /// The config field or key the error is about.
    pub fn field(&self) -> &'static str {
        match self {
            ConfigError::MissingUnitConfig { config_key, .. } => *config_key,
            ConfigError::MissingField { field, .. } | ConfigError::InvalidAddress { field, .. } => {
                *field
            }
        }
    }
}

/// A constructor dependency could not be resolved to an address.
#[derive(Debug, thiserror::Error)]
pub enum DependencyError {
    #[error("{name} deployment not found on network {network}; it must be supplied by an external deployment")]
    ExternalNotFound { name: &'static str, network: String },
    #[error(
        "{field} required: not set in {config_key} config and no {contract} deployment found on network {network}"
    )]
    Unresolved {
        field: &'static str,
        config_key: &'static str,
        contract: &'static str,
        network: String,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a unit deployment failed.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error(transparent)]
    MissingIdentity(#[from] MissingIdentityError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dependency(#[from] DependencyError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The contract is on-chain but the store did not take its record.
    #[error(
        "{contract} deployed at {address} (tx {transaction_hash}) but its record could not be written: {source}"
    )]
    Unrecorded {
        contract: &'static str,
        address: Address,
        transaction_hash: B256,
        #[source]
        source: StoreError,
    },
}

impl DeployError {
    /// Address of a contract that was deployed despite the failure.
    pub fn deployed_address(&self) -> Option<Address> {
        match self {
            DeployError::Unrecorded { address, .. } => Some(*address),
            _ => None,
        }
    }
}
