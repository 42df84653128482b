//! Deployer account resolution.

use std::{fmt, future::Future, str::FromStr};

use alloy_core::primitives::Address;
use alloy_signer_local::{MnemonicBuilder, PrivateKeySigner, coins_bip39::English};

use crate::error::MissingIdentityError;

/// Environment variable holding the deployer mnemonic.
pub const MNEMONIC_ENV: &str = "MNEMONIC";
/// Environment variable holding the deployer private key.
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";

/// Resolves the account deployments are sent from.
pub trait DeployerIdentity {
    fn deployer_address(
        &self,
    ) -> impl Future<Output = Result<Address, MissingIdentityError>> + Send;
}

/// Where the deployer account comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum IdentitySource {
    /// Hex-encoded secp256k1 private key.
    PrivateKey(String),
    /// BIP-39 mnemonic, using the account at `index`.
    Mnemonic { phrase: String, index: u32 },
    /// A fixed address.
    Address(Address),
    /// The node's managed account at `index` in `eth_accounts`.
    RpcAccount { index: usize },
}

impl fmt::Debug for IdentitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentitySource::PrivateKey(_) => write!(f, "PrivateKey(<redacted>)"),
            IdentitySource::Mnemonic { index, .. } => {
                write!(f, "Mnemonic {{ phrase: <redacted>, index: {index} }}")
            }
            IdentitySource::Address(address) => write!(f, "Address({address})"),
            IdentitySource::RpcAccount { index } => write!(f, "RpcAccount {{ index: {index} }}"),
        }
    }
}

impl IdentitySource {
    /// Read the deployer secret from `MNEMONIC` or, failing that, `PRIVATE_KEY`.
    pub fn from_env() -> Option<Self> {
        Self::from_vars(
            std::env::var(MNEMONIC_ENV).ok(),
            std::env::var(PRIVATE_KEY_ENV).ok(),
        )
    }

    /// A mnemonic takes precedence over a private key. Blank values count as unset.
    pub fn from_vars(mnemonic: Option<String>, private_key: Option<String>) -> Option<Self> {
        let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        if let Some(phrase) = non_blank(mnemonic) {
            return Some(IdentitySource::Mnemonic { phrase, index: 0 });
        }
        non_blank(private_key).map(IdentitySource::PrivateKey)
    }

    /// The signer behind a private key or mnemonic. `None` for accounts the node signs for.
    pub fn signer(&self) -> Result<Option<PrivateKeySigner>, MissingIdentityError> {
        let signer = match self {
            IdentitySource::PrivateKey(key) => PrivateKeySigner::from_str(key.trim())
                .map_err(|e| MissingIdentityError::new(format!("invalid private key: {e}")))?,
            IdentitySource::Mnemonic { phrase, index } => MnemonicBuilder::<English>::default()
                .phrase(phrase.trim())
                .index(*index)
                .and_then(|builder| builder.build())
                .map_err(|e| MissingIdentityError::new(format!("invalid mnemonic: {e}")))?,
            IdentitySource::Address(_) | IdentitySource::RpcAccount { .. } => return Ok(None),
        };

        Ok(Some(signer))
    }

    /// The deployer address if it can be derived without asking the node.
    pub fn local_address(&self) -> Result<Option<Address>, MissingIdentityError> {
        if let IdentitySource::Address(address) = self {
            return Ok(Some(*address));
        }

        Ok(self
            .signer()?
            .map(|signer| Address::from_slice(signer.address().as_slice())))
    }
}
