//! JSON-RPC access to a network node.
//!
//! [`JsonRpcChain`] signs contract creations locally when the deployer comes
//! from a private key or mnemonic and sends them with `eth_sendRawTransaction`.
//! Otherwise it uses `eth_sendTransaction` and the node signs with one of its
//! managed accounts. Either way it then polls `eth_getTransactionReceipt` until
//! the creation is mined.

use std::{str::FromStr, time::Duration};

use alloy::{
    consensus::{SignableTransaction, TxEnvelope, TxLegacy},
    eips::eip2718::Encodable2718,
    network::TxSignerSync,
};
use alloy_core::primitives::{Address, B256, Bytes, U64, U128};
use alloy_signer_local::PrivateKeySigner;
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use url::Url;

use crate::{
    artifacts::ArtifactStore,
    error::MissingIdentityError,
    identity::{DeployerIdentity, IdentitySource},
    recovery::{Receipt, ReceiptProvider},
    submission::{ErrorCode, SubmissionError, SubmissionRequest, Submitted, Submitter},
};

/// Default timeout for RPC requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default interval between receipt polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default time to wait for a deployment to be mined.
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client() -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

/// Make a JSON-RPC call and deserialize the result.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<T, anyhow::Error> {
    let response = client
        .post(url)
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .with_context(|| format!("Failed to send {} request", method))?;

    let result: Value = response
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", method))?;

    if let Some(error) = result.get("error") {
        anyhow::bail!(
            "RPC error: {}",
            error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown")
        );
    }

    let result_value = result
        .get("result")
        .context("No result in response")?
        .clone();

    serde_json::from_value(result_value)
        .with_context(|| format!("Failed to deserialize {} result", method))
}

/// Poll `check_fn` until it yields a value.
///
/// Errors from `check_fn` are treated as transient and retried until `timeout`.
pub async fn wait_for<T, F, Fut>(
    name: &str,
    timeout: Duration,
    interval: Duration,
    check_fn: F,
) -> Result<T, anyhow::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<Option<T>, anyhow::Error>>,
{
    let start = std::time::Instant::now();

    loop {
        match check_fn().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {
                tracing::trace!(target_name = %name, "Not available yet, retrying...");
            }
            Err(e) => {
                tracing::trace!(error = %e, target_name = %name, "Check failed, retrying...");
            }
        }

        let Some(remaining) = timeout.checked_sub(start.elapsed()).filter(|r| !r.is_zero()) else {
            anyhow::bail!("Timeout waiting for {}", name);
        };

        tokio::time::sleep(interval.min(remaining)).await;
    }
}

/// Transaction fields of a contract creation, as reported by the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreationParams {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
}

/// Sign a legacy (EIP-155) contract creation of `data` and return its raw encoding.
pub fn sign_creation(
    signer: &PrivateKeySigner,
    params: CreationParams,
    data: &[u8],
) -> anyhow::Result<Bytes> {
    let mut tx = TxLegacy {
        chain_id: Some(params.chain_id),
        nonce: params.nonce,
        gas_price: params.gas_price,
        gas_limit: params.gas_limit,
        to: alloy::primitives::TxKind::Create,
        value: alloy::primitives::U256::ZERO,
        input: alloy::primitives::Bytes::copy_from_slice(data),
    };

    let signature = signer
        .sign_transaction_sync(&mut tx)
        .context("Failed to sign deployment transaction")?;
    let envelope = TxEnvelope::from(tx.into_signed(signature));

    Ok(Bytes::from(envelope.encoded_2718()))
}

/// A network reached over JSON-RPC.
#[derive(Debug, Clone)]
pub struct JsonRpcChain {
    client: reqwest::Client,
    url: Url,
    identity: IdentitySource,
    artifacts: ArtifactStore,
    receipt_timeout: Duration,
}

impl JsonRpcChain {
    pub fn new(url: Url, identity: IdentitySource, artifacts: ArtifactStore) -> anyhow::Result<Self> {
        Ok(Self {
            client: create_client()?,
            url,
            identity,
            artifacts,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
        })
    }

    /// How long to wait for a sent deployment to be mined.
    pub fn with_receipt_timeout(mut self, receipt_timeout: Duration) -> Self {
        self.receipt_timeout = receipt_timeout;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> anyhow::Result<T> {
        json_rpc_call(&self.client, self.url.as_str(), method, params).await
    }

    /// The raw receipt of `transaction_hash`, `None` while it is pending or unknown.
    async fn fetch_receipt(&self, transaction_hash: B256) -> anyhow::Result<Option<Value>> {
        let receipt: Value = self
            .call("eth_getTransactionReceipt", vec![json!(transaction_hash)])
            .await?;

        Ok((!receipt.is_null()).then_some(receipt))
    }

    async fn creation_params(&self, from: Address, data: &Bytes) -> anyhow::Result<CreationParams> {
        let chain_id: U64 = self.call("eth_chainId", vec![]).await?;
        let nonce: U64 = self
            .call("eth_getTransactionCount", vec![json!(from), json!("pending")])
            .await?;
        let gas_price: U128 = self.call("eth_gasPrice", vec![]).await?;
        let gas_limit: U64 = self
            .call("eth_estimateGas", vec![json!({ "from": from, "data": data })])
            .await?;

        Ok(CreationParams {
            chain_id: chain_id.to(),
            nonce: nonce.to(),
            gas_price: gas_price.to(),
            gas_limit: gas_limit.to(),
        })
    }

    /// Sign the creation locally and broadcast it.
    async fn send_signed(
        &self,
        signer: &PrivateKeySigner,
        from: Address,
        data: &Bytes,
    ) -> anyhow::Result<B256> {
        let signer_address = Address::from_slice(signer.address().as_slice());
        if signer_address != from {
            anyhow::bail!("Deployer {from} does not match the local signer {signer_address}");
        }

        let params = self.creation_params(from, data).await?;
        tracing::debug!(
            chain_id = params.chain_id,
            nonce = params.nonce,
            gas_price = %params.gas_price,
            gas_limit = params.gas_limit,
            "Signing deployment transaction"
        );

        let raw = sign_creation(signer, params, data)?;
        self.call("eth_sendRawTransaction", vec![json!(raw)]).await
    }
}

impl DeployerIdentity for JsonRpcChain {
    async fn deployer_address(&self) -> Result<Address, MissingIdentityError> {
        let index = match &self.identity {
            IdentitySource::RpcAccount { index } => *index,
            local => {
                return local
                    .local_address()?
                    .ok_or_else(|| MissingIdentityError::new("no local deployer address"));
            }
        };

        let accounts: Vec<Address> = self.call("eth_accounts", vec![]).await.map_err(|e| {
            MissingIdentityError::new(format!("eth_accounts failed on {}: {e:#}", self.url))
        })?;

        accounts.get(index).copied().ok_or_else(|| {
            MissingIdentityError::new(format!(
                "node at {} has no account at index {} ({} accounts)",
                self.url,
                index,
                accounts.len()
            ))
        })
    }
}

impl Submitter for JsonRpcChain {
    async fn submit(&self, request: &SubmissionRequest) -> Result<Submitted, SubmissionError> {
        let data = self
            .artifacts
            .creation_code(request.contract_name, &request.constructor_args)
            .map_err(|e| SubmissionError::new(ErrorCode::UnknownError, format!("{e:#}")))?;

        let signer = self
            .identity
            .signer()
            .map_err(|e| SubmissionError::new(ErrorCode::UnknownError, e.to_string()))?;

        let sent = match &signer {
            Some(signer) => self.send_signed(signer, request.from, &data).await,
            None => {
                self.call(
                    "eth_sendTransaction",
                    vec![json!({ "from": request.from, "data": data })],
                )
                .await
            }
        };
        let transaction_hash: B256 =
            sent.map_err(|e| SubmissionError::new(ErrorCode::ServerError, format!("{e:#}")))?;

        tracing::info!(
            contract = request.contract_name,
            tx_hash = %transaction_hash,
            "Deployment transaction sent"
        );

        let receipt = wait_for(
            &format!("receipt of {transaction_hash}"),
            self.receipt_timeout,
            DEFAULT_POLL_INTERVAL,
            move || self.fetch_receipt(transaction_hash),
        )
        .await
        .map_err(|e| {
            SubmissionError::new(ErrorCode::Timeout, format!("{e:#}"))
                .with_transaction_hash(transaction_hash)
        })?;

        decode_deployment_receipt(&receipt, transaction_hash)
    }
}

impl ReceiptProvider for JsonRpcChain {
    async fn get_receipt(&self, transaction_hash: B256) -> anyhow::Result<Option<Receipt>> {
        Ok(self
            .fetch_receipt(transaction_hash)
            .await?
            .map(|receipt| parse_receipt(&receipt)))
    }
}

/// Strictly decode the receipt of a contract creation.
///
/// Every address field that is present must decode. A `to` that is present but
/// not an address yields the ambiguous [`ErrorCode::InvalidArgument`] shape: the
/// creation was mined, only the response is unusable.
pub fn decode_deployment_receipt(
    receipt: &Value,
    transaction_hash: B256,
) -> Result<Submitted, SubmissionError> {
    if parse_status(receipt) == Some(false) {
        return Err(
            SubmissionError::new(ErrorCode::CallException, "deployment transaction reverted")
                .with_transaction_hash(transaction_hash),
        );
    }

    let decode_address = |key: &str| -> Result<Option<Address>, SubmissionError> {
        match &receipt[key] {
            Value::Null => Ok(None),
            value => value
                .as_str()
                .and_then(|raw| Address::from_str(raw).ok())
                .map(Some)
                .ok_or_else(|| {
                    SubmissionError::new(
                        ErrorCode::InvalidArgument,
                        format!("invalid address value {value} in receipt field {key}"),
                    )
                    .with_argument("address")
                    .with_check_key(key)
                    .with_transaction_hash(transaction_hash)
                }),
        }
    };

    decode_address("to")?;
    let address = decode_address("contractAddress")?.ok_or_else(|| {
        SubmissionError::new(
            ErrorCode::CallException,
            "receipt has no contract address",
        )
        .with_transaction_hash(transaction_hash)
    })?;

    Ok(Submitted {
        address,
        transaction_hash,
    })
}

/// Leniently read the fields recovery needs, ignoring anything undecodable.
pub fn parse_receipt(receipt: &Value) -> Receipt {
    Receipt {
        contract_address: receipt["contractAddress"]
            .as_str()
            .and_then(|raw| Address::from_str(raw).ok()),
        status: parse_status(receipt),
    }
}

fn parse_status(receipt: &Value) -> Option<bool> {
    let raw = receipt["status"].as_str()?;
    u64::from_str_radix(raw.trim_start_matches("0x"), 16)
        .ok()
        .map(|status| status != 0)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use alloy::eips::eip2718::Decodable2718;

    use super::*;

    const CONTRACT: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";

    fn hash() -> B256 {
        B256::repeat_byte(0xab)
    }

    #[test]
    fn test_decode_creation_receipt() {
        let receipt = json!({
            "status": "0x1",
            "to": null,
            "contractAddress": CONTRACT,
        });

        let submitted = decode_deployment_receipt(&receipt, hash()).unwrap();
        assert_eq!(submitted.address, Address::from_str(CONTRACT).unwrap());
        assert_eq!(submitted.transaction_hash, hash());
    }

    #[test]
    fn test_decode_reverted_receipt() {
        let receipt = json!({ "status": "0x0", "contractAddress": CONTRACT });

        let err = decode_deployment_receipt(&receipt, hash()).unwrap_err();
        assert_eq!(err.code, ErrorCode::CallException);
        assert_eq!(err.transaction_hash, Some(hash()));
        assert_eq!(err.ambiguous_transaction(), None);
    }

    #[test]
    fn test_undecodable_to_is_ambiguous() {
        let receipt = json!({
            "status": "0x1",
            "to": "",
            "contractAddress": CONTRACT,
        });

        let err = decode_deployment_receipt(&receipt, hash()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
        assert_eq!(err.ambiguous_transaction(), Some(hash()));

        // Recovery still reads the created address from the same receipt.
        assert_eq!(
            parse_receipt(&receipt).contract_address,
            Some(Address::from_str(CONTRACT).unwrap())
        );
    }

    #[test]
    fn test_missing_contract_address() {
        let receipt = json!({ "status": "0x1", "to": null });

        let err = decode_deployment_receipt(&receipt, hash()).unwrap_err();
        assert_eq!(err.code, ErrorCode::CallException);

        let err = decode_deployment_receipt(
            &json!({ "status": "0x1", "contractAddress": "0x12" }),
            hash(),
        )
        .unwrap_err();
        assert_eq!(err.check_key.as_deref(), Some("contractAddress"));
        assert_eq!(err.ambiguous_transaction(), None);
    }

    #[test]
    fn test_parse_receipt_status() {
        assert_eq!(parse_receipt(&json!({ "status": "0x1" })).status, Some(true));
        assert_eq!(parse_receipt(&json!({ "status": "0x0" })).status, Some(false));
        assert_eq!(parse_receipt(&json!({})), Receipt::default());
    }

    #[test]
    fn test_sign_creation() {
        let signer = PrivateKeySigner::from_str(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap();
        let params = CreationParams {
            chain_id: 31337,
            nonce: 7,
            gas_price: 1_000_000_000,
            gas_limit: 500_000,
        };
        let code = [0x60, 0x80, 0x60, 0x40];

        let raw = sign_creation(&signer, params, &code).unwrap();

        let envelope = TxEnvelope::decode_2718(&mut raw.as_ref()).unwrap();
        let signed = envelope.as_legacy().expect("expected a legacy transaction");
        let tx = signed.tx();
        assert_eq!(tx.chain_id, Some(31337));
        assert_eq!(tx.nonce, 7);
        assert_eq!(tx.gas_price, 1_000_000_000);
        assert_eq!(tx.gas_limit, 500_000);
        assert!(tx.to.is_create());
        assert_eq!(tx.input.to_vec(), code.to_vec());

        let recovered = signed
            .signature()
            .recover_address_from_prehash(&signed.signature_hash())
            .unwrap();
        assert_eq!(recovered, signer.address());
    }

    #[tokio::test]
    async fn test_wait_for_retries_until_value() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let value = wait_for(
            "test",
            Duration::from_secs(5),
            Duration::from_millis(10),
            move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                match n {
                    0 => Err(anyhow::anyhow!("connection refused")),
                    1 => Ok(None),
                    _ => Ok(Some(n)),
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn test_wait_for_checks_again_at_the_deadline() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let start = std::time::Instant::now();

        let result: anyhow::Result<()> = wait_for(
            "receipt",
            Duration::from_millis(50),
            Duration::from_secs(2),
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            },
        )
        .await;

        assert!(result.is_err());
        assert!(counter.load(Ordering::SeqCst) >= 2);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_wait_for_times_out() {
        let result: anyhow::Result<()> = wait_for(
            "receipt",
            Duration::from_millis(50),
            Duration::from_millis(10),
            || async { Ok(None) },
        )
        .await;

        assert!(result.unwrap_err().to_string().contains("Timeout waiting for receipt"));
    }
}
