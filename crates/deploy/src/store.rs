//! Per-network record of deployed contracts.
//!
//! The file-backed store keeps one JSON document per contract under
//! `{root}/{network}/{ContractName}.json`. Records are written to a temporary
//! file first and renamed into place, so a reader never observes a partial record.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    str::FromStr,
};

use alloy_core::primitives::{Address, B256};
use serde::{Deserialize, Serialize};

use crate::{
    config::NetworkConfig,
    error::{ConfigError, DeployError},
};

/// Result of one successful deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub contract_name: String,
    pub network: String,
    pub address: Address,
    #[serde(default)]
    pub constructor_args: Vec<Address>,
    /// Absent for records imported from an external deployment system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<B256>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no {contract_name} deployment found on network {network}")]
    NotFound {
        contract_name: String,
        network: String,
    },
    #[error("failed to access deployment file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed deployment file {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid contract name {name:?}: only ASCII letters, digits, '_' and '-' are allowed")]
    InvalidName { name: String },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Mapping from contract name to deployment record for a single network.
///
/// A store is owned by one orchestration run at a time; it does no locking.
pub trait DeploymentStore {
    /// The network the records belong to.
    fn network(&self) -> &str;

    /// Look up the record of `contract_name`.
    fn get(&self, contract_name: &str) -> Result<DeploymentRecord, StoreError>;

    /// Insert or replace the record keyed by its contract name.
    fn put(&mut self, record: DeploymentRecord) -> Result<(), StoreError>;

    /// All records, ordered by contract name.
    fn list(&self) -> Result<Vec<DeploymentRecord>, StoreError>;
}

/// Store backed by JSON files on disk.
#[derive(Debug, Clone)]
pub struct FileDeploymentStore {
    network: String,
    dir: PathBuf,
}

impl FileDeploymentStore {
    /// Open the store of `network` under the deployments root `root`.
    ///
    /// Nothing is created on disk until the first write.
    pub fn new(root: impl AsRef<Path>, network: impl Into<String>) -> Self {
        let network = network.into();
        let dir = root.as_ref().join(&network);
        Self { network, dir }
    }

    /// Directory holding this network's records.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record of `contract_name`, which must stay inside the network directory.
    fn record_path(&self, contract_name: &str) -> Result<PathBuf, StoreError> {
        let valid = !contract_name.is_empty()
            && contract_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidName {
                name: contract_name.to_string(),
            });
        }
        Ok(self.dir.join(format!("{contract_name}.json")))
    }

    fn read_record(path: &Path) -> Result<DeploymentRecord, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| StoreError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl DeploymentStore for FileDeploymentStore {
    fn network(&self) -> &str {
        &self.network
    }

    fn get(&self, contract_name: &str) -> Result<DeploymentRecord, StoreError> {
        let path = self.record_path(contract_name)?;
        if !path.exists() {
            return Err(StoreError::NotFound {
                contract_name: contract_name.to_string(),
                network: self.network.clone(),
            });
        }
        Self::read_record(&path)
    }

    fn put(&mut self, record: DeploymentRecord) -> Result<(), StoreError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| StoreError::Io { path, source }
        };

        let path = self.record_path(&record.contract_name)?;
        std::fs::create_dir_all(&self.dir).map_err(io_err(&self.dir))?;

        let tmp_path = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(&record).map_err(|source| {
            StoreError::Malformed {
                path: path.clone(),
                source,
            }
        })?;

        std::fs::write(&tmp_path, content).map_err(io_err(&tmp_path))?;
        std::fs::rename(&tmp_path, &path).map_err(io_err(&path))?;

        tracing::debug!(
            path = %path.display(),
            contract = %record.contract_name,
            address = %record.address,
            "Deployment record written"
        );
        Ok(())
    }

    fn list(&self) -> Result<Vec<DeploymentRecord>, StoreError> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }

        let entries = std::fs::read_dir(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        paths.iter().map(|p| Self::read_record(p)).collect()
    }
}

/// Store held in memory, for dry runs and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryDeploymentStore {
    network: String,
    records: BTreeMap<String, DeploymentRecord>,
}

impl MemoryDeploymentStore {
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            records: BTreeMap::new(),
        }
    }

    /// Add a record, builder-style.
    pub fn with_record(mut self, record: DeploymentRecord) -> Self {
        self.records.insert(record.contract_name.clone(), record);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl DeploymentStore for MemoryDeploymentStore {
    fn network(&self) -> &str {
        &self.network
    }

    fn get(&self, contract_name: &str) -> Result<DeploymentRecord, StoreError> {
        self.records
            .get(contract_name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                contract_name: contract_name.to_string(),
                network: self.network.clone(),
            })
    }

    fn put(&mut self, record: DeploymentRecord) -> Result<(), StoreError> {
        self.records.insert(record.contract_name.clone(), record);
        Ok(())
    }

    fn list(&self) -> Result<Vec<DeploymentRecord>, StoreError> {
        Ok(self.records.values().cloned().collect())
    }
}

/// Record the network's externally supplied deployments in the store.
///
/// Entries already recorded at the same address are left untouched. Returns
/// the number of records written.
pub fn import_external_deployments<S: DeploymentStore + ?Sized>(
    store: &mut S,
    network: &NetworkConfig,
) -> Result<usize, DeployError> {
    let mut written = 0;

    for (name, raw) in &network.external_deployments {
        let address = Address::from_str(raw.trim()).map_err(|_| ConfigError::InvalidAddress {
            network: network.name.clone(),
            config_key: "externalDeployments",
            field: "address",
            value: raw.clone(),
        })?;

        match store.get(name) {
            Ok(existing) if existing.address == address => continue,
            Ok(_) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        store.put(DeploymentRecord {
            contract_name: name.clone(),
            network: network.name.clone(),
            address,
            constructor_args: vec![],
            transaction_hash: None,
        })?;
        tracing::info!(
            network = %network.name,
            contract = %name,
            address = %address,
            "Imported external deployment"
        );
        written += 1;
    }

    Ok(written)
}
