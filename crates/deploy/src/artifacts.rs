//! Compiled contract artifacts.
//!
//! Both Hardhat (`"bytecode": "0x.."`) and Foundry (`"bytecode": {"object": "0x.."}`)
//! artifact layouts are understood. Only the creation bytecode is read.

use std::path::{Path, PathBuf};

use alloy_core::primitives::{Address, Bytes};
use anyhow::{Context, Result};
use serde_json::Value;

/// Directory of compiled artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the artifact of `contract_name`.
    ///
    /// Looks for `{dir}/{name}.json` first, then Foundry's `{dir}/{name}.sol/{name}.json`.
    pub fn artifact_path(&self, contract_name: &str) -> Result<PathBuf> {
        let candidates = [
            self.dir.join(format!("{contract_name}.json")),
            self.dir
                .join(format!("{contract_name}.sol"))
                .join(format!("{contract_name}.json")),
        ];

        candidates
            .iter()
            .find(|path| path.is_file())
            .cloned()
            .with_context(|| {
                format!(
                    "No artifact for {} found in {}",
                    contract_name,
                    self.dir.display()
                )
            })
    }

    /// Creation bytecode of `contract_name`.
    pub fn bytecode(&self, contract_name: &str) -> Result<Bytes> {
        let path = self.artifact_path(contract_name)?;
        let content = std::fs::read_to_string(&path)
            .context(format!("Failed to read artifact {}", path.display()))?;
        let artifact: Value = serde_json::from_str(&content)
            .context(format!("Failed to parse artifact {}", path.display()))?;

        let raw = match &artifact["bytecode"] {
            Value::String(code) => code.as_str(),
            Value::Object(code) => code
                .get("object")
                .and_then(Value::as_str)
                .context(format!("Artifact {} has no bytecode.object", path.display()))?,
            _ => anyhow::bail!("Artifact {} has no bytecode", path.display()),
        };

        let code = hex::decode(raw.trim_start_matches("0x")).context(format!(
            "Bytecode of {} is not valid hex (unlinked libraries?)",
            contract_name
        ))?;
        if code.is_empty() {
            anyhow::bail!(
                "Bytecode of {} is empty; abstract contracts and interfaces cannot be deployed",
                contract_name
            );
        }

        Ok(Bytes::from(code))
    }

    /// Creation bytecode of `contract_name` followed by its encoded constructor arguments.
    pub fn creation_code(&self, contract_name: &str, constructor_args: &[Address]) -> Result<Bytes> {
        let mut code = self.bytecode(contract_name)?.to_vec();
        code.extend_from_slice(&encode_address_args(constructor_args));
        Ok(Bytes::from(code))
    }
}

/// ABI-encode a list of `address` arguments: one left-padded 32-byte word each.
pub fn encode_address_args(args: &[Address]) -> Vec<u8> {
    args.iter()
        .flat_map(|address| address.into_word().0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_encode_address_args() {
        let encoded = encode_address_args(&[Address::repeat_byte(0x11), Address::repeat_byte(0x22)]);

        assert_eq!(encoded.len(), 64);
        assert_eq!(&encoded[..12], &[0u8; 12]);
        assert_eq!(&encoded[12..32], &[0x11u8; 20]);
        assert_eq!(&encoded[32..44], &[0u8; 12]);
        assert_eq!(&encoded[44..], &[0x22u8; 20]);
    }

    #[test]
    fn test_hardhat_artifact() {
        let temp_dir = TempDir::new("oftkit-test").expect("Failed to create temp dir");
        std::fs::write(
            temp_dir.path().join("ElevatedMinterBurner.json"),
            r#"{"contractName": "ElevatedMinterBurner", "abi": [], "bytecode": "0x6080"}"#,
        )
        .unwrap();

        let artifacts = ArtifactStore::new(temp_dir.path());
        let code = artifacts
            .creation_code("ElevatedMinterBurner", &[Address::repeat_byte(0x11)])
            .unwrap();

        assert_eq!(&code[..2], &[0x60, 0x80]);
        assert_eq!(code.len(), 2 + 32);
    }

    #[test]
    fn test_foundry_artifact() {
        let temp_dir = TempDir::new("oftkit-test").expect("Failed to create temp dir");
        let dir = temp_dir.path().join("MyOFTAdapter.sol");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("MyOFTAdapter.json"),
            r#"{"abi": [], "bytecode": {"object": "0x60806040", "linkReferences": {}}}"#,
        )
        .unwrap();

        let artifacts = ArtifactStore::new(temp_dir.path());
        assert_eq!(
            artifacts.bytecode("MyOFTAdapter").unwrap(),
            Bytes::from(vec![0x60, 0x80, 0x60, 0x40])
        );
    }

    #[test]
    fn test_missing_and_empty_artifacts() {
        let temp_dir = TempDir::new("oftkit-test").expect("Failed to create temp dir");
        std::fs::write(
            temp_dir.path().join("IOFT.json"),
            r#"{"abi": [], "bytecode": "0x"}"#,
        )
        .unwrap();

        let artifacts = ArtifactStore::new(temp_dir.path());
        assert!(artifacts.bytecode("MyMintBurnOFTAdapter").is_err());
        assert!(artifacts.bytecode("IOFT").is_err());
    }
}
