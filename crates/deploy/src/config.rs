//! Per-network configuration profiles.

use std::{collections::BTreeMap, path::Path};

use anyhow::{Context, Result};
use derive_more::Deref;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::units::{MINTER_BURNER_ADDRESS_FIELD, UnitKind};

/// The default name for the oftkit configuration file.
pub const OFTKIT_CONFIG_FILENAME: &str = "Oftkit.toml";

/// Configuration for the `MyOFTAdapter` unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OftAdapterConfig {
    /// The token the adapter wraps.
    pub token_address: String,
}

/// Configuration for the `ElevatedMinterBurner` unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElevatedMinterBurnerConfig {
    /// The token to mint and burn. Must implement `IMintableBurnable`.
    pub token_address: String,
}

/// Configuration for the `MyMintBurnOFTAdapter` unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintBurnOftAdapterConfig {
    pub token_address: String,
    /// ElevatedMinterBurner address. When unset, the network's recorded
    /// `ElevatedMinterBurner` deployment is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minter_burner_address: Option<String>,
}

/// Static profile of one target network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    /// The network name, taken from the key of the network's table.
    #[serde(skip)]
    pub name: String,
    /// LayerZero endpoint id of the network. Only reported: the endpoint
    /// address itself comes from the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eid: Option<u32>,
    /// JSON-RPC endpoint of the network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,
    /// Contracts deployed by another system, keyed by their well-known name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub external_deployments: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oft_adapter: Option<OftAdapterConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevated_minter_burner: Option<ElevatedMinterBurnerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mint_burn_oft_adapter: Option<MintBurnOftAdapterConfig>,
}

/// Borrowed, unit-agnostic view over a unit's config section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSection<'a> {
    pub token_address: &'a str,
    /// Dependency overrides that are set, keyed by config field.
    pub overrides: Vec<(&'static str, &'a str)>,
}

impl UnitSection<'_> {
    /// The raw value of an override field, if set to a non-blank value.
    pub fn override_value(&self, field: &str) -> Option<&str> {
        self.overrides
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
    }
}

impl NetworkConfig {
    /// Create an empty profile for the named network.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// The config section of `unit`, or `None` if the network does not configure it.
    pub fn unit_section(&self, unit: UnitKind) -> Option<UnitSection<'_>> {
        match unit {
            UnitKind::OftAdapter => self.oft_adapter.as_ref().map(|c| UnitSection {
                token_address: &c.token_address,
                overrides: vec![],
            }),
            UnitKind::ElevatedMinterBurner => {
                self.elevated_minter_burner.as_ref().map(|c| UnitSection {
                    token_address: &c.token_address,
                    overrides: vec![],
                })
            }
            UnitKind::MintBurnOftAdapter => {
                self.mint_burn_oft_adapter.as_ref().map(|c| UnitSection {
                    token_address: &c.token_address,
                    overrides: c
                        .minter_burner_address
                        .as_deref()
                        .map(|address| vec![(MINTER_BURNER_ADDRESS_FIELD, address)])
                        .unwrap_or_default(),
                })
            }
        }
    }
}

/// All network profiles, keyed by network name.
///
/// ```toml
/// [networks.mainnet]
/// eid = 30101
/// url = "https://ethereum-rpc.publicnode.com"
///
/// [networks.mainnet.externalDeployments]
/// EndpointV2 = "0x1a44076050125825900e736c501f859c50fE728c"
///
/// [networks.mainnet.mintBurnOftAdapter]
/// tokenAddress = "0x09fd37d9aa613789c517e76df1c53aece2b60df4"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, Serialize, Deserialize)]
pub struct NetworksConfig {
    #[serde(default)]
    networks: BTreeMap<String, NetworkConfig>,
}

impl NetworksConfig {
    /// Parse network profiles from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Self =
            toml::from_str(content).context("Failed to parse config file as TOML")?;
        for (name, network) in config.networks.iter_mut() {
            network.name = name.clone();
        }
        Ok(config)
    }

    /// Load the network profiles from a TOML file.
    ///
    /// If `path` is a directory, the default config file inside it is read.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "Configuration file or directory not found: {}",
                path.display()
            );
        }

        let config_path = if path.is_dir() {
            path.join(OFTKIT_CONFIG_FILENAME)
        } else {
            path.to_path_buf()
        };

        let content = std::fs::read_to_string(&config_path)
            .context(format!("Failed to read config from {}", config_path.display()))?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(
            path = %config_path.display(),
            networks = config.networks.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Save the network profiles to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        std::fs::write(path, content)
            .context(format!("Failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// The profile of the named network.
    pub fn network(&self, name: &str) -> Result<&NetworkConfig> {
        self.networks.get(name).with_context(|| {
            format!(
                "Network {} not found in config (known networks: {})",
                name,
                self.networks.keys().cloned().collect::<Vec<_>>().join(", ")
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    const SAMPLE: &str = r#"
[networks.arbitrum-sepolia]
eid = 40231
url = "https://arbitrum-sepolia.gateway.tenderly.co"

[networks.mainnet]
eid = 30101

[networks.mainnet.externalDeployments]
EndpointV2 = "0x1a44076050125825900e736c501f859c50fE728c"

[networks.mainnet.oftAdapter]
tokenAddress = "0x09fd37d9aa613789c517e76df1c53aece2b60df4"

[networks.mainnet.elevatedMinterBurner]
tokenAddress = "0x09fd37d9aa613789c517e76df1c53aece2b60df4"

[networks.mainnet.mintBurnOftAdapter]
tokenAddress = "0x09fd37d9aa613789c517e76df1c53aece2b60df4"
minterBurnerAddress = "0xFb2B88B3f888149ee6167b52b8440A56fe991cC4"
"#;

    #[test]
    fn test_parse_networks() {
        let config = NetworksConfig::from_toml_str(SAMPLE).unwrap();

        assert_eq!(config.len(), 2);

        let mainnet = config.network("mainnet").unwrap();
        assert_eq!(mainnet.name, "mainnet");
        assert_eq!(mainnet.eid, Some(30101));
        assert!(mainnet.url.is_none());
        assert_eq!(
            mainnet.external_deployments.get("EndpointV2").map(String::as_str),
            Some("0x1a44076050125825900e736c501f859c50fE728c")
        );
        assert_eq!(
            mainnet
                .mint_burn_oft_adapter
                .as_ref()
                .and_then(|c| c.minter_burner_address.as_deref()),
            Some("0xFb2B88B3f888149ee6167b52b8440A56fe991cC4")
        );

        let sepolia = config.network("arbitrum-sepolia").unwrap();
        assert!(sepolia.oft_adapter.is_none());
        assert!(sepolia.elevated_minter_burner.is_none());
        assert!(sepolia.mint_burn_oft_adapter.is_none());
        assert_eq!(
            sepolia.url.as_ref().map(Url::as_str),
            Some("https://arbitrum-sepolia.gateway.tenderly.co/")
        );
    }

    #[test]
    fn test_unknown_network() {
        let config = NetworksConfig::from_toml_str(SAMPLE).unwrap();
        let err = config.network("plasma-mainnet").unwrap_err();
        assert!(err.to_string().contains("plasma-mainnet"));
    }

    #[test]
    fn test_unit_section_views() {
        let config = NetworksConfig::from_toml_str(SAMPLE).unwrap();
        let mainnet = config.network("mainnet").unwrap();

        let section = mainnet.unit_section(UnitKind::MintBurnOftAdapter).unwrap();
        assert_eq!(
            section.override_value(MINTER_BURNER_ADDRESS_FIELD),
            Some("0xFb2B88B3f888149ee6167b52b8440A56fe991cC4")
        );

        let section = mainnet.unit_section(UnitKind::ElevatedMinterBurner).unwrap();
        assert!(section.overrides.is_empty());

        let sepolia = config.network("arbitrum-sepolia").unwrap();
        assert!(sepolia.unit_section(UnitKind::OftAdapter).is_none());
    }

    #[test]
    fn test_blank_override_is_unset() {
        let mut network = NetworkConfig::new("mainnet");
        network.mint_burn_oft_adapter = Some(MintBurnOftAdapterConfig {
            token_address: "0x09fd37d9aa613789c517e76df1c53aece2b60df4".to_string(),
            minter_burner_address: Some("  ".to_string()),
        });

        let section = network.unit_section(UnitKind::MintBurnOftAdapter).unwrap();
        assert_eq!(section.override_value(MINTER_BURNER_ADDRESS_FIELD), None);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new("oftkit-test").expect("Failed to create temp dir");
        let path = temp_dir.path().join(OFTKIT_CONFIG_FILENAME);

        let original = NetworksConfig::from_toml_str(SAMPLE).unwrap();
        original.save_to_file(&path).expect("Failed to save config");

        // Loading from the directory picks up the default file name.
        let loaded = NetworksConfig::load_from_file(temp_dir.path()).expect("Failed to load");
        assert_eq!(original, loaded);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new("oftkit-test").expect("Failed to create temp dir");
        let result = NetworksConfig::load_from_file(&temp_dir.path().join("missing.toml"));
        assert!(result.is_err());
    }
}
