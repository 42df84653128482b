use std::path::PathBuf;

use alloy_core::primitives::Address;
use clap::{Args, Parser, Subcommand};
use oftkit_deploy::{OFTKIT_CONFIG_FILENAME, RedeployPolicy, UnitKind};
use tracing::level_filters::LevelFilter;
use url::Url;

/// Default directory of per-network deployment records.
const DEFAULT_DEPLOYMENTS_DIR: &str = "deployments";

/// Default directory of compiled contract artifacts.
const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Deploy LayerZero OFT adapters across networks"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "OFTKIT_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to the network profiles, or to a directory containing Oftkit.toml.
    #[arg(short, long, env = "OFTKIT_CONFIG", default_value = OFTKIT_CONFIG_FILENAME)]
    pub config: PathBuf,

    /// The network to operate on, as named in the config file.
    #[arg(short, long, env = "OFTKIT_NETWORK")]
    pub network: String,

    /// Directory holding one sub-directory of deployment records per network.
    #[arg(long, global = true, env = "OFTKIT_DEPLOYMENTS", default_value = DEFAULT_DEPLOYMENTS_DIR)]
    pub deployments: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Deploy units on the network
    #[clap(visible_alias = "d")]
    Deploy(DeployArgs),
    /// Show the deployments recorded for the network
    #[clap(visible_alias = "s")]
    Status,
    /// Record a contract deployed by another system
    Import(ImportArgs),
}

#[derive(Debug, Args)]
pub struct DeployArgs {
    /// Units to deploy, comma separated. Deploys every unit when omitted.
    ///
    /// Units are always deployed in dependency order, whatever the order given here.
    #[arg(long, value_delimiter = ',', env = "OFTKIT_UNITS")]
    pub units: Vec<UnitKind>,

    /// What to do with units the network already records.
    #[arg(long, env = "OFTKIT_REDEPLOY_POLICY", default_value_t = RedeployPolicy::Always)]
    pub redeploy_policy: RedeployPolicy,

    /// Directory of compiled contract artifacts.
    #[arg(long, env = "OFTKIT_ARTIFACTS", default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts: PathBuf,

    /// JSON-RPC endpoint. Overrides the network's configured url.
    #[arg(long, env = "OFTKIT_RPC_URL")]
    pub rpc_url: Option<Url>,

    /// Seconds to wait for a deployment transaction to be mined.
    #[arg(long, env = "OFTKIT_RECEIPT_TIMEOUT", default_value_t = 120)]
    pub receipt_timeout: u64,

    /// Index of the node account to deploy from when neither MNEMONIC nor PRIVATE_KEY is set.
    #[arg(long, env = "OFTKIT_ACCOUNT_INDEX", default_value_t = 0)]
    pub account_index: usize,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Well-known name of the contract, e.g. EndpointV2.
    #[arg(long)]
    pub name: String,

    /// Address of the contract on the network.
    #[arg(long)]
    pub address: Address,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_deploy_units() {
        let cli = Cli::try_parse_from([
            "oftkit",
            "--network",
            "mainnet",
            "deploy",
            "--units",
            "mint-burn-oft-adapter,elevated-minter-burner",
            "--redeploy-policy",
            "skip-if-unchanged",
        ])
        .unwrap();

        assert_eq!(cli.network, "mainnet");
        assert_eq!(cli.deployments, PathBuf::from(DEFAULT_DEPLOYMENTS_DIR));
        match cli.command {
            Command::Deploy(args) => {
                assert_eq!(
                    args.units,
                    vec![UnitKind::MintBurnOftAdapter, UnitKind::ElevatedMinterBurner]
                );
                assert_eq!(args.redeploy_policy, RedeployPolicy::SkipIfUnchanged);
                assert_eq!(args.receipt_timeout, 120);
            }
            other => panic!("expected deploy, got {other:?}"),
        }
    }

    #[test]
    fn test_reject_unknown_unit() {
        let result = Cli::try_parse_from([
            "oftkit",
            "--network",
            "mainnet",
            "deploy",
            "--units",
            "endpoint",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_import() {
        let cli = Cli::try_parse_from([
            "oftkit",
            "-n",
            "plasma-mainnet",
            "import",
            "--name",
            "EndpointV2",
            "--address",
            "0x1a44076050125825900e736c501f859c50fE728c",
            "--deployments",
            "/tmp/deployments",
        ])
        .unwrap();

        assert_eq!(cli.deployments, PathBuf::from("/tmp/deployments"));
        assert!(matches!(cli.command, Command::Import(ImportArgs { ref name, .. }) if name == "EndpointV2"));
    }
}
