//! oftkit deploys the LayerZero OFT adapter family across networks.

mod cli;
mod report;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use strum::IntoEnumIterator;

use cli::{Cli, Command, DeployArgs, ImportArgs};
use oftkit_deploy::{
    ArtifactStore, DeploymentOrchestrator, DeploymentRecord, DeploymentStore, FileDeploymentStore,
    IdentitySource, JsonRpcChain, NetworkConfig, NetworksConfig, UnitKind,
    import_external_deployments,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let config = NetworksConfig::load_from_file(&cli.config)?;
    let network = config.network(&cli.network)?;
    let mut store = FileDeploymentStore::new(&cli.deployments, &network.name);

    match cli.command {
        Command::Deploy(args) => deploy(network, &mut store, args).await,
        Command::Status => status(&store),
        Command::Import(args) => import(network, &mut store, args),
    }
}

async fn deploy(
    network: &NetworkConfig,
    store: &mut FileDeploymentStore,
    args: DeployArgs,
) -> Result<()> {
    let url = args
        .rpc_url
        .or_else(|| network.url.clone())
        .with_context(|| {
            format!(
                "No RPC url for network {}: set url in the config file or pass --rpc-url",
                network.name
            )
        })?;

    let identity = IdentitySource::from_env().unwrap_or_else(|| {
        tracing::warn!(
            account_index = args.account_index,
            "Neither MNEMONIC nor PRIVATE_KEY is set, deploying from the node's account"
        );
        IdentitySource::RpcAccount {
            index: args.account_index,
        }
    });

    let chain = JsonRpcChain::new(url, identity, ArtifactStore::new(&args.artifacts))?
        .with_receipt_timeout(Duration::from_secs(args.receipt_timeout));

    let imported = import_external_deployments(store, network)
        .context("Failed to import external deployments")?;
    if imported > 0 {
        tracing::info!(network = %network.name, imported, "External deployments recorded");
    }

    let units: Vec<UnitKind> = if args.units.is_empty() {
        UnitKind::iter().collect()
    } else {
        args.units
    };

    let orchestrator =
        DeploymentOrchestrator::new(chain).with_redeploy_policy(args.redeploy_policy);
    let reports = orchestrator.deploy_units(&units, network, store).await;

    println!("{}", report::units_table(&reports));

    let failed = reports.iter().filter(|r| r.outcome.is_failed()).count();
    if failed > 0 {
        anyhow::bail!("{} unit(s) failed on network {}", failed, network.name);
    }

    Ok(())
}

fn status(store: &FileDeploymentStore) -> Result<()> {
    let records = store.list().context(format!(
        "Failed to read deployments from {}",
        store.dir().display()
    ))?;

    if records.is_empty() {
        tracing::info!(
            network = %store.network(),
            dir = %store.dir().display(),
            "No deployments recorded"
        );
        return Ok(());
    }

    println!("{}", report::records_table(&records));
    Ok(())
}

fn import(network: &NetworkConfig, store: &mut FileDeploymentStore, args: ImportArgs) -> Result<()> {
    store
        .put(DeploymentRecord {
            contract_name: args.name.clone(),
            network: network.name.clone(),
            address: args.address,
            constructor_args: vec![],
            transaction_hash: None,
        })
        .context(format!("Failed to record {}", args.name))?;

    tracing::info!(
        network = %network.name,
        contract = %args.name,
        address = %args.address,
        "Deployment imported"
    );
    Ok(())
}
