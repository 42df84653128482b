//! Sequencing of unit deployments on one network.

use serde::{Deserialize, Serialize};

use crate::{
    config::NetworkConfig,
    error::DeployError,
    identity::DeployerIdentity,
    phase::{DeploymentPhase, PhaseEvent, transition},
    recovery::{AmbiguousResponseRecovery, ReceiptProvider},
    resolver::{ConfigResolver, DependencyResolver, Resolution},
    store::{DeploymentRecord, DeploymentStore},
    submission::{SubmissionOutcome, SubmissionRequest, Submitter},
    units::{UnitKind, plan},
};

/// What to do when the store already records the unit.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum RedeployPolicy {
    /// Always submit a new deployment.
    #[default]
    Always,
    /// Keep the recorded deployment if it was built from the same constructor arguments.
    SkipIfUnchanged,
}

/// Result of one unit deployment.
#[derive(Debug)]
pub enum DeploymentOutcome {
    Success(DeploymentRecord),
    Skipped(String),
    Failed(DeployError),
}

impl DeploymentOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DeploymentOutcome::Success(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, DeploymentOutcome::Skipped(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DeploymentOutcome::Failed(_))
    }

    pub fn record(&self) -> Option<&DeploymentRecord> {
        match self {
            DeploymentOutcome::Success(record) => Some(record),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&DeployError> {
        match self {
            DeploymentOutcome::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// How one unit fared in a run.
#[derive(Debug)]
pub struct UnitReport {
    pub unit: UnitKind,
    pub network: String,
    /// The terminal phase the attempt reached.
    pub phase: DeploymentPhase,
    pub outcome: DeploymentOutcome,
}

/// Everything checked before anything is sent.
enum Preflight {
    Ready(SubmissionRequest),
    Skip(String),
}

/// Deploys units through a chain client and records them in a store.
pub struct DeploymentOrchestrator<C> {
    chain: C,
    redeploy_policy: RedeployPolicy,
}

impl<C> DeploymentOrchestrator<C>
where
    C: DeployerIdentity + Submitter + ReceiptProvider,
{
    pub fn new(chain: C) -> Self {
        Self {
            chain,
            redeploy_policy: RedeployPolicy::default(),
        }
    }

    pub fn with_redeploy_policy(mut self, redeploy_policy: RedeployPolicy) -> Self {
        self.redeploy_policy = redeploy_policy;
        self
    }

    pub fn redeploy_policy(&self) -> RedeployPolicy {
        self.redeploy_policy
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    /// Deploy one unit on `network`, recording it in `store` on success.
    pub async fn deploy<S: DeploymentStore + ?Sized>(
        &self,
        unit: UnitKind,
        network: &NetworkConfig,
        store: &mut S,
    ) -> DeploymentOutcome {
        self.deploy_unit(unit, network, store).await.outcome
    }

    /// Deploy the selected units in dependency order, stopping at the first failure.
    pub async fn deploy_units<S: DeploymentStore + ?Sized>(
        &self,
        units: &[UnitKind],
        network: &NetworkConfig,
        store: &mut S,
    ) -> Vec<UnitReport> {
        let ordered = plan(units);
        tracing::info!(
            network = %network.name,
            units = ?ordered,
            policy = %self.redeploy_policy,
            "Starting deployment run"
        );

        let mut reports = Vec::with_capacity(ordered.len());
        for unit in ordered {
            let report = self.deploy_unit(unit, network, store).await;
            let failed = report.outcome.is_failed();
            reports.push(report);

            if failed {
                tracing::warn!(
                    network = %network.name,
                    unit = %unit,
                    "Stopping deployment run after failed unit"
                );
                break;
            }
        }

        reports
    }

    /// Deploy one unit and report the phase it ended in.
    pub async fn deploy_unit<S: DeploymentStore + ?Sized>(
        &self,
        unit: UnitKind,
        network: &NetworkConfig,
        store: &mut S,
    ) -> UnitReport {
        let mut attempt = Attempt::new(unit, network);
        let contract = unit.contract_name();

        tracing::info!(network = %network.name, eid = ?network.eid, contract, "Deploying unit");

        let request = match self.preflight(unit, network, &*store).await {
            Ok(Preflight::Ready(request)) => request,
            Ok(Preflight::Skip(reason)) => {
                tracing::warn!(network = %network.name, contract, reason = %reason, "Skipping unit");
                attempt.advance(PhaseEvent::SkipRequested);
                return attempt.finish(DeploymentOutcome::Skipped(reason));
            }
            Err(error) => {
                tracing::error!(network = %network.name, contract, error = %error, "Unit failed before submission");
                attempt.advance(PhaseEvent::PreflightFailed);
                return attempt.finish(DeploymentOutcome::Failed(error));
            }
        };

        attempt.advance(PhaseEvent::Submitted);
        tracing::info!(
            network = %network.name,
            contract,
            from = %request.from,
            args = ?request.constructor_args,
            "Submitting deployment"
        );

        let result = self.chain.submit(&request).await;
        let (address, transaction_hash, success) = match SubmissionOutcome::classify(result) {
            SubmissionOutcome::Success(submitted) => (
                submitted.address,
                submitted.transaction_hash,
                PhaseEvent::SubmissionSucceeded,
            ),
            SubmissionOutcome::Ambiguous {
                transaction_hash,
                error,
            } => {
                attempt.advance(PhaseEvent::SubmissionAmbiguous);
                tracing::warn!(
                    network = %network.name,
                    contract,
                    tx_hash = %transaction_hash,
                    error = %error,
                    "Deployment response could not be decoded, checking the chain"
                );

                let recovery = AmbiguousResponseRecovery::new(&self.chain);
                match recovery.confirm(error, transaction_hash).await {
                    Ok(address) => {
                        tracing::info!(
                            network = %network.name,
                            contract,
                            tx_hash = %transaction_hash,
                            address = %address,
                            "Deployment transaction was broadcast and is confirmed on-chain despite the client-side error"
                        );
                        (address, transaction_hash, PhaseEvent::RecoverySucceeded)
                    }
                    Err(error) => {
                        attempt.advance(PhaseEvent::RecoveryFailed);
                        tracing::error!(network = %network.name, contract, error = %error, "Deployment failed");
                        return attempt.finish(DeploymentOutcome::Failed(error.into()));
                    }
                }
            }
            SubmissionOutcome::Fatal(error) => {
                attempt.advance(PhaseEvent::SubmissionFailed);
                tracing::error!(network = %network.name, contract, error = %error, "Deployment failed");
                return attempt.finish(DeploymentOutcome::Failed(error.into()));
            }
        };

        let record = DeploymentRecord {
            contract_name: contract.to_string(),
            network: network.name.clone(),
            address,
            constructor_args: request.constructor_args,
            transaction_hash: Some(transaction_hash),
        };

        if let Err(source) = store.put(record.clone()) {
            attempt.advance(PhaseEvent::PersistFailed);
            tracing::error!(
                network = %network.name,
                contract,
                address = %address,
                tx_hash = %transaction_hash,
                error = %source,
                "Contract deployed but its record could not be written"
            );
            return attempt.finish(DeploymentOutcome::Failed(DeployError::Unrecorded {
                contract,
                address,
                transaction_hash,
                source,
            }));
        }

        attempt.advance(success);
        tracing::info!(
            network = %network.name,
            contract,
            address = %address,
            tx_hash = %transaction_hash,
            "Unit deployed"
        );
        attempt.finish(DeploymentOutcome::Success(record))
    }

    /// Resolve identity, config and dependencies, then apply the redeploy policy.
    async fn preflight<S: DeploymentStore + ?Sized>(
        &self,
        unit: UnitKind,
        network: &NetworkConfig,
        store: &S,
    ) -> Result<Preflight, DeployError> {
        let spec = unit.spec();
        let deployer = self.chain.deployer_address().await?;

        let config = match ConfigResolver::resolve(network, unit)? {
            Resolution::Config(config) => config,
            Resolution::Skip(signal) => return Ok(Preflight::Skip(signal.reason)),
        };

        let dependencies = DependencyResolver::resolve_all(&config, store)?;
        let constructor_args = spec.constructor_args(config.token_address, &dependencies, deployer);

        if self.redeploy_policy == RedeployPolicy::SkipIfUnchanged {
            match store.get(spec.contract_name) {
                Ok(existing) if existing.constructor_args == constructor_args => {
                    return Ok(Preflight::Skip(format!(
                        "{} already deployed at {}",
                        spec.contract_name, existing.address
                    )));
                }
                Ok(_) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(Preflight::Ready(SubmissionRequest {
            contract_name: spec.contract_name,
            constructor_args,
            from: deployer,
        }))
    }
}

/// Phase bookkeeping of one attempt.
struct Attempt {
    unit: UnitKind,
    network: String,
    phase: DeploymentPhase,
}

impl Attempt {
    fn new(unit: UnitKind, network: &NetworkConfig) -> Self {
        Self {
            unit,
            network: network.name.clone(),
            phase: DeploymentPhase::Pending,
        }
    }

    fn advance(&mut self, event: PhaseEvent) {
        match transition(&self.phase, &event) {
            Ok(next) => {
                tracing::trace!(unit = %self.unit, from = %self.phase, to = %next, "Phase transition");
                self.phase = next;
            }
            Err(e) => tracing::error!(unit = %self.unit, error = %e, "Rejected phase transition"),
        }
    }

    fn finish(self, outcome: DeploymentOutcome) -> UnitReport {
        UnitReport {
            unit: self.unit,
            network: self.network,
            phase: self.phase,
            outcome,
        }
    }
}
