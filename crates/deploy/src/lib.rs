//! oftkit-deploy - Deployment library for LayerZero OFT adapter contracts.
//!
//! This crate sequences the deployment of the OFT adapter family across networks:
//! it resolves each network's configuration profile, resolves constructor
//! dependencies from previously recorded deployments, submits the deployment
//! transaction and records the result in a per-network deployment store.

mod artifacts;
mod config;
mod error;
mod identity;
mod orchestrator;
mod phase;
mod recovery;
mod resolver;
pub mod rpc;
mod store;
mod submission;
mod units;

pub use artifacts::{ArtifactStore, encode_address_args};
pub use config::{
    ElevatedMinterBurnerConfig, MintBurnOftAdapterConfig, NetworkConfig, NetworksConfig,
    OFTKIT_CONFIG_FILENAME, OftAdapterConfig, UnitSection,
};
pub use error::{ConfigError, DependencyError, DeployError, MissingIdentityError};
pub use identity::{DeployerIdentity, IdentitySource, MNEMONIC_ENV, PRIVATE_KEY_ENV};
pub use orchestrator::{DeploymentOrchestrator, DeploymentOutcome, RedeployPolicy, UnitReport};
pub use phase::{DeploymentPhase, PhaseEvent, TransitionError, transition};
pub use recovery::{AmbiguousResponseRecovery, Receipt, ReceiptProvider, RecoveryError};
pub use resolver::{
    ConfigResolver, DependencyResolver, Resolution, SkipSignal, UnitConfig, resolve_with_override,
};
pub use rpc::JsonRpcChain;
pub use store::{
    DeploymentRecord, DeploymentStore, FileDeploymentStore, MemoryDeploymentStore, StoreError,
    import_external_deployments,
};
pub use submission::{
    ErrorCode, Submitted, SubmissionError, SubmissionOutcome, SubmissionRequest, Submitter,
};
pub use units::{
    AbsencePolicy, ConstructorArg, Dependency, ENDPOINT_V2, MINTER_BURNER_ADDRESS_FIELD,
    TOKEN_ADDRESS_FIELD, UnitKind, UnitSpec, plan,
};
