//! Static declarations of the deployable units.
//!
//! Each unit declares its contract name, the network config key it reads, what
//! happens when that key is absent, the dependencies its constructor needs (in
//! a fixed order) and the layout of its constructor arguments. Run ordering is
//! derived from these declarations rather than from invocation order.

use std::collections::BTreeSet;

use alloy_core::primitives::Address;
use serde::{Deserialize, Serialize};

/// Well-known store name of the LayerZero endpoint, deployed by a separate system.
pub const ENDPOINT_V2: &str = "EndpointV2";

/// Config field holding the token address of every unit.
pub const TOKEN_ADDRESS_FIELD: &str = "tokenAddress";

/// Config field overriding the minter/burner dependency of the mint/burn adapter.
pub const MINTER_BURNER_ADDRESS_FIELD: &str = "minterBurnerAddress";

/// A deployable contract type.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum UnitKind {
    /// `MyOFTAdapter`: lock/unlock adapter over an existing token.
    OftAdapter,
    /// `ElevatedMinterBurner`: mint/burn elevation contract for the token.
    ElevatedMinterBurner,
    /// `MyMintBurnOFTAdapter`: adapter that mints and burns through the minter/burner.
    MintBurnOftAdapter,
}

/// What a missing unit config means on a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsencePolicy {
    /// The unit is simply not part of this network's topology.
    Skip,
    /// The unit was requested but cannot work without its config.
    Fail,
}

/// A contract address the unit's constructor needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    /// Deployed by a separate system and recorded in the store under `name`.
    External { name: &'static str },
    /// Another unit's deployment, unless the unit config supplies `override_field`.
    Unit {
        unit: UnitKind,
        override_field: &'static str,
    },
}

/// One constructor argument slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructorArg {
    /// The unit config's `tokenAddress`.
    TokenAddress,
    /// The resolved address of `dependencies[i]`.
    Dependency(usize),
    /// The deployer, used as the contract owner.
    Deployer,
}

/// Static declaration of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitSpec {
    pub kind: UnitKind,
    /// Name under which the contract is compiled and recorded.
    pub contract_name: &'static str,
    /// Key of the unit's section in the network config.
    pub config_key: &'static str,
    pub absence: AbsencePolicy,
    /// Dependencies, resolved in this order.
    pub dependencies: &'static [Dependency],
    pub constructor: &'static [ConstructorArg],
}

static OFT_ADAPTER: UnitSpec = UnitSpec {
    kind: UnitKind::OftAdapter,
    contract_name: "MyOFTAdapter",
    config_key: "oftAdapter",
    absence: AbsencePolicy::Skip,
    dependencies: &[Dependency::External { name: ENDPOINT_V2 }],
    constructor: &[
        ConstructorArg::TokenAddress,
        ConstructorArg::Dependency(0),
        ConstructorArg::Deployer,
    ],
};

static ELEVATED_MINTER_BURNER: UnitSpec = UnitSpec {
    kind: UnitKind::ElevatedMinterBurner,
    contract_name: "ElevatedMinterBurner",
    config_key: "elevatedMinterBurner",
    absence: AbsencePolicy::Skip,
    dependencies: &[],
    constructor: &[ConstructorArg::TokenAddress, ConstructorArg::Deployer],
};

static MINT_BURN_OFT_ADAPTER: UnitSpec = UnitSpec {
    kind: UnitKind::MintBurnOftAdapter,
    contract_name: "MyMintBurnOFTAdapter",
    config_key: "mintBurnOftAdapter",
    absence: AbsencePolicy::Fail,
    dependencies: &[
        Dependency::Unit {
            unit: UnitKind::ElevatedMinterBurner,
            override_field: MINTER_BURNER_ADDRESS_FIELD,
        },
        Dependency::External { name: ENDPOINT_V2 },
    ],
    constructor: &[
        ConstructorArg::TokenAddress,
        ConstructorArg::Dependency(0),
        ConstructorArg::Dependency(1),
        ConstructorArg::Deployer,
    ],
};

impl UnitKind {
    /// The static declaration of this unit.
    pub fn spec(self) -> &'static UnitSpec {
        match self {
            UnitKind::OftAdapter => &OFT_ADAPTER,
            UnitKind::ElevatedMinterBurner => &ELEVATED_MINTER_BURNER,
            UnitKind::MintBurnOftAdapter => &MINT_BURN_OFT_ADAPTER,
        }
    }

    pub fn contract_name(self) -> &'static str {
        self.spec().contract_name
    }

    pub fn config_key(self) -> &'static str {
        self.spec().config_key
    }
}

impl UnitSpec {
    /// Units this unit must be deployed after.
    pub fn unit_dependencies(&self) -> impl Iterator<Item = UnitKind> + '_ {
        self.dependencies.iter().filter_map(|d| match d {
            Dependency::Unit { unit, .. } => Some(*unit),
            Dependency::External { .. } => None,
        })
    }

    /// Lay out the constructor arguments.
    ///
    /// `dependencies` must hold one resolved address per declared dependency, in
    /// declaration order.
    pub fn constructor_args(
        &self,
        token_address: Address,
        dependencies: &[Address],
        deployer: Address,
    ) -> Vec<Address> {
        self.constructor
            .iter()
            .map(|arg| match arg {
                ConstructorArg::TokenAddress => token_address,
                ConstructorArg::Dependency(i) => dependencies[*i],
                ConstructorArg::Deployer => deployer,
            })
            .collect()
    }
}

/// Order the selected units so that every unit comes after the units it depends on.
///
/// Duplicates are removed. Units that do not depend on each other keep their
/// declaration order. Dependencies that were not selected are not added.
pub fn plan(units: &[UnitKind]) -> Vec<UnitKind> {
    let selected: BTreeSet<UnitKind> = units.iter().copied().collect();
    let mut ordered = Vec::with_capacity(selected.len());
    let mut visited = BTreeSet::new();

    fn visit(
        unit: UnitKind,
        selected: &BTreeSet<UnitKind>,
        visited: &mut BTreeSet<UnitKind>,
        ordered: &mut Vec<UnitKind>,
    ) {
        if !visited.insert(unit) {
            return;
        }
        for dependency in unit.spec().unit_dependencies() {
            if selected.contains(&dependency) {
                visit(dependency, selected, visited, ordered);
            }
        }
        ordered.push(unit);
    }

    for unit in &selected {
        visit(*unit, &selected, &mut visited, &mut ordered);
    }

    ordered
}
