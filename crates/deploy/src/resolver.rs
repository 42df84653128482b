//! Validation of unit configs and resolution of constructor dependencies.

use std::{collections::BTreeMap, str::FromStr};

use alloy_core::primitives::Address;

use crate::{
    config::NetworkConfig,
    error::{ConfigError, DependencyError},
    store::DeploymentStore,
    units::{AbsencePolicy, Dependency, TOKEN_ADDRESS_FIELD, UnitKind, UnitSpec},
};

/// A unit is not part of the network's topology. Not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipSignal {
    pub reason: String,
}

impl SkipSignal {
    pub fn not_configured(config_key: &str) -> Self {
        Self {
            reason: format!("{config_key} not configured"),
        }
    }
}

/// Validated parameters of one unit on one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitConfig {
    pub unit: UnitKind,
    pub network: String,
    pub token_address: Address,
    /// Parsed dependency overrides, keyed by config field.
    pub overrides: BTreeMap<&'static str, Address>,
}

impl UnitConfig {
    pub fn new(unit: UnitKind, network: impl Into<String>, token_address: Address) -> Self {
        Self {
            unit,
            network: network.into(),
            token_address,
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_override(mut self, field: &'static str, address: Address) -> Self {
        self.overrides.insert(field, address);
        self
    }

    pub fn override_for(&self, field: &str) -> Option<Address> {
        self.overrides.get(field).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Config(UnitConfig),
    Skip(SkipSignal),
}

/// Checks that a network profile holds what a unit needs.
pub struct ConfigResolver;

impl ConfigResolver {
    /// Validate `unit` against `network`.
    ///
    /// Checks run in order: the unit's section, `tokenAddress`, then any
    /// override that is set. Whether the endpoint is known is left to
    /// dependency resolution.
    pub fn resolve(network: &NetworkConfig, unit: UnitKind) -> Result<Resolution, ConfigError> {
        let spec = unit.spec();

        let Some(section) = network.unit_section(unit) else {
            return match spec.absence {
                AbsencePolicy::Skip => Ok(Resolution::Skip(SkipSignal::not_configured(
                    spec.config_key,
                ))),
                AbsencePolicy::Fail => Err(ConfigError::MissingUnitConfig {
                    network: network.name.clone(),
                    config_key: spec.config_key,
                    contract: spec.contract_name,
                }),
            };
        };

        let token_address =
            parse_address(network, spec, TOKEN_ADDRESS_FIELD, section.token_address)?;
        let mut config = UnitConfig::new(unit, network.name.clone(), token_address);

        for (field, _) in &section.overrides {
            if let Some(raw) = section.override_value(field) {
                let address = parse_address(network, spec, *field, raw)?;
                config = config.with_override(*field, address);
            }
        }

        Ok(Resolution::Config(config))
    }
}

fn parse_address(
    network: &NetworkConfig,
    spec: &UnitSpec,
    field: &'static str,
    raw: &str,
) -> Result<Address, ConfigError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ConfigError::MissingField {
            network: network.name.clone(),
            config_key: spec.config_key,
            field,
        });
    }

    Address::from_str(raw).map_err(|_| ConfigError::InvalidAddress {
        network: network.name.clone(),
        config_key: spec.config_key,
        field,
        value: raw.to_string(),
    })
}

/// Looks up the addresses a unit's constructor needs.
pub struct DependencyResolver;

impl DependencyResolver {
    /// Resolve one declared dependency of `config.unit`.
    pub fn resolve<S: DeploymentStore + ?Sized>(
        dependency: &Dependency,
        config: &UnitConfig,
        store: &S,
    ) -> Result<Address, DependencyError> {
        match dependency {
            Dependency::External { name } => match store.get(name) {
                Ok(record) => Ok(record.address),
                Err(e) if e.is_not_found() => Err(DependencyError::ExternalNotFound {
                    name: *name,
                    network: store.network().to_string(),
                }),
                Err(e) => Err(e.into()),
            },
            Dependency::Unit {
                unit,
                override_field,
            } => resolve_with_override(
                config.override_for(override_field),
                *unit,
                *override_field,
                config.unit.config_key(),
                store,
            ),
        }
    }

    /// Resolve every declared dependency of `config.unit`, in declaration order.
    ///
    /// Stops at the first failure.
    pub fn resolve_all<S: DeploymentStore + ?Sized>(
        config: &UnitConfig,
        store: &S,
    ) -> Result<Vec<Address>, DependencyError> {
        config
            .unit
            .spec()
            .dependencies
            .iter()
            .map(|dependency| Self::resolve(dependency, config, store))
            .collect()
    }
}

/// An explicit override wins, then the unit's recorded deployment; otherwise
/// the dependency is unresolved.
pub fn resolve_with_override<S: DeploymentStore + ?Sized>(
    override_address: Option<Address>,
    unit: UnitKind,
    override_field: &'static str,
    config_key: &'static str,
    store: &S,
) -> Result<Address, DependencyError> {
    if let Some(address) = override_address {
        tracing::debug!(field = override_field, address = %address, "Using configured override");
        return Ok(address);
    }

    match store.get(unit.contract_name()) {
        Ok(record) => {
            tracing::debug!(
                field = override_field,
                contract = unit.contract_name(),
                address = %record.address,
                "Using recorded deployment"
            );
            Ok(record.address)
        }
        Err(e) if e.is_not_found() => Err(DependencyError::Unresolved {
            field: override_field,
            config_key,
            contract: unit.contract_name(),
            network: store.network().to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}
