//! Tenant → engine chain mapping.
//!
//! A tenant entry names a primary engine and how many fallbacks follow it.
//! Fallbacks are taken from the registry's fallback order, skipping the
//! primary. Tenants without an entry get the default chain.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use crate::error::ValidationError;
use crate::traits::SharedEngine;

/// Fallback order for every tenant, most trusted first.
pub const DEFAULT_FALLBACK_ORDER: &[&str] = &["Compass", "ColdwellBanker", "Zillow", "Corcoran"];

/// Chain for tenants without their own entry.
pub const DEFAULT_CHAIN: &[&str] = &["Zillow"];

/// Engine configuration for one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantConfig {
    pub primary: String,
    pub fallback_count: usize,
    pub description: String,
}

impl TenantConfig {
    pub fn new(primary: impl Into<String>, fallback_count: usize) -> Self {
        Self {
            primary: primary.into(),
            fallback_count,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Built-in tenant table.
pub fn builtin_tenants() -> BTreeMap<String, TenantConfig> {
    [
        ("daniel_gale", "DanielGale", 4, "Daniel Gale Sotheby's International Realty"),
        ("jenna_cooper_la", "JennaCooperLA", 4, "Jenna Cooper LA"),
        ("coldwell_banker", "ColdwellBanker", 3, "Coldwell Banker"),
        ("compass", "Compass", 3, "Compass"),
        ("corcoran_group", "Corcoran", 3, "The Corcoran Group"),
        ("zillow", "Zillow", 3, "Zillow"),
        ("watson_salari_group", "Zillow", 3, "Watson Salari Group"),
    ]
    .into_iter()
    .map(|(tenant, primary, fallbacks, description)| {
        (
            tenant.to_string(),
            TenantConfig::new(primary, fallbacks).with_description(description),
        )
    })
    .collect()
}

/// Ordered, non-empty engine sequence for one tenant.
#[derive(Clone)]
pub struct EngineChain(Vec<SharedEngine>);

impl EngineChain {
    pub fn new(engines: Vec<SharedEngine>) -> Result<Self, ValidationError> {
        if engines.is_empty() {
            return Err(ValidationError::EmptyChain);
        }
        Ok(Self(engines))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SharedEngine> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn primary(&self) -> &SharedEngine {
        &self.0[0]
    }

    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|e| e.name().to_string()).collect()
    }
}

impl std::fmt::Debug for EngineChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EngineChain").field(&self.names()).finish()
    }
}

/// How a tenant resolves, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantSummary {
    pub tenant_id: String,
    pub engines: Vec<String>,
    pub primary_engine: String,
    pub fallback_engines: Vec<String>,
    pub has_custom_config: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Read-only tenant table plus the engines it refers to.
pub struct EngineRegistry {
    engines: HashMap<String, SharedEngine>,
    tenants: BTreeMap<String, TenantConfig>,
    fallback_order: Vec<String>,
    default_chain: Vec<String>,
}

impl EngineRegistry {
    /// Registry with the built-in tenant table.
    pub fn new(engines: impl IntoIterator<Item = SharedEngine>) -> Result<Self, ValidationError> {
        Self::builder(engines).build()
    }

    pub fn builder(engines: impl IntoIterator<Item = SharedEngine>) -> EngineRegistryBuilder {
        EngineRegistryBuilder {
            engines: engines
                .into_iter()
                .map(|e| (e.name().to_string(), e))
                .collect(),
            tenants: builtin_tenants(),
            fallback_order: DEFAULT_FALLBACK_ORDER.iter().map(|s| s.to_string()).collect(),
            default_chain: DEFAULT_CHAIN.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Chain for `tenant`. Unknown tenants, and tenants whose engines are
    /// all unregistered, get the default chain.
    pub fn engines_for(&self, tenant: &str) -> EngineChain {
        let key = tenant_key(tenant);
        let chain = match self.tenants.get(&key) {
            Some(config) => self.resolve_names(&self.chain_names(config)),
            None => {
                debug!(tenant = %tenant, "No tenant entry, using default chain");
                Vec::new()
            }
        };

        if !chain.is_empty() {
            return EngineChain(chain);
        }
        if self.tenants.contains_key(&key) {
            warn!(tenant = %tenant, "No registered engine for tenant, using default chain");
        }
        EngineChain(self.resolve_names(&self.default_chain))
    }

    pub fn tenant_summary(&self, tenant: &str) -> TenantSummary {
        let config = self.tenants.get(&tenant_key(tenant));
        let engines = self.engines_for(tenant).names();
        let (primary, fallbacks) = match engines.split_first() {
            Some((primary, rest)) => (primary.clone(), rest.to_vec()),
            None => (String::new(), Vec::new()),
        };

        TenantSummary {
            tenant_id: tenant.to_string(),
            engines,
            primary_engine: primary,
            fallback_engines: fallbacks,
            has_custom_config: config.is_some(),
            description: config.map(|c| c.description.clone()).filter(|d| !d.is_empty()),
        }
    }

    /// Tenant ids with their own entry, sorted.
    pub fn configured_tenants(&self) -> Vec<String> {
        self.tenants.keys().cloned().collect()
    }

    /// Names of registered engines, sorted.
    pub fn available_engines(&self) -> Vec<String> {
        let mut names: Vec<String> = self.engines.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn engine(&self, name: &str) -> Option<&SharedEngine> {
        self.engines.get(name)
    }

    fn chain_names(&self, config: &TenantConfig) -> Vec<String> {
        std::iter::once(config.primary.clone())
            .chain(
                self.fallback_order
                    .iter()
                    .filter(|name| **name != config.primary)
                    .take(config.fallback_count)
                    .cloned(),
            )
            .collect()
    }

    fn resolve_names(&self, names: &[String]) -> Vec<SharedEngine> {
        names
            .iter()
            .filter_map(|name| {
                let engine = self.engines.get(name).cloned();
                if engine.is_none() {
                    debug!(engine = %name, "Engine not registered, skipping");
                }
                engine
            })
            .collect()
    }
}

/// Builder for [`EngineRegistry`]; `build` checks the default chain.
pub struct EngineRegistryBuilder {
    engines: HashMap<String, SharedEngine>,
    tenants: BTreeMap<String, TenantConfig>,
    fallback_order: Vec<String>,
    default_chain: Vec<String>,
}

impl EngineRegistryBuilder {
    /// Add or replace a tenant entry.
    pub fn tenant(mut self, tenant: &str, config: TenantConfig) -> Self {
        self.tenants.insert(tenant_key(tenant), config);
        self
    }

    /// Drop the built-in tenant table.
    pub fn without_builtin_tenants(mut self) -> Self {
        self.tenants.clear();
        self
    }

    pub fn fallback_order(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.fallback_order = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_chain(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.default_chain = names.into_iter().map(Into::into).collect();
        self
    }

    /// Fails with [`ValidationError::EmptyChain`] when no default chain
    /// engine is registered.
    pub fn build(self) -> Result<EngineRegistry, ValidationError> {
        if !self.default_chain.iter().any(|name| self.engines.contains_key(name)) {
            return Err(ValidationError::EmptyChain);
        }
        Ok(EngineRegistry {
            engines: self.engines,
            tenants: self.tenants,
            fallback_order: self.fallback_order,
            default_chain: self.default_chain,
        })
    }
}

fn tenant_key(tenant: &str) -> String {
    tenant.trim().to_lowercase()
}
