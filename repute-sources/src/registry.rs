//! Source registry
//!
//! Holds the authoritative configuration per source kind together with the
//! adapter that interprets it. Each kind has at most one adapter; swapping
//! configuration never replaces the adapter.

use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use repute_core::{ConfigError, SourceConfig, SourceKind, UnknownSourceKind};

use crate::adapters::default_adapter;
use crate::config::default_sources;
use crate::traits::SourceAdapter;

/// Errors from registry configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error(transparent)]
    UnknownSourceKind(#[from] UnknownSourceKind),

    #[error("Configuration for {found} supplied for {expected}")]
    KindMismatch {
        expected: SourceKind,
        found: SourceKind,
    },

    #[error("No adapter registered for {0}")]
    MissingAdapter(SourceKind),

    #[error("Adapter for {0} already registered")]
    DuplicateAdapter(SourceKind),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A configured source and its adapter
#[derive(Clone)]
pub struct RegisteredSource {
    pub config: SourceConfig,
    pub adapter: Arc<dyn SourceAdapter>,
}

/// Registry of source configurations and adapters
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: BTreeMap<SourceKind, RegisteredSource>,
}

impl SourceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in adapter and the default configuration table
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for config in default_sources() {
            let adapter = default_adapter(config.kind);
            registry.sources.insert(config.kind, RegisteredSource { config, adapter });
        }
        registry
    }

    /// Registry with built-in adapters and the given configurations.
    ///
    /// Kinds missing from `configs` stay registered but disabled.
    pub fn from_configs(configs: Vec<SourceConfig>) -> Result<Self, RegistryError> {
        let mut registry = Self::with_defaults();
        for entry in registry.sources.values_mut() {
            entry.config.enabled = false;
        }
        registry.apply(configs)?;
        Ok(registry)
    }

    /// Register an adapter with its initial configuration
    pub fn register(
        &mut self,
        adapter: Arc<dyn SourceAdapter>,
        config: SourceConfig,
    ) -> Result<(), RegistryError> {
        let kind = adapter.kind();
        if self.sources.contains_key(&kind) {
            return Err(RegistryError::DuplicateAdapter(kind));
        }
        Self::check(kind, adapter.as_ref(), &config)?;
        self.sources.insert(kind, RegisteredSource { config, adapter });
        Ok(())
    }

    /// Replace the configuration for a kind, keeping its adapter
    pub fn configure(&mut self, kind: SourceKind, config: SourceConfig) -> Result<(), RegistryError> {
        let entry = self
            .sources
            .get_mut(&kind)
            .ok_or(RegistryError::MissingAdapter(kind))?;
        Self::check(kind, entry.adapter.as_ref(), &config)?;

        info!(
            "Configured {}: weight {} bps, reliability ceiling {} bps, {}",
            kind,
            config.weight_bps,
            config.declared_reliability_bps,
            if config.enabled { "enabled" } else { "disabled" }
        );
        entry.config = config;
        Ok(())
    }

    /// Configure a kind given by name, as found in config files
    pub fn configure_named(&mut self, name: &str, config: SourceConfig) -> Result<(), RegistryError> {
        let kind: SourceKind = name.parse()?;
        self.configure(kind, config)
    }

    /// Validate every configuration first, then apply them all
    pub fn apply(&mut self, configs: Vec<SourceConfig>) -> Result<(), RegistryError> {
        for config in &configs {
            let entry = self
                .sources
                .get(&config.kind)
                .ok_or(RegistryError::MissingAdapter(config.kind))?;
            Self::check(config.kind, entry.adapter.as_ref(), config)?;
        }
        for config in configs {
            self.configure(config.kind, config)?;
        }
        Ok(())
    }

    fn check(
        kind: SourceKind,
        adapter: &dyn SourceAdapter,
        config: &SourceConfig,
    ) -> Result<(), RegistryError> {
        if config.kind != kind {
            return Err(RegistryError::KindMismatch {
                expected: kind,
                found: config.kind,
            });
        }
        config.validate()?;
        adapter.validate_options(config)?;
        Ok(())
    }

    /// Enabled sources in declaration order
    pub fn enabled_sources(&self) -> Vec<(SourceKind, &SourceConfig, &dyn SourceAdapter)> {
        let enabled: Vec<_> = self
            .sources
            .iter()
            .filter(|(_, entry)| entry.config.enabled)
            .map(|(kind, entry)| (*kind, &entry.config, entry.adapter.as_ref()))
            .collect();
        debug!("{} of {} sources enabled", enabled.len(), self.sources.len());
        enabled
    }

    /// Configurations of enabled sources in declaration order
    pub fn enabled_configs(&self) -> Vec<SourceConfig> {
        self.enabled_sources()
            .into_iter()
            .map(|(_, config, _)| config.clone())
            .collect()
    }

    /// All configurations in declaration order
    pub fn configs(&self) -> Vec<&SourceConfig> {
        self.sources.values().map(|entry| &entry.config).collect()
    }

    /// Get the configuration for a kind
    pub fn get(&self, kind: SourceKind) -> Option<&SourceConfig> {
        self.sources.get(&kind).map(|entry| &entry.config)
    }

    /// Get the adapter for a kind
    pub fn adapter(&self, kind: SourceKind) -> Option<Arc<dyn SourceAdapter>> {
        self.sources.get(&kind).map(|entry| entry.adapter.clone())
    }

    /// Count of registered sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.sources.iter().map(|(kind, entry)| (kind, &entry.config)))
            .finish()
    }
}
