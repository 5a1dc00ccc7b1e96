//! Catalogue of available strategies: static metadata plus a factory closure
//! that produces a fresh `Box<dyn Strategy>` on demand, so callers can
//! enumerate what's available and instantiate one by name without coupling
//! discovery to execution.

use crate::strategy::Strategy;

/// A thread-safe factory closure that produces a fresh strategy instance.
/// `Send + Sync` so the registry can be shared across runner threads.
pub type StrategyFactory = Box<dyn Fn() -> Box<dyn Strategy> + Send + Sync>;

/// Static metadata for a registered strategy, queryable without
/// instantiating it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StrategyMeta {
    /// Unique name used as the registry key.
    pub name: String,
    pub version: String,
    pub description: String,
}

impl StrategyMeta {
    pub fn new(name: impl Into<String>, version: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: description.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateName { name: String },
    UnknownStrategy { name: String },
    EmptyName,
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateName { name } => write!(f, "strategy '{name}' is already registered"),
            Self::UnknownStrategy { name } => write!(f, "no strategy named '{name}' is registered"),
            Self::EmptyName => write!(f, "strategy name must not be empty"),
        }
    }
}

impl std::error::Error for RegistryError {}

struct RegistryEntry {
    meta: StrategyMeta,
    factory: StrategyFactory,
}

/// Catalogue of available strategies and their factories. Preserves
/// insertion order for deterministic `list()` output.
pub struct StrategyRegistry {
    entries: Vec<RegistryEntry>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// A registry pre-populated with the two reference strategies this
    /// crate ships.
    pub fn with_reference_strategies() -> Self {
        let mut reg = Self::new();
        reg.register(
            StrategyMeta::new("sma_crossover", "1.0.0", "fast/slow moving-average crossover"),
            || Box::new(crate::sma_crossover::SmaCrossoverStrategy::new()),
        )
        .expect("reference strategy names are unique");
        reg.register(
            StrategyMeta::new("mean_reversion_zscore", "1.0.0", "z-score mean reversion"),
            || Box::new(crate::mean_reversion::MeanReversionStrategy::new()),
        )
        .expect("reference strategy names are unique");
        reg
    }

    pub fn register<F>(&mut self, meta: StrategyMeta, factory: F) -> Result<(), RegistryError>
    where
        F: Fn() -> Box<dyn Strategy> + Send + Sync + 'static,
    {
        if meta.name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.contains(&meta.name) {
            return Err(RegistryError::DuplicateName { name: meta.name.clone() });
        }
        self.entries.push(RegistryEntry {
            meta,
            factory: Box::new(factory),
        });
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.meta.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn list(&self) -> Vec<&StrategyMeta> {
        self.entries.iter().map(|e| &e.meta).collect()
    }

    pub fn lookup(&self, name: &str) -> Result<&StrategyMeta, RegistryError> {
        self.entries
            .iter()
            .find(|e| e.meta.name == name)
            .map(|e| &e.meta)
            .ok_or_else(|| RegistryError::UnknownStrategy { name: name.to_string() })
    }

    /// Instantiate a strategy by name. Each call produces a fresh instance —
    /// the factory runs anew every time, since a strategy may carry mutable
    /// state via `update_parameters`.
    pub fn instantiate(&self, name: &str) -> Result<Box<dyn Strategy>, RegistryError> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.meta.name == name)
            .ok_or_else(|| RegistryError::UnknownStrategy { name: name.to_string() })?;
        Ok((entry.factory)())
    }

    pub fn deregister(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.meta.name != name);
        self.entries.len() < before
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}
