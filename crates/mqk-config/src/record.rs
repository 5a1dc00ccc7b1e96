//! The `{strategy, parameters, metadata}` configuration record of §6,
//! validated against a strategy's declarative parameter schema before a bot
//! is constructed from it.

use anyhow::{Context, Result};
use mqk_strategy::{validate_against_schema, ParameterSpec, StrategyError, StrategyParams};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrategyRef {
    pub name: String,
    pub class: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub status: String,
    pub created_at: String,
    #[serde(default)]
    pub notes: String,
    pub version: String,
}

/// One configuration record: which strategy to run, what parameters to run
/// it with, and bookkeeping metadata. Loaded from a merged `LoadedConfig`'s
/// `config_json`, or any other JSON document shaped the same way.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfigRecord {
    pub strategy: StrategyRef,
    #[serde(default)]
    pub parameters: StrategyParams,
    pub metadata: RecordMetadata,
}

impl ConfigRecord {
    /// Parse a record out of a merged config document. `pointer`, if given,
    /// selects the subtree holding the record (e.g. `"/bots/sma-1"`); `None`
    /// treats `config_json` itself as the record.
    pub fn from_json(config_json: &Value, pointer: Option<&str>) -> Result<Self> {
        let target = match pointer {
            Some(p) => config_json
                .pointer(p)
                .with_context(|| format!("config record not found at {p}"))?,
            None => config_json,
        };
        serde_json::from_value(target.clone()).context("config record does not match the expected shape")
    }

    /// Validate `self.parameters` against the owning strategy's declared
    /// schema (§4.1), before the record is handed to a bot constructor.
    pub fn validate_parameters(&self, schema: &[ParameterSpec]) -> Result<(), StrategyError> {
        validate_against_schema(schema, &self.parameters)
    }
}
