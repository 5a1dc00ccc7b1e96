//! Layered YAML configuration loading (§10): merge a sequence of YAML
//! documents (later documents override earlier ones, field by field), then
//! canonicalize the merged JSON (recursively key-sorted) and fingerprint it
//! with SHA-256, so two runs against the same logical configuration can be
//! proven identical regardless of how many physical files supplied it.

mod record;

pub use record::{ConfigRecord, RecordMetadata, StrategyRef};

use anyhow::{Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_json: Value,
    pub canonical_json: String,
    pub config_hash: String,
}

/// Load and merge YAML files in order, then canonicalize and hash.
pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut sources = Vec::with_capacity(paths.len());
    for p in paths {
        sources.push(fs::read_to_string(p).with_context(|| format!("read config: {p}"))?);
    }
    let borrowed: Vec<&str> = sources.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&borrowed)
}

/// Same merge/canonicalize/hash pipeline as [`load_layered_yaml`], but over
/// in-memory YAML documents rather than files on disk — used by tests and
/// by any caller assembling layers from a source other than the filesystem
/// (e.g. a `POST /api/bots` body merged over a base record).
pub fn load_layered_yaml_from_strings(yamls: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());

    for (i, s) in yamls.iter().enumerate() {
        let yaml_val: serde_yaml::Value =
            serde_yaml::from_str(s).with_context(|| format!("parse yaml layer {i}"))?;
        let json_val = serde_json::to_value(yaml_val).context("yaml->json conversion failed")?;
        deep_merge(&mut merged, json_val);
    }

    let canonical = canonicalize_json(&merged);

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let hash = hex::encode(hasher.finalize());

    Ok(LoadedConfig {
        config_json: serde_json::from_str(&canonical).context("canonical json parse failed")?,
        canonical_json: canonical,
        config_hash: hash,
    })
}

/// Objects merge recursively; arrays and scalars are overwritten wholesale.
fn deep_merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (k, v) in src_map {
                match dst_map.get_mut(&k) {
                    Some(existing) => deep_merge(existing, v),
                    None => {
                        dst_map.insert(k, v);
                    }
                }
            }
        }
        (dst_slot, src_val) => {
            *dst_slot = src_val;
        }
    }
}

fn canonicalize_json(v: &Value) -> String {
    let sorted = sort_keys(v);
    serde_json::to_string(&sorted).expect("json serialization must not fail")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}
