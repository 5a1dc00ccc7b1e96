use std::collections::BTreeMap;

/// Named numeric tunables handed to a strategy. Every reference strategy in
/// this crate keeps its parameters as plain `f64`s (periods, z-score
/// thresholds) so a single map type covers all of them; a strategy that
/// needs a non-numeric knob can still encode it here (e.g. `1.0`/`0.0` for
/// a boolean) or carry it in `Signal::metadata` instead.
pub type StrategyParams = BTreeMap<String, f64>;

/// One entry of a strategy's declarative parameter schema (§4.1), used to
/// validate a configuration record before it is handed to
/// `Strategy::update_parameters`.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub default: f64,
    pub min: f64,
    pub max: f64,
    pub description: String,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, default: f64, min: f64, max: f64, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default,
            min,
            max,
            description: description.into(),
        }
    }

    pub fn in_bounds(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StrategyError {
    MissingParameter(String),
    OutOfBounds { name: String, value: f64, min: f64, max: f64 },
}

impl std::fmt::Display for StrategyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyError::MissingParameter(name) => write!(f, "missing required parameter '{name}'"),
            StrategyError::OutOfBounds { name, value, min, max } => {
                write!(f, "parameter '{name}' = {value} is outside [{min}, {max}]")
            }
        }
    }
}

impl std::error::Error for StrategyError {}

/// Validate `params` against `schema`: every schema entry present in
/// `params` must fall within its bounds; entries absent from `params` are
/// permitted to fall back to their schema default. Pure — callable without
/// a strategy instance (§4.1).
pub fn validate_against_schema(schema: &[ParameterSpec], params: &StrategyParams) -> Result<(), StrategyError> {
    for spec in schema {
        if let Some(&value) = params.get(&spec.name) {
            if !spec.in_bounds(value) {
                return Err(StrategyError::OutOfBounds {
                    name: spec.name.clone(),
                    value,
                    min: spec.min,
                    max: spec.max,
                });
            }
        }
    }
    Ok(())
}

/// Read a parameter from `params`, falling back to `schema`'s default.
pub fn param_or_default(params: &StrategyParams, schema: &[ParameterSpec], name: &str) -> f64 {
    params.get(name).copied().unwrap_or_else(|| {
        schema
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.default)
            .unwrap_or(0.0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_passes_when_within_bounds() {
        let schema = vec![ParameterSpec::new("fast_period", 10.0, 1.0, 100.0, "fast MA period")];
        let mut params = StrategyParams::new();
        params.insert("fast_period".into(), 20.0);
        assert!(validate_against_schema(&schema, &params).is_ok());
    }

    #[test]
    fn validate_rejects_out_of_bounds() {
        let schema = vec![ParameterSpec::new("fast_period", 10.0, 1.0, 100.0, "fast MA period")];
        let mut params = StrategyParams::new();
        params.insert("fast_period".into(), 500.0);
        assert!(validate_against_schema(&schema, &params).is_err());
    }

    #[test]
    fn param_or_default_falls_back_to_schema() {
        let schema = vec![ParameterSpec::new("slow_period", 30.0, 1.0, 200.0, "slow MA period")];
        let params = StrategyParams::new();
        assert_eq!(param_or_default(&params, &schema, "slow_period"), 30.0);
    }
}
