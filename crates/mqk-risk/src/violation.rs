use std::fmt;

use serde::Serialize;

/// A single rule breach, carrying the numbers a control surface needs to
/// render it without re-deriving them.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RiskViolation {
    pub rule_name: String,
    pub observed: f64,
    pub threshold: f64,
    pub critical: bool,
}

impl fmt::Display for RiskViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: observed={:.6} threshold={:.6}{}",
            self.rule_name,
            self.observed,
            self.threshold,
            if self.critical { " [critical]" } else { "" }
        )
    }
}
