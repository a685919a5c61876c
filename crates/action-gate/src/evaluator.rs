//! Gate evaluation over the run context

use std::sync::Arc;

use stepwright_core_types::{GateSpec, RunContext};
use tracing::{debug, warn};

use crate::{errors::GateError, expression::Expression, registry::ConditionRegistry};

/// Normalized gate: no keys means unconditional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gate {
    keys: Vec<String>,
}

impl Gate {
    pub fn always() -> Self {
        Self { keys: Vec::new() }
    }

    /// Interpret a raw gate reference.
    ///
    /// A string that looks like a JSON list is parsed as one; if parsing fails
    /// the original string is kept as a single key. Blank keys are dropped.
    pub fn from_spec(spec: &GateSpec) -> Self {
        let keys = match spec {
            GateSpec::Empty => Vec::new(),
            GateSpec::List(keys) => keys.clone(),
            GateSpec::Text(text) => {
                let trimmed = text.trim();
                if trimmed.starts_with('[') && trimmed.ends_with(']') {
                    match serde_json::from_str::<Vec<String>>(trimmed) {
                        Ok(keys) => keys,
                        Err(err) => {
                            warn!(
                                condition = trimmed,
                                error = %err,
                                "condition looks like a list but failed to parse; treating as a single key"
                            );
                            vec![trimmed.to_string()]
                        }
                    }
                } else {
                    vec![trimmed.to_string()]
                }
            }
        };

        Self {
            keys: keys
                .into_iter()
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty())
                .collect(),
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn is_unconditional(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Result of checking a gate.
#[derive(Debug, Clone, PartialEq)]
pub enum GateVerdict {
    Open,
    /// The named key evaluated to false.
    Closed { key: String },
    /// The named key could not be evaluated; the gate fails closed.
    Failed { key: String, error: GateError },
}

impl GateVerdict {
    pub fn is_open(&self) -> bool {
        matches!(self, GateVerdict::Open)
    }

    /// Human-readable skip reason.
    pub fn reason(&self) -> Option<String> {
        match self {
            GateVerdict::Open => None,
            GateVerdict::Closed { key } => Some(format!("condition '{}' is false", key)),
            GateVerdict::Failed { key, error } => {
                Some(format!("condition '{}' failed closed: {}", key, error))
            }
        }
    }
}

/// Evaluates gates against the closed condition registry.
#[derive(Clone)]
pub struct GateEvaluator {
    registry: Arc<dyn ConditionRegistry>,
}

impl GateEvaluator {
    pub fn new(registry: Arc<dyn ConditionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<dyn ConditionRegistry> {
        &self.registry
    }

    /// Boolean view of [`GateEvaluator::check`].
    pub fn evaluate(&self, spec: &GateSpec, context: &RunContext) -> bool {
        self.check(spec, context).is_open()
    }

    /// Logical AND over the gate keys, short-circuiting on the first closed
    /// or failed key.
    pub fn check(&self, spec: &GateSpec, context: &RunContext) -> GateVerdict {
        let gate = Gate::from_spec(spec);
        if gate.is_unconditional() {
            return GateVerdict::Open;
        }

        for key in gate.keys() {
            match self.evaluate_key(key, context) {
                Ok(true) => {
                    debug!(key = %key, "condition passed");
                }
                Ok(false) => {
                    debug!(key = %key, "condition evaluated to false");
                    return GateVerdict::Closed { key: key.clone() };
                }
                Err(error) => {
                    warn!(key = %key, error = %error, "condition failed closed");
                    return GateVerdict::Failed {
                        key: key.clone(),
                        error,
                    };
                }
            }
        }

        GateVerdict::Open
    }

    fn evaluate_key(&self, key: &str, context: &RunContext) -> Result<bool, GateError> {
        let source = self
            .registry
            .lookup(key)
            .filter(|source| !source.trim().is_empty())
            .ok_or_else(|| GateError::MissingKey(key.to_string()))?;
        Expression::parse(source)?.evaluate(&context.variables)
    }

    /// Keys referenced by `spec` that the registry does not know.
    pub fn missing_keys(&self, spec: &GateSpec) -> Vec<String> {
        Gate::from_spec(spec)
            .keys()
            .iter()
            .filter(|key| self.registry.lookup(key).is_none())
            .cloned()
            .collect()
    }
}
