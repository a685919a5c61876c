//! Closed registry of condition keys

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Lookup of condition key to expression source.
pub trait ConditionRegistry: Send + Sync {
    /// Expression source for `key`, or `None` when the key is unknown.
    fn lookup(&self, key: &str) -> Option<&str>;

    /// All registered keys, sorted.
    fn keys(&self) -> Vec<String>;
}

/// Registry backed by an in-memory map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticConditionRegistry {
    expressions: BTreeMap<String, String>,
}

impl StaticConditionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the form conditions shipped by default.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for (key, expression) in [
            ("IS_MINOR_TRUE", "IS_MINOR_TRUE == True"),
            ("IS_MINOR_FALSE", "IS_MINOR_TRUE == False"),
            ("HAS_SECOND_PASSPORT", "HAS_SECOND_PASSPORT == True"),
            ("HAS_NO_SECOND_PASSPORT", "HAS_SECOND_PASSPORT == False"),
            ("HAS_SECOND_VALID_PASSPORT", "HAS_SECOND_VALID_PASSPORT == True"),
            (
                "HAS_SECOND_INVALID_PASSPORT",
                "HAS_SECOND_INVALID_PASSPORT == False",
            ),
        ] {
            registry.insert(key, expression);
        }
        registry
    }

    pub fn insert(&mut self, key: impl Into<String>, expression: impl Into<String>) {
        self.expressions.insert(key.into(), expression.into());
    }

    /// Merge entries, overriding existing keys.
    pub fn extend<I, K, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, expression) in entries {
            self.insert(key, expression);
        }
    }

    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }
}

impl ConditionRegistry for StaticConditionRegistry {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.expressions.get(key).map(String::as_str)
    }

    fn keys(&self) -> Vec<String> {
        self.expressions.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_overrides() {
        let mut registry = StaticConditionRegistry::with_defaults();
        assert_eq!(
            registry.lookup("IS_MINOR_FALSE"),
            Some("IS_MINOR_TRUE == False")
        );
        assert!(registry.lookup("UNKNOWN").is_none());

        registry.extend([("IS_MINOR_FALSE", "not IS_MINOR_TRUE"), ("ADULT", "AGE != 0")]);
        assert_eq!(registry.lookup("IS_MINOR_FALSE"), Some("not IS_MINOR_TRUE"));
        assert_eq!(registry.len(), 7);
    }
}
