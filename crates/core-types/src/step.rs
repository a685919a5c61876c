//! Step and locator model

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::StepId;

/// How a locator expression should be interpreted by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocatorKind {
    XPath,
    Css,
    #[default]
    None,
}

impl LocatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocatorKind::XPath => "xpath",
            LocatorKind::Css => "css",
            LocatorKind::None => "none",
        }
    }
}

impl FromStr for LocatorKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "xpath" => Ok(LocatorKind::XPath),
            "css" | "css_selector" | "css selector" => Ok(LocatorKind::Css),
            "" | "none" => Ok(LocatorKind::None),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for LocatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Element locator: a kind plus an expression. Empty for element-less actions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Locator {
    pub kind: LocatorKind,
    pub expression: String,
}

impl Locator {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn css(expression: impl Into<String>) -> Self {
        Self {
            kind: LocatorKind::Css,
            expression: expression.into(),
        }
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Self {
            kind: LocatorKind::XPath,
            expression: expression.into(),
        }
    }

    /// True when the step targets no element.
    pub fn is_empty(&self) -> bool {
        self.expression.trim().is_empty()
    }

    /// A non-empty expression must carry a resolvable kind.
    pub fn is_resolvable(&self) -> bool {
        self.is_empty() || self.kind != LocatorKind::None
    }

    /// Parse operator input such as `css:#name`, `xpath://input[1]` or a bare
    /// expression (leading `/` or `(` means xpath, anything else css).
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Some((prefix, rest)) = trimmed.split_once(':') {
            if let Ok(kind) = prefix.parse::<LocatorKind>() {
                if kind != LocatorKind::None && !rest.trim().is_empty() {
                    return Some(Self {
                        kind,
                        expression: rest.trim().to_string(),
                    });
                }
            }
        }
        if trimmed.starts_with('/') || trimmed.starts_with('(') {
            Some(Self::xpath(trimmed))
        } else {
            Some(Self::css(trimmed))
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("<none>")
        } else {
            write!(f, "{}:{}", self.kind, self.expression)
        }
    }
}

/// Raw condition reference carried by a step; interpreted by the gate evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum GateSpec {
    #[default]
    Empty,
    Text(String),
    List(Vec<String>),
}

impl GateSpec {
    pub fn is_empty(&self) -> bool {
        match self {
            GateSpec::Empty => true,
            GateSpec::Text(text) => text.trim().is_empty(),
            GateSpec::List(keys) => keys.is_empty(),
        }
    }
}

impl fmt::Display for GateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateSpec::Empty => Ok(()),
            GateSpec::Text(text) => f.write_str(text),
            GateSpec::List(keys) => write!(f, "[{}]", keys.join(", ")),
        }
    }
}

/// One unit of planned interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub sequence_number: u32,
    pub identity: StepId,
    pub action_kind: String,
    #[serde(default)]
    pub locator: Locator,
    #[serde(default)]
    pub payload_value: String,
    #[serde(default)]
    pub condition: GateSpec,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Step {
    pub fn new(sequence_number: u32, action_kind: impl Into<String>) -> Self {
        Self {
            sequence_number,
            identity: StepId::new(),
            action_kind: action_kind.into(),
            locator: Locator::none(),
            payload_value: String::new(),
            condition: GateSpec::Empty,
            description: String::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_identity(mut self, identity: impl Into<StepId>) -> Self {
        self.identity = identity.into();
        self
    }

    pub fn with_locator(mut self, locator: Locator) -> Self {
        self.locator = locator;
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.payload_value = value.into();
        self
    }

    pub fn with_condition(mut self, condition: GateSpec) -> Self {
        self.condition = condition;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Metadata value as a string, if present.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|value| value.as_str())
    }

    /// Short human label used in prompts and logs.
    pub fn label(&self) -> String {
        if self.description.is_empty() {
            format!("#{} {}", self.sequence_number, self.action_kind)
        } else {
            format!(
                "#{} {} ({})",
                self.sequence_number, self.action_kind, self.description
            )
        }
    }
}

impl From<String> for StepId {
    fn from(value: String) -> Self {
        StepId(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locator_kind_parsing_is_lenient() {
        assert_eq!("XPATH".parse::<LocatorKind>(), Ok(LocatorKind::XPath));
        assert_eq!("css_selector".parse::<LocatorKind>(), Ok(LocatorKind::Css));
        assert_eq!("".parse::<LocatorKind>(), Ok(LocatorKind::None));
        assert!("id".parse::<LocatorKind>().is_err());
    }

    #[test]
    fn operator_locator_input() {
        assert_eq!(Locator::parse("css:#name"), Some(Locator::css("#name")));
        assert_eq!(
            Locator::parse("xpath://div[1]"),
            Some(Locator::xpath("//div[1]"))
        );
        assert_eq!(Locator::parse("//a"), Some(Locator::xpath("//a")));
        assert_eq!(
            Locator::parse("input[name='a:b']"),
            Some(Locator::css("input[name='a:b']"))
        );
        assert_eq!(Locator::parse("   "), None);
    }

    #[test]
    fn unresolvable_locator_detected() {
        let locator = Locator {
            kind: LocatorKind::None,
            expression: "#x".into(),
        };
        assert!(!locator.is_resolvable());
        assert!(Locator::none().is_resolvable());
    }

    #[test]
    fn gate_spec_deserializes_all_shapes() {
        let empty: GateSpec = serde_json::from_str("null").unwrap();
        assert!(empty.is_empty());
        let text: GateSpec = serde_json::from_str("\"IS_MINOR_TRUE\"").unwrap();
        assert_eq!(text, GateSpec::Text("IS_MINOR_TRUE".into()));
        let list: GateSpec = serde_json::from_str("[\"A\", \"B\"]").unwrap();
        assert_eq!(list, GateSpec::List(vec!["A".into(), "B".into()]));
        assert!(GateSpec::Text("  ".into()).is_empty());
    }
}
