//! Run-input document format
//!
//! ```json
//! { "form": { "id_uuid": "...", "form_name": "..." },
//!   "steps": [ { "step_order": 1, "action_type": "goto", "selector_type": "",
//!                "selector_value": "", "insert_value": "http://x",
//!                "condition": "", "id_uuid": "..." } ],
//!   "condition_context": { "IS_MINOR_TRUE": false } }
//! ```

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{
    GateSpec, Locator, LocatorKind, Plan, PlanId, PlanLoadError, RunContext, Step, StepId,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPlanDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<RawForm>,

    #[serde(default)]
    pub steps: Vec<RawStep>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub condition_context: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_uuid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_name: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawStep {
    #[serde(alias = "step_number")]
    pub step_order: i64,

    #[serde(default, alias = "action", skip_serializing_if = "Option::is_none")]
    pub action_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector_value: Option<String>,

    #[serde(default, alias = "value", skip_serializing_if = "Option::is_none")]
    pub insert_value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_value: Option<String>,

    #[serde(default)]
    pub condition: GateSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_uuid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RawPlanDocument {
    pub fn parse(json: &str) -> Result<Self, PlanLoadError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, PlanLoadError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate and convert into an executable plan.
    pub fn into_plan(self) -> Result<Plan, PlanLoadError> {
        let mut seen_sequences = HashSet::new();
        let mut seen_ids = HashSet::new();
        let mut steps = Vec::with_capacity(self.steps.len());

        for raw in self.steps {
            let step = raw.into_step()?;
            if !seen_sequences.insert(step.sequence_number) {
                return Err(PlanLoadError::DuplicateSequence(step.sequence_number));
            }
            if !seen_ids.insert(step.identity.clone()) {
                return Err(PlanLoadError::DuplicateIdentity(step.identity.0));
            }
            steps.push(step);
        }

        let context = RunContext {
            variables: self.condition_context.into_iter().collect(),
            ..RunContext::default()
        };

        let mut plan = Plan::new(steps).with_context(context);
        if let Some(form) = self.form {
            if let Some(id) = form.id_uuid.filter(|id| !id.trim().is_empty()) {
                plan = plan.with_identity(PlanId(id), form.form_name);
            }
        }
        debug!(steps = plan.steps.len(), "plan document loaded");
        Ok(plan)
    }

    /// Rebuild a document from a plan, preserving the form header.
    pub fn from_plan(plan: &Plan) -> Self {
        let form = plan.identity.as_ref().map(|id| RawForm {
            id_uuid: Some(id.0.clone()),
            form_name: plan.label.clone(),
            extra: BTreeMap::new(),
        });
        Self {
            form,
            steps: plan.steps.iter().map(RawStep::from_step).collect(),
            condition_context: plan
                .run_context
                .variables
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

impl RawStep {
    pub fn into_step(self) -> Result<Step, PlanLoadError> {
        if self.step_order < 1 || self.step_order > i64::from(u32::MAX) {
            return Err(PlanLoadError::InvalidSequence {
                sequence_number: self.step_order,
            });
        }
        let sequence_number = self.step_order as u32;

        let action_kind = self
            .action_type
            .as_deref()
            .map(str::trim)
            .filter(|kind| !kind.is_empty())
            .ok_or(PlanLoadError::MissingAction { sequence_number })?
            .to_string();

        let expression = self.selector_value.unwrap_or_default().trim().to_string();
        let declared = self.selector_type.unwrap_or_default();
        let kind = match declared.parse::<LocatorKind>() {
            Ok(LocatorKind::None) if !expression.is_empty() => LocatorKind::XPath,
            Ok(kind) => kind,
            Err(selector_type) => {
                return Err(PlanLoadError::UnknownLocatorKind {
                    sequence_number,
                    selector_type,
                })
            }
        };
        let locator = Locator { kind, expression };
        if !locator.is_resolvable() {
            return Err(PlanLoadError::UnresolvableLocator {
                sequence_number,
                expression: locator.expression,
            });
        }

        let payload_value = self
            .client_value
            .filter(|value| !value.is_empty())
            .or(self.insert_value)
            .unwrap_or_default();

        let identity = match self.id_uuid.filter(|id| !id.trim().is_empty()) {
            Some(id) => StepId(id),
            None => {
                warn!(
                    sequence_number,
                    "step has no id_uuid; timing data will not carry across runs"
                );
                StepId::new()
            }
        };

        Ok(Step {
            sequence_number,
            identity,
            action_kind,
            locator,
            payload_value,
            condition: self.condition,
            description: self.description.unwrap_or_default(),
            metadata: self.extra,
        })
    }

    pub fn from_step(step: &Step) -> Self {
        let (selector_type, selector_value) = if step.locator.is_empty() {
            (None, None)
        } else {
            (
                Some(step.locator.kind.as_str().to_string()),
                Some(step.locator.expression.clone()),
            )
        };
        Self {
            step_order: i64::from(step.sequence_number),
            action_type: Some(step.action_kind.clone()),
            selector_type,
            selector_value,
            insert_value: Some(step.payload_value.clone()),
            client_value: None,
            condition: step.condition.clone(),
            id_uuid: Some(step.identity.0.clone()),
            description: (!step.description.is_empty()).then(|| step.description.clone()),
            extra: step.metadata.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = r##"{
        "form": { "id_uuid": "form-1", "form_name": "Visa" },
        "steps": [
            { "step_order": 2, "action_type": "enter_text", "selector_type": "CSS",
              "selector_value": "#name", "insert_value": "Ann", "client_value": "Bob",
              "condition": "IS_MINOR_TRUE", "id_uuid": "s2", "month_format": "text" },
            { "step_order": 1, "action_type": "goto", "selector_value": "",
              "insert_value": "http://x", "condition": "", "id_uuid": "s1" }
        ],
        "condition_context": { "IS_MINOR_TRUE": false }
    }"##;

    #[test]
    fn parses_document_into_sorted_plan() {
        let plan = RawPlanDocument::parse(SAMPLE).unwrap().into_plan().unwrap();

        assert_eq!(plan.identity, Some(PlanId::from("form-1")));
        assert_eq!(plan.label.as_deref(), Some("Visa"));
        assert_eq!(plan.steps[0].action_kind, "goto");
        assert_eq!(plan.steps[0].locator, Locator::none());

        let second = &plan.steps[1];
        assert_eq!(second.locator, Locator::css("#name"));
        assert_eq!(second.payload_value, "Bob");
        assert_eq!(second.condition, GateSpec::Text("IS_MINOR_TRUE".into()));
        assert_eq!(second.metadata_str("month_format"), Some("text"));
        assert_eq!(
            plan.run_context.variable("IS_MINOR_TRUE"),
            Some(&json!(false))
        );
    }

    #[test]
    fn missing_selector_type_defaults_to_xpath() {
        let raw = RawStep {
            step_order: 1,
            action_type: Some("click".into()),
            selector_value: Some("//button".into()),
            ..RawStep::default()
        };
        let step = raw.into_step().unwrap();
        assert_eq!(step.locator, Locator::xpath("//button"));
    }

    #[test]
    fn rejects_duplicates_and_missing_action() {
        let doc = r#"{"steps":[{"step_order":1,"action_type":"goto","id_uuid":"a"},
                                {"step_order":1,"action_type":"click","id_uuid":"b"}]}"#;
        assert!(matches!(
            RawPlanDocument::parse(doc).unwrap().into_plan(),
            Err(PlanLoadError::DuplicateSequence(1))
        ));

        let doc = r#"{"steps":[{"step_order":4,"action_type":"  "}]}"#;
        assert!(matches!(
            RawPlanDocument::parse(doc).unwrap().into_plan(),
            Err(PlanLoadError::MissingAction { sequence_number: 4 })
        ));
    }

    #[test]
    fn document_survives_plan_round_trip() {
        let plan = RawPlanDocument::parse(SAMPLE).unwrap().into_plan().unwrap();
        let rebuilt = RawPlanDocument::from_plan(&plan).into_plan().unwrap();
        assert_eq!(rebuilt.steps, plan.steps);
        assert_eq!(rebuilt.identity, plan.identity);
    }
}
