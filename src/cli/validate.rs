use std::path::PathBuf;
use std::sync::Arc;

use action_gate::GateEvaluator;
use action_primitives::{DispatchTable, UnknownAction};
use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;
use stepwright_core_types::{Plan, RawPlanDocument};
use tokio::fs;

use super::context::CliContext;
use super::output::render_structured;
use crate::config::Config;

#[derive(Args, Clone, Debug)]
pub struct ValidateArgs {
    /// Plan document (JSON)
    pub plan: PathBuf,
}

#[derive(Debug, Default, Serialize)]
pub struct ValidationReport {
    pub steps: usize,
    pub unknown_actions: Vec<UnknownAction>,
    pub missing_conditions: Vec<MissingCondition>,
}

#[derive(Debug, Serialize)]
pub struct MissingCondition {
    pub sequence_number: u32,
    pub key: String,
}

impl ValidationReport {
    pub fn problems(&self) -> usize {
        self.unknown_actions.len() + self.missing_conditions.len()
    }
}

pub fn validate_plan(plan: &Plan, config: &Config) -> ValidationReport {
    let dispatch = DispatchTable::with_builtin();
    let gate = GateEvaluator::new(Arc::new(config.condition_registry()));
    let missing_conditions = plan
        .steps
        .iter()
        .flat_map(|step| {
            gate.missing_keys(&step.condition)
                .into_iter()
                .map(move |key| MissingCondition {
                    sequence_number: step.sequence_number,
                    key,
                })
        })
        .collect();

    ValidationReport {
        steps: plan.steps.len(),
        unknown_actions: dispatch.unknown_actions(plan),
        missing_conditions,
    }
}

pub async fn cmd_validate(args: ValidateArgs, ctx: &CliContext) -> Result<()> {
    let text = fs::read_to_string(&args.plan)
        .await
        .with_context(|| format!("Failed to read {}", args.plan.display()))?;
    let plan = RawPlanDocument::parse(&text)
        .and_then(RawPlanDocument::into_plan)
        .with_context(|| format!("Invalid plan document {}", args.plan.display()))?;

    let report = validate_plan(&plan, ctx.config());
    match render_structured(ctx.output(), &report)? {
        Some(text) => println!("{}", text),
        None => {
            println!("{}: {} step(s)", args.plan.display(), report.steps);
            for action in &report.unknown_actions {
                println!(
                    "  step {}: no handler for action '{}'",
                    action.sequence_number, action.action_kind
                );
            }
            for missing in &report.missing_conditions {
                println!(
                    "  step {}: unknown condition key '{}'",
                    missing.sequence_number, missing.key
                );
            }
        }
    }

    if report.problems() > 0 {
        bail!("plan has {} problem(s)", report.problems());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwright_core_types::{GateSpec, Step};

    #[test]
    fn reports_unknown_actions_and_condition_keys() {
        let plan = Plan::new(vec![
            Step::new(1, "goto"),
            Step::new(2, "teleport"),
            Step::new(3, "click").with_condition(GateSpec::List(vec![
                "IS_MINOR_TRUE".into(),
                "NOT_A_KEY".into(),
            ])),
        ]);

        let report = validate_plan(&plan, &Config::default());
        assert_eq!(report.steps, 3);
        assert_eq!(report.unknown_actions.len(), 1);
        assert_eq!(report.unknown_actions[0].sequence_number, 2);
        assert_eq!(report.missing_conditions.len(), 1);
        assert_eq!(report.missing_conditions[0].key, "NOT_A_KEY");
        assert_eq!(report.problems(), 2);
    }
}
