use action_gate::{ConditionRegistry, Expression};
use anyhow::Result;
use clap::Args;
use serde::Serialize;

use super::context::CliContext;
use super::output::render_structured;

#[derive(Args, Clone, Debug)]
pub struct ConditionsArgs {}

#[derive(Debug, Serialize)]
pub struct ConditionRow {
    pub key: String,
    pub expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn condition_rows(registry: &dyn ConditionRegistry) -> Vec<ConditionRow> {
    registry
        .keys()
        .into_iter()
        .map(|key| {
            let expression = registry.lookup(&key).unwrap_or_default().to_string();
            let error = Expression::parse(&expression).err().map(|err| err.to_string());
            ConditionRow {
                key,
                expression,
                error,
            }
        })
        .collect()
}

pub async fn cmd_conditions(_args: ConditionsArgs, ctx: &CliContext) -> Result<()> {
    let registry = ctx.config().condition_registry();
    let rows = condition_rows(&registry);
    match render_structured(ctx.output(), &rows)? {
        Some(text) => println!("{}", text),
        None => {
            for row in &rows {
                match &row.error {
                    None => println!("{:<32} {}", row.key, row.expression),
                    Some(error) => println!("{:<32} {}  (invalid: {})", row.key, row.expression, error),
                }
            }
        }
    }
    Ok(())
}
