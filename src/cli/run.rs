use std::path::PathBuf;
use std::sync::Arc;

use action_flow::{
    ContinuationPort, ElementPicker, ExecutionOutcome, FailureHandler, InMemoryStepStore,
    JsonStepStore, NonInteractivePolicy, RecoveryCoordinator, RunReport, RunSession, RunStatus,
    StepAuthor, StepExecutor, StepStore,
};
use action_gate::GateEvaluator;
use action_primitives::{AdaptiveWaiter, BrowserDriver, DispatchTable, ManualActionPort};
use anyhow::{bail, Context, Result};
use cdp_adapter::ChromiumDriver;
use clap::Args;
use stepwright_core_types::RawPlanDocument;
use stepwright_timing_store::{InMemoryTimingStore, JsonFileTimingStore, TimingStore};
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

use super::console::ConsoleOperator;
use super::context::CliContext;
use super::output::render_structured;
use crate::config::Config;

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Plan document (JSON); edits made during recovery are written back
    #[arg(required_unless_present = "stdin")]
    pub plan: Option<PathBuf>,

    /// Read the plan document from stdin; implies --non-interactive
    #[arg(long, conflicts_with = "plan")]
    pub stdin: bool,

    /// First sequence number to execute
    #[arg(long, default_value_t = 1)]
    pub start: u32,

    /// Abandon failed steps and stop after one run instead of prompting
    #[arg(long)]
    pub non_interactive: bool,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,
}

/// Operator answering every collaborator port.
trait Operator:
    FailureHandler + ElementPicker + StepAuthor + ContinuationPort + ManualActionPort
{
}

impl<T> Operator for T where
    T: FailureHandler + ElementPicker + StepAuthor + ContinuationPort + ManualActionPort
{
}

pub async fn cmd_run(args: RunArgs, ctx: &CliContext) -> Result<()> {
    let config = ctx.config();
    let store = open_step_store(&args).await?;
    let plan = store.load_plan().context("Failed to load plan")?;
    info!(
        steps = plan.steps.len(),
        plan_id = plan.plan_id_str().unwrap_or("-"),
        "plan loaded"
    );

    let non_interactive = args.non_interactive || args.stdin;
    if args.stdin && !args.non_interactive {
        warn!("plan read from stdin; running without operator prompts");
    }

    let mut browser_config = config.browser.clone();
    browser_config.headless |= args.headless;
    let driver = Arc::new(
        ChromiumDriver::launch(&browser_config)
            .await
            .context("Failed to start browser")?,
    );

    let result = if non_interactive {
        run_session(config, driver.clone(), store, Arc::new(NonInteractivePolicy), args.start).await
    } else {
        run_session(config, driver.clone(), store, Arc::new(ConsoleOperator::stdio()), args.start)
            .await
    };
    driver.close().await;
    let reports = result?;

    for (index, report) in reports.iter().enumerate() {
        match render_structured(ctx.output(), report)? {
            Some(text) => println!("{}", text),
            None => print!("{}", render_report(index + 1, report)),
        }
    }

    match reports.last() {
        Some(report) if !report.success() => {
            bail!("run finished with {} failed step(s)", report.counts().failed)
        }
        _ => Ok(()),
    }
}

async fn open_step_store(args: &RunArgs) -> Result<Arc<dyn StepStore>> {
    if args.stdin {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("Failed to read plan from stdin")?;
        let plan = RawPlanDocument::parse(&text)
            .and_then(RawPlanDocument::into_plan)
            .context("Invalid plan document on stdin")?;
        return Ok(Arc::new(InMemoryStepStore::new(plan)));
    }

    let Some(path) = args.plan.as_ref() else {
        bail!("a plan path or --stdin is required");
    };
    let store = JsonStepStore::open(path)
        .with_context(|| format!("Failed to open plan {}", path.display()))?;
    Ok(Arc::new(store))
}

fn open_timing_store(config: &Config) -> Arc<dyn TimingStore> {
    let Some(path) = config.timing.store_path.as_ref() else {
        return Arc::new(InMemoryTimingStore::new());
    };
    match JsonFileTimingStore::open(path) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "timing store unavailable; learned waits will not persist"
            );
            Arc::new(InMemoryTimingStore::new())
        }
    }
}

async fn run_session<O: Operator + 'static>(
    config: &Config,
    driver: Arc<dyn BrowserDriver>,
    store: Arc<dyn StepStore>,
    operator: Arc<O>,
    start: u32,
) -> Result<Vec<RunReport>> {
    let gate = GateEvaluator::new(Arc::new(config.condition_registry()));
    let waiter = AdaptiveWaiter::new(open_timing_store(config), config.wait_settings());
    let recovery = RecoveryCoordinator::new(
        store.clone(),
        operator.clone(),
        operator.clone(),
        operator.clone(),
    );
    let executor = StepExecutor::new(
        driver,
        gate,
        waiter,
        Arc::new(DispatchTable::with_builtin()),
        recovery,
    )
    .with_manual(operator.clone())
    .with_options(config.run_options());

    let session = RunSession::new(executor, store, operator);
    Ok(session.run(start).await?)
}

/// Human-readable summary of one run.
pub fn render_report(run: usize, report: &RunReport) -> String {
    let mut text = format!(
        "Run {} of {}: ",
        run,
        report.plan_label.as_deref().or(report.plan_id.as_deref()).unwrap_or("plan")
    );
    match report.status {
        RunStatus::Done => text.push_str("done\n"),
        RunStatus::Stopped { sequence_number } => {
            text.push_str(&format!("stopped at step {}\n", sequence_number))
        }
    }

    for step in &report.steps {
        let outcome = match &step.outcome {
            ExecutionOutcome::Completed => "completed".to_string(),
            ExecutionOutcome::Skipped { reason } => format!("skipped: {}", reason),
            ExecutionOutcome::Failed { kind, error } => {
                format!("failed ({:?}): {}", kind, error)
            }
            ExecutionOutcome::Recovered { via } => format!("recovered via {:?}", via),
        };
        text.push_str(&format!(
            "  #{:<4} {:<36} {}\n",
            step.sequence_number, step.action_kind, outcome
        ));
    }

    let counts = report.counts();
    text.push_str(&format!(
        "  {} completed, {} recovered, {} skipped, {} failed ({} ms)\n",
        counts.completed, counts.recovered, counts.skipped, counts.failed, report.latency_ms
    ));
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_flow::StepResult;
    use stepwright_core_types::{Plan, Step};

    #[test]
    fn human_report_lists_each_step() {
        let plan = Plan::new(vec![Step::new(1, "goto"), Step::new(2, "enter_text")]);
        let mut report = RunReport::start(&plan);
        report.record(StepResult::new(&plan.steps[0], report.started_at));
        report.record(
            StepResult::new(&plan.steps[1], report.started_at).with_outcome(
                ExecutionOutcome::Skipped {
                    reason: "condition 'IS_MINOR_TRUE' is false".into(),
                },
            ),
        );

        let text = render_report(1, &report);
        assert!(text.starts_with("Run 1 of plan: done"));
        assert!(text.contains("#1    goto"));
        assert!(text.contains("skipped: condition 'IS_MINOR_TRUE' is false"));
        assert!(text.contains("1 completed, 0 recovered, 1 skipped, 0 failed"));
    }
}
