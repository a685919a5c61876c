//! Interactive operator on the terminal
//!
//! Implements every collaborator port by prompting on stdout and reading
//! answers from stdin. The browser stays open and idle while a prompt waits.

use action_flow::{
    ContinuationChoice, ContinuationPort, ElementPicker, FailureContext, FailureHandler,
    RecoveryDecision, RunReport, StepAuthor,
};
use action_primitives::{ManualActionPort, ManualDecision, ManualRequest};
use async_trait::async_trait;
use stepwright_core_types::{Locator, Plan, Step, StepId};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::warn;

type Input = Box<dyn AsyncBufRead + Unpin + Send>;
type Output = Box<dyn AsyncWrite + Unpin + Send>;

pub struct ConsoleOperator {
    input: Mutex<Input>,
    output: Mutex<Output>,
}

impl ConsoleOperator {
    pub fn stdio() -> Self {
        Self::new(Box::new(BufReader::new(io::stdin())), Box::new(io::stdout()))
    }

    pub fn new(input: Input, output: Output) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
        }
    }

    /// Print `prompt` and read one trimmed line; `None` on end of input.
    async fn ask(&self, prompt: &str) -> Option<String> {
        self.say(prompt).await;
        let mut line = String::new();
        match self.input.lock().await.read_line(&mut line).await {
            Ok(0) => None,
            Ok(_) => Some(line.trim().to_string()),
            Err(err) => {
                warn!(error = %err, "failed to read operator input");
                None
            }
        }
    }

    async fn say(&self, text: &str) {
        let mut output = self.output.lock().await;
        if let Err(err) = output.write_all(text.as_bytes()).await {
            warn!(error = %err, "failed to write to console");
            return;
        }
        if let Err(err) = output.flush().await {
            warn!(error = %err, "failed to flush console output");
        }
    }
}

pub fn parse_decision(answer: &str) -> Option<RecoveryDecision> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "r" | "retry" => Some(RecoveryDecision::RetrySameBinding),
        "b" | "rebind" => Some(RecoveryDecision::RebindElement),
        "p" | "replace" => Some(RecoveryDecision::ReplaceStep),
        "a" | "abandon" => Some(RecoveryDecision::Abandon),
        _ => None,
    }
}

pub fn parse_continuation(answer: &str) -> Option<ContinuationChoice> {
    let answer = answer.trim().to_ascii_lowercase();
    match answer.as_str() {
        "" | "s" | "stop" => Some(ContinuationChoice::Stop),
        "b" | "beginning" | "from-beginning" => Some(ContinuationChoice::FromBeginning),
        _ => answer
            .strip_prefix("from-here")
            .or_else(|| answer.strip_prefix("here"))
            .or_else(|| answer.strip_prefix('h'))
            .unwrap_or(answer.as_str())
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|sequence_number| *sequence_number > 0)
            .map(ContinuationChoice::FromHere),
    }
}

#[async_trait]
impl FailureHandler for ConsoleOperator {
    async fn decide(&self, failure: &FailureContext<'_>) -> RecoveryDecision {
        self.say(&format!(
            "\nStep {} ({}) failed [{:?}, attempt {}]: {}\n",
            failure.step.sequence_number,
            failure.step.label(),
            failure.kind(),
            failure.attempt,
            failure.error
        ))
        .await;
        loop {
            let Some(answer) = self.ask("[r]etry, re[b]ind element, re[p]lace step, [a]bandon? ").await
            else {
                return RecoveryDecision::Abandon;
            };
            if let Some(decision) = parse_decision(&answer) {
                return decision;
            }
        }
    }
}

#[async_trait]
impl ElementPicker for ConsoleOperator {
    async fn pick_locator(&self, step: &Step) -> Option<Locator> {
        self.say(&format!("Current locator: {}\n", step.locator)).await;
        let answer = self
            .ask("New locator (css:..., xpath:..., empty to give up): ")
            .await?;
        Locator::parse(&answer)
    }
}

#[async_trait]
impl StepAuthor for ConsoleOperator {
    async fn author_step(&self, _plan: &Plan, replacing: &Step) -> Option<Step> {
        self.say(&format!(
            "Replacing step {} ({}).\n",
            replacing.sequence_number,
            replacing.label()
        ))
        .await;
        let action_kind = self.ask("Action (empty to give up): ").await?;
        if action_kind.is_empty() {
            return None;
        }
        let locator = self
            .ask("Locator (empty for none): ")
            .await
            .and_then(|answer| Locator::parse(&answer))
            .unwrap_or_default();
        let value = self.ask("Value: ").await.unwrap_or_default();

        Some(
            Step::new(replacing.sequence_number, action_kind)
                .with_identity(StepId::new())
                .with_locator(locator)
                .with_value(value)
                .with_condition(replacing.condition.clone())
                .with_description(replacing.description.clone()),
        )
    }
}

#[async_trait]
impl ContinuationPort for ConsoleOperator {
    async fn next_run(&self, report: &RunReport) -> ContinuationChoice {
        let counts = report.counts();
        self.say(&format!(
            "\nRun finished: {} completed, {} recovered, {} skipped, {} failed.\n",
            counts.completed, counts.recovered, counts.skipped, counts.failed
        ))
        .await;
        loop {
            let Some(answer) = self
                .ask("[s]top, from [b]eginning, or a step to run from (4, here 4): ")
                .await
            else {
                return ContinuationChoice::Stop;
            };
            if let Some(choice) = parse_continuation(&answer) {
                return choice;
            }
        }
    }
}

#[async_trait]
impl ManualActionPort for ConsoleOperator {
    async fn confirm(&self, request: ManualRequest<'_>) -> ManualDecision {
        let mut text = format!(
            "\nStep {} ({}): {}\n",
            request.step.sequence_number,
            request.step.label(),
            request.instructions
        );
        for item in request.checklist {
            text.push_str(&format!("  [ ] {}\n", item));
        }
        self.say(&text).await;

        match self.ask("Continue once done? [y/N] ").await.as_deref() {
            Some("y") | Some("Y") | Some("yes") => ManualDecision::Continue,
            _ => ManualDecision::Cancel,
        }
    }
}
