//! Action dispatch table
//!
//! Routes a step's action kind to its handler. The table adds no retries; a
//! kind with no registered handler goes to the fallback, which logs and does
//! nothing.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use stepwright_core_types::{Locator, Plan, RunContext, Step};
use tracing::{debug, warn};

use crate::{
    driver::BrowserDriver,
    errors::ActionError,
    primitives,
    types::{ActionOutcome, ActionReport, ManualActionPort},
};

/// Everything a handler may touch while executing one step.
pub struct ActionCtx<'a> {
    pub driver: &'a dyn BrowserDriver,
    pub step: &'a Step,
    pub run_context: &'a mut RunContext,
    pub manual: Option<&'a dyn ManualActionPort>,
    /// Directory for screenshots and other files produced by actions
    pub artifacts_dir: &'a Path,
}

impl<'a> ActionCtx<'a> {
    pub fn new(
        driver: &'a dyn BrowserDriver,
        step: &'a Step,
        run_context: &'a mut RunContext,
        artifacts_dir: &'a Path,
    ) -> Self {
        Self {
            driver,
            step,
            run_context,
            manual: None,
            artifacts_dir,
        }
    }

    pub fn with_manual(mut self, manual: Option<&'a dyn ManualActionPort>) -> Self {
        self.manual = manual;
        self
    }

    /// Step locator, or `MissingLocator` if the step has none.
    pub fn require_locator(&self) -> Result<&'a Locator, ActionError> {
        if self.step.locator.is_empty() {
            return Err(ActionError::MissingLocator(self.step.action_kind.clone()));
        }
        Ok(&self.step.locator)
    }

    /// Trimmed payload value, or `MissingPayload` if blank.
    pub fn require_payload(&self) -> Result<&'a str, ActionError> {
        let value = self.step.payload_value.trim();
        if value.is_empty() {
            return Err(ActionError::MissingPayload(self.step.action_kind.clone()));
        }
        Ok(value)
    }
}

/// One entry in the dispatch table.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn execute(&self, ctx: &mut ActionCtx<'_>) -> Result<ActionOutcome, ActionError>;
}

/// Fallback for kinds with no registered handler. Never fails.
pub struct UnknownActionHandler;

#[async_trait]
impl ActionHandler for UnknownActionHandler {
    async fn execute(&self, ctx: &mut ActionCtx<'_>) -> Result<ActionOutcome, ActionError> {
        warn!(
            sequence_number = ctx.step.sequence_number,
            step_id = %ctx.step.identity,
            action_kind = %ctx.step.action_kind,
            "unknown action kind; performing no interaction"
        );
        Ok(ActionOutcome::Completed)
    }
}

/// Step whose action kind has no handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnknownAction {
    pub sequence_number: u32,
    pub action_kind: String,
}

pub struct DispatchTable {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
    fallback: Arc<dyn ActionHandler>,
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchTable {
    /// Empty table routing everything to the fallback.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            fallback: Arc::new(UnknownActionHandler),
        }
    }

    /// Table with the built-in action catalogue registered.
    pub fn with_builtin() -> Self {
        let mut table = Self::new();
        primitives::register_builtin(&mut table);
        table
    }

    pub fn register(&mut self, action_kind: impl AsRef<str>, handler: Arc<dyn ActionHandler>) {
        self.handlers
            .insert(normalize(action_kind.as_ref()), handler);
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn ActionHandler>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn contains(&self, action_kind: &str) -> bool {
        self.handlers.contains_key(&normalize(action_kind))
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.handlers.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    /// Steps of `plan` that would be routed to the fallback.
    pub fn unknown_actions(&self, plan: &Plan) -> Vec<UnknownAction> {
        plan.steps
            .iter()
            .filter(|step| !self.contains(&step.action_kind))
            .map(|step| UnknownAction {
                sequence_number: step.sequence_number,
                action_kind: step.action_kind.clone(),
            })
            .collect()
    }

    /// Route the step in `ctx` to its handler.
    pub async fn dispatch(&self, ctx: &mut ActionCtx<'_>) -> Result<ActionReport, ActionError> {
        let action_kind = ctx.step.action_kind.clone();
        let (handler, fallback) = match self.handlers.get(&normalize(&action_kind)) {
            Some(handler) => (handler.clone(), false),
            None => (self.fallback.clone(), true),
        };

        debug!(
            sequence_number = ctx.step.sequence_number,
            action_kind = %action_kind,
            locator = %ctx.step.locator,
            "dispatching action"
        );

        let started_at = Utc::now();
        let start_instant = Instant::now();
        let outcome = handler.execute(ctx).await?;

        Ok(ActionReport::new(action_kind, outcome, started_at)
            .with_latency(start_instant.elapsed().as_millis() as u64)
            .with_fallback(fallback))
    }
}

fn normalize(action_kind: &str) -> String {
    action_kind.trim().to_ascii_lowercase()
}
