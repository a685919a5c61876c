//! Repeated runs driven by the continuation port

use std::sync::Arc;

use tracing::info;

use crate::{
    errors::FlowError,
    executor::StepExecutor,
    ports::{ContinuationChoice, ContinuationPort},
    store::StepStore,
    types::RunReport,
};

/// Loads the plan from the store before every run, so edits made during
/// recovery are picked up by the next pass.
pub struct RunSession {
    executor: StepExecutor,
    store: Arc<dyn StepStore>,
    continuation: Arc<dyn ContinuationPort>,
}

impl RunSession {
    pub fn new(
        executor: StepExecutor,
        store: Arc<dyn StepStore>,
        continuation: Arc<dyn ContinuationPort>,
    ) -> Self {
        Self {
            executor,
            store,
            continuation,
        }
    }

    pub fn executor(&self) -> &StepExecutor {
        &self.executor
    }

    /// Run from `start_index`, then keep going until the operator stops.
    pub async fn run(&self, start_index: u32) -> Result<Vec<RunReport>, FlowError> {
        let mut reports = Vec::new();
        let mut start = start_index.max(1);

        loop {
            let mut plan = self.store.load_plan()?.with_start_index(start);
            let report = self.executor.run(&mut plan).await?;
            let choice = self.continuation.next_run(&report).await;
            reports.push(report);

            start = match choice {
                ContinuationChoice::Stop => break,
                ContinuationChoice::FromBeginning => 1,
                ContinuationChoice::FromHere(sequence_number) => sequence_number.max(1),
            };
            info!(run = reports.len() + 1, start_index = start, "starting another run");
        }

        Ok(reports)
    }
}
