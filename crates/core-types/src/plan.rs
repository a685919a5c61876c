//! Plan: ordered steps plus resume point and run context

use serde::{Deserialize, Serialize};

use crate::{PlanId, RunContext, Step, StepId};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub identity: Option<PlanId>,
    pub label: Option<String>,
    pub steps: Vec<Step>,
    pub start_index: u32,
    pub run_context: RunContext,
}

impl Plan {
    /// Build a plan; steps are kept sorted by sequence number.
    pub fn new(mut steps: Vec<Step>) -> Self {
        steps.sort_by_key(|step| step.sequence_number);
        Self {
            identity: None,
            label: None,
            steps,
            start_index: 1,
            run_context: RunContext::default(),
        }
    }

    pub fn with_identity(mut self, identity: PlanId, label: Option<String>) -> Self {
        self.identity = Some(identity);
        self.label = label;
        self
    }

    pub fn with_start_index(mut self, start_index: u32) -> Self {
        self.start_index = start_index;
        self
    }

    pub fn with_context(mut self, context: RunContext) -> Self {
        self.run_context = context;
        self
    }

    /// Replace the step list, restoring ascending order.
    pub fn replace_steps(&mut self, mut steps: Vec<Step>) {
        steps.sort_by_key(|step| step.sequence_number);
        self.steps = steps;
    }

    /// Steps at or after `start_index`, ascending.
    pub fn eligible_steps(&self) -> impl Iterator<Item = &Step> {
        let start = self.start_index;
        self.steps
            .iter()
            .filter(move |step| step.sequence_number >= start)
    }

    pub fn find(&self, identity: &StepId) -> Option<&Step> {
        self.steps.iter().find(|step| &step.identity == identity)
    }

    pub fn find_by_sequence(&self, sequence_number: u32) -> Option<&Step> {
        self.steps
            .iter()
            .find(|step| step.sequence_number == sequence_number)
    }

    /// Smallest sequence number strictly greater than `sequence_number`.
    pub fn next_sequence_after(&self, sequence_number: u32) -> Option<u32> {
        self.steps
            .iter()
            .map(|step| step.sequence_number)
            .filter(|seq| *seq > sequence_number)
            .min()
    }

    pub fn plan_id_str(&self) -> Option<&str> {
        self.identity.as_ref().map(PlanId::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eligible_steps_respect_start_index_and_order() {
        let plan = Plan::new(vec![
            Step::new(3, "click"),
            Step::new(1, "goto"),
            Step::new(2, "enter_text"),
        ])
        .with_start_index(2);

        let order: Vec<u32> = plan.eligible_steps().map(|s| s.sequence_number).collect();
        assert_eq!(order, vec![2, 3]);
        assert_eq!(plan.next_sequence_after(2), Some(3));
        assert_eq!(plan.next_sequence_after(3), None);
    }
}
