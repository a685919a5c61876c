use dashmap::DashMap;
use tracing::debug;

use crate::{
    errors::TimingStoreError,
    model::{TimingKey, TimingRecord, TimingSample},
    TimingStore,
};

/// Process-local store; estimates are lost on exit.
#[derive(Debug, Default)]
pub struct InMemoryTimingStore {
    records: DashMap<TimingKey, TimingRecord>,
    labels: DashMap<String, String>,
}

impl InMemoryTimingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, key: TimingKey, record: TimingRecord) {
        self.records.insert(key, record);
    }

    pub(crate) fn set_label(&self, plan_id: &str, label: &str) {
        self.labels.insert(plan_id.to_string(), label.to_string());
    }

    pub fn label(&self, plan_id: &str) -> Option<String> {
        self.labels.get(plan_id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl TimingStore for InMemoryTimingStore {
    fn get(
        &self,
        plan_id: Option<&str>,
        step_id: &str,
        action_kind: &str,
        default_secs: f64,
    ) -> TimingRecord {
        self.records
            .get(&TimingKey::new(plan_id, step_id, action_kind))
            .map(|entry| *entry.value())
            .unwrap_or_else(|| TimingRecord::unsampled(default_secs))
    }

    fn update(&self, sample: &TimingSample) -> Result<TimingRecord, TimingStoreError> {
        sample.validate()?;

        if let (Some(plan_id), Some(label)) = (&sample.key.plan_id, &sample.plan_label) {
            self.set_label(plan_id, label);
        }

        let mut entry = self
            .records
            .entry(sample.key.clone())
            .or_insert_with(|| TimingRecord::unsampled(sample.measured_secs));
        let updated = entry.value().folded(sample.measured_secs, sample.alpha);
        *entry.value_mut() = updated;
        drop(entry);

        debug!(
            step_id = %sample.key.step_id,
            action_kind = %sample.key.action_kind,
            measured_secs = sample.measured_secs,
            estimate_secs = updated.estimate,
            samples = updated.sample_count,
            "timing estimate updated"
        );
        Ok(updated)
    }

    fn snapshot(&self) -> Vec<(TimingKey, TimingRecord)> {
        let mut records: Vec<_> = self
            .records
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        records.sort_by(|a, b| a.0.cmp(&b.0));
        records
    }
}
