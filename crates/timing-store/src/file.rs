//! JSON-file backed timing store
//!
//! Document layout, one object keyed by plan id. Steps run without a plan
//! identity live under the reserved `$unscoped` key so they never share a
//! slot with a plan:
//!
//! ```json
//! {
//!   "form-1": { "form_name": "Visa", "steps": { "step-a": { "click": { "ema": 1.2, "count": 4 } } } },
//!   "$unscoped": { "step-b": { "enter_text": { "ema": 0.4, "count": 1 } } }
//! }
//! ```
//!
//! Older documents that keep unscoped steps at the top level are still read.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    errors::TimingStoreError,
    memory::InMemoryTimingStore,
    model::{TimingKey, TimingRecord, TimingSample},
    TimingStore,
};

type ActionMap = BTreeMap<String, TimingRecord>;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlanEntry {
    #[serde(default)]
    form_name: String,
    steps: BTreeMap<String, ActionMap>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum DocumentEntry {
    Plan(PlanEntry),
    Step(ActionMap),
}

const UNSCOPED_KEY: &str = "$unscoped";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(
        rename = "$unscoped",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    unscoped: BTreeMap<String, ActionMap>,

    #[serde(flatten)]
    entries: BTreeMap<String, DocumentEntry>,
}

/// Store that rewrites the whole document after every update.
#[derive(Debug)]
pub struct JsonFileTimingStore {
    memory: InMemoryTimingStore,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileTimingStore {
    /// Load `path` if it exists; a missing or empty file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, TimingStoreError> {
        let path = path.into();
        let memory = InMemoryTimingStore::new();

        match fs::read(&path) {
            Ok(bytes) if !bytes.is_empty() => {
                let document: Document =
                    serde_json::from_slice(&bytes).map_err(|source| TimingStoreError::Malformed {
                        path: path.clone(),
                        source,
                    })?;
                load_document(&memory, document);
                info!(path = %path.display(), records = memory.len(), "timing document loaded");
            }
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no timing document yet");
            }
            Err(source) => {
                return Err(TimingStoreError::Read {
                    path: path.clone(),
                    source,
                })
            }
        }

        Ok(Self {
            memory,
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn label(&self, plan_id: &str) -> Option<String> {
        self.memory.label(plan_id)
    }

    pub fn persist_now(&self) -> Result<(), TimingStoreError> {
        self.persist_to_disk()
    }

    fn persist_to_disk(&self) -> Result<(), TimingStoreError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let json = serde_json::to_vec_pretty(&self.build_document()?)?;
        let write_err = |source| TimingStoreError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, json).map_err(write_err)?;
        fs::rename(&staging, &self.path).map_err(write_err)
    }

    fn build_document(&self) -> Result<Document, TimingStoreError> {
        let mut document = Document::default();
        for (key, record) in self.memory.snapshot() {
            match key.plan_id {
                Some(plan_id) if plan_id == UNSCOPED_KEY => {
                    warn!(plan_id = %plan_id, "plan id collides with the reserved unscoped key");
                    return Err(TimingStoreError::ReservedPlanId(plan_id));
                }
                Some(plan_id) => {
                    let label = self.memory.label(&plan_id).unwrap_or_default();
                    let entry = document
                        .entries
                        .entry(plan_id)
                        .or_insert_with(|| DocumentEntry::Plan(PlanEntry::default()));
                    if let DocumentEntry::Plan(plan) = entry {
                        plan.form_name = label;
                        plan.steps
                            .entry(key.step_id)
                            .or_default()
                            .insert(key.action_kind, record);
                    }
                }
                None => {
                    document
                        .unscoped
                        .entry(key.step_id)
                        .or_default()
                        .insert(key.action_kind, record);
                }
            }
        }
        Ok(document)
    }
}

fn load_document(memory: &InMemoryTimingStore, document: Document) {
    for (step_id, actions) in document.unscoped {
        load_unscoped(memory, &step_id, actions);
    }
    for (top_key, entry) in document.entries {
        match entry {
            DocumentEntry::Plan(plan) => {
                if !plan.form_name.is_empty() {
                    memory.set_label(&top_key, &plan.form_name);
                }
                for (step_id, actions) in plan.steps {
                    for (action_kind, record) in actions {
                        memory.insert(
                            TimingKey::new(Some(&top_key), &step_id, &action_kind),
                            record,
                        );
                    }
                }
            }
            DocumentEntry::Step(actions) => load_unscoped(memory, &top_key, actions),
        }
    }
}

fn load_unscoped(memory: &InMemoryTimingStore, step_id: &str, actions: ActionMap) {
    for (action_kind, record) in actions {
        memory.insert(TimingKey::new(None, step_id, &action_kind), record);
    }
}

impl TimingStore for JsonFileTimingStore {
    fn get(
        &self,
        plan_id: Option<&str>,
        step_id: &str,
        action_kind: &str,
        default_secs: f64,
    ) -> TimingRecord {
        self.memory.get(plan_id, step_id, action_kind, default_secs)
    }

    fn update(&self, sample: &TimingSample) -> Result<TimingRecord, TimingStoreError> {
        let record = self.memory.update(sample)?;
        if let Err(err) = self.persist_to_disk() {
            warn!(error = %err, "timing store persist failed after update");
            return Err(err);
        }
        Ok(record)
    }

    fn snapshot(&self) -> Vec<(TimingKey, TimingRecord)> {
        self.memory.snapshot()
    }
}
