//! Step persistence
//!
//! A store holds the authoritative copy of one plan. Recovery edits go
//! through it and the executor reloads steps afterwards.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use stepwright_core_types::{Locator, Plan, PlanId, RawPlanDocument, Step, StepId};
use tracing::{debug, info};

use crate::errors::StepStoreError;

pub trait StepStore: Send + Sync {
    /// Whole plan, including identity and run context.
    fn load_plan(&self) -> Result<Plan, StepStoreError>;

    /// Steps in ascending sequence order.
    fn load_steps(&self, plan_id: Option<&PlanId>) -> Result<Vec<Step>, StepStoreError>;

    /// Insert `step` at its sequence number, shifting later steps up by one
    /// if the number is taken. A sequence number of 0 appends. Returns the
    /// assigned sequence number.
    fn save_new_step(&self, plan_id: Option<&PlanId>, step: Step) -> Result<u32, StepStoreError>;

    fn delete_step(&self, identity: &StepId) -> Result<(), StepStoreError>;

    fn rebind_locator(&self, identity: &StepId, locator: Locator) -> Result<(), StepStoreError>;
}

fn check_plan(plan: &Plan, plan_id: Option<&PlanId>) -> Result<(), StepStoreError> {
    match (plan_id, plan.identity.as_ref()) {
        (Some(requested), Some(held)) if requested != held => {
            Err(StepStoreError::UnknownPlan(requested.to_string()))
        }
        _ => Ok(()),
    }
}

fn insert_step(plan: &mut Plan, mut step: Step) -> Result<u32, StepStoreError> {
    if plan.find(&step.identity).is_some() {
        return Err(StepStoreError::DuplicateIdentity(step.identity.to_string()));
    }
    if !step.locator.is_resolvable() {
        return Err(StepStoreError::InvalidLocator(step.locator.to_string()));
    }

    let mut steps = std::mem::take(&mut plan.steps);
    if step.sequence_number == 0 {
        step.sequence_number = steps
            .iter()
            .map(|existing| existing.sequence_number)
            .max()
            .unwrap_or(0)
            + 1;
    } else if steps
        .iter()
        .any(|existing| existing.sequence_number == step.sequence_number)
    {
        for existing in steps
            .iter_mut()
            .filter(|existing| existing.sequence_number >= step.sequence_number)
        {
            existing.sequence_number += 1;
        }
    }

    let sequence_number = step.sequence_number;
    steps.push(step);
    plan.replace_steps(steps);
    Ok(sequence_number)
}

fn remove_step(plan: &mut Plan, identity: &StepId) -> Result<Step, StepStoreError> {
    let index = plan
        .steps
        .iter()
        .position(|step| &step.identity == identity)
        .ok_or_else(|| StepStoreError::StepNotFound(identity.to_string()))?;
    Ok(plan.steps.remove(index))
}

fn set_locator(plan: &mut Plan, identity: &StepId, locator: Locator) -> Result<(), StepStoreError> {
    if locator.is_empty() || !locator.is_resolvable() {
        return Err(StepStoreError::InvalidLocator(locator.to_string()));
    }
    let step = plan
        .steps
        .iter_mut()
        .find(|step| &step.identity == identity)
        .ok_or_else(|| StepStoreError::StepNotFound(identity.to_string()))?;
    step.locator = locator;
    Ok(())
}

fn lock(plan: &Mutex<Plan>) -> MutexGuard<'_, Plan> {
    plan.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Store living only in memory; used for stdin input and tests.
#[derive(Debug)]
pub struct InMemoryStepStore {
    plan: Mutex<Plan>,
}

impl InMemoryStepStore {
    pub fn new(plan: Plan) -> Self {
        Self {
            plan: Mutex::new(plan),
        }
    }
}

impl StepStore for InMemoryStepStore {
    fn load_plan(&self) -> Result<Plan, StepStoreError> {
        Ok(lock(&self.plan).clone())
    }

    fn load_steps(&self, plan_id: Option<&PlanId>) -> Result<Vec<Step>, StepStoreError> {
        let plan = lock(&self.plan);
        check_plan(&plan, plan_id)?;
        Ok(plan.steps.clone())
    }

    fn save_new_step(&self, plan_id: Option<&PlanId>, step: Step) -> Result<u32, StepStoreError> {
        let mut plan = lock(&self.plan);
        check_plan(&plan, plan_id)?;
        insert_step(&mut plan, step)
    }

    fn delete_step(&self, identity: &StepId) -> Result<(), StepStoreError> {
        remove_step(&mut lock(&self.plan), identity).map(|_| ())
    }

    fn rebind_locator(&self, identity: &StepId, locator: Locator) -> Result<(), StepStoreError> {
        set_locator(&mut lock(&self.plan), identity, locator)
    }
}

/// Store backed by a run-input JSON document, rewritten whole after every
/// change.
#[derive(Debug)]
pub struct JsonStepStore {
    path: PathBuf,
    plan: Mutex<Plan>,
}

impl JsonStepStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StepStoreError> {
        let path = path.into();
        let text = fs::read_to_string(&path).map_err(|source| StepStoreError::Read {
            path: path.clone(),
            source,
        })?;
        let plan = RawPlanDocument::parse(&text)?.into_plan()?;
        info!(path = %path.display(), steps = plan.steps.len(), "step document loaded");
        Ok(Self {
            path,
            plan: Mutex::new(plan),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `edit` and persist; the in-memory plan is left untouched if
    /// either fails.
    fn commit<T>(
        &self,
        edit: impl FnOnce(&mut Plan) -> Result<T, StepStoreError>,
    ) -> Result<T, StepStoreError> {
        let mut guard = lock(&self.plan);
        let mut draft = guard.clone();
        let value = edit(&mut draft)?;
        self.persist(&draft)?;
        *guard = draft;
        Ok(value)
    }

    fn persist(&self, plan: &Plan) -> Result<(), StepStoreError> {
        let json = RawPlanDocument::from_plan(plan).to_json_pretty()?;
        let write_err = |source| StepStoreError::Write {
            path: self.path.clone(),
            source,
        };
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, json).map_err(write_err)?;
        fs::rename(&staging, &self.path).map_err(write_err)?;
        debug!(path = %self.path.display(), "step document written");
        Ok(())
    }
}

impl StepStore for JsonStepStore {
    fn load_plan(&self) -> Result<Plan, StepStoreError> {
        Ok(lock(&self.plan).clone())
    }

    fn load_steps(&self, plan_id: Option<&PlanId>) -> Result<Vec<Step>, StepStoreError> {
        let plan = lock(&self.plan);
        check_plan(&plan, plan_id)?;
        Ok(plan.steps.clone())
    }

    fn save_new_step(&self, plan_id: Option<&PlanId>, step: Step) -> Result<u32, StepStoreError> {
        self.commit(|plan| {
            check_plan(plan, plan_id)?;
            insert_step(plan, step)
        })
    }

    fn delete_step(&self, identity: &StepId) -> Result<(), StepStoreError> {
        self.commit(|plan| remove_step(plan, identity).map(|_| ()))
    }

    fn rebind_locator(&self, identity: &StepId, locator: Locator) -> Result<(), StepStoreError> {
        self.commit(|plan| set_locator(plan, identity, locator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn plan() -> Plan {
        Plan::new(vec![
            Step::new(1, "goto").with_identity("a").with_value("http://x"),
            Step::new(2, "click")
                .with_identity("b")
                .with_locator(Locator::css("#b")),
            Step::new(3, "click")
                .with_identity("c")
                .with_locator(Locator::css("#c")),
        ])
        .with_identity(PlanId::from("form-1"), Some("Visa".into()))
    }

    #[test]
    fn insert_shifts_later_steps() {
        let store = InMemoryStepStore::new(plan());
        let seq = store
            .save_new_step(None, Step::new(2, "noop").with_identity("new"))
            .unwrap();
        assert_eq!(seq, 2);

        let order: Vec<(u32, String)> = store
            .load_steps(None)
            .unwrap()
            .into_iter()
            .map(|s| (s.sequence_number, s.identity.to_string()))
            .collect();
        assert_eq!(
            order,
            vec![
                (1, "a".to_string()),
                (2, "new".to_string()),
                (3, "b".to_string()),
                (4, "c".to_string())
            ]
        );

        assert_eq!(
            store
                .save_new_step(None, Step::new(0, "noop").with_identity("tail"))
                .unwrap(),
            5
        );
    }

    #[test]
    fn rejects_foreign_plan_and_unknown_steps() {
        let store = InMemoryStepStore::new(plan());
        assert!(matches!(
            store.load_steps(Some(&PlanId::from("other"))),
            Err(StepStoreError::UnknownPlan(_))
        ));
        assert!(matches!(
            store.delete_step(&StepId::from("zzz")),
            Err(StepStoreError::StepNotFound(_))
        ));
        assert!(matches!(
            store.rebind_locator(&StepId::from("b"), Locator::none()),
            Err(StepStoreError::InvalidLocator(_))
        ));
    }

    #[test]
    fn json_store_persists_rebind_and_replace() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plan.json");
        fs::write(
            &path,
            RawPlanDocument::from_plan(&plan()).to_json_pretty().unwrap(),
        )
        .unwrap();

        let store = JsonStepStore::open(&path).unwrap();
        store
            .rebind_locator(&StepId::from("b"), Locator::xpath("//button[2]"))
            .unwrap();
        store.delete_step(&StepId::from("c")).unwrap();
        store
            .save_new_step(
                Some(&PlanId::from("form-1")),
                Step::new(3, "enter_text")
                    .with_identity("c2")
                    .with_locator(Locator::css("#c2"))
                    .with_value("Ann"),
            )
            .unwrap();

        let reopened = JsonStepStore::open(&path).unwrap().load_plan().unwrap();
        assert_eq!(reopened.label.as_deref(), Some("Visa"));
        assert_eq!(
            reopened.find(&StepId::from("b")).unwrap().locator,
            Locator::xpath("//button[2]")
        );
        let third = reopened.find_by_sequence(3).unwrap();
        assert_eq!(third.identity, StepId::from("c2"));
        assert_eq!(third.payload_value, "Ann");
    }
}
