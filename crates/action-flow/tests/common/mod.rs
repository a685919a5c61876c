#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use action_flow::{
    ContinuationChoice, ContinuationPort, ElementPicker, FailureContext, FailureHandler,
    InMemoryStepStore, RecoveryCoordinator, RecoveryDecision, RunOptions, RunReport, StepAuthor,
    StepExecutor, StepStore, StepStoreError,
};
use action_gate::{GateEvaluator, StaticConditionRegistry};
use action_primitives::{
    AdaptiveWaiter, BrowserDriver, DispatchTable, DriverError, ElementState, WaitSettings,
};
use async_trait::async_trait;
use serde_json::Value;
use stepwright_core_types::{Locator, Plan, PlanId, Step, StepId};
use stepwright_timing_store::InMemoryTimingStore;

/// Driver that records calls and fails on locators marked missing.
#[derive(Default)]
pub struct ScriptedDriver {
    calls: Mutex<Vec<String>>,
    missing: Mutex<HashSet<String>>,
}

impl ScriptedDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_missing(&self, locator: &Locator) {
        self.missing.lock().unwrap().insert(locator.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls that act on the page, without readiness probes or dialog checks.
    pub fn actions(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| !call.starts_with("find ") && call != "dismiss")
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, locator: &Locator) -> Result<(), DriverError> {
        if self.missing.lock().unwrap().contains(&locator.to_string()) {
            return Err(DriverError::NotFound(locator.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for ScriptedDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.record(format!("navigate {}", url));
        Ok(())
    }

    async fn find(&self, locator: &Locator) -> Result<Option<ElementState>, DriverError> {
        self.record(format!("find {}", locator));
        Ok(self.check(locator).ok().map(|_| ElementState::interactable()))
    }

    async fn click(&self, locator: &Locator) -> Result<(), DriverError> {
        self.record(format!("click {}", locator));
        self.check(locator)
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<(), DriverError> {
        self.record(format!("type {} {}", locator, text));
        self.check(locator)
    }

    async fn select_option(&self, locator: &Locator, option: &str) -> Result<(), DriverError> {
        self.record(format!("select {} {}", locator, option));
        self.check(locator)
    }

    async fn read_text(&self, locator: &Locator) -> Result<String, DriverError> {
        self.record(format!("read {}", locator));
        self.check(locator).map(|_| String::new())
    }

    async fn set_value(&self, locator: &Locator, value: &str) -> Result<(), DriverError> {
        self.record(format!("set {} {}", locator, value));
        self.check(locator)
    }

    async fn execute_script(&self, _script: &str) -> Result<Value, DriverError> {
        self.record("script".to_string());
        Ok(Value::Bool(true))
    }

    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>, DriverError> {
        self.record(format!("screenshot full_page={}", full_page));
        Ok(Vec::new())
    }

    async fn dismiss_dialog(&self) -> Result<Option<String>, DriverError> {
        self.record("dismiss".to_string());
        Ok(None)
    }

    async fn wait_document_ready(&self, _timeout: Duration) -> Result<(), DriverError> {
        Ok(())
    }
}

/// Operator with queued answers for every port.
#[derive(Default)]
pub struct ScriptedOperator {
    decisions: Mutex<VecDeque<RecoveryDecision>>,
    locators: Mutex<VecDeque<Locator>>,
    authored: Mutex<VecDeque<Step>>,
    continuations: Mutex<VecDeque<ContinuationChoice>>,
    pub decisions_asked: AtomicUsize,
}

impl ScriptedOperator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decide(self, decision: RecoveryDecision) -> Self {
        self.decisions.lock().unwrap().push_back(decision);
        self
    }

    pub fn pick(self, locator: Locator) -> Self {
        self.locators.lock().unwrap().push_back(locator);
        self
    }

    pub fn author(self, step: Step) -> Self {
        self.authored.lock().unwrap().push_back(step);
        self
    }

    pub fn continue_with(self, choice: ContinuationChoice) -> Self {
        self.continuations.lock().unwrap().push_back(choice);
        self
    }

    pub fn asked(&self) -> usize {
        self.decisions_asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FailureHandler for ScriptedOperator {
    async fn decide(&self, _failure: &FailureContext<'_>) -> RecoveryDecision {
        self.decisions_asked.fetch_add(1, Ordering::SeqCst);
        self.decisions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(RecoveryDecision::Abandon)
    }
}

#[async_trait]
impl ElementPicker for ScriptedOperator {
    async fn pick_locator(&self, _step: &Step) -> Option<Locator> {
        self.locators.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl StepAuthor for ScriptedOperator {
    async fn author_step(&self, _plan: &Plan, _replacing: &Step) -> Option<Step> {
        self.authored.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl ContinuationPort for ScriptedOperator {
    async fn next_run(&self, _report: &RunReport) -> ContinuationChoice {
        self.continuations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ContinuationChoice::Stop)
    }
}

/// Store wrapper counting locator rebinds.
pub struct CountingStore {
    inner: InMemoryStepStore,
    pub rebinds: AtomicUsize,
}

impl CountingStore {
    pub fn new(plan: Plan) -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryStepStore::new(plan),
            rebinds: AtomicUsize::new(0),
        })
    }

    pub fn rebind_count(&self) -> usize {
        self.rebinds.load(Ordering::SeqCst)
    }
}

impl StepStore for CountingStore {
    fn load_plan(&self) -> Result<Plan, StepStoreError> {
        self.inner.load_plan()
    }

    fn load_steps(&self, plan_id: Option<&PlanId>) -> Result<Vec<Step>, StepStoreError> {
        self.inner.load_steps(plan_id)
    }

    fn save_new_step(&self, plan_id: Option<&PlanId>, step: Step) -> Result<u32, StepStoreError> {
        self.inner.save_new_step(plan_id, step)
    }

    fn delete_step(&self, identity: &StepId) -> Result<(), StepStoreError> {
        self.inner.delete_step(identity)
    }

    fn rebind_locator(&self, identity: &StepId, locator: Locator) -> Result<(), StepStoreError> {
        self.rebinds.fetch_add(1, Ordering::SeqCst);
        self.inner.rebind_locator(identity, locator)
    }
}

pub fn options() -> RunOptions {
    RunOptions {
        post_action_delay: Duration::ZERO,
        artifacts_dir: std::env::temp_dir(),
        ..RunOptions::default()
    }
}

pub fn executor(
    driver: Arc<ScriptedDriver>,
    store: Arc<dyn StepStore>,
    operator: Arc<ScriptedOperator>,
) -> StepExecutor {
    executor_with_timings(driver, store, operator, Arc::new(InMemoryTimingStore::new()))
}

pub fn executor_with_timings(
    driver: Arc<ScriptedDriver>,
    store: Arc<dyn StepStore>,
    operator: Arc<ScriptedOperator>,
    timings: Arc<InMemoryTimingStore>,
) -> StepExecutor {
    let gate = GateEvaluator::new(Arc::new(StaticConditionRegistry::with_defaults()));
    let waiter = AdaptiveWaiter::new(timings, WaitSettings::default());
    let recovery = RecoveryCoordinator::new(store, operator.clone(), operator.clone(), operator);
    StepExecutor::new(
        driver,
        gate,
        waiter,
        Arc::new(DispatchTable::with_builtin()),
        recovery,
    )
    .with_options(options())
}
