use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use stepwright_core_types::Locator;

use crate::{driver::BrowserDriver, errors::DriverError, ElementState};

/// Driver that records every call and resolves every locator unless told
/// otherwise.
#[derive(Default)]
pub struct RecordingDriver {
    calls: Mutex<Vec<String>>,
    missing: Mutex<HashSet<String>>,
    texts: Mutex<HashMap<String, String>>,
    dialogs: Mutex<VecDeque<String>>,
}

impl RecordingDriver {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_missing(&self, locator: &Locator) {
        self.missing.lock().unwrap().insert(locator.to_string());
    }

    pub fn set_text(&self, locator: &Locator, text: &str) {
        self.texts
            .lock()
            .unwrap()
            .insert(locator.to_string(), text.to_string());
    }

    pub fn push_dialog(&self, message: &str) {
        self.dialogs.lock().unwrap().push_back(message.to_string());
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn resolve(&self, locator: &Locator) -> Result<(), DriverError> {
        if self.missing.lock().unwrap().contains(&locator.to_string()) {
            return Err(DriverError::NotFound(locator.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for RecordingDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.record(format!("navigate {}", url));
        Ok(())
    }

    async fn find(&self, locator: &Locator) -> Result<Option<ElementState>, DriverError> {
        Ok(self
            .resolve(locator)
            .ok()
            .map(|_| ElementState::interactable()))
    }

    async fn click(&self, locator: &Locator) -> Result<(), DriverError> {
        self.resolve(locator)?;
        self.record(format!("click {}", locator));
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<(), DriverError> {
        self.resolve(locator)?;
        self.record(format!("type {} {}", locator, text));
        Ok(())
    }

    async fn select_option(&self, locator: &Locator, option: &str) -> Result<(), DriverError> {
        self.resolve(locator)?;
        self.record(format!("select {} {}", locator, option));
        Ok(())
    }

    async fn read_text(&self, locator: &Locator) -> Result<String, DriverError> {
        self.resolve(locator)?;
        self.record(format!("read {}", locator));
        Ok(self
            .texts
            .lock()
            .unwrap()
            .get(&locator.to_string())
            .cloned()
            .unwrap_or_default())
    }

    async fn set_value(&self, locator: &Locator, value: &str) -> Result<(), DriverError> {
        self.resolve(locator)?;
        self.record(format!("set {} {}", locator, value));
        Ok(())
    }

    async fn execute_script(&self, script: &str) -> Result<serde_json::Value, DriverError> {
        self.record(format!("script {}", script));
        Ok(serde_json::Value::Null)
    }

    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>, DriverError> {
        self.record(format!("screenshot full_page={}", full_page));
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn dismiss_dialog(&self) -> Result<Option<String>, DriverError> {
        Ok(self.dialogs.lock().unwrap().pop_front())
    }

    async fn wait_document_ready(&self, timeout: Duration) -> Result<(), DriverError> {
        self.record(format!("ready {}ms", timeout.as_millis()));
        Ok(())
    }
}
