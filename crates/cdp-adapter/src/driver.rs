use std::sync::{Arc, Mutex};
use std::time::Duration;

use action_primitives::{BrowserDriver, DriverError, ElementState};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use stepwright_core_types::{Locator, LocatorKind};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ChromiumConfig;
use crate::detect::detect_chrome_executable;
use crate::error::{protocol, AdapterError};
use crate::scripts;

const READY_POLL: Duration = Duration::from_millis(100);

/// One Chromium page driven over the DevTools protocol.
pub struct ChromiumDriver {
    browser: tokio::sync::Mutex<Browser>,
    page: Page,
    pending_dialog: Arc<Mutex<Option<String>>>,
    tasks: Vec<JoinHandle<()>>,
}

impl ChromiumDriver {
    /// Launch a browser, or attach when `websocket_url` is set, and open a
    /// blank page.
    pub async fn launch(cfg: &ChromiumConfig) -> Result<Self, AdapterError> {
        let (browser, mut handler) = match cfg.websocket_url.as_deref() {
            Some(url) => Browser::connect(url)
                .await
                .map_err(|source| AdapterError::Connect {
                    url: url.to_string(),
                    source,
                })?,
            None => Browser::launch(browser_config(cfg)?)
                .await
                .map_err(AdapterError::Launch)?,
        };

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "devtools handler event failed");
                }
            }
            debug!("devtools handler finished");
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(AdapterError::Page)?;

        let pending_dialog = Arc::new(Mutex::new(None));
        let mut dialogs = page
            .event_listener::<EventJavascriptDialogOpening>()
            .await
            .map_err(AdapterError::Page)?;
        let slot = pending_dialog.clone();
        let dialog_task = tokio::spawn(async move {
            while let Some(event) = dialogs.next().await {
                debug!(message = %event.message, "javascript dialog opened");
                if let Ok(mut pending) = slot.lock() {
                    *pending = Some(event.message.clone());
                }
            }
        });

        info!(
            headless = cfg.headless,
            attached = cfg.websocket_url.is_some(),
            "browser ready"
        );
        Ok(Self {
            browser: tokio::sync::Mutex::new(browser),
            page,
            pending_dialog,
            tasks: vec![handler_task, dialog_task],
        })
    }

    /// Close the browser and stop background tasks.
    pub async fn close(&self) {
        let mut browser = self.browser.lock().await;
        if let Err(err) = browser.close().await {
            warn!(error = %err, "browser did not close cleanly");
        }
        if let Err(err) = browser.wait().await {
            debug!(error = %err, "browser process wait failed");
        }
        for task in &self.tasks {
            task.abort();
        }
    }

    async fn element(&self, locator: &Locator) -> Result<Element, DriverError> {
        let found = match locator.kind {
            LocatorKind::Css => self.page.find_element(locator.expression.as_str()).await,
            LocatorKind::XPath => self.page.find_xpath(locator.expression.as_str()).await,
            LocatorKind::None => return Err(DriverError::NotFound(locator.to_string())),
        };
        found.map_err(|err| {
            debug!(locator = %locator, error = %err, "element lookup failed");
            DriverError::NotFound(locator.to_string())
        })
    }

    async fn eval<T: DeserializeOwned>(&self, script: &str) -> Result<T, DriverError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|err| DriverError::Script(err.to_string()))?;
        let value = result.value().cloned().unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|err| DriverError::Script(err.to_string()))
    }
}

fn browser_config(cfg: &ChromiumConfig) -> Result<BrowserConfig, AdapterError> {
    let executable = cfg
        .executable
        .clone()
        .filter(|path| path.exists())
        .or_else(detect_chrome_executable)
        .ok_or(AdapterError::ExecutableNotFound)?;

    let mut builder = BrowserConfig::builder()
        .chrome_executable(executable)
        .user_data_dir(&cfg.user_data_dir)
        .window_size(cfg.window_width, cfg.window_height)
        .request_timeout(Duration::from_millis(cfg.request_timeout_ms));
    if !cfg.headless {
        builder = builder.with_head();
    }
    builder.build().map_err(AdapterError::Config)
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.page
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|err| DriverError::Navigation(format!("{}: {}", url, err)))
    }

    async fn find(&self, locator: &Locator) -> Result<Option<ElementState>, DriverError> {
        if locator.is_empty() {
            return Ok(None);
        }
        self.eval(&scripts::element_state(locator)).await
    }

    async fn click(&self, locator: &Locator) -> Result<(), DriverError> {
        let element = self.element(locator).await?;
        element
            .click()
            .await
            .map(|_| ())
            .map_err(|err| {
                debug!(locator = %locator, error = %err, "click failed");
                DriverError::NotInteractable(locator.to_string())
            })
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<(), DriverError> {
        let element = self.element(locator).await?;
        let cleared: bool = self.eval(&scripts::clear_value(locator)).await?;
        if !cleared {
            return Err(DriverError::NotFound(locator.to_string()));
        }
        element
            .click()
            .await
            .map_err(|_| DriverError::NotInteractable(locator.to_string()))?;
        element.type_str(text).await.map(|_| ()).map_err(protocol)
    }

    async fn select_option(&self, locator: &Locator, option: &str) -> Result<(), DriverError> {
        let status: String = self.eval(&scripts::select_option(locator, option)).await?;
        match status.as_str() {
            "ok" => Ok(()),
            "no-option" => Err(DriverError::OptionNotFound {
                locator: locator.to_string(),
                option: option.to_string(),
            }),
            _ => Err(DriverError::NotFound(locator.to_string())),
        }
    }

    async fn read_text(&self, locator: &Locator) -> Result<String, DriverError> {
        let text: Option<String> = self.eval(&scripts::read_text(locator)).await?;
        text.ok_or_else(|| DriverError::NotFound(locator.to_string()))
    }

    async fn set_value(&self, locator: &Locator, value: &str) -> Result<(), DriverError> {
        let updated: bool = self.eval(&scripts::set_value(locator, value)).await?;
        if updated {
            Ok(())
        } else {
            Err(DriverError::NotFound(locator.to_string()))
        }
    }

    async fn execute_script(&self, script: &str) -> Result<Value, DriverError> {
        self.eval(script).await
    }

    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>, DriverError> {
        self.page
            .screenshot(ScreenshotParams::builder().full_page(full_page).build())
            .await
            .map_err(protocol)
    }

    async fn dismiss_dialog(&self) -> Result<Option<String>, DriverError> {
        let pending = self
            .pending_dialog
            .lock()
            .map_err(|_| DriverError::Protocol("dialog state poisoned".to_string()))?
            .take();
        let Some(message) = pending else {
            return Ok(None);
        };
        self.page
            .execute(HandleJavaScriptDialogParams::new(true))
            .await
            .map_err(protocol)?;
        Ok(Some(message))
    }

    async fn wait_document_ready(&self, timeout: Duration) -> Result<(), DriverError> {
        let poll = async {
            loop {
                match self.eval::<bool>(scripts::DOCUMENT_READY).await {
                    Ok(true) => return,
                    Ok(false) => {}
                    Err(err) => debug!(error = %err, "readyState probe failed"),
                }
                tokio::time::sleep(READY_POLL).await;
            }
        };
        tokio::time::timeout(timeout, poll).await.map_err(|_| {
            DriverError::Timeout(format!("document not ready after {:?}", timeout))
        })
    }
}
