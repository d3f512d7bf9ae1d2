use std::path::PathBuf;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{EnableParams, EventResponseReceived};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::Page;
use engine_logging::{engine_debug, engine_warn};
use futures_util::StreamExt;
use mirror_core::ObservedResponse;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::browser::{BrowserLauncher, BrowserSession};
use crate::MirrorError;

#[derive(Debug, Clone, Default)]
pub struct ChromiumSettings {
    /// Browser binary; the chromiumoxide default lookup when `None`.
    pub executable: Option<PathBuf>,
    /// Challenges usually need a visible window, so this defaults to false.
    pub headless: bool,
}

/// Launches Chromium-family browsers over the DevTools protocol.
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher {
    settings: ChromiumSettings,
}

impl ChromiumLauncher {
    pub fn new(settings: ChromiumSettings) -> Self {
        Self { settings }
    }

    fn config(&self) -> Result<BrowserConfig, MirrorError> {
        let mut builder = BrowserConfig::builder()
            .arg("--disable-popup-blocking")
            .arg("--disable-extensions")
            .arg("--safebrowsing-disable-download-protection");
        if !self.settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.settings.executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(MirrorError::Browser)
    }
}

fn browser_error(err: impl std::fmt::Display) -> MirrorError {
    MirrorError::Browser(err.to_string())
}

#[async_trait::async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, MirrorError> {
        let (browser, mut handler) = Browser::launch(self.config()?)
            .await
            .map_err(browser_error)?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    engine_debug!("Browser handler stopped: {}", err);
                    break;
                }
            }
        });

        let mut session = ChromiumSession {
            browser,
            page: None,
            handler_task,
            listener_task: None,
            responses: None,
        };
        if let Err(err) = session.open_page().await {
            session.close().await;
            return Err(err);
        }
        Ok(Box::new(session))
    }
}

struct ChromiumSession {
    browser: Browser,
    page: Option<Page>,
    handler_task: JoinHandle<()>,
    listener_task: Option<JoinHandle<()>>,
    responses: Option<mpsc::UnboundedReceiver<ObservedResponse>>,
}

impl ChromiumSession {
    async fn open_page(&mut self) -> Result<(), MirrorError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(browser_error)?;
        page.execute(EnableParams::default())
            .await
            .map_err(browser_error)?;
        let mut events = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(browser_error)?;

        let (tx, rx) = mpsc::unbounded_channel();
        self.listener_task = Some(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let headers = event
                    .response
                    .headers
                    .inner()
                    .as_object()
                    .map(|map| {
                        map.iter()
                            .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default();
                let observed = ObservedResponse::new(event.response.url.clone(), headers);
                if tx.send(observed).is_err() {
                    break;
                }
            }
        }));
        self.responses = Some(rx);
        self.page = Some(page);
        Ok(())
    }

    fn page(&self) -> Result<&Page, MirrorError> {
        self.page
            .as_ref()
            .ok_or_else(|| MirrorError::Browser("page already closed".to_string()))
    }
}

#[async_trait::async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<(), MirrorError> {
        self.page()?
            .execute(NavigateParams::new(url))
            .await
            .map_err(browser_error)?;
        Ok(())
    }

    async fn page_content(&mut self) -> Result<String, MirrorError> {
        self.page()?.content().await.map_err(browser_error)
    }

    async fn drain_responses(&mut self) -> Result<Vec<ObservedResponse>, MirrorError> {
        let rx = self
            .responses
            .as_mut()
            .ok_or_else(|| MirrorError::Browser("network events not subscribed".to_string()))?;
        let mut drained = Vec::new();
        while let Ok(response) = rx.try_recv() {
            drained.push(response);
        }
        Ok(drained)
    }

    async fn stop_loading(&mut self) -> Result<(), MirrorError> {
        self.page()?
            .evaluate("window.stop();")
            .await
            .map_err(browser_error)?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(task) = self.listener_task.take() {
            task.abort();
        }
        self.responses = None;
        if let Some(page) = self.page.take() {
            if let Err(err) = page.close().await {
                engine_warn!("Failed to close page: {}", err);
            }
        }
        if let Err(err) = self.browser.close().await {
            engine_warn!("Failed to close browser: {}", err);
        }
        if let Err(err) = self.browser.wait().await {
            engine_debug!("Browser process wait failed: {}", err);
        }
        self.handler_task.abort();
    }
}
