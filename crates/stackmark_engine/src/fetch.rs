use std::time::Duration;

use async_trait::async_trait;
use engine_logging::{engine_debug, engine_info, engine_warn};
use serde_json::Value;
use tokio::time::{sleep, Instant};

use crate::error::SessionError;
use crate::session::{ProtocolSession, SessionSettings, TargetHandle};
use crate::transport::{Transport, WsTransport};

const LOAD_EVENT: &str = "Page.loadEventFired";
const FALLBACK_CAPTURE: &str = "document.documentElement.outerHTML";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Budget for the load event and, separately, for the readiness poll.
    pub page_timeout: Duration,
    pub poll_interval: Duration,
    /// Any one of these being present means the article has rendered.
    pub readiness_selectors: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            page_timeout: Duration::from_secs(45),
            poll_interval: Duration::from_millis(500),
            readiness_selectors: vec![
                "article".to_string(),
                "main article".to_string(),
                "div.post".to_string(),
                "[data-test-id]".to_string(),
            ],
        }
    }
}

impl FetchSettings {
    /// Script returning the full markup once a readiness selector matches, else `null`.
    pub fn readiness_probe(&self) -> String {
        let selectors =
            serde_json::to_string(&self.readiness_selectors).unwrap_or_else(|_| "[]".to_string());
        format!(
            "(() => {{ const ready = {selectors}.some((s) => document.querySelector(s)); \
             return ready ? document.documentElement.outerHTML : null; }})()"
        )
    }
}

/// Renders one address in a throwaway browsing context and captures its markup.
#[derive(Debug, Clone, Default)]
pub struct PageFetcher {
    settings: FetchSettings,
}

impl PageFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    /// The context is closed on every path out of this function.
    pub async fn fetch<T: Transport>(
        &self,
        session: &mut ProtocolSession<T>,
        url: &str,
    ) -> Result<String, SessionError> {
        let handle = session.open_target().await?;
        let captured = self.capture(session, &handle, url).await;
        if let Err(err) = session.close_target(&handle).await {
            engine_warn!("failed to close target {}: {}", handle.target_id, err);
        }
        captured
    }

    async fn capture<T: Transport>(
        &self,
        session: &mut ProtocolSession<T>,
        handle: &TargetHandle,
        url: &str,
    ) -> Result<String, SessionError> {
        session.navigate(handle, url).await?;
        wait_for_load(session, handle, self.settings.page_timeout).await;

        let probe = self.settings.readiness_probe();
        let deadline = Instant::now() + self.settings.page_timeout;
        loop {
            if let Some(markup) = non_empty_string(session.evaluate(handle, &probe).await?) {
                return Ok(markup);
            }
            if Instant::now() + self.settings.poll_interval > deadline {
                break;
            }
            sleep(self.settings.poll_interval).await;
        }

        engine_warn!("no article content at {} before deadline, capturing as-is", url);
        let markup = session.evaluate(handle, FALLBACK_CAPTURE).await?;
        Ok(non_empty_string(markup).unwrap_or_default())
    }
}

/// Wait for the load event; single-page apps may keep rendering after it, and
/// a missing event is not an error.
pub(crate) async fn wait_for_load<T: Transport>(
    session: &mut ProtocolSession<T>,
    handle: &TargetHandle,
    timeout: Duration,
) {
    if let Err(err) = session
        .wait_for_event(LOAD_EVENT, Some(handle.session_id.as_str()), timeout)
        .await
    {
        engine_debug!("continuing without load event: {}", err);
    }
}

fn non_empty_string(value: Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text),
        _ => None,
    }
}

/// Source of rendered markup for the pipeline.
#[async_trait]
pub trait Fetcher: Send {
    async fn fetch_html(&mut self, url: &str) -> Result<String, SessionError>;
}

/// Fetches through a live browser, connecting on first use and reconnecting
/// after the connection is lost.
pub struct BrowserFetcher {
    session_settings: SessionSettings,
    fetcher: PageFetcher,
    session: Option<ProtocolSession<WsTransport>>,
}

impl BrowserFetcher {
    pub fn new(session_settings: SessionSettings, fetch_settings: FetchSettings) -> Self {
        Self {
            session_settings,
            fetcher: PageFetcher::new(fetch_settings),
            session: None,
        }
    }

    pub async fn shutdown(mut self) {
        if let Some(session) = self.session.take() {
            session.disconnect().await;
        }
    }
}

#[async_trait]
impl Fetcher for BrowserFetcher {
    async fn fetch_html(&mut self, url: &str) -> Result<String, SessionError> {
        let mut session = match self.session.take() {
            Some(session) => session,
            None => ProtocolSession::connect(&self.session_settings).await?,
        };
        engine_info!("fetching {}", url);
        let result = self.fetcher.fetch(&mut session, url).await;
        match &result {
            Err(err) if err.is_connection_loss() => {
                engine_warn!("dropping browser connection after: {}", err);
            }
            _ => self.session = Some(session),
        }
        result
    }
}
