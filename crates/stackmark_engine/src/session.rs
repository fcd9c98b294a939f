//! Debugging-protocol session over one duplex connection.
//!
//! Requests get monotonically increasing ids and the caller blocks reading
//! frames until the matching reply shows up. Frames read while waiting that
//! do not match are dropped for good, so only one wait may be outstanding per
//! connection; `&mut self` on every waiting method enforces that.

use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_trace, engine_warn};
use serde_json::{json, Value};
use tokio::time::{sleep_until, timeout_at, Instant};

use crate::error::SessionError;
use crate::protocol::{describe_error, BrowserVersion, CdpFrame, CdpRequest};
use crate::transport::{Transport, WsTransport};

const READ_RETRY_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub host: String,
    pub port: u16,
    /// Upper bound on waiting for any single reply.
    pub command_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9222,
            command_timeout: Duration::from_secs(45),
        }
    }
}

impl SessionSettings {
    pub fn discovery_url(&self) -> String {
        format!("http://{}:{}/json/version", self.host, self.port)
    }
}

/// An isolated browsing context and the session attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetHandle {
    pub target_id: String,
    pub session_id: String,
}

/// Ask the browser's HTTP endpoint for its websocket debugger address.
pub async fn discover_endpoint(settings: &SessionSettings) -> Result<String, SessionError> {
    let discovery = settings.discovery_url();
    let failure = |reason: String| SessionError::Connection {
        endpoint: discovery.clone(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(settings.command_timeout)
        .build()
        .map_err(|err| failure(err.to_string()))?;
    let response = client
        .get(&discovery)
        .send()
        .await
        .map_err(|err| failure(err.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(failure(format!("http status {status}")));
    }
    let body = response.bytes().await.map_err(|err| failure(err.to_string()))?;
    let version: BrowserVersion =
        serde_json::from_slice(&body).map_err(|err| failure(err.to_string()))?;

    engine_debug!(
        "discovered {} at {}",
        version.browser,
        version.web_socket_debugger_url
    );
    Ok(version.web_socket_debugger_url)
}

pub struct ProtocolSession<T> {
    transport: T,
    last_id: u64,
    command_timeout: Duration,
}

impl ProtocolSession<WsTransport> {
    /// Discover the debugger endpoint and open the websocket.
    pub async fn connect(settings: &SessionSettings) -> Result<Self, SessionError> {
        let ws_url = discover_endpoint(settings).await?;
        let transport = WsTransport::connect(&ws_url).await?;
        engine_info!("connected to browser at {}", ws_url);
        Ok(Self::new(transport, settings.command_timeout))
    }

    pub async fn disconnect(self) {
        self.transport.close().await;
    }
}

impl<T: Transport> ProtocolSession<T> {
    pub fn new(transport: T, command_timeout: Duration) -> Self {
        Self {
            transport,
            last_id: 0,
            command_timeout,
        }
    }

    /// Id of the most recently issued request, 0 before the first one.
    pub fn last_request_id(&self) -> u64 {
        self.last_id
    }

    /// Issue one request and wait for the reply carrying its id.
    pub async fn send(
        &mut self,
        method: &str,
        params: Value,
        session_id: Option<&str>,
    ) -> Result<Value, SessionError> {
        self.last_id += 1;
        let id = self.last_id;
        let request = CdpRequest {
            id,
            method,
            params,
            session_id,
        };
        let text = serde_json::to_string(&request)?;
        engine_trace!("cdp send: {}", text);
        self.transport.send_text(text).await?;

        let deadline = Instant::now() + self.command_timeout;
        loop {
            if Instant::now() >= deadline {
                return Err(self.reply_timeout(method));
            }
            let raw = match timeout_at(deadline, self.transport.recv_text()).await {
                Ok(frame) => frame?,
                Err(_) => return Err(self.reply_timeout(method)),
            };
            let Some(frame) = parse_frame(&raw) else {
                continue;
            };
            if frame.id != Some(id) {
                engine_trace!("cdp discard while awaiting #{}: {}", id, raw);
                continue;
            }
            if let Some(error) = frame.error {
                return Err(SessionError::Protocol {
                    method: method.to_string(),
                    detail: describe_error(&error),
                });
            }
            return Ok(frame.result.unwrap_or(Value::Null));
        }
    }

    /// Wait for `event`, optionally only from `session_id`, and return its params.
    ///
    /// Read failures count as "nothing yet" until the deadline passes.
    pub async fn wait_for_event(
        &mut self,
        event: &str,
        session_id: Option<&str>,
        timeout: Duration,
    ) -> Result<Value, SessionError> {
        let deadline = Instant::now() + timeout;
        let expired = || SessionError::Timeout {
            waiting_for: event.to_string(),
            after: timeout,
        };
        loop {
            if Instant::now() >= deadline {
                return Err(expired());
            }
            match timeout_at(deadline, self.transport.recv_text()).await {
                Err(_) => return Err(expired()),
                Ok(Err(err)) => {
                    engine_debug!("read failed while waiting for {}: {}", event, err);
                    sleep_until((Instant::now() + READ_RETRY_DELAY).min(deadline)).await;
                }
                Ok(Ok(raw)) => {
                    if let Some(frame) = parse_frame(&raw) {
                        if frame.is_event(event, session_id) {
                            return Ok(frame.params.unwrap_or(Value::Null));
                        }
                    }
                }
            }
        }
    }

    /// Create a blank browsing context and attach a flat session to it.
    ///
    /// A context whose attach fails is closed again before the error returns.
    pub async fn open_target(&mut self) -> Result<TargetHandle, SessionError> {
        let created = self
            .send("Target.createTarget", json!({"url": "about:blank"}), None)
            .await?;
        let target_id = required_str(&created, "targetId", "Target.createTarget")?;

        let attached = self
            .send(
                "Target.attachToTarget",
                json!({"targetId": target_id, "flatten": true}),
                None,
            )
            .await
            .and_then(|reply| required_str(&reply, "sessionId", "Target.attachToTarget"));

        match attached {
            Ok(session_id) => {
                engine_debug!("opened target {} session {}", target_id, session_id);
                Ok(TargetHandle {
                    target_id,
                    session_id,
                })
            }
            Err(err) => {
                let _ = self
                    .send("Target.closeTarget", json!({"targetId": target_id}), None)
                    .await;
                Err(err)
            }
        }
    }

    pub async fn close_target(&mut self, handle: &TargetHandle) -> Result<(), SessionError> {
        self.send(
            "Target.closeTarget",
            json!({"targetId": handle.target_id}),
            None,
        )
        .await?;
        engine_debug!("closed target {}", handle.target_id);
        Ok(())
    }

    /// Enable lifecycle events on the context and start navigating it.
    pub async fn navigate(&mut self, handle: &TargetHandle, url: &str) -> Result<(), SessionError> {
        let session = Some(handle.session_id.as_str());
        self.send("Page.enable", json!({}), session).await?;
        let reply = self
            .send("Page.navigate", json!({"url": url}), session)
            .await?;
        match reply.get("errorText").and_then(Value::as_str) {
            Some(error) if !error.is_empty() => Err(SessionError::Protocol {
                method: "Page.navigate".to_string(),
                detail: format!("{error} ({url})"),
            }),
            _ => Ok(()),
        }
    }

    /// Evaluate `expression` in the context and return its value by value.
    pub async fn evaluate(
        &mut self,
        handle: &TargetHandle,
        expression: &str,
    ) -> Result<Value, SessionError> {
        let reply = self
            .send(
                "Runtime.evaluate",
                json!({"expression": expression, "returnByValue": true}),
                Some(handle.session_id.as_str()),
            )
            .await?;
        if let Some(details) = reply.get("exceptionDetails") {
            let detail = details
                .pointer("/exception/description")
                .or_else(|| details.get("text"))
                .and_then(Value::as_str)
                .unwrap_or("script exception")
                .to_string();
            return Err(SessionError::Protocol {
                method: "Runtime.evaluate".to_string(),
                detail,
            });
        }
        Ok(reply
            .pointer("/result/value")
            .cloned()
            .unwrap_or(Value::Null))
    }

    fn reply_timeout(&self, method: &str) -> SessionError {
        SessionError::Timeout {
            waiting_for: format!("{method} reply"),
            after: self.command_timeout,
        }
    }
}

fn parse_frame(raw: &str) -> Option<CdpFrame> {
    match serde_json::from_str(raw) {
        Ok(frame) => Some(frame),
        Err(err) => {
            engine_warn!("ignoring unparseable frame: {}", err);
            None
        }
    }
}

fn required_str(reply: &Value, field: &str, method: &str) -> Result<String, SessionError> {
    reply
        .get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| SessionError::InvalidResponse {
            method: method.to_string(),
            detail: format!("missing {field}"),
        })
}
