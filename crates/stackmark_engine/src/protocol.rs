//! Wire shapes of the debugging protocol.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub(crate) struct CdpRequest<'a> {
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<&'a str>,
}

/// Any inbound frame: a response carries `id`, an event carries `method`.
#[derive(Debug, Deserialize)]
pub(crate) struct CdpFrame {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<Value>,
    pub method: Option<String>,
    pub params: Option<Value>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

impl CdpFrame {
    pub fn is_event(&self, event: &str, session_id: Option<&str>) -> bool {
        self.method.as_deref() == Some(event)
            && session_id.map_or(true, |wanted| self.session_id.as_deref() == Some(wanted))
    }
}

/// Reply of `GET /json/version`. Chrome uses PascalCase for most keys.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserVersion {
    #[serde(rename = "Browser", default)]
    pub browser: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}

/// Render an error object the way the browser phrases it.
pub(crate) fn describe_error(error: &Value) -> String {
    match (error.get("message").and_then(Value::as_str), error.get("code")) {
        (Some(message), Some(code)) => format!("{message} (code {code})"),
        (Some(message), None) => message.to_string(),
        _ => error.to_string(),
    }
}
