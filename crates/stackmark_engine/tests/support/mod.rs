//! In-memory browser for protocol-level tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use stackmark_engine::{SessionError, Transport};

type Responder = Box<dyn FnMut(&Value) -> Vec<Value> + Send>;

/// Answers each request through a scripted responder and records every
/// request it was sent. Reads block forever once the inbox is empty.
pub struct FakeBrowser {
    inbox: VecDeque<Result<String, SessionError>>,
    responder: Responder,
    sent: Arc<Mutex<Vec<Value>>>,
}

impl FakeBrowser {
    pub fn new(responder: impl FnMut(&Value) -> Vec<Value> + Send + 'static) -> Self {
        Self {
            inbox: VecDeque::new(),
            responder: Box::new(responder),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A browser that opens targets and navigates successfully and hands
    /// `Runtime.evaluate` requests to `evaluate`.
    pub fn scripted(mut evaluate: impl FnMut(&Value) -> Value + Send + 'static) -> Self {
        Self::new(move |request| {
            let id = request["id"].clone();
            let session = request.get("sessionId").cloned();
            match request["method"].as_str().unwrap_or("") {
                "Target.createTarget" => vec![reply(&id, json!({"targetId": "T1"}))],
                "Target.attachToTarget" => vec![reply(&id, json!({"sessionId": "S1"}))],
                "Page.navigate" => vec![
                    reply(&id, json!({"frameId": "F1"})),
                    event("Page.loadEventFired", session.as_ref()),
                ],
                "Runtime.evaluate" => vec![reply(&id, evaluate(request))],
                _ => vec![reply(&id, json!({}))],
            }
        })
    }

    /// Handle onto the log of requests, valid after the fake is moved.
    pub fn sent_log(&self) -> Arc<Mutex<Vec<Value>>> {
        self.sent.clone()
    }

    pub fn push_frame(&mut self, frame: Value) {
        self.inbox.push_back(Ok(frame.to_string()));
    }

    /// Queues a failed read in place of the next frame.
    pub fn push_read_error(&mut self, reason: &str) {
        self.inbox
            .push_back(Err(SessionError::Transport(reason.to_string())));
    }
}

#[async_trait]
impl Transport for FakeBrowser {
    async fn send_text(&mut self, text: String) -> Result<(), SessionError> {
        let request: Value = serde_json::from_str(&text)?;
        self.sent.lock().unwrap().push(request.clone());
        for frame in (self.responder)(&request) {
            self.inbox.push_back(Ok(frame.to_string()));
        }
        Ok(())
    }

    async fn recv_text(&mut self) -> Result<String, SessionError> {
        match self.inbox.pop_front() {
            Some(frame) => frame,
            None => std::future::pending().await,
        }
    }
}

pub fn reply(id: &Value, result: Value) -> Value {
    json!({"id": id, "result": result})
}

pub fn event(method: &str, session: Option<&Value>) -> Value {
    match session {
        Some(session) => json!({"method": method, "params": {}, "sessionId": session}),
        None => json!({"method": method, "params": {}}),
    }
}

/// `Runtime.evaluate` result carrying `value`.
pub fn value(value: Value) -> Value {
    json!({"result": {"type": "string", "value": value}})
}

pub fn methods(log: &Arc<Mutex<Vec<Value>>>) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .filter_map(|r| r["method"].as_str().map(str::to_string))
        .collect()
}
