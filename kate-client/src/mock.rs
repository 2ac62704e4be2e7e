//! Scripted in-memory transport for tests.
//!
//! Responses are keyed by method and path. When several responses are
//! queued for a key they are served in order; the last one is sticky and
//! keeps being served. Unscripted calls answer `404 Not Found`.

use crate::transport::{ApiRequest, ApiResponse, HttpTransport};
use async_trait::async_trait;
use http::{Method, StatusCode};
use kate_core::error::KateError;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

type Key = (Method, String);

enum Scripted {
    Reply(ApiResponse),
    Fail(String),
}

#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<HashMap<Key, VecDeque<Scripted>>>,
    gates: Mutex<HashMap<Key, Arc<Notify>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON response.
    pub fn respond(&self, method: Method, path: &str, status: StatusCode, body: serde_json::Value) {
        self.push(method, path, Scripted::Reply(ApiResponse::new(status, body.to_string())));
    }

    /// Queue a response with a raw body.
    pub fn respond_raw(&self, method: Method, path: &str, status: StatusCode, body: &str) {
        self.push(method, path, Scripted::Reply(ApiResponse::new(status, body)));
    }

    /// Queue a transport failure.
    pub fn fail(&self, method: Method, path: &str, reason: &str) {
        self.push(method, path, Scripted::Fail(reason.to_string()));
    }

    /// Hold every call to `method path` until the returned gate is notified
    /// (one `notify_one` releases one call).
    pub fn hold(&self, method: Method, path: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert((method, path.to_string()), Arc::clone(&gate));
        gate
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests received for one method and path.
    pub fn requests_to(&self, method: &Method, path: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| &r.method == method && r.path == path)
            .collect()
    }

    fn push(&self, method: Method, path: &str, entry: Scripted) {
        self.script
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(entry);
    }

    fn next(&self, key: &Key) -> Result<ApiResponse, KateError> {
        let mut script = self.script.lock().unwrap();
        let Some(queue) = script.get_mut(key) else {
            return Ok(ApiResponse::new(StatusCode::NOT_FOUND, Vec::new()));
        };
        let entry = if queue.len() > 1 { queue.pop_front() } else { None };
        match entry.as_ref().or(queue.front()) {
            Some(Scripted::Reply(resp)) => Ok(resp.clone()),
            Some(Scripted::Fail(reason)) => Err(KateError::Transport(reason.clone())),
            None => Ok(ApiResponse::new(StatusCode::NOT_FOUND, Vec::new())),
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, KateError> {
        let key = (request.method.clone(), request.path.clone());
        self.requests.lock().unwrap().push(request);

        let gate = self.gates.lock().unwrap().get(&key).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.next(&key)
    }
}
