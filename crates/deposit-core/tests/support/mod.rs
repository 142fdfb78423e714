//! Scripted JSON-RPC node served over a local socket.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use deposit_core::rpc::JsonRpcClient;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub enum Reply {
    Result(Value),
    /// Bare HTTP status with an empty body, as a failing gateway sends.
    Status(u16),
}

#[derive(Default)]
struct Script {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<String>>,
}

impl Script {
    fn next(&self, method: &str) -> Reply {
        let mut replies = self.replies.lock().unwrap();
        match replies.get_mut(method) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or(Reply::Status(500)),
            None => Reply::Status(500),
        }
    }
}

pub struct RpcServer {
    pub url: String,
    script: Arc<Script>,
    handle: JoinHandle<()>,
}

impl RpcServer {
    pub async fn spawn() -> Self {
        let script = Arc::new(Script::default());
        let app = Router::new()
            .route("/", post(handle))
            .with_state(script.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            url,
            script,
            handle,
        }
    }

    /// Queues replies for `method`. The last one repeats forever.
    pub fn on(&self, method: &str, replies: impl IntoIterator<Item = Reply>) -> &Self {
        self.script
            .replies
            .lock()
            .unwrap()
            .insert(method.to_string(), replies.into_iter().collect());
        self
    }

    pub fn calls(&self, method: &str) -> usize {
        self.script
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|m| *m == method)
            .count()
    }

    pub fn client(&self) -> JsonRpcClient {
        JsonRpcClient::new(self.url.clone(), Duration::from_secs(5)).unwrap()
    }
}

impl Drop for RpcServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle(State(script): State<Arc<Script>>, Json(request): Json<Value>) -> Response {
    let method = request["method"].as_str().unwrap_or_default().to_string();
    script.calls.lock().unwrap().push(method.clone());

    match script.next(&method) {
        Reply::Result(result) => Json(json!({
            "jsonrpc": "2.0",
            "id": request["id"],
            "result": result,
        }))
        .into_response(),
        Reply::Status(code) => StatusCode::from_u16(code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
    }
}

pub fn ok(result: Value) -> Reply {
    Reply::Result(result)
}

pub fn with_context(value: Value) -> Reply {
    Reply::Result(json!({ "context": { "slot": 1 }, "value": value }))
}
