#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ldutils_lib::{ApiRequest, ApiResponse, LdUtils, Transport, TransportError};
use serde_json::Value;
use wiremock::MockServer;

pub const TOKEN: &str = "MOCK";

pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture(name: &str) -> Value {
    let content = std::fs::read_to_string(fixture_path(name)).unwrap();
    serde_json::from_str(&content).unwrap()
}

/// Client pointed at `server`, rooted at `/api/v2` like the hosted API.
pub fn ld_for(server: &MockServer) -> LdUtils {
    LdUtils::builder()
        .token(TOKEN)
        .base_url(&format!("{}/api/v2", server.uri()))
        .build()
        .unwrap()
}

/// Transport answering from a queue of canned responses and recording every
/// request it was given.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<ApiResponse, TransportError>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, status: u16, body: &Value) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(ApiResponse {
            status,
            body: body.to_string(),
        }));
        self
    }

    pub fn fail(&self, reason: &str) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(TransportError(reason.to_string())));
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError("no scripted response left".into())))
    }
}

pub fn ld_with(transport: Arc<ScriptedTransport>) -> LdUtils {
    LdUtils::builder()
        .token(TOKEN)
        .transport(transport)
        .build()
        .unwrap()
}
