use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde_json::Value;
use tracing::Span;

use crate::error::{LdError, Result};
use crate::resource::Operation;

/// Default API root for the hosted service.
pub const DEFAULT_BASE_URL: &str = "https://app.launchdarkly.com/api/v2";

/// An outbound request, fully resolved and ready to put on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

/// The request never produced a response (connect, TLS, DNS, body read).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// The network layer. Swapped for a stub in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> std::result::Result<ApiResponse, TransportError>;
}

/// Production transport backed by `reqwest`.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport, routing every request through `proxy` when given.
    /// Without an explicit proxy reqwest still honours the usual proxy
    /// environment variables.
    pub fn new(proxy: Option<&str>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| LdError::Config(format!("invalid proxy url '{}': {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| LdError::Config(format!("failed to build http client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> std::result::Result<ApiResponse, TransportError> {
        let mut builder = self.client.request(request.method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(format!("failed to read response body: {}", e)))?;
        Ok(ApiResponse { status, body })
    }
}

/// Credentials, base URL and transport shared by every accessor. Immutable
/// once built.
pub struct ApiClient {
    base_url: Url,
    token: String,
    transport: Arc<dyn Transport>,
    span: Span,
}

impl ApiClient {
    pub fn new(base_url: &str, token: &str, transport: Arc<dyn Transport>, span: Span) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| LdError::Config(format!("invalid base url '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(LdError::Config(format!("invalid base url '{}'", base_url)));
        }
        Ok(Self {
            base_url,
            token: token.to_string(),
            transport,
            span,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL extended with percent-encoded `segments` and `query` pairs.
    pub fn url(&self, segments: &[&str], query: &[(&str, String)]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        url
    }

    pub async fn get(&self, op: Operation, segments: &[&str], query: &[(&str, String)]) -> Result<Value> {
        self.execute(op, Method::GET, self.url(segments, query), None).await
    }

    pub async fn post(&self, op: Operation, segments: &[&str], body: Value) -> Result<Value> {
        self.execute(op, Method::POST, self.url(segments, &[]), Some(body))
            .await
    }

    pub async fn patch(&self, op: Operation, segments: &[&str], body: Value) -> Result<Value> {
        self.execute(op, Method::PATCH, self.url(segments, &[]), Some(body))
            .await
    }

    pub async fn delete(&self, op: Operation, segments: &[&str]) -> Result<Value> {
        self.execute(op, Method::DELETE, self.url(segments, &[]), None)
            .await
    }

    /// Perform one exchange and classify the outcome: 2xx parses the body,
    /// 404 is [`LdError::NotFound`], everything else [`LdError::RemoteApi`].
    pub async fn execute(&self, op: Operation, method: Method, url: Url, body: Option<Value>) -> Result<Value> {
        let mut headers = vec![("Authorization", self.token.clone())];
        if body.is_some() {
            headers.push(("Content-Type", "application/json".to_string()));
        }
        tracing::debug!(parent: &self.span, api = op.name, %method, %url, "sending request");

        let request = ApiRequest {
            method,
            url,
            headers,
            body,
        };
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| LdError::RemoteApi {
                api: op.name,
                status: None,
                message: e.0,
                docs: op.docs(),
            })?;

        classify(op, response)
    }
}

fn classify(op: Operation, response: ApiResponse) -> Result<Value> {
    match response.status {
        200..=299 => {
            if response.body.trim().is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(&response.body).map_err(|e| LdError::RemoteApi {
                api: op.name,
                status: Some(response.status),
                message: format!("invalid JSON in response: {}", e),
                docs: op.docs(),
            })
        }
        404 => Err(LdError::NotFound {
            api: op.name,
            message: remote_message(&response.body),
            docs: op.docs(),
        }),
        status => Err(LdError::RemoteApi {
            api: op.name,
            status: Some(status),
            message: remote_message(&response.body),
            docs: op.docs(),
        }),
    }
}

/// The `message` field of a JSON error body, else the raw body.
fn remote_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(Value::as_str)
                .map(String::from)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
