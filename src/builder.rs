use std::sync::Arc;

use tracing::Span;

use crate::client::{ApiClient, ReqwestTransport, Transport, DEFAULT_BASE_URL};
use crate::config::Config;
use crate::error::{LdError, Result};
use crate::LdUtils;

/// Configures and builds an [`LdUtils`].
///
/// # Examples
/// ```no_run
/// let ld = ldutils_lib::LdUtils::builder()
///     .token("api-0000")
///     .proxy("http://proxy.internal:3128")
///     .build()?;
/// # Ok::<(), ldutils_lib::LdError>(())
/// ```
pub struct LdUtilsBuilder {
    token: Option<String>,
    base_url: String,
    proxy: Option<String>,
    transport: Option<Arc<dyn Transport>>,
    span: Option<Span>,
}

pub fn create_builder() -> LdUtilsBuilder {
    LdUtilsBuilder {
        token: None,
        base_url: DEFAULT_BASE_URL.into(),
        proxy: None,
        transport: None,
        span: None,
    }
}

impl LdUtilsBuilder {
    pub fn token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    /// Route requests through `url`. Ignored when a custom transport is set.
    pub fn proxy(mut self, url: &str) -> Self {
        self.proxy = Some(url.to_string());
        self
    }

    /// Replace the network layer, e.g. with a stub in tests.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Parent span for every event the built client emits.
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Apply every setting of a resolved [`Config`].
    pub fn config(mut self, config: &Config) -> Self {
        self.token = Some(config.api_token.clone());
        self.base_url = config.base_url.clone();
        self.proxy = config.proxy.clone();
        self
    }

    pub fn build(self) -> Result<LdUtils> {
        let token = self
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| LdError::Config("an API token is required".into()))?;
        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(ReqwestTransport::new(self.proxy.as_deref())?),
        };
        let span = self
            .span
            .unwrap_or_else(|| tracing::info_span!("ldutils"));
        let client = ApiClient::new(&self.base_url, &token, transport, span.clone())?;
        Ok(LdUtils::from_parts(Arc::new(client), span))
    }
}
