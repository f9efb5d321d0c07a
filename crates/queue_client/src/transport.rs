//! HTTP transport with ordered request and response hooks.
//!
//! Every collaborator call goes through [`Transport::send`]:
//! 1. the request is built against the base URL with JSON headers
//! 2. each [`RequestHook`] may amend it (e.g. attach a bearer token)
//! 3. the request is executed
//! 4. each [`ResponseHook`] observes the status (e.g. expire the session)
//! 5. the status is mapped to success bytes or an [`ApiError`]

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, Request, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::error::ApiError;

/// Pre-request middleware. Must not block or fail.
pub trait RequestHook: Send + Sync {
    /// Amend the outgoing request
    fn on_request(&self, request: &mut Request);
}

/// What a [`ResponseHook`] sees of a completed call
#[derive(Debug, Clone, Copy)]
pub struct ResponseContext<'a> {
    /// Request method
    pub method: &'a Method,
    /// Path segments relative to the base URL
    pub segments: &'a [&'a str],
    /// Response status
    pub status: StatusCode,
}

impl ResponseContext<'_> {
    /// Whether the call was to exactly `segments`
    pub fn is_path(&self, segments: &[&str]) -> bool {
        self.segments == segments
    }
}

/// Post-response middleware. Must not block or fail.
pub trait ResponseHook: Send + Sync {
    /// Observe a completed call
    fn on_response(&self, context: &ResponseContext<'_>);
}

/// Builder for [`Transport`]
pub struct TransportBuilder {
    base_url: String,
    timeout: Duration,
    request_hooks: Vec<Arc<dyn RequestHook>>,
    response_hooks: Vec<Arc<dyn ResponseHook>>,
}

impl TransportBuilder {
    /// Set the per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Append a pre-request hook
    pub fn request_hook(mut self, hook: Arc<dyn RequestHook>) -> Self {
        self.request_hooks.push(hook);
        self
    }

    /// Append a post-response hook
    pub fn response_hook(mut self, hook: Arc<dyn ResponseHook>) -> Self {
        self.response_hooks.push(hook);
        self
    }

    /// Build the transport
    pub fn build(self) -> Result<Transport, ApiError> {
        let base_url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(self.base_url));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(self.timeout)
            .build()
            .map_err(ApiError::Network)?;

        Ok(Transport {
            client,
            base_url,
            request_hooks: self.request_hooks,
            response_hooks: self.response_hooks,
        })
    }
}

/// Single HTTP client bound to the collaborator's base URL
pub struct Transport {
    client: Client,
    base_url: Url,
    request_hooks: Vec<Arc<dyn RequestHook>>,
    response_hooks: Vec<Arc<dyn ResponseHook>>,
}

/// `{"message": "..."}` error body
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl Transport {
    /// Start building a transport for `base_url`
    pub fn builder(base_url: impl Into<String>) -> TransportBuilder {
        TransportBuilder {
            base_url: base_url.into(),
            timeout: Duration::from_secs(10),
            request_hooks: Vec::new(),
            response_hooks: Vec::new(),
        }
    }

    /// Base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve path segments against the base URL, percent-encoding each one
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request and return the raw success body
    pub async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<Vec<u8>, ApiError> {
        let url = self.endpoint(segments)?;
        let mut builder = self.client.request(method.clone(), url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let mut request = builder.build().map_err(ApiError::Network)?;

        for hook in &self.request_hooks {
            hook.on_request(&mut request);
        }

        tracing::debug!(method = %method, path = %request.url().path(), "Sending request");
        let response = self
            .client
            .execute(request)
            .await
            .map_err(ApiError::Network)?;
        let status = response.status();

        let context = ResponseContext {
            method: &method,
            segments,
            status,
        };
        for hook in &self.response_hooks {
            hook.on_response(&context);
        }

        let bytes = response.bytes().await.map_err(ApiError::Network)?;
        tracing::debug!(method = %method, status = status.as_u16(), "Received response");

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&bytes)
                .ok()
                .and_then(|b| b.message)
                .filter(|m| !m.is_empty());
            return Err(ApiError::status(status.as_u16(), message));
        }
        Ok(bytes.to_vec())
    }

    /// Send without a body and decode the JSON reply
    pub async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let bytes = self.send::<()>(Method::GET, segments, None).await?;
        decode(&bytes)
    }

    /// Send with an optional body and discard the reply
    pub async fn send_empty<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<(), ApiError> {
        self.send(method, segments, body).await.map(|_| ())
    }
}

/// Decode a JSON body
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(bytes).map_err(|e| ApiError::decode(e.to_string()))
}
