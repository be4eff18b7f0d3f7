//! Fn Project gateway
//!
//! HTTP gateway for an Fn-Project-compatible provider
//! (`GET /v2/apps`, `POST /v2/apps`, `POST /v2/fns`, `PUT /v2/fns/{id}`).
//! The wire transport sits behind [`ProviderTransport`] so the paging and
//! retry behavior can be tested without a live server.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use super::{FnProvider, ProviderError, ProviderFunction};

/// Additional attempts allowed for a failing listing page.
const MAX_LIST_RETRIES: u32 = 3;

/// Default delay unit between listing retries.
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// HTTP verbs the provider API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// GET request
    Get,
    /// POST request
    Post,
    /// PUT request
    Put,
}

/// One request to the provider API.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// HTTP verb to use.
    pub verb: Verb,

    /// Path relative to the provider base URL, e.g. `/v2/apps`.
    pub path: String,

    /// Query parameters.
    pub query: Vec<(String, String)>,

    /// JSON body, for POST/PUT.
    pub body: Option<Value>,
}

impl ProviderRequest {
    /// Creates a body-less request.
    #[must_use]
    pub fn new(verb: Verb, path: impl Into<String>) -> Self {
        Self {
            verb,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Status and parsed JSON body of a provider response.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// HTTP status code.
    pub status: u16,

    /// Response body; `Value::Null` when the body was not JSON.
    pub body: Value,
}

/// Wire transport for provider requests.
///
/// Implementations return application-level responses of any status;
/// only connection-level failures are errors.
#[async_trait]
pub trait ProviderTransport: Send + Sync {
    /// Sends one request and returns the provider's response.
    async fn send(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;
}

/// Reqwest-backed transport against a configured base URL.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Creates a transport for the given provider base URL.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl ProviderTransport for HttpTransport {
    async fn send(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut url = self
            .base_url
            .join(&request.path)
            .map_err(|err| ProviderError::InvalidResponse(err.to_string()))?;
        for (key, value) in &request.query {
            url.query_pairs_mut().append_pair(key, value);
        }

        let builder = match request.verb {
            Verb::Get => self.client.get(url),
            Verb::Post => self.client.post(url).json(&request.body),
            Verb::Put => self.client.put(url).json(&request.body),
        };

        let response = builder.header(ACCEPT, "application/json").send().await?;
        let status = response.status().as_u16();
        let body = response.json().await.unwrap_or(Value::Null);

        Ok(ProviderResponse { status, body })
    }
}

#[derive(Debug, Deserialize)]
struct AppsPage {
    #[serde(default)]
    items: Vec<AppSummary>,
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AppSummary {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct CreatedApp {
    id: String,
}

/// Gateway over the Fn Project v2 API.
pub struct FnProjectGateway {
    transport: Arc<dyn ProviderTransport>,
    retry_delay: Duration,
}

impl FnProjectGateway {
    /// Creates a gateway over the given transport.
    #[must_use]
    pub fn new(transport: Arc<dyn ProviderTransport>) -> Self {
        Self {
            transport,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Overrides the retry delay unit (tests use [`Duration::ZERO`]).
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Fetches the full app listing, following `next_cursor` until absent.
    ///
    /// Each failing page is retried up to [`MAX_LIST_RETRIES`] additional
    /// times with a linear delay; pages fetched before the failure are kept.
    async fn list_apps(&self) -> Result<Vec<AppSummary>, ProviderError> {
        let mut apps = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut attempt: u32 = 0;
            let page = loop {
                let mut request = ProviderRequest::new(Verb::Get, "/v2/apps");
                if let Some(cursor) = &cursor {
                    request = request.query("cursor", cursor.clone());
                }

                let response = self.transport.send(request).await?;
                if response.status == 200 {
                    break serde_json::from_value::<AppsPage>(response.body)
                        .map_err(|err| ProviderError::InvalidResponse(err.to_string()))?;
                }

                tracing::warn!(
                    status = response.status,
                    "Failed to get application list page."
                );
                attempt += 1;
                if attempt > MAX_LIST_RETRIES {
                    tracing::error!(
                        status = response.status,
                        "Failed to get application list and retries exhausted."
                    );
                    return Err(ProviderError::AppListing);
                }
                tokio::time::sleep(self.retry_delay * attempt).await;
            };

            apps.extend(page.items);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(apps)
    }
}

#[async_trait]
impl FnProvider for FnProjectGateway {
    async fn create_app(&self, name: &str) -> Result<Option<String>, ProviderError> {
        let request = ProviderRequest::new(Verb::Post, "/v2/apps").body(json!({ "name": name }));
        let response = self.transport.send(request).await?;

        if response.status == 200 {
            let created: CreatedApp = serde_json::from_value(response.body)
                .map_err(|err| ProviderError::InvalidResponse(err.to_string()))?;
            return Ok(Some(created.id));
        }

        tracing::warn!(status = response.status, name, "Failed to create application.");
        Ok(None)
    }

    async fn find_app_id_by_name(&self, name: &str) -> Result<Option<String>, ProviderError> {
        let apps = self.list_apps().await?;
        Ok(apps.into_iter().find(|app| app.name == name).map(|app| app.id))
    }

    async fn create_function(
        &self,
        name: &str,
        app_id: &str,
        image: &str,
    ) -> Result<Option<ProviderFunction>, ProviderError> {
        let request = ProviderRequest::new(Verb::Post, "/v2/fns").body(json!({
            "name": name,
            "app_id": app_id,
            "image": image,
        }));
        let response = self.transport.send(request).await?;

        if response.status == 200 {
            let function: ProviderFunction = serde_json::from_value(response.body)
                .map_err(|err| ProviderError::InvalidResponse(err.to_string()))?;
            return Ok(Some(function));
        }

        tracing::warn!(status = response.status, name, "Failed to create function.");
        Ok(None)
    }

    async fn update_function(
        &self,
        function_id: &str,
        _app_id: Option<&str>,
        image: &str,
    ) -> Result<Option<ProviderFunction>, ProviderError> {
        let request = ProviderRequest::new(Verb::Put, format!("/v2/fns/{function_id}"))
            .body(json!({ "image": image }));
        let response = self.transport.send(request).await?;

        if response.status == 200 {
            let function: ProviderFunction = serde_json::from_value(response.body)
                .map_err(|err| ProviderError::InvalidResponse(err.to_string()))?;
            return Ok(Some(function));
        }

        tracing::warn!(
            status = response.status,
            function_id,
            "Failed to update function."
        );
        Ok(None)
    }
}
