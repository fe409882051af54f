use log::debug;
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::ForkifyConfig;
use crate::model::{self, NewRecipe, Recipe, SearchResultItem};
use crate::ForkifyError;

/// JSON client for the recipes resource.
///
/// Every call is a single attempt raced against `timeout`; there are no retries.
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl ApiClient {
    /// Create a client from configuration
    pub fn new(config: &ForkifyConfig) -> Result<Self, ForkifyError> {
        Self::with_base_url(
            config.api_url.clone(),
            config.resolved_api_key(),
            config.timeout_duration(),
        )
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ForkifyError> {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Url::parse(&base_url).map_err(|e| {
            ForkifyError::ValidationError(format!("Invalid API URL {base_url}: {e}"))
        })?;

        let client = Client::builder()
            .user_agent(concat!("forkify/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(ApiClient {
            client,
            base_url,
            api_key,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}{id}` with `id` percent-encoded as a single path segment
    pub fn recipe_url(&self, id: &str) -> Result<Url, ForkifyError> {
        let invalid =
            || ForkifyError::ValidationError(format!("Invalid API URL {}", self.base_url));
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    /// GET a single recipe by id
    pub async fn fetch_recipe(&self, id: &str) -> Result<Recipe, ForkifyError> {
        let url = self.recipe_url(id)?;
        let value = self.send_json::<()>(url.as_str(), &[], None).await?;
        model::recipe_from_response(value)
    }

    /// GET all recipes matching `query`
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResultItem>, ForkifyError> {
        let value = self
            .send_json::<()>(&self.base_url, &[("search", query)], None)
            .await?;
        model::search_results_from_response(value)
    }

    /// POST a new recipe; the API answers with the stored recipe including its key
    pub async fn create_recipe(&self, recipe: &NewRecipe) -> Result<Recipe, ForkifyError> {
        let value = self.send_json(&self.base_url, &[], Some(recipe)).await?;
        model::recipe_from_response(value)
    }

    /// One request/response cycle: GET without a payload, POST with a JSON body otherwise.
    ///
    /// Non-success statuses become [`ForkifyError::RequestError`] carrying the
    /// server's `message`; exceeding the timeout becomes
    /// [`ForkifyError::TimeoutError`].
    pub async fn send_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        payload: Option<&B>,
    ) -> Result<Value, ForkifyError> {
        match tokio::time::timeout(self.timeout, self.round_trip(url, query, payload)).await {
            Ok(result) => result,
            Err(_) => Err(ForkifyError::TimeoutError(self.timeout)),
        }
    }

    async fn round_trip<B: Serialize + ?Sized>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        payload: Option<&B>,
    ) -> Result<Value, ForkifyError> {
        let mut request = match payload {
            Some(body) => self.client.post(url).json(body),
            None => self.client.get(url),
        };
        request = request.query(query);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }

        debug!("{} {}", if payload.is_some() { "POST" } else { "GET" }, url);
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!("{} answered {} with {} bytes", url, status, body.len());

        if !status.is_success() {
            let message = serde_json::from_slice::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("Request failed")
                        .to_string()
                });
            return Err(ForkifyError::RequestError {
                message,
                status: status.as_u16(),
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}
