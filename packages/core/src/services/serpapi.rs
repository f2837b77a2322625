use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::acquisition::ProviderError;
use crate::error::AppError;

pub const DEFAULT_BASE_URL: &str = "https://serpapi.com";

/// HTTP client for the SerpAPI search endpoint, shared by the fare and
/// event providers.
#[derive(Clone)]
pub struct SerpApiClient {
    base_url: String,
    api_key: String,
    http: Client,
}

impl SerpApiClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, AppError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Config(format!("HTTP client: {}", err)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

impl SerpApiClient {
    /// `GET {base_url}/search` with the given engine parameters. Non-2xx
    /// statuses and undecodable bodies are errors; the body is otherwise
    /// returned untouched for the provider to normalize.
    pub async fn search(&self, params: &[(&str, String)]) -> Result<Value, ProviderError> {
        if !self.has_api_key() {
            return Err(ProviderError::not_configured("SERPAPI_KEY is not set"));
        }

        let url = format!("{}/search", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(params)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::HttpStatus {
                status: response.status().as_u16(),
            });
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|err| ProviderError::format(err.to_string()))?;

        Ok(body)
    }
}
