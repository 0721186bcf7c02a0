use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

use super::error::MalloryApiError;

const API_KEY_HEADER: &str = "X-API-KEY";

/// Pagination, sorting and filtering shared by the list endpoints.
///
/// `None` fields are left out of the query string so the upstream defaults apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    pub offset: u32,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
}

/// Read access to the Mallory intelligence API.
///
/// Payloads are handed back as raw JSON; the tool layer does not own the
/// upstream data model.
#[async_trait]
pub trait IntelligenceApi: Send + Sync {
    async fn get_threat_actor(&self, identifier: &str) -> Result<Value, MalloryApiError>;

    async fn list_threat_actors(&self, query: &ListQuery) -> Result<Value, MalloryApiError>;

    async fn list_mentioned_threat_actors(
        &self,
        query: &ListQuery,
    ) -> Result<Value, MalloryApiError>;

    async fn get_vulnerability(&self, identifier: &str) -> Result<Value, MalloryApiError>;

    async fn list_vulnerabilities(&self, query: &ListQuery) -> Result<Value, MalloryApiError>;

    async fn list_mentioned_vulnerabilities(
        &self,
        query: &ListQuery,
    ) -> Result<Value, MalloryApiError>;

    async fn get_vulnerability_detection_signatures(
        &self,
        identifier: &str,
    ) -> Result<Value, MalloryApiError>;

    async fn get_vulnerability_exploitations(
        &self,
        identifier: &str,
        query: &ListQuery,
    ) -> Result<Value, MalloryApiError>;

    async fn get_vulnerability_configurations(
        &self,
        identifier: &str,
        query: &ListQuery,
    ) -> Result<Value, MalloryApiError>;
}

#[derive(Debug, Clone)]
pub struct MalloryClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl MalloryClient {
    pub fn new(base_url: &str, api_key: String) -> Result<Self, MalloryApiError> {
        debug!(%base_url, "Creating new MalloryClient");

        let parsed = Url::parse(base_url).map_err(|e| {
            MalloryApiError::ConfigurationError(format!("Invalid base URL '{}': {}", base_url, e))
        })?;
        if parsed.cannot_be_a_base() {
            return Err(MalloryApiError::ConfigurationError(format!(
                "Base URL '{}' cannot carry a path",
                base_url
            )));
        }

        let http = Client::builder()
            .user_agent(concat!("mcp-server-mallory/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(MalloryApiError::HttpClientCreationError)?;

        Ok(Self {
            http,
            base_url: parsed,
            api_key,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, MalloryApiError> {
        // The URL parser drops dot segments instead of encoding them.
        if let Some(segment) = segments.iter().find(|s| matches!(**s, "." | "..")) {
            return Err(MalloryApiError::InvalidIdentifier(segment.to_string()));
        }

        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                MalloryApiError::ConfigurationError(format!(
                    "Base URL '{}' cannot carry a path",
                    self.base_url
                ))
            })?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    async fn get_json(
        &self,
        segments: &[&str],
        query: Option<&ListQuery>,
    ) -> Result<Value, MalloryApiError> {
        let url = self.endpoint(segments)?;
        debug!(%url, ?query, "Sending request to Mallory API");

        let mut request = self
            .http
            .get(url.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .header(ACCEPT, "application/json");
        if let Some(query) = query {
            request = request.query(query);
        }

        let response = request.send().await.map_err(|e| {
            error!("Request to {} failed: {}", url, e);
            MalloryApiError::RequestError(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = extract_error_message(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });
            error!(status = status.as_u16(), %url, "Mallory API returned an error: {}", message);
            return Err(MalloryApiError::Api {
                status_code: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        let value = serde_json::from_slice::<Value>(&body).map_err(|e| {
            error!("Error deserializing response from {}: {}", url, e);
            MalloryApiError::JsonError(e)
        })?;
        debug!(%url, "Received response from Mallory API");
        Ok(value)
    }
}

#[async_trait]
impl IntelligenceApi for MalloryClient {
    async fn get_threat_actor(&self, identifier: &str) -> Result<Value, MalloryApiError> {
        info!("Fetching threat actor: {}", identifier);
        self.get_json(&["threat_actors", identifier], None).await
    }

    async fn list_threat_actors(&self, query: &ListQuery) -> Result<Value, MalloryApiError> {
        info!(
            "Listing up to {} threat actors from offset {}",
            query.limit, query.offset
        );
        self.get_json(&["threat_actors"], Some(query)).await
    }

    async fn list_mentioned_threat_actors(
        &self,
        query: &ListQuery,
    ) -> Result<Value, MalloryApiError> {
        info!("Listing up to {} threat actor mentions", query.limit);
        self.get_json(&["mentions", "threat_actors"], Some(query))
            .await
    }

    async fn get_vulnerability(&self, identifier: &str) -> Result<Value, MalloryApiError> {
        info!("Fetching vulnerability: {}", identifier);
        self.get_json(&["vulnerabilities", identifier], None).await
    }

    async fn list_vulnerabilities(&self, query: &ListQuery) -> Result<Value, MalloryApiError> {
        info!(
            "Listing up to {} vulnerabilities from offset {}",
            query.limit, query.offset
        );
        self.get_json(&["vulnerabilities"], Some(query)).await
    }

    async fn list_mentioned_vulnerabilities(
        &self,
        query: &ListQuery,
    ) -> Result<Value, MalloryApiError> {
        info!("Listing up to {} vulnerability mentions", query.limit);
        self.get_json(&["mentions", "vulnerabilities"], Some(query))
            .await
    }

    async fn get_vulnerability_detection_signatures(
        &self,
        identifier: &str,
    ) -> Result<Value, MalloryApiError> {
        info!("Fetching detection signatures for {}", identifier);
        self.get_json(&["vulnerabilities", identifier, "detection_signatures"], None)
            .await
    }

    async fn get_vulnerability_exploitations(
        &self,
        identifier: &str,
        query: &ListQuery,
    ) -> Result<Value, MalloryApiError> {
        info!("Fetching exploitations for {}", identifier);
        self.get_json(&["vulnerabilities", identifier, "exploitations"], Some(query))
            .await
    }

    async fn get_vulnerability_configurations(
        &self,
        identifier: &str,
        query: &ListQuery,
    ) -> Result<Value, MalloryApiError> {
        info!("Fetching configurations for {}", identifier);
        self.get_json(&["vulnerabilities", identifier, "configurations"], Some(query))
            .await
    }
}

/// Pulls a human-readable message out of an error response body.
fn extract_error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(trimmed) {
        for key in ["detail", "message", "error"] {
            match fields.get(key) {
                Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
                Some(Value::Null) | None => continue,
                Some(Value::String(_)) => continue,
                Some(other) => return Some(other.to_string()),
            }
        }
    }

    Some(trimmed.to_string())
}
