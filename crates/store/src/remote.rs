//! Hosted backend client speaking the PostgREST dialect exposed by the
//! managed database (`/segments`, `/users`, `/rpc/preview_segment`,
//! `/rpc/segment_users`).

use crate::backend::SegmentBackend;
use async_trait::async_trait;
use audience_core::config::BackendConfig;
use audience_core::types::UserRecord;
use audience_core::{AudienceError, AudienceResult};
use audience_segmentation::{Criterion, Segment, SegmentUpdate};
use chrono::Utc;
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

const SEGMENTS_TABLE: &str = "segments";
const USERS_TABLE: &str = "users";
const PREVIEW_RPC: &str = "rpc/preview_segment";
const MEMBERS_RPC: &str = "rpc/segment_users";

pub struct RestBackend {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Deserialize)]
struct RfmRow {
    rfm_score: Option<String>,
}

impl RestBackend {
    pub fn new(config: &BackendConfig) -> AudienceResult<Self> {
        let mut base_url = Url::parse(&config.url)
            .map_err(|e| AudienceError::Config(format!("invalid backend url '{}': {e}", config.url)))?;
        // Keep a trailing slash so relative joins append instead of replacing.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        // Timeouts are enforced per attempt by the service's request policy.
        let client = Client::builder()
            .user_agent(concat!("audience-studio/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AudienceError::Config(format!("failed to build HTTP client: {e}")))?;

        info!(url = %base_url, "Segment backend initialized (remote)");
        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> AudienceResult<Url> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| AudienceError::Config(format!("invalid endpoint '{path}': {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, url)
            .header(header::ACCEPT, "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.header("apikey", key).bearer_auth(key);
        }
        builder
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> AudienceResult<T> {
        let response = builder.send().await.map_err(transport_error)?;
        let response = check_status(response).await?;
        response.json::<T>().await.map_err(transport_error)
    }

    fn by_id(id: Uuid) -> Vec<(&'static str, String)> {
        vec![("id", format!("eq.{id}"))]
    }
}

fn transport_error(e: reqwest::Error) -> AudienceError {
    AudienceError::Backend(e.to_string())
}

/// Server-side failures stay retryable; client-side rejections do not.
async fn check_status(response: Response) -> AudienceResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    if status.is_server_error() {
        Err(AudienceError::Backend(format!("{status}: {message}")))
    } else {
        Err(AudienceError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl SegmentBackend for RestBackend {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn insert_segment(&self, segment: Segment) -> AudienceResult<Segment> {
        let url = self.endpoint(SEGMENTS_TABLE, &[])?;
        debug!(segment_id = %segment.id, "Inserting segment");
        let rows: Vec<Segment> = self
            .send(
                self.request(Method::POST, url)
                    .header("Prefer", "return=representation")
                    .json(&segment),
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AudienceError::Backend("insert returned no rows".to_string()))
    }

    async fn get_segment(&self, id: Uuid) -> AudienceResult<Option<Segment>> {
        let mut query = Self::by_id(id);
        query.push(("select", "*".to_string()));
        let url = self.endpoint(SEGMENTS_TABLE, &query)?;
        let rows: Vec<Segment> = self.send(self.request(Method::GET, url)).await?;
        Ok(rows.into_iter().next())
    }

    async fn list_segments(&self) -> AudienceResult<Vec<Segment>> {
        let url = self.endpoint(
            SEGMENTS_TABLE,
            &[("select", "*".to_string()), ("order", "created_at.desc".to_string())],
        )?;
        self.send(self.request(Method::GET, url)).await
    }

    async fn update_segment(&self, id: Uuid, update: SegmentUpdate) -> AudienceResult<Option<Segment>> {
        let mut body = serde_json::to_value(&update)?;
        if let Some(fields) = body.as_object_mut() {
            if let Some(name) = fields.get_mut("name") {
                if let Some(trimmed) = name.as_str().map(|s| s.trim().to_string()) {
                    *name = serde_json::Value::String(trimmed);
                }
            }
            fields.insert("updated_at".to_string(), serde_json::to_value(Utc::now())?);
        }
        let url = self.endpoint(SEGMENTS_TABLE, &Self::by_id(id))?;
        let rows: Vec<Segment> = self
            .send(
                self.request(Method::PATCH, url)
                    .header("Prefer", "return=representation")
                    .json(&body),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn delete_segment(&self, id: Uuid) -> AudienceResult<bool> {
        let url = self.endpoint(SEGMENTS_TABLE, &Self::by_id(id))?;
        let rows: Vec<serde_json::Value> = self
            .send(
                self.request(Method::DELETE, url)
                    .header("Prefer", "return=representation"),
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn count_matching(&self, criteria: &[Criterion]) -> AudienceResult<u64> {
        let url = self.endpoint(PREVIEW_RPC, &[])?;
        let body = serde_json::json!({ "conditions": criteria });
        let response: CountResponse = self.send(self.request(Method::POST, url).json(&body)).await?;
        Ok(response.count)
    }

    async fn matching_users(&self, criteria: &[Criterion], limit: usize) -> AudienceResult<Vec<UserRecord>> {
        let url = self.endpoint(MEMBERS_RPC, &[])?;
        let body = serde_json::json!({ "conditions": criteria, "limit": limit });
        self.send(self.request(Method::POST, url).json(&body)).await
    }

    async fn rfm_scores(&self) -> AudienceResult<Vec<String>> {
        let url = self.endpoint(
            USERS_TABLE,
            &[
                ("select", "rfm_score".to_string()),
                ("rfm_score", "not.is.null".to_string()),
            ],
        )?;
        let rows: Vec<RfmRow> = self.send(self.request(Method::GET, url)).await?;
        Ok(rows.into_iter().filter_map(|r| r.rfm_score).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(url: &str) -> RestBackend {
        RestBackend::new(&BackendConfig {
            url: url.to_string(),
            api_key: Some("anon-key".to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let b = backend("https://db.example.com/rest/v1");
        let id = Uuid::nil();
        let url = b.endpoint(SEGMENTS_TABLE, &RestBackend::by_id(id)).unwrap();
        assert_eq!(
            url.as_str(),
            "https://db.example.com/rest/v1/segments?id=eq.00000000-0000-0000-0000-000000000000"
        );

        let rpc = b.endpoint(PREVIEW_RPC, &[]).unwrap();
        assert_eq!(rpc.as_str(), "https://db.example.com/rest/v1/rpc/preview_segment");
    }

    #[test]
    fn test_filter_values_are_encoded() {
        let b = backend("https://db.example.com/rest/v1/");
        let url = b
            .endpoint(
                USERS_TABLE,
                &[
                    ("select", "rfm_score".to_string()),
                    ("rfm_score", "not.is.null".to_string()),
                ],
            )
            .unwrap();
        assert_eq!(url.query(), Some("select=rfm_score&rfm_score=not.is.null"));
    }

    #[test]
    fn test_invalid_url_is_config_error() {
        let result = RestBackend::new(&BackendConfig {
            url: "not a url".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(AudienceError::Config(_))));
    }
}
