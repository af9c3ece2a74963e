#![doc = "Publisher integration: implements the core `Publisher` trait against the dev.to (Forem) articles API."]
//
//! # dev.to client
//!
//! - Construct [`DevToClient`] from [`DevToSettings`]; the API key is sent as the
//!   `api-key` header on every request.
//! - `create_article` posts to `{api_base}/articles` and expects `201 Created`.
//! - `update_article` puts to `{api_base}/articles/{id}` and expects `200 OK`.
//! - Any other status becomes [`SyncError::RemoteApi`] carrying the raw response body.

use std::time::Duration;

use async_trait::async_trait;
use blogpost_sync_core::contract::{PublishedArticle, Publisher};
use blogpost_sync_core::payload::ArticleDocument;
use blogpost_sync_core::SyncError;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use crate::load_config::DevToSettings;

#[derive(Debug, Deserialize)]
struct ArticleResponse {
    slug: String,
    id: Value,
}

/// Check the status of an articles API response and extract the article identity.
pub fn parse_article_response(
    status: u16,
    expected: StatusCode,
    body: &str,
) -> Result<PublishedArticle, SyncError> {
    if status != expected.as_u16() {
        return Err(SyncError::RemoteApi {
            status,
            body: body.to_string(),
        });
    }
    let parsed: ArticleResponse = serde_json::from_str(body).map_err(|e| SyncError::Decode {
        path: "dev.to article response".to_string(),
        reason: e.to_string(),
    })?;
    let id = match parsed.id {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        other => {
            return Err(SyncError::Decode {
                path: "dev.to article response".to_string(),
                reason: format!("unexpected article id: {other}"),
            })
        }
    };
    Ok(PublishedArticle {
        slug: parsed.slug,
        id,
    })
}

pub struct DevToClient {
    http: reqwest::Client,
    api_base: String,
}

impl DevToClient {
    pub fn new(settings: &DevToSettings, timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(&settings.api_key)?;
        key.set_sensitive(true);
        headers.insert("api-key", key);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("blogpost-sync/", env!("CARGO_PKG_VERSION"))),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        tracing::info!(
            api_key_set = !settings.api_key.is_empty(),
            api_base = %settings.api_base,
            "Initialized DevToClient"
        );
        Ok(DevToClient {
            http,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Publisher for DevToClient {
    async fn create_article(&self, doc: &ArticleDocument) -> Result<PublishedArticle, SyncError> {
        let url = format!("{}/articles", self.api_base);
        tracing::info!(title = %doc.title, "Creating dev.to article");
        let response = self.http.post(&url).json(&doc.to_request_body()).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        match parse_article_response(status, StatusCode::CREATED, &body) {
            Ok(article) => {
                tracing::info!(slug = %article.slug, id = %article.id, "Article created");
                Ok(article)
            }
            Err(e) => {
                tracing::error!(status, error = %e, "API error creating article");
                Err(e)
            }
        }
    }

    async fn update_article(
        &self,
        article_id: &str,
        doc: &ArticleDocument,
    ) -> Result<PublishedArticle, SyncError> {
        let url = format!("{}/articles/{}", self.api_base, article_id);
        tracing::info!(article_id, title = %doc.title, "Updating dev.to article");
        let response = self.http.put(&url).json(&doc.to_request_body()).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        match parse_article_response(status, StatusCode::OK, &body) {
            Ok(article) => {
                tracing::info!(slug = %article.slug, id = %article.id, "Article updated");
                Ok(article)
            }
            Err(e) => {
                tracing::error!(status, article_id, error = %e, "API error updating article");
                Err(e)
            }
        }
    }
}
