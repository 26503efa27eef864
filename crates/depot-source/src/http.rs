//! Remote source speaking a static JSON index over HTTP(S).
//!
//! The index mirrors the on-disk layout of [`crate::local::LocalSource`]:
//! `{base}/{id}/{version}/metadata.json` for metadata and
//! `{base}/{id}/versions.json` for a JSON array of version strings.
//! A 404 on either is "not found", not an error.

use std::time::Duration;

use async_trait::async_trait;
use depot_core::package::PackageMetadata;
use depot_util::errors::DepotError;
use reqwest::{Client, StatusCode};

use crate::source::{normalize_versions, validate_id, PackageSource, SourceError};

/// Build a shared reqwest client for index requests.
pub fn build_client() -> miette::Result<Client> {
    Client::builder()
        .user_agent(concat!("depot/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            DepotError::Network {
                message: format!("Failed to create HTTP client: {e}"),
            }
            .into()
        })
}

#[derive(Debug, Clone)]
pub struct HttpSource {
    name: String,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
    client: Client,
}

impl HttpSource {
    pub fn new(name: &str, base_url: &str, timeout: Duration, client: Client) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            timeout,
            client,
        }
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn metadata_url(&self, id: &str, version: &str) -> String {
        format!("{}/{id}/{version}/metadata.json", self.base_url)
    }

    pub fn versions_url(&self, id: &str) -> String {
        format!("{}/{id}/versions.json", self.base_url)
    }

    /// GET `url`, returning the body or `None` on 404.
    async fn fetch_text(&self, url: &str) -> Result<Option<String>, SourceError> {
        let mut req = self.client.get(url).timeout(self.timeout);
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(|e| self.request_err(url, e))?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SourceError::Network {
                source_name: self.name.clone(),
                message: format!("HTTP {status} fetching {url}"),
            });
        }

        let body = resp.text().await.map_err(|e| self.request_err(url, e))?;
        Ok(Some(body))
    }

    fn request_err(&self, url: &str, e: reqwest::Error) -> SourceError {
        if e.is_timeout() {
            SourceError::Timeout {
                source_name: self.name.clone(),
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else {
            SourceError::Network {
                source_name: self.name.clone(),
                message: format!("Request to {url} failed: {e}"),
            }
        }
    }

    fn parse_err(&self, url: &str, e: serde_json::Error) -> SourceError {
        SourceError::Parse {
            source_name: self.name.clone(),
            message: format!("{url}: {e}"),
        }
    }
}

#[async_trait]
impl PackageSource for HttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn get_metadata(
        &self,
        id: &str,
        version: &str,
    ) -> Result<Option<PackageMetadata>, SourceError> {
        validate_id(&self.name, id)?;
        validate_id(&self.name, version)?;
        let url = self.metadata_url(id, version);
        let Some(body) = self.fetch_text(&url).await? else {
            return Ok(None);
        };
        let meta = PackageMetadata::from_json(&body).map_err(|e| self.parse_err(&url, e))?;
        Ok(Some(meta))
    }

    async fn get_versions(
        &self,
        id: &str,
        include_prerelease: bool,
    ) -> Result<Vec<String>, SourceError> {
        validate_id(&self.name, id)?;
        let url = self.versions_url(id);
        let Some(body) = self.fetch_text(&url).await? else {
            return Ok(Vec::new());
        };
        let versions: Vec<String> =
            serde_json::from_str(&body).map_err(|e| self.parse_err(&url, e))?;
        Ok(normalize_versions(versions, include_prerelease))
    }
}
