//! Remote datastore reached over its REST API.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::{DataSource, SourceError};
use crate::db::{NewWebsite, Website};

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: String,
}

/// Client for the `/api/v1` datastore routes, authenticated with a bearer token.
pub struct ApiSource {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl ApiSource {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, SourceError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| SourceError::Config(format!("invalid datastore URL {:?}: {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SourceError::Config(format!(
                "unsupported datastore scheme: {}",
                parsed.scheme()
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            timeout,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, SourceError> {
        let resp = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let message = resp.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SourceError::Auth(message)),
            _ => Err(SourceError::Api {
                status: status.as_u16(),
                message,
            }),
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> SourceError {
        if e.is_timeout() {
            SourceError::Timeout(self.timeout)
        } else if e.is_decode() {
            SourceError::Decode(e.to_string())
        } else {
            SourceError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl DataSource for ApiSource {
    async fn list_websites(&self) -> Result<Vec<Website>, SourceError> {
        let resp = self
            .send(self.client.get(self.endpoint("/api/v1/websites")))
            .await?;
        resp.json::<Vec<Website>>()
            .await
            .map_err(|e| self.transport_error(e))
    }

    async fn create_website(&self, website: &NewWebsite) -> Result<String, SourceError> {
        let resp = self
            .send(self.client.post(self.endpoint("/api/v1/website")).json(website))
            .await?;
        let created = resp
            .json::<CreatedResponse>()
            .await
            .map_err(|e| self.transport_error(e))?;
        Ok(created.id)
    }
}
