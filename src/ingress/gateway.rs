//! Gateway admin API client.
//!
//! # Endpoints
//! - `PUT {url}/apis/{api_id}`: create or replace a definition
//! - `DELETE {url}/apis/{api_id}`: remove a definition (404 is fine)
//! - `POST {url}/reload`: apply pending changes
//!
//! Every request carries the shared secret in `x-gateway-authorization`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::GatewayConfig;

pub const AUTH_HEADER: &str = "x-gateway-authorization";

/// The gateway's unit of routing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDefinition {
    pub api_id: String,
    pub name: String,
    pub listen_path: String,
    pub target_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub active: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("gateway answered {status} to {action}: {body}")]
    Status {
        action: String,
        status: StatusCode,
        body: String,
    },

    #[error("invalid gateway URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Operations the reconciler needs from the gateway.
#[async_trait]
pub trait GatewayApi: Send + Sync {
    async fn upsert(&self, definition: &ApiDefinition) -> Result<(), GatewayError>;

    async fn delete(&self, api_id: &str) -> Result<(), GatewayError>;

    async fn reload(&self) -> Result<(), GatewayError>;
}

/// `GatewayApi` over HTTP.
pub struct HttpGateway {
    client: reqwest::Client,
    base: Url,
    secret: String,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        // Url::join drops the last path segment unless it ends with '/'.
        let mut base = config.url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            client,
            base,
            secret: config.secret.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        Ok(self.base.join(path)?)
    }
}

#[async_trait]
impl GatewayApi for HttpGateway {
    async fn upsert(&self, definition: &ApiDefinition) -> Result<(), GatewayError> {
        let url = self.endpoint(&format!("apis/{}", definition.api_id))?;
        let response = self
            .client
            .put(url)
            .header(AUTH_HEADER, &self.secret)
            .json(definition)
            .send()
            .await?;
        check(&format!("upsert {}", definition.api_id), response, false).await
    }

    async fn delete(&self, api_id: &str) -> Result<(), GatewayError> {
        let url = self.endpoint(&format!("apis/{api_id}"))?;
        let response = self
            .client
            .delete(url)
            .header(AUTH_HEADER, &self.secret)
            .send()
            .await?;
        check(&format!("delete {api_id}"), response, true).await
    }

    async fn reload(&self) -> Result<(), GatewayError> {
        let url = self.endpoint("reload")?;
        let response = self
            .client
            .post(url)
            .header(AUTH_HEADER, &self.secret)
            .send()
            .await?;
        check("reload", response, false).await
    }
}

async fn check(
    action: &str,
    response: reqwest::Response,
    tolerate_missing: bool,
) -> Result<(), GatewayError> {
    let status = response.status();
    if status.is_success() || (tolerate_missing && status == StatusCode::NOT_FOUND) {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::Status {
        action: action.to_string(),
        status,
        body,
    })
}
