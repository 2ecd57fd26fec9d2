//! Remote service seam.
//!
//! The cache core only ever sees `invoke`: endpoint resolution, wire format
//! and credential attachment all live behind it, so tests swap in scripted
//! transports and the core never touches a socket.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

use crate::api::ops::{HttpMethod, Request};
use crate::config::Config;
use crate::error::ApiError;

/// Single capability the core consumes from the transport layer.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn invoke(&self, request: Request) -> Result<Value, ApiError>;
}

/// Opaque supplier of the bearer credential attached to requests.
/// `None` sends the request unauthenticated.
pub trait CredentialSource: Send + Sync {
  fn token(&self) -> Option<String>;
}

/// Reads the token from `TABLAB_API_TOKEN` on every request, so a rotated
/// token is picked up without rebuilding the client.
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
  fn token(&self) -> Option<String> {
    Config::api_token()
  }
}

/// Fixed token, mainly for tests and short-lived tools.
pub struct StaticToken(pub String);

impl CredentialSource for StaticToken {
  fn token(&self) -> Option<String> {
    Some(self.0.clone())
  }
}

/// HTTP transport against the workbench server.
pub struct HttpTransport {
  http: reqwest::Client,
  base: Url,
  credentials: Arc<dyn CredentialSource>,
}

impl HttpTransport {
  pub fn new(base: Url, credentials: Arc<dyn CredentialSource>) -> Self {
    Self {
      http: reqwest::Client::new(),
      base,
      credentials,
    }
  }

  pub fn from_config(config: &Config) -> Result<Self, ApiError> {
    let base = Url::parse(&config.server.url)
      .map_err(|e| ApiError::Transport(format!("invalid server url {}: {e}", config.server.url)))?;
    Ok(Self::new(base, Arc::new(EnvCredentials)))
  }

  fn build_url(&self, request: &Request) -> Result<Url, ApiError> {
    let mut url = self
      .base
      .join(request.path)
      .map_err(|e| ApiError::Transport(format!("invalid request path {}: {e}", request.path)))?;
    if !request.params.is_empty() {
      url
        .query_pairs_mut()
        .extend_pairs(request.params.iter().map(|(k, v)| (*k, v.as_str())));
    }
    Ok(url)
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn invoke(&self, request: Request) -> Result<Value, ApiError> {
    let url = self.build_url(&request)?;
    let mut builder = match request.method {
      HttpMethod::Get => self.http.get(url),
      HttpMethod::Post => self.http.post(url),
      HttpMethod::Put => self.http.put(url),
      HttpMethod::Delete => self.http.delete(url),
    };
    if let Some(token) = self.credentials.token() {
      builder = builder.bearer_auth(token);
    }
    if let Some(body) = &request.body {
      builder = builder.json(body);
    }

    let response = builder
      .send()
      .await
      .map_err(|e| ApiError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
      let message = response.text().await.unwrap_or_default();
      return Err(ApiError::Rejected { status: status.as_u16(), message });
    }

    response
      .json()
      .await
      .map_err(|e| ApiError::Decode(e.to_string()))
  }
}
