use super::{NoTokenProvider, RecognitionClient, StaticTokenProvider, TokenProvider};
use crate::config::{AuthConfig, RecognitionConfig};
use crate::error::{FacewatchError, RecognitionError, Result};
use crate::frame::EncodedFrame;
use crate::person::{RecognitionOutcome, RecognitionResponse};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Body of a frame recognition request
#[derive(Debug, Serialize)]
pub struct RecognizeRequest {
    pub image_data: String,
}

/// Error body the service may send with a non-2xx status
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Recognition client talking JSON over HTTP
pub struct HttpRecognitionClient {
    http: Client,
    endpoint: String,
    auth_scheme: String,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpRecognitionClient {
    pub fn builder() -> HttpRecognitionClientBuilder {
        HttpRecognitionClientBuilder::new()
    }

    /// Full URL requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn failure_from_response(response: reqwest::Response) -> RecognitionError {
        let status = response.status();
        let message = match response.text().await {
            Ok(body) => serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .filter(|m| !m.trim().is_empty()),
            Err(e) => {
                debug!("Failed to read error body: {}", e);
                None
            }
        };

        if status == StatusCode::UNAUTHORIZED {
            RecognitionError::Unauthorized { message }
        } else {
            RecognitionError::Transport {
                status: Some(status.as_u16()),
                message,
            }
        }
    }
}

#[async_trait]
impl RecognitionClient for HttpRecognitionClient {
    async fn recognize(
        &self,
        frame: &EncodedFrame,
    ) -> std::result::Result<RecognitionOutcome, RecognitionError> {
        debug!(
            "Submitting frame {} ({} bytes) to {}",
            frame.id,
            frame.size(),
            self.endpoint
        );

        let body = RecognizeRequest {
            image_data: frame.to_data_url(),
        };

        let mut request = self.http.post(&self.endpoint).json(&body);
        match self.tokens.token() {
            Some(token) => {
                request = request.header(
                    reqwest::header::AUTHORIZATION,
                    format!("{} {}", self.auth_scheme, token),
                );
            }
            None => debug!("No auth token available, sending request without Authorization"),
        }

        let response = request.send().await.map_err(|e| {
            warn!("Recognition request failed: {}", e);
            RecognitionError::Transport {
                status: e.status().map(|s| s.as_u16()),
                message: None,
            }
        })?;

        if !response.status().is_success() {
            return Err(Self::failure_from_response(response).await);
        }

        let parsed: RecognitionResponse =
            response
                .json()
                .await
                .map_err(|e| RecognitionError::Decode {
                    details: e.to_string(),
                })?;

        Ok(parsed.into())
    }
}

/// Builder for the HTTP recognition client
pub struct HttpRecognitionClientBuilder {
    config: Option<RecognitionConfig>,
    auth_scheme: String,
    tokens: Option<Arc<dyn TokenProvider>>,
}

impl HttpRecognitionClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: None,
            auth_scheme: "Token".to_string(),
            tokens: None,
        }
    }

    /// Set the recognition endpoint configuration
    pub fn config(mut self, config: RecognitionConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Take scheme and static token from the auth configuration
    pub fn auth(mut self, auth: &AuthConfig) -> Self {
        self.auth_scheme = auth.scheme.clone();
        if let Some(token) = auth.token.as_ref().filter(|t| !t.is_empty()) {
            self.tokens = Some(Arc::new(StaticTokenProvider::new(token.clone())));
        }
        self
    }

    /// Set the token provider
    pub fn token_provider(mut self, tokens: Arc<dyn TokenProvider>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<HttpRecognitionClient> {
        let config = self.config.ok_or_else(|| {
            FacewatchError::component("recognition_client_builder", "Config is required")
        })?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .build()
            .map_err(|e| RecognitionError::Client {
                details: e.to_string(),
            })?;

        let endpoint = format!(
            "{}{}",
            config.base_url.trim_end_matches('/'),
            config.recognize_path
        );

        Ok(HttpRecognitionClient {
            http,
            endpoint,
            auth_scheme: self.auth_scheme,
            tokens: self
                .tokens
                .unwrap_or_else(|| Arc::new(NoTokenProvider) as Arc<dyn TokenProvider>),
        })
    }
}

impl Default for HttpRecognitionClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
