use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, TransportError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResponse {
    pub response: String,
    pub trace_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
}

/// The two calls the chat front end makes against its backend.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<ChatResponse>;

    async fn check_health(&self) -> Result<HealthStatus>;
}

/// HTTP implementation of [`ChatTransport`] for the FinAgent backend.
#[derive(Clone)]
pub struct ChatbotClient {
    client: Client,
    base_url: String,
}

impl ChatbotClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }

        response.json::<T>().await.map_err(TransportError::Decode)
    }
}

#[async_trait]
impl ChatTransport for ChatbotClient {
    async fn send_message(&self, text: &str) -> Result<ChatResponse> {
        let url = format!("{}/chat", self.base_url);

        let request = ChatRequest {
            message: text.to_string(),
            trace_id: None,
        };

        debug!(%url, "sending chat message");
        let result = match self.client.post(&url).json(&request).send().await {
            Ok(response) => Self::decode::<ChatResponse>(response).await,
            Err(e) => Err(TransportError::Request(e)),
        };

        if let Err(e) = &result {
            warn!(%url, error = %e, "error sending message");
        }
        result
    }

    async fn check_health(&self) -> Result<HealthStatus> {
        let url = format!("{}/health", self.base_url);

        let result = match self.client.get(&url).send().await {
            Ok(response) => Self::decode::<HealthStatus>(response).await,
            Err(e) => Err(TransportError::Request(e)),
        };

        if let Err(e) = &result {
            warn!(%url, error = %e, "error checking health");
        }
        result
    }
}
