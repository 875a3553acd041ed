use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

/// The two calls the chat screen makes against the assistant backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Send one user message and return the assistant's reply text.
    async fn chat(&self, message: &str) -> Result<String>;

    /// Ask the backend to rebuild its knowledge base from source documents.
    async fn reprocess(&self) -> Result<()>;
}

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: normalize_base_url(base_url),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn chat(&self, message: &str) -> Result<String> {
        let url = self.endpoint("/api/chat");
        tracing::debug!(%url, chars = message.chars().count(), "sending chat message");

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { message })
            .send()
            .await
            .with_context(|| format!("Chat request to {} failed", url))?;

        if !response.status().is_success() {
            return Err(anyhow!("Chat request failed with status: {}", response.status()));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Chat response was not valid JSON")?;
        Ok(chat_response.response)
    }

    async fn reprocess(&self) -> Result<()> {
        let url = self.endpoint("/api/reprocess");
        tracing::debug!(%url, "requesting document reprocess");

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .with_context(|| format!("Reprocess request to {} failed", url))?;

        if !response.status().is_success() {
            return Err(anyhow!("Reprocess request failed with status: {}", response.status()));
        }

        // Body content is unused, but it still has to be JSON.
        let _: serde_json::Value = response
            .json()
            .await
            .context("Reprocess response was not valid JSON")?;
        Ok(())
    }
}

pub fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
