//! Portal HTTP Backend
//!
//! Talks to the locally hosted inference endpoint over HTTP. The request is
//! a single JSON `POST`; the response body is consumed chunk by chunk and
//! fed through the [`LineDecoder`], with decoded records pushed over an
//! mpsc channel so the controller can pull them at its own pace.

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;

use super::traits::{InferenceBackend, PromptRequest, StreamSignal};
use crate::decoder::LineDecoder;

/// Which JSON body shape to send.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WireBody {
    /// `{"prompt": <text>}` — what the portal endpoint accepts.
    #[default]
    Prompt,
    /// `{model, messages: [...]}` — chat-completion-style deployments.
    ChatCompletion,
}

impl WireBody {
    /// Parse a wire-body name as used in config files.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "prompt" => Some(Self::Prompt),
            "chat" | "chat-completion" => Some(Self::ChatCompletion),
            _ => None,
        }
    }
}

/// HTTP client for the portal inference endpoint.
#[derive(Clone)]
pub struct PortalBackend {
    endpoint: String,
    wire: WireBody,
    http_client: reqwest::Client,
}

impl PortalBackend {
    /// Default endpoint of a locally hosted portal server.
    pub const DEFAULT_ENDPOINT: &'static str = "http://localhost:5000/process_prompt";

    /// Create a backend for the given endpoint URL.
    pub fn new(endpoint: impl Into<String>, wire: WireBody) -> Self {
        Self {
            endpoint: endpoint.into(),
            wire,
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// The configured endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Origin of the endpoint (scheme + authority), used for health checks.
    fn base_url(&self) -> &str {
        let Some(scheme_end) = self.endpoint.find("://") else {
            return &self.endpoint;
        };
        match self.endpoint[scheme_end + 3..].find('/') {
            Some(path_start) => &self.endpoint[..scheme_end + 3 + path_start],
            None => &self.endpoint,
        }
    }
}

impl Default for PortalBackend {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ENDPOINT, WireBody::default())
    }
}

#[async_trait::async_trait]
impl InferenceBackend for PortalBackend {
    fn name(&self) -> &str {
        "Portal"
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(self.base_url())
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .is_ok()
    }

    async fn send_streaming(
        &self,
        request: &PromptRequest,
    ) -> anyhow::Result<mpsc::Receiver<StreamSignal>> {
        let (tx, rx) = mpsc::channel(100);

        let body = match self.wire {
            WireBody::Prompt => request.prompt_payload(),
            WireBody::ChatCompletion => request.chat_payload(),
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Endpoint returned {status}: {body}");
        }

        let mut stream = response.bytes_stream();

        tokio::spawn(async move {
            let mut decoder = LineDecoder::new();

            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        for record in decoder.feed(&bytes) {
                            if tx.send(StreamSignal::Record(record)).await.is_err() {
                                // Receiver dropped, stop streaming
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(StreamSignal::Error(e.to_string())).await;
                        return;
                    }
                }
            }

            if let Some(record) = decoder.finish() {
                if tx.send(StreamSignal::Record(record)).await.is_err() {
                    return;
                }
            }
            let _ = tx.send(StreamSignal::Complete).await;
        });

        Ok(rx)
    }
}
