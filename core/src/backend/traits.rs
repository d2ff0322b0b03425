//! Inference Backend Traits
//!
//! Trait definitions for the inference endpoint. The controller only sees
//! this abstraction, so tests can drive whole turns against a mock and the
//! HTTP transport stays swappable.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::protocol::StreamRecord;

/// Events delivered over a streaming response channel.
///
/// Decoded records arrive in wire order; the channel carries exactly one
/// terminal signal (`Complete` or `Error`) per turn and closes after it.
#[derive(Clone, Debug)]
pub enum StreamSignal {
    /// One decoded record from the response body.
    Record(StreamRecord),
    /// The response body ended normally.
    Complete,
    /// The request or stream failed; detail is user-surfaceable.
    Error(String),
}

/// Desired shape of the assistant's output, selecting the system prompt
/// sent with chat-completion-style requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Clear, concise plain text.
    #[default]
    Plain,
    /// Text plus a markdown table summarizing key figures.
    TableSummary,
    /// Rich markdown suitable for PDF conversion.
    Document,
}

impl OutputFormat {
    /// Parse a format name as used in config files and environment variables.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "plain" | "text" => Some(Self::Plain),
            "table" | "table-summary" => Some(Self::TableSummary),
            "document" | "pdf" => Some(Self::Document),
            _ => None,
        }
    }

    /// The system prompt requesting this output shape.
    pub fn system_prompt(self) -> &'static str {
        match self {
            Self::Plain => "You are a helpful assistant that responds in clear, concise text.",
            Self::TableSummary => {
                "You are a helpful assistant. Respond in clear text and include a markdown \
                 table summarizing the key figures."
            }
            Self::Document => {
                "You are a helpful assistant. Respond in rich markdown with headings and \
                 sections, suitable for conversion to PDF."
            }
        }
    }
}

/// One outbound prompt to the inference endpoint.
#[derive(Clone, Debug)]
pub struct PromptRequest {
    /// The user's text.
    pub prompt: String,
    /// Model identifier for chat-completion-style payloads.
    pub model: String,
    /// Desired output shape.
    pub format: OutputFormat,
    /// Explicit system prompt, overriding the format's default.
    pub system: Option<String>,
}

impl PromptRequest {
    /// Create a request with prompt and model.
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            format: OutputFormat::default(),
            system: None,
        }
    }

    /// Set the output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Override the system prompt.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Effective system prompt: the explicit override when set, otherwise
    /// the format's default.
    pub fn system_prompt(&self) -> &str {
        self.system
            .as_deref()
            .unwrap_or_else(|| self.format.system_prompt())
    }

    /// The minimal wire body: `{"prompt": <text>}`.
    pub fn prompt_payload(&self) -> serde_json::Value {
        serde_json::json!({ "prompt": self.prompt })
    }

    /// The chat-completion-style wire body with system and user messages.
    pub fn chat_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": self.system_prompt() },
                { "role": "user", "content": self.prompt },
            ],
        })
    }
}

/// Inference endpoint abstraction.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Whether the endpoint is reachable.
    async fn health_check(&self) -> bool;

    /// Send a prompt and stream the response.
    ///
    /// Returns a channel receiver delivering [`StreamSignal`]s as the body
    /// arrives; the channel closes after the terminal signal.
    async fn send_streaming(
        &self,
        request: &PromptRequest,
    ) -> anyhow::Result<mpsc::Receiver<StreamSignal>>;
}
