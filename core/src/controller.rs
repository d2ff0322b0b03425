//! Conversation Controller
//!
//! Orchestrates one turn at a time: user input → outbound request →
//! inbound stream → assembled conversation state. The controller owns the
//! [`Conversation`] exclusively; surfaces read it between turns and render
//! it with [`crate::render`].
//!
//! Per-turn state machine: Idle → Sending → Streaming → Finalizing → Idle.
//! Any failure collapses into a synthetic assistant error message and the
//! controller returns to Idle; prior finalized messages are never touched
//! and the next turn is never blocked. There is no cancellation: a turn in
//! flight runs to its terminal signal.

use std::sync::Arc;

use crate::backend::{InferenceBackend, PromptRequest, StreamSignal};
use crate::config::ChatConfig;
use crate::conversation::{ContentType, Conversation};

/// Observable phase of the active turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TurnPhase {
    /// Awaiting input.
    #[default]
    Idle,
    /// User message appended, request going out.
    Sending,
    /// Response records arriving.
    Streaming,
    /// Stream ended, in-progress message being closed out.
    Finalizing,
}

/// Result of a send attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// The turn ran to completion (possibly resolving in an error message).
    Completed,
    /// The attempt was a no-op: empty input, or a turn already in flight.
    Rejected,
}

/// Fixed user-visible template for terminal turn errors.
pub fn error_text(detail: &str) -> String {
    format!("Sorry, I encountered an error: {detail}. Please try again.")
}

/// Drives send → stream → assemble for a single conversation.
pub struct ChatController<B: InferenceBackend> {
    config: ChatConfig,
    backend: Arc<B>,
    conversation: Conversation,
    phase: TurnPhase,
}

impl<B: InferenceBackend> ChatController<B> {
    /// Create a controller over the given backend.
    pub fn new(backend: B, config: ChatConfig) -> Self {
        Self {
            config,
            backend: Arc::new(backend),
            conversation: Conversation::new(),
            phase: TurnPhase::Idle,
        }
    }

    /// The conversation state, oldest message first.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Current phase of the active turn.
    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Whether a turn is in flight.
    pub fn is_loading(&self) -> bool {
        self.phase != TurnPhase::Idle
    }

    /// The active configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Run one full turn for the given input.
    ///
    /// Rejected (no state mutation) when input is empty or whitespace-only,
    /// or when a turn is already loading. Otherwise the turn runs to its
    /// terminal signal; errors resolve into a synthetic assistant message
    /// rather than propagating.
    pub async fn send(&mut self, input: &str) -> SendOutcome {
        if self.is_loading() || input.trim().is_empty() {
            return SendOutcome::Rejected;
        }

        self.phase = TurnPhase::Sending;
        self.conversation.push_user(input);
        self.conversation.begin_assistant_turn();

        let mut request =
            PromptRequest::new(input, &self.config.model).with_format(self.config.format);
        if let Some(ref system) = self.config.system_prompt {
            request = request.with_system(system.clone());
        }

        match self.backend.send_streaming(&request).await {
            Ok(rx) => {
                self.phase = TurnPhase::Streaming;
                self.drain_stream(rx).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Request failed before streaming");
                self.conversation.fail_turn(error_text(&e.to_string()));
            }
        }

        self.phase = TurnPhase::Idle;
        SendOutcome::Completed
    }

    /// Pull signals until the terminal one, applying records in arrival
    /// order. A channel that closes without a terminal signal finalizes
    /// whatever arrived.
    async fn drain_stream(&mut self, mut rx: tokio::sync::mpsc::Receiver<StreamSignal>) {
        while let Some(signal) = rx.recv().await {
            match signal {
                StreamSignal::Record(record) => {
                    self.conversation.apply_record(record, self.config.mode);
                }
                StreamSignal::Complete => {
                    self.phase = TurnPhase::Finalizing;
                    self.conversation.finalize_turn_as(self.final_content_type());
                    return;
                }
                StreamSignal::Error(detail) => {
                    tracing::warn!(error = %detail, "Stream failed mid-turn");
                    self.phase = TurnPhase::Finalizing;
                    self.conversation.fail_turn(error_text(&detail));
                    return;
                }
            }
        }

        self.phase = TurnPhase::Finalizing;
        self.conversation.finalize_turn_as(self.final_content_type());
    }

    /// Document-format turns retag the accumulated markdown placeholder as
    /// a downloadable `pdf-link` message at finalization.
    fn final_content_type(&self) -> Option<ContentType> {
        (self.config.format == crate::backend::OutputFormat::Document)
            .then_some(ContentType::PdfLink)
    }
}
