//! Pitchline Core - Streaming Chat Pipeline
//!
//! This crate implements the client side of the pitchline marketing
//! assistant's chat: the wire protocol spoken by the locally hosted
//! inference endpoint, the incremental message-assembly state machine, the
//! content-type rendering contract, and the per-turn controller that ties
//! them together. It is completely independent of any UI framework and can
//! drive a terminal surface, a web view, or run headless in tests.
//!
//! # Architecture
//!
//! ```text
//! user input
//!     │
//!     ▼
//! ┌─────────────────┐   POST {"prompt"}   ┌────────────────────┐
//! │ ChatController  │────────────────────▶│ Inference endpoint │
//! │  (one turn at   │                     │ (external server)  │
//! │   a time)       │◀────────────────────│  NDJSON response   │
//! └───────┬─────────┘   byte chunks       └────────────────────┘
//!         │
//!         │ LineDecoder → StreamRecord → Conversation (assembly)
//!         ▼
//! ┌─────────────────┐
//! │ render()        │  pure mapping: message → Lines / Image /
//! │                 │  FileLink / Table / Document
//! └─────────────────┘
//! ```
//!
//! Data flows one direction per turn; the conversation is append-only
//! except for the single in-progress assistant message of the active turn.
//!
//! # Module Overview
//!
//! - [`protocol`]: wire-level record types and per-line parsing
//! - [`decoder`]: chunk-boundary-safe NDJSON decoding
//! - [`conversation`]: conversation state and message assembly
//! - [`render`]: pure content-type → presentation mapping
//! - [`backend`]: inference endpoint abstraction (HTTP transport + trait)
//! - [`controller`]: per-turn orchestration state machine
//! - [`config`]: layered TOML + environment configuration

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod config;
pub mod controller;
pub mod conversation;
pub mod decoder;
pub mod protocol;
pub mod render;

// Re-exports for convenience
pub use backend::{
    InferenceBackend, OutputFormat, PortalBackend, PromptRequest, StreamSignal, WireBody,
};
pub use config::{default_config_path, load_config, load_config_from_path, ChatConfig, ConfigError};
pub use controller::{error_text, ChatController, SendOutcome, TurnPhase};
pub use conversation::{ContentType, Conversation, Message, MessageId, Sender};
pub use decoder::LineDecoder;
pub use protocol::{ProtocolMode, RecordKind, StreamRecord};
pub use render::{render, Block, DownloadArtifact, Rendered, TableView};
