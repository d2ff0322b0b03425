//! Pitchline Terminal Chat
//!
//! Line-oriented chat surface over the pitchline streaming pipeline.
//! Reads prompts from stdin, runs one turn at a time against the configured
//! inference endpoint, and prints each assistant message according to its
//! content type. Generated document artifacts are written to the working
//! directory.
//!
//! # Usage
//!
//! ```bash
//! # Default endpoint (http://localhost:5000/process_prompt)
//! pitchline
//!
//! # Against another deployment, with verbose logging
//! PITCHLINE_ENDPOINT=http://192.168.0.104:5000/process_prompt RUST_LOG=debug pitchline
//! ```
//!
//! # Environment Variables
//!
//! - `PITCHLINE_ENDPOINT`: inference endpoint URL
//! - `PITCHLINE_MODEL`: model identifier
//! - `PITCHLINE_MODE`: protocol variant (`discrete` | `accumulating`)
//! - `PITCHLINE_FORMAT`: output shape (`plain` | `table` | `document`)
//! - `PITCHLINE_WIRE`: request body (`prompt` | `chat`)
//! - `PITCHLINE_SYSTEM_PROMPT`: system prompt override
//! - `RUST_LOG`: log level (trace, debug, info, warn, error)
//!
//! A TOML config file at `~/.config/pitchline/pitchline.toml` is read
//! before the environment; see `pitchline_core::config`.

use std::io::Write;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use pitchline_core::{
    load_config, render, Block, ChatController, InferenceBackend, Message, PortalBackend,
    Rendered, SendOutcome, Sender, TableView,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pitchline=info".parse()?)
                .add_directive("pitchline_core=info".parse()?),
        )
        .with_target(true)
        .init();

    let config = load_config().context("Failed to load configuration")?;
    info!(endpoint = %config.endpoint, model = %config.model, mode = ?config.mode, "Starting pitchline chat");

    let backend = PortalBackend::new(config.endpoint.clone(), config.wire);
    if !backend.health_check().await {
        warn!(endpoint = %config.endpoint, "Endpoint not reachable - first turn may fail");
    }

    let mut controller = ChatController::new(backend, config);
    let mut printed = 0;

    println!("pitchline chat - type a prompt, /quit to exit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input == "/quit" || input == "/exit" {
            break;
        }

        if controller.send(&line).await == SendOutcome::Rejected {
            continue;
        }

        let messages = controller.conversation().messages();
        for message in &messages[printed..] {
            print_message(message);
        }
        printed = messages.len();
    }

    println!("Goodbye!");
    Ok(())
}

/// Print one message according to its rendered presentation. User messages
/// were typed by the user and are not echoed back.
fn print_message(message: &Message) {
    if message.sender == Sender::User {
        return;
    }

    match render(message) {
        Rendered::Lines(lines) => {
            for line in lines {
                println!("  {line}");
            }
        }
        Rendered::Image(src) => println!("  [image] {src}"),
        Rendered::Blocks(blocks) => {
            for block in blocks {
                match block {
                    Block::Text(line) => println!("  {line}"),
                    Block::Image(src) => println!("  [image] {src}"),
                }
            }
        }
        Rendered::FileLink { url, label } => println!("  [download {label}] {url}"),
        Rendered::Table(table) => print_table(&table),
        Rendered::Document { note, artifact } => {
            println!("  {note}");
            match std::fs::write(&artifact.file_name, &artifact.bytes) {
                Ok(()) => println!("  [saved {} ({})]", artifact.file_name, artifact.mime),
                Err(e) => {
                    warn!(error = %e, file = %artifact.file_name, "Failed to write artifact");
                    println!("  [could not save {}]", artifact.file_name);
                }
            }
        }
    }
}

/// Draw a table with columns padded to their widest cell.
fn print_table(table: &TableView) {
    let columns = table
        .headers
        .len()
        .max(table.rows.iter().map(Vec::len).max().unwrap_or(0));
    if columns == 0 {
        return;
    }

    let mut widths = vec![0usize; columns];
    for (i, cell) in table.headers.iter().enumerate() {
        widths[i] = widths[i].max(cell.len());
    }
    for row in &table.rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let print_row = |cells: &[String]| {
        let mut line = String::from("  |");
        for (i, &width) in widths.iter().enumerate() {
            let cell = cells.get(i).map_or("", String::as_str);
            line.push_str(&format!(" {cell:<width$} |"));
        }
        println!("{line}");
    };

    print_row(&table.headers);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    print_row(&rule);
    for row in &table.rows {
        print_row(row);
    }
}
