//! Content Renderer
//!
//! Pure mapping from a message's content type and payload to a presentation
//! structure. No state, no side effects: surfaces decide how to draw a
//! [`Rendered`] value (terminal table, HTML, ...), the mapping itself is
//! identical everywhere.

use crate::conversation::{now_ms, ContentType, Message};
use crate::protocol::basename;

/// MIME type of generated document artifacts.
pub const MARKDOWN_MIME: &str = "text/markdown";

/// Note shown alongside a generated document download.
pub const DOCUMENT_READY_NOTE: &str = "Your generated document is ready to download.";

/// Presentation structure for one message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rendered {
    /// Literal lines of text, joined by explicit line breaks.
    Lines(Vec<String>),
    /// Single image source, rendered directly.
    Image(String),
    /// Mixed text and image lines from a sniffed multi-line payload.
    Blocks(Vec<Block>),
    /// Labeled download link for a file reference.
    FileLink {
        /// Link target.
        url: String,
        /// Display label, e.g. the filename.
        label: String,
    },
    /// Structured table, headers first.
    Table(TableView),
    /// Explanatory note plus a generated downloadable document.
    Document {
        /// Text shown next to the download.
        note: String,
        /// The artifact a surface can offer for download.
        artifact: DownloadArtifact,
    },
}

/// One line of a sniffed image payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    /// A plain text line.
    Text(String),
    /// A line classified as an image reference.
    Image(String),
}

/// Parsed table structure.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableView {
    /// Header cells from the first row.
    pub headers: Vec<String>,
    /// Data rows, in payload order.
    pub rows: Vec<Vec<String>>,
}

/// A client-local downloadable artifact.
///
/// Carries the document bytes, MIME type, and a generated filename;
/// the surface decides how to materialize it (the CLI writes it to disk).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadArtifact {
    /// Generated filename, `response-<timestamp-ms>.md` for documents.
    pub file_name: String,
    /// MIME type of the content.
    pub mime: &'static str,
    /// Raw artifact bytes.
    pub bytes: Vec<u8>,
}

/// Map a message to its presentation. Total over all content types.
pub fn render(message: &Message) -> Rendered {
    match message.content_type {
        ContentType::Text => Rendered::Lines(split_lines(&message.payload)),
        ContentType::Image => render_image(&message.payload),
        ContentType::File => Rendered::FileLink {
            url: message.payload.clone(),
            label: message
                .meta
                .clone()
                .unwrap_or_else(|| basename(&message.payload)),
        },
        ContentType::Table => Rendered::Table(parse_table(&message.payload)),
        ContentType::PdfLink => Rendered::Document {
            note: DOCUMENT_READY_NOTE.to_string(),
            artifact: markdown_artifact(&message.payload),
        },
    }
}

/// Render an image payload.
///
/// A single-line payload is itself the image source. A multi-line payload
/// comes from the sniffing protocol variant: each line is classified
/// individually, image lines render as images, the rest as text.
fn render_image(payload: &str) -> Rendered {
    let lines = split_lines(payload);
    if lines.len() <= 1 {
        return Rendered::Image(payload.to_string());
    }
    Rendered::Blocks(
        lines
            .into_iter()
            .map(|line| {
                if looks_like_image(&line) {
                    Block::Image(line)
                } else {
                    Block::Text(line)
                }
            })
            .collect(),
    )
}

/// Heuristic image-line classifier, preserved from the upstream contract:
/// a line is an image reference if it is a data URI, ends in a known image
/// extension, or contains the substring `image`. The substring rule
/// misclassifies ordinary prose containing that word; it is kept as-is
/// until the protocol settles.
pub fn looks_like_image(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.starts_with("data:image/") {
        return true;
    }
    let lower = trimmed.to_ascii_lowercase();
    const EXTENSIONS: [&str; 7] = [".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".bmp"];
    if EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return true;
    }
    lower.contains("image")
}

/// Parse delimiter-separated table rows; the first row holds the headers.
///
/// Two conventions are supported: plain CSV, and markdown-style pipe tables
/// whose dash separator row is skipped. Pipe mode wins whenever any row
/// contains a `|`.
pub fn parse_table(payload: &str) -> TableView {
    let lines: Vec<&str> = payload.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return TableView::default();
    }

    let pipe_mode = lines.iter().any(|l| l.contains('|'));
    let mut parsed: Vec<Vec<String>> = Vec::new();

    for line in lines {
        if pipe_mode {
            if is_pipe_separator(line) {
                continue;
            }
            let trimmed = line.trim().trim_matches('|');
            parsed.push(trimmed.split('|').map(|c| c.trim().to_string()).collect());
        } else {
            parsed.push(line.split(',').map(str::to_string).collect());
        }
    }

    let mut parsed = parsed.into_iter();
    let headers = parsed.next().unwrap_or_default();
    TableView {
        headers,
        rows: parsed.collect(),
    }
}

/// A markdown table separator row: only pipes, dashes, colons, whitespace,
/// with at least one dash.
fn is_pipe_separator(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.contains('-')
        && trimmed
            .chars()
            .all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

/// Package a markdown response body as a downloadable artifact with the
/// generated `response-<timestamp-ms>.md` filename.
pub fn markdown_artifact(payload: &str) -> DownloadArtifact {
    DownloadArtifact {
        file_name: format!("response-{}.md", now_ms()),
        mime: MARKDOWN_MIME,
        bytes: payload.as_bytes().to_vec(),
    }
}

fn split_lines(payload: &str) -> Vec<String> {
    payload.split('\n').map(str::to_string).collect()
}
