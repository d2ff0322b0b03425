//! Wire Protocol
//!
//! The inference endpoint answers with a newline-delimited sequence of JSON
//! objects (NDJSON-like, not strictly validated). Two shapes exist in the
//! wild and both must be supported:
//!
//! - Typed: `{"message": {"type": "text"|"image"|"file"|"table", "content": "..."}}`
//! - Untyped: `{"message": {"content": "..."}}` — treated as plain text.
//!
//! Lines that fail to parse are skipped and logged; they never abort the
//! stream. Lines with an unrecognized `type` are dropped without a record.

use serde::Deserialize;

/// Which protocol variant the deployment speaks.
///
/// This is configured per deployment, never auto-detected: the two variants
/// are indistinguishable on the wire for text-only responses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProtocolMode {
    /// Every recognized record becomes its own finalized message.
    Discrete,
    /// All records concatenate into one growing assistant message.
    #[default]
    Accumulating,
}

impl ProtocolMode {
    /// Parse a mode name as used in config files and environment variables.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "discrete" => Some(Self::Discrete),
            "accumulating" => Some(Self::Accumulating),
            _ => None,
        }
    }
}

/// Content kind carried by a single stream record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    /// Plain incremental text.
    Text,
    /// Image reference (URL or data URI).
    Image,
    /// Downloadable file reference (URL).
    File,
    /// Delimiter-separated table data.
    Table,
}

impl RecordKind {
    fn from_wire(kind: &str) -> Option<Self> {
        match kind {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "file" => Some(Self::File),
            "table" => Some(Self::Table),
            _ => None,
        }
    }
}

/// One decoded unit of the response stream.
///
/// Constructed from a single NDJSON line, consumed immediately by the
/// message assembler, then discarded. Never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamRecord {
    /// What the content represents.
    pub kind: RecordKind,
    /// Raw textual content (text body, URL, data URI, or table rows).
    pub content: String,
    /// Display filename for file records, derived from the URL.
    pub file_name: Option<String>,
}

impl StreamRecord {
    /// Build a plain text record.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: RecordKind::Text,
            content: content.into(),
            file_name: None,
        }
    }

    /// Parse one line of the response body.
    ///
    /// Returns `None` for empty lines, malformed JSON, unknown types, and
    /// lines without content. All of these are non-fatal skips.
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let wire: WireLine = match serde_json::from_str(line) {
            Ok(wire) => wire,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping malformed stream line");
                return None;
            }
        };

        let message = wire.message?;
        let content = message.content?;

        let kind = match message.kind {
            // Untyped variant: content alone is implicit incremental text.
            None => RecordKind::Text,
            Some(ref kind) => match RecordKind::from_wire(kind) {
                Some(kind) => kind,
                None => {
                    tracing::trace!(kind = %kind, "Ignoring unknown record type");
                    return None;
                }
            },
        };

        let file_name = if kind == RecordKind::File {
            Some(basename(&content))
        } else {
            None
        };

        Some(Self {
            kind,
            content,
            file_name,
        })
    }
}

/// Extract the display filename from a URL: the substring after the last
/// path separator, or the whole input when it has none.
pub fn basename(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}

#[derive(Deserialize)]
struct WireLine {
    message: Option<WireMessage>,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(rename = "type")]
    kind: Option<String>,
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_typed_text_line() {
        let record =
            StreamRecord::parse_line(r#"{"message":{"type":"text","content":"Hi"}}"#).unwrap();
        assert_eq!(record.kind, RecordKind::Text);
        assert_eq!(record.content, "Hi");
        assert_eq!(record.file_name, None);
    }

    #[test]
    fn test_parse_untyped_line_is_text() {
        let record = StreamRecord::parse_line(r#"{"message":{"content":"partial"}}"#).unwrap();
        assert_eq!(record.kind, RecordKind::Text);
        assert_eq!(record.content, "partial");
    }

    #[test]
    fn test_parse_file_line_derives_name() {
        let record = StreamRecord::parse_line(
            r#"{"message":{"type":"file","content":"http://host/files/report.pdf"}}"#,
        )
        .unwrap();
        assert_eq!(record.kind, RecordKind::File);
        assert_eq!(record.file_name.as_deref(), Some("report.pdf"));
    }

    #[test]
    fn test_parse_unknown_type_skipped() {
        let line = r#"{"message":{"type":"video","content":"clip.mp4"}}"#;
        assert_eq!(StreamRecord::parse_line(line), None);
    }

    #[test]
    fn test_parse_malformed_skipped() {
        assert_eq!(StreamRecord::parse_line(r#"{"message": {"#), None);
        assert_eq!(StreamRecord::parse_line("not json at all"), None);
        assert_eq!(StreamRecord::parse_line(""), None);
    }

    #[test]
    fn test_parse_missing_content_skipped() {
        assert_eq!(
            StreamRecord::parse_line(r#"{"message":{"type":"text"}}"#),
            None
        );
        assert_eq!(StreamRecord::parse_line(r#"{"done":true}"#), None);
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("http://host/a/b/report.pdf"), "report.pdf");
        assert_eq!(basename("plain-name.csv"), "plain-name.csv");
        assert_eq!(basename("dir/"), "");
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(ProtocolMode::parse("discrete"), Some(ProtocolMode::Discrete));
        assert_eq!(
            ProtocolMode::parse(" Accumulating "),
            Some(ProtocolMode::Accumulating)
        );
        assert_eq!(ProtocolMode::parse("auto"), None);
    }
}
