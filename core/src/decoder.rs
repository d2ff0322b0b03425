//! Stream Decoder
//!
//! Turns the raw byte chunks of an HTTP response body into [`StreamRecord`]s.
//! Chunk boundaries carry no meaning: a single chunk may hold several lines
//! and a line may span several chunks, so partial lines are buffered until
//! their terminating newline arrives. Bytes are decoded lossily; a malformed
//! line is skipped, never fatal.
//!
//! One decoder instance serves exactly one response body. It is not
//! resumable across requests.

use crate::protocol::StreamRecord;

/// Incremental newline-delimited JSON decoder.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: String,
}

impl LineDecoder {
    /// Create a decoder with an empty line buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of response bytes, returning every record whose line
    /// was completed by this chunk. Records come back in wire order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamRecord> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut records = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            if let Some(record) = StreamRecord::parse_line(&line) {
                records.push(record);
            }
        }
        records
    }

    /// Flush the decoder at end of stream.
    ///
    /// The final line of a response is not always newline-terminated; parse
    /// whatever is left in the buffer as one last line.
    pub fn finish(&mut self) -> Option<StreamRecord> {
        let rest = std::mem::take(&mut self.buffer);
        StreamRecord::parse_line(&rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RecordKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_whole_lines_in_one_chunk() {
        let mut decoder = LineDecoder::new();
        let records = decoder.feed(
            b"{\"message\":{\"type\":\"text\",\"content\":\"Hi\"}}\n\
              {\"message\":{\"type\":\"text\",\"content\":\" there\"}}\n",
        );
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].content, "Hi");
        assert_eq!(records[1].content, " there");
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_line_split_across_chunks() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.feed(b"{\"message\":{\"type\":\"te").is_empty());
        assert!(decoder.feed(b"xt\",\"content\":\"joined\"").is_empty());
        let records = decoder.feed(b"}}\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content, "joined");
    }

    #[test]
    fn test_malformed_line_is_skipped() {
        let mut decoder = LineDecoder::new();
        let records = decoder.feed(
            b"{\"message\":{\"type\":\"text\",\"content\":\"a\"}}\n\
              {garbage\n\
              {\"message\":{\"type\":\"text\",\"content\":\"b\"}}\n",
        );
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].content, "a");
        assert_eq!(records[1].content, "b");
    }

    #[test]
    fn test_unterminated_final_line_flushed() {
        let mut decoder = LineDecoder::new();
        assert!(decoder
            .feed(b"{\"message\":{\"type\":\"table\",\"content\":\"A,B\\n1,2\"}}")
            .is_empty());
        let record = decoder.finish().unwrap();
        assert_eq!(record.kind, RecordKind::Table);
        assert_eq!(record.content, "A,B\n1,2");
        // A second flush finds nothing.
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_blank_lines_emit_nothing() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.feed(b"\n\n\n").is_empty());
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_invalid_utf8_does_not_panic() {
        let mut decoder = LineDecoder::new();
        // Lossy decoding turns the bad byte into U+FFFD inside an otherwise
        // malformed line; the line is skipped, the stream survives.
        let records = decoder.feed(b"\xff\xfe\n{\"message\":{\"content\":\"ok\"}}\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content, "ok");
    }
}
