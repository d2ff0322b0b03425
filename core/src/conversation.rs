//! Conversation State & Message Assembly
//!
//! The conversation is an ordered, chronological list of messages. It is
//! append-only with one exception: the single in-progress assistant message
//! for the active turn, which may be mutated in place until finalized.
//! User messages are immutable from the moment they are pushed; finalized
//! assistant messages are immutable from the moment they finalize.
//!
//! Incoming [`StreamRecord`]s are applied in arrival order under one of two
//! assembly modes (see [`ProtocolMode`]):
//!
//! - **Accumulating**: every record's content is newline-joined into the
//!   in-progress message's payload.
//! - **Discrete**: the first record claims the in-progress placeholder
//!   (fills it and finalizes it); every later record appends its own
//!   finalized, typed message.

use crate::protocol::{ProtocolMode, RecordKind, StreamRecord};

/// Unique message identifier.
///
/// Backed by a process-global atomic counter, so ids stay pairwise distinct
/// even under many rapid allocations within a single streaming turn.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new unique message ID.
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        Self(format!("msg_{id}"))
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

/// Who sent a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sender {
    /// Typed by the user.
    User,
    /// Produced by the assistant (including synthetic error messages).
    Assistant,
}

/// How a message's payload should be rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContentType {
    /// Plain text, rendered line by line.
    #[default]
    Text,
    /// Image source (URL or data URI), or text with embedded image lines.
    Image,
    /// Downloadable file reference.
    File,
    /// Delimiter-separated table rows, first row headers.
    Table,
    /// Markdown document offered as a generated download.
    PdfLink,
}

impl From<RecordKind> for ContentType {
    fn from(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Text => Self::Text,
            RecordKind::Image => Self::Image,
            RecordKind::File => Self::File,
            RecordKind::Table => Self::Table,
        }
    }
}

/// A single message in the conversation.
#[derive(Clone, Debug)]
pub struct Message {
    /// Unique id, monotonically assigned.
    pub id: MessageId,
    /// Who sent it.
    pub sender: Sender,
    /// Rendering contract for the payload.
    pub content_type: ContentType,
    /// Raw textual content (or URL / data URI / table rows, per type).
    pub payload: String,
    /// Auxiliary display data, e.g. a file's display name.
    pub meta: Option<String>,
    /// Still being filled by the active turn. Always false for user
    /// messages; drives the typing indicator.
    pub in_progress: bool,
    /// Creation time, Unix milliseconds.
    pub timestamp: u64,
}

impl Message {
    fn user(payload: String) -> Self {
        Self {
            id: MessageId::new(),
            sender: Sender::User,
            content_type: ContentType::Text,
            payload,
            meta: None,
            in_progress: false,
            timestamp: now_ms(),
        }
    }

    fn assistant_placeholder() -> Self {
        Self {
            id: MessageId::new(),
            sender: Sender::Assistant,
            content_type: ContentType::Text,
            payload: String::new(),
            meta: None,
            in_progress: true,
            timestamp: now_ms(),
        }
    }

    fn assistant_from_record(record: StreamRecord) -> Self {
        Self {
            id: MessageId::new(),
            sender: Sender::Assistant,
            content_type: record.kind.into(),
            payload: record.content,
            meta: record.file_name,
            in_progress: false,
            timestamp: now_ms(),
        }
    }
}

/// Ordered conversation state, owned by the controller.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    in_progress_id: Option<MessageId>,
    turn_record_count: usize,
}

impl Conversation {
    /// Create an empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages in the conversation.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the conversation holds no messages yet.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Look up a message by id.
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Whether an assistant message is still being filled.
    pub fn has_in_progress(&self) -> bool {
        self.in_progress_id.is_some()
    }

    /// Push an immutable user message.
    pub fn push_user(&mut self, content: impl Into<String>) -> MessageId {
        let msg = Message::user(content.into());
        let id = msg.id.clone();
        self.messages.push(msg);
        id
    }

    /// Open the in-progress assistant placeholder for a new turn.
    ///
    /// At most one message may be in progress at a time; the controller's
    /// loading guard enforces one turn at a time.
    pub fn begin_assistant_turn(&mut self) -> MessageId {
        debug_assert!(self.in_progress_id.is_none());
        let msg = Message::assistant_placeholder();
        let id = msg.id.clone();
        self.in_progress_id = Some(id.clone());
        self.turn_record_count = 0;
        self.messages.push(msg);
        id
    }

    /// Apply one decoded stream record under the given assembly mode.
    pub fn apply_record(&mut self, record: StreamRecord, mode: ProtocolMode) {
        self.turn_record_count += 1;
        match mode {
            ProtocolMode::Accumulating => self.accumulate(record),
            ProtocolMode::Discrete => self.append_discrete(record),
        }
    }

    /// Newline-join the record's content into the in-progress payload.
    fn accumulate(&mut self, record: StreamRecord) {
        let first = self.turn_record_count == 1;
        if let Some(msg) = self.in_progress_mut() {
            if !first {
                msg.payload.push('\n');
            }
            msg.payload.push_str(&record.content);
        } else {
            tracing::warn!("Dropping stream record with no turn in progress");
        }
    }

    /// Discrete assembly: the first record of the turn claims the
    /// placeholder and finalizes it; later records each append their own
    /// finalized message.
    fn append_discrete(&mut self, record: StreamRecord) {
        if let Some(id) = self.in_progress_id.take() {
            if let Some(msg) = self.messages.iter_mut().find(|m| m.id == id) {
                msg.content_type = record.kind.into();
                msg.payload = record.content;
                msg.meta = record.file_name;
                msg.in_progress = false;
                return;
            }
        }
        self.messages.push(Message::assistant_from_record(record));
    }

    /// Finalize the active turn at end of stream.
    ///
    /// A turn that produced zero records still finalizes its placeholder
    /// with an empty payload: the empty bubble is surfaced deliberately so
    /// the user sees the turn completed without an answer.
    pub fn finalize_turn(&mut self) {
        self.finalize_turn_as(None);
    }

    /// Finalize the active turn, optionally retagging the placeholder's
    /// content type. Used by the document workflow, which turns the
    /// accumulated markdown into a downloadable `pdf-link` message.
    pub fn finalize_turn_as(&mut self, content_type: Option<ContentType>) {
        if let Some(id) = self.in_progress_id.take() {
            if let Some(msg) = self.messages.iter_mut().find(|m| m.id == id) {
                if let Some(content_type) = content_type {
                    msg.content_type = content_type;
                }
                msg.in_progress = false;
            }
        }
        self.turn_record_count = 0;
    }

    /// Resolve the active turn with an error text.
    ///
    /// The text lands in the in-progress message when one exists, otherwise
    /// as a fresh assistant message, and the turn is finalized either way.
    pub fn fail_turn(&mut self, text: impl Into<String>) {
        let text = text.into();
        match self.in_progress_id.take() {
            Some(id) => {
                if let Some(msg) = self.messages.iter_mut().find(|m| m.id == id) {
                    msg.content_type = ContentType::Text;
                    msg.payload = text;
                    msg.in_progress = false;
                }
            }
            None => {
                let mut msg = Message::assistant_placeholder();
                msg.payload = text;
                msg.in_progress = false;
                self.messages.push(msg);
            }
        }
        self.turn_record_count = 0;
    }

    fn in_progress_mut(&mut self) -> Option<&mut Message> {
        let id = self.in_progress_id.clone()?;
        self.messages.iter_mut().find(|m| m.id == id)
    }
}

/// Current timestamp in milliseconds.
pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text_record(content: &str) -> StreamRecord {
        StreamRecord::text(content)
    }

    #[test]
    fn test_message_ids_unique() {
        let mut ids: Vec<MessageId> = Vec::new();
        let mut convo = Conversation::new();
        for i in 0..500 {
            ids.push(convo.push_user(format!("m{i}")));
        }
        ids.push(convo.begin_assistant_turn());
        for i in 0..500 {
            convo.apply_record(text_record(&format!("r{i}")), ProtocolMode::Accumulating);
        }
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_accumulating_joins_with_newline() {
        let mut convo = Conversation::new();
        let id = convo.begin_assistant_turn();
        convo.apply_record(text_record("Hi"), ProtocolMode::Accumulating);
        convo.apply_record(text_record(" there"), ProtocolMode::Accumulating);
        convo.finalize_turn();

        let msg = convo.get(&id).unwrap();
        assert_eq!(msg.payload, "Hi\n there");
        assert!(!msg.in_progress);
        assert_eq!(convo.len(), 1);
    }

    #[test]
    fn test_discrete_first_record_claims_placeholder() {
        let mut convo = Conversation::new();
        let id = convo.begin_assistant_turn();
        convo.apply_record(text_record("Hi"), ProtocolMode::Discrete);
        convo.apply_record(text_record(" there"), ProtocolMode::Discrete);
        convo.finalize_turn();

        assert_eq!(convo.len(), 2);
        assert_eq!(convo.get(&id).unwrap().payload, "Hi");
        assert_eq!(convo.messages()[1].payload, " there");
        assert!(convo.messages().iter().all(|m| !m.in_progress));
    }

    #[test]
    fn test_discrete_preserves_record_types() {
        let mut convo = Conversation::new();
        convo.begin_assistant_turn();
        convo.apply_record(
            StreamRecord {
                kind: RecordKind::File,
                content: "http://host/out/plan.pdf".into(),
                file_name: Some("plan.pdf".into()),
            },
            ProtocolMode::Discrete,
        );
        convo.apply_record(
            StreamRecord {
                kind: RecordKind::Table,
                content: "A,B\n1,2".into(),
                file_name: None,
            },
            ProtocolMode::Discrete,
        );
        convo.finalize_turn();

        assert_eq!(convo.messages()[0].content_type, ContentType::File);
        assert_eq!(convo.messages()[0].meta.as_deref(), Some("plan.pdf"));
        assert_eq!(convo.messages()[1].content_type, ContentType::Table);
    }

    #[test]
    fn test_empty_turn_finalizes_empty_bubble() {
        let mut convo = Conversation::new();
        let id = convo.begin_assistant_turn();
        convo.finalize_turn();

        let msg = convo.get(&id).unwrap();
        assert_eq!(msg.payload, "");
        assert!(!msg.in_progress);
        assert!(!convo.has_in_progress());
        assert_eq!(convo.len(), 1);
    }

    #[test]
    fn test_fail_turn_fills_placeholder() {
        let mut convo = Conversation::new();
        convo.push_user("hello");
        let id = convo.begin_assistant_turn();
        convo.fail_turn("Sorry, something broke.");

        let msg = convo.get(&id).unwrap();
        assert_eq!(msg.payload, "Sorry, something broke.");
        assert!(!msg.in_progress);
        assert_eq!(convo.len(), 2);
    }

    #[test]
    fn test_fail_turn_without_placeholder_appends() {
        let mut convo = Conversation::new();
        convo.push_user("hello");
        convo.fail_turn("Sorry, something broke.");

        assert_eq!(convo.len(), 2);
        let msg = &convo.messages()[1];
        assert_eq!(msg.sender, Sender::Assistant);
        assert!(!msg.in_progress);
    }

    #[test]
    fn test_accumulating_keeps_empty_first_content() {
        let mut convo = Conversation::new();
        let id = convo.begin_assistant_turn();
        convo.apply_record(text_record(""), ProtocolMode::Accumulating);
        convo.apply_record(text_record("tail"), ProtocolMode::Accumulating);
        convo.finalize_turn();

        // Join law: payload is exactly the newline-join of the contents.
        assert_eq!(convo.get(&id).unwrap().payload, "\ntail");
    }
}
