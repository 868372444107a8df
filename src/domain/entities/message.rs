use super::Identifier;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;

static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// Delivery mode of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// One-to-one message to a single recipient
    Direct,
    /// Message delivered to a room rather than an individual
    Broadcast,
}

impl MessageKind {
    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::Direct => "direct",
            MessageKind::Broadcast => "broadcast",
        }
    }
}

/// Represents an incoming or outgoing message.
///
/// `body` is always a plain-text rendering. When `rich_body` is present it
/// carries the markup source the body was derived from; the two never
/// diverge in meaning.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub from: Identifier,
    pub to: Identifier,
    pub body: String,
    pub rich_body: Option<String>,
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(from: Identifier, to: Identifier, body: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            from,
            to,
            body: body.into(),
            rich_body: None,
            kind: MessageKind::Direct,
            timestamp: Utc::now(),
        }
    }

    /// Build a text/markup pair from one markup source: the plain body is
    /// the source with tags stripped, the rich body is the source itself.
    pub fn from_markup(from: Identifier, to: Identifier, markup: &str) -> Self {
        let mut msg = Self::new(from, to, strip_markup(markup));
        msg.rich_body = Some(markup.to_string());
        msg
    }

    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_rich_body(mut self, markup: impl Into<String>) -> Self {
        self.rich_body = Some(markup.into());
        self
    }

    pub fn is_broadcast(&self) -> bool {
        self.kind == MessageKind::Broadcast
    }

    /// Build a reply to this message: addressed to the sender's bare
    /// identifier, stamped from the bot's own identity, same kind.
    ///
    /// Stripping the resource means a broadcast reply lands on the room
    /// address rather than on one occupant.
    pub fn reply(&self, own_identity: &Identifier, body: impl Into<String>) -> Self {
        Self::new(own_identity.clone(), self.from.to_bare(), body).with_kind(self.kind)
    }

    /// Same as [`reply`](Self::reply) but built from a markup source.
    pub fn reply_with_markup(&self, own_identity: &Identifier, markup: &str) -> Self {
        Self::from_markup(own_identity.clone(), self.from.to_bare(), markup).with_kind(self.kind)
    }
}

/// Reduce a markup fragment to plain text by dropping tags.
pub fn strip_markup(markup: &str) -> String {
    MARKUP_TAG.replace_all(markup, "").to_string()
}
