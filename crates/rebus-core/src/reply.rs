//! Reply payloads produced by handlers.
//!
//! Handlers return a [`HandlerReply`]; the dispatcher normalizes it into an
//! optional [`ReplyEnvelope`] before handing it to the platform:
//!
//! | Handler returns             | Sent to platform          |
//! |-----------------------------|---------------------------|
//! | [`HandlerReply::Nothing`]   | nothing                   |
//! | [`HandlerReply::Text`]      | `{ content }`             |
//! | [`HandlerReply::Envelope`]  | the envelope as-is        |

use serde::{Deserialize, Serialize};

/// Embed colour palette used by the bot.
pub mod colors {
    /// Aqua.
    pub const AQUA: u32 = 0x1A_BC_9C;
    /// Gold.
    pub const GOLD: u32 = 0xF1_C4_0F;
    /// Red.
    pub const RED: u32 = 0xED_42_45;
    /// Yellow.
    pub const YELLOW: u32 = 0xFE_E7_5C;
}

/// A rich embed attached to a reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

impl Embed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }
}

/// A file attached to a reply, referenced by URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub url: String,
}

/// The normalized reply sent to the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    /// Plain text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Rich embeds.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    /// Whether the reply is visible only to the invoking user.
    #[serde(default)]
    pub ephemeral: bool,
    /// File attachments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl ReplyEnvelope {
    /// Creates a public text reply.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// Creates an ephemeral text reply.
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self::text(content).with_ephemeral(true)
    }

    /// Creates a public reply containing a single embed.
    pub fn embed(embed: Embed) -> Self {
        Self {
            embeds: vec![embed],
            ..Default::default()
        }
    }

    /// Sets the ephemeral flag (builder pattern).
    pub fn with_ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }

    /// Adds an embed (builder pattern).
    pub fn with_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    /// Adds an attachment (builder pattern).
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// Text reply that is ephemeral unless `public` is set.
pub fn reply(content: impl Into<String>, public: bool) -> HandlerReply {
    HandlerReply::Envelope(ReplyEnvelope::text(content).with_ephemeral(!public))
}

/// Embed reply that is ephemeral unless `public` is set.
pub fn reply_embed(embed: Embed, public: bool) -> HandlerReply {
    HandlerReply::Envelope(ReplyEnvelope::embed(embed).with_ephemeral(!public))
}

/// What a handler produced for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HandlerReply {
    /// No reply is sent.
    #[default]
    Nothing,
    /// A plain text reply.
    Text(String),
    /// A structured reply.
    Envelope(ReplyEnvelope),
}

impl HandlerReply {
    /// Normalizes the reply into the payload sent to the platform.
    pub fn into_envelope(self) -> Option<ReplyEnvelope> {
        match self {
            Self::Nothing => None,
            Self::Text(content) => Some(ReplyEnvelope::text(content)),
            Self::Envelope(envelope) => Some(envelope),
        }
    }
}

impl From<()> for HandlerReply {
    fn from(_: ()) -> Self {
        Self::Nothing
    }
}

impl From<String> for HandlerReply {
    fn from(content: String) -> Self {
        Self::Text(content)
    }
}

impl From<&str> for HandlerReply {
    fn from(content: &str) -> Self {
        Self::Text(content.to_string())
    }
}

impl From<ReplyEnvelope> for HandlerReply {
    fn from(envelope: ReplyEnvelope) -> Self {
        Self::Envelope(envelope)
    }
}

impl<T: Into<HandlerReply>> From<Option<T>> for HandlerReply {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Nothing, Into::into)
    }
}
