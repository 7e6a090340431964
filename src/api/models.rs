use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageSource {
    /// The app's instructions, always first in a conversation.
    SystemStart,
    /// The model.
    Provider,
    User,
    /// Anything the service adds later; kept so one odd row can't break a history.
    #[serde(other)]
    Unknown,
}

impl fmt::Display for MessageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // pad() so width specifiers work in history listings
        f.pad(match self {
            MessageSource::SystemStart => "system-start",
            MessageSource::Provider => "provider",
            MessageSource::User => "user",
            MessageSource::Unknown => "unknown",
        })
    }
}

/// A single message as stored by the service. Never mutated locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub original_content: Option<String>,
    #[serde(default)]
    pub token_count: u32,
    pub source: MessageSource,
    #[serde(default)]
    pub rating: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub conversation_id: String,
    pub project_id: String,
}

impl Message {
    pub fn is_from_provider(&self) -> bool {
        self.source == MessageSource::Provider
    }
}

/// A value the app's instructions can be parameterised with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InstructionValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for InstructionValue {
    fn from(v: &str) -> Self {
        InstructionValue::Text(v.to_string())
    }
}

impl From<String> for InstructionValue {
    fn from(v: String) -> Self {
        InstructionValue::Text(v)
    }
}

impl From<i64> for InstructionValue {
    fn from(v: i64) -> Self {
        InstructionValue::Integer(v)
    }
}

impl From<f64> for InstructionValue {
    fn from(v: f64) -> Self {
        InstructionValue::Float(v)
    }
}

impl From<bool> for InstructionValue {
    fn from(v: bool) -> Self {
        InstructionValue::Bool(v)
    }
}

/// Variables substituted into the app's instructions when a conversation starts.
pub type InstructionVariables = BTreeMap<String, InstructionValue>;

/// The assistant's answer to one sent message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Conversation the message was sent to.
    pub conversation_id: String,
    /// Full reply text, all streamed deltas concatenated.
    pub content: String,
}

// ── Wire envelopes ────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateConversationRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction_variables: Option<&'a InstructionVariables>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConversationEnvelope {
    pub conversation: ConversationRef,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConversationRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessagesEnvelope {
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SendMessageRequest<'a> {
    pub input: MessageInput<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MessageInput<'a> {
    pub message: &'a str,
}
