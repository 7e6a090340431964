//! Conversation continuity across calls.
//!
//! [`ConversationClient`] pairs an immutable API handle (credentials, HTTP
//! client) with a [`Session`] holding the current conversation id. The id
//! starts unset and is set by the first send, a reset or a load. Superseded
//! ids stay valid on the service and can be loaded again later.

use std::path::Path;

use tracing::info;

use crate::api::{
    ChunkSink, HttpApi, InstructionVariables, Message, MessageSource, PlaylabApi, Reply,
};
use crate::attachment::Attachment;
use crate::config::{Config, Credentials};
use crate::constants::SYSTEM_RULES_MARKER;
use crate::error::{PlaylabError, Result};

const NO_CONVERSATION: &str =
    "No conversation loaded. Please create a new conversation or load an existing one.";

/// Mutable per-conversation state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    conversation_id: Option<String>,
}

impl Session {
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    fn require(&self, operation: &str) -> Result<&str> {
        self.conversation_id()
            .ok_or_else(|| PlaylabError::Configuration(format!("{operation}: {NO_CONVERSATION}")))
    }

    fn switch_to(&mut self, conversation_id: String) {
        info!(
            from = self.conversation_id.as_deref().unwrap_or("-"),
            to = %conversation_id,
            "switching conversation"
        );
        self.conversation_id = Some(conversation_id);
    }
}

/// Client for one Playlab app, tracking the active conversation.
pub struct ConversationClient<A = HttpApi> {
    api: A,
    session: Session,
    /// Sent with every conversation this client creates
    instruction_variables: InstructionVariables,
}

impl ConversationClient<HttpApi> {
    /// Build a client talking to the real service. No request is made yet.
    pub fn connect(credentials: Credentials, config: &Config) -> Result<Self> {
        let api = HttpApi::new(credentials, config)?;
        Ok(Self::with_api(api).with_instruction_variables(config.instruction_variables.clone()))
    }
}

impl<A: PlaylabApi> ConversationClient<A> {
    pub fn with_api(api: A) -> Self {
        Self {
            api,
            session: Session::default(),
            instruction_variables: InstructionVariables::new(),
        }
    }

    #[must_use]
    pub fn with_instruction_variables(mut self, variables: InstructionVariables) -> Self {
        self.instruction_variables = variables;
        self
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.session.conversation_id()
    }

    /// Start a conversation with explicit instruction variables and make it current.
    pub async fn create_conversation(
        &mut self,
        variables: &InstructionVariables,
    ) -> Result<String> {
        let id = self.api.create_conversation(variables).await?;
        self.session.switch_to(id.clone());
        Ok(id)
    }

    /// Send a message and wait for the complete reply.
    ///
    /// Creates a conversation first if none is active. Input is validated
    /// before any request is made.
    pub async fn send_message(&mut self, text: &str, file_path: Option<&Path>) -> Result<Reply> {
        self.stream_message(text, file_path, &mut |_| {}).await
    }

    /// Like [`send_message`](Self::send_message), calling `on_chunk` with each
    /// piece of the reply as it arrives.
    pub async fn stream_message(
        &mut self,
        text: &str,
        file_path: Option<&Path>,
        on_chunk: &mut ChunkSink<'_>,
    ) -> Result<Reply> {
        if text.trim().is_empty() {
            return Err(PlaylabError::Validation(
                "send message: message text must not be empty".to_string(),
            ));
        }
        let attachment = file_path.map(Attachment::load).transpose()?;

        let conversation_id = match self.session.conversation_id() {
            Some(id) => id.to_string(),
            None => {
                let variables = self.instruction_variables.clone();
                self.create_conversation(&variables).await?
            }
        };

        let content = self
            .api
            .send_message(&conversation_id, text, attachment.as_ref(), on_chunk)
            .await?;

        Ok(Reply {
            conversation_id,
            content,
        })
    }

    /// History of the current conversation, oldest first. Always fetched fresh.
    pub async fn list_messages(&self) -> Result<Vec<Message>> {
        let id = self.session.require("list messages")?;
        self.api.list_messages(id).await
    }

    /// Abandon the current conversation and start a fresh one.
    ///
    /// Returns the app's greeting (first provider message), if it sent one.
    pub async fn reset_chat(&mut self) -> Result<Option<Message>> {
        let variables = self.instruction_variables.clone();
        self.create_conversation(&variables).await?;
        let messages = self.list_messages().await?;
        Ok(messages.into_iter().find(Message::is_from_provider))
    }

    /// Make `conversation_id` current and return its history for replay.
    ///
    /// The history is fetched before switching, so an unknown id fails with
    /// [`PlaylabError::NotFound`] and leaves the current conversation in place.
    pub async fn load_conversation(&mut self, conversation_id: &str) -> Result<Vec<Message>> {
        let conversation_id = conversation_id.trim();
        if conversation_id.is_empty() {
            return Err(PlaylabError::Validation("Invalid conversation ID".to_string()));
        }

        let messages = self.api.list_messages(conversation_id).await?;
        self.session.switch_to(conversation_id.to_string());
        Ok(messages)
    }

    /// The app's instructions for the current conversation, without the
    /// internal rules section. `None` if the history has no system-start message.
    pub async fn display_system_prompt(&self) -> Result<Option<String>> {
        self.session.require("display system prompt")?;
        let messages = self.list_messages().await?;
        Ok(messages
            .first()
            .filter(|m| m.source == MessageSource::SystemStart)
            .map(|m| system_prompt_text(&m.content)))
    }
}

/// Cut a system-start message at the rules marker.
pub fn system_prompt_text(content: &str) -> String {
    content
        .split(SYSTEM_RULES_MARKER)
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}
