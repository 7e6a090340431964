//! In-memory stand-in for the Playlab service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use super::{ChunkSink, InstructionVariables, Message, MessageSource, PlaylabApi};
use crate::attachment::Attachment;
use crate::error::{PlaylabError, Result};

pub(crate) const SYSTEM_PROMPT: &str =
    "You are a patient math tutor.\n\n### System Rules\nNever give the final answer.";
pub(crate) const GREETING: &str = "Hi! What would you like to work on today?";

#[derive(Default)]
struct State {
    conversations: HashMap<String, Vec<Message>>,
    next_conversation: usize,
    next_message: usize,
    last_variables: Option<InstructionVariables>,
    last_attachment: Option<String>,
}

/// Shared handle: clones see the same conversations and counters.
#[derive(Clone, Default)]
pub(crate) struct FakeApi {
    state: Arc<Mutex<State>>,
    calls: Arc<AtomicUsize>,
    /// Optional error returned by the next send instead of replying
    fail_next_send: Arc<Mutex<Option<PlaylabError>>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of remote operations performed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn conversation_count(&self) -> usize {
        self.state.lock().unwrap().conversations.len()
    }

    pub fn last_variables(&self) -> Option<InstructionVariables> {
        self.state.lock().unwrap().last_variables.clone()
    }

    pub fn last_attachment(&self) -> Option<String> {
        self.state.lock().unwrap().last_attachment.clone()
    }

    pub fn fail_next_send(&self, err: PlaylabError) {
        *self.fail_next_send.lock().unwrap() = Some(err);
    }

    /// Install a conversation with the given history, bypassing creation.
    pub fn seed(&self, conversation_id: &str, history: &[(MessageSource, &str)]) {
        let mut state = self.state.lock().unwrap();
        state
            .conversations
            .insert(conversation_id.to_string(), Vec::new());
        for (source, content) in history {
            Self::push(&mut state, conversation_id, *source, content);
        }
    }

    fn push(state: &mut State, conversation_id: &str, source: MessageSource, content: &str) {
        state.next_message += 1;
        let now = Utc::now();
        let message = Message {
            id: format!("msg-{}", state.next_message),
            content: content.to_string(),
            original_content: None,
            token_count: content.split_whitespace().count() as u32,
            source,
            rating: None,
            created_at: now,
            updated_at: now,
            user_id: None,
            conversation_id: conversation_id.to_string(),
            project_id: "proj-test".to_string(),
        };
        state
            .conversations
            .entry(conversation_id.to_string())
            .or_default()
            .push(message);
    }
}

#[async_trait]
impl PlaylabApi for FakeApi {
    async fn create_conversation(&self, variables: &InstructionVariables) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        state.next_conversation += 1;
        let id = format!("conv-{}", state.next_conversation);
        state.last_variables = Some(variables.clone());
        Self::push(&mut state, &id, MessageSource::SystemStart, SYSTEM_PROMPT);
        Self::push(&mut state, &id, MessageSource::Provider, GREETING);
        Ok(id)
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.state
            .lock()
            .unwrap()
            .conversations
            .get(conversation_id)
            .cloned()
            .ok_or_else(|| {
                PlaylabError::NotFound(format!("list messages: conversation {conversation_id}"))
            })
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        text: &str,
        attachment: Option<&Attachment>,
        on_chunk: &mut ChunkSink<'_>,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_next_send.lock().unwrap().take() {
            return Err(err);
        }

        let reply = {
            let mut state = self.state.lock().unwrap();
            if !state.conversations.contains_key(conversation_id) {
                return Err(PlaylabError::NotFound(format!(
                    "send message: conversation {conversation_id}"
                )));
            }
            state.last_attachment = attachment.map(|a| a.file_name.clone());
            Self::push(&mut state, conversation_id, MessageSource::User, text);
            let reply = format!("Let's work through: {text}");
            Self::push(&mut state, conversation_id, MessageSource::Provider, &reply);
            reply
        };

        // Stream word by word, keeping separators so chunks rejoin exactly
        for piece in reply.split_inclusive(' ') {
            on_chunk(piece);
        }
        Ok(reply)
    }
}
