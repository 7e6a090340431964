pub mod client;
mod models;
pub mod stream;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;

use crate::attachment::Attachment;
use crate::error::Result;

pub use client::HttpApi;
pub use models::{InstructionValue, InstructionVariables, Message, MessageSource, Reply};

/// Callback invoked with each piece of reply text as it streams in.
pub type ChunkSink<'a> = dyn FnMut(&str) + Send + 'a;

/// The remote operations a conversation needs.
///
/// [`HttpApi`] talks to the real service; tests plug in an in-memory double.
/// Implementations never retry and never cache.
#[async_trait]
pub trait PlaylabApi: Send + Sync {
    /// Start a conversation and return its id.
    async fn create_conversation(&self, variables: &InstructionVariables) -> Result<String>;

    /// Full history of a conversation, oldest first.
    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>>;

    /// Post a user message and return the complete reply text, feeding each
    /// delta to `on_chunk` as it arrives.
    async fn send_message(
        &self,
        conversation_id: &str,
        text: &str,
        attachment: Option<&Attachment>,
        on_chunk: &mut ChunkSink<'_>,
    ) -> Result<String>;
}
