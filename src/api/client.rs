use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::models::{
    ConversationEnvelope, CreateConversationRequest, MessageInput, MessagesEnvelope,
    SendMessageRequest,
};
use super::stream::{SseDecoder, StreamEvent};
use super::{ChunkSink, InstructionVariables, Message, PlaylabApi};
use crate::attachment::Attachment;
use crate::config::{Config, Credentials};
use crate::constants::ERROR_BODY_PREVIEW_LEN;
use crate::error::{PlaylabError, Result};
use crate::utils::truncate_str;

/// Async Playlab API client.
///
/// Holds the credentials and a pooled HTTP client; carries no conversation
/// state of its own, so it can be shared or rebuilt freely.
pub struct HttpApi {
    client: Client,
    credentials: Credentials,
    base_url: String,
}

impl HttpApi {
    pub fn new(credentials: Credentials, config: &Config) -> Result<Self> {
        let mut builder = Client::builder();
        // Bounds connecting and each read, not the whole reply, so a long
        // answer that keeps streaming is never cut off
        if let Some(timeout) = config.request_timeout {
            builder = builder.connect_timeout(timeout).read_timeout(timeout);
        }
        let client = builder.build().map_err(|e| PlaylabError::Network {
            operation: "building HTTP client",
            source: e,
        })?;

        Ok(Self {
            client,
            credentials,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn conversations_url(&self) -> String {
        format!(
            "{}/projects/{}/conversations",
            self.base_url,
            self.credentials.project_id()
        )
    }

    fn messages_url(&self, conversation_id: &str) -> String {
        format!("{}/{}/messages", self.conversations_url(), conversation_id)
    }

    /// Send with auth attached; map transport failures and error statuses.
    async fn execute(&self, request: RequestBuilder, operation: &'static str) -> Result<Response> {
        let response = request
            .bearer_auth(self.credentials.api_key())
            .send()
            .await
            .map_err(|e| PlaylabError::Network {
                operation,
                source: e,
            })?;

        let status = response.status();
        debug!(operation, status = status.as_u16(), "playlab response");
        if status.is_success() {
            return Ok(response);
        }

        let body_text = response.text().await.unwrap_or_default();
        Err(PlaylabError::from_status(
            status.as_u16(),
            format!("{}: {}", operation, error_message(&body_text)),
        ))
    }

    async fn read_json<T: DeserializeOwned>(
        response: Response,
        operation: &'static str,
    ) -> Result<T> {
        let bytes = response.bytes().await.map_err(|e| PlaylabError::Network {
            operation,
            source: e,
        })?;
        serde_json::from_slice(&bytes).map_err(|e| PlaylabError::Decode {
            operation,
            source: e,
        })
    }

    /// Drain an SSE reply, forwarding deltas as they arrive.
    async fn collect_stream(response: Response, on_chunk: &mut ChunkSink<'_>) -> Result<String> {
        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut full_content = String::new();

        while let Some(chunk_result) = stream.next().await {
            let bytes = chunk_result.map_err(|e| PlaylabError::Network {
                operation: "reading reply stream",
                source: e,
            })?;
            for event in decoder.push(&bytes) {
                if apply_event(event, &mut full_content, on_chunk)? {
                    return Ok(full_content);
                }
            }
        }
        if let Some(event) = decoder.finish() {
            apply_event(event, &mut full_content, on_chunk)?;
        }

        Ok(full_content)
    }
}

/// Returns `Ok(true)` when the stream signalled its end.
fn apply_event(
    event: StreamEvent,
    full_content: &mut String,
    on_chunk: &mut ChunkSink<'_>,
) -> Result<bool> {
    match event {
        StreamEvent::Delta(text) => {
            on_chunk(&text);
            full_content.push_str(&text);
            Ok(false)
        }
        StreamEvent::Done => Ok(true),
        StreamEvent::Error(message) => Err(PlaylabError::Api {
            status: None,
            message,
        }),
    }
}

/// Prefer the service's `{"error": "..."}` field, else a preview of the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                "Unknown error".to_string()
            } else {
                truncate_str(body.trim(), ERROR_BODY_PREVIEW_LEN)
            }
        })
}

#[async_trait]
impl PlaylabApi for HttpApi {
    async fn create_conversation(&self, variables: &InstructionVariables) -> Result<String> {
        let body = CreateConversationRequest {
            instruction_variables: (!variables.is_empty()).then_some(variables),
        };
        debug!(project = self.credentials.project_id(), "creating conversation");

        let response = self
            .execute(
                self.client.post(self.conversations_url()).json(&body),
                "create conversation",
            )
            .await?;
        let envelope: ConversationEnvelope =
            Self::read_json(response, "create conversation").await?;
        Ok(envelope.conversation.id)
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        debug!(conversation_id, "listing messages");
        let response = self
            .execute(
                self.client.get(self.messages_url(conversation_id)),
                "list messages",
            )
            .await?;
        let envelope: MessagesEnvelope = Self::read_json(response, "list messages").await?;
        Ok(envelope.messages)
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        text: &str,
        attachment: Option<&Attachment>,
        on_chunk: &mut ChunkSink<'_>,
    ) -> Result<String> {
        let url = self.messages_url(conversation_id);
        let request = match attachment {
            Some(file) => {
                debug!(conversation_id, file = %file.file_name, "sending message with attachment");
                let part = Part::bytes(file.bytes.clone())
                    .file_name(file.file_name.clone())
                    .mime_str(&file.mime_type)
                    .map_err(|e| {
                        PlaylabError::Validation(format!(
                            "Invalid MIME type {} for {}: {}",
                            file.mime_type, file.file_name, e
                        ))
                    })?;
                let form = Form::new()
                    .text("input.message", text.to_string())
                    .text("originalFileName", file.file_name.clone())
                    .part("file", part);
                self.client.post(url).multipart(form)
            }
            None => {
                debug!(conversation_id, "sending message");
                self.client.post(url).json(&SendMessageRequest {
                    input: MessageInput { message: text },
                })
            }
        };

        let response = self.execute(request, "send message").await?;
        Self::collect_stream(response, on_chunk).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_error_field() {
        assert_eq!(error_message(r#"{"error":"Invalid API key"}"#), "Invalid API key");
    }

    #[test]
    fn error_message_falls_back_to_body() {
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(error_message(""), "Unknown error");
        assert_eq!(error_message(r#"{"detail":"x"}"#), r#"{"detail":"x"}"#);
    }

    #[test]
    fn error_message_truncates_long_bodies() {
        let body = "x".repeat(1000);
        assert_eq!(error_message(&body).len(), ERROR_BODY_PREVIEW_LEN);
    }

    #[test]
    fn urls_are_built_from_base_and_project() {
        let config = Config {
            base_url: "http://localhost:1/api/v1/".into(),
            ..Config::default()
        };
        let api = HttpApi::new(Credentials::new("k", "proj").unwrap(), &config).unwrap();
        assert_eq!(
            api.conversations_url(),
            "http://localhost:1/api/v1/projects/proj/conversations"
        );
        assert_eq!(
            api.messages_url("c9"),
            "http://localhost:1/api/v1/projects/proj/conversations/c9/messages"
        );
    }

    #[test]
    fn apply_event_accumulates_and_stops() {
        let mut seen = Vec::new();
        let mut sink = |c: &str| seen.push(c.to_string());
        let mut full = String::new();
        assert!(!apply_event(StreamEvent::Delta("a".into()), &mut full, &mut sink).unwrap());
        assert!(!apply_event(StreamEvent::Delta("b".into()), &mut full, &mut sink).unwrap());
        assert!(apply_event(StreamEvent::Done, &mut full, &mut sink).unwrap());
        assert!(apply_event(StreamEvent::Error("x".into()), &mut full, &mut sink).is_err());
        drop(sink);
        assert_eq!(full, "ab");
        assert_eq!(seen, vec!["a", "b"]);
    }
}
