use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::ChatRequest;
use super::ChatResponse;
use super::CreateMessageRequest;
use super::CreateSessionRequest;
use super::DeleteMessageResponse;
use super::MessageResponse;
use super::Session;
use super::UpdateMessageRequest;
use super::UpdateSessionRequest;

/// REST surface of the chat service. Every method maps to exactly one
/// request; callers own any state bookkeeping around it.
#[async_trait]
pub trait ChatApi {
    /// `POST /chat-sessions`
    async fn create_session(&self, req: &CreateSessionRequest) -> Result<Session>;

    /// `GET /chat-sessions`
    async fn list_sessions(&self) -> Result<Vec<Session>>;

    /// `GET /chat-sessions/:id`
    async fn get_session(&self, id: &str) -> Result<Session>;

    /// `PATCH /chat-sessions/:id`
    async fn update_session(&self, id: &str, req: &UpdateSessionRequest) -> Result<Session>;

    /// `DELETE /chat-sessions/:id`
    async fn delete_session(&self, id: &str) -> Result<()>;

    /// `POST /chat-messages`
    async fn create_message(&self, req: &CreateMessageRequest) -> Result<MessageResponse>;

    /// `GET /chat-messages?sessionId=`
    async fn list_messages(&self, session_id: &str) -> Result<Vec<MessageResponse>>;

    /// `PATCH /chat-messages/:id`
    async fn update_message(
        &self,
        id: &str,
        req: &UpdateMessageRequest,
    ) -> Result<MessageResponse>;

    /// `DELETE /chat-messages/:id`
    async fn delete_message(&self, id: &str) -> Result<DeleteMessageResponse>;

    /// `DELETE /chat-messages/session/:sessionId`
    async fn delete_session_messages(&self, session_id: &str) -> Result<()>;

    /// `POST /chat`. Blocks until the assistant's full reply is available.
    async fn send_chat(&self, req: &ChatRequest) -> Result<ChatResponse>;
}

pub type ApiBox = Arc<dyn ChatApi + Send + Sync>;
