#[cfg(test)]
#[path = "message_store_test.rs"]
mod tests;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::Notifier;
use crate::domain::models::first_complete_url;
use crate::domain::models::ApiBox;
use crate::domain::models::ChatRequest;
use crate::domain::models::CreateMessageRequest;
use crate::domain::models::Message;
use crate::domain::models::Role;
use crate::domain::models::StoreError;
use crate::domain::models::StoreResult;
use crate::domain::models::UpdateMessageRequest;

/// Read access to whichever session the user currently has open.
#[async_trait]
pub trait ActiveSession {
    async fn active_session_id(&self) -> String;
}

/// Told about the first URL found in an assistant reply.
#[async_trait]
pub trait UrlListener {
    async fn url_detected(&self, url: &str);
}

pub type ActiveSessionBox = Arc<dyn ActiveSession + Send + Sync>;
pub type UrlListenerBox = Arc<dyn UrlListener + Send + Sync>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageState {
    pub messages: Vec<Message>,
    pub is_loading: bool,
    pub is_ai_responding: bool,
    pub error: Option<StoreError>,
    pub detected_url: Option<String>,
    in_flight: usize,
    streamed: bool,
}

/// Messages of the active session plus the flags around an assistant turn.
#[derive(Clone)]
pub struct MessageStore {
    api: ApiBox,
    sessions: ActiveSessionBox,
    urls: UrlListenerBox,
    notifier: Notifier,
    state: Arc<RwLock<MessageState>>,
}

impl MessageStore {
    pub fn new(
        api: ApiBox,
        sessions: ActiveSessionBox,
        urls: UrlListenerBox,
        notifier: Notifier,
    ) -> MessageStore {
        return MessageStore {
            api,
            sessions,
            urls,
            notifier,
            state: Arc::new(RwLock::new(MessageState::default())),
        };
    }

    pub async fn snapshot(&self) -> MessageState {
        return self.state.read().await.clone();
    }

    pub async fn messages(&self) -> Vec<Message> {
        return self.state.read().await.messages.clone();
    }

    pub async fn is_loading(&self) -> bool {
        return self.state.read().await.is_loading;
    }

    pub async fn is_ai_responding(&self) -> bool {
        return self.state.read().await.is_ai_responding;
    }

    pub async fn detected_url(&self) -> Option<String> {
        return self.state.read().await.detected_url.clone();
    }

    pub async fn error(&self) -> Option<StoreError> {
        return self.state.read().await.error.clone();
    }

    async fn begin_request(&self) {
        let mut state = self.state.write().await;
        state.in_flight += 1;
        state.is_loading = true;
        state.error = None;
    }

    async fn end_request(&self) {
        let mut state = self.state.write().await;
        state.in_flight = state.in_flight.saturating_sub(1);
        state.is_loading = state.in_flight > 0;
    }

    async fn fail(&self, err: StoreError, notice: &str) -> StoreError {
        tracing::error!(error = %err, "Message store action failed");
        self.state.write().await.error = Some(err.clone());
        self.notifier.error(notice);

        return err;
    }

    /// Replaces the list with the session's messages. Results for a session
    /// that is no longer active by the time they arrive are dropped.
    pub async fn fetch_messages(&self, session_id: Option<&str>) -> StoreResult<()> {
        let target = match session_id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => self.sessions.active_session_id().await,
        };
        if target.is_empty() {
            return Ok(());
        }

        self.begin_request().await;
        let res = self.api.list_messages(&target).await;
        self.end_request().await;

        let messages = match res {
            Ok(messages) => messages.into_iter().map(Message::from).collect::<Vec<_>>(),
            Err(err) => {
                let err = StoreError::request("Failed to fetch messages", err);
                return Err(self.fail(err, "Failed to load messages").await);
            }
        };

        let mut state = self.state.write().await;
        let active = self.sessions.active_session_id().await;
        if active != target {
            tracing::warn!(
                requested = target,
                active,
                "Dropping messages fetched for a session that is no longer active"
            );
            return Ok(());
        }

        tracing::debug!(session_id = target, count = messages.len(), "Messages loaded");
        state.messages = messages;
        state.detected_url = None;

        return Ok(());
    }

    /// Appends a locally minted user message ahead of any confirmation.
    pub async fn push_optimistic(&self, text: &str) -> Message {
        let message = Message::new(Role::User, text);
        self.state.write().await.messages.push(message.clone());

        return message;
    }

    /// Non-streaming turn over REST: persist the user message, ask for a
    /// reply, persist and show it.
    pub async fn send_message(&self, text: &str) -> StoreResult<()> {
        let session_id = self.sessions.active_session_id().await;
        if session_id.is_empty() {
            return Err(StoreError::precondition("No active session"));
        }
        if text.trim().is_empty() {
            return Err(StoreError::precondition("Message is empty"));
        }

        let optimistic = self.push_optimistic(text).await;
        let req = CreateMessageRequest::new(&session_id, text, Role::User);
        match self.api.create_message(&req).await {
            Ok(res) => {
                let confirmed = Message::from(res);
                let mut state = self.state.write().await;
                if let Some(entry) = state
                    .messages
                    .iter_mut()
                    .find(|m| return m.id == optimistic.id)
                {
                    *entry = confirmed;
                }
            }
            Err(err) => {
                let err = StoreError::request("Failed to send message", err);
                return Err(self.fail(err, "Failed to send message").await);
            }
        }

        self.start_response().await;
        let res = self
            .api
            .send_chat(&ChatRequest {
                session_id: session_id.to_string(),
                message: text.to_string(),
            })
            .await;

        let reply = match res {
            Ok(reply) => reply,
            Err(err) => {
                self.finish_response().await;
                let err = StoreError::request("Failed to get a reply", err);
                return Err(self.fail(err, "Failed to send message").await);
            }
        };

        let req = CreateMessageRequest::new(&session_id, &reply.reply, Role::Assistant);
        let persisted = self.api.create_message(&req).await;
        let message = match &persisted {
            Ok(res) => Message::from(res.clone()),
            Err(_) => Message::new(Role::Assistant, &reply.reply),
        };

        if self.sessions.active_session_id().await == session_id {
            self.receive_whole(message).await;
            if let Some(app_url) = reply.app_url {
                self.detect_url(&app_url).await;
            }
        } else {
            tracing::warn!(session_id, "Reply arrived after the session was closed");
        }
        self.finish_response().await;

        if let Err(err) = persisted {
            let err = StoreError::request("Failed to save reply", err);
            return Err(self.fail(err, "Failed to save reply").await);
        }

        return Ok(());
    }

    /// Persists one message and appends the stored copy.
    pub async fn send_user_message(
        &self,
        session_id: &str,
        content: &str,
        role: Role,
    ) -> StoreResult<Message> {
        self.begin_request().await;
        let res = self
            .api
            .create_message(&CreateMessageRequest::new(session_id, content, role))
            .await;
        self.end_request().await;

        match res {
            Ok(res) => {
                let message = Message::from(res);
                self.state.write().await.messages.push(message.clone());
                return Ok(message);
            }
            Err(err) => {
                let err = StoreError::request("Failed to send message", err);
                return Err(self.fail(err, "Failed to send message").await);
            }
        }
    }

    pub async fn update_message(&self, id: &str, content: &str) -> StoreResult<()> {
        self.begin_request().await;
        let res = self
            .api
            .update_message(
                id,
                &UpdateMessageRequest {
                    content: content.to_string(),
                },
            )
            .await;
        self.end_request().await;

        match res {
            Ok(res) => {
                let updated = Message::from(res);
                let mut state = self.state.write().await;
                for message in state.messages.iter_mut() {
                    if message.id == id {
                        *message = updated.clone();
                    }
                }
                drop(state);

                self.notifier.success("Message updated");
                return Ok(());
            }
            Err(err) => {
                let err = StoreError::request(&format!("Failed to update message {id}"), err);
                return Err(self.fail(err, "Failed to update message").await);
            }
        }
    }

    pub async fn delete_message(&self, id: &str) -> StoreResult<()> {
        self.begin_request().await;
        let res = self.api.delete_message(id).await;
        self.end_request().await;

        let err = match res {
            Ok(res) if res.success => {
                self.state
                    .write()
                    .await
                    .messages
                    .retain(|message| return message.id != id);
                self.notifier.success("Message deleted");
                return Ok(());
            }
            Ok(res) => StoreError::Request {
                context: format!("Failed to delete message {id}"),
                reason: res.message,
            },
            Err(err) => StoreError::request(&format!("Failed to delete message {id}"), err),
        };

        return Err(self.fail(err, "Failed to delete message").await);
    }

    /// Deletes every message of the session on the server. The local list is
    /// only emptied when that session is the one on screen.
    pub async fn clear_session_messages(&self, session_id: &str) -> StoreResult<()> {
        self.begin_request().await;
        let res = self.api.delete_session_messages(session_id).await;
        self.end_request().await;

        if let Err(err) = res {
            let err = StoreError::request(
                &format!("Failed to clear messages for session {session_id}"),
                err,
            );
            return Err(self.fail(err, "Failed to clear messages").await);
        }

        if self.sessions.active_session_id().await == session_id {
            let mut state = self.state.write().await;
            state.messages.clear();
            state.detected_url = None;
        }
        self.notifier.success("Messages cleared");

        return Ok(());
    }

    /// Appends a complete message as delivered.
    pub async fn receive_whole(&self, message: Message) {
        let url = if message.is_assistant() {
            message.first_url()
        } else {
            None
        };
        self.state.write().await.messages.push(message);

        if let Some(url) = url {
            self.detect_url(&url).await;
        }
    }

    /// Extends the trailing assistant message, or starts one when the list
    /// is empty or ends with another role.
    pub async fn append_chunk(&self, text: &str) {
        let mut state = self.state.write().await;
        let extends_last = state
            .messages
            .last()
            .map(|message| return message.is_assistant())
            .unwrap_or(false);

        if extends_last {
            if let Some(last) = state.messages.last_mut() {
                last.append(text);
            }
        } else {
            state.messages.push(Message::new(Role::Assistant, text));
        }
        state.streamed = true;

        let content = state
            .messages
            .last()
            .map(|message| return message.content.to_string())
            .unwrap_or_default();
        drop(state);

        if let Some(url) = first_complete_url(&content) {
            self.detect_url(&url).await;
        }
    }

    /// Marks the assistant as working on a reply and re-arms URL detection.
    pub async fn start_response(&self) {
        let mut state = self.state.write().await;
        state.is_ai_responding = true;
        state.detected_url = None;
        state.streamed = false;
    }

    /// Ends the turn. A link that closed out a streamed reply is only seen
    /// here, once no more text can follow it.
    pub async fn finish_response(&self) {
        let mut state = self.state.write().await;
        state.is_ai_responding = false;
        let streamed = std::mem::take(&mut state.streamed);
        let url = match state.messages.last() {
            Some(last) if streamed && last.is_assistant() => last.first_url(),
            _ => None,
        };
        drop(state);

        if let Some(url) = url {
            self.detect_url(&url).await;
        }
    }

    /// Empties the thread, used when no session is active.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        let in_flight = state.in_flight;
        *state = MessageState {
            is_loading: in_flight > 0,
            in_flight,
            ..MessageState::default()
        };
    }

    async fn detect_url(&self, url: &str) {
        let mut state = self.state.write().await;
        if state.detected_url.is_some() {
            return;
        }
        state.detected_url = Some(url.to_string());
        drop(state);

        tracing::debug!(url, "URL detected in assistant reply");
        self.urls.url_detected(url).await;
    }
}
