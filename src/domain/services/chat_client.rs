#[cfg(test)]
#[path = "chat_client_test.rs"]
mod tests;

use std::sync::Arc;

use tokio::sync::mpsc;

use super::ActiveSession;
use super::ChannelRelay;
use super::MessageStore;
use super::Notifier;
use super::SessionStore;
use super::UiStore;
use crate::domain::models::ApiBox;
use crate::domain::models::ChannelEvent;
use crate::domain::models::Session;
use crate::domain::models::StoreError;
use crate::domain::models::StoreResult;
use crate::domain::models::UpdateSessionRequest;
use crate::infrastructure::channel::ConnectionManager;
use crate::infrastructure::storage::Storage;

/// Wires the stores to the push channel and keeps the joined session in
/// step with the active one.
#[derive(Clone)]
pub struct ChatClient {
    pub sessions: SessionStore,
    pub messages: MessageStore,
    pub ui: UiStore,
    connection: ConnectionManager,
    notifier: Notifier,
    streaming: bool,
}

impl ChatClient {
    pub fn new(
        api: ApiBox,
        connection: ConnectionManager,
        notifier: Notifier,
        storage: Option<Storage>,
        streaming: bool,
    ) -> ChatClient {
        let sessions = SessionStore::new(api.clone(), notifier.clone(), storage.clone());
        let ui = UiStore::new(storage);
        let messages = MessageStore::new(
            api,
            Arc::new(sessions.clone()),
            Arc::new(ui.clone()),
            notifier.clone(),
        );

        return ChatClient {
            sessions,
            messages,
            ui,
            connection,
            notifier,
            streaming,
        };
    }

    /// Restores saved state, loads sessions, opens the push channel when
    /// streaming is on and loads the active thread. A channel that fails to
    /// open leaves the client on the REST flow.
    pub async fn start(
        &self,
        socket_url: &str,
        view: Option<mpsc::UnboundedSender<ChannelEvent>>,
    ) -> StoreResult<()> {
        self.sessions.restore().await;
        self.ui.restore().await;
        self.sessions.fetch_sessions().await?;

        if self.streaming {
            let (tx, rx) = mpsc::unbounded_channel::<ChannelEvent>();
            self.connection.register_handlers(tx).await;
            let relay = ChannelRelay::new(self.messages.clone(), self.sessions.clone(), view);
            tokio::spawn(relay.start(rx));

            if let Err(err) = self.connection.connect(socket_url).await {
                tracing::warn!(error = ?err, socket_url, "Push channel unavailable");
                self.notifier
                    .error("Live updates unavailable, replies will arrive in one piece");
            }
        }

        let active = self.sessions.active_session_id().await;
        if active.is_empty() {
            return Ok(());
        }

        self.connection.join_session(&active).await;
        return self.messages.fetch_messages(Some(&active)).await;
    }

    /// Moves the joined session and the thread over to whatever is active
    /// now, if it differs from `previous`.
    async fn follow_active(&self, previous: &str) -> StoreResult<()> {
        let active = self.sessions.active_session_id().await;
        if active == previous {
            return Ok(());
        }

        self.connection.leave_session(previous).await;
        if active.is_empty() {
            self.messages.reset().await;
            return Ok(());
        }

        self.connection.join_session(&active).await;
        return self.messages.fetch_messages(Some(&active)).await;
    }

    /// Opens a session from the list. Unknown ids are refused so the active
    /// id always names a listed session.
    pub async fn select_session(&self, id: &str) -> StoreResult<()> {
        let known = self
            .sessions
            .sessions()
            .await
            .iter()
            .any(|session| return session.id == id);
        if !known {
            return Err(StoreError::precondition(&format!("Unknown session '{id}'")));
        }

        let previous = self.sessions.active_session_id().await;
        if previous == id {
            return self.messages.fetch_messages(Some(id)).await;
        }

        self.sessions.set_active_session(id).await;
        return self.follow_active(&previous).await;
    }

    pub async fn create_session(&self, title: &str) -> StoreResult<Session> {
        let previous = self.sessions.active_session_id().await;
        let session = self.sessions.create_session(title).await?;
        self.follow_active(&previous).await?;

        return Ok(session);
    }

    pub async fn rename_session(&self, id: &str, title: &str) -> StoreResult<Session> {
        return self
            .sessions
            .update_session(id, UpdateSessionRequest::title(title))
            .await;
    }

    pub async fn archive_session(&self, id: &str) -> StoreResult<Session> {
        let previous = self.sessions.active_session_id().await;
        let session = self
            .sessions
            .update_session(id, UpdateSessionRequest::archive())
            .await?;
        self.follow_active(&previous).await?;

        return Ok(session);
    }

    pub async fn delete_session(&self, id: &str) -> StoreResult<()> {
        let previous = self.sessions.active_session_id().await;
        self.sessions.delete_session(id).await?;
        return self.follow_active(&previous).await;
    }

    /// Sends over the push channel when streaming, otherwise over REST.
    pub async fn send(&self, text: &str) -> StoreResult<()> {
        if !self.streaming {
            return self.messages.send_message(text).await;
        }

        let active = self.sessions.active_session_id().await;
        if active.is_empty() {
            return Err(StoreError::precondition("No active session"));
        }
        if text.trim().is_empty() {
            return Err(StoreError::precondition("Message is empty"));
        }
        if !self.connection.is_connected().await {
            return Err(StoreError::precondition("Push channel is not connected"));
        }

        let joined = self.connection.current_session_id().await;
        if joined != active {
            self.connection.leave_session(&joined).await;
            self.connection.join_session(&active).await;
        }

        let message = self.messages.push_optimistic(text).await;
        self.messages.start_response().await;
        if !self.connection.send(&message, &active).await {
            self.messages.finish_response().await;
            self.notifier.error("Failed to send message");
            return Err(StoreError::precondition(
                "Push channel closed before the message was sent",
            ));
        }

        return Ok(());
    }

    pub async fn shutdown(&self) {
        let active = self.sessions.active_session_id().await;
        self.connection.leave_session(&active).await;
        self.connection.disconnect().await;
    }
}
