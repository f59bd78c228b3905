#[cfg(test)]
#[path = "session_store_test.rs"]
mod tests;

use std::sync::Arc;

use async_trait::async_trait;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use tokio::sync::RwLock;

use super::ActiveSession;
use super::Notifier;
use crate::domain::models::ApiBox;
use crate::domain::models::CreateSessionRequest;
use crate::domain::models::Session;
use crate::domain::models::StoreError;
use crate::domain::models::StoreResult;
use crate::domain::models::UpdateSessionRequest;
use crate::infrastructure::storage::Storage;

const STORAGE_NAME: &str = "chat-sessions-storage";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    pub sessions: Vec<Session>,
    pub active_session_id: String,
    pub is_loading: bool,
    pub error: Option<StoreError>,
    in_flight: usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedSessions {
    #[serde(default)]
    sessions: Vec<Session>,
    #[serde(default)]
    active_session_id: String,
}

/// Picks the session to fall back to when `leaving` stops being usable.
/// Non-archived sessions win; `any_remaining` also accepts archived ones.
fn next_active(sessions: &[Session], leaving: &str, any_remaining: bool) -> String {
    let candidates = sessions.iter().filter(|s| return s.id != leaving);
    let mut fallback = "".to_string();
    for session in candidates {
        if !session.is_archived() {
            return session.id.to_string();
        }
        if any_remaining && fallback.is_empty() {
            fallback = session.id.to_string();
        }
    }

    return fallback;
}

/// Session list and the id of the one on screen.
#[derive(Clone)]
pub struct SessionStore {
    api: ApiBox,
    notifier: Notifier,
    storage: Option<Storage>,
    state: Arc<RwLock<SessionState>>,
}

impl SessionStore {
    pub fn new(api: ApiBox, notifier: Notifier, storage: Option<Storage>) -> SessionStore {
        return SessionStore {
            api,
            notifier,
            storage,
            state: Arc::new(RwLock::new(SessionState::default())),
        };
    }

    pub async fn snapshot(&self) -> SessionState {
        return self.state.read().await.clone();
    }

    pub async fn sessions(&self) -> Vec<Session> {
        return self.state.read().await.sessions.clone();
    }

    pub async fn active_session(&self) -> Option<Session> {
        let state = self.state.read().await;
        return state
            .sessions
            .iter()
            .find(|s| return s.id == state.active_session_id)
            .cloned();
    }

    /// Loads the list and active id saved by an earlier run.
    pub async fn restore(&self) {
        let storage = match &self.storage {
            Some(storage) => storage,
            None => return,
        };

        match storage.load::<PersistedSessions>(STORAGE_NAME).await {
            Ok(Some(saved)) => {
                let mut state = self.state.write().await;
                state.sessions = saved.sessions;
                state.active_session_id = saved.active_session_id;
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = ?err, "Discarding unreadable session storage");
                if let Err(err) = storage.remove(STORAGE_NAME).await {
                    tracing::warn!(error = ?err, "Failed to remove unreadable session storage");
                }
            }
        }
    }

    async fn persist(&self) {
        let storage = match &self.storage {
            Some(storage) => storage,
            None => return,
        };

        let state = self.state.read().await;
        let saved = PersistedSessions {
            sessions: state.sessions.clone(),
            active_session_id: state.active_session_id.to_string(),
        };
        drop(state);

        if let Err(err) = storage.save(STORAGE_NAME, &saved).await {
            tracing::warn!(error = ?err, "Failed to persist sessions");
        }
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
        tracing::error!(error = %err, "Session store action failed");
        self.state.write().await.error = Some(err.clone());
        self.notifier.error(notice);

        return err;
    }

    /// Replaces the list. Without a usable active id the first session
    /// becomes active.
    pub async fn fetch_sessions(&self) -> StoreResult<()> {
        self.begin_request().await;
        let res = self.api.list_sessions().await;
        self.end_request().await;

        let sessions = match res {
            Ok(sessions) => sessions,
            Err(err) => {
                let err = StoreError::request("Failed to fetch sessions", err);
                return Err(self.fail(err, "Failed to load chat sessions").await);
            }
        };

        let mut state = self.state.write().await;
        let known = sessions
            .iter()
            .any(|s| return s.id == state.active_session_id);
        if !known {
            state.active_session_id = sessions
                .first()
                .map(|s| return s.id.to_string())
                .unwrap_or_default();
        }
        state.sessions = sessions;
        tracing::debug!(
            count = state.sessions.len(),
            active = state.active_session_id,
            "Sessions loaded"
        );
        drop(state);

        self.persist().await;
        return Ok(());
    }

    /// Adds the new session on top and opens it.
    pub async fn create_session(&self, title: &str) -> StoreResult<Session> {
        self.begin_request().await;
        let res = self
            .api
            .create_session(&CreateSessionRequest {
                title: title.to_string(),
            })
            .await;
        self.end_request().await;

        let session = match res {
            Ok(session) => session,
            Err(err) => {
                let err = StoreError::request("Failed to create session", err);
                return Err(self.fail(err, "Failed to create new chat").await);
            }
        };

        let mut state = self.state.write().await;
        state.sessions.insert(0, session.clone());
        state.active_session_id = session.id.to_string();
        drop(state);

        self.persist().await;
        self.notifier.success("New chat created");
        return Ok(session);
    }

    /// Patches a session. Archiving the active session moves the active id to
    /// another non-archived session, or clears it when there is none.
    pub async fn update_session(&self, id: &str, req: UpdateSessionRequest) -> StoreResult<Session> {
        self.begin_request().await;
        let res = self.api.update_session(id, &req).await;
        self.end_request().await;

        let updated = match res {
            Ok(session) => session,
            Err(err) => {
                let err = StoreError::request(&format!("Failed to update session {id}"), err);
                return Err(self.fail(err, "Failed to update session").await);
            }
        };

        let archived = req.archived.unwrap_or(false);
        let mut state = self.state.write().await;
        for session in state.sessions.iter_mut() {
            if session.id == id {
                *session = updated.clone();
            }
        }
        if archived && state.active_session_id == id {
            state.active_session_id = next_active(&state.sessions, id, false);
            tracing::debug!(
                archived = id,
                active = state.active_session_id,
                "Active session archived"
            );
        }
        drop(state);

        self.persist().await;
        if archived {
            self.notifier.success("Session archived");
        } else {
            self.notifier.success("Session updated");
        }

        return Ok(updated);
    }

    /// Deletes a session. When it was active another session takes its place
    /// before it leaves the list.
    pub async fn delete_session(&self, id: &str) -> StoreResult<()> {
        self.begin_request().await;
        let res = self.api.delete_session(id).await;
        self.end_request().await;

        if let Err(err) = res {
            let err = StoreError::request(&format!("Failed to delete session {id}"), err);
            return Err(self.fail(err, "Failed to delete session").await);
        }

        let mut state = self.state.write().await;
        if state.active_session_id == id {
            state.active_session_id = next_active(&state.sessions, id, true);
        }
        state.sessions.retain(|s| return s.id != id);
        drop(state);

        self.persist().await;
        self.notifier.success("Session deleted");
        return Ok(());
    }

    pub async fn set_active_session(&self, id: &str) {
        self.state.write().await.active_session_id = id.to_string();
        self.persist().await;
    }

    /// Title pushed by the server, e.g. after it summarized the first turn.
    pub async fn update_session_title_from_socket(&self, session_id: &str, title: &str) {
        tracing::debug!(session_id, title, "Session title pushed");
        let mut state = self.state.write().await;
        for session in state.sessions.iter_mut() {
            if session.id == session_id {
                session.title = title.to_string();
            }
        }
        let is_active = state.active_session_id == session_id;
        drop(state);

        self.persist().await;
        if is_active {
            self.notifier.info(&format!("Chat renamed to \"{title}\""));
        }
    }
}

#[async_trait]
impl ActiveSession for SessionStore {
    async fn active_session_id(&self) -> String {
        return self.state.read().await.active_session_id.to_string();
    }
}
