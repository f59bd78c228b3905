use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Notify;

use crate::domain::models::ChatApi;
use crate::domain::models::ChatRequest;
use crate::domain::models::ChatResponse;
use crate::domain::models::CreateMessageRequest;
use crate::domain::models::CreateSessionRequest;
use crate::domain::models::DeleteMessageResponse;
use crate::domain::models::MessageResponse;
use crate::domain::models::Role;
use crate::domain::models::Session;
use crate::domain::models::UpdateMessageRequest;
use crate::domain::models::UpdateSessionRequest;

#[derive(Default)]
struct FakeState {
    sessions: Vec<Session>,
    messages: HashMap<String, Vec<MessageResponse>>,
    failing: HashSet<String>,
    gates: HashMap<String, Arc<Notify>>,
    next_id: usize,
    reply: Option<ChatResponse>,
    calls: Vec<String>,
}

/// In-memory chat service. Operations listed in `fail` return an error, and
/// `gate` holds `list_messages` for a session until the returned `Notify` is
/// triggered.
#[derive(Clone, Default)]
pub struct FakeChatApi {
    state: Arc<Mutex<FakeState>>,
}

impl FakeChatApi {
    pub fn with_sessions(sessions: Vec<Session>) -> FakeChatApi {
        let api = FakeChatApi::default();
        api.state.lock().unwrap().sessions = sessions;
        return api;
    }

    pub fn add_message(&self, session_id: &str, id: &str, role: Role, content: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .messages
            .entry(session_id.to_string())
            .or_default()
            .push(MessageResponse {
                id: id.to_string(),
                session_id: session_id.to_string(),
                content: content.to_string(),
                role,
                created_at: "".to_string(),
                updated_at: "".to_string(),
            });
    }

    pub fn fail(&self, operation: &str) {
        self.state
            .lock()
            .unwrap()
            .failing
            .insert(operation.to_string());
    }

    pub fn recover(&self, operation: &str) {
        self.state.lock().unwrap().failing.remove(operation);
    }

    pub fn gate(&self, session_id: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.state
            .lock()
            .unwrap()
            .gates
            .insert(session_id.to_string(), notify.clone());
        return notify;
    }

    pub fn set_reply(&self, reply: &str, app_url: Option<&str>) {
        self.state.lock().unwrap().reply = Some(ChatResponse {
            session_id: "".to_string(),
            reply: reply.to_string(),
            app_url: app_url.map(|url| return url.to_string()),
        });
    }

    pub fn calls(&self) -> Vec<String> {
        return self.state.lock().unwrap().calls.clone();
    }

    pub fn stored_messages(&self, session_id: &str) -> Vec<MessageResponse> {
        return self
            .state
            .lock()
            .unwrap()
            .messages
            .get(session_id)
            .cloned()
            .unwrap_or_default();
    }

    fn enter(&self, operation: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(operation.to_string());
        if state.failing.contains(operation) {
            bail!(format!("{operation} failed"));
        }

        return Ok(());
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        return format!("{prefix}-new-{}", state.next_id);
    }
}

#[async_trait]
impl ChatApi for FakeChatApi {
    async fn create_session(&self, req: &CreateSessionRequest) -> Result<Session> {
        self.enter("create_session")?;
        let session = Session::new(&self.next_id("s"), &req.title);
        self.state
            .lock()
            .unwrap()
            .sessions
            .insert(0, session.clone());
        return Ok(session);
    }

    async fn list_sessions(&self) -> Result<Vec<Session>> {
        self.enter("list_sessions")?;
        return Ok(self.state.lock().unwrap().sessions.clone());
    }

    async fn get_session(&self, id: &str) -> Result<Session> {
        self.enter("get_session")?;
        let state = self.state.lock().unwrap();
        if let Some(session) = state.sessions.iter().find(|s| return s.id == id) {
            return Ok(session.clone());
        }

        bail!(format!("session {id} not found"));
    }

    async fn update_session(&self, id: &str, req: &UpdateSessionRequest) -> Result<Session> {
        self.enter("update_session")?;
        let mut state = self.state.lock().unwrap();
        let session = match state.sessions.iter_mut().find(|s| return s.id == id) {
            Some(session) => session,
            None => bail!(format!("session {id} not found")),
        };
        if let Some(title) = &req.title {
            session.title = title.to_string();
        }
        if let Some(archived) = req.archived {
            session.archived = Some(archived);
        }

        return Ok(session.clone());
    }

    async fn delete_session(&self, id: &str) -> Result<()> {
        self.enter("delete_session")?;
        self.state
            .lock()
            .unwrap()
            .sessions
            .retain(|s| return s.id != id);
        return Ok(());
    }

    async fn create_message(&self, req: &CreateMessageRequest) -> Result<MessageResponse> {
        self.enter("create_message")?;
        let id = self.next_id("m");
        self.add_message(&req.session_id, &id, req.role.parse::<Role>()?, &req.content);
        let stored = self.stored_messages(&req.session_id);
        return Ok(stored[stored.len() - 1].clone());
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<MessageResponse>> {
        self.enter("list_messages")?;
        let gate = self.state.lock().unwrap().gates.get(session_id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        return Ok(self.stored_messages(session_id));
    }

    async fn update_message(
        &self,
        id: &str,
        req: &UpdateMessageRequest,
    ) -> Result<MessageResponse> {
        self.enter("update_message")?;
        let mut state = self.state.lock().unwrap();
        for messages in state.messages.values_mut() {
            if let Some(message) = messages.iter_mut().find(|m| return m.id == id) {
                message.content = req.content.to_string();
                return Ok(message.clone());
            }
        }

        bail!(format!("message {id} not found"));
    }

    async fn delete_message(&self, id: &str) -> Result<DeleteMessageResponse> {
        self.enter("delete_message")?;
        let mut state = self.state.lock().unwrap();
        for messages in state.messages.values_mut() {
            messages.retain(|m| return m.id != id);
        }

        return Ok(DeleteMessageResponse {
            success: true,
            message: "Message deleted".to_string(),
        });
    }

    async fn delete_session_messages(&self, session_id: &str) -> Result<()> {
        self.enter("delete_session_messages")?;
        self.state.lock().unwrap().messages.remove(session_id);
        return Ok(());
    }

    async fn send_chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        self.enter("send_chat")?;
        let reply = self.state.lock().unwrap().reply.clone();
        let mut res = reply.unwrap_or(ChatResponse {
            session_id: "".to_string(),
            reply: format!("echo: {}", req.message),
            app_url: None,
        });
        res.session_id = req.session_id.to_string();

        return Ok(res);
    }
}
