#[cfg(test)]
#[path = "http_test.rs"]
mod tests;

use std::time::Duration;

use anyhow::anyhow;
use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::RequestBuilder;
use reqwest::Response;
use serde::de::DeserializeOwned;
use url::Url;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::ChatApi;
use crate::domain::models::ChatRequest;
use crate::domain::models::ChatResponse;
use crate::domain::models::CreateMessageRequest;
use crate::domain::models::CreateSessionRequest;
use crate::domain::models::DeleteMessageResponse;
use crate::domain::models::MessageResponse;
use crate::domain::models::Session;
use crate::domain::models::UpdateMessageRequest;
use crate::domain::models::UpdateSessionRequest;

pub struct HttpChatApi {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl Default for HttpChatApi {
    fn default() -> HttpChatApi {
        let timeout = Config::get_u64(ConfigKey::RequestTimeout).unwrap_or(30000);
        return HttpChatApi::new(&Config::get(ConfigKey::ApiURL), timeout);
    }
}

impl HttpChatApi {
    pub fn new(url: &str, timeout_ms: u64) -> HttpChatApi {
        return HttpChatApi {
            client: reqwest::Client::new(),
            url: url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(timeout_ms),
        };
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.url)?;
        url.path_segments_mut()
            .map_err(|_| return anyhow!("API URL {} cannot take a path", self.url))?
            .pop_if_empty()
            .extend(segments);

        return Ok(url);
    }

    async fn send(&self, req: RequestBuilder, operation: &str) -> Result<Response> {
        let res = req.timeout(self.timeout).send().await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            tracing::error!(status, body = %body, operation = %operation, "Chat API request failed");
            bail!(format!("Failed to {operation}, status code {status}"));
        }

        return Ok(res);
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        operation: &str,
    ) -> Result<T> {
        let res = self.send(req, operation).await?;
        let body = res.json::<T>().await?;

        return Ok(body);
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    #[allow(clippy::implicit_return)]
    async fn create_session(&self, req: &CreateSessionRequest) -> Result<Session> {
        let builder = self.client.post(self.endpoint(&["chat-sessions"])?).json(req);
        return self.send_json(builder, "create chat session").await;
    }

    #[allow(clippy::implicit_return)]
    async fn list_sessions(&self) -> Result<Vec<Session>> {
        let builder = self.client.get(self.endpoint(&["chat-sessions"])?);
        return self.send_json(builder, "fetch chat sessions").await;
    }

    #[allow(clippy::implicit_return)]
    async fn get_session(&self, id: &str) -> Result<Session> {
        let builder = self.client.get(self.endpoint(&["chat-sessions", id])?);
        return self
            .send_json(builder, &format!("fetch chat session {id}"))
            .await;
    }

    #[allow(clippy::implicit_return)]
    async fn update_session(&self, id: &str, req: &UpdateSessionRequest) -> Result<Session> {
        let builder = self
            .client
            .patch(self.endpoint(&["chat-sessions", id])?)
            .json(req);
        return self
            .send_json(builder, &format!("update chat session {id}"))
            .await;
    }

    #[allow(clippy::implicit_return)]
    async fn delete_session(&self, id: &str) -> Result<()> {
        let builder = self
            .client
            .delete(self.endpoint(&["chat-sessions", id])?);
        self.send(builder, &format!("delete chat session {id}"))
            .await?;

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn create_message(&self, req: &CreateMessageRequest) -> Result<MessageResponse> {
        let builder = self.client.post(self.endpoint(&["chat-messages"])?).json(req);
        return self.send_json(builder, "create chat message").await;
    }

    #[allow(clippy::implicit_return)]
    async fn list_messages(&self, session_id: &str) -> Result<Vec<MessageResponse>> {
        let builder = self
            .client
            .get(self.endpoint(&["chat-messages"])?)
            .query(&[("sessionId", session_id)]);
        return self.send_json(builder, "fetch chat messages").await;
    }

    #[allow(clippy::implicit_return)]
    async fn update_message(
        &self,
        id: &str,
        req: &UpdateMessageRequest,
    ) -> Result<MessageResponse> {
        let builder = self
            .client
            .patch(self.endpoint(&["chat-messages", id])?)
            .json(req);
        return self
            .send_json(builder, &format!("update chat message {id}"))
            .await;
    }

    #[allow(clippy::implicit_return)]
    async fn delete_message(&self, id: &str) -> Result<DeleteMessageResponse> {
        let builder = self
            .client
            .delete(self.endpoint(&["chat-messages", id])?);
        return self
            .send_json(builder, &format!("delete chat message {id}"))
            .await;
    }

    #[allow(clippy::implicit_return)]
    async fn delete_session_messages(&self, session_id: &str) -> Result<()> {
        let builder = self
            .client
            .delete(self.endpoint(&["chat-messages", "session", session_id])?);
        self.send(
            builder,
            &format!("delete messages for chat session {session_id}"),
        )
        .await?;

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn send_chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let builder = self.client.post(self.endpoint(&["chat"])?).json(req);
        return self.send_json(builder, "send chat message").await;
    }
}
