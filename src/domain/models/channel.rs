#[cfg(test)]
#[path = "channel_test.rs"]
mod tests;

use serde_derive::Deserialize;
use serde_derive::Serialize;

use super::Message;
use super::Role;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    pub session_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub message: String,
    pub message_id: String,
    pub session_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReceivedPayload {
    pub message_id: String,
}

/// Non-streamed reply. Servers send the text either as `content` or as
/// `message`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponsePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl MessageResponsePayload {
    pub fn into_message(self) -> Option<Message> {
        let content = self.content.or(self.message)?;
        let role = self.role.unwrap_or(Role::Assistant);
        if let Some(id) = self.id {
            return Some(Message::with_id(&id, role, &content));
        }

        return Some(Message::new(role, &content));
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageChunkPayload {
    pub chunk: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTitleUpdatedPayload {
    pub session_id: String,
    pub title: String,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// Frames sent by the client over the push channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    JoinSession(SessionPayload),
    LeaveSession(SessionPayload),
    SendMessage(SendMessagePayload),
}

/// Frames pushed by the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    MessageReceived(MessageReceivedPayload),
    MessageResponse(MessageResponsePayload),
    MessageChunk(MessageChunkPayload),
    MessageComplete,
    SessionJoined(SessionPayload),
    SessionTitleUpdated(SessionTitleUpdatedPayload),
    Error(ErrorPayload),
}

/// What the connection manager hands to its registered handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelEvent {
    Connected,
    Disconnected,
    Received {
        message_id: String,
    },
    Response(Message),
    Chunk(String),
    Complete,
    SessionJoined(String),
    TitleUpdated {
        session_id: String,
        title: String,
        timestamp: String,
    },
    Error(String),
}

impl ChannelEvent {
    /// Events after which no more reply text is expected for the turn.
    pub fn is_terminal(&self) -> bool {
        return matches!(
            self,
            ChannelEvent::Response(_)
                | ChannelEvent::Complete
                | ChannelEvent::Error(_)
                | ChannelEvent::Disconnected
        );
    }

    /// Returns `None` for a response frame without any text.
    pub fn from_server(event: ServerEvent) -> Option<ChannelEvent> {
        let res = match event {
            ServerEvent::MessageReceived(payload) => ChannelEvent::Received {
                message_id: payload.message_id,
            },
            ServerEvent::MessageResponse(payload) => ChannelEvent::Response(payload.into_message()?),
            ServerEvent::MessageChunk(payload) => ChannelEvent::Chunk(payload.chunk),
            ServerEvent::MessageComplete => ChannelEvent::Complete,
            ServerEvent::SessionJoined(payload) => ChannelEvent::SessionJoined(payload.session_id),
            ServerEvent::SessionTitleUpdated(payload) => ChannelEvent::TitleUpdated {
                session_id: payload.session_id,
                title: payload.title,
                timestamp: payload.timestamp,
            },
            ServerEvent::Error(payload) => ChannelEvent::Error(payload.message),
        };

        return Some(res);
    }
}
