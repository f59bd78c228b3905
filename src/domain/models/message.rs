#[cfg(test)]
#[path = "message_test.rs"]
mod tests;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use uuid::Uuid;

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    return Regex::new(r"https?://\S+").unwrap();
});

/// First `http(s)://` link in free text, up to the next whitespace.
pub fn first_url(text: &str) -> Option<String> {
    return URL_PATTERN
        .find(text)
        .map(|m| return m.as_str().to_string());
}

/// Like `first_url`, but only once whitespace follows the link. Text that is
/// still streaming in may end in the middle of a URL.
pub fn first_complete_url(text: &str) -> Option<String> {
    return URL_PATTERN
        .find(text)
        .filter(|m| return m.end() < text.len())
        .map(|m| return m.as_str().to_string());
}

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    #[serde(alias = "USER")]
    User,
    #[serde(alias = "ASSISTANT")]
    Assistant,
    #[serde(alias = "SYSTEM")]
    System,
}

impl Role {
    /// Spelling used by the REST API.
    pub fn as_api(&self) -> String {
        return self.to_string().to_uppercase();
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub role: Role,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Message {
        return Message {
            id: Uuid::new_v4().to_string(),
            content: content.to_string(),
            role,
        };
    }

    pub fn with_id(id: &str, role: Role, content: &str) -> Message {
        return Message {
            id: id.to_string(),
            content: content.to_string(),
            role,
        };
    }

    pub fn is_assistant(&self) -> bool {
        return self.role == Role::Assistant;
    }

    /// Streamed fragments are concatenated as delivered.
    pub fn append(&mut self, text: &str) {
        self.content += text;
    }

    pub fn first_url(&self) -> Option<String> {
        return first_url(&self.content);
    }

    /// Single line preview, as printed by `/history`.
    pub fn summary(&self, max_len: usize) -> String {
        let mut line = self.content.split('\n').next().unwrap_or("").to_string();
        if line.chars().count() > max_len {
            line = format!(
                "{}...",
                line.chars().take(max_len.saturating_sub(3)).collect::<String>()
            );
        }

        return line;
    }
}

/// Message shape returned by the `/chat-messages` endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: String,
    pub session_id: String,
    pub content: String,
    pub role: Role,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl From<MessageResponse> for Message {
    fn from(res: MessageResponse) -> Message {
        return Message {
            id: res.id,
            content: res.content,
            role: res.role,
        };
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    pub session_id: String,
    pub content: String,
    pub role: String,
}

impl CreateMessageRequest {
    pub fn new(session_id: &str, content: &str, role: Role) -> CreateMessageRequest {
        return CreateMessageRequest {
            session_id: session_id.to_string(),
            content: content.to_string(),
            role: role.as_api(),
        };
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMessageRequest {
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteMessageResponse {
    pub success: bool,
    pub message: String,
}
