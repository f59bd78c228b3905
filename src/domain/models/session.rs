#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use chrono::DateTime;
use chrono::Local;
use serde_derive::Deserialize;
use serde_derive::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Session {
    pub fn new(id: &str, title: &str) -> Session {
        return Session {
            id: id.to_string(),
            title: title.to_string(),
            ..Session::default()
        };
    }

    pub fn is_archived(&self) -> bool {
        return self.archived.unwrap_or(false);
    }

    /// Most recent known change, rendered in local time.
    pub fn last_activity(&self) -> Option<String> {
        let raw = self
            .updated_at
            .as_ref()
            .or(self.created_at.as_ref())
            .or(self.timestamp.as_ref())?;

        return DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|date| return date.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string());
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub title: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSessionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
}

impl UpdateSessionRequest {
    pub fn title(title: &str) -> UpdateSessionRequest {
        return UpdateSessionRequest {
            title: Some(title.to_string()),
            archived: None,
        };
    }

    pub fn archive() -> UpdateSessionRequest {
        return UpdateSessionRequest {
            title: None,
            archived: Some(true),
        };
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub session_id: String,
    pub reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_url: Option<String>,
}
