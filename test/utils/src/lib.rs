/// A `GET /chat-sessions` body with two sessions, the second archived.
pub fn sessions_fixture() -> &'static str {
    return r#"
[
  {
    "id": "s-1",
    "title": "Planning",
    "createdAt": "2024-03-01T10:00:00Z",
    "updatedAt": "2024-03-01T10:05:00Z"
  },
  {
    "id": "s-2",
    "title": "Old thread",
    "archived": true,
    "createdAt": "2024-02-11T08:30:00Z",
    "updatedAt": "2024-02-12T09:00:00Z"
  }
]
"#
    .trim();
}

/// A `GET /chat-messages?sessionId=s-1` body.
pub fn messages_fixture() -> &'static str {
    return r#"
[
  {
    "id": "m-1",
    "sessionId": "s-1",
    "content": "Build a HR application",
    "role": "USER",
    "createdAt": "2024-03-01T10:00:01Z",
    "updatedAt": "2024-03-01T10:00:01Z"
  },
  {
    "id": "m-2",
    "sessionId": "s-1",
    "content": "Sure! Your preview is live at https://preview.example.com/hr",
    "role": "ASSISTANT",
    "createdAt": "2024-03-01T10:00:09Z",
    "updatedAt": "2024-03-01T10:00:09Z"
  }
]
"#
    .trim();
}
