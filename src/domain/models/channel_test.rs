use anyhow::Result;

use super::ChannelEvent;
use super::ClientEvent;
use super::MessageResponsePayload;
use super::SendMessagePayload;
use super::ServerEvent;
use super::SessionPayload;
use crate::domain::models::Role;

fn parse(frame: &str) -> Result<Option<ChannelEvent>> {
    let event: ServerEvent = serde_json::from_str(frame)?;
    return Ok(ChannelEvent::from_server(event));
}

#[test]
fn it_serializes_join_session() -> Result<()> {
    let event = ClientEvent::JoinSession(SessionPayload {
        session_id: "s-1".to_string(),
    });
    insta::assert_snapshot!(serde_json::to_string(&event)?, @r###"{"event":"joinSession","data":{"sessionId":"s-1"}}"###);

    return Ok(());
}

#[test]
fn it_serializes_send_message() -> Result<()> {
    let event = ClientEvent::SendMessage(SendMessagePayload {
        message: "hello".to_string(),
        message_id: "m-1".to_string(),
        session_id: "s-1".to_string(),
    });
    insta::assert_snapshot!(serde_json::to_string(&event)?, @r###"{"event":"sendMessage","data":{"message":"hello","messageId":"m-1","sessionId":"s-1"}}"###);

    return Ok(());
}

#[test]
fn it_parses_chunk() -> Result<()> {
    let event = parse(r#"{"event":"messageChunk","data":{"chunk":"Hel"}}"#)?;
    assert_eq!(event, Some(ChannelEvent::Chunk("Hel".to_string())));

    return Ok(());
}

#[test]
fn it_parses_complete_without_data() -> Result<()> {
    let event = parse(r#"{"event":"messageComplete"}"#)?;
    assert_eq!(event, Some(ChannelEvent::Complete));

    return Ok(());
}

#[test]
fn it_parses_title_updated() -> Result<()> {
    let event = parse(
        r#"{"event":"sessionTitleUpdated","data":{"sessionId":"s-1","title":"Trip ideas","timestamp":"2024-03-01T10:00:00Z"}}"#,
    )?;
    assert_eq!(
        event,
        Some(ChannelEvent::TitleUpdated {
            session_id: "s-1".to_string(),
            title: "Trip ideas".to_string(),
            timestamp: "2024-03-01T10:00:00Z".to_string(),
        })
    );

    return Ok(());
}

#[test]
fn it_parses_error() -> Result<()> {
    let event = parse(r#"{"event":"error","data":{"message":"boom"}}"#)?;
    assert_eq!(event, Some(ChannelEvent::Error("boom".to_string())));

    return Ok(());
}

#[test]
fn it_parses_response_with_content() -> Result<()> {
    let event = parse(
        r#"{"event":"messageResponse","data":{"id":"m-7","content":"Done","role":"assistant"}}"#,
    )?;
    match event {
        Some(ChannelEvent::Response(msg)) => {
            assert_eq!(msg.id, "m-7");
            assert_eq!(msg.content, "Done");
            assert_eq!(msg.role, Role::Assistant);
        }
        _ => panic!("expected a response event"),
    }

    return Ok(());
}

#[test]
fn it_parses_response_with_message_field() -> Result<()> {
    let event = parse(r#"{"event":"messageResponse","data":{"message":"Plain reply"}}"#)?;
    match event {
        Some(ChannelEvent::Response(msg)) => {
            assert_eq!(msg.content, "Plain reply");
            assert_eq!(msg.role, Role::Assistant);
            assert!(!msg.id.is_empty());
        }
        _ => panic!("expected a response event"),
    }

    return Ok(());
}

#[test]
fn it_prefers_content_over_message() {
    let payload = MessageResponsePayload {
        content: Some("content".to_string()),
        message: Some("message".to_string()),
        ..MessageResponsePayload::default()
    };
    assert_eq!(payload.into_message().unwrap().content, "content");
}

#[test]
fn it_drops_empty_response() -> Result<()> {
    let event = parse(r#"{"event":"messageResponse","data":{}}"#)?;
    assert_eq!(event, None);

    return Ok(());
}

#[test]
fn it_rejects_unknown_events() {
    let res = serde_json::from_str::<ServerEvent>(r#"{"event":"typing","data":{}}"#);
    assert!(res.is_err());
}

#[test]
fn it_flags_terminal_events() {
    assert!(ChannelEvent::Complete.is_terminal());
    assert!(ChannelEvent::Error("x".to_string()).is_terminal());
    assert!(ChannelEvent::Disconnected.is_terminal());
    assert!(!ChannelEvent::Chunk("x".to_string()).is_terminal());
    assert!(!ChannelEvent::Connected.is_terminal());
}
