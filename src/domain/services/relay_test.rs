use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;

use super::ChannelRelay;
use crate::domain::models::ChannelEvent;
use crate::domain::models::Message;
use crate::domain::models::Role;
use crate::domain::models::Session;
use crate::domain::services::MessageStore;
use crate::domain::services::Notifier;
use crate::domain::services::SessionStore;
use crate::domain::services::UiStore;
use crate::infrastructure::api::fake::FakeChatApi;

struct Fixture {
    relay: ChannelRelay,
    messages: MessageStore,
    sessions: SessionStore,
    ui: UiStore,
    view: mpsc::UnboundedReceiver<ChannelEvent>,
}

async fn fixture() -> Result<Fixture> {
    let api = Arc::new(FakeChatApi::with_sessions(vec![
        Session::new("s-1", "New chat"),
        Session::new("s-2", "Other"),
    ]));
    let sessions = SessionStore::new(api.clone(), Notifier::default(), None);
    sessions.fetch_sessions().await?;
    let ui = UiStore::default();
    let messages = MessageStore::new(
        api,
        Arc::new(sessions.clone()),
        Arc::new(ui.clone()),
        Notifier::default(),
    );
    let (tx, view) = mpsc::unbounded_channel::<ChannelEvent>();
    let relay = ChannelRelay::new(messages.clone(), sessions.clone(), Some(tx));

    return Ok(Fixture {
        relay,
        messages,
        sessions,
        ui,
        view,
    });
}

#[tokio::test]
async fn it_streams_chunks_into_one_reply() -> Result<()> {
    let mut fx = fixture().await?;
    fx.messages.push_optimistic("hello").await;
    fx.messages.start_response().await;

    for event in [
        ChannelEvent::Received {
            message_id: "m-1".to_string(),
        },
        ChannelEvent::Chunk("Preview at ".to_string()),
        ChannelEvent::Chunk("".to_string()),
        ChannelEvent::Chunk("https://example.com/app".to_string()),
        ChannelEvent::Complete,
    ] {
        fx.relay.handle(event).await;
    }

    let state = fx.messages.snapshot().await;
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.messages[1].content, "Preview at https://example.com/app");
    assert!(!state.is_ai_responding);
    assert_eq!(state.detected_url, Some("https://example.com/app".to_string()));
    assert!(fx.ui.snapshot().await.is_preview_open);

    let mut forwarded = 0;
    while fx.view.try_recv().is_ok() {
        forwarded += 1;
    }
    assert_eq!(forwarded, 5);

    return Ok(());
}

#[tokio::test]
async fn it_appends_whole_responses() -> Result<()> {
    let fx = fixture().await?;
    fx.messages.start_response().await;

    fx.relay
        .handle(ChannelEvent::Response(Message::with_id(
            "m-9",
            Role::Assistant,
            "All done",
        )))
        .await;

    let state = fx.messages.snapshot().await;
    assert_eq!(state.messages, vec![Message::with_id("m-9", Role::Assistant, "All done")]);
    assert!(!state.is_ai_responding);

    return Ok(());
}

#[tokio::test]
async fn it_clears_responding_on_error_and_disconnect() -> Result<()> {
    let fx = fixture().await?;

    fx.messages.start_response().await;
    fx.relay
        .handle(ChannelEvent::Error("model overloaded".to_string()))
        .await;
    assert!(!fx.messages.is_ai_responding().await);

    fx.messages.start_response().await;
    fx.relay.handle(ChannelEvent::Disconnected).await;
    assert!(!fx.messages.is_ai_responding().await);

    return Ok(());
}

#[tokio::test]
async fn it_applies_title_updates() -> Result<()> {
    let fx = fixture().await?;

    fx.relay
        .handle(ChannelEvent::TitleUpdated {
            session_id: "s-2".to_string(),
            title: "Renamed".to_string(),
            timestamp: "".to_string(),
        })
        .await;

    assert_eq!(fx.sessions.sessions().await[1].title, "Renamed");

    return Ok(());
}

#[tokio::test]
async fn it_runs_until_sender_closes() -> Result<()> {
    let fx = fixture().await?;
    let (tx, rx) = mpsc::unbounded_channel::<ChannelEvent>();

    tx.send(ChannelEvent::Chunk("Hi".to_string()))?;
    drop(tx);
    fx.relay.clone().start(rx).await;

    assert_eq!(fx.messages.messages().await[0].content, "Hi");

    return Ok(());
}
