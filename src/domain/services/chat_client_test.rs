use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use serde_json::json;
use tokio::sync::mpsc;

use super::ChatClient;
use crate::domain::models::ChannelEvent;
use crate::domain::models::Role;
use crate::domain::models::Session;
use crate::domain::models::StoreError;
use crate::domain::services::ActiveSession;
use crate::domain::services::Notifier;
use crate::infrastructure::api::fake::FakeChatApi;
use crate::infrastructure::channel::test_server::TestServer;
use crate::infrastructure::channel::ConnectionManager;

fn client_with(api: &FakeChatApi, connection: &ConnectionManager, streaming: bool) -> ChatClient {
    return ChatClient::new(
        Arc::new(api.clone()),
        connection.clone(),
        Notifier::default(),
        None,
        streaming,
    );
}

fn client(api: &FakeChatApi, streaming: bool) -> ChatClient {
    return client_with(api, &ConnectionManager::default(), streaming);
}

async fn wait_for(
    rx: &mut mpsc::UnboundedReceiver<ChannelEvent>,
    expected: ChannelEvent,
) -> Result<()> {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await?;
        match event {
            Some(event) if event == expected => return Ok(()),
            Some(_) => continue,
            None => bail!("view channel closed"),
        }
    }
}

#[tokio::test]
async fn it_streams_a_reply_into_a_new_session() -> Result<()> {
    let mut server = TestServer::start().await?;
    let api = FakeChatApi::default();
    let client = client(&api, true);
    let (view_tx, mut view) = mpsc::unbounded_channel::<ChannelEvent>();

    client.start(&server.url, Some(view_tx)).await?;
    wait_for(&mut view, ChannelEvent::Connected).await?;

    let session = client.create_session("Test").await?;
    assert_eq!(client.sessions.active_session_id().await, session.id);
    assert_eq!(
        server.next_frame().await,
        Some(json!({"event": "joinSession", "data": {"sessionId": session.id}}))
    );

    client.send("hello https://example.com").await?;
    assert!(client.messages.is_ai_responding().await);

    let frame = server.next_frame().await.unwrap_or_default();
    assert_eq!(frame["event"], "sendMessage");
    assert_eq!(frame["data"]["message"], "hello https://example.com");
    assert_eq!(frame["data"]["sessionId"], session.id.as_str());
    let message_id = frame["data"]["messageId"].as_str().unwrap_or_default();
    assert_eq!(client.messages.messages().await[0].id, message_id);

    server.push(json!({"event": "messageReceived", "data": {"messageId": message_id}}));
    server.push(json!({"event": "messageChunk", "data": {"chunk": "Sure, I opened "}}));
    server.push(json!({"event": "messageChunk", "data": {"chunk": "https://exam"}}));
    server.push(json!({"event": "messageChunk", "data": {"chunk": "ple.com"}}));
    server.push(json!({"event": "messageChunk", "data": {"chunk": " in the preview."}}));
    server.push(json!({"event": "messageComplete"}));
    wait_for(&mut view, ChannelEvent::Complete).await?;

    let state = client.messages.snapshot().await;
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.messages[0].role, Role::User);
    assert_eq!(state.messages[0].content, "hello https://example.com");
    assert_eq!(state.messages[1].role, Role::Assistant);
    assert_eq!(
        state.messages[1].content,
        "Sure, I opened https://example.com in the preview."
    );
    assert_eq!(state.detected_url, Some("https://example.com".to_string()));
    assert!(!state.is_ai_responding);

    let ui = client.ui.snapshot().await;
    assert!(ui.is_preview_open);
    assert!(!ui.is_sidebar_open);

    return Ok(());
}

#[tokio::test]
async fn it_keeps_showing_the_selected_session_when_a_stale_fetch_lands() -> Result<()> {
    let api = FakeChatApi::with_sessions(vec![Session::new("s-a", "A"), Session::new("s-b", "B")]);
    api.add_message("s-a", "a-1", Role::User, "from A");
    api.add_message("s-b", "b-1", Role::User, "from B");
    let client = client(&api, false);
    client.sessions.fetch_sessions().await?;
    assert_eq!(client.sessions.active_session_id().await, "s-a");

    let gate = api.gate("s-a");
    let messages = client.messages.clone();
    let stale = tokio::spawn(async move {
        return messages.fetch_messages(None).await;
    });
    while !api.calls().contains(&"list_messages".to_string()) {
        tokio::task::yield_now().await;
    }

    client.select_session("s-b").await?;
    gate.notify_one();
    stale.await??;

    let messages = client.messages.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, "b-1");

    return Ok(());
}

#[tokio::test]
async fn it_moves_joined_session_with_selection() -> Result<()> {
    let mut server = TestServer::start().await?;
    let api = FakeChatApi::with_sessions(vec![Session::new("s-1", "One"), Session::new("s-2", "Two")]);
    let connection = ConnectionManager::default();
    let client = client_with(&api, &connection, true);

    client.start(&server.url, None).await?;
    assert_eq!(
        server.next_frame().await,
        Some(json!({"event": "joinSession", "data": {"sessionId": "s-1"}}))
    );

    client.select_session("s-2").await?;
    assert_eq!(
        server.next_frame().await,
        Some(json!({"event": "leaveSession", "data": {"sessionId": "s-1"}}))
    );
    assert_eq!(
        server.next_frame().await,
        Some(json!({"event": "joinSession", "data": {"sessionId": "s-2"}}))
    );
    assert_eq!(connection.current_session_id().await, "s-2");

    return Ok(());
}

#[tokio::test]
async fn it_sends_over_rest_when_not_streaming() -> Result<()> {
    let api = FakeChatApi::with_sessions(vec![Session::new("s-1", "One")]);
    api.set_reply("Done", None);
    let client = client(&api, false);
    client.start("", None).await?;

    client.send("Build a CRM").await?;

    let messages = client.messages.messages().await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "Done");
    assert!(api.calls().contains(&"send_chat".to_string()));

    return Ok(());
}

#[tokio::test]
async fn it_fails_fast_when_channel_is_down() -> Result<()> {
    let api = FakeChatApi::with_sessions(vec![Session::new("s-1", "One")]);
    let client = client(&api, true);
    client.start("ws://127.0.0.1:1", None).await?;

    let res = client.send("hello").await;

    assert_eq!(
        res,
        Err(StoreError::precondition("Push channel is not connected"))
    );
    assert!(!client.messages.is_ai_responding().await);
    assert!(client.messages.messages().await.is_empty());

    return Ok(());
}

#[tokio::test]
async fn it_follows_active_session_after_delete() -> Result<()> {
    let api = FakeChatApi::with_sessions(vec![Session::new("s-1", "One"), Session::new("s-2", "Two")]);
    api.add_message("s-1", "m-1", Role::User, "one");
    api.add_message("s-2", "m-2", Role::User, "two");
    let client = client(&api, false);
    client.start("", None).await?;
    assert_eq!(client.messages.messages().await[0].id, "m-1");

    client.delete_session("s-1").await?;

    assert_eq!(client.sessions.active_session_id().await, "s-2");
    assert_eq!(client.messages.messages().await[0].id, "m-2");

    return Ok(());
}

#[tokio::test]
async fn it_empties_thread_when_last_session_is_archived() -> Result<()> {
    let api = FakeChatApi::with_sessions(vec![Session::new("s-1", "One")]);
    api.add_message("s-1", "m-1", Role::User, "one");
    let client = client(&api, false);
    client.start("", None).await?;

    client.archive_session("s-1").await?;

    assert_eq!(client.sessions.active_session_id().await, "");
    assert!(client.messages.messages().await.is_empty());

    return Ok(());
}

#[tokio::test]
async fn it_renames_without_moving_active_session() -> Result<()> {
    let api = FakeChatApi::with_sessions(vec![Session::new("s-1", "One"), Session::new("s-2", "Two")]);
    let client = client(&api, false);
    client.start("", None).await?;

    let session = client.rename_session("s-2", "Renamed").await?;

    assert_eq!(session.title, "Renamed");
    assert_eq!(client.sessions.active_session_id().await, "s-1");
    assert_eq!(client.sessions.sessions().await[1].title, "Renamed");

    return Ok(());
}

#[tokio::test]
async fn it_refuses_to_select_an_unknown_session() -> Result<()> {
    let api = FakeChatApi::with_sessions(vec![Session::new("s-a", "A")]);
    api.add_message("s-a", "a-1", Role::User, "from A");
    let client = client(&api, false);
    client.start("", None).await?;
    let fetches = api
        .calls()
        .iter()
        .filter(|call| return call.as_str() == "list_messages")
        .count();

    let res = client.select_session("does-not-exist").await;

    assert_eq!(
        res,
        Err(StoreError::precondition("Unknown session 'does-not-exist'"))
    );
    assert_eq!(client.sessions.active_session_id().await, "s-a");
    assert_eq!(client.messages.messages().await[0].id, "a-1");
    assert_eq!(
        api.calls()
            .iter()
            .filter(|call| return call.as_str() == "list_messages")
            .count(),
        fetches
    );

    return Ok(());
}
