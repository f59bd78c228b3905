#[cfg(test)]
#[path = "connection_test.rs"]
mod tests;

use std::sync::Arc;

use anyhow::bail;
use anyhow::Result;
use futures::stream::SplitSink;
use futures::SinkExt;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as Frame;
use tokio_tungstenite::MaybeTlsStream;
use tokio_tungstenite::WebSocketStream;
use url::Url;

use crate::domain::models::ChannelEvent;
use crate::domain::models::ClientEvent;
use crate::domain::models::Message;
use crate::domain::models::SendMessagePayload;
use crate::domain::models::ServerEvent;
use crate::domain::models::SessionPayload;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Frame>;
type HandlerSlot = Arc<RwLock<Option<mpsc::UnboundedSender<ChannelEvent>>>>;

struct Handle {
    writer: WsWriter,
    reader: JoinHandle<()>,
}

#[derive(Clone, Debug, Default)]
struct ConnectionState {
    connected: bool,
    current_session_id: String,
}

/// Owns the single push channel of the process. Clones share the same socket,
/// state and handler.
#[derive(Clone, Default)]
pub struct ConnectionManager {
    handle: Arc<Mutex<Option<Handle>>>,
    state: Arc<RwLock<ConnectionState>>,
    handler: HandlerSlot,
}

async fn emit(handler: &HandlerSlot, event: ChannelEvent) {
    if let Some(tx) = handler.read().await.as_ref() {
        if tx.send(event).is_err() {
            tracing::debug!("Channel handler dropped, event discarded");
        }
    }
}

fn parse_frame(text: &str) -> Option<ChannelEvent> {
    match serde_json::from_str::<ServerEvent>(text) {
        Ok(event) => {
            return ChannelEvent::from_server(event);
        }
        Err(err) => {
            tracing::warn!(error = %err, frame = text, "Dropping unparseable channel frame");
            return None;
        }
    }
}

impl ConnectionManager {
    /// Replaces whichever handler was registered before.
    pub async fn register_handlers(&self, tx: mpsc::UnboundedSender<ChannelEvent>) {
        *self.handler.write().await = Some(tx);
    }

    pub async fn is_connected(&self) -> bool {
        return self.state.read().await.connected;
    }

    pub async fn current_session_id(&self) -> String {
        return self.state.read().await.current_session_id.to_string();
    }

    /// Opens the channel unless a live one already exists.
    pub async fn connect(&self, address: &str) -> Result<()> {
        let url = Url::parse(address)?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            bail!(format!(
                "Socket URL must use ws:// or wss://, got {}",
                url.scheme()
            ));
        }

        let mut handle = self.handle.lock().await;
        if let Some(existing) = handle.as_ref() {
            if !existing.reader.is_finished() {
                tracing::debug!(address, "Channel already open");
                return Ok(());
            }
        }

        let (stream, _) = connect_async(url.as_str()).await?;
        let (writer, mut reader) = stream.split();

        *self.state.write().await = ConnectionState {
            connected: true,
            current_session_id: "".to_string(),
        };
        tracing::debug!(address, "Channel connected");
        emit(&self.handler, ChannelEvent::Connected).await;

        let state = self.state.clone();
        let handler = self.handler.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = reader.next().await {
                match frame {
                    Ok(Frame::Text(text)) => {
                        if let Some(event) = parse_frame(&text) {
                            emit(&handler, event).await;
                        }
                    }
                    Ok(Frame::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!(error = %err, "Channel read failed");
                        emit(&handler, ChannelEvent::Error(err.to_string())).await;
                        break;
                    }
                }
            }

            *state.write().await = ConnectionState::default();
            tracing::debug!("Channel disconnected");
            emit(&handler, ChannelEvent::Disconnected).await;
        });

        *handle = Some(Handle { writer, reader });
        return Ok(());
    }

    /// Closes the channel. Safe to call when nothing is open, or after the
    /// server already closed it; `Disconnected` is only emitted once.
    pub async fn disconnect(&self) {
        let handle = self.handle.lock().await.take();
        let mut handle = match handle {
            Some(handle) => handle,
            None => return,
        };

        // The reader resets the state and emits on its own when the server
        // ends the channel.
        if !self.is_connected().await {
            tracing::debug!("Channel already closed by the server");
            return;
        }

        handle.reader.abort();
        if let Err(err) = handle.writer.send(Frame::Close(None)).await {
            tracing::debug!(error = %err, "Channel already closed");
        }

        *self.state.write().await = ConnectionState::default();
        emit(&self.handler, ChannelEvent::Disconnected).await;
    }

    /// Returns whether the join was sent. The caller leaves any previous
    /// session first.
    pub async fn join_session(&self, session_id: &str) -> bool {
        if !self.is_connected().await {
            return false;
        }

        let sent = self
            .dispatch(ClientEvent::JoinSession(SessionPayload {
                session_id: session_id.to_string(),
            }))
            .await;
        if sent {
            self.state.write().await.current_session_id = session_id.to_string();
        }

        return sent;
    }

    /// Only leaves the session currently joined.
    pub async fn leave_session(&self, session_id: &str) -> bool {
        if session_id.is_empty() || self.current_session_id().await != session_id {
            return false;
        }

        let sent = self
            .dispatch(ClientEvent::LeaveSession(SessionPayload {
                session_id: session_id.to_string(),
            }))
            .await;
        self.state.write().await.current_session_id = "".to_string();

        return sent;
    }

    pub async fn send(&self, message: &Message, session_id: &str) -> bool {
        if !self.is_connected().await {
            return false;
        }

        return self
            .dispatch(ClientEvent::SendMessage(SendMessagePayload {
                message: message.content.to_string(),
                message_id: message.id.to_string(),
                session_id: session_id.to_string(),
            }))
            .await;
    }

    async fn dispatch(&self, event: ClientEvent) -> bool {
        let text = match serde_json::to_string(&event) {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(error = %err, "Failed to encode channel frame");
                return false;
            }
        };

        let mut handle = self.handle.lock().await;
        let writer = match handle.as_mut() {
            Some(handle) => &mut handle.writer,
            None => return false,
        };

        if let Err(err) = writer.send(Frame::Text(text)).await {
            tracing::warn!(error = %err, "Channel write failed");
            return false;
        }

        return true;
    }
}
