#[cfg(test)]
#[path = "relay_test.rs"]
mod tests;

use tokio::sync::mpsc;

use super::MessageStore;
use super::SessionStore;
use crate::domain::models::ChannelEvent;

/// Applies push channel events to the stores, then hands each one to the
/// view so it can render what changed.
#[derive(Clone)]
pub struct ChannelRelay {
    messages: MessageStore,
    sessions: SessionStore,
    view: Option<mpsc::UnboundedSender<ChannelEvent>>,
}

impl ChannelRelay {
    pub fn new(
        messages: MessageStore,
        sessions: SessionStore,
        view: Option<mpsc::UnboundedSender<ChannelEvent>>,
    ) -> ChannelRelay {
        return ChannelRelay {
            messages,
            sessions,
            view,
        };
    }

    pub async fn start(self, mut rx: mpsc::UnboundedReceiver<ChannelEvent>) {
        while let Some(event) = rx.recv().await {
            self.handle(event).await;
        }

        tracing::debug!("Channel relay stopped");
    }

    pub async fn handle(&self, event: ChannelEvent) {
        match &event {
            ChannelEvent::Connected => {
                tracing::debug!("Push channel connected");
            }
            ChannelEvent::Received { message_id } => {
                tracing::debug!(message_id, "Message received by server");
            }
            ChannelEvent::SessionJoined(session_id) => {
                tracing::debug!(session_id, "Session joined");
            }
            ChannelEvent::Response(message) => {
                if !message.content.is_empty() {
                    self.messages.receive_whole(message.clone()).await;
                }
            }
            ChannelEvent::Chunk(chunk) => {
                if !chunk.is_empty() {
                    self.messages.append_chunk(chunk).await;
                }
            }
            ChannelEvent::Complete => {
                tracing::debug!("Reply complete");
            }
            ChannelEvent::Error(reason) => {
                tracing::error!(reason, "Push channel error");
            }
            ChannelEvent::Disconnected => {
                tracing::debug!("Push channel disconnected");
            }
            ChannelEvent::TitleUpdated {
                session_id, title, ..
            } => {
                self.sessions
                    .update_session_title_from_socket(session_id, title)
                    .await;
            }
        }

        if event.is_terminal() {
            self.messages.finish_response().await;
        }

        if let Some(view) = &self.view {
            if view.send(event).is_err() {
                tracing::debug!("View dropped, channel event discarded");
            }
        }
    }
}
