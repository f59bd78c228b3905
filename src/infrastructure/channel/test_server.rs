use std::time::Duration;

use anyhow::Result;
use futures::SinkExt;
use futures::StreamExt;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message as Frame;

/// Single-connection WebSocket peer. Records every JSON frame the client sends
/// and pushes whatever the test queues.
pub struct TestServer {
    pub url: String,
    seen: mpsc::UnboundedReceiver<Value>,
    push: mpsc::UnboundedSender<Option<String>>,
}

impl TestServer {
    pub async fn start() -> Result<TestServer> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("ws://{}", listener.local_addr()?);
        let (seen_tx, seen) = mpsc::unbounded_channel::<Value>();
        let (push, mut push_rx) = mpsc::unbounded_channel::<Option<String>>();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();

            loop {
                tokio::select! {
                    frame = ws.next() => match frame {
                        Some(Ok(Frame::Text(text))) => {
                            if let Ok(value) = serde_json::from_str::<Value>(&text) {
                                let _ = seen_tx.send(value);
                            }
                        }
                        Some(Ok(_)) => {}
                        _ => break,
                    },
                    out = push_rx.recv() => match out {
                        Some(Some(text)) => {
                            if ws.send(Frame::Text(text)).await.is_err() {
                                break;
                            }
                        }
                        _ => {
                            let _ = ws.send(Frame::Close(None)).await;
                            break;
                        }
                    },
                }
            }
        });

        return Ok(TestServer { url, seen, push });
    }

    pub fn push(&self, frame: Value) {
        self.push.send(Some(frame.to_string())).unwrap();
    }

    pub fn push_raw(&self, text: &str) {
        self.push.send(Some(text.to_string())).unwrap();
    }

    pub fn close(&self) {
        self.push.send(None).unwrap();
    }

    pub async fn next_frame(&mut self) -> Option<Value> {
        return tokio::time::timeout(Duration::from_secs(2), self.seen.recv())
            .await
            .ok()
            .flatten();
    }
}
