#![deny(clippy::implicit_return)]
#![allow(clippy::needless_return)]

mod application;
mod configuration;
mod domain;
mod infrastructure;

use std::env;
use std::process;
use std::sync::Arc;

use anyhow::Error;
use anyhow::Result;
use tokio::sync::mpsc;
use yansi::Paint;

use crate::application::cli;
use crate::application::repl;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::ChannelEvent;
use crate::domain::models::Notification;
use crate::domain::services::ChatClient;
use crate::domain::services::Notifier;
use crate::infrastructure::api::HttpChatApi;
use crate::infrastructure::channel::ConnectionManager;
use crate::infrastructure::storage::Storage;

fn handle_error(err: Error) {
    eprintln!(
        "{}",
        Paint::red(format!(
            "Oh no! Chatwire has failed with the following app version and error.\n\nVersion: {}\nError: {}",
            env!("CARGO_PKG_VERSION"),
            err
        ))
    );

    let backtrace = err.backtrace();
    if backtrace.to_string() == "disabled backtrace" {
        let args = env::args().collect::<Vec<String>>().join(" ");
        eprintln!("\nRunning the following can help explain further what the issue is:");
        eprintln!("\nRUST_BACKTRACE=1 {args}");
    } else {
        eprintln!("\n{}", backtrace);
    }

    process::exit(1);
}

async fn run() -> Result<()> {
    let (notice_tx, notice_rx) = mpsc::unbounded_channel::<Notification>();
    let (view_tx, view_rx) = mpsc::unbounded_channel::<ChannelEvent>();

    let client = ChatClient::new(
        Arc::new(HttpChatApi::default()),
        ConnectionManager::default(),
        Notifier::new(notice_tx),
        Some(Storage::default()),
        Config::get_bool(ConfigKey::Streaming),
    );

    // The chat service may be down at start. Failures are already queued as
    // notifications, so the loop still opens.
    if let Err(err) = client
        .start(&Config::get(ConfigKey::SocketURL), Some(view_tx))
        .await
    {
        tracing::error!(error = %err, "Failed to start chat client");
    }

    let session_id = Config::get(ConfigKey::SessionID);
    if !session_id.is_empty() {
        if let Err(err) = client.select_session(&session_id).await {
            eprintln!("{}", Paint::yellow(err.to_string()));
        }
    }

    return repl::start(client, view_rx, notice_rx).await;
}

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));

    let file_appender = tracing_appender::rolling::never(Config::log_dir(), "debug.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    if env::var("RUST_LOG")
        .unwrap_or_else(|_| return "".to_string())
        .contains("chatwire")
    {
        tracing_subscriber::fmt()
            .json()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(writer)
            .init();
    }

    match cli::parse().await {
        Ok(true) => {}
        Ok(false) => process::exit(0),
        Err(err) => {
            handle_error(err);
            return;
        }
    }

    if let Err(err) = run().await {
        handle_error(err);
    }

    process::exit(0);
}
