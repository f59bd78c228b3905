#[cfg(test)]
#[path = "repl_test.rs"]
mod tests;

use std::io::Write;

use anyhow::Result;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use yansi::Paint;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::ChannelEvent;
use crate::domain::models::Message;
use crate::domain::models::Notification;
use crate::domain::models::NotificationLevel;
use crate::domain::models::Role;
use crate::domain::models::Session;
use crate::domain::models::SlashCommand;
use crate::domain::models::StoreError;
use crate::domain::services::ActiveSession;
use crate::domain::services::ChatClient;

const HISTORY_PREVIEW_LEN: usize = 80;

pub fn help_text() -> String {
    let text = r#"
COMMANDS:
- /new (/n) [TITLE?] - Creates a new chat session and opens it.
- /sessions (/s) - Lists all sessions. The open session is marked with *.
- /open (/o) [SESSION_ID,SESSION_INDEX] - Opens a session by id, or by the index from /sessions.
- /rename [TITLE] - Renames the open session.
- /archive - Archives the open session and moves to the next one.
- /delete - Deletes the open session.
- /clear - Deletes every message of the open session.
- /history - Prints the open session's messages with their ids.
- /edit (/e) [MESSAGE_ID] [TEXT] - Replaces the content of a message.
- /rm [MESSAGE_ID] - Deletes a message.
- /preview (/p) - Toggles the preview pane.
- /sidebar (/sb) - Toggles the session header shown in the prompt.
- /quit /exit (/q) - Exit.
- /help (/h) - Provides this help menu.
        "#;

    return text.trim().to_string();
}

pub fn format_session(idx: usize, session: &Session, active_id: &str) -> String {
    let marker = if session.id == active_id { "*" } else { " " };
    let mut res = format!(
        "{marker} ({n}) {title} [ID: {id}]",
        n = idx + 1,
        title = session.title,
        id = session.id
    );

    if session.is_archived() {
        res = format!("{res} (archived)");
    }
    if let Some(activity) = session.last_activity() {
        res = format!("{res}, {activity}");
    }

    return res;
}

pub fn format_message(message: &Message, username: &str) -> String {
    let author = match message.role {
        Role::User => username.to_string(),
        Role::Assistant => "Assistant".to_string(),
        Role::System => "System".to_string(),
    };

    return format!("{author}: {}", message.content);
}

/// One line per message for `/history`: the id to pass to `/edit` or `/rm`,
/// then the first line of the content.
pub fn format_history_line(message: &Message, username: &str) -> String {
    let preview = Message {
        content: message.summary(HISTORY_PREVIEW_LEN),
        ..message.clone()
    };

    return format!("[{}] {}", message.id, format_message(&preview, username));
}

pub fn format_notification(notice: &Notification) -> String {
    let text = format!("[{}] {}", notice.level, notice.text);
    return match notice.level {
        NotificationLevel::Info => Paint::blue(text).to_string(),
        NotificationLevel::Success => Paint::green(text).to_string(),
        NotificationLevel::Error => Paint::red(text).to_string(),
    };
}

/// Resolves `/open` arguments: a 1-based index from `/sessions`, or an id.
pub fn resolve_session(sessions: &[Session], arg: &str) -> Option<String> {
    if let Ok(idx) = arg.parse::<usize>() {
        if idx >= 1 && idx <= sessions.len() {
            return Some(sessions[idx - 1].id.to_string());
        }
    }

    return sessions
        .iter()
        .find(|s| return s.id == arg)
        .map(|s| return s.id.to_string());
}

struct Repl {
    client: ChatClient,
    username: String,
    last_preview: Option<String>,
    streaming_line: bool,
}

impl Repl {
    async fn print_prompt(&self) -> Result<()> {
        let ui = self.client.ui.snapshot().await;
        let mut prefix = "".to_string();
        if ui.is_sidebar_open {
            if let Some(session) = self.client.sessions.active_session().await {
                prefix = format!("[{}] ", session.title);
            }
        }

        print!("{}{} ", Paint::cyan(prefix), Paint::new(">").bold());
        std::io::stdout().flush()?;
        return Ok(());
    }

    async fn print_history(&self) {
        for message in self.client.messages.messages().await {
            println!("{}", format_message(&message, &self.username));
        }
    }

    async fn print_sessions(&self) {
        let sessions = self.client.sessions.sessions().await;
        if sessions.is_empty() {
            println!("There are no sessions available. Start one with /new.");
            return;
        }

        let active = self.client.sessions.active_session_id().await;
        for (idx, session) in sessions.iter().enumerate() {
            println!("{}", format_session(idx, session, &active));
        }
    }

    async fn show_preview(&mut self) {
        let ui = self.client.ui.snapshot().await;
        if !ui.is_preview_open || ui.preview_url == self.last_preview {
            return;
        }

        if let Some(url) = &ui.preview_url {
            println!("{} {}", Paint::magenta("Preview:").bold(), url);
        }
        self.last_preview = ui.preview_url;
    }

    fn report(&self, err: StoreError) {
        // Request failures already surfaced as notifications.
        if let StoreError::Precondition(reason) = err {
            eprintln!("{}", Paint::yellow(reason));
        }
    }

    async fn active_or_warn(&self) -> Option<String> {
        let active = self.client.sessions.active_session_id().await;
        if active.is_empty() {
            eprintln!("{}", Paint::yellow("No session is open. Start one with /new."));
            return None;
        }

        return Some(active);
    }

    /// Returns false once the user asked to leave.
    async fn handle_command(&mut self, command: SlashCommand) -> Result<bool> {
        if command.is_quit() {
            return Ok(false);
        }

        if command.is_help() {
            println!("{}", help_text());
        } else if command.is_new_session() {
            let mut title = command.text();
            if title.is_empty() {
                title = "New Chat".to_string();
            }
            if let Err(err) = self.client.create_session(&title).await {
                self.report(err);
            }
        } else if command.is_list_sessions() {
            self.print_sessions().await;
        } else if command.is_open_session() {
            let sessions = self.client.sessions.sessions().await;
            match resolve_session(&sessions, &command.args[0]) {
                Some(id) => match self.client.select_session(&id).await {
                    Ok(()) => self.print_history().await,
                    Err(err) => self.report(err),
                },
                None => eprintln!(
                    "{}",
                    Paint::yellow(format!("No session matches '{}'", command.args[0]))
                ),
            }
        } else if command.is_rename_session() {
            if let Some(active) = self.active_or_warn().await {
                if let Err(err) = self.client.rename_session(&active, &command.text()).await {
                    self.report(err);
                }
            }
        } else if command.is_archive_session() {
            if let Some(active) = self.active_or_warn().await {
                if let Err(err) = self.client.archive_session(&active).await {
                    self.report(err);
                }
            }
        } else if command.is_delete_session() {
            if let Some(active) = self.active_or_warn().await {
                if let Err(err) = self.client.delete_session(&active).await {
                    self.report(err);
                }
            }
        } else if command.is_clear_messages() {
            if let Some(active) = self.active_or_warn().await {
                if let Err(err) = self.client.messages.clear_session_messages(&active).await {
                    self.report(err);
                }
            }
        } else if command.is_history() {
            for message in self.client.messages.messages().await {
                println!("{}", format_history_line(&message, &self.username));
            }
        } else if command.is_edit_message() {
            let text = command.args[1..].join(" ");
            if let Err(err) = self.client.messages.update_message(&command.args[0], &text).await {
                self.report(err);
            }
        } else if command.is_remove_message() {
            if let Err(err) = self.client.messages.delete_message(&command.args[0]).await {
                self.report(err);
            }
        } else if command.is_toggle_preview() {
            let open = self.client.ui.toggle_preview().await;
            println!("Preview {}", if open { "open" } else { "closed" });
            if open {
                self.last_preview = None;
                self.show_preview().await;
            }
        } else if command.is_toggle_sidebar() {
            let open = self.client.ui.toggle_sidebar().await;
            println!("Sidebar {}", if open { "open" } else { "closed" });
        }

        return Ok(true);
    }

    async fn handle_line(&mut self, line: &str) -> Result<bool> {
        if line.is_empty() {
            return Ok(true);
        }

        if let Some(command) = SlashCommand::parse(line) {
            if let Some(usage) = command.usage_error() {
                eprintln!("{}", Paint::yellow(usage));
                return Ok(true);
            }
            return self.handle_command(command).await;
        }

        let before = self.client.messages.messages().await.len();
        if let Err(err) = self.client.send(line).await {
            self.report(err);
            return Ok(true);
        }

        // Replies over REST are complete once send returns.
        let messages = self.client.messages.messages().await;
        for message in messages.iter().skip(before) {
            if message.is_assistant() {
                println!("{}", format_message(message, &self.username));
            }
        }
        self.show_preview().await;

        return Ok(true);
    }

    async fn render_event(&mut self, event: ChannelEvent) -> Result<()> {
        match event {
            ChannelEvent::Chunk(chunk) => {
                if !self.streaming_line {
                    print!("\nAssistant: ");
                    self.streaming_line = true;
                }
                print!("{chunk}");
                std::io::stdout().flush()?;
            }
            ChannelEvent::Response(message) => {
                println!("\n{}", format_message(&message, &self.username));
            }
            ChannelEvent::Complete => {
                if self.streaming_line {
                    println!();
                    self.streaming_line = false;
                }
            }
            ChannelEvent::Error(reason) => {
                self.streaming_line = false;
                eprintln!("\n{}", Paint::red(format!("Channel error: {reason}")));
            }
            ChannelEvent::Disconnected => {
                self.streaming_line = false;
                eprintln!("\n{}", Paint::yellow("Push channel disconnected"));
            }
            _ => return Ok(()),
        }

        self.show_preview().await;
        if !self.streaming_line {
            self.print_prompt().await?;
        }

        return Ok(());
    }
}

/// Line based chat loop. Reads stdin until EOF or `/quit` while rendering
/// channel events and notifications as they arrive.
pub async fn start(
    client: ChatClient,
    mut events: mpsc::UnboundedReceiver<ChannelEvent>,
    mut notices: mpsc::UnboundedReceiver<Notification>,
) -> Result<()> {
    let mut repl = Repl {
        client,
        username: Config::get(ConfigKey::Username),
        last_preview: None,
        streaming_line: false,
    };
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    repl.print_history().await;
    repl.show_preview().await;
    repl.print_prompt().await?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line? {
                    Some(line) => line,
                    None => break,
                };
                if !repl.handle_line(line.trim()).await? {
                    break;
                }
                repl.print_prompt().await?;
            }
            Some(event) = events.recv() => {
                repl.render_event(event).await?;
            }
            Some(notice) = notices.recv() => {
                println!("{}", format_notification(&notice));
            }
        }
    }

    repl.client.shutdown().await;
    return Ok(());
}
