use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::Arg;
use clap::Command;
use strum::VariantNames;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use yansi::Paint;

use crate::application::repl::format_message;
use crate::application::repl::format_session;
use crate::application::repl::help_text;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::ChatApi;
use crate::domain::models::Message;
use crate::infrastructure::api::HttpChatApi;

async fn print_sessions_list() -> Result<()> {
    let sessions = HttpChatApi::default().list_sessions().await?;
    if sessions.is_empty() {
        println!("There are no sessions available. You should start your first one!");
        return Ok(());
    }

    let res = sessions
        .iter()
        .enumerate()
        .map(|(idx, session)| {
            return format_session(idx, session, "");
        })
        .collect::<Vec<String>>()
        .join("\n");

    println!("{res}");
    return Ok(());
}

async fn print_session_messages(session_id: &str) -> Result<()> {
    let api = HttpChatApi::default();
    let session = api.get_session(session_id).await?;
    let messages = api.list_messages(session_id).await?;

    println!("{}", Paint::new(&session.title).bold());
    let username = Config::get(ConfigKey::Username);
    for message in messages.into_iter().map(Message::from) {
        println!("{}", format_message(&message, &username));
    }

    return Ok(());
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if let Some(parent) = config_file_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut file = fs::File::create(&config_file_path).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    println!("Created default config file at {config_file_path_str}");
    return Ok(());
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn subcommand_debug() -> Command {
    return Command::new("debug")
        .about("Debug helpers for Chatwire")
        .hide(true)
        .subcommand(
            Command::new("log-path").about("Output path to debug log file generated when running Chatwire with environment variable RUST_LOG=chatwire")
        )
        .subcommand(
            Command::new("enum-config").about("List all config keys as strings.")
        );
}

fn arg_session_id() -> Arg {
    return Arg::new("id")
        .short('i')
        .long("id")
        .help("Session ID")
        .num_args(1)
        .required(true);
}

fn subcommand_sessions() -> Command {
    return Command::new("sessions")
        .about("Manage chat sessions stored by the chat service.")
        .arg_required_else_help(true)
        .subcommand(Command::new("list").about("List all sessions with their ids."))
        .subcommand(
            Command::new("show")
                .about("Print every message of a session.")
                .arg(arg_session_id()),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a session and its messages.")
                .arg(arg_session_id()),
        );
}

fn subcommand_chat() -> Command {
    return Command::new("chat")
        .about("Start chatting. Opens the last active session unless --session-id is given.")
        .arg(
            Arg::new(ConfigKey::SessionID.to_string())
                .short('s')
                .long(ConfigKey::SessionID.to_string())
                .env("CHATWIRE_SESSION_ID")
                .num_args(1)
                .help("Session to open on start."),
        );
}

pub fn build() -> Command {
    let commands_text = help_text()
        .split('\n')
        .map(|line| {
            if line.starts_with('-') {
                return format!("  {line}");
            }
            if line.starts_with("COMMANDS:") {
                return Paint::new(format!("CHAT {line}"))
                    .underline()
                    .bold()
                    .to_string();
            }
            return line.to_string();
        })
        .collect::<Vec<String>>()
        .join("\n");

    let about = format!(
        "{}\n\nVersion: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
    );

    return Command::new("chatwire")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .after_help(commands_text)
        .arg_required_else_help(false)
        .subcommand(subcommand_chat())
        .subcommand(subcommand_config())
        .subcommand(subcommand_debug())
        .subcommand(subcommand_sessions())
        .arg(
            Arg::new(ConfigKey::ConfigFile.to_string())
                .short('c')
                .long(ConfigKey::ConfigFile.to_string())
                .env("CHATWIRE_CONFIG_FILE")
                .num_args(1)
                .help(format!("Path to configuration file [default: {}]", Config::default(ConfigKey::ConfigFile)))
                .global(true)
        )
        .arg(
            Arg::new(ConfigKey::ApiURL.to_string())
                .long(ConfigKey::ApiURL.to_string())
                .env("CHATWIRE_API_URL")
                .num_args(1)
                .help(format!("Base URL of the chat service REST API. [default: {}]", Config::default(ConfigKey::ApiURL)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::SocketURL.to_string())
                .long(ConfigKey::SocketURL.to_string())
                .env("CHATWIRE_SOCKET_URL")
                .num_args(1)
                .help(format!("WebSocket URL of the chat service push channel. [default: {}]", Config::default(ConfigKey::SocketURL)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::RequestTimeout.to_string())
                .long(ConfigKey::RequestTimeout.to_string())
                .env("CHATWIRE_REQUEST_TIMEOUT")
                .num_args(1)
                .help(format!("Time to wait in milliseconds before giving up on a REST request. [default: {}]", Config::default(ConfigKey::RequestTimeout)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::Streaming.to_string())
                .long(ConfigKey::Streaming.to_string())
                .env("CHATWIRE_STREAMING")
                .num_args(1)
                .help(format!("Stream assistant replies over the push channel. When disabled, replies are requested over REST. [default: {}]", Config::default(ConfigKey::Streaming)))
                .value_parser(["true", "false"])
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::StateDir.to_string())
                .long(ConfigKey::StateDir.to_string())
                .env("CHATWIRE_STATE_DIR")
                .num_args(1)
                .help(format!("Directory where the session list and layout are remembered between runs. [default: {}]", Config::default(ConfigKey::StateDir)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::Username.to_string())
                .short('u')
                .long(ConfigKey::Username.to_string())
                .env("CHATWIRE_USERNAME")
                .num_args(1)
                .help("Your user name displayed next to your messages. Defaults to $USER.")
                .global(true),
        );
}

/// Parses arguments and runs one-shot subcommands. Returns true when the
/// chat loop should start.
pub async fn parse() -> Result<bool> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("debug", debug_matches)) => {
            match debug_matches.subcommand() {
                Some(("log-path", _)) => {
                    let log_path = Config::log_dir().join("debug.log");
                    println!("{}", log_path.to_string_lossy());
                }
                Some(("enum-config", _)) => {
                    let res = ConfigKey::VARIANTS.join("\n");
                    println!("{}", res);
                }
                _ => {
                    subcommand_debug().print_long_help()?;
                }
            }

            return Ok(false);
        }
        Some(("chat", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
                return Ok(false);
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
                return Ok(false);
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
                return Ok(false);
            }
            _ => {
                subcommand_config().print_long_help()?;
                return Ok(false);
            }
        },
        Some(("sessions", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            match subcmd_matches.subcommand() {
                Some(("list", _)) => {
                    print_sessions_list().await?;
                }
                Some(("show", show_matches)) => {
                    if let Some(session_id) = show_matches.get_one::<String>("id") {
                        print_session_messages(session_id).await?;
                    }
                }
                Some(("delete", delete_matches)) => {
                    if let Some(session_id) = delete_matches.get_one::<String>("id") {
                        HttpChatApi::default().delete_session(session_id).await?;
                        println!("Deleted session {session_id}");
                    }
                }
                _ => {
                    subcommand_sessions().print_long_help()?;
                }
            }

            return Ok(false);
        }
        _ => {
            Config::load(build(), vec![&matches]).await?;
        }
    }

    return Ok(true);
}
