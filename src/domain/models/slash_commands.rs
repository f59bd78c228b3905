#[cfg(test)]
#[path = "slash_commands_test.rs"]
mod tests;

pub struct SlashCommand {
    command: String,
    pub args: Vec<String>,
}

impl SlashCommand {
    pub fn parse(text: &str) -> Option<SlashCommand> {
        let mut args = text
            .trim()
            .split(' ')
            .filter(|e| return !e.is_empty())
            .map(|e| return e.to_string())
            .collect::<Vec<String>>();
        if args.is_empty() {
            return None;
        }

        let prefix = args[0].to_string();
        args.remove(0);

        let cmd = SlashCommand {
            command: prefix,
            args,
        };
        if cmd.is_quit()
            || cmd.is_help()
            || cmd.is_new_session()
            || cmd.is_list_sessions()
            || cmd.is_open_session()
            || cmd.is_rename_session()
            || cmd.is_archive_session()
            || cmd.is_delete_session()
            || cmd.is_clear_messages()
            || cmd.is_edit_message()
            || cmd.is_remove_message()
            || cmd.is_history()
            || cmd.is_toggle_preview()
            || cmd.is_toggle_sidebar()
        {
            return Some(cmd);
        }

        return None;
    }

    /// Usage hint when a known command got the wrong number of arguments.
    pub fn usage_error(&self) -> Option<String> {
        let usage = if self.is_open_session() && self.args.len() != 1 {
            "/open [SESSION_ID,SESSION_INDEX]"
        } else if self.is_rename_session() && self.args.is_empty() {
            "/rename [TITLE]"
        } else if self.is_edit_message() && self.args.len() < 2 {
            "/edit [MESSAGE_ID] [TEXT]"
        } else if self.is_remove_message() && self.args.len() != 1 {
            "/rm [MESSAGE_ID]"
        } else {
            return None;
        };

        return Some(format!("Usage: {usage}"));
    }

    /// Arguments joined back into free text, e.g. a title.
    pub fn text(&self) -> String {
        return self.args.join(" ");
    }

    pub fn is_quit(&self) -> bool {
        return ["/q", "/quit", "/exit"].contains(&self.command.as_str());
    }

    pub fn is_help(&self) -> bool {
        return ["/h", "/help"].contains(&self.command.as_str());
    }

    pub fn is_new_session(&self) -> bool {
        return ["/n", "/new"].contains(&self.command.as_str());
    }

    pub fn is_list_sessions(&self) -> bool {
        return ["/s", "/sessions"].contains(&self.command.as_str());
    }

    pub fn is_open_session(&self) -> bool {
        return ["/o", "/open"].contains(&self.command.as_str());
    }

    pub fn is_rename_session(&self) -> bool {
        return ["/rename"].contains(&self.command.as_str());
    }

    pub fn is_archive_session(&self) -> bool {
        return ["/archive"].contains(&self.command.as_str());
    }

    pub fn is_delete_session(&self) -> bool {
        return ["/delete"].contains(&self.command.as_str());
    }

    pub fn is_clear_messages(&self) -> bool {
        return ["/clear"].contains(&self.command.as_str());
    }

    pub fn is_edit_message(&self) -> bool {
        return ["/e", "/edit"].contains(&self.command.as_str());
    }

    pub fn is_remove_message(&self) -> bool {
        return ["/rm"].contains(&self.command.as_str());
    }

    pub fn is_history(&self) -> bool {
        return ["/history"].contains(&self.command.as_str());
    }

    pub fn is_toggle_preview(&self) -> bool {
        return ["/p", "/preview"].contains(&self.command.as_str());
    }

    pub fn is_toggle_sidebar(&self) -> bool {
        return ["/sb", "/sidebar"].contains(&self.command.as_str());
    }
}
