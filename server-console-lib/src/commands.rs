//! Chat command parsing: one command per inbound message, free text falls
//! through to shell execution.

/// Shell command behind `/ping8`.
pub const PING8_COMMAND: &str = "ping 8.8.8.8 -c4";
/// Shell command behind `/top` (batch mode so it works without a tty).
pub const TOP_COMMAND: &str = "top -bn 1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    Ping8,
    Top,
    Htop,
    /// `/eval <python code>`; empty argument triggers a usage reply.
    Eval(String),
    /// `/node <javascript>`; empty argument triggers a usage reply.
    Node(String),
    /// Unrecognized slash command.
    Unknown(String),
    /// Free text: run as a shell command line.
    Shell(String),
}

pub fn parse_message(text: &str) -> BotCommand {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return BotCommand::Shell(trimmed.to_string());
    };

    let (command, args) = match rest.split_once(char::is_whitespace) {
        Some((command, args)) => (command, args.trim()),
        None => (rest, ""),
    };
    // Group chats address commands as /eval@BotName.
    let command = command.split('@').next().unwrap_or(command);

    match command {
        "start" => BotCommand::Start,
        "help" => BotCommand::Help,
        "ping8" => BotCommand::Ping8,
        "top" => BotCommand::Top,
        "htop" => BotCommand::Htop,
        "eval" => BotCommand::Eval(args.to_string()),
        "node" => BotCommand::Node(args.to_string()),
        other => BotCommand::Unknown(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_commands_are_recognized() {
        assert_eq!(parse_message("/start"), BotCommand::Start);
        assert_eq!(parse_message("/help"), BotCommand::Help);
        assert_eq!(parse_message("/ping8"), BotCommand::Ping8);
        assert_eq!(parse_message("/top"), BotCommand::Top);
        assert_eq!(parse_message("/htop"), BotCommand::Htop);
    }

    #[test]
    fn eval_captures_code() {
        assert_eq!(
            parse_message("/eval 2 + 2"),
            BotCommand::Eval("2 + 2".into())
        );
        assert_eq!(parse_message("/eval"), BotCommand::Eval(String::new()));
        assert_eq!(
            parse_message("/eval\nprint('hi')"),
            BotCommand::Eval("print('hi')".into())
        );
    }

    #[test]
    fn bot_suffix_is_stripped() {
        assert_eq!(parse_message("/top@MyConsoleBot"), BotCommand::Top);
        assert_eq!(
            parse_message("/eval@MyConsoleBot 1 + 1"),
            BotCommand::Eval("1 + 1".into())
        );
    }

    #[test]
    fn free_text_is_shell() {
        assert_eq!(
            parse_message("ls -la | head"),
            BotCommand::Shell("ls -la | head".into())
        );
        assert_eq!(parse_message("  cd /tmp  "), BotCommand::Shell("cd /tmp".into()));
    }

    #[test]
    fn unknown_slash_command() {
        assert_eq!(
            parse_message("/reboot now"),
            BotCommand::Unknown("reboot".into())
        );
    }
}
