//! FTP command parsing and dispatch
//!
//! Turns one control-channel line into a `Command` and runs it against the
//! session through `handle_command`.

pub mod handlers;

pub use handlers::{handle_command, release_data_port};

use crate::protocol::Reply;

/// Parsed FTP commands. Variants that need argument-count checks carry the
/// raw argument tokens so handlers can reject bad syntax themselves.
#[derive(Debug, PartialEq)]
pub enum Command {
    QUIT,
    USER(Vec<String>),
    PASS(Vec<String>),
    REIN,
    PWD,
    TYPE(Vec<String>),
    LIST,
    FEAT,
    STRU(Vec<String>),
    SYST,
    STAT,
    HELP,
    NOOP,
    PASV,
    PORT(Vec<String>),
    RETR(Vec<String>),
    UNKNOWN(String),
}

/// Whether the connection keeps going after a command.
#[derive(Debug, PartialEq)]
pub enum CommandStatus {
    Continue,
    CloseConnection,
}

/// Result of dispatching one command: the reply to write and the
/// continue/terminate decision.
pub struct CommandResult {
    pub status: CommandStatus,
    pub reply: Reply,
}

/// Parse a raw control-channel line into a Command.
///
/// The first whitespace-delimited token selects the command
/// case-insensitively; the rest become arguments.
pub fn parse_command(raw: &str) -> Command {
    let mut tokens = raw.split_whitespace();
    let verb = tokens.next().unwrap_or("").to_ascii_uppercase();
    let args: Vec<String> = tokens.map(str::to_string).collect();

    match verb.as_str() {
        "QUIT" => Command::QUIT,
        "USER" => Command::USER(args),
        "PASS" => Command::PASS(args),
        "REIN" => Command::REIN,
        "PWD" => Command::PWD,
        "TYPE" => Command::TYPE(args),
        "LIST" => Command::LIST,
        "FEAT" => Command::FEAT,
        "STRU" => Command::STRU(args),
        "SYST" => Command::SYST,
        "STAT" => Command::STAT,
        "HELP" => Command::HELP,
        "NOOP" => Command::NOOP,
        "PASV" => Command::PASV,
        "PORT" => Command::PORT(args),
        "RETR" => Command::RETR(args),
        _ => Command::UNKNOWN(verb),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(parse_command("quit\r\n"), Command::QUIT);
        assert_eq!(parse_command("QuIt"), Command::QUIT);
    }

    #[test]
    fn test_parse_collects_arguments() {
        assert_eq!(
            parse_command("USER alice\r\n"),
            Command::USER(vec!["alice".into()])
        );
        assert_eq!(
            parse_command("USER alice bob"),
            Command::USER(vec!["alice".into(), "bob".into()])
        );
        assert_eq!(parse_command("PASS"), Command::PASS(vec![]));
    }

    #[test]
    fn test_parse_unknown_keeps_verb() {
        assert_eq!(parse_command("FOO bar\r\n"), Command::UNKNOWN("FOO".into()));
        assert_eq!(parse_command(""), Command::UNKNOWN(String::new()));
    }

    #[test]
    fn test_parse_tolerates_crlf_and_lf() {
        assert_eq!(parse_command("NOOP\n"), Command::NOOP);
        assert_eq!(parse_command("NOOP\r\n"), Command::NOOP);
    }
}
