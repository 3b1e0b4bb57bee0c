//! FTP response handling
//!
//! Defines FTP reply codes and the single-line / multi-line framing rules
//! for the control channel.

/// Standard FTP reply codes used by this server
pub const OK: u16 = 200;
pub const SYSTEM_STATUS: u16 = 211;
pub const SYSTEM_TYPE: u16 = 215;
pub const GOODBYE: u16 = 221;
pub const ENTERING_PASSIVE: u16 = 227;
pub const LOGIN_SUCCESS: u16 = 230;
pub const PASSWORD_REQUIRED: u16 = 331;
pub const NO_DATA_CONNECTION: u16 = 425;
pub const BAD_COMMAND: u16 = 500;
pub const BAD_ARGUMENT: u16 = 501;
pub const UNSUPPORTED_MODE: u16 = 510;
pub const NOT_LOGGED_IN: u16 = 530;

/// A reply to be written on the control connection.
///
/// Single-line replies render as `<code> <message>\r\n`. Multi-line replies
/// render with the first line as `<code>-<line>` and the last as
/// `<code> <line>`, all joined and terminated by CRLF; intermediate lines
/// are sent bare. A one-element multi-line reply degenerates to the
/// last-line (single-line) form.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Single(u16, String),
    Multi(u16, Vec<String>),
}

impl Reply {
    /// Renders the reply into the exact bytes to write on the wire.
    pub fn render(&self) -> String {
        match self {
            Reply::Single(code, message) => format!("{} {}\r\n", code, message),
            Reply::Multi(code, lines) => {
                if lines.is_empty() {
                    return format!("{} \r\n", code);
                }
                let last = lines.len() - 1;
                let mut framed = Vec::with_capacity(lines.len());
                for (i, line) in lines.iter().enumerate() {
                    if i == last {
                        framed.push(format!("{} {}", code, line));
                    } else if i == 0 {
                        framed.push(format!("{}-{}", code, line));
                    } else {
                        framed.push(line.clone());
                    }
                }
                format!("{}\r\n", framed.join("\r\n"))
            }
        }
    }
}
