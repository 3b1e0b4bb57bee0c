//! Module `client_handler`
//!
//! Drives one FTP control connection: sends the banner and message of the
//! day, then reads command lines and feeds them through the dispatcher
//! until the session terminates.

use std::net::SocketAddr;

use log::{error, info};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::commands::{CommandStatus, handle_command, parse_command, release_data_port};
use crate::protocol::Reply;
use crate::protocol::response::BAD_COMMAND;
use crate::server::{SERVER_NAME, SERVER_VERSION, ServerContext};
use crate::session::Session;

/// Outcome of reading one command line with bounded intake.
enum LineRead {
    Line(String),
    /// The line crossed the length limit. `terminated` is false when the
    /// limit was hit mid-line and the remainder still has to be discarded.
    Oversized { terminated: bool },
    Eof,
}

/// Reads one `\n`-terminated line while never holding more than `max_len`
/// bytes of it in memory. The limit is enforced on intake: as soon as an
/// unterminated line crosses it, `Oversized` is reported without waiting
/// for the newline, so a client streaming bytes forever cannot grow the
/// buffer without bound.
async fn read_command_line(
    reader: &mut BufReader<TcpStream>,
    max_len: usize,
) -> std::io::Result<LineRead> {
    let mut line = Vec::new();
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(if line.is_empty() {
                LineRead::Eof
            } else {
                LineRead::Line(String::from_utf8_lossy(&line).into_owned())
            });
        }
        if let Some(pos) = available.iter().position(|&b| b == b'\n') {
            line.extend_from_slice(&available[..=pos]);
            reader.consume(pos + 1);
            if line.len() > max_len {
                return Ok(LineRead::Oversized { terminated: true });
            }
            return Ok(LineRead::Line(String::from_utf8_lossy(&line).into_owned()));
        }
        let chunk = available.len();
        if line.len() + chunk > max_len {
            reader.consume(chunk);
            return Ok(LineRead::Oversized { terminated: false });
        }
        line.extend_from_slice(available);
        reader.consume(chunk);
    }
}

/// Consumes the tail of an oversized line up to and including its newline
/// without accumulating it anywhere. Returns at end of stream too, so the
/// next read observes EOF.
async fn discard_through_newline(reader: &mut BufReader<TcpStream>) -> std::io::Result<()> {
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                reader.consume(pos + 1);
                return Ok(());
            }
            None => {
                let chunk = available.len();
                reader.consume(chunk);
            }
        }
    }
}

/// Processes commands from a single client over the control connection.
///
/// A read error on the stream is logged and the loop keeps going; only a
/// clean disconnect (EOF), QUIT, or the authentication failure limit ends
/// the session. An oversized command line is rejected with 500 and
/// discarded without ever being buffered in full.
pub async fn handle_client(stream: TcpStream, host: String, ctx: ServerContext) {
    let local_ip = match stream.local_addr() {
        Ok(SocketAddr::V4(addr)) => Some(*addr.ip()),
        _ => None,
    };
    let mut reader = BufReader::new(stream);

    let banner = format!("{} ({})\n{}\n", SERVER_NAME, SERVER_VERSION, ctx.config.motd);
    if let Err(e) = reader.get_mut().write_all(banner.as_bytes()).await {
        error!("Failed to send banner to {}: {}", host, e);
        return;
    }

    let mut session = Session::new(host);
    session.set_local_ip(local_ip);

    loop {
        match read_command_line(&mut reader, ctx.config.max_command_length).await {
            Ok(LineRead::Eof) => {
                info!("Connection closed by client {}", session.host());
                break;
            }
            Ok(LineRead::Oversized { terminated }) => {
                error!(
                    "Dropping command line from {} longer than {} bytes",
                    session.host(),
                    ctx.config.max_command_length
                );
                let reply = Reply::Single(BAD_COMMAND, "Line too long".into());
                let _ = reader.get_mut().write_all(reply.render().as_bytes()).await;
                let _ = reader.get_mut().flush().await;
                if !terminated {
                    if let Err(e) = discard_through_newline(&mut reader).await {
                        error!("Failed to read from {}: {}", session.host(), e);
                    }
                }
            }
            Ok(LineRead::Line(line)) => {
                let command = parse_command(&line);
                info!("Received from {}: {:?}", session.host(), command);
                let result = handle_command(&mut session, &command, &ctx).await;

                if let Err(e) = reader
                    .get_mut()
                    .write_all(result.reply.render().as_bytes())
                    .await
                {
                    error!("Failed to write reply to {}: {}", session.host(), e);
                }
                let _ = reader.get_mut().flush().await;

                if result.status == CommandStatus::CloseConnection {
                    info!("Closing session for {}", session.host());
                    break;
                }
            }
            Err(e) => {
                // The session stays alive across read errors; only EOF or
                // the dispatcher terminate it.
                error!("Failed to read from {}: {}", session.host(), e);
                continue;
            }
        }
    }

    release_data_port(&mut session, &ctx).await;
    info!("Client {} disconnected", session.host());
}
