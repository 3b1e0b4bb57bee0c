//! Command handlers for the decoy FTP server.
//!
//! Each handler checks its preconditions against the session, mutates the
//! session in place, and produces exactly one reply. Failed USER/PASS
//! attempts are throttled and counted; once the session reaches the
//! configured failure limit the dispatcher forces the connection closed
//! regardless of the command's own outcome.

use std::net::Ipv4Addr;
use std::time::Duration;

use log::{info, warn};
use tokio::time::sleep;

use crate::auth::CredentialStore;
use crate::commands::{Command, CommandResult, CommandStatus};
use crate::protocol::Reply;
use crate::protocol::response::{
    BAD_ARGUMENT, BAD_COMMAND, ENTERING_PASSIVE, GOODBYE, LOGIN_SUCCESS, NO_DATA_CONNECTION,
    NOT_LOGGED_IN, OK, PASSWORD_REQUIRED, SYSTEM_STATUS, SYSTEM_TYPE, UNSUPPORTED_MODE,
};
use crate::server::ServerContext;
use crate::session::Session;

/// Dispatches a parsed FTP command to its handler.
pub async fn handle_command(
    session: &mut Session,
    command: &Command,
    ctx: &ServerContext,
) -> CommandResult {
    let mut result = match command {
        Command::QUIT => handle_cmd_quit(),
        Command::USER(args) => handle_cmd_user(session, args, ctx).await,
        Command::PASS(args) => handle_cmd_pass(session, args, ctx).await,
        Command::REIN => handle_cmd_rein(session),
        Command::PWD => handle_cmd_pwd(session, ctx),
        Command::TYPE(args) => handle_cmd_type(session, args),
        Command::LIST => handle_cmd_list(session, ctx),
        Command::FEAT => handle_cmd_feat(session),
        Command::STRU(args) => handle_cmd_stru(session, args),
        Command::SYST => handle_cmd_syst(session),
        Command::STAT => handle_cmd_stat(session),
        Command::HELP => handle_cmd_help(ctx),
        Command::NOOP => handle_cmd_noop(),
        Command::PASV => handle_cmd_pasv(session, ctx).await,
        Command::PORT(args) => handle_cmd_port(session, args, ctx).await,
        Command::RETR(args) => handle_cmd_retr(session, args, ctx).await,
        Command::UNKNOWN(verb) => handle_cmd_unknown(verb, ctx),
    };

    // The failure limit applies after every command, whatever its outcome.
    if session.failures() >= ctx.config.failure_limit {
        result.status = CommandStatus::CloseConnection;
    }

    result
}

/// Returns any reserved data port to the pool it came from. Called on
/// re-negotiation and on session teardown so ports never leak.
pub async fn release_data_port(session: &mut Session, ctx: &ServerContext) {
    if let Some(port) = session.take_data_port() {
        let pool = if session.passive_mode() {
            &ctx.passive_ports
        } else {
            &ctx.active_ports
        };
        pool.release(port).await;
    }
}

fn continue_with(reply: Reply) -> CommandResult {
    CommandResult {
        status: CommandStatus::Continue,
        reply,
    }
}

fn not_logged_in() -> CommandResult {
    continue_with(Reply::Single(BAD_COMMAND, "Not logged in".into()))
}

/// Records an authentication failure and sleeps before the reply goes
/// out, throttling brute-force guessing. Blocks only this session's task.
async fn auth_failure(session: &mut Session, ctx: &ServerContext, reply: Reply) -> CommandResult {
    session.record_failure();
    sleep(Duration::from_secs(ctx.config.auth_delay_secs)).await;
    continue_with(reply)
}

fn handle_cmd_quit() -> CommandResult {
    CommandResult {
        status: CommandStatus::CloseConnection,
        reply: Reply::Single(GOODBYE, "Goodbye".into()),
    }
}

async fn handle_cmd_user(
    session: &mut Session,
    args: &[String],
    ctx: &ServerContext,
) -> CommandResult {
    match check_user(session, args, &ctx.credentials) {
        Ok(reply) => continue_with(reply),
        Err(reply) => auth_failure(session, ctx, reply).await,
    }
}

fn check_user(
    session: &mut Session,
    args: &[String],
    credentials: &CredentialStore,
) -> Result<Reply, Reply> {
    if args.len() != 1 {
        return Err(Reply::Single(BAD_COMMAND, "Bad USER command".into()));
    }
    if session.is_authenticated() {
        return Err(Reply::Single(BAD_COMMAND, "Already logged in".into()));
    }
    if !credentials.contains(&args[0]) {
        return Err(Reply::Single(NOT_LOGGED_IN, "Bad or Unknown User".into()));
    }
    session.set_username(&args[0]);
    Ok(Reply::Single(
        PASSWORD_REQUIRED,
        "User OK, specify password".into(),
    ))
}

async fn handle_cmd_pass(
    session: &mut Session,
    args: &[String],
    ctx: &ServerContext,
) -> CommandResult {
    match check_password(session, args, &ctx.credentials) {
        Ok(reply) => continue_with(reply),
        Err(reply) => auth_failure(session, ctx, reply).await,
    }
}

fn check_password(
    session: &mut Session,
    args: &[String],
    credentials: &CredentialStore,
) -> Result<Reply, Reply> {
    if args.len() != 1 {
        return Err(Reply::Single(BAD_COMMAND, "Bad PASS command".into()));
    }
    if session.is_authenticated() {
        return Err(Reply::Single(BAD_COMMAND, "Already logged in".into()));
    }
    if session.username().is_empty() {
        return Err(Reply::Single(
            NOT_LOGGED_IN,
            "Not logged in (need username)".into(),
        ));
    }
    match credentials.get(session.username()) {
        Some(stored) if stored == args[0] => {
            session.set_authenticated();
            Ok(Reply::Single(LOGIN_SUCCESS, "OK (login successful)".into()))
        }
        Some(_) => Err(Reply::Single(NOT_LOGGED_IN, "Bad Password".into())),
        None => Err(Reply::Single(NOT_LOGGED_IN, "Bad User".into())),
    }
}

fn handle_cmd_rein(session: &mut Session) -> CommandResult {
    session.reinitialize();
    continue_with(Reply::Single(OK, "OK Session Reinitialized".into()))
}

fn handle_cmd_pwd(session: &Session, ctx: &ServerContext) -> CommandResult {
    if !session.is_authenticated() {
        return not_logged_in();
    }
    continue_with(Reply::Single(OK, ctx.config.fakedir_root.clone()))
}

fn handle_cmd_type(session: &Session, args: &[String]) -> CommandResult {
    if !session.is_authenticated() {
        return not_logged_in();
    }
    if args.len() != 1 {
        return continue_with(Reply::Single(BAD_COMMAND, "Bad TYPE command".into()));
    }
    if args[0] != "I" {
        return continue_with(Reply::Single(
            UNSUPPORTED_MODE,
            "Only binary mode is supported (I)".into(),
        ));
    }
    continue_with(Reply::Single(OK, "OK (Binary mode)".into()))
}

fn handle_cmd_list(session: &Session, ctx: &ServerContext) -> CommandResult {
    if !session.is_authenticated() {
        return not_logged_in();
    }
    continue_with(Reply::Multi(OK, ctx.config.fakedir_list.clone()))
}

fn handle_cmd_feat(session: &Session) -> CommandResult {
    if !session.is_authenticated() {
        return not_logged_in();
    }
    let features = vec![
        "Features:".to_string(),
        "UTF8".to_string(),
        "PASV".to_string(),
        "REST STREAM".to_string(),
        "End".to_string(),
    ];
    continue_with(Reply::Multi(SYSTEM_STATUS, features))
}

fn handle_cmd_stru(session: &Session, args: &[String]) -> CommandResult {
    if !session.is_authenticated() {
        return not_logged_in();
    }
    if args.len() != 1 {
        return continue_with(Reply::Single(BAD_COMMAND, "Bad STRU command".into()));
    }
    if args[0] != "FILE" {
        return continue_with(Reply::Single(
            UNSUPPORTED_MODE,
            "Only FILE structure supported".into(),
        ));
    }
    continue_with(Reply::Single(SYSTEM_STATUS, "OK".into()))
}

fn handle_cmd_syst(session: &Session) -> CommandResult {
    if !session.is_authenticated() {
        return not_logged_in();
    }
    continue_with(Reply::Single(SYSTEM_TYPE, "UNIX".into()))
}

fn handle_cmd_stat(session: &Session) -> CommandResult {
    if !session.is_authenticated() {
        return not_logged_in();
    }
    continue_with(Reply::Single(OK, "Rad. Yourself?".into()))
}

fn handle_cmd_help(ctx: &ServerContext) -> CommandResult {
    continue_with(Reply::Single(OK, ctx.config.help.clone()))
}

fn handle_cmd_noop() -> CommandResult {
    continue_with(Reply::Single(OK, "OK".into()))
}

/// Picks the IPv4 address advertised in a PASV reply. A concrete
/// configured bind address wins; a hostname or 0.0.0.0 falls through to
/// the address the client actually connected to.
fn passive_address(session: &Session, ctx: &ServerContext) -> Ipv4Addr {
    match ctx.config.address.parse::<Ipv4Addr>() {
        Ok(ip) if !ip.is_unspecified() => ip,
        _ => session.local_ip().unwrap_or_else(|| {
            warn!(
                "No usable IPv4 address to advertise for PASV (bind address {:?}); using 127.0.0.1",
                ctx.config.address
            );
            Ipv4Addr::LOCALHOST
        }),
    }
}

/// Handles PASV: reserves a passive data port and reports it in the
/// h1,h2,h3,h4,p1,p2 form. Exhaustion is reported, never waited out.
async fn handle_cmd_pasv(session: &mut Session, ctx: &ServerContext) -> CommandResult {
    if !session.is_authenticated() {
        return not_logged_in();
    }

    release_data_port(session, ctx).await;

    match ctx.passive_ports.reserve().await {
        Some(port) => {
            let octets = passive_address(session, ctx).octets();
            session.set_passive_mode(true);
            session.set_data_port(Some(port));
            continue_with(Reply::Single(
                ENTERING_PASSIVE,
                format!(
                    "Entering Passive Mode ({},{},{},{},{},{})",
                    octets[0],
                    octets[1],
                    octets[2],
                    octets[3],
                    port >> 8,
                    port & 0xff
                ),
            ))
        }
        None => continue_with(Reply::Single(
            NO_DATA_CONNECTION,
            "No data ports available".into(),
        )),
    }
}

/// Handles PORT: validates the client's h1,h2,h3,h4,p1,p2 tuple and
/// reserves a local port for the (never opened) active-mode connection.
async fn handle_cmd_port(
    session: &mut Session,
    args: &[String],
    ctx: &ServerContext,
) -> CommandResult {
    if !session.is_authenticated() {
        return not_logged_in();
    }
    if args.len() != 1 {
        return continue_with(Reply::Single(BAD_COMMAND, "Bad PORT command".into()));
    }
    if parse_host_port(&args[0]).is_none() {
        return continue_with(Reply::Single(BAD_ARGUMENT, "Bad PORT argument".into()));
    }

    release_data_port(session, ctx).await;

    match ctx.active_ports.reserve().await {
        Some(port) => {
            session.set_passive_mode(false);
            session.set_data_port(Some(port));
            continue_with(Reply::Single(OK, "PORT command successful".into()))
        }
        None => continue_with(Reply::Single(
            NO_DATA_CONNECTION,
            "No data ports available".into(),
        )),
    }
}

/// Parses the FTP h1,h2,h3,h4,p1,p2 address tuple.
fn parse_host_port(arg: &str) -> Option<(Ipv4Addr, u16)> {
    let fields: Vec<&str> = arg.split(',').collect();
    if fields.len() != 6 {
        return None;
    }
    let mut bytes = [0u8; 6];
    for (i, field) in fields.iter().enumerate() {
        bytes[i] = field.parse().ok()?;
    }
    let host = Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]);
    let port = u16::from(bytes[4]) << 8 | u16::from(bytes[5]);
    Some((host, port))
}

/// Handles RETR: the transfer path is stubbed, so every request reports
/// failure after consulting the pull backend.
async fn handle_cmd_retr(
    session: &mut Session,
    args: &[String],
    ctx: &ServerContext,
) -> CommandResult {
    if args.len() != 1 {
        return continue_with(Reply::Single(BAD_COMMAND, "Bad RETR command".into()));
    }
    if !session.is_authenticated() {
        return continue_with(Reply::Single(NOT_LOGGED_IN, "Not logged in".into()));
    }

    session.set_download_requested(true);
    if let Err(e) = ctx.pull.fetch(&args[0]).await {
        info!("RETR {} from {}: {}", args[0], session.host(), e);
    }
    continue_with(Reply::Single(BAD_COMMAND, "error".into()))
}

fn handle_cmd_unknown(verb: &str, ctx: &ServerContext) -> CommandResult {
    if ctx.config.permissive {
        info!("Faking success for unsupported command {:?}", verb);
        continue_with(Reply::Single(OK, "OK (not supported but faking it)".into()))
    } else {
        continue_with(Reply::Single(BAD_COMMAND, "Bad Command".into()))
    }
}
