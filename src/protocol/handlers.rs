//! Command handlers module for the Keel FTP server.
//!
//! This module defines the dispatcher and one handler per FTP command,
//! covering authentication, navigation, data channel setup and transfers.
//! Every command yields exactly one final reply; transfer commands also emit
//! the preliminary 150 reply themselves once the data connection is up.

use log::{debug, info, warn};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::client::session::ControlWriter;
use crate::client::state::Session;
use crate::error::{
    AuthError, FtpServerError, ProtocolError, StorageError, TransferError, error_to_reply,
    handle_error,
};
use crate::navigate::{change_directory, change_to_parent};
use crate::protocol::commands::{Command, CommandResult, CommandStatus, parse_command};
use crate::protocol::responses::{Reply, ReplyCode};
use crate::server::context::ServerContext;
use crate::storage::VirtualPath;
use crate::transfer::{
    DataChannel, ListFormat, TransferType, advertised_ipv4, check_epsv_argument,
    format_epsv_reply, format_pasv_reply, parse_eprt_argument, parse_port_argument,
    receive_file, send_file, send_listing, setup_active_mode, setup_passive_mode,
};

type HandlerResult = Result<CommandResult, FtpServerError>;

/// Parses and dispatches one control line.
///
/// # Arguments
///
/// * `session` - The session the line arrived on.
/// * `line` - Raw command line without its terminator.
/// * `ctx` - Shared configuration, storage and credential check.
/// * `control` - Reply channel, used for preliminary replies.
///
/// # Returns
///
/// * `CommandResult` - Final reply and whether the connection should close.
pub async fn handle_command<W>(
    session: &mut Session,
    line: &str,
    ctx: &ServerContext,
    control: &mut ControlWriter<W>,
) -> CommandResult
where
    W: AsyncWrite + Unpin,
{
    let command = match parse_command(line) {
        Ok(command) => command,
        Err(e) => return failure(session, e.into()),
    };

    if command.requires_login() && !session.is_logged_in() {
        return failure(session, AuthError::NotLoggedIn.into());
    }

    let result = match command {
        Command::USER(username) => handle_cmd_user(session, &username),
        Command::PASS(password) => handle_cmd_pass(session, ctx, &password).await,
        Command::QUIT => handle_cmd_quit(session),
        Command::NOOP => Ok(ok(ReplyCode::CommandOkay, "OK")),
        Command::PWD => handle_cmd_pwd(session),
        Command::CWD(path) => handle_cmd_cwd(session, ctx, &path).await,
        Command::CDUP => handle_cmd_cdup(session),
        Command::TYPE(arg) => handle_cmd_type(session, &arg),
        Command::SIZE(path) => handle_cmd_size(session, ctx, &path).await,
        Command::PASV => handle_cmd_pasv(session, ctx).await,
        Command::EPSV(arg) => handle_cmd_epsv(session, ctx, arg.as_deref()).await,
        Command::PORT(arg) => handle_cmd_port(session, ctx, &arg),
        Command::EPRT(arg) => handle_cmd_eprt(session, ctx, &arg),
        Command::LIST(arg) => {
            handle_cmd_list(session, ctx, control, arg.as_deref(), ListFormat::Long).await
        }
        Command::NLST(arg) => {
            handle_cmd_list(session, ctx, control, arg.as_deref(), ListFormat::NamesOnly).await
        }
        Command::RETR(path) => handle_cmd_retr(session, ctx, control, &path).await,
        Command::STOR(path) => handle_cmd_stor(session, ctx, control, &path).await,
    };

    result.unwrap_or_else(|e| failure(session, e))
}

fn ok(code: ReplyCode, text: impl Into<String>) -> CommandResult {
    CommandResult::success(Reply::new(code, text))
}

fn failure(session: &Session, err: FtpServerError) -> CommandResult {
    warn_or_debug(session, &err);
    let reply = error_to_reply(&err);
    let status = if err.is_fatal() {
        CommandStatus::CloseConnection
    } else {
        CommandStatus::Failure(err.to_string())
    };
    CommandResult { status, reply }
}

fn warn_or_debug(session: &Session, err: &FtpServerError) {
    if matches!(err, FtpServerError::Auth(AuthError::TooManyAttempts)) {
        warn!(
            "[{}] Too many failed logins from {}",
            session.id(),
            session.peer_addr()
        );
    }
    handle_error(err);
}

/// Handles the USER command: records the name and asks for a password.
fn handle_cmd_user(session: &mut Session, username: &str) -> HandlerResult {
    session.begin_login(username)?;
    Ok(ok(ReplyCode::NeedPassword, "User name okay, need password"))
}

/// Handles the PASS command: checks the credentials of the pending user.
///
/// Repeated failures end the session once the configured limit is reached.
async fn handle_cmd_pass(session: &mut Session, ctx: &ServerContext, password: &str) -> HandlerResult {
    let username = session.pending_username()?.to_string();
    let decision = ctx.authenticator.check(&username, password).await;

    if decision.is_accepted() {
        session.complete_login()?;
        info!("[{}] User {} logged in", session.id(), username);
        Ok(ok(ReplyCode::UserLoggedIn, "User logged in"))
    } else {
        info!("[{}] Login failed for {}", session.id(), username);
        Err(session.fail_login(ctx.config.session.max_login_attempts).into())
    }
}

/// Handles the QUIT command: signals connection close.
fn handle_cmd_quit(session: &mut Session) -> HandlerResult {
    drop(session.take_data_channel());
    Ok(CommandResult::close(Reply::new(
        ReplyCode::ClosingControlConnection,
        "Goodbye",
    )))
}

fn handle_cmd_pwd(session: &Session) -> HandlerResult {
    let quoted = session.cwd().as_str().replace('"', "\"\"");
    Ok(ok(
        ReplyCode::PathCreated,
        format!("\"{}\" is current directory", quoted),
    ))
}

async fn handle_cmd_cwd(session: &mut Session, ctx: &ServerContext, path: &str) -> HandlerResult {
    let new_cwd = change_directory(&ctx.vfs, session.cwd(), path).await?;
    session.set_cwd(new_cwd);
    Ok(ok(ReplyCode::FileActionOkay, "Directory changed"))
}

fn handle_cmd_cdup(session: &mut Session) -> HandlerResult {
    let parent = change_to_parent(session.cwd());
    session.set_cwd(parent);
    Ok(ok(ReplyCode::FileActionOkay, "Directory changed"))
}

fn handle_cmd_type(session: &mut Session, arg: &str) -> HandlerResult {
    let transfer_type = TransferType::from_type_argument(arg)
        .ok_or_else(|| ProtocolError::BadArgument(format!("TYPE {}", arg)))?;
    session.set_transfer_type(transfer_type);
    let code = match transfer_type {
        TransferType::Ascii => "A",
        TransferType::Binary => "I",
    };
    Ok(ok(ReplyCode::CommandOkay, format!("Type set to {}", code)))
}

async fn handle_cmd_size(session: &Session, ctx: &ServerContext, path: &str) -> HandlerResult {
    let path = ctx.vfs.resolve(session.cwd(), path)?;
    let metadata = ctx.vfs.stat(&path).await?;
    if metadata.is_directory {
        return Err(StorageError::IsADirectory(path.to_string()).into());
    }
    Ok(ok(ReplyCode::FileStatus, metadata.size.to_string()))
}

/// Handles the PASV command: binds a new listener and reports its address.
///
/// Any previous descriptor is discarded even when this fails. On success it
/// is only dropped after the new listener is bound, so the two never share a
/// port.
async fn handle_cmd_pasv(session: &mut Session, ctx: &ServerContext) -> HandlerResult {
    let _previous = session.take_data_channel();
    let local_ip = session.local_addr().ip();
    let advertised = advertised_ipv4(ctx.config.data.public_ip, local_ip)?;
    let result = setup_passive_mode(local_ip, ctx.config.passive_ports()).await?;
    info!(
        "[{}] PASV listening on {}",
        session.id(),
        result.data_socket
    );
    let port = result.data_socket.port();
    session.set_data_channel(result.channel);
    Ok(ok(
        ReplyCode::EnteringPassiveMode,
        format_pasv_reply(advertised, port),
    ))
}

async fn handle_cmd_epsv(
    session: &mut Session,
    ctx: &ServerContext,
    arg: Option<&str>,
) -> HandlerResult {
    let _previous = session.take_data_channel();
    check_epsv_argument(arg)?;
    let result = setup_passive_mode(session.local_addr().ip(), ctx.config.passive_ports()).await?;
    info!(
        "[{}] EPSV listening on {}",
        session.id(),
        result.data_socket
    );
    let port = result.data_socket.port();
    session.set_data_channel(result.channel);
    Ok(ok(
        ReplyCode::EnteringExtendedPassiveMode,
        format_epsv_reply(port),
    ))
}

/// Handles the PORT command: records the client's data address.
fn handle_cmd_port(session: &mut Session, ctx: &ServerContext, arg: &str) -> HandlerResult {
    drop(session.take_data_channel());
    let target = parse_port_argument(arg)?;
    let result = setup_active_mode(
        session.peer_addr().ip(),
        target,
        ctx.config.data.allow_foreign_port_target,
    )?;
    session.set_data_channel(result.channel);
    Ok(ok(ReplyCode::CommandOkay, "PORT command successful"))
}

fn handle_cmd_eprt(session: &mut Session, ctx: &ServerContext, arg: &str) -> HandlerResult {
    drop(session.take_data_channel());
    let target = parse_eprt_argument(arg)?;
    let result = setup_active_mode(
        session.peer_addr().ip(),
        target,
        ctx.config.data.allow_foreign_port_target,
    )?;
    session.set_data_channel(result.channel);
    Ok(ok(ReplyCode::CommandOkay, "EPRT command successful"))
}

/// Takes the pending descriptor; transfers without one fail with 425.
fn take_channel(session: &mut Session) -> Result<DataChannel, FtpServerError> {
    session
        .take_data_channel()
        .ok_or_else(|| TransferError::NoDataChannel.into())
}

/// Establishes the data connection and sends the 150 preliminary reply.
async fn open_data_connection<W>(
    session: &Session,
    ctx: &ServerContext,
    control: &mut ControlWriter<W>,
    channel: DataChannel,
    description: &str,
) -> Result<TcpStream, FtpServerError>
where
    W: AsyncWrite + Unpin,
{
    debug!(
        "[{}] Opening {} data connection via {}",
        session.id(),
        if channel.is_passive() { "passive" } else { "active" },
        channel.address()
    );
    let stream = channel
        .connect(
            session.peer_addr().ip(),
            ctx.config.accept_timeout(),
            ctx.config.connect_timeout(),
        )
        .await?;
    control
        .send(&Reply::new(
            ReplyCode::FileStatusOkay,
            format!("Opening {} mode data connection{}", session.transfer_type(), description),
        ))
        .await?;
    Ok(stream)
}

/// Closes the data connection after a successful transfer.
async fn finish_transfer(mut stream: TcpStream) -> HandlerResult {
    stream.shutdown().await.map_err(TransferError::Io)?;
    Ok(ok(ReplyCode::ClosingDataConnection, "Transfer complete"))
}

/// Handles LIST and NLST: sends the listing of a directory or single file.
///
/// Option arguments such as `-la` are ignored.
async fn handle_cmd_list<W>(
    session: &mut Session,
    ctx: &ServerContext,
    control: &mut ControlWriter<W>,
    arg: Option<&str>,
    format: ListFormat,
) -> HandlerResult
where
    W: AsyncWrite + Unpin,
{
    let channel = take_channel(session)?;
    let target = arg
        .map(|a| {
            a.split_whitespace()
                .filter(|part| !part.starts_with('-'))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();
    let path = ctx.vfs.resolve(session.cwd(), &target)?;
    let entries = ctx.vfs.list(&path).await?;

    let mut stream =
        open_data_connection(session, ctx, control, channel, " for file list").await?;
    send_listing(&entries, format, &mut stream).await?;
    info!(
        "[{}] Listed {} ({} entries)",
        session.id(),
        path,
        entries.len()
    );
    finish_transfer(stream).await
}

/// Handles the RETR command: streams a stored file to the client.
async fn handle_cmd_retr<W>(
    session: &mut Session,
    ctx: &ServerContext,
    control: &mut ControlWriter<W>,
    path: &str,
) -> HandlerResult
where
    W: AsyncWrite + Unpin,
{
    let channel = take_channel(session)?;
    let path = ctx.vfs.resolve(session.cwd(), path)?;
    let mut file = ctx.vfs.open_read(&path).await?;

    let mut stream = open_data_connection(session, ctx, control, channel, "").await?;
    let bytes = send_file(
        &mut file,
        &mut stream,
        session.transfer_type(),
        ctx.config.data.buffer_size,
    )
    .await?;
    info!("[{}] RETR {} ({} bytes)", session.id(), path, bytes);
    finish_transfer(stream).await
}

/// Handles the STOR command: creates or truncates the target and stores the
/// uploaded bytes.
async fn handle_cmd_stor<W>(
    session: &mut Session,
    ctx: &ServerContext,
    control: &mut ControlWriter<W>,
    path: &str,
) -> HandlerResult
where
    W: AsyncWrite + Unpin,
{
    let channel = take_channel(session)?;
    let path: VirtualPath = ctx.vfs.resolve(session.cwd(), path)?;
    let mut file = ctx.vfs.open_write(&path).await?;

    let mut stream = open_data_connection(session, ctx, control, channel, "").await?;
    let bytes = receive_file(
        &mut stream,
        &mut file,
        session.transfer_type(),
        ctx.config.data.buffer_size,
    )
    .await?;
    info!("[{}] STOR {} ({} bytes)", session.id(), path, bytes);
    finish_transfer(stream).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncReadExt, DuplexStream};

    struct Harness {
        _root: tempfile::TempDir,
        ctx: ServerContext,
        session: Session,
        control: ControlWriter<DuplexStream>,
        _client: DuplexStream,
    }

    impl Harness {
        fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            std::fs::create_dir(root.path().join("docs")).unwrap();
            std::fs::write(root.path().join("hello.txt"), b"hello").unwrap();

            let mut config = ServerConfig::default();
            config.session.server_root = root.path().to_string_lossy().into_owned();
            config.session.max_login_attempts = 2;
            config.data.port_min = 0;
            config.data.port_max = 0;
            config.auth.users.insert("alice".into(), "secret".into());
            let ctx = ServerContext::from_config(config).unwrap();

            let session = Session::new(
                "127.0.0.1:40000".parse().unwrap(),
                "127.0.0.1:2121".parse().unwrap(),
            );
            let (client, server) = tokio::io::duplex(4096);
            let control = ControlWriter::new(server, session.id());
            Harness {
                _root: root,
                ctx,
                session,
                control,
                _client: client,
            }
        }

        async fn run(&mut self, line: &str) -> CommandResult {
            handle_command(&mut self.session, line, &self.ctx, &mut self.control).await
        }

        async fn code(&mut self, line: &str) -> u16 {
            self.run(line).await.reply.code.as_u16()
        }

        async fn login(&mut self) {
            assert_eq!(self.code("USER alice").await, 331);
            assert_eq!(self.code("PASS secret").await, 230);
        }
    }

    #[tokio::test]
    async fn gated_commands_need_login() {
        let mut h = Harness::new();
        for line in ["PWD", "CWD docs", "CDUP", "LIST", "NLST", "RETR hello.txt", "STOR x", "SIZE hello.txt", "PASV", "EPSV", "TYPE I", "PORT 127,0,0,1,200,10", "EPRT |1|127.0.0.1|5000|"] {
            let result = h.run(line).await;
            assert_eq!(result.reply.code, ReplyCode::NotLoggedIn, "{line}");
            assert_eq!(result.reply.text, "Please login with USER and PASS");
        }
        assert_eq!(h.code("NOOP").await, 200);
        assert!(!h._root.path().join("x").exists());
    }

    #[tokio::test]
    async fn login_flow() {
        let mut h = Harness::new();
        assert_eq!(h.code("PASS secret").await, 503);
        h.login().await;
        assert!(h.session.is_logged_in());
        assert_eq!(h.code("USER bob").await, 503);
    }

    #[tokio::test]
    async fn repeated_bad_passwords_close_the_session() {
        let mut h = Harness::new();
        h.code("USER alice").await;
        let first = h.run("PASS wrong").await;
        assert_eq!(first.reply.code, ReplyCode::NotLoggedIn);
        assert_eq!(first.reply.text, "Login incorrect");
        assert!(!first.closes_connection());

        h.code("USER alice").await;
        let second = h.run("PASS wrong").await;
        assert_eq!(second.reply.code, ReplyCode::ServiceNotAvailable);
        assert!(second.closes_connection());
    }

    #[tokio::test]
    async fn navigation() {
        let mut h = Harness::new();
        h.login().await;
        assert_eq!(h.run("PWD").await.reply.text, "\"/\" is current directory");
        assert_eq!(h.code("CWD docs").await, 250);
        assert_eq!(h.run("PWD").await.reply.text, "\"/docs\" is current directory");
        assert_eq!(h.code("CDUP").await, 250);
        assert_eq!(h.code("CDUP").await, 250);
        assert!(h.session.cwd().is_root());
        assert_eq!(h.code("CWD ..").await, 553);
        assert_eq!(h.code("CWD missing").await, 550);
        assert_eq!(h.code("CWD hello.txt").await, 550);
        assert!(h.session.cwd().is_root());
    }

    #[tokio::test]
    async fn size_and_type() {
        let mut h = Harness::new();
        h.login().await;
        let reply = h.run("SIZE hello.txt").await.reply;
        assert_eq!(reply.to_string(), "213 5");
        assert_eq!(h.code("SIZE docs").await, 550);
        assert_eq!(h.code("SIZE nope").await, 550);
        assert_eq!(h.code("TYPE A").await, 200);
        assert_eq!(h.session.transfer_type(), TransferType::Ascii);
        assert_eq!(h.code("TYPE E").await, 504);
        assert_eq!(h.session.transfer_type(), TransferType::Ascii);
    }

    #[tokio::test]
    async fn unknown_and_malformed_commands() {
        let mut h = Harness::new();
        assert_eq!(h.code("XYZZY").await, 502);
        assert_eq!(h.code("USER").await, 501);
        h.login().await;
        assert_eq!(h.code("PORT 1,2,3").await, 501);
        assert_eq!(h.code("PORT 10,0,0,9,200,10").await, 501);
        assert_eq!(h.code("EPRT |9|1.2.3.4|5000|").await, 522);
        assert_eq!(h.code("EPSV 9").await, 522);
    }

    #[tokio::test]
    async fn transfer_without_data_channel() {
        let mut h = Harness::new();
        h.login().await;
        assert_eq!(h.code("RETR hello.txt").await, 425);
        assert_eq!(h.code("LIST").await, 425);
    }

    #[tokio::test]
    async fn storage_failure_discards_data_channel() {
        let mut h = Harness::new();
        h.login().await;
        assert_eq!(h.code("PASV").await, 227);
        assert_eq!(h.code("RETR missing.txt").await, 550);
        assert!(!h.session.has_data_channel());
        assert_eq!(h.code("RETR hello.txt").await, 425);
    }

    #[tokio::test]
    async fn failed_setup_discards_previous_channel() {
        let mut h = Harness::new();
        h.login().await;
        assert_eq!(h.code("PASV").await, 227);
        assert_eq!(h.code("PORT 1,2,3").await, 501);
        assert!(!h.session.has_data_channel());
        assert_eq!(h.code("RETR hello.txt").await, 425);

        assert_eq!(h.code("EPSV").await, 229);
        assert_eq!(h.code("EPRT |9|1.2.3.4|5000|").await, 522);
        assert_eq!(h.code("LIST").await, 425);

        assert_eq!(h.code("PORT 127,0,0,1,200,10").await, 200);
        assert_eq!(h.code("EPSV 9").await, 522);
        assert!(!h.session.has_data_channel());
    }

    #[tokio::test]
    async fn pasv_then_retr() {
        let mut h = Harness::new();
        h.login().await;
        let reply = h.run("EPSV").await.reply;
        assert_eq!(reply.code, ReplyCode::EnteringExtendedPassiveMode);
        let port: u16 = reply
            .text
            .trim_end_matches("|)")
            .rsplit('|')
            .next()
            .unwrap()
            .parse()
            .unwrap();

        let reader = tokio::spawn(async move {
            let mut data = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
            let mut out = Vec::new();
            data.read_to_end(&mut out).await.unwrap();
            out
        });
        let result = h.run("RETR hello.txt").await;
        assert_eq!(result.reply.code, ReplyCode::ClosingDataConnection);
        assert_eq!(reader.await.unwrap(), b"hello");
        assert!(!h.session.has_data_channel());
    }

    #[tokio::test]
    async fn quit_closes() {
        let mut h = Harness::new();
        let result = h.run("quit").await;
        assert!(result.closes_connection());
        assert_eq!(result.reply.to_string(), "221 Goodbye");
    }
}
