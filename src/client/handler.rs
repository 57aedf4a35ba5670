//! Per-connection command loop

use log::{debug, info, warn};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tokio::time::timeout;

use crate::client::session::{ControlLine, ControlReader, ControlWriter};
use crate::client::state::Session;
use crate::error::{FtpServerError, ProtocolError, SessionError, error_to_reply};
use crate::protocol::handle_command;
use crate::protocol::parser::loggable_line;
use crate::protocol::responses::{Reply, ReplyCode};
use crate::server::context::ServerContext;

/// Why a session's command loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Quit,
    ClientClosed,
    IdleTimeout,
    Shutdown,
    Rejected,
}

/// Runs one FTP session over a control connection.
///
/// - Sends the 220 banner, then reads command lines one at a time.
/// - Dispatches each line with `handle_command` and writes its final reply.
/// - Ends on QUIT, client close, idle timeout or server shutdown. Shutdown
///   is only observed between commands, so a running transfer completes.
///   A client close aborts the running command and its data connection.
pub async fn handle_client<R, W>(
    reader: R,
    writer: W,
    mut session: Session,
    ctx: Arc<ServerContext>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<SessionEnd, SessionError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let id = session.id();
    let mut reader = ControlReader::new(reader, ctx.config.session.max_command_length);
    let mut control = ControlWriter::new(writer, id);
    let idle_timeout = ctx.config.idle_timeout();

    info!("[{}] Session started for {}", id, session.peer_addr());
    control
        .send(&Reply::new(
            ReplyCode::ServiceReady,
            ctx.config.server.greeting.clone(),
        ))
        .await?;

    let end = loop {
        let next = tokio::select! {
            biased;
            _ = stop_requested(&mut shutdown) => None,
            line = timeout(idle_timeout, reader.read_line()) => Some(line),
        };

        let line = match next {
            None => {
                control
                    .send(&Reply::new(
                        ReplyCode::ServiceNotAvailable,
                        "Service shutting down",
                    ))
                    .await?;
                break SessionEnd::Shutdown;
            }
            Some(Err(_)) => {
                info!("[{}] Idle timeout", id);
                control
                    .send(&Reply::new(ReplyCode::ServiceNotAvailable, "Idle timeout"))
                    .await?;
                break SessionEnd::IdleTimeout;
            }
            Some(Ok(line)) => line?,
        };

        let line = match line {
            ControlLine::Command(line) => line,
            ControlLine::Closed => {
                info!("[{}] Connection closed by client", id);
                break SessionEnd::ClientClosed;
            }
            ControlLine::TooLong => {
                warn!("[{}] Command line too long, discarded", id);
                let err = ProtocolError::CommandTooLong(ctx.config.session.max_command_length);
                control.send(&error_to_reply(&FtpServerError::from(err))).await?;
                continue;
            }
            ControlLine::InvalidEncoding => {
                debug!("[{}] Command line is not valid UTF-8", id);
                let err = FtpServerError::from(ProtocolError::InvalidEncoding);
                control.send(&error_to_reply(&err)).await?;
                continue;
            }
        };

        info!("[{}] Received: {}", id, loggable_line(&line));
        // Dropping the command future closes any data listener or stream it holds.
        let result = tokio::select! {
            result = handle_command(&mut session, &line, &ctx, &mut control) => result,
            _ = reader.closed() => {
                info!("[{}] Connection closed by client during command, aborted", id);
                break SessionEnd::ClientClosed;
            }
        };
        control.send(&result.reply).await?;

        if result.closes_connection() {
            break if result.reply.code == ReplyCode::ClosingControlConnection {
                SessionEnd::Quit
            } else {
                SessionEnd::Rejected
            };
        }
    };

    drop(session.take_data_channel());
    if let Err(e) = control.shutdown().await {
        debug!("[{}] Control shutdown failed: {}", id, e);
    }
    info!("[{}] Session ended ({:?})", id, end);
    Ok(end)
}

/// Resolves once the supervisor asks sessions to stop, or has gone away.
async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
