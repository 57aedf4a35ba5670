//! Control listener and session supervision

use log::{debug, error, info, warn};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::client::{Session, SessionEnd, handle_client};
use crate::config::ServerConfig;
use crate::error::SessionError;
use crate::protocol::responses::{Reply, ReplyCode};
use crate::server::context::ServerContext;

/// Control connection listener and session supervisor
pub struct Server {
    listener: TcpListener,
    ctx: Arc<ServerContext>,
}

impl Server {
    /// Bind the control listener for an existing context.
    pub async fn bind(ctx: ServerContext) -> io::Result<Self> {
        let socket = ctx.config.control_socket();
        let listener = match TcpListener::bind(&socket).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind to {}: {}", socket, e);
                return Err(e);
            }
        };
        info!("Server bound to {}", listener.local_addr()?);
        Ok(Self {
            listener,
            ctx: Arc::new(ctx),
        })
    }

    /// Create the server root if needed, build the default context and bind.
    pub async fn from_config(config: ServerConfig) -> io::Result<Self> {
        let root = config.server_root_path();
        tokio::fs::create_dir_all(&root).await?;
        info!("Server root directory: {}", root.display());
        Self::bind(ServerContext::from_config(config)?).await
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until the process is stopped.
    pub async fn run(self) -> io::Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Accept control connections until `shutdown` completes.
    ///
    /// On shutdown the listener is closed, every session is told to stop
    /// after its current command, and this returns once all session tasks
    /// have ended.
    pub async fn run_until<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let max_clients = self.ctx.config.server.max_clients;
        info!(
            "Starting Keel FTP server on {} (max {} clients)",
            self.listener.local_addr()?,
            max_clients
        );

        let (stop_tx, stop_rx) = watch::channel(false);
        let mut sessions: JoinSet<Result<SessionEnd, SessionError>> = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }
                Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                    log_session_exit(joined);
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        if sessions.len() >= max_clients {
                            warn!("Rejecting {}: {} clients connected", peer, sessions.len());
                            tokio::spawn(reject(stream));
                            continue;
                        }
                        let local = match stream.local_addr() {
                            Ok(local) => local,
                            Err(e) => {
                                warn!("Dropping connection from {}: {}", peer, e);
                                continue;
                            }
                        };
                        let (read_half, write_half) = stream.into_split();
                        let session = Session::new(peer, local);
                        debug!("Accepted {} as session {}", peer, session.id());
                        sessions.spawn(handle_client(
                            read_half,
                            write_half,
                            session,
                            Arc::clone(&self.ctx),
                            stop_rx.clone(),
                        ));
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                    }
                },
            }
        }

        drop(self.listener);
        let _ = stop_tx.send(true);
        info!("Waiting for {} sessions to finish", sessions.len());
        while let Some(joined) = sessions.join_next().await {
            log_session_exit(joined);
        }
        info!("Server stopped");
        Ok(())
    }
}

/// Turn away a connection beyond the client limit.
async fn reject(mut stream: TcpStream) {
    let reply = Reply::new(ReplyCode::ServiceNotAvailable, "Too many connections");
    if let Err(e) = stream.write_all(reply.to_wire().as_bytes()).await {
        debug!("Failed to send rejection: {}", e);
    }
    let _ = stream.shutdown().await;
}

fn log_session_exit(joined: Result<Result<SessionEnd, SessionError>, tokio::task::JoinError>) {
    match joined {
        Ok(Ok(end)) => debug!("Session task finished: {:?}", end),
        Ok(Err(e)) => warn!("Session ended with error: {}", e),
        Err(e) => error!("Session task failed: {}", e),
    }
}
