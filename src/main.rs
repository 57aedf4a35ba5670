//! Keel FTP Server - Entry Point
//!
//! An async FTP server confining each session to a virtual root directory.

use clap::Parser;
use log::{error, info};
use std::process::ExitCode;

use keel_ftp_server::{Server, ServerConfig, setup_logging};

mod args;

use args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match ServerConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(host) = args.host {
        config.server.bind_address = host;
    }
    if let Some(port) = args.port {
        config.server.control_port = port;
    }
    if let Some(root) = args.root {
        config.session.server_root = root.to_string_lossy().into_owned();
    }
    if args.verbose {
        config.log.level = "debug".to_string();
    }

    setup_logging(&config.log.level);

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Launching FTP server...");

    let server = match Server::from_config(config).await {
        Ok(server) => server,
        Err(e) => {
            error!("Server startup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match server.run_until(shutdown_signal()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
