//! echolog Server Binary
//!
//! Append-and-echo TCP record log server.

use clap::Parser;
use echolog::config::ServerConfig;
use echolog::server::EchoServer;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "echolog-server")]
#[command(about = "Append-and-echo TCP record log server")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/server.toml")]
    config: PathBuf,

    /// TCP port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Journal file path
    #[arg(short = 'f', long)]
    data_file: Option<PathBuf>,

    /// Detach from the controlling terminal after binding the socket
    #[cfg(unix)]
    #[arg(short, long)]
    daemon: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(if args.verbose {
            "echolog=debug,info"
        } else {
            "echolog=info,warn,error"
        })
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("Starting echolog server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = if args.config.exists() {
        match ServerConfig::from_file(&args.config) {
            Ok(config) => config,
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        }
    } else {
        info!("Config file not found, using defaults");
        ServerConfig::default()
    };

    // Override config with CLI arguments
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(data_file) = args.data_file {
        config.storage.data_file = data_file;
    }

    info!("Listening on {}", config.socket_addr());
    info!("Journal file: {}", config.storage.data_file.display());

    // Bind before daemonizing so a setup failure is still visible on the
    // terminal and exits non-zero.
    let server = match EchoServer::bind(config) {
        Ok(server) => server,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    #[cfg(unix)]
    if args.daemon {
        if let Err(e) = daemonize::Daemonize::new().working_directory("/").start() {
            error!("Failed to daemonize: {}", e);
            std::process::exit(1);
        }
    }

    // The runtime comes up only after the daemon fork; runtime threads do
    // not survive a fork.
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to build runtime: {}", e);
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(async {
        let shutdown = server.shutdown_handle();
        tokio::spawn(async move {
            wait_for_termination().await;
            info!("Caught signal, exiting");
            shutdown.shutdown();
        });

        server.start().await
    });

    if let Err(e) = result {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    info!("echolog server stopped");
}

/// Resolves when SIGINT or SIGTERM arrives.
async fn wait_for_termination() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
}
