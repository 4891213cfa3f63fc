//! echolog server implementation

pub mod connection;
pub mod journal;
pub mod registry;
pub mod tcp;
pub mod timestamp;

use crate::config::ServerConfig;
use crate::Result;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

pub use journal::Journal;
pub use registry::{ConnectionId, WorkerHandle, WorkerRegistry};
pub use tcp::TcpSocketServer;
pub use timestamp::TimestampEmitter;

/// Requests graceful shutdown of a running [`EchoServer`] from any task.
///
/// The underlying flag flips false to true exactly once; repeated calls
/// are no-ops. Setting it wakes every loop that is blocked waiting for
/// work (the accept loop and the timestamp emitter).
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    tx: broadcast::Sender<()>,
}

impl ShutdownHandle {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            tx,
        }
    }

    /// Request shutdown. Idempotent.
    pub fn shutdown(&self) {
        if !self.flag.swap(true, Ordering::SeqCst) {
            // No receivers just means nothing is serving yet; the flag
            // alone covers that case.
            let _ = self.tx.send(());
        }
    }

    /// Whether shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Main echolog server that coordinates all components.
///
/// Construction binds the listening socket, so every fatal setup error
/// surfaces before serving (and before daemon mode detaches the process).
/// [`start`](Self::start) then accepts connections until the shutdown
/// handle fires and finishes the teardown sequence: join the timestamp
/// emitter, drain the worker registry, delete the journal's backing file.
pub struct EchoServer {
    config: ServerConfig,
    tcp: TcpSocketServer,
    journal: Arc<Journal>,
    registry: Arc<WorkerRegistry>,
    shutdown: ShutdownHandle,
}

impl EchoServer {
    /// Validate the configuration and bind the listening socket.
    pub fn bind(config: ServerConfig) -> Result<Self> {
        config.validate()?;

        let journal = Arc::new(Journal::new(config.storage.data_file.clone()));
        let registry = Arc::new(WorkerRegistry::new());
        let shutdown = ShutdownHandle::new();
        let tcp = TcpSocketServer::bind(&config, Arc::clone(&journal), Arc::clone(&registry))?;

        Ok(Self {
            config,
            tcp,
            journal,
            registry,
            shutdown,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.tcp.local_addr()
    }

    /// Handle used to request graceful shutdown.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Serve until shutdown is requested, then tear everything down.
    pub async fn start(self) -> Result<()> {
        let Self {
            config,
            tcp,
            journal,
            registry,
            shutdown,
        } = self;

        let accept_rx = shutdown.tx.subscribe();
        let emitter = if config.timestamp.enabled {
            let emitter = TimestampEmitter::new(
                Arc::clone(&journal),
                Duration::from_secs(config.timestamp.period_secs),
            );
            Some(tokio::spawn(emitter.run(shutdown.tx.subscribe())))
        } else {
            None
        };

        // A shutdown requested before this point broadcast its wake with
        // nobody subscribed; replay it now that the receivers exist.
        if shutdown.is_shutdown() {
            let _ = shutdown.tx.send(());
        }

        let accept_result = tcp.run(Arc::clone(&shutdown.flag), accept_rx).await;

        // If the accept loop failed on its own, make sure the emitter and
        // any future shutdown() callers still observe a shut-down server.
        shutdown.shutdown();

        if let Some(handle) = emitter {
            if let Err(e) = handle.await {
                warn!("Timestamp emitter terminated abnormally: {}", e);
            }
        }

        let active = registry.len();
        if active > 0 {
            info!("Waiting for {} active connection(s) to finish", active);
        }
        registry.drain().await;

        if let Err(e) = journal.remove().await {
            warn!("Failed to remove journal file: {}", e);
        }

        info!("Cleanup complete");
        accept_result
    }
}
