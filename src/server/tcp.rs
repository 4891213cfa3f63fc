//! TCP front end: socket setup and the accept loop

use crate::config::ServerConfig;
use crate::server::connection;
use crate::server::registry::{WorkerHandle, WorkerRegistry};
use crate::server::Journal;
use crate::{EchoLogError, Result};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{info, warn};

/// TCP socket server: owns the bound listening socket and runs the accept
/// loop.
///
/// Binding happens on a plain blocking socket, with address reuse enabled
/// and the configured backlog, so it can run before any async runtime
/// thread exists; daemon mode forks between bind and serve. The socket is
/// handed to the runtime's reactor only once [`run`](Self::run) starts.
pub struct TcpSocketServer {
    listener: std::net::TcpListener,
    local_addr: SocketAddr,
    journal: Arc<Journal>,
    registry: Arc<WorkerRegistry>,
    recv_buffer_size: usize,
}

impl TcpSocketServer {
    /// Create the listening socket and bind it. Failure here is fatal to
    /// startup.
    pub fn bind(
        config: &ServerConfig,
        journal: Arc<Journal>,
        registry: Arc<WorkerRegistry>,
    ) -> Result<Self> {
        let addr = config.socket_addr();

        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| EchoLogError::Server(format!("Failed to create socket: {}", e)))?;
        socket
            .set_reuse_address(true)
            .map_err(|e| EchoLogError::Server(format!("Failed to set address reuse: {}", e)))?;
        socket
            .bind(&addr.into())
            .map_err(|e| EchoLogError::Server(format!("Failed to bind {}: {}", addr, e)))?;
        socket
            .listen(config.server.backlog as i32)
            .map_err(|e| EchoLogError::Server(format!("Failed to listen on {}: {}", addr, e)))?;

        let listener: std::net::TcpListener = socket.into();
        let local_addr = listener.local_addr()?;

        Ok(Self {
            listener,
            local_addr,
            journal,
            registry,
            recv_buffer_size: config.server.recv_buffer_size,
        })
    }

    /// Address the socket is actually bound to. Useful when the configured
    /// port was 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Run the accept loop until the shutdown flag flips.
    ///
    /// Each accepted connection gets its own worker task, registered for
    /// later reaping; completed workers are swept after every accept. The
    /// shutdown channel cancels a pending accept promptly, so stopping
    /// never waits for the next natural connection.
    pub async fn run(
        self,
        shutdown: Arc<AtomicBool>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<()> {
        let Self {
            listener,
            local_addr: _,
            journal,
            registry,
            recv_buffer_size,
        } = self;

        listener.set_nonblocking(true)?;
        let listener = TcpListener::from_std(listener)?;

        loop {
            if shutdown.load(Ordering::SeqCst) {
                break;
            }

            tokio::select! {
                result = listener.accept() => {
                    if shutdown.load(Ordering::SeqCst) {
                        break;
                    }
                    match result {
                        Ok((stream, peer)) => {
                            info!("Accepted connection from {}", peer.ip());
                            spawn_worker(stream, peer, &journal, &registry, recv_buffer_size);
                            registry.sweep().await;
                        }
                        Err(e) => {
                            warn!("Failed to accept connection: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    break;
                }
            }
        }

        Ok(())
    }
}

fn spawn_worker(
    stream: TcpStream,
    peer: SocketAddr,
    journal: &Arc<Journal>,
    registry: &Arc<WorkerRegistry>,
    buffer_increment: usize,
) {
    let id = registry.next_id();
    let journal = Arc::clone(journal);
    let done = Arc::new(AtomicBool::new(false));
    let done_flag = Arc::clone(&done);

    let handle = tokio::spawn(async move {
        connection::serve_connection(stream, journal, buffer_increment).await;
        info!("Closed connection from {}", peer.ip());
        done_flag.store(true, Ordering::Release);
    });

    registry.register(id, WorkerHandle::new(done, handle));
}
