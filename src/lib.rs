//! # echolog - Append-and-Echo Record Log Service
//!
//! echolog is a small TCP service that treats every newline-terminated chunk
//! of bytes as a record, appends it to a single shared journal file, and
//! immediately echoes the journal's entire contents back to the submitting
//! client. A background task injects a timestamp record into the same
//! journal at a fixed period.
//!
//! ## Features
//!
//! - **Atomic commits**: one lock serializes every append and full read, so
//!   a client's echo is exactly the journal as of its own submission
//! - **Concurrent connections**: one async worker per accepted connection,
//!   tracked and reaped through a registry
//! - **Graceful shutdown**: SIGINT/SIGTERM stop the accept loop, let
//!   in-flight connections finish, and delete the journal file
//! - **Daemon mode**: detach from the terminal after the socket is bound
//!
//! ## Quick Start
//!
//! ### Server
//! ```no_run
//! use echolog::config::ServerConfig;
//! use echolog::server::EchoServer;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = EchoServer::bind(ServerConfig::default())?;
//!     let runtime = tokio::runtime::Builder::new_multi_thread()
//!         .enable_all()
//!         .build()?;
//!     runtime.block_on(server.start())?;
//!     Ok(())
//! }
//! ```
//!
//! ### Client
//! ```no_run
//! use echolog::client::RecordClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = RecordClient::connect("127.0.0.1:9000").await?;
//!     let journal = client.send_record(b"hello").await?;
//!     println!("{}", String::from_utf8_lossy(&journal));
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod server;
pub mod types;

/// Common error types used throughout echolog
pub mod error {
    use std::fmt;

    /// echolog error types
    #[derive(Debug)]
    pub enum EchoLogError {
        /// I/O operation failed
        Io(std::io::Error),
        /// Configuration error
        Config(String),
        /// Server error
        Server(String),
        /// Client error
        Client(String),
        /// Connection error
        Connection(String),
    }

    impl fmt::Display for EchoLogError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                EchoLogError::Io(e) => write!(f, "I/O error: {}", e),
                EchoLogError::Config(e) => write!(f, "Configuration error: {}", e),
                EchoLogError::Server(e) => write!(f, "Server error: {}", e),
                EchoLogError::Client(e) => write!(f, "Client error: {}", e),
                EchoLogError::Connection(e) => write!(f, "Connection error: {}", e),
            }
        }
    }

    impl std::error::Error for EchoLogError {}

    impl From<std::io::Error> for EchoLogError {
        fn from(err: std::io::Error) -> Self {
            EchoLogError::Io(err)
        }
    }

    /// Result type alias for echolog operations
    pub type Result<T> = std::result::Result<T, EchoLogError>;
}

pub use error::{EchoLogError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::client::RecordClient;
    pub use crate::config::{ClientConfig, ServerConfig};
    pub use crate::server::{EchoServer, ShutdownHandle};
    pub use crate::types::Record;
    pub use crate::{EchoLogError, Result};
}
