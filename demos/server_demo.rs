//! Example: run an echolog server programmatically
//!
//! Run with: cargo run --example server_demo

use echolog::config::ServerConfig;
use echolog::server::EchoServer;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("echolog=debug,info")
        .init();

    let mut config = ServerConfig::default();
    config.server.bind_address = "127.0.0.1".parse()?;
    config.storage.data_file = std::env::temp_dir().join("echolog-demo.data");
    config.timestamp.period_secs = 5;

    let server = EchoServer::bind(config)?;
    let addr = server.local_addr();
    println!("echolog server listening on {}", addr);
    println!("Try: printf 'hello\\n' | nc {} {}", addr.ip(), addr.port());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let shutdown = server.shutdown_handle();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.expect("Failed to listen for CTRL+C");
            println!("Shutting down...");
            shutdown.shutdown();
        });

        server.start().await
    })?;

    println!("Server stopped");
    Ok(())
}
