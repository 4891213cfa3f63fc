//! Integration tests for echolog

use echolog::client::RecordClient;
use echolog::config::{ClientConfig, ServerConfig};
use echolog::server::{EchoServer, ShutdownHandle};
use echolog::types::TIMESTAMP_FORMAT;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

/// Helper to build a loopback server config with the timestamp emitter off
fn test_server_config(data_file: &Path) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.server.bind_address = "127.0.0.1".parse().unwrap();
    config.server.port = 0;
    config.storage.data_file = data_file.to_path_buf();
    config.timestamp.enabled = false;
    config
}

fn start_server(config: ServerConfig) -> (SocketAddr, ShutdownHandle, JoinHandle<echolog::Result<()>>) {
    let server = EchoServer::bind(config).unwrap();
    let addr = server.local_addr();
    let shutdown = server.shutdown_handle();
    let handle = tokio::spawn(server.start());
    (addr, shutdown, handle)
}

async fn test_client(addr: SocketAddr) -> RecordClient {
    let config = ClientConfig {
        server_address: addr.to_string(),
        timeout_seconds: 2,
        response_quiet_ms: 100,
    };
    RecordClient::with_config(config).await.unwrap()
}

/// Test a single record is committed and echoed back
#[tokio::test]
async fn test_single_record_echo() {
    let temp_dir = tempdir().unwrap();
    let config = test_server_config(&temp_dir.path().join("journal.data"));
    let (addr, shutdown, handle) = start_server(config);

    let mut client = test_client(addr).await;
    let response = client.send_record(b"hello").await.unwrap();
    assert_eq!(&response[..], b"hello\n");
    client.close().await.unwrap();

    shutdown.shutdown();
    timeout(Duration::from_secs(2), handle).await.unwrap().unwrap().unwrap();
}

/// Test the journal accumulates across connections: hello, world, foo
#[tokio::test]
async fn test_journal_accumulates_across_connections() {
    let temp_dir = tempdir().unwrap();
    let config = test_server_config(&temp_dir.path().join("journal.data"));
    let (addr, shutdown, handle) = start_server(config);

    let mut client_a = test_client(addr).await;
    let response = client_a.send_record(b"hello").await.unwrap();
    assert_eq!(&response[..], b"hello\n");

    let mut client_b = test_client(addr).await;
    let response = client_b.send_record(b"world").await.unwrap();
    assert_eq!(&response[..], b"hello\nworld\n");
    client_b.close().await.unwrap();

    // A fresh connection sees everything committed so far.
    let mut client_c = test_client(addr).await;
    let response = client_c.send_record(b"foo").await.unwrap();
    assert_eq!(&response[..], b"hello\nworld\nfoo\n");
    client_c.close().await.unwrap();
    client_a.close().await.unwrap();

    shutdown.shutdown();
    timeout(Duration::from_secs(2), handle).await.unwrap().unwrap().unwrap();
}

/// Test one connection can submit several records in sequence
#[tokio::test]
async fn test_connection_reuse() {
    let temp_dir = tempdir().unwrap();
    let config = test_server_config(&temp_dir.path().join("journal.data"));
    let (addr, shutdown, handle) = start_server(config);

    let mut client = test_client(addr).await;
    assert_eq!(&client.send_record(b"one").await.unwrap()[..], b"one\n");
    assert_eq!(&client.send_record(b"two").await.unwrap()[..], b"one\ntwo\n");
    assert_eq!(
        &client.send_record(b"three").await.unwrap()[..],
        b"one\ntwo\nthree\n"
    );
    client.close().await.unwrap();

    shutdown.shutdown();
    timeout(Duration::from_secs(2), handle).await.unwrap().unwrap().unwrap();
}

/// Test a connection that closes without a delimiter contributes nothing
#[tokio::test]
async fn test_partial_record_discarded() {
    let temp_dir = tempdir().unwrap();
    let config = test_server_config(&temp_dir.path().join("journal.data"));
    let (addr, shutdown, handle) = start_server(config);

    {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"partial").await.unwrap();
        stream.shutdown().await.unwrap();
    }
    sleep(Duration::from_millis(200)).await;

    let mut client = test_client(addr).await;
    let response = client.send_record(b"after").await.unwrap();
    assert_eq!(&response[..], b"after\n");
    client.close().await.unwrap();

    shutdown.shutdown();
    timeout(Duration::from_secs(2), handle).await.unwrap().unwrap().unwrap();
}

/// Test concurrent clients: every committed record appears exactly once,
/// as a whole unit, and every echo includes the client's own record
#[tokio::test]
async fn test_concurrent_clients() {
    let temp_dir = tempdir().unwrap();
    let data_file = temp_dir.path().join("journal.data");
    let config = test_server_config(&data_file);
    let (addr, shutdown, handle) = start_server(config);

    let mut client_handles = vec![];
    for i in 0..5 {
        let handle = tokio::spawn(async move {
            let mut client = test_client(addr).await;
            for j in 0..3 {
                let payload = format!("client-{}-record-{}", i, j);
                let response = client.send_record(payload.as_bytes()).await.unwrap();
                let text = String::from_utf8(response.to_vec()).unwrap();
                // The echo is the journal as of this append: it must
                // contain this record.
                assert!(text.lines().any(|line| line == payload));
            }
            client.close().await.unwrap();
        });
        client_handles.push(handle);
    }
    for handle in client_handles {
        handle.await.unwrap();
    }

    // Check the final journal before shutdown deletes it.
    let contents = tokio::fs::read_to_string(&data_file).await.unwrap();
    let mut lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 15);
    lines.sort_unstable();
    lines.dedup();
    assert_eq!(lines.len(), 15, "each record must appear exactly once");
    for line in lines {
        assert!(line.starts_with("client-"));
        assert!(line.contains("-record-"));
    }

    shutdown.shutdown();
    timeout(Duration::from_secs(2), handle).await.unwrap().unwrap().unwrap();
}

/// Test graceful shutdown joins every task and removes the journal file
#[tokio::test]
async fn test_graceful_shutdown_removes_journal() {
    let temp_dir = tempdir().unwrap();
    let data_file = temp_dir.path().join("journal.data");
    let config = test_server_config(&data_file);
    let (addr, shutdown, handle) = start_server(config);

    let mut client = test_client(addr).await;
    client.send_record(b"persisted until shutdown").await.unwrap();
    client.close().await.unwrap();
    assert!(data_file.exists());

    shutdown.shutdown();
    let result = timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
    assert!(result.is_ok());
    assert!(!data_file.exists());
}

/// Test no new connections are accepted after shutdown completes
#[tokio::test]
async fn test_no_accept_after_shutdown() {
    let temp_dir = tempdir().unwrap();
    let config = test_server_config(&temp_dir.path().join("journal.data"));
    let (addr, shutdown, handle) = start_server(config);

    shutdown.shutdown();
    timeout(Duration::from_secs(2), handle).await.unwrap().unwrap().unwrap();

    let result = timeout(Duration::from_millis(500), TcpStream::connect(addr)).await;
    match result {
        Ok(Ok(_)) => panic!("connection accepted after shutdown"),
        Ok(Err(_)) | Err(_) => {}
    }
}

/// Test an in-flight connection is allowed to finish during shutdown
#[tokio::test]
async fn test_shutdown_waits_for_in_flight_connection() {
    let temp_dir = tempdir().unwrap();
    let data_file = temp_dir.path().join("journal.data");
    let config = test_server_config(&data_file);
    let (addr, shutdown, handle) = start_server(config);

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"he").await.unwrap();
    sleep(Duration::from_millis(100)).await;

    shutdown.shutdown();
    sleep(Duration::from_millis(100)).await;

    // The worker is still serving: finish the record and collect the echo.
    stream.write_all(b"llo\n").await.unwrap();
    let mut response = [0u8; 6];
    stream.read_exact(&mut response).await.unwrap();
    assert_eq!(&response, b"hello\n");
    drop(stream);

    let result = timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
    assert!(result.is_ok());
    assert!(!data_file.exists());
}

/// Test timestamp records appear periodically and match the fixed pattern
#[tokio::test]
async fn test_timestamp_records_appear() {
    let temp_dir = tempdir().unwrap();
    let mut config = test_server_config(&temp_dir.path().join("journal.data"));
    config.timestamp.enabled = true;
    config.timestamp.period_secs = 1;
    let (addr, shutdown, handle) = start_server(config);

    sleep(Duration::from_millis(2300)).await;

    let mut client = test_client(addr).await;
    let response = client.send_record(b"probe").await.unwrap();
    let text = String::from_utf8(response.to_vec()).unwrap();
    client.close().await.unwrap();

    let stamps: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("timestamp:"))
        .collect();
    assert!(stamps.len() >= 2, "expected at least two timestamp records");
    for stamp in stamps {
        assert!(
            chrono::DateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).is_ok(),
            "unparseable timestamp record: {}",
            stamp
        );
    }
    assert!(text.lines().any(|line| line == "probe"));

    shutdown.shutdown();
    timeout(Duration::from_secs(2), handle).await.unwrap().unwrap().unwrap();
}

/// Test journal storage failure: the record is dropped, the client gets a
/// best-effort empty response, and the server keeps serving
#[tokio::test]
async fn test_journal_failure_is_best_effort() {
    let temp_dir = tempdir().unwrap();
    // Point the journal into a directory that does not exist.
    let config = test_server_config(&temp_dir.path().join("missing-dir").join("journal.data"));
    let (addr, shutdown, handle) = start_server(config);

    let mut client = test_client(addr).await;
    let response = client.send_record(b"dropped").await.unwrap();
    assert!(response.is_empty());

    // The connection and the server both survive.
    let response = client.send_record(b"also dropped").await.unwrap();
    assert!(response.is_empty());
    client.close().await.unwrap();

    shutdown.shutdown();
    timeout(Duration::from_secs(2), handle).await.unwrap().unwrap().unwrap();
}

/// Test large records that span many receive-buffer increments
#[tokio::test]
async fn test_large_record() {
    let temp_dir = tempdir().unwrap();
    let mut config = test_server_config(&temp_dir.path().join("journal.data"));
    config.server.recv_buffer_size = 64;
    let (addr, shutdown, handle) = start_server(config);

    let payload = "x".repeat(16 * 1024);
    let mut client = test_client(addr).await;
    let response = client.send_record(payload.as_bytes()).await.unwrap();
    assert_eq!(response.len(), payload.len() + 1);
    assert!(response.ends_with(b"\n"));
    assert_eq!(&response[..payload.len()], payload.as_bytes());
    client.close().await.unwrap();

    shutdown.shutdown();
    timeout(Duration::from_secs(2), handle).await.unwrap().unwrap().unwrap();
}
