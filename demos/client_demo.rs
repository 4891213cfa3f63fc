//! Example: submit records to a running echolog server
//!
//! Start a server first (cargo run --example server_demo), then run with:
//! cargo run --example client_demo

use echolog::client::RecordClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut client = RecordClient::connect("127.0.0.1:9000").await?;

    for payload in ["first record", "second record", "third record"] {
        let journal = client.send_record(payload.as_bytes()).await?;
        println!("--- journal after submitting {:?} ---", payload);
        print!("{}", String::from_utf8_lossy(&journal));
    }

    client.close().await?;
    Ok(())
}
