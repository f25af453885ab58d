//! Example: Upload a local file through a write handle
//!
//! Usage:
//!   cargo run --example put -- [--token TOKEN] LOCAL_FILE REMOTE_PATH

mod cli;

use cli::{format_size, init_tracing, usage_and_exit, ArgParser};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

const USAGE: &str =
    "Usage: cargo run --example put -- [--token TOKEN] [--proxy PROXY] LOCAL_FILE REMOTE_PATH";

#[tokio::main]
async fn main() {
    init_tracing();
    let mut parser = ArgParser::new(USAGE);
    let client = parser.client();

    let rest = parser.remaining();
    let [local, remote] = rest.as_slice() else {
        usage_and_exit(USAGE);
    };

    let mut file = match File::open(local).await {
        Ok(f) => f,
        Err(e) => {
            eprintln!("❌ Cannot open {}: {}", local, e);
            std::process::exit(1);
        }
    };

    let mut handle = client.open(remote);
    let mut buf = vec![0u8; 256 * 1024];
    loop {
        let n = match file.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                eprintln!("❌ Read failed: {}", e);
                std::process::exit(1);
            }
        };
        if let Err(e) = handle.write(&buf[..n]).await {
            eprintln!("❌ Upload failed: {}", e);
            std::process::exit(1);
        }
    }

    match handle.close().await {
        Ok(()) => println!(
            "✅ Uploaded {} to {} ({})",
            local,
            remote,
            format_size(handle.bytes_written())
        ),
        Err(e) => {
            eprintln!("❌ Upload failed: {}", e);
            std::process::exit(1);
        }
    }
}
