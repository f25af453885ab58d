//! Example: Print a Dropbox file (or its preview) to stdout
//!
//! Usage:
//!   cargo run --example cat -- [--token TOKEN] [--preview] PATH

mod cli;

use cli::{init_tracing, usage_and_exit, ArgParser};
use tokio::io::{self, AsyncWriteExt};

const USAGE: &str = "Usage: cargo run --example cat -- [--token TOKEN] [--proxy PROXY] [--preview] PATH";

#[tokio::main]
async fn main() {
    init_tracing();
    let mut parser = ArgParser::new(USAGE);
    let client = parser.client();

    let mut rest = parser.remaining();
    let preview = match rest.iter().position(|a| a == "--preview") {
        Some(i) => {
            rest.remove(i);
            true
        }
        None => false,
    };
    let [path] = rest.as_slice() else {
        usage_and_exit(USAGE);
    };

    let stream = if preview {
        client.preview(path).await
    } else {
        client.download(path).await
    };

    let mut stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let mut stdout = io::stdout();
    if let Err(e) = io::copy(&mut stream, &mut stdout).await {
        eprintln!("❌ Read failed: {}", e);
        std::process::exit(1);
    }
    let _ = stdout.flush().await;
}
