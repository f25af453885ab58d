//! Example: Search file names under a Dropbox folder
//!
//! Usage:
//!   cargo run --example search -- [--token TOKEN] [--path /folder] QUERY

mod cli;

use cli::{init_tracing, usage_and_exit, ArgParser};

const USAGE: &str =
    "Usage: cargo run --example search -- [--token TOKEN] [--proxy PROXY] [--path PATH] QUERY";

#[tokio::main]
async fn main() {
    init_tracing();
    let mut parser = ArgParser::new(USAGE);
    let client = parser.client();
    let path = parser.take_value(&["--path"]).unwrap_or_else(|| "/".to_string());

    let rest = parser.remaining();
    let [query] = rest.as_slice() else {
        usage_and_exit(USAGE);
    };

    match client.search(&path, query).await {
        Ok(hits) => {
            println!("🔍 {} match(es) for {:?} under {}\n", hits.len(), query, path);
            for hit in hits {
                let icon = if hit.is_dir() { "📁" } else { "📄" };
                println!("  {} {}", icon, hit.path_display.as_deref().unwrap_or(&hit.name));
            }
        }
        Err(e) => {
            eprintln!("❌ Search failed: {}", e);
            std::process::exit(1);
        }
    }
}
