//! Example: List a Dropbox folder
//!
//! Usage:
//!   cargo run --example ls -- [--token TOKEN] [--limit N] [--dirs|--files] [PATH]

mod cli;

use cli::{format_size, init_tracing, usage_and_exit, ArgParser};

const USAGE: &str =
    "Usage: cargo run --example ls -- [--token TOKEN] [--proxy PROXY] [--limit N] [--dirs|--files] [PATH]";

#[tokio::main]
async fn main() {
    init_tracing();
    let mut parser = ArgParser::new(USAGE);
    let client = parser.client();
    let limit: i64 = match parser.take_value(&["--limit", "-n"]) {
        Some(n) => n.parse().unwrap_or_else(|_| usage_and_exit(USAGE)),
        None => 0,
    };

    let mut rest = parser.remaining();
    let dirs_only = take_flag(&mut rest, "--dirs");
    let files_only = take_flag(&mut rest, "--files");
    let path = match rest.as_slice() {
        [] => "/".to_string(),
        [path] => path.clone(),
        _ => usage_and_exit(USAGE),
    };

    let result = if dirs_only {
        client.folders(&path).await
    } else if files_only {
        client.files(&path).await
    } else {
        client.list_bounded(&path, limit).await
    };

    match result {
        Ok(entries) => {
            println!("📁 {}\n", path);
            for entry in entries {
                let icon = if entry.is_dir() { "📁" } else { "📄" };
                let size = if entry.is_file() {
                    format_size(entry.size)
                } else {
                    String::new()
                };
                let modified = entry
                    .server_modified
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default();
                println!("  {} {:<40} {:>10} {}", icon, entry.name, size, modified);
            }
        }
        Err(dropfs::DropboxError::EndOfSequence) => println!("  (empty)"),
        Err(e) => {
            eprintln!("❌ Failed to list {}: {}", path, e);
            std::process::exit(1);
        }
    }
}

fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    match args.iter().position(|a| a == flag) {
        Some(i) => {
            args.remove(i);
            true
        }
        None => false,
    }
}
