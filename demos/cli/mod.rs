use std::env;
use std::process;

use dropfs::{Client, Config};
use tracing_subscriber::{fmt, EnvFilter};

pub fn usage_and_exit(usage: &str) -> ! {
    eprintln!("{usage}");
    process::exit(1);
}

pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dropfs=debug"));
    fmt().with_env_filter(filter).with_target(false).init();
}

pub struct ArgParser {
    args: Vec<String>,
    usage: &'static str,
}

impl ArgParser {
    pub fn new(usage: &'static str) -> Self {
        let args: Vec<String> = env::args().skip(1).collect();

        if args.iter().any(|a| a == "--help" || a == "-h") {
            println!("{usage}");
            process::exit(0);
        }

        Self { args, usage }
    }

    pub fn take_value(&mut self, names: &[&str]) -> Option<String> {
        let mut i = 0;
        while i < self.args.len() {
            if names.contains(&self.args[i].as_str()) {
                let value = self.args.get(i + 1).cloned();
                if value.is_none() {
                    usage_and_exit(self.usage);
                }
                self.args.drain(i..=i + 1);
                return value;
            }
            i += 1;
        }
        None
    }

    /// Build a client from `--token`/`--proxy`, falling back to the environment.
    pub fn client(&mut self) -> Client {
        let token = self.take_value(&["--token", "-t"]);
        let proxy = self.take_value(&["--proxy"]);

        let config = match token {
            Some(token) => Config::new(token),
            None => match Config::from_env() {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("{e}");
                    usage_and_exit(self.usage);
                }
            },
        };
        let config = match proxy {
            Some(proxy) => config.with_proxy(proxy),
            None => config,
        };

        match Client::new(config) {
            Ok(client) => client,
            Err(e) => {
                eprintln!("Failed to create client: {e}");
                process::exit(1);
            }
        }
    }

    pub fn remaining(self) -> Vec<String> {
        self.args
    }
}

#[allow(dead_code)] // Not every demo prints sizes.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{}B", bytes)
    } else if bytes < 1_048_576 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else if bytes < 1_073_741_824 {
        format!("{:.1}MB", bytes as f64 / 1_048_576.0)
    } else {
        format!("{:.2}GB", bytes as f64 / 1_073_741_824.0)
    }
}
