//! Classify a device and take a first state snapshot.
//!
//! Connects to a device over SSH, probes its command surface to derive its
//! role, stores the credential in an in-memory inventory, then polls the
//! role's state tables once and prints what was captured.
//!
//! # Prerequisites
//!
//! - A device reachable over SSH speaking the modeled CLI dialect
//! - Valid credentials
//!
//! # Usage
//!
//! ```bash
//! cargo run --example classify -- --host 10.0.15.133 --user admin --password cisco
//! ```
//!
//! With a separate enable secret:
//! ```bash
//! cargo run --example classify -- --host 10.0.15.133 --user admin --password cisco --secret enable
//! ```

use std::env;
use std::time::Duration;

use netherd::{classify, poll_device, DeviceEndpoint, MemoryStore, SshConnector, UpsertOutcome};
use secrecy::SecretString;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut endpoint = DeviceEndpoint::new(
        args.host.clone(),
        args.user.clone(),
        SecretString::from(args.password.clone()),
    )?
    .with_port(args.port)
    .with_timeout(Duration::from_secs(args.timeout));
    if let Some(secret) = &args.secret {
        endpoint = endpoint.with_enable_secret(SecretString::from(secret.clone()));
    }

    let connector = SshConnector::new();
    let store = MemoryStore::new();

    println!("Classifying {}...", endpoint.host);
    let result = classify(&connector, &endpoint, &store).await?;
    println!(
        "{} is a {} (credential {})",
        endpoint.host,
        result.role,
        match result.persisted {
            UpsertOutcome::Created => "created",
            UpsertOutcome::Updated => "updated",
        }
    );

    println!("\nPolling state tables...");
    let report = poll_device(&connector, &endpoint, &store, result.storage_class()).await?;
    for table in &report.captured {
        println!("  captured {table:?}");
    }
    for skip in &report.skipped {
        println!("  skipped {:?}: {}", skip.table, skip.reason);
    }

    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    host: String,
    port: u16,
    user: String,
    password: String,
    secret: Option<String>,
    timeout: u64,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut host = "localhost".to_string();
        let mut port = 22u16;
        let mut user = env::var("USER").unwrap_or_else(|_| "admin".to_string());
        let mut password = None;
        let mut secret = None;
        let mut timeout = 30u64;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    i += 1;
                    if i < args.len() {
                        host = args[i].clone();
                    }
                }
                "--port" | "-p" => {
                    i += 1;
                    if i < args.len() {
                        port = args[i].parse().unwrap_or(22);
                    }
                }
                "--user" | "-u" => {
                    i += 1;
                    if i < args.len() {
                        user = args[i].clone();
                    }
                }
                "--password" | "-P" => {
                    i += 1;
                    if i < args.len() {
                        password = Some(args[i].clone());
                    }
                }
                "--secret" | "-s" => {
                    i += 1;
                    if i < args.len() {
                        secret = Some(args[i].clone());
                    }
                }
                "--timeout" | "-t" => {
                    i += 1;
                    if i < args.len() {
                        timeout = args[i].parse().unwrap_or(30);
                    }
                }
                other => {
                    eprintln!("Unknown argument: {other}");
                    std::process::exit(1);
                }
            }
            i += 1;
        }

        let password = match password {
            Some(password) => password,
            None => {
                eprintln!("Error: --password is required");
                std::process::exit(1);
            }
        };

        Args {
            host,
            port,
            user,
            password,
            secret,
            timeout,
        }
    }
}
