//! Object registry console
//!
//! Reads newline-delimited JSON debug commands from stdin, executes them
//! against a live registry, and writes one JSON response per line to stdout.

use clap::Parser;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use object_registry::{
    config::{duration_ms, Args},
    debug::handle_request,
    ObjectRegistry, RegistryService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Logs go to stderr, stdout carries responses only
    let log_level = args.log_level.clone();
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("object_registry={},info", log_level).into());
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let service = RegistryService::start(args.registry_config())?;
    let registry = Arc::clone(service.registry());
    info!(
        cleanup_period_ms = duration_ms(registry.cleanup_period()),
        "Object registry console ready"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) if line.trim().is_empty() => continue,
                    Some(line) => {
                        let response = handle_request(&registry, &line);
                        write_json(&mut stdout, &response).await?;
                    }
                    None => {
                        info!("Input closed");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Received Ctrl+C, shutting down");
                break;
            }
        }
    }

    if args.dump_on_exit {
        dump(&registry, &mut stdout).await?;
    }

    let stats = registry.stats();
    service.shutdown().await;
    info!(
        registrations = stats.registrations,
        evictions = stats.evictions,
        removals = stats.removals,
        "Console stopped"
    );
    Ok(())
}

async fn dump(registry: &ObjectRegistry, stdout: &mut tokio::io::Stdout) -> anyhow::Result<()> {
    let entries = registry.debug_dump(None);
    info!(objects = entries.len(), "Dumping registry");
    write_json(stdout, &entries).await
}

async fn write_json<T: serde::Serialize>(stdout: &mut tokio::io::Stdout, value: &T) -> anyhow::Result<()> {
    let mut out = serde_json::to_vec(value)?;
    out.push(b'\n');
    stdout.write_all(&out).await?;
    stdout.flush().await?;
    Ok(())
}
