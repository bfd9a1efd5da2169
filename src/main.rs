//! fetchcache - fetch JSON through a persistent, version-aware cache
//!
//! Prints the (possibly cached) response as pretty JSON on stdout. Logs go to
//! stderr and are controlled with `RUST_LOG`.

use std::error::Error;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use fetchcache::cli::{select_pointer, Cli};
use fetchcache::CachedFetch;

/// Sets up stderr logging, `warn` unless `RUST_LOG` says otherwise
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let url = if cli.clear { None } else { Some(cli.url()?) };
    let client = CachedFetch::new(cli.cache_config())?;

    let Some(url) = url else {
        client.store().clear()?;
        tracing::info!(path = %client.store().path().display(), "cache cleared");
        return Ok(());
    };

    let value = client.fetch(url, &cli.fetch_options()).await?;
    let value = match &cli.pointer {
        Some(pointer) => select_pointer(&value, pointer)?,
        None => value,
    };

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
