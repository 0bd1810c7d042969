//! PlatzPilot CLI - library seat availability at a glance.
//!
//! Prints server health and a per-category seat summary, then exits.
//! With `--watch`, stays running and reprints the summary every time the
//! background refresh delivers a new snapshot.

use std::io;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use platzpilot_core::{
    summaries, ApiClient, Config, FileStore, LibraryData, LibraryDataService,
};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let watch = std::env::args().any(|arg| arg == "--watch");

    let config = Config::load()?;
    info!(base_url = %config.base_url, "PlatzPilot CLI starting");

    let store = Arc::new(FileStore::open_default(&config)?);
    let api = Arc::new(ApiClient::new(config.clone())?);
    let service = LibraryDataService::new(api, store, config);

    service.initialize();

    if service.is_server_available().await {
        println!("Server: reachable");
    } else {
        println!("Server: unreachable, showing last known data if available");
    }

    let data = service.get_all_data().await?;
    print_summary(&data);

    if watch {
        println!();
        println!("Watching for updates, Ctrl+C to quit");
        service.subscribe(|data: &LibraryData| {
            println!();
            print_summary(data);
        });
        // Updates arrive via the auto-refresh task; just keep the process up
        std::future::pending::<()>().await
    }

    service.stop_auto_refresh();
    Ok(())
}

fn print_summary(data: &LibraryData) {
    println!(
        "{:<32} {:>5} {:>6} {:>6} {:>5}",
        "Category", "Locs", "Free", "Seats", "Occ%"
    );
    for (category, _) in summaries::category_counts(data) {
        let libraries = data.libraries_for(category);
        let stats = summaries::category_stats(&libraries);
        println!(
            "{:<32} {:>5} {:>6} {:>6} {:>4}%",
            category.display_name(),
            stats.library_count,
            stats.total_free_seats,
            stats.total_seats,
            stats.occupancy_rate
        );
    }
}
