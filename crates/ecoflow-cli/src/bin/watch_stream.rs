//! CLI tool to follow the live change stream.
//!
//! Connects to the server's WebSocket endpoint and prints a short state
//! summary every time an event triggers a snapshot refresh. Survives server
//! restarts through the SDK's reconnect logic.

use clap::Parser;
use ecoflow_sdk::{EcoflowClient, EventObserver};

/// Watch the ecoflow change stream and print refreshed state
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Ecoflow server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let client = EcoflowClient::new(&args.url);
    let observer = EventObserver::new(client)?;

    let mut states = observer.connection_state();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            eprintln!("[stream] connection state: {:?}", *states.borrow());
        }
    });

    println!("Watching {} for changes (ctrl-c to stop)...", args.url);
    observer
        .run(|snapshot| {
            println!(
                "-- {} destinations, {} capacity results, {} alerts",
                snapshot.destinations.len(),
                snapshot.capacities.len(),
                snapshot.alerts.len()
            );
            for alert in snapshot.alerts.iter().take(5) {
                println!(
                    "   [{:?}] {} {}",
                    alert.severity,
                    alert.title,
                    alert
                        .destination_id
                        .as_deref()
                        .map(|id| format!("({id})"))
                        .unwrap_or_default()
                );
            }
        })
        .await;

    Ok(())
}
