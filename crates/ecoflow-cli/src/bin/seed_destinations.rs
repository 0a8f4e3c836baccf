//! CLI tool to seed a running server with demo destinations.

use clap::Parser;
use ecoflow_cli::demo_destinations;
use ecoflow_sdk::EcoflowClient;

/// Seed the ecoflow server with demo destinations
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Ecoflow server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Also trigger a weather refresh after seeding
    #[arg(long, default_value_t = false)]
    refresh: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let client = EcoflowClient::new(&args.url);

    println!("Seeding destinations into {}...", args.url);
    for destination in demo_destinations() {
        client.upsert_destination(&destination).await?;
        println!(
            "  {} ({:?}, capacity {})",
            destination.id, destination.ecological_sensitivity, destination.max_capacity
        );
    }

    if args.refresh {
        println!("Triggering weather refresh...");
        let summary = client.refresh_weather().await?;
        println!(
            "Refresh complete: {} succeeded, {} failed",
            summary.succeeded.len(),
            summary.failed.len()
        );
        for failure in summary.failed {
            eprintln!("  {}: {}", failure.destination_id, failure.error);
        }
    }

    Ok(())
}
