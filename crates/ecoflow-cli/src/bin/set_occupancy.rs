//! CLI tool to report a visitor count for one destination.

use clap::Parser;
use ecoflow_sdk::EcoflowClient;

/// Set the current occupancy of a destination
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Ecoflow server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Destination id
    #[arg(long)]
    destination: String,

    /// New occupancy count
    #[arg(long)]
    occupancy: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let client = EcoflowClient::new(&args.url);

    client
        .set_occupancy(&args.destination, args.occupancy)
        .await?;

    let capacity = client.fetch_capacity(&args.destination).await?;
    println!(
        "{}: occupancy {} / adjusted capacity {} ({})",
        args.destination, args.occupancy, capacity.adjusted_capacity, capacity.display_message
    );

    Ok(())
}
