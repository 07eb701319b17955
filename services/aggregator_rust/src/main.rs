use aggregator_rust::{AggregatorConfig, AggregatorService};
use anyhow::Result;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    info!("Starting aggregator_rust...");

    let config = AggregatorConfig::from_env()?;
    let service = AggregatorService::new(config)?;

    service.run().await
}
