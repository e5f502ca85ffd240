use clap::Parser;
use env_logger::Env;
use log::info;

use pricewatch::cli::Cli;
use pricewatch::config;
use pricewatch::monitor::Monitor;
use pricewatch::Result;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    let mut monitor = Monitor::new(config)?;
    if cli.once {
        monitor.run_once().await?;
        info!("single cycle finished");
        return Ok(());
    }

    monitor.run().await
}
