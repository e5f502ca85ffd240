use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "pricewatch")]
#[command(about = "Polls exchange ticker prices and alerts on sharp moves")]
#[command(version)]
pub struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Run a single monitoring cycle and exit.
    #[arg(long)]
    pub once: bool,
}
