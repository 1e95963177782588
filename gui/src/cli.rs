use std::path::PathBuf;

use engine::poet::Provider;

#[derive(Debug, Clone, clap::Parser)]
pub struct Cli {
    /// Image to load right away
    #[arg(short, long)]
    pub image: Option<PathBuf>,

    /// Overrides the configured provider for this run
    #[arg(short, long, value_enum)]
    pub provider: Option<Provider>,
}
