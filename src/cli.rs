// cli.rs - Command-line interface configuration
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "aviary")]
#[command(about = "Animated glTF scene viewer", long_about = None)]
pub struct Cli {
    /// JSON scene description (models, camera, lights, backdrop)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Exit after rendering this many frames
    #[arg(long, value_name = "N")]
    pub frames: Option<u64>,

    /// Worker threads used for model loading
    #[arg(long = "loader-threads", default_value = "2")]
    pub loader_threads: usize,
}
