//! Covgen CLI entry point.

use clap::Parser;

use covgen::cli::{self, Cli};
use covgen::infrastructure::{config::ConfigLoader, logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.config.as_ref() {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err:#}");
            std::process::exit(1);
        }
    };

    let _guard = match logging::init(&config.logging) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("failed to initialize logging: {err:#}");
            std::process::exit(1);
        }
    };

    if let Err(err) = cli::execute(cli, config).await {
        cli::handle_error(&err);
    }
}
