pub mod action;
pub mod app;
pub mod cli;
pub mod components;
pub mod config;
pub mod headless;
pub mod layout;
pub mod mode;
pub mod styles;
pub mod tui;
pub mod utils;

use std::sync::Arc;

use backdrop::editor::api::HttpEditClient;
use clap::Parser;
use cli::Cli;
use color_eyre::eyre::Result;

use crate::{
    app::App,
    config::Config,
    utils::{initialize_logging, initialize_panic_handler},
};

async fn tokio_main() -> Result<()> {
    initialize_logging()?;

    initialize_panic_handler()?;

    let args = Cli::parse();

    let mut config = Config::new()?;
    if let Some(server) = args.server {
        config.server.base_url = server;
    }
    tracing::info!(server = %config.server.base_url, "starting");

    let client = HttpEditClient::new(config.server.base_url.clone())
        .with_remove_bg_timeout(config.server.remove_bg_timeout());

    match args.command {
        Some(command) => {
            let path = headless::run(command, &config, &client).await?;
            println!("{}", path.display());
        }
        None => {
            let mut app = App::new(config, Arc::new(client), args.tick_rate, args.frame_rate);
            app.run().await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = tokio_main().await {
        eprintln!("{} error: Something went wrong", env!("CARGO_PKG_NAME"));
        Err(e)
    } else {
        Ok(())
    }
}
