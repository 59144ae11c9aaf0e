use anyhow::Context;
use clap::Parser;
use log::info;
use std::io::{self, Write};
use stubhttp_core::{
    dispatch::Dispatcher,
    middleware::LogMiddleware,
    server::{Server, Shutdown, Stopped},
    store::{DirectoryStore, GuessMime},
};

mod cli;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = cli::Cli::parse();

    std::env::set_current_dir(&cli.root)
        .with_context(|| format!("could not change directory to {}", cli.root.display()))?;

    let listening = Server::new(
        &cli.server_config(),
        Dispatcher::new(DirectoryStore::new("."), GuessMime),
    )
    .middleware(LogMiddleware {})
    .bind()?;

    let shutdown = Shutdown::new();
    let interrupt = shutdown.clone();
    ctrlc::set_handler(move || interrupt.trigger()).context("could not set Ctrl-C handler")?;

    print!("started stubhttp...");
    io::stdout().flush()?;

    let stopped = listening.serve(&shutdown)?;
    info!("server stopped: {:?}", stopped);

    match stopped {
        Stopped::Interrupted => println!("^C received, shutting down server"),
        Stopped::IdleTimeout => println!("Too long since the last request, shutting down server"),
    }

    Ok(())
}
