use clap::Parser;
use std::{path::PathBuf, time::Duration};
use stubhttp_core::server::ServerConfig;

/// Scripted HTTP responder for testing client network code.
#[derive(Debug, Parser)]
#[command(name = "stubhttp", version)]
pub struct Cli {
    /// Port to run server on
    #[arg(short, long, default_value_t = 80)]
    pub port: u16,

    /// Where to root server
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Seconds without a new connection before the server shuts itself down
    #[arg(long, default_value_t = 120)]
    pub idle_timeout: u64,
}

impl Cli {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            port: self.port,
            idle_timeout: Duration::from_secs(self.idle_timeout),
            ..ServerConfig::default()
        }
    }
}
