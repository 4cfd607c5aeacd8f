//! Terminal frontend for GemStone IV sessions served through Lich.

mod app;
mod config;
mod data;
mod highlight;
mod inventory;
mod network;
mod parser;
mod room;
mod spells;
mod state;
mod tui;
mod widgets;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::error;
use tracing_subscriber::EnvFilter;

use app::App;
use config::Config;
use network::GameConnection;
use tui::Tui;

#[derive(Parser, Debug)]
#[command(name = "vulgarity", about = "Terminal frontend for GemStone IV via Lich")]
struct Cli {
    /// Lich host to connect to (overrides the config file)
    #[arg(long)]
    host: Option<String>,

    /// Lich port to connect to (overrides the config file)
    #[arg(long)]
    port: Option<u16>,

    /// Character name, used to separate log files
    #[arg(long)]
    character: Option<String>,

    /// Path to the configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Data directory for settings and logs
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Hide the vitals and status rows
    #[arg(long)]
    no_status: bool,
}

fn init_logging(data_dir: &std::path::Path, character: Option<&str>) -> Result<()> {
    let dir = data_dir.join("logs");
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    let name = match character {
        Some(character) => format!("{}.log", character.to_lowercase()),
        None => "vulgarity.log".to_string(),
    };
    let file = fs::File::create(dir.join(&name))
        .with_context(|| format!("creating log file {name}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let data_dir = cli.data_dir.clone().unwrap_or_else(Config::default_dir);
    init_logging(&data_dir, cli.character.as_deref())?;

    let config_path = cli
        .config
        .unwrap_or_else(|| data_dir.join("config.toml"));
    let config = Config::load(&config_path)?;

    let host = cli.host.unwrap_or_else(|| config.connection.host.clone());
    let port = cli.port.unwrap_or(config.connection.port);

    let (server_tx, server_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    let connection = tokio::spawn(async move {
        if let Err(e) = GameConnection::start(&host, port, server_tx, command_rx).await {
            error!("connection failed: {:#}", e);
        }
    });

    // the terminal must come back even if we panic mid-draw
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = Tui::restore();
        default_panic(info);
    }));

    let mut tui = Tui::new()?;
    let mut app = App::new(config, config_path, command_tx, server_rx, !cli.no_status)?;
    let result = app.run(&mut tui).await;
    Tui::restore()?;
    connection.abort();
    result
}
