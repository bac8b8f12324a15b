use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::mpsc;

use keypilot::config::Config;
use keypilot::controller::Controller;
use keypilot::host::HostRequest;
use keypilot::page::DocPage;
use keypilot::ui::{self, Workspace};

/// Get the config directory path (~/.config/keypilot/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("keypilot"))
}

#[derive(Parser, Debug)]
#[command(
    name = "keypilot",
    about = "Keyboard-driven markdown browser with vim-style sequences and link hints"
)]
struct Args {
    /// Markdown files to open, one tab each
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Alternate config file (default: ~/.config/keypilot/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => get_config_dir()?.join("config.toml"),
    };

    // An unreadable config degrades to defaults rather than refusing to start
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: {e}; using default configuration");
            tracing::warn!(error = %e, "Config load failed, using defaults");
            Config::default()
        }
    };

    let mut pages = Vec::with_capacity(args.files.len());
    for file in &args.files {
        let page = DocPage::load(file, 80, 24)
            .with_context(|| format!("Failed to open {}", file.display()))?;
        pages.push(page);
    }

    let (host_tx, host_rx) = mpsc::channel::<HostRequest>(32);
    let mut controller = Controller::new(&config, host_tx);
    let mut workspace = Workspace::new(pages, 80, 24);

    ui::run(&mut controller, &mut workspace, host_rx, config_path).await?;

    Ok(())
}
