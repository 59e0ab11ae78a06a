use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use log::{error, info};
use tokio::io::BufReader;

mod bridge;
mod config;
mod manager;
mod messages;
#[cfg(test)]
mod test_support;
mod webhook;

/// Forwards presence readings from the sensor bridge to a webhook.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve bridge calls read as JSON lines from stdin (default)
    Run,
    /// Send a single notification and exit
    Send { distance_mm: u32 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();
    let cli = Cli::parse();

    let env_url = std::env::var(config::WEBHOOK_URL_ENV).ok();
    let config = config::AppConfig::load(
        &cli.config,
        env_url.as_deref().is_some_and(|url| !url.trim().is_empty()),
    )?;
    let url = config.webhook.resolve_url(env_url)?;
    let notifier = webhook::PresenceNotifier::new(&config.webhook, url)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Send { distance_mm } => {
            notifier
                .notify(distance_mm)
                .await
                .context("sending presence notification")?;
        }
        Command::Run => {
            let bridge_config = config.bridge();
            let handler_name = bridge_config.handler_name();

            let mut bridge = bridge::Bridge::new();
            bridge.provide_distance(&handler_name, notifier)?;

            info!("Presence notifier ready, serving `{}`", handler_name);
            let core = manager::Manager::new(bridge, &bridge_config);
            let summary = core
                .run_loop(BufReader::new(tokio::io::stdin()), ctrl_c())
                .await?;
            info!(
                "Handled {} call(s), ignored {} malformed line(s)",
                summary.dispatched, summary.malformed
            );
        }
    }

    Ok(())
}

fn init_logger() {
    let mut builder = pretty_env_logger::formatted_timed_builder();
    builder.filter_level(log::LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Unable to listen for Ctrl-C: {}", err);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli() {
        let cli = Cli::parse_from(["presence-notifier"]);
        assert_eq!(cli.config, PathBuf::from("config.toml"));
        assert!(cli.command.is_none());

        let cli = Cli::parse_from(["presence-notifier", "-c", "/etc/uno.toml", "send", "120"]);
        assert_eq!(cli.config, PathBuf::from("/etc/uno.toml"));
        assert!(matches!(cli.command, Some(Command::Send { distance_mm: 120 })));

        assert!(Cli::try_parse_from(["presence-notifier", "send", "-3"]).is_err());
    }
}
