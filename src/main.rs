//! proxywarden/src/main.rs
//! Binary entry point: parses the CLI (A4), loads config, and dispatches to
//! the control surface (C11).

use anyhow::Context;
use clap::Parser;
use proxywarden::cli::{Cli, Command, RotateAction};
use proxywarden::config::ProxyWardenConfig;
use proxywarden::control::ControlSurface;
use proxywarden::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging("info");

    let cli = Cli::parse();
    let config = ProxyWardenConfig::load(&cli.config);
    let control = ControlSurface::new(cli.pool.clone().into(), config);

    match cli.command {
        Command::Import { file } => {
            let candidates = control
                .import(&file)
                .await
                .with_context(|| format!("importing candidates from {file}"))?;
            println!("imported {} candidates", candidates.len());
            let evicted = control.retest(candidates).await.context("validating imported candidates")?;
            if !evicted.is_empty() {
                println!("evicted after this run: {evicted:?}");
            }
        }
        Command::Retest => {
            let existing = control.status().await;
            let candidates = existing
                .into_iter()
                .map(|e| proxywarden::types::ProxyCandidate {
                    scheme: e.scheme,
                    host: e.address.rsplit_once(':').map(|(h, _)| h.to_owned()).unwrap_or_default(),
                    port: e
                        .address
                        .rsplit_once(':')
                        .and_then(|(_, p)| p.parse().ok())
                        .unwrap_or_default(),
                })
                .collect();
            let evicted = control.retest(candidates).await.context("retesting pool")?;
            println!("retest complete, evicted: {evicted:?}");
        }
        Command::Serve => {
            control.serve().await.context("starting listeners")?;
            println!("listeners running; press Ctrl+C to stop");
            tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
            control.stop().await;
        }
        Command::Stop => {
            control.stop().await;
        }
        Command::Switch { upstream_url } => {
            control.switch(&upstream_url).context("switching upstream")?;
            println!("upstream switched to {upstream_url}");
        }
        Command::Rotate { action } => match action {
            RotateAction::Enable { interval_secs } => {
                control
                    .rotate_enable(interval_secs)
                    .await
                    .context("enabling rotation")?;
                println!("rotation enabled every {interval_secs}s");
            }
            RotateAction::Disable => {
                control.rotate_disable().await;
                println!("rotation disabled");
            }
        },
        Command::Status => {
            for entry in control.status().await {
                println!(
                    "{:<6} {:>5.1} {:<6} {:<8} {:<22} {:<10} {:<12} {} {}",
                    entry.status.pool_label(),
                    entry.score,
                    entry.anonymity.pool_label(),
                    entry.scheme,
                    entry.address,
                    entry.latency_text(),
                    entry.speed_text(),
                    entry.country,
                    entry.city,
                );
            }
        }
    }

    Ok(())
}
