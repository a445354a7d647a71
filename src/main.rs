//! # Tide Chart Application Entry Point
//!
//! Coordinates data fetching, chart rendering and the panel. On the device it
//! runs the day navigation loop on the e-paper panel; with `--stdout` it
//! renders one day to the terminal and exits.

#[cfg(test)]
mod tests;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::Parser;
use env_logger::Env;
use log::info;
use std::path::PathBuf;
use tide_chart_lib::{
    app::Navigator,
    chart::ChartGeometry,
    config::{Config, DEFAULT_CONFIG_PATH},
    display::AsciiPanel,
    tide_data::{CachedTideSource, TideService},
};

#[derive(Parser, Debug)]
#[command(version, about = "Daily tide chart for a 2.13\" e-paper display")]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Day to show first (YYYY-MM-DD), defaults to today
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Render one day to the terminal instead of the panel
    #[arg(long)]
    stdout: bool,

    /// Debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(if args.debug {
        "debug"
    } else {
        "info"
    }))
    .init();

    let config = Config::load_from_path(&args.config);
    let start = args.date.unwrap_or_else(|| Local::now().date_naive());
    let geometry = ChartGeometry::from(&config.display);
    let service = TideService::new(&config.station, config.display.sample_count)
        .context("building HTTP client")?;
    let source = CachedTideSource::new(service);

    // Single-threaded: fetch, render and display run strictly in sequence
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    if args.stdout {
        let mut navigator = Navigator::new(source, AsciiPanel::stdout(), geometry, start);
        rt.block_on(navigator.refresh())?;
        return Ok(());
    }

    #[cfg(all(target_os = "linux", feature = "hardware"))]
    {
        use tide_chart_lib::{app::Timing, epd::EpdPanel};

        let panel = EpdPanel::open(&config.hardware).context("initialising e-paper panel")?;
        info!(
            "Showing tides for {} ({}) starting {}",
            config.station.name, config.station.id, start
        );
        let mut navigator = Navigator::new(source, panel, geometry, start);
        rt.block_on(navigator.run(Timing::from(&config.buttons)));
        Ok(())
    }

    #[cfg(not(all(target_os = "linux", feature = "hardware")))]
    {
        log::error!("E-paper support not enabled. Rebuild with --features hardware on Linux.");
        info!("Showing {} in the terminal instead", start);
        let mut navigator = Navigator::new(source, AsciiPanel::stdout(), geometry, start);
        rt.block_on(navigator.refresh())?;
        Ok(())
    }
}
