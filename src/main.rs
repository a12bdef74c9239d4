//! Command-line front end of the emissions dashboard
//!
//! Each subcommand corresponds to one of the dashboard's controls and writes the
//! resulting chart data as JSON. Logs go to stderr, filtered by `RUST_LOG`.
//!
//! ```bash
//! ghgdash --config dashboard.toml history Finland
//! ghgdash --config dashboard.toml layers --year 2019 --metric co2-per-capita
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ghgdash::config::DashboardConfig;
use ghgdash_core::binning::{bin_layers, Metric};
use ghgdash_core::observation::{Year, YearRange};
use ghgdash_views::animation::{changes_frames, play};
use ghgdash_views::changes::changes_frame;
use ghgdash_views::emissions_history::emissions_history;
use ghgdash_views::sectors::sector_breakdown;
use ghgdash_views::temperature::temperature_chart;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Greenhouse-gas emissions dashboard
#[derive(Parser, Debug)]
#[command(name = "ghgdash")]
#[command(about = "Explore greenhouse-gas emissions, their trends and forecasts")]
struct Cli {
    /// Dashboard configuration (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write chart data here instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bounds of the year slider
    Bounds,
    /// Country-level table with derived columns
    Normalize {
        #[arg(long)]
        start: Option<Year>,
        #[arg(long)]
        end: Option<Year>,
        /// Only keep countries present in the map geometry
        #[arg(long)]
        map: bool,
    },
    /// Choropleth layers
    Layers {
        /// Single year to bin (default: every year of the slider)
        #[arg(long)]
        year: Option<Year>,
        /// Single metric to bin (default: every metric)
        #[arg(long, value_enum)]
        metric: Option<MetricArg>,
    },
    /// Trend forecast of one gas for a region
    Forecast {
        region: String,
        #[arg(long, value_enum, default_value_t = GasArg::Co2)]
        gas: GasArg,
    },
    /// Historical emissions merged with both forecasts
    History { region: String },
    /// Annual CO2 against its growth percentage
    Changes {
        #[arg(long)]
        year: Year,
    },
    /// Play the changes chart from a year to the end of the data, one JSON line per frame
    Animate {
        #[arg(long)]
        from: Year,
        /// Override the configured delay between frames
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Global temperature with warming thresholds
    Temperature,
    /// Global emissions by sector
    Sectors,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MetricArg {
    Co2PerCapita,
    Co2,
    Co2GrowthPrct,
}

impl From<MetricArg> for Metric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Co2PerCapita => Metric::Co2PerCapita,
            MetricArg::Co2 => Metric::Co2,
            MetricArg::Co2GrowthPrct => Metric::Co2GrowthPrct,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum GasArg {
    Co2,
    Methane,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config = match &cli.config {
        Some(path) => DashboardConfig::from_path(path)?,
        None => DashboardConfig::default(),
    };
    let mut output = open_output(cli.output.as_ref())?;
    run(cli.command, &config, &mut output)?;
    output.flush().context("Flushing output")?;
    Ok(())
}

fn open_output(path: Option<&PathBuf>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Creating {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    })
}

fn write_json<T: Serialize>(output: &mut dyn Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *output, value).context("Writing chart data")?;
    writeln!(output)?;
    Ok(())
}

fn run(command: Command, config: &DashboardConfig, output: &mut dyn Write) -> Result<()> {
    let context = config.load_context()?;

    match command {
        Command::Bounds => {
            let bounds = context.year_bounds()?;
            write_json(output, &bounds)
        }
        Command::Normalize { start, end, map } => {
            let bounds = context.year_bounds()?;
            let range = YearRange::new(
                start.unwrap_or(bounds.start()),
                end.unwrap_or(bounds.end()),
            )?;
            let mut table = ghgdash_core::normalize::normalize(context.dataset(), range);
            if map {
                if let Some(geometry) = context.geometry() {
                    table = table.restrict_to_geometry(geometry);
                }
            }
            write_json(output, &table)
        }
        Command::Layers { year, metric } => {
            let metric = metric.map(Metric::from);
            let layers = match year {
                Some(year) => {
                    let year = context.check_year(year)?;
                    bin_layers(&context.map_table()?, YearRange::new(year, year)?)
                }
                None => context.choropleth()?,
            };
            let selected: Vec<_> = layers
                .into_layers()
                .into_iter()
                .filter(|layer| metric.map_or(true, |metric| layer.metric == metric))
                .collect();
            info!(layers = selected.len(), "Binned choropleth layers");
            write_json(output, &selected)
        }
        Command::Forecast { region, gas } => {
            let (co2, methane) = config.forecasters()?;
            let forecaster = match gas {
                GasArg::Co2 => co2,
                GasArg::Methane => methane,
            };
            let series = forecaster.forecast_region(context.dataset(), &region)?;
            write_json(output, &series)
        }
        Command::History { region } => {
            let (co2, methane) = config.forecasters()?;
            let history =
                emissions_history(context.dataset(), &region, &config.history, &co2, &methane)?;
            write_json(output, &history)
        }
        Command::Changes { year } => {
            let year = context.check_year(year)?;
            let frame = changes_frame(&context.country_table()?, year, None);
            write_json(output, &frame)
        }
        Command::Animate { from, delay_ms } => {
            let from = context.check_year(from)?;
            let end = context.year_bounds()?.end();
            let table = context.country_table()?;
            let delay = delay_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| config.animation.delay());

            let mut failure = None;
            let shown = play(
                changes_frames(&table, from, end, Some(config.clip_range()?)),
                delay,
                |frame| {
                    let written = serde_json::to_writer(&mut *output, &frame)
                        .map_err(io::Error::from)
                        .and_then(|_| writeln!(output))
                        .and_then(|_| output.flush());
                    match written {
                        Ok(()) => ControlFlow::Continue(()),
                        Err(err) => {
                            failure = Some(err);
                            ControlFlow::Break(())
                        }
                    }
                },
            );
            info!(from, end, frames = shown, "Animation finished");
            match failure {
                // A closed pipe is the renderer going away
                Some(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                Some(err) => Err(err).context("Writing animation frame"),
                None => Ok(()),
            }
        }
        Command::Temperature => {
            let chart = temperature_chart(context.temperature()?, &config.temperature)?;
            write_json(output, &chart)
        }
        Command::Sectors => write_json(output, &sector_breakdown(context.sectors()?)),
    }
}
