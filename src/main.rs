use std::path::PathBuf;

use anyhow::anyhow;
use clap::{Args, Parser, Subcommand};

mod chart;
mod color;
mod data;
mod format;
mod models;
mod table;
mod value;

use crate::color::ColorMode;
use crate::format::Interval;
use crate::models::{ChartModel, TableModel};
use crate::value::ValueOptions;

#[derive(Parser)]
#[command(name = "cohort-retention")]
#[command(about = "Build retention table/chart models from aggregated cohort rows", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RenderArgs {
    /// Query-response JSON or flat CSV (date,total,period,value) input
    #[arg(long)]
    input: PathBuf,
    /// Write the model JSON here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
    /// Express the metric as a percentage of the cohort total
    #[arg(long)]
    percentual: bool,
    /// With --percentual, show 100 - percent instead
    #[arg(long)]
    inverse: bool,
    /// Use the running sum instead of the raw per-period value
    #[arg(long)]
    cumulative: bool,
    /// Date bucketing for inputs without column metadata (ms|s|m|h|d|w|M|y)
    #[arg(long)]
    interval: Option<String>,
}

impl RenderArgs {
    fn value_options(&self) -> ValueOptions {
        ValueOptions {
            cumulative: self.cumulative,
            percentual: self.percentual,
            inverse: self.inverse,
        }
    }

    fn interval(&self) -> anyhow::Result<Option<Interval>> {
        match self.interval.as_deref() {
            Some(code) => Interval::parse(code)
                .map(Some)
                .ok_or_else(|| anyhow!("unknown interval code: {code}")),
            None => Ok(None),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build the color-coded pivot-table model
    Table {
        #[command(flatten)]
        args: RenderArgs,
        /// Cell color mode: heatmap, mean, aboveAverage, or none
        #[arg(long, default_value = "heatmap")]
        map_colors: String,
    },
    /// Build the multi-series line-chart model
    Chart {
        #[command(flatten)]
        args: RenderArgs,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Table { args, map_colors } => {
            let (records, interval) = data::load_records(&args.input, args.interval()?)?;
            if records.is_empty() {
                println!("Nothing to render.");
                return Ok(());
            }
            let model: TableModel = table::build_table(
                &records,
                args.value_options(),
                ColorMode::parse(&map_colors),
                interval,
            );
            emit(&serde_json::to_string_pretty(&model)?, args.out.as_ref())?;
            println!("{}", table_summary(&model));
        }
        Commands::Chart { args } => {
            let (records, interval) = data::load_records(&args.input, args.interval()?)?;
            if records.is_empty() {
                println!("Nothing to render.");
                return Ok(());
            }
            let model: ChartModel = chart::build_chart(&records, args.value_options(), interval);
            emit(&serde_json::to_string_pretty(&model)?, args.out.as_ref())?;
            println!("{}", chart_summary(&model));
        }
    }

    Ok(())
}

fn emit(json: &str, out: Option<&PathBuf>) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, json)?;
            println!("Model written to {}.", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn table_summary(model: &TableModel) -> String {
    format!(
        "Table model: {} rows x {} columns.",
        model.rows.len(),
        model.columns.len()
    )
}

fn chart_summary(model: &ChartModel) -> String {
    format!("Chart model: {} series.", model.series.len())
}
