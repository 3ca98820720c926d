use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use enum_dispatch::enum_dispatch;
use log::{debug, info, warn};
use nufus::{
    aggregate::{province_series, GroupBy},
    config::Config,
    export::ExportKind,
    formatters::{CSVFormatter, GeoJSONFormatter, OutputFormatter, OutputGenerator},
    range::{normalize, RangePresets},
    session::FilterState,
    view::Level,
    Nufus,
};
use polars::frame::DataFrame;
use serde::{Deserialize, Serialize};
use spinners::{Spinner, Spinners};
use strum_macros::EnumString;

use crate::display::{display_presets, display_summary, display_totals, display_years};
use crate::error::NufusCliResult;

const DEFAULT_PROGRESS_SPINNER: Spinners = Spinners::Dots;
const COMPLETE_PROGRESS_STRING: &str = "✔";
const RUNNING_TAIL_STRING: &str = "...";
const LOADING_STRING: &str = "Loading population table";

/// Defines the output formats we are able to produce exports in.
#[derive(Clone, Debug, Deserialize, Serialize, EnumString, PartialEq, Eq)]
#[strum(ascii_case_insensitive)]
pub enum OutputFormat {
    GeoJSON,
    Csv,
}

impl From<&OutputFormat> for OutputFormatter {
    fn from(value: &OutputFormat) -> Self {
        match value {
            OutputFormat::GeoJSON => OutputFormatter::GeoJSON(GeoJSONFormatter),
            OutputFormat::Csv => OutputFormatter::Csv(CSVFormatter::default()),
        }
    }
}

fn write_output<T, U>(
    output_generator: T,
    mut data: DataFrame,
    output_file: Option<U>,
) -> NufusCliResult<()>
where
    T: OutputGenerator,
    U: AsRef<Path>,
{
    if let Some(output_file) = output_file {
        let mut f = File::create(output_file).context("Failed to write output")?;
        output_generator.save(&mut f, &mut data)?;
    } else {
        let mut stdout_lock = std::io::stdout().lock();
        output_generator.save(&mut stdout_lock, &mut data)?;
    };
    Ok(())
}

async fn load(config: Config, quiet: bool) -> NufusCliResult<Nufus> {
    let sp = (!quiet).then(|| {
        Spinner::with_timer(
            DEFAULT_PROGRESS_SPINNER,
            LOADING_STRING.to_string() + RUNNING_TAIL_STRING,
        )
    });
    let nufus = Nufus::new_with_config(config).await?;
    if let Some(mut s) = sp {
        s.stop_with_symbol(COMPLETE_PROGRESS_STRING);
    }
    Ok(nufus)
}

/// Trait that defines what to run when a given subcommand is invoked.
#[enum_dispatch]
pub trait RunCommand {
    async fn run(&self, config: Config) -> NufusCliResult<()>;
}

/// Range filter widgets shared by the commands that filter.
#[derive(Args, Debug, Clone, Default)]
#[group(required = false, multiple = false)]
pub struct RangeArgs {
    #[arg(
        short,
        long,
        help = "Population range such as 5.000-10.000 (both ends inclusive)",
        allow_hyphen_values = true
    )]
    range: Option<String>,
    #[arg(long, help = "Select a range preset by label, e.g. 500-1.000")]
    preset: Option<String>,
    #[arg(long, help = "Clear the range filter")]
    clear: bool,
}

impl RangeArgs {
    /// Apply the widgets to a fresh filter state. A rejected range is reported and leaves the
    /// state as it was.
    fn filter_state(&self, presets: &RangePresets) -> FilterState {
        let state = FilterState::default();
        if self.clear {
            return state.clear();
        }
        let submitted = match (&self.range, &self.preset) {
            (Some(text), _) => state.on_input(text).submit(presets),
            (None, Some(label)) => state.select_preset(label, presets),
            (None, None) => return state,
        };
        match submitted {
            Ok(next) => next,
            Err(err) => {
                warn!("{err}");
                eprintln!("{err}");
                state
            }
        }
    }
}

/// The `years` command lists the years present in the table with the province totals.
#[derive(Args, Debug)]
pub struct YearsCommand {
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for YearsCommand {
    async fn run(&self, config: Config) -> NufusCliResult<()> {
        info!("Running `years` subcommand");
        let nufus = load(config, self.quiet).await?;
        display_years(&province_series(&nufus.dataset))?;
        Ok(())
    }
}

/// The `range` command shows how a range text is normalized and what it resolves to.
#[derive(Args, Debug)]
pub struct RangeCommand {
    #[arg(index = 1, allow_hyphen_values = true)]
    text: Option<String>,
    #[arg(short, long, help = "Year whose population bounds define the presets")]
    year: Option<i32>,
    #[arg(long, help = "List the available presets")]
    presets: bool,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for RangeCommand {
    async fn run(&self, config: Config) -> NufusCliResult<()> {
        info!("Running `range` subcommand");
        let nufus = load(config, self.quiet).await?;
        let presets = nufus.presets(self.year)?;
        if self.presets {
            display_presets(&presets)?;
        }
        if let Some(text) = self.text.as_deref() {
            println!("{}", normalize(text));
            let range = presets.resolve(text)?;
            println!("{} ≤ NÜFUS ≤ {}", range.low(), range.high());
        }
        Ok(())
    }
}

/// The `view` command outputs the map layer JSON for a level.
#[derive(Args, Debug)]
pub struct ViewCommand {
    #[arg(
        short,
        long,
        value_name = "province|district|neighborhood",
        default_value = "district"
    )]
    level: Level,
    #[arg(short, long, help = "Year to show, defaults to the most recent")]
    year: Option<i32>,
    #[command(flatten)]
    range_args: RangeArgs,
    #[arg(short = 'o', long, help = "Output file for the layer JSON")]
    output_file: Option<PathBuf>,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for ViewCommand {
    async fn run(&self, config: Config) -> NufusCliResult<()> {
        info!("Running `view` subcommand");
        let nufus = load(config, self.quiet).await?;
        let state = self.range_args.filter_state(&nufus.presets(self.year)?);
        let layer = nufus.view(self.level, self.year, state.range())?;
        if let Some(summary) = layer.summary.as_ref() {
            display_summary(summary);
        }
        let json = serde_json::to_string_pretty(&layer)?;
        match self.output_file.as_ref() {
            Some(path) => std::fs::write(path, json)
                .with_context(|| format!("Failed to write layer to {}", path.display()))?,
            None => println!("{json}"),
        }
        Ok(())
    }
}

/// The `totals` command prints group totals of a year with the grand total.
#[derive(Args, Debug)]
pub struct TotalsCommand {
    #[arg(short, long, value_name = "district|neighborhood", default_value = "district")]
    group_by: GroupBy,
    #[arg(short, long, help = "Year to total, defaults to the most recent")]
    year: Option<i32>,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for TotalsCommand {
    async fn run(&self, config: Config) -> NufusCliResult<()> {
        info!("Running `totals` subcommand");
        let nufus = load(config, self.quiet).await?;
        let totals = nufus.totals(self.group_by, self.year)?;
        display_totals(&totals, self.group_by == GroupBy::Neighborhood)?;
        Ok(())
    }
}

/// The `export` command writes the raw or pivoted table.
#[derive(Args, Debug)]
pub struct ExportCommand {
    #[arg(short, long, value_name = "raw|pivot", default_value = "raw")]
    kind: ExportKind,
    #[arg(
        short,
        long,
        value_name = "district|neighborhood",
        help = "Export group totals instead of records (raw) or choose the pivot rows"
    )]
    group_by: Option<GroupBy>,
    #[arg(short, long)]
    year: Option<i32>,
    #[command(flatten)]
    range_args: RangeArgs,
    #[arg(
        short = 'f',
        long,
        value_name = "geojson|csv",
        default_value = "csv",
        help = "Output format for the results"
    )]
    output_format: OutputFormat,
    #[arg(short = 'o', long, help = "Output file to place the results")]
    output_file: Option<PathBuf>,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for ExportCommand {
    async fn run(&self, config: Config) -> NufusCliResult<()> {
        info!("Running `export` subcommand");
        let nufus = load(config, self.quiet).await?;
        let state = self.range_args.filter_state(&nufus.presets(self.year)?);
        let data = nufus.export(self.kind, self.group_by, self.year, state.range())?;
        debug!("{data:#?}");
        let formatter: OutputFormatter = (&self.output_format).into();
        write_output(formatter, data, self.output_file.as_deref())?;
        Ok(())
    }
}

/// The entrypoint for the CLI.
#[derive(Parser, Debug)]
#[command(version, about = "Population map of Ordu by district and neighborhood", long_about = None, name = "nufus")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
    #[arg(
        short = 'c',
        long = "config",
        help = "Path to a config TOML file, defaults to <config dir>/nufus/config.toml",
        global = true
    )]
    pub config: Option<PathBuf>,
    #[arg(
        short = 'q',
        long = "quiet",
        help = "\
            Do not print progress bar to stdout. Results and logs (when `RUST_LOG` is set) will\n\
            still be printed.",
        global = true
    )]
    quiet: bool,
}

/// Commands contains the list of subcommands avaliable for use in the CLI.
#[derive(Subcommand, Debug)]
#[enum_dispatch(RunCommand)]
pub enum Commands {
    /// List the years in the table with province totals
    Years(YearsCommand),
    /// Normalize and resolve a population range
    Range(RangeCommand),
    /// Output the map layer for a level
    View(ViewCommand),
    /// Print group totals for a year
    Totals(TotalsCommand),
    /// Export the raw or pivoted table
    Export(ExportCommand),
}
