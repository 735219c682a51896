use std::path::PathBuf;

use clap::{command, Args, Parser, Subcommand};
use enum_dispatch::enum_dispatch;
use envburden::config::Config;
use envburden::dashboard::{build_dashboard_dataset, display_name, DisplayDataset};
use envburden::summary::{daly_indicators, summary_statistics};
use envburden::{EnvBurden, Source};
use log::{debug, info};
use spinners::{Spinner, Spinners};

use crate::display::{display_frame, display_merge_report, display_summary};
use crate::error::{EnvBurdenCliError, EnvBurdenCliResult};

const DEFAULT_PROGRESS_SPINNER: Spinners = Spinners::Dots;
const COMPLETE_PROGRESS_STRING: &str = "✔";
const RUNNING_TAIL_STRING: &str = "...";

fn start_spinner(quiet: bool, message: &str) -> Option<Spinner> {
    (!quiet).then(|| {
        Spinner::with_timer(
            DEFAULT_PROGRESS_SPINNER,
            message.to_string() + RUNNING_TAIL_STRING,
        )
    })
}

fn stop_spinner(sp: Option<Spinner>) {
    if let Some(mut s) = sp {
        s.stop_with_symbol(COMPLETE_PROGRESS_STRING);
    }
}

/// Trait that defines what to run when a given subcommand is invoked.
#[enum_dispatch]
pub trait RunCommand {
    async fn run(&self, config: Config) -> EnvBurdenCliResult<()>;
}

/// The `clean` command loads one raw source, cleans it and writes its checkpoint.
#[derive(Args, Debug)]
pub struct CleanCommand {
    #[arg(value_name = "health|environment|burden", help = "Source to clean")]
    source: Source,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for CleanCommand {
    async fn run(&self, config: Config) -> EnvBurdenCliResult<()> {
        info!("Running `clean` subcommand for {}", self.source);
        let envburden = EnvBurden::new_with_config(config)?;
        let sp = start_spinner(self.quiet, &format!("Cleaning {} data", self.source));
        let cleaned = envburden.clean_source(self.source).await;
        stop_spinner(sp);
        let cleaned = cleaned?;
        println!(
            "{} rows written to {}",
            cleaned.height(),
            envburden
                .config
                .processed_dir
                .join(self.source.checkpoint_file())
                .display()
        );
        Ok(())
    }
}

/// The `merge` command joins the three cleaned checkpoints into the canonical dataset.
#[derive(Args, Debug)]
pub struct MergeCommand {
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for MergeCommand {
    async fn run(&self, config: Config) -> EnvBurdenCliResult<()> {
        info!("Running `merge` subcommand");
        let envburden = EnvBurden::new_with_config(config)?;
        let sp = start_spinner(self.quiet, "Merging cleaned data");
        let merged = envburden.merge_checkpoints();
        stop_spinner(sp);
        let (_, report) = merged?;
        display_merge_report(&report)?;
        Ok(())
    }
}

/// The `run` command recomputes every checkpoint and the canonical dataset from the raw sources.
#[derive(Args, Debug)]
pub struct RunPipelineCommand {
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for RunPipelineCommand {
    async fn run(&self, config: Config) -> EnvBurdenCliResult<()> {
        info!("Running `run` subcommand");
        let envburden = EnvBurden::new_with_config(config)?;
        let sp = start_spinner(self.quiet, "Cleaning and merging all sources");
        let result = envburden.run().await;
        stop_spinner(sp);
        let (dataset, report) = result?;
        display_merge_report(&report)?;
        println!(
            "Dataset with {} rows written to {}",
            dataset.height(),
            envburden.config.dataset_path.display()
        );
        Ok(())
    }
}

/// The `summary` command prints descriptive statistics of the burden of disease indicators.
#[derive(Args, Debug)]
pub struct SummaryCommand {
    #[arg(
        short = 'i',
        long = "indicator",
        help = "Indicator column to summarise, can be repeated. Defaults to every DALY column."
    )]
    indicators: Vec<String>,
}

impl RunCommand for SummaryCommand {
    async fn run(&self, config: Config) -> EnvBurdenCliResult<()> {
        info!("Running `summary` subcommand");
        let envburden = EnvBurden::new_with_config(config)?;
        let dataset = envburden.load_dataset()?;
        let indicators = if self.indicators.is_empty() {
            daly_indicators(&dataset)
        } else {
            self.indicators.clone()
        };
        let summary = summary_statistics(&dataset, &indicators)?;
        display_summary(&summary)?;
        Ok(())
    }
}

/// The `dashboard` command prints the data behind each dashboard chart for a selection.
#[derive(Args, Debug)]
pub struct DashboardCommand {
    #[arg(short = 'c', long, help = "Country to display")]
    country: String,
    #[arg(short = 'y', long, help = "Year to display")]
    year: i64,
    #[arg(
        short = 'i',
        long,
        help = "Indicator for the map and the trend, as a column or display name. Defaults to the \
                first indicator."
    )]
    indicator: Option<String>,
}

impl DashboardCommand {
    fn indicator(&self, display: &DisplayDataset) -> Option<String> {
        self.indicator
            .as_deref()
            .map(|name| display_name(name).to_string())
            .or_else(|| display.indicators.first().cloned())
    }
}

impl RunCommand for DashboardCommand {
    async fn run(&self, config: Config) -> EnvBurdenCliResult<()> {
        info!("Running `dashboard` subcommand");
        let envburden = EnvBurden::new_with_config(config)?;
        let display = build_dashboard_dataset(&envburden.load_dataset()?)?;
        if !display.countries.contains(&self.country) {
            return Err(EnvBurdenCliError::UnknownCountry(self.country.clone()));
        }
        debug!("Available years: {:?}", display.years);

        display_frame(
            &format!("Expenditures (% GDP) in {} for {}", self.year, self.country),
            &display.expenditure_composition(&self.country, self.year)?,
        )?;
        display_frame(
            &format!("Correlation of DALY indicators for {}", self.country),
            &display.expense_correlations(&self.country, &display.indicators)?,
        )?;
        if let Some(indicator) = self.indicator(&display) {
            display_frame(
                &format!("Global variation of {indicator} DALYs in {}", self.year),
                &display.indicator_map(self.year, &indicator)?,
            )?;
            display_frame(
                &format!("Annual variation of {indicator} DALYs for {}", self.country),
                &display.indicator_trend(&self.country, &indicator)?,
            )?;
        }
        Ok(())
    }
}

/// The entrypoint for the CLI.
#[derive(Parser, Debug)]
#[command(version, about="Clean and merge environmental burden of disease statistics", long_about = None, name="envburden")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
    #[arg(
        long,
        help = "Configuration file (defaults to envburden/config.toml in the user config folder)",
        global = true
    )]
    pub config: Option<PathBuf>,
    #[arg(
        long,
        help = "Folder the relative data paths of the configuration are resolved against",
        global = true
    )]
    pub data_root: Option<PathBuf>,
    #[arg(
        short = 'q',
        long = "quiet",
        help = "\
            Do not print progress spinner to stdout. Results and logs (when `RUST_LOG`\n\
            is set) will still be printed.",
        global = true
    )]
    quiet: bool,
}

/// Commands contains the list of subcommands avaliable for use in the CLI.
/// Each command should implmement the RunCommand trait and specify the list
/// of required args for that command.
#[derive(Subcommand, Debug)]
#[enum_dispatch(RunCommand)]
pub enum Commands {
    /// Load, clean and checkpoint one source
    Clean(CleanCommand),
    /// Merge the cleaned checkpoints into the canonical dataset
    Merge(MergeCommand),
    /// Clean every source and merge them
    Run(RunPipelineCommand),
    /// Summary statistics of the burden of disease indicators
    Summary(SummaryCommand),
    /// Data behind the dashboard charts for a country and year
    Dashboard(DashboardCommand),
}
