use std::path::PathBuf;

use aideon_consolidate::{
    ConsolidateError, ConsolidateOptions, HeaderPolicy, LegacyMode, Result, consolidate,
};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose)?;

    let options = cli.options()?;
    let report = consolidate(&options)?;

    println!(
        "merged {} of {} workbooks into {} ({} sheets, {} summary rows)",
        report.processed.len(),
        report.discovered,
        report.output.display(),
        report.sheets.len(),
        report.summary_rows
    );
    for skipped in &report.skipped {
        println!(
            "skipped {} at {}: {}",
            skipped.path.display(),
            skipped.stage,
            skipped.reason
        );
    }

    if let Some(path) = &cli.report {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
    }
    Ok(())
}

fn init_logging(verbose: u8) -> Result<()> {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| ConsolidateError::Logging(error.to_string()))
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Merge every workbook in a directory into one consolidated workbook."
)]
struct Cli {
    /// Directory holding the source workbooks.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Destination workbook.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Name of the sheet aggregated across files.
    #[arg(long)]
    summary_sheet: Option<String>,

    /// How legacy .xls workbooks are handled.
    #[arg(long, value_enum)]
    legacy: Option<LegacyArg>,

    /// LibreOffice executable used for legacy conversion.
    #[arg(long)]
    soffice: Option<PathBuf>,

    /// Seconds allowed for one legacy conversion.
    #[arg(long)]
    timeout: Option<u64>,

    /// Ingestion workers; 0 uses every available core.
    #[arg(long)]
    jobs: Option<usize>,

    /// Handling of summary sheets whose header differs from the first one.
    #[arg(long, value_enum)]
    header_policy: Option<HeaderPolicyArg>,

    /// Directory for temporary files (normalized legacy copies).
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// JSON options file; flags given on the command line take precedence.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a JSON run report to this path.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Raise log verbosity (-v debug, -vv trace) unless RUST_LOG is set.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn options(&self) -> Result<ConsolidateOptions> {
        let mut options = match &self.config {
            Some(path) => {
                if !path.exists() {
                    return Err(ConsolidateError::MissingInput(path.clone()));
                }
                ConsolidateOptions::from_json_file(path)?
            }
            None => ConsolidateOptions::default(),
        };

        if let Some(input) = &self.input {
            options.input_dir = input.clone();
        }
        if let Some(output) = &self.output {
            options.output = output.clone();
        }
        if let Some(name) = &self.summary_sheet {
            options.summary_sheet = name.clone();
        }
        if let Some(legacy) = self.legacy {
            options.legacy = legacy.into();
        }
        if let Some(program) = &self.soffice {
            options.soffice_program = program.clone();
        }
        if let Some(timeout) = self.timeout {
            options.conversion_timeout_secs = timeout;
        }
        if let Some(jobs) = self.jobs {
            options.jobs = jobs;
        }
        if let Some(work_dir) = &self.work_dir {
            options.work_dir = Some(work_dir.clone());
        }
        if let Some(policy) = self.header_policy {
            options.header_policy = policy.into();
        }
        Ok(options)
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LegacyArg {
    Soffice,
    Disabled,
}

impl From<LegacyArg> for LegacyMode {
    fn from(arg: LegacyArg) -> Self {
        match arg {
            LegacyArg::Soffice => LegacyMode::Soffice,
            LegacyArg::Disabled => LegacyMode::Disabled,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum HeaderPolicyArg {
    Append,
    Strict,
}

impl From<HeaderPolicyArg> for HeaderPolicy {
    fn from(arg: HeaderPolicyArg) -> Self {
        match arg {
            HeaderPolicyArg::Append => HeaderPolicy::Append,
            HeaderPolicyArg::Strict => HeaderPolicy::Strict,
        }
    }
}
