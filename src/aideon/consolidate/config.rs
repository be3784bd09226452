use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::aideon::consolidate::error::{ConsolidateError, Result};
use crate::aideon::consolidate::io::legacy::{DisabledConverter, LegacyConverter, SofficeConverter};
use crate::aideon::consolidate::naming::is_valid_sheet_name;

/// Sheet name that marks a sheet for cross-file aggregation.
pub const DEFAULT_SUMMARY_SHEET: &str = "总表";
/// Directory scanned when no input is given.
pub const DEFAULT_INPUT_DIR: &str = "source/performance";
/// Destination used when no output is given.
pub const DEFAULT_OUTPUT: &str = "output/merged_excel.xlsx";
/// Executable used for legacy conversion by default.
pub const DEFAULT_SOFFICE: &str = "soffice";
/// Per-file limit for one legacy conversion.
pub const DEFAULT_CONVERSION_TIMEOUT_SECS: u64 = 120;

/// How legacy `.xls` workbooks are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegacyMode {
    /// Convert through a headless LibreOffice process.
    #[default]
    Soffice,
    /// Reject legacy workbooks as unsupported.
    Disabled,
}

/// What to do with a summary sheet whose header differs from the canonical
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderPolicy {
    /// Keep the first header, append the rows anyway, and warn.
    #[default]
    Append,
    /// Leave the mismatching sheet's rows out of the summary.
    Strict,
}

/// Options driving one consolidation run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsolidateOptions {
    pub input_dir: PathBuf,
    pub output: PathBuf,
    pub summary_sheet: String,
    pub legacy: LegacyMode,
    pub soffice_program: PathBuf,
    pub conversion_timeout_secs: u64,
    /// Ingestion workers; 0 picks the available parallelism.
    pub jobs: usize,
    pub header_policy: HeaderPolicy,
    /// Parent of the run-scoped temporary directory; the system temporary
    /// directory when unset.
    pub work_dir: Option<PathBuf>,
}

impl Default for ConsolidateOptions {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output: PathBuf::from(DEFAULT_OUTPUT),
            summary_sheet: DEFAULT_SUMMARY_SHEET.to_string(),
            legacy: LegacyMode::default(),
            soffice_program: PathBuf::from(DEFAULT_SOFFICE),
            conversion_timeout_secs: DEFAULT_CONVERSION_TIMEOUT_SECS,
            jobs: 0,
            header_policy: HeaderPolicy::default(),
            work_dir: None,
        }
    }
}

impl ConsolidateOptions {
    /// Loads options from a JSON document; absent fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !is_valid_sheet_name(&self.summary_sheet) {
            return Err(ConsolidateError::Config(format!(
                "'{}' is not a usable sheet name",
                self.summary_sheet
            )));
        }
        if self.conversion_timeout_secs == 0 {
            return Err(ConsolidateError::Config(
                "conversion timeout must be positive".into(),
            ));
        }
        if self.output.as_os_str().is_empty() {
            return Err(ConsolidateError::Config("output path is empty".into()));
        }
        Ok(())
    }

    pub fn conversion_timeout(&self) -> Duration {
        Duration::from_secs(self.conversion_timeout_secs)
    }

    pub fn worker_count(&self) -> usize {
        if self.jobs > 0 {
            return self.jobs;
        }
        std::thread::available_parallelism()
            .map(|count| count.get())
            .unwrap_or(1)
    }

    /// Builds the legacy conversion backend selected by [`Self::legacy`].
    pub fn converter(&self) -> Box<dyn LegacyConverter> {
        match self.legacy {
            LegacyMode::Soffice => Box::new(SofficeConverter::new(
                self.soffice_program.clone(),
                self.conversion_timeout(),
            )),
            LegacyMode::Disabled => Box::new(DisabledConverter),
        }
    }
}
