//! Conversion of legacy binary workbooks into the modern format.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, instrument, warn};

use crate::aideon::consolidate::error::{ConsolidateError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Produces a modern-format copy of a legacy workbook inside `work_dir`.
///
/// Implementations must leave the source untouched and must not leave a
/// partial output behind when they fail. The caller owns `work_dir` and
/// deletes it once the converted copy has been consumed.
pub trait LegacyConverter: Send + Sync {
    fn name(&self) -> &str;

    fn convert(&self, source: &Path, work_dir: &Path) -> Result<PathBuf>;
}

/// Rejects every legacy workbook.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledConverter;

impl LegacyConverter for DisabledConverter {
    fn name(&self) -> &str {
        "disabled"
    }

    fn convert(&self, source: &Path, _work_dir: &Path) -> Result<PathBuf> {
        Err(ConsolidateError::LegacyUnsupported(source.to_path_buf()))
    }
}

/// Converts through a headless LibreOffice process with its own profile.
#[derive(Debug, Clone)]
pub struct SofficeConverter {
    program: PathBuf,
    timeout: Duration,
}

impl SofficeConverter {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn run(&self, source: &Path, out_dir: &Path, profile_dir: &Path) -> Result<PathBuf> {
        let source = fs::canonicalize(source)
            .map_err(|error| ConsolidateError::normalization(source, error))?;
        fs::create_dir_all(out_dir).map_err(|error| ConsolidateError::normalization(&source, error))?;

        let mut child = Command::new(&self.program)
            .arg(format!("-env:UserInstallation={}", file_url(profile_dir)))
            .args(["--headless", "--norestore", "--nologo", "--convert-to", "xlsx", "--outdir"])
            .arg(out_dir)
            .arg(&source)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|error| {
                ConsolidateError::normalization(
                    &source,
                    format!("cannot start {}: {error}", self.program.display()),
                )
            })?;

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            let polled = match child.try_wait() {
                Ok(polled) => polled,
                Err(error) => {
                    terminate(&mut child);
                    return Err(ConsolidateError::normalization(&source, error));
                }
            };
            if let Some(status) = polled {
                break status;
            }
            if Instant::now() >= deadline {
                terminate(&mut child);
                return Err(ConsolidateError::normalization(
                    &source,
                    format!("conversion timed out after {}s", self.timeout.as_secs()),
                ));
            }
            thread::sleep(POLL_INTERVAL);
        };

        if !status.success() {
            return Err(ConsolidateError::normalization(
                &source,
                format!("converter exited with {status}"),
            ));
        }

        let stem = source
            .file_stem()
            .ok_or_else(|| ConsolidateError::normalization(&source, "source has no file name"))?;
        let mut file_name = stem.to_os_string();
        file_name.push(".xlsx");
        let converted = out_dir.join(file_name);
        if !converted.is_file() {
            return Err(ConsolidateError::normalization(
                &source,
                "converter produced no output",
            ));
        }
        Ok(converted)
    }
}

impl LegacyConverter for SofficeConverter {
    fn name(&self) -> &str {
        "soffice"
    }

    #[instrument(level = "debug", skip_all, fields(source = %source.display()))]
    fn convert(&self, source: &Path, work_dir: &Path) -> Result<PathBuf> {
        let out_dir = work_dir.join("out");
        let profile_dir = work_dir.join("profile");
        match self.run(source, &out_dir, &profile_dir) {
            Ok(converted) => {
                debug!(output = %converted.display(), "legacy workbook converted");
                Ok(converted)
            }
            Err(error) => {
                if out_dir.exists() {
                    if let Err(cleanup) = fs::remove_dir_all(&out_dir) {
                        warn!(error = %cleanup, "failed to remove partial conversion output");
                    }
                }
                Err(error)
            }
        }
    }
}

fn terminate(child: &mut Child) {
    if let Err(error) = child.kill() {
        warn!(error = %error, "failed to kill converter");
    }
    let _ = child.wait();
}

fn file_url(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    if text.starts_with('/') {
        format!("file://{text}")
    } else {
        format!("file:///{text}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_converter_reports_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let error = DisabledConverter
            .convert(Path::new("old.xls"), dir.path())
            .unwrap_err();
        assert!(matches!(error, ConsolidateError::LegacyUnsupported(path) if path == Path::new("old.xls")));
    }

    #[test]
    fn missing_program_is_a_normalization_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("old.xls");
        fs::write(&source, b"legacy").unwrap();
        let work_dir = dir.path().join("work");
        let converter = SofficeConverter::new(
            dir.path().join("no-such-soffice"),
            Duration::from_secs(5),
        );
        let error = converter.convert(&source, &work_dir).unwrap_err();
        assert!(matches!(error, ConsolidateError::NormalizationFailure { .. }));
        assert!(!work_dir.join("out").exists());
        assert!(source.exists());
    }

    #[test]
    fn profile_paths_become_file_urls() {
        assert_eq!(file_url(Path::new("/tmp/run/profile")), "file:///tmp/run/profile");
        assert_eq!(file_url(Path::new("C:\\runs\\profile")), "file:///C:/runs/profile");
    }
}
