use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use calamine::{Reader, open_workbook_auto};
use tracing::debug;

use crate::aideon::consolidate::error::{ConsolidateError, Result};

/// Checks that `path` opens as a workbook with at least one sheet.
///
/// Any parse failure, including a panic inside the reader, becomes
/// [`ConsolidateError::InvalidFile`]. The reader handle is dropped before
/// returning on every path.
pub fn validate_workbook(path: &Path) -> Result<()> {
    let opened = panic::catch_unwind(AssertUnwindSafe(|| count_sheets(path)));
    match opened {
        Ok(Ok(0)) => Err(ConsolidateError::invalid_file(path, "workbook has no sheets")),
        Ok(Ok(sheets)) => {
            debug!(path = %path.display(), sheets, "workbook validated");
            Ok(())
        }
        Ok(Err(error)) => Err(ConsolidateError::invalid_file(path, error)),
        Err(_) => Err(ConsolidateError::invalid_file(path, "reader panicked")),
    }
}

/// Boolean form of [`validate_workbook`].
pub fn is_valid_workbook(path: &Path) -> bool {
    validate_workbook(path).is_ok()
}

fn count_sheets(path: &Path) -> std::result::Result<usize, calamine::Error> {
    let workbook = open_workbook_auto(path)?;
    Ok(workbook.sheet_names().len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn garbage_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        fs::write(&path, b"this is not a zip archive").unwrap();
        assert!(!is_valid_workbook(&path));
        assert!(matches!(
            validate_workbook(&path),
            Err(ConsolidateError::InvalidFile { .. })
        ));
    }

    #[test]
    fn missing_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_valid_workbook(&dir.path().join("absent.xlsx")));
    }

    #[test]
    fn written_workbook_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ok.xlsx");
        let mut workbook = rust_xlsxwriter::Workbook::new();
        workbook.add_worksheet().write_string(0, 0, "x").unwrap();
        workbook.save(&path).unwrap();
        assert!(is_valid_workbook(&path));
    }
}
