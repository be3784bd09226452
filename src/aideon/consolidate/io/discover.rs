use std::fs;
use std::path::Path;

use tracing::debug;

use crate::aideon::consolidate::error::{ConsolidateError, Result};
use crate::aideon::consolidate::model::{SourceFile, SourceFormat};

/// Lists candidate workbooks directly inside `dir`, sorted by file name.
pub fn discover_sources(dir: &Path) -> Result<Vec<SourceFile>> {
    if !dir.is_dir() {
        return Err(ConsolidateError::MissingInput(dir.to_path_buf()));
    }

    let mut sources = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        match SourceFormat::from_path(&path) {
            Some(format) => sources.push(SourceFile::new(path, format)),
            None => debug!(path = %path.display(), "ignoring non-workbook file"),
        }
    }

    if sources.is_empty() {
        return Err(ConsolidateError::NoInputFiles(dir.to_path_buf()));
    }
    sources.sort_by(|lhs, rhs| lhs.path.file_name().cmp(&rhs.path.file_name()));
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_are_filtered_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.xlsx", "a.XLS", "c.xlsm", "notes.txt", "~lock"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("nested.xlsx")).unwrap();

        let sources = discover_sources(dir.path()).unwrap();
        let names: Vec<String> = sources.iter().map(SourceFile::display_name).collect();
        assert_eq!(names, vec!["a.XLS", "b.xlsx", "c.xlsm"]);
        assert_eq!(sources[0].format, SourceFormat::Legacy);
        assert_eq!(sources[1].format, SourceFormat::Modern);
    }

    #[test]
    fn empty_directory_has_no_input() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("readme.md"), b"").unwrap();
        assert!(matches!(
            discover_sources(dir.path()),
            Err(ConsolidateError::NoInputFiles(_))
        ));
    }

    #[test]
    fn missing_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            discover_sources(&dir.path().join("absent")),
            Err(ConsolidateError::MissingInput(_))
        ));
    }
}
