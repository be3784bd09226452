//! Small helpers shared by the OOXML part readers.

use std::io::{Read, Seek};

use quick_xml::events::BytesStart;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::aideon::consolidate::error::Result;

/// Reads a package part into memory, returning `None` when it is absent.
pub(crate) fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(error) => return Err(error.into()),
    };
    let mut content = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut content)?;
    Ok(Some(content))
}

/// Value of the attribute whose local name is `key`, namespace prefix
/// ignored (`r:id` matches `id`).
pub(crate) fn attr(element: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attribute| attribute.key.local_name().as_ref() == key)
        .and_then(|attribute| attribute.unescape_value().ok())
        .map(|value| value.into_owned())
}

pub(crate) fn attr_u32(element: &BytesStart<'_>, key: &[u8]) -> Option<u32> {
    attr(element, key).and_then(|value| value.trim().parse().ok())
}

pub(crate) fn attr_f64(element: &BytesStart<'_>, key: &[u8]) -> Option<f64> {
    attr(element, key).and_then(|value| value.trim().parse().ok())
}

/// Boolean attribute in the OOXML sense: absent → `default`, `0`/`false`
/// → false, anything else → true.
pub(crate) fn attr_flag(element: &BytesStart<'_>, key: &[u8], default: bool) -> bool {
    match attr(element, key) {
        Some(value) => !matches!(value.as_str(), "0" | "false"),
        None => default,
    }
}

/// Resolves a relationship target against the directory of its source part.
pub(crate) fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_targets_resolve_against_base() {
        assert_eq!(resolve_target("xl", "worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("xl", "/xl/worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
        assert_eq!(resolve_target("xl/worksheets", "../theme/theme1.xml"), "xl/theme/theme1.xml");
        assert_eq!(resolve_target("xl", "./styles.xml"), "xl/styles.xml");
    }

    #[test]
    fn attributes_match_on_local_name() {
        let element = BytesStart::from_content(r#"sheet name="A&amp;B" sheetId="1" r:id="rId3""#, 5);
        assert_eq!(attr(&element, b"name").as_deref(), Some("A&B"));
        assert_eq!(attr(&element, b"id").as_deref(), Some("rId3"));
        assert_eq!(attr_u32(&element, b"sheetId"), Some(1));
        assert!(attr_flag(&element, b"hidden", true));
    }
}
