use std::fmt;
use std::str::FromStr;

use crate::aideon::consolidate::error::ConsolidateError;

/// Largest 1-based row index a worksheet can address.
pub const MAX_ROW: u32 = 1_048_576;
/// Largest 1-based column index a worksheet can address.
pub const MAX_COLUMN: u32 = 16_384;

/// Converts a 1-based column index into its letter form (`1` → `A`).
pub fn column_letters(column: u32) -> String {
    let mut remaining = column;
    let mut letters = Vec::new();
    while remaining > 0 {
        let digit = ((remaining - 1) % 26) as u8;
        letters.push(char::from(b'A' + digit));
        remaining = (remaining - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Converts column letters into a 1-based index (`AA` → `27`).
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut index: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = (ch.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
        index = index * 26 + digit;
    }
    (index <= MAX_COLUMN).then_some(index)
}

/// Renders a 1-based coordinate in A1 notation.
pub fn cell_name(row: u32, column: u32) -> String {
    format!("{}{}", column_letters(column), row)
}

/// Parses an A1 reference (absolute markers allowed) into a 1-based
/// `(row, column)` pair.
pub fn parse_cell(reference: &str) -> Option<(u32, u32)> {
    let cleaned: String = reference.chars().filter(|ch| *ch != '$').collect();
    let split = cleaned.find(|ch: char| ch.is_ascii_digit())?;
    let (letters, digits) = cleaned.split_at(split);
    let column = column_index(letters)?;
    let row: u32 = digits.parse().ok()?;
    if row == 0 || row > MAX_ROW {
        return None;
    }
    Some((row, column))
}

/// Inclusive rectangular block of cells, 1-based on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRange {
    pub first_row: u32,
    pub first_column: u32,
    pub last_row: u32,
    pub last_column: u32,
}

impl CellRange {
    /// Builds a range, normalising the corners so the first corner is the
    /// top-left one.
    pub fn new(first_row: u32, first_column: u32, last_row: u32, last_column: u32) -> Self {
        Self {
            first_row: first_row.min(last_row),
            first_column: first_column.min(last_column),
            last_row: first_row.max(last_row),
            last_column: first_column.max(last_column),
        }
    }

    pub fn is_single_cell(&self) -> bool {
        self.first_row == self.last_row && self.first_column == self.last_column
    }

    pub fn contains(&self, row: u32, column: u32) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_column..=self.last_column).contains(&column)
    }

    pub fn row_span(&self) -> u32 {
        self.last_row - self.first_row + 1
    }

    pub fn column_span(&self) -> u32 {
        self.last_column - self.first_column + 1
    }
}

impl FromStr for CellRange {
    type Err = ConsolidateError;

    fn from_str(reference: &str) -> Result<Self, Self::Err> {
        let invalid = || ConsolidateError::InvalidReference(reference.to_string());
        let mut parts = reference.trim().split(':');
        let first = parts.next().and_then(parse_cell).ok_or_else(invalid)?;
        let last = match parts.next() {
            Some(part) => parse_cell(part).ok_or_else(invalid)?,
            None => first,
        };
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(CellRange::new(first.0, first.1, last.0, last.1))
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first = cell_name(self.first_row, self.first_column);
        if self.is_single_cell() {
            return write!(f, "{first}");
        }
        write!(
            f,
            "{first}:{}",
            cell_name(self.last_row, self.last_column)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters_follow_bijective_base26() {
        assert_eq!(column_letters(1), "A");
        assert_eq!(column_letters(26), "Z");
        assert_eq!(column_letters(27), "AA");
        assert_eq!(column_letters(702), "ZZ");
        assert_eq!(column_letters(703), "AAA");
        assert_eq!(column_letters(MAX_COLUMN), "XFD");
    }

    #[test]
    fn column_index_inverts_letters() {
        for column in [1, 2, 26, 27, 52, 702, 703, MAX_COLUMN] {
            assert_eq!(column_index(&column_letters(column)), Some(column));
        }
        assert_eq!(column_index("xfd"), Some(MAX_COLUMN));
        assert_eq!(column_index("XFE"), None);
        assert_eq!(column_index("A1"), None);
    }

    #[test]
    fn parse_cell_accepts_absolute_markers() {
        assert_eq!(parse_cell("B3"), Some((3, 2)));
        assert_eq!(parse_cell("$AA$10"), Some((10, 27)));
        assert_eq!(parse_cell("A0"), None);
        assert_eq!(parse_cell("12"), None);
        assert_eq!(parse_cell("B"), None);
    }

    #[test]
    fn range_parses_and_displays() {
        let range: CellRange = "B2:D5".parse().unwrap();
        assert_eq!(range, CellRange::new(2, 2, 5, 4));
        assert_eq!(range.to_string(), "B2:D5");
        assert_eq!(range.row_span(), 4);
        assert_eq!(range.column_span(), 3);
        assert!(range.contains(3, 3));
        assert!(!range.contains(6, 3));

        let single: CellRange = "C7".parse().unwrap();
        assert!(single.is_single_cell());
        assert_eq!(single.to_string(), "C7");
    }

    #[test]
    fn range_normalises_reversed_corners() {
        let range: CellRange = "D5:B2".parse().unwrap();
        assert_eq!(range.to_string(), "B2:D5");
    }

    #[test]
    fn malformed_range_is_rejected() {
        assert!("A1:B2:C3".parse::<CellRange>().is_err());
        assert!("nonsense".parse::<CellRange>().is_err());
    }
}
