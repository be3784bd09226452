use std::collections::HashSet;

use aideon_consolidate::model::{CellRange, cell_name};
use aideon_consolidate::naming::{MAX_SHEET_NAME_LEN, SheetNameRegistry, is_valid_sheet_name};
use proptest::prelude::*;

proptest! {
    #[test]
    fn assigned_names_are_unique_and_usable(raw in prop::collection::vec(".{0,40}", 1..24)) {
        let mut registry = SheetNameRegistry::default();
        let mut seen = HashSet::new();
        for name in &raw {
            let assigned = registry.assign(name);
            prop_assert!(assigned.chars().count() <= MAX_SHEET_NAME_LEN);
            prop_assert!(!assigned.trim().is_empty());
            prop_assert!(!assigned.contains(['[', ']', ':', '*', '?', '/', '\\']));
            prop_assert!(seen.insert(assigned.to_lowercase()), "duplicate {assigned}");
        }
    }

    #[test]
    fn repeated_names_get_increasing_suffixes(base in "[A-Za-z]{1,31}", copies in 2usize..12) {
        let mut registry = SheetNameRegistry::default();
        let first = registry.assign(&base);
        prop_assert_eq!(&first, &base);
        for index in 1..copies {
            let next = registry.assign(&base);
            let suffix = format!("_{index}");
            prop_assert!(next.ends_with(&suffix));
            prop_assert!(next.chars().count() <= MAX_SHEET_NAME_LEN);
        }
    }

    #[test]
    fn valid_names_survive_unchanged(name in "[A-Za-z0-9 _-]{1,31}") {
        prop_assume!(!name.trim().is_empty() && name.trim() == name);
        prop_assert!(is_valid_sheet_name(&name));
        let mut registry = SheetNameRegistry::default();
        prop_assert_eq!(registry.assign(&name), name);
    }

    #[test]
    fn ranges_render_and_parse_back(
        first_row in 1u32..5000,
        first_column in 1u32..800,
        rows in 0u32..50,
        columns in 0u32..50,
    ) {
        let range = CellRange::new(first_row, first_column, first_row + rows, first_column + columns);
        let parsed: CellRange = range.to_string().parse().unwrap();
        prop_assert_eq!(parsed, range);
        prop_assert!(range.contains(first_row + rows, first_column));
        prop_assert!(range.to_string().starts_with(&cell_name(first_row, first_column)));
    }
}
