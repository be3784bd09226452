use std::collections::HashSet;

/// Longest sheet name Excel accepts, in characters.
pub const MAX_SHEET_NAME_LEN: usize = 31;

const INVALID_CHARS: [char; 7] = [':', '\\', '/', '?', '*', '[', ']'];

/// Tracks the sheet names already present in a workbook and hands out
/// collision-free ones.
///
/// Names compare case-insensitively, matching how Excel resolves them. A
/// taken name gets the first free `_N` suffix with `N` counting from 1; the
/// base is shortened when needed so the result stays within
/// [`MAX_SHEET_NAME_LEN`] characters.
#[derive(Debug, Default, Clone)]
pub struct SheetNameRegistry {
    used: HashSet<String>,
}

impl SheetNameRegistry {
    /// Marks a name as taken without checking for collisions.
    pub fn claim(&mut self, name: &str) {
        self.used.insert(fold(name));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.used.contains(&fold(name))
    }

    /// Returns a name derived from `raw` that is not yet taken and records it.
    pub fn assign(&mut self, raw: &str) -> String {
        let name = unique_sheet_name(&self.used, raw);
        self.used.insert(fold(&name));
        name
    }
}

/// Pure collision policy: picks the name `raw` should take given the
/// case-folded set of names already in use.
pub fn unique_sheet_name(used: &HashSet<String>, raw: &str) -> String {
    let base = sanitize_sheet_name(raw);
    if !used.contains(&fold(&base)) {
        return base;
    }

    let mut counter: usize = 1;
    loop {
        let suffix = format!("_{counter}");
        let max_len = MAX_SHEET_NAME_LEN - suffix.chars().count();
        let prefix: String = base.chars().take(max_len).collect();
        let candidate = format!("{prefix}{suffix}");
        if !used.contains(&fold(&candidate)) {
            return candidate;
        }
        counter += 1;
    }
}

/// Replaces characters Excel forbids in sheet names and enforces the length
/// limit.
pub fn sanitize_sheet_name(raw: &str) -> String {
    let sanitized: String = raw
        .chars()
        .map(|ch| {
            if INVALID_CHARS.contains(&ch) || ch.is_control() {
                '_'
            } else {
                ch
            }
        })
        .collect();

    let sanitized = sanitized.trim().trim_matches('\'').trim();
    let sanitized = if sanitized.is_empty() {
        "Sheet"
    } else {
        sanitized
    };

    sanitized.chars().take(MAX_SHEET_NAME_LEN).collect()
}

/// Whether `name` can be used verbatim as a sheet name.
pub fn is_valid_sheet_name(name: &str) -> bool {
    !name.trim().is_empty() && sanitize_sheet_name(name) == name
}

fn fold(name: &str) -> String {
    name.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_name_is_kept() {
        let mut registry = SheetNameRegistry::default();
        assert_eq!(registry.assign("Sales"), "Sales");
    }

    #[test]
    fn collisions_take_first_free_suffix() {
        let mut registry = SheetNameRegistry::default();
        assert_eq!(registry.assign("Sales"), "Sales");
        assert_eq!(registry.assign("Sales"), "Sales_1");
        assert_eq!(registry.assign("SALES"), "SALES_2");
        registry.claim("Sales_4");
        assert_eq!(registry.assign("Sales"), "Sales_3");
        assert_eq!(registry.assign("Sales"), "Sales_5");
    }

    #[test]
    fn long_multibyte_names_are_truncated_on_char_boundaries() {
        let mut registry = SheetNameRegistry::default();
        let long = "业绩考核明细".repeat(8);
        let first = registry.assign(&long);
        assert_eq!(first.chars().count(), MAX_SHEET_NAME_LEN);
        let second = registry.assign(&long);
        assert_eq!(second.chars().count(), MAX_SHEET_NAME_LEN);
        assert!(second.ends_with("_1"));
        assert_ne!(first, second);
    }

    #[test]
    fn invalid_characters_are_replaced() {
        assert_eq!(sanitize_sheet_name("Q1/Q2 [draft]"), "Q1_Q2 _draft_");
        assert_eq!(sanitize_sheet_name("  "), "Sheet");
        assert_eq!(sanitize_sheet_name("'quoted'"), "quoted");
        assert!(is_valid_sheet_name("总表"));
        assert!(!is_valid_sheet_name("a:b"));
        assert!(!is_valid_sheet_name(""));
    }

    #[test]
    fn policy_is_deterministic() {
        let used: HashSet<String> = ["data".to_string(), "data_1".to_string()].into();
        assert_eq!(unique_sheet_name(&used, "Data"), "Data_2");
        assert_eq!(unique_sheet_name(&used, "Data"), "Data_2");
    }
}
