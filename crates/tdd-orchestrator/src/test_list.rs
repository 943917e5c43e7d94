//! Parsing for the `test-list.md` checkbox file (§6 "Test list file").
//!
//! One checkbox per test, `- [ ] desc` / `- [x] desc`; file order is the
//! planner's selection order.

use std::path::Path;

use std::sync::LazyLock;

use regex::Regex;

static CHECKBOX_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*-\s*\[([ xX])\]\s*(.+)$").expect("CHECKBOX_LINE regex should compile"));

/// A single parsed checkbox entry, preserving file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestListEntry {
    pub description: String,
    pub checked: bool,
}

/// Parse every checkbox line in `content`, in file order.
pub fn parse(content: &str) -> Vec<TestListEntry> {
    content
        .lines()
        .filter_map(|line| {
            let caps = CHECKBOX_LINE.captures(line)?;
            Some(TestListEntry {
                checked: caps.get(1).unwrap().as_str().eq_ignore_ascii_case("x"),
                description: caps.get(2).unwrap().as_str().trim().to_string(),
            })
        })
        .collect()
}

/// Read and parse `test-list.md` at `project_root`, if present. Missing file
/// yields no entries (a fresh project with no test list yet).
pub fn read(project_root: &Path) -> Vec<TestListEntry> {
    match std::fs::read_to_string(project_root.join("test-list.md")) {
        Ok(content) => parse(&content),
        Err(_) => Vec::new(),
    }
}

/// Descriptions of entries not yet checked, in file order.
pub fn pending(entries: &[TestListEntry]) -> Vec<String> {
    entries.iter().filter(|e| !e.checked).map(|e| e.description.clone()).collect()
}

/// Descriptions of entries already checked, in file order.
pub fn completed(entries: &[TestListEntry]) -> Vec<String> {
    entries.iter().filter(|e| e.checked).map(|e| e.description.clone()).collect()
}

/// True if the file has at least one entry and every entry is checked.
pub fn all_checked(entries: &[TestListEntry]) -> bool {
    !entries.is_empty() && entries.iter().all(|e| e.checked)
}
