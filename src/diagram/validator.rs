//! Structural validation of diagram DSL text.
//!
//! The check is deliberately shallow: a `graph`/`flowchart` header must be
//! present, and text that connects nodes must also define at least one. Edges
//! to undefined identifiers are reported but do not fail validation.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{DiagramError, DiagramResult};

/// Arrow forms, longest first so `-.->` is never read as something shorter.
const ARROWS: [&str; 4] = ["-.->", "-->", "==>", "--x"];

/// Shape-opening delimiters that may follow a node identifier.
const SHAPE_OPENERS: [char; 3] = ['[', '{', '('];

/// Leading keywords of lines that carry no node definitions or edges.
const SKIPPED_KEYWORDS: [&str; 8] = [
    "graph",
    "flowchart",
    "subgraph",
    "end",
    "classDef",
    "class",
    "style",
    "linkStyle",
];

pub const REASON_EMPTY: &str = "diagram is empty";
pub const REASON_NO_HEADER: &str = "missing graph or flowchart header";
pub const REASON_EDGES_ONLY: &str = "connections exist without any node definitions";

/// Result of validating one diagram.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Identifiers that open a definition line.
    pub defined: BTreeSet<char>,
    /// Identifiers adjacent to an arrow.
    pub referenced: BTreeSet<char>,
    /// Referenced but never defined at the start of a line.
    pub undefined_references: Vec<char>,
    /// Trimmed node-definition lines, in order.
    pub definition_lines: Vec<String>,
}

impl ValidationReport {
    fn invalid(reason: &str) -> Self {
        Self {
            valid: false,
            reason: Some(reason.to_string()),
            ..Default::default()
        }
    }

    /// Convert a failed report into [`DiagramError::SyntaxInvalid`].
    pub fn into_result(self) -> DiagramResult<Self> {
        if self.valid {
            Ok(self)
        } else {
            Err(DiagramError::SyntaxInvalid {
                reason: self.reason.unwrap_or_else(|| "unknown".to_string()),
            })
        }
    }

    /// Every identifier the diagram uses, defined or referenced.
    pub fn used_ids(&self) -> BTreeSet<char> {
        self.defined.union(&self.referenced).copied().collect()
    }
}

/// Validate diagram DSL text. Never fails; the verdict is in the report.
pub fn validate(dsl: &str) -> ValidationReport {
    if dsl.trim().is_empty() {
        return ValidationReport::invalid(REASON_EMPTY);
    }

    let has_header = dsl
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .any(|token| token == "graph" || token == "flowchart");
    if !has_header {
        return ValidationReport::invalid(REASON_NO_HEADER);
    }

    let mut report = ValidationReport::default();
    for line in dsl.lines().map(str::trim) {
        if line.is_empty() || line.starts_with("%%") || is_skipped(line) {
            continue;
        }
        if let Some(id) = definition_id(line) {
            report.defined.insert(id);
            report.definition_lines.push(line.to_string());
        }
        collect_references(line, &mut report.referenced);
    }

    if !report.referenced.is_empty() && report.defined.is_empty() {
        let mut failed = ValidationReport::invalid(REASON_EDGES_ONLY);
        failed.referenced = report.referenced;
        return failed;
    }

    report.undefined_references = report
        .referenced
        .difference(&report.defined)
        .copied()
        .collect();
    report.valid = true;
    report
}

fn is_skipped(line: &str) -> bool {
    line.split_whitespace()
        .next()
        .is_some_and(|token| SKIPPED_KEYWORDS.contains(&token))
}

/// `A[...]`, `B{...}`, `C((...))`, `D(...)` at the start of a line.
fn definition_id(line: &str) -> Option<char> {
    let mut chars = line.chars();
    let id = chars.next().filter(char::is_ascii_uppercase)?;
    let opener = chars.next()?;
    SHAPE_OPENERS.contains(&opener).then_some(id)
}

fn collect_references(line: &str, referenced: &mut BTreeSet<char>) {
    let mut offset = 0;
    while offset < line.len() {
        let rest = &line[offset..];
        let Some(arrow) = ARROWS.iter().find(|arrow| rest.starts_with(**arrow)) else {
            offset += rest.chars().next().map_or(1, char::len_utf8);
            continue;
        };
        if let Some(id) = id_before(&line[..offset]) {
            referenced.insert(id);
        }
        let after = offset + arrow.len();
        if let Some(id) = id_after(&line[after..]) {
            referenced.insert(id);
        }
        offset = after;
    }
}

fn id_before(head: &str) -> Option<char> {
    let mut chars = head.trim_end().chars().rev();
    let id = chars.next().filter(char::is_ascii_uppercase)?;
    match chars.next() {
        Some(prev) if prev.is_alphanumeric() || prev == '_' => None,
        _ => Some(id),
    }
}

fn id_after(tail: &str) -> Option<char> {
    let mut tail = tail.trim_start();
    if let Some(labelled) = tail.strip_prefix('|') {
        let close = labelled.find('|')?;
        tail = labelled[close + 1..].trim_start();
    }
    let mut chars = tail.chars();
    let id = chars.next().filter(char::is_ascii_uppercase)?;
    match chars.next() {
        Some(next) if next.is_alphanumeric() || next == '_' => None,
        _ => Some(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"graph TD
    subgraph "Analysis"
        A[Initial Assessment] --> B{Decision}
        B -->|Yes| C((Outcome))
        B -.-> D(Stakeholder)
    end
    C ==> D
    D --x A
    classDef core fill:#fff
    class A core"#;

    #[test]
    fn test_empty_and_whitespace_rejected() {
        assert_eq!(validate("").reason.as_deref(), Some(REASON_EMPTY));
        assert_eq!(validate("   \n\t").reason.as_deref(), Some(REASON_EMPTY));
    }

    #[test]
    fn test_missing_header_is_hard_failure() {
        let report = validate("A[Start]\nA --> B");
        assert!(!report.valid);
        assert_eq!(report.reason.as_deref(), Some(REASON_NO_HEADER));
    }

    #[test]
    fn test_header_must_be_a_token() {
        // "paragraph" contains "graph" but is not a header
        assert!(!validate("paragraph text\nA[Start]").valid);
        assert!(validate("flowchart LR\nA[Start]").valid);
    }

    #[test]
    fn test_edges_without_definitions_fail() {
        let report = validate("graph TD\nA --> B\nB -.-> C");
        assert!(!report.valid);
        assert_eq!(report.reason.as_deref(), Some(REASON_EDGES_ONLY));
        assert_eq!(report.referenced, BTreeSet::from(['A', 'B', 'C']));
    }

    #[test]
    fn test_header_only_is_valid() {
        let report = validate("graph TD");
        assert!(report.valid);
        assert!(report.defined.is_empty());
    }

    #[test]
    fn test_collects_definitions_and_references() {
        let report = validate(SAMPLE);
        assert!(report.valid, "{:?}", report.reason);
        assert_eq!(report.defined, BTreeSet::from(['A', 'B']));
        assert_eq!(report.referenced, BTreeSet::from(['A', 'B', 'C', 'D']));
        assert_eq!(report.undefined_references, vec!['C', 'D']);
        assert_eq!(
            report.definition_lines,
            vec![
                "A[Initial Assessment] --> B{Decision}".to_string(),
                "B -->|Yes| C((Outcome))".to_string(),
            ]
        );
    }

    #[test]
    fn test_arrow_forms() {
        let report = validate("graph TD\nA[a]\nA ==> B\nA --x C\nA -.-> D\nA --> E");
        assert_eq!(
            report.referenced,
            BTreeSet::from(['A', 'B', 'C', 'D', 'E'])
        );
    }

    #[test]
    fn test_multi_letter_words_are_not_ids() {
        let report = validate("graph TD\nA[a]\nStart --> End");
        assert!(report.referenced.is_empty());
    }

    #[test]
    fn test_comment_and_style_lines_ignored() {
        let report = validate("graph TD\n%% A --> B\nA[a]\nstyle A fill:#f9f");
        assert!(report.referenced.is_empty());
        assert_eq!(report.definition_lines, vec!["A[a]".to_string()]);
    }

    #[test]
    fn test_into_result() {
        assert!(validate(SAMPLE).into_result().is_ok());
        let err = validate("no header").into_result().unwrap_err();
        assert!(matches!(err, DiagramError::SyntaxInvalid { .. }));
    }
}
