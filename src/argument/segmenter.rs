//! Splits raw analysis text into ordered lines and spots section headers.

use super::rules::{char_len, contains_any, KeywordRuleTable};

/// What a segmented line is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// Opens a new section; carries the header text without its colon.
    Header { title: String },
    /// Content routed to the currently open section.
    Body,
}

/// A non-empty, trimmed line of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentedLine<'a> {
    pub text: &'a str,
    pub kind: LineKind,
}

impl SegmentedLine<'_> {
    pub fn is_header(&self) -> bool {
        matches!(self.kind, LineKind::Header { .. })
    }
}

/// Line segmentation over a rule table.
pub struct SectionSegmenter<'r> {
    rules: &'r KeywordRuleTable,
}

impl<'r> SectionSegmenter<'r> {
    pub fn new(rules: &'r KeywordRuleTable) -> Self {
        Self { rules }
    }

    /// Non-empty trimmed lines in order, structural markers removed.
    pub fn segment<'a>(&self, text: &'a str) -> Vec<SegmentedLine<'a>> {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter(|line| !self.rules.is_structural_marker(line))
            .map(|line| SegmentedLine {
                text: line,
                kind: match self.header_title(line) {
                    Some(title) => LineKind::Header { title },
                    None => LineKind::Body,
                },
            })
            .collect()
    }

    /// Header text if `line` is a header candidate.
    pub fn header_title(&self, line: &str) -> Option<String> {
        if !line.contains(':') || char_len(line) >= self.rules.header_max_len {
            return None;
        }
        if contains_any(&line.to_lowercase(), &self.rules.header_exclusions) {
            return None;
        }
        Some(line.replacen(':', "", 1).trim().to_string())
    }
}
