//! Argument-structure extraction.
//!
//! Turns free-form analysis text into a typed [`ArgumentTree`]:
//! lines are segmented into sections ([`segmenter`]), each body line is
//! classified against a [`KeywordRuleTable`] ([`classifier`]) and the result is
//! assembled in an arena ([`builder`]).
//!
//! Extraction is pure and synchronous. It either yields a complete tree or
//! nothing at all: [`ArgumentExtractor::extract`] returns `None` on any
//! internal error instead of a partially built tree.

mod builder;
mod classifier;
mod rules;
mod segmenter;
mod types;

use std::sync::Arc;

use tracing::{debug, warn};

pub use builder::TreeBuilder;
pub use classifier::{ArgumentClassifier, Classification};
pub use rules::{KeywordRule, KeywordRuleTable, StrengthRule};
pub use segmenter::{LineKind, SectionSegmenter, SegmentedLine};
pub use types::{
    ArgumentNode, ArgumentTree, ArgumentType, Framework, NodeIndex, Strength, ROOT_ID, ROOT_TEXT,
};

use crate::error::ExtractionError;

/// Extracts argument trees using a shared rule table.
#[derive(Debug, Clone, Default)]
pub struct ArgumentExtractor {
    rules: Arc<KeywordRuleTable>,
}

impl ArgumentExtractor {
    pub fn new(rules: KeywordRuleTable) -> Self {
        Self {
            rules: Arc::new(rules),
        }
    }

    pub fn with_shared_rules(rules: Arc<KeywordRuleTable>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &KeywordRuleTable {
        &self.rules
    }

    /// Build a tree, or `None` when the text cannot be parsed.
    pub fn extract(&self, text: &str) -> Option<ArgumentTree> {
        match self.try_extract(text) {
            Ok(tree) => {
                debug!(
                    total_nodes = tree.total_nodes(),
                    max_depth = tree.max_depth(),
                    "Extracted argument tree"
                );
                Some(tree)
            }
            Err(e) => {
                warn!(error = %e, "Argument extraction failed");
                None
            }
        }
    }

    /// Build a tree, surfacing the internal failure.
    pub fn try_extract(&self, text: &str) -> Result<ArgumentTree, ExtractionError> {
        let rules = self.rules.as_ref();
        let segmenter = SectionSegmenter::new(rules);
        let classifier = ArgumentClassifier::new(rules);
        let lines = segmenter.segment(text);

        let mut builder = TreeBuilder::new(ROOT_TEXT);
        let mut section_framework = rules.default_framework;
        let mut i = 0;

        while i < lines.len() {
            let line = &lines[i];
            i += 1;

            if let LineKind::Header { title } = &line.kind {
                section_framework = classifier.framework_for_header(title);
                builder.open_section(title, classifier.section_type(title), section_framework)?;
                continue;
            }

            // Body text before the first header has no section to land in.
            if builder.current_section().is_none() || !classifier.is_argument(line.text) {
                continue;
            }

            let argument =
                builder.push_argument(line.text, classifier.classify(line.text, section_framework))?;

            let window_end = (i + rules.lookahead).min(lines.len());
            while i < window_end {
                match classifier.detail_type(lines[i].text) {
                    Some(kind) => {
                        builder.push_detail(argument, lines[i].text, kind)?;
                        i += 1;
                    }
                    None => break,
                }
            }
        }

        builder.finish()
    }
}

/// Extract with the built-in rule table.
pub fn parse_arguments(text: &str) -> Option<ArgumentTree> {
    ArgumentExtractor::default().extract(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SCENARIO: &str = "Utilitarian Analysis:\nThis clearly benefits society through measurable welfare gains.\nHowever critics argue it ignores individual rights.\n";

    #[test]
    fn test_utilitarian_scenario() {
        let tree = parse_arguments(SCENARIO).unwrap();

        let sections: Vec<&ArgumentNode> = tree.sections().collect();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].text(), "Utilitarian Analysis");
        assert_eq!(sections[0].framework(), Some(Framework::ConsequenceBased));
        assert_eq!(sections[0].kind(), ArgumentType::Neutral);

        let args: Vec<&ArgumentNode> = tree.children_of(sections[0]).collect();
        assert_eq!(args.len(), 1);
        assert_eq!(args[0].kind(), ArgumentType::Supporting);
        assert_eq!(args[0].strength().map(Strength::get), Some(4));

        let details: Vec<&ArgumentNode> = tree.children_of(args[0]).collect();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].kind(), ArgumentType::Counterargument);
        assert_eq!(details[0].level(), 3);

        assert_eq!(tree.total_nodes(), 4);
        assert_eq!(tree.max_depth(), 3);
    }

    #[test]
    fn test_empty_input() {
        let tree = parse_arguments("").unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.total_nodes(), 1);
        assert_eq!(tree.max_depth(), 0);
        assert_eq!(tree.root().text(), ROOT_TEXT);
    }

    #[test]
    fn test_lines_before_first_header_discarded() {
        let text = "An introductory sentence that is long enough.\nLegal View:\nThe statute is quite explicit about this.";
        let tree = parse_arguments(text).unwrap();
        assert_eq!(tree.total_nodes(), 3);
        assert_eq!(tree.find("arg-2").unwrap().framework(), Some(Framework::Legal));
    }

    #[test]
    fn test_lookahead_stops_at_first_non_detail() {
        let text = "Economic Perspective:\n\
            Costs rise sharply for small businesses.\n\
            Patients deserve careful and kind treatment.\n\
            For example, clinics in rural areas closed.";
        let tree = parse_arguments(text).unwrap();
        let section = tree.sections().next().unwrap();
        let args: Vec<&ArgumentNode> = tree.children_of(section).collect();
        assert_eq!(args.len(), 2);
        // the detail line sits two lines after the first argument but the
        // window closed at the plain line in between
        assert!(args[0].children().is_empty());
        assert_eq!(args[1].children().len(), 1);
    }

    #[test]
    fn test_lookahead_consumes_at_most_two_lines() {
        let text = "Social Impact:\n\
            Communities clearly gain from shared spaces.\n\
            For example, parks reduce isolation.\n\
            Furthermore, evidence links them to health.\n\
            Additionally, property values tend to rise.";
        let tree = parse_arguments(text).unwrap();
        let section = tree.sections().next().unwrap();
        let args: Vec<&ArgumentNode> = tree.children_of(section).collect();

        assert_eq!(args.len(), 2);
        assert_eq!(args[0].children().len(), 2);
        assert_eq!(args[1].text(), "Additionally, property values tend to rise.");
    }

    #[test]
    fn test_ids_follow_creation_counter() {
        let text = "Duty Analysis:\nWe must always respect persons as ends.\nFor example, informed consent rules.\nSynthesis:\nBalancing both views is the hardest part.";
        let tree = parse_arguments(text).unwrap();
        let ids: Vec<&str> = tree.iter().map(|n| n.id()).collect();
        assert_eq!(
            ids,
            vec!["root", "section-1", "arg-2", "detail-3", "section-4", "arg-5"]
        );
    }

    #[test]
    fn test_opposing_section_type() {
        let text = "Critical Counterarguments:\nSome argue that the policy backfires badly.";
        let tree = parse_arguments(text).unwrap();
        assert_eq!(
            tree.sections().next().unwrap().kind(),
            ArgumentType::Opposing
        );
    }

    #[test]
    fn test_custom_rules_change_thresholds() {
        let mut rules = KeywordRuleTable::default();
        rules.argument_min_len = 5;
        let extractor = ArgumentExtractor::new(rules);
        let tree = extractor.extract("Legal View:\nShort one").unwrap();
        assert_eq!(tree.total_nodes(), 3);
    }

    #[test]
    fn test_serialized_shape() {
        let tree = parse_arguments(SCENARIO).unwrap();
        let json = serde_json::to_value(&tree).unwrap();

        assert_eq!(json["totalNodes"], 4);
        assert_eq!(json["maxDepth"], 3);
        let root = &json["rootNode"];
        assert_eq!(root["id"], "root");
        assert_eq!(root["type"], "neutral");
        assert!(root.get("parent").is_none());
        assert!(root.get("strength").is_none());

        let section = &root["children"][0];
        assert_eq!(section["parent"], "root");
        assert_eq!(section["framework"], "consequence-based");
        let arg = &section["children"][0];
        assert_eq!(arg["strength"], 4);
        assert_eq!(arg["children"][0]["type"], "counterargument");
    }
}
