//! Ordered keyword rule tables driving segmentation and classification.
//!
//! Every table is an ordered list of `keywords -> outcome` rules evaluated
//! top to bottom; the first rule with a matching keyword wins. Matching is a
//! case-insensitive substring test. The whole table can be replaced from JSON
//! so precedence stays auditable outside the code.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::types::{ArgumentType, Framework};
use crate::error::{AppError, AppResult};

/// A single ordered rule: any keyword match yields `outcome`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule<T> {
    pub keywords: Vec<String>,
    pub outcome: T,
}

impl<T> KeywordRule<T> {
    pub fn new(keywords: &[&str], outcome: T) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            outcome,
        }
    }

    /// `lowered` must already be lowercase.
    pub fn matches(&self, lowered: &str) -> bool {
        contains_any(lowered, &self.keywords)
    }
}

/// Strength adjustment applied once when any keyword is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrengthRule {
    pub keywords: Vec<String>,
    pub delta: i32,
}

impl StrengthRule {
    pub fn new(keywords: &[&str], delta: i32) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            delta,
        }
    }
}

/// Complete, externally replaceable rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordRuleTable {
    /// Line prefixes that are structure, not content. Case-sensitive.
    pub structural_markers: Vec<String>,
    /// A colon line containing one of these is never a header.
    pub header_exclusions: Vec<String>,
    /// Headers are strictly shorter than this.
    pub header_max_len: usize,
    /// Arguments are strictly longer than this.
    pub argument_min_len: usize,
    /// Detail lines are strictly longer than this.
    pub detail_min_len: usize,
    /// Lines examined after an argument for detail children.
    pub lookahead: usize,
    /// Header keywords that mark a section as opposing.
    pub opposing_section_keywords: Vec<String>,
    /// Argument type precedence. Unmatched lines are neutral.
    pub type_rules: Vec<KeywordRule<ArgumentType>>,
    /// Framework precedence: ethical lenses, then practical and
    /// stakeholder, then domain lenses.
    pub framework_rules: Vec<KeywordRule<Framework>>,
    pub default_framework: Framework,
    pub base_strength: i32,
    pub strength_rules: Vec<StrengthRule>,
    pub detail_keywords: Vec<String>,
    /// Detail lines with one of these are counterarguments, else evidence.
    pub detail_counter_keywords: Vec<String>,
}

impl Default for KeywordRuleTable {
    fn default() -> Self {
        Self {
            structural_markers: vec!["SUMMARY:".to_string(), "DETAILED ANALYSIS:".to_string()],
            header_exclusions: strings(&["example", "study", "research", "however"]),
            header_max_len: 150,
            argument_min_len: 20,
            detail_min_len: 15,
            lookahead: 2,
            opposing_section_keywords: strings(&["counterarguments", "opposing"]),
            type_rules: vec![
                KeywordRule::new(
                    &["however", "but", "critics", "opposing"],
                    ArgumentType::Counterargument,
                ),
                KeywordRule::new(
                    &["support", "benefit", "advantage", "positive"],
                    ArgumentType::Supporting,
                ),
                KeywordRule::new(
                    &["evidence", "study", "research", "data"],
                    ArgumentType::Evidence,
                ),
            ],
            framework_rules: vec![
                KeywordRule::new(&["utilitarian", "greatest good"], Framework::ConsequenceBased),
                KeywordRule::new(&["deontological", "duty", "rights"], Framework::RuleBased),
                KeywordRule::new(&["virtue", "character"], Framework::CharacterBased),
                KeywordRule::new(&["practical", "implementation"], Framework::Practical),
                KeywordRule::new(&["stakeholder", "impact"], Framework::Stakeholder),
                KeywordRule::new(&["legal", "justice", "law"], Framework::Legal),
                KeywordRule::new(&["emotional", "psychological"], Framework::Emotional),
                KeywordRule::new(&["economic", "financial"], Framework::Economic),
                KeywordRule::new(&["social", "community"], Framework::Social),
                KeywordRule::new(&["individual", "personal"], Framework::Individual),
                KeywordRule::new(&["collective", "public"], Framework::Collective),
            ],
            default_framework: Framework::Contextual,
            base_strength: 3,
            strength_rules: vec![
                StrengthRule::new(&["clearly", "obviously", "undoubtedly", "proven"], 1),
                StrengthRule::new(&["might", "could", "possibly", "perhaps"], -1),
                StrengthRule::new(&["research", "study", "data", "evidence"], 1),
            ],
            detail_keywords: strings(&[
                "example",
                "evidence",
                "study",
                "research",
                "however",
                "but",
                "furthermore",
                "additionally",
            ]),
            detail_counter_keywords: strings(&["however", "but"]),
        }
    }
}

impl KeywordRuleTable {
    /// Parse a table from JSON. Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(json).map(Self::normalized)
    }

    /// Load a table from a JSON file.
    pub fn from_path(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| AppError::Config {
            message: format!("cannot read rule table {}: {}", path.display(), e),
        })?;
        let table = Self::from_json(&raw).map_err(|e| AppError::Config {
            message: format!("invalid rule table {}: {}", path.display(), e),
        })?;
        info!(
            path = %path.display(),
            type_rules = table.type_rules.len(),
            framework_rules = table.framework_rules.len(),
            "Loaded keyword rule table"
        );
        Ok(table)
    }

    /// Lowercase every keyword so matching only lowercases the input.
    /// Structural markers stay case-sensitive.
    pub fn normalized(mut self) -> Self {
        lower_all(&mut self.header_exclusions);
        lower_all(&mut self.opposing_section_keywords);
        lower_all(&mut self.detail_keywords);
        lower_all(&mut self.detail_counter_keywords);
        for rule in &mut self.type_rules {
            lower_all(&mut rule.keywords);
        }
        for rule in &mut self.framework_rules {
            lower_all(&mut rule.keywords);
        }
        for rule in &mut self.strength_rules {
            lower_all(&mut rule.keywords);
        }
        self
    }

    /// First matching outcome of an ordered rule list.
    pub fn first_match<T: Copy>(rules: &[KeywordRule<T>], lowered: &str) -> Option<T> {
        rules
            .iter()
            .find(|rule| rule.matches(lowered))
            .map(|rule| rule.outcome)
    }

    pub fn is_structural_marker(&self, line: &str) -> bool {
        self.structural_markers
            .iter()
            .any(|marker| line.starts_with(marker.as_str()))
    }
}

/// Case-insensitive substring test; `lowered` must already be lowercase.
pub(crate) fn contains_any(lowered: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| lowered.contains(k.as_str()))
}

/// Length in Unicode scalar values.
pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn lower_all(items: &mut [String]) {
    for item in items.iter_mut() {
        *item = item.to_lowercase();
    }
}
