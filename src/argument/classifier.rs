//! Keyword classification of section headers, argument lines and details.

use super::rules::{char_len, contains_any, KeywordRuleTable};
use super::types::{ArgumentType, Framework, Strength};

/// Outcome of classifying an argument line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kind: ArgumentType,
    pub framework: Framework,
    pub strength: Strength,
}

/// Applies a [`KeywordRuleTable`] to individual lines.
pub struct ArgumentClassifier<'r> {
    rules: &'r KeywordRuleTable,
}

impl<'r> ArgumentClassifier<'r> {
    pub fn new(rules: &'r KeywordRuleTable) -> Self {
        Self { rules }
    }

    /// Framework attributed to a section header.
    pub fn framework_for_header(&self, title: &str) -> Framework {
        KeywordRuleTable::first_match(&self.rules.framework_rules, &title.to_lowercase())
            .unwrap_or(self.rules.default_framework)
    }

    /// Sections named after counterarguments or opposing views are opposing.
    pub fn section_type(&self, title: &str) -> ArgumentType {
        if contains_any(&title.to_lowercase(), &self.rules.opposing_section_keywords) {
            ArgumentType::Opposing
        } else {
            ArgumentType::Neutral
        }
    }

    /// Only lines long enough become argument nodes.
    pub fn is_argument(&self, line: &str) -> bool {
        char_len(line) > self.rules.argument_min_len
    }

    pub fn argument_type(&self, line: &str) -> ArgumentType {
        KeywordRuleTable::first_match(&self.rules.type_rules, &line.to_lowercase())
            .unwrap_or(ArgumentType::Neutral)
    }

    /// Base strength plus every matching adjustment, clamped to `1..=5`.
    pub fn strength(&self, line: &str) -> Strength {
        let lowered = line.to_lowercase();
        let score = self
            .rules
            .strength_rules
            .iter()
            .filter(|rule| contains_any(&lowered, &rule.keywords))
            .fold(self.rules.base_strength, |acc, rule| acc + rule.delta);
        Strength::clamped(score)
    }

    pub fn classify(&self, line: &str, section_framework: Framework) -> Classification {
        Classification {
            kind: self.argument_type(line),
            framework: section_framework,
            strength: self.strength(line),
        }
    }

    /// Type of a look-ahead line if it qualifies as a detail child.
    pub fn detail_type(&self, line: &str) -> Option<ArgumentType> {
        if char_len(line) <= self.rules.detail_min_len {
            return None;
        }
        let lowered = line.to_lowercase();
        if !contains_any(&lowered, &self.rules.detail_keywords) {
            return None;
        }
        if contains_any(&lowered, &self.rules.detail_counter_keywords) {
            Some(ArgumentType::Counterargument)
        } else {
            Some(ArgumentType::Evidence)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_classifier<T>(f: impl FnOnce(&ArgumentClassifier<'_>) -> T) -> T {
        let rules = KeywordRuleTable::default();
        f(&ArgumentClassifier::new(&rules))
    }

    #[test]
    fn test_framework_mapping() {
        with_classifier(|c| {
            assert_eq!(
                c.framework_for_header("Utilitarian Analysis"),
                Framework::ConsequenceBased
            );
            assert_eq!(
                c.framework_for_header("Duty of Care"),
                Framework::RuleBased
            );
            assert_eq!(
                c.framework_for_header("Virtue and Integrity"),
                Framework::CharacterBased
            );
            assert_eq!(
                c.framework_for_header("Stakeholder Impact Analysis"),
                Framework::Stakeholder
            );
            assert_eq!(
                c.framework_for_header("Economic Perspective"),
                Framework::Economic
            );
            assert_eq!(
                c.framework_for_header("Public Health"),
                Framework::Collective
            );
            assert_eq!(c.framework_for_header("Synthesis"), Framework::Contextual);
        });
    }

    #[test]
    fn test_framework_first_match_wins_across_families() {
        with_classifier(|c| {
            // "rights" (rule-based) precedes "individual" and "collective"
            assert_eq!(
                c.framework_for_header("Individual Rights vs Collective Good"),
                Framework::RuleBased
            );
            // "practical" precedes nothing earlier
            assert_eq!(
                c.framework_for_header("Practical Implementation vs Idealistic Goals"),
                Framework::Practical
            );
        });
    }

    #[test]
    fn test_section_type() {
        with_classifier(|c| {
            assert_eq!(
                c.section_type("Critical Counterarguments"),
                ArgumentType::Opposing
            );
            assert_eq!(c.section_type("Opposing Views"), ArgumentType::Opposing);
            assert_eq!(c.section_type("Synthesis"), ArgumentType::Neutral);
        });
    }

    #[test]
    fn test_argument_length_threshold() {
        with_classifier(|c| {
            assert!(!c.is_argument("exactly twenty chars"));
            assert!(c.is_argument("twenty-one characters"));
        });
    }

    #[test]
    fn test_argument_type_precedence() {
        with_classifier(|c| {
            assert_eq!(
                c.argument_type("Critics say the benefit is overstated"),
                ArgumentType::Counterargument
            );
            assert_eq!(
                c.argument_type("This has a clear advantage for patients"),
                ArgumentType::Supporting
            );
            assert_eq!(
                c.argument_type("Recent data shows a decline"),
                ArgumentType::Evidence
            );
            assert_eq!(
                c.argument_type("Patients deserve careful treatment"),
                ArgumentType::Neutral
            );
        });
    }

    #[test]
    fn test_strength_adjustments() {
        with_classifier(|c| {
            assert_eq!(c.strength("A plain statement of fact").get(), 3);
            assert_eq!(c.strength("This is clearly right").get(), 4);
            assert_eq!(c.strength("This might be right").get(), 2);
            assert_eq!(c.strength("Research clearly shows it").get(), 5);
            assert_eq!(c.strength("Research might show it").get(), 3);
        });
    }

    #[test]
    fn test_strength_clamped_with_custom_deltas() {
        let mut rules = KeywordRuleTable::default();
        rules.strength_rules[1].delta = -10;
        let c = ArgumentClassifier::new(&rules);
        assert_eq!(c.strength("perhaps not").get(), 1);
    }

    #[test]
    fn test_detail_type() {
        with_classifier(|c| {
            assert_eq!(
                c.detail_type("For example, hospitals in Norway"),
                Some(ArgumentType::Evidence)
            );
            assert_eq!(
                c.detail_type("However critics argue it ignores rights."),
                Some(ArgumentType::Counterargument)
            );
            // no detail keyword
            assert_eq!(c.detail_type("Patients deserve careful treatment"), None);
            // too short even with a keyword
            assert_eq!(c.detail_type("but not always"), None);
        });
    }

    #[test]
    fn test_classify_inherits_section_framework() {
        with_classifier(|c| {
            let result = c.classify(
                "This clearly benefits society overall",
                Framework::ConsequenceBased,
            );
            assert_eq!(result.kind, ArgumentType::Supporting);
            assert_eq!(result.framework, Framework::ConsequenceBased);
            assert_eq!(result.strength.get(), 4);
        });
    }
}
