//! Semantic validation of authored configurations.
//!
//! Structural (JSON Schema) validation catches malformed documents before
//! deserialization; this module checks the rules a schema cannot express:
//! referential integrity between questions, transitions, and outcomes, plus
//! authoring hygiene warnings. All findings are collected and returned at
//! once — callers present the complete list, never just the first problem.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::config::Configuration;

/// How severe a validation finding is. Errors block publishing; warnings
/// never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One validation finding, tied to the configuration field it concerns.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
    pub severity: Severity,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// The full result of validating one configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

/// Run all semantic checks against a configuration.
pub fn validate_configuration(config: &Configuration) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if config.initial_questions().next().is_none() {
        errors.push(error(
            "questions",
            "at least one question must be marked as initial",
        ));
    }

    // Duplicate question ids
    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();
    for q in &config.questions {
        if !seen.insert(q.id.as_str()) {
            duplicates.insert(q.id.as_str());
        }
    }
    if !duplicates.is_empty() {
        let ids: Vec<&str> = duplicates.into_iter().collect();
        errors.push(error(
            "questions",
            &format!("duplicate question ids: {}", ids.join(", ")),
        ));
    }

    let known_ids: BTreeSet<&str> = config.questions.iter().map(|q| q.id.as_str()).collect();

    // Choice questions need options
    for q in &config.questions {
        if q.kind.is_choice() && q.options.is_empty() {
            errors.push(error(
                &format!("questions.{}", q.id),
                "choice questions must declare at least one option",
            ));
        }
    }

    // Transition referential integrity
    for t in &config.transitions {
        if !known_ids.contains(t.from_question_id.as_str()) {
            errors.push(error(
                "transitions",
                &format!(
                    "transition '{}' references unknown question '{}'",
                    t.id, t.from_question_id
                ),
            ));
        }
        if t.next_question_ids.is_empty() {
            errors.push(error(
                "transitions",
                &format!("transition '{}' has no next questions", t.id),
            ));
        }
        for next_id in &t.next_question_ids {
            if !known_ids.contains(next_id.as_str()) {
                errors.push(error(
                    "transitions",
                    &format!(
                        "transition '{}' references unknown next question '{}'",
                        t.id, next_id
                    ),
                ));
            }
        }
    }

    // Outcome condition referential integrity
    for outcome in &config.outcomes {
        for cond in &outcome.conditions {
            if !known_ids.contains(cond.question_id.as_str()) {
                errors.push(error(
                    "outcomes",
                    &format!(
                        "outcome '{}' references unknown question '{}'",
                        outcome.id, cond.question_id
                    ),
                ));
            }
        }
    }

    // maxDepth range (advisory bound; see config::Basics)
    if config.basics.max_depth < 1 || config.basics.max_depth > 50 {
        errors.push(error(
            "basics.maxDepth",
            "maxDepth must be between 1 and 50",
        ));
    }

    // Warning: duplicate transition priorities from the same question
    let mut priorities_by_question: BTreeMap<&str, Vec<i32>> = BTreeMap::new();
    for t in &config.transitions {
        priorities_by_question
            .entry(t.from_question_id.as_str())
            .or_default()
            .push(t.priority);
    }
    for (question_id, priorities) in &priorities_by_question {
        let unique: BTreeSet<i32> = priorities.iter().copied().collect();
        if unique.len() < priorities.len() {
            warnings.push(warning(
                "transitions",
                &format!(
                    "question '{}' has transitions with duplicate priorities",
                    question_id
                ),
            ));
        }
    }

    // Warning: more than one default transition from the same question
    let mut defaults_by_question: BTreeMap<&str, usize> = BTreeMap::new();
    for t in config.transitions.iter().filter(|t| t.is_default) {
        *defaults_by_question
            .entry(t.from_question_id.as_str())
            .or_default() += 1;
    }
    for (question_id, count) in &defaults_by_question {
        if *count > 1 {
            warnings.push(warning(
                "transitions",
                &format!(
                    "question '{}' has {} default transitions; only one is used",
                    question_id, count
                ),
            ));
        }
    }

    // Warning: orphan questions, neither initial nor targeted by a transition
    let targeted: BTreeSet<&str> = config
        .transitions
        .iter()
        .flat_map(|t| t.next_question_ids.iter().map(String::as_str))
        .collect();
    for q in &config.questions {
        if !q.is_initial && !targeted.contains(q.id.as_str()) {
            warnings.push(warning(
                "questions",
                &format!(
                    "question '{}' is not initial and is never targeted by a transition",
                    q.id
                ),
            ));
        }
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

fn error(field: &str, message: &str) -> ValidationIssue {
    ValidationIssue {
        field: field.to_string(),
        message: message.to_string(),
        severity: Severity::Error,
    }
}

fn warning(field: &str, message: &str) -> ValidationIssue {
    ValidationIssue {
        field: field.to_string(),
        message: message.to_string(),
        severity: Severity::Warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        Basics, ChoiceOption, Operator, Question, QuestionKind, Transition, ValidationRules,
    };

    fn basics() -> Basics {
        Basics {
            name: "t".to_string(),
            description: None,
            expected_duration_minutes: None,
            allow_backtrack: false,
            max_depth: 10,
            require_answers: false,
        }
    }

    fn question(id: &str, initial: bool) -> Question {
        Question {
            id: id.to_string(),
            text: format!("{}?", id),
            kind: QuestionKind::Text,
            options: Vec::new(),
            validation: ValidationRules::default(),
            is_initial: initial,
        }
    }

    fn transition(id: &str, from: &str, to: &[&str], priority: i32) -> Transition {
        Transition {
            id: id.to_string(),
            from_question_id: from.to_string(),
            operator: Operator::IsNotEmpty,
            comparand: None,
            next_question_ids: to.iter().map(|s| s.to_string()).collect(),
            priority,
            is_default: false,
        }
    }

    #[test]
    fn valid_configuration_passes() {
        let config = Configuration {
            basics: basics(),
            questions: vec![question("a", true), question("b", false)],
            transitions: vec![transition("t1", "a", &["b"], 10)],
            outcomes: Vec::new(),
        };
        let report = validate_configuration(&config);
        assert!(report.valid, "{:?}", report.errors);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn missing_initial_question_is_an_error() {
        let config = Configuration {
            basics: basics(),
            questions: vec![question("a", false)],
            transitions: Vec::new(),
            outcomes: Vec::new(),
        };
        let report = validate_configuration(&config);
        assert!(!report.valid);
        assert!(report
            .errors
            .iter()
            .any(|e| e.message.contains("initial")));
    }

    #[test]
    fn duplicate_ids_and_dangling_references_are_errors() {
        let config = Configuration {
            basics: basics(),
            questions: vec![question("a", true), question("a", false)],
            transitions: vec![transition("t1", "missing", &["also-missing"], 1)],
            outcomes: Vec::new(),
        };
        let report = validate_configuration(&config);
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.message.contains("duplicate")));
        assert!(report
            .errors
            .iter()
            .any(|e| e.message.contains("unknown question 'missing'")));
        assert!(report
            .errors
            .iter()
            .any(|e| e.message.contains("unknown next question 'also-missing'")));
    }

    #[test]
    fn choice_question_without_options_is_an_error() {
        let mut q = question("a", true);
        q.kind = QuestionKind::SingleChoice;
        let config = Configuration {
            basics: basics(),
            questions: vec![q],
            transitions: Vec::new(),
            outcomes: Vec::new(),
        };
        let report = validate_configuration(&config);
        assert!(!report.valid);

        let mut q = question("a", true);
        q.kind = QuestionKind::SingleChoice;
        q.options = vec![ChoiceOption {
            value: "yes".to_string(),
            label: "Yes".to_string(),
        }];
        let config = Configuration {
            basics: basics(),
            questions: vec![q],
            transitions: Vec::new(),
            outcomes: Vec::new(),
        };
        assert!(validate_configuration(&config).valid);
    }

    #[test]
    fn duplicate_priorities_and_orphans_are_warnings_only() {
        let config = Configuration {
            basics: basics(),
            questions: vec![question("a", true), question("b", false), question("c", false)],
            transitions: vec![
                transition("t1", "a", &["b"], 5),
                transition("t2", "a", &["b"], 5),
            ],
            outcomes: Vec::new(),
        };
        let report = validate_configuration(&config);
        assert!(report.valid);
        assert!(report
            .warnings
            .iter()
            .any(|w| w.message.contains("duplicate priorities")));
        assert!(report
            .warnings
            .iter()
            .any(|w| w.message.contains("'c' is not initial")));
    }

    #[test]
    fn max_depth_out_of_range_is_an_error() {
        let mut b = basics();
        b.max_depth = 99;
        let config = Configuration {
            basics: b,
            questions: vec![question("a", true)],
            transitions: Vec::new(),
            outcomes: Vec::new(),
        };
        let report = validate_configuration(&config);
        assert!(!report.valid);
        assert!(report
            .errors
            .iter()
            .any(|e| e.field == "basics.maxDepth"));
    }
}
