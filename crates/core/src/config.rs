//! Typed checklist configuration model.
//!
//! A [`Configuration`] is the complete definition of one checklist version:
//! basic metadata, an ordered question list, conditional transitions between
//! questions, and prioritized outcome rules. Published configurations are
//! immutable and content-addressed (see [`crate::checksum`]); edits always
//! produce a new version.
//!
//! Serde field names use camelCase to match the wire format produced by the
//! authoring UI and stored in version records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::AnswerValue;

/// Basic template metadata and authoring-time constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Basics {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Expected duration of one run, in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_duration_minutes: Option<u32>,
    #[serde(default)]
    pub allow_backtrack: bool,
    /// Authoring-time advisory bound on path depth (1-50). The path resolver
    /// terminates by visited-marking regardless of this value; it is only
    /// surfaced by validation, never enforced at runtime.
    pub max_depth: u32,
    #[serde(default)]
    pub require_answers: bool,
}

/// The input kind of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionKind {
    SingleChoice,
    MultiChoice,
    Text,
    Number,
    PhotoUrl,
    Date,
}

impl QuestionKind {
    /// Choice kinds require a non-empty `options` list.
    pub fn is_choice(self) -> bool {
        matches!(self, QuestionKind::SingleChoice | QuestionKind::MultiChoice)
    }
}

/// One selectable option of a choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
}

/// Per-question validation rules checked at finalize time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRules {
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// A single question in the checklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Unique within the configuration.
    pub id: String,
    pub text: String,
    pub kind: QuestionKind,
    /// Present iff `kind` is a choice kind.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ChoiceOption>,
    #[serde(default)]
    pub validation: ValidationRules,
    #[serde(default)]
    pub is_initial: bool,
}

/// Comparison operator used by transitions and outcome conditions.
///
/// `Unknown` captures any operator string this build does not recognize;
/// the condition evaluator treats it as never-matching rather than failing
/// the whole evaluation (conservative fallback).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    Equals,
    NotEquals,
    In,
    Gt,
    Lt,
    Gte,
    Lte,
    IsEmpty,
    IsNotEmpty,
    #[serde(other)]
    Unknown,
}

/// A conditional edge from one question to its successors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub id: String,
    pub from_question_id: String,
    pub operator: Operator,
    /// Absent for IS_EMPTY / IS_NOT_EMPTY and for default transitions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparand: Option<AnswerValue>,
    /// Must be non-empty; every id must reference an existing question.
    pub next_question_ids: Vec<String>,
    /// Higher priority transitions are evaluated first.
    pub priority: i32,
    /// Default transitions apply only when no non-default transition matched.
    #[serde(default)]
    pub is_default: bool,
}

/// One condition of an outcome rule. All conditions of an outcome must hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub question_id: String,
    pub operator: Operator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparand: Option<AnswerValue>,
}

/// The kind of action an outcome triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    Escalate,
    OrderPart,
    ScheduleFollowup,
    Notify,
    Log,
}

/// An action attached to an outcome. The payload is opaque to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeAction {
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub payload: BTreeMap<String, serde_json::Value>,
}

/// A prioritized, condition-gated outcome rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub id: String,
    pub name: String,
    pub priority: i32,
    /// AND-combined. An outcome with zero conditions is vacuously applicable.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub actions: Vec<OutcomeAction>,
}

/// A complete, immutable checklist configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub basics: Basics,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub transitions: Vec<Transition>,
    #[serde(default)]
    pub outcomes: Vec<Outcome>,
}

impl Configuration {
    /// Look up a question by id.
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// All questions marked as initial, in declaration order.
    pub fn initial_questions(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter().filter(|q| q.is_initial)
    }
}
