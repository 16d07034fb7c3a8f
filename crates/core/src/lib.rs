//! checkpath-core: Shared configuration types and validation.
//!
//! Provides the strongly-typed checklist configuration model (questions,
//! transitions, outcomes), the standardized answer value representation,
//! canonical serialization with SHA-256 checksums for published versions,
//! and semantic validation of authored configurations.
//!
//! Structural (JSON Schema) validation of raw configuration documents
//! happens at the system boundary, before a document is deserialized into
//! these types. Everything downstream of this crate assumes a valid,
//! fully-typed [`Configuration`].

pub mod checksum;
pub mod config;
pub mod validate;
pub mod value;

pub use checksum::{canonical_json, configuration_checksum};
pub use config::{
    ActionKind, Basics, ChoiceOption, Condition, Configuration, Operator, Outcome, OutcomeAction,
    Question, QuestionKind, Transition, ValidationRules,
};
pub use validate::{validate_configuration, Severity, ValidationIssue, ValidationReport};
pub use value::{AnswerValue, ScalarValue};
