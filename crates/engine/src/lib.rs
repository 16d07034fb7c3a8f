//! Checkpath decision engine.
//!
//! Given an immutable checklist configuration and the recorded answers of
//! one execution, the engine:
//!
//! - computes the "visible path" of reachable questions by breadth-first
//!   traversal of conditional transitions ([`path`]),
//! - applies new answers, invalidating answers that fall outside the
//!   recomputed path, with a time-boxed single-use undo
//!   ([`coordinator`], [`ledger`]),
//! - evaluates the prioritized outcome-rule set against final answers
//!   ([`outcome`]).
//!
//! The engine persists nothing itself: all durable state goes through the
//! [`checkpath_storage::CheckpathStorage`] trait, and all computation is
//! deterministic over already-fetched state. Same-execution operations are
//! serialized by per-execution locks inside the coordinator.

pub mod condition;
pub mod coordinator;
pub mod error;
pub mod ledger;
pub mod outcome;
pub mod path;

pub use condition::evaluate;
pub use coordinator::{
    ApplyOutcome, ExecutionCoordinator, FinalizeOutcome, InvalidatedAnswer, VisibleQuestion,
    SNAPSHOT_TTL,
};
pub use error::EngineError;
pub use ledger::AnswerLedger;
pub use outcome::applicable_outcomes;
pub use path::{next_question_ids, resolve_visible_path};
