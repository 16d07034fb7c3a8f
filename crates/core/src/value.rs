//! Standardized answer value representation.
//!
//! Every recorded answer is either a single scalar or an array of scalars.
//! Clients historically submit choice answers in two shapes: a raw scalar
//! (`"rota"`) or a wrapped object (`{"value": "rota"}`). That ambiguity is
//! resolved exactly once, at the boundary, by [`AnswerValue::from_json`];
//! the engine only ever sees this normalized form.

use serde::{Deserialize, Serialize};

/// A single scalar answer component.
///
/// Untagged: deserializes directly from a JSON bool, integer, float, or
/// string. Integer JSON numbers become `Int`, everything else numeric
/// becomes `Float`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ScalarValue {
    /// True for the empty string. Used by the IS_EMPTY operator family.
    pub fn is_empty_text(&self) -> bool {
        matches!(self, ScalarValue::Text(s) if s.is_empty())
    }
}

/// A normalized answer value: one scalar, or an array of scalars
/// (multi-choice answers).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Scalar(ScalarValue),
    Many(Vec<ScalarValue>),
}

impl AnswerValue {
    /// Normalize a raw JSON answer into the canonical representation.
    ///
    /// Accepts scalars, arrays of scalars, and the legacy wrapped shape
    /// `{"value": <scalar-or-array>}` (unwrapped one level). Returns `None`
    /// for `null` and for any shape that is not expressible as
    /// scalar-or-array (nested objects, arrays of arrays).
    pub fn from_json(raw: &serde_json::Value) -> Option<AnswerValue> {
        match raw {
            serde_json::Value::Null => None,
            serde_json::Value::Object(map) => {
                // Legacy choice-answer shape: unwrap the inner value once.
                // A nested object inside the wrapper is still rejected.
                match map.get("value") {
                    Some(serde_json::Value::Object(_)) | Some(serde_json::Value::Null) | None => {
                        None
                    }
                    Some(inner) => AnswerValue::from_json(inner),
                }
            }
            serde_json::Value::Array(items) => {
                let scalars = items
                    .iter()
                    .map(scalar_from_json)
                    .collect::<Option<Vec<_>>>()?;
                Some(AnswerValue::Many(scalars))
            }
            other => scalar_from_json(other).map(AnswerValue::Scalar),
        }
    }

    /// The scalar form of this value, if it is one.
    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            AnswerValue::Scalar(s) => Some(s),
            AnswerValue::Many(_) => None,
        }
    }

    pub fn text(s: impl Into<String>) -> AnswerValue {
        AnswerValue::Scalar(ScalarValue::Text(s.into()))
    }

    pub fn int(n: i64) -> AnswerValue {
        AnswerValue::Scalar(ScalarValue::Int(n))
    }
}

fn scalar_from_json(raw: &serde_json::Value) -> Option<ScalarValue> {
    match raw {
        serde_json::Value::Bool(b) => Some(ScalarValue::Bool(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(ScalarValue::Int(i))
            } else {
                n.as_f64().map(ScalarValue::Float)
            }
        }
        serde_json::Value::String(s) => Some(ScalarValue::Text(s.clone())),
        _ => None,
    }
}
