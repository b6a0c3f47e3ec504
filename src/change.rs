//! Structural change detection between two datafiles.
//!
//! Datafiles are compared by structure, not by identity or serialized text: object keys are
//! unordered, arrays are ordered, numbers compare by numeric value.
use serde_json::{Map, Value};

use crate::{
    logger::{manager_log, ManagerLogger},
    Datafile,
};

/// Nesting depth at which comparison gives up. Matches the recursion limit `serde_json` applies
/// when parsing, so documents that came off the wire never reach it.
pub const MAX_COMPARISON_DEPTH: usize = 128;

/// Comparison could not decide whether two documents are equal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComparisonError {
    /// Documents are nested deeper than [`MAX_COMPARISON_DEPTH`].
    #[error("document nesting exceeds the comparison depth limit")]
    TooDeep,
}

/// Returns `true` if `candidate` must replace `previous`.
///
/// No previous datafile always counts as a change. A comparison that fails counts as a change too:
/// re-creating the engine is preferred over running on a possibly stale one.
pub fn has_changed(
    previous: Option<&Datafile>,
    candidate: &Datafile,
    logger: &ManagerLogger,
) -> bool {
    let Some(previous) = previous else {
        return true;
    };

    if previous.ptr_eq(candidate) {
        return false;
    }

    match structurally_equal(previous.as_value(), candidate.as_value()) {
        Ok(equal) => !equal,
        Err(err) => {
            manager_log!(logger, log::Level::Warn,
                         "unable to compare datafiles, treating as changed: {}", err);
            true
        }
    }
}

/// Deep structural equality over JSON values.
pub fn structurally_equal(a: &Value, b: &Value) -> Result<bool, ComparisonError> {
    equal_at(a, b, 0)
}

fn equal_at(a: &Value, b: &Value, depth: usize) -> Result<bool, ComparisonError> {
    if depth > MAX_COMPARISON_DEPTH {
        return Err(ComparisonError::TooDeep);
    }

    let equal = match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => {
            // Integers compare exactly; mixed integer/float representations fall back to f64.
            match (a.as_i64(), b.as_i64(), a.as_u64(), b.as_u64()) {
                (Some(a), Some(b), _, _) => a == b,
                (_, _, Some(a), Some(b)) => a == b,
                _ => a.as_f64() == b.as_f64(),
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            if a.len() != b.len() {
                return Ok(false);
            }
            for (a, b) in a.iter().zip(b) {
                if !equal_at(a, b, depth + 1)? {
                    return Ok(false);
                }
            }
            true
        }
        (Value::Object(a), Value::Object(b)) => maps_equal(a, b, depth)?,
        _ => false,
    };

    Ok(equal)
}

fn maps_equal(
    a: &Map<String, Value>,
    b: &Map<String, Value>,
    depth: usize,
) -> Result<bool, ComparisonError> {
    if a.len() != b.len() {
        return Ok(false);
    }
    for (key, a) in a {
        let Some(b) = b.get(key) else {
            return Ok(false);
        };
        if !equal_at(a, b, depth + 1)? {
            return Ok(false);
        }
    }
    Ok(true)
}
