//! Structural diff and JSON Patch (RFC 6902) operations over `serde_json::Value`.
//!
//! [`diff`] produces the patch set that turns one document into another by
//! recursive comparison: objects are compared key by key, arrays position by
//! position, and anything else by equality. Upserts send exactly the patch set
//! [`diff`] emits, in its order. [`apply`] replays a patch set on a copy of a
//! document through `json_patch`. Neither function touches its inputs.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LdError, Result};

/// A single JSON Patch operation. Serializes as `{"op": "...", "path": "...", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    Add { path: String, value: Value },
    Remove { path: String },
    Replace { path: String, value: Value },
    Move { from: String, path: String },
    Copy { from: String, path: String },
    Test { path: String, value: Value },
}

impl PatchOperation {
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self::Add {
            path: path.into(),
            value,
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self::Remove { path: path.into() }
    }

    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self::Replace {
            path: path.into(),
            value,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Add { path, .. }
            | Self::Remove { path }
            | Self::Replace { path, .. }
            | Self::Move { path, .. }
            | Self::Copy { path, .. }
            | Self::Test { path, .. } => path,
        }
    }

    /// Re-root the operation under `prefix`, e.g. `/on` -> `/environments/prod/on`.
    pub fn with_path_prefix(self, prefix: &str) -> Self {
        let join = |p: String| format!("{}{}", prefix, p);
        match self {
            Self::Add { path, value } => Self::Add {
                path: join(path),
                value,
            },
            Self::Remove { path } => Self::Remove { path: join(path) },
            Self::Replace { path, value } => Self::Replace {
                path: join(path),
                value,
            },
            Self::Move { from, path } => Self::Move {
                from: join(from),
                path: join(path),
            },
            Self::Copy { from, path } => Self::Copy {
                from: join(from),
                path: join(path),
            },
            Self::Test { path, value } => Self::Test {
                path: join(path),
                value,
            },
        }
    }
}

/// Escape an object key as a JSON Pointer reference token.
pub fn escape_token(token: &str) -> Cow<'_, str> {
    if token.contains(['~', '/']) {
        Cow::Owned(token.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(token)
    }
}

/// Compute the patch set that transforms `current` into `desired`.
///
/// Identical inputs yield an empty patch set.
pub fn diff(current: &Value, desired: &Value) -> Vec<PatchOperation> {
    let mut ops = Vec::new();
    diff_values(current, desired, "", &mut ops);
    ops
}

fn diff_values(current: &Value, desired: &Value, path: &str, ops: &mut Vec<PatchOperation>) {
    match (current, desired) {
        (Value::Object(cur), Value::Object(des)) => {
            // Existing keys last-to-first, then keys only present in `desired`.
            for (key, cur_val) in cur.iter().rev() {
                let child = format!("{}/{}", path, escape_token(key));
                match des.get(key) {
                    Some(des_val) => diff_values(cur_val, des_val, &child, ops),
                    None => ops.push(PatchOperation::remove(child)),
                }
            }
            for (key, des_val) in des {
                if !cur.contains_key(key) {
                    let child = format!("{}/{}", path, escape_token(key));
                    ops.push(PatchOperation::add(child, des_val.clone()));
                }
            }
        }
        (Value::Array(cur), Value::Array(des)) => {
            // Highest index first so trailing removals never shift a pending index.
            for idx in (0..cur.len()).rev() {
                let child = format!("{}/{}", path, idx);
                match des.get(idx) {
                    Some(des_val) => diff_values(&cur[idx], des_val, &child, ops),
                    None => ops.push(PatchOperation::remove(child)),
                }
            }
            for (idx, des_val) in des.iter().enumerate().skip(cur.len()) {
                ops.push(PatchOperation::add(format!("{}/{}", path, idx), des_val.clone()));
            }
        }
        _ if current == desired => {}
        _ => ops.push(PatchOperation::replace(path, desired.clone())),
    }
}

/// Apply `ops` in order to a copy of `document`. The first operation that
/// cannot be applied fails the whole patch set.
pub fn apply(document: &Value, ops: &[PatchOperation]) -> Result<Value> {
    let mut doc = document.clone();
    for op in ops {
        let rfc_op = to_rfc6902(op)?;
        json_patch::patch(&mut doc, &json_patch::Patch(vec![rfc_op]))
            .map_err(|e| patch_error(op.path(), &e.to_string()))?;
    }
    Ok(doc)
}

fn to_rfc6902(op: &PatchOperation) -> Result<json_patch::PatchOperation> {
    serde_json::from_value(serde_json::to_value(op)?)
        .map_err(|e| patch_error(op.path(), &format!("invalid operation: {}", e)))
}

fn patch_error(path: &str, reason: &str) -> LdError {
    LdError::Patch {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

/// Whether `path` is `prefix` or lies below it, matching whole segments.
pub(crate) fn has_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Keep only operations whose path is, or lies under, one of `prefixes`.
pub fn filter_by_prefix<S: AsRef<str>>(ops: Vec<PatchOperation>, prefixes: &[S]) -> Vec<PatchOperation> {
    ops.into_iter()
        .filter(|op| prefixes.iter().any(|p| has_prefix(op.path(), p.as_ref())))
        .collect()
}

/// Re-root every operation under `prefix`.
pub fn prefix_paths(ops: Vec<PatchOperation>, prefix: &str) -> Vec<PatchOperation> {
    ops.into_iter().map(|op| op.with_path_prefix(prefix)).collect()
}
