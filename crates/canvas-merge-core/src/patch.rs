//! Minimal patch interpreter: `add`, `replace` and `remove` on an
//! object/array tree addressed by pointer strings.
//!
//! This is deliberately not a general JSON Patch engine. There is no `copy`,
//! `move` or `test`; arrays accept ordinary indices and the `-` marker
//! ("after the last element" for `add`, "the last element" for `remove`).
//!
//! Patches are applied to a copy. [`apply_patch`] either returns a complete new
//! [`Document`] or an error; the input is never touched and a failing patch
//! list leaves nothing half-applied.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PatchError;
use crate::model::document::Document;
use crate::model::path::{LAST, parse_pointer};

/// One patch operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    Add { path: String, value: Value },
    Replace { path: String, value: Value },
    Remove { path: String },
}

impl PatchOp {
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self::Add {
            path: path.into(),
            value,
        }
    }

    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self::Replace {
            path: path.into(),
            value,
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self::Remove { path: path.into() }
    }

    /// The pointer this operation targets.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Add { path, .. } | Self::Replace { path, .. } | Self::Remove { path } => path,
        }
    }
}

/// Apply `ops` in order to a copy of `document`.
///
/// # Errors
/// Returns the first [`PatchError`] encountered, or [`PatchError::Malformed`]
/// if the patched tree no longer has the document shape.
pub fn apply_patch(document: &Document, ops: &[PatchOp]) -> Result<Document, PatchError> {
    let mut value = serde_json::to_value(document).map_err(|e| PatchError::Malformed {
        message: e.to_string(),
    })?;
    apply_to_value(&mut value, ops)?;
    serde_json::from_value(value).map_err(|e| PatchError::Malformed {
        message: e.to_string(),
    })
}

/// Apply `ops` in order to a raw value tree.
///
/// # Errors
/// Returns the first [`PatchError`] encountered. `value` may be partially
/// patched on error; use [`apply_patch`] for all-or-nothing semantics.
pub fn apply_to_value(value: &mut Value, ops: &[PatchOp]) -> Result<(), PatchError> {
    for op in ops {
        match op {
            PatchOp::Add { path, value: v } => add(value, path, v.clone())?,
            PatchOp::Replace { path, value: v } => replace(value, path, v.clone())?,
            PatchOp::Remove { path } => {
                remove(value, path)?;
            }
        }
    }
    Ok(())
}

/// Read the value at `pointer`, if any.
#[must_use]
pub fn get<'a>(root: &'a Value, pointer: &str) -> Option<&'a Value> {
    let components = parse_pointer(pointer).ok()?;
    components.iter().try_fold(root, |current, key| match current {
        Value::Object(map) => map.get(key),
        Value::Array(arr) => key.parse::<usize>().ok().and_then(|i| arr.get(i)),
        _ => None,
    })
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

fn add(root: &mut Value, pointer: &str, value: Value) -> Result<(), PatchError> {
    if pointer.is_empty() {
        *root = value;
        return Ok(());
    }
    let (parent, key) = split(root, pointer)?;
    match parent {
        Value::Object(map) => {
            map.insert(key, value);
            Ok(())
        }
        Value::Array(arr) => {
            if key == LAST {
                arr.push(value);
                return Ok(());
            }
            let index = parse_index(pointer, &key)?;
            if index > arr.len() {
                return Err(PatchError::IndexOutOfBounds {
                    pointer: pointer.to_owned(),
                    index,
                    len: arr.len(),
                });
            }
            arr.insert(index, value);
            Ok(())
        }
        _ => Err(PatchError::NotAContainer {
            pointer: pointer.to_owned(),
        }),
    }
}

fn replace(root: &mut Value, pointer: &str, value: Value) -> Result<(), PatchError> {
    if pointer.is_empty() {
        *root = value;
        return Ok(());
    }
    let (parent, key) = split(root, pointer)?;
    match parent {
        Value::Object(map) => match map.get_mut(&key) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(PatchError::NotFound {
                pointer: pointer.to_owned(),
            }),
        },
        Value::Array(arr) => {
            let index = parse_index(pointer, &key)?;
            let len = arr.len();
            let slot = arr.get_mut(index).ok_or_else(|| PatchError::IndexOutOfBounds {
                pointer: pointer.to_owned(),
                index,
                len,
            })?;
            *slot = value;
            Ok(())
        }
        _ => Err(PatchError::NotAContainer {
            pointer: pointer.to_owned(),
        }),
    }
}

fn remove(root: &mut Value, pointer: &str) -> Result<Value, PatchError> {
    if pointer.is_empty() {
        return Err(PatchError::RootRemoval);
    }
    let (parent, key) = split(root, pointer)?;
    match parent {
        Value::Object(map) => map.remove(&key).ok_or_else(|| PatchError::NotFound {
            pointer: pointer.to_owned(),
        }),
        Value::Array(arr) => {
            let index = if key == LAST {
                arr.len().checked_sub(1).ok_or_else(|| PatchError::NotFound {
                    pointer: pointer.to_owned(),
                })?
            } else {
                parse_index(pointer, &key)?
            };
            if index >= arr.len() {
                return Err(PatchError::IndexOutOfBounds {
                    pointer: pointer.to_owned(),
                    index,
                    len: arr.len(),
                });
            }
            Ok(arr.remove(index))
        }
        _ => Err(PatchError::NotAContainer {
            pointer: pointer.to_owned(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

/// Resolve the parent container of a non-root `pointer` and return it with
/// the final key.
fn split<'a>(root: &'a mut Value, pointer: &str) -> Result<(&'a mut Value, String), PatchError> {
    let mut components = parse_pointer(pointer)?;
    let key = components.pop().ok_or_else(|| PatchError::InvalidPointer {
        pointer: pointer.to_owned(),
    })?;
    let mut current = root;
    for component in &components {
        current = match current {
            Value::Object(map) => map.get_mut(component),
            Value::Array(arr) => {
                let index = parse_index(pointer, component)?;
                arr.get_mut(index)
            }
            _ => None,
        }
        .ok_or_else(|| PatchError::NotFound {
            pointer: pointer.to_owned(),
        })?;
    }
    Ok((current, key))
}

fn parse_index(pointer: &str, segment: &str) -> Result<usize, PatchError> {
    // Leading zeros and signs are not indices.
    let valid = !segment.is_empty()
        && segment.bytes().all(|b| b.is_ascii_digit())
        && (segment == "0" || !segment.starts_with('0'));
    if !valid {
        return Err(PatchError::InvalidIndex {
            pointer: pointer.to_owned(),
            segment: segment.to_owned(),
        });
    }
    segment.parse().map_err(|_| PatchError::InvalidIndex {
        pointer: pointer.to_owned(),
        segment: segment.to_owned(),
    })
}
