//! Dot-separated field paths into the content document.
//!
//! A field path such as `services.items.2.title` is the shared address used by
//! template placeholders (`{{services.items.2.title}}`) and by the
//! `data-content` annotations the editor reads back. Segments are walked left
//! to right; a segment made only of ASCII digits indexes a sequence, anything
//! else is a mapping key.
//!
//! ## Sparse sequences
//!
//! [`assign`] creates missing intermediates on the way down. Writing index `i`
//! of a sequence shorter than `i` pads the gap with `null`, up to
//! [`MAX_SEQUENCE_GAP`] padded slots. Larger gaps are rejected so a typo in an
//! annotation (`items.90000.title`) cannot balloon the document.

use serde_json::{Map, Value};
use thiserror::Error;

/// Largest number of `null` slots [`assign`] will insert to reach an index.
pub const MAX_SEQUENCE_GAP: usize = 1024;

#[derive(Error, Debug, PartialEq)]
pub enum PathError {
    #[error("empty field path")]
    Empty,
    #[error("cannot assign '{path}': '{segment}' is inside a {kind}, not a mapping or sequence")]
    NotAContainer {
        path: String,
        segment: String,
        kind: &'static str,
    },
    #[error("cannot assign '{path}': '{segment}' is not a valid sequence index")]
    NotAnIndex { path: String, segment: String },
    #[error("cannot assign '{path}': index {index} is more than {MAX_SEQUENCE_GAP} past the end")]
    GapTooLarge { path: String, index: usize },
}

/// True when the segment addresses a sequence position (`"0"`, `"12"`).
pub fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Resolve `path` against `document`.
///
/// Returns `None` as soon as an intermediate node is absent or cannot be
/// descended into. An explicit `null` at the end of the walk is returned as
/// `Some(Value::Null)`; callers that render treat both the same way.
pub fn resolve<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(document, child)
}

fn child<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) if is_index(segment) => {
            segment.parse::<usize>().ok().and_then(|i| items.get(i))
        }
        _ => None,
    }
}

/// Set the value at `path`, creating containers for missing intermediates.
///
/// The kind of container created for a missing (or `null`) intermediate is
/// chosen by the *next* segment: digits create a sequence, anything else a
/// mapping. On error the document is left exactly as it was.
pub fn assign(document: &mut Value, path: &str, value: Value) -> Result<(), PathError> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }
    let segments: Vec<&str> = path.split('.').collect();
    let Some((leaf, parents)) = segments.split_last() else {
        return Err(PathError::Empty);
    };
    check_walk(document, &segments, path)?;

    let mut current = document;
    for (i, segment) in parents.iter().enumerate() {
        let slot = slot_mut(current, segment, path)?;
        if slot.is_null() {
            *slot = empty_container(segments[i + 1]);
        }
        current = slot;
    }

    *slot_mut(current, leaf, path)? = value;
    Ok(())
}

fn empty_container(next_segment: &str) -> Value {
    if is_index(next_segment) {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

/// Walk `segments` read-only, failing wherever [`assign`] would.
fn check_walk(document: &Value, segments: &[&str], path: &str) -> Result<(), PathError> {
    let empty_sequence = Value::Array(Vec::new());
    let empty_mapping = Value::Object(Map::new());
    let mut current = document;
    for (i, segment) in segments.iter().enumerate() {
        let next = match current {
            Value::Object(map) => map.get(*segment),
            Value::Array(items) => items.get(sequence_index(items.len(), segment, path)?),
            other => return Err(not_a_container(path, segment, other)),
        };
        let Some(following) = segments.get(i + 1) else {
            break;
        };
        current = match next {
            Some(node) if !node.is_null() => node,
            _ if is_index(following) => &empty_sequence,
            _ => &empty_mapping,
        };
    }
    Ok(())
}

/// Position addressed by `segment` in a sequence of `len` items.
fn sequence_index(len: usize, segment: &str, path: &str) -> Result<usize, PathError> {
    let index = segment
        .parse::<usize>()
        .ok()
        .filter(|_| is_index(segment))
        .ok_or_else(|| PathError::NotAnIndex {
            path: path.to_string(),
            segment: segment.to_string(),
        })?;
    if index > len && index - len > MAX_SEQUENCE_GAP {
        return Err(PathError::GapTooLarge {
            path: path.to_string(),
            index,
        });
    }
    Ok(index)
}

fn not_a_container(path: &str, segment: &str, node: &Value) -> PathError {
    PathError::NotAContainer {
        path: path.to_string(),
        segment: segment.to_string(),
        kind: kind_name(node),
    }
}

/// Mutable slot for `segment` inside `node`, inserting `null` where needed.
fn slot_mut<'a>(node: &'a mut Value, segment: &str, path: &str) -> Result<&'a mut Value, PathError> {
    match node {
        Value::Object(map) => Ok(map.entry(segment.to_string()).or_insert(Value::Null)),
        Value::Array(items) => {
            let index = sequence_index(items.len(), segment, path)?;
            if index >= items.len() {
                items.resize(index + 1, Value::Null);
            }
            Ok(&mut items[index])
        }
        other => Err(not_a_container(path, segment, other)),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
