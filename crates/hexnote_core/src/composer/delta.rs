//! Editor change batch interpretation.
//!
//! An editor change event carries a short batch of sub-operations. The
//! interpreter folds a batch into one `EditStep` by taking the first
//! occurrence of each sub-operation kind. It keeps no state between calls and
//! never fails: empty or malformed batches become the default no-op step.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One editor sub-operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditOp {
    Insert(String),
    Retain(usize),
    Delete(usize),
}

/// Normalized description of one editor change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditStep {
    /// Inserted text, empty when nothing was inserted.
    pub inserted_text: String,
    /// Cursor offset before this step.
    pub retain_position: usize,
    pub deleted_count: usize,
}

impl EditStep {
    pub fn is_noop(&self) -> bool {
        self.inserted_text.is_empty() && self.deleted_count == 0
    }
}

/// Folds a batch of typed sub-operations into one step.
pub fn interpret_ops(ops: &[EditOp]) -> EditStep {
    let mut inserted_text = None;
    let mut retain_position = None;
    let mut deleted_count = None;

    for op in ops {
        match op {
            EditOp::Insert(text) => {
                inserted_text.get_or_insert_with(|| text.clone());
            }
            EditOp::Retain(count) => {
                retain_position.get_or_insert(*count);
            }
            EditOp::Delete(count) => {
                deleted_count.get_or_insert(*count);
            }
        }
    }

    EditStep {
        inserted_text: inserted_text.unwrap_or_default(),
        retain_position: retain_position.unwrap_or_default(),
        deleted_count: deleted_count.unwrap_or_default(),
    }
}

/// Folds a raw editor change payload (`{"ops": [...]}`) into one step.
///
/// Op objects may carry extra keys such as `attributes`. Embed inserts
/// (non-string `insert` values) and ops that cannot be read are skipped.
pub fn interpret_delta_value(delta: &Value) -> EditStep {
    let ops = delta
        .get("ops")
        .and_then(Value::as_array)
        .map(|raw_ops| raw_ops.iter().filter_map(parse_op).collect::<Vec<_>>())
        .unwrap_or_default();
    interpret_ops(&ops)
}

fn parse_op(raw: &Value) -> Option<EditOp> {
    let object = raw.as_object()?;
    if let Some(insert) = object.get("insert") {
        return insert.as_str().map(|text| EditOp::Insert(text.to_string()));
    }
    if let Some(retain) = object.get("retain") {
        return as_count(retain).map(EditOp::Retain);
    }
    if let Some(delete) = object.get("delete") {
        return as_count(delete).map(EditOp::Delete);
    }
    None
}

fn as_count(value: &Value) -> Option<usize> {
    value.as_u64().and_then(|count| usize::try_from(count).ok())
}
