use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::entry::{is_empty_author_entry, AuthorKeys};
use crate::store::RecordStore;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("selected author payload is not valid JSON: {source}")]
    MalformedPayload {
        #[source]
        source: serde_json::Error,
    },
    #[error("field `{field}` is not part of the record")]
    UnknownField { field: String },
    #[error("field `{field}` does not hold a list of author entries")]
    NotAList { field: String },
    #[error("field `{field}` is an empty list; there is no slot to overwrite")]
    EmptyList { field: String },
}

/// Where a selection lands in a list field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotTarget {
    pub index: usize,
    /// False when no empty entry existed and index 0 was chosen anyway.
    pub gap_found: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The whole field value was replaced.
    Replaced,
    /// One element of a list field was overwritten.
    Slot(SlotTarget),
}

/// First empty entry wins. With no empty entry the first slot is reused.
pub fn resolve_target_index(entries: &[Value], keys: &AuthorKeys) -> SlotTarget {
    match entries
        .iter()
        .position(|entry| is_empty_author_entry(entry, keys))
    {
        Some(index) => SlotTarget {
            index,
            gap_found: true,
        },
        None => SlotTarget {
            index: 0,
            gap_found: false,
        },
    }
}

/// Merge a selected author into `store[field_id]`.
///
/// Scalar fields are replaced wholesale. List fields get the payload written
/// over their first empty entry (or entry 0 if none is empty); the list length
/// never changes. On any error the store is left as it was.
pub fn apply_selection(
    store: &mut dyn RecordStore,
    keys: &AuthorKeys,
    field_id: &str,
    is_list_field: bool,
    payload_json: &str,
) -> Result<MergeOutcome, MergeError> {
    let payload: Value = serde_json::from_str(payload_json)
        .map_err(|source| MergeError::MalformedPayload { source })?;

    if field_id.is_empty() || !store.has_field(field_id) {
        return Err(MergeError::UnknownField {
            field: field_id.to_string(),
        });
    }

    if !is_list_field {
        store.set(field_id, payload);
        info!(field = field_id, "replaced author field");
        return Ok(MergeOutcome::Replaced);
    }

    let target = {
        let entries = store
            .get(field_id)
            .and_then(Value::as_array)
            .ok_or_else(|| MergeError::NotAList {
                field: field_id.to_string(),
            })?;
        if entries.is_empty() {
            return Err(MergeError::EmptyList {
                field: field_id.to_string(),
            });
        }
        debug!(field = field_id, len = entries.len(), "scanning for empty author slot");
        resolve_target_index(entries, keys)
    };

    if !target.gap_found {
        warn!(
            field = field_id,
            "no empty author slot; overwriting entry 0"
        );
    }

    if !store.set_index(field_id, target.index, payload) {
        return Err(MergeError::NotAList {
            field: field_id.to_string(),
        });
    }

    info!(field = field_id, index = target.index, "merged author into slot");
    Ok(MergeOutcome::Slot(target))
}
