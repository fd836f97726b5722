//! Record classification
//!
//! Maps a raw change record to the semantic operation it represents.
//! Moves are further split into renames (only the leaf name changed) and
//! relocations (any directory in the chain changed).

use crate::record::{join_segments, ChangeType, RawChangeRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Semantic meaning of a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Entry was created
    Create,
    /// Entry was removed
    Remove,
    /// Entry was modified in place
    Modify,
    /// Entry was relocated
    Move,
    /// Entry kept its directory but changed its name
    Rename,
}

impl Operation {
    /// Whether entries with this operation carry a `from` path
    pub fn has_source(self) -> bool {
        matches!(self, Operation::Move | Operation::Rename)
    }
}

/// Result of classifying one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Semantic operation
    pub operation: Operation,
    /// Current path, `/`-joined
    pub to: String,
    /// Previous path, set only for moves and renames
    pub from: Option<String>,
}

/// Classify a raw change record
///
/// Returns `None` for record types that carry no operation.
pub fn classify(record: &RawChangeRecord) -> Option<Classification> {
    let to = join_segments(&record.relative_path_components);

    let (operation, from) = match record.change_type {
        ChangeType::Appeared => (Operation::Create, None),
        ChangeType::Modified => (Operation::Modify, None),
        ChangeType::Disappeared => (Operation::Remove, None),
        ChangeType::Moved => match &record.relative_path_moved_from {
            Some(moved_from) => (
                discriminate_move(&record.relative_path_components, moved_from),
                Some(join_segments(moved_from)),
            ),
            // Source lies outside the watched tree
            None => {
                debug!("Moved record without source path, treating {} as created", to);
                (Operation::Create, None)
            }
        },
        ChangeType::Unknown => {
            debug!("Ignoring record of unknown type for {}", to);
            return None;
        }
    };

    Some(Classification { operation, to, from })
}

/// Decide whether a move between two segment sequences is a rename
///
/// A rename keeps every directory segment and changes only the leaf.
/// Identical paths stay `Move`.
pub fn discriminate_move<S: AsRef<str>>(to: &[S], from: &[S]) -> Operation {
    if to.len() != from.len() || to.is_empty() {
        return Operation::Move;
    }

    let last = to.len() - 1;
    let same_parent = to[..last]
        .iter()
        .zip(&from[..last])
        .all(|(a, b)| a.as_ref() == b.as_ref());

    if same_parent && to[last].as_ref() != from[last].as_ref() {
        Operation::Rename
    } else {
        Operation::Move
    }
}
