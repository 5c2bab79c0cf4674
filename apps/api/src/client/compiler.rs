//! Compiles a user's edit intent into one atomic patch request.
//!
//! A multi-select add becomes one op per selected contact in selection
//! order, sent as a single request: either every op lands or none do, so N
//! selections never open N separate race windows.
//!
//! Local rejection here is a fast path over the last-fetched view; the
//! server re-validates every op against the authoritative document.

#![allow(dead_code)]

use thiserror::Error;

use crate::models::map::{ContactsMap, EvidenceBlock, PatchOp};

/// A UI-level edit on one evidence block.
#[derive(Debug, Clone, PartialEq)]
pub enum EditIntent {
    AddContacts {
        trade: String,
        block: usize,
        contact_ids: Vec<String>,
    },
    RemoveContact {
        trade: String,
        block: usize,
        contact_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("no contacts selected")]
    NothingSelected,

    #[error("trade '{0}' is not in the current map")]
    UnknownTrade(String),

    #[error("block {block} is out of range for trade '{trade}'")]
    BlockOutOfRange { trade: String, block: usize },

    #[error("contact '{0}' is already linked in this block")]
    AlreadyLinked(String),

    #[error("contact '{0}' is not linked in this block")]
    NotLinked(String),
}

/// Translates `intent` into an ordered op list, validated against `map`
/// (the last server-confirmed view).
pub fn compile(intent: &EditIntent, map: &ContactsMap) -> Result<Vec<PatchOp>, CompileError> {
    match intent {
        EditIntent::AddContacts {
            trade,
            block,
            contact_ids,
        } => {
            let target = lookup_block(map, trade, *block)?;
            let mut ops = Vec::new();
            let mut seen: Vec<&str> = Vec::new();
            for id in contact_ids {
                // collapse duplicate selections to their first occurrence
                if seen.contains(&id.as_str()) {
                    continue;
                }
                seen.push(id.as_str());
                if target.contacts.iter().any(|c| c == id) {
                    return Err(CompileError::AlreadyLinked(id.clone()));
                }
                ops.push(PatchOp::add(trade.clone(), *block, id.clone()));
            }
            if ops.is_empty() {
                return Err(CompileError::NothingSelected);
            }
            Ok(ops)
        }
        EditIntent::RemoveContact {
            trade,
            block,
            contact_id,
        } => {
            let target = lookup_block(map, trade, *block)?;
            if !target.contacts.iter().any(|c| c == contact_id) {
                return Err(CompileError::NotLinked(contact_id.clone()));
            }
            Ok(vec![PatchOp::remove(trade.clone(), *block, contact_id.clone())])
        }
    }
}

fn lookup_block<'a>(
    map: &'a ContactsMap,
    trade: &str,
    block: usize,
) -> Result<&'a EvidenceBlock, CompileError> {
    let blocks = map
        .get(trade)
        .ok_or_else(|| CompileError::UnknownTrade(trade.to_string()))?;
    blocks.get(block).ok_or_else(|| CompileError::BlockOutOfRange {
        trade: trade.to_string(),
        block,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_with(contacts: &[&str]) -> ContactsMap {
        let mut map = ContactsMap::new();
        map.insert(
            "plumbing".to_string(),
            vec![EvidenceBlock {
                note: "p1".to_string(),
                pages: vec!["3".to_string()],
                contacts: contacts.iter().map(|c| c.to_string()).collect(),
                original_name: None,
            }],
        );
        map
    }

    fn add(ids: &[&str]) -> EditIntent {
        EditIntent::AddContacts {
            trade: "plumbing".to_string(),
            block: 0,
            contact_ids: ids.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_multi_select_add_preserves_selection_order() {
        let ops = compile(&add(&["c2", "c4", "c3"]), &map_with(&["c1"])).unwrap();
        assert_eq!(
            ops,
            vec![
                PatchOp::add("plumbing", 0, "c2"),
                PatchOp::add("plumbing", 0, "c4"),
                PatchOp::add("plumbing", 0, "c3"),
            ]
        );
    }

    #[test]
    fn test_duplicate_selection_collapses_to_first_occurrence() {
        let ops = compile(&add(&["c2", "c3", "c2"]), &map_with(&[])).unwrap();
        assert_eq!(ops.len(), 2);
    }

    #[test]
    fn test_add_already_linked_rejected_locally() {
        let err = compile(&add(&["c2", "c1"]), &map_with(&["c1"])).unwrap_err();
        assert_eq!(err, CompileError::AlreadyLinked("c1".to_string()));
    }

    #[test]
    fn test_empty_selection_rejected() {
        let err = compile(&add(&[]), &map_with(&[])).unwrap_err();
        assert_eq!(err, CompileError::NothingSelected);
    }

    #[test]
    fn test_remove_compiles_single_op() {
        let intent = EditIntent::RemoveContact {
            trade: "plumbing".to_string(),
            block: 0,
            contact_id: "c1".to_string(),
        };
        let ops = compile(&intent, &map_with(&["c1"])).unwrap();
        assert_eq!(ops, vec![PatchOp::remove("plumbing", 0, "c1")]);
    }

    #[test]
    fn test_remove_unlinked_rejected_locally() {
        let intent = EditIntent::RemoveContact {
            trade: "plumbing".to_string(),
            block: 0,
            contact_id: "ghost".to_string(),
        };
        let err = compile(&intent, &map_with(&["c1"])).unwrap_err();
        assert_eq!(err, CompileError::NotLinked("ghost".to_string()));
    }

    #[test]
    fn test_unknown_trade_rejected_locally() {
        let intent = EditIntent::AddContacts {
            trade: "roofing".to_string(),
            block: 0,
            contact_ids: vec!["c2".to_string()],
        };
        let err = compile(&intent, &map_with(&[])).unwrap_err();
        assert_eq!(err, CompileError::UnknownTrade("roofing".to_string()));
    }

    #[test]
    fn test_stale_block_index_rejected_locally() {
        let intent = EditIntent::AddContacts {
            trade: "plumbing".to_string(),
            block: 5,
            contact_ids: vec!["c2".to_string()],
        };
        let err = compile(&intent, &map_with(&[])).unwrap_err();
        assert_eq!(
            err,
            CompileError::BlockOutOfRange {
                trade: "plumbing".to_string(),
                block: 5,
            }
        );
    }
}
