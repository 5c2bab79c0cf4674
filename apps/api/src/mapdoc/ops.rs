//! Patch application for the contacts map.
//!
//! Ops apply in request order against a working copy; the caller only commits
//! the result if every op succeeded, so a rejected patch never leaves a
//! half-applied document behind.

use thiserror::Error;

use crate::models::map::{ContactsMap, EvidenceBlock, PatchOp};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatchError {
    #[error("trade '{0}' does not exist in the map")]
    UnknownTrade(String),

    #[error("block {block} is out of range for trade '{trade}'")]
    BlockOutOfRange { trade: String, block: usize },

    #[error("contact '{contact_id}' is not linked in block {block} of trade '{trade}'")]
    ContactNotLinked {
        trade: String,
        block: usize,
        contact_id: String,
    },
}

/// Applies `ops` in order and returns the resulting map. All-or-nothing:
/// the input map is never mutated, and any failing op rejects the whole patch.
///
/// Adding a contact already present in a block is a no-op (the stored set
/// stays deduplicated); removing a contact that is not present is an error.
pub fn apply_ops(map: &ContactsMap, ops: &[PatchOp]) -> Result<ContactsMap, PatchError> {
    let mut next = map.clone();

    for op in ops {
        match op {
            PatchOp::AddContact {
                trade,
                block,
                contact_id,
            } => {
                let target = block_mut(&mut next, trade, *block)?;
                if !target.contacts.iter().any(|c| c == contact_id) {
                    target.contacts.push(contact_id.clone());
                }
            }
            PatchOp::RemoveContact {
                trade,
                block,
                contact_id,
            } => {
                let target = block_mut(&mut next, trade, *block)?;
                let before = target.contacts.len();
                target.contacts.retain(|c| c != contact_id);
                if target.contacts.len() == before {
                    return Err(PatchError::ContactNotLinked {
                        trade: trade.clone(),
                        block: *block,
                        contact_id: contact_id.clone(),
                    });
                }
            }
        }
    }

    Ok(next)
}

fn block_mut<'a>(
    map: &'a mut ContactsMap,
    trade: &str,
    block: usize,
) -> Result<&'a mut EvidenceBlock, PatchError> {
    let blocks = map
        .get_mut(trade)
        .ok_or_else(|| PatchError::UnknownTrade(trade.to_string()))?;
    blocks
        .get_mut(block)
        .ok_or_else(|| PatchError::BlockOutOfRange {
            trade: trade.to_string(),
            block,
        })
}
