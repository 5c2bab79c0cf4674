use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::contact::ContactSummary;

/// Trade name -> ordered evidence blocks. Block order reflects document page
/// order and is preserved verbatim across edits.
pub type ContactsMap = BTreeMap<String, Vec<EvidenceBlock>>;

/// One unit of derived evidence for a trade: a note, the source page labels,
/// and the contacts linked to it. `contacts` is a set with first-insertion
/// order preserved for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceBlock {
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub pages: Vec<String>,
    #[serde(default)]
    pub contacts: Vec<String>,
    /// Pre-normalization trade label, when the deriving pipeline kept one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
}

/// One atomic instruction inside a guarded mutation request.
/// Wire shape: `{"op": "add_contact", "trade": ..., "block": ..., "contact_id": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PatchOp {
    AddContact {
        trade: String,
        block: usize,
        contact_id: String,
    },
    RemoveContact {
        trade: String,
        block: usize,
        contact_id: String,
    },
}

impl PatchOp {
    pub fn add(trade: impl Into<String>, block: usize, contact_id: impl Into<String>) -> Self {
        PatchOp::AddContact {
            trade: trade.into(),
            block,
            contact_id: contact_id.into(),
        }
    }

    pub fn remove(trade: impl Into<String>, block: usize, contact_id: impl Into<String>) -> Self {
        PatchOp::RemoveContact {
            trade: trade.into(),
            block,
            contact_id: contact_id.into(),
        }
    }
}

/// Full document payload returned by every successful read or mutation:
/// the map, the denormalized contact summaries, and the ref the caller must
/// present with its next mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSnapshot {
    pub map: ContactsMap,
    #[serde(rename = "contactsById", default)]
    pub contacts_by_id: BTreeMap<String, ContactSummary>,
    #[serde(rename = "ref")]
    pub ref_token: String,
}
