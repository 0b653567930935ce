//! The serialized block form: the model-boundary contract.
//!
//! A block serializes to `{id, type, mutation?, fields, inputs, next?}`.
//! Deserializing and re-serializing a block is byte-for-byte stable modulo
//! the id policy: duplicating a block reassigns fresh ids, including the ids
//! inside shadow templates obscured by a real block, so pasted copies never
//! collide with the originals.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Id handling when loading a serialized block into a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPolicy {
    /// Keep the serialized ids. Loading fails on a collision.
    Keep,
    /// Assign fresh ids everywhere; used for duplication and shadow respawn.
    Fresh,
}

/// One input slot in serialized form: the attached real block and/or the
/// shadow occupying the slot underneath it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SerializedInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<Box<SerializedBlock>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<Box<SerializedBlock>>,
}

/// A block and its subtree in serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedBlock {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation: Option<crate::mutation::MutationForm>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, SerializedInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Box<SerializedBlock>>,
}

impl SerializedBlock {
    /// A minimal serialized block of the given kind. Used for shadow
    /// templates; the empty id is replaced at spawn time.
    pub fn template(kind: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            kind: kind.into(),
            mutation: None,
            fields: BTreeMap::new(),
            inputs: BTreeMap::new(),
            next: None,
        }
    }

    /// Replaces every id in this subtree, including ids inside nested shadow
    /// slots, with ids produced by `fresh`.
    pub fn reassign_ids(&mut self, fresh: &mut impl FnMut() -> String) {
        self.id = fresh();
        for input in self.inputs.values_mut() {
            if let Some(block) = &mut input.block {
                block.reassign_ids(fresh);
            }
            if let Some(shadow) = &mut input.shadow {
                shadow.reassign_ids(fresh);
            }
        }
        if let Some(next) = &mut self.next {
            next.reassign_ids(fresh);
        }
    }
}
