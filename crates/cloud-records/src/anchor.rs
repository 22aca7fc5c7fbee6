//! Anchor records: the characters or entities items cluster around.

use serde::{Deserialize, Serialize};

use crate::Position3;

/// An externally positioned anchor.
///
/// The position is optional because upstream loaders may not have one yet;
/// anchors without a usable position are excluded from ownership and their
/// items fall back to unowned placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorRecord {
    /// Unique anchor identifier
    pub id: String,
    /// Position in layout space
    #[serde(default)]
    pub position: Option<Position3>,
    /// Key that items reference to claim this anchor as owner
    pub owner_key: String,
}

impl AnchorRecord {
    /// Creates an anchor at the given position.
    pub fn new(id: impl Into<String>, owner_key: impl Into<String>, position: Position3) -> Self {
        Self {
            id: id.into(),
            position: Some(position),
            owner_key: owner_key.into(),
        }
    }

    /// Creates an anchor that has not been positioned.
    pub fn unpositioned(id: impl Into<String>, owner_key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            position: None,
            owner_key: owner_key.into(),
        }
    }

    /// Returns the position if it is present and finite.
    pub fn valid_position(&self) -> Option<Position3> {
        self.position.filter(Position3::is_finite)
    }
}
