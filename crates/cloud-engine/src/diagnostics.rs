//! Non-fatal findings reported by a layout run.

use serde::Serialize;
use std::fmt;

/// Something the run noticed and worked around.
///
/// None of these abort the pipeline; the worst outcome is a lower-quality
/// distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// No anchor with a usable position; items were left untouched
    NoAnchors,
    /// Nothing to place
    NoItems,
    /// Anchor has a missing or non-finite position and takes no part in ownership
    AnchorExcluded { anchor_id: String },
    /// Two anchors claim the same owner key; the first one keeps it
    DuplicateOwnerKey { owner_key: String, anchor_id: String },
    /// Items whose owner key matched no anchor at all
    UnmatchedItems { count: usize },
    /// Items whose owner was an excluded anchor
    OrphanedItems { count: usize },
    /// Pass name in the pipeline that is not recognized
    UnknownPass { name: String },
    /// Placement fell through every tier and used the near-center fallback
    PlacementExhausted { item_id: String },
    /// Density equalizer hit its round cap before converging
    DensityNotConverged { rounds: usize, empty_voxels: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::NoAnchors => write!(f, "no usable anchors, items left unchanged"),
            Diagnostic::NoItems => write!(f, "no items to place"),
            Diagnostic::AnchorExcluded { anchor_id } => {
                write!(f, "anchor {} has no valid position and was excluded", anchor_id)
            }
            Diagnostic::DuplicateOwnerKey {
                owner_key,
                anchor_id,
            } => write!(
                f,
                "owner key '{}' already claimed, anchor {} ignored for matching",
                owner_key, anchor_id
            ),
            Diagnostic::UnmatchedItems { count } => {
                write!(f, "{} items matched no anchor", count)
            }
            Diagnostic::OrphanedItems { count } => {
                write!(f, "{} items belong to excluded anchors", count)
            }
            Diagnostic::UnknownPass { name } => write!(f, "unknown pass '{}' skipped", name),
            Diagnostic::PlacementExhausted { item_id } => {
                write!(f, "item {} placed by near-center fallback", item_id)
            }
            Diagnostic::DensityNotConverged {
                rounds,
                empty_voxels,
            } => write!(
                f,
                "density equalizer stopped after {} rounds with {} empty voxels",
                rounds, empty_voxels
            ),
        }
    }
}
