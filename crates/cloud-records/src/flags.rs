//! Per-item diagnostic flags written by the placement passes.

use serde::{Deserialize, Serialize};

/// Where an item ended up relative to its anchor's territory.
///
/// Set by placement and refreshed by perturbation; later passes and
/// renderers read them for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemFlags {
    /// Inside the sphere allocated to the owning anchor
    pub in_allocated_volume: bool,
    /// Accepted by the ownership classifier for the owning anchor
    pub in_voronoi_cell: bool,
    /// Owned only thanks to the permissiveness margin
    pub in_blended_area: bool,
}

impl ItemFlags {
    /// Flags for an item that sits in its own cell and volume.
    pub fn settled() -> Self {
        Self {
            in_allocated_volume: true,
            in_voronoi_cell: true,
            in_blended_area: false,
        }
    }

    /// True when the item is both inside its volume and its cell.
    pub fn is_settled(&self) -> bool {
        self.in_allocated_volume && self.in_voronoi_cell
    }
}
