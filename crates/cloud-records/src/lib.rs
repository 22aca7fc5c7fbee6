//! Shared record types for the post-cloud layout workspace.
//!
//! This crate contains pure data structures with no layout logic. Collaborators
//! (loaders, renderers, exporters) exchange anchors and items through these
//! records; the engine reads them in and writes positions back.

pub mod anchor;
pub mod flags;
pub mod item;
pub mod position;
pub mod scene;

#[cfg(feature = "test-fixtures")]
pub mod fixtures;

pub use anchor::AnchorRecord;
pub use flags::ItemFlags;
pub use item::ItemRecord;
pub use position::Position3;
pub use scene::{Scene, SceneError};
