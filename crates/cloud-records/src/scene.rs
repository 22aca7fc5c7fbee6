//! Scene files: anchors and items bundled together.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{AnchorRecord, ItemRecord};

/// A complete layout input as exchanged with loaders and exporters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub anchors: Vec<AnchorRecord>,
    #[serde(default)]
    pub items: Vec<ItemRecord>,
}

impl Scene {
    pub fn new(anchors: Vec<AnchorRecord>, items: Vec<ItemRecord>) -> Self {
        Self { anchors, items }
    }

    /// Parses a scene from a JSON string.
    pub fn from_json_str(content: &str) -> Result<Self, SceneError> {
        serde_json::from_str(content).map_err(SceneError::Json)
    }

    /// Loads a scene from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, SceneError> {
        let content = std::fs::read_to_string(path).map_err(SceneError::Io)?;
        Self::from_json_str(&content)
    }

    /// Writes the scene as pretty JSON.
    pub fn write_to_file(&self, path: &Path) -> Result<(), SceneError> {
        let json = serde_json::to_string_pretty(self).map_err(SceneError::Json)?;
        std::fs::write(path, json).map_err(SceneError::Io)
    }
}

/// Errors that can occur reading or writing scene files.
#[derive(Debug)]
pub enum SceneError {
    /// IO error reading or writing the file
    Io(std::io::Error),
    /// Malformed JSON
    Json(serde_json::Error),
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneError::Io(e) => write!(f, "IO error: {}", e),
            SceneError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for SceneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SceneError::Io(e) => Some(e),
            SceneError::Json(e) => Some(e),
        }
    }
}
