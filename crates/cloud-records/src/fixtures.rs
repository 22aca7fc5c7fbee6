//! Sample data fixtures for testing.
//!
//! Enable the `test-fixtures` feature to access these helpers.
//!
//! ```ignore
//! // [dev-dependencies]
//! // cloud-records = { path = "../cloud-records", features = ["test-fixtures"] }
//!
//! let scene = cloud_records::fixtures::sample_scene();
//! ```

use crate::Scene;

/// Returns the sample scene from the fixtures file.
///
/// Contains:
/// - 4 anchors (Mira, Voss and Corin positioned, Elda without a position)
/// - 24 items: most keyed by `character`, a few only by `author`,
///   two owned by Elda and one matching no anchor at all
pub fn sample_scene() -> Scene {
    let json = include_str!("../tests/fixtures/sample_scene.json");
    Scene::from_json_str(json).expect("Failed to parse sample_scene.json")
}
