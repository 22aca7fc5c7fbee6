//! Configuration loading for the layout engine.
//!
//! Every tunable lives in [`LayoutConfig`]; it can be built in code, parsed
//! from a TOML string or loaded from a file. Missing sections and fields fall
//! back to their defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::hash::HashKind;
use crate::pipeline::PassName;

/// Complete layout configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Global bounding sphere
    #[serde(default)]
    pub sphere: SphereConfig,
    /// Per-anchor volume allocation
    #[serde(default)]
    pub allocation: AllocationConfig,
    /// Ownership classification
    #[serde(default)]
    pub ownership: OwnershipConfig,
    /// Pass 1: placement sampling
    #[serde(default)]
    pub placement: PlacementConfig,
    /// Seed and hash shared by every randomized pass
    #[serde(default)]
    pub noise: NoiseConfig,
    /// Pass 3: organic perturbation
    #[serde(default)]
    pub perturbation: PerturbationConfig,
    /// Pass 4: density equalization
    #[serde(default)]
    pub density: DensityConfig,
    /// Pass 5: final noise
    #[serde(default)]
    pub finish: FinishConfig,
    /// How items are matched to anchors
    #[serde(default)]
    pub matching: MatchingConfig,
    /// Pass order and toggles
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl LayoutConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as pretty TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Convenience constructor for the common case of only changing the radius.
    pub fn with_radius(radius: f32) -> Self {
        Self {
            sphere: SphereConfig { radius },
            ..Self::default()
        }
    }

    /// Checks every numeric parameter is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let radius = self.sphere.radius;
        if !(radius.is_finite() && radius > 0.0) {
            return Err(ConfigError::invalid(
                "sphere.radius",
                format!("must be a positive number, got {}", radius),
            ));
        }
        if !(self.allocation.volume_scale.is_finite() && self.allocation.volume_scale > 0.0) {
            return Err(ConfigError::invalid(
                "allocation.volume_scale",
                format!("must be positive, got {}", self.allocation.volume_scale),
            ));
        }
        if !(0.0..=1.0).contains(&self.ownership.permissiveness) {
            return Err(ConfigError::invalid(
                "ownership.permissiveness",
                format!("must be within [0, 1], got {}", self.ownership.permissiveness),
            ));
        }
        if self.placement.max_attempts == 0 {
            return Err(ConfigError::invalid("placement.max_attempts", "must be at least 1"));
        }
        if self.placement.spiral_radial_steps == 0 || self.placement.spiral_angular_steps == 0 {
            return Err(ConfigError::invalid(
                "placement.spiral_radial_steps",
                "spiral steps must be at least 1",
            ));
        }
        if !(self.placement.fallback_offset > 0.0 && self.placement.fallback_offset < 1.0) {
            return Err(ConfigError::invalid(
                "placement.fallback_offset",
                format!("must be within (0, 1), got {}", self.placement.fallback_offset),
            ));
        }
        if !(self.placement.periphery_factor > 0.0 && self.placement.periphery_factor <= 1.0) {
            return Err(ConfigError::invalid(
                "placement.periphery_factor",
                format!("must be within (0, 1], got {}", self.placement.periphery_factor),
            ));
        }
        if !(non_negative(self.perturbation.noise_scale) && non_negative(self.perturbation.amplitude)) {
            return Err(ConfigError::invalid(
                "perturbation",
                "noise_scale and amplitude must be finite and not negative",
            ));
        }
        if !(1..=MAX_GRID_RESOLUTION).contains(&self.density.grid_resolution) {
            return Err(ConfigError::invalid(
                "density.grid_resolution",
                format!(
                    "must be within 1..={}, got {}",
                    MAX_GRID_RESOLUTION, self.density.grid_resolution
                ),
            ));
        }
        if !(self.density.overdense_factor.is_finite() && self.density.overdense_factor >= 1.0) {
            return Err(ConfigError::invalid(
                "density.overdense_factor",
                format!("must be a finite number of at least 1.0, got {}", self.density.overdense_factor),
            ));
        }
        if !(self.density.pull_fraction > 0.0 && self.density.pull_fraction <= 1.0) {
            return Err(ConfigError::invalid(
                "density.pull_fraction",
                format!("must be within (0, 1], got {}", self.density.pull_fraction),
            ));
        }
        if !(non_negative(self.finish.fine_scale) && non_negative(self.finish.amplitude_factor)) {
            return Err(ConfigError::invalid(
                "finish",
                "fine_scale and amplitude_factor must be finite and not negative",
            ));
        }
        if self.matching.owner_field.is_empty() {
            return Err(ConfigError::invalid("matching.owner_field", "cannot be empty"));
        }
        Ok(())
    }
}

/// Rejects NaN and infinities along with negatives.
fn non_negative(value: f32) -> bool {
    value.is_finite() && value >= 0.0
}

/// Upper bound on voxel grid resolution (N³ voxels are allocated per round).
pub const MAX_GRID_RESOLUTION: usize = 128;

/// Global bounding sphere settings. The center is always the origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SphereConfig {
    /// Radius every item must end up inside
    pub radius: f32,
}

impl Default for SphereConfig {
    fn default() -> Self {
        Self { radius: 300.0 }
    }
}

/// Volume allocation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    /// Scale each anchor's volume by its share of the items
    pub proportional_volume: bool,
    /// Headroom multiplier on proportional shares (cells may overlap)
    pub volume_scale: f32,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            proportional_volume: true,
            volume_scale: 3.0,
        }
    }
}

/// Ownership classification settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnershipConfig {
    /// How far, as a fraction of the allocated radius, items may cross into
    /// a neighbouring cell. 0 is the strict nearest-anchor rule.
    pub permissiveness: f32,
}

impl Default for OwnershipConfig {
    fn default() -> Self {
        Self {
            permissiveness: 0.1,
        }
    }
}

/// Pass 1 settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Rejection-sampling attempts per item
    pub max_attempts: u32,
    /// Concentric shells searched by the spiral fallback
    pub spiral_radial_steps: u32,
    /// Directions tried on each shell
    pub spiral_angular_steps: u32,
    /// Last-resort offset from the anchor center, as a fraction of its radius
    pub fallback_offset: f32,
    /// Place items that have no owning anchor on the sphere periphery
    pub include_unowned: bool,
    /// Distance of unowned items from the center, as a fraction of the radius
    pub periphery_factor: f32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5000,
            spiral_radial_steps: 12,
            spiral_angular_steps: 48,
            fallback_offset: 0.01,
            include_unowned: true,
            periphery_factor: 0.95,
        }
    }
}

/// Seed and hash function for every randomized pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    pub seed: u64,
    pub hash: HashKind,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            hash: HashKind::Trig,
        }
    }
}

/// Pass 3 settings. The pass is skipped unless both values are positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerturbationConfig {
    /// Spatial frequency of the displacement field
    pub noise_scale: f32,
    /// Maximum per-axis displacement (also capped at 20% of the anchor radius)
    pub amplitude: f32,
}

impl Default for PerturbationConfig {
    fn default() -> Self {
        Self {
            noise_scale: 0.05,
            amplitude: 6.0,
        }
    }
}

/// Pass 4 settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityConfig {
    /// Voxels per axis across the sphere's enclosing cube
    pub grid_resolution: usize,
    /// Upper bound on redistribution rounds
    pub max_rounds: usize,
    /// Occupancy above `overdense_factor * target` marks a donor voxel
    pub overdense_factor: f32,
    /// Items pulled into each empty voxel, as a fraction of the target
    pub pull_fraction: f32,
    /// Stop once a round fills fewer than this many empty voxels
    pub convergence_threshold: usize,
    /// Only move items into voxels their anchor owns
    pub respect_ownership: bool,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            grid_resolution: 16,
            max_rounds: 12,
            overdense_factor: 1.2,
            pull_fraction: 0.7,
            convergence_threshold: 1,
            respect_ownership: false,
        }
    }
}

/// Pass 5 settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinishConfig {
    /// Spatial frequency of the fine noise
    pub fine_scale: f32,
    /// Displacement amplitude as a fraction of the voxel size
    pub amplitude_factor: f32,
}

impl Default for FinishConfig {
    fn default() -> Self {
        Self {
            fine_scale: 0.35,
            amplitude_factor: 0.3,
        }
    }
}

/// How item records are grouped onto anchors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Item field compared against `AnchorRecord::owner_key`
    pub owner_field: String,
    /// Field tried when the owner field does not match
    pub fallback_field: Option<String>,
    /// Never use the fallback field
    pub strict: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            owner_field: "character".to_string(),
            fallback_field: Some("author".to_string()),
            strict: false,
        }
    }
}

/// Pass order and toggles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pass names in execution order
    pub passes: Vec<String>,
    /// Per-pass switches; a disabled pass is a no-op
    pub enabled: PassToggles,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            passes: PassName::ALL.iter().map(|p| p.as_str().to_string()).collect(),
            enabled: PassToggles::default(),
        }
    }
}

/// Enables or disables each pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassToggles {
    pub place: bool,
    pub clamp: bool,
    pub perturb: bool,
    pub equalize: bool,
    pub finish: bool,
}

impl Default for PassToggles {
    fn default() -> Self {
        Self {
            place: true,
            clamp: true,
            perturb: true,
            equalize: true,
            finish: true,
        }
    }
}

impl PassToggles {
    /// Returns whether a pass is switched on.
    pub fn is_enabled(&self, pass: PassName) -> bool {
        match pass {
            PassName::Place => self.place,
            PassName::Clamp => self.clamp,
            PassName::Perturb => self.perturb,
            PassName::Equalize => self.equalize,
            PassName::Finish => self.finish,
        }
    }

    /// Switches a pass on or off.
    pub fn set(&mut self, pass: PassName, enabled: bool) {
        match pass {
            PassName::Place => self.place = enabled,
            PassName::Clamp => self.clamp = enabled,
            PassName::Perturb => self.perturb = enabled,
            PassName::Equalize => self.equalize = enabled,
            PassName::Finish => self.finish = enabled,
        }
    }
}

/// Generates a default configuration file content.
pub fn default_config_toml() -> String {
    r#"# Post-cloud layout configuration

[sphere]
radius = 300.0

[allocation]
proportional_volume = true
volume_scale = 3.0

[ownership]
permissiveness = 0.1

[placement]
max_attempts = 5000
spiral_radial_steps = 12
spiral_angular_steps = 48
fallback_offset = 0.01
include_unowned = true
periphery_factor = 0.95

[noise]
seed = 42
hash = "trig"

[perturbation]
noise_scale = 0.05
amplitude = 6.0

[density]
grid_resolution = 16
max_rounds = 12
overdense_factor = 1.2
pull_fraction = 0.7
convergence_threshold = 1
respect_ownership = false

[finish]
fine_scale = 0.35
amplitude_factor = 0.3

[matching]
owner_field = "character"
fallback_field = "author"
strict = false

[pipeline]
passes = ["place", "clamp", "perturb", "equalize", "finish"]

[pipeline.enabled]
place = true
clamp = true
perturb = true
equalize = true
finish = true
"#
    .to_string()
}
