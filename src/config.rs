//! Simulation configuration.
//!
//! Every tunable of the blob lives here: boundary shape, force field, light
//! aggregation and spawn choreography. All sections default to the values the
//! blob was tuned with, so a config file only needs the keys it changes.
//!
//! # Example
//!
//! ```toml
//! [boundary]
//! base_radius = 0.25
//! max_lobes = 12
//!
//! [boundary.shape]
//! kind = "polygon"
//! sides = 6
//!
//! [forces]
//! idle_factor = 0.1
//!
//! [spawn]
//! ignored_keywords = ["豆包", "hello"]
//!
//! [cells]
//! start_exploded = true
//! shape = "circle"
//! ```

use std::f32::consts::PI;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::boundary::{amplitude_law, ShapeKind};
use crate::cells::CellShape;
use crate::error::ConfigError;
use crate::lights::LightSelection;

/// Upper bound for the deformation amplitude; keeps `radius(θ)` strictly positive.
///
/// [`BlobConfig::validate`] rejects any boundary whose amplitude law exceeds
/// this at `min_lobes`.
pub const MAX_AMPLITUDE: f32 = 0.95;

/// Complete blob configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BlobConfig {
    pub boundary: BoundaryConfig,
    pub forces: ForceConfig,
    pub lights: LightConfig,
    pub spawn: SpawnConfig,
    pub cells: CellConfig,
}

/// Shape of the confinement region and how it reacts to population changes.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Base radius `R0` in world units.
    pub base_radius: f32,
    /// Lobe count for an empty blob.
    pub min_lobes: u32,
    /// Lobe count never exceeds this, however many particles there are.
    pub max_lobes: u32,
    /// Amplitude fraction at `reference_lobes`. The law evaluated at
    /// `min_lobes` must stay at or below [`MAX_AMPLITUDE`].
    pub base_amplitude: f32,
    pub reference_lobes: f32,
    /// Exponent of the amplitude decay law.
    pub amplitude_gamma: f32,
    /// Seconds to ease lobes/amplitude toward a new target.
    pub retarget_duration: f32,
    /// Phase rotation in radians per second.
    pub phase_speed: f32,
    pub shape: ShapeKind,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            base_radius: 0.2,
            min_lobes: 3,
            max_lobes: 16,
            base_amplitude: 0.14,
            reference_lobes: 8.0,
            amplitude_gamma: 0.6,
            retarget_duration: 0.35,
            phase_speed: 0.4,
            shape: ShapeKind::Wavy,
        }
    }
}

/// Per-state force magnitudes and the velocity envelope.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ForceConfig {
    /// Centripetal pull for freshly spawned particles.
    pub outside_pull: f32,
    /// Wander acceleration while inside.
    pub inside_wander: f32,
    /// Half-width of the random heading offset while wandering, in radians.
    pub wander_spread: f32,
    /// Recall strength for particles that slipped out.
    pub escape_pull: f32,
    /// Velocity multiplier applied every tick.
    pub damping: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    /// Idle factor applied on an idle backend signal.
    pub idle_factor: f32,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            outside_pull: 2.5,
            inside_wander: 0.45,
            wander_spread: 0.8 * PI,
            escape_pull: 0.9,
            damping: 0.995,
            min_speed: 0.05,
            max_speed: 0.5,
            idle_factor: 0.14,
        }
    }
}

/// Light aggregation and glass shader look.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LightConfig {
    /// Intensity with a single light.
    pub base_intensity: f32,
    /// Power-law exponent of the intensity falloff with light count.
    pub falloff_exponent: f32,
    pub selection: LightSelection,
    /// World-space reach of each light's glow.
    pub glow_radius: f32,
    pub grain_scale: f32,
    pub grain_amount: f32,
    pub alpha: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            base_intensity: 0.75,
            falloff_exponent: 0.3,
            selection: LightSelection::RegistryOrder,
            glow_radius: 0.5,
            grain_scale: 120.0,
            grain_amount: 0.015,
            alpha: 0.72,
        }
    }
}

/// Entry choreography for new keywords.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpawnConfig {
    /// Radius of the ring new particles appear on.
    pub ring_radius: f32,
    /// Gap between the outermost boundary extent and the settle position.
    pub settle_margin: f32,
    pub label_shrink: f32,
    pub particle_grow: f32,
    pub fly_duration: f32,
    pub pulse_duration: f32,
    /// Peak extra scale of a duplicate-keyword pulse.
    pub pulse_amplitude: f32,
    /// Keywords that never spawn (compared after normalization).
    pub ignored_keywords: Vec<String>,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            ring_radius: 0.55,
            settle_margin: 0.05,
            label_shrink: 0.4,
            particle_grow: 0.4,
            fly_duration: 0.6,
            pulse_duration: 0.5,
            pulse_amplitude: 0.6,
            ignored_keywords: vec!["豆包".to_string()],
        }
    }
}

/// Exploded layout: one container per particle on a rotating ring.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CellConfig {
    /// Start in the exploded layout instead of the shared boundary.
    pub start_exploded: bool,
    /// Container shape used until the first explode picks another.
    pub shape: CellShape,
    /// Side length of a container.
    pub size: f32,
    /// Ring radius while exploded.
    pub ring_radius: f32,
    /// Ring radius the cells widen to when a gather starts.
    pub gather_radius: f32,
    /// Ring rotation in radians per second.
    pub ring_speed: f32,
    /// Container spin in radians per second.
    pub spin_speed: f32,
    /// Wander acceleration inside a container.
    pub wander: f32,
    pub glow_radius: f32,
    pub intensity: f32,
    /// Ring re-layout after a new particle joins.
    pub relayout_duration: f32,
    /// Flight from the center out to the ring.
    pub explode_duration: f32,
    /// Shortest gather flight.
    pub gather_base: f32,
    /// Random extra gather flight time.
    pub gather_jitter: f32,
    /// Delay between consecutive cells leaving the ring.
    pub gather_stagger: f32,
    /// Random extra delay per cell.
    pub gather_delay_jitter: f32,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            start_exploded: false,
            shape: CellShape::Square,
            size: 0.15,
            ring_radius: 0.3,
            gather_radius: 0.55,
            ring_speed: 0.4,
            spin_speed: 0.6,
            wander: 0.6,
            glow_radius: 0.2,
            intensity: 0.9,
            relayout_duration: 0.6,
            explode_duration: 1.0,
            gather_base: 0.5,
            gather_jitter: 1.0,
            gather_stagger: 0.3,
            gather_delay_jitter: 0.12,
        }
    }
}

impl BlobConfig {
    /// Parse and validate a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: BlobConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        info!(path = %path.display(), "loaded blob config");
        Ok(config)
    }

    /// Serialize back to TOML.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Every float tunable with its dotted name.
    fn float_fields(&self) -> [(&'static str, f32); 41] {
        let (b, f, l, s, c) = (&self.boundary, &self.forces, &self.lights, &self.spawn, &self.cells);
        [
            ("boundary.base_radius", b.base_radius),
            ("boundary.base_amplitude", b.base_amplitude),
            ("boundary.reference_lobes", b.reference_lobes),
            ("boundary.amplitude_gamma", b.amplitude_gamma),
            ("boundary.retarget_duration", b.retarget_duration),
            ("boundary.phase_speed", b.phase_speed),
            ("forces.outside_pull", f.outside_pull),
            ("forces.inside_wander", f.inside_wander),
            ("forces.wander_spread", f.wander_spread),
            ("forces.escape_pull", f.escape_pull),
            ("forces.damping", f.damping),
            ("forces.min_speed", f.min_speed),
            ("forces.max_speed", f.max_speed),
            ("forces.idle_factor", f.idle_factor),
            ("lights.base_intensity", l.base_intensity),
            ("lights.falloff_exponent", l.falloff_exponent),
            ("lights.glow_radius", l.glow_radius),
            ("lights.grain_scale", l.grain_scale),
            ("lights.grain_amount", l.grain_amount),
            ("lights.alpha", l.alpha),
            ("spawn.ring_radius", s.ring_radius),
            ("spawn.settle_margin", s.settle_margin),
            ("spawn.label_shrink", s.label_shrink),
            ("spawn.particle_grow", s.particle_grow),
            ("spawn.fly_duration", s.fly_duration),
            ("spawn.pulse_duration", s.pulse_duration),
            ("spawn.pulse_amplitude", s.pulse_amplitude),
            ("cells.size", c.size),
            ("cells.ring_radius", c.ring_radius),
            ("cells.gather_radius", c.gather_radius),
            ("cells.ring_speed", c.ring_speed),
            ("cells.spin_speed", c.spin_speed),
            ("cells.wander", c.wander),
            ("cells.glow_radius", c.glow_radius),
            ("cells.intensity", c.intensity),
            ("cells.relayout_duration", c.relayout_duration),
            ("cells.explode_duration", c.explode_duration),
            ("cells.gather_base", c.gather_base),
            ("cells.gather_jitter", c.gather_jitter),
            ("cells.gather_stagger", c.gather_stagger),
            ("cells.gather_delay_jitter", c.gather_delay_jitter),
        ]
    }

    /// Check the invariants the simulation relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in self.float_fields() {
            if !value.is_finite() {
                return Err(ConfigError::invalid(field, "must be finite"));
            }
        }

        let b = &self.boundary;
        if !(b.base_radius > 0.0) {
            return Err(ConfigError::invalid("boundary.base_radius", "must be positive"));
        }
        if b.min_lobes == 0 {
            return Err(ConfigError::invalid("boundary.min_lobes", "must be at least 1"));
        }
        if b.min_lobes > b.max_lobes {
            return Err(ConfigError::invalid(
                "boundary.min_lobes",
                format!("{} exceeds max_lobes {}", b.min_lobes, b.max_lobes),
            ));
        }
        if !(b.reference_lobes > 0.0) {
            return Err(ConfigError::invalid("boundary.reference_lobes", "must be positive"));
        }
        if b.base_amplitude < 0.0 {
            return Err(ConfigError::invalid("boundary.base_amplitude", "must not be negative"));
        }
        // The law is decreasing in k, so min_lobes gives the largest amplitude.
        let widest = amplitude_law(b, b.min_lobes as f32);
        if !(widest <= MAX_AMPLITUDE) {
            return Err(ConfigError::invalid(
                "boundary.base_amplitude",
                format!(
                    "amplitude {widest:.3} at {} lobes exceeds the {MAX_AMPLITUDE} cap",
                    b.min_lobes
                ),
            ));
        }
        if let ShapeKind::Polygon { sides } = b.shape {
            if sides < 3 {
                return Err(ConfigError::invalid("boundary.shape.sides", "a polygon needs at least 3 sides"));
            }
        }
        if b.retarget_duration < 0.0 {
            return Err(ConfigError::invalid("boundary.retarget_duration", "must not be negative"));
        }

        let f = &self.forces;
        if !(f.min_speed > 0.0) {
            return Err(ConfigError::invalid("forces.min_speed", "must be positive"));
        }
        if f.min_speed > f.max_speed {
            return Err(ConfigError::invalid(
                "forces.min_speed",
                format!("{} exceeds max_speed {}", f.min_speed, f.max_speed),
            ));
        }
        if !(0.0..=1.0).contains(&f.damping) {
            return Err(ConfigError::invalid("forces.damping", "must be within 0..=1"));
        }
        if f.idle_factor < 0.0 {
            return Err(ConfigError::invalid("forces.idle_factor", "must not be negative"));
        }

        let l = &self.lights;
        if !(l.glow_radius > 0.0) {
            return Err(ConfigError::invalid("lights.glow_radius", "must be positive"));
        }

        let s = &self.spawn;
        if !(s.ring_radius > 0.0) {
            return Err(ConfigError::invalid("spawn.ring_radius", "must be positive"));
        }
        for (field, value) in [
            ("spawn.label_shrink", s.label_shrink),
            ("spawn.particle_grow", s.particle_grow),
            ("spawn.fly_duration", s.fly_duration),
            ("spawn.pulse_duration", s.pulse_duration),
        ] {
            if value < 0.0 {
                return Err(ConfigError::invalid(field, "duration must not be negative"));
            }
        }

        let c = &self.cells;
        for (field, value) in [
            ("cells.size", c.size),
            ("cells.ring_radius", c.ring_radius),
            ("cells.gather_radius", c.gather_radius),
            ("cells.glow_radius", c.glow_radius),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::invalid(field, "must be positive"));
            }
        }
        for (field, value) in [
            ("cells.relayout_duration", c.relayout_duration),
            ("cells.explode_duration", c.explode_duration),
            ("cells.gather_base", c.gather_base),
            ("cells.gather_jitter", c.gather_jitter),
            ("cells.gather_stagger", c.gather_stagger),
            ("cells.gather_delay_jitter", c.gather_delay_jitter),
        ] {
            if value < 0.0 {
                return Err(ConfigError::invalid(field, "duration must not be negative"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        BlobConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = BlobConfig::from_toml_str(
            r#"
            [boundary]
            max_lobes = 10

            [forces]
            idle_factor = 0.2
            "#,
        )
        .unwrap();

        assert_eq!(config.boundary.max_lobes, 10);
        assert_eq!(config.boundary.min_lobes, 3);
        assert!((config.forces.idle_factor - 0.2).abs() < 1e-6);
        assert!((config.forces.max_speed - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_polygon_shape_parses() {
        let config = BlobConfig::from_toml_str(
            r#"
            [boundary.shape]
            kind = "polygon"
            sides = 6
            "#,
        )
        .unwrap();
        assert_eq!(config.boundary.shape, ShapeKind::Polygon { sides: 6 });
    }

    #[test]
    fn test_rejects_inverted_lobe_range() {
        let err = BlobConfig::from_toml_str(
            r#"
            [boundary]
            min_lobes = 12
            max_lobes = 4
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "boundary.min_lobes", .. }));
    }

    #[test]
    fn test_rejects_folding_amplitude() {
        let mut config = BlobConfig::default();
        config.boundary.base_amplitude = 0.6;
        config.boundary.min_lobes = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_amplitude_above_cap() {
        // 0.5 · (8/3)^0.6 ≈ 0.90 passes, 0.55 · (8/3)^0.6 ≈ 0.99 does not.
        let mut config = BlobConfig::default();
        config.boundary.base_amplitude = 0.5;
        config.validate().unwrap();
        config.boundary.base_amplitude = 0.55;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "boundary.base_amplitude", .. })
        ));
    }

    #[test]
    fn test_rejects_non_finite_values() {
        for (text, field) in [
            ("[forces]\nwander_spread = inf\n", "forces.wander_spread"),
            ("[forces]\noutside_pull = -inf\n", "forces.outside_pull"),
            ("[boundary]\nbase_amplitude = nan\n", "boundary.base_amplitude"),
            ("[boundary]\nphase_speed = nan\n", "boundary.phase_speed"),
            ("[spawn]\nsettle_margin = inf\n", "spawn.settle_margin"),
            ("[lights]\ngrain_amount = nan\n", "lights.grain_amount"),
            ("[cells]\nring_speed = inf\n", "cells.ring_speed"),
        ] {
            match BlobConfig::from_toml_str(text) {
                Err(ConfigError::Invalid { field: got, .. }) => assert_eq!(got, field),
                other => panic!("{text:?} was not rejected: {other:?}"),
            }
        }
    }

    #[test]
    fn test_cells_section_parses() {
        let config = BlobConfig::from_toml_str(
            r#"
            [cells]
            start_exploded = true
            shape = "triangle"
            size = 0.2
            "#,
        )
        .unwrap();
        assert!(config.cells.start_exploded);
        assert_eq!(config.cells.shape, CellShape::Triangle);
        assert_eq!(config.cells.ring_radius, 0.3);
    }

    #[test]
    fn test_rejects_inverted_speed_envelope() {
        let mut config = BlobConfig::default();
        config.forces.min_speed = 1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "forces.min_speed", .. })
        ));
    }

    #[test]
    fn test_toml_round_trip_preserves_config() {
        let mut config = BlobConfig::default();
        config.spawn.ignored_keywords.push("hello".into());
        let text = config.to_toml_string().unwrap();
        let back = BlobConfig::from_toml_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_sample_config_file_loads() {
        let config = BlobConfig::from_toml_str(include_str!("../blob.toml")).unwrap();
        assert_eq!(config.boundary.shape, ShapeKind::Wavy);
    }
}
