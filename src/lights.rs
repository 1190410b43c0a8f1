//! Light-source aggregation.
//!
//! The glass shader lights the blob from up to [`MAX_LIGHTS`] point lights,
//! one per particle. Each frame the aggregator copies a prefix of the registry
//! into a fixed-size buffer and computes a global intensity that falls off
//! with the number of lights, so overlapping glows do not blow out:
//!
//! ```text
//! intensity = base_intensity / max(1, count)^falloff_exponent
//! ```
//!
//! Slots are handed out in registry order. Once the population exceeds the
//! capacity, the earliest-registered particles keep their lights.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::boundary::Boundary;
use crate::config::LightConfig;
use crate::registry::ParticleRegistry;

/// Capacity of the light array in the glass shader's uniform block.
pub const MAX_LIGHTS: usize = 20;

/// Which particles are eligible for a light slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightSelection {
    /// Every registered particle, first come first served.
    #[default]
    RegistryOrder,
    /// Only particles currently inside the boundary, still in registry order.
    ContainedOnly,
}

/// One light as laid out in the shader's uniform array.
///
/// WGSL aligns the `vec4` color to 16 bytes, hence the padding after the
/// position.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LightSource {
    pub position: [f32; 2],
    pub _pad: [f32; 2],
    /// RGB plus unused alpha.
    pub color: [f32; 4],
}

impl LightSource {
    pub fn new(position: Vec2, color: Vec3) -> Self {
        Self {
            position: position.to_array(),
            _pad: [0.0; 2],
            color: color.extend(1.0).to_array(),
        }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::from_array(self.position)
    }

    pub fn color(&self) -> Vec3 {
        Vec3::new(self.color[0], self.color[1], self.color[2])
    }
}

/// Frame-local light buffer; only the first `count` slots are meaningful.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightBuffer {
    pub lights: [LightSource; MAX_LIGHTS],
    pub count: usize,
    pub intensity: f32,
}

impl Default for LightBuffer {
    fn default() -> Self {
        Self {
            lights: [LightSource::zeroed(); MAX_LIGHTS],
            count: 0,
            intensity: 0.0,
        }
    }
}

impl LightBuffer {
    /// The occupied slots.
    pub fn active(&self) -> &[LightSource] {
        &self.lights[..self.count]
    }

    pub fn positions(&self) -> Vec<Vec2> {
        self.active().iter().map(LightSource::position).collect()
    }

    pub fn colors(&self) -> Vec<Vec3> {
        self.active().iter().map(LightSource::color).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Projects the registry into a [`LightBuffer`].
#[derive(Clone, Debug)]
pub struct LightAggregator {
    selection: LightSelection,
    base_intensity: f32,
    falloff_exponent: f32,
}

impl Default for LightAggregator {
    fn default() -> Self {
        Self::new(&LightConfig::default())
    }
}

impl LightAggregator {
    pub fn new(config: &LightConfig) -> Self {
        Self {
            selection: config.selection,
            base_intensity: config.base_intensity,
            falloff_exponent: config.falloff_exponent,
        }
    }

    pub fn selection(&self) -> LightSelection {
        self.selection
    }

    /// Global intensity for `count` active lights.
    pub fn intensity_for(&self, count: usize) -> f32 {
        self.base_intensity / (count.max(1) as f32).powf(self.falloff_exponent)
    }

    /// Fill a light buffer from the first eligible particles.
    pub fn publish(&self, registry: &ParticleRegistry, boundary: &Boundary) -> LightBuffer {
        let shape = boundary.params();
        let mut buffer = LightBuffer::default();

        let eligible = registry.iter().filter(|p| match self.selection {
            LightSelection::RegistryOrder => true,
            LightSelection::ContainedOnly => shape.contains(p.position),
        });
        for (slot, particle) in buffer.lights.iter_mut().zip(eligible) {
            *slot = LightSource::new(particle.position, particle.color);
            buffer.count += 1;
        }

        buffer.intensity = self.intensity_for(buffer.count);
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoundaryConfig;
    use crate::particle::Particle;

    fn registry_with(n: usize) -> ParticleRegistry {
        let mut reg = ParticleRegistry::new();
        for i in 0..n {
            let p = Particle::new(
                format!("k{i}"),
                format!("K{i}"),
                Vec2::new(i as f32 * 0.01, 0.0),
                Vec3::new(i as f32 / n as f32, 0.5, 0.25),
            );
            reg.insert(p).unwrap();
        }
        reg
    }

    fn boundary() -> Boundary {
        Boundary::new(BoundaryConfig::default())
    }

    #[test]
    fn test_light_source_layout() {
        assert_eq!(std::mem::size_of::<LightSource>(), 32);
        let light = LightSource::new(Vec2::new(1.0, 2.0), Vec3::new(0.1, 0.2, 0.3));
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&light));
        assert_eq!(floats, &[1.0, 2.0, 0.0, 0.0, 0.1, 0.2, 0.3, 1.0]);
    }

    #[test]
    fn test_publish_copies_positions_and_colors() {
        let reg = registry_with(3);
        let buffer = LightAggregator::default().publish(&reg, &boundary());
        assert_eq!(buffer.count, 3);
        let expected: Vec<Vec2> = reg.iter().map(|p| p.position).collect();
        assert_eq!(buffer.positions(), expected);
        let colors: Vec<Vec3> = reg.iter().map(|p| p.color).collect();
        assert_eq!(buffer.colors(), colors);
    }

    #[test]
    fn test_publish_truncates_to_first_registered() {
        let reg = registry_with(MAX_LIGHTS + 7);
        let buffer = LightAggregator::default().publish(&reg, &boundary());
        assert_eq!(buffer.count, MAX_LIGHTS);
        let first: Vec<Vec2> = reg.iter().take(MAX_LIGHTS).map(|p| p.position).collect();
        assert_eq!(buffer.positions(), first);
    }

    #[test]
    fn test_intensity_falloff() {
        let agg = LightAggregator::default();
        assert!((agg.intensity_for(0) - 0.75).abs() < 1e-6);
        assert!((agg.intensity_for(1) - 0.75).abs() < 1e-6);
        assert!((agg.intensity_for(5) - 0.4970).abs() < 1e-3);

        let buffer = agg.publish(&registry_with(5), &boundary());
        assert!((buffer.intensity - 0.75 / 5f32.powf(0.3)).abs() < 1e-6);
    }

    #[test]
    fn test_empty_registry_publishes_nothing() {
        let buffer = LightAggregator::default().publish(&ParticleRegistry::new(), &boundary());
        assert!(buffer.is_empty());
        assert!(buffer.positions().is_empty());
    }

    #[test]
    fn test_contained_only_skips_outside_particles() {
        let mut reg = ParticleRegistry::new();
        reg.insert(Particle::new("far", "far", Vec2::new(0.8, 0.0), Vec3::ONE)).unwrap();
        reg.insert(Particle::new("near", "near", Vec2::new(0.01, 0.0), Vec3::ONE)).unwrap();

        let config = LightConfig {
            selection: LightSelection::ContainedOnly,
            ..LightConfig::default()
        };
        let buffer = LightAggregator::new(&config).publish(&reg, &boundary());
        assert_eq!(buffer.count, 1);
        assert_eq!(buffer.positions(), vec![Vec2::new(0.01, 0.0)]);

        let all = LightAggregator::default().publish(&reg, &boundary());
        assert_eq!(all.count, 2);
    }
}
