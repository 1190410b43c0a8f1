//! Boundary shape model.
//!
//! The confinement region is a star-shaped closed curve around the origin,
//! described by a radial function `radius(θ)`. A point is inside exactly when
//! its distance from the origin does not exceed the radius in its direction:
//!
//! ```text
//! inside(p) = hypot(p.x, p.y) <= radius(atan2(p.y, p.x))
//! ```
//!
//! The same function is generated into the glass shader (see
//! [`shader::glass_wgsl`](crate::shader::glass_wgsl)) so the rendered mask and
//! the simulation never disagree.
//!
//! # Shapes
//!
//! - [`ShapeKind::Wavy`]: `radius(θ) = R0 · (1 + a · cos(k·θ + phase))`
//! - [`ShapeKind::Polygon`]: a regular n-gon with circumradius `R0`,
//!   rotated by `phase`.
//!
//! The lobe count `k` follows the particle population; when it changes, `k`
//! and the amplitude `a` ease toward their new values instead of snapping.

use std::f32::consts::{PI, TAU};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{BoundaryConfig, MAX_AMPLITUDE};
use crate::easing::{lerp, Easing};

/// Which radial function the boundary uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeKind {
    /// Cosine-lobed blob whose lobe count tracks the population.
    #[default]
    Wavy,
    /// Regular polygon; ignores lobes and amplitude.
    Polygon { sides: u32 },
}

/// Snapshot of the boundary's current geometry, as read by the renderer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeParams {
    /// `R0`
    pub base_radius: f32,
    /// `k`, fractional while easing between two lobe counts.
    pub lobes: f32,
    pub amplitude: f32,
    pub phase: f32,
    pub kind: ShapeKind,
}

impl ShapeParams {
    /// Radius of the region in direction `theta`.
    pub fn radius_at(&self, theta: f32) -> f32 {
        match self.kind {
            ShapeKind::Wavy => {
                self.base_radius * (1.0 + self.amplitude * (self.lobes * theta + self.phase).cos())
            }
            ShapeKind::Polygon { sides } => {
                let n = sides.max(3) as f32;
                let sector = TAU / n;
                let local = (theta - self.phase).rem_euclid(sector);
                self.base_radius * (PI / n).cos() / (local - PI / n).cos()
            }
        }
    }

    /// `true` if `point` lies inside or on the boundary.
    pub fn contains(&self, point: Vec2) -> bool {
        point.length() <= self.radius_at(point.y.atan2(point.x))
    }

    /// Largest radius the curve can reach for these parameters.
    pub fn max_extent(&self) -> f32 {
        match self.kind {
            ShapeKind::Wavy => self.base_radius * (1.0 + self.amplitude),
            ShapeKind::Polygon { .. } => self.base_radius,
        }
    }
}

/// `base_amplitude · (reference_lobes / max(1, k))^gamma`, before clamping.
pub(crate) fn amplitude_law(config: &BoundaryConfig, lobes: f32) -> f32 {
    config.base_amplitude * (config.reference_lobes / lobes.max(1.0)).powf(config.amplitude_gamma)
}

/// In-flight ease between two (lobes, amplitude) pairs.
#[derive(Clone, Copy, Debug)]
struct Retarget {
    from_lobes: f32,
    from_amplitude: f32,
    elapsed: f32,
}

/// The confinement region and its time-varying parameters.
#[derive(Clone, Debug)]
pub struct Boundary {
    config: BoundaryConfig,
    lobes: f32,
    amplitude: f32,
    phase: f32,
    target_lobes: u32,
    retarget: Option<Retarget>,
}

impl Boundary {
    /// Create a boundary sized for an empty population.
    pub fn new(config: BoundaryConfig) -> Self {
        let target_lobes = config.min_lobes;
        let mut boundary = Self {
            lobes: target_lobes as f32,
            amplitude: 0.0,
            phase: 0.0,
            target_lobes,
            retarget: None,
            config,
        };
        boundary.amplitude = boundary.amplitude_for(target_lobes);
        boundary
    }

    pub fn config(&self) -> &BoundaryConfig {
        &self.config
    }

    /// Amplitude fraction for `k` lobes.
    ///
    /// Validated configs never exceed [`MAX_AMPLITUDE`]; the cap only bites
    /// for a hand-built [`BoundaryConfig`] that skipped validation.
    pub fn amplitude_for(&self, lobes: u32) -> f32 {
        amplitude_law(&self.config, lobes as f32).clamp(0.0, MAX_AMPLITUDE)
    }

    /// Lobe count the boundary is easing toward (or sitting at).
    pub fn target_lobes(&self) -> u32 {
        self.target_lobes
    }

    /// Lobe count for `population` particles: `clamp(MIN_LOBES + n, MIN_LOBES, MAX_LOBES)`.
    pub fn lobes_for_population(&self, population: usize) -> u32 {
        let min = self.config.min_lobes;
        let wanted = (min as usize).saturating_add(population);
        wanted.clamp(min as usize, self.config.max_lobes as usize) as u32
    }

    /// Re-derive the lobe count from the live particle count.
    ///
    /// A changed target starts an ease-in-out glide of lobes and amplitude
    /// over `retarget_duration`; an unchanged one is a no-op.
    pub fn update_lobe_count_for_population(&mut self, population: usize) {
        let target = self.lobes_for_population(population);
        if target == self.target_lobes {
            return;
        }
        debug!(population, from = self.target_lobes, to = target, "retargeting boundary lobes");
        self.target_lobes = target;
        if self.config.retarget_duration <= 0.0 {
            self.lobes = target as f32;
            self.amplitude = self.amplitude_for(target);
            self.retarget = None;
        } else {
            self.retarget = Some(Retarget {
                from_lobes: self.lobes,
                from_amplitude: self.amplitude,
                elapsed: 0.0,
            });
        }
    }

    /// Advance the lobe glide and the phase rotation by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.phase = (self.phase + self.config.phase_speed * dt).rem_euclid(TAU);

        if let Some(mut retarget) = self.retarget {
            retarget.elapsed += dt;
            let t = retarget.elapsed / self.config.retarget_duration;
            let target_amplitude = self.amplitude_for(self.target_lobes);
            if t >= 1.0 {
                self.lobes = self.target_lobes as f32;
                self.amplitude = target_amplitude;
                self.retarget = None;
            } else {
                let eased = Easing::SineInOut.apply(t);
                self.lobes = lerp(retarget.from_lobes, self.target_lobes as f32, eased);
                self.amplitude = lerp(retarget.from_amplitude, target_amplitude, eased);
                self.retarget = Some(retarget);
            }
        }
    }

    /// `true` while lobes/amplitude are still gliding toward their target.
    pub fn is_retargeting(&self) -> bool {
        self.retarget.is_some()
    }

    /// Current geometric parameters.
    pub fn params(&self) -> ShapeParams {
        ShapeParams {
            base_radius: self.config.base_radius,
            lobes: self.lobes,
            amplitude: self.amplitude,
            phase: self.phase,
            kind: self.config.shape,
        }
    }

    pub fn radius_at(&self, theta: f32) -> f32 {
        self.params().radius_at(theta)
    }

    pub fn contains(&self, point: Vec2) -> bool {
        self.params().contains(point)
    }

    /// Reset to the empty-population shape, keeping the config.
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn boundary() -> Boundary {
        Boundary::new(BoundaryConfig::default())
    }

    #[test]
    fn test_containment_matches_radial_formula() {
        let mut b = boundary();
        b.update_lobe_count_for_population(5);
        b.advance(0.1);
        let params = b.params();
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..2000 {
            let p = Vec2::new(rng.gen_range(-0.4..0.4), rng.gen_range(-0.4..0.4));
            let expected = p.x.hypot(p.y) <= params.radius_at(p.y.atan2(p.x));
            assert_eq!(b.contains(p), expected);
        }
    }

    #[test]
    fn test_origin_is_inside_and_far_point_outside() {
        let b = boundary();
        assert!(b.contains(Vec2::ZERO));
        assert!(!b.contains(Vec2::new(1.0, 0.0)));
    }

    #[test]
    fn test_radius_stays_positive() {
        let mut config = BoundaryConfig::default();
        config.min_lobes = 1;
        let b = Boundary::new(config);
        for i in 0..360 {
            let theta = (i as f32).to_radians() - PI;
            assert!(b.radius_at(theta) > 0.0);
        }
    }

    #[test]
    fn test_amplitude_law_reference_point() {
        let b = boundary();
        assert!((b.amplitude_for(8) - 0.14).abs() < 1e-6);
        assert!(b.amplitude_for(16) < b.amplitude_for(8));
        assert!(b.amplitude_for(3) > b.amplitude_for(8));
    }

    #[test]
    fn test_lobe_target_is_clamped() {
        let mut b = boundary();
        for n in 0..200 {
            b.update_lobe_count_for_population(n);
            let k = b.target_lobes();
            assert!((3..=16).contains(&k), "k={k} for n={n}");
        }
        assert_eq!(b.lobes_for_population(0), 3);
        assert_eq!(b.lobes_for_population(5), 8);
        assert_eq!(b.lobes_for_population(usize::MAX), 16);
    }

    #[test]
    fn test_retarget_eases_instead_of_snapping() {
        let mut b = boundary();
        b.update_lobe_count_for_population(5);
        assert!(b.is_retargeting());
        assert_eq!(b.params().lobes, 3.0);

        b.advance(0.1);
        let mid = b.params().lobes;
        assert!(mid > 3.0 && mid < 8.0, "lobes mid-glide: {mid}");

        b.advance(0.3);
        assert!(!b.is_retargeting());
        assert_eq!(b.params().lobes, 8.0);
        assert!((b.params().amplitude - 0.14).abs() < 1e-6);
    }

    #[test]
    fn test_unchanged_target_does_not_restart_glide() {
        let mut b = boundary();
        b.update_lobe_count_for_population(0);
        assert!(!b.is_retargeting());
    }

    #[test]
    fn test_phase_wraps() {
        let mut b = boundary();
        for _ in 0..100 {
            b.advance(1.0);
        }
        let phase = b.params().phase;
        assert!((0.0..TAU).contains(&phase));
    }

    #[test]
    fn test_polygon_vertices_and_apothem() {
        let mut config = BoundaryConfig::default();
        config.shape = ShapeKind::Polygon { sides: 6 };
        config.phase_speed = 0.0;
        let b = Boundary::new(config);

        // Vertex directions reach the circumradius.
        assert!((b.radius_at(0.0) - 0.2).abs() < 1e-5);
        assert!((b.radius_at(PI / 3.0) - 0.2).abs() < 1e-5);
        // Edge midpoints sit at the apothem.
        let apothem = 0.2 * (PI / 6.0).cos();
        assert!((b.radius_at(PI / 6.0) - apothem).abs() < 1e-5);
    }

    #[test]
    fn test_polygon_matches_half_plane_test() {
        let mut config = BoundaryConfig::default();
        config.shape = ShapeKind::Polygon { sides: 6 };
        let b = Boundary::new(config);
        let verts: Vec<Vec2> = (0..6)
            .map(|i| Vec2::from_angle(i as f32 / 6.0 * TAU) * 0.2)
            .collect();
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..2000 {
            let p = Vec2::new(rng.gen_range(-0.3..0.3), rng.gen_range(-0.3..0.3));
            let in_polygon = (0..6).all(|i| {
                let a = verts[i];
                let e = verts[(i + 1) % 6] - a;
                e.perp_dot(p - a) >= 0.0
            });
            // Skip points within float noise of an edge.
            let margin = (b.radius_at(p.y.atan2(p.x)) - p.length()).abs();
            if margin > 1e-4 {
                assert_eq!(b.contains(p), in_polygon, "point {p:?}");
            }
        }
    }
}
