//! Force field and explicit Euler integration.
//!
//! Every tick, each particle:
//!
//! 1. tests containment against its [`Region`] (the shared boundary, or its
//!    own cell while the blob is exploded),
//! 2. advances its [`ParticleState`],
//! 3. picks an acceleration by state:
//!    - `Outside`: strong pull toward the region center,
//!    - `Inside`: wander, heading jittered around the current velocity,
//!    - `Escaping`: weaker pull toward the region center,
//! 4. integrates velocity with damping and clamps speed into
//!    `[min_speed, max_speed]`,
//! 5. integrates position.
//!
//! All accelerations are scaled by the idle factor, which the backend lowers
//! to let the blob visibly settle. `dt` is used as given; no fixed step.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use tracing::trace;

use crate::boundary::ShapeParams;
use crate::config::ForceConfig;
use crate::particle::Particle;
use crate::state::ParticleState;

/// Where a particle is confined.
pub trait Region {
    fn contains(&self, p: Vec2) -> bool;

    /// Target of the centripetal pulls.
    fn center(&self) -> Vec2;

    /// Inside wander magnitude, if the region overrides the field's.
    fn wander(&self) -> Option<f32> {
        None
    }
}

impl Region for ShapeParams {
    fn contains(&self, p: Vec2) -> bool {
        ShapeParams::contains(self, p)
    }

    fn center(&self) -> Vec2 {
        Vec2::ZERO
    }
}

/// Per-state accelerations plus the velocity envelope.
#[derive(Clone, Debug)]
pub struct ForceField {
    config: ForceConfig,
}

impl ForceField {
    pub fn new(config: ForceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForceConfig {
        &self.config
    }

    /// Acceleration for `particle` in its current state.
    ///
    /// A particle sitting exactly on the center gets no centripetal
    /// contribution rather than a NaN direction.
    pub fn acceleration<R: Rng + ?Sized>(&self, particle: &Particle, idle_factor: f32, rng: &mut R) -> Vec2 {
        self.acceleration_toward(particle, Vec2::ZERO, self.config.inside_wander, idle_factor, rng)
    }

    fn acceleration_toward<R: Rng + ?Sized>(
        &self,
        particle: &Particle,
        center: Vec2,
        wander: f32,
        idle_factor: f32,
        rng: &mut R,
    ) -> Vec2 {
        let to_center = (center - particle.position).normalize_or_zero();
        match particle.state {
            ParticleState::Outside => to_center * (self.config.outside_pull * idle_factor),
            ParticleState::Inside => {
                let heading = particle.velocity.y.atan2(particle.velocity.x);
                let spread = self.config.wander_spread.abs();
                let offset = rng.gen_range(-spread..=spread);
                Vec2::from_angle(heading + offset) * (wander * idle_factor)
            }
            ParticleState::Escaping => to_center * (self.config.escape_pull * idle_factor),
        }
    }

    /// Advance one particle by `dt` seconds against a fixed region snapshot.
    pub fn step<G: Region + ?Sized, R: Rng + ?Sized>(
        &self,
        particle: &mut Particle,
        region: &G,
        idle_factor: f32,
        dt: f32,
        rng: &mut R,
    ) {
        let inside = region.contains(particle.position);
        let next = particle.state.next(inside);
        if next != particle.state {
            trace!(key = %particle.key, from = %particle.state, to = %next, "state transition");
            particle.state = next;
        }

        let wander = region.wander().unwrap_or(self.config.inside_wander);
        let acc = self.acceleration_toward(particle, region.center(), wander, idle_factor, rng);
        particle.velocity += acc * dt;
        particle.velocity = self.constrain_velocity(particle.velocity, rng);
        particle.position += particle.velocity * dt;
    }

    /// Damp, then clamp speed to the envelope.
    ///
    /// Too fast is rescaled to `max_speed`. Too slow, or not finite, is
    /// replaced by a random heading at exactly `min_speed`, so a particle
    /// never stalls.
    pub fn constrain_velocity<R: Rng + ?Sized>(&self, velocity: Vec2, rng: &mut R) -> Vec2 {
        let damped = velocity * self.config.damping;
        let speed = damped.length();
        // A non-finite speed can never be rescaled back into range.
        if !speed.is_finite() || speed < self.config.min_speed {
            let angle = rng.gen_range(0.0..TAU);
            return Vec2::from_angle(angle) * self.config.min_speed;
        }
        if speed > self.config.max_speed {
            return damped * (self.config.max_speed / speed);
        }
        damped
    }
}
