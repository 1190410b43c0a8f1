//! The simulation context.
//!
//! [`Simulation`] owns everything the blob needs between frames: the particle
//! registry, the boundary, the entry choreography, the force field and the
//! RNG. The host drives it from a single loop:
//!
//! ```ignore
//! let mut sim = Simulation::new(BlobConfig::default());
//! sim.spawn("Beijing");
//! loop {
//!     let payload = sim.frame(clock.update());
//!     renderer.draw(&payload);
//! }
//! ```
//!
//! A frame runs in a fixed order:
//!
//! 1. entry animations advance; finished entries are registered and the
//!    boundary retargets its lobe count,
//! 2. the boundary advances once and the cell layout moves its flights, then
//!    every registered particle that no flight is carrying is stepped against
//!    its region, in registry order: the same boundary snapshot for all of
//!    them, or its own cell while the blob is exploded,
//! 3. lights are published.
//!
//! [`explode`](Simulation::explode) and [`gather`](Simulation::gather) switch
//! between the shared boundary and one container per particle; see
//! [`cells`](crate::cells).

use std::collections::HashSet;

use glam::Vec2;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::boundary::Boundary;
use crate::cells::{BlobMode, CellLayout};
use crate::config::BlobConfig;
use crate::forces::ForceField;
use crate::lights::{LightAggregator, LightBuffer};
use crate::particle::{keyword_color, normalize_key};
use crate::registry::ParticleRegistry;
use crate::spawn::{Choreography, EntryTicket, EntryView};
use crate::timeline::{Animator, Timeline};
use crate::transcript::ActivitySignal;
use crate::uniforms::{CellInstance, DotInstance, RenderPayload};

/// What a [`Simulation::spawn`] call did.
#[derive(Clone, Debug, PartialEq)]
pub enum SpawnOutcome {
    /// Empty after trimming, or on the ignore list.
    Ignored,
    /// Key already registered; its particle pulses.
    Pulsed,
    /// Key is still playing its entry sequence; nothing changes.
    AlreadyEntering,
    /// New key; its entry sequence has started.
    Entering(EntryTicket),
}

/// Keyword particle blob.
#[derive(Debug)]
pub struct Simulation {
    config: BlobConfig,
    registry: ParticleRegistry,
    boundary: Boundary,
    cells: CellLayout,
    forces: ForceField,
    lights: LightAggregator,
    choreography: Choreography,
    /// Normalized ignore list.
    ignored: HashSet<String>,
    idle_factor: f32,
    rng: SmallRng,
}

impl Simulation {
    /// Create an empty blob with the built-in [`Timeline`] and an entropy-seeded RNG.
    pub fn new(config: BlobConfig) -> Self {
        let ignored = config
            .spawn
            .ignored_keywords
            .iter()
            .filter_map(|k| normalize_key(k))
            .collect();

        Self {
            registry: ParticleRegistry::new(),
            boundary: Boundary::new(config.boundary.clone()),
            cells: CellLayout::new(config.cells.clone()),
            forces: ForceField::new(config.forces.clone()),
            lights: LightAggregator::new(&config.lights),
            choreography: Choreography::new(config.spawn.clone(), Box::new(Timeline::new())),
            ignored,
            idle_factor: 1.0,
            rng: SmallRng::from_entropy(),
            config,
        }
    }

    /// Seed the RNG for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    /// Play entry animations through a host-provided animator.
    pub fn with_animator(mut self, animator: Box<dyn Animator>) -> Self {
        self.choreography.set_animator(animator);
        self
    }

    pub fn config(&self) -> &BlobConfig {
        &self.config
    }

    // ========== Inputs ==========

    /// Feed one keyword.
    ///
    /// Keys are compared after trimming and lowercasing, so repeated calls
    /// for the same word never create a second particle.
    pub fn spawn(&mut self, text: &str) -> SpawnOutcome {
        let Some(key) = normalize_key(text) else {
            return SpawnOutcome::Ignored;
        };
        if self.ignored.contains(&key) {
            debug!(key = %key, "ignored keyword");
            return SpawnOutcome::Ignored;
        }

        if let Some(particle) = self.registry.get_mut(&key) {
            let spawn = &self.config.spawn;
            particle.trigger_pulse(spawn.pulse_duration, spawn.pulse_amplitude);
            debug!(key = %key, "pulse");
            return SpawnOutcome::Pulsed;
        }

        let color = keyword_color(&key);
        match self.choreography.request(&key, text.trim(), color) {
            Some(ticket) => SpawnOutcome::Entering(ticket),
            None => SpawnOutcome::AlreadyEntering,
        }
    }

    /// Scale every force by `value`. Negative and non-finite values are
    /// treated as zero.
    pub fn set_idle_factor(&mut self, value: f32) {
        let value = if value.is_finite() {
            value.max(0.0)
        } else {
            warn!(value, "non-finite idle factor, using 0");
            0.0
        };
        if value != self.idle_factor {
            debug!(from = self.idle_factor, to = value, "idle factor");
        }
        self.idle_factor = value;
    }

    pub fn idle_factor(&self) -> f32 {
        self.idle_factor
    }

    /// Map a backend activity change onto the idle factor.
    pub fn apply_activity(&mut self, signal: ActivitySignal) {
        let value = match signal {
            ActivitySignal::Active => 1.0,
            ActivitySignal::Idle => self.config.forces.idle_factor,
        };
        self.set_idle_factor(value);
    }

    // ========== Frame ==========

    /// Advance entry animations and register the entries that finished.
    ///
    /// Returns how many particles joined the registry.
    pub fn advance_entries(&mut self, dt: f32) -> usize {
        let settle_radius = self.boundary.params().max_extent() + self.config.spawn.settle_margin;
        let completed = self.choreography.advance(dt, settle_radius);
        if completed.is_empty() {
            return 0;
        }

        let mut registered = 0;
        for entry in completed {
            let key = entry.key.clone();
            let position = entry.position;
            match self.registry.insert(entry.into_particle()) {
                Ok(index) => {
                    registered += 1;
                    self.cells.attach(index, position);
                    debug!(key = %key, count = self.registry.len(), "registered");
                }
                Err(_) => warn!(key = %key, "entry completed for a key that is already registered"),
            }
        }
        self.boundary.update_lobe_count_for_population(self.registry.len());
        registered
    }

    /// Step the boundary and every registered particle by `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> RenderPayload {
        self.boundary.advance(dt);
        let shape = self.boundary.params();
        self.cells.advance(dt, &mut self.registry, shape.base_radius);

        for (index, particle) in self.registry.iter_mut().enumerate() {
            if !self.cells.is_guided(index) {
                match self.cells.region(index) {
                    Some(cell) => self.forces.step(particle, cell, self.idle_factor, dt, &mut self.rng),
                    None => self.forces.step(particle, &shape, self.idle_factor, dt, &mut self.rng),
                }
            }
            particle.advance_pulse(dt);
        }

        self.render_payload()
    }

    /// One full frame: entries, then [`tick`](Self::tick).
    pub fn frame(&mut self, dt: f32) -> RenderPayload {
        self.advance_entries(dt);
        self.tick(dt)
    }

    // ========== Layout ==========

    /// Give every particle its own container on the ring.
    ///
    /// Hidden particles reappear. Returns `false` if already exploded.
    pub fn explode(&mut self) -> bool {
        self.cells.explode(&mut self.registry, &mut self.rng)
    }

    /// Fly the containers back into the boundary.
    ///
    /// Each particle's dot disappears as it arrives; its light stays. Returns
    /// `false` unless exploded.
    pub fn gather(&mut self) -> bool {
        self.cells.gather(&mut self.rng)
    }

    /// Gather when exploded, explode otherwise. Returns the mode after the switch.
    pub fn toggle_layout(&mut self) -> BlobMode {
        if self.cells.mode() == BlobMode::Exploded {
            self.gather();
        } else {
            self.explode();
        }
        self.cells.mode()
    }

    pub fn mode(&self) -> BlobMode {
        self.cells.mode()
    }

    pub fn cells(&self) -> &CellLayout {
        &self.cells
    }

    // ========== Outputs ==========

    /// Current light buffer.
    pub fn publish(&self) -> LightBuffer {
        self.lights.publish(&self.registry, &self.boundary)
    }

    /// Lights, boundary parameters and dots for the current state.
    pub fn render_payload(&self) -> RenderPayload {
        let mut dots: Vec<DotInstance> = self
            .registry
            .iter()
            .filter(|p| p.visible)
            .map(|p| DotInstance::new(p.position, p.render_scale(), p.color))
            .collect();
        dots.extend(
            self.choreography
                .pending()
                .map(|e| DotInstance::new(e.position, e.particle_scale, e.color)),
        );

        let glow = &self.config.cells;
        let alpha = self.config.lights.alpha;
        let particles = self.registry.as_slice();
        let cells = self
            .cells
            .cells()
            .filter_map(|(i, cell)| {
                let p = particles.get(i)?;
                Some(CellInstance::new(cell, p.position, p.color, glow.glow_radius, glow.intensity, alpha))
            })
            .collect();

        RenderPayload {
            lights: self.publish(),
            shape: self.boundary.params(),
            dots,
            mode: self.cells.mode(),
            cells,
        }
    }

    /// Number of registered particles.
    pub fn particle_count(&self) -> usize {
        self.registry.len()
    }

    pub fn registry(&self) -> &ParticleRegistry {
        &self.registry
    }

    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    /// Entries still animating in.
    pub fn pending_entries(&self) -> impl Iterator<Item = EntryView<'_>> {
        self.choreography.pending()
    }

    /// Position of a registered particle.
    pub fn position_of(&self, key: &str) -> Option<Vec2> {
        self.registry.get(key).map(|p| p.position)
    }

    /// Drop every particle and in-flight entry.
    pub fn reset(&mut self) {
        info!(
            particles = self.registry.len(),
            pending = self.choreography.len(),
            "scene reset"
        );
        self.registry.clear();
        self.choreography.reset();
        self.cells.reset();
        self.boundary.update_lobe_count_for_population(0);
    }
}
