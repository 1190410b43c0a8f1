//! Entry choreography for new keywords.
//!
//! A new keyword does not join the simulation immediately. It plays a short
//! entry sequence first:
//!
//! 1. **Appear**: the particle pops up on a ring around the blob while the
//!    word's label shrinks away (`label_shrink`) and the dot grows in with a
//!    slight overshoot (`particle_grow`).
//! 2. **Fly**: the dot travels from the ring to a settle point just outside
//!    the boundary (`fly_duration`).
//!
//! Only when the fly animation reports completion is the particle handed back
//! as a [`CompletedEntry`] for registration. Until then it takes no part in
//! forces, containment or lighting.
//!
//! Ring positions follow a golden-angle sequence so successive entries land
//! far apart without remembering where earlier ones went.
//!
//! ```ignore
//! let mut choreo = Choreography::new(SpawnConfig::default(), Box::new(Timeline::new()));
//! choreo.request("beijing", "Beijing", color);
//! for done in choreo.advance(dt, settle_radius) {
//!     registry.insert(done.into_particle());
//! }
//! ```

use glam::{Vec2, Vec3};
use tracing::debug;

use crate::config::SpawnConfig;
use crate::easing::Easing;
use crate::particle::Particle;
use crate::timeline::{Animator, TweenId};

/// Angular step between successive entries, `π(3 − √5)`.
pub const GOLDEN_ANGLE: f32 = 2.399_963_2;

/// Angle of the `index`-th entry on the spawn ring.
#[inline]
pub fn golden_angle(index: u32) -> f32 {
    (index as f32 * GOLDEN_ANGLE).rem_euclid(std::f32::consts::TAU)
}

/// Point at `angle` on a circle of `radius` around the origin.
#[inline]
pub fn ring_position(angle: f32, radius: f32) -> Vec2 {
    Vec2::from_angle(angle) * radius
}

/// Which part of the entry sequence an entry is in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryPhase {
    Appear,
    Fly,
}

/// Receipt for an accepted entry request.
#[derive(Clone, Debug, PartialEq)]
pub struct EntryTicket {
    pub key: String,
    /// Position in the golden-angle sequence.
    pub index: u32,
    /// Where the particle appears.
    pub ring_position: Vec2,
}

/// A finished entry, ready to become a registered particle.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletedEntry {
    pub key: String,
    pub label: String,
    pub color: Vec3,
    /// Where the fly animation ended.
    pub position: Vec2,
}

impl CompletedEntry {
    /// A fresh `Outside` particle at the settle point.
    pub fn into_particle(self) -> Particle {
        Particle::new(self.key, self.label, self.position, self.color)
    }
}

/// Render-side view of an in-flight entry.
#[derive(Clone, Copy, Debug)]
pub struct EntryView<'a> {
    pub key: &'a str,
    pub label: &'a str,
    pub color: Vec3,
    pub phase: EntryPhase,
    pub position: Vec2,
    /// Label size multiplier, 1 when heard and 0 once shrunk away.
    pub label_scale: f32,
    /// Dot size multiplier.
    pub particle_scale: f32,
}

#[derive(Debug)]
struct Entry {
    key: String,
    label: String,
    color: Vec3,
    index: u32,
    ring: Vec2,
    phase: EntryPhase,
    label_tween: TweenId,
    grow_tween: TweenId,
    label_done: bool,
    grow_done: bool,
    fly_tween: Option<TweenId>,
}

/// Drives entry animations through an [`Animator`].
pub struct Choreography {
    config: SpawnConfig,
    animator: Box<dyn Animator>,
    entries: Vec<Entry>,
    /// Next golden-angle index.
    cursor: u32,
}

impl std::fmt::Debug for Choreography {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Choreography")
            .field("entries", &self.entries)
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

impl Choreography {
    pub fn new(config: SpawnConfig, animator: Box<dyn Animator>) -> Self {
        Self {
            config,
            animator,
            entries: Vec::new(),
            cursor: 0,
        }
    }

    pub fn config(&self) -> &SpawnConfig {
        &self.config
    }

    /// Swap the animation backend. In-flight entries are abandoned.
    pub fn set_animator(&mut self, animator: Box<dyn Animator>) {
        self.entries.clear();
        self.animator = animator;
    }

    /// `true` if `key` is currently playing its entry sequence.
    pub fn is_pending(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Start the entry sequence for a new key.
    ///
    /// Returns `None` if `key` is already entering.
    pub fn request(&mut self, key: &str, label: &str, color: Vec3) -> Option<EntryTicket> {
        if self.is_pending(key) {
            return None;
        }

        let index = self.cursor;
        self.cursor = self.cursor.wrapping_add(1);
        let ring = ring_position(golden_angle(index), self.config.ring_radius);

        let label_tween = self
            .animator
            .animate_to(Vec2::X, Vec2::ZERO, self.config.label_shrink, Easing::Power2Out);
        let grow_tween = self
            .animator
            .animate_to(Vec2::ZERO, Vec2::X, self.config.particle_grow, Easing::BackOut);

        debug!(key, index, x = ring.x, y = ring.y, "entry requested");
        self.entries.push(Entry {
            key: key.to_string(),
            label: label.to_string(),
            color,
            index,
            ring,
            phase: EntryPhase::Appear,
            label_tween,
            grow_tween,
            label_done: false,
            grow_done: false,
            fly_tween: None,
        });

        Some(EntryTicket {
            key: key.to_string(),
            index,
            ring_position: ring,
        })
    }

    /// Advance the animations and collect entries whose flight finished.
    ///
    /// `settle_radius` is the distance from the center at which a flight
    /// started this call will end.
    pub fn advance(&mut self, dt: f32, settle_radius: f32) -> Vec<CompletedEntry> {
        let finished = self.animator.advance(dt);
        let mut completed = Vec::new();

        for id in finished {
            let Some(pos) = self.entries.iter().position(|e| {
                e.label_tween == id || e.grow_tween == id || e.fly_tween == Some(id)
            }) else {
                continue;
            };

            let entry = &mut self.entries[pos];
            match entry.phase {
                EntryPhase::Appear => {
                    if entry.label_tween == id {
                        entry.label_done = true;
                    }
                    if entry.grow_tween == id {
                        entry.grow_done = true;
                    }
                    if entry.label_done && entry.grow_done {
                        self.animator.cancel(entry.label_tween);
                        self.animator.cancel(entry.grow_tween);
                        let settle = entry.ring.normalize_or_zero() * settle_radius;
                        let fly = self.animator.animate_to(
                            entry.ring,
                            settle,
                            self.config.fly_duration,
                            Easing::Power2InOut,
                        );
                        entry.fly_tween = Some(fly);
                        entry.phase = EntryPhase::Fly;
                    }
                }
                EntryPhase::Fly => {
                    let position = self.animator.sample(id).unwrap_or(entry.ring);
                    self.animator.cancel(id);
                    let entry = self.entries.remove(pos);
                    debug!(key = %entry.key, index = entry.index, "entry completed");
                    completed.push(CompletedEntry {
                        key: entry.key,
                        label: entry.label,
                        color: entry.color,
                        position,
                    });
                }
            }
        }

        completed
    }

    /// In-flight entries in request order.
    pub fn pending(&self) -> impl Iterator<Item = EntryView<'_>> {
        self.entries.iter().map(|e| {
            let (position, label_scale, particle_scale) = match e.phase {
                EntryPhase::Appear => (
                    e.ring,
                    self.animator.sample(e.label_tween).map_or(1.0, |v| v.x),
                    self.animator.sample(e.grow_tween).map_or(0.0, |v| v.x),
                ),
                EntryPhase::Fly => (
                    e.fly_tween
                        .and_then(|id| self.animator.sample(id))
                        .unwrap_or(e.ring),
                    0.0,
                    1.0,
                ),
            };
            EntryView {
                key: &e.key,
                label: &e.label,
                color: e.color,
                phase: e.phase,
                position,
                label_scale,
                particle_scale,
            }
        })
    }

    /// Abandon every in-flight entry and restart the golden-angle sequence.
    pub fn reset(&mut self) {
        self.animator.clear();
        self.entries.clear();
        self.cursor = 0;
    }
}
