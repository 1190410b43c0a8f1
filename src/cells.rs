//! Exploded layout: one container per particle.
//!
//! Besides the shared boundary the blob has a second layout. On
//! [`CellLayout::explode`] every particle gets its own small glass container,
//! a [`Cell`], and the cells fly out from the center to a slowly turning
//! ring. [`CellLayout::gather`] flies them back one by one, each with its own
//! delay, duration and easing. A particle's dot is hidden once it sinks into
//! the boundary, but its light keeps feeding the shared glow.
//!
//! | Mode | Physics region | Glass |
//! |---|---|---|
//! | `Gathered` | shared boundary | boundary |
//! | `Exploded` | own cell | cells |
//! | `Gathering` | shared boundary | boundary, plus cells still in flight |
//!
//! While a cell flies it carries its particle with it; such a particle is
//! *guided* and skips the force field until the flight lands.

use std::f32::consts::TAU;
use std::fmt;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::CellConfig;
use crate::easing::{Easing, Tween};
use crate::forces::Region;
use crate::registry::ParticleRegistry;
use crate::state::ParticleState;

/// Curves a returning cell picks from.
pub const GATHER_EASINGS: [Easing; 4] = [
    Easing::Power2InOut,
    Easing::Power3InOut,
    Easing::SineInOut,
    Easing::CircInOut,
];

/// Candidate ring phases tried by a re-layout.
pub const RELAYOUT_STEPS: usize = 60;

// ========== Shapes ==========

/// Outline of a container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellShape {
    #[default]
    Square,
    Circle,
    Triangle,
    Hex,
    Diamond,
}

impl CellShape {
    pub const ALL: [CellShape; 5] = [
        CellShape::Square,
        CellShape::Circle,
        CellShape::Triangle,
        CellShape::Hex,
        CellShape::Diamond,
    ];

    /// Tag the cell shader switches on.
    pub fn id(self) -> u32 {
        match self {
            CellShape::Square => 0,
            CellShape::Circle => 1,
            CellShape::Triangle => 2,
            CellShape::Hex => 3,
            CellShape::Diamond => 4,
        }
    }

    /// A random shape other than `self`.
    pub fn next<R: Rng + ?Sized>(self, rng: &mut R) -> CellShape {
        let others: Vec<CellShape> = Self::ALL.into_iter().filter(|&s| s != self).collect();
        others[rng.gen_range(0..others.len())]
    }

    /// Containment of a point given in the cell's own frame.
    ///
    /// `size` is the side length; every outline fits in a `size` box apart
    /// from the triangle and diamond tips, which reach `0.58` and `0.6` of it.
    pub fn contains_local(self, p: Vec2, size: f32) -> bool {
        let h = 0.5 * size;
        match self {
            CellShape::Square => p.x.abs() <= h && p.y.abs() <= h,
            CellShape::Circle => p.length() <= h,
            CellShape::Triangle => convex_contains(
                &[
                    Vec2::new(0.0, 0.58 * size),
                    Vec2::new(-h, -0.29 * size),
                    Vec2::new(h, -0.29 * size),
                ],
                p,
            ),
            CellShape::Hex => {
                let vertices: [Vec2; 6] = std::array::from_fn(|i| Vec2::from_angle(i as f32 * TAU / 6.0) * h);
                convex_contains(&vertices, p)
            }
            CellShape::Diamond => p.x.abs() / h + p.y.abs() / (0.6 * size) <= 1.0,
        }
    }
}

impl fmt::Display for CellShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CellShape::Square => "square",
            CellShape::Circle => "circle",
            CellShape::Triangle => "triangle",
            CellShape::Hex => "hex",
            CellShape::Diamond => "diamond",
        };
        f.write_str(name)
    }
}

/// Counter-clockwise convex polygon; edges count as inside.
fn convex_contains(vertices: &[Vec2], p: Vec2) -> bool {
    vertices
        .iter()
        .zip(vertices.iter().cycle().skip(1))
        .all(|(&a, &b)| (b - a).perp_dot(p - a) >= 0.0)
}

/// One particle's container.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cell {
    pub position: Vec2,
    /// Radians, counter-clockwise.
    pub rotation: f32,
    pub shape: CellShape,
    pub size: f32,
    pub wander: f32,
}

impl Cell {
    /// World point in the cell's own frame.
    pub fn to_local(&self, p: Vec2) -> Vec2 {
        Vec2::from_angle(-self.rotation).rotate(p - self.position)
    }

    pub fn contains(&self, p: Vec2) -> bool {
        self.shape.contains_local(self.to_local(p), self.size)
    }
}

impl Region for Cell {
    fn contains(&self, p: Vec2) -> bool {
        Cell::contains(self, p)
    }

    fn center(&self) -> Vec2 {
        self.position
    }

    fn wander(&self) -> Option<f32> {
        Some(self.wander)
    }
}

// ========== Ring ==========

/// Slot `index` of `count` evenly spaced ring positions, turned by `phase`.
pub fn ring_slot(index: usize, count: usize, radius: f32, phase: f32) -> Vec2 {
    let angle = index as f32 / count.max(1) as f32 * TAU + phase;
    Vec2::from_angle(angle) * radius
}

/// Ring phase that moves every `(slot, position)` pair into place with the
/// smallest worst-case displacement.
pub fn best_ring_phase(positions: &[(usize, Vec2)], count: usize, radius: f32) -> f32 {
    let mut best = (0.0, f32::INFINITY);
    for step in 0..RELAYOUT_STEPS {
        let phase = step as f32 / RELAYOUT_STEPS as f32 * TAU;
        let worst = positions
            .iter()
            .map(|&(i, p)| p.distance(ring_slot(i, count, radius, phase)))
            .fold(0.0, f32::max);
        if worst < best.1 {
            best = (phase, worst);
        }
    }
    best.0
}

// ========== Layout ==========

/// Which layout the blob is in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlobMode {
    /// Particles share the boundary.
    #[default]
    Gathered,
    /// Every particle lives in its own cell on the ring.
    Exploded,
    /// Cells are flying back; physics already uses the boundary.
    Gathering,
}

impl BlobMode {
    /// Whether the boundary glass is drawn.
    pub fn shows_boundary(self) -> bool {
        self != BlobMode::Exploded
    }
}

impl fmt::Display for BlobMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlobMode::Gathered => "gathered",
            BlobMode::Exploded => "exploded",
            BlobMode::Gathering => "gathering",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Destination {
    Ring,
    Center,
}

#[derive(Clone, Debug)]
struct Flight {
    destination: Destination,
    /// Seconds left before takeoff.
    delay: f32,
    progress: Tween,
    carries_particle: bool,
    /// Full turn over the flight.
    spins: bool,
    /// Cell and particle start points, fixed at takeoff.
    origin: Option<(Vec2, Option<Vec2>)>,
}

impl Flight {
    fn new(destination: Destination, delay: f32, duration: f32, easing: Easing) -> Self {
        Self {
            destination,
            delay,
            progress: Tween::scalar(0.0, 1.0, duration, easing),
            carries_particle: false,
            spins: false,
            origin: None,
        }
    }

    fn carrying(mut self) -> Self {
        self.carries_particle = true;
        self
    }

    fn spinning(mut self) -> Self {
        self.spins = true;
        self
    }

    fn is_guiding(&self) -> bool {
        matches!(self.origin, Some((_, Some(_))))
    }

    /// Extra rotation from a spinning flight.
    fn turn(&self) -> f32 {
        if self.spins && self.origin.is_some() {
            TAU * self.progress.eased()
        } else {
            0.0
        }
    }
}

#[derive(Clone, Debug)]
struct CellSlot {
    cell: Cell,
    /// Steady spin, without any flight turn.
    spin: f32,
    flight: Option<Flight>,
    /// Sunk into the boundary; no longer drawn or used as a region.
    absorbed: bool,
}

/// Cells for every registered particle, indexed like the registry.
#[derive(Clone, Debug)]
pub struct CellLayout {
    config: CellConfig,
    mode: BlobMode,
    shape: CellShape,
    slots: Vec<Option<CellSlot>>,
    ring_phase: f32,
    ring_radius: f32,
    ring_glide: Option<Tween>,
}

impl CellLayout {
    pub fn new(config: CellConfig) -> Self {
        let mode = if config.start_exploded {
            BlobMode::Exploded
        } else {
            BlobMode::Gathered
        };
        Self {
            mode,
            shape: config.shape,
            slots: Vec::new(),
            ring_phase: 0.0,
            ring_radius: config.ring_radius,
            ring_glide: None,
            config,
        }
    }

    pub fn config(&self) -> &CellConfig {
        &self.config
    }

    pub fn mode(&self) -> BlobMode {
        self.mode
    }

    /// Shape of the current (or most recent) cells.
    pub fn shape(&self) -> CellShape {
        self.shape
    }

    pub fn ring_radius(&self) -> f32 {
        self.ring_radius
    }

    pub fn ring_phase(&self) -> f32 {
        self.ring_phase
    }

    /// Cell of the particle at registry `index`, unless it has been absorbed.
    pub fn cell(&self, index: usize) -> Option<&Cell> {
        match self.slots.get(index) {
            Some(Some(slot)) if !slot.absorbed => Some(&slot.cell),
            _ => None,
        }
    }

    /// Visible cells with their registry index.
    pub fn cells(&self) -> impl Iterator<Item = (usize, &Cell)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| match slot {
            Some(slot) if !slot.absorbed => Some((i, &slot.cell)),
            _ => None,
        })
    }

    /// Number of visible cells.
    pub fn len(&self) -> usize {
        self.cells().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Physics region of the particle at `index`; `None` means the boundary.
    pub fn region(&self, index: usize) -> Option<&Cell> {
        if self.mode == BlobMode::Exploded {
            self.cell(index)
        } else {
            None
        }
    }

    /// Whether a flight is currently moving this particle.
    pub fn is_guided(&self, index: usize) -> bool {
        matches!(
            self.slots.get(index),
            Some(Some(CellSlot { flight: Some(flight), .. })) if flight.is_guiding()
        )
    }

    fn new_cell(&self, position: Vec2) -> Cell {
        Cell {
            position,
            rotation: 0.0,
            shape: self.shape,
            size: self.config.size,
            wander: self.config.wander,
        }
    }

    // ========== Transitions ==========

    /// Give every particle a cell and send the cells out to the ring.
    ///
    /// Particles become visible again and count as inside their cell. Returns
    /// `false` if the blob is already exploded.
    pub fn explode<R: Rng + ?Sized>(&mut self, particles: &mut ParticleRegistry, rng: &mut R) -> bool {
        if self.mode == BlobMode::Exploded {
            return false;
        }
        self.mode = BlobMode::Exploded;
        self.shape = self.shape.next(rng);
        self.ring_radius = self.config.ring_radius;
        self.ring_glide = None;

        let duration = self.config.explode_duration;
        let slots: Vec<Option<CellSlot>> = particles
            .iter_mut()
            .map(|particle| {
                particle.visible = true;
                particle.state = ParticleState::Inside;
                Some(CellSlot {
                    cell: self.new_cell(Vec2::ZERO),
                    spin: 0.0,
                    flight: Some(Flight::new(Destination::Ring, 0.0, duration, Easing::Power2Out).carrying().spinning()),
                    absorbed: false,
                })
            })
            .collect();
        self.slots = slots;

        info!(cells = self.slots.len(), shape = %self.shape, "exploded");
        true
    }

    /// Fly every cell back to the center.
    ///
    /// Cell `i` leaves after `i * gather_stagger` plus a random extra delay
    /// and takes a random duration and easing. Returns `false` unless the
    /// blob is exploded.
    pub fn gather<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.mode != BlobMode::Exploded {
            return false;
        }
        self.mode = BlobMode::Gathering;
        self.ring_glide = Some(Tween::scalar(
            self.ring_radius,
            self.config.gather_radius,
            self.config.relayout_duration,
            Easing::Power2InOut,
        ));

        let config = &self.config;
        for (i, slot) in self.slots.iter_mut().enumerate() {
            let Some(slot) = slot else { continue };
            let delay = i as f32 * config.gather_stagger + rng.gen::<f32>() * config.gather_delay_jitter;
            let duration = config.gather_base + rng.gen::<f32>() * config.gather_jitter;
            let easing = GATHER_EASINGS[rng.gen_range(0..GATHER_EASINGS.len())];
            slot.spin += slot.flight.as_ref().map_or(0.0, Flight::turn);
            slot.flight = Some(Flight::new(Destination::Center, delay, duration, easing).carrying());
        }

        info!(cells = self.len(), "gathering");
        if self.slots.iter().all(Option::is_none) {
            self.finish_gather();
        }
        true
    }

    /// Give a newly registered particle a cell while exploded.
    ///
    /// The cell starts at the particle and every cell then glides to the
    /// ring phase that disturbs the layout least.
    pub fn attach(&mut self, index: usize, position: Vec2) {
        if self.mode != BlobMode::Exploded {
            return;
        }
        if self.slots.len() <= index {
            self.slots.resize(index + 1, None);
        }
        self.slots[index] = Some(CellSlot {
            cell: self.new_cell(position),
            spin: 0.0,
            flight: None,
            absorbed: false,
        });
        self.relayout();
    }

    fn relayout(&mut self) {
        let count = self.slots.len();
        let positions: Vec<(usize, Vec2)> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|s| (i, s.cell.position)))
            .collect();
        self.ring_phase = best_ring_phase(&positions, count, self.ring_radius);

        let duration = self.config.relayout_duration;
        for slot in self.slots.iter_mut().flatten() {
            slot.spin += slot.flight.as_ref().map_or(0.0, Flight::turn);
            slot.flight = Some(Flight::new(Destination::Ring, 0.0, duration, Easing::Power2InOut));
        }
        debug!(cells = positions.len(), phase = self.ring_phase, "relayout");
    }

    fn finish_gather(&mut self) {
        self.slots.clear();
        self.ring_radius = self.config.ring_radius;
        self.ring_glide = None;
        self.mode = BlobMode::Gathered;
        info!("gathered");
    }

    // ========== Frame ==========

    /// Turn the ring, spin the cells and move every flight by `dt` seconds.
    ///
    /// Returning particles are hidden once within `hide_radius` of the
    /// center. Returns the new mode when a gather completes.
    pub fn advance(&mut self, dt: f32, particles: &mut ParticleRegistry, hide_radius: f32) -> Option<BlobMode> {
        if self.slots.is_empty() {
            return None;
        }

        self.ring_phase = (self.ring_phase + self.config.ring_speed * dt).rem_euclid(TAU);
        if let Some(glide) = &mut self.ring_glide {
            self.ring_radius = glide.advance(dt).x;
            if glide.is_finished() {
                self.ring_glide = None;
            }
        }

        let count = self.slots.len();
        let (radius, phase, spin_speed) = (self.ring_radius, self.ring_phase, self.config.spin_speed);
        for ((index, entry), particle) in self.slots.iter_mut().enumerate().zip(particles.iter_mut()) {
            let Some(slot) = entry.as_mut() else { continue };
            slot.spin = (slot.spin + spin_speed * dt).rem_euclid(TAU);
            let ring = ring_slot(index, count, radius, phase);

            let Some(flight) = &mut slot.flight else {
                slot.cell.position = ring;
                slot.cell.rotation = slot.spin;
                continue;
            };

            if flight.origin.is_none() {
                flight.delay -= dt;
                if flight.delay > 0.0 {
                    slot.cell.position = ring;
                    slot.cell.rotation = slot.spin;
                    continue;
                }
                let carried = flight.carries_particle.then_some(particle.position);
                flight.origin = Some((slot.cell.position, carried));
            }

            flight.progress.advance(dt);
            let t = flight.progress.eased();
            let target = match flight.destination {
                Destination::Ring => ring,
                Destination::Center => Vec2::ZERO,
            };
            if let Some((cell_from, particle_from)) = flight.origin {
                slot.cell.position = cell_from.lerp(target, t);
                if let Some(from) = particle_from {
                    particle.position = from.lerp(target, t);
                }
            }
            slot.cell.rotation = slot.spin + flight.turn();

            if flight.destination == Destination::Center {
                if particle.visible && particle.position.length() <= hide_radius {
                    particle.visible = false;
                    debug!(key = %particle.key, "particle absorbed");
                }
                slot.absorbed |= slot.cell.position.length() <= hide_radius;
            }

            if !flight.progress.is_finished() {
                continue;
            }
            let (destination, turn) = (flight.destination, flight.turn());
            match destination {
                Destination::Ring => {
                    slot.spin += turn;
                    slot.flight = None;
                }
                Destination::Center => *entry = None,
            }
        }

        if self.mode == BlobMode::Gathering && self.slots.iter().all(Option::is_none) {
            self.finish_gather();
            return Some(BlobMode::Gathered);
        }
        None
    }

    /// Drop every cell. A gather in progress counts as finished.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.ring_glide = None;
        self.ring_radius = self.config.ring_radius;
        if self.mode == BlobMode::Gathering {
            self.mode = BlobMode::Gathered;
        }
    }
}
