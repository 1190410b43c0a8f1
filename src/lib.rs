//! # glowblob
//!
//! A glowing, organic blob of keyword particles.
//!
//! Every spoken keyword becomes a particle that flies in from a ring, gets
//! pulled into a wobbling boundary and wanders around inside it. The
//! particles light the boundary from within: each frame the first
//! [`MAX_LIGHTS`] of them are published as point lights for a glass shader.
//!
//! ## Quick Start
//!
//! ```ignore
//! use glowblob::prelude::*;
//!
//! let mut sim = Simulation::new(BlobConfig::default());
//! let mut clock = FrameClock::new();
//!
//! sim.spawn("Beijing");
//! sim.spawn("Shanghai");
//!
//! loop {
//!     let payload = sim.frame(clock.update());
//!     let uniforms = payload.to_uniforms(&sim.config().lights, aspect, 1.5, clock.elapsed());
//!     // upload `uniforms` and `payload.dot_instances()`, draw
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Boundary
//!
//! A star-shaped region around the origin given by a radial function. The
//! wavy shape has one lobe more per particle (clamped), with a deformation
//! amplitude that decays as lobes are added. See [`boundary`].
//!
//! ### Particle states
//!
//! | State | Force |
//! |---|---|
//! | `Outside` (fresh) | strong pull to the center |
//! | `Inside` | random wander |
//! | `Escaping` (was inside) | gentle pull to the center |
//!
//! See [`state`] and [`forces`].
//!
//! ### Entry choreography
//!
//! New keywords animate in before they are simulated. Playback goes through
//! the [`Animator`] trait; [`Timeline`] is the built-in player.
//!
//! ### Exploded layout
//!
//! [`Simulation::explode`] gives every particle its own small container on a
//! turning ring; [`Simulation::gather`] flies them back into the boundary,
//! where the dots disappear but the lights keep glowing. See [`cells`].
//!
//! ### Backend input
//!
//! [`transcript`] decodes keyword messages and status polls into
//! [`Simulation::spawn`] calls and [`ActivitySignal`]s.
//!
//! ## Feature flags
//!
//! - `viewer`: the [`gpu`] renderer and the `glowblob-viewer` binary.

pub mod boundary;
pub mod cells;
pub mod config;
pub mod easing;
pub mod error;
pub mod forces;
#[cfg(feature = "viewer")]
pub mod gpu;
pub mod lights;
pub mod particle;
pub mod registry;
pub mod shader;
mod simulation;
pub mod spawn;
pub mod state;
pub mod time;
pub mod timeline;
pub mod transcript;
pub mod uniforms;

pub use boundary::{Boundary, ShapeKind, ShapeParams};
pub use bytemuck;
pub use cells::{BlobMode, Cell, CellLayout, CellShape};
pub use config::{BlobConfig, BoundaryConfig, CellConfig, ForceConfig, LightConfig, SpawnConfig, MAX_AMPLITUDE};
pub use easing::{Easing, Tween};
#[cfg(feature = "viewer")]
pub use error::GpuError;
pub use error::{ConfigError, TranscriptError};
pub use forces::{ForceField, Region};
pub use glam::{Vec2, Vec3, Vec4};
pub use lights::{LightAggregator, LightBuffer, LightSelection, LightSource, MAX_LIGHTS};
pub use particle::{keyword_color, normalize_key, Particle};
pub use registry::ParticleRegistry;
pub use simulation::{Simulation, SpawnOutcome};
pub use spawn::{Choreography, CompletedEntry, EntryPhase, EntryTicket, EntryView};
pub use state::ParticleState;
pub use time::FrameClock;
pub use timeline::{Animator, Timeline, TweenId};
pub use transcript::{ActivitySignal, StatusTracker, StatusUpdate, TranscriptMessage};
pub use uniforms::{CellInstance, DotInstance, GlassUniforms, RenderPayload, ShapeUniform, ViewUniforms};

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use glowblob::prelude::*;
/// ```
pub mod prelude {
    pub use crate::boundary::{Boundary, ShapeKind, ShapeParams};
    pub use crate::cells::{BlobMode, CellShape};
    pub use crate::config::BlobConfig;
    pub use crate::easing::Easing;
    #[cfg(feature = "viewer")]
    pub use crate::error::GpuError;
    pub use crate::lights::{LightBuffer, LightSelection, MAX_LIGHTS};
    pub use crate::particle::Particle;
    pub use crate::simulation::{Simulation, SpawnOutcome};
    pub use crate::state::ParticleState;
    pub use crate::time::FrameClock;
    pub use crate::timeline::{Animator, Timeline};
    pub use crate::transcript::{ActivitySignal, StatusTracker};
    pub use crate::uniforms::RenderPayload;
    pub use crate::{Vec2, Vec3, Vec4};
}
