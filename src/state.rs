//! Per-particle containment state machine.
//!
//! ```text
//!            inside              !inside
//! OUTSIDE ──────────▶ INSIDE ◀──────────▶ ESCAPING
//!                            inside
//! ```
//!
//! A new particle starts `Outside` and needs the strong recall force to get
//! in. Once it has been inside it can only ever be `Inside` or `Escaping`;
//! there is no edge back to `Outside`.

use std::fmt;

/// Where a particle is relative to the boundary, with history.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ParticleState {
    /// Freshly spawned, has not yet reached the region.
    #[default]
    Outside,
    /// Currently within the region.
    Inside,
    /// Was inside and has slipped out.
    Escaping,
}

impl ParticleState {
    /// Next state given this tick's containment test.
    pub fn next(self, inside: bool) -> ParticleState {
        match (self, inside) {
            (ParticleState::Outside, true) => ParticleState::Inside,
            (ParticleState::Outside, false) => ParticleState::Outside,
            (ParticleState::Inside, true) => ParticleState::Inside,
            (ParticleState::Inside, false) => ParticleState::Escaping,
            (ParticleState::Escaping, true) => ParticleState::Inside,
            (ParticleState::Escaping, false) => ParticleState::Escaping,
        }
    }

    /// `true` once the particle has entered the region at least once.
    pub fn has_entered(self) -> bool {
        self != ParticleState::Outside
    }

    pub fn name(self) -> &'static str {
        match self {
            ParticleState::Outside => "OUTSIDE",
            ParticleState::Inside => "INSIDE",
            ParticleState::Escaping => "ESCAPING",
        }
    }
}

impl fmt::Display for ParticleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
