//! Easing curves and single-property tweens.
//!
//! Used by the boundary to glide between lobe counts and by the entry
//! choreography's built-in [`Timeline`](crate::timeline::Timeline).

use std::f32::consts::PI;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Easing curve mapping normalized time `t ∈ [0, 1]` to progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    /// Symmetric sine ease, slow at both ends.
    #[default]
    SineInOut,
    /// Quadratic ease in and out.
    Power2InOut,
    /// Quadratic ease out.
    Power2Out,
    /// Cubic ease in and out.
    Power3InOut,
    /// Circular ease in and out.
    CircInOut,
    /// Overshoots slightly past the target before settling.
    BackOut,
}

impl Easing {
    /// Evaluate the curve. `t` is clamped to `[0, 1]`.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::SineInOut => -((PI * t).cos() - 1.0) * 0.5,
            Easing::Power2InOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) * 0.5
                }
            }
            Easing::Power2Out => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::Power3InOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) * 0.5
                }
            }
            Easing::CircInOut => {
                if t < 0.5 {
                    (1.0 - (1.0 - (2.0 * t).powi(2)).sqrt()) * 0.5
                } else {
                    ((1.0 - (-2.0 * t + 2.0).powi(2)).sqrt() + 1.0) * 0.5
                }
            }
            Easing::BackOut => {
                const C1: f32 = 1.70158;
                const C3: f32 = C1 + 1.0;
                let u = t - 1.0;
                1.0 + C3 * u * u * u + C1 * u * u
            }
        }
    }
}

/// Linear interpolation between two floats.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// One property moving from `from` to `to` over `duration` seconds.
///
/// Scalars use the `x` lane and leave `y` at zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tween {
    pub from: Vec2,
    pub to: Vec2,
    pub duration: f32,
    pub easing: Easing,
    elapsed: f32,
}

impl Tween {
    pub fn new(from: Vec2, to: Vec2, duration: f32, easing: Easing) -> Self {
        Self {
            from,
            to,
            duration: duration.max(0.0),
            easing,
            elapsed: 0.0,
        }
    }

    pub fn scalar(from: f32, to: f32, duration: f32, easing: Easing) -> Self {
        Self::new(Vec2::new(from, 0.0), Vec2::new(to, 0.0), duration, easing)
    }

    /// Advance by `dt` seconds and return the new value.
    pub fn advance(&mut self, dt: f32) -> Vec2 {
        self.elapsed = (self.elapsed + dt.max(0.0)).min(self.duration);
        self.value()
    }

    /// Normalized time in `[0, 1]`. Zero-length tweens are always finished.
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            self.elapsed / self.duration
        }
    }

    pub fn value(&self) -> Vec2 {
        if self.is_finished() {
            return self.to;
        }
        self.from.lerp(self.to, self.easing.apply(self.progress()))
    }

    pub fn is_finished(&self) -> bool {
        self.progress() >= 1.0
    }

    /// Eased progress; exactly 1 once finished.
    pub fn eased(&self) -> f32 {
        if self.is_finished() {
            1.0
        } else {
            self.easing.apply(self.progress())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 7] = [
        Easing::Linear,
        Easing::SineInOut,
        Easing::Power2InOut,
        Easing::Power2Out,
        Easing::Power3InOut,
        Easing::CircInOut,
        Easing::BackOut,
    ];

    #[test]
    fn test_easing_endpoints() {
        for easing in ALL {
            assert!(easing.apply(0.0).abs() < 1e-5, "{easing:?} at 0");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-5, "{easing:?} at 1");
        }
    }

    #[test]
    fn test_in_out_curves_are_symmetric() {
        for easing in [
            Easing::SineInOut,
            Easing::Power2InOut,
            Easing::Power3InOut,
            Easing::CircInOut,
        ] {
            assert!((easing.apply(0.5) - 0.5).abs() < 1e-5);
            let a = easing.apply(0.2);
            let b = easing.apply(0.8);
            assert!((a + b - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_back_out_overshoots() {
        let peak = (1..100)
            .map(|i| Easing::BackOut.apply(i as f32 / 100.0))
            .fold(0.0f32, f32::max);
        assert!(peak > 1.0);
    }

    #[test]
    fn test_tween_reaches_target_and_stops() {
        let mut tween = Tween::scalar(3.0, 8.0, 0.35, Easing::SineInOut);
        assert!(!tween.is_finished());
        tween.advance(0.2);
        let mid = tween.value().x;
        assert!(mid > 3.0 && mid < 8.0);
        tween.advance(1.0);
        assert!(tween.is_finished());
        assert_eq!(tween.value().x, 8.0);
    }

    #[test]
    fn test_zero_duration_tween_is_immediate() {
        let tween = Tween::scalar(0.0, 1.0, 0.0, Easing::Linear);
        assert!(tween.is_finished());
        assert_eq!(tween.value().x, 1.0);
    }
}
