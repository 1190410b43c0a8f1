//! Animation timeline seam.
//!
//! Entry choreography does not own any tween playback. It asks an
//! [`Animator`] to move a value toward a target and only reacts to the
//! completion signals returned from [`Animator::advance`]. Hosts with their
//! own animation system can plug it in through
//! [`Simulation::with_animator`](crate::Simulation::with_animator); the
//! built-in [`Timeline`] plays tweens on the frame clock.

use std::collections::BTreeMap;

use glam::Vec2;

use crate::easing::{Easing, Tween};

/// Handle to one running animation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TweenId(u64);

impl TweenId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// "Animate this value toward a target over a duration with easing."
pub trait Animator {
    /// Start an animation; it begins at `from` on the next advance.
    fn animate_to(&mut self, from: Vec2, to: Vec2, duration: f32, easing: Easing) -> TweenId;

    /// Current value, or `None` for unknown or cancelled ids.
    ///
    /// A finished animation keeps reporting its target until cancelled.
    fn sample(&self, id: TweenId) -> Option<Vec2>;

    /// Step every animation by `dt` seconds.
    ///
    /// Returns the ids that finished during this call; each id is reported
    /// exactly once.
    fn advance(&mut self, dt: f32) -> Vec<TweenId>;

    /// Forget an animation.
    fn cancel(&mut self, id: TweenId);

    /// Forget every animation.
    fn clear(&mut self);
}

/// One tracked tween and whether its completion went out.
#[derive(Debug)]
struct Playback {
    tween: Tween,
    reported: bool,
}

/// Built-in tween runner.
#[derive(Debug, Default)]
pub struct Timeline {
    next_id: u64,
    /// Ordered by id so completions come out in start order.
    tweens: BTreeMap<TweenId, Playback>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of animations still tracked (running or finished but not cancelled).
    pub fn len(&self) -> usize {
        self.tweens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweens.is_empty()
    }
}

impl Animator for Timeline {
    fn animate_to(&mut self, from: Vec2, to: Vec2, duration: f32, easing: Easing) -> TweenId {
        let id = TweenId(self.next_id);
        self.next_id += 1;
        self.tweens.insert(
            id,
            Playback {
                tween: Tween::new(from, to, duration, easing),
                reported: false,
            },
        );
        id
    }

    fn sample(&self, id: TweenId) -> Option<Vec2> {
        self.tweens.get(&id).map(|p| p.tween.value())
    }

    fn advance(&mut self, dt: f32) -> Vec<TweenId> {
        let mut finished = Vec::new();
        for (&id, playback) in self.tweens.iter_mut().filter(|(_, p)| !p.reported) {
            playback.tween.advance(dt);
            if playback.tween.is_finished() {
                playback.reported = true;
                finished.push(id);
            }
        }
        finished
    }

    fn cancel(&mut self, id: TweenId) {
        self.tweens.remove(&id);
    }

    fn clear(&mut self) {
        self.tweens.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_reported_once() {
        let mut tl = Timeline::new();
        let id = tl.animate_to(Vec2::ZERO, Vec2::ONE, 0.5, Easing::Linear);

        assert!(tl.advance(0.3).is_empty());
        let mid = tl.sample(id).unwrap();
        assert!((mid.x - 0.6).abs() < 1e-5);

        assert_eq!(tl.advance(0.3), vec![id]);
        assert_eq!(tl.sample(id), Some(Vec2::ONE));
        assert!(tl.advance(0.3).is_empty());
    }

    #[test]
    fn test_completions_in_start_order() {
        let mut tl = Timeline::new();
        let a = tl.animate_to(Vec2::ZERO, Vec2::X, 0.2, Easing::Linear);
        let b = tl.animate_to(Vec2::ZERO, Vec2::Y, 0.1, Easing::Linear);
        assert_eq!(tl.advance(0.5), vec![a, b]);
    }

    #[test]
    fn test_zero_duration_finishes_on_first_advance() {
        let mut tl = Timeline::new();
        let id = tl.animate_to(Vec2::ZERO, Vec2::X, 0.0, Easing::SineInOut);
        assert_eq!(tl.sample(id), Some(Vec2::X));
        assert_eq!(tl.advance(0.0), vec![id]);
    }

    #[test]
    fn test_many_finished_tweens_report_once_each() {
        let mut tl = Timeline::new();
        let ids: Vec<_> = (0..2000)
            .map(|i| tl.animate_to(Vec2::ZERO, Vec2::X, (i % 7) as f32 * 0.1, Easing::Linear))
            .collect();

        let mut seen = tl.advance(0.35);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        seen.extend(tl.advance(1.0));
        assert!(tl.advance(1.0).is_empty());

        seen.sort();
        assert_eq!(seen, ids);
        assert_eq!(tl.len(), 2000);
    }

    #[test]
    fn test_cancel_and_clear() {
        let mut tl = Timeline::new();
        let a = tl.animate_to(Vec2::ZERO, Vec2::X, 1.0, Easing::Linear);
        let b = tl.animate_to(Vec2::ZERO, Vec2::Y, 1.0, Easing::Linear);
        tl.cancel(a);
        assert!(tl.sample(a).is_none());
        assert_eq!(tl.len(), 1);
        assert_eq!(tl.advance(2.0), vec![b]);

        tl.clear();
        assert!(tl.is_empty());
        assert!(tl.sample(b).is_none());
    }
}
