//! Keyword particles.
//!
//! Each particle stands for one spoken keyword. Its identity is the
//! normalized keyword (trimmed, lowercased); its color is hashed from that key
//! so the same word always glows the same hue.

use std::f32::consts::PI;

use glam::{Vec2, Vec3};

use crate::state::ParticleState;

/// Normalize raw keyword text into a registry key.
///
/// Returns `None` for text that is empty after trimming.
pub fn normalize_key(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Stable color for a key: hashed hue at fixed saturation and lightness.
///
/// Hashes UTF-16 code units with `h = h * 131 + unit` so colors agree with
/// the browser front-end for the same word.
pub fn keyword_color(key: &str) -> Vec3 {
    let h = key
        .encode_utf16()
        .fold(0u32, |h, unit| h.wrapping_mul(131).wrapping_add(unit as u32));
    let hue = (h % 360) as f32 / 360.0;
    hsl_to_rgb(hue, 0.75, 0.55)
}

/// Convert HSL (all channels `0..=1`) to linear RGB.
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> Vec3 {
    if s <= 0.0 {
        return Vec3::splat(l);
    }
    let h = h.rem_euclid(1.0);
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h * 6.0) % 2.0 - 1.0).abs());
    let m = l - c * 0.5;

    let (r, g, b) = match (h * 6.0) as u32 % 6 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    Vec3::new(r + m, g + m, b + m)
}

/// Short-lived size bump shown when a keyword is heard again.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pulse {
    elapsed: f32,
    duration: f32,
    amplitude: f32,
}

impl Pulse {
    pub fn new(duration: f32, amplitude: f32) -> Self {
        Self {
            elapsed: 0.0,
            duration,
            amplitude,
        }
    }

    /// Size multiplier: rises to `1 + amplitude` halfway, back to 1 at the end.
    pub fn scale(&self) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        let t = (self.elapsed / self.duration).clamp(0.0, 1.0);
        1.0 + self.amplitude * (PI * t).sin()
    }

    fn advance(&mut self, dt: f32) -> bool {
        self.elapsed += dt;
        self.elapsed < self.duration
    }
}

/// A simulated keyword particle.
#[derive(Clone, Debug)]
pub struct Particle {
    /// Normalized keyword; unique within the registry.
    pub key: String,
    /// Keyword as first heard, for the label renderer.
    pub label: String,
    pub position: Vec2,
    pub velocity: Vec2,
    /// RGB, fixed at creation.
    pub color: Vec3,
    pub state: ParticleState,
    /// Logically alive but drawn only through the aggregate glow when `false`.
    pub visible: bool,
    pulse: Option<Pulse>,
}

impl Particle {
    /// A particle at `position`, at rest, in the `Outside` state.
    pub fn new(key: impl Into<String>, label: impl Into<String>, position: Vec2, color: Vec3) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            position,
            velocity: Vec2::ZERO,
            color,
            state: ParticleState::Outside,
            visible: true,
            pulse: None,
        }
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// Start (or restart) the duplicate-keyword pulse.
    pub fn trigger_pulse(&mut self, duration: f32, amplitude: f32) {
        self.pulse = Some(Pulse::new(duration, amplitude));
    }

    pub fn is_pulsing(&self) -> bool {
        self.pulse.is_some()
    }

    /// Advance the pulse, dropping it once finished.
    pub fn advance_pulse(&mut self, dt: f32) {
        if let Some(pulse) = &mut self.pulse {
            if !pulse.advance(dt) {
                self.pulse = None;
            }
        }
    }

    /// Rendered size multiplier.
    pub fn render_scale(&self) -> f32 {
        self.pulse.map_or(1.0, |p| p.scale())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("  Beijing "), Some("beijing".to_string()));
        assert_eq!(normalize_key("BEIJING"), Some("beijing".to_string()));
        assert_eq!(normalize_key("   "), None);
        assert_eq!(normalize_key(""), None);
    }

    #[test]
    fn test_keyword_color_is_stable() {
        assert_eq!(keyword_color("beijing"), keyword_color("beijing"));
        assert_ne!(keyword_color("beijing"), keyword_color("shanghai"));
    }

    #[test]
    fn test_keyword_color_hue() {
        // "a" hashes to 97 -> hue 97/360.
        let expected = hsl_to_rgb(97.0 / 360.0, 0.75, 0.55);
        assert_eq!(keyword_color("a"), expected);
    }

    #[test]
    fn test_hsl_to_rgb_red() {
        let red = hsl_to_rgb(0.0, 0.75, 0.55);
        assert!((red.x - 0.8875).abs() < 1e-5);
        assert!((red.y - 0.2125).abs() < 1e-5);
        assert!((red.z - 0.2125).abs() < 1e-5);
    }

    #[test]
    fn test_hsl_grey_without_saturation() {
        assert_eq!(hsl_to_rgb(0.3, 0.0, 0.4), Vec3::splat(0.4));
    }

    #[test]
    fn test_new_particle_starts_outside_and_visible() {
        let p = Particle::new("beijing", "Beijing", Vec2::new(0.5, 0.0), Vec3::ONE);
        assert_eq!(p.state, ParticleState::Outside);
        assert!(p.visible);
        assert_eq!(p.velocity, Vec2::ZERO);
        assert_eq!(p.render_scale(), 1.0);
    }

    #[test]
    fn test_pulse_peaks_and_expires() {
        let mut p = Particle::new("k", "k", Vec2::ZERO, Vec3::ONE);
        p.trigger_pulse(0.5, 0.6);
        p.advance_pulse(0.25);
        assert!((p.render_scale() - 1.6).abs() < 1e-4);
        p.advance_pulse(0.3);
        assert!(!p.is_pulsing());
        assert_eq!(p.render_scale(), 1.0);
    }
}
