//! The set of live particles.
//!
//! Particles are kept in insertion order; that order decides which particles
//! win a light slot once the population exceeds [`MAX_LIGHTS`](crate::MAX_LIGHTS).
//! A key index gives O(1) lookup by normalized keyword.

use std::collections::HashMap;

use crate::particle::Particle;

/// Insertion-ordered particle storage with keyed lookup.
#[derive(Clone, Debug, Default)]
pub struct ParticleRegistry {
    /// Ordered by registration.
    particles: Vec<Particle>,
    /// Key -> index into `particles`.
    indices: HashMap<String, usize>,
}

impl ParticleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a particle under its key.
    ///
    /// Returns the particle back if the key is already taken; the registry
    /// is left unchanged in that case.
    pub fn insert(&mut self, particle: Particle) -> Result<usize, Particle> {
        if self.indices.contains_key(&particle.key) {
            return Err(particle);
        }
        let idx = self.particles.len();
        self.indices.insert(particle.key.clone(), idx);
        self.particles.push(particle);
        Ok(idx)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.indices.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Particle> {
        self.indices.get(key).map(|&idx| &self.particles[idx])
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Particle> {
        self.indices.get(key).map(|&idx| &mut self.particles[idx])
    }

    /// Registration position of `key`.
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.indices.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Iterate in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Particle> {
        self.particles.iter_mut()
    }

    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    /// Drop every particle (scene reset).
    pub fn clear(&mut self) {
        self.particles.clear();
        self.indices.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec2, Vec3};

    fn particle(key: &str) -> Particle {
        Particle::new(key, key, Vec2::ZERO, Vec3::ONE)
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut reg = ParticleRegistry::new();
        assert_eq!(reg.insert(particle("a")).unwrap(), 0);
        assert_eq!(reg.insert(particle("b")).unwrap(), 1);

        assert_eq!(reg.len(), 2);
        assert!(reg.contains("a"));
        assert_eq!(reg.get("b").map(|p| p.key.as_str()), Some("b"));
        assert_eq!(reg.index_of("b"), Some(1));
        assert!(reg.get("c").is_none());
    }

    #[test]
    fn test_duplicate_key_is_rejected() {
        let mut reg = ParticleRegistry::new();
        reg.insert(particle("a")).unwrap();
        let back = reg.insert(particle("a")).unwrap_err();
        assert_eq!(back.key, "a");
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_iteration_follows_insertion_order() {
        let mut reg = ParticleRegistry::new();
        for key in ["z", "a", "m"] {
            reg.insert(particle(key)).unwrap();
        }
        let keys: Vec<_> = reg.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn test_get_mut_and_clear() {
        let mut reg = ParticleRegistry::new();
        reg.insert(particle("a")).unwrap();
        reg.get_mut("a").unwrap().visible = false;
        assert!(!reg.get("a").unwrap().visible);

        reg.clear();
        assert!(reg.is_empty());
        assert!(!reg.contains("a"));
    }
}
