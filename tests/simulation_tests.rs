//! Integration tests for the blob simulation.
//!
//! These drive [`Simulation`] through its public API with a seeded RNG and
//! check the behavioral guarantees: containment, speed envelope, state
//! machine history, light capacity, lobe clamping and idempotent spawns,
//! plus the explode and gather layout switch.

use std::collections::HashMap;

use glowblob::prelude::*;
use glowblob::TweenId;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const DT: f32 = 1.0 / 60.0;
const MIN_SPEED: f32 = 0.05;
const MAX_SPEED: f32 = 0.5;
const EPS: f32 = 1e-4;

fn sim() -> Simulation {
    Simulation::new(BlobConfig::default()).with_seed(1234)
}

/// Run frames until every requested entry has been registered.
fn settle_entries(sim: &mut Simulation) {
    for _ in 0..600 {
        sim.frame(DT);
        if sim.pending_entries().next().is_none() {
            return;
        }
    }
    panic!("entries never completed");
}

fn spawn_all(sim: &mut Simulation, words: &[&str]) {
    for word in words {
        sim.spawn(word);
    }
    settle_entries(sim);
}

// ============================================================================
// Boundary
// ============================================================================

#[test]
fn test_containment_matches_radial_formula_while_growing() {
    let mut sim = sim();
    let mut rng = SmallRng::seed_from_u64(9);
    for (i, word) in ["a", "b", "c", "d", "e", "f"].iter().enumerate() {
        sim.spawn(word);
        for _ in 0..(10 + i * 7) {
            sim.frame(DT);
            let params = sim.boundary().params();
            for _ in 0..50 {
                let p = Vec2::new(rng.gen_range(-0.4..0.4), rng.gen_range(-0.4..0.4));
                let expected = p.x.hypot(p.y) <= params.radius_at(p.y.atan2(p.x));
                assert_eq!(sim.boundary().contains(p), expected);
            }
        }
    }
}

#[test]
fn test_lobes_stay_clamped_for_large_populations() {
    let mut sim = sim();
    let words: Vec<String> = (0..40).map(|i| format!("word{i}")).collect();
    for word in &words {
        sim.spawn(word);
    }
    for _ in 0..600 {
        sim.frame(DT);
        let k = sim.boundary().target_lobes();
        assert!((3..=16).contains(&k));
        let lobes = sim.boundary().params().lobes;
        assert!((3.0..=16.0).contains(&lobes), "lobes {lobes}");
    }
    assert_eq!(sim.particle_count(), 40);
    assert_eq!(sim.boundary().target_lobes(), 16);
}

// ============================================================================
// Forces and states
// ============================================================================

#[test]
fn test_speed_stays_in_envelope() {
    let mut sim = sim();
    spawn_all(&mut sim, &["north", "south", "east", "west", "up", "down", "left", "right"]);

    for _ in 0..1200 {
        sim.frame(DT);
        for p in sim.registry().iter() {
            let speed = p.speed();
            assert!(
                (MIN_SPEED - EPS..=MAX_SPEED + EPS).contains(&speed),
                "{} has speed {speed}",
                p.key
            );
        }
    }
}

#[test]
fn test_entered_particles_never_revert_to_outside() {
    let mut sim = sim();
    spawn_all(&mut sim, &["one", "two", "three", "four"]);

    let mut entered: HashMap<String, bool> = HashMap::new();
    for _ in 0..1500 {
        sim.frame(DT);
        for p in sim.registry().iter() {
            let seen = entered.entry(p.key.clone()).or_insert(false);
            if *seen {
                assert_ne!(p.state, ParticleState::Outside, "{} reverted", p.key);
            }
            *seen |= p.state.has_entered();
        }
    }
    assert!(entered.values().all(|&e| e));
}

#[test]
fn test_zero_idle_factor_drifts_at_min_speed() {
    let mut sim = sim();
    spawn_all(&mut sim, &["calm", "still", "quiet"]);
    for _ in 0..120 {
        sim.frame(DT);
    }

    sim.set_idle_factor(0.0);
    for _ in 0..900 {
        sim.frame(DT);
    }

    let before: Vec<Vec2> = sim.registry().iter().map(|p| p.position).collect();
    for _ in 0..60 {
        sim.frame(DT);
        for p in sim.registry().iter() {
            assert!((p.speed() - MIN_SPEED).abs() < EPS, "{} speed {}", p.key, p.speed());
        }
    }
    let after: Vec<Vec2> = sim.registry().iter().map(|p| p.position).collect();
    for (a, b) in before.iter().zip(&after) {
        assert!(a.distance(*b) > 0.0);
    }
}

#[test]
fn test_infinite_idle_factor_keeps_motion_finite() {
    let mut sim = sim();
    spawn_all(&mut sim, &["alpha", "beta", "gamma"]);

    sim.set_idle_factor(f32::INFINITY);
    sim.frame(DT);
    sim.set_idle_factor(1.0);
    for _ in 0..60 {
        sim.frame(DT);
        for p in sim.registry().iter() {
            assert!(p.position.is_finite(), "{} at {}", p.key, p.position);
            let speed = p.speed();
            assert!((MIN_SPEED - EPS..=MAX_SPEED + EPS).contains(&speed), "{} speed {speed}", p.key);
        }
    }
}

// ============================================================================
// Spawning
// ============================================================================

#[test]
fn test_duplicate_spawn_keeps_one_particle() {
    let mut sim = sim();
    sim.spawn("Beijing");
    sim.spawn("Beijing");
    settle_entries(&mut sim);
    assert_eq!(sim.spawn("Beijing"), SpawnOutcome::Pulsed);
    settle_entries(&mut sim);

    assert_eq!(sim.particle_count(), 1);
    let keys: Vec<_> = sim.registry().iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, ["beijing"]);
}

#[test]
fn test_five_keyword_scenario() {
    let mut sim = sim();
    let words = ["Beijing", "Shanghai", "Tokyo", "Paris", "London"];
    for word in words {
        assert!(matches!(sim.spawn(word), SpawnOutcome::Entering(_)));
    }

    // Record the state each particle has when it first shows up.
    let mut first_state: HashMap<String, ParticleState> = HashMap::new();
    let mut entered: HashMap<String, bool> = HashMap::new();
    for _ in 0..900 {
        sim.advance_entries(DT);
        for p in sim.registry().iter() {
            first_state.entry(p.key.clone()).or_insert(p.state);
        }
        sim.tick(DT);
        for p in sim.registry().iter() {
            *entered.entry(p.key.clone()).or_insert(false) |= p.state == ParticleState::Inside;
        }
    }

    assert_eq!(sim.particle_count(), 5);
    assert_eq!(first_state.len(), 5);
    assert!(first_state.values().all(|&s| s == ParticleState::Outside));
    assert!(entered.values().all(|&e| e), "not every particle got inside: {entered:?}");

    let lights = sim.publish();
    assert_eq!(lights.count, 5);
    assert!((lights.intensity - 0.75 / 5f32.powf(0.3)).abs() < 1e-5);
    assert!((lights.intensity - 0.497).abs() < 1e-3);
}

#[test]
fn test_light_capacity_keeps_earliest_registered() {
    let mut sim = sim();
    let words: Vec<String> = (0..MAX_LIGHTS + 5).map(|i| format!("kw{i}")).collect();
    for word in &words {
        sim.spawn(word);
    }
    settle_entries(&mut sim);
    let payload = sim.frame(DT);

    assert_eq!(sim.particle_count(), MAX_LIGHTS + 5);
    assert_eq!(payload.count(), MAX_LIGHTS);
    let expected: Vec<Vec2> = sim
        .registry()
        .iter()
        .take(MAX_LIGHTS)
        .map(|p| p.position)
        .collect();
    assert_eq!(payload.positions(), expected);

    let first_keys: Vec<_> = sim.registry().iter().take(3).map(|p| p.key.clone()).collect();
    assert_eq!(first_keys, ["kw0", "kw1", "kw2"]);
}

#[test]
fn test_ignored_keywords_from_config() {
    let config = BlobConfig::from_toml_str(
        r#"
        [spawn]
        ignored_keywords = ["Hello", "豆包"]
        "#,
    )
    .unwrap();
    let mut sim = Simulation::new(config).with_seed(3);
    assert_eq!(sim.spawn("  hello "), SpawnOutcome::Ignored);
    assert_eq!(sim.spawn("豆包"), SpawnOutcome::Ignored);
    assert!(matches!(sim.spawn("world"), SpawnOutcome::Entering(_)));
}

// ============================================================================
// Animator seam
// ============================================================================

/// Finishes every animation on the next advance.
#[derive(Default)]
struct InstantAnimator {
    inner: Timeline,
}

impl Animator for InstantAnimator {
    fn animate_to(&mut self, from: Vec2, to: Vec2, _duration: f32, easing: Easing) -> TweenId {
        self.inner.animate_to(from, to, 1.0, easing)
    }

    fn sample(&self, id: TweenId) -> Option<Vec2> {
        self.inner.sample(id)
    }

    fn advance(&mut self, _dt: f32) -> Vec<TweenId> {
        self.inner.advance(1.0)
    }

    fn cancel(&mut self, id: TweenId) {
        self.inner.cancel(id);
    }

    fn clear(&mut self) {
        self.inner.clear();
    }
}

#[test]
fn test_custom_animator_drives_registration() {
    let mut sim = sim().with_animator(Box::new(InstantAnimator::default()));
    sim.spawn("fast");

    // Appear completes on the first frame, the flight on the second.
    sim.frame(DT);
    assert_eq!(sim.particle_count(), 0);
    sim.frame(DT);
    assert_eq!(sim.particle_count(), 1);

    let p = sim.registry().get("fast").unwrap();
    let settle = sim.boundary().params().max_extent() + sim.config().spawn.settle_margin;
    assert!(p.position.length() > sim.boundary().params().base_radius);
    assert!(p.position.length() < settle + 0.1);
}

// ============================================================================
// Polygon container
// ============================================================================

#[test]
fn test_polygon_container_confines_particles() {
    let config = BlobConfig::from_toml_str(
        r#"
        [boundary.shape]
        kind = "polygon"
        sides = 6
        "#,
    )
    .unwrap();
    let mut sim = Simulation::new(config).with_seed(77);
    spawn_all(&mut sim, &["hex", "agon", "cell"]);

    let extent = sim.boundary().params().max_extent();
    let mut entered: HashMap<String, bool> = HashMap::new();
    for _ in 0..1200 {
        sim.frame(DT);
        for p in sim.registry().iter() {
            *entered.entry(p.key.clone()).or_insert(false) |= p.state == ParticleState::Inside;
            // Escapes are short excursions before the pull turns them around.
            assert!(p.position.length() < extent + 0.6, "{} drifted away", p.key);
        }
    }
    assert!(entered.values().all(|&e| e));
}

// ============================================================================
// Explode and gather
// ============================================================================

fn run(sim: &mut Simulation, seconds: f32) {
    for _ in 0..(seconds / DT) as usize {
        sim.frame(DT);
    }
}

#[test]
fn test_explode_gather_round_trip() {
    let mut sim = sim();
    let words = ["red", "green", "blue", "cyan"];
    spawn_all(&mut sim, &words);
    run(&mut sim, 2.0);
    let first_shape = sim.cells().shape();

    assert!(sim.explode());
    assert_eq!(sim.mode(), BlobMode::Exploded);
    assert_ne!(sim.cells().shape(), first_shape);
    run(&mut sim, 1.5);

    // Each particle roams its own container; escapes are short excursions.
    let mut seen_inside = vec![false; words.len()];
    for _ in 0..300 {
        sim.frame(DT);
        for (i, p) in sim.registry().iter().enumerate() {
            let cell = sim.cells().region(i).expect("cell");
            assert!(p.position.distance(cell.position) < 0.5, "{} left its cell", p.key);
            seen_inside[i] |= cell.contains(p.position);
        }
    }
    assert!(seen_inside.iter().all(|&s| s));
    assert!(!sim.render_payload().shows_boundary());

    // Gather: dots vanish, lights stay.
    assert!(sim.gather());
    assert!(!sim.gather());
    run(&mut sim, 3.0);
    assert_eq!(sim.mode(), BlobMode::Gathered);
    assert!(sim.registry().iter().all(|p| !p.visible));
    let payload = sim.frame(DT);
    assert!(payload.shows_boundary());
    assert!(payload.cell_instances().is_empty());
    assert!(payload.dot_instances().is_empty());
    assert_eq!(payload.count(), words.len());

    // Exploding again brings them back with a different container.
    let gathered_shape = sim.cells().shape();
    sim.explode();
    assert_ne!(sim.cells().shape(), gathered_shape);
    let payload = sim.frame(DT);
    assert_eq!(payload.dot_instances().len(), words.len());
    assert_eq!(payload.cell_instances().len(), words.len());
}

#[test]
fn test_start_exploded_from_config() {
    let config = BlobConfig::from_toml_str(
        r#"
        [cells]
        start_exploded = true
        shape = "hex"
        "#,
    )
    .unwrap();
    let mut sim = Simulation::new(config).with_seed(8);
    assert_eq!(sim.mode(), BlobMode::Exploded);
    spawn_all(&mut sim, &["one", "two"]);
    run(&mut sim, 1.0);

    let cells: Vec<_> = sim.cells().cells().map(|(_, c)| *c).collect();
    assert_eq!(cells.len(), 2);
    assert!(cells.iter().all(|c| c.shape == CellShape::Hex));
    assert!(cells.iter().all(|c| (c.position.length() - 0.3).abs() < 1e-3));
}
