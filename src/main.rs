//! Reference viewer.
//!
//! ```text
//! glowblob-viewer [config.toml]
//! ```
//!
//! Keys: `A` spawn the next demo keyword, `I` toggle idle, `S` explode or
//! gather, `R` reset, `Space` pause, `Esc` quit. Each line on stdin is either a transcript JSON
//! message or plain words, and its keywords are spawned.

mod window;

use std::io::BufRead;
use std::sync::mpsc;
use std::thread;

use glowblob::prelude::*;
use glowblob::transcript::keywords_from_line;
use tracing_subscriber::EnvFilter;
use winit::event_loop::{ControlFlow, EventLoop};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => BlobConfig::load(path)?,
        None => BlobConfig::default(),
    };
    let sim = Simulation::new(config);

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let words = keywords_from_line(&line);
            if !words.is_empty() && tx.send(words).is_err() {
                break;
            }
        }
    });

    let event_loop = EventLoop::new().map_err(GpuError::from)?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = window::App::new(sim, rx);
    event_loop.run_app(&mut app).map_err(GpuError::from)?;
    Ok(())
}
