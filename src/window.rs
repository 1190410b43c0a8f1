use std::sync::mpsc::Receiver;
use std::sync::Arc;

use glowblob::gpu::GpuState;
use glowblob::prelude::*;
use tracing::{error, info};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::ActiveEventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

/// Cycled through by the `A` key.
const DEMO_KEYWORDS: &[&str] = &[
    "Beijing", "Shanghai", "Tokyo", "Paris", "London", "Berlin", "Lagos", "Lima", "Seoul", "Oslo",
    "Cairo", "Delhi", "Rome", "Quito", "Hanoi", "Dakar", "Kyiv", "Perth", "Accra", "Bogota",
    "Havana", "Nairobi",
];

pub struct App {
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
    sim: Simulation,
    clock: FrameClock,
    keywords: Receiver<Vec<String>>,
    demo_index: usize,
    idle: bool,
}

impl App {
    pub fn new(sim: Simulation, keywords: Receiver<Vec<String>>) -> Self {
        Self {
            window: None,
            gpu_state: None,
            sim,
            clock: FrameClock::new(),
            keywords,
            demo_index: 0,
            idle: false,
        }
    }

    fn drain_keywords(&mut self) {
        while let Ok(batch) = self.keywords.try_recv() {
            for word in batch {
                self.sim.spawn(&word);
            }
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, code: KeyCode) {
        match code {
            KeyCode::KeyA => {
                let word = DEMO_KEYWORDS[self.demo_index % DEMO_KEYWORDS.len()];
                self.demo_index += 1;
                let outcome = self.sim.spawn(word);
                info!(word, ?outcome, "demo keyword");
            }
            KeyCode::KeyI => {
                self.idle = !self.idle;
                let signal = if self.idle {
                    ActivitySignal::Idle
                } else {
                    ActivitySignal::Active
                };
                self.sim.apply_activity(signal);
                info!(idle = self.idle, factor = self.sim.idle_factor(), "activity toggled");
            }
            KeyCode::KeyS => {
                let mode = self.sim.toggle_layout();
                info!(%mode, "layout");
            }
            KeyCode::KeyR => self.sim.reset(),
            KeyCode::Space => self.clock.toggle_pause(),
            KeyCode::Escape => event_loop.exit(),
            _ => {}
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let window_attrs = Window::default_attributes()
            .with_title("glowblob")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("{}", GpuError::from(e));
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window.clone());

        let style = self.sim.config().lights.clone();
        match pollster::block_on(GpuState::new(window, style)) {
            Ok(state) => self.gpu_state = Some(state),
            Err(e) => {
                error!("{e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.resize(physical_size);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(event_loop, code),
            WindowEvent::RedrawRequested => {
                self.drain_keywords();
                let dt = self.clock.update();
                let payload = self.sim.frame(dt);

                if let Some(gpu_state) = &mut self.gpu_state {
                    match gpu_state.render(&payload, self.clock.elapsed()) {
                        Ok(_) => {}
                        Err(wgpu::SurfaceError::Lost) => gpu_state.resize(winit::dpi::PhysicalSize {
                            width: gpu_state.config.width,
                            height: gpu_state.config.height,
                        }),
                        Err(wgpu::SurfaceError::OutOfMemory) => event_loop.exit(),
                        Err(e) => error!("Render error: {e:?}"),
                    }
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}
