//! Typed GPU payloads.
//!
//! The simulation hands the renderer a [`RenderPayload`] once per frame. The
//! renderer turns it into plain-old-data structs whose layout mirrors the
//! WGSL declarations in [`shader`](crate::shader):
//!
//! | Rust | WGSL | Size |
//! |---|---|---|
//! | [`LightSource`] | `Light` | 32 |
//! | [`ShapeUniform`] | `Shape` | 32 |
//! | [`GlassUniforms`] | `Glass` | 720 |
//! | [`ViewUniforms`] | `View` | 16 |
//! | [`DotInstance`] | vertex attributes 0..=2 | 32 |
//! | [`CellInstance`] | vertex attributes 0..=5 | 64 |
//!
//! Layouts are checked by size tests below and by the naga validation tests
//! in the shader module.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use crate::boundary::{ShapeKind, ShapeParams};
use crate::cells::{BlobMode, Cell};
use crate::config::LightConfig;
use crate::lights::{LightBuffer, LightSource, MAX_LIGHTS};

/// `Shape.kind` value for the wavy blob.
pub const SHAPE_WAVY: u32 = 0;
/// `Shape.kind` value for the regular polygon.
pub const SHAPE_POLYGON: u32 = 1;

/// Boundary parameters as read by the glass shader's mask.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ShapeUniform {
    pub base_radius: f32,
    pub lobes: f32,
    pub amplitude: f32,
    pub phase: f32,
    pub kind: u32,
    pub sides: u32,
    pub _pad: [u32; 2],
}

impl From<ShapeParams> for ShapeUniform {
    fn from(params: ShapeParams) -> Self {
        let (kind, sides) = match params.kind {
            ShapeKind::Wavy => (SHAPE_WAVY, 0),
            ShapeKind::Polygon { sides } => (SHAPE_POLYGON, sides.max(3)),
        };
        Self {
            base_radius: params.base_radius,
            lobes: params.lobes,
            amplitude: params.amplitude,
            phase: params.phase,
            kind,
            sides,
            _pad: [0; 2],
        }
    }
}

/// Uniform block of the glass pass.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GlassUniforms {
    pub lights: [LightSource; MAX_LIGHTS],
    pub shape: ShapeUniform,
    pub light_count: u32,
    pub intensity: f32,
    pub glow_radius: f32,
    pub grain_scale: f32,
    pub grain_amount: f32,
    pub alpha: f32,
    /// Width over height of the surface.
    pub aspect: f32,
    pub time: f32,
    /// Clip-space units per world unit along y.
    pub view_scale: f32,
    pub _pad: [f32; 3],
}

/// Uniform block of the dot pass.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ViewUniforms {
    pub aspect: f32,
    pub view_scale: f32,
    /// Dot radius in world units at scale 1.
    pub dot_radius: f32,
    pub _pad: f32,
}

impl ViewUniforms {
    pub fn new(aspect: f32, view_scale: f32, dot_radius: f32) -> Self {
        Self {
            aspect,
            view_scale,
            dot_radius,
            _pad: 0.0,
        }
    }
}

/// Per-instance vertex data for one particle dot.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct DotInstance {
    pub position: [f32; 2],
    /// Size multiplier (pulse, entry grow).
    pub scale: f32,
    pub _pad: f32,
    pub color: [f32; 4],
}

impl DotInstance {
    pub fn new(position: Vec2, scale: f32, color: Vec3) -> Self {
        Self {
            position: position.to_array(),
            scale,
            _pad: 0.0,
            color: color.extend(1.0).to_array(),
        }
    }
}

/// Per-instance vertex data for one container.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CellInstance {
    pub position: [f32; 2],
    /// Position of the particle lighting this cell.
    pub light: [f32; 2],
    /// Rotation, side length, glow radius, intensity.
    pub params: [f32; 4],
    pub color: [f32; 4],
    /// [`CellShape::id`](crate::cells::CellShape::id).
    pub shape: u32,
    pub alpha: f32,
    pub _pad: [f32; 2],
}

impl CellInstance {
    pub fn new(cell: &Cell, light: Vec2, color: Vec3, glow_radius: f32, intensity: f32, alpha: f32) -> Self {
        Self {
            position: cell.position.to_array(),
            light: light.to_array(),
            params: [cell.rotation, cell.size, glow_radius, intensity],
            color: color.extend(1.0).to_array(),
            shape: cell.shape.id(),
            alpha,
            _pad: [0.0; 2],
        }
    }
}

/// Everything the renderer needs for one frame.
#[derive(Clone, Debug)]
pub struct RenderPayload {
    pub lights: LightBuffer,
    pub shape: ShapeParams,
    /// Visible registered particles followed by in-flight entries.
    pub dots: Vec<DotInstance>,
    pub mode: BlobMode,
    /// Containers still on screen; empty while gathered.
    pub cells: Vec<CellInstance>,
}

impl RenderPayload {
    /// Number of published lights.
    pub fn count(&self) -> usize {
        self.lights.count
    }

    pub fn intensity(&self) -> f32 {
        self.lights.intensity
    }

    pub fn positions(&self) -> Vec<Vec2> {
        self.lights.positions()
    }

    pub fn colors(&self) -> Vec<Vec3> {
        self.lights.colors()
    }

    pub fn dot_instances(&self) -> &[DotInstance] {
        &self.dots
    }

    pub fn cell_instances(&self) -> &[CellInstance] {
        &self.cells
    }

    /// Whether the boundary glass pass runs this frame.
    pub fn shows_boundary(&self) -> bool {
        self.mode.shows_boundary()
    }

    /// Pack the glass pass uniform block.
    pub fn to_uniforms(&self, style: &LightConfig, aspect: f32, view_scale: f32, time: f32) -> GlassUniforms {
        GlassUniforms {
            lights: self.lights.lights,
            shape: self.shape.into(),
            light_count: self.lights.count as u32,
            intensity: self.lights.intensity,
            glow_radius: style.glow_radius,
            grain_scale: style.grain_scale,
            grain_amount: style.grain_amount,
            alpha: style.alpha,
            aspect,
            time,
            view_scale,
            _pad: [0.0; 3],
        }
    }
}
