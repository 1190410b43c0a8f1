//! WGSL generation for the viewer's two passes.
//!
//! - The **glass pass** draws a full-screen triangle, discards every fragment
//!   outside the boundary and lights the rest from the published particle
//!   lights, with a little film grain on top.
//! - The **dot pass** draws one instanced quad per particle.
//! - The **cell pass** draws one instanced, rotated quad per container while
//!   the blob is exploded, masked to the container outline and lit by the
//!   container's own particle.
//!
//! The boundary's radial function is emitted once by [`boundary_wgsl`] and
//! mirrors [`ShapeParams::radius_at`](crate::boundary::ShapeParams::radius_at)
//! term for term, so the mask and the containment test agree.

use crate::cells::CellShape;
use crate::lights::MAX_LIGHTS;
use crate::uniforms::SHAPE_POLYGON;

/// Hash and value noise used for the glass grain.
const NOISE_WGSL: &str = r#"
fn hash21(p: vec2<f32>) -> f32 {
    return fract(sin(dot(p, vec2<f32>(127.1, 311.7))) * 43758.5453);
}

// Value noise in [0, 1]
fn value_noise(p: vec2<f32>) -> f32 {
    let i = floor(p);
    let f = fract(p);
    let a = hash21(i);
    let b = hash21(i + vec2<f32>(1.0, 0.0));
    let c = hash21(i + vec2<f32>(0.0, 1.0));
    let d = hash21(i + vec2<f32>(1.0, 1.0));
    let u = f * f * (3.0 - 2.0 * f);
    return mix(mix(a, b, u.x), mix(c, d, u.x), u.y);
}
"#;

/// `Shape` struct and `boundary_radius`, matching the Rust containment test.
pub fn boundary_wgsl() -> String {
    format!(
        r#"
const PI: f32 = 3.14159265;

struct Shape {{
    base_radius: f32,
    lobes: f32,
    amplitude: f32,
    phase: f32,
    kind: u32,
    sides: u32,
    _pad0: u32,
    _pad1: u32,
}}

fn boundary_radius(s: Shape, theta: f32) -> f32 {{
    if s.kind == {SHAPE_POLYGON}u {{
        let n = f32(max(s.sides, 3u));
        let sector = 2.0 * PI / n;
        let shifted = theta - s.phase;
        let local = shifted - sector * floor(shifted / sector);
        return s.base_radius * cos(PI / n) / cos(local - PI / n);
    }}
    return s.base_radius * (1.0 + s.amplitude * cos(s.lobes * theta + s.phase));
}}

fn inside_boundary(s: Shape, p: vec2<f32>) -> bool {{
    return length(p) <= boundary_radius(s, atan2(p.y, p.x));
}}
"#
    )
}

/// Full glass pass: full-screen triangle, boundary mask, light accumulation.
pub fn glass_wgsl() -> String {
    let boundary = boundary_wgsl();
    format!(
        r#"
struct Light {{
    position: vec2<f32>,
    color: vec4<f32>,
}}
{boundary}
struct Glass {{
    lights: array<Light, {MAX_LIGHTS}>,
    shape: Shape,
    light_count: u32,
    intensity: f32,
    glow_radius: f32,
    grain_scale: f32,
    grain_amount: f32,
    alpha: f32,
    aspect: f32,
    time: f32,
    view_scale: f32,
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
}}

@group(0) @binding(0) var<uniform> glass: Glass;
{NOISE_WGSL}
struct VertexOutput {{
    @builtin(position) clip_position: vec4<f32>,
    @location(0) ndc: vec2<f32>,
}}

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> VertexOutput {{
    var corners = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(3.0, -1.0),
        vec2<f32>(-1.0, 3.0),
    );
    let corner = corners[vertex_index];
    var out: VertexOutput;
    out.clip_position = vec4<f32>(corner, 0.0, 1.0);
    out.ndc = corner;
    return out;
}}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {{
    let world = vec2<f32>(in.ndc.x * glass.aspect, in.ndc.y) / glass.view_scale;
    if !inside_boundary(glass.shape, world) {{
        discard;
    }}

    var color = vec3<f32>(0.035, 0.035, 0.035);
    let count = min(glass.light_count, {MAX_LIGHTS}u);
    for (var i = 0u; i < count; i = i + 1u) {{
        let light = glass.lights[i];
        let d = distance(world, light.position);
        let falloff = 1.0 - smoothstep(0.0, glass.glow_radius, d);
        color += light.color.rgb * pow(falloff, 1.35) * glass.intensity;
    }}

    let grain = (value_noise(world * glass.grain_scale + vec2<f32>(glass.time, glass.time)) - 0.5) * glass.grain_amount;
    color += vec3<f32>(grain, grain, grain);
    return vec4<f32>(clamp(color, vec3<f32>(0.0), vec3<f32>(1.0)), glass.alpha);
}}
"#
    )
}

/// Instanced particle dots. Instance layout matches [`DotInstance`](crate::uniforms::DotInstance).
pub fn dots_wgsl() -> String {
    r#"
struct View {
    aspect: f32,
    view_scale: f32,
    dot_radius: f32,
    _pad: f32,
}

@group(0) @binding(0) var<uniform> view: View;

struct DotOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) local: vec2<f32>,
    @location(1) color: vec4<f32>,
}

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    @location(0) center: vec2<f32>,
    @location(1) scale: f32,
    @location(2) color: vec4<f32>,
) -> DotOutput {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    let local = corners[vertex_index];
    let world = center + local * view.dot_radius * scale;
    var out: DotOutput;
    out.clip_position = vec4<f32>(world.x * view.view_scale / view.aspect, world.y * view.view_scale, 0.0, 1.0);
    out.local = local;
    out.color = color;
    return out;
}

@fragment
fn fs_main(in: DotOutput) -> @location(0) vec4<f32> {
    let d = length(in.local);
    if d > 1.0 {
        discard;
    }
    let glow = 1.0 - smoothstep(0.0, 1.0, d);
    return vec4<f32>(in.color.rgb * (0.6 + 0.4 * glow), in.color.a * glow);
}
"#
    .to_string()
}

/// Instanced containers. Instance layout matches [`CellInstance`](crate::uniforms::CellInstance).
pub fn cells_wgsl() -> String {
    let circle = CellShape::Circle.id();
    let triangle = CellShape::Triangle.id();
    let hex = CellShape::Hex.id();
    let diamond = CellShape::Diamond.id();
    format!(
        r#"
struct View {{
    aspect: f32,
    view_scale: f32,
    dot_radius: f32,
    _pad: f32,
}}

@group(0) @binding(0) var<uniform> view: View;

struct CellOutput {{
    @builtin(position) clip_position: vec4<f32>,
    @location(0) local: vec2<f32>,
    @location(1) world: vec2<f32>,
    @location(2) @interpolate(flat) light: vec2<f32>,
    @location(3) @interpolate(flat) params: vec4<f32>,
    @location(4) @interpolate(flat) color: vec4<f32>,
    @location(5) @interpolate(flat) shape: u32,
    @location(6) @interpolate(flat) alpha: f32,
}}

// > 0 when p is left of a -> b
fn edge_side(a: vec2<f32>, b: vec2<f32>, p: vec2<f32>) -> f32 {{
    return (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
}}

fn inside_cell(shape: u32, p: vec2<f32>, size: f32) -> bool {{
    let h = 0.5 * size;
    var inside = abs(p.x) <= h && abs(p.y) <= h;
    if shape == {circle}u {{
        inside = length(p) <= h;
    }} else if shape == {triangle}u {{
        let a = vec2<f32>(0.0, 0.58 * size);
        let b = vec2<f32>(-h, -0.29 * size);
        let c = vec2<f32>(h, -0.29 * size);
        inside = edge_side(a, b, p) >= 0.0 && edge_side(b, c, p) >= 0.0 && edge_side(c, a, p) >= 0.0;
    }} else if shape == {hex}u {{
        inside = true;
        for (var i = 0u; i < 6u; i = i + 1u) {{
            let a0 = f32(i) * 1.04719755;
            let a1 = f32(i + 1u) * 1.04719755;
            let a = h * vec2<f32>(cos(a0), sin(a0));
            let b = h * vec2<f32>(cos(a1), sin(a1));
            if edge_side(a, b, p) < 0.0 {{
                inside = false;
            }}
        }}
    }} else if shape == {diamond}u {{
        inside = abs(p.x) / h + abs(p.y) / (0.6 * size) <= 1.0;
    }}
    return inside;
}}

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    @location(0) center: vec2<f32>,
    @location(1) light: vec2<f32>,
    @location(2) params: vec4<f32>,
    @location(3) color: vec4<f32>,
    @location(4) shape: u32,
    @location(5) alpha: f32,
) -> CellOutput {{
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    let local = corners[vertex_index] * (0.75 * params.y);
    let c = cos(params.x);
    let s = sin(params.x);
    let world = center + vec2<f32>(c * local.x - s * local.y, s * local.x + c * local.y);
    var out: CellOutput;
    out.clip_position = vec4<f32>(world.x * view.view_scale / view.aspect, world.y * view.view_scale, 0.0, 1.0);
    out.local = local;
    out.world = world;
    out.light = light;
    out.params = params;
    out.color = color;
    out.shape = shape;
    out.alpha = alpha;
    return out;
}}

@fragment
fn fs_main(in: CellOutput) -> @location(0) vec4<f32> {{
    if !inside_cell(in.shape, in.local, in.params.y) {{
        discard;
    }}
    let d = distance(in.world, in.light);
    let falloff = 1.0 - smoothstep(0.0, in.params.z, d);
    let color = vec3<f32>(0.035, 0.035, 0.035) + in.color.rgb * pow(falloff, 1.35) * in.params.w;
    return vec4<f32>(clamp(color, vec3<f32>(0.0), vec3<f32>(1.0)), in.alpha);
}}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate_wgsl(code: &str) -> Result<(), String> {
        let module = naga::front::wgsl::parse_str(code).map_err(|e| format!("Parse error: {e:?}"))?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator
            .validate(&module)
            .map_err(|e| format!("Validation error: {e:?}"))?;

        Ok(())
    }

    #[test]
    fn test_glass_shader_validates() {
        let code = glass_wgsl();
        if let Err(e) = validate_wgsl(&code) {
            panic!("glass shader failed validation:\n{e}\n\n{code}");
        }
    }

    #[test]
    fn test_dots_shader_validates() {
        let code = dots_wgsl();
        if let Err(e) = validate_wgsl(&code) {
            panic!("dots shader failed validation:\n{e}\n\n{code}");
        }
    }

    #[test]
    fn test_cells_shader_validates() {
        let code = cells_wgsl();
        if let Err(e) = validate_wgsl(&code) {
            panic!("cells shader failed validation:\n{e}\n\n{code}");
        }
        assert!(code.contains(&format!("shape == {}u", CellShape::Diamond.id())));
    }

    #[test]
    fn test_glass_light_array_matches_capacity() {
        let code = glass_wgsl();
        assert!(code.contains(&format!("array<Light, {MAX_LIGHTS}>")));
    }

    #[test]
    fn test_glass_entry_points() {
        let module = naga::front::wgsl::parse_str(&glass_wgsl()).unwrap();
        let names: Vec<_> = module.entry_points.iter().map(|ep| ep.name.as_str()).collect();
        assert!(names.contains(&"vs_main"));
        assert!(names.contains(&"fs_main"));
    }

    #[test]
    fn test_boundary_snippet_uses_polygon_tag() {
        let code = boundary_wgsl();
        assert!(code.contains(&format!("s.kind == {SHAPE_POLYGON}u")));
        assert!(code.contains("fn inside_boundary"));
    }
}
