//! Reference wgpu renderer for the blob.
//!
//! Up to three passes into the swapchain image, no depth:
//!
//! 1. glass: full-screen triangle, boundary-masked, lit by the published
//!    lights; skipped while the blob is exploded
//! 2. cells: one instanced quad per container on screen
//! 3. dots: one instanced quad per visible particle or in-flight entry

use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::config::LightConfig;
use crate::error::GpuError;
use crate::shader::{cells_wgsl, dots_wgsl, glass_wgsl};
use crate::uniforms::{CellInstance, DotInstance, GlassUniforms, RenderPayload, ViewUniforms};

/// Clip-space units per world unit along y. Keeps the spawn ring on screen.
pub const DEFAULT_VIEW_SCALE: f32 = 1.5;
/// Dot radius in world units.
pub const DEFAULT_DOT_RADIUS: f32 = 0.012;

const INITIAL_INSTANCE_CAPACITY: usize = 64;

/// Growable per-instance vertex buffer.
struct InstanceBuffer {
    label: &'static str,
    stride: usize,
    buffer: wgpu::Buffer,
    capacity: usize,
    count: u32,
}

impl InstanceBuffer {
    fn new(device: &wgpu::Device, label: &'static str, stride: usize) -> Self {
        Self {
            label,
            stride,
            buffer: create_instance_buffer(device, label, stride * INITIAL_INSTANCE_CAPACITY),
            capacity: INITIAL_INSTANCE_CAPACITY,
            count: 0,
        }
    }

    fn upload<T: bytemuck::Pod>(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, instances: &[T]) {
        if instances.len() > self.capacity {
            self.capacity = instances.len().next_power_of_two();
            self.buffer = create_instance_buffer(device, self.label, self.stride * self.capacity);
        }
        if !instances.is_empty() {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(instances));
        }
        self.count = instances.len() as u32;
    }
}

pub struct GpuState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    glass_pipeline: wgpu::RenderPipeline,
    dots_pipeline: wgpu::RenderPipeline,
    cells_pipeline: wgpu::RenderPipeline,
    glass_buffer: wgpu::Buffer,
    glass_bind_group: wgpu::BindGroup,
    view_buffer: wgpu::Buffer,
    view_bind_group: wgpu::BindGroup,
    dots: InstanceBuffer,
    cells: InstanceBuffer,
    show_glass: bool,
    style: LightConfig,
    pub view_scale: f32,
    pub dot_radius: f32,
}

impl GpuState {
    pub async fn new(window: Arc<Window>, style: LightConfig) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(GpuError::NoAdapter)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let empty_glass = <GlassUniforms as bytemuck::Zeroable>::zeroed();
        let glass_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Glass Uniform Buffer"),
            contents: bytemuck::bytes_of(&empty_glass),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let view_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("View Uniform Buffer"),
            contents: bytemuck::bytes_of(&ViewUniforms::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let dots = InstanceBuffer::new(&device, "Dot Instance Buffer", std::mem::size_of::<DotInstance>());
        let cells = InstanceBuffer::new(&device, "Cell Instance Buffer", std::mem::size_of::<CellInstance>());

        let (glass_layout, glass_bind_group) =
            uniform_bind_group(&device, &glass_buffer, wgpu::ShaderStages::FRAGMENT, "Glass");
        let (view_layout, view_bind_group) =
            uniform_bind_group(&device, &view_buffer, wgpu::ShaderStages::VERTEX, "View");

        let glass_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Glass Shader"),
            source: wgpu::ShaderSource::Wgsl(glass_wgsl().into()),
        });
        let dots_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Dots Shader"),
            source: wgpu::ShaderSource::Wgsl(dots_wgsl().into()),
        });
        let cells_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Cells Shader"),
            source: wgpu::ShaderSource::Wgsl(cells_wgsl().into()),
        });

        let glass_pipeline = create_pipeline(
            &device,
            "Glass Pipeline",
            &glass_layout,
            &glass_shader,
            &[],
            config.format,
        );

        let dot_attributes = [
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2, // position
            },
            wgpu::VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32, // scale
            },
            wgpu::VertexAttribute {
                offset: 16,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x4, // color
            },
        ];
        let dots_pipeline = create_pipeline(
            &device,
            "Dots Pipeline",
            &view_layout,
            &dots_shader,
            &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<DotInstance>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &dot_attributes,
            }],
            config.format,
        );

        let cell_attributes = [
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2, // position
            },
            wgpu::VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2, // light
            },
            wgpu::VertexAttribute {
                offset: 16,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x4, // rotation, size, glow, intensity
            },
            wgpu::VertexAttribute {
                offset: 32,
                shader_location: 3,
                format: wgpu::VertexFormat::Float32x4, // color
            },
            wgpu::VertexAttribute {
                offset: 48,
                shader_location: 4,
                format: wgpu::VertexFormat::Uint32, // shape
            },
            wgpu::VertexAttribute {
                offset: 52,
                shader_location: 5,
                format: wgpu::VertexFormat::Float32, // alpha
            },
        ];
        let cells_pipeline = create_pipeline(
            &device,
            "Cells Pipeline",
            &view_layout,
            &cells_shader,
            &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<CellInstance>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &cell_attributes,
            }],
            config.format,
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            glass_pipeline,
            dots_pipeline,
            cells_pipeline,
            glass_buffer,
            glass_bind_group,
            view_buffer,
            view_bind_group,
            dots,
            cells,
            show_glass: true,
            style,
            view_scale: DEFAULT_VIEW_SCALE,
            dot_radius: DEFAULT_DOT_RADIUS,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    pub fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height as f32
    }

    fn upload(&mut self, payload: &RenderPayload, time: f32) {
        let aspect = self.aspect();
        let glass = payload.to_uniforms(&self.style, aspect, self.view_scale, time);
        self.queue.write_buffer(&self.glass_buffer, 0, bytemuck::bytes_of(&glass));

        let view = ViewUniforms::new(aspect, self.view_scale, self.dot_radius);
        self.queue.write_buffer(&self.view_buffer, 0, bytemuck::bytes_of(&view));

        self.dots.upload(&self.device, &self.queue, payload.dot_instances());
        self.cells.upload(&self.device, &self.queue, payload.cell_instances());
        self.show_glass = payload.shows_boundary();
    }

    pub fn render(&mut self, payload: &RenderPayload, time: f32) -> Result<(), wgpu::SurfaceError> {
        self.upload(payload, time);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Blob Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.02,
                            g: 0.02,
                            b: 0.05,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if self.show_glass {
                render_pass.set_pipeline(&self.glass_pipeline);
                render_pass.set_bind_group(0, &self.glass_bind_group, &[]);
                render_pass.draw(0..3, 0..1);
            }

            if self.cells.count > 0 {
                render_pass.set_pipeline(&self.cells_pipeline);
                render_pass.set_bind_group(0, &self.view_bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.cells.buffer.slice(..));
                render_pass.draw(0..6, 0..self.cells.count);
            }

            if self.dots.count > 0 {
                render_pass.set_pipeline(&self.dots_pipeline);
                render_pass.set_bind_group(0, &self.view_bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.dots.buffer.slice(..));
                render_pass.draw(0..6, 0..self.dots.count);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

fn create_instance_buffer(device: &wgpu::Device, label: &str, size: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: size as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn uniform_bind_group(
    device: &wgpu::Device,
    buffer: &wgpu::Buffer,
    visibility: wgpu::ShaderStages,
    name: &str,
) -> (wgpu::BindGroupLayout, wgpu::BindGroup) {
    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(&format!("{name} Bind Group Layout")),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("{name} Bind Group")),
        layout: &layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    });

    (layout, bind_group)
}

fn create_pipeline(
    device: &wgpu::Device,
    label: &str,
    bind_group_layout: &wgpu::BindGroupLayout,
    shader: &wgpu::ShaderModule,
    buffers: &[wgpu::VertexBufferLayout<'_>],
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}
