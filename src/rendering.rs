//! GPU backend: wgpu device, pipelines, and per-part buffer management.
//!
//! Styles mutate CPU-side geometry; this system re-uploads dirty buffers
//! and draws one part per dynamic-uniform-offset slot. Pipelines are fixed
//! per topology (lit triangles, unlit line strips, unlit points).

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use thiserror::Error;
use wgpu::util::DeviceExt;

use crate::geometry::{Topology, Vertex};
use crate::scene::{Camera, Lighting};
use crate::styles::StyleNode;

/// Dynamic-offset stride for per-part uniforms (covers the required
/// 256-byte alignment on all backends)
const PART_STRIDE: u64 = 256;

/// Initial per-part uniform slots; grows in powers of two
const INITIAL_PART_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    Surface(String),

    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("failed to request device: {0}")]
    Device(String),

    #[error("failed to acquire frame: {0}")]
    Frame(#[from] wgpu::SurfaceError),
}

/// Per-frame uniforms: camera plus the scene's two lights
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct FrameUniforms {
    view_proj: [[f32; 4]; 4],
    ambient: [f32; 4],
    light_dir: [f32; 4],
    light_color: [f32; 4],
}

/// Per-part uniforms: model matrix + material
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct PartUniforms {
    model: [[f32; 4]; 4],
    color: [f32; 4],
    emissive: [f32; 4],
}

/// GPU mirror of one mesh part's geometry
struct GpuPart {
    vertex_buffer: wgpu::Buffer,
    index_buffer: Option<wgpu::Buffer>,
    vertex_count: u32,
    index_count: u32,
    topology: Topology,
}

/// Rendering system managing wgpu device, pipelines, and buffers
pub struct RenderSystem {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,

    mesh_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    point_pipeline: wgpu::RenderPipeline,

    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,

    part_layout: wgpu::BindGroupLayout,
    part_buffer: wgpu::Buffer,
    part_bind_group: wgpu::BindGroup,
    part_capacity: usize,

    gpu_parts: Vec<GpuPart>,
}

impl RenderSystem {
    /// Create the rendering system for a window surface
    pub async fn new(
        window: std::sync::Arc<winit::window::Window>,
    ) -> Result<Self, RenderError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .map_err(|e| RenderError::Surface(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Main Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| RenderError::Device(e.to_string()))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Style Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        // Frame uniforms (camera + lights)
        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame Uniform Buffer"),
            contents: bytemuck::cast_slice(&[FrameUniforms {
                view_proj: Mat4::IDENTITY.to_cols_array_2d(),
                ambient: [0.0; 4],
                light_dir: [0.0, 0.0, 1.0, 0.0],
                light_color: [1.0; 4],
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        // Per-part uniforms with dynamic offsets
        let part_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Part Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<PartUniforms>() as u64
                    ),
                },
                count: None,
            }],
        });

        let (part_buffer, part_bind_group) =
            create_part_buffer(&device, &part_layout, INITIAL_PART_CAPACITY);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Style Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &part_layout],
            push_constant_ranges: &[],
        });

        let mesh_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            config.format,
            wgpu::PrimitiveTopology::TriangleList,
            "fs_lit",
            "Mesh Pipeline",
        );
        let line_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            config.format,
            wgpu::PrimitiveTopology::LineStrip,
            "fs_unlit",
            "Line Pipeline",
        );
        let point_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            config.format,
            wgpu::PrimitiveTopology::PointList,
            "fs_unlit",
            "Point Pipeline",
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            mesh_pipeline,
            line_pipeline,
            point_pipeline,
            frame_buffer,
            frame_bind_group,
            part_layout,
            part_buffer,
            part_bind_group,
            part_capacity: INITIAL_PART_CAPACITY,
            gpu_parts: Vec::new(),
        })
    }

    /// Reconfigure the surface for a new viewport size
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Drop the GPU mirrors of the current node's parts (style switch)
    pub fn clear_parts(&mut self) {
        self.gpu_parts.clear();
    }

    /// Upload state and draw one frame of the given node
    pub fn render(
        &mut self,
        node: &mut StyleNode,
        camera: &Camera,
        lighting: &Lighting,
    ) -> Result<(), RenderError> {
        self.sync_parts(node);
        self.write_uniforms(node, camera, lighting);

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
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);

            for (i, gpu_part) in self.gpu_parts.iter().enumerate() {
                let pipeline = match gpu_part.topology {
                    Topology::TriangleList => &self.mesh_pipeline,
                    Topology::LineStrip => &self.line_pipeline,
                    Topology::PointList => &self.point_pipeline,
                };
                render_pass.set_pipeline(pipeline);

                let offset = (i as u64 * PART_STRIDE) as u32;
                render_pass.set_bind_group(1, &self.part_bind_group, &[offset]);
                render_pass.set_vertex_buffer(0, gpu_part.vertex_buffer.slice(..));

                match &gpu_part.index_buffer {
                    Some(index_buffer) => {
                        render_pass
                            .set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                        render_pass.draw_indexed(0..gpu_part.index_count, 0, 0..1);
                    }
                    None => render_pass.draw(0..gpu_part.vertex_count, 0..1),
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    /// Mirror the node's parts into GPU buffers, re-uploading dirty
    /// geometry and recreating buffers whose topology changed
    fn sync_parts(&mut self, node: &mut StyleNode) {
        if node.parts.len() > self.part_capacity {
            let mut capacity = self.part_capacity;
            while capacity < node.parts.len() {
                capacity *= 2;
            }
            let (buffer, bind_group) =
                create_part_buffer(&self.device, &self.part_layout, capacity);
            self.part_buffer = buffer;
            self.part_bind_group = bind_group;
            self.part_capacity = capacity;
        }

        self.gpu_parts.truncate(node.parts.len());

        for (i, part) in node.parts.iter_mut().enumerate() {
            let geometry = &mut part.geometry;
            let matches = self.gpu_parts.get(i).map_or(false, |gpu| {
                gpu.topology == geometry.topology
                    && gpu.vertex_count as usize == geometry.vertices.len()
                    && gpu.index_count as usize == geometry.indices.len()
            });

            if !matches {
                let vertex_buffer =
                    self.device
                        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                            label: Some("Part Vertex Buffer"),
                            contents: bytemuck::cast_slice(&geometry.vertices),
                            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                        });
                let index_buffer = (!geometry.indices.is_empty()).then(|| {
                    self.device
                        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                            label: Some("Part Index Buffer"),
                            contents: bytemuck::cast_slice(&geometry.indices),
                            usage: wgpu::BufferUsages::INDEX,
                        })
                });

                let gpu_part = GpuPart {
                    vertex_buffer,
                    index_buffer,
                    vertex_count: geometry.vertices.len() as u32,
                    index_count: geometry.indices.len() as u32,
                    topology: geometry.topology,
                };
                if i < self.gpu_parts.len() {
                    self.gpu_parts[i] = gpu_part;
                } else {
                    self.gpu_parts.push(gpu_part);
                }
            } else if geometry.dirty {
                self.queue.write_buffer(
                    &self.gpu_parts[i].vertex_buffer,
                    0,
                    bytemuck::cast_slice(&geometry.vertices),
                );
            }
            geometry.dirty = false;
        }
    }

    fn write_uniforms(&self, node: &StyleNode, camera: &Camera, lighting: &Lighting) {
        let frame = FrameUniforms {
            view_proj: camera.view_proj().to_cols_array_2d(),
            ambient: [
                lighting.ambient[0],
                lighting.ambient[1],
                lighting.ambient[2],
                1.0,
            ],
            light_dir: [
                lighting.direction[0],
                lighting.direction[1],
                lighting.direction[2],
                0.0,
            ],
            light_color: [
                lighting.directional[0],
                lighting.directional[1],
                lighting.directional[2],
                1.0,
            ],
        };
        self.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::cast_slice(&[frame]));

        let root = node.root_matrix();
        for (i, part) in node.parts.iter().enumerate() {
            let uniforms = PartUniforms {
                model: (root * part.transform.matrix()).to_cols_array_2d(),
                color: [
                    part.material.color[0],
                    part.material.color[1],
                    part.material.color[2],
                    part.material.opacity,
                ],
                emissive: [
                    part.material.emissive[0],
                    part.material.emissive[1],
                    part.material.emissive[2],
                    part.material.emissive_intensity,
                ],
            };
            self.queue.write_buffer(
                &self.part_buffer,
                i as u64 * PART_STRIDE,
                bytemuck::cast_slice(&[uniforms]),
            );
        }
    }
}

fn create_part_buffer(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    capacity: usize,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Part Uniform Buffer"),
        size: capacity as u64 * PART_STRIDE,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Part Bind Group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(std::mem::size_of::<PartUniforms>() as u64),
            }),
        }],
    });

    (buffer, bind_group)
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    topology: wgpu::PrimitiveTopology,
    fragment_entry: &str,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[
                    wgpu::VertexAttribute {
                        offset: 0,
                        shader_location: 0,
                        format: wgpu::VertexFormat::Float32x3,
                    },
                    wgpu::VertexAttribute {
                        offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                        shader_location: 1,
                        format: wgpu::VertexFormat::Float32x3,
                    },
                ],
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
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
