use std::sync::Mutex;

use eframe::egui;
use eframe::egui_wgpu;
use eframe::wgpu;
use eframe::wgpu::util::DeviceExt;

use crate::render::gpu_types::{Line3DData, Plot3DUniforms, Scatter3DData};

const SCENE_SHADER_SRC: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
    tint: vec4<f32>,
    resolution: vec2<f32>,
    point_size: f32,
    line_width: f32,
};

@group(0) @binding(0) var<uniform> u: Uniforms;
@group(0) @binding(1) var<storage, read> positions: array<vec4<f32>>;
@group(0) @binding(2) var<storage, read> colors: array<vec4<f32>>;

// Two triangles per quad; xy = corner, used by both primitives.
const QUAD = array<vec2<f32>, 6>(
    vec2<f32>(-1.0, -1.0), vec2<f32>(1.0, -1.0), vec2<f32>(-1.0, 1.0),
    vec2<f32>(1.0, -1.0), vec2<f32>(1.0, 1.0), vec2<f32>(-1.0, 1.0),
);

fn quad_corner(vert: u32) -> vec2<f32> {
    var corners = QUAD;
    return corners[vert];
}

fn clip_of(p: vec4<f32>) -> vec4<f32> {
    return u.view_proj * vec4<f32>(p.xyz, 1.0);
}

fn clip_to_px(clip: vec4<f32>) -> vec2<f32> {
    return (clip.xy / clip.w * 0.5 + 0.5) * u.resolution;
}

fn px_to_ndc(px: vec2<f32>) -> vec2<f32> {
    return px / u.resolution * 2.0 - 1.0;
}

struct MarkerOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) uv: vec2<f32>,
};

// Screen-aligned disc of radius `point_size` pixels per instance.
@vertex
fn vs_scatter(@builtin(instance_index) inst: u32, @builtin(vertex_index) vert: u32) -> MarkerOut {
    let clip = clip_of(positions[inst]);
    let corner = quad_corner(vert);
    let ndc = px_to_ndc(clip_to_px(clip) + corner * u.point_size);

    var out: MarkerOut;
    out.pos = vec4<f32>(ndc * clip.w, clip.z, clip.w);
    out.color = colors[inst] * u.tint;
    out.uv = corner;
    return out;
}

@fragment
fn fs_scatter(@location(0) color: vec4<f32>, @location(1) uv: vec2<f32>) -> @location(0) vec4<f32> {
    let r = length(uv);
    if r > 1.0 {
        discard;
    }
    return vec4<f32>(color.rgb, color.a * (1.0 - smoothstep(0.8, 1.0, r)));
}

struct RibbonOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) color: vec4<f32>,
};

// One ribbon per segment; positions/colors hold [start, end] pairs.
// Corner x picks the endpoint, corner y the side of the ribbon.
@vertex
fn vs_line(@builtin(instance_index) inst: u32, @builtin(vertex_index) vert: u32) -> RibbonOut {
    let i0 = inst * 2u;
    let clip0 = clip_of(positions[i0]);
    let clip1 = clip_of(positions[i0 + 1u]);
    let px0 = clip_to_px(clip0);
    let px1 = clip_to_px(clip1);

    let along = px1 - px0;
    var normal = vec2<f32>(0.0, 1.0);
    if length(along) > 0.001 {
        normal = normalize(vec2<f32>(-along.y, along.x));
    }

    let corner = quad_corner(vert);
    let t = corner.x * 0.5 + 0.5;
    let px = mix(px0, px1, t) + normal * corner.y * u.line_width * 0.5;

    // 1/w and z/w are linear in screen space.
    let w = 1.0 / mix(1.0 / clip0.w, 1.0 / clip1.w, t);
    let z = mix(clip0.z / clip0.w, clip1.z / clip1.w, t) * w;

    var out: RibbonOut;
    out.pos = vec4<f32>(px_to_ndc(px) * w, z, w);
    out.color = mix(colors[i0], colors[i0 + 1u], t) * u.tint;
    return out;
}

@fragment
fn fs_line(@location(0) color: vec4<f32>) -> @location(0) vec4<f32> {
    return color;
}
"#;

/// Composites the premultiplied offscreen image with one oversized triangle.
const BLIT_SHADER_SRC: &str = r#"
struct BlitOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_blit(@builtin(vertex_index) vert: u32) -> BlitOut {
    let uv = vec2<f32>(f32((vert << 1u) & 2u), f32(vert & 2u));
    var out: BlitOut;
    out.pos = vec4<f32>(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0, 0.0, 1.0);
    out.uv = uv;
    return out;
}

@group(0) @binding(0) var t_color: texture_2d<f32>;
@group(0) @binding(1) var s_color: sampler;

@fragment
fn fs_blit(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return textureSample(t_color, s_color, uv);
}
"#;

pub struct Plot3DResources {
    pub scatter_pipeline: wgpu::RenderPipeline,
    pub line_pipeline: wgpu::RenderPipeline,
    pub blit_pipeline: wgpu::RenderPipeline,
    pub scene_bind_group_layout: wgpu::BindGroupLayout,
    pub blit_bind_group_layout: wgpu::BindGroupLayout,
    pub sampler: wgpu::Sampler,
    /// The texture format used by the render target. The offscreen color
    /// texture must match this so it's compatible with the scene pipelines.
    pub target_format: wgpu::TextureFormat,
}

struct BlitState {
    blit_bind_group: wgpu::BindGroup,
}

pub struct CachedOffscreenTextures {
    pub color_view: wgpu::TextureView,
    pub depth_view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
}

pub fn init_3d_resources(render_state: &egui_wgpu::RenderState) {
    let device = &render_state.device;
    let target_format = render_state.target_format;

    let scene_shader = shader_module(device, "plot3d_scene_shader", SCENE_SHADER_SRC);
    let blit_shader = shader_module(device, "plot3d_blit_shader", BLIT_SHADER_SRC);

    // Uniforms, positions, colors.
    let scene_bind_group_layout =
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("plot3d_scene_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: std::num::NonZeroU64::new(
                            std::mem::size_of::<Plot3DUniforms>() as u64,
                        ),
                    },
                    count: None,
                },
                vec4_storage_entry(1),
                vec4_storage_entry(2),
            ],
        });

    let blit_bind_group_layout =
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("plot3d_blit_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

    let scene_pipeline_layout = pipeline_layout(device, "plot3d_scene_pipeline_layout", &scene_bind_group_layout);
    let blit_pipeline_layout = pipeline_layout(device, "plot3d_blit_pipeline_layout", &blit_bind_group_layout);

    let scene = ScenePipelineParts {
        device,
        layout: &scene_pipeline_layout,
        shader: &scene_shader,
        target_format,
    };
    // Markers are translucent: they test depth but never occlude the
    // line or each other.
    let scatter_pipeline = scene.pipeline("plot3d_scatter_pipeline", "vs_scatter", "fs_scatter", false);
    let line_pipeline = scene.pipeline("plot3d_line_pipeline", "vs_line", "fs_line", true);

    let blit_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("plot3d_blit_pipeline"),
        layout: Some(&blit_pipeline_layout),
        vertex: wgpu::VertexState {
            module: &blit_shader,
            entry_point: Some("vs_blit"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: triangle_list(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &blit_shader,
            entry_point: Some("fs_blit"),
            targets: &[Some(wgpu::ColorTargetState {
                format: target_format,
                // Offscreen texture is premultiplied; a transparent scene
                // background lets the panel behind it show through.
                blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    });

    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("plot3d_blit_sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });

    let resources = Plot3DResources {
        scatter_pipeline,
        line_pipeline,
        blit_pipeline,
        scene_bind_group_layout,
        blit_bind_group_layout,
        sampler,
        target_format,
    };

    render_state
        .renderer
        .write()
        .callback_resources
        .insert(resources);
}

fn shader_module(device: &wgpu::Device, label: &str, src: &str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(src.into()),
    })
}

fn pipeline_layout(device: &wgpu::Device, label: &str, bind_group_layout: &wgpu::BindGroupLayout) -> wgpu::PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    })
}

/// Read-only `array<vec4<f32>>` visible to the vertex stage.
fn vec4_storage_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: std::num::NonZeroU64::new(16),
        },
        count: None,
    }
}

fn triangle_list() -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleList,
        strip_index_format: None,
        front_face: wgpu::FrontFace::Ccw,
        cull_mode: None,
        unclipped_depth: false,
        polygon_mode: wgpu::PolygonMode::Fill,
        conservative: false,
    }
}

/// Everything the scatter and line pipelines share.
struct ScenePipelineParts<'a> {
    device: &'a wgpu::Device,
    layout: &'a wgpu::PipelineLayout,
    shader: &'a wgpu::ShaderModule,
    target_format: wgpu::TextureFormat,
}

impl ScenePipelineParts<'_> {
    fn pipeline(&self, label: &str, vs: &str, fs: &str, depth_write: bool) -> wgpu::RenderPipeline {
        self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(self.layout),
            vertex: wgpu::VertexState {
                module: self.shader,
                entry_point: Some(vs),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: triangle_list(),
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: depth_write,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: self.shader,
                entry_point: Some(fs),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.target_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        })
    }
}

fn offscreen_view(
    device: &wgpu::Device,
    label: &str,
    [width, height]: [u32; 2],
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_storage_buffer_3d(device: &wgpu::Device, label: &str, data: &[u8]) -> wgpu::Buffer {
    if data.len() < 16 {
        let mut padded = vec![0u8; 16];
        padded[..data.len()].copy_from_slice(data);
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: &padded,
            usage: wgpu::BufferUsages::STORAGE,
        })
    } else {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: data,
            usage: wgpu::BufferUsages::STORAGE,
        })
    }
}

/// Bind uniforms, positions and per-vertex colors for one draw call.
fn create_scene_bind_group(
    device: &wgpu::Device,
    resources: &Plot3DResources,
    label: &str,
    uniforms: &Plot3DUniforms,
    positions: &[u8],
    colors: &[u8],
) -> wgpu::BindGroup {
    let position_buf = create_storage_buffer_3d(device, &format!("{label}_positions"), positions);
    let color_buf = create_storage_buffer_3d(device, &format!("{label}_colors"), colors);
    let uniform_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{label}_uniform")),
        contents: bytemuck::bytes_of(uniforms),
        usage: wgpu::BufferUsages::UNIFORM,
    });

    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("{label}_bind_group")),
        layout: &resources.scene_bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buf.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: position_buf.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: color_buf.as_entire_binding(),
            },
        ],
    })
}

pub struct Plot3DCallback {
    pub scatter_data: Vec<Scatter3DData>,
    pub line_data: Vec<Line3DData>,
    pub uniforms_base: Plot3DUniforms,
    pub bg_color: [f32; 4],
    pub viewport_size: [u32; 2],
    blit_state: Mutex<Option<BlitState>>,
}

impl egui_wgpu::CallbackTrait for Plot3DCallback {
    fn prepare(
        &self,
        device: &wgpu::Device,
        _queue: &wgpu::Queue,
        _screen_descriptor: &egui_wgpu::ScreenDescriptor,
        encoder: &mut wgpu::CommandEncoder,
        callback_resources: &mut egui_wgpu::CallbackResources,
    ) -> Vec<wgpu::CommandBuffer> {
        // Extract target_format without holding a long-lived borrow on
        // callback_resources, so we can call insert() below if textures
        // need recreating.
        let target_format = match callback_resources.get::<Plot3DResources>() {
            Some(r) => r.target_format,
            None => return Vec::new(),
        };

        let width = self.viewport_size[0].max(1);
        let height = self.viewport_size[1].max(1);

        // Reuse the offscreen targets until the size or format changes.
        // Only recreate when size changes to avoid exhausting VRAM.
        let needs_recreate = match callback_resources.get::<CachedOffscreenTextures>() {
            Some(cached) => cached.width != width || cached.height != height || cached.format != target_format,
            None => true,
        };

        if needs_recreate {
            let color_view = offscreen_view(
                device,
                "plot3d_offscreen_color",
                [width, height],
                target_format,
                wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            );
            let depth_view = offscreen_view(
                device,
                "plot3d_offscreen_depth",
                [width, height],
                wgpu::TextureFormat::Depth32Float,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
            );

            callback_resources.insert(CachedOffscreenTextures {
                color_view,
                depth_view,
                width,
                height,
                format: target_format,
            });
        }

        // Now safe to hold immutable borrows; no more inserts after this point.
        let (Some(resources), Some(cached)) = (
            callback_resources.get::<Plot3DResources>(),
            callback_resources.get::<CachedOffscreenTextures>(),
        ) else {
            return Vec::new();
        };
        let color_view = &cached.color_view;
        let depth_view = &cached.depth_view;
        let resolution = [width as f32, height as f32];

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("plot3d_offscreen_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: self.bg_color[0] as f64,
                            g: self.bg_color[1] as f64,
                            b: self.bg_color[2] as f64,
                            a: self.bg_color[3] as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);

            // Opaque backbone first so translucent markers blend over it.
            for line in &self.line_data {
                if line.segments.len() < 2 || line.colors.len() != line.segments.len() {
                    continue;
                }

                let mut uniforms = self.uniforms_base;
                uniforms.tint = line.tint;
                uniforms.line_width = line.line_width;
                uniforms.resolution = resolution;

                let bind_group = create_scene_bind_group(
                    device,
                    resources,
                    "plot3d_line",
                    &uniforms,
                    bytemuck::cast_slice(&line.segments),
                    bytemuck::cast_slice(&line.colors),
                );

                let instance_count = (line.segments.len() / 2) as u32;
                render_pass.set_pipeline(&resources.line_pipeline);
                render_pass.set_bind_group(0, &bind_group, &[]);
                render_pass.draw(0..6, 0..instance_count);
            }

            for scatter in &self.scatter_data {
                if scatter.positions.is_empty() || scatter.colors.len() != scatter.positions.len() {
                    continue;
                }

                let mut uniforms = self.uniforms_base;
                uniforms.tint = scatter.tint;
                uniforms.point_size = scatter.point_size;
                uniforms.resolution = resolution;

                let bind_group = create_scene_bind_group(
                    device,
                    resources,
                    "plot3d_scatter",
                    &uniforms,
                    bytemuck::cast_slice(&scatter.positions),
                    bytemuck::cast_slice(&scatter.colors),
                );

                let instance_count = scatter.positions.len() as u32;
                render_pass.set_pipeline(&resources.scatter_pipeline);
                render_pass.set_bind_group(0, &bind_group, &[]);
                render_pass.draw(0..6, 0..instance_count);
            }
        }
        // render_pass is dropped here, ending the offscreen pass.

        let blit_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("plot3d_blit_bind_group"),
            layout: &resources.blit_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(color_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&resources.sampler),
                },
            ],
        });

        if let Ok(mut state) = self.blit_state.lock() {
            *state = Some(BlitState { blit_bind_group });
        }

        Vec::new()
    }

    fn paint(
        &self,
        info: egui::PaintCallbackInfo,
        render_pass: &mut wgpu::RenderPass<'static>,
        callback_resources: &egui_wgpu::CallbackResources,
    ) {
        let Some(resources) = callback_resources.get::<Plot3DResources>() else {
            return;
        };

        let Ok(state_guard) = self.blit_state.lock() else {
            return;
        };
        let Some(state) = state_guard.as_ref() else {
            return;
        };

        let viewport = info.viewport_in_pixels();
        if viewport.width_px <= 0 || viewport.height_px <= 0 {
            return;
        }

        render_pass.set_viewport(
            viewport.left_px as f32,
            viewport.top_px as f32,
            viewport.width_px as f32,
            viewport.height_px as f32,
            0.0,
            1.0,
        );

        render_pass.set_pipeline(&resources.blit_pipeline);
        render_pass.set_bind_group(0, &state.blit_bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }
}

pub fn create_3d_paint_callback(
    rect: egui::Rect,
    scatter_data: Vec<Scatter3DData>,
    line_data: Vec<Line3DData>,
    uniforms_base: Plot3DUniforms,
    bg_color: [f32; 4],
    viewport_size: [u32; 2],
) -> egui::PaintCallback {
    egui_wgpu::Callback::new_paint_callback(
        rect,
        Plot3DCallback {
            scatter_data,
            line_data,
            uniforms_base,
            bg_color,
            viewport_size,
            blit_state: Mutex::new(None),
        },
    )
}
