//! GPU render context on wgpu.
//!
//! A display list is first split into passes, one per surface: every cache
//! target rendered during the frame gets its own pass, ordered before the
//! passes that draw from it, and the window frame comes last. Passes are then
//! encoded with two pipelines, one for solid quads and one for target blits.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::allocator::{CACHE_FORMAT, WgpuTargetPool};
use crate::color::Color;
use crate::context::{ContextType, RenderContext, RenderTarget, TargetAllocator, TargetId};
use crate::display_list::{Command, DisplayList};
use crate::error::{RenderError, Result};
use crate::geometry::{Rect, Transform2D};

const SOLID_WGSL: &str = r#"
struct Viewport {
    scale: vec2<f32>,
    translate: vec2<f32>,
};

@group(0) @binding(0) var<uniform> vp: Viewport;

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(@location(0) in_pos: vec2<f32>, @location(1) in_color: vec4<f32>) -> VsOut {
    var out: VsOut;
    out.pos = vec4<f32>(in_pos * vp.scale + vp.translate, 0.0, 1.0);
    out.color = in_color;
    return out;
}

@fragment
fn fs_main(inp: VsOut) -> @location(0) vec4<f32> {
    return inp.color;
}
"#;

const BLIT_WGSL: &str = r#"
struct Viewport {
    scale: vec2<f32>,
    translate: vec2<f32>,
};

@group(0) @binding(0) var<uniform> vp: Viewport;
@group(1) @binding(0) var src_tex: texture_2d<f32>;
@group(1) @binding(1) var src_smp: sampler;

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@location(0) in_pos: vec2<f32>, @location(1) in_uv: vec2<f32>) -> VsOut {
    var out: VsOut;
    out.pos = vec4<f32>(in_pos * vp.scale + vp.translate, 0.0, 1.0);
    out.uv = in_uv;
    return out;
}

@fragment
fn fs_main(inp: VsOut) -> @location(0) vec4<f32> {
    return textureSample(src_tex, src_smp, inp.uv);
}
"#;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SolidVertex {
    pub pos: [f32; 2],
    /// Premultiplied linear colour.
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TexVertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
}

/// Surface a pass renders into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassSurface {
    Frame,
    Target(TargetId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawKind {
    Solid,
    Target(TargetId),
}

/// A run of vertices drawn with one pipeline and one scissor rectangle.
#[derive(Clone, Debug, PartialEq)]
pub struct Draw {
    pub kind: DrawKind,
    pub first: u32,
    pub count: u32,
    /// `[x, y, width, height]` in surface pixels; `None` is the whole surface.
    pub scissor: Option<[u32; 4]>,
}

/// Everything one render pass needs.
#[derive(Clone, Debug, PartialEq)]
pub struct PassPlan {
    pub surface: PassSurface,
    pub width: u32,
    pub height: u32,
    /// Colour the surface is cleared to before drawing, or `None` to keep it.
    pub clear: Option<Color>,
    pub solid: Vec<SolidVertex>,
    pub textured: Vec<TexVertex>,
    pub draws: Vec<Draw>,
}

impl PassPlan {
    fn new(surface: PassSurface, width: u32, height: u32) -> Self {
        Self {
            surface,
            width,
            height,
            clear: None,
            solid: Vec::new(),
            textured: Vec::new(),
            draws: Vec::new(),
        }
    }

    fn scissor(&self, clip: Option<&Rect>) -> Option<Option<[u32; 4]>> {
        let Some(clip) = clip else {
            return Some(None);
        };
        let x1 = clip.x.floor().clamp(0.0, self.width as f32) as u32;
        let y1 = clip.y.floor().clamp(0.0, self.height as f32) as u32;
        let x2 = (clip.x + clip.w).ceil().clamp(0.0, self.width as f32) as u32;
        let y2 = (clip.y + clip.h).ceil().clamp(0.0, self.height as f32) as u32;
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Some([x1, y1, x2 - x1, y2 - y1]))
    }

    fn push_draw(&mut self, kind: DrawKind, first: u32, count: u32, scissor: Option<[u32; 4]>) {
        if let Some(last) = self.draws.last_mut() {
            if kind == DrawKind::Solid
                && last.kind == kind
                && last.scissor == scissor
                && last.first + last.count == first
            {
                last.count += count;
                return;
            }
        }
        self.draws.push(Draw { kind, first, count, scissor });
    }
}

fn quad(rect: Rect, t: &Transform2D) -> [[f32; 2]; 6] {
    let p0 = t.apply([rect.x, rect.y]);
    let p1 = t.apply([rect.x + rect.w, rect.y]);
    let p2 = t.apply([rect.x + rect.w, rect.y + rect.h]);
    let p3 = t.apply([rect.x, rect.y + rect.h]);
    [p0, p1, p2, p0, p2, p3]
}

struct Open {
    plan: PassPlan,
    clips: Vec<Rect>,
    dim: usize,
    /// False for a target that could not be resolved; its drawing is dropped.
    live: bool,
}

impl Open {
    fn new(plan: PassPlan, live: bool) -> Self {
        Self { plan, clips: Vec::new(), dim: 0, live }
    }
}

/// Split a display list into render passes in execution order.
///
/// `target_size` resolves a cache target to its pixel size; targets it does
/// not know are skipped with a warning.
pub fn plan_passes(
    list: &DisplayList,
    target_size: impl Fn(TargetId) -> Option<(u32, u32)>,
) -> Vec<PassPlan> {
    let mut done = Vec::new();
    let frame = PassPlan::new(PassSurface::Frame, list.viewport.width, list.viewport.height);
    let mut stack = vec![Open::new(frame, true)];

    for cmd in &list.commands {
        match cmd {
            Command::BeginTarget { target, .. } => {
                let open = match target_size(*target) {
                    Some((w, h)) => Open::new(PassPlan::new(PassSurface::Target(*target), w, h), true),
                    None => {
                        log::warn!("render into unknown target {:?}", target);
                        Open::new(PassPlan::new(PassSurface::Target(*target), 0, 0), false)
                    }
                };
                stack.push(open);
                continue;
            }
            Command::EndTarget => {
                if stack.len() > 1 {
                    if let Some(open) = stack.pop() {
                        if open.live {
                            done.push(open.plan);
                        }
                    }
                }
                continue;
            }
            _ => {}
        }

        let Some(open) = stack.last_mut() else { break };
        match cmd {
            Command::Clear(color) => {
                // Clearing discards whatever the surface received so far.
                open.plan.solid.clear();
                open.plan.textured.clear();
                open.plan.draws.clear();
                open.plan.clear = Some(*color);
            }
            Command::FillRect { rect, color, transform } => {
                let Some(scissor) = open.plan.scissor(open.clips.last()) else { continue };
                let color = if open.dim > 0 { color.dimmed() } else { *color };
                let first = open.plan.solid.len() as u32;
                for pos in quad(*rect, transform) {
                    open.plan.solid.push(SolidVertex { pos, color: [color.r, color.g, color.b, color.a] });
                }
                open.plan.push_draw(DrawKind::Solid, first, 6, scissor);
            }
            Command::DrawTarget { target, dest, src_origin, transform } => {
                let Some((tw, th)) = target_size(*target) else {
                    log::warn!("draw of unknown target {:?}", target);
                    continue;
                };
                let Some(scissor) = open.plan.scissor(open.clips.last()) else { continue };
                let (tw, th) = (tw.max(1) as f32, th.max(1) as f32);
                let u0 = src_origin[0] / tw;
                let v0 = src_origin[1] / th;
                let u1 = (src_origin[0] + dest.w) / tw;
                let v1 = (src_origin[1] + dest.h) / th;
                let uvs = [[u0, v0], [u1, v0], [u1, v1], [u0, v0], [u1, v1], [u0, v1]];
                let first = open.plan.textured.len() as u32;
                for (pos, uv) in quad(*dest, transform).into_iter().zip(uvs) {
                    open.plan.textured.push(TexVertex { pos, uv });
                }
                open.plan.push_draw(DrawKind::Target(*target), first, 6, scissor);
            }
            Command::PushClip { rect, transform } => {
                let device = transform.map_rect(*rect);
                let clip = match open.clips.last() {
                    Some(parent) => parent.intersect(&device).unwrap_or_default(),
                    None => device,
                };
                open.clips.push(clip);
            }
            Command::PopClip => {
                open.clips.pop();
            }
            Command::PushDim => open.dim += 1,
            Command::PopDim => open.dim = open.dim.saturating_sub(1),
            Command::UseProgram(_) | Command::PushTransform(_) | Command::PopTransform => {}
            Command::BeginTarget { .. } | Command::EndTarget => {}
        }
    }

    // Unterminated targets close before the frame.
    while let Some(open) = stack.pop() {
        if open.live {
            done.push(open.plan);
        }
    }
    done
}

fn viewport_uniform(width: u32, height: u32) -> [f32; 4] {
    let (w, h) = (width.max(1) as f32, height.max(1) as f32);
    [2.0 / w, -2.0 / h, -1.0, 1.0]
}

struct FrameState {
    texture: Option<wgpu::Texture>,
    width: u32,
    height: u32,
    presented: usize,
    current: bool,
}

/// Render context that draws with wgpu into an off-screen frame texture.
///
/// Window integrations composite [`WgpuHandle::frame_view`] onto their
/// surface; headless runs read the frame back.
pub struct WgpuContext {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    pool: WgpuTargetPool,
    kind: ContextType,
    solid: wgpu::RenderPipeline,
    blit: wgpu::RenderPipeline,
    vp_bgl: wgpu::BindGroupLayout,
    tex_bgl: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    state: Rc<RefCell<FrameState>>,
}

/// Shared view of a [`WgpuContext`]'s frame that outlives handing the
/// context to a scene.
#[derive(Clone)]
pub struct WgpuHandle {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    state: Rc<RefCell<FrameState>>,
}

impl WgpuContext {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        let vp_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("agl:viewport-bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: std::num::NonZeroU64::new(16),
                },
                count: None,
            }],
        });
        let tex_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("agl:target-bgl"),
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

        let solid = pipeline(
            &device,
            "agl:solid",
            SOLID_WGSL,
            &[&vp_bgl],
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<SolidVertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x4],
            },
        );
        let blit = pipeline(
            &device,
            "agl:blit",
            BLIT_WGSL,
            &[&vp_bgl, &tex_bgl],
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<TexVertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2],
            },
        );
        // Nearest sampling keeps cache blits pixel exact.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("agl:target-sampler"),
            ..Default::default()
        });

        Self {
            pool: WgpuTargetPool::new(device.clone()),
            device,
            queue,
            kind: ContextType::Offscreen,
            solid,
            blit,
            vp_bgl,
            tex_bgl,
            sampler,
            state: Rc::new(RefCell::new(FrameState {
                texture: None,
                width: 0,
                height: 0,
                presented: 0,
                current: false,
            })),
        }
    }

    /// Open the default adapter without a window.
    pub fn headless() -> Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            force_fallback_adapter: false,
            compatible_surface: None,
        }))
        .ok_or_else(|| RenderError::ContextUnavailable("no gpu adapter".into()))?;
        let (device, queue) =
            pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default(), None))
                .map_err(|e| RenderError::ContextUnavailable(e.to_string()))?;
        log::info!("wgpu adapter: {}", adapter.get_info().name);
        Ok(Self::new(Arc::new(device), Arc::new(queue)))
    }

    /// Tag the windowing system the frame is composited into.
    pub fn with_kind(mut self, kind: ContextType) -> Self {
        self.kind = kind;
        self
    }

    pub fn handle(&self) -> WgpuHandle {
        WgpuHandle {
            device: self.device.clone(),
            queue: self.queue.clone(),
            state: self.state.clone(),
        }
    }

    pub fn pool(&self) -> &WgpuTargetPool {
        &self.pool
    }

    fn ensure_frame(&mut self, width: u32, height: u32) {
        let mut state = self.state.borrow_mut();
        if state.texture.is_some() && state.width == width && state.height == height {
            return;
        }
        state.texture = Some(self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("agl:frame"),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: CACHE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        }));
        state.width = width;
        state.height = height;
    }

    fn vertex_buffer(&self, label: &str, bytes: &[u8]) -> Option<wgpu::Buffer> {
        if bytes.is_empty() {
            return None;
        }
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: bytes.len() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.queue.write_buffer(&buffer, 0, bytes);
        Some(buffer)
    }
}

fn pipeline(
    device: &wgpu::Device,
    label: &str,
    source: &str,
    layouts: &[&wgpu::BindGroupLayout],
    buffer: wgpu::VertexBufferLayout<'_>,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: layouts,
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "vs_main",
            buffers: &[buffer],
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: CACHE_FORMAT,
                blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}

/// GPU resources of one planned pass, alive until the pass is encoded.
struct Prepared {
    vp: wgpu::BindGroup,
    solid: Option<wgpu::Buffer>,
    textured: Option<wgpu::Buffer>,
    /// Bind group per draw for target blits, `None` for solid draws.
    sources: Vec<Option<wgpu::BindGroup>>,
}

impl TargetAllocator for WgpuContext {
    fn create_target(&mut self, width: u32, height: u32) -> Result<RenderTarget> {
        self.pool.create_target(width, height)
    }

    fn release_target(&mut self, target: RenderTarget) {
        self.pool.release_target(target);
    }

    fn live_targets(&self) -> usize {
        self.pool.live_targets()
    }
}

impl RenderContext for WgpuContext {
    fn kind(&self) -> ContextType {
        self.kind
    }

    fn make_current(&mut self) -> Result<()> {
        self.state.borrow_mut().current = true;
        Ok(())
    }

    fn clear_current(&mut self) {
        self.state.borrow_mut().current = false;
    }

    fn present(&mut self, frame: &DisplayList) -> Result<()> {
        let (width, height) = (frame.viewport.width, frame.viewport.height);
        if width == 0 || height == 0 {
            return Err(RenderError::Present(format!("empty viewport {width}x{height}")));
        }
        self.ensure_frame(width, height);

        let pool = &self.pool;
        let passes = plan_passes(frame, |id| pool.texture(id).map(|t| (t.key.width, t.key.height)));

        let mut prepared = Vec::with_capacity(passes.len());
        for pass in &passes {
            let uniform = viewport_uniform(pass.width, pass.height);
            let vp_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("agl:viewport"),
                size: std::mem::size_of_val(&uniform) as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            self.queue.write_buffer(&vp_buffer, 0, bytemuck::bytes_of(&uniform));
            let vp = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("agl:viewport"),
                layout: &self.vp_bgl,
                entries: &[wgpu::BindGroupEntry { binding: 0, resource: vp_buffer.as_entire_binding() }],
            });
            let sources = pass
                .draws
                .iter()
                .map(|draw| match draw.kind {
                    DrawKind::Solid => None,
                    DrawKind::Target(id) => pool.texture(id).map(|tex| {
                        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                            label: Some("agl:target-source"),
                            layout: &self.tex_bgl,
                            entries: &[
                                wgpu::BindGroupEntry {
                                    binding: 0,
                                    resource: wgpu::BindingResource::TextureView(&tex.view),
                                },
                                wgpu::BindGroupEntry {
                                    binding: 1,
                                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                                },
                            ],
                        })
                    }),
                })
                .collect();
            prepared.push(Prepared {
                vp,
                solid: self.vertex_buffer("agl:solid-vertices", bytemuck::cast_slice(&pass.solid)),
                textured: self.vertex_buffer("agl:blit-vertices", bytemuck::cast_slice(&pass.textured)),
                sources,
            });
        }

        let state = self.state.borrow();
        let Some(frame_texture) = state.texture.as_ref() else {
            return Err(RenderError::Present("frame texture missing".into()));
        };
        let frame_view = frame_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("agl:frame"),
        });
        for (pass, res) in passes.iter().zip(&prepared) {
            let view = match pass.surface {
                PassSurface::Frame => &frame_view,
                PassSurface::Target(id) => match pool.texture(id) {
                    Some(tex) => &tex.view,
                    None => continue,
                },
            };
            let load = match pass.clear {
                Some(c) => wgpu::LoadOp::Clear(wgpu::Color {
                    r: c.r as f64,
                    g: c.g as f64,
                    b: c.b as f64,
                    a: c.a as f64,
                }),
                None => wgpu::LoadOp::Load,
            };
            let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("agl:pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations { load, store: wgpu::StoreOp::Store },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            rp.set_bind_group(0, &res.vp, &[]);
            for (draw, source) in pass.draws.iter().zip(&res.sources) {
                match draw.scissor {
                    Some([x, y, w, h]) => rp.set_scissor_rect(x, y, w, h),
                    None => rp.set_scissor_rect(0, 0, pass.width, pass.height),
                }
                let range = draw.first..draw.first + draw.count;
                match (draw.kind, source) {
                    (DrawKind::Solid, _) => {
                        let Some(buffer) = res.solid.as_ref() else { continue };
                        rp.set_pipeline(&self.solid);
                        rp.set_vertex_buffer(0, buffer.slice(..));
                        rp.draw(range, 0..1);
                    }
                    (DrawKind::Target(_), Some(source)) => {
                        let Some(buffer) = res.textured.as_ref() else { continue };
                        rp.set_pipeline(&self.blit);
                        rp.set_bind_group(1, source, &[]);
                        rp.set_vertex_buffer(0, buffer.slice(..));
                        rp.draw(range, 0..1);
                    }
                    (DrawKind::Target(id), None) => log::warn!("target {id:?} vanished before its blit"),
                }
            }
        }
        self.queue.submit(Some(encoder.finish()));
        drop(state);
        self.state.borrow_mut().presented += 1;
        Ok(())
    }
}

impl WgpuHandle {
    pub fn frames_presented(&self) -> usize {
        self.state.borrow().presented
    }

    pub fn is_current(&self) -> bool {
        self.state.borrow().current
    }

    /// View of the last presented frame, for compositing onto a window surface.
    pub fn frame_view(&self) -> Option<wgpu::TextureView> {
        let state = self.state.borrow();
        state
            .texture
            .as_ref()
            .map(|t| t.create_view(&wgpu::TextureViewDescriptor::default()))
    }

    /// Premultiplied RGBA bytes of the last presented frame, row by row.
    pub fn read_pixels(&self) -> Result<(u32, u32, Vec<u8>)> {
        let state = self.state.borrow();
        let texture = state
            .texture
            .as_ref()
            .ok_or_else(|| RenderError::Present("no frame presented".into()))?;
        let (width, height) = (state.width, state.height);
        let row = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = row.div_ceil(align) * align;

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("agl:readback"),
            size: (padded * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("agl:readback"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = tx.send(r);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| RenderError::Present(e.to_string()))?
            .map_err(|e| RenderError::Present(e.to_string()))?;

        let mut pixels = Vec::with_capacity((row * height) as usize);
        {
            let data = slice.get_mapped_range();
            for chunk in data.chunks(padded as usize).take(height as usize) {
                pixels.extend_from_slice(&chunk[..row as usize]);
            }
        }
        buffer.unmap();
        Ok((width, height, pixels))
    }

    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let (width, height, pixels) = self.read_pixels()?;
        let size = tiny_skia::IntSize::from_wh(width, height)
            .ok_or_else(|| RenderError::Present("empty frame".into()))?;
        let pixmap = tiny_skia::Pixmap::from_vec(pixels, size)
            .ok_or_else(|| RenderError::Present("frame size mismatch".into()))?;
        pixmap
            .save_png(path.as_ref())
            .map_err(|e| RenderError::Present(e.to_string()))
    }
}
