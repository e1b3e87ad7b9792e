//! Chart renderer implementations
//!
//! One renderer per series type. Each owns its pipelines, bind groups, and a
//! geometrically grown instance staging buffer; none mutates shared GPU state
//! other than its own bind groups. `prepare` computes per-instance data in
//! device-pixel space from the current scales; the shaders convert pixels to
//! clip space through the shared view uniform.

use chartgpu_data::SeriesRuntime;
use chartgpu_shared::{ChartError, ChartResult, SeriesKind, SeriesOptions, SeriesTypeOptions, Theme};

use crate::layout::GridArea;
use crate::scale::Scale;

mod area;
mod bar;
mod candlestick;
mod heatmap;
mod line;
mod pie;
mod scatter;
mod scatter_density;

pub use area::AreaRenderer;
pub use bar::BarRenderer;
pub use candlestick::CandlestickRenderer;
pub use heatmap::HeatmapRenderer;
pub use line::LineRenderer;
pub use pie::PieRenderer;
pub use scatter::ScatterRenderer;
pub use scatter_density::ScatterDensityRenderer;

/// Everything a renderer needs to rebuild its per-instance data for a frame.
pub struct PrepareContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub series_index: usize,
    pub options: &'a SeriesOptions,
    pub series: &'a SeriesRuntime,
    pub x_scale: &'a Scale,
    pub y_scale: &'a Scale,
    pub grid: &'a GridArea,
    pub theme: &'a Theme,
    /// Chart palette; pie slices and multi-color renderers walk it.
    pub palette: &'a [[f32; 4]],
    /// Accumulated stack bases for this series, domain space, one per point.
    pub stack_base: Option<&'a [f64]>,
}

impl PrepareContext<'_> {
    /// Domain x → device pixels.
    pub fn x_px(&self, value: f64) -> f32 {
        (self.x_scale.position(value) * self.grid.dpr) as f32
    }

    /// Domain y → device pixels.
    pub fn y_px(&self, value: f64) -> f32 {
        (self.y_scale.position(value) * self.grid.dpr) as f32
    }
}

/// Trait for all chart renderers
pub trait SeriesRenderer {
    fn kind(&self) -> SeriesKind;

    /// Recomputes per-instance data and uploads staging buffers.
    fn prepare(&mut self, ctx: &PrepareContext<'_>) -> ChartResult<()>;

    /// Records draw calls into the frame's render pass.
    fn render<'a>(&'a mut self, pass: &mut wgpu::RenderPass<'a>);

    /// Whether this renderer records compute passes before the render pass.
    fn has_compute(&self) -> bool {
        false
    }

    /// Records compute work; called before the render pass when
    /// `has_compute` is true.
    fn compute(&mut self, _encoder: &mut wgpu::CommandEncoder) {}

    fn resize(&mut self, _width_px: u32, _height_px: u32) {}

    /// Releases owned GPU resources. Must be safe to call more than once.
    fn dispose(&mut self);
}

/// Creates the renderer for a series' type tag.
pub fn create_renderer(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    format: wgpu::TextureFormat,
    options: &SeriesOptions,
) -> ChartResult<Box<dyn SeriesRenderer>> {
    let renderer: Box<dyn SeriesRenderer> = match &options.type_options {
        SeriesTypeOptions::Line(_) => Box::new(LineRenderer::new(device, format)),
        SeriesTypeOptions::Area(_) => Box::new(AreaRenderer::new(device, format)),
        SeriesTypeOptions::Bar(_) | SeriesTypeOptions::Histogram(_) => {
            Box::new(BarRenderer::new(device, format))
        }
        SeriesTypeOptions::Scatter(_) => Box::new(ScatterRenderer::new(device, format)),
        SeriesTypeOptions::ScatterDensity(density) => Box::new(ScatterDensityRenderer::new(
            device,
            queue,
            format,
            &density.colormap,
        )),
        SeriesTypeOptions::Heatmap(heatmap) => {
            Box::new(HeatmapRenderer::new(device, queue, format, &heatmap.colormap))
        }
        SeriesTypeOptions::Pie(_) => Box::new(PieRenderer::new(device, format)),
        SeriesTypeOptions::Candlestick(_) => Box::new(CandlestickRenderer::new(device, format)),
    };
    if renderer.kind() != options.kind() && options.kind() != SeriesKind::Histogram {
        // Histogram degenerates to the bar renderer by design.
        return Err(ChartError::render(format!(
            "renderer kind mismatch for series {:?}",
            options.kind()
        )));
    }
    Ok(renderer)
}

/// Shared view uniform: pixel→clip conversion, two colors, the domain→pixel
/// affine transform, and one vec4 of per-renderer parameters.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct ViewUniforms {
    /// canvas width px, canvas height px, dpr, unused
    pub viewport: [f32; 4],
    pub color: [f32; 4],
    pub color2: [f32; 4],
    /// Domain → device px: `px.x = t[0]·x + t[1]`, `px.y = t[2]·y + t[3]`.
    pub transform: [f32; 4],
    pub params: [f32; 4],
}

impl ViewUniforms {
    pub fn for_ctx(ctx: &PrepareContext<'_>) -> Self {
        let (ax, bx) = ctx.x_scale.affine_css();
        let (ay, by) = ctx.y_scale.affine_css();
        let dpr = ctx.grid.dpr;
        Self {
            viewport: [
                ctx.grid.canvas_width as f32,
                ctx.grid.canvas_height as f32,
                dpr as f32,
                0.0,
            ],
            color: ctx.series.color,
            color2: ctx.series.color,
            transform: [
                (ax * dpr) as f32,
                (bx * dpr) as f32,
                (ay * dpr) as f32,
                (by * dpr) as f32,
            ],
            params: [0.0; 4],
        }
    }
}

/// Single-uniform bind group layout shared by the simple renderers.
pub(crate) fn uniform_bind_group_layout(
    device: &wgpu::Device,
    label: &str,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
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
    })
}

pub(crate) fn create_uniform_buffer(device: &wgpu::Device, label: &str) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of::<ViewUniforms>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Builds the standard alpha-blended pipeline used by the instanced
/// renderers.
#[allow(clippy::too_many_arguments)]
pub(crate) fn create_pipeline(
    device: &wgpu::Device,
    label: &str,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    vs_entry: &str,
    fs_entry: &str,
    topology: wgpu::PrimitiveTopology,
    format: wgpu::TextureFormat,
    vertex_buffers: &[wgpu::VertexBufferLayout<'_>],
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some(vs_entry),
            buffers: vertex_buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fs_entry),
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
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}
