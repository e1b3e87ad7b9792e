//! Area series renderer
//!
//! Same segment instancing as the line renderer, with a fill pass down to the
//! baseline row and a stroke pass on top.

use chartgpu_shared::{ChartResult, SeriesKind, SeriesTypeOptions, STRIDE_XY_F32};

use crate::chart_renderers::line::segment_vertex_layouts;
use crate::chart_renderers::{
    create_pipeline, create_uniform_buffer, uniform_bind_group_layout, PrepareContext,
    SeriesRenderer, ViewUniforms,
};

pub struct AreaRenderer {
    fill_pipeline: wgpu::RenderPipeline,
    stroke_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    point_buffer: Option<wgpu::Buffer>,
    segment_count: u32,
    disposed: bool,
}

impl AreaRenderer {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Area Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/area.wgsl").into()),
        });

        let bind_group_layout = uniform_bind_group_layout(device, "Area Bind Group Layout");
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Area Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let fill_pipeline = create_pipeline(
            device,
            "Area Fill Pipeline",
            &shader,
            &pipeline_layout,
            "vs_fill",
            "fs_fill",
            wgpu::PrimitiveTopology::TriangleList,
            format,
            &segment_vertex_layouts(),
        );
        let stroke_pipeline = create_pipeline(
            device,
            "Area Stroke Pipeline",
            &shader,
            &pipeline_layout,
            "vs_stroke",
            "fs_stroke",
            wgpu::PrimitiveTopology::TriangleList,
            format,
            &segment_vertex_layouts(),
        );

        let uniform_buffer = create_uniform_buffer(device, "Area Uniforms");
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Area Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Self {
            fill_pipeline,
            stroke_pipeline,
            uniform_buffer,
            bind_group,
            point_buffer: None,
            segment_count: 0,
            disposed: false,
        }
    }
}

impl SeriesRenderer for AreaRenderer {
    fn kind(&self) -> SeriesKind {
        SeriesKind::Area
    }

    fn prepare(&mut self, ctx: &PrepareContext<'_>) -> ChartResult<()> {
        let line_options = match &ctx.options.type_options {
            SeriesTypeOptions::Area(line) => Some(line),
            _ => None,
        };
        let width = line_options.map_or(1.0, |l| l.width);
        let area_style = line_options.and_then(|l| l.area_style.as_ref());

        let baseline_domain = area_style.map_or(0.0, |style| style.baseline);
        let fill_color = area_style.map_or_else(
            || {
                let c = ctx.series.color;
                [c[0], c[1], c[2], c[3] * 0.25]
            },
            |style| style.fill_color,
        );

        let mut uniforms = ViewUniforms::for_ctx(ctx);
        uniforms.color2 = fill_color;
        uniforms.params = [
            (width as f64 * ctx.grid.dpr * 0.5) as f32,
            ctx.grid.dpr as f32,
            ctx.y_px(baseline_domain),
            0.0,
        ];
        ctx.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        self.point_buffer = ctx.series.vertex_buffer().cloned();
        self.segment_count = ctx.series.effective_len().saturating_sub(1) as u32;
        Ok(())
    }

    fn render(&mut self, pass: &mut wgpu::RenderPass<'_>) {
        let Some(buffer) = self.point_buffer.as_ref() else {
            return;
        };
        if self.disposed || self.segment_count == 0 {
            return;
        }
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, buffer.slice(..));
        pass.set_vertex_buffer(1, buffer.slice(STRIDE_XY_F32 as u64..));

        pass.set_pipeline(&self.fill_pipeline);
        pass.draw(0..6, 0..self.segment_count);

        pass.set_pipeline(&self.stroke_pipeline);
        pass.draw(0..6, 0..self.segment_count);
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.uniform_buffer.destroy();
        self.point_buffer = None;
    }
}
