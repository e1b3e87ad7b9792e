//! Bar series renderer
//!
//! Also serves histogram series (binning happens outside the core, so a
//! histogram arrives as bar data). Bar rectangles are computed CPU-side into
//! an instance staging buffer because stacking bases come from sibling
//! series.

use chartgpu_data::{GrowableBuffer, UploadPlan};
use chartgpu_shared::{ChartResult, PointBatch, SeriesKind, SeriesTypeOptions};

use crate::chart_renderers::{
    create_pipeline, create_uniform_buffer, uniform_bind_group_layout, PrepareContext,
    SeriesRenderer, ViewUniforms,
};
use crate::scale::Scale;

/// Instance record: rect origin and size in device pixels.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct BarInstance {
    origin: [f32; 2],
    size: [f32; 2],
}

pub struct BarRenderer {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    instances: GrowableBuffer,
    instance_count: u32,
    disposed: bool,
}

impl BarRenderer {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Bar Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/bar.wgsl").into()),
        });

        let bind_group_layout = uniform_bind_group_layout(device, "Bar Bind Group Layout");
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Bar Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];
        let pipeline = create_pipeline(
            device,
            "Bar Pipeline",
            &shader,
            &pipeline_layout,
            "vs_main",
            "fs_main",
            wgpu::PrimitiveTopology::TriangleList,
            format,
            &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<BarInstance>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &ATTRIBUTES,
            }],
        );

        let uniform_buffer = create_uniform_buffer(device, "Bar Uniforms");
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Bar Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Self {
            pipeline,
            uniform_buffer,
            bind_group,
            instances: GrowableBuffer::vertex("bar-instances"),
            instance_count: 0,
            disposed: false,
        }
    }

    /// Slot width in CSS pixels for one bar: the category bandwidth, or the
    /// smallest x gap for value axes.
    fn slot_width_css(x_scale: &Scale, points: &[[f32; 2]]) -> f64 {
        match x_scale {
            Scale::Category(scale) => scale.bandwidth(),
            Scale::Linear(scale) => {
                let mut min_gap = f64::INFINITY;
                for pair in points.windows(2) {
                    let gap = (scale.scale(pair[1][0] as f64) - scale.scale(pair[0][0] as f64))
                        .abs();
                    if gap > 0.0 {
                        min_gap = min_gap.min(gap);
                    }
                }
                if min_gap.is_finite() {
                    min_gap
                } else {
                    (scale.range_max - scale.range_min).abs().max(1.0)
                }
            }
        }
    }
}

impl SeriesRenderer for BarRenderer {
    fn kind(&self) -> SeriesKind {
        SeriesKind::Bar
    }

    fn prepare(&mut self, ctx: &PrepareContext<'_>) -> ChartResult<()> {
        let bar_options = match &ctx.options.type_options {
            SeriesTypeOptions::Bar(bar) | SeriesTypeOptions::Histogram(bar) => bar,
            _ => return Ok(()),
        };
        let PointBatch::Xy(points) = ctx.series.points() else {
            return Ok(());
        };

        let dpr = ctx.grid.dpr;
        let slot_css = Self::slot_width_css(ctx.x_scale, points);
        let bar_width_px = (slot_css
            * bar_options.width_ratio.clamp(0.01, 1.0) as f64
            * (1.0 - bar_options.gap_ratio.clamp(0.0, 0.95) as f64)
            * dpr)
            .max(1.0) as f32;

        let mut records = Vec::with_capacity(points.len());
        for (i, point) in points.iter().enumerate() {
            let base = ctx.stack_base.and_then(|b| b.get(i).copied()).unwrap_or(0.0);
            let x_px = ctx.x_px(point[0] as f64);
            let y0_px = ctx.y_px(base);
            let y1_px = ctx.y_px(base + point[1] as f64);
            let top = y0_px.min(y1_px);
            let height = (y0_px - y1_px).abs().max(1.0);
            records.push(BarInstance {
                origin: [x_px - bar_width_px * 0.5, top],
                size: [bar_width_px, height],
            });
        }

        let bytes: &[u8] = bytemuck::cast_slice(&records);
        let plan = UploadPlan::for_replace(self.instances.capacity_bytes(), bytes.len() as u64);
        self.instances.apply(ctx.device, ctx.queue, plan, bytes);
        self.instance_count = records.len() as u32;

        let mut uniforms = ViewUniforms::for_ctx(ctx);
        uniforms.params = [(bar_options.corner_radius_px as f64 * dpr) as f32, 0.0, 0.0, 0.0];
        ctx.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));
        Ok(())
    }

    fn render(&mut self, pass: &mut wgpu::RenderPass<'_>) {
        let Some(buffer) = self.instances.buffer() else {
            return;
        };
        if self.disposed || self.instance_count == 0 {
            return;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, buffer.slice(..));
        pass.draw(0..6, 0..self.instance_count);
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.uniform_buffer.destroy();
        self.instances.destroy();
    }
}
