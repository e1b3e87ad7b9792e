//! Pie series renderer
//!
//! Slice angles come from the y lane of the series points, in config order;
//! colors walk the palette slot by slot.

use chartgpu_data::{GrowableBuffer, UploadPlan};
use chartgpu_shared::{ChartResult, PointBatch, SeriesKind, SeriesTypeOptions};

use crate::chart_renderers::{
    create_pipeline, create_uniform_buffer, uniform_bind_group_layout, PrepareContext,
    SeriesRenderer, ViewUniforms,
};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct SliceInstance {
    angles: [f32; 2],
    color: [f32; 4],
}

pub struct PieRenderer {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    instances: GrowableBuffer,
    instance_count: u32,
    disposed: bool,
}

impl PieRenderer {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Pie Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/pie.wgsl").into()),
        });

        let bind_group_layout = uniform_bind_group_layout(device, "Pie Bind Group Layout");
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Pie Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x4];
        let pipeline = create_pipeline(
            device,
            "Pie Pipeline",
            &shader,
            &pipeline_layout,
            "vs_main",
            "fs_main",
            wgpu::PrimitiveTopology::TriangleList,
            format,
            &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<SliceInstance>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &ATTRIBUTES,
            }],
        );

        let uniform_buffer = create_uniform_buffer(device, "Pie Uniforms");
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Pie Bind Group"),
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
            instances: GrowableBuffer::vertex("pie-instances"),
            instance_count: 0,
            disposed: false,
        }
    }

    /// Cumulative slice angles in radians, clockwise from 12 o'clock.
    pub fn slice_angles(values: &[f64], start_angle_deg: f64) -> Vec<(f64, f64)> {
        let total: f64 = values.iter().filter(|v| v.is_finite() && **v > 0.0).sum();
        if total <= 0.0 {
            return Vec::new();
        }
        let mut angles = Vec::with_capacity(values.len());
        let mut cursor = start_angle_deg.to_radians();
        for value in values {
            let sweep = if value.is_finite() && *value > 0.0 {
                value / total * std::f64::consts::TAU
            } else {
                0.0
            };
            angles.push((cursor, cursor + sweep));
            cursor += sweep;
        }
        angles
    }
}

impl SeriesRenderer for PieRenderer {
    fn kind(&self) -> SeriesKind {
        SeriesKind::Pie
    }

    fn prepare(&mut self, ctx: &PrepareContext<'_>) -> ChartResult<()> {
        let pie_options = match &ctx.options.type_options {
            SeriesTypeOptions::Pie(pie) => pie,
            _ => return Ok(()),
        };
        let PointBatch::Xy(points) = ctx.series.points() else {
            return Ok(());
        };

        let values: Vec<f64> = points.iter().map(|p| p[1] as f64).collect();
        let angles = Self::slice_angles(&values, pie_options.start_angle_deg);

        let fallback = [ctx.series.color];
        let palette: &[[f32; 4]] = if ctx.palette.is_empty() {
            &fallback
        } else {
            ctx.palette
        };

        let mut records = Vec::with_capacity(angles.len());
        for (i, (a0, a1)) in angles.iter().enumerate() {
            records.push(SliceInstance {
                angles: [*a0 as f32, *a1 as f32],
                color: palette[i % palette.len()],
            });
        }

        let bytes: &[u8] = bytemuck::cast_slice(&records);
        let plan = UploadPlan::for_replace(self.instances.capacity_bytes(), bytes.len() as u64);
        self.instances.apply(ctx.device, ctx.queue, plan, bytes);
        self.instance_count = records.len() as u32;

        let dpr = ctx.grid.dpr;
        let center_x = (ctx.grid.left + ctx.grid.plot_width() * pie_options.center[0]) * dpr;
        let center_y = (ctx.grid.top + ctx.grid.plot_height() * pie_options.center[1]) * dpr;

        let mut uniforms = ViewUniforms::for_ctx(ctx);
        uniforms.params = [
            center_x as f32,
            center_y as f32,
            pie_options.radius_px as f32,
            dpr as f32,
        ];
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
