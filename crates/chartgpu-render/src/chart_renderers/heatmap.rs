//! Heatmap series renderer
//!
//! Heatmap points carry a linear cell index in the x lane (row-major) and the
//! cell value in the y lane. Column count comes from the x-axis categories
//! when present; otherwise the grid is squared off from the point count.
//! Cell dimensions are derived from the grid so every cell occupies equal
//! clip space.

use chartgpu_data::{GrowableBuffer, UploadPlan};
use chartgpu_shared::{ChartResult, ColormapSpec, PointBatch, SeriesKind, SeriesTypeOptions};

use crate::colormap::ColormapTexture;
use crate::chart_renderers::{
    create_pipeline, create_uniform_buffer, PrepareContext, SeriesRenderer, ViewUniforms,
};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct CellInstance {
    cell: [f32; 2],
    value: f32,
}

pub struct HeatmapRenderer {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    lut: ColormapTexture,
    instances: GrowableBuffer,
    instance_count: u32,
    disposed: bool,
}

fn lut_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Heatmap Bind Group Layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

impl HeatmapRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        colormap: &ColormapSpec,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Heatmap Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/heatmap.wgsl").into()),
        });

        let bind_group_layout = lut_bind_group_layout(device);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Heatmap Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32];
        let pipeline = create_pipeline(
            device,
            "Heatmap Pipeline",
            &shader,
            &pipeline_layout,
            "vs_main",
            "fs_main",
            wgpu::PrimitiveTopology::TriangleList,
            format,
            &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<CellInstance>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &ATTRIBUTES,
            }],
        );

        let lut = ColormapTexture::new(device, queue, colormap);
        let uniform_buffer = create_uniform_buffer(device, "Heatmap Uniforms");
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Heatmap Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&lut.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&lut.sampler),
                },
            ],
        });

        Self {
            pipeline,
            uniform_buffer,
            bind_group,
            lut,
            instances: GrowableBuffer::vertex("heatmap-instances"),
            instance_count: 0,
            disposed: false,
        }
    }
}

impl SeriesRenderer for HeatmapRenderer {
    fn kind(&self) -> SeriesKind {
        SeriesKind::Heatmap
    }

    fn prepare(&mut self, ctx: &PrepareContext<'_>) -> ChartResult<()> {
        let heatmap_options = match &ctx.options.type_options {
            SeriesTypeOptions::Heatmap(heatmap) => heatmap,
            _ => return Ok(()),
        };
        let PointBatch::Xy(points) = ctx.series.points() else {
            return Ok(());
        };
        if points.is_empty() {
            self.instance_count = 0;
            return Ok(());
        }

        let cols = match ctx.x_scale {
            crate::scale::Scale::Category(scale) if !scale.is_empty() => scale.len(),
            _ => (points.len() as f64).sqrt().ceil().max(1.0) as usize,
        };
        let rows = points.len().div_ceil(cols);

        let (value_min, value_max) = match (heatmap_options.value_min, heatmap_options.value_max) {
            (Some(lo), Some(hi)) if hi > lo => (lo, hi),
            _ => {
                let lo = points.iter().map(|p| p[1] as f64).fold(f64::INFINITY, f64::min);
                let hi = points
                    .iter()
                    .map(|p| p[1] as f64)
                    .fold(f64::NEG_INFINITY, f64::max);
                if hi > lo {
                    (lo, hi)
                } else {
                    (lo, lo + 1.0)
                }
            }
        };

        let mut records = Vec::with_capacity(points.len());
        for point in points {
            let index = point[0].max(0.0) as usize;
            let value = ((point[1] as f64 - value_min) / (value_max - value_min)) as f32;
            records.push(CellInstance {
                cell: [(index % cols) as f32, (index / cols) as f32],
                value,
            });
        }

        let bytes: &[u8] = bytemuck::cast_slice(&records);
        let plan = UploadPlan::for_replace(self.instances.capacity_bytes(), bytes.len() as u64);
        self.instances.apply(ctx.device, ctx.queue, plan, bytes);
        self.instance_count = records.len() as u32;

        let dpr = ctx.grid.dpr;
        let mut uniforms = ViewUniforms::for_ctx(ctx);
        uniforms.params = [
            (ctx.grid.left * dpr) as f32,
            (ctx.grid.top * dpr) as f32,
            (ctx.grid.plot_width() * dpr / cols as f64) as f32,
            (ctx.grid.plot_height() * dpr / rows as f64) as f32,
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
        self.lut.destroy();
    }
}
