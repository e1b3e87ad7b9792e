//! Scatter series renderer

use chartgpu_shared::{
    ChartResult, ScatterShape, SeriesKind, SeriesTypeOptions, STRIDE_XY_F32,
};

use crate::chart_renderers::{
    create_pipeline, create_uniform_buffer, uniform_bind_group_layout, PrepareContext,
    SeriesRenderer, ViewUniforms,
};

pub struct ScatterRenderer {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    point_buffer: Option<wgpu::Buffer>,
    point_count: u32,
    disposed: bool,
}

impl ScatterRenderer {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scatter Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/scatter.wgsl").into()),
        });

        let bind_group_layout = uniform_bind_group_layout(device, "Scatter Bind Group Layout");
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scatter Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        const POINT: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
        let pipeline = create_pipeline(
            device,
            "Scatter Pipeline",
            &shader,
            &pipeline_layout,
            "vs_main",
            "fs_main",
            wgpu::PrimitiveTopology::TriangleList,
            format,
            &[wgpu::VertexBufferLayout {
                array_stride: STRIDE_XY_F32 as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &POINT,
            }],
        );

        let uniform_buffer = create_uniform_buffer(device, "Scatter Uniforms");
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scatter Bind Group"),
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
            point_buffer: None,
            point_count: 0,
            disposed: false,
        }
    }
}

impl SeriesRenderer for ScatterRenderer {
    fn kind(&self) -> SeriesKind {
        SeriesKind::Scatter
    }

    fn prepare(&mut self, ctx: &PrepareContext<'_>) -> ChartResult<()> {
        let (size_px, shape) = match &ctx.options.type_options {
            SeriesTypeOptions::Scatter(scatter) => (scatter.size_px, scatter.shape),
            _ => (4.0, ScatterShape::Disk),
        };
        let shape_id = match shape {
            ScatterShape::Disk => 0.0,
            ScatterShape::Square => 1.0,
            ScatterShape::Triangle => 2.0,
        };

        let mut uniforms = ViewUniforms::for_ctx(ctx);
        uniforms.params = [
            (size_px as f64 * ctx.grid.dpr * 0.5) as f32,
            shape_id,
            0.0,
            0.0,
        ];
        ctx.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        self.point_buffer = ctx.series.vertex_buffer().cloned();
        self.point_count = ctx.series.effective_len() as u32;
        Ok(())
    }

    fn render(&mut self, pass: &mut wgpu::RenderPass<'_>) {
        let Some(buffer) = self.point_buffer.as_ref() else {
            return;
        };
        if self.disposed || self.point_count == 0 {
            return;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, buffer.slice(..));
        pass.draw(0..6, 0..self.point_count);
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
