//! Line series renderer
//!
//! Draws an anti-aliased polyline as instanced segment quads. The data
//! store's vertex buffer is bound twice, offset by one point, so segment i
//! reads points i and i+1 without any CPU-side geometry.

use chartgpu_shared::{
    ChartResult, SeriesKind, SeriesTypeOptions, STRIDE_XY_F32,
};

use crate::chart_renderers::{
    create_pipeline, create_uniform_buffer, uniform_bind_group_layout, PrepareContext,
    SeriesRenderer, ViewUniforms,
};

pub struct LineRenderer {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    point_buffer: Option<wgpu::Buffer>,
    segment_count: u32,
    disposed: bool,
}

pub(crate) fn segment_vertex_layouts() -> [wgpu::VertexBufferLayout<'static>; 2] {
    const P0: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
    const P1: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];
    [
        wgpu::VertexBufferLayout {
            array_stride: STRIDE_XY_F32 as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &P0,
        },
        wgpu::VertexBufferLayout {
            array_stride: STRIDE_XY_F32 as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &P1,
        },
    ]
}

impl LineRenderer {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Line Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/line.wgsl").into()),
        });

        let bind_group_layout = uniform_bind_group_layout(device, "Line Bind Group Layout");
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Line Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = create_pipeline(
            device,
            "Line Pipeline",
            &shader,
            &pipeline_layout,
            "vs_main",
            "fs_main",
            wgpu::PrimitiveTopology::TriangleList,
            format,
            &segment_vertex_layouts(),
        );

        let uniform_buffer = create_uniform_buffer(device, "Line Uniforms");
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Line Bind Group"),
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
            segment_count: 0,
            disposed: false,
        }
    }
}

impl SeriesRenderer for LineRenderer {
    fn kind(&self) -> SeriesKind {
        SeriesKind::Line
    }

    fn prepare(&mut self, ctx: &PrepareContext<'_>) -> ChartResult<()> {
        let width = match &ctx.options.type_options {
            SeriesTypeOptions::Line(line) => line.width,
            _ => 1.0,
        };

        let mut uniforms = ViewUniforms::for_ctx(ctx);
        uniforms.params = [
            (width as f64 * ctx.grid.dpr * 0.5) as f32,
            ctx.grid.dpr as f32,
            0.0,
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
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, buffer.slice(..));
        pass.set_vertex_buffer(1, buffer.slice(STRIDE_XY_F32 as u64..));
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
