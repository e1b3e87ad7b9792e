//! Candlestick series renderer

use chartgpu_shared::{
    CandleStyle, ChartResult, SeriesKind, SeriesTypeOptions, STRIDE_OHLC_F32,
};

use crate::chart_renderers::{
    create_pipeline, create_uniform_buffer, uniform_bind_group_layout, PrepareContext,
    SeriesRenderer, ViewUniforms,
};
use crate::scale::Scale;

pub struct CandlestickRenderer {
    body_pipeline: wgpu::RenderPipeline,
    wick_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    candle_buffer: Option<wgpu::Buffer>,
    candle_count: u32,
    disposed: bool,
}

fn candle_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] = [
        wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32,
        },
        wgpu::VertexAttribute {
            offset: 4,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x4,
        },
    ];
    wgpu::VertexBufferLayout {
        array_stride: STRIDE_OHLC_F32 as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &ATTRIBUTES,
    }
}

impl CandlestickRenderer {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Candlestick Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/candlestick.wgsl").into()),
        });

        let bind_group_layout = uniform_bind_group_layout(device, "Candlestick Bind Group Layout");
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Candlestick Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let body_pipeline = create_pipeline(
            device,
            "Candlestick Body Pipeline",
            &shader,
            &pipeline_layout,
            "vs_body",
            "fs_body",
            wgpu::PrimitiveTopology::TriangleList,
            format,
            &[candle_vertex_layout()],
        );
        let wick_pipeline = create_pipeline(
            device,
            "Candlestick Wick Pipeline",
            &shader,
            &pipeline_layout,
            "vs_wick",
            "fs_wick",
            wgpu::PrimitiveTopology::LineList,
            format,
            &[candle_vertex_layout()],
        );

        let uniform_buffer = create_uniform_buffer(device, "Candlestick Uniforms");
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Candlestick Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Self {
            body_pipeline,
            wick_pipeline,
            uniform_buffer,
            bind_group,
            candle_buffer: None,
            candle_count: 0,
            disposed: false,
        }
    }

    /// Candle slot width in CSS pixels: the smallest t gap on the x scale.
    fn slot_width_css(x_scale: &Scale, candles: &[[f32; 5]]) -> f64 {
        match x_scale {
            Scale::Category(scale) => scale.bandwidth(),
            Scale::Linear(scale) => {
                let mut min_gap = f64::INFINITY;
                for pair in candles.windows(2) {
                    let gap =
                        (scale.scale(pair[1][0] as f64) - scale.scale(pair[0][0] as f64)).abs();
                    if gap > 0.0 {
                        min_gap = min_gap.min(gap);
                    }
                }
                if min_gap.is_finite() {
                    min_gap
                } else {
                    8.0
                }
            }
        }
    }
}

impl SeriesRenderer for CandlestickRenderer {
    fn kind(&self) -> SeriesKind {
        SeriesKind::Candlestick
    }

    fn prepare(&mut self, ctx: &PrepareContext<'_>) -> ChartResult<()> {
        let candle_options = match &ctx.options.type_options {
            SeriesTypeOptions::Candlestick(candle) => candle,
            _ => return Ok(()),
        };
        let chartgpu_shared::PointBatch::Ohlc(candles) = ctx.series.points() else {
            return Ok(());
        };

        let slot_css = Self::slot_width_css(ctx.x_scale, candles);
        let half_body_px = (slot_css
            * candle_options.body_ratio.clamp(0.05, 1.0) as f64
            * ctx.grid.dpr
            * 0.5)
            .max(0.5);

        let mut uniforms = ViewUniforms::for_ctx(ctx);
        uniforms.color = candle_options.up_color;
        uniforms.color2 = candle_options.down_color;
        uniforms.params = [
            half_body_px as f32,
            if candle_options.style == CandleStyle::Hollow {
                1.0
            } else {
                0.0
            },
            (ctx.grid.dpr * 1.5) as f32,
            0.0,
        ];
        ctx.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        self.candle_buffer = ctx.series.vertex_buffer().cloned();
        self.candle_count = ctx.series.effective_len() as u32;
        Ok(())
    }

    fn render(&mut self, pass: &mut wgpu::RenderPass<'_>) {
        let Some(buffer) = self.candle_buffer.as_ref() else {
            return;
        };
        if self.disposed || self.candle_count == 0 {
            return;
        }
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, buffer.slice(..));

        pass.set_pipeline(&self.body_pipeline);
        pass.draw(0..6, 0..self.candle_count);

        pass.set_pipeline(&self.wick_pipeline);
        pass.draw(0..2, 0..self.candle_count);
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.uniform_buffer.destroy();
        self.candle_buffer = None;
    }
}
