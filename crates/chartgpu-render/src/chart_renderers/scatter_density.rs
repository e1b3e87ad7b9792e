//! Scatter-density renderer
//!
//! Three stages per frame: a binning compute pass accumulates visible points
//! into a pixel-space grid of atomic counters, a reduction pass finds the
//! peak count, and a fullscreen fragment pass maps normalized counts through
//! the colormap LUT.

use chartgpu_shared::{
    ChartResult, ColormapSpec, DensityCurve, SeriesKind, SeriesTypeOptions,
};

use crate::colormap::ColormapTexture;
use crate::chart_renderers::{PrepareContext, SeriesRenderer};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct DensityUniforms {
    transform: [f32; 4],
    grid_origin: [f32; 2],
    cell_size: f32,
    point_count: u32,
    grid_cols: u32,
    grid_rows: u32,
    curve: u32,
    _pad: u32,
}

pub struct ScatterDensityRenderer {
    bin_pipeline: wgpu::ComputePipeline,
    reduce_pipeline: wgpu::ComputePipeline,
    draw_pipeline: wgpu::RenderPipeline,
    compute_layout: wgpu::BindGroupLayout,
    draw_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    bins: Option<wgpu::Buffer>,
    max_buffer: wgpu::Buffer,
    lut: ColormapTexture,
    compute_bind_group: Option<wgpu::BindGroup>,
    draw_bind_group: Option<wgpu::BindGroup>,
    grid_cols: u32,
    grid_rows: u32,
    point_count: u32,
    disposed: bool,
}

impl ScatterDensityRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        colormap: &ColormapSpec,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Density Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/density.wgsl").into()),
        });

        let compute_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Density Compute Bind Group Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::COMPUTE),
                storage_entry(1, wgpu::ShaderStages::COMPUTE, true),
                storage_entry(2, wgpu::ShaderStages::COMPUTE, false),
                storage_entry(3, wgpu::ShaderStages::COMPUTE, false),
            ],
        });
        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Density Draw Bind Group Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                storage_entry(1, wgpu::ShaderStages::FRAGMENT, true),
                storage_entry(2, wgpu::ShaderStages::FRAGMENT, true),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let compute_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Density Compute Pipeline Layout"),
                bind_group_layouts: &[&compute_layout],
                push_constant_ranges: &[],
            });
        let bin_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Density Bin Pipeline"),
            layout: Some(&compute_pipeline_layout),
            module: &shader,
            entry_point: Some("cs_bin"),
            compilation_options: Default::default(),
            cache: None,
        });
        let reduce_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Density Reduce Pipeline"),
            layout: Some(&compute_pipeline_layout),
            module: &shader,
            entry_point: Some("cs_reduce_max"),
            compilation_options: Default::default(),
            cache: None,
        });

        let draw_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Density Draw Pipeline Layout"),
            bind_group_layouts: &[&draw_layout],
            push_constant_ranges: &[],
        });
        let draw_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Density Draw Pipeline"),
            layout: Some(&draw_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_fullscreen"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_colormap"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Density Uniforms"),
            size: std::mem::size_of::<DensityUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let max_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Density Max"),
            size: 4,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            bin_pipeline,
            reduce_pipeline,
            draw_pipeline,
            compute_layout,
            draw_layout,
            uniform_buffer,
            bins: None,
            max_buffer,
            lut: ColormapTexture::new(device, queue, colormap),
            compute_bind_group: None,
            draw_bind_group: None,
            grid_cols: 0,
            grid_rows: 0,
            point_count: 0,
            disposed: false,
        }
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn storage_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    read_only: bool,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

impl SeriesRenderer for ScatterDensityRenderer {
    fn kind(&self) -> SeriesKind {
        SeriesKind::ScatterDensity
    }

    fn prepare(&mut self, ctx: &PrepareContext<'_>) -> ChartResult<()> {
        let density_options = match &ctx.options.type_options {
            SeriesTypeOptions::ScatterDensity(density) => density,
            _ => return Ok(()),
        };
        let Some(point_buffer) = ctx.series.vertex_buffer() else {
            self.point_count = 0;
            return Ok(());
        };

        let (clip_x, clip_y, clip_w, clip_h) = ctx.grid.clip_rect_px();
        let cell = density_options.cell_size_px.max(1);
        let cols = clip_w.div_ceil(cell).max(1);
        let rows = clip_h.div_ceil(cell).max(1);

        if cols != self.grid_cols || rows != self.grid_rows || self.bins.is_none() {
            if let Some(old) = self.bins.take() {
                old.destroy();
            }
            self.bins = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Density Bins"),
                size: cols as u64 * rows as u64 * 4,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.grid_cols = cols;
            self.grid_rows = rows;
        }
        let bins = self.bins.as_ref().expect("bins allocated above");

        let (ax, bx) = ctx.x_scale.affine_css();
        let (ay, by) = ctx.y_scale.affine_css();
        let dpr = ctx.grid.dpr;
        let uniforms = DensityUniforms {
            transform: [
                (ax * dpr) as f32,
                (bx * dpr) as f32,
                (ay * dpr) as f32,
                (by * dpr) as f32,
            ],
            grid_origin: [clip_x as f32, clip_y as f32],
            cell_size: cell as f32,
            point_count: ctx.series.effective_len() as u32,
            grid_cols: cols,
            grid_rows: rows,
            curve: match density_options.curve {
                DensityCurve::Linear => 0,
                DensityCurve::Sqrt => 1,
                DensityCurve::Log => 2,
            },
            _pad: 0,
        };
        ctx.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));
        self.point_count = uniforms.point_count;

        self.compute_bind_group = Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Density Compute Bind Group"),
            layout: &self.compute_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: point_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: bins.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: self.max_buffer.as_entire_binding(),
                },
            ],
        }));
        self.draw_bind_group = Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Density Draw Bind Group"),
            layout: &self.draw_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: bins.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.max_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&self.lut.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&self.lut.sampler),
                },
            ],
        }));
        Ok(())
    }

    fn has_compute(&self) -> bool {
        true
    }

    fn compute(&mut self, encoder: &mut wgpu::CommandEncoder) {
        let (Some(bins), Some(bind_group)) = (self.bins.as_ref(), self.compute_bind_group.as_ref())
        else {
            return;
        };
        if self.disposed || self.point_count == 0 {
            return;
        }

        encoder.clear_buffer(bins, 0, None);
        encoder.clear_buffer(&self.max_buffer, 0, None);

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Density Bin Pass"),
            timestamp_writes: None,
        });
        pass.set_bind_group(0, bind_group, &[]);
        pass.set_pipeline(&self.bin_pipeline);
        pass.dispatch_workgroups(self.point_count.div_ceil(256), 1, 1);
        pass.set_pipeline(&self.reduce_pipeline);
        pass.dispatch_workgroups((self.grid_cols * self.grid_rows).div_ceil(256), 1, 1);
    }

    fn render(&mut self, pass: &mut wgpu::RenderPass<'_>) {
        let Some(bind_group) = self.draw_bind_group.as_ref() else {
            return;
        };
        if self.disposed || self.point_count == 0 {
            return;
        }
        pass.set_pipeline(&self.draw_pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.uniform_buffer.destroy();
        self.max_buffer.destroy();
        if let Some(bins) = self.bins.take() {
            bins.destroy();
        }
        self.compute_bind_group = None;
        self.draw_bind_group = None;
        self.lut.destroy();
    }
}
