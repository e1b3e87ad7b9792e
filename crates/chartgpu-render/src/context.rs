//! Graphics context: adapter, device, queue, and the drawing surface
//!
//! One context per chart instance; device loss affects only that chart.

use std::sync::Arc;

use chartgpu_shared::{
    Capabilities, ChartError, ChartResult, DeviceLostReason, GpuErrorClass,
};

/// Creation-time knobs for the graphics context.
#[derive(Debug, Clone)]
pub struct ContextOptions {
    /// Ask the driver for the high-performance adapter.
    pub prefer_high_performance: bool,
    /// Request `TIMESTAMP_QUERY` when the adapter advertises it.
    pub enable_timestamp_query: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            prefer_high_performance: true,
            enable_timestamp_query: true,
        }
    }
}

/// Owns the wgpu device, queue, and configured surface for one chart.
pub struct GraphicsContext {
    pub instance: wgpu::Instance,
    pub adapter: Arc<wgpu::Adapter>,
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
    /// Device pixels per CSS pixel.
    pub dpr: f64,
    supports_timestamp_query: bool,
    destroyed: bool,
}

impl GraphicsContext {
    /// Acquires adapter, device, and surface for the given target.
    ///
    /// `width_px`/`height_px` are device pixels. Fails with `GraphicsInit`
    /// when no adapter or device can be obtained.
    pub async fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        width_px: u32,
        height_px: u32,
        dpr: f64,
        options: &ContextOptions,
    ) -> ChartResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(target)
            .map_err(|e| ChartError::GraphicsInit {
                message: format!("failed to create surface: {e}"),
            })?;

        let power_preference = if options.prefer_high_performance {
            wgpu::PowerPreference::HighPerformance
        } else {
            wgpu::PowerPreference::default()
        };

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| ChartError::GraphicsInit {
                message: format!("no suitable GPU adapter: {e:?}"),
            })?;
        let adapter = Arc::new(adapter);

        let mut features = wgpu::Features::empty();
        if options.enable_timestamp_query
            && adapter.features().contains(wgpu::Features::TIMESTAMP_QUERY)
        {
            features |= wgpu::Features::TIMESTAMP_QUERY;
        }
        let supports_timestamp_query = features.contains(wgpu::Features::TIMESTAMP_QUERY);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("ChartGPU Device"),
                required_features: features,
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await?;
        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities.formats[0];

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width_px.max(1),
            height: height_px.max(1),
            present_mode: wgpu::PresentMode::AutoNoVsync,
            alpha_mode: surface_capabilities.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        };
        surface.configure(&device, &config);

        log::info!(
            "graphics context ready: {} / {:?}, format {:?}, {}x{} @ {}",
            adapter.get_info().name,
            adapter.get_info().backend,
            format,
            config.width,
            config.height,
            dpr,
        );

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            surface,
            config,
            dpr,
            supports_timestamp_query,
            destroyed: false,
        })
    }

    pub fn preferred_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn supports_timestamp_query(&self) -> bool {
        self.supports_timestamp_query
    }

    /// Device and format facts reported with `ready`.
    pub fn capabilities(&self) -> Capabilities {
        let info = self.adapter.get_info();
        Capabilities {
            backend: format!("{:?}", info.backend),
            preferred_format: format!("{:?}", self.config.format),
            timestamp_query: self.supports_timestamp_query,
            max_texture_dimension_2d: self.device.limits().max_texture_dimension_2d,
        }
    }

    /// Installs the device-lost forwarder. wgpu invokes the callback once,
    /// from its own thread.
    pub fn on_device_lost(
        &self,
        callback: impl FnOnce(DeviceLostReason, String) + Send + 'static,
    ) {
        let callback = std::sync::Mutex::new(Some(callback));
        self.device
            .set_device_lost_callback(move |reason, message| {
                if let Some(callback) = callback.lock().unwrap().take() {
                    callback(DeviceLostReason::from(reason), message);
                }
            });
    }

    /// Installs the uncaptured-error sink.
    pub fn on_uncaptured_error(
        &self,
        callback: impl Fn(GpuErrorClass, String) + Send + Sync + 'static,
    ) {
        self.device
            .on_uncaptured_error(Box::new(move |error: wgpu::Error| {
                callback(GpuErrorClass::from(&error), error.to_string());
            }));
    }

    /// Reconfigures the surface to new device-pixel dimensions.
    pub fn resize(&mut self, width_px: u32, height_px: u32, dpr: f64) {
        let width = width_px.max(1);
        let height = height_px.max(1);
        if self.config.width != width || self.config.height != height || self.dpr != dpr {
            self.config.width = width;
            self.config.height = height;
            self.dpr = dpr;
            if !self.destroyed {
                self.surface.configure(&self.device, &self.config);
            }
        }
    }

    /// Acquires the current swap-chain texture and a view onto it.
    pub fn current_view(&self) -> ChartResult<(wgpu::SurfaceTexture, wgpu::TextureView)> {
        let texture = self.surface.get_current_texture()?;
        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Ok((texture, view))
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Destroys the device. Idempotent; the second call is a no-op.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.device.destroy();
        log::info!("graphics context destroyed");
    }
}
