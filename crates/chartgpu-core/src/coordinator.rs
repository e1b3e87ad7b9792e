//! Render coordinator
//!
//! The integrator: owns the graphics context, data store, renderer set,
//! scheduler, interaction engine, and overlay broker for one chart. Dirty
//! marks coalesce into at most one render per tick; the flush order inside a
//! frame is options → layout → data → interaction → theme.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use chartgpu_data::DataStore;
use chartgpu_render::{
    compute_grid_area, create_renderer, facet_cells, CategoryScale, GraphicsContext, GridArea,
    LinearScale, PrepareContext, Scale, SeriesRenderer,
};
use chartgpu_shared::{
    AutoBoundsMode, AxisKind, AxisLabels, AxisOptions, ChartError, ChartResult, ClickEvent,
    CrosshairMoveEvent, DeviceLostReason, ErrorEvent, GpuErrorClass, HoverChangeEvent, LegendItem,
    PointBatch, PointerEvent, ResolvedOptions, SeriesKind, SeriesTypeOptions, TooltipPayload,
    ZoomChangeEvent,
};

use crate::hit_test::HitTestEnv;
use crate::interaction::{InteractionEffect, InteractionEngine};
use crate::overlay::{OverlayBroker, OverlayWidgets};
use crate::scheduler::{DirtyFlags, FrameMetrics, FrameScheduler};

/// Who renders the overlays: the host's widget cluster, or callback events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayMode {
    Host,
    Embedded,
}

/// Event callbacks out of the coordinator. All optional.
#[derive(Default)]
pub struct ChartCallbacks {
    pub on_tooltip: Option<Box<dyn Fn(Option<&TooltipPayload>)>>,
    pub on_legend: Option<Box<dyn Fn(&[LegendItem])>>,
    pub on_axis_labels: Option<Box<dyn Fn(&AxisLabels)>>,
    pub on_hover_change: Option<Box<dyn Fn(&HoverChangeEvent)>>,
    pub on_click: Option<Box<dyn Fn(&ClickEvent)>>,
    pub on_crosshair_move: Option<Box<dyn Fn(&CrosshairMoveEvent)>>,
    pub on_zoom_change: Option<Box<dyn Fn(&ZoomChangeEvent)>>,
    pub on_error: Option<Box<dyn Fn(&ErrorEvent)>>,
    /// Called after each presented frame with its CPU time in ms.
    pub on_rendered: Option<Box<dyn Fn(f64)>>,
}

/// Signals written from wgpu callback threads, drained on the render thread.
#[derive(Default)]
struct GpuSignals {
    lost: AtomicBool,
    lost_detail: Mutex<Option<(DeviceLostReason, String)>>,
    errors: Mutex<Vec<(GpuErrorClass, String)>>,
}

struct RendererSlot {
    kind: SeriesKind,
    renderer: Box<dyn SeriesRenderer>,
}

pub struct RenderCoordinator {
    gpu: GraphicsContext,
    options: ResolvedOptions,
    store: DataStore,
    renderers: Vec<RendererSlot>,
    scheduler: FrameScheduler,
    interaction: InteractionEngine,
    overlay_mode: OverlayMode,
    widgets: Option<Box<dyn OverlayWidgets>>,
    callbacks: ChartCallbacks,
    grid: GridArea,
    /// Facet cells when a facet config is present; series i draws into cell
    /// `i % cells.len()`.
    facet_grids: Vec<GridArea>,
    x_scale: Scale,
    y_scale: Scale,
    dirty: DirtyFlags,
    signals: Arc<GpuSignals>,
    on_request_render: Option<Box<dyn Fn()>>,
    render_requested: bool,
    zoom_subscribers: Vec<(u64, Box<dyn Fn(&ZoomChangeEvent)>)>,
    crosshair_subscribers: Vec<(u64, Box<dyn Fn(&CrosshairMoveEvent)>)>,
    next_subscription: u64,
    epoch: Instant,
    last_pointer_css: (f64, f64),
    tooltip_active: bool,
    disposed: bool,
    device_lost: bool,
}

impl RenderCoordinator {
    pub fn new(
        gpu: GraphicsContext,
        options: ResolvedOptions,
        callbacks: ChartCallbacks,
        overlay_mode: OverlayMode,
        widgets: Option<Box<dyn OverlayWidgets>>,
    ) -> ChartResult<Self> {
        let signals = Arc::new(GpuSignals::default());
        {
            let signals = Arc::clone(&signals);
            gpu.on_device_lost(move |reason, message| {
                log::error!("device lost ({reason:?}): {message}");
                *signals.lost_detail.lock() = Some((reason, message));
                signals.lost.store(true, Ordering::Release);
            });
        }
        {
            let signals = Arc::clone(&signals);
            gpu.on_uncaptured_error(move |class, message| {
                log::error!("uncaptured GPU error ({class:?}): {message}");
                signals.errors.lock().push((class, message));
            });
        }

        let grid = compute_grid_area(&options, gpu.config.width, gpu.config.height, gpu.dpr, None);
        let interaction = InteractionEngine::new(options.zoom.as_ref());

        let mut coordinator = Self {
            gpu,
            store: DataStore::new(),
            renderers: Vec::new(),
            scheduler: FrameScheduler::new(60.0),
            interaction,
            overlay_mode,
            widgets,
            callbacks,
            grid,
            facet_grids: Vec::new(),
            x_scale: Scale::Linear(LinearScale::new(0.0, 1.0, 0.0, 1.0)),
            y_scale: Scale::Linear(LinearScale::new(0.0, 1.0, 0.0, 1.0)),
            dirty: DirtyFlags::all(),
            signals,
            on_request_render: None,
            render_requested: false,
            zoom_subscribers: Vec::new(),
            crosshair_subscribers: Vec::new(),
            next_subscription: 1,
            epoch: Instant::now(),
            last_pointer_css: (0.0, 0.0),
            tooltip_active: false,
            disposed: false,
            device_lost: false,
            options,
        };
        coordinator
            .store
            .configure(&coordinator.options.series, &coordinator.options.palette)?;
        coordinator.scheduler.start();
        coordinator.schedule();
        Ok(coordinator)
    }

    /// Installs the single-shot render notifier. The scheduler guarantees at
    /// most one frame per notifier pulse.
    pub fn set_request_render(&mut self, notifier: impl Fn() + 'static) {
        self.on_request_render = Some(Box::new(notifier));
    }

    pub fn capabilities(&self) -> chartgpu_shared::Capabilities {
        self.gpu.capabilities()
    }

    pub fn metrics(&self) -> FrameMetrics {
        self.scheduler.metrics(self.now_ms())
    }

    /// Resumes the render-on-demand loop.
    pub fn start_loop(&mut self) {
        self.scheduler.start();
    }

    /// Pauses the loop; `tick_once` still renders.
    pub fn stop_loop(&mut self) {
        self.scheduler.stop();
    }

    /// Diagnostic snapshot for debug overlays.
    pub fn stats(&self) -> serde_json::Value {
        let metrics = self.metrics();
        serde_json::json!({
            "store": self.store.stats(),
            "renderers": self.renderers.iter().map(|s| format!("{:?}", s.kind)).collect::<Vec<_>>(),
            "fps": metrics.exact_fps,
            "frame_ms_p95": metrics.p95_frame_ms,
            "device_lost": self.device_lost,
            "disposed": self.disposed,
        })
    }

    // ---- public contract ------------------------------------------------

    /// Replaces the option snapshot and reconciles everything derived.
    pub fn set_options(&mut self, options: ResolvedOptions) -> ChartResult<()> {
        self.ensure_live()?;
        self.options = options;
        self.store
            .configure(&self.options.series, &self.options.palette)?;
        self.interaction.reconfigure(self.options.zoom.as_ref());
        self.dirty.options = true;
        self.dirty.layout = true;
        self.dirty.theme = true;
        self.schedule();
        Ok(())
    }

    /// Appends validated points to a series. Coalesces with other appends in
    /// the same tick.
    pub fn append_data(&mut self, series_index: usize, batch: PointBatch) -> ChartResult<()> {
        self.ensure_live()?;
        self.store.append(series_index, batch)?;
        if self.options.auto_scroll {
            if let Some(zoom) = self.interaction.auto_scroll_to_end() {
                self.publish_zoom(&ZoomChangeEvent {
                    start: zoom.start,
                    end: zoom.end,
                    source: Some("auto-scroll".to_string()),
                });
            }
        }
        self.dirty.data = true;
        self.dirty.layout = true;
        self.schedule();
        Ok(())
    }

    pub fn replace_data(&mut self, series_index: usize, batch: PointBatch) -> ChartResult<()> {
        self.ensure_live()?;
        self.store.replace(series_index, batch)?;
        self.dirty.data = true;
        self.dirty.layout = true;
        self.schedule();
        Ok(())
    }

    /// Resize in CSS pixels plus device-pixel ratio.
    pub fn resize(&mut self, css_width: f64, css_height: f64, dpr: f64) -> ChartResult<()> {
        self.ensure_live()?;
        let width_px = (css_width * dpr).round().max(1.0) as u32;
        let height_px = (css_height * dpr).round().max(1.0) as u32;
        self.gpu.resize(width_px, height_px, dpr);
        for slot in &mut self.renderers {
            slot.renderer.resize(width_px, height_px);
        }
        self.dirty.layout = true;
        self.schedule();
        Ok(())
    }

    /// Programmatic zoom; no-op when zoom is disabled or the window is
    /// unchanged. Publishes with `source = "api"`.
    pub fn set_zoom_range(&mut self, start: f64, end: f64) -> ChartResult<()> {
        self.ensure_live()?;
        if !start.is_finite() || !end.is_finite() {
            return Err(ChartError::invalid_argument("zoom bounds must be finite"));
        }
        if let Some(zoom) = self.interaction.set_zoom(start, end) {
            self.publish_zoom(&ZoomChangeEvent {
                start: zoom.start,
                end: zoom.end,
                source: Some("api".to_string()),
            });
            self.dirty.layout = true;
            self.schedule();
        }
        Ok(())
    }

    pub fn get_zoom_range(&self) -> Option<(f64, f64)> {
        self.interaction.zoom().map(|z| (z.start, z.end))
    }

    /// Drives the crosshair from a domain x (or clears it). The source tag
    /// is echoed in the published event so synchronized listeners can skip
    /// their own updates.
    pub fn set_interaction_x(&mut self, x: Option<f64>, source: Option<&str>) -> ChartResult<()> {
        self.ensure_live()?;
        if self.interaction.set_crosshair(x, source) {
            self.publish_crosshair(&CrosshairMoveEvent {
                x,
                source: source.map(str::to_owned),
            });
            self.dirty.interaction = true;
            self.schedule();
        }
        Ok(())
    }

    pub fn get_interaction_x(&self) -> Option<f64> {
        self.interaction.crosshair_x()
    }

    pub fn on_zoom_range_change(&mut self, callback: impl Fn(&ZoomChangeEvent) + 'static) -> u64 {
        let handle = self.next_subscription;
        self.next_subscription += 1;
        self.zoom_subscribers.push((handle, Box::new(callback)));
        handle
    }

    pub fn on_interaction_x_change(
        &mut self,
        callback: impl Fn(&CrosshairMoveEvent) + 'static,
    ) -> u64 {
        let handle = self.next_subscription;
        self.next_subscription += 1;
        self.crosshair_subscribers.push((handle, Box::new(callback)));
        handle
    }

    /// Unsubscribing an unknown handle is a no-op.
    pub fn unsubscribe(&mut self, handle: u64) {
        self.zoom_subscribers.retain(|(h, _)| *h != handle);
        self.crosshair_subscribers.retain(|(h, _)| *h != handle);
    }

    /// Routes a normalized pointer event. Only valid in embedded mode.
    pub fn handle_pointer_event(&mut self, event: &PointerEvent) -> ChartResult<()> {
        self.ensure_live()?;
        if self.overlay_mode != OverlayMode::Embedded {
            return Err(ChartError::invalid_argument(
                "pointer events are host-managed unless overlay mode is embedded",
            ));
        }
        self.last_pointer_css = (event.css_x, event.css_y);

        let effects = {
            let env = HitTestEnv {
                store: &self.store,
                options: &self.options,
                x_scale: &self.x_scale,
                y_scale: &self.y_scale,
                grid: &self.grid,
            };
            self.interaction.handle_pointer(event, &env)
        };
        if effects.is_empty() {
            return Ok(());
        }
        self.apply_interaction_effects(effects);
        self.dirty.interaction = true;
        self.schedule();
        Ok(())
    }

    /// Placeholder: animation config is applied through `setOptions`; an
    /// enable just schedules a frame.
    pub fn set_animation(&mut self, enabled: bool) -> ChartResult<()> {
        self.ensure_live()?;
        if enabled {
            self.dirty.theme = true;
            self.schedule();
        }
        Ok(())
    }

    /// Loop tick from the frame clock; coalesced by the scheduler.
    pub fn tick(&mut self) -> ChartResult<bool> {
        self.poll_device_lost();
        if self.disposed || self.device_lost {
            return Ok(false);
        }
        let now = self.now_ms();
        if self.scheduler.tick(now).is_some() {
            self.render_requested = false;
            self.render()?;
            return Ok(true);
        }
        self.render_requested = false;
        Ok(false)
    }

    /// Manual tick: renders unconditionally.
    pub fn tick_once(&mut self) -> ChartResult<()> {
        self.poll_device_lost();
        self.ensure_live()?;
        let now = self.now_ms();
        self.scheduler.tick_once(now);
        self.render()
    }

    /// Records and submits one frame.
    pub fn render(&mut self) -> ChartResult<()> {
        self.poll_device_lost();
        self.ensure_live()?;
        let frame_start = Instant::now();

        // options
        if self.dirty.options {
            self.reconcile_renderers()?;
        }
        // layout
        let overlays_stale = self.dirty.options || self.dirty.layout;
        let tooltip_stale = overlays_stale || self.dirty.interaction;
        if overlays_stale {
            self.recompute_layout();
        }
        // data
        if self.dirty.data {
            self.store
                .upload_all(&self.gpu.device, &self.gpu.queue);
        }
        // interaction and theme state feed prepare directly.
        self.dirty.clear();

        self.encode_and_submit()?;

        let frame_ms = frame_start.elapsed().as_secs_f64() * 1000.0;
        if let Some(on_rendered) = &self.callbacks.on_rendered {
            on_rendered(frame_ms);
        }

        if overlays_stale {
            self.publish_static_overlays();
        }
        if tooltip_stale {
            self.publish_tooltip();
        }
        Ok(())
    }

    /// Marks disposed, stops the loop, and releases everything best-effort.
    /// Never panics; collected errors are returned for the `disposed` event.
    pub fn dispose(&mut self) -> Vec<ChartError> {
        if self.disposed {
            return Vec::new();
        }
        self.disposed = true;
        self.scheduler.stop();

        let mut errors = Vec::new();
        for slot in &mut self.renderers {
            slot.renderer.dispose();
        }
        self.renderers.clear();
        errors.extend(self.store.dispose());
        self.zoom_subscribers.clear();
        self.crosshair_subscribers.clear();
        self.widgets = None;
        self.gpu.destroy();
        log::info!("coordinator disposed ({} cleanup errors)", errors.len());
        errors
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn is_device_lost(&self) -> bool {
        self.device_lost
    }

    /// The device-lost detail, once, for the outbound event.
    pub fn take_device_lost(&mut self) -> Option<(DeviceLostReason, String)> {
        self.poll_device_lost();
        self.signals.lost_detail.lock().take()
    }

    // ---- internals ------------------------------------------------------

    fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }

    fn ensure_live(&self) -> ChartResult<()> {
        if self.disposed {
            return Err(ChartError::Disposed);
        }
        if self.device_lost {
            return Err(ChartError::DeviceLost {
                reason: DeviceLostReason::Unknown,
                message: "device lost".to_string(),
            });
        }
        Ok(())
    }

    fn poll_device_lost(&mut self) {
        if !self.device_lost && self.signals.lost.load(Ordering::Acquire) {
            self.device_lost = true;
            self.scheduler.stop();
        }
    }

    fn schedule(&mut self) {
        self.scheduler.mark_dirty();
        if !self.render_requested {
            self.render_requested = true;
            if let Some(notify) = &self.on_request_render {
                notify();
            }
        }
    }

    /// Keeps the renderer set exactly `{(type, index)}` of the series list.
    fn reconcile_renderers(&mut self) -> ChartResult<()> {
        let mut next = Vec::with_capacity(self.options.series.len());
        let mut old: Vec<Option<RendererSlot>> =
            self.renderers.drain(..).map(Some).collect();

        for (index, series) in self.options.series.iter().enumerate() {
            let kind = series.kind();
            let reuse = match old.get_mut(index) {
                Some(slot) if slot.as_ref().is_some_and(|s| s.kind == kind) => slot.take(),
                _ => None,
            };
            match reuse {
                Some(slot) => next.push(slot),
                None => {
                    log::debug!("creating {kind:?} renderer for series {index}");
                    let renderer = create_renderer(
                        &self.gpu.device,
                        &self.gpu.queue,
                        self.gpu.preferred_format(),
                        series,
                    )?;
                    next.push(RendererSlot { kind, renderer });
                }
            }
        }
        for mut slot in old.into_iter().flatten() {
            log::debug!("disposing {:?} renderer", slot.kind);
            slot.renderer.dispose();
        }
        self.renderers = next;
        Ok(())
    }

    fn legend_size(&mut self) -> Option<(f64, f64)> {
        let legend = self.options.legend.as_ref()?;
        if !legend.enabled {
            return None;
        }
        let items = OverlayBroker::legend_items(&self.options);
        match (&self.overlay_mode, self.widgets.as_mut()) {
            (OverlayMode::Host, Some(widgets)) => Some(widgets.measure_legend(&items)),
            _ => Some(OverlayBroker::estimate_legend_size(&items)),
        }
    }

    fn recompute_layout(&mut self) {
        let legend_size = self.legend_size();
        self.grid = compute_grid_area(
            &self.options,
            self.gpu.config.width,
            self.gpu.config.height,
            self.gpu.dpr,
            legend_size,
        );
        self.facet_grids = match &self.options.facet {
            Some(facet) => facet_cells(&self.grid, facet),
            None => Vec::new(),
        };
        self.x_scale = self.build_x_scale(self.grid.x_range());
        self.y_scale = self.build_y_scale(self.grid.y_range());
    }

    /// The grid area and scales a series draws into; facets tile series
    /// round-robin over the cells.
    fn series_frame(&self, series_index: usize) -> (GridArea, Scale, Scale) {
        if self.facet_grids.is_empty() {
            return (self.grid, self.x_scale.clone(), self.y_scale.clone());
        }
        let cell = self.facet_grids[series_index % self.facet_grids.len()];
        (
            cell,
            self.build_x_scale(cell.x_range()),
            self.build_y_scale(cell.y_range()),
        )
    }

    fn build_x_scale(&self, (range_min, range_max): (f64, f64)) -> Scale {
        if self.options.x_axis.kind == AxisKind::Category {
            match CategoryScale::new(
                self.options.x_axis.categories.clone(),
                range_min,
                range_max,
            ) {
                Ok(scale) => return Scale::Category(scale),
                Err(err) => {
                    log::warn!("invalid x categories: {err}; falling back to value axis");
                }
            }
        }

        let (mut lo, mut hi) = self.axis_domain(&self.options.x_axis, self.store.x_extent());
        if let Some(zoom) = self.interaction.zoom() {
            let spread = hi - lo;
            let zoom_lo = lo + spread * zoom.start / 100.0;
            let zoom_hi = lo + spread * zoom.end / 100.0;
            lo = zoom_lo;
            hi = zoom_hi;
        }
        Scale::Linear(LinearScale::new(lo, hi, range_min, range_max))
    }

    fn build_y_scale(&self, (range_min, range_max): (f64, f64)) -> Scale {
        if self.options.y_axis.kind == AxisKind::Category {
            match CategoryScale::new(
                self.options.y_axis.categories.clone(),
                range_min,
                range_max,
            ) {
                Ok(scale) => return Scale::Category(scale),
                Err(err) => {
                    log::warn!("invalid y categories: {err}; falling back to value axis");
                }
            }
        }

        let x_window = match self.options.y_axis.auto_bounds {
            AutoBoundsMode::Visible => {
                if let Scale::Linear(x) = &self.x_scale {
                    Some((x.domain_min, x.domain_max))
                } else {
                    None
                }
            }
            AutoBoundsMode::Global => None,
        };
        let (lo, hi) = self.axis_domain(&self.options.y_axis, self.store.y_extent(x_window));
        Scale::Linear(LinearScale::new(lo, hi, range_min, range_max))
    }

    fn axis_domain(&self, axis: &AxisOptions, extent: Option<(f64, f64)>) -> (f64, f64) {
        let (data_lo, data_hi) = extent.unwrap_or((0.0, 1.0));
        let lo = axis.min.unwrap_or(data_lo);
        let hi = axis.max.unwrap_or(data_hi);
        if lo == hi {
            (lo - 0.5, hi + 0.5)
        } else {
            (lo, hi)
        }
    }

    /// Stack bases for bar/histogram series, keyed per stack id.
    fn stack_bases(&self) -> Vec<Option<Vec<f64>>> {
        let mut accumulators: HashMap<&str, Vec<f64>> = HashMap::new();
        let mut bases = Vec::with_capacity(self.options.series.len());
        for (index, series) in self.options.series.iter().enumerate() {
            let stack = match &series.type_options {
                SeriesTypeOptions::Bar(bar) | SeriesTypeOptions::Histogram(bar) => {
                    bar.stack.as_deref()
                }
                _ => None,
            };
            let Some(stack_id) = stack else {
                bases.push(None);
                continue;
            };
            let values: Vec<f64> = match self.store.series_at(index).map(|s| s.points()) {
                Some(PointBatch::Xy(points)) => points.iter().map(|p| p[1] as f64).collect(),
                _ => Vec::new(),
            };
            let accumulator = accumulators.entry(stack_id).or_default();
            accumulator.resize(accumulator.len().max(values.len()), 0.0);
            let base: Vec<f64> = accumulator[..values.len()].to_vec();
            for (slot, value) in accumulator.iter_mut().zip(values.iter()) {
                *slot += value;
            }
            bases.push(Some(base));
        }
        bases
    }

    fn encode_and_submit(&mut self) -> ChartResult<()> {
        let (texture, view) = self.gpu.current_view()?;

        let stack_bases = self.stack_bases();
        let frames: Vec<(GridArea, Scale, Scale)> = (0..self.renderers.len())
            .map(|index| self.series_frame(index))
            .collect();
        let store = &self.store;
        let options = &self.options;
        let device = &self.gpu.device;
        let queue = &self.gpu.queue;
        let palette = &options.palette;

        for (index, slot) in self.renderers.iter_mut().enumerate() {
            let (Some(series_options), Some(series)) =
                (options.series.get(index), store.series_at(index))
            else {
                continue;
            };
            if !series.visible {
                continue;
            }
            let (grid, x_scale, y_scale) = &frames[index];
            let ctx = PrepareContext {
                device,
                queue,
                series_index: index,
                options: series_options,
                series,
                x_scale,
                y_scale,
                grid,
                theme: &options.theme,
                palette,
                stack_base: stack_bases[index].as_deref(),
            };
            slot.renderer.prepare(&ctx)?;
        }

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("chart-frame"),
            });

        for slot in self.renderers.iter_mut() {
            if slot.renderer.has_compute() {
                slot.renderer.compute(&mut encoder);
            }
        }

        {
            let background = self.options.theme.background;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("chart-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: background[0] as f64,
                            g: background[1] as f64,
                            b: background[2] as f64,
                            a: background[3] as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let (clip_x, clip_y, clip_w, clip_h) = self.grid.clip_rect_px();
            if clip_w > 0 && clip_h > 0 {
                pass.set_scissor_rect(clip_x, clip_y, clip_w, clip_h);
            }
            for (index, slot) in self.renderers.iter_mut().enumerate() {
                let visible = self
                    .store
                    .series_at(index)
                    .is_some_and(|series| series.visible);
                if visible {
                    slot.renderer.render(&mut pass);
                }
            }
        }

        let submitted_at = Instant::now();
        self.gpu.queue.submit(Some(encoder.finish()));

        let gpu_slot = self.scheduler.gpu_time_slot();
        self.gpu.queue.on_submitted_work_done(move || {
            *gpu_slot.lock() = Some(submitted_at.elapsed());
        });

        texture.present();

        // Validation errors surface asynchronously through the uncaptured
        // sink; whatever has arrived by now fails this frame.
        let errors = std::mem::take(&mut *self.signals.errors.lock());
        if let Some((class, message)) = errors.into_iter().next() {
            return Err(ChartError::render(format!("{class:?}: {message}")));
        }
        Ok(())
    }

    fn apply_interaction_effects(&mut self, effects: Vec<InteractionEffect>) {
        for effect in effects {
            match effect {
                InteractionEffect::HoverChanged { hit } => {
                    if let Some(on_hover) = &self.callbacks.on_hover_change {
                        on_hover(&HoverChangeEvent { hit });
                    }
                }
                InteractionEffect::Click { hit, css_x, css_y } => {
                    if let Some(on_click) = &self.callbacks.on_click {
                        on_click(&ClickEvent { hit, css_x, css_y });
                    }
                }
                InteractionEffect::CrosshairMoved { x } => {
                    self.publish_crosshair(&CrosshairMoveEvent { x, source: None });
                }
                InteractionEffect::ZoomChanged { zoom } => {
                    self.dirty.layout = true;
                    self.publish_zoom(&ZoomChangeEvent {
                        start: zoom.start,
                        end: zoom.end,
                        source: Some("pointer".to_string()),
                    });
                }
                InteractionEffect::TooltipCleared => {
                    self.emit_tooltip(None);
                }
            }
        }
    }

    fn publish_zoom(&self, event: &ZoomChangeEvent) {
        if let Some(on_zoom) = &self.callbacks.on_zoom_change {
            on_zoom(event);
        }
        for (_, subscriber) in &self.zoom_subscribers {
            subscriber(event);
        }
    }

    fn publish_crosshair(&self, event: &CrosshairMoveEvent) {
        if let Some(on_crosshair) = &self.callbacks.on_crosshair_move {
            on_crosshair(event);
        }
        for (_, subscriber) in &self.crosshair_subscribers {
            subscriber(event);
        }
    }

    fn publish_static_overlays(&mut self) {
        let items = OverlayBroker::legend_items(&self.options);
        let labels =
            OverlayBroker::axis_labels(&self.options, &self.x_scale, &self.y_scale, &self.grid);
        match (&self.overlay_mode, self.widgets.as_mut()) {
            (OverlayMode::Host, Some(widgets)) => {
                widgets.update_legend(&items);
                widgets.update_axis_labels(&labels);
            }
            _ => {
                if let Some(on_legend) = &self.callbacks.on_legend {
                    on_legend(&items);
                }
                if let Some(on_axis_labels) = &self.callbacks.on_axis_labels {
                    on_axis_labels(&labels);
                }
            }
        }
    }

    fn publish_tooltip(&mut self) {
        let Some(tooltip_options) = self.options.tooltip.clone() else {
            return;
        };
        if !tooltip_options.enabled {
            return;
        }
        let payload = {
            let env = HitTestEnv {
                store: &self.store,
                options: &self.options,
                x_scale: &self.x_scale,
                y_scale: &self.y_scale,
                grid: &self.grid,
            };
            let (css_x, css_y) = self.last_pointer_css;
            let hover = env.hit_test(css_x, css_y);
            OverlayBroker::tooltip(
                &env,
                tooltip_options.trigger,
                self.interaction.crosshair_x(),
                hover.as_ref(),
                css_x,
                css_y,
            )
        };
        self.emit_tooltip(payload);
    }

    fn emit_tooltip(&mut self, payload: Option<TooltipPayload>) {
        if payload.is_none() && !self.tooltip_active {
            return;
        }
        self.tooltip_active = payload.is_some();
        match (&self.overlay_mode, self.widgets.as_mut()) {
            (OverlayMode::Host, Some(widgets)) => match &payload {
                Some(payload) => widgets.show_tooltip(payload),
                None => widgets.hide_tooltip(),
            },
            _ => {
                if let Some(on_tooltip) = &self.callbacks.on_tooltip {
                    on_tooltip(payload.as_ref());
                }
            }
        }
    }

    /// Reports an error through the error callback with an operation tag.
    pub fn report_error(&self, error: &ChartError, operation: &str) {
        if let Some(on_error) = &self.callbacks.on_error {
            on_error(&ErrorEvent::new(error, operation));
        }
    }
}
