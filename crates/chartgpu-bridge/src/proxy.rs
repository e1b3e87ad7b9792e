//! Host-side chart proxy
//!
//! Owns the inbound sender, the pending-request map for correlated messages,
//! and per-chart host state: the initialized gate that drops pointer events
//! until `ready`, and the resize coalescer (latest wins, flushed at most once
//! per frame interval). Outbound messages are routed to the registered
//! handlers on a dispatcher thread.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;

use chartgpu_shared::{
    Capabilities, ChartError, ChartResult, PointerEvent, ResolvedOptions,
};

use crate::controller::ChartController;
use crate::messages::{AppendItem, InboundMessage, OutboundMessage};

/// Correlated requests not answered within this deadline reject with
/// `Timeout`.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Resize coalescing window: at most one `resize` per frame.
const RESIZE_FLUSH_INTERVAL: Duration = Duration::from_millis(16);

/// Host callbacks for uncorrelated outbound messages. All run on the
/// dispatcher thread.
#[derive(Default)]
pub struct ProxyHandlers {
    pub on_tooltip: Option<Box<dyn Fn(&str, Option<&chartgpu_shared::TooltipPayload>) + Send>>,
    pub on_legend: Option<Box<dyn Fn(&str, &[chartgpu_shared::LegendItem]) + Send>>,
    pub on_axis_labels: Option<Box<dyn Fn(&str, &chartgpu_shared::AxisLabels) + Send>>,
    pub on_hover_change: Option<Box<dyn Fn(&str, &chartgpu_shared::HoverChangeEvent) + Send>>,
    pub on_click: Option<Box<dyn Fn(&str, &chartgpu_shared::ClickEvent) + Send>>,
    pub on_crosshair_move: Option<Box<dyn Fn(&str, &chartgpu_shared::CrosshairMoveEvent) + Send>>,
    pub on_zoom_change: Option<Box<dyn Fn(&str, &chartgpu_shared::ZoomChangeEvent) + Send>>,
    pub on_rendered: Option<Box<dyn Fn(&str, f64) + Send>>,
    pub on_device_lost:
        Option<Box<dyn Fn(&str, chartgpu_shared::DeviceLostReason, &str) + Send>>,
    pub on_error: Option<Box<dyn Fn(&str, &str, &str, &str) + Send>>,
}

struct ChartState {
    initialized: bool,
    pending_resize: Option<(f64, f64, f64, bool)>,
    last_resize_flush: Option<Instant>,
}

/// Pending correlated requests, keyed by message id and tagged with their
/// chart id so disposal can reject only that chart's requests.
type PendingMap = Arc<Mutex<HashMap<u64, (String, oneshot::Sender<OutboundMessage>)>>>;

pub struct ChartProxy {
    inbound: UnboundedSender<InboundMessage>,
    pending: PendingMap,
    charts: Arc<Mutex<HashMap<String, ChartState>>>,
    next_message_id: AtomicU64,
    request_timeout: Duration,
}

impl ChartProxy {
    /// Spawns the renderer thread (controller + current-thread runtime) and
    /// the dispatcher thread, returning the host-side handle.
    pub fn spawn(handlers: ProxyHandlers) -> ChartResult<Self> {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        std::thread::Builder::new()
            .name("chartgpu-renderer".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(error) => {
                        log::error!("failed to build renderer runtime: {error}");
                        return;
                    }
                };
                let local = tokio::task::LocalSet::new();
                local.block_on(&runtime, ChartController::new(out_tx).run(in_rx));
            })
            .map_err(|error| ChartError::Communication {
                message: format!("failed to spawn renderer thread: {error}"),
            })?;

        Ok(Self::from_channels(in_tx, out_rx, handlers))
    }

    /// Wires a proxy onto existing channels. Used by `spawn` and by tests
    /// that stand in for the controller.
    pub fn from_channels(
        inbound: UnboundedSender<InboundMessage>,
        outbound: UnboundedReceiver<OutboundMessage>,
        handlers: ProxyHandlers,
    ) -> Self {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let charts: Arc<Mutex<HashMap<String, ChartState>>> = Arc::new(Mutex::new(HashMap::new()));

        {
            let pending = Arc::clone(&pending);
            let charts = Arc::clone(&charts);
            std::thread::Builder::new()
                .name("chartgpu-dispatch".to_string())
                .spawn(move || dispatch_loop(outbound, handlers, pending, charts))
                .ok();
        }

        Self {
            inbound,
            pending,
            charts,
            next_message_id: AtomicU64::new(1),
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    /// Shrinks the correlated-request deadline; test hook.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Initializes a chart, transferring the surface to the renderer thread.
    /// Resolves with the device capabilities on `ready`.
    pub async fn init(
        &self,
        chart_id: Option<String>,
        surface: wgpu::SurfaceTarget<'static>,
        width_px: u32,
        height_px: u32,
        dpr: f64,
        options: ResolvedOptions,
    ) -> ChartResult<(String, Capabilities)> {
        let chart_id = chart_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        self.charts.lock().insert(
            chart_id.clone(),
            ChartState {
                initialized: false,
                pending_resize: None,
                last_resize_flush: None,
            },
        );

        let (message_id, rx) = self.register_request(&chart_id);
        self.send(InboundMessage::Init {
            chart_id: chart_id.clone(),
            surface,
            width_px,
            height_px,
            dpr,
            options: Box::new(options),
            message_id,
        })?;

        match self.await_reply(message_id, rx).await? {
            OutboundMessage::Ready { capabilities, .. } => Ok((chart_id, capabilities)),
            other => Err(unexpected_reply(other)),
        }
    }

    pub fn set_options(&self, chart_id: &str, options: ResolvedOptions) -> ChartResult<()> {
        self.send(InboundMessage::SetOptions {
            chart_id: chart_id.to_string(),
            options: Box::new(options),
        })
    }

    /// Transfers a binary point buffer by move; no copy is made on the way
    /// to the renderer thread.
    pub fn append_data(
        &self,
        chart_id: &str,
        series_index: usize,
        bytes: Vec<u8>,
        count: usize,
        stride: usize,
    ) -> ChartResult<()> {
        self.send(InboundMessage::AppendData {
            chart_id: chart_id.to_string(),
            series_index,
            bytes,
            count,
            stride,
        })
    }

    pub fn append_data_batch(&self, chart_id: &str, items: Vec<AppendItem>) -> ChartResult<()> {
        self.send(InboundMessage::AppendDataBatch {
            chart_id: chart_id.to_string(),
            items,
        })
    }

    /// Coalesces size/DPR updates: the latest value wins and at most one
    /// `resize` goes out per frame interval. Call `flush_resize` from the
    /// host frame callback to drain a buffered update.
    pub fn request_resize(
        &self,
        chart_id: &str,
        css_width: f64,
        css_height: f64,
        dpr: f64,
        request_render: bool,
    ) -> ChartResult<()> {
        let mut charts = self.charts.lock();
        let state = charts
            .get_mut(chart_id)
            .ok_or_else(|| ChartError::invalid_argument(format!("unknown chart '{chart_id}'")))?;
        state.pending_resize = Some((css_width, css_height, dpr, request_render));

        let due = state
            .last_resize_flush
            .is_none_or(|at| at.elapsed() >= RESIZE_FLUSH_INTERVAL);
        if due {
            let (w, h, dpr, render) = state.pending_resize.take().expect("just set");
            state.last_resize_flush = Some(Instant::now());
            drop(charts);
            return self.send(InboundMessage::Resize {
                chart_id: chart_id.to_string(),
                css_width: w,
                css_height: h,
                dpr,
                request_render: render,
            });
        }
        Ok(())
    }

    /// Sends a buffered resize, if any.
    pub fn flush_resize(&self, chart_id: &str) -> ChartResult<()> {
        let mut charts = self.charts.lock();
        let Some(state) = charts.get_mut(chart_id) else {
            return Ok(());
        };
        let Some((w, h, dpr, render)) = state.pending_resize.take() else {
            return Ok(());
        };
        state.last_resize_flush = Some(Instant::now());
        drop(charts);
        self.send(InboundMessage::Resize {
            chart_id: chart_id.to_string(),
            css_width: w,
            css_height: h,
            dpr,
            request_render: render,
        })
    }

    /// Forwards a pointer event; silently dropped until `ready` arrives.
    pub fn forward_pointer_event(&self, chart_id: &str, event: PointerEvent) -> ChartResult<()> {
        if !self.is_initialized(chart_id) {
            log::trace!("{chart_id}: dropping pointer event before ready");
            return Ok(());
        }
        self.send(InboundMessage::ForwardPointerEvent {
            chart_id: chart_id.to_string(),
            event,
        })
    }

    pub fn set_zoom_range(&self, chart_id: &str, start: f64, end: f64) -> ChartResult<()> {
        self.send(InboundMessage::SetZoomRange {
            chart_id: chart_id.to_string(),
            start,
            end,
        })
    }

    pub fn set_interaction_x(
        &self,
        chart_id: &str,
        x: Option<f64>,
        source: Option<String>,
    ) -> ChartResult<()> {
        self.send(InboundMessage::SetInteractionX {
            chart_id: chart_id.to_string(),
            x,
            source,
        })
    }

    pub fn set_animation(
        &self,
        chart_id: &str,
        enabled: bool,
        config: Option<chartgpu_shared::AnimationOptions>,
    ) -> ChartResult<()> {
        self.send(InboundMessage::SetAnimation {
            chart_id: chart_id.to_string(),
            enabled,
            config,
        })
    }

    /// Disposes a chart: cancels that chart's pending correlated requests
    /// with `Disposed`, then awaits the `disposed` acknowledgement. Requests
    /// belonging to other charts on this proxy are untouched.
    pub async fn dispose(&self, chart_id: &str) -> ChartResult<Vec<String>> {
        // Reject this chart's in-flight requests first; their receivers
        // observe a closed channel, which maps to Disposed.
        self.pending
            .lock()
            .retain(|_, (owner, _)| owner != chart_id);

        let (message_id, rx) = self.register_request(chart_id);
        self.send(InboundMessage::Dispose {
            chart_id: chart_id.to_string(),
            message_id,
        })?;

        let reply = self.await_reply(message_id, rx).await?;
        self.charts.lock().remove(chart_id);
        match reply {
            OutboundMessage::Disposed { cleanup_errors, .. } => Ok(cleanup_errors),
            other => Err(unexpected_reply(other)),
        }
    }

    pub fn is_initialized(&self, chart_id: &str) -> bool {
        self.charts
            .lock()
            .get(chart_id)
            .is_some_and(|state| state.initialized)
    }

    fn register_request(&self, chart_id: &str) -> (u64, oneshot::Receiver<OutboundMessage>) {
        let message_id = self.next_message_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .insert(message_id, (chart_id.to_string(), tx));
        (message_id, rx)
    }

    async fn await_reply(
        &self,
        message_id: u64,
        rx: oneshot::Receiver<OutboundMessage>,
    ) -> ChartResult<OutboundMessage> {
        let reply = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(reply)) => reply,
            // Sender dropped: the request was cancelled by dispose.
            Ok(Err(_)) => return Err(ChartError::Disposed),
            Err(_) => {
                self.pending.lock().remove(&message_id);
                return Err(ChartError::Timeout {
                    deadline_ms: self.request_timeout.as_millis() as u64,
                });
            }
        };
        match reply {
            OutboundMessage::Error {
                code,
                operation,
                message,
                ..
            } => Err(wire_error(&code, &operation, &message)),
            other => Ok(other),
        }
    }

    fn send(&self, message: InboundMessage) -> ChartResult<()> {
        self.inbound
            .send(message)
            .map_err(|_| ChartError::Communication {
                message: "renderer thread is gone".to_string(),
            })
    }
}

fn unexpected_reply(message: OutboundMessage) -> ChartError {
    ChartError::Communication {
        message: format!("unexpected correlated reply: {message:?}"),
    }
}

/// Maps a wire error record back onto `ChartError`.
fn wire_error(code: &str, operation: &str, message: &str) -> ChartError {
    match code {
        "disposed" => ChartError::Disposed,
        "device-lost" => ChartError::DeviceLost {
            reason: chartgpu_shared::DeviceLostReason::Unknown,
            message: message.to_string(),
        },
        "graphics-init-failed" => ChartError::GraphicsInit {
            message: message.to_string(),
        },
        "data-error" => ChartError::data(message),
        "invalid-argument" => ChartError::invalid_argument(message),
        _ => ChartError::Communication {
            message: format!("{operation}: {message}"),
        },
    }
}

fn dispatch_loop(
    mut outbound: UnboundedReceiver<OutboundMessage>,
    handlers: ProxyHandlers,
    pending: PendingMap,
    charts: Arc<Mutex<HashMap<String, ChartState>>>,
) {
    while let Some(message) = outbound.blocking_recv() {
        // Correlated replies complete their pending slot instead of hitting
        // the handlers.
        let correlated = match &message {
            OutboundMessage::Ready {
                chart_id,
                message_id,
                ..
            } => {
                if let Some(state) = charts.lock().get_mut(chart_id) {
                    state.initialized = true;
                }
                Some(*message_id)
            }
            OutboundMessage::Disposed { message_id, .. } => Some(*message_id),
            OutboundMessage::Error {
                message_id: Some(message_id),
                ..
            } => Some(*message_id),
            _ => None,
        };
        if let Some(message_id) = correlated {
            if let Some((_, tx)) = pending.lock().remove(&message_id) {
                let _ = tx.send(message);
                continue;
            }
        }

        match &message {
            OutboundMessage::TooltipUpdate { chart_id, payload } => {
                if let Some(handler) = &handlers.on_tooltip {
                    handler(chart_id, payload.as_ref());
                }
            }
            OutboundMessage::LegendUpdate { chart_id, items } => {
                if let Some(handler) = &handlers.on_legend {
                    handler(chart_id, items);
                }
            }
            OutboundMessage::AxisLabelsUpdate { chart_id, labels } => {
                if let Some(handler) = &handlers.on_axis_labels {
                    handler(chart_id, labels);
                }
            }
            OutboundMessage::HoverChange { chart_id, event } => {
                if let Some(handler) = &handlers.on_hover_change {
                    handler(chart_id, event);
                }
            }
            OutboundMessage::Click { chart_id, event } => {
                if let Some(handler) = &handlers.on_click {
                    handler(chart_id, event);
                }
            }
            OutboundMessage::CrosshairMove { chart_id, event } => {
                if let Some(handler) = &handlers.on_crosshair_move {
                    handler(chart_id, event);
                }
            }
            OutboundMessage::ZoomChange { chart_id, event } => {
                if let Some(handler) = &handlers.on_zoom_change {
                    handler(chart_id, event);
                }
            }
            OutboundMessage::Rendered {
                chart_id,
                frame_time_ms,
            } => {
                if let Some(handler) = &handlers.on_rendered {
                    handler(chart_id, *frame_time_ms);
                }
            }
            OutboundMessage::DeviceLost {
                chart_id,
                reason,
                message,
            } => {
                if let Some(handler) = &handlers.on_device_lost {
                    handler(chart_id, *reason, message);
                }
            }
            OutboundMessage::Error {
                chart_id,
                code,
                operation,
                message,
                ..
            } => {
                if let Some(handler) = &handlers.on_error {
                    handler(chart_id, code, operation, message);
                }
            }
            OutboundMessage::Ready { .. } | OutboundMessage::Disposed { .. } => {
                // Uncorrelated ready/disposed: nothing to do.
            }
        }
    }
    log::debug!("dispatcher loop ended");
}
