//! Worker-side chart controller
//!
//! Runs on a dedicated renderer thread with a current-thread runtime,
//! selecting over the inbound channel and a 60 Hz tick interval. Each chart
//! id maps to one instance with its own device; instance states are
//! `Running → {Disposed, Lost}`, both terminal.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use chartgpu_core::{ChartCallbacks, OverlayMode, RenderCoordinator};
use chartgpu_render::{ContextOptions, GraphicsContext};
use chartgpu_shared::{ChartError, ChartResult, PointBatch};

use crate::messages::{AppendItem, InboundMessage, OutboundMessage};

enum InstanceState {
    Running(Box<RenderCoordinator>),
    Lost,
    Disposed,
}

struct ChartInstance {
    state: InstanceState,
    /// Source tag of the inbound crosshair drive currently being applied;
    /// matching outbound events are suppressed to break sync echo loops.
    suppress_source: Rc<RefCell<Option<String>>>,
}

pub struct ChartController {
    charts: HashMap<String, ChartInstance>,
    outbound: UnboundedSender<OutboundMessage>,
}

impl ChartController {
    pub fn new(outbound: UnboundedSender<OutboundMessage>) -> Self {
        Self {
            charts: HashMap::new(),
            outbound,
        }
    }

    /// The controller loop: applies messages in arrival order and renders
    /// dirty charts at the frame clock.
    pub async fn run(mut self, mut inbound: UnboundedReceiver<InboundMessage>) {
        let mut tick = tokio::time::interval(Duration::from_micros(16_667));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                message = inbound.recv() => {
                    match message {
                        Some(message) => self.handle(message).await,
                        None => break,
                    }
                }
                _ = tick.tick() => self.tick_all(),
            }
        }
        log::info!("controller loop ended; disposing {} charts", self.charts.len());
        for (chart_id, instance) in self.charts.iter_mut() {
            if let InstanceState::Running(coordinator) = &mut instance.state {
                let errors = coordinator.dispose();
                log::debug!("{chart_id}: {} cleanup errors", errors.len());
            }
        }
    }

    async fn handle(&mut self, message: InboundMessage) {
        let chart_id = message.chart_id().to_string();
        let operation = message.operation();
        let message_id = match &message {
            InboundMessage::Init { message_id, .. }
            | InboundMessage::Dispose { message_id, .. } => Some(*message_id),
            _ => None,
        };

        if let Err(error) = self.apply(message).await {
            log::warn!("{chart_id}: {operation} failed: {error}");
            let _ = self.outbound.send(OutboundMessage::error(
                &chart_id,
                &error,
                operation,
                message_id,
            ));
        }
    }

    async fn apply(&mut self, message: InboundMessage) -> ChartResult<()> {
        match message {
            InboundMessage::Init {
                chart_id,
                surface,
                width_px,
                height_px,
                dpr,
                options,
                message_id,
            } => {
                self.init(chart_id, surface, width_px, height_px, dpr, *options, message_id)
                    .await
            }
            InboundMessage::SetOptions { chart_id, options } => {
                self.with_running(&chart_id, |coordinator, _| coordinator.set_options(*options))
            }
            InboundMessage::AppendData {
                chart_id,
                series_index,
                bytes,
                count,
                stride,
            } => self.with_running(&chart_id, |coordinator, _| {
                let batch = PointBatch::from_bytes(&bytes, count, stride)?;
                coordinator.append_data(series_index, batch)
            }),
            InboundMessage::AppendDataBatch { chart_id, items } => {
                self.with_running(&chart_id, |coordinator, _| {
                    for AppendItem {
                        series_index,
                        bytes,
                        count,
                        stride,
                    } in items
                    {
                        let batch = PointBatch::from_bytes(&bytes, count, stride)?;
                        coordinator.append_data(series_index, batch)?;
                    }
                    Ok(())
                })
            }
            InboundMessage::Resize {
                chart_id,
                css_width,
                css_height,
                dpr,
                request_render,
            } => self.with_running(&chart_id, |coordinator, _| {
                coordinator.resize(css_width, css_height, dpr)?;
                if request_render {
                    coordinator.tick_once()?;
                }
                Ok(())
            }),
            InboundMessage::ForwardPointerEvent { chart_id, event } => {
                self.with_running(&chart_id, |coordinator, _| {
                    coordinator.handle_pointer_event(&event)
                })
            }
            InboundMessage::SetZoomRange {
                chart_id,
                start,
                end,
            } => self.with_running(&chart_id, |coordinator, _| {
                coordinator.set_zoom_range(start, end)
            }),
            InboundMessage::SetInteractionX {
                chart_id,
                x,
                source,
            } => self.with_running(&chart_id, |coordinator, suppress| {
                *suppress.borrow_mut() = source.clone();
                let result = coordinator.set_interaction_x(x, source.as_deref());
                *suppress.borrow_mut() = None;
                result
            }),
            InboundMessage::SetAnimation {
                chart_id, enabled, ..
            } => {
                self.with_running(&chart_id, |coordinator, _| coordinator.set_animation(enabled))
            }
            InboundMessage::Dispose {
                chart_id,
                message_id,
            } => self.dispose(&chart_id, message_id),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn init(
        &mut self,
        chart_id: String,
        surface: wgpu::SurfaceTarget<'static>,
        width_px: u32,
        height_px: u32,
        dpr: f64,
        options: chartgpu_shared::ResolvedOptions,
        message_id: u64,
    ) -> ChartResult<()> {
        if self.charts.contains_key(&chart_id) {
            return Err(ChartError::invalid_argument(format!(
                "chart '{chart_id}' already exists"
            )));
        }

        let gpu = GraphicsContext::new(
            surface,
            width_px,
            height_px,
            dpr,
            &ContextOptions::default(),
        )
        .await?;

        let suppress_source = Rc::new(RefCell::new(None::<String>));
        let callbacks =
            self.instance_callbacks(chart_id.clone(), Rc::clone(&suppress_source));
        let mut coordinator = RenderCoordinator::new(
            gpu,
            options,
            callbacks,
            OverlayMode::Embedded,
            None,
        )?;

        let capabilities = coordinator.capabilities();
        coordinator.tick_once()?;

        self.charts.insert(
            chart_id.clone(),
            ChartInstance {
                state: InstanceState::Running(Box::new(coordinator)),
                suppress_source,
            },
        );
        let _ = self.outbound.send(OutboundMessage::Ready {
            chart_id,
            message_id,
            capabilities,
        });
        Ok(())
    }

    fn instance_callbacks(
        &self,
        chart_id: String,
        suppress_source: Rc<RefCell<Option<String>>>,
    ) -> ChartCallbacks {
        let out = self.outbound.clone();
        let mut callbacks = ChartCallbacks::default();

        let (tx, id) = (out.clone(), chart_id.clone());
        callbacks.on_tooltip = Some(Box::new(move |payload| {
            let _ = tx.send(OutboundMessage::TooltipUpdate {
                chart_id: id.clone(),
                payload: payload.cloned(),
            });
        }));

        let (tx, id) = (out.clone(), chart_id.clone());
        callbacks.on_legend = Some(Box::new(move |items| {
            let _ = tx.send(OutboundMessage::LegendUpdate {
                chart_id: id.clone(),
                items: items.to_vec(),
            });
        }));

        let (tx, id) = (out.clone(), chart_id.clone());
        callbacks.on_axis_labels = Some(Box::new(move |labels| {
            let _ = tx.send(OutboundMessage::AxisLabelsUpdate {
                chart_id: id.clone(),
                labels: labels.clone(),
            });
        }));

        let (tx, id) = (out.clone(), chart_id.clone());
        callbacks.on_hover_change = Some(Box::new(move |event| {
            let _ = tx.send(OutboundMessage::HoverChange {
                chart_id: id.clone(),
                event: event.clone(),
            });
        }));

        let (tx, id) = (out.clone(), chart_id.clone());
        callbacks.on_click = Some(Box::new(move |event| {
            let _ = tx.send(OutboundMessage::Click {
                chart_id: id.clone(),
                event: event.clone(),
            });
        }));

        let (tx, id) = (out.clone(), chart_id.clone());
        callbacks.on_crosshair_move = Some(Box::new(move |event| {
            // Externally driven updates do not round-trip back to the host.
            let suppressed = event.source.is_some() && *suppress_source.borrow() == event.source;
            if !suppressed {
                let _ = tx.send(OutboundMessage::CrosshairMove {
                    chart_id: id.clone(),
                    event: event.clone(),
                });
            }
        }));

        let (tx, id) = (out.clone(), chart_id.clone());
        callbacks.on_zoom_change = Some(Box::new(move |event| {
            let _ = tx.send(OutboundMessage::ZoomChange {
                chart_id: id.clone(),
                event: event.clone(),
            });
        }));

        let (tx, id) = (out.clone(), chart_id.clone());
        callbacks.on_rendered = Some(Box::new(move |frame_time_ms| {
            let _ = tx.send(OutboundMessage::Rendered {
                chart_id: id.clone(),
                frame_time_ms,
            });
        }));

        let (tx, id) = (out, chart_id);
        callbacks.on_error = Some(Box::new(move |event| {
            let _ = tx.send(OutboundMessage::Error {
                chart_id: id.clone(),
                code: event.code.clone(),
                operation: event.operation.clone(),
                message: event.message.clone(),
                message_id: event.message_id,
            });
        }));

        callbacks
    }

    fn with_running<R>(
        &mut self,
        chart_id: &str,
        f: impl FnOnce(&mut RenderCoordinator, &Rc<RefCell<Option<String>>>) -> ChartResult<R>,
    ) -> ChartResult<R> {
        let instance = self
            .charts
            .get_mut(chart_id)
            .ok_or_else(|| ChartError::invalid_argument(format!("unknown chart '{chart_id}'")))?;
        match &mut instance.state {
            InstanceState::Running(coordinator) => {
                f(coordinator.as_mut(), &instance.suppress_source)
            }
            InstanceState::Lost => Err(ChartError::DeviceLost {
                reason: chartgpu_shared::DeviceLostReason::Unknown,
                message: "device lost".to_string(),
            }),
            InstanceState::Disposed => Err(ChartError::Disposed),
        }
    }

    fn dispose(&mut self, chart_id: &str, message_id: u64) -> ChartResult<()> {
        let instance = self
            .charts
            .get_mut(chart_id)
            .ok_or_else(|| ChartError::invalid_argument(format!("unknown chart '{chart_id}'")))?;

        let cleanup_errors = match &mut instance.state {
            InstanceState::Running(coordinator) => coordinator
                .dispose()
                .iter()
                .map(ChartError::to_string)
                .collect(),
            _ => Vec::new(),
        };
        instance.state = InstanceState::Disposed;
        let _ = self.outbound.send(OutboundMessage::Disposed {
            chart_id: chart_id.to_string(),
            cleanup_errors,
            message_id,
        });
        Ok(())
    }

    #[cfg(test)]
    fn callbacks_for_tests(
        &self,
        chart_id: &str,
        suppress_source: Rc<RefCell<Option<String>>>,
    ) -> ChartCallbacks {
        self.instance_callbacks(chart_id.to_string(), suppress_source)
    }

    /// Frame-clock tick: renders each dirty running chart and surfaces
    /// device loss.
    fn tick_all(&mut self) {
        for (chart_id, instance) in self.charts.iter_mut() {
            let InstanceState::Running(coordinator) = &mut instance.state else {
                continue;
            };

            if let Some((reason, message)) = coordinator.take_device_lost() {
                let _ = self.outbound.send(OutboundMessage::DeviceLost {
                    chart_id: chart_id.clone(),
                    reason,
                    message,
                });
                instance.state = InstanceState::Lost;
                continue;
            }

            if let Err(error) = coordinator.tick() {
                log::warn!("{chart_id}: frame failed: {error}");
                let _ = self.outbound.send(OutboundMessage::error(
                    chart_id, &error, "render", None,
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartgpu_shared::CrosshairMoveEvent;

    /// Externally sourced crosshair updates must not round-trip back out
    /// while their source tag is being applied.
    #[test]
    fn test_crosshair_echo_suppression() {
        let (out_tx, mut out_rx) = tokio::sync::mpsc::unbounded_channel();
        let controller = ChartController::new(out_tx);
        let suppress = Rc::new(RefCell::new(None::<String>));
        let callbacks = controller.callbacks_for_tests("chart-a", Rc::clone(&suppress));
        let on_crosshair = callbacks.on_crosshair_move.expect("callback installed");

        // Pointer-driven move (no source): emitted.
        on_crosshair(&CrosshairMoveEvent {
            x: Some(1.0),
            source: None,
        });
        assert!(matches!(
            out_rx.try_recv(),
            Ok(OutboundMessage::CrosshairMove { .. })
        ));

        // Externally driven move with the suppressed source: swallowed.
        *suppress.borrow_mut() = Some("slider-1".to_string());
        on_crosshair(&CrosshairMoveEvent {
            x: Some(2.0),
            source: Some("slider-1".to_string()),
        });
        assert!(out_rx.try_recv().is_err());

        // A different source still goes out.
        on_crosshair(&CrosshairMoveEvent {
            x: Some(3.0),
            source: Some("slider-2".to_string()),
        });
        assert!(matches!(
            out_rx.try_recv(),
            Ok(OutboundMessage::CrosshairMove { .. })
        ));
    }
}
