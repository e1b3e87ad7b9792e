//! Interaction engine
//!
//! Converts normalized pointer events into state transitions, crosshair and
//! zoom updates, and hit-test results. The engine is the sole writer of
//! `InteractionState`, the crosshair, and the zoom window; the coordinator
//! turns the returned effects into callbacks and dirty marks.

use chartgpu_shared::{
    HitResult, PointerEvent, PointerEventKind, ZoomOptions, ZoomState,
};

use crate::hit_test::HitTestEnv;

/// Movement slop before a press becomes a pan, CSS pixels.
const CLICK_SLOP_CSS: f64 = 4.0;
/// Press-to-release window for a click, milliseconds.
const CLICK_WINDOW_MS: f64 = 250.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionState {
    Idle,
    Hovering { x: f64, y: f64 },
    Pressing { origin: (f64, f64), since_ms: f64 },
    Panning { origin_zoom: ZoomState, origin: (f64, f64) },
    Wheeling { anchor_x: f64 },
}

/// What a pointer event did; the coordinator maps these onto callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEffect {
    HoverChanged { hit: Option<HitResult> },
    Click { hit: Option<HitResult>, css_x: f64, css_y: f64 },
    CrosshairMoved { x: Option<f64> },
    ZoomChanged { zoom: ZoomState },
    TooltipCleared,
}

pub struct InteractionEngine {
    state: InteractionState,
    crosshair_x: Option<f64>,
    zoom: Option<ZoomState>,
    wheel_sensitivity: f64,
    /// Source tag of the most recent externally driven crosshair update.
    last_external_source: Option<String>,
    last_hover_hit: Option<HitResult>,
}

impl InteractionEngine {
    pub fn new(zoom_options: Option<&ZoomOptions>) -> Self {
        Self {
            state: InteractionState::Idle,
            crosshair_x: None,
            zoom: zoom_options.map(|z| {
                ZoomState::new(z.start, z.end).with_span_limits(z.min_span, z.max_span)
            }),
            wheel_sensitivity: zoom_options.map_or(0.0015, |z| z.wheel_sensitivity),
            last_external_source: None,
            last_hover_hit: None,
        }
    }

    /// Re-applies zoom configuration on `setOptions`, keeping the current
    /// window when the config still allows it.
    pub fn reconfigure(&mut self, zoom_options: Option<&ZoomOptions>) {
        match zoom_options {
            Some(options) => {
                self.wheel_sensitivity = options.wheel_sensitivity;
                let mut zoom = self
                    .zoom
                    .unwrap_or_else(|| ZoomState::new(options.start, options.end));
                zoom.min_span = options.min_span;
                zoom.max_span = options.max_span;
                zoom.clamp();
                self.zoom = Some(zoom);
            }
            None => self.zoom = None,
        }
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn crosshair_x(&self) -> Option<f64> {
        self.crosshair_x
    }

    pub fn zoom(&self) -> Option<ZoomState> {
        self.zoom
    }

    pub fn last_external_source(&self) -> Option<&str> {
        self.last_external_source.as_deref()
    }

    /// Programmatic zoom. Returns the clamped state when it actually
    /// changed; `None` is a no-op (zoom disabled or same window).
    pub fn set_zoom(&mut self, start: f64, end: f64) -> Option<ZoomState> {
        let current = self.zoom?;
        let mut next = current;
        next.start = start;
        next.end = end;
        next.clamp();
        if (next.start - current.start).abs() < 1e-9 && (next.end - current.end).abs() < 1e-9 {
            return None;
        }
        self.zoom = Some(next);
        Some(next)
    }

    /// Externally driven crosshair (API or sync from another chart). Returns
    /// whether the value changed.
    pub fn set_crosshair(&mut self, x: Option<f64>, source: Option<&str>) -> bool {
        self.last_external_source = source.map(str::to_owned);
        if self.crosshair_x == x {
            return false;
        }
        self.crosshair_x = x;
        true
    }

    /// Translates the zoom window when auto-scroll keeps the tail pinned.
    pub fn auto_scroll_to_end(&mut self) -> Option<ZoomState> {
        let mut zoom = self.zoom?;
        if (zoom.end - 100.0).abs() > 1e-9 {
            return None;
        }
        let span = zoom.span();
        zoom.start = 100.0 - span;
        zoom.end = 100.0;
        self.zoom = Some(zoom);
        Some(zoom)
    }

    /// Feeds one pointer event through the state machine.
    pub fn handle_pointer(
        &mut self,
        event: &PointerEvent,
        env: &HitTestEnv<'_>,
    ) -> Vec<InteractionEffect> {
        let mut effects = Vec::new();
        let inside = env.grid.contains_css(event.css_x, event.css_y);

        match event.kind {
            PointerEventKind::Down => {
                if inside {
                    self.state = InteractionState::Pressing {
                        origin: (event.css_x, event.css_y),
                        since_ms: event.timestamp_ms,
                    };
                }
            }
            PointerEventKind::Move => match self.state {
                InteractionState::Pressing { origin, since_ms } => {
                    let moved = ((event.css_x - origin.0).powi(2)
                        + (event.css_y - origin.1).powi(2))
                    .sqrt();
                    if moved >= CLICK_SLOP_CSS {
                        if let Some(zoom) = self.zoom {
                            self.state = InteractionState::Panning {
                                origin_zoom: zoom,
                                origin,
                            };
                            self.pan_to(event, env, &mut effects);
                        } else {
                            // No zoom configured; a drag is just a hover.
                            self.state = InteractionState::Pressing { origin, since_ms };
                        }
                    }
                }
                InteractionState::Panning { .. } => {
                    self.pan_to(event, env, &mut effects);
                }
                _ => {
                    if inside {
                        self.hover_at(event, env, &mut effects);
                    } else if self.crosshair_x.is_some() {
                        self.leave(&mut effects);
                    }
                }
            },
            PointerEventKind::Up => match self.state {
                InteractionState::Pressing { origin, since_ms } => {
                    let moved = ((event.css_x - origin.0).powi(2)
                        + (event.css_y - origin.1).powi(2))
                    .sqrt();
                    if moved < CLICK_SLOP_CSS
                        && event.timestamp_ms - since_ms < CLICK_WINDOW_MS
                    {
                        let hit = env.hit_test(event.css_x, event.css_y);
                        effects.push(InteractionEffect::Click {
                            hit,
                            css_x: event.css_x,
                            css_y: event.css_y,
                        });
                    }
                    self.hover_at(event, env, &mut effects);
                }
                InteractionState::Panning { .. } => {
                    self.hover_at(event, env, &mut effects);
                }
                _ => {}
            },
            PointerEventKind::Leave => {
                self.leave(&mut effects);
            }
            PointerEventKind::Wheel => {
                if inside {
                    self.wheel(event, env, &mut effects);
                }
            }
        }
        effects
    }

    fn hover_at(
        &mut self,
        event: &PointerEvent,
        env: &HitTestEnv<'_>,
        effects: &mut Vec<InteractionEffect>,
    ) {
        self.state = InteractionState::Hovering {
            x: event.css_x,
            y: event.css_y,
        };

        let domain_x = env.x_scale.invert(event.css_x);
        let crosshair = domain_x.is_finite().then_some(domain_x);
        if crosshair != self.crosshair_x {
            self.crosshair_x = crosshair;
            self.last_external_source = None;
            effects.push(InteractionEffect::CrosshairMoved { x: crosshair });
        }

        let hit = env.hit_test(event.css_x, event.css_y);
        if hit != self.last_hover_hit {
            self.last_hover_hit = hit;
            effects.push(InteractionEffect::HoverChanged { hit });
        }
    }

    fn leave(&mut self, effects: &mut Vec<InteractionEffect>) {
        self.state = InteractionState::Idle;
        if self.crosshair_x.take().is_some() {
            effects.push(InteractionEffect::CrosshairMoved { x: None });
        }
        if self.last_hover_hit.take().is_some() {
            effects.push(InteractionEffect::HoverChanged { hit: None });
        }
        effects.push(InteractionEffect::TooltipCleared);
    }

    fn pan_to(
        &mut self,
        event: &PointerEvent,
        env: &HitTestEnv<'_>,
        effects: &mut Vec<InteractionEffect>,
    ) {
        let InteractionState::Panning { origin_zoom, origin } = self.state else {
            return;
        };
        let plot_width = env.grid.plot_width().max(1.0);
        let span = origin_zoom.span();
        // Dragging right moves the window left, proportionally to the plot.
        let delta_pct = -(event.css_x - origin.0) / plot_width * span;

        let mut next = origin_zoom;
        next.translate(delta_pct);
        if Some(next) != self.zoom {
            self.zoom = Some(next);
            effects.push(InteractionEffect::ZoomChanged { zoom: next });
        }
    }

    fn wheel(
        &mut self,
        event: &PointerEvent,
        env: &HitTestEnv<'_>,
        effects: &mut Vec<InteractionEffect>,
    ) {
        let Some(current) = self.zoom else {
            return;
        };
        let anchor_frac =
            ((event.css_x - env.grid.left) / env.grid.plot_width().max(1.0)).clamp(0.0, 1.0);
        self.state = InteractionState::Wheeling {
            anchor_x: env.x_scale.invert(event.css_x),
        };

        let magnitude = 1.0 + event.wheel_delta.abs() * self.wheel_sensitivity;
        let factor = if event.wheel_delta < 0.0 {
            1.0 / magnitude
        } else {
            magnitude
        };

        let mut next = current;
        next.zoom_about(anchor_frac, factor);
        if next != current {
            self.zoom = Some(next);
            effects.push(InteractionEffect::ZoomChanged { zoom: next });
        }
    }
}
