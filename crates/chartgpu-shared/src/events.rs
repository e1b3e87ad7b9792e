//! Pointer event and overlay payload types
//!
//! Pointer events arrive normalized from the host (CSS pixel coordinates);
//! overlay payloads flow the other way, either into host widgets or out
//! through callback events.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerEventKind {
    Down,
    Move,
    Up,
    Leave,
    Wheel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Normalized pointer event in CSS pixels, relative to the chart surface.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub css_x: f64,
    pub css_y: f64,
    pub buttons: u32,
    pub modifiers: Modifiers,
    /// Wheel delta in pixel units; only meaningful for `Wheel`.
    pub wheel_delta: f64,
    pub timestamp_ms: f64,
}

impl PointerEvent {
    pub fn new(kind: PointerEventKind, css_x: f64, css_y: f64, timestamp_ms: f64) -> Self {
        Self {
            kind,
            css_x,
            css_y,
            buttons: 0,
            modifiers: Modifiers::default(),
            wheel_delta: 0.0,
            timestamp_ms,
        }
    }
}

/// A resolved hit against a data point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitResult {
    pub series_index: usize,
    pub data_index: usize,
    /// Screen-space distance from the pointer, CSS pixels.
    pub distance_css: f64,
}

/// One series entry inside a tooltip payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TooltipParam {
    pub series_index: usize,
    pub series_name: String,
    pub data_index: usize,
    /// Point lanes: `[x, y]` or `[t, o, h, l, c]`.
    pub value: Vec<f64>,
    pub color: [f32; 4],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TooltipPayload {
    /// Preformatted text content; hosts may replace it from `params`.
    pub content: String,
    pub params: Vec<TooltipParam>,
    pub x_css: f64,
    pub y_css: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegendItem {
    pub name: String,
    /// CSS color string, e.g. `rgba(64, 128, 255, 1)`.
    pub color_css: String,
    pub series_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisLabel {
    pub text: String,
    /// Label anchor in CSS pixels.
    pub x_css: f64,
    pub y_css: f64,
    pub rotation_deg: f32,
    pub is_title: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AxisLabels {
    pub x_labels: Vec<AxisLabel>,
    pub y_labels: Vec<AxisLabel>,
}

/// Zoom window change notification; `source` suppresses echo loops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoomChangeEvent {
    pub start: f64,
    pub end: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrosshairMoveEvent {
    /// Domain-space x, or `None` when the crosshair is cleared.
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoverChangeEvent {
    pub hit: Option<HitResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickEvent {
    pub hit: Option<HitResult>,
    pub css_x: f64,
    pub css_y: f64,
}

/// Device and format facts reported with `ready`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capabilities {
    pub backend: String,
    pub preferred_format: String,
    pub timestamp_query: bool,
    pub max_texture_dimension_2d: u32,
}

/// Converts an RGBA color in [0, 1] to a CSS color string for legend items.
pub fn color_to_css(color: [f32; 4]) -> String {
    format!(
        "rgba({}, {}, {}, {})",
        (color[0] * 255.0).round() as u8,
        (color[1] * 255.0).round() as u8,
        (color[2] * 255.0).round() as u8,
        color[3]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_to_css() {
        assert_eq!(
            color_to_css([0.25, 0.5, 1.0, 1.0]),
            "rgba(64, 128, 255, 1)"
        );
    }

    #[test]
    fn test_pointer_event_serde() {
        let ev = PointerEvent::new(PointerEventKind::Wheel, 120.0, 80.0, 16.7);
        let json = serde_json::to_string(&ev).unwrap();
        let back: PointerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, PointerEventKind::Wheel);
        assert_eq!(back.css_x, 120.0);
    }
}
