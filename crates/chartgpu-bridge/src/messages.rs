//! Bridge wire protocol
//!
//! Messages are plain records. Inbound carries the surface handle and binary
//! point buffers by move; outbound payloads are all serializable so a real
//! process boundary could be slotted in without reshaping them.

use chartgpu_shared::{
    AxisLabels, Capabilities, ChartError, ClickEvent, CrosshairMoveEvent, DeviceLostReason,
    HoverChangeEvent, LegendItem, PointerEvent, ResolvedOptions, TooltipPayload, ZoomChangeEvent,
};
use serde::{Deserialize, Serialize};

/// One series' worth of appended points inside a batch message.
pub struct AppendItem {
    pub series_index: usize,
    pub bytes: Vec<u8>,
    pub count: usize,
    pub stride: usize,
}

/// Host → controller messages, applied in arrival order per chart id.
pub enum InboundMessage {
    Init {
        chart_id: String,
        surface: wgpu::SurfaceTarget<'static>,
        width_px: u32,
        height_px: u32,
        dpr: f64,
        options: Box<ResolvedOptions>,
        message_id: u64,
    },
    SetOptions {
        chart_id: String,
        options: Box<ResolvedOptions>,
    },
    AppendData {
        chart_id: String,
        series_index: usize,
        bytes: Vec<u8>,
        count: usize,
        stride: usize,
    },
    AppendDataBatch {
        chart_id: String,
        items: Vec<AppendItem>,
    },
    Resize {
        chart_id: String,
        css_width: f64,
        css_height: f64,
        dpr: f64,
        request_render: bool,
    },
    ForwardPointerEvent {
        chart_id: String,
        event: PointerEvent,
    },
    SetZoomRange {
        chart_id: String,
        start: f64,
        end: f64,
    },
    SetInteractionX {
        chart_id: String,
        x: Option<f64>,
        source: Option<String>,
    },
    SetAnimation {
        chart_id: String,
        enabled: bool,
        /// Accepted for wire compatibility; animation config is applied
        /// through `setOptions`.
        config: Option<chartgpu_shared::AnimationOptions>,
    },
    Dispose {
        chart_id: String,
        message_id: u64,
    },
}

impl InboundMessage {
    pub fn chart_id(&self) -> &str {
        match self {
            InboundMessage::Init { chart_id, .. }
            | InboundMessage::SetOptions { chart_id, .. }
            | InboundMessage::AppendData { chart_id, .. }
            | InboundMessage::AppendDataBatch { chart_id, .. }
            | InboundMessage::Resize { chart_id, .. }
            | InboundMessage::ForwardPointerEvent { chart_id, .. }
            | InboundMessage::SetZoomRange { chart_id, .. }
            | InboundMessage::SetInteractionX { chart_id, .. }
            | InboundMessage::SetAnimation { chart_id, .. }
            | InboundMessage::Dispose { chart_id, .. } => chart_id,
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            InboundMessage::Init { .. } => "init",
            InboundMessage::SetOptions { .. } => "setOptions",
            InboundMessage::AppendData { .. } => "appendData",
            InboundMessage::AppendDataBatch { .. } => "appendDataBatch",
            InboundMessage::Resize { .. } => "resize",
            InboundMessage::ForwardPointerEvent { .. } => "forwardPointerEvent",
            InboundMessage::SetZoomRange { .. } => "setZoomRange",
            InboundMessage::SetInteractionX { .. } => "setInteractionX",
            InboundMessage::SetAnimation { .. } => "setAnimation",
            InboundMessage::Dispose { .. } => "dispose",
        }
    }
}

/// Controller → host messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundMessage {
    Ready {
        chart_id: String,
        message_id: u64,
        capabilities: Capabilities,
    },
    Rendered {
        chart_id: String,
        frame_time_ms: f64,
    },
    TooltipUpdate {
        chart_id: String,
        payload: Option<TooltipPayload>,
    },
    LegendUpdate {
        chart_id: String,
        items: Vec<LegendItem>,
    },
    AxisLabelsUpdate {
        chart_id: String,
        labels: AxisLabels,
    },
    HoverChange {
        chart_id: String,
        event: HoverChangeEvent,
    },
    Click {
        chart_id: String,
        event: ClickEvent,
    },
    CrosshairMove {
        chart_id: String,
        event: CrosshairMoveEvent,
    },
    ZoomChange {
        chart_id: String,
        event: ZoomChangeEvent,
    },
    DeviceLost {
        chart_id: String,
        reason: DeviceLostReason,
        message: String,
    },
    Disposed {
        chart_id: String,
        cleanup_errors: Vec<String>,
        message_id: u64,
    },
    Error {
        chart_id: String,
        code: String,
        operation: String,
        message: String,
        message_id: Option<u64>,
    },
}

impl OutboundMessage {
    pub fn error(
        chart_id: &str,
        error: &ChartError,
        operation: &str,
        message_id: Option<u64>,
    ) -> Self {
        OutboundMessage::Error {
            chart_id: chart_id.to_string(),
            code: error.code().to_string(),
            operation: operation.to_string(),
            message: error.to_string(),
            message_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_serializes_as_tagged_record() {
        let message = OutboundMessage::Rendered {
            chart_id: "c1".to_string(),
            frame_time_ms: 4.2,
        };
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("\"type\":\"rendered\""));
        assert!(json.contains("\"chart_id\":\"c1\""));
    }
}
