//! Common error types used across all ChartGPU crates
//! Provides consistent error handling and reporting

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why the graphics device went away.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceLostReason {
    #[error("destroyed")]
    Destroyed,
    #[error("unknown")]
    Unknown,
}

impl From<wgpu::DeviceLostReason> for DeviceLostReason {
    fn from(reason: wgpu::DeviceLostReason) -> Self {
        match reason {
            wgpu::DeviceLostReason::Destroyed => DeviceLostReason::Destroyed,
            _ => DeviceLostReason::Unknown,
        }
    }
}

/// Classification for uncaptured device errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuErrorClass {
    Validation,
    OutOfMemory,
    Other,
}

impl From<&wgpu::Error> for GpuErrorClass {
    fn from(err: &wgpu::Error) -> Self {
        match err {
            wgpu::Error::Validation { .. } => GpuErrorClass::Validation,
            wgpu::Error::OutOfMemory { .. } => GpuErrorClass::OutOfMemory,
            _ => GpuErrorClass::Other,
        }
    }
}

/// Base error type for all ChartGPU operations
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum ChartError {
    #[error("Graphics initialization failed: {message}")]
    GraphicsInit { message: String },

    #[error("Device lost ({reason}): {message}")]
    DeviceLost {
        reason: DeviceLostReason,
        message: String,
    },

    #[error("Render failed: {message}")]
    Render { message: String },

    #[error("Invalid data: {message}")]
    Data {
        message: String,
        series_index: Option<usize>,
    },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Operation on disposed chart")]
    Disposed,

    #[error("Request timed out after {deadline_ms}ms")]
    Timeout { deadline_ms: u64 },

    #[error("Bridge communication failed: {message}")]
    Communication { message: String },
}

impl ChartError {
    /// Stable wire code used in outbound `error` events.
    pub fn code(&self) -> &'static str {
        match self {
            ChartError::GraphicsInit { .. } => "graphics-init-failed",
            ChartError::DeviceLost { .. } => "device-lost",
            ChartError::Render { .. } => "render-error",
            ChartError::Data { .. } => "data-error",
            ChartError::InvalidArgument { .. } => "invalid-argument",
            ChartError::Disposed => "disposed",
            ChartError::Timeout { .. } => "timeout",
            ChartError::Communication { .. } => "communication-error",
        }
    }

    pub fn data(message: impl Into<String>) -> Self {
        ChartError::Data {
            message: message.into(),
            series_index: None,
        }
    }

    pub fn data_for_series(series_index: usize, message: impl Into<String>) -> Self {
        ChartError::Data {
            message: message.into(),
            series_index: Some(series_index),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        ChartError::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn render(message: impl Into<String>) -> Self {
        ChartError::Render {
            message: message.into(),
        }
    }
}

/// Result type alias for ChartGPU operations
pub type ChartResult<T> = Result<T, ChartError>;

impl From<wgpu::SurfaceError> for ChartError {
    fn from(err: wgpu::SurfaceError) -> Self {
        ChartError::Render {
            message: format!("surface error: {err}"),
        }
    }
}

impl From<wgpu::RequestDeviceError> for ChartError {
    fn from(err: wgpu::RequestDeviceError) -> Self {
        ChartError::GraphicsInit {
            message: format!("failed to create device: {err}"),
        }
    }
}

/// Error payload emitted through the bridge and the `onError` callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub code: String,
    pub operation: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<u64>,
    pub timestamp_ms: u64,
}

impl ErrorEvent {
    pub fn new(error: &ChartError, operation: &str) -> Self {
        Self {
            code: error.code().to_string(),
            operation: operation.to_string(),
            message: error.to_string(),
            stack: None,
            message_id: None,
            timestamp_ms: chrono::Utc::now().timestamp_millis() as u64,
        }
    }

    pub fn with_message_id(mut self, message_id: u64) -> Self {
        self.message_id = Some(message_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = ChartError::Data {
            message: "stride/count mismatch: 7 * 8 != 60".to_string(),
            series_index: Some(2),
        };

        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("Data"));
        assert!(json.contains("stride/count mismatch"));

        let back: ChartError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.code(), "data-error");
    }

    #[test]
    fn test_error_event_carries_code_and_operation() {
        let event = ErrorEvent::new(&ChartError::Disposed, "appendData").with_message_id(17);
        assert_eq!(event.code, "disposed");
        assert_eq!(event.operation, "appendData");
        assert_eq!(event.message_id, Some(17));
    }

    #[test]
    fn test_device_lost_reason_mapping() {
        assert_eq!(
            DeviceLostReason::from(wgpu::DeviceLostReason::Destroyed),
            DeviceLostReason::Destroyed
        );
        assert_eq!(
            DeviceLostReason::from(wgpu::DeviceLostReason::Unknown),
            DeviceLostReason::Unknown
        );
    }
}
