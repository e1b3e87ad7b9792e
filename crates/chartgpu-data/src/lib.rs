//! Data management for ChartGPU
//!
//! Owns per-series logical point lists and their GPU-resident vertex buffers,
//! with incremental append uploads, geometric buffer growth, and optional
//! downsampling.

pub mod gpu_buffer;
pub mod sampling;
pub mod store;

pub use gpu_buffer::{GrowableBuffer, UploadPlan};
pub use sampling::{downsample_ohlc, downsample_xy};
pub use store::{AppendOutcome, DataStore, SeriesRuntime};
