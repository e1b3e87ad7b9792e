//! Render coordination for ChartGPU
//!
//! The coordinator owns the graphics context, data store, renderer set,
//! scheduler, interaction engine, and overlay broker for one chart, and
//! exposes the public chart contract.

pub mod coordinator;
pub mod hit_test;
pub mod interaction;
pub mod overlay;
pub mod scheduler;

pub use coordinator::{ChartCallbacks, OverlayMode, RenderCoordinator};
pub use hit_test::{candle_hit, nearest_point_hit, pie_hit, HitTestEnv};
pub use interaction::{InteractionEffect, InteractionEngine, InteractionState};
pub use overlay::{OverlayBroker, OverlayWidgets};
pub use scheduler::{DirtyFlags, FrameMetrics, FrameScheduler};
