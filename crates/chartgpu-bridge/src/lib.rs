//! Worker bridge for ChartGPU
//!
//! Expressed natively as two single-threaded cooperative loops: the
//! `ChartController` owns all GPU state on a dedicated renderer thread, the
//! `ChartProxy` lives with the host. They communicate over two unbounded
//! channels; binary point data and the surface handle move by ownership
//! transfer. Correlated requests use a pending map of oneshot senders with a
//! 30 s timeout.

pub mod controller;
pub mod messages;
pub mod proxy;

pub use controller::ChartController;
pub use messages::{AppendItem, InboundMessage, OutboundMessage};
pub use proxy::{ChartProxy, ProxyHandlers};
