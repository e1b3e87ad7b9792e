//! GPU rendering engine for ChartGPU
//!
//! Owns the graphics context, scales and grid layout, and one renderer per
//! series type. Renderers are driven by the coordinator: `prepare` computes
//! per-instance data from the current scales, `render` records into the
//! frame's single pass.

pub mod chart_renderers;
pub mod colormap;
pub mod context;
pub mod layout;
pub mod scale;

pub use chart_renderers::{create_renderer, PrepareContext, SeriesRenderer};
pub use colormap::{colormap_lut, sample_colormap, ColormapTexture};
pub use context::{ContextOptions, GraphicsContext};
pub use layout::{compute_grid_area, facet_cells, GridArea};
pub use scale::{CategoryScale, LinearScale, Scale};
