//! Grid area computation
//!
//! The grid area is where series draw: the canvas minus the option insets,
//! minus the measured legend edge, tiled into cells when facets are present.
//! Insets are CSS pixels; the canvas is device pixels.

use chartgpu_shared::{FacetOptions, LegendPosition, ResolvedOptions};

/// The plotting rectangle in CSS pixels plus the device-pixel canvas it sits
/// on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridArea {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub dpr: f64,
}

impl GridArea {
    pub fn canvas_width_css(&self) -> f64 {
        self.canvas_width as f64 / self.dpr
    }

    pub fn canvas_height_css(&self) -> f64 {
        self.canvas_height as f64 / self.dpr
    }

    /// Plot width in CSS pixels, never negative.
    pub fn plot_width(&self) -> f64 {
        (self.canvas_width_css() - self.left - self.right).max(0.0)
    }

    pub fn plot_height(&self) -> f64 {
        (self.canvas_height_css() - self.top - self.bottom).max(0.0)
    }

    /// Range of the x scale: `[left, left + plot_width]` in CSS pixels.
    pub fn x_range(&self) -> (f64, f64) {
        (self.left, self.left + self.plot_width())
    }

    /// Range of the y scale, inverted so larger values sit higher.
    pub fn y_range(&self) -> (f64, f64) {
        (self.top + self.plot_height(), self.top)
    }

    pub fn contains_css(&self, x: f64, y: f64) -> bool {
        x >= self.left
            && x <= self.left + self.plot_width()
            && y >= self.top
            && y <= self.top + self.plot_height()
    }

    /// Scissor rectangle in device pixels, clamped to the canvas.
    pub fn clip_rect_px(&self) -> (u32, u32, u32, u32) {
        let x = (self.left * self.dpr).floor().max(0.0) as u32;
        let y = (self.top * self.dpr).floor().max(0.0) as u32;
        let w = ((self.plot_width() * self.dpr).ceil() as u32).min(self.canvas_width - x.min(self.canvas_width));
        let h = ((self.plot_height() * self.dpr).ceil() as u32)
            .min(self.canvas_height - y.min(self.canvas_height));
        (x, y, w, h)
    }
}

/// Derives the grid area from resolved options, insetting the legend edge by
/// its measured CSS size when a legend is enabled.
pub fn compute_grid_area(
    options: &ResolvedOptions,
    canvas_width: u32,
    canvas_height: u32,
    dpr: f64,
    legend_size_css: Option<(f64, f64)>,
) -> GridArea {
    let mut area = GridArea {
        left: options.grid.left,
        right: options.grid.right,
        top: options.grid.top,
        bottom: options.grid.bottom,
        canvas_width,
        canvas_height,
        dpr: if dpr > 0.0 { dpr } else { 1.0 },
    };

    if let (Some(legend), Some((legend_w, legend_h))) = (&options.legend, legend_size_css) {
        if legend.enabled {
            match legend.position {
                LegendPosition::Left => area.left += legend_w,
                LegendPosition::Right => area.right += legend_w,
                LegendPosition::Top => area.top += legend_h,
                LegendPosition::Bottom => area.bottom += legend_h,
            }
        }
    }

    area
}

/// Tiles the inner area into `rows × cols` cells separated by `gap` CSS
/// pixels. Cells are returned row-major.
pub fn facet_cells(area: &GridArea, facet: &FacetOptions) -> Vec<GridArea> {
    let rows = facet.rows.max(1) as f64;
    let cols = facet.cols.max(1) as f64;
    let gap = facet.gap.max(0.0);

    let cell_width = ((area.plot_width() - gap * (cols - 1.0)) / cols).max(0.0);
    let cell_height = ((area.plot_height() - gap * (rows - 1.0)) / rows).max(0.0);

    let mut cells = Vec::with_capacity((facet.rows * facet.cols) as usize);
    for row in 0..facet.rows.max(1) {
        for col in 0..facet.cols.max(1) {
            let left = area.left + col as f64 * (cell_width + gap);
            let top = area.top + row as f64 * (cell_height + gap);
            cells.push(GridArea {
                left,
                right: area.canvas_width_css() - left - cell_width,
                top,
                bottom: area.canvas_height_css() - top - cell_height,
                canvas_width: area.canvas_width,
                canvas_height: area.canvas_height,
                dpr: area.dpr,
            });
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartgpu_shared::{
        AxisOptions, GridOptions, LegendOptions, ResolvedOptions, Theme,
    };

    fn options() -> ResolvedOptions {
        ResolvedOptions {
            grid: GridOptions {
                left: 60.0,
                right: 20.0,
                top: 20.0,
                bottom: 40.0,
            },
            x_axis: AxisOptions::value(),
            y_axis: AxisOptions::value(),
            series: vec![],
            theme: Theme::default(),
            palette: vec![],
            zoom: None,
            tooltip: None,
            legend: None,
            facet: None,
            animation: None,
            auto_scroll: false,
        }
    }

    #[test]
    fn test_plot_rect_in_css_pixels() {
        let area = compute_grid_area(&options(), 1600, 1200, 2.0, None);
        assert_eq!(area.canvas_width_css(), 800.0);
        assert_eq!(area.plot_width(), 800.0 - 60.0 - 20.0);
        assert_eq!(area.plot_height(), 600.0 - 20.0 - 40.0);
        assert!(area.contains_css(100.0, 100.0));
        assert!(!area.contains_css(10.0, 100.0));
    }

    #[test]
    fn test_legend_insets_one_edge() {
        let mut opts = options();
        opts.legend = Some(LegendOptions {
            position: LegendPosition::Right,
            enabled: true,
        });
        let area = compute_grid_area(&opts, 800, 600, 1.0, Some((120.0, 30.0)));
        assert_eq!(area.right, 20.0 + 120.0);
        assert_eq!(area.left, 60.0);
    }

    #[test]
    fn test_y_range_is_inverted() {
        let area = compute_grid_area(&options(), 800, 600, 1.0, None);
        let (lo, hi) = area.y_range();
        assert!(lo > hi);
        assert_eq!(hi, 20.0);
    }

    #[test]
    fn test_facet_tiling() {
        let area = compute_grid_area(&options(), 800, 600, 1.0, None);
        let cells = facet_cells(
            &area,
            &FacetOptions {
                rows: 2,
                cols: 2,
                gap: 10.0,
            },
        );
        assert_eq!(cells.len(), 4);
        let expected_w = (area.plot_width() - 10.0) / 2.0;
        for cell in &cells {
            assert!((cell.plot_width() - expected_w).abs() < 1e-9);
        }
        // Second column starts one cell + gap after the first.
        assert!((cells[1].left - (cells[0].left + expected_w + 10.0)).abs() < 1e-9);
    }

    #[test]
    fn test_clip_rect_in_device_pixels() {
        let area = compute_grid_area(&options(), 1600, 1200, 2.0, None);
        let (x, y, w, h) = area.clip_rect_px();
        assert_eq!(x, 120);
        assert_eq!(y, 40);
        assert_eq!(w, 1440);
        assert_eq!(h, 1080);
    }
}
