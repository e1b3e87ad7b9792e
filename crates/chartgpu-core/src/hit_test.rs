//! Pointer hit testing
//!
//! All tests run in CSS-pixel screen space so results stay consistent with
//! the on-GPU transforms, which are derived from the same scales.

use chartgpu_data::DataStore;
use chartgpu_render::{GridArea, Scale};
use chartgpu_shared::{
    HitResult, PointBatch, ResolvedOptions, SeriesKind, SeriesTypeOptions,
};

/// Screen-space cap for nearest-point association, CSS pixels.
pub const NEAREST_CAP_CSS: f64 = 50.0;

/// Everything hit testing needs for one frame.
pub struct HitTestEnv<'a> {
    pub store: &'a DataStore,
    pub options: &'a ResolvedOptions,
    pub x_scale: &'a Scale,
    pub y_scale: &'a Scale,
    pub grid: &'a GridArea,
}

impl HitTestEnv<'_> {
    /// Dispatches to the per-type hit policy and returns the best hit.
    pub fn hit_test(&self, css_x: f64, css_y: f64) -> Option<HitResult> {
        let mut best: Option<HitResult> = None;
        for (series_index, series_options) in self.options.series.iter().enumerate() {
            if !series_options.visible {
                continue;
            }
            let candidate = match series_options.kind() {
                SeriesKind::Pie => pie_hit(self, series_index, css_x, css_y),
                SeriesKind::Candlestick => candle_hit(self, series_index, css_x, css_y),
                SeriesKind::Heatmap | SeriesKind::ScatterDensity => None,
                _ => nearest_point_hit(self, series_index, css_x, css_y),
            };
            // Strict comparison keeps the smaller series index on ties.
            if let Some(hit) = candidate {
                if best.as_ref().is_none_or(|b| hit.distance_css < b.distance_css) {
                    best = Some(hit);
                }
            }
        }
        best
    }
}

/// Nearest data point by Euclidean screen distance, capped; ties go to the
/// smallest data index.
pub fn nearest_point_hit(
    env: &HitTestEnv<'_>,
    series_index: usize,
    css_x: f64,
    css_y: f64,
) -> Option<HitResult> {
    let series = env.store.series_at(series_index)?;
    let PointBatch::Xy(points) = series.points() else {
        return None;
    };

    let mut best: Option<(usize, f64)> = None;
    for (data_index, point) in points.iter().enumerate() {
        let px = env.x_scale.position(point[0] as f64);
        let py = env.y_scale.position(point[1] as f64);
        let distance = ((px - css_x).powi(2) + (py - css_y).powi(2)).sqrt();
        if distance <= NEAREST_CAP_CSS && best.is_none_or(|(_, d)| distance < d) {
            best = Some((data_index, distance));
        }
    }
    best.map(|(data_index, distance)| HitResult {
        series_index,
        data_index,
        distance_css: distance,
    })
}

/// Polar wedge + radius test; slice order is config order.
pub fn pie_hit(
    env: &HitTestEnv<'_>,
    series_index: usize,
    css_x: f64,
    css_y: f64,
) -> Option<HitResult> {
    let series_options = env.options.series.get(series_index)?;
    let SeriesTypeOptions::Pie(pie) = &series_options.type_options else {
        return None;
    };
    let series = env.store.series_at(series_index)?;
    let PointBatch::Xy(points) = series.points() else {
        return None;
    };

    let center_x = env.grid.left + env.grid.plot_width() * pie.center[0];
    let center_y = env.grid.top + env.grid.plot_height() * pie.center[1];
    let radius_css = pie.radius_px / env.grid.dpr;

    let dx = css_x - center_x;
    let dy = css_y - center_y;
    let distance = (dx * dx + dy * dy).sqrt();
    if distance > radius_css {
        return None;
    }

    // Clockwise from 12 o'clock, wrapped into [0, τ).
    let pointer_angle = dx.atan2(-dy).rem_euclid(std::f64::consts::TAU);

    let values: Vec<f64> = points.iter().map(|p| p[1] as f64).collect();
    let total: f64 = values.iter().filter(|v| v.is_finite() && **v > 0.0).sum();
    if total <= 0.0 {
        return None;
    }
    let mut cursor = pie.start_angle_deg.to_radians();
    for (data_index, value) in values.iter().enumerate() {
        let sweep = if value.is_finite() && *value > 0.0 {
            value / total * std::f64::consts::TAU
        } else {
            0.0
        };
        let delta = (pointer_angle - cursor).rem_euclid(std::f64::consts::TAU);
        if sweep > 0.0 && delta <= sweep {
            return Some(HitResult {
                series_index,
                data_index,
                distance_css: distance,
            });
        }
        cursor += sweep;
    }
    None
}

/// Candle body rectangle test; wicks are excluded.
pub fn candle_hit(
    env: &HitTestEnv<'_>,
    series_index: usize,
    css_x: f64,
    css_y: f64,
) -> Option<HitResult> {
    let series_options = env.options.series.get(series_index)?;
    let SeriesTypeOptions::Candlestick(candle_options) = &series_options.type_options else {
        return None;
    };
    let series = env.store.series_at(series_index)?;
    let PointBatch::Ohlc(candles) = series.points() else {
        return None;
    };

    let slot_css = candle_slot_css(env.x_scale, candles);
    let half_width = (slot_css * candle_options.body_ratio.clamp(0.05, 1.0) as f64 * 0.5).max(0.5);

    for (data_index, candle) in candles.iter().enumerate() {
        let cx = env.x_scale.position(candle[0] as f64);
        if (css_x - cx).abs() > half_width {
            continue;
        }
        let open_px = env.y_scale.position(candle[1] as f64);
        let close_px = env.y_scale.position(candle[4] as f64);
        let top = open_px.min(close_px);
        let bottom = open_px.max(close_px);
        if css_y >= top && css_y <= bottom {
            return Some(HitResult {
                series_index,
                data_index,
                distance_css: (css_x - cx).abs(),
            });
        }
    }
    None
}

fn candle_slot_css(x_scale: &Scale, candles: &[[f32; 5]]) -> f64 {
    match x_scale {
        Scale::Category(scale) => scale.bandwidth(),
        Scale::Linear(scale) => {
            let mut min_gap = f64::INFINITY;
            for pair in candles.windows(2) {
                let gap = (scale.scale(pair[1][0] as f64) - scale.scale(pair[0][0] as f64)).abs();
                if gap > 0.0 {
                    min_gap = min_gap.min(gap);
                }
            }
            if min_gap.is_finite() {
                min_gap
            } else {
                8.0
            }
        }
    }
}
