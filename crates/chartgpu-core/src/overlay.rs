//! Overlay broker
//!
//! Computes tooltip, legend, and axis-label payloads. In host mode the
//! coordinator drives an `OverlayWidgets` implementation with them; in
//! embedded mode they go out as callback events.

use chartgpu_render::{GridArea, Scale};
use chartgpu_shared::{
    color_to_css, AxisKind, AxisLabel, AxisLabels, AxisOptions, HitResult, PointBatch,
    ResolvedOptions, TooltipParam, TooltipPayload, TooltipTrigger,
};

use crate::hit_test::HitTestEnv;

/// Host-side widget cluster the broker drives in host mode. The concrete
/// implementation (DOM or otherwise) lives outside the core.
pub trait OverlayWidgets {
    fn show_tooltip(&mut self, payload: &TooltipPayload);
    fn hide_tooltip(&mut self);
    fn update_legend(&mut self, items: &[chartgpu_shared::LegendItem]);
    fn update_axis_labels(&mut self, labels: &AxisLabels);
    /// Measured CSS size of the rendered legend, for grid layout.
    fn measure_legend(&mut self, items: &[chartgpu_shared::LegendItem]) -> (f64, f64);
}

/// Gap between the grid edge and axis label anchors, CSS pixels.
const LABEL_GAP_CSS: f64 = 8.0;

#[derive(Default)]
pub struct OverlayBroker;

impl OverlayBroker {
    /// Legend entries from series config and palette, config order.
    pub fn legend_items(options: &ResolvedOptions) -> Vec<chartgpu_shared::LegendItem> {
        options
            .series
            .iter()
            .enumerate()
            .map(|(series_index, series)| chartgpu_shared::LegendItem {
                name: series.name.clone(),
                color_css: color_to_css(series.resolved_color(&options.palette, series_index)),
                series_index,
            })
            .collect()
    }

    /// Fixed per-item estimate used when no widget measurement is available
    /// (embedded mode), keeping grid layout deterministic.
    pub fn estimate_legend_size(items: &[chartgpu_shared::LegendItem]) -> (f64, f64) {
        let widest = items.iter().map(|i| i.name.len()).max().unwrap_or(0);
        (widest as f64 * 7.0 + 28.0, items.len() as f64 * 20.0 + 8.0)
    }

    /// Axis labels from the tick generators.
    pub fn axis_labels(
        options: &ResolvedOptions,
        x_scale: &Scale,
        y_scale: &Scale,
        grid: &GridArea,
    ) -> AxisLabels {
        let mut labels = AxisLabels::default();
        let x_baseline = grid.top + grid.plot_height() + LABEL_GAP_CSS;
        let y_baseline = grid.left - LABEL_GAP_CSS;

        for (text, position) in ticks_for(&options.x_axis, x_scale) {
            labels.x_labels.push(AxisLabel {
                text,
                x_css: position,
                y_css: x_baseline,
                rotation_deg: options.x_axis.label_rotation_deg,
                is_title: false,
            });
        }
        if let Some(title) = &options.x_axis.title {
            labels.x_labels.push(AxisLabel {
                text: title.clone(),
                x_css: grid.left + grid.plot_width() * 0.5,
                y_css: x_baseline + 2.0 * LABEL_GAP_CSS,
                rotation_deg: 0.0,
                is_title: true,
            });
        }

        for (text, position) in ticks_for(&options.y_axis, y_scale) {
            labels.y_labels.push(AxisLabel {
                text,
                x_css: y_baseline,
                y_css: position,
                rotation_deg: options.y_axis.label_rotation_deg,
                is_title: false,
            });
        }
        if let Some(title) = &options.y_axis.title {
            labels.y_labels.push(AxisLabel {
                text: title.clone(),
                x_css: y_baseline - 3.0 * LABEL_GAP_CSS,
                y_css: grid.top + grid.plot_height() * 0.5,
                rotation_deg: -90.0,
                is_title: true,
            });
        }
        labels
    }

    /// Tooltip payload for the current interaction state, or `None` when the
    /// tooltip should hide.
    pub fn tooltip(
        env: &HitTestEnv<'_>,
        trigger: TooltipTrigger,
        crosshair_x: Option<f64>,
        hover_hit: Option<&HitResult>,
        css_x: f64,
        css_y: f64,
    ) -> Option<TooltipPayload> {
        match trigger {
            TooltipTrigger::Item => {
                let hit = hover_hit?;
                let param = param_for(env, hit.series_index, hit.data_index)?;
                Some(TooltipPayload {
                    content: format_params(std::slice::from_ref(&param)),
                    params: vec![param],
                    x_css: css_x,
                    y_css: css_y,
                })
            }
            TooltipTrigger::Axis => {
                let x = crosshair_x?;
                let mut params = Vec::new();
                for (series_index, series_options) in env.options.series.iter().enumerate() {
                    if !series_options.visible {
                        continue;
                    }
                    if let Some(data_index) = nearest_index_at_x(env, series_index, x) {
                        if let Some(param) = param_for(env, series_index, data_index) {
                            params.push(param);
                        }
                    }
                }
                if params.is_empty() {
                    return None;
                }
                Some(TooltipPayload {
                    content: format_params(&params),
                    params,
                    x_css: css_x,
                    y_css: css_y,
                })
            }
        }
    }
}

fn ticks_for(axis: &AxisOptions, scale: &Scale) -> Vec<(String, f64)> {
    match (axis.kind, scale) {
        (AxisKind::Category, Scale::Category(category)) => category
            .labels()
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), category.band_center(i)))
            .collect(),
        (_, Scale::Linear(linear)) => linear
            .ticks(axis.split_hint)
            .into_iter()
            .map(|tick| (format_tick(tick), linear.scale(tick)))
            .collect(),
        // Axis kind and scale kind disagree mid-reconfigure; skip a frame.
        _ => Vec::new(),
    }
}

fn format_tick(value: f64) -> String {
    if value != 0.0 && (value.abs() >= 1e6 || value.abs() < 1e-4) {
        format!("{value:e}")
    } else {
        let rounded = (value * 1e6).round() / 1e6;
        format!("{rounded}")
    }
}

/// Index of the series point nearest to domain `x`.
fn nearest_index_at_x(env: &HitTestEnv<'_>, series_index: usize, x: f64) -> Option<usize> {
    let series = env.store.series_at(series_index)?;
    let mut best: Option<(usize, f64)> = None;
    let mut consider = |index: usize, point_x: f64| {
        let distance = (point_x - x).abs();
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((index, distance));
        }
    };
    match series.points() {
        PointBatch::Xy(points) => {
            for (index, point) in points.iter().enumerate() {
                consider(index, point[0] as f64);
            }
        }
        PointBatch::Ohlc(candles) => {
            for (index, candle) in candles.iter().enumerate() {
                consider(index, candle[0] as f64);
            }
        }
    }
    best.map(|(index, _)| index)
}

fn param_for(env: &HitTestEnv<'_>, series_index: usize, data_index: usize) -> Option<TooltipParam> {
    let series = env.store.series_at(series_index)?;
    let series_options = env.options.series.get(series_index)?;
    let value: Vec<f64> = match series.points() {
        PointBatch::Xy(points) => points
            .get(data_index)?
            .iter()
            .map(|v| *v as f64)
            .collect(),
        PointBatch::Ohlc(candles) => candles
            .get(data_index)?
            .iter()
            .map(|v| *v as f64)
            .collect(),
    };
    Some(TooltipParam {
        series_index,
        series_name: series_options.name.clone(),
        data_index,
        value,
        color: series_options.resolved_color(&env.options.palette, series_index),
    })
}

fn format_params(params: &[TooltipParam]) -> String {
    params
        .iter()
        .map(|param| {
            let value = param
                .value
                .iter()
                .skip(1)
                .map(|v| format_tick(*v))
                .collect::<Vec<_>>()
                .join(" ");
            format!("{}: {}", param.series_name, value)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_tick() {
        assert_eq!(format_tick(0.0), "0");
        assert_eq!(format_tick(2.5), "2.5");
        assert_eq!(format_tick(1.0000004), "1");
        assert_eq!(format_tick(2_000_000.0), "2e6");
    }
}
