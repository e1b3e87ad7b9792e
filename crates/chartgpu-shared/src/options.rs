//! Resolved chart option tree
//!
//! Options arrive fully defaulted from the host-side resolver; nothing in the
//! core applies defaults. The tree is an immutable snapshot replaced wholesale
//! on every `setOptions`.

use serde::{Deserialize, Serialize};

/// Fully defaulted chart configuration snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedOptions {
    pub grid: GridOptions,
    pub x_axis: AxisOptions,
    pub y_axis: AxisOptions,
    pub series: Vec<SeriesOptions>,
    pub theme: Theme,
    pub palette: Vec<[f32; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom: Option<ZoomOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<TooltipOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<LegendOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facet: Option<FacetOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation: Option<AnimationOptions>,
    pub auto_scroll: bool,
}

/// Grid insets in CSS pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GridOptions {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            left: 60.0,
            right: 20.0,
            top: 20.0,
            bottom: 40.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisKind {
    Value,
    Time,
    Category,
}

/// Which data window feeds automatic axis bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoBoundsMode {
    Global,
    Visible,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisOptions {
    pub kind: AxisKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Approximate tick count the generator aims for.
    pub split_hint: u32,
    pub label_rotation_deg: f32,
    pub auto_bounds: AutoBoundsMode,
    /// Category labels; only consulted when `kind == Category`.
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl AxisOptions {
    pub fn value() -> Self {
        Self {
            kind: AxisKind::Value,
            min: None,
            max: None,
            split_hint: 5,
            label_rotation_deg: 0.0,
            auto_bounds: AutoBoundsMode::Global,
            categories: Vec::new(),
            title: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Line,
    Area,
    Bar,
    Scatter,
    ScatterDensity,
    Heatmap,
    Pie,
    Candlestick,
    Histogram,
}

impl SeriesKind {
    /// Internal packed-f32 stride in bytes for this series type.
    pub fn stride(self) -> usize {
        match self {
            SeriesKind::Candlestick => 20,
            _ => 8,
        }
    }

    pub fn is_ohlc(self) -> bool {
        matches!(self, SeriesKind::Candlestick)
    }
}

/// Downsampling strategy applied once the logical point count exceeds the
/// series threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingStrategy {
    None,
    Lttb,
    Average,
    Max,
    Min,
    Ohlc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScatterShape {
    Disk,
    Square,
    Triangle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DensityCurve {
    Linear,
    Sqrt,
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandleStyle {
    Classic,
    Hollow,
}

/// Named colormap or explicit user stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColormapSpec {
    Viridis,
    Plasma,
    Inferno,
    Stops(Vec<[f32; 4]>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaStyle {
    pub fill_color: [f32; 4],
    /// Baseline y in domain space the area drops to.
    pub baseline: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeriesOptions {
    pub width: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_style: Option<AreaStyle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarSeriesOptions {
    /// Fraction of the category band one bar occupies, (0, 1].
    pub width_ratio: f32,
    /// Gap between bars of adjacent categories as a fraction of the band.
    pub gap_ratio: f32,
    pub corner_radius_px: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScatterSeriesOptions {
    pub size_px: f32,
    pub shape: ScatterShape,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScatterDensityOptions {
    /// Bin size of the pixel-space grid, in device pixels.
    pub cell_size_px: u32,
    pub colormap: ColormapSpec,
    pub curve: DensityCurve,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatmapSeriesOptions {
    pub colormap: ColormapSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_max: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PieSeriesOptions {
    /// Center in fractions of the grid area.
    pub center: [f64; 2],
    /// Outer radius in device pixels.
    pub radius_px: f64,
    /// Start angle in degrees, clockwise from 12 o'clock.
    pub start_angle_deg: f64,
    #[serde(default)]
    pub slice_labels: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandlestickSeriesOptions {
    pub style: CandleStyle,
    pub up_color: [f32; 4],
    pub down_color: [f32; 4],
    /// Fraction of the candle slot the body occupies.
    pub body_ratio: f32,
}

/// Per-type series configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SeriesTypeOptions {
    Line(LineSeriesOptions),
    Area(LineSeriesOptions),
    Bar(BarSeriesOptions),
    Scatter(ScatterSeriesOptions),
    #[serde(rename = "scatterdensity")]
    ScatterDensity(ScatterDensityOptions),
    Heatmap(HeatmapSeriesOptions),
    Pie(PieSeriesOptions),
    Candlestick(CandlestickSeriesOptions),
    Histogram(BarSeriesOptions),
}

impl SeriesTypeOptions {
    pub fn kind(&self) -> SeriesKind {
        match self {
            SeriesTypeOptions::Line(_) => SeriesKind::Line,
            SeriesTypeOptions::Area(_) => SeriesKind::Area,
            SeriesTypeOptions::Bar(_) => SeriesKind::Bar,
            SeriesTypeOptions::Scatter(_) => SeriesKind::Scatter,
            SeriesTypeOptions::ScatterDensity(_) => SeriesKind::ScatterDensity,
            SeriesTypeOptions::Heatmap(_) => SeriesKind::Heatmap,
            SeriesTypeOptions::Pie(_) => SeriesKind::Pie,
            SeriesTypeOptions::Candlestick(_) => SeriesKind::Candlestick,
            SeriesTypeOptions::Histogram(_) => SeriesKind::Histogram,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesOptions {
    pub name: String,
    #[serde(flatten)]
    pub type_options: SeriesTypeOptions,
    /// Resolved color; falls back to the palette slot for the series index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<[f32; 4]>,
    pub sampling: SamplingStrategy,
    pub sampling_threshold: usize,
    pub visible: bool,
}

impl SeriesOptions {
    pub fn kind(&self) -> SeriesKind {
        self.type_options.kind()
    }

    /// Resolved color for this series given the chart palette.
    pub fn resolved_color(&self, palette: &[[f32; 4]], index: usize) -> [f32; 4] {
        self.color.unwrap_or_else(|| {
            if palette.is_empty() {
                [0.5, 0.5, 0.5, 1.0]
            } else {
                palette[index % palette.len()]
            }
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ZoomOptions {
    pub start: f64,
    pub end: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_span: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_span: Option<f64>,
    /// Zoom factor per wheel-delta unit.
    pub wheel_sensitivity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TooltipTrigger {
    Item,
    Axis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TooltipOptions {
    pub trigger: TooltipTrigger,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegendPosition {
    Left,
    Right,
    Top,
    Bottom,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegendOptions {
    pub position: LegendPosition,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FacetOptions {
    pub rows: u32,
    pub cols: u32,
    /// Gap between facet cells in CSS pixels.
    pub gap: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationOptions {
    pub enabled: bool,
    pub duration_ms: f64,
}

/// Resolved theme colors, each RGBA in [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub background: [f32; 4],
    pub grid_line: [f32; 4],
    pub axis_label: [f32; 4],
    pub crosshair: [f32; 4],
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: [0.08, 0.08, 0.1, 1.0],
            grid_line: [0.2, 0.2, 0.22, 1.0],
            axis_label: [0.8, 0.8, 0.82, 1.0],
            crosshair: [0.6, 0.6, 0.62, 1.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_kind_strides() {
        assert_eq!(SeriesKind::Line.stride(), 8);
        assert_eq!(SeriesKind::Candlestick.stride(), 20);
        assert!(SeriesKind::Candlestick.is_ohlc());
        assert!(!SeriesKind::Heatmap.is_ohlc());
    }

    #[test]
    fn test_resolved_color_falls_back_to_palette() {
        let series = SeriesOptions {
            name: "a".to_string(),
            type_options: SeriesTypeOptions::Line(LineSeriesOptions {
                width: 2.0,
                area_style: None,
            }),
            color: None,
            sampling: SamplingStrategy::None,
            sampling_threshold: 0,
            visible: true,
        };
        let palette = vec![[1.0, 0.0, 0.0, 1.0], [0.0, 1.0, 0.0, 1.0]];
        assert_eq!(series.resolved_color(&palette, 3), [0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_options_serde_round_trip() {
        let options = ResolvedOptions {
            grid: GridOptions::default(),
            x_axis: AxisOptions::value(),
            y_axis: AxisOptions::value(),
            series: vec![],
            theme: Theme::default(),
            palette: vec![[0.2, 0.4, 0.9, 1.0]],
            zoom: Some(ZoomOptions {
                start: 0.0,
                end: 100.0,
                min_span: Some(1.0),
                max_span: None,
                wheel_sensitivity: 0.0015,
            }),
            tooltip: None,
            legend: None,
            facet: None,
            animation: None,
            auto_scroll: false,
        };

        let json = serde_json::to_string(&options).unwrap();
        let back: ResolvedOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back.zoom.unwrap().min_span, Some(1.0));
        assert_eq!(back.palette.len(), 1);
    }
}
