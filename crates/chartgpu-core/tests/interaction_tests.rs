//! Integration tests for the interaction engine, hit testing, and overlay
//! payloads. Everything here runs against CPU state only.

use chartgpu_core::{
    HitTestEnv, InteractionEffect, InteractionEngine, OverlayBroker,
};
use chartgpu_data::DataStore;
use chartgpu_render::{GridArea, LinearScale, Scale};
use chartgpu_shared::{
    AxisOptions, GridOptions, LineSeriesOptions, PointBatch, PointerEvent, PointerEventKind,
    ResolvedOptions, SamplingStrategy, SeriesOptions, SeriesTypeOptions, Theme, TooltipTrigger,
    ZoomOptions,
};

fn line_series(name: &str) -> SeriesOptions {
    SeriesOptions {
        name: name.to_string(),
        type_options: SeriesTypeOptions::Line(LineSeriesOptions {
            width: 2.0,
            area_style: None,
        }),
        color: None,
        sampling: SamplingStrategy::None,
        sampling_threshold: 0,
        visible: true,
    }
}

struct Fixture {
    store: DataStore,
    options: ResolvedOptions,
    x_scale: Scale,
    y_scale: Scale,
    grid: GridArea,
}

impl Fixture {
    /// Two length-3 line series over a 100×100 CSS grid with no insets, with
    /// identity-like scales: domain x in [0, 100], y in [0, 100].
    fn two_lines() -> Self {
        let options = ResolvedOptions {
            grid: GridOptions {
                left: 0.0,
                right: 0.0,
                top: 0.0,
                bottom: 0.0,
            },
            x_axis: AxisOptions::value(),
            y_axis: AxisOptions::value(),
            series: vec![line_series("a"), line_series("b")],
            theme: Theme::default(),
            palette: vec![[0.2, 0.4, 0.9, 1.0], [0.8, 0.4, 0.2, 1.0]],
            zoom: Some(ZoomOptions {
                start: 0.0,
                end: 100.0,
                min_span: None,
                max_span: None,
                wheel_sensitivity: 0.0015,
            }),
            tooltip: None,
            legend: None,
            facet: None,
            animation: None,
            auto_scroll: false,
        };
        let mut store = DataStore::new();
        store.configure(&options.series, &options.palette).unwrap();
        // Series 0 and 1 share x positions; series 1 sits 10 units higher.
        store
            .append(0, PointBatch::Xy(vec![[10.0, 50.0], [50.0, 50.0], [90.0, 50.0]]))
            .unwrap();
        store
            .append(1, PointBatch::Xy(vec![[10.0, 60.0], [50.0, 60.0], [90.0, 60.0]]))
            .unwrap();

        Self {
            store,
            options,
            x_scale: Scale::Linear(LinearScale::new(0.0, 100.0, 0.0, 100.0)),
            y_scale: Scale::Linear(LinearScale::new(0.0, 100.0, 100.0, 0.0)),
            grid: GridArea {
                left: 0.0,
                right: 0.0,
                top: 0.0,
                bottom: 0.0,
                canvas_width: 100,
                canvas_height: 100,
                dpr: 1.0,
            },
        }
    }

    fn env(&self) -> HitTestEnv<'_> {
        HitTestEnv {
            store: &self.store,
            options: &self.options,
            x_scale: &self.x_scale,
            y_scale: &self.y_scale,
            grid: &self.grid,
        }
    }
}

fn move_event(x: f64, y: f64, t: f64) -> PointerEvent {
    PointerEvent::new(PointerEventKind::Move, x, y, t)
}

#[test]
fn hover_emits_crosshair_and_hover_once() {
    let fixture = Fixture::two_lines();
    let mut engine = InteractionEngine::new(fixture.options.zoom.as_ref());

    // Grid center: y=50 maps to css y=50; series 0 point (50, 50) is the
    // nearest by screen distance, so the tie-break picks series 0.
    let effects = engine.handle_pointer(&move_event(50.0, 52.0, 0.0), &fixture.env());

    let crosshairs: Vec<_> = effects
        .iter()
        .filter(|e| matches!(e, InteractionEffect::CrosshairMoved { .. }))
        .collect();
    assert_eq!(crosshairs.len(), 1);

    let hover = effects.iter().find_map(|e| match e {
        InteractionEffect::HoverChanged { hit } => hit.as_ref(),
        _ => None,
    });
    let hover = hover.expect("hover hit");
    assert_eq!(hover.series_index, 0);
    assert_eq!(hover.data_index, 1);

    // Same position again: no repeated events.
    let effects = engine.handle_pointer(&move_event(50.0, 52.0, 16.0), &fixture.env());
    assert!(effects.is_empty());
}

#[test]
fn hit_test_is_deterministic() {
    let fixture = Fixture::two_lines();
    let first = fixture.env().hit_test(50.0, 52.0);
    for _ in 0..10 {
        assert_eq!(fixture.env().hit_test(50.0, 52.0), first);
    }
}

#[test]
fn tie_breaks_prefer_smaller_series_index() {
    let mut fixture = Fixture::two_lines();
    // Make series 1 exactly as close as series 0: pointer equidistant.
    fixture.store.replace(1, PointBatch::Xy(vec![[50.0, 54.0]])).unwrap();
    // Pointer at css y=52: series 0 point at css y=50 (d=2), series 1 at
    // css y=46... adjust so distances are equal: series0 y=50 -> css 50,
    // series1 y=46 -> css 54. Pointer at 52 is 2 css from both.
    fixture.store.replace(0, PointBatch::Xy(vec![[50.0, 50.0]])).unwrap();
    fixture.store.replace(1, PointBatch::Xy(vec![[50.0, 46.0]])).unwrap();

    let hit = fixture.env().hit_test(50.0, 52.0).expect("hit");
    assert_eq!(hit.series_index, 0);
}

#[test]
fn click_within_slop_and_window() {
    let fixture = Fixture::two_lines();
    let mut engine = InteractionEngine::new(fixture.options.zoom.as_ref());

    engine.handle_pointer(
        &PointerEvent::new(PointerEventKind::Down, 50.0, 50.0, 0.0),
        &fixture.env(),
    );
    let effects = engine.handle_pointer(
        &PointerEvent::new(PointerEventKind::Up, 51.0, 50.0, 100.0),
        &fixture.env(),
    );
    assert!(effects
        .iter()
        .any(|e| matches!(e, InteractionEffect::Click { hit: Some(_), .. })));
}

#[test]
fn slow_release_is_not_a_click() {
    let fixture = Fixture::two_lines();
    let mut engine = InteractionEngine::new(fixture.options.zoom.as_ref());

    engine.handle_pointer(
        &PointerEvent::new(PointerEventKind::Down, 50.0, 50.0, 0.0),
        &fixture.env(),
    );
    let effects = engine.handle_pointer(
        &PointerEvent::new(PointerEventKind::Up, 50.0, 50.0, 400.0),
        &fixture.env(),
    );
    assert!(!effects
        .iter()
        .any(|e| matches!(e, InteractionEffect::Click { .. })));
}

#[test]
fn drag_pans_and_clamps_zoom() {
    let fixture = Fixture::two_lines();
    let mut engine = InteractionEngine::new(Some(&ZoomOptions {
        start: 20.0,
        end: 40.0,
        min_span: None,
        max_span: None,
        wheel_sensitivity: 0.0015,
    }));

    engine.handle_pointer(
        &PointerEvent::new(PointerEventKind::Down, 50.0, 50.0, 0.0),
        &fixture.env(),
    );
    // Drag 50 css left across a 100 css plot: window moves right by half a
    // span (10 percent points).
    let effects = engine.handle_pointer(&move_event(0.0, 50.0, 50.0), &fixture.env());
    let zoom = effects
        .iter()
        .find_map(|e| match e {
            InteractionEffect::ZoomChanged { zoom } => Some(*zoom),
            _ => None,
        })
        .expect("zoom change");
    assert!((zoom.start - 30.0).abs() < 1e-9);
    assert!((zoom.end - 50.0).abs() < 1e-9);

    // Keep dragging far past the extent: clamped, span preserved.
    let effects = engine.handle_pointer(&move_event(-1000.0, 50.0, 100.0), &fixture.env());
    let zoom = effects
        .iter()
        .find_map(|e| match e {
            InteractionEffect::ZoomChanged { zoom } => Some(*zoom),
            _ => None,
        })
        .expect("zoom change");
    assert_eq!((zoom.start, zoom.end), (80.0, 100.0));
}

#[test]
fn wheel_zooms_about_center_symmetrically() {
    let fixture = Fixture::two_lines();
    let mut engine = InteractionEngine::new(fixture.options.zoom.as_ref());

    let mut event = PointerEvent::new(PointerEventKind::Wheel, 50.0, 50.0, 0.0);
    event.wheel_delta = -120.0;
    let effects = engine.handle_pointer(&event, &fixture.env());

    let zoom_changes: Vec<_> = effects
        .iter()
        .filter_map(|e| match e {
            InteractionEffect::ZoomChanged { zoom } => Some(*zoom),
            _ => None,
        })
        .collect();
    assert_eq!(zoom_changes.len(), 1);
    let zoom = zoom_changes[0];
    assert!((zoom.start + zoom.end - 100.0).abs() < 1e-6);
    assert!(zoom.span() < 100.0);

    // Programmatic parity: applying the same window again changes nothing.
    assert!(engine.set_zoom(zoom.start, zoom.end).is_none());
}

#[test]
fn leave_clears_crosshair_and_tooltip() {
    let fixture = Fixture::two_lines();
    let mut engine = InteractionEngine::new(fixture.options.zoom.as_ref());

    engine.handle_pointer(&move_event(50.0, 50.0, 0.0), &fixture.env());
    assert!(engine.crosshair_x().is_some());

    let effects = engine.handle_pointer(
        &PointerEvent::new(PointerEventKind::Leave, -1.0, -1.0, 16.0),
        &fixture.env(),
    );
    assert!(engine.crosshair_x().is_none());
    assert!(effects
        .iter()
        .any(|e| matches!(e, InteractionEffect::CrosshairMoved { x: None })));
    assert!(effects
        .iter()
        .any(|e| matches!(e, InteractionEffect::TooltipCleared)));
}

#[test]
fn external_crosshair_tracks_source_tag() {
    let fixture = Fixture::two_lines();
    let mut engine = InteractionEngine::new(fixture.options.zoom.as_ref());

    assert!(engine.set_crosshair(Some(42.0), Some("slider-1")));
    assert_eq!(engine.crosshair_x(), Some(42.0));
    assert_eq!(engine.last_external_source(), Some("slider-1"));

    // Same value from the same source: no change, no event.
    assert!(!engine.set_crosshair(Some(42.0), Some("slider-1")));

    // A pointer move takes ownership back and clears the external tag.
    engine.handle_pointer(&move_event(50.0, 50.0, 0.0), &fixture.env());
    assert_eq!(engine.last_external_source(), None);
}

#[test]
fn axis_tooltip_collects_all_series_at_crosshair() {
    let mut fixture = Fixture::two_lines();
    fixture.options.tooltip = Some(chartgpu_shared::TooltipOptions {
        trigger: TooltipTrigger::Axis,
        enabled: true,
    });
    let env = fixture.env();
    let hover = env.hit_test(50.0, 52.0);
    let payload = OverlayBroker::tooltip(
        &env,
        TooltipTrigger::Axis,
        Some(50.0),
        hover.as_ref(),
        50.0,
        52.0,
    )
    .expect("tooltip");

    assert_eq!(payload.params.len(), 2);
    assert!(payload
        .params
        .iter()
        .all(|p| p.series_index == 0 || p.series_index == 1));
    assert!(payload.x_css.is_finite());
}

#[test]
fn legend_items_follow_config_order_and_palette() {
    let fixture = Fixture::two_lines();
    let items = OverlayBroker::legend_items(&fixture.options);
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].name, "a");
    assert_eq!(items[0].series_index, 0);
    assert_eq!(items[1].color_css, "rgba(204, 102, 51, 1)");
}

#[test]
fn axis_labels_cover_data_extent() {
    let fixture = Fixture::two_lines();
    let labels = OverlayBroker::axis_labels(
        &fixture.options,
        &fixture.x_scale,
        &fixture.y_scale,
        &fixture.grid,
    );
    assert!(!labels.x_labels.is_empty());
    assert!(!labels.y_labels.is_empty());
    // The y axis spans at least the data's max value.
    let max_y_tick = labels
        .y_labels
        .iter()
        .filter_map(|l| l.text.parse::<f64>().ok())
        .fold(f64::NEG_INFINITY, f64::max);
    assert!(max_y_tick >= 60.0);
}
