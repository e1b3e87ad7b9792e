//! Integration tests for the data store
//!
//! These exercise the CPU side of the store: logical lists, append cursors,
//! upload planning, and hashing. GPU submission paths are covered by the
//! renderer's on-device tests.

use chartgpu_data::{AppendOutcome, DataStore, UploadPlan};
use chartgpu_shared::{
    LineSeriesOptions, PointBatch, SamplingStrategy, SeriesOptions, SeriesTypeOptions,
    STRIDE_XY_F32,
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

fn xy(points: &[[f32; 2]]) -> PointBatch {
    PointBatch::Xy(points.to_vec())
}

fn store_with_one_series() -> DataStore {
    let mut store = DataStore::new();
    store
        .configure(&[line_series("a")], &[[1.0, 0.0, 0.0, 1.0]])
        .unwrap();
    store
}

#[test]
fn append_concatenates_logical_list() {
    let mut store = store_with_one_series();
    store.append(0, xy(&[[0.0, 0.0], [1.0, 1.0]])).unwrap();
    store.append(0, xy(&[[2.0, 4.0]])).unwrap();

    let series = store.series_at(0).unwrap();
    assert_eq!(series.logical_len(), 3);
    assert_eq!(
        series.points(),
        &xy(&[[0.0, 0.0], [1.0, 1.0], [2.0, 4.0]])
    );
}

#[test]
fn append_cursor_is_monotonic_and_bounded() {
    let mut store = store_with_one_series();

    store.append(0, xy(&[[0.0, 0.0], [1.0, 1.0]])).unwrap();
    let mut cursors = vec![store.series_at(0).unwrap().append_cursor()];

    // Simulate the frame loop: stage the upload, then append more.
    let series = store.series_mut(0).unwrap();
    let (plan, bytes) = series.take_pending_upload().unwrap();
    assert_eq!(plan, UploadPlan::for_append(0, 0, 16));
    assert_eq!(bytes.len(), 2 * STRIDE_XY_F32);
    cursors.push(series.append_cursor());

    store.append(0, xy(&[[2.0, 4.0]])).unwrap();
    let series = store.series_mut(0).unwrap();
    let (plan, bytes) = series.take_pending_upload().unwrap();
    // No buffer was ever allocated (no device in this test), so the plan
    // grows and re-uploads; the cursor still only moves forward.
    assert!(plan.grow_to.is_some() && plan.full_reupload);
    assert_eq!(bytes.len(), 3 * STRIDE_XY_F32);
    cursors.push(series.append_cursor());

    assert!(cursors.windows(2).all(|w| w[0] <= w[1]));
    assert!(series.append_cursor() <= series.logical_len());
    assert!(series.take_pending_upload().is_none());
}

#[test]
fn content_hash_rolls_on_append() {
    let mut store = store_with_one_series();
    let h0 = store.series_at(0).unwrap().content_hash();
    store.append(0, xy(&[[0.0, 0.0]])).unwrap();
    let h1 = store.series_at(0).unwrap().content_hash();
    store.append(0, xy(&[[1.0, 1.0]])).unwrap();
    let h2 = store.series_at(0).unwrap().content_hash();

    assert_ne!(h0, h1);
    assert_ne!(h1, h2);

    // Same data appended in one batch hashes identically.
    let mut other = store_with_one_series();
    other.append(0, xy(&[[0.0, 0.0]])).unwrap();
    other.append(0, xy(&[[1.0, 1.0]])).unwrap();
    assert_eq!(other.series_at(0).unwrap().content_hash(), h2);
}

#[test]
fn replace_resets_cursor_and_hash() {
    let mut store = store_with_one_series();
    store.append(0, xy(&[[0.0, 0.0], [1.0, 1.0]])).unwrap();
    let series = store.series_mut(0).unwrap();
    series.take_pending_upload().unwrap();
    assert_eq!(series.append_cursor(), 2);

    store.replace(0, xy(&[[5.0, 5.0]])).unwrap();
    let series = store.series_at(0).unwrap();
    assert_eq!(series.append_cursor(), 0);
    assert_eq!(series.logical_len(), 1);
}

#[test]
fn growth_outcome_reported() {
    let mut store = store_with_one_series();
    // First ever append always allocates.
    assert_eq!(
        store.append(0, xy(&[[0.0, 0.0]])).unwrap(),
        AppendOutcome::Regrown
    );
}

#[test]
fn invalid_series_index_is_data_error() {
    let mut store = store_with_one_series();
    let err = store.append(7, xy(&[[0.0, 0.0]])).unwrap_err();
    assert_eq!(err.code(), "data-error");
}

#[test]
fn layout_mismatch_rejected() {
    let mut store = store_with_one_series();
    let err = store
        .append(0, PointBatch::Ohlc(vec![[0.0, 1.0, 2.0, 0.5, 1.5]]))
        .unwrap_err();
    assert_eq!(err.code(), "data-error");
}

#[test]
fn dispose_is_idempotent_and_terminal() {
    let mut store = store_with_one_series();
    store.append(0, xy(&[[0.0, 0.0]])).unwrap();

    assert!(store.dispose().is_empty());
    assert!(store.dispose().is_empty());

    let err = store.append(0, xy(&[[1.0, 1.0]])).unwrap_err();
    assert_eq!(err.code(), "disposed");
}

#[test]
fn configure_keeps_data_for_unchanged_type() {
    let mut store = store_with_one_series();
    store.append(0, xy(&[[0.0, 0.0], [1.0, 2.0]])).unwrap();

    let mut renamed = line_series("renamed");
    renamed.visible = false;
    store.configure(&[renamed], &[]).unwrap();

    let series = store.series_at(0).unwrap();
    assert_eq!(series.logical_len(), 2);
    assert_eq!(series.name, "renamed");
    assert!(!series.visible);
}

#[test]
fn sampling_switches_to_full_reupload() {
    let mut series_options = line_series("sampled");
    series_options.sampling = SamplingStrategy::Lttb;
    series_options.sampling_threshold = 10;

    let mut store = DataStore::new();
    store.configure(&[series_options], &[]).unwrap();

    let points: Vec<[f32; 2]> = (0..100).map(|i| [i as f32, (i % 7) as f32]).collect();
    store.append(0, PointBatch::Xy(points)).unwrap();

    let series = store.series_mut(0).unwrap();
    let (plan, bytes) = series.take_pending_upload().unwrap();
    assert!(plan.full_reupload);
    assert_eq!(bytes.len(), 10 * STRIDE_XY_F32);
    assert_eq!(series.effective_len(), 10);
}

#[test]
fn extents_cover_visible_series() {
    let mut store = store_with_one_series();
    store
        .append(0, xy(&[[0.0, -2.0], [4.0, 9.0], [2.0, 3.0]]))
        .unwrap();

    assert_eq!(store.x_extent(), Some((0.0, 4.0)));
    assert_eq!(store.y_extent(None), Some((-2.0, 9.0)));
    assert_eq!(store.y_extent(Some((1.0, 5.0))), Some((3.0, 9.0)));
}
