//! Per-series data store
//!
//! The store owns the logical point lists and their GPU vertex buffers. The
//! append path uploads only the suffix past the append cursor while the
//! buffer has capacity; growth replaces the buffer and re-uploads the whole
//! range. A rolling content hash stamps every upload window.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chartgpu_shared::{
    ChartError, ChartResult, PointBatch, SamplingStrategy, SeriesKind, SeriesOptions,
};

use crate::gpu_buffer::{GrowableBuffer, UploadPlan};
use crate::sampling::{downsample_ohlc, downsample_xy};

/// What an append did to the GPU side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Only the appended suffix needs writing.
    Incremental,
    /// The buffer must grow; the full range is re-uploaded.
    Regrown,
    /// Nothing to write (empty batch).
    Noop,
}

/// Mutable per-series runtime state.
pub struct SeriesRuntime {
    pub name: String,
    pub kind: SeriesKind,
    pub color: [f32; 4],
    pub visible: bool,
    pub sampling: SamplingStrategy,
    pub sampling_threshold: usize,
    points: PointBatch,
    content_hash: u64,
    /// Points of the upload view already resident on the GPU.
    append_cursor: usize,
    /// Set when the sampled view must be recomputed and re-uploaded.
    resample_pending: bool,
    vertex: GrowableBuffer,
}

impl SeriesRuntime {
    pub fn new(index: usize, options: &SeriesOptions, palette: &[[f32; 4]]) -> Self {
        let kind = options.kind();
        let points = if kind.is_ohlc() {
            PointBatch::Ohlc(Vec::new())
        } else {
            PointBatch::Xy(Vec::new())
        };
        Self {
            name: options.name.clone(),
            kind,
            color: options.resolved_color(palette, index),
            visible: options.visible,
            sampling: options.sampling,
            sampling_threshold: options.sampling_threshold,
            points,
            content_hash: 0,
            append_cursor: 0,
            resample_pending: false,
            vertex: GrowableBuffer::vertex(format!("series-{index}-vertices")),
        }
    }

    pub fn logical_len(&self) -> usize {
        self.points.len()
    }

    pub fn append_cursor(&self) -> usize {
        self.append_cursor
    }

    pub fn content_hash(&self) -> u64 {
        self.content_hash
    }

    pub fn points(&self) -> &PointBatch {
        &self.points
    }

    pub fn vertex_buffer(&self) -> Option<&wgpu::Buffer> {
        self.vertex.buffer()
    }

    pub fn buffer_capacity_bytes(&self) -> u64 {
        self.vertex.capacity_bytes()
    }

    fn sampling_active(&self) -> bool {
        self.sampling != SamplingStrategy::None
            && self.sampling_threshold > 0
            && self.points.len() > self.sampling_threshold
    }

    /// Number of points in the upload view (sampled or logical).
    pub fn effective_len(&self) -> usize {
        if self.sampling_active() {
            self.sampling_threshold
        } else {
            self.points.len()
        }
    }

    fn effective_bytes(&self) -> Vec<u8> {
        if self.sampling_active() {
            match &self.points {
                PointBatch::Xy(points) => {
                    let sampled = downsample_xy(points, self.sampling, self.sampling_threshold);
                    bytemuck::cast_slice(&sampled).to_vec()
                }
                PointBatch::Ohlc(candles) => {
                    let sampled = downsample_ohlc(candles, self.sampling_threshold);
                    bytemuck::cast_slice(&sampled).to_vec()
                }
            }
        } else {
            self.points.as_bytes().to_vec()
        }
    }

    fn append(&mut self, batch: PointBatch) -> ChartResult<AppendOutcome> {
        if batch.is_empty() {
            return Ok(AppendOutcome::Noop);
        }
        let stride = self.kind.stride() as u64;
        let capacity = self.vertex.capacity_bytes();
        let outcome = match (&mut self.points, batch) {
            (PointBatch::Xy(points), PointBatch::Xy(new_points)) => {
                self.content_hash = roll_hash(self.content_hash, bytemuck::cast_slice(&new_points));
                points.extend_from_slice(&new_points);
                outcome_for(capacity, points.len() as u64 * stride)
            }
            (PointBatch::Ohlc(candles), PointBatch::Ohlc(new_candles)) => {
                self.content_hash =
                    roll_hash(self.content_hash, bytemuck::cast_slice(&new_candles));
                candles.extend_from_slice(&new_candles);
                outcome_for(capacity, candles.len() as u64 * stride)
            }
            (_, batch) => {
                log::warn!(
                    "series '{}': {:?} batch appended to {:?} series",
                    self.name,
                    batch.stride(),
                    self.kind
                );
                return Err(ChartError::data(format!(
                    "point layout does not match series type {:?}",
                    self.kind
                )));
            }
        };
        if self.sampling_active() {
            self.resample_pending = true;
        }
        Ok(outcome)
    }

    fn replace(&mut self, batch: PointBatch) -> ChartResult<()> {
        match (&self.points, &batch) {
            (PointBatch::Xy(_), PointBatch::Xy(_)) | (PointBatch::Ohlc(_), PointBatch::Ohlc(_)) => {
            }
            _ => {
                return Err(ChartError::data(format!(
                    "point layout does not match series type {:?}",
                    self.kind
                )));
            }
        }
        self.content_hash = roll_hash(0, batch.as_bytes());
        self.points = batch;
        self.append_cursor = 0;
        self.resample_pending = self.sampling_active();
        Ok(())
    }

    /// Computes the pending GPU write, advancing the append cursor. The
    /// caller must submit the returned bytes with the returned plan; there is
    /// at most one pending write per call.
    pub fn take_pending_upload(&mut self) -> Option<(UploadPlan, Vec<u8>)> {
        let stride = self.kind.stride() as u64;

        if self.sampling_active() {
            if !self.resample_pending {
                return None;
            }
            let bytes = self.effective_bytes();
            let plan = UploadPlan::for_replace(self.vertex.capacity_bytes(), bytes.len() as u64);
            self.resample_pending = false;
            self.append_cursor = (bytes.len() as u64 / stride) as usize;
            return Some((plan, bytes));
        }

        let total = self.points.len();
        if self.append_cursor >= total {
            return None;
        }
        let plan = UploadPlan::for_append(
            self.vertex.capacity_bytes(),
            self.append_cursor as u64 * stride,
            total as u64 * stride,
        );
        self.append_cursor = total;
        Some((plan, self.points.as_bytes().to_vec()))
    }

    /// Flushes any pending write to the GPU.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        if let Some((plan, bytes)) = self.take_pending_upload() {
            self.vertex.apply(device, queue, plan, &bytes);
        }
    }

    fn dispose(&mut self) {
        self.vertex.destroy();
        self.append_cursor = 0;
    }
}

fn outcome_for(capacity_bytes: u64, total_bytes: u64) -> AppendOutcome {
    if capacity_bytes >= total_bytes && capacity_bytes > 0 {
        AppendOutcome::Incremental
    } else {
        AppendOutcome::Regrown
    }
}

fn roll_hash(previous: u64, chunk: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    chunk.hash(&mut hasher);
    previous.wrapping_mul(31).wrapping_add(hasher.finish())
}

/// All series of one chart.
pub struct DataStore {
    series: Vec<SeriesRuntime>,
    disposed: bool,
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DataStore {
    pub fn new() -> Self {
        Self {
            series: Vec::new(),
            disposed: false,
        }
    }

    pub fn series(&self) -> &[SeriesRuntime] {
        &self.series
    }

    pub fn series_at(&self, index: usize) -> Option<&SeriesRuntime> {
        self.series.get(index)
    }

    pub fn series_mut(&mut self, index: usize) -> Option<&mut SeriesRuntime> {
        self.series.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Reconciles the series set against a new resolved options list. Series
    /// whose type is unchanged keep their data; type changes and removals
    /// drop the old runtime (buffers destroyed).
    pub fn configure(&mut self, options: &[SeriesOptions], palette: &[[f32; 4]]) -> ChartResult<()> {
        self.ensure_live()?;
        let mut next = Vec::with_capacity(options.len());
        for (index, series_options) in options.iter().enumerate() {
            let reusable = self
                .series
                .get(index)
                .is_some_and(|existing| existing.kind == series_options.kind());
            if reusable {
                let mut existing = std::mem::replace(
                    &mut self.series[index],
                    SeriesRuntime::new(index, series_options, palette),
                );
                existing.name = series_options.name.clone();
                existing.color = series_options.resolved_color(palette, index);
                existing.visible = series_options.visible;
                if existing.sampling != series_options.sampling
                    || existing.sampling_threshold != series_options.sampling_threshold
                {
                    existing.sampling = series_options.sampling;
                    existing.sampling_threshold = series_options.sampling_threshold;
                    existing.resample_pending = true;
                    existing.append_cursor = 0;
                }
                next.push(existing);
            } else {
                next.push(SeriesRuntime::new(index, series_options, palette));
            }
        }
        for mut removed in self.series.drain(..) {
            removed.dispose();
        }
        self.series = next;
        Ok(())
    }

    pub fn append(&mut self, series_index: usize, batch: PointBatch) -> ChartResult<AppendOutcome> {
        self.ensure_live()?;
        let series = self.series.get_mut(series_index).ok_or_else(|| {
            ChartError::data_for_series(series_index, "series index out of range")
        })?;
        series
            .append(batch)
            .map_err(|err| attach_series_index(err, series_index))
    }

    pub fn replace(&mut self, series_index: usize, batch: PointBatch) -> ChartResult<()> {
        self.ensure_live()?;
        let series = self.series.get_mut(series_index).ok_or_else(|| {
            ChartError::data_for_series(series_index, "series index out of range")
        })?;
        series
            .replace(batch)
            .map_err(|err| attach_series_index(err, series_index))
    }

    /// Flushes all pending series uploads.
    pub fn upload_all(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        for series in &mut self.series {
            series.upload(device, queue);
        }
    }

    /// Combined x extent over all visible series, `None` when no data.
    pub fn x_extent(&self) -> Option<(f64, f64)> {
        x_extent_of(self.series.iter().filter(|s| s.visible))
    }

    /// Combined y extent over visible series, restricted to `x_range` when
    /// given (visible-window auto bounds).
    pub fn y_extent(&self, x_range: Option<(f64, f64)>) -> Option<(f64, f64)> {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for series in self.series.iter().filter(|s| s.visible) {
            match series.points() {
                PointBatch::Xy(points) => {
                    for p in points {
                        if in_range(p[0] as f64, x_range) {
                            lo = lo.min(p[1] as f64);
                            hi = hi.max(p[1] as f64);
                        }
                    }
                }
                PointBatch::Ohlc(candles) => {
                    for c in candles {
                        if in_range(c[0] as f64, x_range) {
                            lo = lo.min(c[3] as f64);
                            hi = hi.max(c[2] as f64);
                        }
                    }
                }
            }
        }
        (lo <= hi).then_some((lo, hi))
    }

    /// Diagnostic snapshot for debug overlays.
    pub fn stats(&self) -> serde_json::Value {
        serde_json::json!({
            "series_count": self.series.len(),
            "total_points": self.series.iter().map(|s| s.logical_len()).sum::<usize>(),
            "buffer_bytes": self.series.iter().map(|s| s.buffer_capacity_bytes()).sum::<u64>(),
            "disposed": self.disposed,
        })
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Destroys all owned buffers, best-effort. Idempotent.
    pub fn dispose(&mut self) -> Vec<ChartError> {
        if self.disposed {
            return Vec::new();
        }
        self.disposed = true;
        for series in &mut self.series {
            series.dispose();
        }
        Vec::new()
    }

    fn ensure_live(&self) -> ChartResult<()> {
        if self.disposed {
            Err(ChartError::Disposed)
        } else {
            Ok(())
        }
    }
}

fn attach_series_index(err: ChartError, series_index: usize) -> ChartError {
    match err {
        ChartError::Data { message, .. } => ChartError::Data {
            message,
            series_index: Some(series_index),
        },
        other => other,
    }
}

fn in_range(x: f64, range: Option<(f64, f64)>) -> bool {
    match range {
        Some((lo, hi)) => x >= lo && x <= hi,
        None => true,
    }
}

fn x_extent_of<'a>(series: impl Iterator<Item = &'a SeriesRuntime>) -> Option<(f64, f64)> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for s in series {
        match s.points() {
            PointBatch::Xy(points) => {
                for p in points {
                    lo = lo.min(p[0] as f64);
                    hi = hi.max(p[0] as f64);
                }
            }
            PointBatch::Ohlc(candles) => {
                for c in candles {
                    lo = lo.min(c[0] as f64);
                    hi = hi.max(c[0] as f64);
                }
            }
        }
    }
    (lo <= hi).then_some((lo, hi))
}
