//! Frame scheduler
//!
//! Pure timing bookkeeping over an injected clock; the loop itself is driven
//! externally (the controller's tick interval in worker mode, the host frame
//! callback otherwise). At most one render happens per tick, and only when
//! something is dirty; `tick_once` always renders.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

/// Shared slot the `on_submitted_work_done` callback writes into from wgpu's
/// callback thread; the scheduler drains it on the next frame.
pub type GpuTimeSlot = Arc<Mutex<Option<Duration>>>;

/// Frame-time history window: ~2 s at 60 Hz.
const HISTORY: usize = 120;

/// Semantic dirty marks, flushed in a fixed order by the coordinator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirtyFlags {
    pub options: bool,
    pub layout: bool,
    pub data: bool,
    pub interaction: bool,
    pub theme: bool,
}

impl DirtyFlags {
    pub fn any(&self) -> bool {
        self.options || self.layout || self.data || self.interaction || self.theme
    }

    pub fn clear(&mut self) {
        *self = DirtyFlags::default();
    }

    pub fn all() -> Self {
        Self {
            options: true,
            layout: true,
            data: true,
            interaction: true,
            theme: true,
        }
    }
}

/// Frame timing statistics derived from the history window.
#[derive(Debug, Clone, Default)]
pub struct FrameMetrics {
    /// N / Σ Δt over the window.
    pub exact_fps: f64,
    pub avg_frame_ms: f64,
    pub min_frame_ms: f64,
    pub max_frame_ms: f64,
    pub p50_frame_ms: f64,
    pub p95_frame_ms: f64,
    pub p99_frame_ms: f64,
    pub consecutive_drops: u32,
    pub dropped_frames: u64,
    pub total_frames: u64,
    pub last_drop_ms_ago: Option<f64>,
    /// Most recent sampled GPU submit-to-done time.
    pub gpu_frame_ms: Option<f64>,
}

pub struct FrameScheduler {
    frame_times_ms: VecDeque<f64>,
    target_interval_ms: f64,
    running: bool,
    dirty: bool,
    last_tick_ms: Option<f64>,
    total_frames: u64,
    dropped_frames: u64,
    consecutive_drops: u32,
    last_drop_at_ms: Option<f64>,
    /// Written by the `on_submitted_work_done` callback thread, drained here.
    gpu_time: GpuTimeSlot,
    last_gpu_ms: Option<f64>,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(60.0)
    }
}

impl FrameScheduler {
    pub fn new(target_fps: f64) -> Self {
        Self {
            frame_times_ms: VecDeque::with_capacity(HISTORY),
            target_interval_ms: 1000.0 / target_fps.max(1.0),
            running: false,
            dirty: false,
            last_tick_ms: None,
            total_frames: 0,
            dropped_frames: 0,
            consecutive_drops: 0,
            last_drop_at_ms: None,
            gpu_time: Arc::new(Mutex::new(None)),
            last_gpu_ms: None,
        }
    }

    /// Handle for the GPU-completion callback to write into.
    pub fn gpu_time_slot(&self) -> GpuTimeSlot {
        Arc::clone(&self.gpu_time)
    }

    pub fn start(&mut self) {
        self.running = true;
        self.last_tick_ms = None;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Loop tick at time `now_ms`. Returns the frame delta when a render
    /// should happen this tick; `None` coalesces the tick away.
    pub fn tick(&mut self, now_ms: f64) -> Option<f64> {
        if !self.running || !self.dirty {
            return None;
        }
        Some(self.begin_frame(now_ms))
    }

    /// Manual tick: always renders, dirty or not.
    pub fn tick_once(&mut self, now_ms: f64) -> f64 {
        self.begin_frame(now_ms)
    }

    fn begin_frame(&mut self, now_ms: f64) -> f64 {
        self.dirty = false;
        let delta = match self.last_tick_ms {
            Some(previous) => (now_ms - previous).max(0.0),
            None => self.target_interval_ms,
        };
        self.last_tick_ms = Some(now_ms);
        self.total_frames += 1;

        if self.frame_times_ms.len() == HISTORY {
            self.frame_times_ms.pop_front();
        }
        self.frame_times_ms.push_back(delta);

        if delta > self.target_interval_ms * 1.5 {
            self.dropped_frames += 1;
            self.consecutive_drops += 1;
            self.last_drop_at_ms = Some(now_ms);
        } else {
            self.consecutive_drops = 0;
        }

        if let Some(gpu) = self.gpu_time.lock().take() {
            self.last_gpu_ms = Some(gpu.as_secs_f64() * 1000.0);
        }
        delta
    }

    /// Records a GPU submit-to-done sample; callable from any thread.
    pub fn record_gpu_time(&self, elapsed: Duration) {
        *self.gpu_time.lock() = Some(elapsed);
    }

    pub fn target_interval_ms(&self) -> f64 {
        self.target_interval_ms
    }

    pub fn metrics(&self, now_ms: f64) -> FrameMetrics {
        if self.frame_times_ms.is_empty() {
            return FrameMetrics {
                total_frames: self.total_frames,
                dropped_frames: self.dropped_frames,
                ..Default::default()
            };
        }

        let sum: f64 = self.frame_times_ms.iter().sum();
        let count = self.frame_times_ms.len();
        let mut sorted: Vec<f64> = self.frame_times_ms.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);

        FrameMetrics {
            exact_fps: if sum > 0.0 {
                count as f64 / (sum / 1000.0)
            } else {
                0.0
            },
            avg_frame_ms: sum / count as f64,
            min_frame_ms: sorted[0],
            max_frame_ms: sorted[count - 1],
            p50_frame_ms: percentile(&sorted, 0.50),
            p95_frame_ms: percentile(&sorted, 0.95),
            p99_frame_ms: percentile(&sorted, 0.99),
            consecutive_drops: self.consecutive_drops,
            dropped_frames: self.dropped_frames,
            total_frames: self.total_frames,
            last_drop_ms_ago: self.last_drop_at_ms.map(|at| (now_ms - at).max(0.0)),
            gpu_frame_ms: self.last_gpu_ms,
        }
    }
}

/// Nearest-rank percentile over a sorted slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = ((sorted.len() as f64 * q).ceil() as usize).clamp(1, sorted.len());
    sorted[rank - 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_render_when_clean() {
        let mut scheduler = FrameScheduler::new(60.0);
        scheduler.start();
        assert_eq!(scheduler.tick(0.0), None);
    }

    #[test]
    fn test_coalesces_marks_into_one_frame() {
        let mut scheduler = FrameScheduler::new(60.0);
        scheduler.start();
        scheduler.mark_dirty();
        scheduler.mark_dirty();
        scheduler.mark_dirty();
        assert!(scheduler.tick(16.7).is_some());
        assert_eq!(scheduler.tick(33.4), None);
    }

    #[test]
    fn test_tick_once_renders_unconditionally() {
        let mut scheduler = FrameScheduler::new(60.0);
        let delta = scheduler.tick_once(100.0);
        assert!(delta > 0.0);
        assert_eq!(scheduler.metrics(100.0).total_frames, 1);
    }

    #[test]
    fn test_stopped_loop_never_renders() {
        let mut scheduler = FrameScheduler::new(60.0);
        scheduler.mark_dirty();
        assert_eq!(scheduler.tick(0.0), None);
    }

    #[test]
    fn test_exact_fps_from_window() {
        let mut scheduler = FrameScheduler::new(60.0);
        scheduler.start();
        let mut now = 0.0;
        for _ in 0..200 {
            scheduler.mark_dirty();
            scheduler.tick(now);
            now += 10.0;
        }
        let metrics = scheduler.metrics(now);
        assert!((metrics.exact_fps - 100.0).abs() < 1.0);
        assert_eq!(metrics.total_frames, 200);
        assert!((metrics.p50_frame_ms - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_drop_tracking() {
        let mut scheduler = FrameScheduler::new(60.0);
        scheduler.start();
        scheduler.mark_dirty();
        scheduler.tick(0.0);
        // 100 ms gap: well past 1.5 × 16.7 ms.
        scheduler.mark_dirty();
        scheduler.tick(100.0);
        let metrics = scheduler.metrics(100.0);
        assert_eq!(metrics.dropped_frames, 1);
        assert_eq!(metrics.consecutive_drops, 1);
        assert_eq!(metrics.last_drop_ms_ago, Some(0.0));

        // A normal frame resets the consecutive counter.
        scheduler.mark_dirty();
        scheduler.tick(110.0);
        assert_eq!(scheduler.metrics(110.0).consecutive_drops, 0);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut scheduler = FrameScheduler::new(60.0);
        scheduler.start();
        for i in 0..500 {
            scheduler.mark_dirty();
            scheduler.tick(i as f64 * 16.0);
        }
        assert!(scheduler.frame_times_ms.len() <= HISTORY);
    }

    #[test]
    fn test_gpu_time_sampled() {
        let mut scheduler = FrameScheduler::new(60.0);
        scheduler.record_gpu_time(Duration::from_micros(2500));
        scheduler.tick_once(0.0);
        assert_eq!(scheduler.metrics(0.0).gpu_frame_ms, Some(2.5));
    }
}
