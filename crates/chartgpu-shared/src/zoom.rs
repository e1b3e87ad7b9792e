//! Zoom window state in percent space

use serde::{Deserialize, Serialize};

/// Zoom window over `[0, 100]` percent of the data extent.
///
/// Every mutation clamps to `[0, 100]` and keeps `start < end`; span limits
/// are enforced when configured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomState {
    pub start: f64,
    pub end: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_span: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_span: Option<f64>,
}

impl ZoomState {
    pub fn new(start: f64, end: f64) -> Self {
        let mut state = Self {
            start,
            end,
            min_span: None,
            max_span: None,
        };
        state.clamp();
        state
    }

    pub fn with_span_limits(mut self, min_span: Option<f64>, max_span: Option<f64>) -> Self {
        self.min_span = min_span;
        self.max_span = max_span;
        self.clamp();
        self
    }

    pub fn span(&self) -> f64 {
        self.end - self.start
    }

    /// Re-establishes the invariants after any mutation.
    pub fn clamp(&mut self) {
        if !self.start.is_finite() {
            self.start = 0.0;
        }
        if !self.end.is_finite() {
            self.end = 100.0;
        }
        if self.start > self.end {
            std::mem::swap(&mut self.start, &mut self.end);
        }

        let min_span = self.min_span.unwrap_or(f64::MIN_POSITIVE).max(f64::MIN_POSITIVE);
        let max_span = self.max_span.unwrap_or(100.0).min(100.0).max(min_span);

        let mut span = (self.end - self.start).clamp(min_span, max_span);
        let center = (self.start + self.end) * 0.5;
        self.start = center - span * 0.5;
        self.end = center + span * 0.5;

        // Slide back inside [0, 100] without changing the span.
        if self.start < 0.0 {
            self.end -= self.start;
            self.start = 0.0;
        }
        if self.end > 100.0 {
            self.start -= self.end - 100.0;
            self.end = 100.0;
        }
        self.start = self.start.max(0.0);

        span = self.end - self.start;
        if span <= 0.0 {
            // Degenerate window; open the minimum span around start.
            self.end = (self.start + min_span.min(100.0)).min(100.0);
            self.start = (self.end - min_span.min(100.0)).max(0.0);
        }
    }

    /// Translates the window by `delta` percent, clamped to the extent.
    pub fn translate(&mut self, delta: f64) {
        let span = self.span();
        self.start = (self.start + delta).clamp(0.0, 100.0 - span);
        self.end = self.start + span;
        self.clamp();
    }

    /// Zooms by `factor` about an anchor given as a fraction of the current
    /// window (0 = start edge, 1 = end edge). `factor < 1` zooms in.
    pub fn zoom_about(&mut self, anchor_frac: f64, factor: f64) {
        let anchor = self.start + self.span() * anchor_frac.clamp(0.0, 1.0);
        let factor = if factor.is_finite() && factor > 0.0 {
            factor
        } else {
            1.0
        };
        self.start = anchor - (anchor - self.start) * factor;
        self.end = anchor + (self.end - anchor) * factor;
        self.clamp();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_swaps_inverted_bounds() {
        let state = ZoomState::new(80.0, 20.0);
        assert!(state.start < state.end);
        assert_eq!((state.start, state.end), (20.0, 80.0));
    }

    #[test]
    fn test_clamp_respects_extent() {
        let mut state = ZoomState::new(-10.0, 150.0);
        assert_eq!((state.start, state.end), (0.0, 100.0));
        state.translate(30.0);
        assert_eq!((state.start, state.end), (0.0, 100.0));
    }

    #[test]
    fn test_translate_preserves_span() {
        let mut state = ZoomState::new(10.0, 30.0);
        state.translate(50.0);
        assert_eq!((state.start, state.end), (60.0, 80.0));
        state.translate(100.0);
        assert_eq!((state.start, state.end), (80.0, 100.0));
    }

    #[test]
    fn test_zoom_about_center_is_symmetric() {
        let mut state = ZoomState::new(0.0, 100.0);
        state.zoom_about(0.5, 0.8);
        assert!((state.start + state.end - 100.0).abs() < 1e-9);
        assert!(state.span() < 100.0);
    }

    #[test]
    fn test_min_span_enforced() {
        let mut state = ZoomState::new(40.0, 60.0).with_span_limits(Some(10.0), None);
        state.zoom_about(0.5, 0.01);
        assert!((state.span() - 10.0).abs() < 1e-9);
        assert!(state.start >= 0.0 && state.end <= 100.0);
    }

    #[test]
    fn test_max_span_enforced() {
        let mut state = ZoomState::new(40.0, 60.0).with_span_limits(None, Some(50.0));
        state.zoom_about(0.5, 100.0);
        assert!((state.span() - 50.0).abs() < 1e-9);
    }
}
