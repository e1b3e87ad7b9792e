//! Linear and category scales
//!
//! Scales map domain values to CSS-pixel positions inside the grid area. No
//! clamping: out-of-domain values project outside the range and are clipped
//! by the render pass scissor.

use chartgpu_shared::{ChartError, ChartResult};

/// Affine domain → range mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    pub domain_min: f64,
    pub domain_max: f64,
    pub range_min: f64,
    pub range_max: f64,
}

impl LinearScale {
    pub fn new(domain_min: f64, domain_max: f64, range_min: f64, range_max: f64) -> Self {
        Self {
            domain_min,
            domain_max,
            range_min,
            range_max,
        }
    }

    pub fn scale(&self, value: f64) -> f64 {
        let spread = self.domain_max - self.domain_min;
        if spread == 0.0 {
            return (self.range_min + self.range_max) * 0.5;
        }
        self.range_min + (value - self.domain_min) / spread * (self.range_max - self.range_min)
    }

    pub fn invert(&self, position: f64) -> f64 {
        let spread = self.range_max - self.range_min;
        if spread == 0.0 {
            return (self.domain_min + self.domain_max) * 0.5;
        }
        self.domain_min
            + (position - self.range_min) / spread * (self.domain_max - self.domain_min)
    }

    /// Tick values at a 1/2/5 × 10^k step, aiming for roughly `hint` ticks.
    pub fn ticks(&self, hint: u32) -> Vec<f64> {
        let (lo, hi) = if self.domain_min <= self.domain_max {
            (self.domain_min, self.domain_max)
        } else {
            (self.domain_max, self.domain_min)
        };
        let spread = hi - lo;
        if spread == 0.0 || !spread.is_finite() {
            return vec![lo];
        }
        let hint = hint.max(1) as f64;
        let raw_step = spread / hint;
        let magnitude = 10f64.powf(raw_step.log10().floor());
        let residual = raw_step / magnitude;
        let step = magnitude
            * if residual > 5.0 {
                10.0
            } else if residual > 2.0 {
                5.0
            } else if residual > 1.0 {
                2.0
            } else {
                1.0
            };

        let first = (lo / step).ceil() * step;
        let mut ticks = Vec::new();
        let mut tick = first;
        while tick <= hi + step * 1e-9 {
            // Snap near-zero ticks so formatting never shows -0.
            ticks.push(if tick.abs() < step * 1e-9 { 0.0 } else { tick });
            tick += step;
        }
        ticks
    }
}

/// Maps unique labels to the centers of equal bands across the range.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryScale {
    labels: Vec<String>,
    pub range_min: f64,
    pub range_max: f64,
}

impl CategoryScale {
    /// Fails with `InvalidArgument` on duplicate labels.
    pub fn new(labels: Vec<String>, range_min: f64, range_max: f64) -> ChartResult<Self> {
        for (i, label) in labels.iter().enumerate() {
            if labels[..i].contains(label) {
                return Err(ChartError::invalid_argument(format!(
                    "duplicate category '{label}'"
                )));
            }
        }
        Ok(Self {
            labels,
            range_min,
            range_max,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn bandwidth(&self) -> f64 {
        if self.labels.is_empty() {
            return 0.0;
        }
        (self.range_max - self.range_min).abs() / self.labels.len() as f64
    }

    /// Center of band `index`; positions past the end extrapolate.
    pub fn band_center(&self, index: usize) -> f64 {
        let n = self.labels.len().max(1) as f64;
        let band = (self.range_max - self.range_min) / n;
        self.range_min + band * (index as f64 + 0.5)
    }

    /// Position of a label's band center; unknown categories map to NaN.
    pub fn scale(&self, label: &str) -> f64 {
        match self.labels.iter().position(|l| l == label) {
            Some(index) => self.band_center(index),
            None => f64::NAN,
        }
    }

    /// Band index under a range position, clamped to the label set.
    pub fn invert(&self, position: f64) -> Option<usize> {
        if self.labels.is_empty() {
            return None;
        }
        let n = self.labels.len() as f64;
        let frac = (position - self.range_min) / (self.range_max - self.range_min);
        if !frac.is_finite() {
            return None;
        }
        Some(((frac * n).floor() as isize).clamp(0, self.labels.len() as isize - 1) as usize)
    }
}

/// Either scale kind, dispatched on the axis kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Scale {
    Linear(LinearScale),
    Category(CategoryScale),
}

impl Scale {
    /// Domain value (or band index) → range position.
    pub fn position(&self, value: f64) -> f64 {
        match self {
            Scale::Linear(scale) => scale.scale(value),
            Scale::Category(scale) => scale.band_center(value.max(0.0) as usize),
        }
    }

    /// Range position → domain value (band index for categories).
    pub fn invert(&self, position: f64) -> f64 {
        match self {
            Scale::Linear(scale) => scale.invert(position),
            Scale::Category(scale) => scale
                .invert(position)
                .map(|i| i as f64)
                .unwrap_or(f64::NAN),
        }
    }

    pub fn range(&self) -> (f64, f64) {
        match self {
            Scale::Linear(scale) => (scale.range_min, scale.range_max),
            Scale::Category(scale) => (scale.range_min, scale.range_max),
        }
    }

    /// The mapping as an affine pair `(a, b)` with `position = a·v + b`,
    /// where `v` is the domain value (or band index for categories).
    /// Degenerate domains collapse to the constant range midpoint.
    pub fn affine_css(&self) -> (f64, f64) {
        match self {
            Scale::Linear(scale) => {
                let spread = scale.domain_max - scale.domain_min;
                if spread == 0.0 {
                    (0.0, (scale.range_min + scale.range_max) * 0.5)
                } else {
                    let slope = (scale.range_max - scale.range_min) / spread;
                    (slope, scale.range_min - scale.domain_min * slope)
                }
            }
            Scale::Category(scale) => {
                if scale.is_empty() {
                    (0.0, scale.range_min)
                } else {
                    let band = (scale.range_max - scale.range_min) / scale.len() as f64;
                    (band, scale.range_min + band * 0.5)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_round_trip() {
        let scale = LinearScale::new(-10.0, 250.0, 40.0, 760.0);
        for v in [-10.0, -3.2, 0.0, 17.5, 123.456, 250.0] {
            let back = scale.invert(scale.scale(v));
            assert!((back - v).abs() <= f64::EPSILON * 260.0, "{v} -> {back}");
        }
    }

    #[test]
    fn test_degenerate_domain_returns_range_midpoint() {
        let scale = LinearScale::new(5.0, 5.0, 0.0, 100.0);
        assert_eq!(scale.scale(5.0), 50.0);
        assert_eq!(scale.scale(999.0), 50.0);
    }

    #[test]
    fn test_degenerate_range_inverts_to_domain_midpoint() {
        let scale = LinearScale::new(0.0, 10.0, 30.0, 30.0);
        assert_eq!(scale.invert(30.0), 5.0);
    }

    #[test]
    fn test_no_clamping() {
        let scale = LinearScale::new(0.0, 10.0, 0.0, 100.0);
        assert_eq!(scale.scale(-5.0), -50.0);
        assert_eq!(scale.scale(20.0), 200.0);
    }

    #[test]
    fn test_ticks_use_nice_steps() {
        let scale = LinearScale::new(0.0, 10.0, 0.0, 100.0);
        let ticks = scale.ticks(5);
        assert_eq!(ticks, vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);

        let scale = LinearScale::new(0.0, 0.7, 0.0, 100.0);
        let ticks = scale.ticks(5);
        assert!(ticks.len() >= 4 && ticks.len() <= 9);
        assert_eq!(ticks[0], 0.0);
    }

    #[test]
    fn test_degenerate_domain_single_tick() {
        let scale = LinearScale::new(3.0, 3.0, 0.0, 100.0);
        assert_eq!(scale.ticks(5), vec![3.0]);
    }

    #[test]
    fn test_category_band_centers() {
        let scale =
            CategoryScale::new(vec!["a".into(), "b".into(), "c".into()], 0.0, 90.0).unwrap();
        assert_eq!(scale.scale("a"), 15.0);
        assert_eq!(scale.scale("b"), 45.0);
        assert_eq!(scale.scale("c"), 75.0);
        assert_eq!(scale.bandwidth(), 30.0);
        assert!(scale.scale("missing").is_nan());
    }

    #[test]
    fn test_category_duplicates_rejected() {
        let err = CategoryScale::new(vec!["a".into(), "a".into()], 0.0, 10.0).unwrap_err();
        assert_eq!(err.code(), "invalid-argument");
    }

    #[test]
    fn test_category_invert_clamps() {
        let scale =
            CategoryScale::new(vec!["a".into(), "b".into(), "c".into()], 0.0, 90.0).unwrap();
        assert_eq!(scale.invert(10.0), Some(0));
        assert_eq!(scale.invert(50.0), Some(1));
        assert_eq!(scale.invert(500.0), Some(2));
        assert_eq!(scale.invert(-5.0), Some(0));
    }
}
