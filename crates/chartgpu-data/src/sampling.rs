//! Point downsampling strategies
//!
//! Applied when a series' logical point count exceeds its sampling threshold.
//! LTTB preserves visual features; the bucketed strategies trade shape for
//! speed; OHLC aggregation merges candles into coarser candles.

use chartgpu_shared::SamplingStrategy;

/// Downsamples `[x, y]` points to at most `target` points.
///
/// `Ohlc` is not a valid strategy for xy points and falls through to the
/// identity.
pub fn downsample_xy(
    points: &[[f32; 2]],
    strategy: SamplingStrategy,
    target: usize,
) -> Vec<[f32; 2]> {
    if points.len() <= target || target == 0 {
        return points.to_vec();
    }
    match strategy {
        SamplingStrategy::None | SamplingStrategy::Ohlc => points.to_vec(),
        SamplingStrategy::Lttb => lttb(points, target),
        SamplingStrategy::Average => bucketed(points, target, |bucket| {
            let inv = 1.0 / bucket.len() as f32;
            let (sx, sy) = bucket
                .iter()
                .fold((0.0f32, 0.0f32), |(sx, sy), p| (sx + p[0], sy + p[1]));
            [sx * inv, sy * inv]
        }),
        SamplingStrategy::Max => bucketed(points, target, |bucket| {
            *bucket
                .iter()
                .max_by(|a, b| a[1].total_cmp(&b[1]))
                .expect("bucket is non-empty")
        }),
        SamplingStrategy::Min => bucketed(points, target, |bucket| {
            *bucket
                .iter()
                .min_by(|a, b| a[1].total_cmp(&b[1]))
                .expect("bucket is non-empty")
        }),
    }
}

/// Merges `[t, o, h, l, c]` candles into at most `target` coarser candles.
pub fn downsample_ohlc(candles: &[[f32; 5]], target: usize) -> Vec<[f32; 5]> {
    if candles.len() <= target || target == 0 {
        return candles.to_vec();
    }
    let mut out = Vec::with_capacity(target);
    for bucket in buckets(candles.len(), target) {
        let slice = &candles[bucket.clone()];
        let first = slice[0];
        let last = slice[slice.len() - 1];
        let high = slice.iter().map(|c| c[2]).fold(f32::NEG_INFINITY, f32::max);
        let low = slice.iter().map(|c| c[3]).fold(f32::INFINITY, f32::min);
        out.push([first[0], first[1], high, low, last[4]]);
    }
    out
}

fn bucketed(
    points: &[[f32; 2]],
    target: usize,
    pick: impl Fn(&[[f32; 2]]) -> [f32; 2],
) -> Vec<[f32; 2]> {
    buckets(points.len(), target)
        .map(|range| pick(&points[range]))
        .collect()
}

fn buckets(len: usize, target: usize) -> impl Iterator<Item = std::ops::Range<usize>> {
    let step = len as f64 / target as f64;
    (0..target).map(move |i| {
        let start = (i as f64 * step) as usize;
        let end = (((i + 1) as f64 * step) as usize).min(len).max(start + 1);
        start..end
    })
}

/// Largest Triangle Three Buckets. Keeps the first and last points and, per
/// bucket, the point forming the largest triangle with the previously kept
/// point and the next bucket's average.
fn lttb(points: &[[f32; 2]], target: usize) -> Vec<[f32; 2]> {
    let n = points.len();
    if target < 3 {
        return match target {
            1 => vec![points[0]],
            2 => vec![points[0], points[n - 1]],
            _ => vec![],
        };
    }

    let mut out = Vec::with_capacity(target);
    out.push(points[0]);

    let bucket_size = (n - 2) as f64 / (target - 2) as f64;
    let mut a = 0usize;

    for i in 0..(target - 2) {
        let bucket_start = ((i as f64 * bucket_size) as usize + 1).min(n - 1);
        let bucket_end = (((i + 1) as f64 * bucket_size) as usize + 1).min(n - 1);

        let next_start = bucket_end;
        let next_end = (((i + 2) as f64 * bucket_size) as usize + 1).min(n);
        let count = next_end.saturating_sub(next_start);
        let (mut avg_x, mut avg_y) = (0.0f64, 0.0f64);
        if count > 0 {
            for p in &points[next_start..next_end] {
                avg_x += p[0] as f64;
                avg_y += p[1] as f64;
            }
            avg_x /= count as f64;
            avg_y /= count as f64;
        }

        let pa = points[a];
        let mut max_area = -1.0f64;
        let mut max_idx = bucket_start;
        for (j, p) in points[bucket_start..bucket_end.max(bucket_start + 1)]
            .iter()
            .enumerate()
        {
            let area = ((pa[0] as f64 - avg_x) * (p[1] as f64 - pa[1] as f64)
                - (pa[0] as f64 - p[0] as f64) * (avg_y - pa[1] as f64))
                .abs();
            if area > max_area {
                max_area = area;
                max_idx = bucket_start + j;
            }
        }

        out.push(points[max_idx]);
        a = max_idx;
    }

    out.push(points[n - 1]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<[f32; 2]> {
        (0..n).map(|i| [i as f32, (i * i) as f32]).collect()
    }

    #[test]
    fn test_identity_below_target() {
        let points = ramp(10);
        assert_eq!(
            downsample_xy(&points, SamplingStrategy::Lttb, 100),
            points
        );
    }

    #[test]
    fn test_lttb_keeps_endpoints_and_count() {
        let points = ramp(1000);
        let out = downsample_xy(&points, SamplingStrategy::Lttb, 50);
        assert_eq!(out.len(), 50);
        assert_eq!(out[0], points[0]);
        assert_eq!(out[49], points[999]);
    }

    #[test]
    fn test_lttb_keeps_spike() {
        let mut points = ramp(500);
        points[250] = [250.0, 1_000_000.0];
        let out = downsample_xy(&points, SamplingStrategy::Lttb, 20);
        assert!(out.iter().any(|p| p[1] == 1_000_000.0));
    }

    #[test]
    fn test_max_keeps_maxima() {
        let points: Vec<[f32; 2]> = (0..100)
            .map(|i| [i as f32, if i % 10 == 5 { 100.0 } else { 1.0 }])
            .collect();
        let out = downsample_xy(&points, SamplingStrategy::Max, 10);
        assert_eq!(out.len(), 10);
        assert!(out.iter().all(|p| p[1] == 100.0));
    }

    #[test]
    fn test_average_is_bucket_mean() {
        let points: Vec<[f32; 2]> = (0..8).map(|i| [i as f32, 2.0]).collect();
        let out = downsample_xy(&points, SamplingStrategy::Average, 4);
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|p| p[1] == 2.0));
    }

    #[test]
    fn test_ohlc_merge() {
        let candles = vec![
            [0.0, 10.0, 15.0, 9.0, 12.0],
            [1.0, 12.0, 20.0, 11.0, 13.0],
            [2.0, 13.0, 14.0, 5.0, 8.0],
            [3.0, 8.0, 9.0, 7.0, 9.0],
        ];
        let out = downsample_ohlc(&candles, 2);
        assert_eq!(out.len(), 2);
        // First merged candle: opens at first open, h/l over the bucket,
        // closes at last close.
        assert_eq!(out[0], [0.0, 10.0, 20.0, 9.0, 13.0]);
        assert_eq!(out[1], [2.0, 13.0, 14.0, 5.0, 9.0]);
    }
}
