//! Binary point ingest formats
//!
//! The store works on packed-f32 lanes: 8 B `[x, y]` points and 20 B
//! `[t, o, h, l, c]` candles. Legacy f64 transfers (16 B / 40 B) are accepted
//! at the boundary and repacked; the public f64 OHLC tuple arrives as
//! `[t, o, c, l, h]` and is reordered to the internal layout here, so nothing
//! downstream ever sees the public order.

use crate::errors::{ChartError, ChartResult};

pub const STRIDE_XY_F32: usize = 8;
pub const STRIDE_XY_F64: usize = 16;
pub const STRIDE_OHLC_F32: usize = 20;
pub const STRIDE_OHLC_F64: usize = 40;

/// A validated, internally-packed batch of points.
#[derive(Debug, Clone, PartialEq)]
pub enum PointBatch {
    Xy(Vec<[f32; 2]>),
    Ohlc(Vec<[f32; 5]>),
}

impl PointBatch {
    pub fn len(&self) -> usize {
        match self {
            PointBatch::Xy(points) => points.len(),
            PointBatch::Ohlc(candles) => candles.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stride(&self) -> usize {
        match self {
            PointBatch::Xy(_) => STRIDE_XY_F32,
            PointBatch::Ohlc(_) => STRIDE_OHLC_F32,
        }
    }

    /// Raw little-endian bytes in the internal layout.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            PointBatch::Xy(points) => bytemuck::cast_slice(points),
            PointBatch::Ohlc(candles) => bytemuck::cast_slice(candles),
        }
    }

    /// Parses and validates a transferred byte buffer.
    ///
    /// `stride` selects the wire format; the f64 variants are repacked to the
    /// internal f32 layout. Fails with `Data` on alignment, size, or
    /// non-finite value violations.
    pub fn from_bytes(bytes: &[u8], count: usize, stride: usize) -> ChartResult<Self> {
        if stride % 4 != 0 {
            return Err(ChartError::data(format!(
                "stride {stride} is not a multiple of 4"
            )));
        }
        if bytes.len() != count * stride {
            return Err(ChartError::data(format!(
                "buffer size mismatch: {} bytes != {count} * {stride}",
                bytes.len()
            )));
        }

        let batch = match stride {
            STRIDE_XY_F32 => {
                let lanes: &[f32] = bytemuck::try_cast_slice(bytes)
                    .map_err(|e| ChartError::data(format!("unaligned xy/f32 buffer: {e}")))?;
                PointBatch::Xy(lanes.chunks_exact(2).map(|c| [c[0], c[1]]).collect())
            }
            STRIDE_XY_F64 => {
                let lanes: &[f64] = bytemuck::try_cast_slice(bytes)
                    .map_err(|e| ChartError::data(format!("unaligned xy/f64 buffer: {e}")))?;
                PointBatch::Xy(
                    lanes
                        .chunks_exact(2)
                        .map(|c| [c[0] as f32, c[1] as f32])
                        .collect(),
                )
            }
            STRIDE_OHLC_F32 => {
                let lanes: &[f32] = bytemuck::try_cast_slice(bytes)
                    .map_err(|e| ChartError::data(format!("unaligned ohlc/f32 buffer: {e}")))?;
                PointBatch::Ohlc(
                    lanes
                        .chunks_exact(5)
                        .map(|c| [c[0], c[1], c[2], c[3], c[4]])
                        .collect(),
                )
            }
            STRIDE_OHLC_F64 => {
                // Public tuple order is [t, o, c, l, h]; internal is [t, o, h, l, c].
                let lanes: &[f64] = bytemuck::try_cast_slice(bytes)
                    .map_err(|e| ChartError::data(format!("unaligned ohlc/f64 buffer: {e}")))?;
                PointBatch::Ohlc(
                    lanes
                        .chunks_exact(5)
                        .map(|c| {
                            [
                                c[0] as f32,
                                c[1] as f32,
                                c[4] as f32,
                                c[3] as f32,
                                c[2] as f32,
                            ]
                        })
                        .collect(),
                )
            }
            _ => {
                return Err(ChartError::data(format!("unknown stride {stride}")));
            }
        };

        batch.validate_finite()?;
        Ok(batch)
    }

    fn validate_finite(&self) -> ChartResult<()> {
        let bad = match self {
            PointBatch::Xy(points) => points
                .iter()
                .position(|p| !p.iter().all(|v| v.is_finite())),
            PointBatch::Ohlc(candles) => candles
                .iter()
                .position(|c| !c.iter().all(|v| v.is_finite())),
        };
        match bad {
            Some(index) => Err(ChartError::data(format!(
                "non-finite value at point {index}"
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xy_f32_round_trip() {
        let points = [[0.0f32, 0.0], [1.0, 1.0], [2.0, 4.0]];
        let bytes: &[u8] = bytemuck::cast_slice(&points);
        let batch = PointBatch::from_bytes(bytes, 3, STRIDE_XY_F32).unwrap();
        assert_eq!(batch, PointBatch::Xy(points.to_vec()));
        assert_eq!(batch.as_bytes(), bytes);
    }

    #[test]
    fn test_f64_repack() {
        let points = [[0.5f64, -2.0], [3.25, 8.0]];
        let bytes: &[u8] = bytemuck::cast_slice(&points);
        let batch = PointBatch::from_bytes(bytes, 2, STRIDE_XY_F64).unwrap();
        assert_eq!(batch, PointBatch::Xy(vec![[0.5, -2.0], [3.25, 8.0]]));
    }

    #[test]
    fn test_public_ohlc_order_normalized() {
        // Public f64 order: [t, o, c, l, h]
        let candle = [[1.0f64, 10.0, 12.0, 9.0, 13.0]];
        let bytes: &[u8] = bytemuck::cast_slice(&candle);
        let batch = PointBatch::from_bytes(bytes, 1, STRIDE_OHLC_F64).unwrap();
        // Internal order: [t, o, h, l, c]
        assert_eq!(batch, PointBatch::Ohlc(vec![[1.0, 10.0, 13.0, 9.0, 12.0]]));
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let bytes = [0u8; 60];
        let err = PointBatch::from_bytes(&bytes, 7, STRIDE_XY_F32).unwrap_err();
        assert_eq!(err.code(), "data-error");
    }

    #[test]
    fn test_non_finite_rejected() {
        let points = [[0.0f32, f32::NAN]];
        let bytes: &[u8] = bytemuck::cast_slice(&points);
        let err = PointBatch::from_bytes(bytes, 1, STRIDE_XY_F32).unwrap_err();
        assert!(err.to_string().contains("non-finite"));
    }

    #[test]
    fn test_unknown_stride_rejected() {
        let bytes = [0u8; 12];
        assert!(PointBatch::from_bytes(&bytes, 1, 12).is_err());
    }
}
