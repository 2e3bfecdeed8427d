//! Summary statistics over a decoded volume.

use crate::geometry::GridGeometry;
use crate::volume::OccupancyVolume;

/// Value summary of a volume over the full grid.
///
/// Voxels missing from a short payload count as 0.0.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VolumeStats {
    pub total: usize,
    pub min: f32,
    pub max: f32,
    pub mean: f64,
    pub std_dev: f64,
    pub nonzero: usize,
}

impl VolumeStats {
    /// Compute statistics for `volume` over `geometry`.
    pub fn compute(volume: &OccupancyVolume, geometry: &GridGeometry) -> Self {
        let total = geometry.num_voxels();
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;
        let mut nonzero = 0usize;

        for index in 0..total {
            let v = volume.value(index);
            min = min.min(v);
            max = max.max(v);
            sum += v as f64;
            sum_sq += (v as f64) * (v as f64);
            if v != 0.0 {
                nonzero += 1;
            }
        }

        let n = total as f64;
        let mean = sum / n;
        let variance = (sum_sq / n - mean * mean).max(0.0);
        Self { total, min, max, mean, std_dev: variance.sqrt(), nonzero }
    }

    /// Fraction of voxels with a non-zero value.
    pub fn nonzero_fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.nonzero as f64 / self.total as f64
    }
}

/// Number of voxels strictly above `threshold`.
pub fn count_above(volume: &OccupancyVolume, geometry: &GridGeometry, threshold: f32) -> usize {
    match volume {
        OccupancyVolume::Bitset(bits) => {
            if 1.0 > threshold {
                bits.iter_occupied().take_while(|&i| i < geometry.num_voxels()).count()
            } else {
                0
            }
        }
        OccupancyVolume::Dense(dense) => dense
            .values()
            .iter()
            .take(geometry.num_voxels())
            .filter(|&&v| v > threshold)
            .count(),
    }
}

/// Fixed-width histogram over `[lo, hi]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram {
    pub lo: f32,
    pub hi: f32,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Bucket every voxel value into `bins` equal bins. Values outside the
    /// range land in the first or last bin. Returns `None` for zero bins or
    /// an empty range.
    pub fn compute(
        volume: &OccupancyVolume,
        geometry: &GridGeometry,
        bins: usize,
        lo: f32,
        hi: f32,
    ) -> Option<Self> {
        if bins == 0 || !(hi > lo) {
            return None;
        }
        let mut counts = vec![0usize; bins];
        let scale = bins as f32 / (hi - lo);
        for index in 0..geometry.num_voxels() {
            let v = volume.value(index);
            let bin = ((v - lo) * scale).floor();
            let bin = if bin.is_nan() { 0 } else { (bin.max(0.0) as usize).min(bins - 1) };
            counts[bin] += 1;
        }
        Some(Self { lo, hi, counts })
    }

    pub fn bin_width(&self) -> f32 {
        (self.hi - self.lo) / self.counts.len() as f32
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::{BitsetVolume, DenseVolume};

    fn geometry() -> GridGeometry {
        GridGeometry::new([2, 1, 2], [[0.0, 1.0]; 3]).unwrap()
    }

    #[test]
    fn dense_stats() {
        let volume = OccupancyVolume::Dense(DenseVolume::new(vec![0.0, 0.5, 1.0, 0.5]));
        let s = VolumeStats::compute(&volume, &geometry());
        assert_eq!(s.total, 4);
        assert_eq!(s.min, 0.0);
        assert_eq!(s.max, 1.0);
        assert!((s.mean - 0.5).abs() < 1e-9);
        assert!((s.std_dev - (0.125f64).sqrt()).abs() < 1e-9);
        assert_eq!(s.nonzero, 3);
        assert!((s.nonzero_fraction() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn short_buffer_counts_missing_as_zero() {
        let volume = OccupancyVolume::Dense(DenseVolume::new(vec![1.0]));
        let s = VolumeStats::compute(&volume, &geometry());
        assert_eq!(s.total, 4);
        assert_eq!(s.nonzero, 1);
        assert!((s.mean - 0.25).abs() < 1e-9);
    }

    #[test]
    fn count_above_both_encodings() {
        let g = geometry();
        let dense = OccupancyVolume::Dense(DenseVolume::new(vec![0.2, 0.6, 0.9, 0.5]));
        assert_eq!(count_above(&dense, &g, 0.5), 2);

        let bits = OccupancyVolume::Bitset(BitsetVolume::new(vec![0b0110], 4, 0.5));
        assert_eq!(count_above(&bits, &g, 0.5), 2);
        assert_eq!(count_above(&bits, &g, 1.0), 0);
    }

    #[test]
    fn histogram_buckets() {
        let volume = OccupancyVolume::Dense(DenseVolume::new(vec![0.0, 0.3, 0.99, 1.0]));
        let h = Histogram::compute(&volume, &geometry(), 4, 0.0, 1.0).unwrap();
        assert_eq!(h.counts, vec![1, 1, 0, 2]);
        assert_eq!(h.total(), 4);
        assert_eq!(h.bin_width(), 0.25);
        assert!(Histogram::compute(&volume, &geometry(), 0, 0.0, 1.0).is_none());
        assert!(Histogram::compute(&volume, &geometry(), 4, 1.0, 1.0).is_none());
    }
}
