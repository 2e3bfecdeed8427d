//! Bird's-eye projections of an occupancy volume along z.
//!
//! Projections aggregate raw values; no threshold is applied. Display
//! filtering happens on the result via [`ProjectionResult::thresholded`], so
//! moving a threshold slider never requires re-projecting.

use crate::error::{OccupancyError, Result};
use crate::geometry::GridGeometry;
use crate::volume::OccupancyVolume;

/// Aggregation applied along the z axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProjectionMode {
    /// Maximum over all z.
    Max,
    /// Sum over all z divided by `nz`.
    Mean,
    /// The single plane at this z index.
    Slice(usize),
}

/// Row-major `[ny][nx]` map; row 0 is y = 0.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectionResult {
    width: usize,
    height: usize,
    values: Vec<f32>,
    mode: ProjectionMode,
}

impl ProjectionResult {
    /// Number of columns (`nx`).
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows (`ny`).
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn mode(&self) -> ProjectionMode {
        self.mode
    }

    /// Flat row-major values.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f32> {
        self.values
    }

    /// Value at column `x`, row `y`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.values[y * self.width + x])
    }

    /// Iterate rows, y = 0 first.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.values.chunks_exact(self.width)
    }

    /// `(min, max)` over all cells.
    pub fn value_range(&self) -> (f32, f32) {
        self.values
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }

    /// Copy with every cell `<= threshold` zeroed, for display filtering.
    pub fn thresholded(&self, threshold: f32) -> ProjectionResult {
        let values = self
            .values
            .iter()
            .map(|&v| if v > threshold { v } else { 0.0 })
            .collect();
        ProjectionResult { values, ..self.clone() }
    }
}

/// Project with the given mode.
pub fn project(
    volume: &OccupancyVolume,
    geometry: &GridGeometry,
    mode: ProjectionMode,
) -> Result<ProjectionResult> {
    match mode {
        ProjectionMode::Max => Ok(project_max(volume, geometry)),
        ProjectionMode::Mean => Ok(project_mean(volume, geometry)),
        ProjectionMode::Slice(z) => extract_slice(volume, geometry, z),
    }
}

/// Maximum over z for each `(x, y)`.
pub fn project_max(volume: &OccupancyVolume, geometry: &GridGeometry) -> ProjectionResult {
    aggregate(volume, geometry, ProjectionMode::Max, |column| {
        column.fold(f32::NEG_INFINITY, f32::max)
    })
}

/// Mean over z for each `(x, y)`, dividing by `nz`.
///
/// The column is summed in f64 so the rounded mean never exceeds the
/// column maximum.
pub fn project_mean(volume: &OccupancyVolume, geometry: &GridGeometry) -> ProjectionResult {
    let nz = geometry.nz() as f64;
    aggregate(volume, geometry, ProjectionMode::Mean, |column| {
        (column.map(f64::from).sum::<f64>() / nz) as f32
    })
}

/// The plane at `z_index`.
pub fn extract_slice(
    volume: &OccupancyVolume,
    geometry: &GridGeometry,
    z_index: usize,
) -> Result<ProjectionResult> {
    if z_index >= geometry.nz() {
        return Err(OccupancyError::out_of_range("z", z_index, geometry.nz()));
    }
    let [nx, ny, _] = geometry.shape();
    let mut values = Vec::with_capacity(nx * ny);
    for y in 0..ny {
        for x in 0..nx {
            values.push(volume.value(geometry.linear_index_unchecked(x, y, z_index)));
        }
    }
    Ok(ProjectionResult {
        width: nx,
        height: ny,
        values,
        mode: ProjectionMode::Slice(z_index),
    })
}

/// Shared column walk. Each `(x, y)` column is contiguous in the canonical
/// layout, so `f` sees `nz` consecutive reads.
fn aggregate<F>(
    volume: &OccupancyVolume,
    geometry: &GridGeometry,
    mode: ProjectionMode,
    mut f: F,
) -> ProjectionResult
where
    F: FnMut(&mut dyn Iterator<Item = f32>) -> f32,
{
    let [nx, ny, nz] = geometry.shape();
    let mut values = Vec::with_capacity(nx * ny);
    for y in 0..ny {
        for x in 0..nx {
            let base = geometry.linear_index_unchecked(x, y, 0);
            let mut column = (base..base + nz).map(|i| volume.value(i));
            values.push(f(&mut column));
        }
    }
    ProjectionResult { width: nx, height: ny, values, mode }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::{BitsetVolume, DenseVolume};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn geometry(shape: [usize; 3]) -> GridGeometry {
        GridGeometry::new(shape, [[0.0, 2.0]; 3]).expect("geometry")
    }

    fn random_volume(rng: &mut StdRng, g: &GridGeometry) -> OccupancyVolume {
        let values = (0..g.num_voxels()).map(|_| rng.gen_range(0.0f32..1.0)).collect();
        OccupancyVolume::Dense(DenseVolume::new(values))
    }

    #[test]
    fn single_voxel_max_projection() {
        let g = geometry([2, 2, 2]);
        let mut values = vec![0.0f32; 8];
        values[g.linear_index(1, 1, 1).unwrap()] = 0.9;
        let volume = OccupancyVolume::Dense(DenseVolume::new(values));

        let max = project_max(&volume, &g);
        assert_eq!(max.width(), 2);
        assert_eq!(max.height(), 2);
        assert_eq!(max.get(1, 1), Some(0.9));
        assert_eq!(max.get(0, 0), Some(0.0));
        assert_eq!(max.get(1, 0), Some(0.0));
        assert_eq!(max.get(0, 1), Some(0.0));
        assert_eq!(max.values().iter().filter(|&&v| v != 0.0).count(), 1);
    }

    #[test]
    fn row_is_y_column_is_x() {
        let g = geometry([3, 2, 1]);
        let mut values = vec![0.0f32; 6];
        values[g.linear_index(2, 0, 0).unwrap()] = 1.0;
        let volume = OccupancyVolume::Dense(DenseVolume::new(values));
        let slice = extract_slice(&volume, &g, 0).unwrap();
        let rows: Vec<&[f32]> = slice.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], &[0.0, 0.0, 1.0]);
        assert_eq!(rows[1], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn mean_divides_by_nz() {
        let g = geometry([1, 1, 4]);
        let volume = OccupancyVolume::Dense(DenseVolume::new(vec![1.0, 0.0, 0.0, 1.0]));
        assert_eq!(project_mean(&volume, &g).get(0, 0), Some(0.5));
    }

    #[test]
    fn constant_column_mean_equals_value() {
        for nz in 2..40 {
            let g = geometry([1, 1, nz]);
            for k in 0..1000 {
                let v = k as f32 / 1000.0;
                let volume = OccupancyVolume::Dense(DenseVolume::new(vec![v; nz]));
                let mean = project_mean(&volume, &g).get(0, 0).unwrap();
                let max = project_max(&volume, &g).get(0, 0).unwrap();
                assert!(mean <= max, "nz={nz} v={v}: mean {mean} > max {max}");
                assert_eq!(mean, v, "nz={nz}");
            }
        }
    }

    #[test]
    fn short_buffer_reads_zero() {
        let g = geometry([1, 1, 4]);
        let volume = OccupancyVolume::Dense(DenseVolume::new(vec![0.8, 0.8]));
        assert_eq!(project_mean(&volume, &g).get(0, 0), Some(0.4));
        assert_eq!(project_max(&volume, &g).get(0, 0), Some(0.8));
    }

    #[test]
    fn slice_out_of_range() {
        let g = geometry([2, 2, 2]);
        let volume = OccupancyVolume::Dense(DenseVolume::new(vec![0.0; 8]));
        let err = extract_slice(&volume, &g, 2).unwrap_err();
        assert!(matches!(err, OccupancyError::IndexOutOfRange { axis: "z", .. }));
        assert!(project(&volume, &g, ProjectionMode::Slice(5)).is_err());
    }

    #[test]
    fn max_dominates_mean_and_slices() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..20 {
            let shape = [rng.gen_range(1..8), rng.gen_range(1..8), rng.gen_range(1..8)];
            let g = geometry(shape);
            let volume = random_volume(&mut rng, &g);
            let max = project_max(&volume, &g);
            let mean = project_mean(&volume, &g);
            for (m, a) in max.values().iter().zip(mean.values()) {
                assert!(m >= a, "max {m} < mean {a}");
            }
            for z in 0..shape[2] {
                let slice = extract_slice(&volume, &g, z).unwrap();
                for (s, m) in slice.values().iter().zip(max.values()) {
                    assert!(s <= m);
                }
            }
        }
    }

    #[test]
    fn mean_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(3);
        let g = geometry([6, 5, 9]);
        let volume = random_volume(&mut rng, &g);
        let a = project_mean(&volume, &g);
        let b = project_mean(&volume, &g);
        let bits_a: Vec<u32> = a.values().iter().map(|v| v.to_bits()).collect();
        let bits_b: Vec<u32> = b.values().iter().map(|v| v.to_bits()).collect();
        assert_eq!(bits_a, bits_b);
    }

    #[test]
    fn bitset_projects_as_unit_values() {
        let g = geometry([2, 2, 2]);
        let idx = g.linear_index(0, 1, 1).unwrap();
        let mut bytes = vec![0u8; 1];
        bytes[idx >> 3] |= 1 << (idx & 7);
        let volume = OccupancyVolume::Bitset(BitsetVolume::new(bytes, 8, 0.5));
        let max = project_max(&volume, &g);
        assert_eq!(max.get(0, 1), Some(1.0));
        assert_eq!(project_mean(&volume, &g).get(0, 1), Some(0.5));
    }

    #[test]
    fn thresholded_filters_display_only() {
        let g = geometry([2, 1, 1]);
        let volume = OccupancyVolume::Dense(DenseVolume::new(vec![0.2, 0.7]));
        let max = project_max(&volume, &g);
        let shown = max.thresholded(0.5);
        assert_eq!(shown.values(), &[0.0, 0.7]);
        assert_eq!(max.values(), &[0.2, 0.7]);
        assert_eq!(max.value_range(), (0.2, 0.7));
    }
}
