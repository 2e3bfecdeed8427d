//! Grid shape, world bounds and the canonical voxel indexing.
//!
//! Voxel data is flattened with z varying fastest, then y, then x:
//!
//! ```text
//! offset = z + y * nz + x * nz * ny
//! ```
//!
//! This is the only flattening the crate understands.
//!
//! Displayed world positions swap the horizontal axes: grid x maps to
//! world y and grid y maps to world x, matching the bird's-eye view used by
//! the viewers.

use glam::Vec3;

use crate::core::Axis;
use crate::error::{OccupancyError, Result};

/// Validated grid metadata. Immutable once constructed.
#[derive(Clone, Debug, PartialEq)]
pub struct GridGeometry {
    shape: [usize; 3],
    bounds: [[f32; 2]; 3],
    voxel_size: [f32; 3],
}

impl GridGeometry {
    /// Build a geometry from a shape `[nx, ny, nz]` and per-axis `[min, max]`.
    ///
    /// Fails with `InvalidGeometry` when a dimension is zero, an interval is
    /// empty or inverted, or a bound is not finite.
    pub fn new(shape: [usize; 3], bounds: [[f32; 2]; 3]) -> Result<Self> {
        let mut voxel_size = [0.0f32; 3];
        for axis in Axis::ALL {
            let i = axis.index();
            let [min, max] = bounds[i];
            if shape[i] == 0 {
                return Err(OccupancyError::geometry(format!(
                    "{} dimension must be >= 1",
                    axis.name()
                )));
            }
            if !min.is_finite() || !max.is_finite() {
                return Err(OccupancyError::geometry(format!(
                    "{} bounds must be finite",
                    axis.name()
                )));
            }
            if max <= min {
                return Err(OccupancyError::geometry(format!(
                    "{} bounds [{min}, {max}] are empty or inverted",
                    axis.name()
                )));
            }
            voxel_size[i] = (max - min) / shape[i] as f32;
        }
        shape[0]
            .checked_mul(shape[1])
            .and_then(|n| n.checked_mul(shape[2]))
            .ok_or_else(|| OccupancyError::geometry("voxel count overflows usize"))?;
        Ok(Self { shape, bounds, voxel_size })
    }

    #[inline]
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    #[inline]
    pub fn nx(&self) -> usize {
        self.shape[0]
    }

    #[inline]
    pub fn ny(&self) -> usize {
        self.shape[1]
    }

    #[inline]
    pub fn nz(&self) -> usize {
        self.shape[2]
    }

    /// Total voxel count, `nx * ny * nz`.
    #[inline]
    pub fn num_voxels(&self) -> usize {
        self.shape[0] * self.shape[1] * self.shape[2]
    }

    pub fn bounds(&self) -> [[f32; 2]; 3] {
        self.bounds
    }

    /// `[min, max]` along one axis.
    #[inline]
    pub fn axis_bounds(&self, axis: Axis) -> [f32; 2] {
        self.bounds[axis.index()]
    }

    /// Edge length of one voxel along `axis`, `(max - min) / count`.
    #[inline]
    pub fn voxel_size(&self, axis: Axis) -> f32 {
        self.voxel_size[axis.index()]
    }

    pub fn voxel_sizes(&self) -> [f32; 3] {
        self.voxel_size
    }

    /// Canonical linear offset of `(x, y, z)`.
    pub fn linear_index(&self, x: usize, y: usize, z: usize) -> Result<usize> {
        let [nx, ny, nz] = self.shape;
        if x >= nx {
            return Err(OccupancyError::out_of_range("x", x, nx));
        }
        if y >= ny {
            return Err(OccupancyError::out_of_range("y", y, ny));
        }
        if z >= nz {
            return Err(OccupancyError::out_of_range("z", z, nz));
        }
        Ok(self.linear_index_unchecked(x, y, z))
    }

    /// Canonical linear offset without bounds checks. Callers iterate
    /// inside the shape.
    #[inline]
    pub(crate) fn linear_index_unchecked(&self, x: usize, y: usize, z: usize) -> usize {
        let [_, ny, nz] = self.shape;
        z + y * nz + x * nz * ny
    }

    /// Inverse of [`linear_index`](Self::linear_index).
    pub fn inverse_linear_index(&self, index: usize) -> Result<[usize; 3]> {
        let total = self.num_voxels();
        if index >= total {
            return Err(OccupancyError::out_of_range("linear", index, total));
        }
        Ok(self.inverse_linear_index_unchecked(index))
    }

    #[inline]
    pub(crate) fn inverse_linear_index_unchecked(&self, index: usize) -> [usize; 3] {
        let [_, ny, nz] = self.shape;
        let plane = ny * nz;
        let x = index / plane;
        let r = index % plane;
        [x, r / nz, r % nz]
    }

    /// Center of cell `index` along `axis` in world meters (no swapping).
    #[inline]
    pub fn cell_center(&self, axis: Axis, index: usize) -> f32 {
        let i = axis.index();
        self.bounds[i][0] + (index as f32 + 0.5) * self.voxel_size[i]
    }

    /// Displayed world center of voxel `(x, y, z)`.
    ///
    /// The horizontal axes are swapped: the result is
    /// `(center_y, center_x, center_z)`.
    pub fn world_center(&self, x: usize, y: usize, z: usize) -> Result<Vec3> {
        self.linear_index(x, y, z)?;
        Ok(self.world_center_unchecked(x, y, z))
    }

    #[inline]
    pub(crate) fn world_center_unchecked(&self, x: usize, y: usize, z: usize) -> Vec3 {
        Vec3::new(
            self.cell_center(Axis::Y, y),
            self.cell_center(Axis::X, x),
            self.cell_center(Axis::Z, z),
        )
    }
}
