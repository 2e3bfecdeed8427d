//! Occupied-voxel extraction for instanced 3D drawing.
//!
//! Voxelization resolves [`RenderOptions`] against the grid (threshold and
//! z window), walks the occupied voxels, and groups the survivors into
//! height bands so a renderer can assign one material per band.
//!
//! Dense volumes are scanned in full. Bitset volumes only visit set bits;
//! occupancy is typically a few percent of a 400x400x32 grid.

use std::collections::BTreeMap;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::core::{robust_floor, Axis, DisplayConventions};
use crate::error::{OccupancyError, OccupancyWarning, Result};
use crate::geometry::GridGeometry;
use crate::options::RenderOptions;
use crate::volume::OccupancyVolume;

/// Threshold differences below this are treated as equal to the bake
/// threshold.
const THRESHOLD_EPSILON: f32 = 1e-6;

/// Effective z window in world meters. Always non-inverted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZWindow {
    pub min: f32,
    pub max: f32,
}

impl ZWindow {
    /// Inclusive containment test.
    #[inline]
    pub fn contains(&self, z: f32) -> bool {
        z >= self.min && z <= self.max
    }

    /// Normalized height in `[0, 1]` used to pick a band colour.
    #[inline]
    pub fn normalize(&self, z: f32) -> f32 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        ((z - self.min) / span).clamp(0.0, 1.0)
    }

    pub fn height(&self) -> f32 {
        self.max - self.min
    }
}

/// Options after defaults, clamping and window repair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedOptions {
    pub threshold: f32,
    pub window: ZWindow,
}

/// Resolve render options against a grid.
///
/// - threshold: given value clamped to `>= 0`, else the default. A
///   non-finite threshold fails with `InvalidRenderOptions`.
/// - window: `z_filter_min` defaults to the grid floor, `z_filter_max` to
///   `min(grid ceiling, z_ceiling)`. `drop_top_layers` lowers the max by
///   that many voxel heights. Both ends are clamped to the grid z bounds;
///   an empty or inverted result is widened to one voxel height above the
///   min.
pub fn resolve_options(
    options: &RenderOptions,
    geometry: &GridGeometry,
    conventions: &DisplayConventions,
) -> Result<ResolvedOptions> {
    let threshold = match options.threshold {
        None => conventions.default_threshold,
        Some(t) if !t.is_finite() => {
            return Err(OccupancyError::InvalidRenderOptions(format!(
                "threshold must be finite, got {t}"
            )));
        }
        Some(t) => t.max(0.0),
    };

    let [z_lo, z_hi] = geometry.axis_bounds(Axis::Z);
    let voxel_z = geometry.voxel_size(Axis::Z);

    let mut min = options
        .z_filter_min
        .filter(|z| z.is_finite())
        .unwrap_or(z_lo);
    let mut max = options
        .z_filter_max
        .filter(|z| z.is_finite())
        .unwrap_or(z_hi.min(conventions.z_ceiling));

    if let Some(layers) = options.drop_top_layers.filter(|&n| n > 0) {
        max -= layers as f32 * voxel_z;
    }

    min = min.clamp(z_lo, z_hi);
    max = max.clamp(z_lo, z_hi);
    if !(max > min) {
        max = min + voxel_z;
    }

    Ok(ResolvedOptions { threshold, window: ZWindow { min, max } })
}

/// One occupied voxel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoxelRecord {
    /// Canonical grid index `(x, y, z)`.
    pub grid_index: [usize; 3],
    /// Displayed world center (horizontal axes swapped).
    pub world_center: Vec3,
    /// `floor(world_center.z / band_size)`; grouping key only.
    pub height_band: i32,
}

/// Per-instance data for a renderer: center plus normalized band height.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct VoxelInstance {
    pub position: [f32; 3],
    pub t: f32,
}

/// Voxels sharing one height band.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightBand {
    pub band: i32,
    /// Lower edge of the band in world meters.
    pub base_height: f32,
    /// Colour parameter: `base_height` normalized within the window.
    pub t: f32,
    pub voxels: Vec<VoxelRecord>,
}

impl HeightBand {
    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    /// Instance records for this band, all sharing the band's `t`.
    pub fn instances(&self) -> Vec<VoxelInstance> {
        self.voxels
            .iter()
            .map(|v| VoxelInstance { position: v.world_center.to_array(), t: self.t })
            .collect()
    }

    /// Flat `x, y, z` triples of the voxel centers.
    pub fn positions(&self) -> Vec<f32> {
        let instances = self.instances();
        let mut out = Vec::with_capacity(instances.len() * 3);
        for instance in &instances {
            out.extend_from_slice(&instance.position);
        }
        out
    }
}

/// Output of one voxelization pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Voxelization {
    pub threshold: f32,
    pub window: ZWindow,
    /// Bands in ascending height order.
    pub bands: Vec<HeightBand>,
    pub warnings: Vec<OccupancyWarning>,
}

impl Voxelization {
    pub fn voxel_count(&self) -> usize {
        self.bands.iter().map(HeightBand::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// All voxels, band by band.
    pub fn voxels(&self) -> impl Iterator<Item = &VoxelRecord> {
        self.bands.iter().flat_map(|b| b.voxels.iter())
    }

    /// Sorted grid indices of every emitted voxel.
    pub fn grid_indices(&self) -> Vec<[usize; 3]> {
        let mut out: Vec<[usize; 3]> = self.voxels().map(|v| v.grid_index).collect();
        out.sort_unstable();
        out
    }

    /// All instances as one contiguous buffer, band by band.
    pub fn instance_buffer(&self) -> Vec<VoxelInstance> {
        self.bands.iter().flat_map(|b| b.instances()).collect()
    }

    /// The instance buffer as raw bytes for upload.
    pub fn instance_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.instance_buffer()).to_vec()
    }
}

/// Voxelize with the standard display conventions.
pub fn voxelize(
    volume: &OccupancyVolume,
    geometry: &GridGeometry,
    options: &RenderOptions,
) -> Result<Voxelization> {
    voxelize_with(volume, geometry, options, &DisplayConventions::default())
}

/// Voxelize with explicit display conventions.
pub fn voxelize_with(
    volume: &OccupancyVolume,
    geometry: &GridGeometry,
    options: &RenderOptions,
    conventions: &DisplayConventions,
) -> Result<Voxelization> {
    let resolved = resolve_options(options, geometry, conventions)?;
    let window = resolved.window;
    let mut warnings = Vec::new();

    // The window only depends on the z index; decide each layer once.
    let layer_visible: Vec<bool> = (0..geometry.nz())
        .map(|z| window.contains(geometry.cell_center(Axis::Z, z)))
        .collect();

    let mut builder = BandBuilder::new(geometry, conventions.band_size);
    let capacity = geometry.num_voxels();

    match volume {
        OccupancyVolume::Dense(dense) => {
            let values = dense.values();
            for (index, &value) in values.iter().enumerate().take(capacity) {
                if !(value > resolved.threshold) {
                    continue;
                }
                builder.push_if_visible(index, &layer_visible);
            }
        }
        OccupancyVolume::Bitset(bits) => {
            if let Some(requested) = options.threshold.map(|t| t.max(0.0)) {
                if (requested - bits.bake_threshold()).abs() > THRESHOLD_EPSILON {
                    warnings.push(
                        OccupancyWarning::ThresholdMismatch {
                            requested,
                            baked: bits.bake_threshold(),
                        }
                        .raise(),
                    );
                }
            }
            for index in bits.iter_occupied() {
                if index >= capacity {
                    break;
                }
                builder.push_if_visible(index, &layer_visible);
            }
        }
    }

    let bands = builder.finish(&window);
    let result = Voxelization {
        threshold: resolved.threshold,
        window,
        bands,
        warnings,
    };
    tracing::debug!(
        voxels = result.voxel_count(),
        bands = result.bands.len(),
        threshold = result.threshold,
        z_min = window.min,
        z_max = window.max,
        "voxelized occupancy"
    );
    Ok(result)
}

/// Accumulates records into height bands.
struct BandBuilder<'a> {
    geometry: &'a GridGeometry,
    band_size: f32,
    bands: BTreeMap<i32, Vec<VoxelRecord>>,
}

impl<'a> BandBuilder<'a> {
    fn new(geometry: &'a GridGeometry, band_size: f32) -> Self {
        Self { geometry, band_size, bands: BTreeMap::new() }
    }

    #[inline]
    fn push_if_visible(&mut self, index: usize, layer_visible: &[bool]) {
        let [x, y, z] = self.geometry.inverse_linear_index_unchecked(index);
        if !layer_visible[z] {
            return;
        }
        let world_center = self.geometry.world_center_unchecked(x, y, z);
        let height_band = robust_floor(world_center.z / self.band_size);
        self.bands.entry(height_band).or_default().push(VoxelRecord {
            grid_index: [x, y, z],
            world_center,
            height_band,
        });
    }

    fn finish(self, window: &ZWindow) -> Vec<HeightBand> {
        let band_size = self.band_size;
        self.bands
            .into_iter()
            .map(|(band, voxels)| {
                let base_height = band as f32 * band_size;
                HeightBand { band, base_height, t: window.normalize(base_height), voxels }
            })
            .collect()
    }
}
