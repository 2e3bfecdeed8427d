//! Scene metadata document that accompanies every occupancy payload.
//!
//! ```json
//! {
//!   "grid_shape": [400, 400, 32],
//!   "bounds": { "x": [-40, 40], "y": [-40, 40], "z": [-1, 5.4] },
//!   "voxel_size": 0.2,
//!   "occupancy_range": [0.0, 0.98],
//!   "occupancy_file": "scene.bin",
//!   "encoding": "bitset",
//!   "num_voxels": 5120000,
//!   "bake_threshold": 0.5,
//!   "bitorder": "lsb0"
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::core::{Axis, BITORDER_LSB0};
use crate::error::{OccupancyError, OccupancyWarning, Result};
use crate::geometry::GridGeometry;

/// Relative tolerance when comparing declared and derived voxel sizes.
const VOXEL_SIZE_TOLERANCE: f32 = 1e-3;

/// Per-axis world bounds in meters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisBounds {
    pub x: [f32; 2],
    pub y: [f32; 2],
    pub z: [f32; 2],
}

impl AxisBounds {
    pub fn to_array(&self) -> [[f32; 2]; 3] {
        [self.x, self.y, self.z]
    }
}

/// `voxel_size` is written either as one number or as one per axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeclaredVoxelSize {
    Uniform(f32),
    PerAxis([f32; 3]),
}

impl DeclaredVoxelSize {
    pub fn per_axis(&self) -> [f32; 3] {
        match *self {
            DeclaredVoxelSize::Uniform(s) => [s; 3],
            DeclaredVoxelSize::PerAxis(s) => s,
        }
    }
}

/// Encoding of the binary payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PayloadEncoding {
    /// Little-endian f32 per voxel.
    #[default]
    Raw,
    /// One bit per voxel, LSB first.
    Bitset,
}

impl PayloadEncoding {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "raw" => Ok(PayloadEncoding::Raw),
            "bitset" => Ok(PayloadEncoding::Bitset),
            other => Err(OccupancyError::UnsupportedEncoding(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadEncoding::Raw => "raw",
            PayloadEncoding::Bitset => "bitset",
        }
    }
}

/// Parsed metadata document.
///
/// `encoding` is kept as the raw string so an unknown value surfaces as
/// [`OccupancyError::UnsupportedEncoding`] rather than a generic parse error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OccupancyMetadata {
    /// Signed so a non-positive dimension reaches geometry validation.
    pub grid_shape: [i64; 3],
    pub bounds: AxisBounds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voxel_size: Option<DeclaredVoxelSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupancy_range: Option<[f32; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupancy_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_voxels: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bake_threshold: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitorder: Option<String>,
}

impl OccupancyMetadata {
    /// Parse a metadata JSON document.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Declared payload encoding; `raw` when absent.
    pub fn encoding(&self) -> Result<PayloadEncoding> {
        match self.encoding.as_deref() {
            None => Ok(PayloadEncoding::Raw),
            Some(name) => PayloadEncoding::parse(name),
        }
    }

    /// Check the declared bit order. Absent means `lsb0`.
    pub fn check_bitorder(&self) -> Result<()> {
        match self.bitorder.as_deref() {
            None | Some(BITORDER_LSB0) => Ok(()),
            Some(other) => Err(OccupancyError::UnsupportedBitOrder(other.to_string())),
        }
    }

    /// Validated grid geometry described by this document.
    pub fn geometry(&self) -> Result<GridGeometry> {
        let mut shape = [0usize; 3];
        for axis in Axis::ALL {
            let n = self.grid_shape[axis.index()];
            if n <= 0 {
                return Err(OccupancyError::geometry(format!(
                    "{} dimension must be >= 1, got {n}",
                    axis.name()
                )));
            }
            shape[axis.index()] = usize::try_from(n).map_err(|_| {
                OccupancyError::geometry(format!("{} dimension {n} is too large", axis.name()))
            })?;
        }
        GridGeometry::new(shape, self.bounds.to_array())
    }

    /// Compare the declared voxel size with what the bounds imply.
    pub fn voxel_size_warnings(&self, geometry: &GridGeometry) -> Vec<OccupancyWarning> {
        let Some(declared) = &self.voxel_size else {
            return Vec::new();
        };
        let declared = declared.per_axis();
        Axis::ALL
            .iter()
            .filter_map(|&axis| {
                let derived = geometry.voxel_size(axis);
                let given = declared[axis.index()];
                let off = (given - derived).abs() > VOXEL_SIZE_TOLERANCE * derived.abs().max(1e-6);
                off.then(|| {
                    OccupancyWarning::VoxelSizeMismatch {
                        axis: axis.letter(),
                        declared: given,
                        derived,
                    }
                    .raise()
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW_DOC: &str = r#"{
        "occupancy_file": "occ.bin",
        "grid_shape": [400, 400, 32],
        "bounds": { "x": [-40.0, 40.0], "y": [-40.0, 40.0], "z": [-1.0, 5.4] },
        "voxel_size": 0.2,
        "occupancy_range": [0.0, 0.97]
    }"#;

    #[test]
    fn parses_converter_output() {
        let meta = OccupancyMetadata::from_json(RAW_DOC).expect("parse");
        assert_eq!(meta.grid_shape, [400, 400, 32]);
        assert_eq!(meta.encoding().unwrap(), PayloadEncoding::Raw);
        assert_eq!(meta.voxel_size, Some(DeclaredVoxelSize::Uniform(0.2)));
        assert_eq!(meta.occupancy_file.as_deref(), Some("occ.bin"));
        let g = meta.geometry().expect("geometry");
        assert!(meta.voxel_size_warnings(&g).is_empty());
    }

    #[test]
    fn parses_bitset_fields() {
        let doc = r#"{
            "grid_shape": [2, 2, 2],
            "bounds": { "x": [0, 2], "y": [0, 2], "z": [0, 2] },
            "voxel_size": [1.0, 1.0, 1.0],
            "encoding": "bitset",
            "num_voxels": 8,
            "bake_threshold": 0.4,
            "bitorder": "lsb0"
        }"#;
        let meta = OccupancyMetadata::from_json(doc).expect("parse");
        assert_eq!(meta.encoding().unwrap(), PayloadEncoding::Bitset);
        assert_eq!(meta.num_voxels, Some(8));
        assert_eq!(meta.bake_threshold, Some(0.4));
        assert!(meta.check_bitorder().is_ok());
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let mut meta = OccupancyMetadata::from_json(RAW_DOC).unwrap();
        meta.encoding = Some("zstd".into());
        assert!(matches!(meta.encoding(), Err(OccupancyError::UnsupportedEncoding(_))));
    }

    #[test]
    fn msb_bitorder_is_rejected() {
        let mut meta = OccupancyMetadata::from_json(RAW_DOC).unwrap();
        meta.bitorder = Some("msb0".into());
        assert!(matches!(meta.check_bitorder(), Err(OccupancyError::UnsupportedBitOrder(_))));
    }

    #[test]
    fn missing_shape_is_metadata_error() {
        let err = OccupancyMetadata::from_json(r#"{"bounds": {"x":[0,1],"y":[0,1],"z":[0,1]}}"#)
            .unwrap_err();
        assert!(matches!(err, OccupancyError::Metadata(_)));
    }

    #[test]
    fn voxel_size_mismatch_warns() {
        let mut meta = OccupancyMetadata::from_json(RAW_DOC).unwrap();
        meta.voxel_size = Some(DeclaredVoxelSize::PerAxis([0.2, 0.2, 0.4]));
        let g = meta.geometry().unwrap();
        let warnings = meta.voxel_size_warnings(&g);
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            warnings[0],
            OccupancyWarning::VoxelSizeMismatch { axis: 'z', .. }
        ));
    }

    #[test]
    fn json_round_trip_keeps_optional_fields_absent() {
        let meta = OccupancyMetadata::from_json(RAW_DOC).unwrap();
        let text = meta.to_json_pretty().unwrap();
        assert!(!text.contains("bitorder"));
        assert_eq!(OccupancyMetadata::from_json(&text).unwrap(), meta);
    }
}
