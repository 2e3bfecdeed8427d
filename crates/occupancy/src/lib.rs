//! Occupancy volume decoding, projection and voxelization.
//!
//! Takes the `(metadata JSON, binary payload)` pair a scene viewer fetches
//! and produces the two shapes a renderer draws:
//!
//! - a bird's-eye [`ProjectionResult`] (max / mean / single z slice), and
//! - a [`Voxelization`]: occupied voxels grouped into height bands for
//!   instanced cubes.
//!
//! Payloads are either dense little-endian f32 probabilities or a packed
//! bitset baked at a fixed threshold. Both are addressed with one canonical
//! flattening, `z + y*nz + x*nz*ny`.
//!
//! # Example
//!
//! ```
//! use occupancy::{decode_json, project_max, voxelize, RenderOptions};
//!
//! let meta = r#"{"grid_shape": [2, 2, 2],
//!                "bounds": {"x": [0, 2], "y": [0, 2], "z": [0, 2]}}"#;
//! let mut values = [0.0f32; 8];
//! values[7] = 0.9; // (1, 1, 1)
//! let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
//!
//! let scene = decode_json(meta, &bytes).unwrap();
//! let bev = project_max(&scene.volume, &scene.geometry);
//! assert_eq!(bev.get(1, 1), Some(0.9));
//!
//! let voxels = voxelize(&scene.volume, &scene.geometry, &RenderOptions::default()).unwrap();
//! assert_eq!(voxels.voxel_count(), 1);
//! ```

pub mod core;
pub mod decode;
pub mod encode;
pub mod error;
pub mod geometry;
pub mod metadata;
pub mod options;
pub mod project;
pub mod stats;
pub mod volume;
pub mod voxelize;

pub use crate::core::{
    Axis, DisplayConventions, DEFAULT_BAKE_THRESHOLD, DEFAULT_THRESHOLD, DEFAULT_Z_CEILING,
    HEIGHT_BAND_SIZE,
};
pub use crate::decode::{decode, decode_json, DecodedScene};
pub use crate::encode::{bake_bitset, bitset_metadata, dense_to_le_bytes};
pub use crate::error::{OccupancyError, OccupancyWarning, Result};
pub use crate::geometry::GridGeometry;
pub use crate::metadata::{OccupancyMetadata, PayloadEncoding};
pub use crate::options::RenderOptions;
pub use crate::project::{
    extract_slice, project, project_max, project_mean, ProjectionMode, ProjectionResult,
};
pub use crate::stats::{count_above, Histogram, VolumeStats};
pub use crate::volume::{BitsetVolume, DenseVolume, EncodingKind, OccupancyVolume};
pub use crate::voxelize::{
    resolve_options, voxelize, voxelize_with, HeightBand, ResolvedOptions, VoxelInstance,
    VoxelRecord, Voxelization, ZWindow,
};

#[cfg(test)]
mod scenarios {
    //! End-to-end checks through the public decode entry points.

    use super::*;

    const META_2X2X2: &str = r#"{"grid_shape": [2, 2, 2],
        "bounds": {"x": [0, 2], "y": [0, 2], "z": [0, 2]}}"#;

    #[test]
    fn dense_single_voxel_projects_to_one_cell() {
        let mut values = vec![0.0f32; 8];
        values[7] = 0.9;
        let scene = decode_json(META_2X2X2, &dense_to_le_bytes(&values)).unwrap();
        let bev = project_max(&scene.volume, &scene.geometry);
        let rows: Vec<&[f32]> = bev.rows().collect();
        assert_eq!(rows, vec![&[0.0f32, 0.0][..], &[0.0f32, 0.9][..]]);
    }

    #[test]
    fn bitset_single_voxel_voxelizes_once() {
        let meta = r#"{"grid_shape": [2, 2, 2],
            "bounds": {"x": [0, 2], "y": [0, 2], "z": [0, 2]},
            "encoding": "bitset", "num_voxels": 8,
            "bake_threshold": 0.5, "bitorder": "lsb0"}"#;
        let scene = decode_json(meta, &[1 << 7]).unwrap();
        for t in [0.0, 0.25, 0.5, 0.75] {
            let v = voxelize(
                &scene.volume,
                &scene.geometry,
                &RenderOptions::default().with_threshold(t),
            )
            .unwrap();
            assert_eq!(v.voxel_count(), 1);
            assert_eq!(v.voxels().next().unwrap().grid_index, [1, 1, 1]);
        }
    }

    #[test]
    fn drop_top_layer_on_eight_layers() {
        let meta = r#"{"grid_shape": [2, 2, 8],
            "bounds": {"x": [0, 2], "y": [0, 2], "z": [0, 2]}}"#;
        let scene = decode_json(meta, &dense_to_le_bytes(&[1.0; 32])).unwrap();
        let conv = DisplayConventions::default();
        let zero = resolve_options(
            &RenderOptions::default().with_drop_top_layers(0),
            &scene.geometry,
            &conv,
        )
        .unwrap();
        let one = resolve_options(
            &RenderOptions::default().with_drop_top_layers(1),
            &scene.geometry,
            &conv,
        )
        .unwrap();
        let voxel_z = scene.geometry.voxel_size(Axis::Z);
        assert!((zero.window.max - one.window.max - voxel_z).abs() < 1e-6);

        let all = voxelize(&scene.volume, &scene.geometry, &RenderOptions::default()).unwrap();
        let fewer = voxelize(
            &scene.volume,
            &scene.geometry,
            &RenderOptions::default().with_drop_top_layers(1),
        )
        .unwrap();
        assert_eq!(all.voxel_count(), 32);
        assert_eq!(fewer.voxel_count(), 28);
    }

    #[test]
    fn short_raw_payload_warns_and_reads_zero() {
        let scene = decode_json(META_2X2X2, &dense_to_le_bytes(&[0.7; 7])).unwrap();
        assert_eq!(
            scene.warnings,
            vec![OccupancyWarning::SizeMismatch { expected: 8, actual: 7 }]
        );
        assert_eq!(scene.volume.value(7), 0.0);
        assert_eq!(scene.value_at(1, 1, 1), 0.0);
    }
}
