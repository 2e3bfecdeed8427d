//! Encoders for the two payload formats.
//!
//! Baking turns a dense probability volume into the packed bitset format:
//! bit `i` is set iff `value[i] > threshold`, LSB first within each byte.

use byteorder::{ByteOrder, LittleEndian};

use crate::core::BITORDER_LSB0;
use crate::geometry::GridGeometry;
use crate::metadata::{OccupancyMetadata, PayloadEncoding};
use crate::volume::{BitsetVolume, DenseVolume};

/// Serialize probabilities as little-endian f32.
pub fn dense_to_le_bytes(values: &[f32]) -> Vec<u8> {
    let mut bytes = vec![0u8; values.len() * 4];
    LittleEndian::write_f32_into(values, &mut bytes);
    bytes
}

/// Bake a dense volume into a bitset covering the whole grid.
///
/// Voxels missing from a short dense buffer bake as unoccupied.
pub fn bake_bitset(dense: &DenseVolume, geometry: &GridGeometry, threshold: f32) -> BitsetVolume {
    let num_voxels = geometry.num_voxels();
    let mut bytes = vec![0u8; BitsetVolume::byte_len_for(num_voxels)];
    for (index, &value) in dense.values().iter().enumerate().take(num_voxels) {
        if value > threshold {
            bytes[index >> 3] |= 1u8 << (index & 7);
        }
    }
    BitsetVolume::new(bytes, num_voxels, threshold)
}

/// Metadata for a baked bitset payload derived from the source document.
///
/// `occupancy_range` becomes `[0, 1]` (or `[0, 0]` when nothing is set),
/// and `occupancy_file` points at `file_name`.
pub fn bitset_metadata(
    source: &OccupancyMetadata,
    bits: &BitsetVolume,
    file_name: Option<&str>,
) -> OccupancyMetadata {
    let any = bits.iter_occupied().next().is_some();
    OccupancyMetadata {
        occupancy_range: Some([0.0, if any { 1.0 } else { 0.0 }]),
        occupancy_file: file_name.map(str::to_string).or_else(|| source.occupancy_file.clone()),
        encoding: Some(PayloadEncoding::Bitset.as_str().to_string()),
        num_voxels: Some(bits.num_voxels()),
        bake_threshold: Some(bits.bake_threshold()),
        bitorder: Some(BITORDER_LSB0.to_string()),
        ..source.clone()
    }
}
