//! Turn `(metadata, bytes)` into an [`OccupancyVolume`].
//!
//! Structural problems (bad geometry, unknown encoding, unsupported bit
//! order) fail the decode. Size disagreements only produce warnings: the
//! volume is kept as-is and out-of-range reads count as unoccupied.

use byteorder::{ByteOrder, LittleEndian};

use crate::core::DEFAULT_BAKE_THRESHOLD;
use crate::error::{OccupancyWarning, Result};
use crate::geometry::GridGeometry;
use crate::metadata::{OccupancyMetadata, PayloadEncoding};
use crate::volume::{BitsetVolume, DenseVolume, OccupancyVolume};

/// A decoded scene: validated geometry, the volume, and any warnings raised
/// while decoding.
#[derive(Clone, Debug)]
pub struct DecodedScene {
    pub metadata: OccupancyMetadata,
    pub geometry: GridGeometry,
    pub volume: OccupancyVolume,
    pub warnings: Vec<OccupancyWarning>,
}

impl DecodedScene {
    /// Scalar value at `(x, y, z)`; 0.0 outside the grid or the payload.
    pub fn value_at(&self, x: usize, y: usize, z: usize) -> f32 {
        match self.geometry.linear_index(x, y, z) {
            Ok(index) => self.volume.value(index),
            Err(_) => 0.0,
        }
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Decode a scene from a metadata JSON document and its binary payload.
pub fn decode_json(metadata_json: &str, bytes: &[u8]) -> Result<DecodedScene> {
    let metadata = OccupancyMetadata::from_json(metadata_json)?;
    decode(metadata, bytes)
}

/// Decode a scene from parsed metadata and its binary payload.
pub fn decode(metadata: OccupancyMetadata, bytes: &[u8]) -> Result<DecodedScene> {
    let geometry = metadata.geometry()?;
    let encoding = metadata.encoding()?;
    let mut warnings = metadata.voxel_size_warnings(&geometry);

    let volume = match encoding {
        PayloadEncoding::Raw => decode_raw(&geometry, bytes, &mut warnings),
        PayloadEncoding::Bitset => {
            metadata.check_bitorder()?;
            decode_bitset(&metadata, &geometry, bytes, &mut warnings)
        }
    };

    tracing::debug!(
        encoding = encoding.as_str(),
        shape = ?geometry.shape(),
        stored = volume.stored_voxels(),
        warnings = warnings.len(),
        "decoded occupancy volume"
    );

    Ok(DecodedScene { metadata, geometry, volume, warnings })
}

/// Little-endian f32 per voxel.
fn decode_raw(
    geometry: &GridGeometry,
    bytes: &[u8],
    warnings: &mut Vec<OccupancyWarning>,
) -> OccupancyVolume {
    let trailing = bytes.len() % 4;
    if trailing != 0 {
        warnings.push(OccupancyWarning::TrailingBytes { dropped: trailing }.raise());
    }
    let usable = &bytes[..bytes.len() - trailing];
    let mut values = vec![0.0f32; usable.len() / 4];
    LittleEndian::read_f32_into(usable, &mut values);

    let expected = geometry.num_voxels();
    if values.len() != expected {
        warnings.push(
            OccupancyWarning::SizeMismatch { expected, actual: values.len() }.raise(),
        );
    }
    OccupancyVolume::Dense(DenseVolume::new(values))
}

/// Packed bits, LSB first, `ceil(num_voxels / 8)` bytes.
fn decode_bitset(
    metadata: &OccupancyMetadata,
    geometry: &GridGeometry,
    bytes: &[u8],
    warnings: &mut Vec<OccupancyWarning>,
) -> OccupancyVolume {
    let capacity = geometry.num_voxels();
    let mut num_voxels = metadata.num_voxels.unwrap_or(capacity);
    if num_voxels > capacity {
        warnings.push(
            OccupancyWarning::NumVoxelsExceedsCapacity { declared: num_voxels, capacity }.raise(),
        );
        num_voxels = capacity;
    }

    let expected_bytes = BitsetVolume::byte_len_for(num_voxels);
    if bytes.len() < expected_bytes {
        warnings.push(
            OccupancyWarning::SizeMismatch { expected: num_voxels, actual: bytes.len() * 8 }
                .raise(),
        );
    } else if bytes.len() > expected_bytes {
        warnings.push(
            OccupancyWarning::OversizedBitset { expected_bytes, actual_bytes: bytes.len() }
                .raise(),
        );
    }

    let bake_threshold = metadata.bake_threshold.unwrap_or(DEFAULT_BAKE_THRESHOLD);
    OccupancyVolume::Bitset(BitsetVolume::new(bytes.to_vec(), num_voxels, bake_threshold))
}
