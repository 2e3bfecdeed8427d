//! Error and warning types for occupancy decoding and rendering preparation.
//!
//! Fatal conditions are [`OccupancyError`] values returned through
//! [`Result`]. Conditions a viewer can tolerate (short buffers, a threshold
//! that cannot affect baked data) are [`OccupancyWarning`] values collected
//! alongside the successful output.

use std::fmt;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OccupancyError>;

/// Fatal errors. Each one aborts the call that raised it.
#[derive(Debug, Error)]
pub enum OccupancyError {
    /// Grid shape or bounds cannot describe a grid.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Bitset payload declares a bit order other than `lsb0`.
    #[error("unsupported bit order {0:?} (only \"lsb0\" is supported)")]
    UnsupportedBitOrder(String),

    /// Metadata names an encoding this crate cannot decode.
    #[error("unsupported encoding {0:?} (expected \"raw\" or \"bitset\")")]
    UnsupportedEncoding(String),

    /// A caller-supplied index lies outside its axis.
    #[error("{axis} index {index} out of range 0..{len}")]
    IndexOutOfRange {
        axis: &'static str,
        index: usize,
        len: usize,
    },

    /// Render options that no default can repair (e.g. a NaN threshold).
    #[error("invalid render options: {0}")]
    InvalidRenderOptions(String),

    /// Metadata document is not valid JSON or misses required fields.
    #[error("malformed metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

impl OccupancyError {
    pub(crate) fn geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    pub(crate) fn out_of_range(axis: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { axis, index, len }
    }
}

/// Non-fatal anomalies. Decoding and voxelization continue past these.
#[derive(Debug, Clone, PartialEq)]
pub enum OccupancyWarning {
    /// Decoded element count differs from what the grid shape requires.
    /// Reads past the end of the buffer yield "unoccupied".
    SizeMismatch { expected: usize, actual: usize },

    /// Bitset payload carries more bytes than `num_voxels` needs. The
    /// extra bytes are ignored.
    OversizedBitset { expected_bytes: usize, actual_bytes: usize },

    /// Raw float payload length was not a multiple of four bytes.
    TrailingBytes { dropped: usize },

    /// Bitset `num_voxels` exceeded the grid capacity and was clamped.
    NumVoxelsExceedsCapacity { declared: usize, capacity: usize },

    /// Declared `voxel_size` disagrees with `(max - min) / count`.
    VoxelSizeMismatch { axis: char, declared: f32, derived: f32 },

    /// A render threshold was requested for a bitset baked at another one.
    /// The occupied set is fixed by the baked bits.
    ThresholdMismatch { requested: f32, baked: f32 },
}

impl fmt::Display for OccupancyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SizeMismatch { expected, actual } => write!(
                f,
                "size mismatch: expected {expected} voxels, payload holds {actual}"
            ),
            Self::OversizedBitset { expected_bytes, actual_bytes } => write!(
                f,
                "bitset payload is {actual_bytes} bytes, {expected_bytes} needed; extra bytes ignored"
            ),
            Self::TrailingBytes { dropped } => {
                write!(f, "dropped {dropped} trailing bytes from float payload")
            }
            Self::NumVoxelsExceedsCapacity { declared, capacity } => write!(
                f,
                "num_voxels {declared} exceeds grid capacity {capacity}; clamped"
            ),
            Self::VoxelSizeMismatch { axis, declared, derived } => write!(
                f,
                "voxel_size along {axis} declared {declared}, bounds imply {derived}"
            ),
            Self::ThresholdMismatch { requested, baked } => write!(
                f,
                "threshold {requested} ignored: bitset was baked at {baked}"
            ),
        }
    }
}

impl OccupancyWarning {
    /// Emit the warning through `tracing` and hand it back for collection.
    pub(crate) fn raise(self) -> Self {
        tracing::warn!(warning = %self, "occupancy");
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_error_names_axis() {
        let err = OccupancyError::out_of_range("z", 9, 8);
        assert_eq!(err.to_string(), "z index 9 out of range 0..8");
    }

    #[test]
    fn metadata_error_wraps_serde() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: OccupancyError = parse.unwrap_err().into();
        assert!(matches!(err, OccupancyError::Metadata(_)));
    }

    #[test]
    fn warning_display_mentions_values() {
        let w = OccupancyWarning::ThresholdMismatch { requested: 0.3, baked: 0.5 };
        let text = w.to_string();
        assert!(text.contains("0.3"));
        assert!(text.contains("0.5"));
    }
}
