//! Decoded occupancy volumes.
//!
//! A volume is either dense (one probability per voxel) or a bitset baked at
//! a fixed threshold. Both are addressed by the canonical linear index of
//! [`GridGeometry`](crate::geometry::GridGeometry). Reads beyond the stored
//! data are "unoccupied".

/// Per-voxel probabilities, canonical order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DenseVolume {
    values: Vec<f32>,
}

impl DenseVolume {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Value at `index`, or 0.0 past the end of the buffer.
    #[inline]
    pub fn value(&self, index: usize) -> f32 {
        self.values.get(index).copied().unwrap_or(0.0)
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One bit per voxel, least-significant bit first within each byte.
///
/// Bit `i` lives in byte `i >> 3` at position `i & 7`.
#[derive(Clone, Debug, PartialEq)]
pub struct BitsetVolume {
    bytes: Vec<u8>,
    num_voxels: usize,
    bake_threshold: f32,
}

impl BitsetVolume {
    pub fn new(bytes: Vec<u8>, num_voxels: usize, bake_threshold: f32) -> Self {
        Self { bytes, num_voxels, bake_threshold }
    }

    /// Bytes needed to hold `num_voxels` bits.
    #[inline]
    pub fn byte_len_for(num_voxels: usize) -> usize {
        (num_voxels + 7) / 8
    }

    /// Whether voxel `index` is occupied. Indices past `num_voxels` or past
    /// the stored bytes read as unoccupied.
    #[inline]
    pub fn is_occupied(&self, index: usize) -> bool {
        if index >= self.num_voxels {
            return false;
        }
        match self.bytes.get(index >> 3) {
            Some(byte) => (byte >> (index & 7)) & 1 != 0,
            None => false,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn num_voxels(&self) -> usize {
        self.num_voxels
    }

    pub fn bake_threshold(&self) -> f32 {
        self.bake_threshold
    }

    /// Number of set bits within `num_voxels`.
    pub fn count_occupied(&self) -> usize {
        self.iter_occupied().count()
    }

    /// Iterate linear indices of set bits in ascending order.
    ///
    /// Zero bytes are skipped whole, so the cost follows the number of
    /// occupied voxels rather than the grid size.
    pub fn iter_occupied(&self) -> SetBits<'_> {
        SetBits {
            bytes: &self.bytes,
            limit: self.num_voxels,
            byte_index: 0,
            current: self.bytes.first().copied().unwrap_or(0),
        }
    }
}

/// Iterator over set bits of a [`BitsetVolume`].
pub struct SetBits<'a> {
    bytes: &'a [u8],
    limit: usize,
    byte_index: usize,
    current: u8,
}

impl Iterator for SetBits<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            if self.current != 0 {
                let bit = self.current.trailing_zeros() as usize;
                self.current &= self.current - 1;
                let index = (self.byte_index << 3) + bit;
                if index >= self.limit {
                    return None;
                }
                return Some(index);
            }
            self.byte_index += 1;
            if self.byte_index >= self.bytes.len() || (self.byte_index << 3) >= self.limit {
                return None;
            }
            self.current = self.bytes[self.byte_index];
        }
    }
}

/// Encoding tag of a decoded volume.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodingKind {
    Dense,
    Bitset,
}

/// Decoded occupancy in either encoding.
#[derive(Clone, Debug, PartialEq)]
pub enum OccupancyVolume {
    Dense(DenseVolume),
    Bitset(BitsetVolume),
}

impl OccupancyVolume {
    pub fn kind(&self) -> EncodingKind {
        match self {
            OccupancyVolume::Dense(_) => EncodingKind::Dense,
            OccupancyVolume::Bitset(_) => EncodingKind::Bitset,
        }
    }

    /// Scalar value at `index`: the probability for dense volumes, 1.0/0.0
    /// for bitsets. Out-of-range reads return 0.0.
    #[inline]
    pub fn value(&self, index: usize) -> f32 {
        match self {
            OccupancyVolume::Dense(dense) => dense.value(index),
            OccupancyVolume::Bitset(bits) => {
                if bits.is_occupied(index) {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Number of voxels actually backed by data.
    pub fn stored_voxels(&self) -> usize {
        match self {
            OccupancyVolume::Dense(dense) => dense.len(),
            OccupancyVolume::Bitset(bits) => {
                bits.num_voxels().min(bits.bytes().len() * 8)
            }
        }
    }

    pub fn as_dense(&self) -> Option<&DenseVolume> {
        match self {
            OccupancyVolume::Dense(dense) => Some(dense),
            OccupancyVolume::Bitset(_) => None,
        }
    }

    pub fn as_bitset(&self) -> Option<&BitsetVolume> {
        match self {
            OccupancyVolume::Bitset(bits) => Some(bits),
            OccupancyVolume::Dense(_) => None,
        }
    }
}
