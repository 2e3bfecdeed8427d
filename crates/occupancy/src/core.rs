//! Shared constants and display conventions.

/// Probability cutoff used when the caller supplies none.
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Default upper edge of the z window (meters). Keeps sky/ceiling
/// voxels out of the default view.
pub const DEFAULT_Z_CEILING: f32 = 3.5;

/// Height of one colour band (meters).
pub const HEIGHT_BAND_SIZE: f32 = 0.1;

/// Bake threshold assumed when bitset metadata omits one.
pub const DEFAULT_BAKE_THRESHOLD: f32 = 0.5;

/// Only supported bit order for bitset payloads.
pub const BITORDER_LSB0: &str = "lsb0";

/// Epsilon for robust float-to-int conversion near integer boundaries.
const COORD_EPSILON: f32 = 1e-5;

/// Canonical grid axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }

    pub(crate) fn letter(self) -> char {
        match self {
            Axis::X => 'x',
            Axis::Y => 'y',
            Axis::Z => 'z',
        }
    }
}

/// Fixed display conventions used by the voxelization engine.
///
/// The defaults are the values every viewer variant agrees on. They are
/// grouped here so tests and tools can tweak them in one place.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayConventions {
    /// Threshold used when `RenderOptions::threshold` is unset.
    pub default_threshold: f32,
    /// Upper clamp for the default z window.
    pub z_ceiling: f32,
    /// Band height used to group voxels for colouring.
    pub band_size: f32,
}

impl Default for DisplayConventions {
    fn default() -> Self {
        Self {
            default_threshold: DEFAULT_THRESHOLD,
            z_ceiling: DEFAULT_Z_CEILING,
            band_size: HEIGHT_BAND_SIZE,
        }
    }
}

/// Floor that snaps values within [`COORD_EPSILON`] of an integer to it.
///
/// `0.3 / 0.1` evaluates to `2.9999998`; a plain floor would put a voxel
/// centered at 0.3 m into band 2.
#[inline]
pub fn robust_floor(value: f32) -> i32 {
    let rounded = value.round();
    if (value - rounded).abs() < COORD_EPSILON {
        rounded as i32
    } else {
        value.floor() as i32
    }
}
