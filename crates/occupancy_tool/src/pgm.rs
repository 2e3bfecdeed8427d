//! 8-bit binary PGM (P5) output for projection maps.

use std::io::{self, Write};

use occupancy::ProjectionResult;

/// Write `map` as a grayscale image with y pointing up.
///
/// Values are scaled so `scale_max` maps to 255; anything at or below zero
/// is black. A non-positive `scale_max` writes an all-black image.
pub fn write_projection<W: Write>(
    out: &mut W,
    map: &ProjectionResult,
    scale_max: f32,
) -> io::Result<()> {
    write!(out, "P5\n{} {}\n255\n", map.width(), map.height())?;
    let rows: Vec<&[f32]> = map.rows().collect();
    // Image rows run top to bottom; grid row 0 is the lowest y.
    for row in rows.iter().rev() {
        let pixels: Vec<u8> = row.iter().map(|&v| to_gray(v, scale_max)).collect();
        out.write_all(&pixels)?;
    }
    Ok(())
}

fn to_gray(value: f32, scale_max: f32) -> u8 {
    if !(scale_max > 0.0) || !(value > 0.0) {
        return 0;
    }
    ((value / scale_max).min(1.0) * 255.0).round() as u8
}
