//! Pure calculation functions for transform geometry.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::Cropping;

/// Rotations outside this open interval are treated as unresolvable.
const MAX_ROTATION: f64 = 361.0;

/// Calculate dimensions needed to cover a target area (resize before crop).
///
/// Returns dimensions that completely cover the target area while maintaining
/// the source aspect ratio. One dimension matches the target exactly, the
/// other matches or exceeds it.
///
/// # Arguments
/// * `source` - Current working dimensions (width, height)
/// * `target` - Target area dimensions (width, height)
///
/// # Returns
/// * `(width, height)` - Cover dimensions (at least one matches target)
pub fn calculate_fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: height will match, width will exceed
        let h = tgt_h;
        let w = ((h as f64 * src_aspect).round() as u32).max(tgt_w);
        (w, h)
    } else {
        // Source is taller: width will match, height will exceed
        let w = tgt_w;
        let h = ((w as f64 / src_aspect).round() as u32).max(tgt_h);
        (w, h)
    }
}

/// Offset of the `target` window on a `fill` canvas for the given gravity.
///
/// Centered axes use floor division, so an odd remainder leaves the extra
/// pixel on the right/bottom. `Cropping::Disabled` behaves like `Center`.
pub fn calculate_crop_offset(fill: (u32, u32), target: (u32, u32), gravity: Cropping) -> (u32, u32) {
    let spare_x = fill.0.saturating_sub(target.0);
    let spare_y = fill.1.saturating_sub(target.1);

    let (x, y) = match gravity {
        Cropping::NorthWest => (0, 0),
        Cropping::North => (spare_x / 2, 0),
        Cropping::NorthEast => (spare_x, 0),
        Cropping::West => (0, spare_y / 2),
        Cropping::Center | Cropping::Disabled => (spare_x / 2, spare_y / 2),
        Cropping::East => (spare_x, spare_y / 2),
        Cropping::SouthWest => (0, spare_y),
        Cropping::South => (spare_x / 2, spare_y),
        Cropping::SouthEast => (spare_x, spare_y),
    };
    (x, y)
}

/// Resolve a rotation to something worth emitting.
///
/// Returns `None` for non-finite values, values outside (-361, 361), and the
/// identity rotations -360, 0 and 360.
pub fn effective_rotation(degrees: f64) -> Option<f64> {
    if !degrees.is_finite() || degrees <= -MAX_ROTATION || degrees >= MAX_ROTATION {
        return None;
    }
    if degrees == 0.0 || degrees.abs() == 360.0 {
        return None;
    }
    Some(degrees)
}

/// Whether a rotation exchanges the width and height axes.
pub fn swaps_axes(degrees: f64) -> bool {
    let abs = degrees.abs();
    abs == 90.0 || abs == 270.0
}
