//! Small numeric helpers shared by the drive and steering code.

/// Clip `n` into `[-1.0, 1.0]`.  NaN becomes 0.0.
pub fn limit(n: f32) -> f32 {
    if n.is_nan() {
        0.0
    } else if n > 1.0 {
        1.0
    } else if n < -1.0 {
        -1.0
    } else {
        n
    }
}

/// Square `n` while keeping its sign.
pub fn sign_square(n: f32) -> f32 {
    if n >= 0.0 { n * n } else { -(n * n) }
}

/// Clip `value` into whichever of `min` / `max` are set.
///
/// Never panics, even when `min > max`; the upper bound is applied first
/// and the lower bound wins.  NaN becomes 0.0 before clipping.
pub fn bound(value: f32, min: Option<f32>, max: Option<f32>) -> f32 {
    let mut out = if value.is_nan() { 0.0 } else { value };
    if let Some(max) = max {
        if out > max {
            out = max;
        }
    }
    if let Some(min) = min {
        if out < min {
            out = min;
        }
    }
    out
}

/// Fold an angular error into `[-180, 180]` degrees with a single
/// correction of ±360.
pub fn wrap_angle_error(error: f32) -> f32 {
    let mut e = error;
    if e < -180.0 {
        e += 360.0;
    }
    if e > 180.0 {
        e -= 360.0;
    }
    e
}

/// Fold any heading into `[-180, 180)` degrees.  Non-finite input reads
/// as 0.0.
pub fn wrap_degrees(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    (angle + 180.0).rem_euclid(360.0) - 180.0
}
