//! Checked fixed-point helpers on `u128` intermediates.
//!
//! Every helper returns `None` on overflow or a zero divisor instead of
//! wrapping or saturating; callers turn that into an arithmetic error.

/// `floor(a * b / d)`.
pub fn mul_div_floor(a: u128, b: u128, d: u128) -> Option<u128> {
    if d == 0 {
        return None;
    }
    a.checked_mul(b).map(|p| p / d)
}

/// `floor(a * b * c / d)`.
pub fn mul3_div_floor(a: u128, b: u128, c: u128, d: u128) -> Option<u128> {
    if d == 0 {
        return None;
    }
    a.checked_mul(b)?.checked_mul(c).map(|p| p / d)
}

/// Narrow a `u128` result back to `u64`.
pub fn to_u64(value: u128) -> Option<u64> {
    u64::try_from(value).ok()
}
