//! Percent-of-nominal fixed-point scaling.
//!
//! Every scaled object (setpoints, protection thresholds, measured
//! values) carries a u16 where `25600` corresponds to 100 % of the
//! matching nominal value. The nominal voltage and current are read from
//! the device once per session and act as the scaling base everywhere.

/// Raw register value corresponding to 100 % of nominal.
pub const FULL_SCALE: f32 = 25600.0;

/// Convert a raw register value to a physical value.
#[inline]
pub fn raw_to_physical(raw: u16, nominal: f32) -> f32 {
    nominal * raw as f32 / FULL_SCALE
}

/// Convert a physical value to the nearest raw register value.
///
/// Returns `None` when `nominal` is zero or not finite, which would make
/// the division undefined.
#[inline]
pub fn physical_to_raw(value: f32, nominal: f32) -> Option<u16> {
    if !(nominal.is_finite() && nominal > 0.0) {
        return None;
    }
    // Round to nearest; scaled values are never negative.
    Some((value * FULL_SCALE / nominal + 0.5) as u16)
}
