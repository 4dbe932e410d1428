//! Q16.16 Fixed-Point Arithmetic
//!
//! Deterministic scalar math for the movement core and the tile rules.
//! All operations use integer arithmetic only - no floats in simulation logic.
//!
//! ## Format: Q16.16
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Bit Layout: Q16.16 (32-bit signed integer)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  [S][IIIIIIIIIIIIIIII][FFFFFFFFFFFFFFFF]                    │
//! │   │  └──── 16 bits ────┘└──── 16 bits ────┘                 │
//! │   └─ Sign bit                                               │
//! │                                                             │
//! │  Range: -32768.0 to +32767.99998 world units                │
//! │  Precision: 1/65536 unit                                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! One tile is 32 world units, so the format covers maps of up to
//! roughly 1000 tiles per axis. Wide intermediates (`i64`) are used for every
//! product so that squared lengths of long vectors never overflow.

/// Q16.16 fixed-point number stored as i32.
/// 16 bits integer, 16 bits fractional.
pub type Fixed = i32;

/// Number of fractional bits (16)
pub const FIXED_SCALE: i32 = 16;

/// 1.0 in fixed-point (65536)
pub const FIXED_ONE: Fixed = 1 << FIXED_SCALE; // 65536

/// 0.5 in fixed-point (32768)
pub const FIXED_HALF: Fixed = FIXED_ONE >> 1; // 32768

/// Maximum positive value
pub const FIXED_MAX: Fixed = i32::MAX;

/// Minimum negative value
pub const FIXED_MIN: Fixed = i32::MIN;

/// Network precision for velocities and hook direction: 1/256 unit.
pub const FIXED_NET_STEP: Fixed = FIXED_ONE >> 8;

/// 2^(1/2^i) for i = 1..=16 in Q2.30, used by [`fixed_exp2`].
const EXP2_ROOTS_Q30: [i64; 16] = [
    1518500250, 1276901417, 1170923762, 1121280436,
    1097253708, 1085434106, 1079572136, 1076653033,
    1075196443, 1074468888, 1074105294, 1073923544,
    1073832680, 1073787251, 1073764537, 1073753181,
];

/// sin(d) for whole degrees 0..=90, Q16.16.
const SIN_TABLE: [Fixed; 91] = [
    0, 1144, 2287, 3430, 4572, 5712, 6850, 7987, 9121, 10252,
    11380, 12505, 13626, 14742, 15855, 16962, 18064, 19161, 20252, 21336,
    22415, 23486, 24550, 25607, 26656, 27697, 28729, 29753, 30767, 31772,
    32768, 33754, 34729, 35693, 36647, 37590, 38521, 39441, 40348, 41243,
    42126, 42995, 43852, 44695, 45525, 46341, 47143, 47930, 48703, 49461,
    50203, 50931, 51643, 52339, 53020, 53684, 54332, 54963, 55578, 56175,
    56756, 57319, 57865, 58393, 58903, 59396, 59870, 60326, 60764, 61183,
    61584, 61966, 62328, 62672, 62997, 63303, 63589, 63856, 64104, 64332,
    64540, 64729, 64898, 65048, 65177, 65287, 65376, 65446, 65496, 65526,
    65536,
];

// =============================================================================
// CORE OPERATIONS (All deterministic, saturating at the i32 edges)
// =============================================================================

/// Convert a compile-time float to fixed-point.
///
/// # Warning
/// Only use at compile-time, for configuration loading or in tests.
/// NEVER in the tick loop.
///
/// # Example
/// ```
/// use tile_race::core::fixed::{to_fixed, FIXED_ONE};
/// const MY_VALUE: i32 = to_fixed(2.5);
/// assert_eq!(MY_VALUE, FIXED_ONE * 2 + FIXED_ONE / 2);
/// ```
#[inline]
pub const fn to_fixed(f: f64) -> Fixed {
    (f * (FIXED_ONE as f64)) as Fixed
}

/// Convert fixed-point to float for display and the decorative overlay.
///
/// # Warning
/// Only use for visual output. NEVER use result in simulation logic.
#[inline]
pub fn to_float(f: Fixed) -> f32 {
    f as f32 / FIXED_ONE as f32
}

/// Convert fixed-point to f64 (configuration round-trips).
#[inline]
pub fn to_f64(f: Fixed) -> f64 {
    f as f64 / FIXED_ONE as f64
}

/// Whole units to fixed-point.
#[inline]
pub const fn from_int(i: i32) -> Fixed {
    i << FIXED_SCALE
}

#[inline]
fn saturate(wide: i64) -> Fixed {
    wide.clamp(FIXED_MIN as i64, FIXED_MAX as i64) as Fixed
}

/// Multiply two fixed-point numbers.
///
/// Uses i64 intermediate to prevent overflow, then shifts back
/// (arithmetic shift, rounds toward negative infinity).
#[inline]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    let wide = (a as i64) * (b as i64);
    saturate(wide >> FIXED_SCALE)
}

/// Divide two fixed-point numbers.
///
/// Pre-shifts numerator to maintain precision.
/// Returns 0 on divide-by-zero.
#[inline]
pub fn fixed_div(a: Fixed, b: Fixed) -> Fixed {
    if b == 0 {
        return 0; // Deterministic: don't panic
    }
    let wide = (a as i64) << FIXED_SCALE;
    saturate(wide / b as i64)
}

/// Integer square root of a u64 (floor), bit-by-bit.
#[inline]
pub fn isqrt_u64(value: u64) -> u64 {
    let mut rem = value;
    let mut root = 0u64;
    let mut bit = 1u64 << 62;
    while bit > rem {
        bit >>= 2;
    }
    while bit != 0 {
        if rem >= root + bit {
            rem -= root + bit;
            root = (root >> 1) + bit;
        } else {
            root >>= 1;
        }
        bit >>= 2;
    }
    root
}

/// Square root of a fixed-point number.
///
/// Exact floor of the real root at Q16.16 precision.
/// Returns 0 for non-positive inputs.
#[inline]
pub fn fixed_sqrt(x: Fixed) -> Fixed {
    if x <= 0 {
        return 0;
    }
    isqrt_u64((x as u64) << FIXED_SCALE) as Fixed
}

/// Minimum of two fixed-point numbers.
#[inline]
pub fn fixed_min(a: Fixed, b: Fixed) -> Fixed {
    if a < b { a } else { b }
}

/// Maximum of two fixed-point numbers.
#[inline]
pub fn fixed_max(a: Fixed, b: Fixed) -> Fixed {
    if a > b { a } else { b }
}

/// Clamp a fixed-point number to a range.
#[inline]
pub fn fixed_clamp(value: Fixed, min: Fixed, max: Fixed) -> Fixed {
    fixed_max(min, fixed_min(max, value))
}

/// Round to the nearest multiple of `step`, halves away from zero.
///
/// `step` must be positive. Idempotent: rounding a value that already sits
/// on the grid returns it unchanged.
#[inline]
pub fn fixed_round_to(value: Fixed, step: Fixed) -> Fixed {
    if step <= 1 {
        return value;
    }
    let v = value as i64;
    let s = step as i64;
    let half = s / 2;
    let q = if v >= 0 { (v + half) / s } else { -((-v + half) / s) };
    saturate(q * s)
}

/// Round to whole units, halves away from zero.
#[inline]
pub fn fixed_round(value: Fixed) -> Fixed {
    fixed_round_to(value, FIXED_ONE)
}

/// Floor to whole units, returned as a plain integer.
#[inline]
pub fn fixed_floor_int(value: Fixed) -> i32 {
    value >> FIXED_SCALE
}

/// Add `modifier` to `current` without leaving `[min, max]`.
///
/// A value already outside the range in the direction of the modifier is
/// left untouched, so a fast actor is never slowed down by control input.
#[inline]
pub fn fixed_saturated_add(min: Fixed, max: Fixed, current: Fixed, modifier: Fixed) -> Fixed {
    if modifier < 0 {
        if current < min {
            return current;
        }
        fixed_max(current.saturating_add(modifier), min)
    } else {
        if current > max {
            return current;
        }
        fixed_min(current.saturating_add(modifier), max)
    }
}

// =============================================================================
// TRANSCENDENTALS (integer-only)
// =============================================================================

/// Base-2 logarithm. Returns `FIXED_MIN` for non-positive input.
pub fn fixed_log2(x: Fixed) -> Fixed {
    if x <= 0 {
        return FIXED_MIN;
    }
    let one = FIXED_ONE as i64;
    let mut y = x as i64;
    let mut int_part: i64 = 0;
    while y >= 2 * one {
        y >>= 1;
        int_part += 1;
    }
    while y < one {
        y <<= 1;
        int_part -= 1;
    }

    // y in [1, 2): extract fraction bits by repeated squaring
    let mut frac: i64 = 0;
    for bit in (0..FIXED_SCALE).rev() {
        y = (y * y) >> FIXED_SCALE;
        if y >= 2 * one {
            y >>= 1;
            frac |= 1 << bit;
        }
    }
    saturate((int_part << FIXED_SCALE) + frac)
}

/// Base-2 exponential. Saturates at `FIXED_MAX`, underflows to 0.
pub fn fixed_exp2(x: Fixed) -> Fixed {
    let int_part = x >> FIXED_SCALE; // floor
    let frac = x & (FIXED_ONE - 1);

    let mut acc: i64 = 1 << 30;
    for (i, root) in EXP2_ROOTS_Q30.iter().enumerate() {
        if frac & (1 << (FIXED_SCALE - 1 - i as i32)) != 0 {
            acc = (acc * root) >> 30;
        }
    }

    // acc is Q2.30, result wants Q16.16: shift by (int_part - 14)
    let shift = int_part - 14;
    if shift >= 32 {
        return FIXED_MAX;
    }
    if shift >= 0 {
        saturate(acc << shift)
    } else if shift > -63 {
        saturate(acc >> -shift)
    } else {
        0
    }
}

/// `base ^ exponent` for positive bases. Returns 0 for non-positive bases.
pub fn fixed_pow(base: Fixed, exponent: Fixed) -> Fixed {
    if base <= 0 {
        return 0;
    }
    let log = fixed_log2(base);
    let wide = ((log as i64) * (exponent as i64)) >> FIXED_SCALE;
    fixed_exp2(saturate(wide))
}

/// Sine of an angle in whole degrees.
pub fn fixed_sin_deg(degrees: i32) -> Fixed {
    let d = degrees.rem_euclid(360) as usize;
    match d {
        0..=90 => SIN_TABLE[d],
        91..=180 => SIN_TABLE[180 - d],
        181..=270 => -SIN_TABLE[d - 180],
        _ => -SIN_TABLE[360 - d],
    }
}

/// Cosine of an angle in whole degrees.
#[inline]
pub fn fixed_cos_deg(degrees: i32) -> Fixed {
    fixed_sin_deg(degrees.wrapping_add(90))
}

/// Serde adapter storing a [`Fixed`] as a decimal number in JSON configs.
///
/// Use with `#[serde(with = "crate::core::fixed::serde_decimal")]`.
pub mod serde_decimal {
    use super::{to_f64, Fixed, FIXED_ONE};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as f64.
    pub fn serialize<S: Serializer>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(to_f64(*value))
    }

    /// Deserialize from f64, rounding to the nearest raw step.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fixed, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Ok((value * FIXED_ONE as f64).round() as Fixed)
    }
}

// =============================================================================
// TESTS
// =============================================================================
