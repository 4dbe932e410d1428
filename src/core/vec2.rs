//! Fixed-Point 2D Vector
//!
//! Deterministic 2D vector operations for actor physics.
//! World coordinates are y-down: positive `y` points toward the floor.

use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign, Neg};
use serde::{Serialize, Deserialize};

use super::fixed::{
    Fixed, FIXED_ONE, FIXED_SCALE, FIXED_MAX, FIXED_MIN,
    fixed_mul, fixed_div, fixed_clamp, fixed_round_to, fixed_cos_deg, fixed_sin_deg,
    isqrt_u64, to_float,
};

/// 2D vector with fixed-point components.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FixedVec2 {
    /// X component (Q16.16 fixed-point)
    pub x: Fixed,
    /// Y component (Q16.16 fixed-point)
    pub y: Fixed,
}

impl FixedVec2 {
    /// Zero vector
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Unit vector pointing right (+X)
    pub const RIGHT: Self = Self { x: FIXED_ONE, y: 0 };

    /// Unit vector pointing up (-Y, screen space)
    pub const UP: Self = Self { x: 0, y: -FIXED_ONE };

    /// Unit vector pointing left (-X)
    pub const LEFT: Self = Self { x: -FIXED_ONE, y: 0 };

    /// Unit vector pointing down (+Y, screen space)
    pub const DOWN: Self = Self { x: 0, y: FIXED_ONE };

    /// Create a new vector from fixed-point components.
    #[inline]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from whole-unit integer components.
    #[inline]
    pub const fn from_ints(x: i32, y: i32) -> Self {
        Self {
            x: x << FIXED_SCALE,
            y: y << FIXED_SCALE,
        }
    }

    /// Unit vector for an angle in whole degrees (0 = right, 90 = down).
    #[inline]
    pub fn from_degrees(degrees: i32) -> Self {
        Self {
            x: fixed_cos_deg(degrees),
            y: fixed_sin_deg(degrees),
        }
    }

    /// True when both components are zero.
    #[inline]
    pub fn is_zero(self) -> bool {
        self.x == 0 && self.y == 0
    }

    /// Add another vector (saturating).
    #[inline]
    pub fn add(self, other: Self) -> Self {
        Self {
            x: self.x.saturating_add(other.x),
            y: self.y.saturating_add(other.y),
        }
    }

    /// Subtract another vector (saturating).
    #[inline]
    pub fn sub(self, other: Self) -> Self {
        Self {
            x: self.x.saturating_sub(other.x),
            y: self.y.saturating_sub(other.y),
        }
    }

    /// Scale by a fixed-point scalar.
    #[inline]
    pub fn scale(self, scalar: Fixed) -> Self {
        Self {
            x: fixed_mul(self.x, scalar),
            y: fixed_mul(self.y, scalar),
        }
    }

    /// Scale by an integer scalar.
    #[inline]
    pub fn scale_int(self, scalar: i32) -> Self {
        Self {
            x: self.x.saturating_mul(scalar),
            y: self.y.saturating_mul(scalar),
        }
    }

    /// Divide by a fixed-point scalar.
    #[inline]
    pub fn div_scalar(self, scalar: Fixed) -> Self {
        Self {
            x: fixed_div(self.x, scalar),
            y: fixed_div(self.y, scalar),
        }
    }

    /// Divide by an integer.
    #[inline]
    pub fn div_int(self, divisor: i32) -> Self {
        if divisor == 0 {
            return Self::ZERO;
        }
        Self {
            x: self.x / divisor,
            y: self.y / divisor,
        }
    }

    /// Squared length as a wide Q32.32 value (never overflows).
    #[inline]
    pub fn length_squared_wide(self) -> u64 {
        let x = self.x as i64;
        let y = self.y as i64;
        ((x * x) as u64).saturating_add((y * y) as u64)
    }

    /// Squared length, saturating at `FIXED_MAX`.
    #[inline]
    pub fn length_squared(self) -> Fixed {
        (self.length_squared_wide() >> FIXED_SCALE).min(FIXED_MAX as u64) as Fixed
    }

    /// Length (magnitude). Exact floor at Q16.16 precision.
    #[inline]
    pub fn length(self) -> Fixed {
        isqrt_u64(self.length_squared_wide()).min(FIXED_MAX as u64) as Fixed
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(self, other: Self) -> Fixed {
        self.sub(other).length()
    }

    /// Squared distance, wide, for comparisons against long radii.
    #[inline]
    pub fn distance_squared_wide(self, other: Self) -> u64 {
        self.sub(other).length_squared_wide()
    }

    /// Normalize to unit length.
    /// Returns ZERO if length is zero.
    #[inline]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == 0 {
            return Self::ZERO;
        }
        self.div_scalar(len)
    }

    /// Rescale to the given length, keeping direction.
    #[inline]
    pub fn with_length(self, length: Fixed) -> Self {
        self.normalize().scale(length)
    }

    /// Dot product with another vector.
    #[inline]
    pub fn dot(self, other: Self) -> Fixed {
        let wide = (self.x as i64) * (other.x as i64) + (self.y as i64) * (other.y as i64);
        (wide >> FIXED_SCALE).clamp(FIXED_MIN as i64, FIXED_MAX as i64) as Fixed
    }

    /// Clamp both components to a range.
    #[inline]
    pub fn clamp(self, min: Fixed, max: Fixed) -> Self {
        Self {
            x: fixed_clamp(self.x, min, max),
            y: fixed_clamp(self.y, min, max),
        }
    }

    /// Round both components to a grid of `step`, halves away from zero.
    #[inline]
    pub fn round_to(self, step: Fixed) -> Self {
        Self {
            x: fixed_round_to(self.x, step),
            y: fixed_round_to(self.y, step),
        }
    }

    /// Linear interpolation between two vectors.
    /// t = 0 returns self, t = FIXED_ONE returns other.
    #[inline]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        let dx = other.x.wrapping_sub(self.x);
        let dy = other.y.wrapping_sub(self.y);
        Self {
            x: self.x.wrapping_add(fixed_mul(dx, t)),
            y: self.y.wrapping_add(fixed_mul(dy, t)),
        }
    }

    /// Negate both components.
    #[inline]
    pub fn negate(self) -> Self {
        Self {
            x: self.x.saturating_neg(),
            y: self.y.saturating_neg(),
        }
    }

    /// Convert to float tuple for the decorative overlay and logs.
    #[inline]
    pub fn to_floats(self) -> (f32, f32) {
        (to_float(self.x), to_float(self.y))
    }
}

// Operator overloads for ergonomics
impl Add for FixedVec2 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        FixedVec2::add(self, rhs)
    }
}

impl AddAssign for FixedVec2 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = FixedVec2::add(*self, rhs);
    }
}

impl Sub for FixedVec2 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        FixedVec2::sub(self, rhs)
    }
}

impl SubAssign for FixedVec2 {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = FixedVec2::sub(*self, rhs);
    }
}

impl Neg for FixedVec2 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        self.negate()
    }
}

impl fmt::Debug for FixedVec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (fx, fy) = self.to_floats();
        write!(f, "Vec2({:.3}, {:.3})", fx, fy)
    }
}

impl fmt::Display for FixedVec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (fx, fy) = self.to_floats();
        write!(f, "({:.3}, {:.3})", fx, fy)
    }
}

// =============================================================================
// TESTS
// =============================================================================
