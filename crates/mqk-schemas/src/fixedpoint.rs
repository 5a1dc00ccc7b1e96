//! Fixed-point money type.
//!
//! All money amounts in this system (prices, quantities-as-notional, fees,
//! cash, P&L) use a 1e-6 (micros) fixed-point representation stored as an
//! `i64`. Using raw `i64` for money is error-prone: it allows accidental
//! arithmetic with unrelated integers (order ids, day counters) without any
//! compile-time signal.
//!
//! `Micros` wraps the raw `i64` so the type system prevents mixing `Micros`
//! with unrelated `i64` values in arithmetic. 1 unit = `Micros(1_000_000)`.
//! Decimal-string conversion only happens at a serialization boundary.

use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// A fixed-point monetary amount at 1e-6 scale (micros).
///
/// There is intentionally no `From<i64>` impl; callers must be deliberate
/// about when a raw integer represents a monetary amount. Serializes as a
/// plain `i64` so wire records stay compact; use [`Micros::to_decimal_string`]
/// at boundaries that want a human-readable decimal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Micros(i64);

impl Micros {
    pub const ZERO: Micros = Micros(0);
    pub const MAX: Micros = Micros(i64::MAX);
    pub const MIN: Micros = Micros(i64::MIN);

    /// Micros per whole unit (1.0 in fixed-point).
    pub const SCALE: i64 = 1_000_000;

    #[inline]
    pub const fn new(raw: i64) -> Self {
        Micros(raw)
    }

    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Construct from a decimal `f64`, rounding to the nearest micro.
    /// Only for boundaries (config, wire records); never for accumulation.
    pub fn from_decimal(value: f64) -> Self {
        Micros((value * Self::SCALE as f64).round() as i64)
    }

    /// Render as an `f64` decimal. Only for boundaries; never re-fed into
    /// `Micros` arithmetic without a round-trip through [`Micros::from_decimal`].
    pub fn to_decimal(self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    #[inline]
    pub fn saturating_add(self, rhs: Micros) -> Micros {
        Micros(self.0.saturating_add(rhs.0))
    }

    #[inline]
    pub fn saturating_sub(self, rhs: Micros) -> Micros {
        Micros(self.0.saturating_sub(rhs.0))
    }

    #[inline]
    pub fn abs(self) -> Micros {
        Micros(self.0.saturating_abs())
    }

    #[inline]
    pub fn signum(self) -> i64 {
        self.0.signum()
    }

    #[inline]
    pub fn is_non_negative(self) -> bool {
        self.0 >= 0
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn max(self, other: Micros) -> Micros {
        if self.0 >= other.0 {
            self
        } else {
            other
        }
    }

    #[inline]
    pub fn min(self, other: Micros) -> Micros {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    /// Multiply a per-unit price by an integer quantity (also in micros
    /// units, i.e. a `Micros` quantity), returning a `Micros` notional.
    ///
    /// Uses `i128` intermediate arithmetic and divides back down by the
    /// scale so two micros-scaled operands multiply to a micros-scaled
    /// result instead of a scale² result; saturates on overflow rather than
    /// silently wrapping, since a notional overflow is a critical error.
    pub fn mul_qty(self, qty: Micros) -> Micros {
        let product = (self.0 as i128) * (qty.0 as i128) / (Self::SCALE as i128);
        if product > i64::MAX as i128 {
            Micros::MAX
        } else if product < i64::MIN as i128 {
            Micros::MIN
        } else {
            Micros(product as i64)
        }
    }

    /// Divide this amount by a `Micros` divisor, producing a plain ratio
    /// (not a further `Micros`). Returns `None` if the divisor is zero.
    pub fn div_ratio(self, divisor: Micros) -> Option<f64> {
        if divisor.0 == 0 {
            None
        } else {
            Some(self.0 as f64 / divisor.0 as f64)
        }
    }

    /// Scale by a plain `f64` fraction (slippage, fee rate, partial-fill
    /// ratio) — a boundary operation like `from_decimal`, not part of the
    /// micros-to-micros arithmetic core.
    pub fn mul_fraction(self, fraction: f64) -> Micros {
        Micros((self.0 as f64 * fraction).round() as i64)
    }
}

impl Add for Micros {
    type Output = Micros;
    #[inline]
    fn add(self, rhs: Micros) -> Micros {
        Micros(self.0 + rhs.0)
    }
}

impl Sub for Micros {
    type Output = Micros;
    #[inline]
    fn sub(self, rhs: Micros) -> Micros {
        Micros(self.0 - rhs.0)
    }
}

impl Neg for Micros {
    type Output = Micros;
    #[inline]
    fn neg(self) -> Micros {
        Micros(-self.0)
    }
}

impl AddAssign for Micros {
    #[inline]
    fn add_assign(&mut self, rhs: Micros) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Micros {
    #[inline]
    fn sub_assign(&mut self, rhs: Micros) {
        self.0 -= rhs.0;
    }
}

impl std::fmt::Display for Micros {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let units = self.0 / Self::SCALE;
        let frac = (self.0 % Self::SCALE).abs();
        if self.0 < 0 && units == 0 {
            write!(f, "-{units}.{frac:06}")
        } else {
            write!(f, "{units}.{frac:06}")
        }
    }
}
