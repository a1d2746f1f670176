// ============================================================================
// Tick Values
// Integer prices and quantities
// ============================================================================

use super::errors::{NumericError, NumericResult};
use std::fmt;
use std::ops::{Add, Sub};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Defines an i64 newtype with the shared checked-arithmetic surface.
macro_rules! tick_value {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        #[repr(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Zero value
            pub const ZERO: Self = Self(0);

            /// Maximum representable value
            pub const MAX: Self = Self(i64::MAX);

            #[inline]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Underlying tick count.
            #[inline]
            pub const fn raw(self) -> i64 {
                self.0
            }

            #[inline]
            pub const fn is_zero(self) -> bool {
                self.0 == 0
            }

            #[inline]
            pub const fn is_positive(self) -> bool {
                self.0 > 0
            }

            #[inline]
            pub const fn is_negative(self) -> bool {
                self.0 < 0
            }

            /// Checked addition.
            ///
            /// # Errors
            /// Returns `Overflow` or `Underflow` if the result is out of range.
            #[inline]
            pub fn checked_add(self, rhs: Self) -> NumericResult<Self> {
                self.0.checked_add(rhs.0).map(Self).ok_or(if rhs.0 > 0 {
                    NumericError::Overflow
                } else {
                    NumericError::Underflow
                })
            }

            /// Checked subtraction.
            ///
            /// # Errors
            /// Returns `Overflow` or `Underflow` if the result is out of range.
            #[inline]
            pub fn checked_sub(self, rhs: Self) -> NumericResult<Self> {
                self.0.checked_sub(rhs.0).map(Self).ok_or(if rhs.0 > 0 {
                    NumericError::Underflow
                } else {
                    NumericError::Overflow
                })
            }

            /// Addition clamped at `MAX`. Used for liquidity sums, where
            /// "more than anything representable" is as good as `MAX`.
            #[inline]
            pub fn saturating_add(self, rhs: Self) -> Self {
                Self(self.0.saturating_add(rhs.0))
            }
        }

        impl From<i64> for $name {
            #[inline]
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl Add for $name {
            type Output = Self;

            /// Unchecked addition (panics on overflow in debug builds).
            /// Prefer `checked_add` in production code.
            #[inline]
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = Self;

            /// Unchecked subtraction (panics on overflow in debug builds).
            /// Prefer `checked_sub` in production code.
            #[inline]
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

tick_value!(
    /// Price expressed as an integer number of ticks.
    ///
    /// The venue decides what one tick is worth; the engine only compares,
    /// floors and copies prices.
    Price
);

tick_value!(
    /// Quantity expressed as an integer number of units.
    ///
    /// Signed so that malformed ingress (a negative size) is representable and
    /// can be rejected instead of wrapping.
    Quantity
);

impl Price {
    /// Round down to the nearest multiple of `tick_size`.
    ///
    /// # Errors
    /// Returns `InvalidTickSize` if `tick_size` is not positive, and
    /// `Underflow` if the floored value falls below `i64::MIN`.
    ///
    /// # Example
    /// ```
    /// use tick_matching_engine::numeric::Price;
    ///
    /// let p = Price::new(1_017).floor_to_tick(Price::new(5)).unwrap();
    /// assert_eq!(p, Price::new(1_015));
    /// ```
    #[inline]
    pub fn floor_to_tick(self, tick_size: Price) -> NumericResult<Self> {
        if tick_size.0 <= 0 {
            return Err(NumericError::InvalidTickSize);
        }
        self.0
            .div_euclid(tick_size.0)
            .checked_mul(tick_size.0)
            .map(Self)
            .ok_or(NumericError::Underflow)
    }

    /// Price times quantity, in ticks × units.
    ///
    /// Returns a Result because multiplication can overflow.
    #[inline]
    pub fn checked_notional(self, quantity: Quantity) -> NumericResult<i64> {
        self.0
            .checked_mul(quantity.raw())
            .ok_or(NumericError::Overflow)
    }
}
