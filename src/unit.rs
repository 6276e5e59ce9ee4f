//! Time-unit enumeration driving timestamp normalization.

use serde::{Deserialize, Serialize};

/// Coarseness of the timestamps carried by a stream.
///
/// The discriminant is the wire code written by a time-unit record, so
/// encoders and decoders must agree on this mapping. `Second` is the
/// default unit; `None` is a placeholder that never passes
/// [`TimeUnit::is_valid`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum TimeUnit {
    #[default]
    Second = 0,
    Millisecond = 1,
    Microsecond = 2,
    Nanosecond = 3,
    None = 4,
}

impl TimeUnit {
    /// The one-byte wire code.
    #[inline]
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Maps a wire code back to a unit. Unknown codes map to `None`.
    #[inline]
    #[must_use]
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Second,
            1 => Self::Millisecond,
            2 => Self::Microsecond,
            3 => Self::Nanosecond,
            _ => Self::None,
        }
    }

    /// True for units that may be written to a stream.
    #[inline]
    #[must_use]
    pub fn is_valid(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Nanoseconds per unit, or `None` for the placeholder unit.
    #[inline]
    #[must_use]
    pub fn nanoseconds(self) -> Option<i64> {
        match self {
            Self::Second => Some(1_000_000_000),
            Self::Millisecond => Some(1_000_000),
            Self::Microsecond => Some(1_000),
            Self::Nanosecond => Some(1),
            Self::None => None,
        }
    }
}
