//! Error types for encoding and decoding operations.

use std::fmt;

use crate::unit::TimeUnit;

/// Error returned when appending a datapoint fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// The encoder has been sealed or closed.
    NotWritable,
    /// No time encoding scheme is registered for the supplied unit.
    UnknownTimeUnit(TimeUnit),
    /// The supplied unit carries no nanoseconds magnitude.
    InvalidTimeUnit(TimeUnit),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotWritable => write!(f, "encoder is not writable"),
            Self::UnknownTimeUnit(tu) => {
                write!(f, "time encoding scheme for time unit {tu:?} doesn't exist")
            }
            Self::InvalidTimeUnit(tu) => {
                write!(f, "time unit {tu:?} has no nanoseconds magnitude")
            }
        }
    }
}

impl std::error::Error for EncodeError {}

/// Error returned when decoding a stream fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The stream ended in the middle of a record.
    UnexpectedEnd,
    /// A record referenced a unit with no scheme or magnitude.
    UnknownTimeUnit(TimeUnit),
    /// A marker value outside the scheme's defined set.
    UnknownMarker(u8),
    /// An annotation record decoded to a non-positive length.
    InvalidAnnotationLength(i64),
    /// A value record described an impossible leading/trailing window.
    InvalidValueWindow,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEnd => write!(f, "unexpected end of encoded stream"),
            Self::UnknownTimeUnit(tu) => {
                write!(f, "stream references unknown time unit {tu:?}")
            }
            Self::UnknownMarker(marker) => write!(f, "unknown marker value {marker}"),
            Self::InvalidAnnotationLength(len) => {
                write!(f, "annotation length {len} is not positive")
            }
            Self::InvalidValueWindow => {
                write!(f, "value record describes an impossible bit window")
            }
        }
    }
}

impl std::error::Error for DecodeError {}
