//! `tszip` - streaming Gorilla-style (TSZ) compression for timestamped
//! `f64` series.
//!
//! A bit-packed codec for ordered (timestamp, value) observations with
//! optional byte annotations and an in-band time-unit declaration.
//! Timestamps compress via delta-of-delta encoding into variable-width
//! buckets; values compress by XOR-ing against the previous IEEE-754 bit
//! pattern and writing only the meaningful window. A steady series costs
//! 2 bits per datapoint.
//!
//! # Features
//! - **Streaming**: datapoints are appended one at a time; nothing is
//!   buffered besides the compressed bits themselves.
//! - **Snapshots**: [`Encoder::stream`] yields a readable byte image of an
//!   unsealed stream at any time, in O(1) and without allocating, thanks to
//!   a precomputed tail table.
//! - **In-band markers**: annotation and time-unit changes travel inside
//!   the stream behind a reserved escape opcode, as does the end-of-stream
//!   record.
//! - **Pooling hooks**: byte buffers and encoder instances can be recycled
//!   through capability traits on [`Options`].
//!
//! # Example
//! ```
//! use tszip::{decode, DataPoint, Encoder, Options, TimeUnit};
//!
//! let mut encoder = Encoder::new(0, Vec::new(), Options::new());
//! encoder
//!     .encode(DataPoint::new(0, 12.0), TimeUnit::Second, &[])
//!     .unwrap();
//! encoder
//!     .encode(DataPoint::new(1_000_000_000, 12.5), TimeUnit::Second, &[])
//!     .unwrap();
//! encoder.done();
//!
//! let samples = decode(encoder.stream().unwrap(), &Options::new()).unwrap();
//! assert_eq!(samples.len(), 2);
//! assert_eq!(samples[1].datapoint.value, 12.5);
//! ```
//!
//! # Stream layout
//!
//! All fields are bit-packed MSB-first:
//!
//! - **Prelude**: 64-bit start time normalized to the first datapoint's
//!   unit.
//! - **Per datapoint**: optional annotation record (`escape | marker |
//!   varint(len - 1) | bytes`), optional time-unit record (`escape | marker |
//!   unit code`), delta-of-delta (`0`, or bucket opcode plus a two's
//!   complement payload), value (`0` for identical bits, `10` plus the
//!   previous window, or `11` plus an explicit window).
//! - **Trailer**: the end-of-stream record, committed by
//!   [`Encoder::done`] or synthesized per-snapshot by [`Encoder::stream`].
//!
//! The scheme is not self-describing: both sides must agree on the bucket
//! and marker configuration ([`Options`]) out of band.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

pub mod bits;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod options;
pub mod scheme;
pub mod segment;
pub mod unit;

pub use decoder::{decode, Iter, Sample};
pub use encoder::{DataPoint, Encoder};
pub use error::{DecodeError, EncodeError};
pub use options::{BytesPool, EncoderPool, Options};
pub use scheme::{MarkerScheme, TimeBucket, TimeScheme, TimeSchemes};
pub use segment::{Segment, SegmentReader};
pub use unit::TimeUnit;

#[cfg(test)]
mod tests;
