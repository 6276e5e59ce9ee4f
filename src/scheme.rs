//! Immutable encoding schemes: delta-of-delta time buckets and the marker
//! escape scheme with its precomputed tail table.

use std::collections::HashMap;

use crate::bits::BitStream;
use crate::unit::TimeUnit;

/// An in-band control code following the escape opcode.
pub type Marker = u8;

/// End-of-stream marker code.
pub const MARKER_END_OF_STREAM: Marker = 0;
/// Annotation marker code.
pub const MARKER_ANNOTATION: Marker = 1;
/// Time-unit marker code.
pub const MARKER_TIME_UNIT: Marker = 2;

const DEFAULT_MARKER_OPCODE: u64 = 0x100;
const DEFAULT_NUM_MARKER_OPCODE_BITS: u8 = 9;
const DEFAULT_NUM_MARKER_VALUE_BITS: u8 = 2;

const DEFAULT_BUCKET_VALUE_BITS: [u8; 3] = [7, 9, 12];

/// One delta-of-delta range: an opcode prefix plus a signed payload width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBucket {
    opcode: u64,
    num_opcode_bits: u8,
    num_value_bits: u8,
    min: i64,
    max: i64,
}

impl TimeBucket {
    fn new(opcode: u64, num_opcode_bits: u8, num_value_bits: u8) -> Self {
        // The zero bucket carries no payload; its range never matches.
        let (min, max) = if num_value_bits == 0 {
            (0, -1)
        } else if num_value_bits >= 64 {
            (i64::MIN, i64::MAX)
        } else {
            (
                -(1i64 << (num_value_bits - 1)),
                (1i64 << (num_value_bits - 1)) - 1,
            )
        };
        Self {
            opcode,
            num_opcode_bits,
            num_value_bits,
            min,
            max,
        }
    }

    /// Opcode prefix written before every payload in this range.
    #[inline]
    #[must_use]
    pub fn opcode(&self) -> u64 {
        self.opcode
    }

    /// Width of the opcode prefix.
    #[inline]
    #[must_use]
    pub fn num_opcode_bits(&self) -> u8 {
        self.num_opcode_bits
    }

    /// Width of the two's complement payload.
    #[inline]
    #[must_use]
    pub fn num_value_bits(&self) -> u8 {
        self.num_value_bits
    }

    /// Smallest delta-of-delta accepted, inclusive.
    #[inline]
    #[must_use]
    pub fn min(&self) -> i64 {
        self.min
    }

    /// Largest delta-of-delta accepted, inclusive.
    #[inline]
    #[must_use]
    pub fn max(&self) -> i64 {
        self.max
    }
}

/// Delta-of-delta buckets for one time unit.
///
/// Opcodes form a prefix code: the zero bucket is the single bit `0`, range
/// bucket `i` (1-indexed) is `i` ones followed by a zero, and the catch-all
/// default bucket is all ones one level deeper.
#[derive(Debug, Clone)]
pub struct TimeScheme {
    zero_bucket: TimeBucket,
    buckets: Vec<TimeBucket>,
    default_bucket: TimeBucket,
}

impl TimeScheme {
    /// Builds a scheme from ascending per-bucket payload widths plus the
    /// default bucket's payload width.
    #[must_use]
    pub fn new(bucket_value_bits: &[u8], default_value_bits: u8) -> Self {
        let mut buckets = Vec::with_capacity(bucket_value_bits.len());
        let mut opcode = 0u64;
        let mut num_opcode_bits = 1u8;
        for (i, &value_bits) in bucket_value_bits.iter().enumerate() {
            opcode |= 1 << (i + 1);
            buckets.push(TimeBucket::new(opcode, num_opcode_bits + 1, value_bits));
            num_opcode_bits += 1;
        }
        let default_bucket =
            TimeBucket::new(opcode | 0x1, num_opcode_bits, default_value_bits);
        Self {
            zero_bucket: TimeBucket::new(0x0, 1, 0),
            buckets,
            default_bucket,
        }
    }

    /// Bucket written when the delta-of-delta is zero.
    #[inline]
    #[must_use]
    pub fn zero_bucket(&self) -> TimeBucket {
        self.zero_bucket
    }

    /// Range buckets in ascending payload-width order.
    #[inline]
    #[must_use]
    pub fn buckets(&self) -> &[TimeBucket] {
        &self.buckets
    }

    /// Catch-all bucket for values outside every range bucket.
    #[inline]
    #[must_use]
    pub fn default_bucket(&self) -> TimeBucket {
        self.default_bucket
    }
}

/// Time encoding schemes keyed by unit.
pub type TimeSchemes = HashMap<TimeUnit, TimeScheme>;

/// The default scheme table: 7/9/12-bit range buckets everywhere, with a
/// 32-bit default bucket for coarse units and 64-bit for fine ones.
#[must_use]
pub fn default_time_schemes() -> TimeSchemes {
    let mut schemes = TimeSchemes::new();
    schemes.insert(
        TimeUnit::Second,
        TimeScheme::new(&DEFAULT_BUCKET_VALUE_BITS, 32),
    );
    schemes.insert(
        TimeUnit::Millisecond,
        TimeScheme::new(&DEFAULT_BUCKET_VALUE_BITS, 32),
    );
    schemes.insert(
        TimeUnit::Microsecond,
        TimeScheme::new(&DEFAULT_BUCKET_VALUE_BITS, 64),
    );
    schemes.insert(
        TimeUnit::Nanosecond,
        TimeScheme::new(&DEFAULT_BUCKET_VALUE_BITS, 64),
    );
    schemes
}

/// The marker escape scheme.
///
/// Special records are written as `escape opcode | marker value`. The escape
/// opcode is wider than any time-bucket opcode, so no concatenation of data
/// opcodes can produce it. The scheme precomputes, for every `(last byte,
/// bits used)` pair, the byte sequence that completes an in-progress stream
/// with the end-of-stream record; snapshots look those tails up in O(1)
/// without allocating.
#[derive(Debug, Clone)]
pub struct MarkerScheme {
    opcode: u64,
    num_opcode_bits: u8,
    num_value_bits: u8,
    end_of_stream: Marker,
    annotation: Marker,
    time_unit: Marker,
    /// Indexed by `byte * 8 + (pos - 1)`.
    tails: Vec<Vec<u8>>,
}

impl MarkerScheme {
    /// Builds a scheme and its full 256x8 tail table.
    #[must_use]
    pub fn new(
        opcode: u64,
        num_opcode_bits: u8,
        num_value_bits: u8,
        end_of_stream: Marker,
        annotation: Marker,
        time_unit: Marker,
    ) -> Self {
        let mut tails = Vec::with_capacity(256 * 8);
        for byte in 0u64..256 {
            for pos in 1..=8u8 {
                let mut tmp = BitStream::new();
                tmp.write_bits(byte >> (8 - pos), pos);
                tmp.write_bits(opcode, num_opcode_bits);
                tmp.write_bits(u64::from(end_of_stream), num_value_bits);
                let (bytes, _) = tmp.raw_bytes();
                tails.push(bytes.to_vec());
            }
        }
        Self {
            opcode,
            num_opcode_bits,
            num_value_bits,
            end_of_stream,
            annotation,
            time_unit,
            tails,
        }
    }

    /// Escape opcode value.
    #[inline]
    #[must_use]
    pub fn opcode(&self) -> u64 {
        self.opcode
    }

    /// Width of the escape opcode.
    #[inline]
    #[must_use]
    pub fn num_opcode_bits(&self) -> u8 {
        self.num_opcode_bits
    }

    /// Width of the marker value following the escape opcode.
    #[inline]
    #[must_use]
    pub fn num_value_bits(&self) -> u8 {
        self.num_value_bits
    }

    /// End-of-stream marker value.
    #[inline]
    #[must_use]
    pub fn end_of_stream(&self) -> Marker {
        self.end_of_stream
    }

    /// Annotation marker value.
    #[inline]
    #[must_use]
    pub fn annotation(&self) -> Marker {
        self.annotation
    }

    /// Time-unit marker value.
    #[inline]
    #[must_use]
    pub fn time_unit(&self) -> Marker {
        self.time_unit
    }

    /// The bytes that seal a stream whose last byte is `last_byte` with
    /// `pos` (1..=8) bits used: the used bits followed by the end-of-stream
    /// record, zero-padded to a byte boundary.
    #[inline]
    #[must_use]
    pub fn tail(&self, last_byte: u8, pos: u8) -> &[u8] {
        debug_assert!((1..=8).contains(&pos));
        &self.tails[usize::from(last_byte) * 8 + usize::from(pos) - 1]
    }
}

impl Default for MarkerScheme {
    fn default() -> Self {
        Self::new(
            DEFAULT_MARKER_OPCODE,
            DEFAULT_NUM_MARKER_OPCODE_BITS,
            DEFAULT_NUM_MARKER_VALUE_BITS,
            MARKER_END_OF_STREAM,
            MARKER_ANNOTATION,
            MARKER_TIME_UNIT,
        )
    }
}
