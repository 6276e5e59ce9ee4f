//! Streaming encoder: bucketed delta-of-delta timestamps, XOR-compressed
//! values, in-band annotation/time-unit/end-of-stream records.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bits::{put_varint, BitStream, MAX_VARINT_LEN};
use crate::error::EncodeError;
use crate::options::Options;
use crate::scheme::{Marker, MarkerScheme, TimeScheme};
use crate::segment::Segment;
use crate::unit::TimeUnit;

/// A single time-series observation: nanoseconds since the Unix epoch and an
/// IEEE-754 double payload. NaN and infinities are legal; bit patterns are
/// preserved exactly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub timestamp: i64,
    pub value: f64,
}

impl DataPoint {
    /// Creates a new `DataPoint`.
    #[inline]
    #[must_use]
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

const OPCODE_ZERO_VALUE_XOR: u64 = 0x0;
const OPCODE_CONTAINED_VALUE_XOR: u64 = 0x2;
const OPCODE_UNCONTAINED_VALUE_XOR: u64 = 0x3;

/// Initial buffer capacity when no bytes pool is configured.
const INITIAL_BUFFER_CAPACITY: usize = 64;

/// The streaming compressor.
///
/// An encoder is anchored at a start time and consumes datapoints in
/// timestamp order. At any point after the first successful
/// [`encode`](Encoder::encode) the caller may take a readable snapshot with
/// [`stream`](Encoder::stream) without disturbing the live state, and
/// eventually seal the stream with [`done`](Encoder::done).
///
/// Encoders are single-owner: no internal locking is performed.
///
/// # Example
/// ```
/// use tszip::{DataPoint, Encoder, Options, TimeUnit};
///
/// let mut encoder = Encoder::new(0, Vec::new(), Options::new());
/// encoder
///     .encode(DataPoint::new(0, 12.0), TimeUnit::Second, &[])
///     .unwrap();
/// encoder
///     .encode(DataPoint::new(1_000_000_000, 12.5), TimeUnit::Second, &[])
///     .unwrap();
/// encoder.done();
/// assert!(encoder.stream().is_some());
/// ```
pub struct Encoder {
    out: BitStream,
    opts: Options,

    // tracking state
    t: i64,
    dt: i64,
    vb: u64,
    xor: u64,

    ant: Vec<u8>,
    tu: TimeUnit,

    writable: bool,
    closed: bool,
}

impl Encoder {
    /// Creates an encoder anchored at `start` (nanoseconds since epoch)
    /// writing into `buffer`.
    ///
    /// An empty buffer starts a fresh stream; when a bytes pool is
    /// configured the initial allocation is deferred until
    /// [`reset`](Encoder::reset). A non-empty buffer is installed as a
    /// previously encoded image and is readable only: the bit cursor inside
    /// its final byte cannot be recovered from the bytes alone.
    #[must_use]
    pub fn new(start: i64, buffer: Vec<u8>, opts: Options) -> Self {
        let mut buffer = buffer;
        if buffer.capacity() == 0 && opts.bytes_pool().is_none() {
            buffer = Vec::with_capacity(INITIAL_BUFFER_CAPACITY);
        }
        let writable = buffer.is_empty();
        Self {
            out: BitStream::with_buffer(buffer),
            opts,
            t: start,
            dt: 0,
            vb: 0,
            xor: 0,
            ant: Vec::new(),
            tu: TimeUnit::default(),
            writable,
            closed: false,
        }
    }

    /// Appends one datapoint with its time unit and annotation.
    ///
    /// An empty annotation means "unchanged"; a non-empty one that differs
    /// from the sticky annotation is written in-band and becomes sticky.
    /// The same applies to the time unit, gated by
    /// [`TimeUnit::is_valid`].
    ///
    /// # Errors
    /// - [`EncodeError::NotWritable`] after [`done`](Encoder::done) or on an
    ///   encoder holding an imported image.
    /// - [`EncodeError::InvalidTimeUnit`] when `tu` has no nanoseconds
    ///   magnitude.
    /// - [`EncodeError::UnknownTimeUnit`] when no scheme is registered for
    ///   `tu`.
    ///
    /// A failed call writes nothing and leaves every tracking field
    /// unchanged.
    pub fn encode(
        &mut self,
        dp: DataPoint,
        tu: TimeUnit,
        annotation: &[u8],
    ) -> Result<(), EncodeError> {
        if !self.writable {
            return Err(EncodeError::NotWritable);
        }
        // Every fallible lookup happens before the first bit is written.
        let unit_ns = tu
            .nanoseconds()
            .ok_or(EncodeError::InvalidTimeUnit(tu))?;
        let schemes = Arc::clone(self.opts.time_schemes());
        let scheme = schemes
            .get(&tu)
            .ok_or(EncodeError::UnknownTimeUnit(tu))?;

        if self.out.is_empty() {
            // Prelude: the anchor normalized to the first datapoint's unit.
            self.out.write_bits((self.t / unit_ns) as u64, 64);
            self.write_time(dp.timestamp, annotation, tu, unit_ns, scheme);
            self.write_first_value(dp.value);
        } else {
            self.write_time(dp.timestamp, annotation, tu, unit_ns, scheme);
            self.write_next_value(dp.value);
        }
        Ok(())
    }

    fn write_time(
        &mut self,
        timestamp: i64,
        annotation: &[u8],
        tu: TimeUnit,
        unit_ns: i64,
        scheme: &TimeScheme,
    ) {
        self.write_annotation(annotation);
        self.write_time_unit(tu);

        let dt = timestamp - self.t;
        self.write_delta_of_delta(dt - self.dt, unit_ns, scheme);
        self.t = timestamp;
        self.dt = dt;
    }

    fn write_annotation(&mut self, annotation: &[u8]) {
        if annotation.is_empty() || annotation == self.ant.as_slice() {
            return;
        }
        let scheme = Arc::clone(self.opts.marker_scheme());
        write_marker(&mut self.out, &scheme, scheme.annotation());
        // len - 1: annotations are never empty, so short lengths stay within
        // a single varint byte
        let mut buf = [0u8; MAX_VARINT_LEN];
        let n = put_varint(&mut buf, annotation.len() as i64 - 1);
        self.out.write_bytes(&buf[..n]);
        self.out.write_bytes(annotation);
        self.ant.clear();
        self.ant.extend_from_slice(annotation);
    }

    fn write_time_unit(&mut self, tu: TimeUnit) {
        if !tu.is_valid() || tu == self.tu {
            return;
        }
        let scheme = Arc::clone(self.opts.marker_scheme());
        write_marker(&mut self.out, &scheme, scheme.time_unit());
        self.out.write_byte(tu.code());
        self.tu = tu;
    }

    fn write_delta_of_delta(&mut self, dod_ns: i64, unit_ns: i64, scheme: &TimeScheme) {
        let dod = dod_ns / unit_ns;
        if dod == 0 {
            let zero = scheme.zero_bucket();
            self.out.write_bits(zero.opcode(), zero.num_opcode_bits());
            return;
        }
        for bucket in scheme.buckets() {
            if dod >= bucket.min() && dod <= bucket.max() {
                self.out.write_bits(bucket.opcode(), bucket.num_opcode_bits());
                self.out.write_bits(dod as u64, bucket.num_value_bits());
                return;
            }
        }
        let default = scheme.default_bucket();
        self.out
            .write_bits(default.opcode(), default.num_opcode_bits());
        self.out.write_bits(dod as u64, default.num_value_bits());
    }

    fn write_first_value(&mut self, value: f64) {
        self.vb = value.to_bits();
        self.xor = self.vb;
        self.out.write_bits(self.vb, 64);
    }

    fn write_next_value(&mut self, value: f64) {
        let vb = value.to_bits();
        let xor = self.vb ^ vb;
        self.write_xor(self.xor, xor);
        self.vb = vb;
        self.xor = xor;
    }

    fn write_xor(&mut self, prev_xor: u64, cur_xor: u64) {
        if cur_xor == 0 {
            self.out.write_bits(OPCODE_ZERO_VALUE_XOR, 1);
            return;
        }
        let prev_leading = prev_xor.leading_zeros() as u8;
        let prev_trailing = prev_xor.trailing_zeros() as u8;
        let cur_leading = cur_xor.leading_zeros() as u8;
        let cur_trailing = cur_xor.trailing_zeros() as u8;
        if cur_leading >= prev_leading && cur_trailing >= prev_trailing {
            // The meaningful bits fit inside the previous xor's window.
            self.out.write_bits(OPCODE_CONTAINED_VALUE_XOR, 2);
            self.out.write_bits(
                cur_xor >> prev_trailing,
                64 - prev_leading - prev_trailing,
            );
            return;
        }
        self.out.write_bits(OPCODE_UNCONTAINED_VALUE_XOR, 2);
        self.out.write_bits(u64::from(cur_leading), 6);
        let meaningful = 64 - cur_leading - cur_trailing;
        // meaningful is at least 1, so meaningful - 1 fits in 6 bits
        self.out.write_bits(u64::from(meaningful - 1), 6);
        self.out.write_bits(cur_xor >> cur_trailing, meaningful);
    }

    /// Takes a readable snapshot of the stream without mutating it.
    ///
    /// Returns `None` when nothing has been encoded. On a live encoder the
    /// snapshot is the clean head bytes plus a detached tail completing the
    /// in-progress byte with the end-of-stream record; on a sealed encoder
    /// the tail is empty because [`done`](Encoder::done) already committed
    /// it. The segment borrows the encoder, so it is valid exactly until the
    /// next mutating call.
    #[must_use]
    pub fn stream(&self) -> Option<Segment<'_>> {
        if self.out.is_empty() {
            return None;
        }
        let (bytes, pos) = self.out.raw_bytes();
        if !self.writable {
            // `done` already wrote the tail into the stream.
            return Some(Segment::new(bytes, &[]));
        }
        let last = bytes.len() - 1;
        let tail = self.opts.marker_scheme().tail(bytes[last], pos);
        Some(Segment::new(&bytes[..last], tail))
    }

    /// Seals the stream: commits the end-of-stream tail into the buffer and
    /// refuses further writes. Idempotent; on an empty encoder only the
    /// writable flag changes.
    pub fn done(&mut self) {
        if !self.writable {
            return;
        }
        self.writable = false;
        if self.out.is_empty() {
            return;
        }

        let (bytes, pos) = self.out.raw_bytes();
        let len = bytes.len();
        let last = bytes[len - 1];

        let scheme = Arc::clone(self.opts.marker_scheme());
        let tail = scheme.tail(last, pos);

        // Replace the in-progress byte with the sealed tail.
        let mut buffer = self.out.take();
        buffer.truncate(len - 1);
        self.out.reset(buffer);
        self.out.write_bytes(tail);
    }

    /// Reinitializes the encoder for a fresh stream anchored at `start`,
    /// drawing the buffer from the bytes pool when one is configured.
    pub fn reset(&mut self, start: i64, capacity: usize) {
        let mut buffer = match self.opts.bytes_pool() {
            Some(pool) => pool.get(capacity),
            None => Vec::with_capacity(capacity),
        };
        buffer.clear();
        self.reset_with_data(start, buffer);
    }

    /// Reinstalls an existing byte image, e.g. to re-read a previously
    /// encoded stream through [`stream`](Encoder::stream).
    ///
    /// Non-empty data is readable only: the bit cursor inside the final byte
    /// is not recoverable from the bytes alone, so continuing to append
    /// would corrupt the stream. The encoder is writable only when `data`
    /// is empty.
    pub fn reset_with_data(&mut self, start: i64, data: Vec<u8>) {
        self.writable = data.is_empty();
        self.out.reset(data);
        self.t = start;
        self.dt = 0;
        self.vb = 0;
        self.xor = 0;
        self.ant.clear();
        self.tu = TimeUnit::None;
        self.closed = false;
    }

    /// Finalizes the encoder: hands the buffer to the bytes pool and `self`
    /// to the encoder pool when configured. Consuming the encoder makes a
    /// double close unrepresentable.
    pub fn close(mut self) {
        self.writable = false;
        self.closed = true;

        if let Some(pool) = self.opts.bytes_pool() {
            // Detach the buffer first so a pooled encoder can never touch
            // pooled memory again.
            let buffer = self.out.take();
            pool.put(buffer);
        }

        let encoder_pool = self.opts.encoder_pool().cloned();
        if let Some(pool) = encoder_pool {
            pool.put(self);
        }
    }

    /// True while the encoder accepts datapoints.
    #[inline]
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// True once the encoder has been closed (pooled encoders stay closed
    /// until [`reset`](Encoder::reset)).
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[cfg(test)]
    pub(crate) fn bit_len(&self) -> usize {
        self.out.bit_len()
    }
}

/// Writes the escape opcode followed by a marker value.
fn write_marker(out: &mut BitStream, scheme: &MarkerScheme, marker: Marker) {
    out.write_bits(scheme.opcode(), scheme.num_opcode_bits());
    out.write_bits(u64::from(marker), scheme.num_value_bits());
}
