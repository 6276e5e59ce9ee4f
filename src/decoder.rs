//! Streaming decoder for encoded segments.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bits::BitReader;
use crate::encoder::DataPoint;
use crate::error::DecodeError;
use crate::options::Options;
use crate::segment::Segment;
use crate::unit::TimeUnit;

/// A decoded observation together with the sticky stream state in force at
/// that datapoint: the last explicitly written annotation and time unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub datapoint: DataPoint,
    pub time_unit: TimeUnit,
    pub annotation: Vec<u8>,
}

/// Lazily decodes datapoints from a segment.
///
/// Yields `Err` once and then terminates if the stream is truncated or
/// malformed; a well-formed stream ends at its end-of-stream record.
pub struct Iter<'a> {
    reader: BitReader<'a>,
    opts: Options,

    t: i64,
    dt: i64,
    vb: u64,
    xor: u64,

    ant: Vec<u8>,
    tu: TimeUnit,

    started: bool,
    done: bool,
}

impl<'a> Iter<'a> {
    /// Creates an iterator over `segment` using the schemes in `opts`.
    #[must_use]
    pub fn new(segment: Segment<'a>, opts: &Options) -> Self {
        Self {
            reader: BitReader::new(segment.head, segment.tail),
            opts: opts.clone(),
            t: 0,
            dt: 0,
            vb: 0,
            xor: 0,
            ant: Vec::new(),
            tu: TimeUnit::default(),
            started: false,
            done: false,
        }
    }

    fn next_sample(&mut self) -> Result<Option<Sample>, DecodeError> {
        if self.done {
            return Ok(None);
        }
        if self.started {
            if !self.read_markers()? {
                self.done = true;
                return Ok(None);
            }
            let unit_ns = self.unit_ns()?;
            let dod = self.read_delta_of_delta()?;
            self.dt = self.dt.wrapping_add(dod.wrapping_mul(unit_ns));
            self.t = self.t.wrapping_add(self.dt);
            self.read_next_value()?;
        } else {
            // Prelude: the normalized anchor. Its unit may only arrive with
            // the time-unit record preceding the first delta-of-delta, so
            // interpretation is deferred.
            let Some(nt) = self.reader.read_bits(64) else {
                self.done = true;
                return Ok(None);
            };
            self.started = true;
            if !self.read_markers()? {
                self.done = true;
                return Ok(None);
            }
            let unit_ns = self.unit_ns()?;
            let dod = self.read_delta_of_delta()?;
            self.dt = dod.wrapping_mul(unit_ns);
            self.t = (nt as i64).wrapping_mul(unit_ns).wrapping_add(self.dt);
            self.vb = self
                .reader
                .read_bits(64)
                .ok_or(DecodeError::UnexpectedEnd)?;
            self.xor = self.vb;
        }
        Ok(Some(Sample {
            datapoint: DataPoint::new(self.t, f64::from_bits(self.vb)),
            time_unit: self.tu,
            annotation: self.ant.clone(),
        }))
    }

    /// Consumes any marker records at the cursor. Returns `Ok(false)` when
    /// the end-of-stream record was reached.
    fn read_markers(&mut self) -> Result<bool, DecodeError> {
        let scheme = Arc::clone(self.opts.marker_scheme());
        let num_bits = scheme.num_opcode_bits() + scheme.num_value_bits();
        let value_mask = (1u64 << scheme.num_value_bits()) - 1;
        loop {
            // The escape opcode cannot be produced by data opcodes, so a
            // prefix match is always a marker.
            let Some(peeked) = self.reader.peek_bits(num_bits) else {
                return Ok(true);
            };
            if peeked >> scheme.num_value_bits() != scheme.opcode() {
                return Ok(true);
            }
            self.reader.read_bits(num_bits);
            let marker = (peeked & value_mask) as u8;
            if marker == scheme.end_of_stream() {
                return Ok(false);
            } else if marker == scheme.annotation() {
                self.read_annotation()?;
            } else if marker == scheme.time_unit() {
                self.read_time_unit()?;
            } else {
                return Err(DecodeError::UnknownMarker(marker));
            }
        }
    }

    fn read_annotation(&mut self) -> Result<(), DecodeError> {
        let decoded = self
            .reader
            .read_varint()
            .ok_or(DecodeError::UnexpectedEnd)?;
        let len = decoded.wrapping_add(1);
        if len <= 0 {
            return Err(DecodeError::InvalidAnnotationLength(len));
        }
        if (len as u64).saturating_mul(8) > self.reader.remaining_bits() as u64 {
            return Err(DecodeError::UnexpectedEnd);
        }
        let mut ant = Vec::with_capacity(len as usize);
        for _ in 0..len {
            ant.push(
                self.reader
                    .read_bits(8)
                    .ok_or(DecodeError::UnexpectedEnd)? as u8,
            );
        }
        self.ant = ant;
        Ok(())
    }

    fn read_time_unit(&mut self) -> Result<(), DecodeError> {
        let code = self
            .reader
            .read_bits(8)
            .ok_or(DecodeError::UnexpectedEnd)? as u8;
        self.tu = TimeUnit::from_code(code);
        Ok(())
    }

    fn unit_ns(&self) -> Result<i64, DecodeError> {
        self.tu
            .nanoseconds()
            .ok_or(DecodeError::UnknownTimeUnit(self.tu))
    }

    fn read_delta_of_delta(&mut self) -> Result<i64, DecodeError> {
        let schemes = Arc::clone(self.opts.time_schemes());
        let scheme = schemes
            .get(&self.tu)
            .ok_or(DecodeError::UnknownTimeUnit(self.tu))?;
        if !self.read_bit()? {
            return Ok(0);
        }
        for bucket in scheme.buckets() {
            if !self.read_bit()? {
                let raw = self
                    .reader
                    .read_bits(bucket.num_value_bits())
                    .ok_or(DecodeError::UnexpectedEnd)?;
                return Ok(sign_extend(raw, bucket.num_value_bits()));
            }
        }
        let default = scheme.default_bucket();
        let raw = self
            .reader
            .read_bits(default.num_value_bits())
            .ok_or(DecodeError::UnexpectedEnd)?;
        Ok(sign_extend(raw, default.num_value_bits()))
    }

    fn read_next_value(&mut self) -> Result<(), DecodeError> {
        if !self.read_bit()? {
            self.xor = 0;
            return Ok(());
        }
        if !self.read_bit()? {
            // Contained: the window comes from the previous xor.
            let prev = self.xor;
            if prev == 0 {
                return Err(DecodeError::InvalidValueWindow);
            }
            let prev_leading = prev.leading_zeros() as u8;
            let prev_trailing = prev.trailing_zeros() as u8;
            let meaningful = 64 - prev_leading - prev_trailing;
            let window = self
                .reader
                .read_bits(meaningful)
                .ok_or(DecodeError::UnexpectedEnd)?;
            let xor = window << prev_trailing;
            self.vb ^= xor;
            self.xor = xor;
            return Ok(());
        }
        let leading = self
            .reader
            .read_bits(6)
            .ok_or(DecodeError::UnexpectedEnd)? as u8;
        let meaningful = self
            .reader
            .read_bits(6)
            .ok_or(DecodeError::UnexpectedEnd)? as u8
            + 1;
        if leading + meaningful > 64 {
            return Err(DecodeError::InvalidValueWindow);
        }
        let trailing = 64 - leading - meaningful;
        let window = self
            .reader
            .read_bits(meaningful)
            .ok_or(DecodeError::UnexpectedEnd)?;
        let xor = window << trailing;
        self.vb ^= xor;
        self.xor = xor;
        Ok(())
    }

    #[inline]
    fn read_bit(&mut self) -> Result<bool, DecodeError> {
        self.reader.read_bit().ok_or(DecodeError::UnexpectedEnd)
    }
}

impl Iterator for Iter<'_> {
    type Item = Result<Sample, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_sample() {
            Ok(Some(sample)) => Some(Ok(sample)),
            Ok(None) => None,
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Decodes a whole segment into samples.
///
/// # Errors
/// Fails on the first truncated or malformed record.
pub fn decode(segment: Segment<'_>, opts: &Options) -> Result<Vec<Sample>, DecodeError> {
    let mut samples = Vec::new();
    for sample in Iter::new(segment, opts) {
        samples.push(sample?);
    }
    Ok(samples)
}

/// Sign-extends an `n`-bit value stored in a `u64` to a full `i64`.
#[inline]
fn sign_extend(value: u64, bits: u8) -> i64 {
    let shift = 64 - u32::from(bits);
    ((value << shift) as i64) >> shift
}
