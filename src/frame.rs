//! Frame encoder.
//!
//! [`FrameEncoder`] turns snapshots into complete frames. Every frame is
//! produced by walking a field catalog, so a frame contains exactly the fields
//! the header announced for the session's [`ConditionCache`].
//!
//! The encoder only builds bytes. Writing them to the device and rotating the
//! history afterwards is up to the caller.

use alloc::vec::Vec;

use crate::condition::ConditionCache;
use crate::encoding::{
    write_neg_14bit, write_signed_vb, write_tag2_3s32, write_tag8_4s16, write_tag8_8svb,
    write_unsigned_vb,
};
use crate::event::FlightLogEvent;
use crate::fields::{
    self, Encoding, FieldCoding, FieldDefinition, GPS_FIELDS, GPS_HOME_FIELDS, MAIN_FIELDS,
    SLOW_FIELDS,
};
use crate::history::History;
use crate::predictor::{self, Basis, References};
use crate::state::{GpsSolution, GpsState, MainState, SlowState};

/// Which coding of a field applies to the frame being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Coding {
    Intra,
    Inter,
}

impl Coding {
    #[inline]
    fn of<S>(self, def: &FieldDefinition<S>) -> FieldCoding {
        match self {
            Coding::Intra => def.intra,
            Coding::Inter => def.inter,
        }
    }
}

/// Builds frames into a reusable buffer.
#[derive(Debug, Default)]
pub struct FrameEncoder {
    buf: Vec<u8>,
}

impl FrameEncoder {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(256),
        }
    }

    /// `I` frame from the current history slot.
    pub fn intra(
        &mut self,
        cache: &ConditionCache,
        history: &History<MainState>,
        refs: &References,
    ) -> &[u8] {
        self.begin(b'I');
        encode_fields(
            &mut self.buf,
            MAIN_FIELDS,
            cache,
            history.current(),
            Basis::Standalone,
            refs,
            Coding::Intra,
        );
        &self.buf
    }

    /// `P` frame predicted from the two history generations.
    pub fn inter(
        &mut self,
        cache: &ConditionCache,
        history: &History<MainState>,
        refs: &References,
    ) -> &[u8] {
        self.begin(b'P');
        encode_fields(
            &mut self.buf,
            MAIN_FIELDS,
            cache,
            history.current(),
            Basis::History(history),
            refs,
            Coding::Inter,
        );
        &self.buf
    }

    /// `S` frame.
    pub fn slow(&mut self, cache: &ConditionCache, slow: &SlowState) -> &[u8] {
        self.standalone(b'S', SLOW_FIELDS, cache, slow, &References::default())
    }

    /// `H` frame carrying the GPS home position.
    pub fn gps_home(&mut self, cache: &ConditionCache, gps: &GpsState) -> &[u8] {
        self.standalone(b'H', GPS_HOME_FIELDS, cache, gps, &References::default())
    }

    /// `G` frame. Coordinates are relative to `refs.home`.
    pub fn gps(
        &mut self,
        cache: &ConditionCache,
        solution: &GpsSolution,
        refs: &References,
    ) -> &[u8] {
        self.standalone(b'G', GPS_FIELDS, cache, solution, refs)
    }

    /// `E` frame.
    pub fn event(&mut self, event: &FlightLogEvent) -> &[u8] {
        self.buf.clear();
        event.encode(&mut self.buf);
        &self.buf
    }

    fn standalone<S>(
        &mut self,
        marker: u8,
        table: &[FieldDefinition<S>],
        cache: &ConditionCache,
        state: &S,
        refs: &References,
    ) -> &[u8] {
        self.begin(marker);
        encode_fields(
            &mut self.buf,
            table,
            cache,
            state,
            Basis::Standalone,
            refs,
            Coding::Intra,
        );
        &self.buf
    }

    fn begin(&mut self, marker: u8) {
        self.buf.clear();
        self.buf.push(marker);
    }
}

/// Encode the present fields of `table` in order.
///
/// Consecutive fields with the same tag encoding are packed into one group of
/// at most the tag's size. A short group is padded with zeros.
fn encode_fields<S>(
    buf: &mut Vec<u8>,
    table: &[FieldDefinition<S>],
    cache: &ConditionCache,
    current: &S,
    basis: Basis<'_, S>,
    refs: &References,
    coding: Coding,
) {
    let delta = |def: &FieldDefinition<S>| {
        predictor::delta(coding.of(def).predictor, def, current, basis, refs)
    };

    let mut present = fields::present(table, cache).peekable();
    while let Some(def) = present.next() {
        let encoding = coding.of(def).encoding;

        let Some(group_size) = encoding.group_size() else {
            write_single(buf, encoding, delta(def));
            continue;
        };

        let mut group = [0i32; 8];
        group[0] = delta(def) as i32;
        let mut len = 1;
        while len < group_size {
            match present.next_if(|next| coding.of(next).encoding == encoding) {
                Some(next) => {
                    group[len] = delta(next) as i32;
                    len += 1;
                }
                None => break,
            }
        }
        write_group(buf, encoding, &group, len);
    }
}

fn write_single(buf: &mut Vec<u8>, encoding: Encoding, delta: i64) {
    match encoding {
        Encoding::SignedVb => write_signed_vb(buf, delta as i32),
        Encoding::UnsignedVb => write_unsigned_vb(buf, delta as u32),
        Encoding::Neg14Bit => write_neg_14bit(buf, (-delta) as i32),
        Encoding::Null => {}
        Encoding::Tag8_8Svb | Encoding::Tag2_3S32 | Encoding::Tag8_4S16 => {
            write_group(buf, encoding, &[delta as i32, 0, 0, 0, 0, 0, 0, 0], 1)
        }
    }
}

fn write_group(buf: &mut Vec<u8>, encoding: Encoding, group: &[i32; 8], len: usize) {
    match encoding {
        Encoding::Tag2_3S32 => write_tag2_3s32(buf, &[group[0], group[1], group[2]]),
        Encoding::Tag8_4S16 => write_tag8_4s16(buf, &[group[0], group[1], group[2], group[3]]),
        Encoding::Tag8_8Svb => write_tag8_8svb(buf, &group[..len]),
        _ => {
            for &value in &group[..len] {
                write_single(buf, encoding, i64::from(value));
            }
        }
    }
}
