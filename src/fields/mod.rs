//! Field definitions.
//!
//! A [`FieldDefinition`] describes one loggable value: its header name, how it
//! is predicted and encoded in each frame kind, and which [`Condition`] must
//! hold for it to be logged at all. The static tables in [`catalog`] are the
//! only description of the log layout; both the header emitter and the frame
//! encoder walk them, so the two cannot disagree.

pub mod catalog;

use core::fmt;

use crate::condition::{Condition, ConditionCache};

pub use catalog::{GPS_FIELDS, GPS_HOME_FIELDS, MAIN_FIELDS, SLOW_FIELDS};

/// How the expected value of a field is computed.
///
/// Only the difference between the real and the expected value is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Predictor {
    /// Expect zero; the value is written as is.
    Zero = 0,
    /// Expect the value from the previous logged iteration.
    Previous = 1,
    /// Extrapolate from the last two iterations: `2 * prev - prev2`.
    StraightLine = 2,
    /// Average of the last two iterations.
    Average2 = 3,
    /// Previous value plus one. Nothing is written.
    Inc = 6,
    /// Offset from the GPS home coordinate.
    HomeCoord = 7,
    /// Offset from the battery voltage at session start.
    VbatRef = 9,
    /// Offset from the time of the last main frame.
    LastMainFrameTime = 10,
}

impl Predictor {
    /// Whether this predictor reads history generations.
    pub const fn needs_history(self) -> bool {
        matches!(
            self,
            Predictor::Previous | Predictor::StraightLine | Predictor::Average2 | Predictor::Inc
        )
    }
}

/// Wire encoding of a predicted delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Encoding {
    SignedVb = 0,
    UnsignedVb = 1,
    /// `(reference - value) & 0x3FFF` as unsigned VB.
    Neg14Bit = 3,
    /// Up to eight values behind a presence bitmap.
    Tag8_8Svb = 6,
    /// Exactly three values.
    Tag2_3S32 = 7,
    /// Exactly four values.
    Tag8_4S16 = 8,
    /// Nothing is written.
    Null = 9,
}

impl Encoding {
    /// Number of consecutive fields packed into one group, for tag formats.
    pub const fn group_size(self) -> Option<usize> {
        match self {
            Encoding::Tag8_8Svb => Some(8),
            Encoding::Tag2_3S32 => Some(3),
            Encoding::Tag8_4S16 => Some(4),
            _ => None,
        }
    }
}

/// Predictor and encoding pair used for one frame kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldCoding {
    pub predictor: Predictor,
    pub encoding: Encoding,
}

impl FieldCoding {
    pub const fn new(predictor: Predictor, encoding: Encoding) -> Self {
        Self { predictor, encoding }
    }
}

/// One loggable field of snapshot type `S`.
pub struct FieldDefinition<S> {
    pub name: &'static str,
    /// Array index shown as `name[index]` in the header.
    pub index: Option<u8>,
    pub signed: bool,
    /// Coding in intra frames and in frames without history.
    pub intra: FieldCoding,
    /// Coding in inter frames.
    pub inter: FieldCoding,
    pub condition: Condition,
    /// Read the field from a snapshot.
    pub value: fn(&S) -> i64,
}

impl<S> FieldDefinition<S> {
    #[inline]
    pub fn read(&self, state: &S) -> i64 {
        (self.value)(state)
    }
}

impl<S> Clone for FieldDefinition<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for FieldDefinition<S> {}

impl<S> fmt::Debug for FieldDefinition<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDefinition")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("signed", &self.signed)
            .field("intra", &self.intra)
            .field("inter", &self.inter)
            .field("condition", &self.condition)
            .finish()
    }
}

impl<S> fmt::Display for FieldDefinition<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "{}[{}]", self.name, i),
            None => f.write_str(self.name),
        }
    }
}

/// Fields of `table` present under `cache`, in table order.
pub fn present<'a, S>(
    table: &'a [FieldDefinition<S>],
    cache: &'a ConditionCache,
) -> impl Iterator<Item = &'a FieldDefinition<S>> + 'a {
    table.iter().filter(move |def| cache.test(def.condition))
}

/// Which set of header lines a table is announced with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFamily {
    /// `I` and `P` frames.
    Main,
    /// `H` frames.
    GpsHome,
    /// `G` frames.
    Gps,
    /// `S` frames.
    Slow,
}

impl FieldFamily {
    /// Frame letter for the base header lines.
    pub const fn frame_char(self) -> u8 {
        match self {
            FieldFamily::Main => b'I',
            FieldFamily::GpsHome => b'H',
            FieldFamily::Gps => b'G',
            FieldFamily::Slow => b'S',
        }
    }

    /// Frame letter for the inter-frame lines, if the family has them.
    pub const fn delta_char(self) -> Option<u8> {
        match self {
            FieldFamily::Main => Some(b'P'),
            _ => None,
        }
    }

    /// Number of `H Field` lines announced for the family.
    pub const fn header_lines(self) -> usize {
        if self.delta_char().is_some() { 6 } else { 4 }
    }
}
