//! Byte-level wire encodings used by blackbox frames.
//!
//! Every value in a frame is written with one of the encodings below. The
//! header announces which encoding each field uses, so these formats are a
//! fixed contract with log decoders.
//!
//! # Variable byte (VB)
//!
//! Unsigned values are written 7 bits at a time, least significant group first,
//! with the high bit of each byte set when more bytes follow. Signed values are
//! zig-zag mapped first so that small magnitudes of either sign stay short.
//!
//! # Tag formats
//!
//! | Format | Values | Layout |
//! |--------|--------|--------|
//! | `TAG2_3S32` | exactly 3 | 2-bit selector picks 2/4/6-bit packing or per-value byte widths |
//! | `TAG8_4S16` | exactly 4 | 8-bit selector, 2 bits per value: zero, nibble, byte, 16 bits |
//! | `TAG8_8SVB` | 1 to 8 | bitmap of non-zero values, then each non-zero value as signed VB |
//!
//! All encoders append to a `Vec<u8>`; the frame encoder hands the finished
//! frame to the device in one write.

use alloc::vec::Vec;

/// Mask applied to the voltage delta for the `NEG_14BIT` encoding.
pub const NEG_14BIT_MASK: u32 = 0x3FFF;

/// Maximum number of values a single `TAG8_8SVB` group can carry.
pub const TAG8_8SVB_MAX_VALUES: usize = 8;

/// Zig-zag map a signed value so small magnitudes become small unsigned values.
#[inline]
pub const fn zigzag_encode(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

/// Inverse of [`zigzag_encode`].
#[inline]
pub const fn zigzag_decode(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

/// Write an unsigned variable-byte integer.
pub fn write_unsigned_vb(buf: &mut Vec<u8>, mut value: u32) {
    while value > 127 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Write a signed variable-byte integer (zig-zag, then unsigned VB).
#[inline]
pub fn write_signed_vb(buf: &mut Vec<u8>, value: i32) {
    write_unsigned_vb(buf, zigzag_encode(value));
}

/// Write a voltage delta as a masked 14-bit unsigned VB.
///
/// `reference_minus_value` is expected to be small and positive; a negative
/// difference still takes at most two bytes thanks to the mask.
#[inline]
pub fn write_neg_14bit(buf: &mut Vec<u8>, reference_minus_value: i32) {
    write_unsigned_vb(buf, (reference_minus_value as u32) & NEG_14BIT_MASK);
}

/// Write three signed values with the `TAG2_3S32` format.
///
/// ```text
/// 2 bits per field  ss11 2233
/// 4 bits per field  ss00 1111 2222 3333
/// 6 bits per field  ss11 1111 0022 2222 0033 3333
/// byte widths       ss33 2211 then each value in 1..=4 little-endian bytes
/// ```
pub fn write_tag2_3s32(buf: &mut Vec<u8>, values: &[i32; 3]) {
    const BITS_2: u8 = 0;
    const BITS_4: u8 = 1;
    const BITS_6: u8 = 2;
    const BITS_32: u8 = 3;

    let mut selector = BITS_2;
    for &value in values {
        if !(-32..32).contains(&value) {
            selector = BITS_32;
            break;
        }
        if !(-8..8).contains(&value) {
            selector = selector.max(BITS_6);
        } else if !(-2..2).contains(&value) {
            selector = selector.max(BITS_4);
        }
    }

    match selector {
        BITS_2 => buf.push(
            (selector << 6)
                | (((values[0] & 0x03) as u8) << 4)
                | (((values[1] & 0x03) as u8) << 2)
                | ((values[2] & 0x03) as u8),
        ),
        BITS_4 => {
            buf.push((selector << 6) | ((values[0] & 0x0F) as u8));
            buf.push((((values[1] & 0x0F) as u8) << 4) | ((values[2] & 0x0F) as u8));
        }
        BITS_6 => {
            buf.push((selector << 6) | ((values[0] & 0x3F) as u8));
            buf.push((values[1] & 0x3F) as u8);
            buf.push((values[2] & 0x3F) as u8);
        }
        _ => {
            // First field lives in the low bits of the selector byte.
            let mut widths = 0u8;
            for &value in values.iter().rev() {
                widths <<= 2;
                widths |= byte_width_selector(value);
            }
            buf.push((selector << 6) | widths);

            for &value in values {
                let bytes = value.to_le_bytes();
                let len = byte_width_selector(value) as usize + 1;
                buf.extend_from_slice(&bytes[..len]);
            }
        }
    }
}

#[inline]
const fn byte_width_selector(value: i32) -> u8 {
    if value >= -128 && value < 128 {
        0
    } else if value >= -32768 && value < 32768 {
        1
    } else if value >= -8_388_608 && value < 8_388_608 {
        2
    } else {
        3
    }
}

/// Write four signed 16-bit values with the `TAG8_4S16` format.
///
/// The selector byte holds two bits per field, first field in the low bits:
/// `00` zero, `01` 4 bits, `10` 8 bits, `11` 16 bits. Field payloads are packed
/// on nibble boundaries, high nibble first. Values are truncated to 16 bits.
pub fn write_tag8_4s16(buf: &mut Vec<u8>, values: &[i32; 4]) {
    const FIELD_ZERO: u8 = 0;
    const FIELD_4BIT: u8 = 1;
    const FIELD_8BIT: u8 = 2;
    const FIELD_16BIT: u8 = 3;

    let mut selector = 0u8;
    for &value in values.iter().rev() {
        selector <<= 2;
        selector |= if value == 0 {
            FIELD_ZERO
        } else if (-8..8).contains(&value) {
            FIELD_4BIT
        } else if (-128..128).contains(&value) {
            FIELD_8BIT
        } else {
            FIELD_16BIT
        };
    }
    buf.push(selector);

    let mut half_byte: Option<u8> = None;
    let mut fields = selector;
    for &value in values {
        match fields & 0x03 {
            FIELD_ZERO => {}
            FIELD_4BIT => match half_byte.take() {
                None => half_byte = Some((value as u8) << 4),
                Some(high) => buf.push(high | ((value as u8) & 0x0F)),
            },
            FIELD_8BIT => match half_byte {
                None => buf.push(value as u8),
                Some(high) => {
                    buf.push(high | (((value >> 4) as u8) & 0x0F));
                    half_byte = Some((value as u8) << 4);
                }
            },
            _ => match half_byte {
                None => {
                    buf.push((value >> 8) as u8);
                    buf.push(value as u8);
                }
                Some(high) => {
                    buf.push(high | (((value >> 12) as u8) & 0x0F));
                    buf.push((value >> 4) as u8);
                    half_byte = Some((value as u8) << 4);
                }
            },
        }
        fields >>= 2;
    }

    if let Some(high) = half_byte {
        buf.push(high);
    }
}

/// Write up to eight signed values with the `TAG8_8SVB` format.
///
/// A single value is written as a bare signed VB with no header byte. An
/// empty slice writes nothing.
pub fn write_tag8_8svb(buf: &mut Vec<u8>, values: &[i32]) {
    debug_assert!(values.len() <= TAG8_8SVB_MAX_VALUES);

    match values.len() {
        0 => {}
        1 => write_signed_vb(buf, values[0]),
        _ => {
            let mut header = 0u8;
            for &value in values.iter().rev() {
                header <<= 1;
                header |= (value != 0) as u8;
            }
            buf.push(header);

            for &value in values.iter().filter(|v| **v != 0) {
                write_signed_vb(buf, value);
            }
        }
    }
}

/// Write an IEEE-754 single precision float, little-endian.
#[inline]
pub fn write_f32(buf: &mut Vec<u8>, value: f32) {
    buf.extend_from_slice(&value.to_bits().to_le_bytes());
}

/// Write a string without terminator.
#[inline]
pub fn write_str(buf: &mut Vec<u8>, value: &str) {
    buf.extend_from_slice(value.as_bytes());
}
