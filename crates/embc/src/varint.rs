//! Variable-length integer encoding (§4.2).
//!
//! Big-endian seven-bit groups, continuation bit set on every byte except the
//! last. The signed variant reserves the top stored bit (`0x40`) of the last
//! byte as a sign bit, prepending an extra all-ones/all-zeros byte when the
//! minimal grouping does not already disambiguate the sign — the same
//! termination rule as a signed LEB128, just emitted most-significant-group
//! first instead of least-significant-group first.

/// Encodes `value` as an unsigned big-endian base-128 varint.
#[must_use]
pub fn encode_uint(value: u64) -> Vec<u8> {
    let mut groups = vec![(value & 0x7f) as u8];
    let mut rest = value >> 7;
    while rest != 0 {
        groups.push((rest & 0x7f) as u8);
        rest >>= 7;
    }
    groups.reverse();
    set_continuation_bits(groups)
}

/// Decodes an unsigned varint from the start of `bytes`.
///
/// Returns the value and the number of bytes consumed.
///
/// # Panics
///
/// Panics if `bytes` runs out before a terminating (continuation-clear) byte
/// is found — a malformed or truncated buffer is a compiler bug (§7), not a
/// condition this crate recovers from.
#[must_use]
pub fn decode_uint(bytes: &[u8]) -> (u64, usize) {
    let mut value = 0u64;
    let mut i = 0;
    loop {
        let b = bytes[i];
        value = (value << 7) | u64::from(b & 0x7f);
        i += 1;
        if b & 0x80 == 0 {
            return (value, i);
        }
    }
}

/// Encodes `value` as a signed big-endian base-128 varint (§4.2).
#[must_use]
pub fn encode_int(value: i64) -> Vec<u8> {
    let mut groups = vec![(value & 0x7f) as u8];
    let mut rest = value >> 7;
    loop {
        let byte = groups[groups.len() - 1];
        let is_negative = byte & 0x40 != 0;
        if (is_negative && rest == -1) || (!is_negative && rest == 0) {
            break;
        }
        groups.push((rest & 0x7f) as u8);
        rest >>= 7;
    }
    groups.reverse();
    set_continuation_bits(groups)
}

/// Decodes a signed varint from the start of `bytes`.
///
/// Returns the value and the number of bytes consumed. See [`decode_uint`]
/// for the panic condition on a truncated buffer.
#[must_use]
pub fn decode_int(bytes: &[u8]) -> (i64, usize) {
    // The sign bit lives in the first transmitted byte (the most-significant
    // group, per `encode_int`'s `groups.reverse()`), not the terminal byte.
    let is_negative = bytes[0] & 0x40 != 0;
    let mut value: i64 = 0;
    let mut i = 0;
    loop {
        let b = bytes[i];
        value = (value << 7) | i64::from(b & 0x7f);
        i += 1;
        if b & 0x80 == 0 {
            break;
        }
    }
    if is_negative {
        let total_bits = 7 * u32::try_from(i).expect("varint length fits in u32");
        if total_bits < 64 {
            value -= 1i64 << total_bits;
        }
    }
    (value, i)
}

/// Sets the continuation bit (0x80) on every group but the last, which is
/// always the least-significant (and, for the signed encoding, sign-bearing)
/// group emitted at the end of the stream.
fn set_continuation_bits(groups: Vec<u8>) -> Vec<u8> {
    let last = groups.len() - 1;
    groups
        .into_iter()
        .enumerate()
        .map(|(i, g)| if i == last { g } else { g | 0x80 })
        .collect()
}
