//! Fuzz target: the variable-length integer encoding round-trips for any
//! value (§4.2).
//!
//! A crash here means `decode_uint`/`decode_int` disagree with
//! `encode_uint`/`encode_int` on some input, which would silently corrupt
//! constant operands and jump displacements in real bytecode.

#![no_main]

use embc::{decode_int, decode_uint, encode_int, encode_uint};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 16 {
        return;
    }
    let u = u64::from_le_bytes(data[0..8].try_into().unwrap());
    let i = i64::from_le_bytes(data[8..16].try_into().unwrap());

    let bytes = encode_uint(u);
    let (decoded, consumed) = decode_uint(&bytes);
    assert_eq!(decoded, u);
    assert_eq!(consumed, bytes.len());

    let bytes = encode_int(i);
    let (decoded, consumed) = decode_int(&bytes);
    assert_eq!(decoded, i);
    assert_eq!(consumed, bytes.len());
});
