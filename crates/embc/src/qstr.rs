//! Interned-string identifiers ("qstrs").
//!
//! The object model, its garbage collector, and the real interned-string table
//! are external collaborators this crate does not implement (§1). What the
//! emitter needs is only the *shape* of a qstr: a machine-word-sized integer
//! handle (§ GLOSSARY) that round-trips through the variable-length `byte+qstr`
//! encoding (§4.2). [`QstrInterner`] is a minimal stand-in sized for the test
//! suite and CLI demo, grounded on `StringId` in `intern.rs`:
//! a `u32` newtype index with a reserved low range for single ASCII bytes.

use ahash::AHashMap;

/// Interned-string identifier.
///
/// Mirrors `StringId` in `intern.rs`: a `u32` index rather than a
/// full `usize`, since four billion distinct interned strings is far beyond
/// what an embedded target's source ever needs, and the narrower type is what
/// actually gets serialized into the `byte+qstr` varint encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct Qstr(u32);

/// Reserved id range for the 128 single-byte ASCII strings, matching
/// `ASCII_STRS` in `intern.rs`. Keeping this range reserved means short
/// identifiers and punctuation never need a real interner lookup.
const ASCII_RANGE: u32 = 128;

impl Qstr {
    /// Builds a `Qstr` from a raw index.
    ///
    /// Used when reconstructing a qstr from an operand decoded out of the
    /// bytecode stream; the caller is responsible for the index being valid.
    #[must_use]
    pub const fn from_index(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index, for encoding as a `byte+qstr` operand.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// The qstr for a single ASCII byte, with no interner lookup required.
    #[must_use]
    pub const fn from_ascii(byte: u8) -> Self {
        Self(byte as u32)
    }
}

/// Interns `&str` values into [`Qstr`] handles, deduplicating by content.
///
/// Single ASCII characters are assigned their reserved id without touching
/// the backing map, matching `intern.rs`'s `StringId`/`ASCII_STRS` split.
#[derive(Debug, Default)]
pub struct QstrInterner {
    strings: Vec<Box<str>>,
    by_content: AHashMap<Box<str>, Qstr>,
}

impl QstrInterner {
    /// Creates an empty interner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `s`, returning its existing id if already present.
    pub fn intern(&mut self, s: &str) -> Qstr {
        if let [byte] = s.as_bytes() {
            return Qstr::from_ascii(*byte);
        }
        if let Some(&id) = self.by_content.get(s) {
            return id;
        }
        let id = Qstr(ASCII_RANGE + u32::try_from(self.strings.len()).expect("interner exceeds u32 range"));
        self.strings.push(s.into());
        self.by_content.insert(s.into(), id);
        id
    }

    /// Resolves a previously-interned id back to its string.
    ///
    /// Returns `None` for unknown ids and for the reserved ASCII range, whose
    /// strings are derivable directly from the id without storage.
    #[must_use]
    pub fn resolve(&self, id: Qstr) -> Option<&str> {
        let idx = id.0.checked_sub(ASCII_RANGE)?;
        self.strings.get(idx as usize).map(AsRef::as_ref)
    }
}
