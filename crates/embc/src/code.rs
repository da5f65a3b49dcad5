//! The finalized code object (§6 "Buffer layout", §10.3).
//!
//! `Code` is what `end_pass(EMIT)` installs into `Scope::raw_code`, and what a
//! `CodeSink` receives via `assign_bytecode`. The VM-side representation of a
//! code object (how it is allocated, GC-traced, and linked into a function
//! object) is an external collaborator out of scope here (§1); this crate
//! only owns the finalized byte buffer and the call-frame metadata derived
//! from the `Scope` that a VM would need to set up a frame.

use crate::qstr::Qstr;
use crate::scope::ScopeFlags;

/// The finalized, byte-exact buffer produced by one scope's EMIT pass, plus
/// the call-frame metadata a VM needs to make sense of it.
///
/// `bytes` layout matches §6 exactly: a code-info region (size header, two
/// qstr refs, line-number delta program, word-alignment padding) followed by
/// a word-aligned bytecode region (frame-slot count, exception-stack size,
/// cell table, instruction stream).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBuffer {
    pub bytes: Vec<u8>,
    /// Byte length of the code-info region; the bytecode region starts here.
    pub code_info_size: u32,
    pub n_pos_args: u16,
    pub n_kwonly_args: u16,
    /// Positional, then keyword-only, argument names in declaration order.
    pub arg_names: Vec<Qstr>,
    pub scope_flags: ScopeFlags,
}

impl CodeBuffer {
    /// The bytecode region, i.e. everything past the code-info header.
    #[must_use]
    pub fn bytecode(&self) -> &[u8] {
        &self.bytes[self.code_info_size as usize..]
    }

    /// The code-info region: size header, qstr refs, and line-number program.
    #[must_use]
    pub fn code_info(&self) -> &[u8] {
        &self.bytes[..self.code_info_size as usize]
    }
}

/// The code object a VM would register and a function object would point to.
///
/// Kept as a thin wrapper around [`CodeBuffer`] rather than a VM-internal
/// heap-allocated object: the heap, GC, and function-object linking are all
/// out of scope, so this crate's "pointer to child raw_code" (§4.4's
/// `make_function`/`make_closure`) is expressed as a plain `usize` handle the
/// driver derives from whatever `Code` value it is holding (see
/// [`Code::as_ptr_operand`]), rather than a real traced pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    pub buffer: CodeBuffer,
}

impl Code {
    #[must_use]
    pub const fn new(buffer: CodeBuffer) -> Self {
        Self { buffer }
    }

    /// A stable, word-sized operand suitable for `byte+ptr` encoding (§4.2).
    ///
    /// In a real VM this would be the child code object's heap address; here
    /// it is the `Code` value's own address, which is only meaningful for as
    /// long as the value is not moved — adequate for the CLI demo and tests,
    /// which keep child `Code`s alive in a `Vec` for the caller's lifetime.
    #[must_use]
    pub fn as_ptr_operand(&self) -> usize {
        std::ptr::from_ref(self) as usize
    }
}
