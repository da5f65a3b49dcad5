//! The `Scope` aggregate: the emitter's external, caller-owned input/output contract.
//!
//! A `Scope` is one compilation unit — a function, class, module, or comprehension.
//! The compiler driver builds the identifier table during its own analysis pass
//! (out of scope for this crate) and owns the `Scope` for the lifetime of one
//! four-pass emission; the emitter only ever borrows it mutably through
//! [`crate::pass::Emitter::start_pass`].

use crate::qstr::Qstr;

/// How an identifier resolves within its owning scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum IdKind {
    /// A plain local variable, addressed by frame slot.
    Local,
    /// A local captured by an inner closure; boxed into a heap cell.
    Cell,
    /// A name resolved in an enclosing function's cell, not this scope's own.
    Free,
    /// A module-level name.
    Global,
}

/// One entry in a scope's identifier table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IdInfo {
    /// How this identifier resolves.
    pub kind: IdKind,
    /// Interned name.
    pub qstr: Qstr,
    /// Frame slot (for `Local`/`Cell`) or cell index (for `Free`). Unused for `Global`.
    pub slot: u16,
}

/// Per-scope flags the emitter and compiler driver communicate through.
///
/// A hand-rolled bit set rather than the `bitflags` crate: the pack never reaches
/// for it for small per-struct flag fields, preferring a plain repr with named
/// `const`s (see the `StaticStrings`/exception-kind enums throughout `value.rs`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct ScopeFlags(u8);

impl ScopeFlags {
    /// Set by the emitter the first time it sees `yield` or `yield_from` in this scope.
    pub const IS_GENERATOR: Self = Self(1 << 0);
    /// Set by the driver when this scope is a class body.
    pub const IS_CLASS: Self = Self(1 << 1);
    /// Set by the driver when this scope is the top-level module.
    pub const IS_MODULE: Self = Self(1 << 2);

    /// The empty flag set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Returns `true` if every bit in `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Sets every bit in `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Raw bit pattern, as stored in the code-registration interface (§6).
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl std::ops::BitOr for ScopeFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A function, class, module, or comprehension — one compilation unit for the emitter.
///
/// Owned by the compiler driver and mutably borrowed by the emitter for the
/// duration of one scope's four passes. The emitter writes back `stack_size`,
/// `scope_flags` (generator bit), and `raw_code`.
#[derive(Debug)]
pub struct Scope {
    /// Number of local variable slots (not counting cells/free/global).
    pub num_locals: u16,
    /// Required operand-stack depth, written back by the emitter at the end of
    /// the STACK_SIZE pass.
    pub stack_size: u16,
    /// Required exception-handler stack depth.
    pub exc_stack_size: u16,
    /// Number of positional parameters.
    pub num_pos_args: u16,
    /// Number of keyword-only parameters.
    pub num_kwonly_args: u16,
    /// Identifier table, indexed in declaration order.
    pub id_info: Vec<IdInfo>,
    /// Interned source filename.
    pub source_file: Qstr,
    /// Interned unqualified scope name (e.g. a function's `__name__`).
    pub simple_name: Qstr,
    /// Generator/class/module flags. The generator bit is set by the emitter.
    pub scope_flags: ScopeFlags,
    /// Out-parameter: the finalized code object, installed by `end_pass(EMIT)`.
    pub raw_code: Option<crate::code::Code>,
}

impl Scope {
    /// Creates a new scope with no locals, args, or identifiers.
    ///
    /// Intended for tests and the CLI demo driver; a real compiler front end
    /// populates `id_info`/argument counts during its own scope-analysis pass
    /// before ever handing the `Scope` to an emitter.
    #[must_use]
    pub fn new(source_file: Qstr, simple_name: Qstr) -> Self {
        Self {
            num_locals: 0,
            stack_size: 0,
            exc_stack_size: 0,
            num_pos_args: 0,
            num_kwonly_args: 0,
            id_info: Vec::new(),
            source_file,
            simple_name,
            scope_flags: ScopeFlags::empty(),
            raw_code: None,
        }
    }

    /// Number of locals that resolve to heap cells, in declaration order.
    ///
    /// Used by `start_pass` to emit the cell-index prelude (§4.1) and by
    /// `end_pass(EMIT)` to build the closed-over argument-name vector.
    pub(crate) fn cell_slots(&self) -> impl Iterator<Item = u16> + '_ {
        self.id_info
            .iter()
            .filter(|id| id.kind == IdKind::Cell)
            .map(|id| id.slot)
    }

    /// Builds the positional + keyword-only argument name vector, in argument
    /// order, for the code-registration interface (§6).
    pub(crate) fn arg_names(&self) -> Vec<Qstr> {
        let total = usize::from(self.num_pos_args + self.num_kwonly_args);
        let mut names: Vec<Option<Qstr>> = vec![None; total];
        for id in &self.id_info {
            if id.kind == IdKind::Local && usize::from(id.slot) < total {
                names[usize::from(id.slot)] = Some(id.qstr);
            }
        }
        names.into_iter().map(|n| n.unwrap_or_default()).collect()
    }
}
