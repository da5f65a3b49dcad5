//! Error types (§7), in the pack's hand-rolled idiom.
//!
//! Grounded on `crates/ouros/src/repl_error.rs` and `crates/ouros/src/resource.rs`:
//! plain enums implementing `Display` + `std::error::Error`, wired together
//! with `From` impls — no `thiserror`, no `anyhow`, since neither appears
//! anywhere in the pack's dependency graph.
//!
//! §7 distinguishes two failure domains, and this module keeps them as two
//! distinct types rather than folding both into one enum:
//!
//! - [`CompileError`] — recoverable. The driver can catch it, attach the
//!   current source line, and report it to the end user (too many labels,
//!   too many cells, an immediate out of range).
//! - Internal consistency failures (label drift, non-zero stack at
//!   `end_pass`, duplicate label assignment, operand-stack underflow) are
//!   *not* a `Result` variant at all: §7 says they "must not occur on any
//!   syntactically valid input" and are only ever provoked by mutation
//!   testing, so they are raised as plain `assert!`/`panic!` calls next to
//!   the invariant they protect (see [`crate::label::LabelTable::assign`],
//!   [`crate::stack::StackTracker::pre`]) rather than threaded through
//!   `Result` everywhere they could not matter. [`EmitterBugKind`] exists so
//!   the panic messages stay structured and testable via
//!   `#[should_panic(expected = ...)]`, matching how `ResourceError` in
//!   `resource.rs` keeps recoverable sandbox limits distinct from plain Rust
//!   panics for host bugs.

use std::fmt;

/// A recoverable compile-time error (§7), tied to the source line active
/// when it was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub kind: CompileErrorKind,
    /// Source line active via `set_source_line` when the error was raised,
    /// if any was ever set for this scope.
    pub line: Option<u32>,
}

/// The recoverable compile-error variants enumerated in §7.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileErrorKind {
    /// More labels were requested than `max_num_labels` allows.
    TooManyLabels { max: u32 },
    /// More than 255 locals need boxing into heap cells (§4.1's `num_cells`
    /// prelude byte is a single byte).
    TooManyCells { count: usize },
    /// An immediate operand does not fit the encoding it was routed to.
    ImmediateOutOfRange { value: i64 },
}

impl CompileError {
    #[must_use]
    pub const fn new(kind: CompileErrorKind, line: Option<u32>) -> Self {
        Self { kind, line }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            CompileErrorKind::TooManyLabels { max } => {
                write!(f, "too many labels requested (max {max})")?;
            }
            CompileErrorKind::TooManyCells { count } => {
                write!(f, "too many cell variables ({count} > 255)")?;
            }
            CompileErrorKind::ImmediateOutOfRange { value } => {
                write!(f, "immediate value {value} is out of range for its encoding")?;
            }
        }
        if let Some(line) = self.line {
            write!(f, " (line {line})")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}

/// Structured payload for the internal-consistency panics in §7.
///
/// Not returned as a `Result` — see the module docs — but kept as a type so
/// panic call sites format consistently and tests can assert on the kind via
/// the `Display`ed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitterBugKind {
    LabelOffsetDrift { label: u32, code_size_pass: u32, emit_pass: u32 },
    DuplicateLabelAssignment { label: u32 },
    UnresolvedLabelAtEmit { label: u32 },
    NonZeroStackAtEndPass { depth: i32 },
    StackUnderflow { depth: i32 },
}

impl fmt::Display for EmitterBugKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LabelOffsetDrift {
                label,
                code_size_pass,
                emit_pass,
            } => write!(
                f,
                "label {label} offset drifted between CODE_SIZE ({code_size_pass}) and EMIT ({emit_pass})"
            ),
            Self::DuplicateLabelAssignment { label } => {
                write!(f, "label {label} assigned twice in the same pass")
            }
            Self::UnresolvedLabelAtEmit { label } => {
                write!(f, "label {label} was jumped to but never assigned before EMIT completed")
            }
            Self::NonZeroStackAtEndPass { depth } => {
                write!(f, "stack not empty at end_pass: depth {depth}")
            }
            Self::StackUnderflow { depth } => {
                write!(f, "operand-stack underflow: depth {depth}")
            }
        }
    }
}
