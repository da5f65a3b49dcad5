//! The code-registration interface (§6, §10.3).
//!
//! `assign_bytecode` is the one call the emitter makes into its caller at the
//! end of EMIT. Expressing it as a trait rather than a free function lets the
//! driver plug in a real VM's code-object table, a test double that captures
//! the call, or a bench harness that discards the result — mirroring how
//! `crates/ouros/src/run.rs` and `repl.rs` parameterize the VM over a
//! `PrintWriter`/`ResourceTracker`/`VmTracer` trait rather than hard-coding
//! stdout and an unconditional trace.

use crate::code::CodeBuffer;
use crate::scope::Scope;

/// Receives a scope's finalized bytecode at the end of its EMIT pass.
pub trait CodeSink {
    fn assign_bytecode(&mut self, scope: &Scope, buffer: CodeBuffer);
}

/// Test double: captures every `assign_bytecode` call for later assertions.
#[derive(Debug, Default)]
pub struct CapturingSink {
    pub calls: Vec<CodeBuffer>,
}

impl CapturingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently captured buffer, if any.
    #[must_use]
    pub fn last(&self) -> Option<&CodeBuffer> {
        self.calls.last()
    }
}

impl CodeSink for CapturingSink {
    fn assign_bytecode(&mut self, _scope: &Scope, buffer: CodeBuffer) {
        self.calls.push(buffer);
    }
}

/// Discards every buffer handed to it. Used by the emission benchmark, which
/// measures pass cost and has no use for the resulting bytes.
#[derive(Debug, Default)]
pub struct DiscardingSink;

impl CodeSink for DiscardingSink {
    fn assign_bytecode(&mut self, _scope: &Scope, _buffer: CodeBuffer) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qstr::Qstr;
    use crate::scope::{IdKind, IdInfo, Scope};

    fn dummy_scope() -> Scope {
        let mut scope = Scope::new(Qstr::from_index(0), Qstr::from_index(1));
        scope.id_info.push(IdInfo {
            kind: IdKind::Local,
            qstr: Qstr::from_index(2),
            slot: 0,
        });
        scope
    }

    #[test]
    fn capturing_sink_records_calls() {
        let mut sink = CapturingSink::new();
        let buffer = CodeBuffer {
            bytes: vec![0u8; 4],
            code_info_size: 0,
            n_pos_args: 0,
            n_kwonly_args: 0,
            arg_names: Vec::new(),
            scope_flags: crate::scope::ScopeFlags::empty(),
        };
        sink.assign_bytecode(&dummy_scope(), buffer.clone());
        assert_eq!(sink.last(), Some(&buffer));
    }

    #[test]
    fn discarding_sink_keeps_nothing() {
        let mut sink = DiscardingSink;
        let buffer = CodeBuffer {
            bytes: Vec::new(),
            code_info_size: 0,
            n_pos_args: 0,
            n_kwonly_args: 0,
            arg_names: Vec::new(),
            scope_flags: crate::scope::ScopeFlags::empty(),
        };
        sink.assign_bytecode(&dummy_scope(), buffer);
    }
}
