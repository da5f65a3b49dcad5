//! Emission tracing infrastructure.
//!
//! Adapted from `VmTracer`: a trait-based tracing system with a
//! zero-cost no-op default. Where `VmTracer` hooks VM execution events
//! (instruction dispatch, call/return, cell access), [`EmitTracer`] hooks
//! emitter events (pass boundaries, label assignment, each operation's emit)
//! — there is no VM loop in this crate, only the four-pass emission pipeline.
//!
//! # Architecture
//!
//! | Tracer | Purpose |
//! |--------|---------|
//! | [`NoopEmitTracer`] | Zero-cost no-op (production default) |
//! | [`StderrEmitTracer`] | Human-readable pass/emit log to stderr |
//! | [`RecordingEmitTracer`] | Full event recording for tests and the CLI demo |
//!
//! The emitter is parameterized as `Emitter<Tr: EmitTracer>`; callers choose
//! the tracer at construction time exactly as a VM does for `VmTracer`.

use crate::label::Label;
use crate::opcode::Opcode;
use crate::pass::Pass;

/// One recorded emission-pipeline event, used by [`RecordingEmitTracer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    PassStart { pass: Pass },
    PassEnd { pass: Pass },
    Emit { offset: u32, opcode: Opcode, stack_depth: i32 },
    LabelAssign { label: Label, offset: u32 },
}

/// Trait for emission tracing.
///
/// All methods default to no-ops, so [`NoopEmitTracer`] compiles to zero
/// instructions once the emitter is monomorphized over it — identical to how
/// `NoopTracer` eliminates `VmTracer` overhead.
pub trait EmitTracer: std::fmt::Debug {
    /// Called at the start of `start_pass`, before any bytes are written.
    #[inline(always)]
    fn on_pass_start(&mut self, _pass: Pass) {}

    /// Called at the end of `end_pass`, after the zero-stack assertion.
    #[inline(always)]
    fn on_pass_end(&mut self, _pass: Pass) {}

    /// Called once per operation, after its bytes (if any, in EMIT) are
    /// written and the stack tracker updated.
    ///
    /// `offset` is the bytecode offset the opcode was (or would be) written
    /// at; `stack_depth` is the simulated depth immediately after.
    #[inline(always)]
    fn on_emit(&mut self, _offset: u32, _opcode: Opcode, _stack_depth: i32) {}

    /// Called when a label is assigned a concrete bytecode offset.
    #[inline(always)]
    fn on_label_assign(&mut self, _label: Label, _offset: u32) {}
}

/// A tracer that does nothing; the production default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEmitTracer;

impl EmitTracer for NoopEmitTracer {}

/// Prints a human-readable emission log to stderr, one line per pass
/// boundary and per emitted opcode.
///
/// ```text
/// == pass StackSize ==
/// [   0] LoadConstSmallInt  stack=1
/// [   2] StoreFast0         stack=0
/// == end StackSize ==
/// ```
#[derive(Debug, Default)]
pub struct StderrEmitTracer;

impl StderrEmitTracer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl EmitTracer for StderrEmitTracer {
    fn on_pass_start(&mut self, pass: Pass) {
        eprintln!("== pass {pass:?} ==");
    }

    fn on_pass_end(&mut self, pass: Pass) {
        eprintln!("== end {pass:?} ==");
    }

    fn on_emit(&mut self, offset: u32, opcode: Opcode, stack_depth: i32) {
        eprintln!("[{offset:>5}] {opcode:?}  stack={stack_depth}");
    }

    fn on_label_assign(&mut self, label: Label, offset: u32) {
        eprintln!("  label {label:?} -> {offset}");
    }
}

/// Records every event for later inspection; used throughout `tests/` and by
/// the CLI demo driver to print a readable trace of the EMIT pass.
#[derive(Debug, Default)]
pub struct RecordingEmitTracer {
    pub events: Vec<TraceEvent>,
}

impl RecordingEmitTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EmitTracer for RecordingEmitTracer {
    fn on_pass_start(&mut self, pass: Pass) {
        self.events.push(TraceEvent::PassStart { pass });
    }

    fn on_pass_end(&mut self, pass: Pass) {
        self.events.push(TraceEvent::PassEnd { pass });
    }

    fn on_emit(&mut self, offset: u32, opcode: Opcode, stack_depth: i32) {
        self.events.push(TraceEvent::Emit { offset, opcode, stack_depth });
    }

    fn on_label_assign(&mut self, label: Label, offset: u32) {
        self.events.push(TraceEvent::LabelAssign { label, offset });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_tracer_captures_pass_boundaries() {
        let mut tracer = RecordingEmitTracer::new();
        tracer.on_pass_start(Pass::Emit);
        tracer.on_pass_end(Pass::Emit);
        assert_eq!(
            tracer.events,
            vec![
                TraceEvent::PassStart { pass: Pass::Emit },
                TraceEvent::PassEnd { pass: Pass::Emit },
            ]
        );
    }

    #[test]
    fn noop_tracer_records_nothing() {
        let mut tracer = NoopEmitTracer;
        tracer.on_pass_start(Pass::Emit);
        tracer.on_emit(0, Opcode::LoadNone, 1);
    }
}
