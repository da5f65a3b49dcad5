//! The pass controller and bytecode writer (§4.1, §4.2): the central
//! `Emitter` type every operation in [`crate::ops`] is a method on.
//!
//! Grounded on `CodeBuilder` in `bytecode/builder.rs` for the
//! overall shape (a struct owning the output buffer plus stack/location
//! bookkeeping, with `emit*` methods pushing bytes and adjusting a tracked
//! stack depth) — generalized here to the four-pass, idempotent-re-emission
//! algorithm in §4, which `builder.rs` itself does not implement (it patches
//! forward jumps with a fix-up list instead; see `DESIGN.md`).

use crate::code::{Code, CodeBuffer};
use crate::codeinfo::CodeInfoWriter;
use crate::error::{CompileError, CompileErrorKind, EmitterBugKind};
use crate::label::{Label, LabelTable};
use crate::opcode::Opcode;
use crate::qstr::Qstr;
use crate::scope::Scope;
use crate::sink::CodeSink;
use crate::stack::StackTracker;
use crate::tracer::{EmitTracer, NoopEmitTracer};
use crate::varint;

/// Width, in bytes, of a native pointer on the build target. `byte+ptr`
/// operands and the code-info/bytecode region boundary are aligned to this.
pub const WORD_SIZE: usize = std::mem::size_of::<usize>();

/// One of the four passes the driver brackets every scope's emission in
/// (§3, §6): `SCOPE → STACK_SIZE → CODE_SIZE → EMIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    /// The driver's own scope-analysis walk (populating `Scope::id_info`).
    /// The emitter does not write anything during this pass; every operation
    /// call is a no-op so the driver can bracket all four passes uniformly.
    Scope,
    /// Runs the full operation sequence once to discover `scope.stack_size`.
    StackSize,
    /// Runs the sequence again to discover `code_info_size`/`bytecode_size`
    /// and allocate the output buffer.
    CodeSize,
    /// Runs the sequence a final time, writing real bytes into the buffer
    /// allocated at the end of `CodeSize`, and publishes the result.
    Emit,
}

/// The two-pass (really four-pass) bytecode emitter for one [`Scope`].
///
/// Reused across all four passes for a single scope; the driver calls
/// `start_pass`/`end_pass` around one full replay of the operation sequence,
/// once per pass, in order.
#[derive(Debug)]
pub struct Emitter<Tr: EmitTracer = NoopEmitTracer> {
    pass: Pass,
    opt_level: u8,
    max_num_labels: u32,
    next_label_id: u32,
    stack: StackTracker,
    labels: LabelTable,
    code_info_writer: CodeInfoWriter,
    last_emit_was_return_value: bool,
    current_line: Option<u32>,
    code_info_offset: u32,
    bytecode_offset: u32,
    code_info_size: u32,
    bytecode_size: u32,
    code_base: Vec<u8>,
    tracer: Tr,
}

impl Emitter<NoopEmitTracer> {
    /// Creates an emitter with the production (zero-cost) tracer.
    #[must_use]
    pub fn new(max_num_labels: u32, opt_level: u8) -> Self {
        Self::with_tracer(max_num_labels, opt_level, NoopEmitTracer)
    }
}

impl<Tr: EmitTracer> Emitter<Tr> {
    /// Creates an emitter that reports its pipeline to `tracer` (§2b).
    #[must_use]
    pub fn with_tracer(max_num_labels: u32, opt_level: u8, tracer: Tr) -> Self {
        Self {
            pass: Pass::Scope,
            opt_level,
            max_num_labels,
            next_label_id: 0,
            stack: StackTracker::default(),
            labels: LabelTable::new(max_num_labels),
            code_info_writer: CodeInfoWriter::new(),
            last_emit_was_return_value: false,
            current_line: None,
            code_info_offset: 0,
            bytecode_offset: 0,
            code_info_size: 0,
            bytecode_size: 0,
            code_base: Vec::new(),
            tracer,
        }
    }

    /// Whether `return_value` was the most recently emitted operation; the
    /// driver uses this to elide a redundant trailing implicit return.
    #[must_use]
    pub const fn last_emit_was_return_value(&self) -> bool {
        self.last_emit_was_return_value
    }

    /// Allocates a fresh, unassigned label.
    ///
    /// # Errors
    /// Returns [`CompileErrorKind::TooManyLabels`] once `max_num_labels` has
    /// been exhausted.
    pub fn new_label(&mut self) -> Result<Label, CompileError> {
        if self.next_label_id >= self.max_num_labels {
            return Err(CompileError::new(
                CompileErrorKind::TooManyLabels { max: self.max_num_labels },
                self.current_line,
            ));
        }
        let label = Label::new(self.next_label_id);
        self.next_label_id += 1;
        Ok(label)
    }

    /// Records a source-line update (§6: "non-monotonic n is ignored").
    pub fn set_source_line(&mut self, line: u32) {
        self.current_line = Some(line);
        if !self.active() {
            return;
        }
        let bytes = self.code_info_writer.set_source_line(self.bytecode_offset, line, self.opt_level);
        if !bytes.is_empty() {
            self.write_code_info(&bytes);
        }
    }

    /// Assigns `label` to the current bytecode offset (§4.6).
    ///
    /// # Panics
    /// Panics (an [`EmitterBugKind`]) if `label` was already assigned this
    /// pass, or if its offset drifted since the CODE_SIZE pass.
    pub fn label_assign(&mut self, label: Label) {
        if !self.active() {
            return;
        }
        let is_emit = matches!(self.pass, Pass::Emit);
        self.labels.assign(label, self.bytecode_offset, is_emit);
        self.tracer.on_label_assign(label, self.bytecode_offset);
    }

    /// Starts `pass` for `scope`, writing the code-info/bytecode prelude
    /// (§4.1). No-op for [`Pass::Scope`].
    ///
    /// # Errors
    /// Returns [`CompileErrorKind::TooManyCells`] if more than 255 locals in
    /// `scope` resolve to heap cells.
    pub fn start_pass(&mut self, pass: Pass, scope: &Scope) -> Result<(), CompileError> {
        self.pass = pass;
        self.stack.reset();
        self.last_emit_was_return_value = false;
        self.code_info_offset = 0;
        self.bytecode_offset = 0;
        self.code_info_writer.reset(0);
        if !matches!(pass, Pass::Emit) {
            self.labels.clear();
        }
        self.tracer.on_pass_start(pass);
        if matches!(pass, Pass::Scope) {
            return Ok(());
        }

        let code_info_size_header = if matches!(pass, Pass::Emit) { self.code_info_size } else { 0 };
        self.write_code_info(&code_info_size_header.to_le_bytes());
        self.write_code_info(&scope.source_file.index().to_le_bytes());
        self.write_code_info(&scope.simple_name.index().to_le_bytes());

        let n_state = (u32::from(scope.num_locals) + u32::from(scope.stack_size)).max(1);
        let n_state = u16::try_from(n_state).unwrap_or(u16::MAX);
        self.write_bytecode(&n_state.to_le_bytes());
        self.write_bytecode(&scope.exc_stack_size.to_le_bytes());

        let cells: Vec<u8> = scope.cell_slots().map(|slot| slot as u8).collect();
        if cells.len() > 255 {
            return Err(CompileError::new(
                CompileErrorKind::TooManyCells { count: cells.len() },
                self.current_line,
            ));
        }
        self.write_bytecode(&[cells.len() as u8]);
        self.write_bytecode(&cells);
        Ok(())
    }

    /// Ends the current pass, finalizing or publishing the buffer as
    /// appropriate (§4.1). No-op for [`Pass::Scope`].
    ///
    /// # Panics
    /// Panics if the simulated operand stack is non-zero (§3 invariant).
    pub fn end_pass<S: CodeSink>(&mut self, scope: &mut Scope, sink: &mut S) {
        if matches!(self.pass, Pass::Scope) {
            self.tracer.on_pass_end(self.pass);
            return;
        }
        self.write_code_info(&[CodeInfoWriter::terminator()]);
        self.align_code_info_to_word();
        self.stack.assert_empty();

        scope.stack_size = scope.stack_size.max(u16::try_from(self.stack.max()).unwrap_or(u16::MAX));

        match self.pass {
            Pass::CodeSize => {
                self.code_info_size = self.code_info_offset;
                self.bytecode_size = self.bytecode_offset;
                self.code_base = vec![0u8; (self.code_info_size + self.bytecode_size) as usize];
            }
            Pass::Emit => {
                let buffer = CodeBuffer {
                    bytes: std::mem::take(&mut self.code_base),
                    code_info_size: self.code_info_size,
                    n_pos_args: scope.num_pos_args,
                    n_kwonly_args: scope.num_kwonly_args,
                    arg_names: scope.arg_names(),
                    scope_flags: scope.scope_flags,
                };
                scope.raw_code = Some(Code::new(buffer.clone()));
                sink.assign_bytecode(scope, buffer);
            }
            Pass::StackSize | Pass::Scope => {}
        }
        self.tracer.on_pass_end(self.pass);
    }

    /// Marks `scope`'s generator flag (§4.4's `yield`/`yield_from`).
    pub fn mark_generator(&self, scope: &mut Scope) {
        if self.active() {
            scope.scope_flags.insert(crate::scope::ScopeFlags::IS_GENERATOR);
        }
    }

    // -- low-level writer primitives (§4.2) ---------------------------------

    const fn active(&self) -> bool {
        !matches!(self.pass, Pass::Scope)
    }

    fn write_code_info(&mut self, bytes: &[u8]) {
        if matches!(self.pass, Pass::Emit) {
            let start = self.code_info_offset as usize;
            self.code_base[start..start + bytes.len()].copy_from_slice(bytes);
        }
        self.code_info_offset += bytes.len() as u32;
    }

    fn write_bytecode(&mut self, bytes: &[u8]) {
        if matches!(self.pass, Pass::Emit) {
            let start = (self.code_info_size + self.bytecode_offset) as usize;
            self.code_base[start..start + bytes.len()].copy_from_slice(bytes);
        }
        self.bytecode_offset += bytes.len() as u32;
    }

    fn align_code_info_to_word(&mut self) {
        let rem = self.code_info_offset as usize % WORD_SIZE;
        if rem != 0 {
            self.write_code_info(&vec![0u8; WORD_SIZE - rem]);
        }
    }

    fn align_bytecode_to_word(&mut self) {
        let rem = self.bytecode_offset as usize % WORD_SIZE;
        if rem != 0 {
            self.write_bytecode(&vec![0u8; WORD_SIZE - rem]);
        }
    }

    /// Applies a stack delta (§4.5). `pub(crate)` since only [`crate::ops`]
    /// calls it — each operation is responsible for its own documented Δ.
    pub(crate) fn pre(&mut self, delta: i32) {
        if self.active() {
            self.stack.pre(delta);
        }
    }

    fn emit_opcode(&mut self, op: Opcode) -> u32 {
        let offset = self.bytecode_offset;
        self.write_bytecode(&[op as u8]);
        offset
    }

    fn finish(&mut self, op: Opcode, offset: u32, is_return: bool) {
        self.last_emit_was_return_value = is_return;
        self.tracer.on_emit(offset, op, self.stack.current());
    }

    fn label_disp_unsigned(&self, label: Label, instr_start: u32) -> u16 {
        if !matches!(self.pass, Pass::Emit) {
            return 0;
        }
        let target = self.labels.offset(label).unwrap_or_else(|| {
            panic!("{}", EmitterBugKind::UnresolvedLabelAtEmit { label: label.index() as u32 })
        });
        let disp = i64::from(target) - i64::from(instr_start + 3);
        u16::try_from(disp).expect("unsigned-label displacement must fit a 16-bit word")
    }

    fn label_disp_signed(&self, label: Label, instr_start: u32) -> u16 {
        if !matches!(self.pass, Pass::Emit) {
            return 0;
        }
        let target = self.labels.offset(label).unwrap_or_else(|| {
            panic!("{}", EmitterBugKind::UnresolvedLabelAtEmit { label: label.index() as u32 })
        });
        let disp = i64::from(target) - i64::from(instr_start + 3) + 0x8000;
        u16::try_from(disp).expect("signed-label displacement must fit a 16-bit word")
    }

    // -- operand encodings used by `crate::ops` -----------------------------

    pub(crate) fn op_plain(&mut self, op: Opcode, delta: i32) {
        if !self.active() {
            return;
        }
        let offset = self.emit_opcode(op);
        self.pre(delta);
        self.finish(op, offset, matches!(op, Opcode::ReturnValue));
    }

    pub(crate) fn op_byte(&mut self, op: Opcode, imm: u8, delta: i32) {
        if !self.active() {
            return;
        }
        let offset = self.emit_opcode(op);
        self.write_bytecode(&[imm]);
        self.pre(delta);
        self.finish(op, offset, false);
    }

    pub(crate) fn op_uint(&mut self, op: Opcode, value: u64, delta: i32) {
        if !self.active() {
            return;
        }
        let offset = self.emit_opcode(op);
        let bytes = varint::encode_uint(value);
        self.write_bytecode(&bytes);
        self.pre(delta);
        self.finish(op, offset, false);
    }

    pub(crate) fn op_int(&mut self, op: Opcode, value: i64, delta: i32) {
        if !self.active() {
            return;
        }
        let offset = self.emit_opcode(op);
        let bytes = varint::encode_int(value);
        self.write_bytecode(&bytes);
        self.pre(delta);
        self.finish(op, offset, false);
    }

    pub(crate) fn op_qstr(&mut self, op: Opcode, q: Qstr, delta: i32) {
        self.op_uint(op, u64::from(q.index()), delta);
    }

    pub(crate) fn op_ptr(&mut self, op: Opcode, ptr: usize, delta: i32) {
        if !self.active() {
            return;
        }
        let offset = self.emit_opcode(op);
        self.align_bytecode_to_word();
        self.write_bytecode(&ptr.to_ne_bytes());
        self.pre(delta);
        self.finish(op, offset, false);
    }

    /// Appends one more raw byte to an instruction already written by a
    /// prior `op_*` call, for the rare compound encodings (`unwind_jump`'s
    /// depth byte) that don't fit any single `op_*` shape.
    pub(crate) fn write_raw_byte(&mut self, byte: u8) {
        self.write_bytecode(&[byte]);
    }

    /// `byte+ptr+byte`: a pointer operand followed by one more raw byte, used
    /// by `make_closure`/`make_closure_defargs` to carry the closed-over cell
    /// count alongside the child code pointer (§4.4's Closures category).
    pub(crate) fn op_ptr_byte(&mut self, op: Opcode, ptr: usize, extra: u8, delta: i32) {
        if !self.active() {
            return;
        }
        let offset = self.emit_opcode(op);
        self.align_bytecode_to_word();
        self.write_bytecode(&ptr.to_ne_bytes());
        self.write_bytecode(&[extra]);
        self.pre(delta);
        self.finish(op, offset, false);
    }

    pub(crate) fn op_unsigned_label(&mut self, op: Opcode, label: Label, delta: i32) {
        if !self.active() {
            return;
        }
        let offset = self.emit_opcode(op);
        let disp = self.label_disp_unsigned(label, offset);
        self.write_bytecode(&disp.to_le_bytes());
        self.pre(delta);
        self.finish(op, offset, false);
    }

    pub(crate) fn op_signed_label(&mut self, op: Opcode, label: Label, delta: i32) {
        if !self.active() {
            return;
        }
        let offset = self.emit_opcode(op);
        let disp = self.label_disp_signed(label, offset);
        self.write_bytecode(&disp.to_le_bytes());
        self.pre(delta);
        self.finish(op, offset, false);
    }
}
