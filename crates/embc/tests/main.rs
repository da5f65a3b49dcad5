//! Integration tests exercising the emitter purely through its public API,
//! the way a compiler front end or the CLI demo would use it.

use embc::{
    BinaryOpKind, CapturingSink, CodeSink, CompileError, CompileErrorKind, Emitter, Pass, Qstr, Scope,
};

fn run_all_passes(
    emitter: &mut Emitter,
    scope: &mut Scope,
    sink: &mut CapturingSink,
    build: impl Fn(&mut Emitter, &mut Scope) -> Result<(), CompileError>,
) -> Result<(), CompileError> {
    for pass in [Pass::Scope, Pass::StackSize, Pass::CodeSize, Pass::Emit] {
        emitter.start_pass(pass, scope)?;
        build(emitter, scope)?;
        emitter.end_pass(scope, sink);
    }
    Ok(())
}

/// (S1) An empty function body still carries the full prelude and a single
/// `return_value`.
#[test]
fn empty_function_round_trips() {
    let mut scope = Scope::new(Qstr::from_ascii(b'f'), Qstr::from_ascii(b'f'));
    let mut emitter = Emitter::new(8, 0);
    let mut sink = CapturingSink::new();

    run_all_passes(&mut emitter, &mut scope, &mut sink, |e, _| {
        e.load_none();
        e.return_value();
        Ok(())
    })
    .unwrap();

    let buffer = sink.last().unwrap();
    assert_eq!(scope.stack_size, 1);
    assert!(buffer.bytecode().ends_with(&[embc::Opcode::ReturnValue as u8]));
}

/// (S3) `x = 1; return x`.
#[test]
fn small_int_load_store_return() {
    let mut scope = Scope::new(Qstr::from_ascii(b'f'), Qstr::from_ascii(b'f'));
    scope.num_locals = 1;
    let mut emitter = Emitter::new(8, 0);
    let mut sink = CapturingSink::new();

    run_all_passes(&mut emitter, &mut scope, &mut sink, |e, _| {
        e.load_const_small_int(1);
        e.store_fast(0);
        e.load_fast(0);
        e.return_value();
        Ok(())
    })
    .unwrap();

    assert_eq!(scope.stack_size, 1);
}

/// A loop with a backward jump and an `unwind_jump` break: the label table
/// must resolve both directions identically across CODE_SIZE and EMIT.
#[test]
fn loop_with_backward_jump_and_break() {
    let mut scope = Scope::new(Qstr::from_ascii(b'f'), Qstr::from_ascii(b'f'));
    let mut emitter = Emitter::new(8, 0);
    let mut sink = CapturingSink::new();

    run_all_passes(&mut emitter, &mut scope, &mut sink, |e, _| {
        let top = e.new_label()?;
        let exit = e.new_label()?;
        e.label_assign(top);
        e.load_true();
        e.pop_jump_if_false(exit);
        e.unwind_jump(exit, 1, false);
        e.jump(top);
        e.label_assign(exit);
        e.load_none();
        e.return_value();
        Ok(())
    })
    .unwrap();

    let buffer = sink.last().unwrap();
    assert!(!buffer.bytecode().is_empty());
}

/// Re-running the exact same four passes from scratch must produce a
/// byte-identical buffer: the four-pass algorithm has no hidden state that
/// would make emission non-deterministic across separate `Emitter`s.
#[test]
fn emission_is_deterministic_across_emitters() {
    let build = |e: &mut Emitter, _: &mut Scope| -> Result<(), CompileError> {
        let label = e.new_label()?;
        e.load_false();
        e.pop_jump_if_false(label);
        e.load_none();
        e.pop_top();
        e.label_assign(label);
        e.load_none();
        e.return_value();
        Ok(())
    };

    let mut first_buffers = Vec::new();
    for _ in 0..2 {
        let mut scope = Scope::new(Qstr::from_ascii(b'f'), Qstr::from_ascii(b'f'));
        let mut emitter = Emitter::new(8, 0);
        let mut sink = CapturingSink::new();
        run_all_passes(&mut emitter, &mut scope, &mut sink, build).unwrap();
        first_buffers.push(sink.last().unwrap().clone());
    }
    assert_eq!(first_buffers[0], first_buffers[1]);
}

/// (S6) `is not` folds into `BINARY_OP(Is)` followed by `NOT`.
#[test]
fn is_not_folds_into_two_opcodes() {
    let mut scope = Scope::new(Qstr::from_ascii(b'f'), Qstr::from_ascii(b'f'));
    let mut emitter = Emitter::new(8, 0);
    let mut sink = CapturingSink::new();

    run_all_passes(&mut emitter, &mut scope, &mut sink, |e, _| {
        e.load_none();
        e.load_none();
        e.binary_op(BinaryOpKind::IsNot);
        e.return_value();
        Ok(())
    })
    .unwrap();

    let buffer = sink.last().unwrap();
    let bc = buffer.bytecode();
    assert!(bc.windows(2).any(|w| w == [embc::Opcode::BinaryOp as u8, BinaryOpKind::Is as u8]));
    assert!(bc.contains(&(embc::Opcode::Not as u8)));
}

/// Exhausting `max_num_labels` surfaces as a recoverable [`CompileError`],
/// not a panic — label exhaustion is a normal, expected compile-time error
/// for a source file with pathologically many branches.
#[test]
fn label_exhaustion_is_a_compile_error_not_a_panic() {
    let mut emitter: Emitter = Emitter::new(2, 0);
    assert!(emitter.new_label().is_ok());
    assert!(emitter.new_label().is_ok());
    let err = emitter.new_label().unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::TooManyLabels { max: 2 });
}

/// `raise_varargs` rejects an out-of-range argument count as a compile
/// error rather than emitting malformed bytecode.
#[test]
fn raise_varargs_out_of_range_is_rejected() {
    let mut emitter: Emitter = Emitter::new(4, 0);
    let scope = Scope::new(Qstr::from_ascii(b'f'), Qstr::from_ascii(b'f'));
    emitter.start_pass(Pass::StackSize, &scope).unwrap();
    let err = emitter.raise_varargs(3).unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::ImmediateOutOfRange { value: 3 });
}

/// A closure's child code pointer round-trips through `make_closure` into
/// the finished buffer, word-aligned.
#[test]
fn closure_carries_child_code_pointer() {
    let mut scope = Scope::new(Qstr::from_ascii(b'f'), Qstr::from_ascii(b'f'));
    let mut emitter = Emitter::new(8, 0);
    let mut sink = CapturingSink::new();
    let child = Box::new(0u8);
    let ptr = std::ptr::from_ref(&*child) as usize;

    run_all_passes(&mut emitter, &mut scope, &mut sink, |e, _| {
        e.load_deref(0);
        e.make_closure(ptr, 1);
        e.return_value();
        Ok(())
    })
    .unwrap();

    let buffer = sink.last().unwrap();
    assert!(buffer.bytecode().contains(&(embc::Opcode::MakeClosure as u8)));
}

/// A custom [`CodeSink`] (not [`CapturingSink`]) can observe `assign_bytecode`
/// directly, the way a real compiler driver would register a finished scope.
#[test]
fn custom_sink_observes_assign_bytecode() {
    #[derive(Default)]
    struct CountingSink {
        count: usize,
    }
    impl CodeSink for CountingSink {
        fn assign_bytecode(&mut self, _scope: &Scope, _buffer: embc::CodeBuffer) {
            self.count += 1;
        }
    }

    let mut scope = Scope::new(Qstr::from_ascii(b'f'), Qstr::from_ascii(b'f'));
    let mut emitter = Emitter::new(4, 0);
    let mut sink = CountingSink::default();

    run_all_passes(&mut emitter, &mut scope, &mut sink, |e, _| {
        e.load_none();
        e.return_value();
        Ok(())
    })
    .unwrap();

    assert_eq!(sink.count, 1);
}
