use std::env;

use embc::{
    BinaryOpKind, CapturingSink, Emitter, Pass, Qstr, Scope, StderrEmitTracer, UnaryOpKind,
};

/// Runs one scope through all four passes, printing a trace of the final
/// EMIT pass to stderr and a hex dump of the finished buffer to stdout.
fn compile(name: &str, build: impl Fn(&mut Emitter<StderrEmitTracer>, &mut Scope)) {
    eprintln!("\n--- {name} ---");
    let mut scope = Scope::new(Qstr::from_ascii(b'f'), Qstr::from_ascii(b'f'));
    let mut emitter = Emitter::with_tracer(64, 0, StderrEmitTracer::new());
    let mut sink = CapturingSink::new();

    for pass in [Pass::Scope, Pass::StackSize, Pass::CodeSize, Pass::Emit] {
        emitter.start_pass(pass, &scope).expect("demo sequences never exceed label/cell limits");
        build(&mut emitter, &mut scope);
        emitter.end_pass(&mut scope, &mut sink);
    }

    let buffer = sink.last().expect("EMIT pass always calls assign_bytecode");
    print!("code-info:");
    for byte in buffer.code_info() {
        print!(" {byte:02x}");
    }
    println!();
    print!("bytecode: ");
    for byte in buffer.bytecode() {
        print!(" {byte:02x}");
    }
    println!();
}

fn main() {
    let demo = env::args().nth(1).unwrap_or_else(|| "all".to_owned());

    if demo == "all" || demo == "empty" {
        // S1: an empty function body, just the implicit `return None`.
        compile("empty function", |e, _| {
            e.load_none();
            e.return_value();
        });
    }

    if demo == "all" || demo == "forward-jump" {
        // S2: `if False: pass` — a forward jump landing on the very next
        // instruction.
        compile("forward jump to next instruction", |e, _| {
            let skip = e.new_label().expect("64 labels is plenty for this demo");
            e.load_false();
            e.pop_jump_if_false(skip);
            e.load_none();
            e.pop_top();
            e.label_assign(skip);
            e.load_none();
            e.return_value();
        });
    }

    if demo == "all" || demo == "locals" {
        // S3: `x = 1; return x`.
        compile("small-int load/store/return", |e, scope| {
            scope.num_locals = 1;
            e.load_const_small_int(1);
            e.store_fast(0);
            e.load_fast(0);
            e.return_value();
        });
    }

    if demo == "all" || demo == "is-not" {
        // S6: `None is not None` folds into BINARY_OP(Is) + NOT.
        compile("`is not` folds to BINARY_OP(Is)+NOT", |e, _| {
            e.load_none();
            e.load_none();
            e.binary_op(BinaryOpKind::IsNot);
            e.return_value();
        });
    }

    if demo == "all" || demo == "loop" {
        // A backward jump: `while True: break`.
        compile("loop with backward jump and unwind", |e, _| {
            let top = e.new_label().expect("64 labels is plenty for this demo");
            let exit = e.new_label().expect("64 labels is plenty for this demo");
            e.label_assign(top);
            e.load_true();
            e.pop_jump_if_false(exit);
            e.unwind_jump(exit, 1, false);
            e.jump(top);
            e.label_assign(exit);
            e.load_none();
            e.return_value();
        });
    }

    if demo == "all" || demo == "unary-not" {
        compile("`not True` folds to UNARY_OP(Bool)+NOT", |e, _| {
            e.load_true();
            e.unary_op(UnaryOpKind::Not);
            e.return_value();
        });
    }

    if demo == "all" || demo == "closure" {
        // A closure over one cell variable, carrying the child code pointer
        // plus a cell-count byte.
        compile("closure over one cell", |e, scope| {
            scope.num_locals = 0;
            let child_code = Box::new(0u8);
            let ptr = std::ptr::from_ref(&*child_code) as usize;
            e.load_deref(0);
            e.make_closure(ptr, 1);
            e.return_value();
            std::mem::forget(child_code);
        });
    }
}
