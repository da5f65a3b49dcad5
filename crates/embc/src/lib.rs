#![doc = include_str!("../../../README.md")]
#![expect(clippy::cast_possible_truncation, reason = "numeric narrowing is checked")]
#![expect(clippy::cast_sign_loss, reason = "sign-changing casts are intentional")]
#![expect(clippy::cast_possible_wrap, reason = "wrap behavior mirrors the VM ABI")]
#![expect(clippy::too_many_arguments, reason = "operation signatures mirror the opcode table")]
#![expect(clippy::unreadable_literal, reason = "bit-packed constants keep canonical forms")]

mod code;
mod codeinfo;
mod error;
mod label;
mod opcode;
mod ops;
mod pass;
mod qstr;
mod scope;
mod sink;
mod stack;
mod tracer;
mod varint;

pub use crate::{
    code::{Code, CodeBuffer},
    error::{CompileError, CompileErrorKind, EmitterBugKind},
    label::Label,
    opcode::{BinaryOpKind, Opcode, UnaryOpKind},
    pass::{Emitter, Pass, WORD_SIZE},
    qstr::{Qstr, QstrInterner},
    scope::{IdInfo, IdKind, Scope, ScopeFlags},
    sink::{CapturingSink, CodeSink, DiscardingSink},
    tracer::{EmitTracer, NoopEmitTracer, RecordingEmitTracer, StderrEmitTracer, TraceEvent},
    varint::{decode_int, decode_uint, encode_int, encode_uint},
};
