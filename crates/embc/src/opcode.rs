//! The opcode set (§6 "Opcode set").
//!
//! "The opcode numeric values are defined by the shared header with the VM;
//! this spec fixes the *encoding shape* and *stack effect* of each operation,
//! which together with the VM's decoder table constitute the ABI." There is
//! no VM crate on the other end of this ABI here (§1 places it out of
//! scope), so the discriminants below are this crate's own shared header —
//! stable, explicit, and `#[repr(u8)]` so a real VM's decoder table could be
//! generated from them.
//!
//! Grounded on `crates/ouros/src/bytecode/op.rs`'s role as referenced from
//! `bytecode/mod.rs` (`pub use op::Opcode`) and on the opcode roster implied
//! by `vm/*.rs`'s match arms (`LoadLocal0..3`, `MakeClosure`, `CallAttr`,
//! `UnpackEx`, …) and `tracer.rs`'s `on_cell_load`/`on_make_function` hooks.
//! Every variant here corresponds to exactly one directly-emitted byte in the
//! instruction stream; operations in §4.4 that synthesize a short sequence
//! (`delete_attr`, `binary_op(IS_NOT)`, …) are expressed in `crate::emit` as
//! more than one `Opcode` emission rather than as their own variant.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::FromRepr)]
pub enum Opcode {
    // -- Const --------------------------------------------------------
    LoadNone = 0,
    LoadTrue,
    LoadFalse,
    LoadEllipsis,
    LoadConstSmallInt,
    LoadConstObj,
    LoadNull,

    // -- Names: fast locals --------------------------------------------
    LoadFast0,
    LoadFast1,
    LoadFast2,
    LoadFast,
    StoreFast0,
    StoreFast1,
    StoreFast2,
    StoreFast,
    DeleteFast,

    // -- Names: cells / free vars ---------------------------------------
    LoadDeref,
    StoreDeref,
    DeleteDeref,

    // -- Names: module/global --------------------------------------------
    LoadName,
    StoreName,
    DeleteName,
    LoadGlobal,
    StoreGlobal,
    DeleteGlobal,

    // -- Attributes -------------------------------------------------------
    LoadAttr,
    LoadMethod,
    StoreAttr,

    // -- Subscript --------------------------------------------------------
    LoadSubscr,
    StoreSubscr,

    // -- Stack shuffling ----------------------------------------------------
    DupTop,
    DupTopTwo,
    PopTop,
    RotTwo,
    RotThree,

    // -- Control flow -------------------------------------------------------
    Jump,
    PopJumpIfTrue,
    PopJumpIfFalse,
    JumpIfTrueOrPop,
    JumpIfFalseOrPop,
    UnwindJump,
    SetupWith,
    WithCleanup,
    SetupExcept,
    SetupFinally,
    EndFinally,
    PopBlock,
    PopExcept,

    // -- Iteration ----------------------------------------------------------
    GetIter,
    ForIter,

    // -- Unary/binary operators -----------------------------------------
    UnaryOp,
    BinaryOp,
    Not,

    // -- Collection builders --------------------------------------------
    BuildTuple,
    BuildList,
    BuildSet,
    BuildMap,
    StoreMap,
    ListAppend,
    SetAdd,
    MapAdd,
    BuildSlice,

    // -- Unpacking ------------------------------------------------------
    UnpackSequence,
    UnpackEx,

    // -- Function/closure creation ----------------------------------------
    MakeFunction,
    MakeFunctionDefargs,
    MakeClosure,
    MakeClosureDefargs,

    // -- Calls ------------------------------------------------------------
    CallFunction,
    CallFunctionVarKw,
    CallMethod,
    CallMethodVarKw,

    // -- Imports ----------------------------------------------------------
    ImportName,
    ImportFrom,
    ImportStar,

    // -- Misc ---------------------------------------------------------------
    ReturnValue,
    RaiseVarargs,
    YieldValue,
    YieldFrom,
    StartExceptHandler,
    EndExceptHandler,
}

/// Unary operator kinds for `unary_op` (§4.4's Ops category).
///
/// `Not` is handled specially by the emitter (folded into `UNARY_OP BOOL` +
/// `NOT`, see `crate::emit::ops`) rather than appearing as its own kind here.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::FromRepr)]
pub enum UnaryOpKind {
    Bool,
    Not,
    Pos,
    Neg,
    Invert,
}

/// Binary operator kinds for `binary_op` (§4.4's Ops category).
///
/// `NotIn` and `IsNot` are handled specially (folded into the positive form
/// plus `NOT`), not emitted directly — see `crate::emit::ops::binary_op`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::FromRepr)]
pub enum BinaryOpKind {
    Add,
    Subtract,
    Multiply,
    TrueDivide,
    FloorDivide,
    Modulo,
    Power,
    LShift,
    RShift,
    And,
    Or,
    Xor,
    MatrixMultiply,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    In,
    NotIn,
    Is,
    IsNot,
}

impl Opcode {
    /// The opcode's statically-known net stack effect, if it does not depend
    /// on an operand (§4.5: "the operation surface accepts operations whose
    /// byte encoding omits an explicit stack effect — effect is known
    /// statically per opcode").
    ///
    /// Returns `None` for opcodes whose effect depends on a runtime operand
    /// (`n`/`k`/`C` in §4.4's table); those are computed at the call site in
    /// `crate::emit`.
    #[must_use]
    pub const fn stack_effect(self) -> Option<i32> {
        use Opcode::{
            DeleteDeref, DeleteFast, DeleteGlobal, DeleteName, DupTop, DupTopTwo, EndExceptHandler, EndFinally,
            ForIter, GetIter, Jump, JumpIfFalseOrPop, JumpIfTrueOrPop, LoadAttr, LoadConstObj, LoadConstSmallInt,
            LoadDeref, LoadEllipsis, LoadFalse, LoadFast, LoadFast0, LoadFast1, LoadFast2, LoadGlobal, LoadMethod,
            LoadName, LoadNone, LoadNull, LoadSubscr, LoadTrue, Not, PopBlock, PopExcept, PopJumpIfFalse,
            PopJumpIfTrue, PopTop, ReturnValue, RotThree, RotTwo, SetupExcept, SetupFinally, StartExceptHandler,
            StoreAttr, StoreDeref, StoreFast, StoreFast0, StoreFast1, StoreFast2, StoreGlobal, StoreName,
            StoreSubscr, UnwindJump, WithCleanup, YieldFrom,
        };
        Some(match self {
            LoadNone | LoadTrue | LoadFalse | LoadEllipsis | LoadConstSmallInt | LoadConstObj | LoadNull
            | LoadFast0 | LoadFast1 | LoadFast2 | LoadFast | LoadDeref | LoadName | LoadGlobal | LoadMethod
            | GetIter => 1,
            StoreFast0 | StoreFast1 | StoreFast2 | StoreFast | StoreDeref | StoreName | StoreGlobal | PopTop
            | EndFinally => -1,
            DeleteFast | DeleteDeref | LoadAttr | RotTwo | RotThree | Jump | UnwindJump | PopBlock | PopExcept
            | Not | DeleteName | DeleteGlobal | SetupExcept | SetupFinally => 0,
            DupTop => 1,
            DupTopTwo => 2,
            PopJumpIfTrue | PopJumpIfFalse | JumpIfTrueOrPop | JumpIfFalseOrPop | LoadSubscr | YieldFrom => -1,
            StoreAttr => -2,
            StoreSubscr => -3,
            ForIter => 1,
            ReturnValue => -1,
            StartExceptHandler => 6,
            EndExceptHandler => -5,
            WithCleanup => -7,
            _ => return None,
        })
    }
}
