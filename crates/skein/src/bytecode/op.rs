//! Opcode definitions.
//!
//! Each instruction carries an operation tag and one `u32` operand whose
//! meaning depends on the tag: a constant-pool index, a name-pool index, an
//! absolute jump target, an argument count, or a [`crate::value::BinaryOp`]
//! discriminant. Jumps are absolute instruction indices.

use strum::{Display, IntoStaticStr};

/// Operation tags executed by the VM dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum Opcode {
    /// Push `consts[arg]`.
    LoadConst,
    /// Push the local named `names[arg]`; `NameError` if unbound.
    LoadLocal,
    /// Pop into the local named `names[arg]`, with closure write-through.
    StoreLocal,
    /// Push the module global (or builtin) named `names[arg]`.
    LoadGlobal,
    /// Pop into the module global named `names[arg]`.
    StoreGlobal,
    /// Pop object; push its attribute `names[arg]` (two-tier protocol).
    LoadAttr,
    /// Pop value then object; set attribute `names[arg]` (property-mediated).
    StoreAttr,
    /// Pop index then object; push `object[index]`.
    LoadIndex,
    /// Pop value, index, object; perform `object[index] = value`.
    StoreIndex,
    /// Push the frame's bound receiver.
    LoadReceiver,
    /// Push the last caught exception value.
    LoadException,
    /// Discard the top of stack.
    Pop,
    /// Duplicate the top of stack.
    Dup,
    /// Pop rhs then lhs; dispatch the binary operator tag `arg`.
    Binary,
    /// Pop value; push its arithmetic negation (or `__neg__` override).
    UnaryNeg,
    /// Pop value; push its boolean negation.
    UnaryNot,
    /// Unconditional jump to instruction `arg`.
    Jump,
    /// Pop condition; jump to `arg` when falsy.
    JumpIfFalse,
    /// Pop condition; jump to `arg` when truthy.
    JumpIfTrue,
    /// Pop `arg` positional arguments then the callee; push the call result.
    Call,
    /// Keyword-aware call: `arg` packs positional count (low 16 bits) and
    /// keyword count (high 16 bits); keyword pairs are pushed as name, value.
    CallKw,
    /// Instantiate the function described by `consts[arg]`.
    MakeFunction,
    /// Instantiate `consts[arg]` as a closure capturing the current frame.
    MakeClosure,
    /// Push a fresh user type descriptor named `names[arg]`.
    MakeType,
    /// Pop a base type; push a fresh derived type descriptor named `names[arg]`.
    MakeSubtype,
    /// Pop `arg` constructor arguments, the base type, then the target
    /// instance; run attribute-copy inheritance onto the target.
    Inherit,
    /// Pop a mixin type then a target; copy the mixin's attributes onto the target.
    ApplyMixin,
    /// Pop the return value and leave the frame.
    Return,
    /// Pop a value and suspend the frame, yielding it.
    Yield,
    /// Pop a value and raise it as an exception.
    Raise,
    /// Register an exception handler resuming at instruction `arg`.
    PushHandler,
    /// Discard the most recently registered handler (try block exited cleanly).
    PopHandler,
    /// Pop a resource value; call its enter hook, register it for disposal,
    /// and push the hook's result.
    EnterWith,
    /// Unregister the most recent resource and invoke its exit hook.
    ExitWith,
    /// Pop a value; push an iterator over it.
    IterNew,
    /// Advance the iterator at top of stack; on exhaustion pop it and jump to `arg`.
    IterAdvance,
    /// Push the iterator's current value.
    IterCurrent,
    /// Pop `arg` values; push a list of them.
    BuildList,
    /// Pop `arg` values; push a tuple of them.
    BuildTuple,
    /// Pop `arg` key/value pairs; push a dict of them.
    BuildDict,
    /// Resolve the module path `names[arg]` through the host context; push it.
    Import,
}

/// A single decoded instruction.
#[derive(Debug, Clone, Copy)]
pub struct Instr {
    pub op: Opcode,
    pub arg: u32,
}

impl Instr {
    #[must_use]
    pub fn new(op: Opcode, arg: u32) -> Self {
        Self { op, arg }
    }
}
