//! Bytecode representation and virtual machine.
//!
//! - `op` - opcode definitions
//! - `code` - the compiled code unit and constant pool
//! - `builder` - label-patching code builder for the front end and tests
//! - `vm` - the stack-based execution engine

pub use builder::{CodeBuilder, Label, func_const};
pub use code::{Code, Const, FuncConst, Param};
pub use op::{Instr, Opcode};
pub use vm::Vm;

mod builder;
mod code;
mod op;
pub(crate) mod vm;
