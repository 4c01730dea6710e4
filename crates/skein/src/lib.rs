#![doc = include_str!("../../../README.md")]
#![expect(clippy::cast_possible_truncation, reason = "numeric narrowing is checked or intentional")]
#![expect(clippy::needless_pass_by_value, reason = "call APIs pass argument vectors consistently")]

pub mod bytecode;
mod exception;
mod frame;
mod function;
mod heap;
mod module;
mod native;
mod object;
pub mod tracer;
pub mod types;
mod value;

pub use crate::{
    bytecode::{Code, CodeBuilder, Const, FuncConst, Instr, Label, Opcode, Param, Vm, func_const},
    exception::{ExcType, ExceptionRaise, RunError, RunResult, TraceFrame, UnhandledException},
    frame::{Frame, FrameId, HandlerRecord},
    function::FuncDef,
    heap::{Heap, HeapId, TypeRegistry},
    module::{HostContext, ImportResolver, alloc_module, module_name},
    native::{NativeFunction, NativeImpl},
    object::{BuiltinType, DictKey, GenState, GeneratorData, GuestObject, ObjKind, TypeData},
    tracer::{NoopTracer, StderrTracer, TraceAction, VmTracer},
    types::{exception_type_of, exception_type_of_class, make_builtins_module},
    value::{BinaryOp, Value},
};
