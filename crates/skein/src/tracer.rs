//! VM execution tracing infrastructure.
//!
//! Trait-based tracing with zero-cost abstraction: the VM carries the tracer
//! as a type parameter, so [`NoopTracer`] hooks compile away entirely via
//! monomorphization. A debugger attaches by returning [`TraceAction::Pause`]
//! from the instruction hook and blocking in `block_until_resumed` — pausing
//! is cooperative, never preemptive.

use crate::{bytecode::Opcode, exception::ExcType};

/// Decision returned by the per-instruction hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceAction {
    Continue,
    /// Ask the engine to call `block_until_resumed` before executing the
    /// instruction.
    Pause,
}

/// Trait for VM execution tracing.
///
/// All methods have default no-op implementations; implementations only
/// override the hooks they care about.
pub trait VmTracer {
    /// Called before each instruction dispatch. The hottest hook;
    /// implementations should be as lightweight as possible.
    #[inline]
    fn before_instruction(&mut self, _ip: usize, _opcode: Opcode, _stack_depth: usize, _frame_depth: usize) -> TraceAction {
        TraceAction::Continue
    }

    /// Called when `before_instruction` returned [`TraceAction::Pause`].
    /// Implementations block here until externally resumed.
    fn block_until_resumed(&mut self) {}

    /// Called when a new call frame is pushed.
    fn on_call(&mut self, _function: &str, _frame_depth: usize) {}

    /// Called when a frame returns or suspends.
    fn on_return(&mut self, _frame_depth: usize) {}

    /// Called when an exception is raised, before handler search.
    fn on_raise(&mut self, _exc_type: ExcType, _line: u32) {}
}

/// Zero-cost production tracer.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl VmTracer for NoopTracer {}

/// Human-readable execution log to stderr; debugging aid.
#[derive(Debug, Default)]
pub struct StderrTracer {
    instructions: u64,
}

impl StderrTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total instructions dispatched so far.
    #[must_use]
    pub fn instruction_count(&self) -> u64 {
        self.instructions
    }
}

impl VmTracer for StderrTracer {
    fn before_instruction(&mut self, ip: usize, opcode: Opcode, stack_depth: usize, frame_depth: usize) -> TraceAction {
        self.instructions += 1;
        eprintln!("[skein] {frame_depth:>2} {ip:>4} {opcode} (stack {stack_depth})");
        TraceAction::Continue
    }

    fn on_call(&mut self, function: &str, frame_depth: usize) {
        eprintln!("[skein] {frame_depth:>2} call {function}");
    }

    fn on_return(&mut self, frame_depth: usize) {
        eprintln!("[skein] {frame_depth:>2} return");
    }

    fn on_raise(&mut self, exc_type: ExcType, line: u32) {
        eprintln!("[skein] raise {exc_type} at line {line}");
    }
}
