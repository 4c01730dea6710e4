//! The stack-based execution engine.
//!
//! The VM runs a single fetch-decode-execute loop over whichever frame sits
//! on top of the explicit call stack: a guest call pushes a frame and the
//! loop simply continues there, so guest recursion consumes no host stack.
//! Re-entrant protocol calls (operator overrides, constructors, exit hooks)
//! run a fresh loop scoped to their own base frame. Exceptions propagate
//! through [`RunError`] with explicit per-frame handler records and disposer
//! draining (see `exceptions.rs`).

mod attr;
mod binary;
mod call;
mod exceptions;

use std::rc::Rc;

use crate::{
    bytecode::{Code, Const, FuncConst, Opcode},
    exception::{ExcType, RunError, RunResult, UnhandledException},
    frame::{Frame, FrameArena, FrameId, HandlerRecord},
    function::FuncDef,
    heap::{Heap, HeapId},
    module::{HostContext, alloc_module},
    native::NativeFunction,
    object::ObjKind,
    tracer::{NoopTracer, TraceAction, VmTracer},
    types::{class, make_builtins_module},
    value::{BinaryOp, Value},
};

/// How a frame's instruction loop ended.
#[derive(Debug)]
pub(crate) enum ExecOutcome {
    /// The frame returned; disposables have been drained and the frame popped.
    Return(Value),
    /// The frame suspended at a yield; it remains alive, off the call stack.
    Yielded(Value),
}

/// Result of executing one instruction.
enum StepResult {
    Continue,
    /// The frame hit a `Return`; it has not been popped yet.
    Returned(Value),
    /// The frame suspended at a `Yield`; it is already off the call stack.
    Yielded(Value),
}

/// A single-threaded virtual machine instance.
///
/// Each instance owns its heap, frame slab, and host context; multiple
/// instances may run on separate threads with no shared state.
#[derive(Debug)]
pub struct Vm<Tr: VmTracer = NoopTracer> {
    pub heap: Heap,
    pub(crate) frames: FrameArena,
    /// The call stack: frame ids, innermost last.
    pub(crate) stack: Vec<FrameId>,
    pub(crate) context: HostContext,
    /// The prelude module consulted by global loads as a fallback.
    pub(crate) builtins: HeapId,
    /// Last caught exception, readable by the `LoadException` instruction.
    pub(crate) last_exception: Value,
    pub(crate) tracer: Tr,
    /// Guards guest recursion against overflowing the host stack.
    max_depth: usize,
}

impl Vm<NoopTracer> {
    #[must_use]
    pub fn new(context: HostContext) -> Self {
        Self::with_tracer(context, NoopTracer)
    }
}

impl<Tr: VmTracer> Vm<Tr> {
    #[must_use]
    pub fn with_tracer(context: HostContext, tracer: Tr) -> Self {
        let mut heap = Heap::new();
        let builtins = make_builtins_module(&mut heap);
        Self {
            heap,
            frames: FrameArena::default(),
            stack: Vec::new(),
            context,
            builtins,
            last_exception: Value::None,
            tracer,
            max_depth: 200,
        }
    }

    /// Adjusts the guest call-depth limit.
    pub fn set_max_depth(&mut self, depth: usize) {
        self.max_depth = depth;
    }

    pub fn context_mut(&mut self) -> &mut HostContext {
        &mut self.context
    }

    /// Allocates a fresh module object.
    pub fn new_module(&mut self, name: impl Into<String>) -> Value {
        Value::Ref(alloc_module(&mut self.heap, name))
    }

    /// Wraps a host function as a guest callable value.
    pub fn native_value(
        &mut self,
        name: &str,
        func: impl Fn(&mut Heap, &[Value]) -> RunResult<Value> + 'static,
    ) -> Value {
        let native_type = self.heap.types.native_type;
        Value::Ref(
            self.heap
                .allocate(ObjKind::Native(NativeFunction::new(name, func)), native_type),
        )
    }

    /// Allocates a property descriptor mediating attribute access.
    pub fn make_property(&mut self, getter: Value, setter: Option<Value>) -> Value {
        let property_type = self.heap.types.property_type;
        Value::Ref(self.heap.allocate(ObjKind::Property { getter, setter }, property_type))
    }

    /// Runs a code unit in a fresh module, surfacing unhandled exceptions to
    /// the host.
    pub fn run_module(&mut self, code: Rc<Code>, name: &str) -> Result<Value, UnhandledException> {
        let module = self.new_module(name);
        self.run_code(code, module)
    }

    /// Runs a code unit against an existing module's global scope.
    pub fn run_code(&mut self, code: Rc<Code>, module: Value) -> Result<Value, UnhandledException> {
        let Value::Ref(module_id) = module else {
            return Err(UnhandledException::from_run_error(ExcType::type_error(
                "run_code requires a module value",
            )));
        };
        let frame = Frame::new(code, module_id, None);
        let frame_id = self.frames.alloc(frame);
        self.stack.push(frame_id);
        match self.run_frame(frame_id) {
            Ok(ExecOutcome::Return(value)) => Ok(value),
            Ok(ExecOutcome::Yielded(first)) => Ok(self.wrap_generator(frame_id, first)),
            Err(error) => Err(UnhandledException::from_run_error(error)),
        }
    }

    /// Invokes a callable value with positional arguments.
    ///
    /// Guest exceptions unhandled within the call surface as `Err`.
    pub fn call_value(&mut self, callee: Value, args: Vec<Value>) -> RunResult<Value> {
        self.invoke(callee, args, Vec::new(), None)
    }

    /// Structural trait check against the value's current attribute table.
    pub fn satisfies_trait(&self, value: Value, trait_type: Value) -> RunResult<bool> {
        let Value::Ref(trait_id) = trait_type else {
            return Err(ExcType::type_error("a type descriptor is required here"));
        };
        self.heap.get(trait_id).as_type()?;
        Ok(class::satisfies_trait(&self.heap, value, trait_id))
    }

    /// The fetch-decode-execute loop, scoped to `base`.
    ///
    /// Always executes the frame on top of the call stack: guest calls push a
    /// frame and the loop continues there without consuming host stack, which
    /// is what lets the depth guard bound guest recursion. The loop exits
    /// when `base` returns or suspends. Errors have already unwound every
    /// frame down to and including `base` (disposables drained, frames
    /// popped) when they propagate out of here.
    pub(crate) fn run_frame(&mut self, base: FrameId) -> RunResult<ExecOutcome> {
        loop {
            let Some(&frame_id) = self.stack.last() else {
                return Err(RunError::internal("call stack exhausted while executing"));
            };
            let fetched = {
                let frame = self.frames.get(frame_id);
                // An aborting frame or one that ran past its last instruction
                // performs an implicit `return none`.
                if frame.aborting || frame.ip >= frame.code.instrs.len() {
                    None
                } else {
                    let instr = frame.code.instrs[frame.ip];
                    Some((instr.op, instr.arg, frame.ip, frame.stack.len()))
                }
            };

            let step = match fetched {
                None => StepResult::Returned(Value::None),
                Some((op, arg, ip, stack_depth)) => {
                    if self.tracer.before_instruction(ip, op, stack_depth, self.stack.len()) == TraceAction::Pause {
                        self.tracer.block_until_resumed();
                    }
                    self.frames.get_mut(frame_id).ip = ip + 1;
                    match self.step(frame_id, op, arg) {
                        Ok(step) => step,
                        Err(error) => {
                            // The erring frame is still live and on top.
                            self.dispatch_error(base, error)?;
                            continue;
                        }
                    }
                }
            };

            match step {
                StepResult::Continue => {}
                StepResult::Returned(value) => match self.finish_frame_return(frame_id, value) {
                    Ok(value) => {
                        if frame_id == base {
                            return Ok(ExecOutcome::Return(value));
                        }
                        self.push_to_top(value)?;
                    }
                    Err(error) => {
                        // A return-path exit hook failed; the frame is
                        // already popped, so the caller side handles it.
                        if frame_id == base {
                            return Err(error);
                        }
                        self.dispatch_error(base, error)?;
                    }
                },
                StepResult::Yielded(value) => {
                    if frame_id == base {
                        return Ok(ExecOutcome::Yielded(value));
                    }
                    // First suspension of a nested call: the call's result is
                    // a generator holding the frame.
                    let generator = self.wrap_generator(frame_id, value);
                    self.push_to_top(generator)?;
                }
            }
        }
    }

    /// Routes an in-flight exception to handlers at and above the current
    /// stack top, stopping at `base`.
    ///
    /// `Ok(())` means some frame in this loop's region caught it and will
    /// resume at its handler; `Err` means it escaped past `base`, with every
    /// frame in between unwound.
    fn dispatch_error(&mut self, base: FrameId, error: RunError) -> RunResult<()> {
        let mut error = error;
        loop {
            let Some(&top) = self.stack.last() else {
                return Err(error);
            };
            let top_is_base = top == base;
            match self.catch_in_frame(top, error) {
                Ok(()) => return Ok(()),
                Err(escaped) => {
                    if top_is_base {
                        return Err(escaped);
                    }
                    error = escaped;
                }
            }
        }
    }

    /// Pushes a completed call's result onto the operand stack of the frame
    /// now on top.
    fn push_to_top(&mut self, value: Value) -> RunResult<()> {
        let Some(&top) = self.stack.last() else {
            return Err(RunError::internal("no caller frame to receive a result"));
        };
        self.push(top, value);
        Ok(())
    }

    /// Executes one instruction against the frame.
    fn step(&mut self, frame_id: FrameId, op: Opcode, arg: u32) -> RunResult<StepResult> {
        match op {
            Opcode::LoadConst => {
                let value = self.const_value(frame_id, arg)?;
                self.push(frame_id, value);
            }
            Opcode::LoadLocal => {
                let name = self.name(frame_id, arg)?;
                let Some(value) = self.frames.get(frame_id).locals.get(&name).copied() else {
                    return Err(RunError::new(ExcType::NameError, format!("name '{name}' is not defined")));
                };
                self.push(frame_id, value);
            }
            Opcode::StoreLocal => {
                let name = self.name(frame_id, arg)?;
                let value = self.pop(frame_id)?;
                self.store_local(frame_id, name, value);
            }
            Opcode::LoadGlobal => {
                let name = self.name(frame_id, arg)?;
                let module = self.frames.get(frame_id).module;
                let value = self
                    .heap
                    .get(module)
                    .get_own_attr(&name)
                    .or_else(|| self.heap.get(self.builtins).get_own_attr(&name));
                let Some(value) = value else {
                    return Err(RunError::new(ExcType::NameError, format!("name '{name}' is not defined")));
                };
                self.push(frame_id, value);
            }
            Opcode::StoreGlobal => {
                let name = self.name(frame_id, arg)?;
                let value = self.pop(frame_id)?;
                let module = self.frames.get(frame_id).module;
                self.heap.get_mut(module).attrs.insert(name, value);
            }
            Opcode::LoadAttr => {
                let name = self.name(frame_id, arg)?;
                let object = self.pop(frame_id)?;
                let value = self.get_attr(object, &name)?;
                self.push(frame_id, value);
            }
            Opcode::StoreAttr => {
                let name = self.name(frame_id, arg)?;
                let value = self.pop(frame_id)?;
                let object = self.pop(frame_id)?;
                self.set_attr(object, &name, value)?;
            }
            Opcode::LoadIndex => {
                let index = self.pop(frame_id)?;
                let object = self.pop(frame_id)?;
                let value = self.get_index(object, index)?;
                self.push(frame_id, value);
            }
            Opcode::StoreIndex => {
                let value = self.pop(frame_id)?;
                let index = self.pop(frame_id)?;
                let object = self.pop(frame_id)?;
                self.set_index(object, index, value)?;
            }
            Opcode::LoadReceiver => {
                let Some(receiver) = self.frames.get(frame_id).receiver else {
                    return Err(ExcType::type_error("no receiver bound in this frame"));
                };
                self.push(frame_id, receiver);
            }
            Opcode::LoadException => {
                let value = self.last_exception;
                self.push(frame_id, value);
            }
            Opcode::Pop => {
                self.pop(frame_id)?;
            }
            Opcode::Dup => {
                let value = self.peek(frame_id)?;
                self.push(frame_id, value);
            }
            Opcode::Binary => {
                let Some(tag) = BinaryOp::from_u32(arg) else {
                    return Err(RunError::internal(format!("invalid binary operator tag {arg}")));
                };
                let rhs = self.pop(frame_id)?;
                let lhs = self.pop(frame_id)?;
                let value = self.binary_op(tag, lhs, rhs)?;
                self.push(frame_id, value);
            }
            Opcode::UnaryNeg => {
                let value = self.pop(frame_id)?;
                let result = self.unary_neg(value)?;
                self.push(frame_id, result);
            }
            Opcode::UnaryNot => {
                let value = self.pop(frame_id)?;
                let truthy = value.is_truthy(&self.heap);
                self.push(frame_id, Value::Bool(!truthy));
            }
            Opcode::Jump => {
                self.frames.get_mut(frame_id).ip = arg as usize;
            }
            Opcode::JumpIfFalse => {
                let condition = self.pop(frame_id)?;
                if !condition.is_truthy(&self.heap) {
                    self.frames.get_mut(frame_id).ip = arg as usize;
                }
            }
            Opcode::JumpIfTrue => {
                let condition = self.pop(frame_id)?;
                if condition.is_truthy(&self.heap) {
                    self.frames.get_mut(frame_id).ip = arg as usize;
                }
            }
            Opcode::Call => {
                let args = self.pop_n(frame_id, arg as usize)?;
                let callee = self.pop(frame_id)?;
                // Guest functions continue in the main loop; everything else
                // completes synchronously.
                if let Some(result) = self.begin_call(callee, args, Vec::new(), None)? {
                    self.push(frame_id, result);
                }
            }
            Opcode::CallKw => {
                let npos = (arg & 0xFFFF) as usize;
                let nkw = (arg >> 16) as usize;
                let mut kwargs = Vec::with_capacity(nkw);
                for _ in 0..nkw {
                    let value = self.pop(frame_id)?;
                    let key = self.pop(frame_id)?;
                    let Some(name) = self.heap.as_str(key) else {
                        return Err(ExcType::type_error("keyword argument names must be strings"));
                    };
                    kwargs.push((name.to_owned(), value));
                }
                kwargs.reverse();
                let args = self.pop_n(frame_id, npos)?;
                let callee = self.pop(frame_id)?;
                if let Some(result) = self.begin_call(callee, args, kwargs, None)? {
                    self.push(frame_id, result);
                }
            }
            Opcode::MakeFunction => {
                let value = self.instantiate_function(frame_id, arg, false)?;
                self.push(frame_id, value);
            }
            Opcode::MakeClosure => {
                let value = self.instantiate_function(frame_id, arg, true)?;
                self.push(frame_id, value);
            }
            Opcode::MakeType => {
                let name = self.name(frame_id, arg)?;
                let type_id = class::alloc_user_type(&mut self.heap, name, None);
                self.push(frame_id, Value::Ref(type_id));
            }
            Opcode::MakeSubtype => {
                let name = self.name(frame_id, arg)?;
                let base = self.pop(frame_id)?;
                let Value::Ref(base_id) = base else {
                    return Err(ExcType::type_error("base of a subtype must be a type descriptor"));
                };
                self.heap.get(base_id).as_type()?;
                let type_id = class::alloc_user_type(&mut self.heap, name, Some(base_id));
                self.push(frame_id, Value::Ref(type_id));
            }
            Opcode::Inherit => {
                let args = self.pop_n(frame_id, arg as usize)?;
                let base = self.pop(frame_id)?;
                let target = self.pop(frame_id)?;
                self.inherit(base, target, args)?;
            }
            Opcode::ApplyMixin => {
                let mixin = self.pop(frame_id)?;
                let target = self.pop(frame_id)?;
                let Value::Ref(mixin_id) = mixin else {
                    return Err(ExcType::type_error("a type descriptor is required here"));
                };
                self.heap.get(mixin_id).as_type()?;
                class::apply_mixin(&mut self.heap, target, mixin_id)?;
            }
            Opcode::Return => {
                let value = self.frames.get_mut(frame_id).stack.pop().unwrap_or(Value::None);
                return Ok(StepResult::Returned(value));
            }
            Opcode::Yield => {
                let value = self.pop(frame_id)?;
                let frame = self.frames.get_mut(frame_id);
                frame.yielded = true;
                frame.pinned = true;
                debug_assert_eq!(self.stack.last(), Some(&frame_id));
                self.stack.pop();
                self.tracer.on_return(self.stack.len());
                return Ok(StepResult::Yielded(value));
            }
            Opcode::Raise => {
                let value = self.pop(frame_id)?;
                return Err(self.make_raise(value)?);
            }
            Opcode::PushHandler => {
                let frame = self.frames.get_mut(frame_id);
                let record = HandlerRecord {
                    stack_depth: frame.stack.len(),
                    disposer_depth: frame.disposables.len(),
                    resume: arg as usize,
                };
                frame.handlers.push(record);
            }
            Opcode::PopHandler => {
                if self.frames.get_mut(frame_id).handlers.pop().is_none() {
                    return Err(RunError::internal("PopHandler with no registered handler"));
                }
            }
            Opcode::EnterWith => {
                let resource = self.pop(frame_id)?;
                let result = self.enter_with(frame_id, resource)?;
                self.push(frame_id, result);
            }
            Opcode::ExitWith => {
                let Some(resource) = self.frames.get_mut(frame_id).disposables.pop() else {
                    return Err(RunError::internal("ExitWith with no registered disposable"));
                };
                self.call_exit_hook(resource)?;
            }
            Opcode::IterNew => {
                let value = self.pop(frame_id)?;
                let iter = self.iter_new(value)?;
                self.push(frame_id, iter);
            }
            Opcode::IterAdvance => {
                let iter = self.peek(frame_id)?;
                if !self.advance(iter)? {
                    self.pop(frame_id)?;
                    self.frames.get_mut(frame_id).ip = arg as usize;
                }
            }
            Opcode::IterCurrent => {
                let iter = self.peek(frame_id)?;
                let value = self.current(iter)?;
                self.push(frame_id, value);
            }
            Opcode::BuildList => {
                let items = self.pop_n(frame_id, arg as usize)?;
                let value = self.heap.alloc_list(items);
                self.push(frame_id, value);
            }
            Opcode::BuildTuple => {
                let items = self.pop_n(frame_id, arg as usize)?;
                let value = self.heap.alloc_tuple(items);
                self.push(frame_id, value);
            }
            Opcode::BuildDict => {
                let value = self.build_dict(frame_id, arg as usize)?;
                self.push(frame_id, value);
            }
            Opcode::Import => {
                let path = self.name(frame_id, arg)?;
                let module = self.import_module(&path)?;
                self.push(frame_id, module);
            }
        }
        Ok(StepResult::Continue)
    }

    /// Return path: drains disposables in reverse acquisition order, pops the
    /// frame, and releases it unless retained.
    ///
    /// Exit-hook failures are remembered and re-raised after the remaining
    /// hooks have run and the frame is popped.
    fn finish_frame_return(&mut self, frame_id: FrameId, value: Value) -> RunResult<Value> {
        let disposables = std::mem::take(&mut self.frames.get_mut(frame_id).disposables);
        let mut first_error = None;
        for resource in disposables.into_iter().rev() {
            if let Err(error) = self.call_exit_hook(resource)
                && first_error.is_none()
            {
                first_error = Some(error);
            }
        }
        debug_assert_eq!(self.stack.last(), Some(&frame_id));
        self.stack.pop();
        self.frames.release(frame_id);
        self.tracer.on_return(self.stack.len());
        match first_error {
            Some(error) => Err(error),
            None => Ok(value),
        }
    }

    /// Store with closure write-through: a name that exists in the origin
    /// frame's locals is also written there.
    fn store_local(&mut self, frame_id: FrameId, name: String, value: Value) {
        let origin = self.frames.get(frame_id).parent_locals;
        if let Some(origin_id) = origin
            && self.frames.get(origin_id).locals.contains_key(&name)
        {
            self.frames.get_mut(origin_id).locals.insert(name.clone(), value);
        }
        self.frames.get_mut(frame_id).locals.insert(name, value);
    }

    /// Instantiates a function constant, optionally capturing the current frame.
    fn instantiate_function(&mut self, frame_id: FrameId, const_idx: u32, capture: bool) -> RunResult<Value> {
        let constant = {
            let frame = self.frames.get(frame_id);
            frame
                .code
                .consts
                .get(const_idx as usize)
                .cloned()
                .ok_or_else(|| RunError::internal(format!("constant index {const_idx} out of range")))?
        };
        let Const::Func(template) = constant else {
            return Err(RunError::internal("MakeFunction operand is not a function constant"));
        };
        let func = self.func_def_from_template(&template, self.frames.get(frame_id).module)?;
        if capture {
            self.frames.get_mut(frame_id).retained = true;
            let closure_type = self.heap.types.closure_type;
            Ok(Value::Ref(self.heap.allocate(
                ObjKind::Closure {
                    func: Rc::new(func),
                    captured: frame_id,
                },
                closure_type,
            )))
        } else {
            let function_type = self.heap.types.function_type;
            Ok(Value::Ref(self.heap.allocate(ObjKind::Function(Rc::new(func)), function_type)))
        }
    }

    /// Materializes a function template into a runtime definition.
    fn func_def_from_template(&mut self, template: &FuncConst, module: HeapId) -> RunResult<FuncDef> {
        let mut defaults = Vec::with_capacity(template.defaults.len());
        for default in &template.defaults {
            defaults.push(self.materialize_const(default)?);
        }
        Ok(FuncDef {
            name: template.name.clone(),
            code: template.code.clone(),
            params: template.params.clone(),
            defaults,
            varargs: template.varargs.clone(),
            kwargs: template.kwargs.clone(),
            module,
        })
    }

    fn const_value(&mut self, frame_id: FrameId, index: u32) -> RunResult<Value> {
        let constant = {
            let frame = self.frames.get(frame_id);
            frame
                .code
                .consts
                .get(index as usize)
                .cloned()
                .ok_or_else(|| RunError::internal(format!("constant index {index} out of range")))?
        };
        self.materialize_const(&constant)
    }

    fn materialize_const(&mut self, constant: &Const) -> RunResult<Value> {
        Ok(match constant {
            Const::None => Value::None,
            Const::Bool(b) => Value::Bool(*b),
            Const::Int(i) => Value::Int(*i),
            Const::Float(f) => Value::Float(*f),
            Const::Str(s) => self.heap.alloc_str(s.clone()),
            Const::Func(_) => {
                return Err(RunError::internal(
                    "function constants are loaded via MakeFunction/MakeClosure",
                ));
            }
        })
    }

    fn build_dict(&mut self, frame_id: FrameId, pairs: usize) -> RunResult<Value> {
        let flat = self.pop_n(frame_id, pairs * 2)?;
        let dict = self.heap.alloc_dict();
        let Value::Ref(dict_id) = dict else { unreachable!() };
        for chunk in flat.chunks(2) {
            let key = crate::object::DictKey::from_value(chunk[0], &self.heap)?;
            if let ObjKind::Dict(map) = &mut self.heap.get_mut(dict_id).kind {
                map.insert(key, chunk[1]);
            }
        }
        Ok(dict)
    }

    fn import_module(&mut self, path: &str) -> RunResult<Value> {
        let Self { heap, context, .. } = self;
        match context.resolve(heap, path)? {
            Some(module) => Ok(module),
            None => Err(RunError::new(
                ExcType::ImportError,
                format!("no module named '{path}'"),
            )),
        }
    }

    fn name(&self, frame_id: FrameId, index: u32) -> RunResult<String> {
        self.frames
            .get(frame_id)
            .code
            .names
            .get(index as usize)
            .cloned()
            .ok_or_else(|| RunError::internal(format!("name index {index} out of range")))
    }

    pub(crate) fn push(&mut self, frame_id: FrameId, value: Value) {
        self.frames.get_mut(frame_id).stack.push(value);
    }

    pub(crate) fn pop(&mut self, frame_id: FrameId) -> RunResult<Value> {
        self.frames
            .get_mut(frame_id)
            .stack
            .pop()
            .ok_or_else(|| RunError::internal("operand stack underflow"))
    }

    fn peek(&self, frame_id: FrameId) -> RunResult<Value> {
        self.frames
            .get(frame_id)
            .stack
            .last()
            .copied()
            .ok_or_else(|| RunError::internal("operand stack underflow"))
    }

    /// Pops `n` values, preserving push order.
    fn pop_n(&mut self, frame_id: FrameId, n: usize) -> RunResult<Vec<Value>> {
        let stack = &mut self.frames.get_mut(frame_id).stack;
        if stack.len() < n {
            return Err(RunError::internal("operand stack underflow"));
        }
        Ok(stack.split_off(stack.len() - n))
    }

    pub(crate) fn depth_check(&self) -> RunResult<()> {
        if self.stack.len() >= self.max_depth {
            return Err(RunError::new(
                ExcType::InternalError,
                "maximum call depth exceeded",
            ));
        }
        Ok(())
    }
}
