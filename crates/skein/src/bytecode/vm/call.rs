//! Invocation, construction, inheritance, and iteration.
//!
//! Call instructions go through [`Vm::begin_call`], which pushes guest frames
//! for the flat instruction loop to continue into; protocol hooks and host
//! entry points use [`Vm::invoke`], which runs the callee to completion. In
//! both: plain functions run a fresh frame, bound methods delegate with their
//! receiver, closures duplicate their captured frame, natives cross the host
//! bridge, and type descriptors construct instances. A frame that suspends at
//! a yield on its initial run becomes a generator holding that frame.

use std::rc::Rc;

use crate::{
    exception::{ExcType, RunError, RunResult},
    frame::{Frame, FrameId},
    heap::HeapId,
    native::NativeFunction,
    object::{BuiltinType, DictKey, GenState, GeneratorData, ObjKind},
    tracer::VmTracer,
    types::class,
    value::Value,
};

use super::{ExecOutcome, Vm};

/// Resolved invocation strategy, computed before any frame mutation.
enum CallPlan {
    Func(Rc<crate::function::FuncDef>, Option<FrameId>),
    Bound(Value, Value),
    Native(NativeFunction),
    Construct(HeapId),
    Other,
}

impl<Tr: VmTracer> Vm<Tr> {
    /// Invokes any callable value.
    ///
    /// `receiver` binds the callee frame's receiver slot; a bound method's
    /// own receiver takes precedence over it.
    pub(crate) fn invoke(
        &mut self,
        callee: Value,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        receiver: Option<Value>,
    ) -> RunResult<Value> {
        let Value::Ref(id) = callee else {
            return Err(self.not_callable(callee));
        };
        let plan = match &self.heap.get(id).kind {
            ObjKind::Function(func) => CallPlan::Func(func.clone(), None),
            ObjKind::Closure { func, captured } => CallPlan::Func(func.clone(), Some(*captured)),
            ObjKind::BoundMethod { func, receiver } => CallPlan::Bound(*func, *receiver),
            ObjKind::Native(native) => CallPlan::Native(native.clone()),
            ObjKind::Type(_) => CallPlan::Construct(id),
            _ => CallPlan::Other,
        };
        match plan {
            CallPlan::Func(func, captured) => self.invoke_func(&func, callee, args, kwargs, receiver, captured),
            CallPlan::Bound(func, bound_receiver) => self.invoke(func, args, kwargs, Some(bound_receiver)),
            CallPlan::Native(native) => {
                if !kwargs.is_empty() {
                    return Err(RunError::new(
                        ExcType::ArgumentError,
                        format!("{}() takes no keyword arguments", native.name),
                    ));
                }
                native.call(&mut self.heap, &args)
            }
            CallPlan::Construct(type_id) => self.construct_type(type_id, args, kwargs),
            CallPlan::Other => match self.lookup_attr_raw(callee, "__call__") {
                Some(hook) if hook != callee => self.invoke(hook, args, kwargs, Some(callee)),
                _ => Err(self.not_callable(callee)),
            },
        }
    }

    fn not_callable(&self, callee: Value) -> RunError {
        ExcType::type_error(format!("'{}' value is not callable", self.heap.type_name(callee)))
    }

    /// Starts a call from the instruction loop without consuming host stack.
    ///
    /// Guest functions and closures (including through bound-method chains)
    /// only push their frame: the main loop continues there and delivers the
    /// result when the frame completes. Every other callable completes
    /// synchronously and the result comes back as `Some`.
    pub(crate) fn begin_call(
        &mut self,
        callee: Value,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        receiver: Option<Value>,
    ) -> RunResult<Option<Value>> {
        let Value::Ref(id) = callee else {
            return Err(self.not_callable(callee));
        };
        let plan = match &self.heap.get(id).kind {
            ObjKind::Function(func) => CallPlan::Func(func.clone(), None),
            ObjKind::Closure { func, captured } => CallPlan::Func(func.clone(), Some(*captured)),
            ObjKind::BoundMethod { func, receiver } => CallPlan::Bound(*func, *receiver),
            _ => CallPlan::Other,
        };
        match plan {
            CallPlan::Func(func, captured) => {
                self.push_call_frame(&func, callee, args, kwargs, receiver, captured)?;
                Ok(None)
            }
            CallPlan::Bound(func, bound_receiver) => self.begin_call(func, args, kwargs, Some(bound_receiver)),
            _ => self.invoke(callee, args, kwargs, receiver).map(Some),
        }
    }

    /// Runs a function or closure in a fresh frame to completion.
    ///
    /// If the frame suspends at a yield instead of returning, the result is
    /// a generator holding the frame.
    fn invoke_func(
        &mut self,
        func: &Rc<crate::function::FuncDef>,
        callee: Value,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        receiver: Option<Value>,
        captured: Option<FrameId>,
    ) -> RunResult<Value> {
        let frame_id = self.push_call_frame(func, callee, args, kwargs, receiver, captured)?;
        match self.run_frame(frame_id)? {
            ExecOutcome::Return(value) => Ok(value),
            ExecOutcome::Yielded(first) => Ok(self.wrap_generator(frame_id, first)),
        }
    }

    /// Binds arguments into a fresh frame and pushes it onto the call stack.
    ///
    /// A closure invocation starts from a duplicate of the captured frame's
    /// locals at their current state, with write-through back to the origin
    /// for names that exist there.
    fn push_call_frame(
        &mut self,
        func: &Rc<crate::function::FuncDef>,
        callee: Value,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        receiver: Option<Value>,
        captured: Option<FrameId>,
    ) -> RunResult<FrameId> {
        self.depth_check()?;
        let parent = self.stack.last().copied();
        let mut frame = Frame::new(func.code.clone(), func.module, parent);
        if let Some(origin) = captured {
            frame.locals = self.frames.get(origin).locals.clone();
            frame.parent_locals = Some(origin);
        }
        func.bind_arguments(&args, &kwargs, &mut self.heap, &mut frame.locals)?;
        frame.receiver = receiver;
        frame.callee = callee;
        frame.args = args;
        let frame_id = self.frames.alloc(frame);
        self.stack.push(frame_id);
        self.tracer.on_call(&func.name, self.stack.len());
        Ok(frame_id)
    }

    /// Wraps a frame that just suspended at its first yield into a generator,
    /// consuming the call metadata the frame carried.
    pub(crate) fn wrap_generator(&mut self, frame_id: FrameId, first: Value) -> Value {
        let (callee, args) = {
            let frame = self.frames.get_mut(frame_id);
            (frame.callee, std::mem::take(&mut frame.args))
        };
        self.make_generator(callee, frame_id, args, first)
    }

    /// Wraps a suspended frame as a generator in the `Fresh` state, holding
    /// the value produced by the initial run to the first yield.
    pub(crate) fn make_generator(&mut self, func: Value, frame_id: FrameId, args: Vec<Value>, first: Value) -> Value {
        let generator_type = self.heap.types.generator_type;
        let gen_id = self.heap.allocate(
            ObjKind::Generator(GeneratorData {
                func,
                frame: frame_id,
                args,
                state: GenState::Fresh,
                last: first,
            }),
            generator_type,
        );
        self.frames.get_mut(frame_id).generator = Some(gen_id);
        Value::Ref(gen_id)
    }

    /// Constructs an instance by invoking a type descriptor.
    pub(crate) fn construct_type(&mut self, type_id: HeapId, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> RunResult<Value> {
        let (builtin, declared_base, name) = {
            let data = self.heap.get(type_id).as_type()?;
            (data.builtin, data.base, data.name.clone())
        };
        match builtin {
            None => self.construct_instance(type_id, declared_base, &name, args, kwargs),
            Some(BuiltinType::Exception(_)) => self.construct_exception(type_id, &name, args),
            Some(builtin) => self.construct_builtin(builtin, &name, args, kwargs),
        }
    }

    /// User-class construction: allocate, seed the class's attributes onto
    /// the instance (binding methods), then run the constructor. A class
    /// without one but with a declared base forwards the arguments to the
    /// base constructor via inheritance.
    fn construct_instance(
        &mut self,
        type_id: HeapId,
        declared_base: Option<HeapId>,
        name: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> RunResult<Value> {
        let instance = Value::Ref(self.heap.allocate(ObjKind::Plain, type_id));
        class::seed_instance_attrs(&mut self.heap, type_id, instance);
        if let Some(init) = self.lookup_attr_raw(instance, "__init__") {
            self.invoke(init, args, kwargs, Some(instance))?;
        } else if let Some(base) = declared_base {
            self.inherit(Value::Ref(base), instance, args)?;
        } else if !args.is_empty() || !kwargs.is_empty() {
            return Err(RunError::new(
                ExcType::ArgumentError,
                format!("{name}() takes no arguments"),
            ));
        }
        Ok(instance)
    }

    /// Builtin exception construction: an instance whose `message` attribute
    /// holds the optional single argument, rendered as a string.
    fn construct_exception(&mut self, type_id: HeapId, name: &str, args: Vec<Value>) -> RunResult<Value> {
        if args.len() > 1 {
            return Err(RunError::new(
                ExcType::ArgumentError,
                format!("{name}() takes at most 1 argument ({} given)", args.len()),
            ));
        }
        let message = match args.first() {
            Some(value) => self.display(*value)?,
            None => String::new(),
        };
        let instance = self.heap.allocate(ObjKind::Plain, type_id);
        let message = self.heap.alloc_str(message);
        self.heap.get_mut(instance).attrs.insert("message".to_owned(), message);
        Ok(Value::Ref(instance))
    }

    fn construct_builtin(
        &mut self,
        builtin: BuiltinType,
        name: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> RunResult<Value> {
        if !kwargs.is_empty() && builtin != BuiltinType::Dict {
            return Err(RunError::new(
                ExcType::ArgumentError,
                format!("{name}() takes no keyword arguments"),
            ));
        }
        match (builtin, args.as_slice()) {
            (BuiltinType::Type, [value]) => Ok(Value::Ref(self.heap.type_of(*value))),
            (BuiltinType::Bool, []) => Ok(Value::Bool(false)),
            (BuiltinType::Bool, [value]) => Ok(Value::Bool(value.is_truthy(&self.heap))),
            (BuiltinType::Int, []) => Ok(Value::Int(0)),
            (BuiltinType::Int, [value]) => self.convert_int(*value),
            (BuiltinType::Float, []) => Ok(Value::Float(0.0)),
            (BuiltinType::Float, [value]) => self.convert_float(*value),
            (BuiltinType::Str, []) => Ok(self.heap.alloc_str("")),
            (BuiltinType::Str, [value]) => {
                let rendered = self.display(*value)?;
                Ok(self.heap.alloc_str(rendered))
            }
            (BuiltinType::List, []) => Ok(self.heap.alloc_list(Vec::new())),
            (BuiltinType::List, [value]) => {
                let items = self.collect_iterable(*value)?;
                Ok(self.heap.alloc_list(items))
            }
            (BuiltinType::Tuple, []) => Ok(self.heap.alloc_tuple(Vec::new())),
            (BuiltinType::Tuple, [value]) => {
                let items = self.collect_iterable(*value)?;
                Ok(self.heap.alloc_tuple(items))
            }
            (BuiltinType::Dict, []) => self.construct_dict(kwargs),
            (BuiltinType::Dict, [value]) => {
                if !kwargs.is_empty() {
                    return Err(RunError::new(
                        ExcType::ArgumentError,
                        "dict() takes either a dict or keyword arguments, not both",
                    ));
                }
                self.copy_dict(*value)
            }
            (
                BuiltinType::Type | BuiltinType::Bool | BuiltinType::Int | BuiltinType::Float
                | BuiltinType::Str | BuiltinType::List | BuiltinType::Tuple | BuiltinType::Dict,
                _,
            ) => Err(RunError::new(
                ExcType::ArgumentError,
                format!("{name}() takes at most 1 argument ({} given)", args.len()),
            )),
            _ => Err(ExcType::type_error(format!("cannot construct '{name}' values"))),
        }
    }

    fn convert_int(&mut self, value: Value) -> RunResult<Value> {
        match value {
            Value::Int(_) => Ok(value),
            Value::Bool(b) => Ok(Value::Int(i64::from(b))),
            Value::Float(f) if f.is_finite() => Ok(Value::Int(f.trunc() as i64)),
            Value::Float(f) => Err(ExcType::type_error(format!("cannot convert {f} to an integer"))),
            _ => match self.heap.as_str(value) {
                Some(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                    ExcType::type_error(format!("invalid literal for int(): '{s}'"))
                }),
                None => Err(ExcType::type_error(format!(
                    "cannot convert '{}' value to an integer",
                    self.heap.type_name(value)
                ))),
            },
        }
    }

    fn convert_float(&mut self, value: Value) -> RunResult<Value> {
        match value {
            Value::Float(_) => Ok(value),
            Value::Int(i) => Ok(Value::Float(i as f64)),
            Value::Bool(b) => Ok(Value::Float(f64::from(u8::from(b)))),
            _ => match self.heap.as_str(value) {
                Some(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
                    ExcType::type_error(format!("invalid literal for float(): '{s}'"))
                }),
                None => Err(ExcType::type_error(format!(
                    "cannot convert '{}' value to a float",
                    self.heap.type_name(value)
                ))),
            },
        }
    }

    fn construct_dict(&mut self, kwargs: Vec<(String, Value)>) -> RunResult<Value> {
        let dict = self.heap.alloc_dict();
        let Value::Ref(dict_id) = dict else { unreachable!() };
        for (key, value) in kwargs {
            if let ObjKind::Dict(map) = &mut self.heap.get_mut(dict_id).kind {
                map.insert(DictKey::Str(key), value);
            }
        }
        Ok(dict)
    }

    fn copy_dict(&mut self, value: Value) -> RunResult<Value> {
        let Value::Ref(id) = value else {
            return Err(ExcType::type_error("dict() argument must be a dict"));
        };
        let entries = match &self.heap.get(id).kind {
            ObjKind::Dict(map) => map.clone(),
            _ => return Err(ExcType::type_error("dict() argument must be a dict")),
        };
        let dict = self.heap.alloc_dict();
        let Value::Ref(dict_id) = dict else { unreachable!() };
        if let ObjKind::Dict(map) = &mut self.heap.get_mut(dict_id).kind {
            *map = entries;
        }
        Ok(dict)
    }

    /// Attribute-copy inheritance.
    ///
    /// Invokes the base descriptor to build a fresh base instance (running
    /// the base constructor with `args`), copies the base type's attributes
    /// onto the target where not shadowed, re-points the copied bound
    /// methods at the target, and installs the fresh instance as the
    /// target's `__super__` link.
    pub(crate) fn inherit(&mut self, base: Value, target: Value, args: Vec<Value>) -> RunResult<()> {
        let Value::Ref(base_id) = base else {
            return Err(ExcType::type_error("inherit requires a type descriptor"));
        };
        self.heap.get(base_id).as_type()?;
        let Value::Ref(target_id) = target else {
            return Err(ExcType::type_error("inherit target must be a heap value"));
        };
        let fresh = self.invoke(base, args, Vec::new(), None)?;
        class::copy_base_type_attrs(&mut self.heap, base_id, target, fresh);
        class::rebind_instance_methods(&mut self.heap, fresh, target);
        if let Value::Ref(fresh_id) = fresh {
            self.heap.get_mut(target_id).base = Some(fresh_id);
            self.heap.get_mut(target_id).attrs.insert("__super__".to_owned(), fresh);
        }
        Ok(())
    }

    /// Produces an iterator over a value: generators and iterators pass
    /// through, built-in sequences get an index-walking iterator, and other
    /// objects go through their `__iter__` override.
    pub(crate) fn iter_new(&mut self, value: Value) -> RunResult<Value> {
        enum Plan {
            Passthrough,
            Seq(Value),
            DictKeys(Vec<DictKey>),
            Other,
        }
        let Value::Ref(id) = value else {
            return Err(ExcType::not_supported(self.heap.type_name(value), "iteration"));
        };
        let plan = match &self.heap.get(id).kind {
            ObjKind::Generator(_) | ObjKind::SeqIter { .. } => Plan::Passthrough,
            ObjKind::Str(_) | ObjKind::List(_) | ObjKind::Tuple(_) => Plan::Seq(value),
            ObjKind::Dict(map) => Plan::DictKeys(map.keys().cloned().collect()),
            _ => Plan::Other,
        };
        match plan {
            Plan::Passthrough => Ok(value),
            Plan::Seq(target) => Ok(self.alloc_seq_iter(target)),
            Plan::DictKeys(keys) => {
                // Iteration over a dict walks a snapshot of its keys.
                let mut items = Vec::with_capacity(keys.len());
                for key in &keys {
                    items.push(key.to_value(&mut self.heap));
                }
                let snapshot = self.heap.alloc_tuple(items);
                Ok(self.alloc_seq_iter(snapshot))
            }
            Plan::Other => match self.lookup_attr_raw(value, "__iter__") {
                Some(hook) => self.invoke(hook, Vec::new(), Vec::new(), Some(value)),
                None => Err(ExcType::not_supported(self.heap.type_name(value), "iteration")),
            },
        }
    }

    fn alloc_seq_iter(&mut self, target: Value) -> Value {
        let seq_iter_type = self.heap.types.seq_iter_type;
        Value::Ref(self.heap.allocate(
            ObjKind::SeqIter {
                target,
                index: 0,
                current: Value::None,
            },
            seq_iter_type,
        ))
    }

    /// Advances an iterator. Returns whether a new element is available.
    pub fn advance(&mut self, iter: Value) -> RunResult<bool> {
        let Value::Ref(id) = iter else {
            return Err(ExcType::not_supported(self.heap.type_name(iter), "iteration"));
        };
        enum Plan {
            Gen,
            Seq,
            Other,
        }
        let plan = match &self.heap.get(id).kind {
            ObjKind::Generator(_) => Plan::Gen,
            ObjKind::SeqIter { .. } => Plan::Seq,
            _ => Plan::Other,
        };
        match plan {
            Plan::Gen => self.generator_advance(id),
            Plan::Seq => self.seq_iter_advance(id),
            Plan::Other => match self.lookup_attr_raw(iter, "__advance__") {
                Some(hook) => {
                    let result = self.invoke(hook, Vec::new(), Vec::new(), Some(iter))?;
                    Ok(result.is_truthy(&self.heap))
                }
                None => Err(ExcType::not_supported(self.heap.type_name(iter), "iteration")),
            },
        }
    }

    /// Reads an iterator's current element without advancing.
    ///
    /// For a generator this consumes the pending yield: the next `advance()`
    /// resumes the body instead of re-reporting the same element.
    pub fn current(&mut self, iter: Value) -> RunResult<Value> {
        let Value::Ref(id) = iter else {
            return Err(ExcType::not_supported(self.heap.type_name(iter), "iteration"));
        };
        enum Plan {
            Gen(GenState, FrameId, Value),
            Seq(Value),
            Other,
        }
        let plan = match &self.heap.get(id).kind {
            ObjKind::Generator(data) => Plan::Gen(data.state, data.frame, data.last),
            ObjKind::SeqIter { current, .. } => Plan::Seq(*current),
            _ => Plan::Other,
        };
        match plan {
            Plan::Gen(state, frame_id, last) => {
                if state != GenState::Exhausted {
                    self.frames.get_mut(frame_id).yielded = false;
                }
                Ok(last)
            }
            Plan::Seq(current) => Ok(current),
            Plan::Other => match self.lookup_attr_raw(iter, "__current__") {
                Some(hook) => self.invoke(hook, Vec::new(), Vec::new(), Some(iter)),
                None => Err(ExcType::not_supported(self.heap.type_name(iter), "iteration")),
            },
        }
    }

    /// Resets an iterator to its start.
    ///
    /// Generators cannot rewind: their frame state is gone once consumed, so
    /// reset is a no-op for them. Sequence iterators rewind to index zero.
    pub fn reset(&mut self, iter: Value) -> RunResult<()> {
        let Value::Ref(id) = iter else {
            return Err(ExcType::not_supported(self.heap.type_name(iter), "iteration"));
        };
        enum Plan {
            Gen,
            Seq,
            Other,
        }
        let plan = match &self.heap.get(id).kind {
            ObjKind::Generator(_) => Plan::Gen,
            ObjKind::SeqIter { .. } => Plan::Seq,
            _ => Plan::Other,
        };
        match plan {
            Plan::Gen => Ok(()),
            Plan::Seq => {
                if let ObjKind::SeqIter { index, current, .. } = &mut self.heap.get_mut(id).kind {
                    *index = 0;
                    *current = Value::None;
                }
                Ok(())
            }
            Plan::Other => match self.lookup_attr_raw(iter, "__reset__") {
                Some(hook) => {
                    self.invoke(hook, Vec::new(), Vec::new(), Some(iter))?;
                    Ok(())
                }
                None => Err(ExcType::not_supported(self.heap.type_name(iter), "iteration")),
            },
        }
    }

    /// Marks a generator for early disposal: the next `advance()` runs its
    /// deferred exit hooks and reports exhaustion instead of resuming.
    pub fn gen_abort(&mut self, generator: Value) {
        if let Value::Ref(id) = generator
            && let ObjKind::Generator(data) = &self.heap.get(id).kind
            && data.state != GenState::Exhausted
        {
            let frame_id = data.frame;
            self.frames.get_mut(frame_id).aborting = true;
        }
    }

    fn seq_iter_advance(&mut self, id: HeapId) -> RunResult<bool> {
        let (target, index) = match &self.heap.get(id).kind {
            ObjKind::SeqIter { target, index, .. } => (*target, *index),
            _ => return Err(RunError::internal("seq_iter_advance on a non-iterator")),
        };
        let Value::Ref(target_id) = target else {
            return Err(RunError::internal("sequence iterator target is not a heap value"));
        };
        enum Elem {
            Value(Value),
            Char(char),
            Done,
        }
        let element = match &self.heap.get(target_id).kind {
            ObjKind::List(items) | ObjKind::Tuple(items) => {
                items.get(index).copied().map_or(Elem::Done, Elem::Value)
            }
            ObjKind::Str(s) => s.chars().nth(index).map_or(Elem::Done, Elem::Char),
            _ => Elem::Done,
        };
        let value = match element {
            Elem::Done => return Ok(false),
            Elem::Value(v) => v,
            Elem::Char(c) => self.heap.alloc_str(c.to_string()),
        };
        if let ObjKind::SeqIter { index, current, .. } = &mut self.heap.get_mut(id).kind {
            *index += 1;
            *current = value;
        }
        Ok(true)
    }

    /// The generator state machine.
    ///
    /// The body already ran to its first yield at call time, so the first
    /// advance only primes the iterator. An advance while a yielded value is
    /// still unconsumed reports it again without executing. Otherwise the
    /// held frame is pushed back onto the call stack and resumed; a return
    /// (or escaping exception) exhausts the generator and frees its frame.
    fn generator_advance(&mut self, gen_id: HeapId) -> RunResult<bool> {
        let (state, frame_id) = match &self.heap.get(gen_id).kind {
            ObjKind::Generator(data) => (data.state, data.frame),
            _ => return Err(RunError::internal("generator_advance on a non-generator")),
        };
        if state == GenState::Exhausted {
            return Ok(false);
        }
        if self.frames.get(frame_id).aborting {
            self.exhaust_generator(gen_id, frame_id);
            return Ok(false);
        }
        match state {
            GenState::Fresh => {
                self.set_gen_state(gen_id, GenState::Suspended);
                Ok(true)
            }
            GenState::Suspended => {
                if self.frames.get(frame_id).yielded {
                    // Pending value not yet consumed by current().
                    return Ok(true);
                }
                self.frames.get_mut(frame_id).parent = self.stack.last().copied();
                self.stack.push(frame_id);
                match self.run_frame(frame_id) {
                    Ok(ExecOutcome::Yielded(value)) => {
                        if let ObjKind::Generator(data) = &mut self.heap.get_mut(gen_id).kind {
                            data.last = value;
                        }
                        Ok(true)
                    }
                    Ok(ExecOutcome::Return(_)) => {
                        // run_frame drained the deferred exit hooks; drop the
                        // generator's pin on the frame.
                        self.frames.unpin(frame_id);
                        self.set_gen_state(gen_id, GenState::Exhausted);
                        Ok(false)
                    }
                    Err(error) => {
                        self.set_gen_state(gen_id, GenState::Exhausted);
                        Err(error)
                    }
                }
            }
            GenState::Exhausted => Ok(false),
        }
    }

    /// Early-disposal path: runs the frame's deferred exit hooks (failures
    /// swallowed), frees the frame, and marks the generator exhausted.
    fn exhaust_generator(&mut self, gen_id: HeapId, frame_id: FrameId) {
        let disposables = std::mem::take(&mut self.frames.get_mut(frame_id).disposables);
        for resource in disposables.into_iter().rev() {
            let _ = self.call_exit_hook(resource);
        }
        self.frames.unpin(frame_id);
        self.set_gen_state(gen_id, GenState::Exhausted);
    }

    fn set_gen_state(&mut self, gen_id: HeapId, state: GenState) {
        if let ObjKind::Generator(data) = &mut self.heap.get_mut(gen_id).kind {
            data.state = state;
        }
    }

    /// Drains any iterable into a vector of its elements.
    pub(crate) fn collect_iterable(&mut self, value: Value) -> RunResult<Vec<Value>> {
        if let Value::Ref(id) = value {
            let fast = match &self.heap.get(id).kind {
                ObjKind::List(items) | ObjKind::Tuple(items) => Some(items.clone()),
                _ => None,
            };
            if let Some(items) = fast {
                return Ok(items);
            }
        }
        let iter = self.iter_new(value)?;
        let mut out = Vec::new();
        while self.advance(iter)? {
            out.push(self.current(iter)?);
        }
        Ok(out)
    }
}
