//! Raising, catching, and unwinding.
//!
//! Raising converts a guest value into a [`RunError`]; catching restores the
//! nearest ancestor frame that registered a handler. A frame with no handler
//! drains its disposables in reverse acquisition order, appends itself to the
//! stack trace, and re-propagates. Exit-hook failures during unwinding are
//! swallowed so the original exception survives to the handler.

use crate::{
    exception::{ExcType, RunError, RunResult, TraceFrame},
    frame::FrameId,
    module::module_name,
    object::{GenState, ObjKind},
    tracer::VmTracer,
    types::{exception_type_of, exception_type_of_class},
    value::Value,
};

use super::Vm;

impl<Tr: VmTracer> Vm<Tr> {
    /// Handles an error raised while `frame_id` was executing.
    ///
    /// Returns `Ok(())` when the frame caught the exception (execution resumes
    /// at the handler); otherwise unwinds the frame and propagates.
    pub(crate) fn catch_in_frame(&mut self, frame_id: FrameId, error: RunError) -> RunResult<()> {
        let line = {
            let frame = self.frames.get(frame_id);
            frame.code.line_at(frame.ip.saturating_sub(1))
        };
        self.tracer.on_raise(error.exc_type(), line);

        // Internal errors bypass guest handlers entirely.
        if matches!(error, RunError::Internal(_)) {
            return Err(self.unwind_frame(frame_id, error));
        }

        let Some(record) = self.frames.get_mut(frame_id).handlers.pop() else {
            return Err(self.unwind_frame(frame_id, error));
        };

        // Resources acquired inside the protected region are disposed before
        // the handler runs; hook failures must not mask the caught exception.
        let inner = self.frames.get_mut(frame_id).disposables.split_off(record.disposer_depth);
        for resource in inner.into_iter().rev() {
            let _ = self.call_exit_hook(resource);
        }

        let exception = self.materialize_exception(&error);
        let frame = self.frames.get_mut(frame_id);
        frame.stack.truncate(record.stack_depth);
        frame.ip = record.resume;
        self.last_exception = exception;
        Ok(())
    }

    /// Unwinds a frame that cannot handle `error`: drains its disposables,
    /// appends a trace frame, pops it off the call stack, and releases it.
    fn unwind_frame(&mut self, frame_id: FrameId, mut error: RunError) -> RunError {
        let (line, function, module, generator) = {
            let frame = self.frames.get(frame_id);
            (
                frame.code.line_at(frame.ip.saturating_sub(1)),
                frame.code.name.clone(),
                frame.module,
                frame.generator,
            )
        };
        self.frames.get_mut(frame_id).aborting = true;

        let disposables = std::mem::take(&mut self.frames.get_mut(frame_id).disposables);
        for resource in disposables.into_iter().rev() {
            let _ = self.call_exit_hook(resource);
        }

        // A generator whose body escapes with an exception is exhausted; a
        // later advance() must report completion, not resume.
        if let Some(gen_id) = generator
            && let ObjKind::Generator(data) = &mut self.heap.get_mut(gen_id).kind
        {
            data.state = GenState::Exhausted;
        }

        error.push_trace_frame(TraceFrame {
            module: module_name(&self.heap, module).to_owned(),
            function,
            line,
        });

        debug_assert_eq!(self.stack.last(), Some(&frame_id));
        self.stack.pop();
        if generator.is_some() {
            self.frames.unpin(frame_id);
        } else {
            self.frames.release(frame_id);
        }
        self.tracer.on_return(self.stack.len());
        error
    }

    /// Converts the value operand of a `Raise` into an in-flight exception.
    ///
    /// Accepts exception instances (including user classes that inherited
    /// from one) and bare exception classes, which are instantiated with no
    /// arguments first. Anything else is a `TypeError`.
    pub(crate) fn make_raise(&mut self, value: Value) -> RunResult<RunError> {
        if let Some(exc_type) = exception_type_of(&self.heap, value) {
            let message = match self.lookup_attr_raw(value, "message") {
                Some(m) => m.native_str(&self.heap),
                None => String::new(),
            };
            let type_name = self.heap.type_name(value).to_owned();
            let mut error = RunError::new(exc_type, message);
            if let RunError::Exc(exc) = &mut error {
                exc.value = Some(value);
                exc.type_name = type_name;
            }
            return Ok(error);
        }
        if exception_type_of_class(&self.heap, value).is_some() {
            let instance = self.invoke(value, Vec::new(), Vec::new(), None)?;
            return self.make_raise(instance);
        }
        Err(ExcType::type_error("exceptions must derive from Exception"))
    }

    /// The guest value a handler observes via `LoadException`: the original
    /// raised instance when one exists, otherwise a fresh instance of the
    /// builtin exception class.
    fn materialize_exception(&mut self, error: &RunError) -> Value {
        let RunError::Exc(exc) = error else { return Value::None };
        if let Some(value) = exc.value {
            return value;
        }
        let type_id = self.heap.types.exceptions[&exc.exc_type];
        let instance = self.heap.allocate(ObjKind::Plain, type_id);
        let message = self.heap.alloc_str(exc.message.clone());
        self.heap.get_mut(instance).attrs.insert("message".to_owned(), message);
        Value::Ref(instance)
    }

    /// Registers a scoped resource: validates it is disposable, runs its
    /// enter hook, and records it for disposal on frame exit or unwind.
    ///
    /// Returns the enter hook's result, or the resource itself when no enter
    /// hook is defined.
    pub(crate) fn enter_with(&mut self, frame_id: FrameId, resource: Value) -> RunResult<Value> {
        if self.lookup_attr_raw(resource, "__exit__").is_none() {
            return Err(ExcType::type_error(format!(
                "'{}' value does not support scoped disposal (no __exit__)",
                self.heap.type_name(resource)
            )));
        }
        let result = match self.lookup_attr_raw(resource, "__enter__") {
            Some(hook) => self.invoke(hook, Vec::new(), Vec::new(), Some(resource))?,
            None => resource,
        };
        self.frames.get_mut(frame_id).disposables.push(resource);
        Ok(result)
    }

    /// Invokes a disposable's exit hook, discarding its result.
    pub(crate) fn call_exit_hook(&mut self, resource: Value) -> RunResult<()> {
        let Some(hook) = self.lookup_attr_raw(resource, "__exit__") else {
            return Ok(());
        };
        self.invoke(hook, Vec::new(), Vec::new(), Some(resource))?;
        Ok(())
    }
}
