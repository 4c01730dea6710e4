//! The host boundary: import resolution and caching, native callables,
//! panic containment, and tracer hooks.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use pretty_assertions::assert_eq;
use skein::{
    CodeBuilder, ExcType, Heap, HostContext, ObjKind, Opcode, RunError, TraceAction, Value, Vm,
    VmTracer, alloc_module,
};

fn module_with_attr(heap: &mut Heap, name: &str, attr: &str, value: Value) -> Value {
    let id = alloc_module(heap, name);
    heap.get_mut(id).attrs.insert(attr.to_owned(), value);
    Value::Ref(id)
}

// ============================================================================
// Imports
// ============================================================================

#[test]
fn import_resolves_through_the_host_callback() {
    let context = HostContext::new().with_resolver(|heap, path| {
        if path == "math" {
            Ok(Some(module_with_attr(heap, "math", "answer", Value::Int(42))))
        } else {
            Ok(None)
        }
    });

    let mut b = CodeBuilder::new("<module>");
    b.import("math").load_attr("answer").op(Opcode::Return);

    let mut vm = Vm::new(context);
    let result = vm.run_module(b.build(), "test").unwrap();
    assert_eq!(result, Value::Int(42));
}

#[test]
fn resolved_modules_are_cached_per_context() {
    let calls = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&calls);
    let context = HostContext::new().with_resolver(move |heap, path| {
        counter.set(counter.get() + 1);
        Ok(Some(module_with_attr(heap, path, "answer", Value::Int(1))))
    });

    let mut b = CodeBuilder::new("<module>");
    b.import("util").op(Opcode::Pop);
    b.import("util").load_attr("answer").op(Opcode::Return);

    let mut vm = Vm::new(context);
    let result = vm.run_module(b.build(), "test").unwrap();
    assert_eq!(result, Value::Int(1));
    assert_eq!(calls.get(), 1);
    assert!(vm.context_mut().cached("util").is_some());
}

#[test]
fn unknown_import_path_raises_import_error() {
    let mut b = CodeBuilder::new("<module>");
    b.import("does.not.exist").op(Opcode::Return);

    let mut vm = Vm::new(HostContext::new());
    let err = vm.run_module(b.build(), "test").unwrap_err();
    assert_eq!(err.exc_type, ExcType::ImportError);
    assert!(err.message.contains("does.not.exist"));
}

#[test]
fn pre_registered_modules_bypass_the_resolver() {
    let mut vm = Vm::new(HostContext::new());
    let module = module_with_attr(&mut vm.heap, "config", "debug", Value::Bool(true));
    vm.context_mut().register_module("config", module);

    let mut b = CodeBuilder::new("<module>");
    b.import("config").load_attr("debug").op(Opcode::Return);
    let result = vm.run_module(b.build(), "test").unwrap();
    assert_eq!(result, Value::Bool(true));
}

#[test]
fn resolver_failures_surface_as_guest_exceptions() {
    let context = HostContext::new().with_resolver(|_, path| {
        Err(RunError::new(
            ExcType::ImportError,
            format!("'{path}' is blocked"),
        ))
    });

    let mut b = CodeBuilder::new("<module>");
    b.import("net").op(Opcode::Return);

    let mut vm = Vm::new(context);
    let err = vm.run_module(b.build(), "test").unwrap_err();
    assert_eq!(err.exc_type, ExcType::ImportError);
    assert!(err.message.contains("blocked"));
}

// ============================================================================
// Native callables
// ============================================================================

fn install_global(vm: &mut Vm, module: Value, name: &str, value: Value) {
    let Value::Ref(id) = module else { panic!("expected a module") };
    vm.heap.get_mut(id).attrs.insert(name.to_owned(), value);
}

#[test]
fn native_functions_are_callable_from_guest_code() {
    let mut vm = Vm::new(HostContext::new());
    let module = vm.new_module("test");
    let double = vm.native_value("double", |_, args| match args {
        [Value::Int(n)] => Ok(Value::Int(n * 2)),
        _ => Err(RunError::new(ExcType::TypeError, "double expects one int")),
    });
    install_global(&mut vm, module, "double", double);

    let mut b = CodeBuilder::new("<module>");
    b.load_global("double").load_int(21).call(1).op(Opcode::Return);
    let result = vm.run_code(b.build(), module).unwrap();
    assert_eq!(result, Value::Int(42));
}

#[test]
fn natives_can_allocate_guest_values() {
    let mut vm = Vm::new(HostContext::new());
    let module = vm.new_module("test");
    let greet = vm.native_value("greet", |heap, _| Ok(heap.alloc_str("hello".to_owned())));
    install_global(&mut vm, module, "greet", greet);

    let mut b = CodeBuilder::new("<module>");
    b.load_global("greet").call(0).op(Opcode::Return);
    let result = vm.run_code(b.build(), module).unwrap();
    assert_eq!(vm.heap.as_str(result), Some("hello"));
}

#[test]
fn native_errors_raise_in_the_guest() {
    let mut vm = Vm::new(HostContext::new());
    let module = vm.new_module("test");
    let fail = vm.native_value("fail", |_, _| {
        Err(RunError::new(ExcType::KeyError, "nothing here"))
    });
    install_global(&mut vm, module, "fail", fail);

    let handler_result = {
        let mut b = CodeBuilder::new("<module>");
        let handler = b.label();
        b.push_handler(handler);
        b.load_global("fail").call(0).op(Opcode::Return);
        b.bind(handler);
        b.load_int(7).op(Opcode::Return);
        vm.run_code(b.build(), module).unwrap()
    };
    assert_eq!(handler_result, Value::Int(7));
}

#[test]
fn native_panics_become_catchable_internal_errors() {
    let mut vm = Vm::new(HostContext::new());
    let module = vm.new_module("test");
    let boom = vm.native_value("boom", |_, _| panic!("host bug"));
    install_global(&mut vm, module, "boom", boom);

    let mut b = CodeBuilder::new("<module>");
    b.load_global("boom").call(0).op(Opcode::Return);
    let err = vm.run_code(b.build(), module).unwrap_err();
    assert_eq!(err.exc_type, ExcType::InternalError);
    assert!(err.message.contains("boom"));
    assert!(err.message.contains("host bug"));

    // The same fault is interceptable by a guest handler.
    let mut b = CodeBuilder::new("<module>");
    let handler = b.label();
    b.push_handler(handler);
    b.load_global("boom").call(0).op(Opcode::Return);
    b.bind(handler);
    b.load_int(1).op(Opcode::Return);
    assert_eq!(vm.run_code(b.build(), module).unwrap(), Value::Int(1));
}

#[test]
fn natives_reject_keyword_arguments() {
    let mut vm = Vm::new(HostContext::new());
    let module = vm.new_module("test");
    let id = vm.native_value("identity", |_, args| Ok(args[0]));
    install_global(&mut vm, module, "identity", id);

    let mut b = CodeBuilder::new("<module>");
    b.load_global("identity").load_str("x").load_int(1).call_kw(0, 1);
    b.op(Opcode::Return);
    let err = vm.run_code(b.build(), module).unwrap_err();
    assert_eq!(err.exc_type, ExcType::ArgumentError);
}

#[test]
fn host_can_call_guest_functions_directly() {
    let mut b = CodeBuilder::new("<module>");
    let mut f = CodeBuilder::new("add");
    f.load_local("a").load_local("b").binary(skein::BinaryOp::Add).op(Opcode::Return);
    b.make_function(skein::func_const("add", &["a", "b"], f.build()));
    b.op(Opcode::Return);

    let mut vm = Vm::new(HostContext::new());
    let add = vm.run_module(b.build(), "test").unwrap();
    let result = vm.call_value(add, vec![Value::Int(2), Value::Int(3)]).unwrap();
    assert_eq!(result, Value::Int(5));

    let Err(err) = vm.call_value(Value::Int(0), vec![]) else {
        panic!("expected a type error")
    };
    assert_eq!(err.exc_type(), ExcType::TypeError);
}

// ============================================================================
// Tracer hooks
// ============================================================================

#[derive(Default)]
struct CountingTracer {
    instructions: Rc<Cell<u64>>,
    pause_next: Rc<Cell<bool>>,
    resumes: Rc<Cell<u32>>,
    calls: Rc<RefCell<Vec<String>>>,
    returns: Rc<Cell<u32>>,
    raises: Rc<RefCell<Vec<ExcType>>>,
}

impl VmTracer for CountingTracer {
    fn before_instruction(&mut self, _ip: usize, _opcode: Opcode, _stack: usize, _frames: usize) -> TraceAction {
        self.instructions.set(self.instructions.get() + 1);
        if self.pause_next.replace(false) {
            TraceAction::Pause
        } else {
            TraceAction::Continue
        }
    }

    fn block_until_resumed(&mut self) {
        self.resumes.set(self.resumes.get() + 1);
    }

    fn on_call(&mut self, function: &str, _frame_depth: usize) {
        self.calls.borrow_mut().push(function.to_owned());
    }

    fn on_return(&mut self, _frame_depth: usize) {
        self.returns.set(self.returns.get() + 1);
    }

    fn on_raise(&mut self, exc_type: ExcType, _line: u32) {
        self.raises.borrow_mut().push(exc_type);
    }
}

#[test]
fn tracer_sees_every_instruction() {
    let tracer = CountingTracer::default();
    let instructions = Rc::clone(&tracer.instructions);

    let mut b = CodeBuilder::new("<module>");
    b.load_int(2).load_int(40).binary(skein::BinaryOp::Add).op(Opcode::Return);

    let mut vm = Vm::with_tracer(HostContext::new(), tracer);
    let result = vm.run_module(b.build(), "test").unwrap();
    assert_eq!(result, Value::Int(42));
    assert_eq!(instructions.get(), 4);
}

#[test]
fn pause_blocks_before_the_instruction_then_continues() {
    let tracer = CountingTracer::default();
    let resumes = Rc::clone(&tracer.resumes);
    tracer.pause_next.set(true);

    let mut b = CodeBuilder::new("<module>");
    b.load_int(5).op(Opcode::Return);

    let mut vm = Vm::with_tracer(HostContext::new(), tracer);
    let result = vm.run_module(b.build(), "test").unwrap();
    assert_eq!(result, Value::Int(5));
    assert_eq!(resumes.get(), 1);
}

#[test]
fn call_and_raise_hooks_fire_with_frame_context() {
    let tracer = CountingTracer::default();
    let calls = Rc::clone(&tracer.calls);
    let returns = Rc::clone(&tracer.returns);
    let raises = Rc::clone(&tracer.raises);

    let mut b = CodeBuilder::new("<module>");
    let mut f = CodeBuilder::new("f");
    f.load_global("KeyError").load_str("k").call(1).op(Opcode::Raise);
    b.make_function(skein::func_const("f", &[], f.build()));
    b.store_global("f");
    let handler = b.label();
    b.push_handler(handler);
    b.load_global("f").call(0).op(Opcode::Return);
    b.bind(handler);
    b.load_int(0).op(Opcode::Return);

    let mut vm = Vm::with_tracer(HostContext::new(), tracer);
    vm.run_module(b.build(), "test").unwrap();

    assert_eq!(*calls.borrow(), vec!["f".to_owned()]);
    assert!(returns.get() >= 1);
    // The raise is observed in `f` (where it unwinds) and again in the module
    // frame (where the handler catches it).
    assert_eq!(*raises.borrow(), vec![ExcType::KeyError, ExcType::KeyError]);
}

#[test]
fn noop_tracer_vm_is_the_default_type() {
    // Vm without a type argument uses the zero-cost tracer.
    let mut vm: Vm = Vm::new(HostContext::new());
    let mut b = CodeBuilder::new("<module>");
    b.load_int(1).op(Opcode::Return);
    assert_eq!(vm.run_module(b.build(), "test").unwrap(), Value::Int(1));
}

#[test]
fn module_kind_is_observable_on_the_heap() {
    let mut vm = Vm::new(HostContext::new());
    let Value::Ref(id) = vm.new_module("app.main") else {
        panic!("expected a heap ref")
    };
    assert!(matches!(&vm.heap.get(id).kind, ObjKind::Module { name } if name == "app.main"));
    assert_eq!(skein::module_name(&vm.heap, id), "app.main");
}
