//! Exception raising, handler resumption, disposer draining during
//! unwinding, re-raising, and the host-visible unhandled path.

use pretty_assertions::assert_eq;
use skein::{
    BinaryOp, CodeBuilder, Const, ExcType, HostContext, Opcode, Value, Vm, func_const,
};

fn new_vm() -> Vm {
    Vm::new(HostContext::new())
}

fn run(build: impl FnOnce(&mut CodeBuilder)) -> Result<(Vm, Value), skein::UnhandledException> {
    let mut b = CodeBuilder::new("<module>");
    build(&mut b);
    let mut vm = new_vm();
    let result = vm.run_module(b.build(), "test")?;
    Ok((vm, result))
}

// ============================================================================
// Catch and resume
// ============================================================================

#[test]
fn handler_catches_and_execution_resumes_there() {
    let (_, result) = run(|b| {
        let handler = b.label();
        b.push_handler(handler);
        b.load_global("KeyError").load_str("k").call(1).op(Opcode::Raise);
        b.bind(handler);
        b.load_int(1).op(Opcode::Return);
    })
    .unwrap();
    assert_eq!(result, Value::Int(1));
}

#[test]
fn caught_exception_exposes_its_message() {
    let (vm, result) = run(|b| {
        let handler = b.label();
        b.push_handler(handler);
        b.load_global("Exception").load_str("boom").call(1).op(Opcode::Raise);
        b.bind(handler);
        b.op(Opcode::LoadException).load_attr("message").op(Opcode::Return);
    })
    .unwrap();
    assert_eq!(vm.heap.as_str(result), Some("boom"));
}

#[test]
fn handler_restores_the_operand_stack_depth() {
    let (_, result) = run(|b| {
        // Junk accumulated inside the protected region is discarded.
        let handler = b.label();
        b.load_int(10);
        b.push_handler(handler);
        b.load_int(20).load_int(30);
        b.load_global("Exception").call(0).op(Opcode::Raise);
        b.bind(handler);
        // Only the pre-handler 10 remains; add 1 to prove it.
        b.load_int(1).binary(BinaryOp::Add).op(Opcode::Return);
    })
    .unwrap();
    assert_eq!(result, Value::Int(11));
}

#[test]
fn raising_a_bare_exception_class_instantiates_it() {
    let (_, result) = run(|b| {
        let handler = b.label();
        b.push_handler(handler);
        b.load_global("IndexError").op(Opcode::Raise);
        b.bind(handler);
        b.op(Opcode::LoadException).load_attr("__type__");
        b.load_global("IndexError").binary(BinaryOp::Eq);
        b.op(Opcode::Return);
    })
    .unwrap();
    assert_eq!(result, Value::Bool(true));
}

#[test]
fn raising_a_non_exception_is_a_type_error() {
    let err = run(|b| {
        b.load_int(5).op(Opcode::Raise);
    })
    .unwrap_err();
    assert_eq!(err.exc_type, ExcType::TypeError);
    assert!(err.message.contains("derive from Exception"));
}

#[test]
fn reraising_preserves_exception_identity() {
    let (_, result) = run(|b| {
        let outer = b.label();
        let inner = b.label();
        b.push_handler(outer);
        b.push_handler(inner);
        b.load_global("KeyError").load_str("k").call(1).op(Opcode::Raise);
        b.bind(inner);
        b.op(Opcode::LoadException).store_local("e");
        b.load_local("e").op(Opcode::Raise);
        b.bind(outer);
        b.op(Opcode::LoadException).load_local("e").binary(BinaryOp::Eq);
        b.op(Opcode::Return);
    })
    .unwrap();
    assert_eq!(result, Value::Bool(true));
}

#[test]
fn user_exception_class_is_caught_and_keeps_its_name() {
    // class TimeoutError(Exception) via declared base, raised and unhandled.
    let err = run(|b| {
        b.load_global("Exception").make_subtype("TimeoutError");
        b.load_str("too slow").call(1).op(Opcode::Raise);
    })
    .unwrap_err();
    assert_eq!(err.exc_type, ExcType::Exception);
    assert_eq!(err.type_name, "TimeoutError");
    assert_eq!(err.message, "too slow");
}

// ============================================================================
// Unwinding and disposers
// ============================================================================

/// Module prologue: `order` global, a disposable class `Res(tag)` whose exit
/// hook appends its tag to `order`, and `f` which opens "a" then "b" and
/// raises.
fn emit_disposer_scenario(b: &mut CodeBuilder) {
    b.load_str("").store_global("order");

    b.make_type("Res").store_global("Res");
    let mut init = CodeBuilder::new("__init__");
    init.op(Opcode::LoadReceiver).load_local("tag").store_attr("tag");
    init.load_const(Const::None).op(Opcode::Return);
    b.load_global("Res");
    b.make_function(func_const("__init__", &["tag"], init.build()));
    b.store_attr("__init__");

    let mut exit = CodeBuilder::new("__exit__");
    exit.load_global("order");
    exit.op(Opcode::LoadReceiver).load_attr("tag");
    exit.binary(BinaryOp::Add).store_global("order");
    exit.load_const(Const::None).op(Opcode::Return);
    b.load_global("Res");
    b.make_function(func_const("__exit__", &[], exit.build()));
    b.store_attr("__exit__");

    let mut f = CodeBuilder::new("f");
    f.load_global("Res").load_str("a").call(1);
    f.op(Opcode::EnterWith).op(Opcode::Pop);
    f.load_global("Res").load_str("b").call(1);
    f.op(Opcode::EnterWith).op(Opcode::Pop);
    f.load_global("Exception").load_str("boom").call(1).op(Opcode::Raise);
    b.make_function(func_const("f", &[], f.build()));
    b.store_global("f");
}

#[test]
fn unwinding_drains_disposers_in_reverse_order() {
    let (vm, result) = run(|b| {
        emit_disposer_scenario(b);
        let handler = b.label();
        b.push_handler(handler);
        b.load_global("f").call(0).op(Opcode::Pop).op(Opcode::PopHandler);
        b.load_str("unreachable").op(Opcode::Return);
        b.bind(handler);
        b.load_global("order").op(Opcode::Return);
    })
    .unwrap();
    assert_eq!(vm.heap.as_str(result), Some("ba"));
}

#[test]
fn multi_frame_unwind_drains_each_intervening_frame() {
    // a opens "a" and calls b; b opens "b" and calls c; c opens "c" and
    // raises. The module-level handler resumes after every intervening
    // frame's resources drained, innermost frame first.
    let (vm, result) = run(|b| {
        emit_disposer_scenario(b);

        let mut c = CodeBuilder::new("c");
        c.load_global("Res").load_str("c").call(1);
        c.op(Opcode::EnterWith).op(Opcode::Pop);
        c.load_global("Exception").load_str("boom").call(1).op(Opcode::Raise);
        b.make_function(func_const("c", &[], c.build()));
        b.store_global("c");

        let mut mid = CodeBuilder::new("b");
        mid.load_global("Res").load_str("b").call(1);
        mid.op(Opcode::EnterWith).op(Opcode::Pop);
        mid.load_global("c").call(0).op(Opcode::Return);
        b.make_function(func_const("b", &[], mid.build()));
        b.store_global("b");

        let mut a = CodeBuilder::new("a");
        a.load_global("Res").load_str("a").call(1);
        a.op(Opcode::EnterWith).op(Opcode::Pop);
        a.load_global("b").call(0).op(Opcode::Return);
        b.make_function(func_const("a", &[], a.build()));
        b.store_global("a");

        let handler = b.label();
        b.push_handler(handler);
        b.load_global("a").call(0).op(Opcode::Pop).op(Opcode::PopHandler);
        b.load_str("unreachable").op(Opcode::Return);
        b.bind(handler);
        b.load_global("order");
        b.load_str(":").binary(BinaryOp::Add);
        b.op(Opcode::LoadException).load_attr("message").binary(BinaryOp::Add);
        b.op(Opcode::Return);
    })
    .unwrap();
    assert_eq!(vm.heap.as_str(result), Some("cba:boom"));
}

#[test]
fn disposers_also_drain_when_nothing_catches() {
    let mut b = CodeBuilder::new("<module>");
    emit_disposer_scenario(&mut b);
    b.load_global("f").call(0).op(Opcode::Return);

    let mut vm = new_vm();
    let module = vm.new_module("test");
    let err = vm.run_code(b.build(), module).unwrap_err();
    assert_eq!(err.exc_type, ExcType::Exception);
    assert_eq!(err.message, "boom");

    let Value::Ref(id) = module else { panic!("expected a module") };
    let order = vm.heap.get(id).get_own_attr("order").expect("order global");
    assert_eq!(vm.heap.as_str(order), Some("ba"));
}

#[test]
fn normal_return_drains_disposers_too() {
    let (vm, result) = run(|b| {
        emit_disposer_scenario(b);
        // g opens "x" and returns cleanly.
        let mut g = CodeBuilder::new("g");
        g.load_global("Res").load_str("x").call(1);
        g.op(Opcode::EnterWith).op(Opcode::Pop);
        g.load_const(Const::None).op(Opcode::Return);
        b.make_function(func_const("g", &[], g.build()));
        b.call(0).op(Opcode::Pop);
        b.load_global("order").op(Opcode::Return);
    })
    .unwrap();
    assert_eq!(vm.heap.as_str(result), Some("x"));
}

#[test]
fn explicit_exit_runs_the_hook_early() {
    let (vm, result) = run(|b| {
        emit_disposer_scenario(b);
        b.load_global("Res").load_str("e").call(1);
        b.op(Opcode::EnterWith).op(Opcode::Pop);
        b.op(Opcode::ExitWith);
        b.load_global("order").op(Opcode::Return);
    })
    .unwrap();
    assert_eq!(vm.heap.as_str(result), Some("e"));
}

#[test]
fn entering_a_value_without_exit_hook_is_a_type_error() {
    let err = run(|b| {
        b.make_type("NoHooks").store_global("NoHooks");
        b.load_global("NoHooks").call(0).op(Opcode::EnterWith);
        b.op(Opcode::Return);
    })
    .unwrap_err();
    assert_eq!(err.exc_type, ExcType::TypeError);
}

// ============================================================================
// Stack traces
// ============================================================================

#[test]
fn unhandled_trace_lists_frames_innermost_first() {
    let err = run(|b| {
        let mut inner = CodeBuilder::new("inner");
        inner.set_line(3);
        inner.load_global("Exception").load_str("deep").call(1).op(Opcode::Raise);

        let mut outer = CodeBuilder::new("outer");
        outer.set_line(7);
        outer.load_global("inner").call(0).op(Opcode::Return);

        b.make_function(func_const("inner", &[], inner.build()));
        b.store_global("inner");
        b.make_function(func_const("outer", &[], outer.build()));
        b.store_global("outer");
        b.set_line(10);
        b.load_global("outer").call(0).op(Opcode::Return);
    })
    .unwrap_err();

    let frames: Vec<&str> = err.trace.iter().map(|f| f.function.as_str()).collect();
    assert_eq!(frames, vec!["inner", "outer", "<module>"]);
    assert_eq!(err.trace[0].line, 3);
    assert_eq!(err.trace[1].line, 7);
    assert_eq!(err.trace[2].line, 10);
    assert!(err.trace.iter().all(|f| f.module == "test"));

    let rendered = err.to_string();
    assert!(rendered.contains("Exception: deep"));
    assert!(rendered.contains("in inner"));
}
