//! Function invocation: frame isolation, argument binding, keyword calls,
//! closures with write-through capture, and receiver binding.

use pretty_assertions::assert_eq;
use skein::{
    BinaryOp, CodeBuilder, Const, ExcType, FuncConst, HostContext, ObjKind, Opcode, Param, Value,
    Vm, func_const,
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

fn tuple_items(vm: &Vm, value: Value) -> Vec<Value> {
    let Value::Ref(id) = value else { panic!("expected a tuple") };
    match &vm.heap.get(id).kind {
        ObjKind::Tuple(items) => items.clone(),
        other => panic!("expected a tuple, got {other:?}"),
    }
}

// ============================================================================
// Frame isolation
// ============================================================================

#[test]
fn callee_locals_do_not_leak_into_caller() {
    let (_, result) = run(|b| {
        let mut f = CodeBuilder::new("f");
        f.load_int(99).store_local("x");
        f.load_local("x").op(Opcode::Return);
        b.load_int(1).store_local("x");
        b.make_function(func_const("f", &[], f.build()));
        b.store_local("f");
        b.load_local("f").call(0).op(Opcode::Pop);
        b.load_local("x").op(Opcode::Return);
    })
    .unwrap();
    assert_eq!(result, Value::Int(1));
}

#[test]
fn plain_functions_do_not_see_caller_locals() {
    let err = run(|b| {
        let mut f = CodeBuilder::new("f");
        f.load_local("secret").op(Opcode::Return);
        b.load_int(5).store_local("secret");
        b.make_function(func_const("f", &[], f.build()));
        b.call(0).op(Opcode::Return);
    })
    .unwrap_err();
    assert_eq!(err.exc_type, ExcType::NameError);
}

// ============================================================================
// Argument binding
// ============================================================================

fn variadic_func() -> FuncConst {
    // f(a, b=2, *rest) -> (a, b, rest)
    let mut body = CodeBuilder::new("f");
    body.load_local("a").load_local("b").load_local("rest");
    body.emit(Opcode::BuildTuple, 3).op(Opcode::Return);
    FuncConst {
        name: "f".to_owned(),
        code: body.build(),
        params: vec![Param::Name("a".to_owned()), Param::Name("b".to_owned())],
        defaults: vec![Const::Int(2)],
        varargs: Some("rest".to_owned()),
        kwargs: None,
    }
}

#[test]
fn defaults_keywords_and_variadic_tail() {
    let (vm, result) = run(|b| {
        b.make_function(variadic_func());
        b.store_global("f");
        // f(1)
        b.load_global("f").load_int(1).call(1);
        // f(1, 5, 9)
        b.load_global("f").load_int(1).load_int(5).load_int(9).call(3);
        // f(1, b=7)
        b.load_global("f").load_int(1).load_str("b").load_int(7).call_kw(1, 1);
        b.emit(Opcode::BuildTuple, 3).op(Opcode::Return);
    })
    .unwrap();

    let calls = tuple_items(&vm, result);

    let first = tuple_items(&vm, calls[0]);
    assert_eq!(first[0], Value::Int(1));
    assert_eq!(first[1], Value::Int(2));
    assert!(tuple_items(&vm, first[2]).is_empty());

    let second = tuple_items(&vm, calls[1]);
    assert_eq!(second[1], Value::Int(5));
    assert_eq!(tuple_items(&vm, second[2]), vec![Value::Int(9)]);

    let third = tuple_items(&vm, calls[2]);
    assert_eq!(third[1], Value::Int(7));
}

#[test]
fn unexpected_keyword_is_an_argument_error() {
    let err = run(|b| {
        b.make_function(variadic_func());
        b.load_int(1).load_str("zzz").load_int(0).call_kw(1, 1);
        b.op(Opcode::Return);
    })
    .unwrap_err();
    assert_eq!(err.exc_type, ExcType::ArgumentError);
    assert!(err.message.contains("zzz"));
}

#[test]
fn missing_required_argument_is_an_argument_error() {
    let err = run(|b| {
        b.make_function(variadic_func());
        b.call(0).op(Opcode::Return);
    })
    .unwrap_err();
    assert_eq!(err.exc_type, ExcType::ArgumentError);
}

#[test]
fn keyword_dict_parameter_collects_surplus() {
    let (_, result) = run(|b| {
        // f(**extra) -> extra
        let mut body = CodeBuilder::new("f");
        body.load_local("extra").op(Opcode::Return);
        b.make_function(FuncConst {
            name: "f".to_owned(),
            code: body.build(),
            params: vec![],
            defaults: vec![],
            varargs: None,
            kwargs: Some("extra".to_owned()),
        });
        b.load_str("k").load_int(3).call_kw(0, 1);
        b.load_str("k").op(Opcode::LoadIndex);
        b.op(Opcode::Return);
    })
    .unwrap();
    assert_eq!(result, Value::Int(3));
}

#[test]
fn destructuring_parameter_unpacks_tuples() {
    let (_, result) = run(|b| {
        // f((x, y)) -> x + y
        let mut body = CodeBuilder::new("f");
        body.load_local("x").load_local("y").binary(BinaryOp::Add).op(Opcode::Return);
        b.make_function(FuncConst {
            name: "f".to_owned(),
            code: body.build(),
            params: vec![Param::Group(vec![
                Param::Name("x".to_owned()),
                Param::Name("y".to_owned()),
            ])],
            defaults: vec![],
            varargs: None,
            kwargs: None,
        });
        b.load_int(4).load_int(5).emit(Opcode::BuildTuple, 2);
        b.call(1).op(Opcode::Return);
    })
    .unwrap();
    assert_eq!(result, Value::Int(9));
}

#[test]
fn calling_a_non_callable_is_a_type_error() {
    let err = run(|b| {
        b.load_int(3).call(0).op(Opcode::Return);
    })
    .unwrap_err();
    assert_eq!(err.exc_type, ExcType::TypeError);
}

// ============================================================================
// Closures
// ============================================================================

#[test]
fn closure_stores_write_through_to_the_origin_frame() {
    let (_, result) = run(|b| {
        // outer(): count = 1; bump = closure { count = count + 1 }; bump(); return count
        let mut bump = CodeBuilder::new("bump");
        bump.load_local("count").load_int(1).binary(BinaryOp::Add);
        bump.store_local("count");
        bump.load_const(Const::None).op(Opcode::Return);

        let mut outer = CodeBuilder::new("outer");
        outer.load_int(1).store_local("count");
        outer.make_closure(func_const("bump", &[], bump.build()));
        outer.store_local("bump");
        outer.load_local("bump").call(0).op(Opcode::Pop);
        outer.load_local("count").op(Opcode::Return);

        b.make_function(func_const("outer", &[], outer.build()));
        b.call(0).op(Opcode::Return);
    })
    .unwrap();
    assert_eq!(result, Value::Int(2));
}

#[test]
fn closure_sees_origin_updates_made_after_capture() {
    let (_, result) = run(|b| {
        let mut get = CodeBuilder::new("get");
        get.load_local("count").op(Opcode::Return);

        let mut outer = CodeBuilder::new("outer");
        outer.load_int(1).store_local("count");
        outer.make_closure(func_const("get", &[], get.build()));
        outer.store_local("get");
        outer.load_int(5).store_local("count");
        outer.load_local("get").call(0).op(Opcode::Return);

        b.make_function(func_const("outer", &[], outer.build()));
        b.call(0).op(Opcode::Return);
    })
    .unwrap();
    assert_eq!(result, Value::Int(5));
}

#[test]
fn closure_new_bindings_stay_private() {
    // A name that does not exist in the origin frame is a fresh local of the
    // closure invocation and must not appear in the origin.
    let err = run(|b| {
        let mut inner = CodeBuilder::new("inner");
        inner.load_int(9).store_local("fresh");
        inner.load_const(Const::None).op(Opcode::Return);

        let mut outer = CodeBuilder::new("outer");
        outer.make_closure(func_const("inner", &[], inner.build()));
        outer.call(0).op(Opcode::Pop);
        outer.load_local("fresh").op(Opcode::Return);

        b.make_function(func_const("outer", &[], outer.build()));
        b.call(0).op(Opcode::Return);
    })
    .unwrap_err();
    assert_eq!(err.exc_type, ExcType::NameError);
}

#[test]
fn closure_survives_its_origin_frame() {
    let (_, result) = run(|b| {
        // make_counter(): count = 10; return closure { count = count + 1; return count }
        let mut step = CodeBuilder::new("step");
        step.load_local("count").load_int(1).binary(BinaryOp::Add);
        step.store_local("count");
        step.load_local("count").op(Opcode::Return);

        let mut maker = CodeBuilder::new("make_counter");
        maker.load_int(10).store_local("count");
        maker.make_closure(func_const("step", &[], step.build()));
        maker.op(Opcode::Return);

        b.make_function(func_const("make_counter", &[], maker.build()));
        b.call(0).store_local("c");
        b.load_local("c").call(0).op(Opcode::Pop);
        b.load_local("c").call(0).op(Opcode::Return);
    })
    .unwrap();
    // The captured frame persists across calls, so the counter accumulates.
    assert_eq!(result, Value::Int(12));
}
