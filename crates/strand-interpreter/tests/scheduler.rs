use std::cell::Cell;
use std::rc::Rc;

use strand_compiler::ast::{BinOp, Expr, FnDecl, GlobalDecl, Item, Program, RoutineDecl, Stmt};
use strand_compiler::compile_to_ir;
use strand_interpreter::{register_core_host_fns, RuntimeFault, Value, Vm, VmOptions};
use strand_ir::ReturnStatus;

fn vm_for(items: Vec<Item>, options: VmOptions) -> Vm {
    let program = compile_to_ir(&Program::new(items)).expect("compile");
    let mut vm = Vm::new(Rc::new(program), options);
    register_core_host_fns(&mut vm);
    vm
}

fn run(items: Vec<Item>) -> Result<String, RuntimeFault> {
    let mut vm = vm_for(items, VmOptions::default());
    vm.run()?;
    Ok(vm.take_output())
}

fn print(value: Expr) -> Stmt {
    Stmt::expr(Expr::name("print").call(vec![value]))
}

fn print_text(text: &str) -> Stmt {
    print(Expr::string(text))
}

fn routine(name: &str, body: Vec<Stmt>) -> Item {
    Item::Routine(RoutineDecl::new(name, body))
}

#[test]
fn routines_run_in_declaration_order() {
    let out = run(vec![
        routine("main", vec![print_text("hello ")]),
        routine("second", vec![print_text("world")]),
    ])
    .expect("run");
    assert_eq!(out, "hello world");
}

#[test]
fn blocked_routine_resumes_after_ready_routines() {
    let out = run(vec![
        routine(
            "main",
            vec![print_text("a"), Stmt::wait(None), print_text("c")],
        ),
        routine("other", vec![print_text("b")]),
    ])
    .expect("run");
    assert_eq!(out, "abc");
}

#[test]
fn blocked_status_propagates_through_sync_callers() {
    let test = FnDecl::new("test").returns("i32").body(vec![
        print_text("1"),
        Stmt::wait(None),
        print_text("2"),
        Stmt::ret(Some(Expr::int(3))),
    ]);
    let out = run(vec![
        Item::Function(test),
        routine(
            "main",
            vec![
                Stmt::let_("r", Expr::name("test").call(vec![])),
                print(Expr::name("r").cast("string")),
            ],
        ),
    ])
    .expect("run");
    assert_eq!(out, "123");
}

#[test]
fn deep_wait_keeps_every_frame() {
    let inner = FnDecl::new("inner").returns("i32").body(vec![
        Stmt::var("x", Expr::int(40)),
        Stmt::wait(None),
        Stmt::ret(Some(Expr::binary(BinOp::Add, Expr::name("x"), Expr::int(1)))),
    ]);
    let middle = FnDecl::new("middle").returns("i32").body(vec![
        Stmt::let_("y", Expr::name("inner").call(vec![])),
        Stmt::wait(None),
        Stmt::ret(Some(Expr::binary(BinOp::Add, Expr::name("y"), Expr::int(1)))),
    ]);
    let mut vm = vm_for(
        vec![
            Item::Function(inner),
            Item::Function(middle),
            routine(
                "main",
                vec![print(Expr::name("middle").call(vec![]).cast("string"))],
            ),
        ],
        VmOptions::default(),
    );

    let first = vm.step_round().expect("round 1");
    assert_eq!(first.remaining, 1);
    let second = vm.step_round().expect("round 2");
    assert_eq!(second.remaining, 1);
    let third = vm.step_round().expect("round 3");
    assert!(third.is_complete());
    assert_eq!(third.round, 3);
    assert_eq!(vm.output(), "42");
}

#[test]
fn round_reports_count_routines() {
    let mut vm = vm_for(
        vec![
            routine("main", vec![Stmt::wait(None)]),
            routine("quick", vec![]),
        ],
        VmOptions::default(),
    );
    let report = vm.step_round().expect("round");
    assert_eq!(report.driven, 2);
    assert_eq!(report.finished, 1);
    assert_eq!(report.remaining, 1);

    let report = vm.step_round().expect("round");
    assert_eq!(report.driven, 1);
    assert!(report.is_complete());
    assert!(vm.is_finished());
}

#[test]
fn missing_entry_routine_is_a_fault() {
    let err = run(vec![routine("worker", vec![print_text("x")])]).unwrap_err();
    assert_eq!(
        err,
        RuntimeFault::NoEntryRoutine {
            name: "main".to_string()
        }
    );
}

#[test]
fn entry_routine_name_is_configurable() {
    let mut vm = vm_for(
        vec![routine("start", vec![print_text("ok")])],
        VmOptions {
            entry_routine: "start".to_string(),
            ..VmOptions::default()
        },
    );
    vm.run().expect("run");
    assert_eq!(vm.output(), "ok");
}

#[test]
fn round_limit_stops_a_routine_that_never_finishes() {
    let mut vm = vm_for(
        vec![routine(
            "main",
            vec![Stmt::while_(Expr::bool(true), vec![Stmt::wait(None)])],
        )],
        VmOptions {
            max_rounds: Some(5),
            ..VmOptions::default()
        },
    );
    let err = vm.run().unwrap_err();
    assert_eq!(err, RuntimeFault::RoundLimitExceeded { rounds: 5 });
    assert_eq!(vm.rounds(), 5);
}

#[test]
fn initializer_runs_before_routines() {
    let out = run(vec![
        Item::Global(GlobalDecl::new("greeting", Some("string"), Some(Expr::string("hi")))),
        routine("main", vec![print(Expr::name("greeting"))]),
    ])
    .expect("run");
    assert_eq!(out, "hi");
}

#[test]
fn initializer_may_not_block() {
    let slow = FnDecl::new("slow")
        .returns("i32")
        .body(vec![Stmt::wait(None), Stmt::ret(Some(Expr::int(1)))]);
    let err = run(vec![
        Item::Function(slow),
        Item::Global(GlobalDecl::new(
            "value",
            Some("i32"),
            Some(Expr::name("slow").call(vec![])),
        )),
        routine("main", vec![]),
    ])
    .unwrap_err();
    assert_eq!(err, RuntimeFault::InitializerBlocked);
}

#[test]
fn blocked_host_call_is_retried_next_round() {
    let calls = Rc::new(Cell::new(0u32));
    let mut vm = vm_for(
        vec![
            Item::Function(FnDecl::new("ticket").external().returns("i32")),
            routine(
                "main",
                vec![print(Expr::name("ticket").call(vec![]).cast("string"))],
            ),
            routine("other", vec![print_text("x")]),
        ],
        VmOptions::default(),
    );
    let seen = Rc::clone(&calls);
    vm.register_host_fn("ticket", move |ctx, result, _args| {
        assert_eq!(ctx.routine(), "main");
        seen.set(seen.get() + 1);
        if seen.get() == 1 {
            return Ok(ReturnStatus::Blocked);
        }
        *result = Some(Value::Int(9));
        Ok(ReturnStatus::Finished)
    });
    vm.run().expect("run");
    assert_eq!(vm.output(), "x9");
    assert_eq!(calls.get(), 2);
}

#[test]
fn call_function_drives_a_blocking_function_to_completion() {
    let add = FnDecl::new("add")
        .returns("i32")
        .param("a", "i32")
        .param("b", "i32")
        .body(vec![
            Stmt::wait(None),
            Stmt::ret(Some(Expr::binary(BinOp::Add, Expr::name("a"), Expr::name("b")))),
        ]);
    let mut vm = vm_for(vec![Item::Function(add)], VmOptions::default());
    let value = vm
        .call_function("add", vec![Value::Int(2), Value::Int(3)])
        .expect("call");
    assert_eq!(value, Some(Value::Int(5)));

    let err = vm.call_function("missing", Vec::new()).unwrap_err();
    assert!(matches!(err, RuntimeFault::UnknownRoutine { .. }));
}
