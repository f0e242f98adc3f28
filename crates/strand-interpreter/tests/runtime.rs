use std::rc::Rc;

use strand_compiler::ast::{
    BinOp, ClassDecl, EnumDecl, EventDecl, Expr, FnDecl, Item, Param, Program, RoutineDecl, Stmt,
};
use strand_compiler::compile_to_ir;
use strand_interpreter::{register_core_host_fns, RuntimeFault, Vm, VmOptions};

fn run(items: Vec<Item>) -> Result<String, RuntimeFault> {
    let program = compile_to_ir(&Program::new(items)).expect("compile");
    let mut vm = Vm::new(Rc::new(program), VmOptions::default());
    register_core_host_fns(&mut vm);
    vm.run()?;
    Ok(vm.take_output())
}

fn print(value: Expr) -> Stmt {
    Stmt::expr(Expr::name("print").call(vec![value]))
}

fn print_text(text: &str) -> Stmt {
    print(Expr::string(text))
}

fn print_value(value: Expr) -> Stmt {
    print(value.cast("string"))
}

fn main(body: Vec<Stmt>) -> Item {
    Item::Routine(RoutineDecl::new("main", body))
}

fn counter() -> Item {
    let body = vec![
        Stmt::var("i", Expr::int(0)),
        Stmt::while_(
            Expr::binary(BinOp::Lt, Expr::name("i"), Expr::name("n")),
            vec![
                Stmt::assign(
                    Expr::name("i"),
                    Expr::binary(BinOp::Add, Expr::name("i"), Expr::int(1)),
                ),
                Stmt::yield_(Some(Expr::name("i"))),
            ],
        ),
    ];
    Item::Function(
        FnDecl::new("count")
            .param("n", "i32")
            .returns("Generator<i32>")
            .body(body),
    )
}

#[test]
fn generator_yields_each_value_in_order() {
    let out = run(vec![
        counter(),
        main(vec![Stmt::for_(
            "x",
            Expr::name("count").call(vec![Expr::int(3)]),
            vec![print_value(Expr::name("x"))],
        )]),
    ])
    .expect("run");
    assert_eq!(out, "123");
}

#[test]
fn generator_that_returns_immediately_ends_the_loop() {
    let empty = FnDecl::new("empty")
        .returns("Generator<i32>")
        .body(vec![Stmt::ret(None)]);
    let out = run(vec![
        Item::Function(empty),
        main(vec![
            Stmt::for_(
                "x",
                Expr::name("empty").call(vec![]),
                vec![print_value(Expr::name("x"))],
            ),
            print_text("done"),
        ]),
    ])
    .expect("run");
    assert_eq!(out, "done");
}

#[test]
fn generator_return_value_is_the_last_element() {
    let two = FnDecl::new("two").returns("Generator<i32>").body(vec![
        Stmt::yield_(Some(Expr::int(1))),
        Stmt::ret(Some(Expr::int(2))),
        Stmt::yield_(Some(Expr::int(3))),
    ]);
    let out = run(vec![
        Item::Function(two),
        main(vec![Stmt::for_(
            "x",
            Expr::name("two").call(vec![]),
            vec![print_value(Expr::name("x"))],
        )]),
    ])
    .expect("run");
    assert_eq!(out, "12");
}

#[test]
fn future_runs_its_body_once_and_caches_the_value() {
    let compute = FnDecl::new("compute").asynchronous().returns("i32").body(vec![
        print_text("run "),
        Stmt::wait(None),
        Stmt::ret(Some(Expr::int(42))),
    ]);
    let out = run(vec![
        Item::Function(compute),
        main(vec![
            Stmt::let_("f", Expr::asynchronous(Expr::name("compute").call(vec![]))),
            Stmt::let_("first", Expr::name("f").method("poll", vec![])),
            print_value(Expr::name("first").member("_value")),
            Stmt::let_("v", Expr::wait(Expr::name("f"))),
            print_value(Expr::name("v")),
            Stmt::let_("again", Expr::wait(Expr::name("f"))),
            print_value(Expr::name("again")),
        ]),
    ])
    .expect("run");
    assert_eq!(out, "run 04242");
}

#[test]
fn waiting_on_a_future_blocks_only_the_waiting_routine() {
    let slow = FnDecl::new("slow").asynchronous().returns("i32").body(vec![
        Stmt::wait(None),
        Stmt::wait(None),
        Stmt::ret(Some(Expr::int(7))),
    ]);
    let out = run(vec![
        Item::Function(slow),
        main(vec![
            Stmt::let_("v", Expr::wait(Expr::name("slow").call(vec![]))),
            print_value(Expr::name("v")),
        ]),
        Item::Routine(RoutineDecl::new("other", vec![print_text("b")])),
    ])
    .expect("run");
    assert_eq!(out, "b7");
}

#[test]
fn emit_completes_registered_listeners() {
    let out = run(vec![
        Item::Event(EventDecl::new("ping", Some("i32"))),
        main(vec![
            Stmt::let_("v", Expr::wait(Expr::name("ping"))),
            print_value(Expr::name("v")),
        ]),
        Item::Routine(RoutineDecl::new(
            "sender",
            vec![print_text("send "), Stmt::emit(Expr::name("ping"), Some(Expr::int(5)))],
        )),
    ])
    .expect("run");
    assert_eq!(out, "send 5");
}

#[test]
fn enum_payload_and_discriminant() {
    let shape = EnumDecl::new("Shape")
        .variant("empty")
        .variant_with("square", "i32");
    let out = run(vec![
        Item::Enum(shape),
        main(vec![
            Stmt::let_(
                "s",
                Expr::name("Shape").member("square").call(vec![Expr::int(4)]),
            ),
            Stmt::if_(
                Expr::name("s").is("Shape.square"),
                vec![print_value(Expr::name("s").member("square"))],
                None,
            ),
            Stmt::if_(
                Expr::name("s").is("Shape.empty"),
                vec![print_text("wrong")],
                None,
            ),
            print_value(Expr::name("s").member("_value")),
        ]),
    ])
    .expect("run");
    assert_eq!(out, "41");
}

#[test]
fn reading_an_inactive_payload_faults() {
    let shape = EnumDecl::new("Shape")
        .variant("empty")
        .variant_with("square", "i32");
    let err = run(vec![
        Item::Enum(shape),
        main(vec![
            Stmt::let_("s", Expr::name("Shape").member("empty")),
            print_text("before "),
            print_value(Expr::name("s").member("square")),
        ]),
    ])
    .unwrap_err();
    assert!(matches!(err, RuntimeFault::InactivePayload { tag: 1, .. }));
}

#[test]
fn missing_host_function_faults() {
    let err = run(vec![
        Item::Function(FnDecl::new("beep").external()),
        main(vec![Stmt::expr(Expr::name("beep").call(vec![]))]),
    ])
    .unwrap_err();
    assert_eq!(
        err,
        RuntimeFault::MissingHostFunction {
            name: "beep".to_string()
        }
    );
}

#[test]
fn division_by_zero_faults() {
    let err = run(vec![main(vec![
        Stmt::var("zero", Expr::int(0)),
        print_value(Expr::binary(BinOp::Div, Expr::int(1), Expr::name("zero"))),
    ])])
    .unwrap_err();
    assert_eq!(err, RuntimeFault::DivisionByZero);
}

#[test]
fn unset_reference_field_faults_but_primitives_are_zeroed() {
    let inner = ClassDecl::new("Inner");
    let outer = ClassDecl::new("Outer")
        .field("count", "i32")
        .field("inner", "Inner");
    let err = run(vec![
        Item::Class(inner),
        Item::Class(outer),
        main(vec![
            Stmt::let_("o", Expr::new_object("Outer", vec![])),
            print_value(Expr::name("o").member("count")),
            Stmt::let_("i", Expr::name("o").member("inner")),
        ]),
    ])
    .unwrap_err();
    assert_eq!(
        err,
        RuntimeFault::UninitializedField {
            class: "Outer".to_string(),
            field: "inner".to_string()
        }
    );
}

#[test]
fn lambdas_capture_by_value() {
    let out = run(vec![main(vec![
        Stmt::var("base", Expr::int(10)),
        Stmt::let_(
            "add",
            Expr::lambda(
                vec![Param::new("x", "i32")],
                Some("i32"),
                vec![Stmt::ret(Some(Expr::binary(
                    BinOp::Add,
                    Expr::name("x"),
                    Expr::name("base"),
                )))],
            ),
        ),
        Stmt::assign(Expr::name("base"), Expr::int(100)),
        print_value(Expr::name("add").call(vec![Expr::int(5)])),
    ])])
    .expect("run");
    assert_eq!(out, "15");
}

#[test]
fn bound_methods_keep_their_receiver() {
    let counter = ClassDecl::new("Counter")
        .field("value", "i32")
        .method(FnDecl::new("get").returns("i32").body(vec![Stmt::ret(Some(
            Expr::this().member("value"),
        ))]));
    let out = run(vec![
        Item::Class(counter),
        main(vec![
            Stmt::let_(
                "c",
                Expr::new_object("Counter", vec![("value", Expr::int(3))]),
            ),
            Stmt::let_("get", Expr::name("c").member("get")),
            Stmt::assign(Expr::name("c").member("value"), Expr::int(8)),
            print_value(Expr::name("get").call(vec![])),
        ]),
    ])
    .expect("run");
    assert_eq!(out, "8");
}

#[test]
fn atomics_update_in_place() {
    let out = run(vec![main(vec![
        Stmt::let_("a", Expr::new_object("Atomic", vec![])),
        Stmt::expr(Expr::name("atomic_add").call(vec![Expr::name("a"), Expr::int(5)])),
        Stmt::expr(Expr::name("atomic_store").call(vec![
            Expr::name("a"),
            Expr::binary(
                BinOp::Add,
                Expr::name("atomic_load").call(vec![Expr::name("a")]),
                Expr::int(2),
            ),
        ])),
        Stmt::let_(
            "swapped",
            Expr::name("atomic_compare_exchange").call(vec![
                Expr::name("a"),
                Expr::int(7),
                Expr::int(1),
            ]),
        ),
        print_value(Expr::name("swapped")),
        print_value(Expr::name("atomic_load").call(vec![Expr::name("a")])),
    ])])
    .expect("run");
    assert_eq!(out, "true1");
}
