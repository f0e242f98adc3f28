use expect_test::expect;
use strand_compiler::ast::{
    BinOp, ClassDecl, EnumDecl, Expr, FnDecl, GlobalDecl, InterfaceDecl, Item, Program,
    RoutineDecl, Stmt, TypeSpec, UnOp,
};
use strand_compiler::{
    compile_to_ir, compile_to_ir_with_options, CompileError, CompileOptions, DiagnosticBag,
};
use strand_ir::{Callee, ContainerKind, Intrinsic, Literal, Op, ReturnStatus};

fn compile(items: Vec<Item>) -> Result<strand_ir::Program, CompileError> {
    compile_to_ir(&Program::new(items))
}

fn compile_err(items: Vec<Item>) -> String {
    compile(items).expect_err("should fail").message
}

fn routine(body: Vec<Stmt>) -> Item {
    Item::Routine(RoutineDecl::new("main", body))
}

#[test]
fn break_outside_loop_reports_its_location() {
    let err = compile(vec![routine(vec![Stmt::break_().at(3, 9)])]).unwrap_err();
    expect![["3:9: `break` outside of a loop"]].assert_eq(&err.to_string());
}

#[test]
fn continue_outside_loop() {
    assert_eq!(
        compile_err(vec![routine(vec![Stmt::continue_()])]),
        "`continue` outside of a loop"
    );
}

#[test]
fn yield_outside_generator() {
    let f = FnDecl::new("f").body(vec![Stmt::yield_(Some(Expr::int(1)))]);
    assert_eq!(
        compile_err(vec![Item::Function(f)]),
        "`yield` outside of a generator function"
    );
}

#[test]
fn implicit_cast_must_exist() {
    let one = FnDecl::new("one")
        .returns("i32")
        .body(vec![Stmt::ret(Some(Expr::int(1)))]);
    let err = compile_err(vec![
        Item::Function(one),
        routine(vec![Stmt::let_typed(
            "b",
            "bool",
            Expr::name("one").call(vec![]),
        )]),
    ]);
    expect![["type mismatch: expected `bool`, found `i32`"]].assert_eq(&err);
}

#[test]
fn unknown_names_are_reported() {
    let err = compile_err(vec![routine(vec![Stmt::expr(
        Expr::name("nowhere").call(vec![]),
    )])]);
    assert_eq!(err, "unknown name `nowhere`");
}

#[test]
fn readonly_bindings_reject_assignment() {
    let err = compile_err(vec![routine(vec![
        Stmt::let_("x", Expr::int(1)),
        Stmt::assign(Expr::name("x"), Expr::int(2)),
    ])]);
    assert!(err.starts_with("cannot assign to readonly"), "{err}");
}

#[test]
fn missing_return_value() {
    let f = FnDecl::new("f").returns("i32").body(vec![Stmt::ret(None)]);
    assert_eq!(
        compile_err(vec![Item::Function(f)]),
        "missing return value of type `i32`"
    );
}

#[test]
fn ambiguous_interface_member_needs_a_cast() {
    let a = InterfaceDecl::new("A").method(FnDecl::new("f"));
    let b = InterfaceDecl::new("B").method(FnDecl::new("f"));
    let c = ClassDecl::new("C")
        .implements("A", vec![FnDecl::new("f").body(vec![])])
        .implements("B", vec![FnDecl::new("f").body(vec![])]);
    let err = compile_err(vec![
        Item::Interface(a),
        Item::Interface(b),
        Item::Class(c),
        routine(vec![
            Stmt::let_("c", Expr::new_object("C", vec![])),
            Stmt::expr(Expr::name("c").method("f", vec![])),
        ]),
    ]);
    assert!(err.contains("is ambiguous"), "{err}");
}

#[test]
fn generic_methods_are_rejected() {
    let class = ClassDecl::new("Holder").method(
        FnDecl::new("pick")
            .generic("T")
            .param("value", "T")
            .returns("T")
            .body(vec![Stmt::ret(Some(Expr::name("value")))]),
    );
    assert_eq!(
        compile_err(vec![Item::Class(class)]),
        "method `Holder.pick` cannot be generic"
    );
}

#[test]
fn static_initializer_in_generic_class_is_rejected() {
    let class = ClassDecl::new("Box")
        .generic("T")
        .static_field("count", "i32", Some(Expr::int(0)));
    let err = compile_err(vec![
        Item::Class(class),
        routine(vec![Stmt::var_typed("b", "Box<i32>", None)]),
    ]);
    assert_eq!(
        err,
        "static field `Box<i32>.count` of a generic class cannot have an initializer"
    );
}

#[test]
fn globals_need_an_annotation_or_literal() {
    let one = FnDecl::new("one")
        .returns("i32")
        .body(vec![Stmt::ret(Some(Expr::int(1)))]);
    assert_eq!(
        compile_err(vec![
            Item::Function(one),
            Item::Global(GlobalDecl::new("g", None, Some(Expr::name("one").call(vec![])))),
        ]),
        "global `g` needs a type annotation"
    );
}

#[test]
fn async_extern_call_is_rejected() {
    let err = compile_err(vec![
        Item::Function(FnDecl::new("tick").external()),
        routine(vec![Stmt::let_(
            "f",
            Expr::asynchronous(Expr::name("tick").call(vec![])),
        )]),
    ]);
    assert!(err.contains("cannot be called with `async`"), "{err}");
}

#[test]
fn routines_are_recorded_in_declaration_order() {
    let program = compile(vec![
        Item::Routine(RoutineDecl::new("main", vec![])),
        Item::Routine(RoutineDecl::new("worker", vec![])),
    ])
    .expect("compile");
    let names: Vec<&str> = program.routine_names().map(|(_, name)| name).collect();
    assert_eq!(names, ["main", "worker"]);
    for id in &program.routines {
        let container = program.container(*id).expect("routine container");
        assert_eq!(container.kind, ContainerKind::Routine);
    }
}

#[test]
fn bare_wait_returns_blocked_once() {
    let program = compile(vec![routine(vec![Stmt::wait(None)])]).expect("compile");
    let id = program.routines[0];
    let container = program.container(id).expect("routine");
    let blocked = container
        .instructions
        .iter()
        .filter(|inst| {
            matches!(
                inst.op,
                Op::Return {
                    status: ReturnStatus::Blocked,
                    ..
                }
            )
        })
        .count();
    assert_eq!(blocked, 1);
    assert!(matches!(
        container.instructions.last().map(|i| &i.op),
        Some(Op::Return {
            value: None,
            status: ReturnStatus::Finished
        })
    ));
}

#[test]
fn loops_use_container_scoped_labels() {
    let program = compile(vec![routine(vec![
        Stmt::var("i", Expr::int(0)),
        Stmt::while_(
            Expr::binary(BinOp::Lt, Expr::name("i"), Expr::int(3)),
            vec![Stmt::assign(
                Expr::name("i"),
                Expr::binary(BinOp::Add, Expr::name("i"), Expr::int(1)),
            )],
        ),
    ])])
    .expect("compile");
    let container = program.container(program.routines[0]).expect("routine");
    for inst in &container.instructions {
        let target = match &inst.op {
            Op::Jump { target } | Op::Branch { target, .. } => target,
            _ => continue,
        };
        assert!(target.0.starts_with("main_"), "{}", target.0);
        assert!(container.label_target(target).is_some());
    }
    assert!(program
        .dump_container(program.routines[0])
        .contains("$t0"));
}

#[test]
fn generic_functions_are_specialized_per_argument_list() {
    let identity = FnDecl::new("identity")
        .generic("T")
        .param("value", "T")
        .returns("T")
        .body(vec![Stmt::ret(Some(Expr::name("value")))]);
    let program = compile(vec![
        Item::Function(identity),
        routine(vec![
            Stmt::let_("a", Expr::name("identity").call(vec![Expr::int(1)])),
            Stmt::let_("b", Expr::name("identity").call(vec![Expr::int(2)])),
            Stmt::let_(
                "c",
                Expr::name("identity")
                    .call_generic(vec![TypeSpec::from_text("bool")], vec![Expr::bool(true)]),
            ),
        ]),
    ])
    .expect("compile");
    assert!(program.container_id("identity<i32>").is_some());
    assert!(program.container_id("identity<bool>").is_some());
    let specialized = program
        .containers
        .iter()
        .filter(|c| c.name.starts_with("identity<"))
        .count();
    assert_eq!(specialized, 2);
}

#[test]
fn classes_get_a_table_per_implemented_interface() {
    let shape = InterfaceDecl::new("Shape").method(FnDecl::new("area").returns("i32"));
    let square = ClassDecl::new("Square").field("side", "i32").implements(
        "Shape",
        vec![FnDecl::new("area").returns("i32").body(vec![Stmt::ret(Some(
            Expr::binary(
                BinOp::Mul,
                Expr::this().member("side"),
                Expr::this().member("side"),
            ),
        ))])],
    );
    let program = compile(vec![
        Item::Interface(shape),
        Item::Class(square),
        routine(vec![
            Stmt::let_typed(
                "s",
                "Shape",
                Expr::new_object("Square", vec![("side", Expr::int(2))]),
            ),
            Stmt::expr(Expr::name("s").method("area", vec![])),
        ]),
    ])
    .expect("compile");
    let class = program.type_id("Square").expect("class");
    let iface = program.type_id("Shape").expect("interface");
    let table = program
        .vtable(program.vtable_for(class, iface).expect("table"))
        .expect("table");
    assert_eq!(table.slots.len(), 1);

    let main = program.container(program.routines[0]).expect("routine");
    assert!(main.instructions.iter().any(|inst| matches!(
        inst.op,
        Op::Call {
            callee: Callee::Virtual { slot: 0 },
            ..
        }
    )));
}

#[test]
fn enum_variants_are_numbered_in_order() {
    let color = EnumDecl::new("Color")
        .variant("red")
        .variant("green")
        .variant_with("custom", "i32");
    let program = compile(vec![Item::Enum(color)]).expect("compile");
    let ty = program.type_id("Color").expect("enum");
    let strand_ir::TypeKind::Enum(info) = &program.type_def(ty).expect("def").kind else {
        panic!("not an enum");
    };
    let tags: Vec<i64> = info.variants.iter().map(|v| v.tag).collect();
    assert_eq!(tags, [0, 1, 2]);
    assert!(info.variant("custom").and_then(|v| v.payload).is_some());
}

#[test]
fn lambdas_become_closures_over_their_captures() {
    let program = compile(vec![routine(vec![
        Stmt::let_("base", Expr::int(1)),
        Stmt::let_(
            "f",
            Expr::lambda(
                vec![],
                Some("i32"),
                vec![Stmt::ret(Some(Expr::name("base")))],
            ),
        ),
    ])])
    .expect("compile");
    let main = program.container(program.routines[0]).expect("routine");
    let closure = main.instructions.iter().find_map(|inst| match &inst.op {
        Op::Call {
            callee: Callee::Intrinsic(Intrinsic::Closure(id)),
            args,
            ..
        } => Some((*id, args.len())),
        _ => None,
    });
    let (lambda, captured) = closure.expect("closure");
    assert_eq!(captured, 1);
    assert_eq!(program.container(lambda).expect("lambda").captures.len(), 1);
}

#[test]
fn ir_dump_goes_to_the_sink() {
    let options = CompileOptions {
        dump_ir: true,
        ..CompileOptions::default()
    };
    let mut bag = DiagnosticBag::new();
    compile_to_ir_with_options(
        &Program::new(vec![routine(vec![Stmt::expr(
            Expr::name("print").call(vec![Expr::string("hi")]),
        )])]),
        &options,
        &mut bag,
    )
    .expect("compile");
    assert!(bag
        .diagnostics
        .iter()
        .any(|d| d.message.starts_with("routine main()")));
}

#[test]
fn negated_literals_are_range_checked_with_their_sign() {
    let program = compile(vec![routine(vec![Stmt::let_typed(
        "x",
        "i8",
        Expr::unary(UnOp::Neg, Expr::int(128)),
    )])])
    .expect("compile");
    let main = program.container(program.routines[0]).expect("routine");
    assert!(main.instructions.iter().any(|inst| matches!(
        &inst.op,
        Op::Literal {
            value: Literal::Int(-128),
            ..
        }
    )));
    assert!(!main
        .instructions
        .iter()
        .any(|inst| matches!(inst.op, Op::Unary { .. })));

    let err = compile_err(vec![routine(vec![Stmt::let_typed(
        "y",
        "u8",
        Expr::unary(UnOp::Neg, Expr::int(1)),
    )])]);
    expect![["type mismatch: expected `u8`, found `i32`"]].assert_eq(&err);

    let err = compile_err(vec![routine(vec![Stmt::let_typed(
        "z",
        "i8",
        Expr::unary(UnOp::Neg, Expr::int(129)),
    )])]);
    assert_eq!(err, "type mismatch: expected `i8`, found `i32`");
}

#[test]
fn generic_types_are_specialized_once_per_argument_list() {
    let boxed = ClassDecl::new("Box").generic("T").field("value", "T");
    let unbox = FnDecl::new("unbox")
        .param("b", "Box<i32>")
        .returns("i32")
        .body(vec![Stmt::ret(Some(Expr::name("b").member("value")))]);
    let program = compile(vec![
        Item::Class(boxed),
        Item::Function(unbox),
        routine(vec![
            Stmt::let_(
                "a",
                Expr::new_object("Box<i32>", vec![("value", Expr::int(1))]),
            ),
            Stmt::let_typed(
                "b",
                "Box<i32>",
                Expr::new_object("Box<i32>", vec![("value", Expr::int(2))]),
            ),
            Stmt::let_(
                "c",
                Expr::new_object("Box<bool>", vec![("value", Expr::bool(true))]),
            ),
            Stmt::expr(Expr::name("unbox").call(vec![Expr::name("a")])),
        ]),
    ])
    .expect("compile");
    let template = program.type_id("Box").expect("template");
    let ints = program.type_id("Box<i32>").expect("Box<i32>");
    let count = |name: &str| program.types.iter().filter(|t| t.name == name).count();
    assert_eq!(count("Box<i32>"), 1);
    assert_eq!(count("Box<bool>"), 1);
    assert_eq!(program.types[ints.0 as usize].generic_origin, Some(template));
}

#[test]
fn loop_body_is_a_nested_scope() {
    let digits = FnDecl::new("digits")
        .returns("Generator<i32>")
        .body(vec![Stmt::yield_(Some(Expr::int(1)))]);
    let program = compile(vec![
        Item::Function(digits),
        routine(vec![Stmt::for_(
            "d",
            Expr::name("digits").call(vec![]),
            vec![Stmt::let_("d", Expr::int(2))],
        )]),
    ])
    .expect("compile");
    assert!(program.symbols.iter().any(|s| s.full_name == "d#1"));
}
