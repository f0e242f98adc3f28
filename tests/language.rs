mod common;

use common::{main, print, ret, run, show};
use strand::ast::{
    BinOp, ClassDecl, EnumDecl, Expr, FnDecl, GlobalDecl, ImportDecl, InterfaceDecl, Item,
    NamespaceDecl, Param, Primitive, Stmt, UnOp,
};

#[test]
fn interface_defaults_resolve_to_the_most_derived_redeclaration() {
    let named = InterfaceDecl::new("Named").method(
        FnDecl::new("name")
            .returns("string")
            .body(vec![ret(Expr::string("I"))]),
    );
    let titled = InterfaceDecl::new("Titled").extends("Named").method(
        FnDecl::new("name")
            .returns("string")
            .body(vec![ret(Expr::string("J"))]),
    );
    let thing = ClassDecl::new("Thing").implements("Titled", vec![]);
    let out = run(vec![
        Item::Interface(named),
        Item::Interface(titled),
        Item::Class(thing),
        main(vec![
            Stmt::let_typed("n", "Named", Expr::new_object("Thing", vec![])),
            print(Expr::name("n").method("name", vec![])),
        ]),
    ]);
    assert_eq!(out, "J");
}

#[test]
fn class_methods_override_interface_defaults() {
    let shape = InterfaceDecl::new("Shape")
        .method(FnDecl::new("area").returns("i32"))
        .method(
            FnDecl::new("label")
                .returns("string")
                .body(vec![ret(Expr::string("shape"))]),
        );
    let square = ClassDecl::new("Square").field("side", "i32").implements(
        "Shape",
        vec![FnDecl::new("area").returns("i32").body(vec![ret(Expr::binary(
            BinOp::Mul,
            Expr::this().member("side"),
            Expr::this().member("side"),
        ))])],
    );
    let circle = ClassDecl::new("Dot").implements(
        "Shape",
        vec![
            FnDecl::new("area").returns("i32").body(vec![ret(Expr::int(0))]),
            FnDecl::new("label")
                .returns("string")
                .body(vec![ret(Expr::string("dot"))]),
        ],
    );
    let describe = FnDecl::new("describe")
        .param("s", "Shape")
        .body(vec![
            print(Expr::name("s").method("label", vec![])),
            print(Expr::string("=")),
            show(Expr::name("s").method("area", vec![])),
            print(Expr::string(" ")),
        ]);
    let out = run(vec![
        Item::Interface(shape),
        Item::Class(square),
        Item::Class(circle),
        Item::Function(describe),
        main(vec![
            Stmt::expr(Expr::name("describe").call(vec![Expr::new_object(
                "Square",
                vec![("side", Expr::int(3))],
            )])),
            Stmt::expr(Expr::name("describe").call(vec![Expr::new_object("Dot", vec![])])),
        ]),
    ]);
    assert_eq!(out, "shape=9 dot=0 ");
}

#[test]
fn interface_values_test_and_downcast_to_classes() {
    let pet = InterfaceDecl::new("Pet").method(FnDecl::new("sound").returns("string"));
    let dog = ClassDecl::new("Dog").field("age", "i32").implements(
        "Pet",
        vec![FnDecl::new("sound")
            .returns("string")
            .body(vec![ret(Expr::string("woof"))])],
    );
    let cat = ClassDecl::new("Cat").implements(
        "Pet",
        vec![FnDecl::new("sound")
            .returns("string")
            .body(vec![ret(Expr::string("meow"))])],
    );
    let out = run(vec![
        Item::Interface(pet),
        Item::Class(dog),
        Item::Class(cat),
        main(vec![
            Stmt::let_typed(
                "p",
                "Pet",
                Expr::new_object("Dog", vec![("age", Expr::int(4))]),
            ),
            Stmt::if_(
                Expr::name("p").is("Cat"),
                vec![print(Expr::string("cat "))],
                Some(vec![print(Expr::string("not a cat "))]),
            ),
            Stmt::if_(
                Expr::name("p").is("Dog"),
                vec![
                    Stmt::let_("d", Expr::name("p").cast("Dog")),
                    show(Expr::name("d").member("age")),
                ],
                None,
            ),
        ]),
    ]);
    assert_eq!(out, "not a cat 4");
}

#[test]
fn numeric_values_widen_implicitly_through_several_steps() {
    let total = FnDecl::new("total")
        .param("a", "i64")
        .param("b", "f64")
        .returns("f64")
        .body(vec![ret(Expr::binary(
            BinOp::Add,
            Expr::name("a").cast("f64"),
            Expr::name("b"),
        ))]);
    let out = run(vec![
        Item::Function(total),
        main(vec![
            Stmt::let_("small", Expr::typed_int(7, Primitive::I8)),
            Stmt::let_("f", Expr::typed_int(1, Primitive::I32).cast("f32")),
            show(
                Expr::name("total").call(vec![Expr::name("small"), Expr::name("f")]),
            ),
            print(Expr::string(" ")),
            show(Expr::typed_int(300, Primitive::I32).cast("u8")),
        ]),
    ]);
    assert_eq!(out, "8 44");
}

#[test]
fn generic_functions_and_classes_specialize_on_use() {
    let identity = FnDecl::new("identity")
        .generic("T")
        .param("value", "T")
        .returns("T")
        .body(vec![ret(Expr::name("value"))]);
    let boxed = ClassDecl::new("Box")
        .generic("T")
        .field("value", "T")
        .method(
            FnDecl::new("get")
                .returns("T")
                .body(vec![ret(Expr::this().member("value"))]),
        );
    let out = run(vec![
        Item::Function(identity),
        Item::Class(boxed),
        main(vec![
            show(Expr::name("identity").call(vec![Expr::int(5)])),
            print(Expr::name("identity").call(vec![Expr::string("-")])),
            Stmt::let_(
                "b",
                Expr::new_object("Box<bool>", vec![("value", Expr::bool(true))]),
            ),
            show(Expr::name("b").method("get", vec![])),
        ]),
    ]);
    assert_eq!(out, "5-true");
}

#[test]
fn generic_option_carries_a_payload() {
    let find = FnDecl::new("find")
        .param("wanted", "i32")
        .returns("Option<i32>")
        .body(vec![Stmt::if_(
            Expr::binary(BinOp::Gt, Expr::name("wanted"), Expr::int(0)),
            vec![ret(Expr::name("Option<i32>")
                .member("some")
                .call(vec![Expr::name("wanted")]))],
            Some(vec![ret(Expr::name("Option<i32>").member("none"))]),
        )]);
    let out = run(vec![
        Item::Function(find),
        main(vec![
            Stmt::let_("hit", Expr::name("find").call(vec![Expr::int(3)])),
            Stmt::let_("miss", Expr::name("find").call(vec![Expr::int(0)])),
            Stmt::if_(
                Expr::name("hit").is("some"),
                vec![show(Expr::name("hit").member("some"))],
                None,
            ),
            Stmt::if_(
                Expr::name("miss").is("none"),
                vec![print(Expr::string(" none"))],
                None,
            ),
        ]),
    ]);
    assert_eq!(out, "3 none");
}

#[test]
fn readonly_copies_of_copyable_classes_are_independent() {
    let point = ClassDecl::new("Point").field("x", "i32").implements(
        "Copy<Point>",
        vec![FnDecl::new("copy").returns("Point").body(vec![ret(
            Expr::new_object("Point", vec![("x", Expr::this().member("x"))]),
        )])],
    );
    let out = run(vec![
        Item::Class(point),
        main(vec![
            Stmt::var("p", Expr::new_object("Point", vec![("x", Expr::int(1))])),
            Stmt::let_("frozen", Expr::name("p")),
            Stmt::assign(Expr::name("p").member("x"), Expr::int(5)),
            show(Expr::name("frozen").member("x")),
            show(Expr::name("p").member("x")),
        ]),
    ]);
    assert_eq!(out, "15");
}

#[test]
fn enum_values_are_copied_between_readonly_and_mutable_bindings() {
    let light = EnumDecl::new("Light").variant("red").variant("green");
    let out = run(vec![
        Item::Enum(light),
        main(vec![
            Stmt::var("current", Expr::name("Light").member("red")),
            Stmt::let_("before", Expr::name("current")),
            Stmt::assign(Expr::name("current").member("_value"), Expr::int(1)),
            show(Expr::name("before").member("_value")),
            show(Expr::name("current").member("_value")),
        ]),
    ]);
    assert_eq!(out, "01");
}

#[test]
fn lambdas_are_first_class_values() {
    let apply = FnDecl::new("apply")
        .param("f", "fn(i32) -> i32")
        .param("x", "i32")
        .returns("i32")
        .body(vec![ret(Expr::name("f").call(vec![Expr::name("x")]))]);
    let out = run(vec![
        Item::Function(apply),
        main(vec![
            Stmt::let_("offset", Expr::int(10)),
            Stmt::let_(
                "add",
                Expr::lambda(
                    vec![Param::new("v", "i32")],
                    Some("i32"),
                    vec![ret(Expr::binary(
                        BinOp::Add,
                        Expr::name("v"),
                        Expr::name("offset"),
                    ))],
                ),
            ),
            show(Expr::name("apply").call(vec![Expr::name("add"), Expr::int(5)])),
        ]),
    ]);
    assert_eq!(out, "15");
}

#[test]
fn namespaces_qualify_and_imports_unqualify() {
    let area = FnDecl::new("area")
        .param("w", "i32")
        .param("h", "i32")
        .returns("i32")
        .body(vec![ret(Expr::binary(BinOp::Mul, Expr::name("w"), Expr::name("h")))]);
    let geo = NamespaceDecl::new("geo", vec![Item::Function(area)]);
    let app = NamespaceDecl::new(
        "app",
        vec![
            Item::Import(ImportDecl::new("geo")),
            Item::Function(
                FnDecl::new("twice")
                    .returns("i32")
                    .body(vec![ret(Expr::name("area").call(vec![Expr::int(2), Expr::int(6)]))]),
            ),
        ],
    );
    let out = run(vec![
        Item::Namespace(geo),
        Item::Namespace(app),
        main(vec![
            show(Expr::name("geo").member("area").call(vec![Expr::int(2), Expr::int(3)])),
            print(Expr::string(" ")),
            show(Expr::name("app").member("twice").call(vec![])),
        ]),
    ]);
    assert_eq!(out, "6 12");
}

#[test]
fn statics_and_globals_are_initialized_before_routines() {
    let counter = ClassDecl::new("Counter")
        .static_field("count", "i32", Some(Expr::int(10)))
        .method(FnDecl::new("bump").statik().body(vec![Stmt::assign(
            Expr::name("Counter").member("count"),
            Expr::binary(
                BinOp::Add,
                Expr::name("Counter").member("count"),
                Expr::int(1),
            ),
        )]));
    let out = run(vec![
        Item::Class(counter),
        Item::Global(GlobalDecl::new("label", None, Some(Expr::string("count=")))),
        Item::Global(
            GlobalDecl::new("limit", Some("i32"), Some(Expr::int(2))).readonly(),
        ),
        main(vec![
            Stmt::var("i", Expr::int(0)),
            Stmt::while_(
                Expr::binary(BinOp::Lt, Expr::name("i"), Expr::name("limit")),
                vec![
                    Stmt::expr(Expr::name("Counter").member("bump").call(vec![])),
                    Stmt::assign(
                        Expr::name("i"),
                        Expr::binary(BinOp::Add, Expr::name("i"), Expr::int(1)),
                    ),
                ],
            ),
            print(Expr::name("label")),
            show(Expr::name("Counter").member("count")),
        ]),
    ]);
    assert_eq!(out, "count=12");
}

#[test]
fn loops_break_and_continue() {
    let out = run(vec![main(vec![
        Stmt::var("i", Expr::int(0)),
        Stmt::while_(
            Expr::bool(true),
            vec![
                Stmt::assign(
                    Expr::name("i"),
                    Expr::binary(BinOp::Add, Expr::name("i"), Expr::int(1)),
                ),
                Stmt::if_(
                    Expr::binary(
                        BinOp::Eq,
                        Expr::binary(BinOp::Rem, Expr::name("i"), Expr::int(2)),
                        Expr::int(0),
                    ),
                    vec![Stmt::continue_()],
                    None,
                ),
                Stmt::if_(
                    Expr::binary(BinOp::Gt, Expr::name("i"), Expr::int(7)),
                    vec![Stmt::break_()],
                    None,
                ),
                show(Expr::name("i")),
            ],
        ),
        show(Expr::unary(UnOp::Neg, Expr::name("i"))),
    ])]);
    assert_eq!(out, "1357-9");
}

#[test]
fn class_overrides_win_through_every_view_of_the_object() {
    let named = InterfaceDecl::new("Named").method(
        FnDecl::new("name")
            .returns("string")
            .body(vec![ret(Expr::string("I"))]),
    );
    let titled = InterfaceDecl::new("Titled").extends("Named").method(
        FnDecl::new("name")
            .returns("string")
            .body(vec![ret(Expr::string("J"))]),
    );
    let thing = ClassDecl::new("Thing").implements(
        "Titled",
        vec![FnDecl::new("name")
            .returns("string")
            .body(vec![ret(Expr::string("C"))])],
    );
    let out = run(vec![
        Item::Interface(named),
        Item::Interface(titled),
        Item::Class(thing),
        main(vec![
            Stmt::let_("c", Expr::new_object("Thing", vec![])),
            Stmt::let_typed("n", "Named", Expr::name("c")),
            Stmt::let_typed("t", "Titled", Expr::name("c")),
            print(Expr::name("n").method("name", vec![])),
            print(Expr::name("t").method("name", vec![])),
            print(Expr::name("c").method("name", vec![])),
            Stmt::let_("back", Expr::name("t").cast("Named")),
            print(Expr::name("back").method("name", vec![])),
        ]),
    ]);
    assert_eq!(out, "CCCC");
}

#[test]
fn repeated_implementation_blocks_replace_only_the_slots_they_name() {
    let letters = InterfaceDecl::new("Letters")
        .method(FnDecl::new("a").returns("string"))
        .method(FnDecl::new("b").returns("string"));
    let text = |s: &str| FnDecl::new(s).returns("string");
    let pair = ClassDecl::new("Pair")
        .implements(
            "Letters",
            vec![
                text("a").body(vec![ret(Expr::string("a1"))]),
                text("b").body(vec![ret(Expr::string("b1"))]),
            ],
        )
        .implements("Letters", vec![text("a").body(vec![ret(Expr::string("a2"))])]);
    let out = run(vec![
        Item::Interface(letters),
        Item::Class(pair),
        main(vec![
            Stmt::let_typed("l", "Letters", Expr::new_object("Pair", vec![])),
            print(Expr::name("l").method("a", vec![])),
            print(Expr::name("l").method("b", vec![])),
        ]),
    ]);
    assert_eq!(out, "a2b1");
}

#[test]
fn logical_operators_short_circuit() {
    let loud = FnDecl::new("loud")
        .returns("bool")
        .body(vec![print(Expr::string("X")), ret(Expr::bool(true))]);
    let out = run(vec![
        Item::Function(loud),
        main(vec![
            Stmt::if_(
                Expr::binary(
                    BinOp::And,
                    Expr::bool(false),
                    Expr::name("loud").call(vec![]),
                ),
                vec![print(Expr::string("!"))],
                None,
            ),
            Stmt::if_(
                Expr::binary(
                    BinOp::Or,
                    Expr::bool(true),
                    Expr::name("loud").call(vec![]),
                ),
                vec![print(Expr::string("O"))],
                None,
            ),
        ]),
    ]);
    assert_eq!(out, "O");
}

#[test]
fn negative_literals_reach_the_signed_minimum() {
    let out = run(vec![main(vec![
        Stmt::let_typed("low", "i8", Expr::unary(UnOp::Neg, Expr::int(128))),
        show(Expr::name("low")),
        print(Expr::string(" ")),
        Stmt::let_typed("wide", "i64", Expr::unary(UnOp::Neg, Expr::int(1 << 63))),
        show(Expr::name("wide")),
    ])]);
    assert_eq!(out, "-128 -9223372036854775808");
}

#[test]
fn loop_bodies_may_shadow_the_loop_variable() {
    let digits = FnDecl::new("digits").returns("Generator<i32>").body(vec![
        Stmt::yield_(Some(Expr::int(1))),
        Stmt::yield_(Some(Expr::int(2))),
    ]);
    let out = run(vec![
        Item::Function(digits),
        main(vec![Stmt::for_(
            "d",
            Expr::name("digits").call(vec![]),
            vec![
                Stmt::let_("d", Expr::binary(BinOp::Mul, Expr::name("d"), Expr::int(10))),
                show(Expr::name("d")),
            ],
        )]),
    ]);
    assert_eq!(out, "1020");
}
