mod common;

use common::{install_recorder, main, print, ret, routine, run, show, vm};
use strand::ast::{BinOp, EventDecl, Expr, FnDecl, Item, Stmt};

fn increment(name: &str) -> Stmt {
    Stmt::assign(
        Expr::name(name),
        Expr::binary(BinOp::Add, Expr::name(name), Expr::int(1)),
    )
}

fn repeat(times: u64, body: Vec<Stmt>) -> Vec<Stmt> {
    let mut looped = body;
    looped.push(increment("n"));
    vec![
        Stmt::var("n", Expr::int(0)),
        Stmt::while_(
            Expr::binary(BinOp::Lt, Expr::name("n"), Expr::int(times)),
            looped,
        ),
    ]
}

#[test]
fn routines_interleave_at_wait_points() {
    let out = run(vec![
        main(repeat(2, vec![print(Expr::string("a")), Stmt::wait(None)])),
        routine(
            "other",
            repeat(2, vec![print(Expr::string("b")), Stmt::wait(None)]),
        ),
    ]);
    assert_eq!(out, "abab");
}

#[test]
fn events_hand_values_from_producer_to_consumer() {
    let out = run(vec![
        Item::Event(EventDecl::new("tick", Some("i32"))),
        routine(
            "consumer",
            repeat(3, vec![show(Expr::wait(Expr::name("tick")))]),
        ),
        routine(
            "main",
            repeat(
                3,
                vec![
                    Stmt::emit(
                        Expr::name("tick"),
                        Some(Expr::binary(BinOp::Add, Expr::name("n"), Expr::int(1))),
                    ),
                    Stmt::wait(None),
                ],
            ),
        ),
    ]);
    assert_eq!(out, "123");
}

#[test]
fn emitting_without_listeners_is_not_buffered() {
    let out = run(vec![
        Item::Event(EventDecl::new("ready", None)),
        main(vec![
            Stmt::emit(Expr::name("ready"), None),
            print(Expr::string("sent ")),
            Stmt::wait(None),
            Stmt::emit(Expr::name("ready"), None),
        ]),
        routine(
            "listener",
            vec![
                Stmt::wait(Some(Expr::name("ready"))),
                print(Expr::string("heard")),
            ],
        ),
    ]);
    assert_eq!(out, "sent heard");
}

#[test]
fn futures_run_only_while_awaited() {
    let slow = FnDecl::new("slow")
        .asynchronous()
        .param("count", "i32")
        .returns("i32")
        .body(vec![
            Stmt::var("n", Expr::int(0)),
            Stmt::while_(
                Expr::binary(BinOp::Lt, Expr::name("n"), Expr::name("count")),
                vec![Stmt::wait(None), increment("n")],
            ),
            ret(Expr::binary(BinOp::Mul, Expr::name("count"), Expr::int(10))),
        ]);
    let mut vm = vm(vec![
        Item::Function(slow),
        main(vec![
            Stmt::let_("a", Expr::asynchronous(Expr::name("slow").call(vec![Expr::int(2)]))),
            Stmt::let_("b", Expr::asynchronous(Expr::name("slow").call(vec![Expr::int(1)]))),
            show(Expr::wait(Expr::name("a"))),
            show(Expr::wait(Expr::name("b"))),
        ]),
    ]);
    vm.run().expect("run");
    assert_eq!(vm.output(), "2010");
    assert_eq!(vm.rounds(), 4);
}

#[test]
fn generators_suspend_between_items_while_other_routines_run() {
    let words = FnDecl::new("words").returns("Generator<string>").body(vec![
        Stmt::yield_(Some(Expr::string("a"))),
        Stmt::yield_(Some(Expr::string("b"))),
    ]);
    let record = |text: Expr| Stmt::expr(Expr::name("record").call(vec![text]));
    let mut vm = vm(vec![
        Item::Function(FnDecl::new("record").external().param("text", "string")),
        Item::Function(words),
        main(vec![Stmt::for_(
            "w",
            Expr::name("words").call(vec![]),
            vec![record(Expr::name("w")), Stmt::wait(None)],
        )]),
        routine("other", vec![record(Expr::string("x"))]),
    ]);
    let log = install_recorder(&mut vm, "record");
    vm.run().expect("run");
    assert_eq!(*log.borrow(), ["main:a", "other:x", "main:b"]);
}

#[test]
fn generator_handles_can_be_pulled_manually() {
    let evens = FnDecl::new("evens").returns("Generator<i32>").body(vec![
        Stmt::yield_(Some(Expr::int(0))),
        Stmt::yield_(Some(Expr::int(2))),
    ]);
    let out = run(vec![
        Item::Function(evens),
        main(vec![
            Stmt::let_("g", Expr::name("evens").call(vec![])),
            Stmt::let_("first", Expr::name("g").method("next", vec![])),
            Stmt::let_("second", Expr::name("g").method("next", vec![])),
            Stmt::let_("third", Expr::name("g").method("next", vec![])),
            show(Expr::name("first").member("some")),
            show(Expr::name("second").member("some")),
            Stmt::if_(
                Expr::name("third").is("none"),
                vec![print(Expr::string(" end"))],
                None,
            ),
        ]),
    ]);
    assert_eq!(out, "02 end");
}

#[test]
fn scheduling_is_deterministic_across_runs() {
    let program = || {
        vec![
            Item::Event(EventDecl::new("ping", Some("i32"))),
            main(repeat(
                3,
                vec![
                    Stmt::emit(Expr::name("ping"), Some(Expr::name("n"))),
                    print(Expr::string("m")),
                    Stmt::wait(None),
                ],
            )),
            routine("echo", repeat(2, vec![show(Expr::wait(Expr::name("ping")))])),
            routine(
                "ticker",
                repeat(2, vec![print(Expr::string("t")), Stmt::wait(None)]),
            ),
        ]
    };
    let first = run(program());
    let second = run(program());
    assert!(!first.is_empty());
    assert_eq!(first, second);
}
