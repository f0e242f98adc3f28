mod common;

use common::{main, show};
use strand::ast::{BinOp, ClassDecl, Expr, FnDecl, Item, Program, Stmt};
use strand::{compile_and_run, Error, RuntimeFault};

fn outcome(items: Vec<Item>) -> Result<String, Error> {
    compile_and_run(&Program::new(items))
}

#[test]
fn compile_errors_stop_before_anything_runs() {
    let err = outcome(vec![main(vec![
        show(Expr::string("never")),
        Stmt::break_().at(2, 5),
    ])])
    .unwrap_err();
    let Error::Compile(inner) = &err else {
        panic!("expected a compile error, got {err:?}");
    };
    assert_eq!(inner.location.line, 2);
    assert_eq!(err.to_string(), "compile error: 2:5: `break` outside of a loop");
}

#[test]
fn runtime_faults_are_reported_with_their_cause() {
    let err = outcome(vec![main(vec![
        Stmt::var("d", Expr::int(0)),
        show(Expr::binary(BinOp::Rem, Expr::int(10), Expr::name("d"))),
    ])])
    .unwrap_err();
    assert_eq!(err, Error::Runtime(RuntimeFault::DivisionByZero));
    assert_eq!(err.to_string(), "runtime fault: division by zero");
}

#[test]
fn failed_downcast_is_a_fault() {
    let err = outcome(vec![
        Item::Interface(strand::ast::InterfaceDecl::new("Token")),
        Item::Class(ClassDecl::new("A").implements("Token", vec![])),
        Item::Class(ClassDecl::new("B").implements("Token", vec![])),
        main(vec![
            Stmt::let_typed("t", "Token", Expr::new_object("A", vec![])),
            Stmt::let_("b", Expr::name("t").cast("B")),
        ]),
    ])
    .unwrap_err();
    assert!(
        matches!(err, Error::Runtime(RuntimeFault::InvalidCast { .. })),
        "{err:?}"
    );
}

#[test]
fn a_program_needs_a_main_routine() {
    let err = outcome(vec![Item::Function(FnDecl::new("helper").body(vec![]))]).unwrap_err();
    assert_eq!(
        err,
        Error::Runtime(RuntimeFault::NoEntryRoutine {
            name: "main".to_string()
        })
    );
}
