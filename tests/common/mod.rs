#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use strand::ast::{Expr, Item, Program, RoutineDecl, Stmt};
use strand::ir::ReturnStatus;
use strand::{compile_and_run, compile_to_ir, register_core_host_fns, Value, Vm, VmOptions};

/// Compiles and runs `items`, panicking on any error.
pub fn run(items: Vec<Item>) -> String {
    match compile_and_run(&Program::new(items)) {
        Ok(output) => output,
        Err(err) => panic!("program failed: {err}"),
    }
}

/// A VM over `items` with the core library installed, not yet started.
pub fn vm(items: Vec<Item>) -> Vm {
    let program = compile_to_ir(&Program::new(items)).expect("compile");
    let mut vm = Vm::new(Rc::new(program), VmOptions::default());
    register_core_host_fns(&mut vm);
    vm
}

pub fn routine(name: &str, body: Vec<Stmt>) -> Item {
    Item::Routine(RoutineDecl::new(name, body))
}

pub fn main(body: Vec<Stmt>) -> Item {
    routine("main", body)
}

pub fn print(text: Expr) -> Stmt {
    Stmt::expr(Expr::name("print").call(vec![text]))
}

/// `print(value as string)`.
pub fn show(value: Expr) -> Stmt {
    print(value.cast("string"))
}

pub fn ret(value: Expr) -> Stmt {
    Stmt::ret(Some(value))
}

/// Installs a host function under `name` that records every string argument, tagged with the
/// calling routine.
pub fn install_recorder(vm: &mut Vm, name: &str) -> Rc<RefCell<Vec<String>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    vm.register_host_fn(name, move |ctx, _result, args| {
        let text = match args {
            [Value::Str(text)] => text.to_string(),
            other => format!("{other:?}"),
        };
        sink.borrow_mut().push(format!("{}:{text}", ctx.routine()));
        Ok(ReturnStatus::Finished)
    });
    log
}
