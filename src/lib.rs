#![forbid(unsafe_code)]

//! Strand: type model, IR lowering and a cooperative virtual machine for a small statically
//! typed language with routines, generators, futures and events.

use std::rc::Rc;

use thiserror::Error;
use tracing::debug;

/// `tracing` subscriber configuration.
pub mod logging;

pub use strand_compiler as compiler;
pub use strand_interpreter as interpreter;
pub use strand_ir as ir;

pub use strand_compiler::{ast, compile_to_ir, CompileError, CompileOptions};
pub use strand_interpreter::{register_core_host_fns, RuntimeFault, Value, Vm, VmOptions};

/// Failure of [`compile_and_run`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),
    #[error("runtime fault: {0}")]
    Runtime(#[from] RuntimeFault),
}

/// Compiles `program` with default options, installs the core host library and runs every
/// routine to completion. Returns the printed output.
pub fn compile_and_run(program: &ast::Program) -> Result<String, Error> {
    let ir = compile_to_ir(program)?;
    let mut vm = Vm::new(Rc::new(ir), VmOptions::default());
    register_core_host_fns(&mut vm);
    vm.run()?;
    debug!(target: "strand", rounds = vm.rounds(), "program finished");
    Ok(vm.take_output())
}
