//! Type resolution, generic specialization, dispatch-table construction and lowering of the
//! Strand syntax tree into the frozen [`strand_ir::Program`].

pub mod ast;
pub mod diagnostics;
mod driver;
mod lower;
mod model;
pub mod options;
mod prelude;

pub use diagnostics::{
    CompileError, Diagnostic, DiagnosticBag, DiagnosticSink, Severity, TracingSink,
};
pub use driver::{compile_to_ir, compile_to_ir_with_options};
pub use options::CompileOptions;
