#![forbid(unsafe_code)]

//! Executes frozen Strand programs: a frame interpreter plus a cooperative scheduler for
//! routines, futures, generators and events.

/// Runtime faults.
pub mod error;

/// Activation records.
pub mod frame;

/// Host callables backing `extern` functions.
pub mod host;

/// Frame execution.
pub mod interpreter;

/// Core-library host functions.
pub mod corelib;

mod ops;
pub mod task;
pub mod value;
pub mod vm;

pub use corelib::register_core_host_fns;
pub use error::RuntimeFault;
pub use frame::{Frame, FrameOutcome};
pub use host::{HostContext, HostFn, HostRegistry};
pub use interpreter::Interpreter;
pub use value::{EnumRef, EventRef, FunctionValue, InterfaceValue, ObjectRef, TaskRef, Value};
pub use vm::{RoundReport, Vm, VmOptions};
