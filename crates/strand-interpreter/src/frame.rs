use strand_ir::{ContainerId, Program, ReturnStatus, Storage, SymbolId};

use crate::error::RuntimeFault;
use crate::value::{FunctionValue, Value};

/// One activation of a code container.
///
/// A frame that returned `Blocked` or `YieldNotFinished` keeps its program counter and locals;
/// driving it again continues after the suspending instruction.
#[derive(Clone)]
pub struct Frame {
    pub(crate) container: ContainerId,
    pub(crate) pc: usize,
    locals: Vec<Option<Value>>,
    /// A synchronous callee that suspended; re-driven before the call completes.
    pub(crate) pending: Option<Box<Frame>>,
    pub(crate) finished: bool,
}

/// How one drive of a frame ended.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameOutcome {
    pub status: ReturnStatus,
    pub value: Option<Value>,
}

impl FrameOutcome {
    pub(crate) fn blocked() -> Self {
        Self {
            status: ReturnStatus::Blocked,
            value: None,
        }
    }
}

impl Frame {
    /// A fresh frame for `container` with its parameters bound to `args`.
    pub fn new(
        program: &Program,
        container: ContainerId,
        args: Vec<Value>,
    ) -> Result<Self, RuntimeFault> {
        Self::for_function(program, &FunctionValue::plain(container), args)
    }

    pub(crate) fn for_function(
        program: &Program,
        function: &FunctionValue,
        mut args: Vec<Value>,
    ) -> Result<Self, RuntimeFault> {
        let code = program
            .container(function.container)
            .ok_or_else(|| RuntimeFault::UnknownRoutine {
                name: format!("#{}", function.container.0),
            })?;
        if let Some(receiver) = &function.receiver {
            args.insert(0, (**receiver).clone());
        }
        if args.len() != code.params.len() || function.captures.len() != code.captures.len() {
            return Err(RuntimeFault::TypeMismatch {
                op: "call",
                expected: "the callee's parameter list",
                found: format!(
                    "{} argument(s) and {} capture(s) for `{}`",
                    args.len(),
                    function.captures.len(),
                    code.name
                ),
            });
        }

        let mut frame = Frame {
            container: function.container,
            pc: 0,
            locals: vec![None; code.locals.len()],
            pending: None,
            finished: false,
        };
        for (param, value) in code.params.iter().zip(args) {
            frame.bind(program, *param, value)?;
        }
        for (capture, value) in code.captures.iter().zip(function.captures.iter()) {
            frame.bind(program, *capture, value.clone())?;
        }
        Ok(frame)
    }

    fn bind(&mut self, program: &Program, symbol: SymbolId, value: Value) -> Result<(), RuntimeFault> {
        match program.symbol(symbol).map(|s| s.storage) {
            Some(Storage::Local(slot)) => self.write_local(slot, value),
            _ => Err(RuntimeFault::UnboundSymbol {
                name: program.symbol_name(symbol).to_string(),
            }),
        }
    }

    pub fn container(&self) -> ContainerId {
        self.container
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn read_local(&self, slot: u32) -> Option<Value> {
        self.locals.get(slot as usize).cloned().flatten()
    }

    pub(crate) fn write_local(&mut self, slot: u32, value: Value) -> Result<(), RuntimeFault> {
        let Some(local) = self.locals.get_mut(slot as usize) else {
            return Err(RuntimeFault::UnboundSymbol {
                name: format!("local slot {slot}"),
            });
        };
        *local = Some(value);
        Ok(())
    }
}
