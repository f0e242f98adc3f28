//! The cooperative routine scheduler.

use std::rc::Rc;

use strand_ir::{ContainerId, Program, ReturnStatus, Storage};
use tracing::{debug, trace};

use crate::error::RuntimeFault;
use crate::frame::Frame;
use crate::host::HostContext;
use crate::interpreter::Interpreter;
use crate::task::Task;
use crate::value::{TaskRef, Value};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VmOptions {
    /// Routine that must exist for [`Vm::start`] to succeed.
    pub entry_routine: String,
    /// Upper bound on scheduling rounds; `None` runs until every routine finishes.
    pub max_rounds: Option<u64>,
    /// Also write printed text to the process stdout.
    pub echo_output: bool,
}

impl Default for VmOptions {
    fn default() -> Self {
        Self {
            entry_routine: "main".to_string(),
            max_rounds: None,
            echo_output: false,
        }
    }
}

/// Summary of one scheduling round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundReport {
    /// 1-based round number.
    pub round: u64,
    /// Routines driven this round.
    pub driven: usize,
    /// Routines that finished this round.
    pub finished: usize,
    /// Routines still unfinished after the round.
    pub remaining: usize,
}

impl RoundReport {
    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }
}

struct Routine {
    name: String,
    frame: Frame,
    finished: bool,
}

pub struct Vm {
    interp: Interpreter,
    options: VmOptions,
    routines: Vec<Routine>,
    initialized: bool,
    started: bool,
    rounds: u64,
}

impl Vm {
    pub fn new(program: Rc<Program>, options: VmOptions) -> Self {
        let mut interp = Interpreter::new(program);
        interp.set_echo_output(options.echo_output);
        Self {
            interp,
            options,
            routines: Vec::new(),
            initialized: false,
            started: false,
            rounds: 0,
        }
    }

    pub fn program(&self) -> &Program {
        self.interp.program()
    }

    pub fn options(&self) -> &VmOptions {
        &self.options
    }

    pub fn interpreter(&mut self) -> &mut Interpreter {
        &mut self.interp
    }

    /// Registers the host callable backing the extern whose full name is `name`.
    pub fn register_host_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut HostContext<'_>, &mut Option<Value>, &[Value]) -> Result<ReturnStatus, RuntimeFault>
            + 'static,
    {
        self.interp.host_mut().register(name, f);
    }

    pub fn output(&self) -> &str {
        self.interp.output()
    }

    pub fn take_output(&mut self) -> String {
        self.interp.take_output()
    }

    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    pub fn is_finished(&self) -> bool {
        self.started && self.routines.iter().all(|r| r.finished)
    }

    /// Current value of the global with the given full name.
    pub fn global(&self, name: &str) -> Option<Value> {
        let program = self.interp.program();
        program.globals.iter().find_map(|sym| {
            let symbol = program.symbol(*sym)?;
            match symbol.storage {
                Storage::Global(slot) if symbol.full_name == name => {
                    self.interp.global(slot).cloned()
                }
                _ => None,
            }
        })
    }

    /// Runs the global initializer once.
    fn initialize(&mut self) -> Result<(), RuntimeFault> {
        if self.initialized {
            return Ok(());
        }
        self.initialized = true;
        let Some(init) = self.interp.program().initializer else {
            return Ok(());
        };
        let mut frame = Frame::new(self.interp.program(), init, Vec::new())?;
        self.interp.set_routine("$globals");
        let outcome = self.interp.drive(&mut frame)?;
        if outcome.status.is_suspended() {
            return Err(RuntimeFault::InitializerBlocked);
        }
        debug!(target: "strand::vm", "globals initialized");
        Ok(())
    }

    /// Initializes globals and schedules every routine in declaration order.
    pub fn start(&mut self) -> Result<(), RuntimeFault> {
        if self.started {
            return Ok(());
        }
        self.initialize()?;
        let program = Rc::clone(self.interp.program());
        let entry = self.options.entry_routine.as_str();
        let has_entry = program
            .routine_names()
            .any(|(_, name)| name == entry || short_name(name) == entry);
        if !has_entry {
            return Err(RuntimeFault::NoEntryRoutine {
                name: entry.to_string(),
            });
        }
        for (id, name) in program.routine_names() {
            self.routines.push(Routine {
                name: name.to_string(),
                frame: Frame::new(&program, id, Vec::new())?,
                finished: false,
            });
        }
        self.started = true;
        debug!(target: "strand::vm", routines = self.routines.len(), "scheduler started");
        Ok(())
    }

    /// Drives every unfinished routine once, in declaration order.
    pub fn step_round(&mut self) -> Result<RoundReport, RuntimeFault> {
        self.start()?;
        if let Some(max) = self.options.max_rounds {
            if self.rounds >= max {
                return Err(RuntimeFault::RoundLimitExceeded { rounds: max });
            }
        }
        self.rounds += 1;
        let mut driven = 0;
        let mut finished = 0;
        for routine in self.routines.iter_mut().filter(|r| !r.finished) {
            driven += 1;
            self.interp.set_routine(&routine.name);
            let outcome = self.interp.drive(&mut routine.frame)?;
            match outcome.status {
                ReturnStatus::Finished | ReturnStatus::YieldFinished => {
                    routine.finished = true;
                    finished += 1;
                    debug!(target: "strand::vm", routine = %routine.name, round = self.rounds, "routine finished");
                }
                status => {
                    trace!(
                        target: "strand::vm",
                        routine = %routine.name,
                        status = status.name(),
                        "routine suspended"
                    );
                }
            }
        }
        let remaining = self.routines.iter().filter(|r| !r.finished).count();
        Ok(RoundReport {
            round: self.rounds,
            driven,
            finished,
            remaining,
        })
    }

    /// Drives rounds until every routine has finished.
    pub fn run(&mut self) -> Result<(), RuntimeFault> {
        self.start()?;
        while !self.is_finished() {
            self.step_round()?;
        }
        debug!(target: "strand::vm", rounds = self.rounds, "all routines finished");
        Ok(())
    }

    /// Runs one function to completion outside the scheduler, re-driving it while it blocks.
    ///
    /// Generator functions are not run; their handle is returned instead.
    pub fn call_function(&mut self, name: &str, args: Vec<Value>) -> Result<Option<Value>, RuntimeFault> {
        self.initialize()?;
        let program = Rc::clone(self.interp.program());
        let id = find_function(&program, name).ok_or_else(|| RuntimeFault::UnknownRoutine {
            name: name.to_string(),
        })?;
        let mut frame = Frame::new(&program, id, args)?;
        if program.container(id).is_some_and(|c| c.is_generator) {
            return Ok(Some(Value::Task(TaskRef::new(Task::generator(frame)))));
        }
        self.interp.set_routine(name);
        let mut drives = 0u64;
        loop {
            let outcome = self.interp.drive(&mut frame)?;
            if !outcome.status.is_suspended() {
                return Ok(outcome.value);
            }
            drives += 1;
            if let Some(max) = self.options.max_rounds {
                if drives >= max {
                    return Err(RuntimeFault::RoundLimitExceeded { rounds: max });
                }
            }
        }
    }
}

fn short_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

fn find_function(program: &Program, name: &str) -> Option<ContainerId> {
    program.container_id(name).or_else(|| {
        program
            .containers
            .iter()
            .position(|c| c.name == name && !c.is_extern())
            .map(|index| ContainerId(index as u32))
    })
}
