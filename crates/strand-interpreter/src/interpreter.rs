//! Executes lowered code containers one frame at a time.

use std::mem;
use std::rc::Rc;

use strand_ir::{
    CallMode, Callee, CastKind, CodeContainer, FieldRef, Intrinsic, Label, Op, Primitive, Program,
    ReturnStatus, SlotReceiver, Storage, SymbolId, TypeId, TypeKind, OPTION_NONE_TAG,
    OPTION_SOME_TAG,
};
use tracing::trace;

use crate::error::RuntimeFault;
use crate::frame::{Frame, FrameOutcome};
use crate::host::{HostContext, HostRegistry};
use crate::ops;
use crate::task::{GeneratorStep, Task, TaskKind, TaskState};
use crate::value::{EnumRef, EventRef, FunctionValue, InterfaceValue, ObjectRef, TaskRef, Value};

/// Program-wide execution state shared by every frame: globals, host callables and the output
/// buffer.
pub struct Interpreter {
    program: Rc<Program>,
    globals: Vec<Option<Value>>,
    pub(crate) host: HostRegistry,
    output: String,
    echo_output: bool,
    routine: String,
}

enum Step {
    Next,
    Goto(usize),
    Exit(FrameOutcome),
}

impl Interpreter {
    pub fn new(program: Rc<Program>) -> Self {
        let globals = vec![None; program.globals.len()];
        Self {
            program,
            globals,
            host: HostRegistry::new(),
            output: String::new(),
            echo_output: false,
            routine: String::new(),
        }
    }

    pub fn program(&self) -> &Rc<Program> {
        &self.program
    }

    pub fn host(&self) -> &HostRegistry {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut HostRegistry {
        &mut self.host
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn take_output(&mut self) -> String {
        mem::take(&mut self.output)
    }

    pub(crate) fn set_echo_output(&mut self, echo: bool) {
        self.echo_output = echo;
    }

    pub(crate) fn set_routine(&mut self, name: &str) {
        self.routine.clear();
        self.routine.push_str(name);
    }

    pub fn global(&self, slot: u32) -> Option<&Value> {
        self.globals.get(slot as usize).and_then(Option::as_ref)
    }

    /// Runs `frame` until it returns or suspends.
    pub fn drive(&mut self, frame: &mut Frame) -> Result<FrameOutcome, RuntimeFault> {
        let program = Rc::clone(&self.program);
        let code = program
            .container(frame.container)
            .ok_or_else(|| RuntimeFault::UnknownRoutine {
                name: format!("#{}", frame.container.0),
            })?;
        if frame.finished {
            return Ok(FrameOutcome {
                status: ReturnStatus::Finished,
                value: None,
            });
        }
        loop {
            let Some(inst) = code.instructions.get(frame.pc) else {
                frame.finished = true;
                return self.finish(code, None, ReturnStatus::Finished);
            };
            match self.step(frame, code, &inst.op)? {
                Step::Next => frame.pc += 1,
                Step::Goto(pc) => frame.pc = pc,
                Step::Exit(outcome) => return Ok(outcome),
            }
        }
    }

    fn step(&mut self, frame: &mut Frame, code: &CodeContainer, op: &Op) -> Result<Step, RuntimeFault> {
        match op {
            Op::Assign { dst, src } => {
                let value = self.read(frame, *src)?;
                self.write(frame, *dst, value)?;
            }
            Op::Literal { dst, value } => {
                let value = ops::literal(value, self.primitive_of(*dst));
                self.write(frame, *dst, value)?;
            }
            Op::Binary {
                dst,
                op,
                lhs,
                rhs,
                operand,
            } => {
                let lhs = self.read(frame, *lhs)?;
                let rhs = self.read(frame, *rhs)?;
                let value = ops::binary(*op, *operand, &lhs, &rhs)?;
                self.write(frame, *dst, value)?;
            }
            Op::Unary {
                dst,
                op,
                src,
                operand,
            } => {
                let value = self.read(frame, *src)?;
                let value = ops::unary(*op, *operand, &value)?;
                self.write(frame, *dst, value)?;
            }
            Op::MemberRead { dst, object, field } => {
                let object = self.read_object(frame, *object, "member read")?;
                let value = object
                    .field(field.index as usize)
                    .ok_or_else(|| self.uninitialized_field(&object, *field))?;
                self.write(frame, *dst, value)?;
            }
            Op::MemberWrite { object, field, src } => {
                let object = self.read_object(frame, *object, "member write")?;
                let value = self.read(frame, *src)?;
                if !object.set_field(field.index as usize, value) {
                    return Err(self.uninitialized_field(&object, *field));
                }
            }
            Op::EnumTagRead { dst, value } => {
                let cell = self.read_enum(frame, *value, "tag read")?;
                let tag = cell.tag();
                self.write(frame, *dst, Value::Int(tag))?;
            }
            Op::EnumTagWrite { value, tag } => {
                let cell = self.read_enum(frame, *value, "tag write")?;
                let mut cell = cell.0.borrow_mut();
                cell.tag = *tag;
                cell.payload = None;
            }
            Op::EnumPayloadRead { dst, value, tag } => {
                let cell = self.read_enum(frame, *value, "payload read")?;
                let payload = {
                    let cell = cell.0.borrow();
                    if cell.tag == *tag {
                        cell.payload.clone()
                    } else {
                        None
                    }
                };
                let payload = payload.ok_or_else(|| self.inactive(&cell, *tag))?;
                self.write(frame, *dst, payload)?;
            }
            Op::EnumPayloadWrite { value, tag, src } => {
                let cell = self.read_enum(frame, *value, "payload write")?;
                let payload = self.read(frame, *src)?;
                if cell.tag() != *tag {
                    return Err(self.inactive(&cell, *tag));
                }
                cell.0.borrow_mut().payload = Some(payload);
            }
            Op::Cast { dst, src, kind } => {
                let value = self.read(frame, *src)?;
                let value = self.cast(value, *kind)?;
                self.write(frame, *dst, value)?;
            }
            Op::Call {
                dst,
                callee,
                args,
                mode,
            } => {
                if let Some(outcome) = self.call(frame, *dst, callee, args, *mode)? {
                    return Ok(Step::Exit(outcome));
                }
            }
            Op::Jump { target } => return Ok(Step::Goto(self.label(code, target)?)),
            Op::Branch { cond, when, target } => {
                let cond = match self.read(frame, *cond)? {
                    Value::Bool(b) => b,
                    other => return Err(RuntimeFault::mismatch("branch", "a bool", &other)),
                };
                if cond == *when {
                    return Ok(Step::Goto(self.label(code, target)?));
                }
            }
            Op::Return { value, status } => {
                let value = match value {
                    Some(sym) => Some(self.read(frame, *sym)?),
                    None => None,
                };
                if status.is_suspended() {
                    frame.pc += 1;
                } else {
                    frame.finished = true;
                }
                return self.finish(code, value, *status).map(Step::Exit);
            }
            Op::New { dst, ty } => {
                let value = self.allocate(*ty)?;
                self.write(frame, *dst, value)?;
            }
        }
        Ok(Step::Next)
    }

    fn finish(
        &self,
        code: &CodeContainer,
        value: Option<Value>,
        status: ReturnStatus,
    ) -> Result<FrameOutcome, RuntimeFault> {
        let needs_value = status == ReturnStatus::Finished
            && !code.is_generator
            && self.primitive_of_type(code.ret) != Some(Primitive::Void);
        if needs_value && value.is_none() {
            return Err(RuntimeFault::MissingReturnValue {
                function: code.name.clone(),
            });
        }
        Ok(FrameOutcome { status, value })
    }

    fn label(&self, code: &CodeContainer, label: &Label) -> Result<usize, RuntimeFault> {
        code.label_target(label)
            .ok_or_else(|| RuntimeFault::MissingLabel {
                container: code.name.clone(),
                label: label.0.clone(),
            })
    }

    fn read(&self, frame: &Frame, sym: SymbolId) -> Result<Value, RuntimeFault> {
        let symbol = self
            .program
            .symbol(sym)
            .ok_or_else(|| self.unbound(sym))?;
        let value = match symbol.storage {
            Storage::Local(slot) => frame.read_local(slot),
            Storage::Global(slot) => self.globals.get(slot as usize).cloned().flatten(),
            Storage::Code(cid) => Some(Value::Function(FunctionValue::plain(cid))),
            Storage::Field(_) | Storage::Variant(_) | Storage::Type(_) => None,
        };
        value.ok_or_else(|| self.unbound(sym))
    }

    fn write(&mut self, frame: &mut Frame, sym: SymbolId, value: Value) -> Result<(), RuntimeFault> {
        let storage = self.program.symbol(sym).map(|s| s.storage);
        match storage {
            Some(Storage::Local(slot)) => frame.write_local(slot, value),
            Some(Storage::Global(slot)) => match self.globals.get_mut(slot as usize) {
                Some(global) => {
                    *global = Some(value);
                    Ok(())
                }
                None => Err(self.unbound(sym)),
            },
            _ => Err(self.unbound(sym)),
        }
    }

    fn unbound(&self, sym: SymbolId) -> RuntimeFault {
        let name = self
            .program
            .symbol(sym)
            .map_or_else(|| format!("symbol #{}", sym.0), |s| s.origin_name.clone());
        RuntimeFault::UnboundSymbol { name }
    }

    fn read_object(&self, frame: &Frame, sym: SymbolId, op: &'static str) -> Result<ObjectRef, RuntimeFault> {
        match self.read(frame, sym)? {
            Value::Object(object) => Ok(object),
            Value::Interface(iface) => Ok(iface.object),
            other => Err(RuntimeFault::mismatch(op, "an object", &other)),
        }
    }

    fn read_enum(&self, frame: &Frame, sym: SymbolId, op: &'static str) -> Result<EnumRef, RuntimeFault> {
        match self.read(frame, sym)? {
            Value::Enum(cell) => Ok(cell),
            other => Err(RuntimeFault::mismatch(op, "an enum", &other)),
        }
    }

    fn primitive_of_type(&self, ty: TypeId) -> Option<Primitive> {
        self.program.type_def(ty).and_then(|def| def.primitive())
    }

    fn primitive_of(&self, sym: SymbolId) -> Option<Primitive> {
        let ty = self.program.symbol(sym)?.ty;
        self.primitive_of_type(ty)
    }

    fn uninitialized_field(&self, object: &ObjectRef, field: FieldRef) -> RuntimeFault {
        let class = object.class();
        let name = match self.program.type_def(class).map(|d| &d.kind) {
            Some(TypeKind::Class(info)) => info
                .fields
                .get(field.index as usize)
                .map(|f| f.name.clone()),
            _ => None,
        };
        RuntimeFault::UninitializedField {
            class: self.program.type_name(class).to_string(),
            field: name.unwrap_or_else(|| format!("#{}", field.index)),
        }
    }

    fn inactive(&self, cell: &EnumRef, tag: i64) -> RuntimeFault {
        RuntimeFault::InactivePayload {
            ty: self.program.type_name(cell.ty()).to_string(),
            tag,
        }
    }

    fn allocate(&self, ty: TypeId) -> Result<Value, RuntimeFault> {
        let def = self.program.type_def(ty).ok_or_else(|| RuntimeFault::TypeMismatch {
            op: "new",
            expected: "a declared type",
            found: format!("type #{}", ty.0),
        })?;
        match &def.kind {
            TypeKind::Class(info) => {
                let fields = info
                    .fields
                    .iter()
                    .map(|field| self.primitive_of_type(field.ty).and_then(Value::zero))
                    .collect();
                Ok(Value::Object(ObjectRef::new(ty, fields)))
            }
            TypeKind::Enum(info) => {
                let tag = info.variants.first().map_or(0, |v| v.tag);
                Ok(Value::Enum(EnumRef::new(ty, tag, None)))
            }
            TypeKind::Event(_) => Ok(Value::Event(EventRef::default())),
            _ => Err(RuntimeFault::TypeMismatch {
                op: "new",
                expected: "a class, enum or event type",
                found: def.name.clone(),
            }),
        }
    }

    fn cast(&self, value: Value, kind: CastKind) -> Result<Value, RuntimeFault> {
        let invalid = |value: &Value, to: TypeId| RuntimeFault::InvalidCast {
            from: match value.as_object() {
                Some(object) => self.program.type_name(object.class()).to_string(),
                None => value.kind_name().to_string(),
            },
            to: self.program.type_name(to).to_string(),
        };
        match kind {
            CastKind::Numeric { to, .. } => ops::convert(&value, to),
            CastKind::ToString { .. } => Ok(Value::str(ops::to_text(&value)?)),
            CastKind::Upcast { vtable } => match value {
                Value::Object(object) => Ok(Value::Interface(InterfaceValue { object, vtable })),
                Value::Interface(iface) => Ok(Value::Interface(InterfaceValue {
                    object: iface.object,
                    vtable,
                })),
                other => Err(RuntimeFault::mismatch("upcast", "an object", &other)),
            },
            CastKind::Reinterface { target } => {
                let object = value
                    .as_object()
                    .cloned()
                    .ok_or_else(|| RuntimeFault::mismatch("cast", "an interface value", &value))?;
                let vtable = self
                    .program
                    .vtable_for(object.class(), target)
                    .ok_or_else(|| invalid(&value, target))?;
                Ok(Value::Interface(InterfaceValue { object, vtable }))
            }
            CastKind::Downcast { class } => match value.as_object() {
                Some(object) if object.class() == class => Ok(Value::Object(object.clone())),
                _ => Err(invalid(&value, class)),
            },
            CastKind::Test { target } => {
                let matches = value.as_object().is_some_and(|object| {
                    object.class() == target
                        || self.program.vtable_for(object.class(), target).is_some()
                });
                Ok(Value::Bool(matches))
            }
        }
    }

    /// Executes a call instruction. `Some` means the frame suspends with the pc left on the
    /// call, which is then re-executed (or its pending callee re-driven) on the next drive.
    fn call(
        &mut self,
        frame: &mut Frame,
        dst: Option<SymbolId>,
        callee: &Callee,
        args: &[SymbolId],
        mode: CallMode,
    ) -> Result<Option<FrameOutcome>, RuntimeFault> {
        if let Some(child) = frame.pending.as_mut() {
            let outcome = self.drive(child)?;
            if outcome.status.is_suspended() {
                return Ok(Some(FrameOutcome::blocked()));
            }
            frame.pending = None;
            self.complete(frame, dst, outcome.value)?;
            return Ok(None);
        }

        let values = args
            .iter()
            .map(|arg| self.read(frame, *arg))
            .collect::<Result<Vec<_>, _>>()?;
        let (function, values) = match callee {
            Callee::Intrinsic(intrinsic) => return self.intrinsic(frame, dst, *intrinsic, values),
            Callee::Direct(cid) => (FunctionValue::plain(*cid), values),
            Callee::Virtual { slot } => self.dispatch(*slot, values)?,
            Callee::Indirect(sym) => match self.read(frame, *sym)? {
                Value::Function(function) => (function, values),
                other => return Err(RuntimeFault::mismatch("call", "a function value", &other)),
            },
        };
        self.invoke(frame, dst, function, values, mode)
    }

    fn invoke(
        &mut self,
        frame: &mut Frame,
        dst: Option<SymbolId>,
        function: FunctionValue,
        mut args: Vec<Value>,
        mode: CallMode,
    ) -> Result<Option<FrameOutcome>, RuntimeFault> {
        let program = Rc::clone(&self.program);
        let code = program
            .container(function.container)
            .ok_or_else(|| RuntimeFault::UnknownRoutine {
                name: format!("#{}", function.container.0),
            })?;

        if let Some(name) = &code.extern_name {
            if mode != CallMode::Sync {
                return Err(RuntimeFault::host(
                    name.clone(),
                    "extern functions cannot be started as futures or generators",
                ));
            }
            if let Some(receiver) = function.receiver {
                args.insert(0, *receiver);
            }
            let mut result = None;
            let status = self.call_host(name, &mut result, &args)?;
            if status.is_suspended() {
                return Ok(Some(FrameOutcome::blocked()));
            }
            if let Some(dst) = dst {
                let value = result.ok_or_else(|| RuntimeFault::MissingReturnValue {
                    function: name.clone(),
                })?;
                self.write(frame, dst, value)?;
            }
            return Ok(None);
        }

        let mut child = Frame::for_function(&program, &function, args)?;
        match mode {
            CallMode::Sync => {
                let outcome = self.drive(&mut child)?;
                if outcome.status.is_suspended() {
                    trace!(
                        target: "strand::vm",
                        callee = %code.name,
                        "callee suspended; caller blocks"
                    );
                    frame.pending = Some(Box::new(child));
                    return Ok(Some(FrameOutcome::blocked()));
                }
                self.complete(frame, dst, outcome.value)?;
            }
            CallMode::Async => {
                let task = Value::Task(TaskRef::new(Task::future(child)));
                if let Some(dst) = dst {
                    self.write(frame, dst, task)?;
                }
            }
            CallMode::Generator => {
                let task = Value::Task(TaskRef::new(Task::generator(child)));
                if let Some(dst) = dst {
                    self.write(frame, dst, task)?;
                }
            }
        }
        Ok(None)
    }

    fn complete(&mut self, frame: &mut Frame, dst: Option<SymbolId>, value: Option<Value>) -> Result<(), RuntimeFault> {
        if let Some(dst) = dst {
            let value = value.ok_or_else(|| self.unbound(dst))?;
            self.write(frame, dst, value)?;
        }
        Ok(())
    }

    /// Resolves an interface slot against the receiver in `args[0]`.
    fn dispatch(&self, slot: u32, mut args: Vec<Value>) -> Result<(FunctionValue, Vec<Value>), RuntimeFault> {
        let iface = match args.first() {
            Some(Value::Interface(iface)) => iface.clone(),
            Some(other) => return Err(RuntimeFault::mismatch("virtual call", "an interface value", other)),
            None => {
                return Err(RuntimeFault::TypeMismatch {
                    op: "virtual call",
                    expected: "a receiver",
                    found: "no arguments".to_string(),
                })
            }
        };
        let entry = self
            .program
            .vtable(iface.vtable)
            .and_then(|table| table.slots.get(slot as usize))
            .ok_or_else(|| RuntimeFault::InvalidCast {
                from: self.program.type_name(iface.object.class()).to_string(),
                to: format!("vtable #{} slot {slot}", iface.vtable.0),
            })?;
        args[0] = match entry.receiver {
            SlotReceiver::Object => Value::Object(iface.object),
            SlotReceiver::Interface(vtable) => Value::Interface(InterfaceValue {
                object: iface.object,
                vtable,
            }),
        };
        Ok((FunctionValue::plain(entry.target), args))
    }

    pub(crate) fn call_host(
        &mut self,
        name: &str,
        result: &mut Option<Value>,
        args: &[Value],
    ) -> Result<ReturnStatus, RuntimeFault> {
        let handler = self
            .host
            .get(name)
            .ok_or_else(|| RuntimeFault::MissingHostFunction {
                name: name.to_string(),
            })?;
        trace!(target: "strand::host", function = name, args = args.len(), "host call");
        let mut context = HostContext {
            routine: &self.routine,
            output: &mut self.output,
            echo: self.echo_output,
        };
        handler(&mut context, result, args)
    }

    fn intrinsic(
        &mut self,
        frame: &mut Frame,
        dst: Option<SymbolId>,
        intrinsic: Intrinsic,
        args: Vec<Value>,
    ) -> Result<Option<FrameOutcome>, RuntimeFault> {
        let value = match intrinsic {
            Intrinsic::GeneratorNext { option } => {
                let task = task_arg(&args, intrinsic)?;
                match self.generator_next(&task)? {
                    GeneratorStep::Item(value) => some(option, value),
                    GeneratorStep::Exhausted => none(option),
                    GeneratorStep::Blocked => return Ok(Some(FrameOutcome::blocked())),
                }
            }
            Intrinsic::FuturePoll { option } => {
                let task = task_arg(&args, intrinsic)?;
                if self.poll_future(&task)? {
                    some(option, future_result(&task)?)
                } else {
                    none(option)
                }
            }
            Intrinsic::FutureReady => {
                let task = task_arg(&args, intrinsic)?;
                Value::Bool(self.poll_future(&task)?)
            }
            Intrinsic::FutureResult => future_result(&task_arg(&args, intrinsic)?)?,
            Intrinsic::EventListen => {
                let event = event_arg(&args, intrinsic)?;
                let listener = TaskRef::new(Task::listener());
                event.0.borrow_mut().push(listener.clone());
                Value::Task(listener)
            }
            Intrinsic::EventEmit => {
                let event = event_arg(&args, intrinsic)?;
                let payload = args.get(1).cloned().unwrap_or(Value::Void);
                let listeners = mem::take(&mut *event.0.borrow_mut());
                trace!(target: "strand::vm", listeners = listeners.len(), "event emitted");
                for listener in listeners {
                    let mut task = listener.0.borrow_mut();
                    if matches!(task.state, TaskState::Listening) {
                        task.state = TaskState::Done(payload.clone());
                    }
                }
                Value::Void
            }
            Intrinsic::Closure(container) => Value::Function(FunctionValue {
                container,
                receiver: None,
                captures: Rc::from(args),
            }),
            Intrinsic::BindMethod(container) => {
                let receiver = args.into_iter().next().ok_or_else(|| missing_arg(intrinsic))?;
                Value::Function(FunctionValue {
                    container,
                    receiver: Some(Box::new(receiver)),
                    captures: Rc::from(Vec::new()),
                })
            }
            Intrinsic::BindVirtual { slot } => {
                let (mut function, args) = self.dispatch(slot, args)?;
                let receiver = args.into_iter().next().ok_or_else(|| missing_arg(intrinsic))?;
                function.receiver = Some(Box::new(receiver));
                Value::Function(function)
            }
        };
        if let Some(dst) = dst {
            self.write(frame, dst, value)?;
        }
        Ok(None)
    }

    /// Drives a future once unless it already holds a value. Returns whether it is ready.
    pub(crate) fn poll_future(&mut self, task: &TaskRef) -> Result<bool, RuntimeFault> {
        let state = mem::replace(&mut task.0.borrow_mut().state, TaskState::Running);
        match state {
            TaskState::Done(value) => {
                task.0.borrow_mut().state = TaskState::Done(value);
                Ok(true)
            }
            TaskState::Listening => {
                task.0.borrow_mut().state = TaskState::Listening;
                Ok(false)
            }
            TaskState::Running => Err(RuntimeFault::ReentrantTask),
            TaskState::Pending(mut frame) => {
                let outcome = self.drive(&mut frame)?;
                let mut task = task.0.borrow_mut();
                if outcome.status.is_suspended() {
                    task.state = TaskState::Pending(frame);
                    return Ok(false);
                }
                task.state = TaskState::Done(outcome.value.unwrap_or(Value::Void));
                Ok(true)
            }
        }
    }

    pub(crate) fn generator_next(&mut self, task: &TaskRef) -> Result<GeneratorStep, RuntimeFault> {
        let state = mem::replace(&mut task.0.borrow_mut().state, TaskState::Running);
        match state {
            TaskState::Done(marker) => {
                task.0.borrow_mut().state = TaskState::Done(marker);
                Ok(GeneratorStep::Exhausted)
            }
            TaskState::Running => Err(RuntimeFault::ReentrantTask),
            TaskState::Listening => {
                task.0.borrow_mut().state = TaskState::Listening;
                Err(RuntimeFault::TypeMismatch {
                    op: "generator_next",
                    expected: "a generator",
                    found: "an event listener".to_string(),
                })
            }
            TaskState::Pending(mut frame) => {
                let outcome = self.drive(&mut frame)?;
                let mut task = task.0.borrow_mut();
                let value = outcome.value.unwrap_or(Value::Void);
                Ok(match outcome.status {
                    ReturnStatus::YieldNotFinished => {
                        task.state = TaskState::Pending(frame);
                        GeneratorStep::Item(value)
                    }
                    ReturnStatus::YieldFinished => {
                        task.state = TaskState::Done(Value::Void);
                        GeneratorStep::Item(value)
                    }
                    ReturnStatus::Finished => {
                        task.state = TaskState::Done(Value::Void);
                        GeneratorStep::Exhausted
                    }
                    ReturnStatus::Blocked => {
                        task.state = TaskState::Pending(frame);
                        GeneratorStep::Blocked
                    }
                })
            }
        }
    }
}

fn missing_arg(intrinsic: Intrinsic) -> RuntimeFault {
    RuntimeFault::TypeMismatch {
        op: intrinsic.name(),
        expected: "an argument",
        found: "none".to_string(),
    }
}

fn task_arg(args: &[Value], intrinsic: Intrinsic) -> Result<TaskRef, RuntimeFault> {
    let expected = match intrinsic {
        Intrinsic::GeneratorNext { .. } => TaskKind::Generator,
        _ => TaskKind::Future,
    };
    match args.first() {
        Some(Value::Task(task)) if task.0.borrow().kind == expected => Ok(task.clone()),
        Some(other) => Err(RuntimeFault::mismatch(
            intrinsic.name(),
            match expected {
                TaskKind::Generator => "a generator",
                TaskKind::Future => "a future",
            },
            other,
        )),
        None => Err(missing_arg(intrinsic)),
    }
}

fn event_arg(args: &[Value], intrinsic: Intrinsic) -> Result<EventRef, RuntimeFault> {
    match args.first() {
        Some(Value::Event(event)) => Ok(event.clone()),
        Some(other) => Err(RuntimeFault::mismatch(intrinsic.name(), "an event", other)),
        None => Err(missing_arg(intrinsic)),
    }
}

fn future_result(task: &TaskRef) -> Result<Value, RuntimeFault> {
    match &task.0.borrow().state {
        TaskState::Done(value) => Ok(value.clone()),
        _ => Err(RuntimeFault::NotReady),
    }
}

fn some(option: TypeId, value: Value) -> Value {
    Value::Enum(EnumRef::new(option, OPTION_SOME_TAG, Some(value)))
}

fn none(option: TypeId) -> Value {
    Value::Enum(EnumRef::new(option, OPTION_NONE_TAG, None))
}
