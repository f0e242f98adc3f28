//! Lowering of typed statements and expressions into the linear instruction list of a code
//! container.
//!
//! One [`FunctionLowerer`] exists per container being lowered. It owns the label and temporary
//! counters for that container, the lexical block stack used for shadowing, and the loop stack
//! used by `break`/`continue`.

mod call;
mod expr;
mod member;
mod stmt;

use rustc_hash::FxHashMap;
use strand_ir::{
    CodeContainer, ContainerId, ContainerKind, Instruction, Label, Op, ReturnStatus,
    SourceLocation, SymbolFlags, SymbolId, TypeId, TypeKind,
};
use tracing::trace;

use crate::diagnostics::{CompileError, CompileResult};
use crate::model::{InitSegment, Model, PendingBody, Scope};

/// What an expression produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Lowered {
    Value(SymbolId),
    Void,
    /// A type named in value position, e.g. the `Color` of `Color.red`.
    Type(TypeId),
}

pub(crate) struct FunctionLowerer<'m> {
    model: &'m mut Model,
    cid: ContainerId,
    name: String,
    scope: Scope,
    blocks: Vec<FxHashMap<String, SymbolId>>,
    /// `(continue target, break target)` per enclosing loop.
    loops: Vec<(Label, Label)>,
    instructions: Vec<Instruction>,
    pending_labels: Vec<Label>,
    next_label: u32,
    next_temp: u32,
    next_lambda: u32,
    declared: FxHashMap<String, u32>,
    ret: TypeId,
    /// Element type when lowering a generator body.
    elem: Option<TypeId>,
    /// Names visible in the enclosing function of a lambda, with their types.
    enclosing: FxHashMap<String, TypeId>,
    captured: Vec<String>,
    loc: SourceLocation,
}

impl<'m> FunctionLowerer<'m> {
    pub(crate) fn new(
        model: &'m mut Model,
        cid: ContainerId,
        scope: Scope,
        enclosing: FxHashMap<String, TypeId>,
    ) -> Self {
        let container = model.container(cid);
        let name = container.name.clone();
        let ret = container.ret;
        let params = container.params.clone();
        let elem = match model.kind(ret) {
            TypeKind::Generator(elem) if container.is_generator => Some(*elem),
            _ => None,
        };

        let mut root = FxHashMap::default();
        let mut declared = FxHashMap::default();
        for param in params {
            let origin = model.symbol(param).origin_name.clone();
            declared.insert(origin.clone(), 1);
            root.insert(origin, param);
        }

        Self {
            model,
            cid,
            name,
            scope,
            blocks: vec![root],
            loops: Vec::new(),
            instructions: Vec::new(),
            pending_labels: Vec::new(),
            next_label: 0,
            next_temp: 0,
            next_lambda: 0,
            declared,
            ret,
            elem,
            enclosing,
            captured: Vec::new(),
            loc: SourceLocation::default(),
        }
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::new(message, self.loc)
    }

    fn ty(&self, sym: SymbolId) -> TypeId {
        self.model.symbol(sym).ty
    }

    fn emit(&mut self, op: Op) {
        self.instructions.push(Instruction {
            op,
            labels: std::mem::take(&mut self.pending_labels),
            location: self.loc,
        });
    }

    fn new_label(&mut self) -> Label {
        let label = Label(format!("{}_{}", self.name, self.next_label));
        self.next_label += 1;
        label
    }

    /// Attaches `label` to the next emitted instruction.
    fn place(&mut self, label: Label) {
        self.pending_labels.push(label);
    }

    fn depth(&self) -> u32 {
        self.blocks.len() as u32
    }

    fn temp(&mut self, ty: TypeId) -> SymbolId {
        let name = format!("$t{}", self.next_temp);
        self.next_temp += 1;
        let depth = self.depth();
        self.model.add_local(
            self.cid,
            name.clone(),
            &name,
            ty,
            false,
            depth,
            SymbolFlags {
                temporary: true,
                ..SymbolFlags::default()
            },
        )
    }

    /// The destination for a result of type `ty`: the caller's slot when the type matches.
    fn slot(&mut self, dest: Option<SymbolId>, ty: TypeId) -> SymbolId {
        match dest {
            Some(d) if self.ty(d) == ty => d,
            _ => self.temp(ty),
        }
    }

    fn is_fresh_temp(&self, sym: SymbolId) -> bool {
        let symbol = self.model.symbol(sym);
        symbol.flags.temporary && symbol.container == Some(self.cid)
    }

    fn unique_name(&mut self, name: &str) -> String {
        let count = self.declared.entry(name.to_string()).or_insert(0);
        let full = if *count == 0 {
            name.to_string()
        } else {
            format!("{name}#{count}")
        };
        *count += 1;
        full
    }

    fn check_redeclaration(&self, name: &str) -> CompileResult<()> {
        if self.blocks.last().is_some_and(|b| b.contains_key(name)) {
            return Err(self.error(format!("duplicate declaration of `{name}`")));
        }
        Ok(())
    }

    /// Declares a new local in the innermost block, renaming it when it shadows an earlier one.
    fn declare_local(&mut self, name: &str, ty: TypeId, readonly: bool) -> CompileResult<SymbolId> {
        self.check_redeclaration(name)?;
        let full = self.unique_name(name);
        let depth = self.depth();
        let id = self.model.add_local(
            self.cid,
            full,
            name,
            ty,
            readonly,
            depth,
            SymbolFlags::default(),
        );
        if let Some(block) = self.blocks.last_mut() {
            block.insert(name.to_string(), id);
        }
        Ok(id)
    }

    /// Turns a temporary holding an initializer's value into the declared variable.
    fn adopt_temp(&mut self, temp: SymbolId, name: &str, readonly: bool) -> CompileResult<SymbolId> {
        self.check_redeclaration(name)?;
        let full = self.unique_name(name);
        let depth = self.depth();
        let symbol = self.model.symbol_mut(temp);
        symbol.full_name = full;
        symbol.origin_name = name.to_string();
        symbol.readonly = readonly;
        symbol.scope_depth = depth;
        symbol.flags.temporary = false;
        if let Some(block) = self.blocks.last_mut() {
            block.insert(name.to_string(), temp);
        }
        Ok(temp)
    }

    fn is_visible_local(&self, name: &str) -> bool {
        self.blocks.iter().any(|b| b.contains_key(name)) || self.enclosing.contains_key(name)
    }

    /// Resolves a local name, capturing it from the enclosing function inside lambdas.
    fn lookup_local(&mut self, name: &str) -> Option<SymbolId> {
        for block in self.blocks.iter().rev() {
            if let Some(id) = block.get(name) {
                return Some(*id);
            }
        }
        let ty = self.enclosing.get(name).copied()?;
        let full = self.unique_name(name);
        let id = self
            .model
            .add_local(self.cid, full, name, ty, true, 1, SymbolFlags::default());
        self.model.container_mut(self.cid).captures.push(id);
        self.captured.push(name.to_string());
        self.blocks[0].insert(name.to_string(), id);
        Some(id)
    }

    /// Every name a nested lambda could capture, innermost declarations winning.
    fn visible_names(&self) -> FxHashMap<String, TypeId> {
        let mut names = self.enclosing.clone();
        for block in &self.blocks {
            for (name, id) in block {
                names.insert(name.clone(), self.ty(*id));
            }
        }
        names
    }

    fn mismatch(&self, expected: TypeId, found: TypeId) -> CompileError {
        self.error(format!(
            "type mismatch: expected `{}`, found `{}`",
            self.model.type_name(expected),
            self.model.type_name(found)
        ))
    }

    /// Converts `sym` to `to`, inserting a cast when the implicit-cast relation allows it.
    fn coerce(&mut self, sym: SymbolId, to: TypeId) -> CompileResult<SymbolId> {
        let from = self.ty(sym);
        if from == to {
            return Ok(sym);
        }
        if !self.model.can_implicitly_cast(from, to) {
            return Err(self.mismatch(to, from));
        }
        match self.model.implicit_cast_kind(from, to) {
            Some(kind) => {
                let dst = self.temp(to);
                self.emit(Op::Cast { dst, src: sym, kind });
                Ok(dst)
            }
            None => Ok(sym),
        }
    }

    /// Stores `src` into `dst`, converting implicitly when needed.
    fn convert_into(&mut self, src: SymbolId, dst: SymbolId) -> CompileResult<()> {
        if src == dst {
            return Ok(());
        }
        let (from, to) = (self.ty(src), self.ty(dst));
        if from != to && !self.model.can_implicitly_cast(from, to) {
            return Err(self.mismatch(to, from));
        }
        match self.model.implicit_cast_kind(from, to) {
            Some(kind) => self.emit(Op::Cast { dst, src, kind }),
            None => self.emit(Op::Assign { dst, src }),
        }
        Ok(())
    }

    /// Writes the instruction list back into the container. Returns the names captured from
    /// the enclosing function, in capture order.
    pub(crate) fn finish(mut self) -> CompileResult<Vec<String>> {
        let terminated = matches!(
            self.instructions.last().map(|i| &i.op),
            Some(Op::Jump { .. })
                | Some(Op::Return {
                    status: ReturnStatus::Finished | ReturnStatus::YieldFinished,
                    ..
                })
        );
        if !terminated || !self.pending_labels.is_empty() {
            self.emit(Op::Return {
                value: None,
                status: ReturnStatus::Finished,
            });
        }
        trace!(
            target: "strand::compile",
            container = %self.name,
            instructions = self.instructions.len(),
            "lowered container"
        );
        let container = self.model.container_mut(self.cid);
        container.instructions = self.instructions;
        container.index_labels();
        Ok(self.captured)
    }
}

/// Lowers one queued body into its container.
pub(crate) fn lower_body(model: &mut Model, body: PendingBody) -> CompileResult<()> {
    let Some(first) = body.segments.first() else {
        return Ok(());
    };
    let mut lowerer = FunctionLowerer::new(model, body.container, first.scope.clone(), FxHashMap::default());
    lowerer.loc = body.loc;
    for segment in &body.segments {
        lowerer.scope = segment.scope.clone();
        lowerer.block(&segment.stmts)?;
    }
    lowerer.finish()?;
    Ok(())
}

/// Synthesizes the container that initializes globals, static fields and events.
pub(crate) fn lower_initializer(
    model: &mut Model,
    segments: Vec<InitSegment>,
) -> CompileResult<Option<ContainerId>> {
    if segments.is_empty() {
        return Ok(None);
    }
    let void = model.void();
    let cid = model.add_container(
        CodeContainer::new("$globals", ContainerKind::Initializer, void),
        SourceLocation::default(),
    )?;
    let mut lowerer = FunctionLowerer::new(model, cid, Scope::default(), FxHashMap::default());
    for segment in segments {
        match segment {
            InitSegment::Assign {
                symbol,
                value,
                scope,
                loc,
            } => {
                lowerer.scope = scope;
                lowerer.loc = loc;
                lowerer.expr_into(&value, symbol)?;
            }
            InitSegment::NewEvent { symbol, loc } => {
                lowerer.loc = loc;
                let ty = lowerer.ty(symbol);
                lowerer.emit(Op::New { dst: symbol, ty });
            }
        }
    }
    lowerer.finish()?;
    Ok(Some(cid))
}
