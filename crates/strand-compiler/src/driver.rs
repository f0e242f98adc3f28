//! The compilation pipeline: declaration passes over the item tree, body lowering, and the
//! final freeze into a [`Program`].

use std::rc::Rc;

use strand_ir::{
    CodeContainer, ContainerId, ContainerKind, Primitive, Program, SourceLocation, Storage,
    SymbolId, SymbolKind, TypeId,
};
use tracing::{debug, debug_span};

use crate::ast::{self, Expr, ExprKind, FnDecl, GlobalDecl, Item, LiteralExpr, RoutineDecl};
use crate::diagnostics::{CompileError, CompileResult, DiagnosticSink, Severity, TracingSink};
use crate::lower::{lower_body, lower_initializer};
use crate::model::{BodySegment, DeclRef, InitSegment, Model, PendingBody, Scope};
use crate::options::CompileOptions;
use crate::prelude::prelude;

/// Compiles with default options, forwarding diagnostics to `tracing`.
pub fn compile_to_ir(program: &ast::Program) -> Result<Program, CompileError> {
    compile_to_ir_with_options(program, &CompileOptions::default(), &mut TracingSink)
}

/// Compiles a whole program. Warnings and debug output go to `sink`; the first error is
/// reported there too and returned.
pub fn compile_to_ir_with_options(
    program: &ast::Program,
    options: &CompileOptions,
    sink: &mut dyn DiagnosticSink,
) -> Result<Program, CompileError> {
    let _span = debug_span!(target: "strand::compile", "compile", items = program.items.len())
        .entered();
    let mut model = Model::new(options.clone());
    let result = build(&mut model, program);

    let mut promoted = None;
    for diagnostic in std::mem::take(&mut model.diagnostics) {
        sink.report(diagnostic.severity, &diagnostic.message, diagnostic.location);
        if diagnostic.severity == Severity::Warning && options.warnings_as_errors {
            promoted.get_or_insert(CompileError::new(diagnostic.message, diagnostic.location));
        }
    }
    let initializer = match (result, promoted) {
        (Err(err), _) | (Ok(_), Some(err)) => {
            sink.report(Severity::Error, &err.message, err.location);
            return Err(err);
        }
        (Ok(initializer), None) => initializer,
    };

    let program = model.freeze(initializer);
    if options.dump_ir {
        for (index, container) in program.containers.iter().enumerate() {
            if !container.is_extern() {
                let text = program.dump_container(ContainerId(index as u32));
                sink.report(Severity::Debug, &text, SourceLocation::default());
            }
        }
    }
    debug!(
        target: "strand::compile",
        containers = program.containers.len(),
        types = program.types.len(),
        "compilation finished"
    );
    Ok(program)
}

fn build(model: &mut Model, program: &ast::Program) -> CompileResult<Option<ContainerId>> {
    let mut items = vec![prelude(&model.options.builtin_namespace)];
    items.extend(program.items.iter().cloned());
    let root = Scope::default();

    let mut declared = Vec::new();
    register_types(model, &items, &root, &mut declared)?;
    debug!(target: "strand::compile", types = declared.len(), "registered type names");

    for (id, loc) in &declared {
        model.ensure_defined(*id, *loc)?;
    }
    declare_items(model, &items, &root)?;

    drain_queue(model)?;
    let segments = std::mem::take(&mut model.init_segments);
    let initializer = lower_initializer(model, segments)?;
    drain_queue(model)?;
    Ok(initializer)
}

fn drain_queue(model: &mut Model) -> CompileResult<()> {
    while let Some(body) = model.queue.pop_front() {
        lower_body(model, body)?;
    }
    Ok(())
}

/// First pass: makes every type name and import visible.
fn register_types(
    model: &mut Model,
    items: &[Item],
    scope: &Scope,
    declared: &mut Vec<(TypeId, SourceLocation)>,
) -> CompileResult<()> {
    for item in items {
        let (decl, loc) = match item {
            Item::Class(c) => (DeclRef::Class(Rc::new(c.clone())), c.loc),
            Item::Interface(i) => (DeclRef::Interface(Rc::new(i.clone())), i.loc),
            Item::Enum(e) => (DeclRef::Enum(Rc::new(e.clone())), e.loc),
            Item::Namespace(ns) => {
                let inner = Scope::in_namespace(scope.qualify(&ns.name));
                register_types(model, &ns.items, &inner, declared)?;
                continue;
            }
            Item::Import(import) => {
                model
                    .imports
                    .entry(scope.namespace.clone())
                    .or_default()
                    .push(import.path.clone());
                continue;
            }
            _ => continue,
        };
        let id = model.declare_type_name(decl, scope)?;
        declared.push((id, loc));
    }
    Ok(())
}

/// Third pass: functions, routines, globals and events.
fn declare_items(model: &mut Model, items: &[Item], scope: &Scope) -> CompileResult<()> {
    for item in items {
        match item {
            Item::Function(f) => declare_fn(model, f, scope)?,
            Item::Routine(r) => declare_routine(model, r, scope)?,
            Item::Global(g) => declare_global(model, g, scope)?,
            Item::Event(e) => {
                let payload = match &e.payload {
                    Some(spec) => model.resolve_type(spec, scope, e.loc)?,
                    None => model.void(),
                };
                let ty = model.event_type(payload);
                let symbol = declare_global_slot(model, &e.name, ty, true, scope, e.loc)?;
                model
                    .init_segments
                    .push(InitSegment::NewEvent { symbol, loc: e.loc });
            }
            Item::Namespace(ns) => {
                let inner = Scope::in_namespace(scope.qualify(&ns.name));
                declare_items(model, &ns.items, &inner)?;
            }
            Item::Class(_) | Item::Interface(_) | Item::Enum(_) | Item::Import(_) => {}
        }
    }
    Ok(())
}

fn declare_fn(model: &mut Model, decl: &FnDecl, scope: &Scope) -> CompileResult<()> {
    if !decl.generics.is_empty() {
        return model.declare_generic_function(decl, scope);
    }
    model.declare_function(decl, scope.qualify(&decl.name), ContainerKind::Function, None, scope)?;
    Ok(())
}

fn declare_routine(model: &mut Model, decl: &RoutineDecl, scope: &Scope) -> CompileResult<()> {
    let full = scope.qualify(&decl.name);
    let void = model.void();
    let cid = model.add_container(
        CodeContainer::new(full.clone(), ContainerKind::Routine, void),
        decl.loc,
    )?;
    let sig = model.fn_type(Vec::new(), void, false);
    let mut symbol = Model::global_symbol(SymbolKind::Function, full, &decl.name, sig, Storage::Code(cid));
    symbol.readonly = true;
    let sid = model.declare_named(symbol, decl.loc)?;
    model.container_mut(cid).symbol = Some(sid);
    model.routines.push(cid);
    model.queue.push_back(PendingBody {
        container: cid,
        segments: vec![BodySegment {
            stmts: Rc::new(decl.body.clone()),
            scope: scope.clone(),
        }],
        loc: decl.loc,
    });
    Ok(())
}

/// The primitive type of a literal initializer, for globals declared without a type.
fn literal_type(model: &Model, init: &Expr) -> Option<TypeId> {
    let ExprKind::Literal(lit) = &init.kind else {
        return None;
    };
    let prim = match lit {
        LiteralExpr::Bool(_) => Primitive::Bool,
        LiteralExpr::Int { ty: Some(p), .. } | LiteralExpr::Float { ty: Some(p), .. } => *p,
        LiteralExpr::Int { value, .. } if *value <= i32::MAX as u64 => Primitive::I32,
        LiteralExpr::Int { value, .. } if *value <= i64::MAX as u64 => Primitive::I64,
        LiteralExpr::Int { .. } => Primitive::U64,
        LiteralExpr::Float { .. } => Primitive::F64,
        LiteralExpr::Str(_) => Primitive::Str,
        LiteralExpr::Char(_) => Primitive::Char,
    };
    Some(model.prim(prim))
}

fn declare_global(model: &mut Model, decl: &GlobalDecl, scope: &Scope) -> CompileResult<()> {
    let ty = match (&decl.ty, &decl.init) {
        (Some(spec), _) => model.resolve_type(spec, scope, decl.loc)?,
        (None, Some(init)) => literal_type(model, init).ok_or_else(|| {
            CompileError::new(
                format!("global `{}` needs a type annotation", decl.name),
                decl.loc,
            )
        })?,
        (None, None) => {
            return Err(CompileError::new(
                format!("global `{}` needs a type annotation", decl.name),
                decl.loc,
            ))
        }
    };
    if model.is_void(ty) {
        return Err(CompileError::new(
            format!("global `{}` cannot have type `void`", decl.name),
            decl.loc,
        ));
    }
    let symbol = declare_global_slot(model, &decl.name, ty, decl.readonly, scope, decl.loc)?;
    if let Some(init) = &decl.init {
        model.init_segments.push(InitSegment::Assign {
            symbol,
            value: init.clone(),
            scope: scope.clone(),
            loc: decl.loc,
        });
    }
    Ok(())
}

fn declare_global_slot(
    model: &mut Model,
    name: &str,
    ty: TypeId,
    readonly: bool,
    scope: &Scope,
    loc: SourceLocation,
) -> CompileResult<SymbolId> {
    let mut symbol = Model::global_symbol(
        SymbolKind::Variable,
        scope.qualify(name),
        name,
        ty,
        Storage::Global(0),
    );
    symbol.readonly = readonly;
    let sid = model.declare_named(symbol, loc)?;
    let slot = model.add_global_slot(sid);
    model.symbol_mut(sid).storage = Storage::Global(slot);
    Ok(sid)
}
