//! The type & symbol model: every named entity and every type of the program being compiled.
//!
//! The model owns all build-time tables. Lowering borrows it mutably, because resolving a type
//! name may specialize a generic and append new types, symbols and pending bodies.

mod casts;
mod types;
mod vtable;

use std::collections::VecDeque;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use strand_ir::{
    CodeContainer, ContainerId, FunctionSig, Primitive, Program, SourceLocation, Storage, Symbol,
    SymbolFlags, SymbolId, SymbolKind, TypeDef, TypeId, TypeKind, VTable,
};

use crate::ast::{Block, ClassDecl, EnumDecl, Expr, FnDecl, InterfaceDecl};
use crate::diagnostics::{CompileError, CompileResult, Diagnostic, Severity};
use crate::options::CompileOptions;

pub(crate) use types::DefState;

/// Lexical context used to resolve names: the enclosing namespace, generic parameter bindings,
/// and the type whose members are being lowered.
#[derive(Clone, Debug, Default)]
pub(crate) struct Scope {
    pub(crate) namespace: String,
    pub(crate) subst: Rc<FxHashMap<String, TypeId>>,
    pub(crate) owner: Option<TypeId>,
}

impl Scope {
    pub(crate) fn in_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    pub(crate) fn with_owner(&self, owner: TypeId) -> Self {
        Self {
            owner: Some(owner),
            ..self.clone()
        }
    }

    pub(crate) fn with_bindings(&self, params: &[String], args: &[TypeId]) -> Self {
        let mut subst = (*self.subst).clone();
        for (param, arg) in params.iter().zip(args) {
            subst.insert(param.clone(), *arg);
        }
        Self {
            subst: Rc::new(subst),
            ..self.clone()
        }
    }

    /// Prefixes `name` with this scope's namespace.
    pub(crate) fn qualify(&self, name: &str) -> String {
        if self.namespace.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", self.namespace)
        }
    }
}

/// A type declaration awaiting definition, or a generic template.
#[derive(Clone, Debug)]
pub(crate) enum DeclRef {
    Class(Rc<ClassDecl>),
    Interface(Rc<InterfaceDecl>),
    Enum(Rc<EnumDecl>),
}

#[derive(Clone, Debug)]
pub(crate) struct TypeDecl {
    pub(crate) decl: DeclRef,
    pub(crate) scope: Scope,
}

#[derive(Clone, Debug)]
pub(crate) struct GenericFn {
    pub(crate) decl: Rc<FnDecl>,
    pub(crate) scope: Scope,
}

/// A class method as declared, in declaration order. `via` names the interface of the
/// implementation block it came from.
#[derive(Clone, Debug)]
pub(crate) struct MethodRecord {
    pub(crate) name: String,
    pub(crate) container: ContainerId,
    pub(crate) sig: TypeId,
    pub(crate) via: Option<TypeId>,
    pub(crate) is_static: bool,
}

/// Statements of one code container, grouped by the scope they resolve names in.
#[derive(Clone, Debug)]
pub(crate) struct BodySegment {
    pub(crate) stmts: Rc<Block>,
    pub(crate) scope: Scope,
}

#[derive(Clone, Debug)]
pub(crate) struct PendingBody {
    pub(crate) container: ContainerId,
    pub(crate) segments: Vec<BodySegment>,
    pub(crate) loc: SourceLocation,
}

/// Work for the synthesized global initializer.
#[derive(Clone, Debug)]
pub(crate) enum InitSegment {
    Assign {
        symbol: SymbolId,
        value: Expr,
        scope: Scope,
        loc: SourceLocation,
    },
    NewEvent {
        symbol: SymbolId,
        loc: SourceLocation,
    },
}

pub(crate) struct Model {
    pub(crate) options: CompileOptions,
    pub(crate) types: Vec<TypeDef>,
    pub(crate) type_ids: FxHashMap<String, TypeId>,
    pub(crate) symbols: Vec<Symbol>,
    /// Non-local symbols by full name.
    pub(crate) named: FxHashMap<String, SymbolId>,
    pub(crate) containers: Vec<CodeContainer>,
    pub(crate) container_ids: FxHashMap<String, ContainerId>,
    pub(crate) vtables: Vec<VTable>,
    pub(crate) globals: Vec<SymbolId>,
    pub(crate) routines: Vec<ContainerId>,
    /// Namespace → namespaces it imports.
    pub(crate) imports: FxHashMap<String, Vec<String>>,
    pub(crate) type_decls: FxHashMap<TypeId, TypeDecl>,
    pub(crate) def_state: FxHashMap<TypeId, DefState>,
    pub(crate) generic_fns: FxHashMap<String, GenericFn>,
    pub(crate) class_methods: FxHashMap<TypeId, Vec<MethodRecord>>,
    pub(crate) queue: VecDeque<PendingBody>,
    pub(crate) init_segments: Vec<InitSegment>,
    pub(crate) cast_cache: FxHashMap<(TypeId, TypeId), bool>,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl Model {
    pub(crate) fn new(options: CompileOptions) -> Self {
        let mut model = Self {
            options,
            types: Vec::new(),
            type_ids: FxHashMap::default(),
            symbols: Vec::new(),
            named: FxHashMap::default(),
            containers: Vec::new(),
            container_ids: FxHashMap::default(),
            vtables: Vec::new(),
            globals: Vec::new(),
            routines: Vec::new(),
            imports: FxHashMap::default(),
            type_decls: FxHashMap::default(),
            def_state: FxHashMap::default(),
            generic_fns: FxHashMap::default(),
            class_methods: FxHashMap::default(),
            queue: VecDeque::new(),
            init_segments: Vec::new(),
            cast_cache: FxHashMap::default(),
            diagnostics: Vec::new(),
        };
        for prim in Primitive::ALL {
            model.add_type(prim.name().to_string(), TypeKind::Primitive(prim));
        }
        model
    }

    /// Primitive types are registered first, in [`Primitive::ALL`] order.
    pub(crate) fn prim(&self, prim: Primitive) -> TypeId {
        TypeId(prim as u32)
    }

    pub(crate) fn void(&self) -> TypeId {
        self.prim(Primitive::Void)
    }

    pub(crate) fn type_def(&self, id: TypeId) -> &TypeDef {
        &self.types[id.0 as usize]
    }

    pub(crate) fn kind(&self, id: TypeId) -> &TypeKind {
        &self.type_def(id).kind
    }

    pub(crate) fn type_name(&self, id: TypeId) -> &str {
        &self.type_def(id).name
    }

    pub(crate) fn primitive(&self, id: TypeId) -> Option<Primitive> {
        self.type_def(id).primitive()
    }

    pub(crate) fn is_void(&self, id: TypeId) -> bool {
        id == self.void()
    }

    /// Class, interface and enum values are shared by reference.
    pub(crate) fn is_reference(&self, id: TypeId) -> bool {
        matches!(
            self.kind(id),
            TypeKind::Class(_) | TypeKind::Interface(_) | TypeKind::Enum(_)
        )
    }

    pub(crate) fn add_type(&mut self, name: String, kind: TypeKind) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.type_ids.insert(name.clone(), id);
        self.types.push(TypeDef {
            name,
            kind,
            generic_params: Vec::new(),
            generic_args: Vec::new(),
            generic_origin: None,
        });
        id
    }

    fn intern(&mut self, name: String, kind: TypeKind) -> TypeId {
        match self.type_ids.get(&name) {
            Some(id) => *id,
            None => self.add_type(name, kind),
        }
    }

    pub(crate) fn fn_type(&mut self, params: Vec<TypeId>, ret: TypeId, is_async: bool) -> TypeId {
        let names = params
            .iter()
            .map(|p| self.type_name(*p))
            .collect::<Vec<_>>()
            .join(", ");
        let prefix = if is_async { "async " } else { "" };
        let name = format!("{prefix}fn({names}) -> {}", self.type_name(ret));
        self.intern(
            name,
            TypeKind::Function(FunctionSig {
                params,
                ret,
                is_async,
            }),
        )
    }

    pub(crate) fn generator_type(&mut self, elem: TypeId) -> TypeId {
        let name = format!("Generator<{}>", self.type_name(elem));
        self.intern(name, TypeKind::Generator(elem))
    }

    pub(crate) fn future_type(&mut self, value: TypeId) -> TypeId {
        let name = format!("Future<{}>", self.type_name(value));
        self.intern(name, TypeKind::Future(value))
    }

    pub(crate) fn event_type(&mut self, payload: TypeId) -> TypeId {
        let name = format!("Event<{}>", self.type_name(payload));
        self.intern(name, TypeKind::Event(payload))
    }

    pub(crate) fn typeref_type(&mut self, target: TypeId) -> TypeId {
        let name = format!("type {}", self.type_name(target));
        self.intern(name, TypeKind::TypeRef(target))
    }

    pub(crate) fn fn_sig(&self, id: TypeId) -> Option<&FunctionSig> {
        match self.kind(id) {
            TypeKind::Function(sig) => Some(sig),
            _ => None,
        }
    }

    pub(crate) fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub(crate) fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    pub(crate) fn add_symbol(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    /// Registers a non-local symbol, rejecting duplicate full names.
    pub(crate) fn declare_named(
        &mut self,
        symbol: Symbol,
        loc: SourceLocation,
    ) -> CompileResult<SymbolId> {
        if self.named.contains_key(&symbol.full_name) {
            return Err(CompileError::new(
                format!("duplicate declaration of `{}`", symbol.full_name),
                loc,
            ));
        }
        let name = symbol.full_name.clone();
        let id = self.add_symbol(symbol);
        self.named.insert(name, id);
        Ok(id)
    }

    /// A non-local symbol skeleton; callers fill in storage-specific details.
    pub(crate) fn global_symbol(
        kind: SymbolKind,
        full_name: String,
        origin_name: &str,
        ty: TypeId,
        storage: Storage,
    ) -> Symbol {
        Symbol {
            kind,
            full_name,
            origin_name: origin_name.to_string(),
            scope_depth: 0,
            container: None,
            owner_type: None,
            ty,
            readonly: false,
            flags: SymbolFlags::default(),
            param_index: None,
            storage,
        }
    }

    /// Allocates a frame slot in `container`.
    pub(crate) fn add_local(
        &mut self,
        container: ContainerId,
        name: String,
        origin_name: &str,
        ty: TypeId,
        readonly: bool,
        scope_depth: u32,
        flags: SymbolFlags,
    ) -> SymbolId {
        let slot = self.containers[container.0 as usize].locals.len() as u32;
        let id = self.add_symbol(Symbol {
            kind: SymbolKind::Variable,
            full_name: name,
            origin_name: origin_name.to_string(),
            scope_depth,
            container: Some(container),
            owner_type: None,
            ty,
            readonly,
            flags: SymbolFlags {
                local: true,
                ..flags
            },
            param_index: None,
            storage: Storage::Local(slot),
        });
        self.containers[container.0 as usize].locals.push(id);
        id
    }

    pub(crate) fn add_global_slot(&mut self, symbol: SymbolId) -> u32 {
        let slot = self.globals.len() as u32;
        self.globals.push(symbol);
        slot
    }

    pub(crate) fn container(&self, id: ContainerId) -> &CodeContainer {
        &self.containers[id.0 as usize]
    }

    pub(crate) fn container_mut(&mut self, id: ContainerId) -> &mut CodeContainer {
        &mut self.containers[id.0 as usize]
    }

    pub(crate) fn add_container(
        &mut self,
        container: CodeContainer,
        loc: SourceLocation,
    ) -> CompileResult<ContainerId> {
        if self.container_ids.contains_key(&container.name) {
            return Err(CompileError::new(
                format!("duplicate declaration of `{}`", container.name),
                loc,
            ));
        }
        let id = ContainerId(self.containers.len() as u32);
        self.container_ids.insert(container.name.clone(), id);
        self.containers.push(container);
        Ok(id)
    }

    /// Full-name candidates for `name` seen from `namespace`: the enclosing namespaces from the
    /// innermost out, then imported namespaces, then the built-in namespace.
    pub(crate) fn candidates(&self, name: &str, namespace: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = namespace.to_string();
        loop {
            chain.push(current.clone());
            match current.rfind('.') {
                Some(idx) => current.truncate(idx),
                None if !current.is_empty() => current.clear(),
                None => break,
            }
        }

        let mut out: Vec<String> = chain
            .iter()
            .map(|ns| qualify(ns, name))
            .collect();
        for ns in &chain {
            if let Some(imports) = self.imports.get(ns) {
                out.extend(imports.iter().map(|imp| qualify(imp, name)));
            }
        }
        out.push(qualify(&self.options.builtin_namespace, name));
        out.dedup();
        out
    }

    /// Resolves a short or full name to a non-local symbol accepted by `accept`.
    pub(crate) fn resolve_symbol(
        &self,
        name: &str,
        scope: &Scope,
        accept: impl Fn(&Symbol) -> bool,
    ) -> Option<SymbolId> {
        self.candidates(name, &scope.namespace)
            .into_iter()
            .filter_map(|candidate| self.named.get(&candidate).copied())
            .find(|id| accept(self.symbol(*id)))
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>, location: SourceLocation) {
        let message = message.into();
        tracing::debug!(target: "strand::compile", %location, "warning: {message}");
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            message,
            location,
        });
    }

    pub(crate) fn freeze(self, initializer: Option<ContainerId>) -> Program {
        Program {
            types: self.types,
            symbols: self.symbols,
            containers: self.containers,
            vtables: self.vtables,
            globals: self.globals,
            initializer,
            routines: self.routines,
            container_ids: self.container_ids.into_iter().collect(),
            type_ids: self.type_ids.into_iter().collect(),
        }
    }
}

pub(crate) fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}
