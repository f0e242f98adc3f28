use std::rc::Rc;

use rustc_hash::FxHashMap;
use strand_ir::{
    ClassInfo, CodeContainer, ContainerId, ContainerKind, EnumInfo, EnumVariant, FieldInfo,
    InterfaceInfo, InterfaceMethod, Primitive, SourceLocation, Storage, SymbolFlags, SymbolKind,
    TypeId, TypeKind,
};

use super::{
    BodySegment, DeclRef, GenericFn, InitSegment, MethodRecord, Model, PendingBody, Scope,
    TypeDecl,
};
use crate::ast::{ClassDecl, ClassMember, EnumDecl, Expr, FnDecl, InterfaceDecl, Stmt, TypeSpec};
use crate::diagnostics::{CompileError, CompileResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DefState {
    Pending,
    Defining,
    Defined,
}

/// Deepest `<` nesting in a type name.
fn generic_depth(name: &str) -> usize {
    let mut depth = 0usize;
    let mut max = 0usize;
    for c in name.chars() {
        match c {
            '<' => {
                depth += 1;
                max = max.max(depth);
            }
            '>' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    max
}

impl Model {
    pub(crate) fn resolve_type(
        &mut self,
        spec: &TypeSpec,
        scope: &Scope,
        loc: SourceLocation,
    ) -> CompileResult<TypeId> {
        match spec {
            TypeSpec::Function {
                params,
                ret,
                is_async,
            } => {
                let params = params
                    .iter()
                    .map(|p| self.resolve_type(p, scope, loc))
                    .collect::<CompileResult<Vec<_>>>()?;
                let ret = self.resolve_type(ret, scope, loc)?;
                Ok(self.fn_type(params, ret, *is_async))
            }
            TypeSpec::Named { path, args } => {
                let args = args
                    .iter()
                    .map(|a| self.resolve_type(a, scope, loc))
                    .collect::<CompileResult<Vec<_>>>()?;
                self.resolve_named_type(path, &args, scope, loc)
            }
        }
    }

    pub(crate) fn resolve_named_type(
        &mut self,
        path: &str,
        args: &[TypeId],
        scope: &Scope,
        loc: SourceLocation,
    ) -> CompileResult<TypeId> {
        if args.is_empty() {
            if let Some(bound) = scope.subst.get(path) {
                return Ok(*bound);
            }
            if let Some(prim) = Primitive::from_name(path) {
                return Ok(self.prim(prim));
            }
        }
        match (path, args) {
            ("Generator", [elem]) => return Ok(self.generator_type(*elem)),
            ("Future", [value]) => return Ok(self.future_type(*value)),
            ("Event", [payload]) => return Ok(self.event_type(*payload)),
            _ => {}
        }

        let Some(base) = self.lookup_type(path, scope) else {
            return Err(CompileError::new(format!("unknown type `{path}`"), loc));
        };
        let is_template = matches!(self.kind(base), TypeKind::Template);
        match (is_template, args.is_empty()) {
            (true, true) => Err(CompileError::new(
                format!(
                    "generic type `{}` cannot be used without type arguments",
                    self.type_name(base)
                ),
                loc,
            )),
            (true, false) => self.specialize_type(base, args.to_vec(), loc),
            (false, false) => Err(CompileError::new(
                format!("type `{}` is not generic", self.type_name(base)),
                loc,
            )),
            (false, true) => Ok(base),
        }
    }

    /// Finds a named (possibly template) type through the scope chain.
    pub(crate) fn lookup_type(&self, path: &str, scope: &Scope) -> Option<TypeId> {
        self.candidates(path, &scope.namespace)
            .into_iter()
            .find_map(|candidate| self.type_ids.get(&candidate).copied())
    }

    /// Same template + same argument list always yields the same type.
    pub(crate) fn specialize_type(
        &mut self,
        template: TypeId,
        args: Vec<TypeId>,
        loc: SourceLocation,
    ) -> CompileResult<TypeId> {
        let arg_names = args
            .iter()
            .map(|a| self.type_name(*a))
            .collect::<Vec<_>>()
            .join(", ");
        let name = format!("{}<{arg_names}>", self.type_name(template));
        if let Some(id) = self.type_ids.get(&name) {
            return Ok(*id);
        }
        if generic_depth(&name) > self.options.max_specialization_depth {
            return Err(CompileError::new(
                format!(
                    "specialization `{name}` exceeds the maximum generic depth of {}",
                    self.options.max_specialization_depth
                ),
                loc,
            ));
        }
        let Some(decl) = self.type_decls.get(&template).cloned() else {
            return Err(CompileError::new(
                format!("`{}` is not a generic type", self.type_name(template)),
                loc,
            ));
        };
        let params = self.type_def(template).generic_params.clone();
        if params.len() != args.len() {
            return Err(CompileError::new(
                format!(
                    "`{}` expects {} type argument(s), found {}",
                    self.type_name(template),
                    params.len(),
                    args.len()
                ),
                loc,
            ));
        }

        let shell = match decl.decl {
            DeclRef::Class(_) => TypeKind::Class(ClassInfo::default()),
            DeclRef::Interface(_) => TypeKind::Interface(InterfaceInfo::default()),
            DeclRef::Enum(_) => TypeKind::Enum(EnumInfo::default()),
        };
        let id = self.add_type(name.clone(), shell);
        {
            let def = &mut self.types[id.0 as usize];
            def.generic_params = params.clone();
            def.generic_args = args.clone();
            def.generic_origin = Some(template);
        }
        self.declare_type_symbol(id, loc)?;

        tracing::trace!(target: "strand::compile", specialization = %name, "specializing generic type");
        let scope = decl.scope.with_bindings(&params, &args).with_owner(id);
        self.def_state.insert(id, DefState::Defining);
        self.define_decl(id, &decl.decl, &scope)?;
        self.def_state.insert(id, DefState::Defined);
        Ok(id)
    }

    fn declare_type_symbol(&mut self, id: TypeId, loc: SourceLocation) -> CompileResult<()> {
        let name = self.type_name(id).to_string();
        let origin = name.rsplit('.').next().unwrap_or(&name).to_string();
        let ty = self.typeref_type(id);
        let mut symbol = Model::global_symbol(
            SymbolKind::TypeReference,
            name,
            &origin,
            ty,
            Storage::Type(id),
        );
        symbol.readonly = true;
        self.declare_named(symbol, loc)?;
        Ok(())
    }

    /// Registers a declared type name so later passes can refer to it before it is defined.
    pub(crate) fn declare_type_name(
        &mut self,
        decl: DeclRef,
        scope: &Scope,
    ) -> CompileResult<TypeId> {
        let (name, generics, loc) = match &decl {
            DeclRef::Class(c) => (&c.name, &c.generics, c.loc),
            DeclRef::Interface(i) => (&i.name, &i.generics, i.loc),
            DeclRef::Enum(e) => (&e.name, &e.generics, e.loc),
        };
        let full = scope.qualify(name);
        if self.type_ids.contains_key(&full) || Primitive::from_name(&full).is_some() {
            return Err(CompileError::new(
                format!("duplicate declaration of `{full}`"),
                loc,
            ));
        }
        let generics = generics.clone();
        let kind = if !generics.is_empty() {
            TypeKind::Template
        } else {
            match &decl {
                DeclRef::Class(_) => TypeKind::Class(ClassInfo::default()),
                DeclRef::Interface(_) => TypeKind::Interface(InterfaceInfo::default()),
                DeclRef::Enum(_) => TypeKind::Enum(EnumInfo::default()),
            }
        };
        let is_template = !generics.is_empty();
        let id = self.add_type(full, kind);
        self.types[id.0 as usize].generic_params = generics;
        self.declare_type_symbol(id, loc)?;
        self.type_decls.insert(
            id,
            TypeDecl {
                decl,
                scope: scope.clone(),
            },
        );
        if !is_template {
            self.def_state.insert(id, DefState::Pending);
        }
        Ok(id)
    }

    /// Defines a declared type if that has not happened yet.
    pub(crate) fn ensure_defined(&mut self, id: TypeId, loc: SourceLocation) -> CompileResult<()> {
        match self.def_state.get(&id) {
            None | Some(DefState::Defined) => Ok(()),
            Some(DefState::Defining) => Err(CompileError::new(
                format!("cyclic definition involving `{}`", self.type_name(id)),
                loc,
            )),
            Some(DefState::Pending) => {
                let Some(decl) = self.type_decls.get(&id).cloned() else {
                    return Ok(());
                };
                self.def_state.insert(id, DefState::Defining);
                let scope = decl.scope.with_owner(id);
                self.define_decl(id, &decl.decl, &scope)?;
                self.def_state.insert(id, DefState::Defined);
                Ok(())
            }
        }
    }

    fn define_decl(&mut self, id: TypeId, decl: &DeclRef, scope: &Scope) -> CompileResult<()> {
        match decl {
            DeclRef::Class(c) => self.define_class(id, c, scope),
            DeclRef::Interface(i) => self.define_interface(id, i, scope),
            DeclRef::Enum(e) => self.define_enum(id, e, scope),
        }
    }

    fn define_enum(&mut self, id: TypeId, decl: &EnumDecl, scope: &Scope) -> CompileResult<()> {
        let enum_name = self.type_name(id).to_string();
        let mut variants = Vec::with_capacity(decl.variants.len());
        let mut next_tag = 0i64;
        for variant in &decl.variants {
            let tag = variant.value.unwrap_or(next_tag);
            next_tag = tag.wrapping_add(1);
            let payload = match &variant.payload {
                Some(spec) => Some(self.resolve_type(spec, scope, variant.loc)?),
                None => None,
            }
            .filter(|ty| !self.is_void(*ty));

            let mut symbol = Model::global_symbol(
                SymbolKind::EnumMember,
                format!("{enum_name}.{}", variant.name),
                &variant.name,
                id,
                Storage::Variant(tag),
            );
            symbol.owner_type = Some(id);
            symbol.readonly = true;
            symbol.flags.member = true;
            symbol.flags.is_static = true;
            self.declare_named(symbol, variant.loc)?;
            variants.push(EnumVariant {
                name: variant.name.clone(),
                tag,
                payload,
            });
        }
        self.types[id.0 as usize].kind = TypeKind::Enum(EnumInfo { variants });
        Ok(())
    }

    pub(crate) fn interface_info(&self, id: TypeId) -> Option<&InterfaceInfo> {
        match self.kind(id) {
            TypeKind::Interface(info) => Some(info),
            _ => None,
        }
    }

    pub(crate) fn class_info(&self, id: TypeId) -> Option<&ClassInfo> {
        match self.kind(id) {
            TypeKind::Class(info) => Some(info),
            _ => None,
        }
    }

    /// `true` when interface `sub` implements `sup`, directly or transitively.
    pub(crate) fn interface_extends(&self, sub: TypeId, sup: TypeId) -> bool {
        sub != sup
            && self
                .interface_info(sub)
                .is_some_and(|info| info.supers.contains(&sup))
    }

    fn expect_interface(&mut self, spec_ty: TypeId, loc: SourceLocation) -> CompileResult<()> {
        self.ensure_defined(spec_ty, loc)?;
        if self.interface_info(spec_ty).is_none() {
            return Err(CompileError::new(
                format!("`{}` is not an interface", self.type_name(spec_ty)),
                loc,
            ));
        }
        Ok(())
    }

    fn define_interface(
        &mut self,
        id: TypeId,
        decl: &InterfaceDecl,
        scope: &Scope,
    ) -> CompileResult<()> {
        let iface_name = self.type_name(id).to_string();
        let mut direct = Vec::new();
        let mut supers = Vec::new();
        for spec in &decl.supers {
            let sup = self.resolve_type(spec, scope, decl.loc)?;
            self.expect_interface(sup, decl.loc)?;
            direct.push(sup);
            let inherited = self
                .interface_info(sup)
                .map(|info| info.supers.clone())
                .unwrap_or_default();
            for s in std::iter::once(sup).chain(inherited) {
                if !supers.contains(&s) {
                    supers.push(s);
                }
            }
        }

        let mut methods: Vec<InterfaceMethod> = Vec::new();
        let mut conflicts: Vec<(String, TypeId, TypeId)> = Vec::new();
        for sup in &direct {
            let inherited = self
                .interface_info(*sup)
                .map(|info| info.methods.clone())
                .unwrap_or_default();
            for method in inherited {
                match methods.iter().position(|m| m.name == method.name) {
                    None => methods.push(method),
                    Some(idx) => {
                        let existing = methods[idx].declared_in;
                        if existing == method.declared_in
                            || self.interface_extends(existing, method.declared_in)
                        {
                            continue;
                        }
                        if self.interface_extends(method.declared_in, existing) {
                            methods[idx] = method;
                        } else {
                            conflicts.push((method.name.clone(), existing, method.declared_in));
                        }
                    }
                }
            }
        }

        let mut own_names: Vec<&str> = Vec::new();
        for f in &decl.methods {
            if own_names.contains(&f.name.as_str()) {
                return Err(CompileError::new(
                    format!("duplicate declaration of `{iface_name}.{}`", f.name),
                    f.loc,
                ));
            }
            own_names.push(&f.name);
            if !f.generics.is_empty() || f.is_static || f.is_extern {
                return Err(CompileError::new(
                    format!(
                        "interface method `{iface_name}.{}` must be a plain instance method",
                        f.name
                    ),
                    f.loc,
                ));
            }
            let (sig, default) = if f.body.is_some() {
                let (cid, sig) = self.declare_function(
                    f,
                    format!("{iface_name}.{}", f.name),
                    ContainerKind::Method,
                    Some(id),
                    scope,
                )?;
                (sig, Some(cid))
            } else {
                (self.signature_of(f, scope)?, None)
            };
            let entry = InterfaceMethod {
                name: f.name.clone(),
                sig,
                declared_in: id,
                default,
            };
            match methods.iter().position(|m| m.name == f.name) {
                Some(idx) => {
                    if methods[idx].sig != sig {
                        return Err(CompileError::new(
                            format!(
                                "`{iface_name}.{}` does not match the signature inherited from `{}`",
                                f.name,
                                self.type_name(methods[idx].declared_in)
                            ),
                            f.loc,
                        ));
                    }
                    methods[idx] = entry;
                }
                None => methods.push(entry),
            }
        }

        if let Some((name, a, b)) = conflicts
            .into_iter()
            .find(|(name, _, _)| !own_names.contains(&name.as_str()))
        {
            return Err(CompileError::new(
                format!(
                    "interface `{iface_name}` inherits conflicting definitions of `{name}` from `{}` and `{}`",
                    self.type_name(a),
                    self.type_name(b)
                ),
                decl.loc,
            ));
        }

        self.types[id.0 as usize].kind = TypeKind::Interface(InterfaceInfo { supers, methods });
        Ok(())
    }

    fn define_class(&mut self, id: TypeId, decl: &ClassDecl, scope: &Scope) -> CompileResult<()> {
        let class_name = self.type_name(id).to_string();
        let is_generic = !self.type_def(id).generic_args.is_empty();
        let mut fields = Vec::new();
        let mut field_inits = Vec::new();
        let mut records = Vec::new();
        let mut direct = Vec::new();
        let mut block_counts: FxHashMap<TypeId, u32> = FxHashMap::default();

        for member in &decl.members {
            match member {
                ClassMember::Field(f) => {
                    let ty = self.resolve_type(&f.ty, scope, f.loc)?;
                    if self.is_void(ty) {
                        return Err(CompileError::new(
                            format!("field `{class_name}.{}` cannot have type `void`", f.name),
                            f.loc,
                        ));
                    }
                    let full = format!("{class_name}.{}", f.name);
                    if f.is_static {
                        if is_generic && f.init.is_some() {
                            return Err(CompileError::new(
                                format!(
                                    "static field `{full}` of a generic class cannot have an initializer"
                                ),
                                f.loc,
                            ));
                        }
                        let mut symbol = Model::global_symbol(
                            SymbolKind::Variable,
                            full,
                            &f.name,
                            ty,
                            Storage::Global(0),
                        );
                        symbol.owner_type = Some(id);
                        symbol.readonly = f.readonly;
                        symbol.flags.member = true;
                        symbol.flags.is_static = true;
                        let sid = self.declare_named(symbol, f.loc)?;
                        let slot = self.add_global_slot(sid);
                        self.symbol_mut(sid).storage = Storage::Global(slot);
                        if let Some(init) = &f.init {
                            self.init_segments.push(InitSegment::Assign {
                                symbol: sid,
                                value: init.clone(),
                                scope: scope.clone(),
                                loc: f.loc,
                            });
                        }
                    } else {
                        let index = fields.len() as u32;
                        let mut symbol = Model::global_symbol(
                            SymbolKind::Variable,
                            full,
                            &f.name,
                            ty,
                            Storage::Field(index),
                        );
                        symbol.owner_type = Some(id);
                        symbol.readonly = f.readonly;
                        symbol.flags.member = true;
                        self.declare_named(symbol, f.loc)?;
                        fields.push(FieldInfo {
                            name: f.name.clone(),
                            ty,
                            readonly: f.readonly,
                        });
                        if let Some(init) = &f.init {
                            field_inits.push(
                                Stmt::assign(Expr::this().member(f.name.clone()), init.clone())
                                    .at(f.loc.line, f.loc.column),
                            );
                        }
                    }
                }
                ClassMember::Method(m) => {
                    if !m.generics.is_empty() {
                        return Err(CompileError::new(
                            format!("method `{class_name}.{}` cannot be generic", m.name),
                            m.loc,
                        ));
                    }
                    let receiver = if m.is_static { None } else { Some(id) };
                    let (container, sig) = self.declare_function(
                        m,
                        format!("{class_name}.{}", m.name),
                        ContainerKind::Method,
                        receiver,
                        scope,
                    )?;
                    records.push(MethodRecord {
                        name: m.name.clone(),
                        container,
                        sig,
                        via: None,
                        is_static: m.is_static,
                    });
                }
                ClassMember::Implements(block) => {
                    let iface = self.resolve_type(&block.interface, scope, block.loc)?;
                    self.expect_interface(iface, block.loc)?;
                    if !direct.contains(&iface) {
                        direct.push(iface);
                    }
                    let count = block_counts.entry(iface).or_insert(0);
                    *count += 1;
                    let block_name = if *count == 1 {
                        format!("{class_name}.{}", self.type_name(iface))
                    } else {
                        format!("{class_name}.{}#{count}", self.type_name(iface))
                    };
                    let slots = self
                        .interface_info(iface)
                        .map(|info| info.methods.clone())
                        .unwrap_or_default();
                    for m in &block.methods {
                        let Some(slot) = slots.iter().find(|s| s.name == m.name) else {
                            return Err(CompileError::new(
                                format!(
                                    "`{}` is not a member of interface `{}`",
                                    m.name,
                                    self.type_name(iface)
                                ),
                                m.loc,
                            ));
                        };
                        if !m.generics.is_empty() || m.is_static {
                            return Err(CompileError::new(
                                format!(
                                    "implementation of `{}` must be a plain instance method",
                                    m.name
                                ),
                                m.loc,
                            ));
                        }
                        let (container, sig) = self.declare_function(
                            m,
                            format!("{block_name}.{}", m.name),
                            ContainerKind::Method,
                            Some(id),
                            scope,
                        )?;
                        if sig != slot.sig {
                            return Err(CompileError::new(
                                format!(
                                    "`{class_name}.{}` does not match the signature of `{}.{}`",
                                    m.name,
                                    self.type_name(iface),
                                    m.name
                                ),
                                m.loc,
                            ));
                        }
                        records.push(MethodRecord {
                            name: m.name.clone(),
                            container,
                            sig,
                            via: Some(iface),
                            is_static: false,
                        });
                    }
                }
            }
        }

        let mut interfaces = Vec::new();
        for iface in direct {
            let inherited = self
                .interface_info(iface)
                .map(|info| info.supers.clone())
                .unwrap_or_default();
            for i in std::iter::once(iface).chain(inherited) {
                if !interfaces.contains(&i) {
                    interfaces.push(i);
                }
            }
        }

        let initializer = if field_inits.is_empty() {
            None
        } else {
            let void = self.void();
            let mut container =
                CodeContainer::new(format!("{class_name}.$init"), ContainerKind::Initializer, void);
            container.owner = Some(id);
            let cid = self.add_container(container, decl.loc)?;
            let this = self.add_local(
                cid,
                "this".to_string(),
                "this",
                id,
                true,
                1,
                SymbolFlags {
                    param: true,
                    ..SymbolFlags::default()
                },
            );
            self.symbol_mut(this).param_index = Some(0);
            self.container_mut(cid).params = vec![this];
            self.queue.push_back(PendingBody {
                container: cid,
                segments: vec![BodySegment {
                    stmts: Rc::new(field_inits),
                    scope: scope.clone(),
                }],
                loc: decl.loc,
            });
            Some(cid)
        };

        self.types[id.0 as usize].kind = TypeKind::Class(ClassInfo {
            fields,
            interfaces,
            vtables: Vec::new(),
            initializer,
        });
        self.class_methods.insert(id, records);
        self.build_vtables(id, decl.loc)
    }

    /// Resolves a declaration's signature without creating any code for it.
    pub(crate) fn signature_of(&mut self, decl: &FnDecl, scope: &Scope) -> CompileResult<TypeId> {
        let params = decl
            .params
            .iter()
            .map(|p| self.resolve_type(&p.ty, scope, p.loc))
            .collect::<CompileResult<Vec<_>>>()?;
        let ret = match &decl.ret {
            Some(spec) => self.resolve_type(spec, scope, decl.loc)?,
            None => self.void(),
        };
        Ok(self.fn_type(params, ret, decl.is_async))
    }

    /// Creates the container, parameter slots and function symbol for a declaration, queueing
    /// its body for lowering. Returns the container and the function type.
    pub(crate) fn declare_function(
        &mut self,
        decl: &FnDecl,
        full_name: String,
        kind: ContainerKind,
        receiver: Option<TypeId>,
        scope: &Scope,
    ) -> CompileResult<(ContainerId, TypeId)> {
        let sig = self.signature_of(decl, scope)?;
        let (param_types, ret) = match self.fn_sig(sig) {
            Some(s) => (s.params.clone(), s.ret),
            None => (Vec::new(), self.void()),
        };
        let is_generator = matches!(self.kind(ret), TypeKind::Generator(_));
        if is_generator && decl.is_async {
            return Err(CompileError::new(
                format!("generator function `{full_name}` cannot be async"),
                decl.loc,
            ));
        }

        let mut container = CodeContainer::new(full_name.clone(), kind, ret);
        container.owner = scope.owner;
        container.is_async = decl.is_async;
        container.is_generator = is_generator;
        if decl.is_extern {
            if decl.body.is_some() {
                return Err(CompileError::new(
                    format!("extern function `{full_name}` cannot have a body"),
                    decl.loc,
                ));
            }
            container.extern_name = Some(scope.qualify(&decl.name));
        } else if decl.body.is_none() {
            return Err(CompileError::new(
                format!("function `{full_name}` has no body"),
                decl.loc,
            ));
        }
        let cid = self.add_container(container, decl.loc)?;

        let mut params = Vec::new();
        if let Some(recv) = receiver {
            let this = self.add_local(
                cid,
                "this".to_string(),
                "this",
                recv,
                true,
                1,
                SymbolFlags {
                    param: true,
                    ..SymbolFlags::default()
                },
            );
            self.symbol_mut(this).param_index = Some(0);
            params.push(this);
        }
        for (idx, (param, ty)) in decl.params.iter().zip(&param_types).enumerate() {
            if decl.params[..idx].iter().any(|p| p.name == param.name) {
                return Err(CompileError::new(
                    format!("duplicate parameter `{}` in `{full_name}`", param.name),
                    param.loc,
                ));
            }
            let id = self.add_local(
                cid,
                param.name.clone(),
                &param.name,
                *ty,
                param.readonly,
                1,
                SymbolFlags {
                    param: true,
                    ..SymbolFlags::default()
                },
            );
            self.symbol_mut(id).param_index = Some(params.len() as u32);
            params.push(id);
        }
        self.container_mut(cid).params = params;

        let mut symbol = Model::global_symbol(
            SymbolKind::Function,
            full_name,
            &decl.name,
            sig,
            Storage::Code(cid),
        );
        symbol.owner_type = scope.owner.filter(|_| receiver.is_some() || decl.is_static);
        symbol.readonly = true;
        symbol.flags.member = symbol.owner_type.is_some();
        symbol.flags.is_static = decl.is_static;
        let sid = self.declare_named(symbol, decl.loc)?;
        self.container_mut(cid).symbol = Some(sid);

        if let Some(body) = &decl.body {
            self.queue.push_back(PendingBody {
                container: cid,
                segments: vec![BodySegment {
                    stmts: Rc::new(body.clone()),
                    scope: scope.clone(),
                }],
                loc: decl.loc,
            });
        }
        Ok((cid, sig))
    }

    /// Registers a generic free function; it is specialized per argument list on use.
    pub(crate) fn declare_generic_function(
        &mut self,
        decl: &FnDecl,
        scope: &Scope,
    ) -> CompileResult<()> {
        let full = scope.qualify(&decl.name);
        let marker = self.add_type(format!("fn {full}"), TypeKind::Template);
        self.types[marker.0 as usize].generic_params = decl.generics.clone();
        let mut symbol = Model::global_symbol(
            SymbolKind::Function,
            full.clone(),
            &decl.name,
            marker,
            Storage::Type(marker),
        );
        symbol.readonly = true;
        self.declare_named(symbol, decl.loc)?;
        self.generic_fns.insert(
            full,
            GenericFn {
                decl: Rc::new(decl.clone()),
                scope: scope.clone(),
            },
        );
        Ok(())
    }

    pub(crate) fn specialize_function(
        &mut self,
        full: &str,
        args: &[TypeId],
        loc: SourceLocation,
    ) -> CompileResult<(ContainerId, TypeId)> {
        let Some(generic) = self.generic_fns.get(full).cloned() else {
            return Err(CompileError::new(
                format!("`{full}` is not a generic function"),
                loc,
            ));
        };
        if generic.decl.generics.len() != args.len() {
            return Err(CompileError::new(
                format!(
                    "`{full}` expects {} type argument(s), found {}",
                    generic.decl.generics.len(),
                    args.len()
                ),
                loc,
            ));
        }
        let arg_names = args
            .iter()
            .map(|a| self.type_name(*a))
            .collect::<Vec<_>>()
            .join(", ");
        let name = format!("{full}<{arg_names}>");
        if let Some(cid) = self.container_ids.get(&name).copied() {
            let sig = self
                .container(cid)
                .symbol
                .map_or(self.void(), |s| self.symbol(s).ty);
            return Ok((cid, sig));
        }
        if generic_depth(&name) > self.options.max_specialization_depth {
            return Err(CompileError::new(
                format!(
                    "specialization `{name}` exceeds the maximum generic depth of {}",
                    self.options.max_specialization_depth
                ),
                loc,
            ));
        }
        tracing::trace!(target: "strand::compile", specialization = %name, "specializing generic function");
        let scope = generic.scope.with_bindings(&generic.decl.generics, args);
        self.declare_function(&generic.decl, name, ContainerKind::Function, None, &scope)
    }

    /// Infers a generic function's type arguments from the types of its call arguments.
    pub(crate) fn infer_generic_args(
        &self,
        full: &str,
        arg_types: &[TypeId],
        loc: SourceLocation,
    ) -> CompileResult<Vec<TypeId>> {
        let Some(generic) = self.generic_fns.get(full) else {
            return Err(CompileError::new(
                format!("`{full}` is not a generic function"),
                loc,
            ));
        };
        let mut bindings = FxHashMap::default();
        for (param, arg) in generic.decl.params.iter().zip(arg_types) {
            self.unify(&param.ty, *arg, &generic.decl.generics, &mut bindings);
        }
        generic
            .decl
            .generics
            .iter()
            .map(|g| {
                bindings.get(g).copied().ok_or_else(|| {
                    CompileError::new(
                        format!("cannot infer type argument `{g}` of `{full}`"),
                        loc,
                    )
                })
            })
            .collect()
    }

    fn unify(
        &self,
        spec: &TypeSpec,
        ty: TypeId,
        generics: &[String],
        bindings: &mut FxHashMap<String, TypeId>,
    ) {
        match spec {
            TypeSpec::Named { path, args } if args.is_empty() => {
                if generics.contains(path) {
                    bindings.entry(path.clone()).or_insert(ty);
                }
            }
            TypeSpec::Named { args, .. } => {
                let def = self.type_def(ty);
                let actual: Vec<TypeId> = match &def.kind {
                    TypeKind::Generator(t) | TypeKind::Future(t) | TypeKind::Event(t) => vec![*t],
                    _ => def.generic_args.clone(),
                };
                if actual.len() == args.len() {
                    for (arg, actual) in args.iter().zip(actual) {
                        self.unify(arg, actual, generics, bindings);
                    }
                }
            }
            TypeSpec::Function { params, ret, .. } => {
                if let Some(sig) = self.fn_sig(ty) {
                    if sig.params.len() == params.len() {
                        for (p, actual) in params.iter().zip(sig.params.clone()) {
                            self.unify(p, actual, generics, bindings);
                        }
                    }
                    self.unify(ret, sig.ret, generics, bindings);
                }
            }
        }
    }

    /// Names the `Option` specialization for `elem`.
    pub(crate) fn option_of(&mut self, elem: TypeId, loc: SourceLocation) -> CompileResult<TypeId> {
        let scope = Scope::default();
        let path = format!("{}.Option", self.options.builtin_namespace);
        self.resolve_named_type(&path, &[elem], &scope, loc)
    }

    /// The element type if `ty` is a specialization of the built-in `Option`.
    pub(crate) fn option_elem(&self, ty: TypeId) -> Option<TypeId> {
        let def = self.type_def(ty);
        let origin = def.generic_origin?;
        let expected = format!("{}.Option", self.options.builtin_namespace);
        (self.type_name(origin) == expected)
            .then(|| def.generic_args.first().copied())
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::generic_depth;

    #[test]
    fn generic_depth_counts_nesting() {
        assert_eq!(generic_depth("i32"), 0);
        assert_eq!(generic_depth("Box<i32>"), 1);
        assert_eq!(generic_depth("Map<Box<i32>, Box<Box<u8>>>"), 3);
    }
}
