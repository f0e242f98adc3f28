use strand_ir::{
    CallMode, Callee, ContainerId, FieldRef, Intrinsic, Op, Storage, SymbolId, SymbolKind,
    TypeId, TypeKind,
};

use super::member::Member;
use super::{FunctionLowerer, Lowered};
use crate::ast::{Expr, ExprKind, TypeSpec};
use crate::diagnostics::CompileResult;

/// A resolved call target, before its arguments are lowered.
#[derive(Clone, Debug)]
pub(crate) enum Target {
    Direct {
        container: ContainerId,
        sig: TypeId,
        receiver: Option<SymbolId>,
    },
    /// `receiver` is already an interface value.
    Virtual {
        slot: u32,
        sig: TypeId,
        receiver: SymbolId,
    },
    Indirect {
        func: SymbolId,
        sig: TypeId,
    },
    GeneratorNext {
        generator: SymbolId,
        elem: TypeId,
    },
    FuturePoll {
        future: SymbolId,
        value: TypeId,
    },
    Variant {
        enum_ty: TypeId,
        tag: i64,
        payload: Option<TypeId>,
    },
    Generic {
        full: String,
    },
}

impl FunctionLowerer<'_> {
    pub(super) fn call_expr(
        &mut self,
        callee: &Expr,
        generic_args: &[TypeSpec],
        args: &[Expr],
        mode: CallMode,
        dest: Option<SymbolId>,
    ) -> CompileResult<Lowered> {
        let loc = self.loc;
        let target = self.call_target(callee)?;
        self.loc = loc;
        self.emit_target_call(target, generic_args, args, mode, dest)
    }

    fn call_target(&mut self, callee: &Expr) -> CompileResult<Target> {
        match &callee.kind {
            ExprKind::Name(name) => {
                if let Some(local) = self.lookup_local(name) {
                    return self.indirect_target(local);
                }
                if let Some(member) = self.owner_member(name) {
                    return match member {
                        Member::Static(sym) => self.symbol_target(sym),
                        _ => {
                            let this = self.this_symbol()?;
                            self.method_target(this, name)
                        }
                    };
                }
                match self.model.resolve_symbol(name, &self.scope, |_| true) {
                    Some(sym) => self.symbol_target(sym),
                    None => Err(self.error(format!("unknown name `{name}`"))),
                }
            }
            ExprKind::Member { object, name } => {
                if let Some(sym) = self.resolve_path(callee) {
                    return self.symbol_target(sym);
                }
                match self.expr(object, None)? {
                    Lowered::Type(ty) => {
                        let full = format!("{}.{name}", self.model.type_name(ty));
                        match self.model.named.get(&full).copied() {
                            Some(sym) => self.symbol_target(sym),
                            None => Err(self.error(format!(
                                "`{}` has no static member `{name}`",
                                self.model.type_name(ty)
                            ))),
                        }
                    }
                    Lowered::Value(obj) => self.method_target(obj, name),
                    Lowered::Void => Err(self.error("expression has no value")),
                }
            }
            _ => {
                let func = self.expr_value(callee, None)?;
                self.indirect_target(func)
            }
        }
    }

    fn indirect_target(&self, func: SymbolId) -> CompileResult<Target> {
        let sig = self.ty(func);
        match self.model.kind(sig) {
            TypeKind::Function(_) => Ok(Target::Indirect { func, sig }),
            _ => Err(self.error(format!(
                "`{}` of type `{}` is not callable",
                self.model.symbol(func).origin_name,
                self.model.type_name(sig)
            ))),
        }
    }

    fn symbol_target(&self, sym: SymbolId) -> CompileResult<Target> {
        let symbol = self.model.symbol(sym);
        match (symbol.kind, symbol.storage) {
            (SymbolKind::Function, Storage::Code(container)) => {
                if symbol.flags.member && !symbol.flags.is_static {
                    return Err(self.error(format!("`{}` needs a receiver", symbol.full_name)));
                }
                Ok(Target::Direct {
                    container,
                    sig: symbol.ty,
                    receiver: None,
                })
            }
            (SymbolKind::Function, Storage::Type(_)) => Ok(Target::Generic {
                full: symbol.full_name.clone(),
            }),
            (SymbolKind::EnumMember, Storage::Variant(tag)) => {
                let payload = match self.model.kind(symbol.ty) {
                    TypeKind::Enum(info) => info.variant_by_tag(tag).and_then(|v| v.payload),
                    _ => None,
                };
                Ok(Target::Variant {
                    enum_ty: symbol.ty,
                    tag,
                    payload,
                })
            }
            (SymbolKind::Variable, _) => self.indirect_target(sym),
            _ => Err(self.error(format!("`{}` is not callable", symbol.full_name))),
        }
    }

    /// Resolves `object.name(...)`.
    pub(super) fn method_target(&mut self, object: SymbolId, name: &str) -> CompileResult<Target> {
        let ty = self.ty(object);
        match (self.model.kind(ty), name) {
            (TypeKind::Generator(elem), "next") => {
                return Ok(Target::GeneratorNext {
                    generator: object,
                    elem: *elem,
                })
            }
            (TypeKind::Future(value), "poll") => {
                return Ok(Target::FuturePoll {
                    future: object,
                    value: *value,
                })
            }
            _ => {}
        }
        match self.lookup_member(ty, name)? {
            Member::Method { container, sig } => Ok(Target::Direct {
                container,
                sig,
                receiver: Some(object),
            }),
            Member::Slot { iface, slot, sig } => {
                let receiver = self.as_interface(object, iface)?;
                Ok(Target::Virtual {
                    slot,
                    sig,
                    receiver,
                })
            }
            Member::Static(sym) => self.symbol_target(sym),
            Member::Field { index, ty: field_ty, .. }
                if matches!(self.model.kind(field_ty), TypeKind::Function(_)) =>
            {
                let func = self.temp(field_ty);
                self.emit(Op::MemberRead {
                    dst: func,
                    object,
                    field: FieldRef { index },
                });
                Ok(Target::Indirect {
                    func,
                    sig: field_ty,
                })
            }
            _ => Err(self.error(format!(
                "`{name}` is not a method of `{}`",
                self.model.type_name(ty)
            ))),
        }
    }

    pub(super) fn emit_target_call(
        &mut self,
        target: Target,
        generic_args: &[TypeSpec],
        args: &[Expr],
        mode: CallMode,
        dest: Option<SymbolId>,
    ) -> CompileResult<Lowered> {
        if !generic_args.is_empty() && !matches!(target, Target::Generic { .. }) {
            return Err(self.error("type arguments given to a non-generic function"));
        }
        let loc = self.loc;
        match target {
            Target::Generic { full } => {
                let (container, sig, values) = if generic_args.is_empty() {
                    let values = args
                        .iter()
                        .map(|a| self.expr_value(a, None))
                        .collect::<CompileResult<Vec<_>>>()?;
                    self.loc = loc;
                    let types: Vec<TypeId> = values.iter().map(|v| self.ty(*v)).collect();
                    let inferred = self.model.infer_generic_args(&full, &types, loc)?;
                    let (container, sig) = self.model.specialize_function(&full, &inferred, loc)?;
                    (container, sig, values)
                } else {
                    let types = generic_args
                        .iter()
                        .map(|spec| self.model.resolve_type(spec, &self.scope, loc))
                        .collect::<CompileResult<Vec<_>>>()?;
                    let (container, sig) = self.model.specialize_function(&full, &types, loc)?;
                    let values = self.lower_args(sig, args)?;
                    (container, sig, values)
                };
                self.loc = loc;
                self.finish_call(Callee::Direct(container), sig, None, values, mode, dest)
            }
            Target::Direct {
                container,
                sig,
                receiver,
            } => {
                let values = self.lower_args(sig, args)?;
                self.loc = loc;
                self.finish_call(Callee::Direct(container), sig, receiver, values, mode, dest)
            }
            Target::Virtual {
                slot,
                sig,
                receiver,
            } => {
                let values = self.lower_args(sig, args)?;
                self.loc = loc;
                self.finish_call(Callee::Virtual { slot }, sig, Some(receiver), values, mode, dest)
            }
            Target::Indirect { func, sig } => {
                let values = self.lower_args(sig, args)?;
                self.loc = loc;
                self.finish_call(Callee::Indirect(func), sig, None, values, mode, dest)
            }
            Target::GeneratorNext { generator, elem } => {
                let option = self.model.option_of(elem, loc)?;
                self.intrinsic_call(
                    Intrinsic::GeneratorNext { option },
                    generator,
                    option,
                    args,
                    mode,
                    dest,
                )
            }
            Target::FuturePoll { future, value } => {
                let option = self.model.option_of(value, loc)?;
                self.intrinsic_call(Intrinsic::FuturePoll { option }, future, option, args, mode, dest)
            }
            Target::Variant {
                enum_ty,
                tag,
                payload,
            } => {
                if mode == CallMode::Async {
                    return Err(self.error("`async` requires a function call"));
                }
                let value = match (payload, args) {
                    (Some(ty), [arg]) => Some(self.expr_to(arg, ty)?),
                    (None, []) => None,
                    _ => {
                        return Err(self.error(format!(
                            "expected {} argument(s), found {}",
                            usize::from(payload.is_some()),
                            args.len()
                        )))
                    }
                };
                self.loc = loc;
                Ok(Lowered::Value(self.construct_variant(enum_ty, tag, value, dest)))
            }
        }
    }

    fn intrinsic_call(
        &mut self,
        intrinsic: Intrinsic,
        handle: SymbolId,
        result: TypeId,
        args: &[Expr],
        mode: CallMode,
        dest: Option<SymbolId>,
    ) -> CompileResult<Lowered> {
        if mode == CallMode::Async {
            return Err(self.error(format!("`{}` cannot be called with `async`", intrinsic.name())));
        }
        if !args.is_empty() {
            return Err(self.error(format!("expected 0 argument(s), found {}", args.len())));
        }
        let dst = self.slot(dest, result);
        self.emit(Op::Call {
            dst: Some(dst),
            callee: Callee::Intrinsic(intrinsic),
            args: vec![handle],
            mode: CallMode::Sync,
        });
        Ok(Lowered::Value(dst))
    }

    /// Lowers call arguments against the parameter types of `sig`.
    fn lower_args(&mut self, sig: TypeId, args: &[Expr]) -> CompileResult<Vec<SymbolId>> {
        let params = self
            .model
            .fn_sig(sig)
            .map(|s| s.params.clone())
            .unwrap_or_default();
        if params.len() != args.len() {
            return Err(self.error(format!(
                "expected {} argument(s), found {}",
                params.len(),
                args.len()
            )));
        }
        args.iter()
            .zip(params)
            .map(|(arg, ty)| self.expr_to(arg, ty))
            .collect()
    }

    fn finish_call(
        &mut self,
        callee: Callee,
        sig: TypeId,
        receiver: Option<SymbolId>,
        values: Vec<SymbolId>,
        mode: CallMode,
        dest: Option<SymbolId>,
    ) -> CompileResult<Lowered> {
        let Some(fn_sig) = self.model.fn_sig(sig).cloned() else {
            return Err(self.error(format!(
                "`{}` is not a function type",
                self.model.type_name(sig)
            )));
        };
        if fn_sig.params.len() != values.len() {
            return Err(self.error(format!(
                "expected {} argument(s), found {}",
                fn_sig.params.len(),
                values.len()
            )));
        }
        let mut args = Vec::with_capacity(values.len() + 1);
        args.extend(receiver);
        for (value, ty) in values.into_iter().zip(&fn_sig.params) {
            args.push(self.coerce(value, *ty)?);
        }

        let is_generator = matches!(self.model.kind(fn_sig.ret), TypeKind::Generator(_));
        if mode == CallMode::Async {
            if is_generator {
                return Err(self.error("a generator function cannot be called with `async`"));
            }
            if let Callee::Direct(cid) = callee {
                let container = self.model.container(cid);
                if container.is_extern() {
                    return Err(self.error(format!(
                        "extern function `{}` cannot be called with `async`",
                        container.name
                    )));
                }
            }
            let future_ty = self.model.future_type(fn_sig.ret);
            let dst = self.slot(dest, future_ty);
            self.emit(Op::Call {
                dst: Some(dst),
                callee,
                args,
                mode: CallMode::Async,
            });
            return Ok(Lowered::Value(dst));
        }

        let mode = if is_generator {
            CallMode::Generator
        } else {
            CallMode::Sync
        };
        if self.model.is_void(fn_sig.ret) {
            self.emit(Op::Call {
                dst: None,
                callee,
                args,
                mode,
            });
            return Ok(Lowered::Void);
        }
        let dst = self.slot(dest, fn_sig.ret);
        self.emit(Op::Call {
            dst: Some(dst),
            callee,
            args,
            mode,
        });
        Ok(Lowered::Value(dst))
    }
}
