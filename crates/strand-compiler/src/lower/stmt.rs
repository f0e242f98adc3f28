use strand_ir::{
    BinaryOp, CallMode, Callee, ContainerKind, FieldRef, Intrinsic, Literal, Op, OperandKind,
    Primitive, ReturnStatus, SymbolId, TypeId, TypeKind, OPTION_NONE_TAG, OPTION_SOME_TAG,
};

use super::member::Member;
use super::{FunctionLowerer, Lowered};
use crate::ast::{Block, Expr, ExprKind, LiteralExpr, Stmt, StmtKind, TypeSpec};
use crate::diagnostics::CompileResult;

impl FunctionLowerer<'_> {
    pub(crate) fn block(&mut self, stmts: &[Stmt]) -> CompileResult<()> {
        for stmt in stmts {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn scoped_block(&mut self, stmts: &Block) -> CompileResult<()> {
        self.blocks.push(Default::default());
        let result = self.block(stmts);
        self.blocks.pop();
        result
    }

    fn stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
        self.loc = stmt.loc;
        match &stmt.kind {
            StmtKind::Let {
                name,
                readonly,
                ty,
                init,
            } => self.let_stmt(name, *readonly, ty.as_ref(), init.as_ref()),
            StmtKind::Assign { target, value } => self.assign_stmt(target, value),
            StmtKind::Expr(expr) => self.expr(expr, None).map(|_| ()),
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => self.if_stmt(cond, then_block, else_block.as_ref()),
            StmtKind::While { cond, body } => self.while_stmt(cond, body),
            StmtKind::For { var, iter, body } => self.for_stmt(var, iter, body),
            StmtKind::Break => {
                let Some((_, end)) = self.loops.last().cloned() else {
                    return Err(self.error("`break` outside of a loop"));
                };
                self.emit(Op::Jump { target: end });
                Ok(())
            }
            StmtKind::Continue => {
                let Some((begin, _)) = self.loops.last().cloned() else {
                    return Err(self.error("`continue` outside of a loop"));
                };
                self.emit(Op::Jump { target: begin });
                Ok(())
            }
            StmtKind::Return(value) => self.return_stmt(value.as_ref()),
            StmtKind::Yield(value) => self.yield_stmt(value.as_ref()),
            StmtKind::Wait(None) => {
                self.emit(Op::Return {
                    value: None,
                    status: ReturnStatus::Blocked,
                });
                Ok(())
            }
            StmtKind::Wait(Some(target)) => self.wait_expr(target, None).map(|_| ()),
            StmtKind::Emit { event, arg } => self.emit_stmt(event, arg.as_ref()),
            StmtKind::Block(stmts) => self.scoped_block(stmts),
        }
    }

    fn let_stmt(
        &mut self,
        name: &str,
        readonly: bool,
        ty: Option<&TypeSpec>,
        init: Option<&Expr>,
    ) -> CompileResult<()> {
        let declared = match ty {
            Some(spec) => Some(self.model.resolve_type(spec, &self.scope, self.loc)?),
            None => None,
        };
        let value = match init {
            Some(expr) => Some(self.expr_value(expr, declared)?),
            None => None,
        };
        let ty = match (declared, value) {
            (Some(ty), _) => ty,
            (None, Some(v)) => self.ty(v),
            (None, None) => {
                return Err(self.error(format!(
                    "cannot infer the type of `{name}` without an initializer"
                )))
            }
        };
        if self.model.is_void(ty) {
            return Err(self.error(format!("`{name}` cannot have type `void`")));
        }

        match value {
            Some(v) if self.is_fresh_temp(v) && self.ty(v) == ty => {
                self.adopt_temp(v, name, readonly)?;
            }
            Some(v) => {
                let id = self.declare_local(name, ty, readonly)?;
                self.assign_value(id, v)?;
            }
            None => {
                self.declare_local(name, ty, readonly)?;
            }
        }
        Ok(())
    }

    /// Assigns a named value, inserting a deep copy when the mutability of source and
    /// destination differ and the type can copy itself.
    fn assign_value(&mut self, dst: SymbolId, src: SymbolId) -> CompileResult<()> {
        if dst == src {
            return Ok(());
        }
        let ty = self.ty(dst);
        let (dst_readonly, src_readonly) = (
            self.model.symbol(dst).readonly,
            self.model.symbol(src).readonly,
        );
        if ty == self.ty(src)
            && self.model.is_reference(ty)
            && !self.model.symbol(src).flags.temporary
            && dst_readonly != src_readonly
        {
            if self.insert_copy(dst, src)? {
                return Ok(());
            }
            let message = format!(
                "`{}` and `{}` differ in mutability but share the same `{}` value",
                self.model.symbol(dst).origin_name,
                self.model.symbol(src).origin_name,
                self.model.type_name(ty)
            );
            self.model.warn(message, self.loc);
        }
        self.convert_into(src, dst)
    }

    /// Emits `dst = src.copy()` (or the host enum copy). Returns `false` when `src`'s type has
    /// no copy capability.
    fn insert_copy(&mut self, dst: SymbolId, src: SymbolId) -> CompileResult<bool> {
        let ty = self.ty(src);
        if matches!(self.model.kind(ty), TypeKind::Enum(_)) {
            let path = format!("{}.enum_copy", self.model.options.builtin_namespace);
            let (copy, _) = self.model.specialize_function(&path, &[ty], self.loc)?;
            self.emit(Op::Call {
                dst: Some(dst),
                callee: Callee::Direct(copy),
                args: vec![src],
                mode: CallMode::Sync,
            });
            return Ok(true);
        }

        let Some(iface) = self.copy_interface(ty) else {
            return Ok(false);
        };
        let Some(slot) = self
            .model
            .interface_info(iface)
            .and_then(|info| info.slot("copy"))
        else {
            return Ok(false);
        };
        let receiver = self.coerce(src, iface)?;
        self.emit(Op::Call {
            dst: Some(dst),
            callee: Callee::Virtual { slot: slot as u32 },
            args: vec![receiver],
            mode: CallMode::Sync,
        });
        Ok(true)
    }

    /// The `Copy<ty>` specialization `ty` implements, if any.
    fn copy_interface(&self, ty: TypeId) -> Option<TypeId> {
        let path = format!("{}.Copy", self.model.options.builtin_namespace);
        let template = self.model.type_ids.get(&path).copied()?;
        let info = self.model.class_info(ty)?;
        info.interfaces.iter().copied().find(|iface| {
            let def = self.model.type_def(*iface);
            def.generic_origin == Some(template) && def.generic_args == [ty]
        })
    }

    fn check_writable(&self, sym: SymbolId) -> CompileResult<()> {
        let symbol = self.model.symbol(sym);
        if symbol.readonly {
            return Err(self.error(format!(
                "cannot assign to readonly `{}`",
                symbol.origin_name
            )));
        }
        Ok(())
    }

    fn assign_to_symbol(&mut self, dst: SymbolId, value: &Expr) -> CompileResult<()> {
        self.check_writable(dst)?;
        if let ExprKind::Name(_) = &value.kind {
            if let Lowered::Value(src) = self.expr(value, Some(self.ty(dst)))? {
                return self.assign_value(dst, src);
            }
        }
        self.expr_into(value, dst)
    }

    fn assign_stmt(&mut self, target: &Expr, value: &Expr) -> CompileResult<()> {
        match &target.kind {
            ExprKind::Name(name) => {
                if let Some(local) = self.lookup_local(name) {
                    return self.assign_to_symbol(local, value);
                }
                if let Some(member) = self.owner_member(name) {
                    return match member {
                        Member::Static(sym) => self.assign_to_symbol(sym, value),
                        _ => {
                            let this = self.this_symbol()?;
                            self.assign_member(this, name, value)
                        }
                    };
                }
                match self.model.resolve_symbol(name, &self.scope, |s| {
                    s.kind == strand_ir::SymbolKind::Variable
                }) {
                    Some(global) => self.assign_to_symbol(global, value),
                    None => Err(self.error(format!("unknown name `{name}`"))),
                }
            }
            ExprKind::Member { object, name } => {
                if let Some(sym) = self.resolve_path(target) {
                    if self.model.symbol(sym).kind == strand_ir::SymbolKind::Variable {
                        return self.assign_to_symbol(sym, value);
                    }
                    return Err(self.error(format!(
                        "cannot assign to `{}`",
                        self.model.symbol(sym).full_name
                    )));
                }
                match self.expr(object, None)? {
                    Lowered::Type(ty) => {
                        let full = format!("{}.{name}", self.model.type_name(ty));
                        match self.model.named.get(&full).copied() {
                            Some(sym)
                                if self.model.symbol(sym).kind
                                    == strand_ir::SymbolKind::Variable =>
                            {
                                self.assign_to_symbol(sym, value)
                            }
                            _ => Err(self.error(format!("cannot assign to `{full}`"))),
                        }
                    }
                    Lowered::Value(obj) => self.assign_member(obj, name, value),
                    Lowered::Void => Err(self.error("expression has no value")),
                }
            }
            _ => Err(self.error("invalid assignment target")),
        }
    }

    fn assign_member(&mut self, obj: SymbolId, name: &str, value: &Expr) -> CompileResult<()> {
        let obj_ty = self.ty(obj);
        match self.lookup_member(obj_ty, name)? {
            Member::Field {
                index,
                ty,
                readonly,
            } => {
                let in_initializer = {
                    let container = self.model.container(self.cid);
                    container.kind == ContainerKind::Initializer && container.owner == Some(obj_ty)
                };
                if readonly && !in_initializer {
                    return Err(self.error(format!(
                        "cannot assign to readonly field `{}.{name}`",
                        self.model.type_name(obj_ty)
                    )));
                }
                let src = self.expr_to(value, ty)?;
                self.emit(Op::MemberWrite {
                    object: obj,
                    field: FieldRef { index },
                    src,
                });
                Ok(())
            }
            Member::Static(sym) => self.assign_to_symbol(sym, value),
            Member::Variant {
                tag,
                payload: Some(payload),
            } => {
                let src = self.expr_to(value, payload)?;
                self.emit(Op::EnumPayloadWrite {
                    value: obj,
                    tag,
                    src,
                });
                Ok(())
            }
            Member::Tag => {
                let tag = match &value.kind {
                    ExprKind::Literal(LiteralExpr::Int { value, .. }) => *value as i64,
                    _ => {
                        return Err(
                            self.error("the discriminant can only be set to a constant")
                        )
                    }
                };
                let known = match self.model.kind(obj_ty) {
                    TypeKind::Enum(info) => info.variant_by_tag(tag).is_some(),
                    _ => false,
                };
                if !known {
                    return Err(self.error(format!(
                        "`{}` has no variant with discriminant {tag}",
                        self.model.type_name(obj_ty)
                    )));
                }
                self.emit(Op::EnumTagWrite { value: obj, tag });
                Ok(())
            }
            _ => Err(self.error(format!(
                "cannot assign to member `{name}` of `{}`",
                self.model.type_name(obj_ty)
            ))),
        }
    }

    fn condition(&mut self, cond: &Expr) -> CompileResult<SymbolId> {
        let bool_ty = self.model.prim(Primitive::Bool);
        self.expr_to(cond, bool_ty)
    }

    fn if_stmt(&mut self, cond: &Expr, then_block: &Block, else_block: Option<&Block>) -> CompileResult<()> {
        let cond = self.condition(cond)?;
        let else_label = self.new_label();
        self.emit(Op::Branch {
            cond,
            when: false,
            target: else_label.clone(),
        });
        self.scoped_block(then_block)?;
        match else_block {
            Some(else_block) => {
                let end = self.new_label();
                self.emit(Op::Jump {
                    target: end.clone(),
                });
                self.place(else_label);
                self.scoped_block(else_block)?;
                self.place(end);
            }
            None => self.place(else_label),
        }
        Ok(())
    }

    fn while_stmt(&mut self, cond: &Expr, body: &Block) -> CompileResult<()> {
        let begin = self.new_label();
        let end = self.new_label();
        self.place(begin.clone());
        let cond = self.condition(cond)?;
        self.emit(Op::Branch {
            cond,
            when: false,
            target: end.clone(),
        });
        self.loops.push((begin.clone(), end.clone()));
        let result = self.scoped_block(body);
        self.loops.pop();
        result?;
        self.emit(Op::Jump { target: begin });
        self.place(end);
        Ok(())
    }

    fn for_stmt(&mut self, var: &str, iter: &Expr, body: &Block) -> CompileResult<()> {
        let iterator = self.expr_value(iter, None)?;
        let begin = self.new_label();
        let end = self.new_label();
        self.place(begin.clone());

        let next = self.call_next(iterator)?;
        let elem = self.model.option_elem(self.ty(next)).ok_or_else(|| {
            self.error(format!(
                "`next()` of `{}` must return an `Option`",
                self.model.type_name(self.ty(iterator))
            ))
        })?;
        let i64_ty = self.model.prim(Primitive::I64);
        let bool_ty = self.model.prim(Primitive::Bool);
        let tag = self.temp(i64_ty);
        self.emit(Op::EnumTagRead {
            dst: tag,
            value: next,
        });
        let none = self.temp(i64_ty);
        self.emit(Op::Literal {
            dst: none,
            value: Literal::Int(OPTION_NONE_TAG),
        });
        let done = self.temp(bool_ty);
        self.emit(Op::Binary {
            dst: done,
            op: BinaryOp::Eq,
            lhs: tag,
            rhs: none,
            operand: OperandKind::Primitive(Primitive::I64),
        });
        self.emit(Op::Branch {
            cond: done,
            when: true,
            target: end.clone(),
        });

        self.blocks.push(Default::default());
        self.loops.push((begin.clone(), end.clone()));
        let result = self.for_body(var, elem, next, body);
        self.loops.pop();
        self.blocks.pop();
        result?;

        self.emit(Op::Jump { target: begin });
        self.place(end);
        Ok(())
    }

    fn for_body(&mut self, var: &str, elem: TypeId, next: SymbolId, body: &Block) -> CompileResult<()> {
        if !self.model.is_void(elem) {
            let item = self.declare_local(var, elem, true)?;
            self.emit(Op::EnumPayloadRead {
                dst: item,
                value: next,
                tag: OPTION_SOME_TAG,
            });
        }
        self.scoped_block(body)
    }

    /// Pulls the next element from a generator or an object with a `next()` method.
    fn call_next(&mut self, iterator: SymbolId) -> CompileResult<SymbolId> {
        let ty = self.ty(iterator);
        if let TypeKind::Generator(elem) = *self.model.kind(ty) {
            let option = self.model.option_of(elem, self.loc)?;
            let dst = self.temp(option);
            self.emit(Op::Call {
                dst: Some(dst),
                callee: Callee::Intrinsic(Intrinsic::GeneratorNext { option }),
                args: vec![iterator],
                mode: CallMode::Sync,
            });
            return Ok(dst);
        }
        let target = self.method_target(iterator, "next")?;
        match self.emit_target_call(target, &[], &[], CallMode::Sync, None)? {
            Lowered::Value(v) => Ok(v),
            _ => Err(self.error(format!(
                "`{}` cannot be iterated",
                self.model.type_name(ty)
            ))),
        }
    }

    fn return_stmt(&mut self, value: Option<&Expr>) -> CompileResult<()> {
        if let Some(elem) = self.elem {
            let op = match value {
                None => Op::Return {
                    value: None,
                    status: ReturnStatus::Finished,
                },
                Some(expr) => {
                    let v = self.expr_to(expr, elem)?;
                    Op::Return {
                        value: Some(v),
                        status: ReturnStatus::YieldFinished,
                    }
                }
            };
            self.emit(op);
            return Ok(());
        }

        let ret = self.ret;
        let value = match (value, self.model.is_void(ret)) {
            (None, true) => None,
            (Some(_), true) => {
                return Err(self.error(format!(
                    "`{}` returns no value",
                    self.name
                )))
            }
            (None, false) => {
                return Err(self.error(format!(
                    "missing return value of type `{}`",
                    self.model.type_name(ret)
                )))
            }
            (Some(expr), false) => Some(self.expr_to(expr, ret)?),
        };
        self.emit(Op::Return {
            value,
            status: ReturnStatus::Finished,
        });
        Ok(())
    }

    fn yield_stmt(&mut self, value: Option<&Expr>) -> CompileResult<()> {
        let Some(elem) = self.elem else {
            return Err(self.error("`yield` outside of a generator function"));
        };
        let value = match value {
            None if self.model.is_void(elem) => None,
            None => {
                return Err(self.error(format!(
                    "`yield` needs a value of type `{}`",
                    self.model.type_name(elem)
                )))
            }
            Some(expr) => Some(self.expr_to(expr, elem)?),
        };
        self.emit(Op::Return {
            value,
            status: ReturnStatus::YieldNotFinished,
        });
        Ok(())
    }

    fn emit_stmt(&mut self, event: &Expr, arg: Option<&Expr>) -> CompileResult<()> {
        let event = self.expr_value(event, None)?;
        let ty = self.ty(event);
        let TypeKind::Event(payload) = *self.model.kind(ty) else {
            return Err(self.error(format!(
                "cannot emit a value of type `{}`",
                self.model.type_name(ty)
            )));
        };
        let mut args = vec![event];
        match (arg, self.model.is_void(payload)) {
            (None, true) => {}
            (Some(expr), false) => args.push(self.expr_to(expr, payload)?),
            (None, false) => {
                return Err(self.error(format!(
                    "`emit` needs a payload of type `{}`",
                    self.model.type_name(payload)
                )))
            }
            (Some(_), true) => return Err(self.error("this event carries no payload")),
        }
        self.emit(Op::Call {
            dst: None,
            callee: Callee::Intrinsic(Intrinsic::EventEmit),
            args,
            mode: CallMode::Sync,
        });
        Ok(())
    }
}
