use strand_ir::{
    BinaryOp, CallMode, Callee, CastKind, CodeContainer, ContainerKind, Intrinsic, Literal, Op,
    OperandKind, Primitive, ReturnStatus, SymbolFlags, SymbolId, SymbolKind, TypeId, TypeKind,
    UnaryOp,
};

use super::member::Member;
use super::{FunctionLowerer, Lowered};
use crate::ast::{BinOp, Expr, ExprKind, LambdaExpr, LiteralExpr, TypeSpec, UnOp};
use crate::diagnostics::CompileResult;

/// Joins a `Name`/`Member` chain into a dotted path.
pub(super) fn dotted_path(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Name(name) => Some(name.clone()),
        ExprKind::Member { object, name } => {
            let mut path = dotted_path(object)?;
            path.push('.');
            path.push_str(name);
            Some(path)
        }
        _ => None,
    }
}

fn is_numeric_literal(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Literal(LiteralExpr::Int { .. } | LiteralExpr::Float { .. }) => true,
        ExprKind::Unary {
            op: UnOp::Neg,
            operand,
        } => is_numeric_literal(operand),
        _ => false,
    }
}

fn fits(value: u64, prim: Primitive) -> bool {
    let width = prim.bit_width();
    if prim.is_signed() {
        value <= (1u64 << (width - 1)) - 1
    } else if prim.is_unsigned() {
        width == 64 || value < (1u64 << width)
    } else {
        false
    }
}

/// Whether `-value` is representable in `prim`.
fn fits_negated(value: u64, prim: Primitive) -> bool {
    let width = prim.bit_width();
    if prim.is_signed() {
        value <= 1u64 << (width - 1)
    } else {
        prim.is_unsigned() && value == 0
    }
}

fn binary_op(op: BinOp) -> Option<BinaryOp> {
    Some(match op {
        BinOp::Add => BinaryOp::Add,
        BinOp::Sub => BinaryOp::Sub,
        BinOp::Mul => BinaryOp::Mul,
        BinOp::Div => BinaryOp::Div,
        BinOp::Rem => BinaryOp::Rem,
        BinOp::Eq => BinaryOp::Eq,
        BinOp::Ne => BinaryOp::Ne,
        BinOp::Lt => BinaryOp::Lt,
        BinOp::Le => BinaryOp::Le,
        BinOp::Gt => BinaryOp::Gt,
        BinOp::Ge => BinaryOp::Ge,
        BinOp::BitAnd => BinaryOp::BitAnd,
        BinOp::BitOr => BinaryOp::BitOr,
        BinOp::BitXor => BinaryOp::BitXor,
        BinOp::Shl => BinaryOp::Shl,
        BinOp::Shr => BinaryOp::Shr,
        BinOp::And | BinOp::Or => return None,
    })
}

/// Whether `op` accepts operands of primitive type `prim` (`None` for reference types).
fn accepts(op: BinaryOp, prim: Option<Primitive>) -> bool {
    match op {
        BinaryOp::Eq | BinaryOp::Ne => prim != Some(Primitive::Void),
        BinaryOp::Add => prim.is_some_and(|p| p.is_numeric() || p == Primitive::Str),
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            prim.is_some_and(Primitive::is_numeric)
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => prim
            .is_some_and(|p| p.is_numeric() || p == Primitive::Char || p == Primitive::Str),
        BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
            prim.is_some_and(|p| p.is_integer() || p == Primitive::Bool)
        }
        BinaryOp::Shl | BinaryOp::Shr => prim.is_some_and(Primitive::is_integer),
    }
}

impl FunctionLowerer<'_> {
    pub(crate) fn expr(&mut self, expr: &Expr, expected: Option<TypeId>) -> CompileResult<Lowered> {
        self.lower(expr, expected, None)
    }

    pub(crate) fn expr_value(
        &mut self,
        expr: &Expr,
        expected: Option<TypeId>,
    ) -> CompileResult<SymbolId> {
        let loc = expr.loc;
        match self.lower(expr, expected, None)? {
            Lowered::Value(v) => Ok(v),
            Lowered::Void => {
                self.loc = loc;
                Err(self.error("expression has no value"))
            }
            Lowered::Type(ty) => {
                self.loc = loc;
                Err(self.error(format!(
                    "type `{}` cannot be used as a value",
                    self.model.type_name(ty)
                )))
            }
        }
    }

    /// Lowers `expr` and converts the result to `ty`.
    pub(crate) fn expr_to(&mut self, expr: &Expr, ty: TypeId) -> CompileResult<SymbolId> {
        let value = self.expr_value(expr, Some(ty))?;
        self.coerce(value, ty)
    }

    /// Lowers `expr` directly into `dst` when possible.
    pub(crate) fn expr_into(&mut self, expr: &Expr, dst: SymbolId) -> CompileResult<()> {
        let ty = self.ty(dst);
        match self.lower(expr, Some(ty), Some(dst))? {
            Lowered::Value(v) => self.convert_into(v, dst),
            Lowered::Void => Err(self.error("expression has no value")),
            Lowered::Type(t) => Err(self.error(format!(
                "type `{}` cannot be used as a value",
                self.model.type_name(t)
            ))),
        }
    }

    fn lower(
        &mut self,
        expr: &Expr,
        expected: Option<TypeId>,
        dest: Option<SymbolId>,
    ) -> CompileResult<Lowered> {
        self.loc = expr.loc;
        match &expr.kind {
            ExprKind::Literal(lit) => Ok(Lowered::Value(self.literal(lit, expected, dest))),
            ExprKind::Name(name) => self.name_expr(name, dest),
            ExprKind::This => self.this_symbol().map(Lowered::Value),
            ExprKind::Member { object, name } => self.member_expr(expr, object, name, dest),
            ExprKind::Call {
                callee,
                generic_args,
                args,
            } => self.call_expr(callee, generic_args, args, CallMode::Sync, dest),
            ExprKind::New { ty, fields } => self.new_expr(ty, fields, dest),
            ExprKind::Binary { op, lhs, rhs } => self.binary_expr(*op, lhs, rhs, expected, dest),
            ExprKind::Unary { op, operand } => self.unary_expr(*op, operand, expected, dest),
            ExprKind::Cast { value, ty } => self.cast_expr(value, ty, dest),
            ExprKind::Is { value, target } => self.is_expr(value, target, dest),
            ExprKind::Async(inner) => match &inner.kind {
                ExprKind::Call {
                    callee,
                    generic_args,
                    args,
                } => self.call_expr(callee, generic_args, args, CallMode::Async, dest),
                _ => Err(self.error("`async` requires a function call")),
            },
            ExprKind::Wait(inner) => self.wait_expr(inner, dest),
            ExprKind::Lambda(lambda) => self.lambda_expr(lambda, dest),
        }
    }

    pub(super) fn this_symbol(&mut self) -> CompileResult<SymbolId> {
        self.lookup_local("this")
            .ok_or_else(|| self.error("`this` is only available inside instance methods"))
    }

    fn literal(
        &mut self,
        lit: &LiteralExpr,
        expected: Option<TypeId>,
        dest: Option<SymbolId>,
    ) -> SymbolId {
        let expected_prim = expected.and_then(|ty| self.model.primitive(ty));
        let (prim, value) = match lit {
            LiteralExpr::Bool(b) => (Primitive::Bool, Literal::Bool(*b)),
            LiteralExpr::Int { value, ty } => {
                let prim = ty
                    .or_else(|| {
                        expected_prim.filter(|p| p.is_float() || (p.is_integer() && fits(*value, *p)))
                    })
                    .unwrap_or(if *value <= i32::MAX as u64 {
                        Primitive::I32
                    } else if *value <= i64::MAX as u64 {
                        Primitive::I64
                    } else {
                        Primitive::U64
                    });
                let literal = if prim.is_float() {
                    Literal::Float(*value as f64)
                } else if prim.is_unsigned() {
                    Literal::UInt(*value)
                } else {
                    Literal::Int(*value as i64)
                };
                (prim, literal)
            }
            LiteralExpr::Float { value, ty } => {
                let prim = ty
                    .or_else(|| expected_prim.filter(|p| p.is_float()))
                    .unwrap_or(Primitive::F64);
                (prim, Literal::Float(*value))
            }
            LiteralExpr::Str(s) => (Primitive::Str, Literal::Str(s.clone())),
            LiteralExpr::Char(c) => (Primitive::Char, Literal::Char(*c)),
        };
        let ty = self.model.prim(prim);
        let dst = self.slot(dest, ty);
        self.emit(Op::Literal { dst, value });
        dst
    }

    /// A member of the type whose body is being lowered, named without `this.`.
    pub(super) fn owner_member(&mut self, name: &str) -> Option<Member> {
        let owner = self.scope.owner?;
        self.lookup_member(owner, name).ok()
    }

    fn name_expr(&mut self, name: &str, dest: Option<SymbolId>) -> CompileResult<Lowered> {
        if let Some(local) = self.lookup_local(name) {
            return Ok(Lowered::Value(local));
        }
        if name.contains('<') {
            let spec = TypeSpec::from_text(name);
            let ty = self.model.resolve_type(&spec, &self.scope, self.loc)?;
            return Ok(Lowered::Type(ty));
        }
        if let Some(member) = self.owner_member(name) {
            return match member {
                Member::Static(sym) => self.symbol_value(sym, dest),
                _ => {
                    let this = self.this_symbol()?;
                    self.read_member(this, name, dest)
                }
            };
        }
        match self.model.resolve_symbol(name, &self.scope, |_| true) {
            Some(sym) => self.symbol_value(sym, dest),
            None => Err(self.error(format!("unknown name `{name}`"))),
        }
    }

    /// Resolves a dotted `Name`/`Member` chain as the full name of a non-local symbol.
    pub(super) fn resolve_path(&mut self, expr: &Expr) -> Option<SymbolId> {
        let path = dotted_path(expr)?;
        let root = path.split('.').next()?;
        if self.is_visible_local(root) {
            return None;
        }
        self.model.resolve_symbol(&path, &self.scope, |_| true)
    }

    /// The value of a non-local symbol used as an expression.
    pub(super) fn symbol_value(
        &mut self,
        sym: SymbolId,
        dest: Option<SymbolId>,
    ) -> CompileResult<Lowered> {
        let symbol = self.model.symbol(sym);
        match (symbol.kind, symbol.storage) {
            (SymbolKind::TypeReference, strand_ir::Storage::Type(ty)) => Ok(Lowered::Type(ty)),
            (SymbolKind::Function, strand_ir::Storage::Type(_)) => Err(self.error(format!(
                "generic function `{}` must be called",
                symbol.full_name
            ))),
            (SymbolKind::Function, _) if symbol.flags.member && !symbol.flags.is_static => {
                Err(self.error(format!("`{}` needs a receiver", symbol.full_name)))
            }
            (SymbolKind::EnumMember, strand_ir::Storage::Variant(tag)) => {
                let enum_ty = symbol.ty;
                let name = symbol.full_name.clone();
                let has_payload = match self.model.kind(enum_ty) {
                    TypeKind::Enum(info) => info
                        .variant_by_tag(tag)
                        .is_some_and(|v| v.payload.is_some()),
                    _ => false,
                };
                if has_payload {
                    return Err(self.error(format!("variant `{name}` needs a payload")));
                }
                Ok(Lowered::Value(self.construct_variant(enum_ty, tag, None, dest)))
            }
            _ => Ok(Lowered::Value(sym)),
        }
    }

    pub(super) fn construct_variant(
        &mut self,
        enum_ty: TypeId,
        tag: i64,
        payload: Option<SymbolId>,
        dest: Option<SymbolId>,
    ) -> SymbolId {
        let dst = match dest {
            Some(d) if payload == Some(d) => self.temp(enum_ty),
            _ => self.slot(dest, enum_ty),
        };
        self.emit(Op::New { dst, ty: enum_ty });
        self.emit(Op::EnumTagWrite { value: dst, tag });
        if let Some(src) = payload {
            self.emit(Op::EnumPayloadWrite {
                value: dst,
                tag,
                src,
            });
        }
        dst
    }

    fn member_expr(
        &mut self,
        whole: &Expr,
        object: &Expr,
        name: &str,
        dest: Option<SymbolId>,
    ) -> CompileResult<Lowered> {
        if let Some(sym) = self.resolve_path(whole) {
            return self.symbol_value(sym, dest);
        }
        match self.lower(object, None, None)? {
            Lowered::Type(ty) => {
                let full = format!("{}.{name}", self.model.type_name(ty));
                self.loc = whole.loc;
                match self.model.named.get(&full).copied() {
                    Some(sym) => self.symbol_value(sym, dest),
                    None => Err(self.error(format!(
                        "`{}` has no static member `{name}`",
                        self.model.type_name(ty)
                    ))),
                }
            }
            Lowered::Value(obj) => {
                self.loc = whole.loc;
                self.read_member(obj, name, dest)
            }
            Lowered::Void => Err(self.error("expression has no value")),
        }
    }

    fn new_expr(
        &mut self,
        spec: &TypeSpec,
        fields: &[(String, Expr)],
        dest: Option<SymbolId>,
    ) -> CompileResult<Lowered> {
        let ty = self.model.resolve_type(spec, &self.scope, self.loc)?;
        let Some(info) = self.model.class_info(ty) else {
            return Err(self.error(format!(
                "`{}` is not a class",
                self.model.type_name(ty)
            )));
        };
        let layout: Vec<_> = info.fields.iter().map(|f| (f.name.clone(), f.ty)).collect();
        let initializer = info.initializer;

        let mut writes = Vec::with_capacity(fields.len());
        for (name, value) in fields {
            let Some(index) = layout.iter().position(|(n, _)| n == name) else {
                return Err(self.error(format!(
                    "`{}` has no field `{name}`",
                    self.model.type_name(ty)
                )));
            };
            if writes.iter().any(|(i, _)| *i == index) {
                return Err(self.error(format!("field `{name}` is initialized twice")));
            }
            let src = self.expr_to(value, layout[index].1)?;
            writes.push((index, src));
        }

        let dst = match dest {
            Some(d) if writes.iter().any(|(_, src)| *src == d) => self.temp(ty),
            _ => self.slot(dest, ty),
        };
        self.emit(Op::New { dst, ty });
        if let Some(init) = initializer {
            self.emit(Op::Call {
                dst: None,
                callee: Callee::Direct(init),
                args: vec![dst],
                mode: CallMode::Sync,
            });
        }
        for (index, src) in writes {
            self.emit(Op::MemberWrite {
                object: dst,
                field: strand_ir::FieldRef {
                    index: index as u32,
                },
                src,
            });
        }
        Ok(Lowered::Value(dst))
    }

    fn binary_expr(
        &mut self,
        op: BinOp,
        lhs: &Expr,
        rhs: &Expr,
        expected: Option<TypeId>,
        dest: Option<SymbolId>,
    ) -> CompileResult<Lowered> {
        let Some(ir_op) = binary_op(op) else {
            return self.logical_expr(op, lhs, rhs);
        };
        let loc = self.loc;
        let hint = if ir_op.is_comparison() { None } else { expected };
        let (l, r) = if is_numeric_literal(rhs) && !is_numeric_literal(lhs) {
            let l = self.expr_value(lhs, hint)?;
            let r = self.expr_value(rhs, Some(self.ty(l)))?;
            (l, r)
        } else if is_numeric_literal(lhs) && !is_numeric_literal(rhs) {
            let r = self.expr_value(rhs, hint)?;
            let l = self.expr_value(lhs, Some(self.ty(r)))?;
            (l, r)
        } else {
            let l = self.expr_value(lhs, hint)?;
            let r = self.expr_value(rhs, hint)?;
            (l, r)
        };
        self.loc = loc;
        let (lt, rt) = (self.ty(l), self.ty(r));

        let (l, r, operand_ty) = if matches!(ir_op, BinaryOp::Shl | BinaryOp::Shr) {
            let integer = |p: Option<Primitive>| p.is_some_and(Primitive::is_integer);
            if !integer(self.model.primitive(rt)) {
                return Err(self.error(format!(
                    "shift amount must be an integer, found `{}`",
                    self.model.type_name(rt)
                )));
            }
            (l, r, lt)
        } else {
            let Some(common) = self.model.common_type(lt, rt) else {
                return Err(self.error(format!(
                    "operator `{}` cannot combine `{}` and `{}`",
                    op.symbol(),
                    self.model.type_name(lt),
                    self.model.type_name(rt)
                )));
            };
            (self.coerce(l, common)?, self.coerce(r, common)?, common)
        };

        let prim = self.model.primitive(operand_ty);
        if !accepts(ir_op, prim) {
            return Err(self.error(format!(
                "operator `{}` is not defined for `{}`",
                op.symbol(),
                self.model.type_name(operand_ty)
            )));
        }
        let operand = match prim {
            Some(p) => OperandKind::Primitive(p),
            None => OperandKind::Reference,
        };
        let result = if ir_op.is_comparison() {
            self.model.prim(Primitive::Bool)
        } else {
            operand_ty
        };
        let dst = self.slot(dest, result);
        self.emit(Op::Binary {
            dst,
            op: ir_op,
            lhs: l,
            rhs: r,
            operand,
        });
        Ok(Lowered::Value(dst))
    }

    /// `&&` and `||` evaluate the right operand only when the left one does not decide.
    fn logical_expr(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr) -> CompileResult<Lowered> {
        let bool_ty = self.model.prim(Primitive::Bool);
        let result = self.temp(bool_ty);
        self.expr_into(lhs, result)?;
        let end = self.new_label();
        self.emit(Op::Branch {
            cond: result,
            when: op == BinOp::Or,
            target: end.clone(),
        });
        self.expr_into(rhs, result)?;
        self.place(end);
        Ok(Lowered::Value(result))
    }

    fn unary_expr(
        &mut self,
        op: UnOp,
        operand: &Expr,
        expected: Option<TypeId>,
        dest: Option<SymbolId>,
    ) -> CompileResult<Lowered> {
        if let (UnOp::Neg, ExprKind::Literal(LiteralExpr::Int { value, ty })) =
            (op, &operand.kind)
        {
            if !ty.is_some_and(Primitive::is_unsigned) {
                return self.negative_literal(*value, *ty, expected, dest);
            }
        }
        let bool_ty = self.model.prim(Primitive::Bool);
        let hint = if op == UnOp::Not { Some(bool_ty) } else { expected };
        let src = self.expr_value(operand, hint)?;
        let ty = self.ty(src);
        let prim = self.model.primitive(ty);
        let (ir_op, ok) = match op {
            UnOp::Neg => (UnaryOp::Neg, prim.is_some_and(Primitive::is_numeric)),
            UnOp::Not => (UnaryOp::Not, prim == Some(Primitive::Bool)),
            UnOp::BitNot => (UnaryOp::BitNot, prim.is_some_and(Primitive::is_integer)),
        };
        let (true, Some(prim)) = (ok, prim) else {
            return Err(self.error(format!(
                "operator `{}` is not defined for `{}`",
                ir_op.name(),
                self.model.type_name(ty)
            )));
        };
        let dst = self.slot(dest, ty);
        self.emit(Op::Unary {
            dst,
            op: ir_op,
            src,
            operand: prim,
        });
        Ok(Lowered::Value(dst))
    }

    /// `-value` lowered as one literal, so the range check sees the sign.
    fn negative_literal(
        &mut self,
        value: u64,
        ty: Option<Primitive>,
        expected: Option<TypeId>,
        dest: Option<SymbolId>,
    ) -> CompileResult<Lowered> {
        let expected_prim = expected.and_then(|ty| self.model.primitive(ty));
        let prim = match ty.or_else(|| {
            expected_prim.filter(|p| p.is_float() || (p.is_integer() && fits_negated(value, *p)))
        }) {
            Some(prim) => prim,
            None if fits_negated(value, Primitive::I32) => Primitive::I32,
            None if fits_negated(value, Primitive::I64) => Primitive::I64,
            None => return Err(self.error(format!("integer literal `-{value}` is out of range"))),
        };
        if prim.is_integer() && !fits_negated(value, prim) {
            return Err(self.error(format!("integer literal `-{value}` does not fit `{prim}`")));
        }
        let literal = if prim.is_float() {
            Literal::Float(-(value as f64))
        } else if prim.is_unsigned() {
            Literal::UInt(0)
        } else {
            Literal::Int((value as i64).wrapping_neg())
        };
        let ty = self.model.prim(prim);
        let dst = self.slot(dest, ty);
        self.emit(Op::Literal { dst, value: literal });
        Ok(Lowered::Value(dst))
    }

    fn cast_expr(
        &mut self,
        value: &Expr,
        spec: &TypeSpec,
        dest: Option<SymbolId>,
    ) -> CompileResult<Lowered> {
        let target = self.model.resolve_type(spec, &self.scope, self.loc)?;
        let loc = self.loc;
        let src = self.expr_value(value, None)?;
        self.loc = loc;
        let from = self.ty(src);
        if from == target {
            return Ok(Lowered::Value(src));
        }
        let Some(kind) = self.model.explicit_cast_kind(from, target) else {
            return Err(self.error(format!(
                "cannot cast `{}` to `{}`",
                self.model.type_name(from),
                self.model.type_name(target)
            )));
        };
        let dst = self.slot(dest, target);
        self.emit(Op::Cast { dst, src, kind });
        Ok(Lowered::Value(dst))
    }

    fn is_expr(
        &mut self,
        value: &Expr,
        target: &TypeSpec,
        dest: Option<SymbolId>,
    ) -> CompileResult<Lowered> {
        let loc = self.loc;
        let src = self.expr_value(value, None)?;
        self.loc = loc;
        let ty = self.ty(src);
        let bool_ty = self.model.prim(Primitive::Bool);

        match self.model.kind(ty).clone() {
            TypeKind::Enum(info) => {
                let TypeSpec::Named { path, args } = target else {
                    return Err(self.error("`is` on an enum needs a variant name"));
                };
                let (prefix, variant) = match path.rsplit_once('.') {
                    Some((prefix, variant)) => (Some(prefix), variant),
                    None => (None, path.as_str()),
                };
                let Some(tag) = info.variant(variant).map(|v| v.tag) else {
                    return Err(self.error(format!(
                        "`{}` has no variant `{variant}`",
                        self.model.type_name(ty)
                    )));
                };
                if let Some(prefix) = prefix {
                    let named = match args.is_empty() {
                        true => self.model.lookup_type(prefix, &self.scope),
                        false => None,
                    };
                    let origin = self.model.type_def(ty).generic_origin;
                    if named.is_none() || (named != Some(ty) && named != origin) {
                        return Err(self.error(format!(
                            "`{}` is not a variant of `{}`",
                            path,
                            self.model.type_name(ty)
                        )));
                    }
                }
                let i64_ty = self.model.prim(Primitive::I64);
                let actual = self.temp(i64_ty);
                self.emit(Op::EnumTagRead {
                    dst: actual,
                    value: src,
                });
                let expected = self.temp(i64_ty);
                self.emit(Op::Literal {
                    dst: expected,
                    value: Literal::Int(tag),
                });
                let dst = self.slot(dest, bool_ty);
                self.emit(Op::Binary {
                    dst,
                    op: BinaryOp::Eq,
                    lhs: actual,
                    rhs: expected,
                    operand: OperandKind::Primitive(Primitive::I64),
                });
                Ok(Lowered::Value(dst))
            }
            TypeKind::Interface(_) => {
                let target = self.model.resolve_type(target, &self.scope, self.loc)?;
                if self.model.class_info(target).is_none()
                    && self.model.interface_info(target).is_none()
                {
                    return Err(self.error(format!(
                        "`{}` is not a class or interface",
                        self.model.type_name(target)
                    )));
                }
                let dst = self.slot(dest, bool_ty);
                self.emit(Op::Cast {
                    dst,
                    src,
                    kind: CastKind::Test { target },
                });
                Ok(Lowered::Value(dst))
            }
            TypeKind::Class(_) => {
                let target = self.model.resolve_type(target, &self.scope, self.loc)?;
                let result = self.model.can_implicitly_cast(ty, target);
                let dst = self.slot(dest, bool_ty);
                self.emit(Op::Literal {
                    dst,
                    value: Literal::Bool(result),
                });
                Ok(Lowered::Value(dst))
            }
            _ => Err(self.error(format!(
                "`is` needs an enum, class or interface value, found `{}`",
                self.model.type_name(ty)
            ))),
        }
    }

    /// `wait` on a call, a future or an event.
    pub(super) fn wait_expr(&mut self, inner: &Expr, dest: Option<SymbolId>) -> CompileResult<Lowered> {
        let future = match &inner.kind {
            ExprKind::Call {
                callee,
                generic_args,
                args,
            } => match self.call_expr(callee, generic_args, args, CallMode::Async, None)? {
                Lowered::Value(f) => f,
                _ => return Err(self.error("`wait` needs a value")),
            },
            _ => {
                let value = self.expr_value(inner, None)?;
                let ty = self.ty(value);
                match *self.model.kind(ty) {
                    TypeKind::Future(_) => value,
                    TypeKind::Event(payload) => {
                        let future_ty = self.model.future_type(payload);
                        let future = self.temp(future_ty);
                        self.emit(Op::Call {
                            dst: Some(future),
                            callee: Callee::Intrinsic(Intrinsic::EventListen),
                            args: vec![value],
                            mode: CallMode::Sync,
                        });
                        future
                    }
                    _ => {
                        return Err(self.error(format!(
                            "cannot wait on a value of type `{}`",
                            self.model.type_name(ty)
                        )))
                    }
                }
            }
        };
        self.wait_on(future, dest)
    }

    /// Blocks the enclosing routine until `future` is ready, then reads its value.
    fn wait_on(&mut self, future: SymbolId, dest: Option<SymbolId>) -> CompileResult<Lowered> {
        let future_ty = self.ty(future);
        let TypeKind::Future(value_ty) = *self.model.kind(future_ty) else {
            return Err(self.error("`wait` needs a future"));
        };
        let bool_ty = self.model.prim(Primitive::Bool);
        let begin = self.new_label();
        let done = self.new_label();
        let ready = self.temp(bool_ty);

        self.place(begin.clone());
        self.emit(Op::Call {
            dst: Some(ready),
            callee: Callee::Intrinsic(Intrinsic::FutureReady),
            args: vec![future],
            mode: CallMode::Sync,
        });
        self.emit(Op::Branch {
            cond: ready,
            when: true,
            target: done.clone(),
        });
        self.emit(Op::Return {
            value: None,
            status: ReturnStatus::Blocked,
        });
        self.emit(Op::Jump { target: begin });
        self.place(done);

        if self.model.is_void(value_ty) {
            return Ok(Lowered::Void);
        }
        let dst = self.slot(dest, value_ty);
        self.emit(Op::Call {
            dst: Some(dst),
            callee: Callee::Intrinsic(Intrinsic::FutureResult),
            args: vec![future],
            mode: CallMode::Sync,
        });
        Ok(Lowered::Value(dst))
    }

    fn lambda_expr(&mut self, lambda: &LambdaExpr, dest: Option<SymbolId>) -> CompileResult<Lowered> {
        let loc = self.loc;
        let params = lambda
            .params
            .iter()
            .map(|p| self.model.resolve_type(&p.ty, &self.scope, p.loc))
            .collect::<CompileResult<Vec<_>>>()?;
        let ret = match &lambda.ret {
            Some(spec) => self.model.resolve_type(spec, &self.scope, loc)?,
            None => self.model.void(),
        };
        let sig = self.model.fn_type(params.clone(), ret, false);

        let name = format!("{}$lambda{}", self.name, self.next_lambda);
        self.next_lambda += 1;
        let mut container = CodeContainer::new(name, ContainerKind::Lambda, ret);
        container.owner = self.scope.owner;
        container.is_generator = matches!(self.model.kind(ret), TypeKind::Generator(_));
        let cid = self.model.add_container(container, loc)?;
        let mut param_ids = Vec::with_capacity(params.len());
        for (idx, (param, ty)) in lambda.params.iter().zip(params).enumerate() {
            let id = self.model.add_local(
                cid,
                param.name.clone(),
                &param.name,
                ty,
                param.readonly,
                1,
                SymbolFlags {
                    param: true,
                    ..SymbolFlags::default()
                },
            );
            self.model.symbol_mut(id).param_index = Some(idx as u32);
            param_ids.push(id);
        }
        self.model.container_mut(cid).params = param_ids;

        let visible = self.visible_names();
        let scope = self.scope.clone();
        let captured = {
            let mut nested = FunctionLowerer::new(&mut *self.model, cid, scope, visible);
            nested.loc = loc;
            nested.block(&lambda.body)?;
            nested.finish()?
        };

        self.loc = loc;
        let mut args = Vec::with_capacity(captured.len());
        for name in &captured {
            match self.lookup_local(name) {
                Some(sym) => args.push(sym),
                None => return Err(self.error(format!("cannot capture `{name}`"))),
            }
        }
        let dst = self.slot(dest, sig);
        self.emit(Op::Call {
            dst: Some(dst),
            callee: Callee::Intrinsic(Intrinsic::Closure(cid)),
            args,
            mode: CallMode::Sync,
        });
        Ok(Lowered::Value(dst))
    }
}
