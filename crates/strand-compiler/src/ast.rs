//! The syntax tree handed over by the front end.
//!
//! Nodes carry a [`SourceLocation`]; scope depth is derived from block nesting during lowering.
//! The constructor helpers at the bottom of this module exist so embedders (and tests) can
//! build programs without a parser.

use std::fmt;

pub use strand_ir::{Primitive, SourceLocation};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Program {
    pub items: Vec<Item>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    Function(FnDecl),
    Class(ClassDecl),
    Interface(InterfaceDecl),
    Enum(EnumDecl),
    Routine(RoutineDecl),
    Global(GlobalDecl),
    Event(EventDecl),
    Namespace(NamespaceDecl),
    Import(ImportDecl),
}

pub type Block = Vec<Stmt>;

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeSpec,
    pub readonly: bool,
    pub loc: SourceLocation,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FnDecl {
    pub name: String,
    pub generics: Vec<String>,
    pub params: Vec<Param>,
    /// `None` means `void`.
    pub ret: Option<TypeSpec>,
    pub is_async: bool,
    pub is_static: bool,
    pub is_extern: bool,
    /// `None` for extern functions and abstract interface methods.
    pub body: Option<Block>,
    pub loc: SourceLocation,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeSpec,
    pub readonly: bool,
    pub is_static: bool,
    pub init: Option<Expr>,
    pub loc: SourceLocation,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImplBlock {
    pub interface: TypeSpec,
    pub methods: Vec<FnDecl>,
    pub loc: SourceLocation,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ClassMember {
    Field(FieldDecl),
    Method(FnDecl),
    Implements(ImplBlock),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub generics: Vec<String>,
    /// Members in declaration order.
    pub members: Vec<ClassMember>,
    pub loc: SourceLocation,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InterfaceDecl {
    pub name: String,
    pub generics: Vec<String>,
    pub supers: Vec<TypeSpec>,
    pub methods: Vec<FnDecl>,
    pub loc: SourceLocation,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VariantDecl {
    pub name: String,
    pub value: Option<i64>,
    pub payload: Option<TypeSpec>,
    pub loc: SourceLocation,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumDecl {
    pub name: String,
    pub generics: Vec<String>,
    pub variants: Vec<VariantDecl>,
    pub loc: SourceLocation,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RoutineDecl {
    pub name: String,
    pub body: Block,
    pub loc: SourceLocation,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GlobalDecl {
    pub name: String,
    pub ty: Option<TypeSpec>,
    pub readonly: bool,
    pub init: Option<Expr>,
    pub loc: SourceLocation,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EventDecl {
    pub name: String,
    pub payload: Option<TypeSpec>,
    pub loc: SourceLocation,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NamespaceDecl {
    /// May be dotted (`a.b`).
    pub name: String,
    pub items: Vec<Item>,
    pub loc: SourceLocation,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImportDecl {
    pub path: String,
    pub loc: SourceLocation,
}

/// A declared-type specifier as written in source.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeSpec {
    Named {
        path: String,
        args: Vec<TypeSpec>,
    },
    Function {
        params: Vec<TypeSpec>,
        ret: Box<TypeSpec>,
        is_async: bool,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub loc: SourceLocation,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    Let {
        name: String,
        readonly: bool,
        ty: Option<TypeSpec>,
        init: Option<Expr>,
    },
    Assign {
        target: Expr,
        value: Expr,
    },
    Expr(Expr),
    If {
        cond: Expr,
        then_block: Block,
        else_block: Option<Block>,
    },
    While {
        cond: Expr,
        body: Block,
    },
    For {
        var: String,
        iter: Expr,
        body: Block,
    },
    Break,
    Continue,
    Return(Option<Expr>),
    Yield(Option<Expr>),
    Wait(Option<Expr>),
    Emit {
        event: Expr,
        arg: Option<Expr>,
    },
    Block(Block),
}

#[derive(Clone, Debug, PartialEq)]
pub enum LiteralExpr {
    Bool(bool),
    Int { value: u64, ty: Option<Primitive> },
    Float { value: f64, ty: Option<Primitive> },
    Str(String),
    Char(char),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnOp {
    Neg,
    Not,
    BitNot,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LambdaExpr {
    pub params: Vec<Param>,
    pub ret: Option<TypeSpec>,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub loc: SourceLocation,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Literal(LiteralExpr),
    Name(String),
    This,
    Member {
        object: Box<Expr>,
        name: String,
    },
    Call {
        callee: Box<Expr>,
        generic_args: Vec<TypeSpec>,
        args: Vec<Expr>,
    },
    New {
        ty: TypeSpec,
        fields: Vec<(String, Expr)>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    Cast {
        value: Box<Expr>,
        ty: TypeSpec,
    },
    /// `value is E.variant` for enums, `value is T` for interface values.
    Is {
        value: Box<Expr>,
        target: TypeSpec,
    },
    Async(Box<Expr>),
    Wait(Box<Expr>),
    Lambda(LambdaExpr),
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSpec::Named { path, args } => {
                f.write_str(path)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (idx, arg) in args.iter().enumerate() {
                        if idx > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            TypeSpec::Function {
                params,
                ret,
                is_async,
            } => {
                if *is_async {
                    f.write_str("async ")?;
                }
                f.write_str("fn(")?;
                for (idx, param) in params.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ") -> {ret}")
            }
        }
    }
}

impl TypeSpec {
    pub fn named(path: impl Into<String>) -> Self {
        TypeSpec::Named {
            path: path.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(path: impl Into<String>, args: Vec<TypeSpec>) -> Self {
        TypeSpec::Named {
            path: path.into(),
            args,
        }
    }

    /// Parses the textual specifier forms `i32`, `a.b.C`, `Box<i32>`, `fn(i32) -> bool` and
    /// `async fn() -> i32`.
    pub fn parse(text: &str) -> Result<TypeSpec, String> {
        let mut parser = TypeParser {
            chars: text.chars().collect(),
            pos: 0,
        };
        let parsed = parser.type_spec()?;
        parser.skip_ws();
        if parser.pos != parser.chars.len() {
            return Err(format!("unexpected trailing input in type `{text}`"));
        }
        Ok(parsed)
    }

    /// Like [`TypeSpec::parse`], but keeps unparsable text as a plain path so resolution reports
    /// it as an unknown type.
    pub fn from_text(text: &str) -> Self {
        TypeSpec::parse(text).unwrap_or_else(|_| TypeSpec::named(text))
    }
}

struct TypeParser {
    chars: Vec<char>,
    pos: usize,
}

impl TypeParser {
    fn skip_ws(&mut self) {
        while self.chars.get(self.pos).is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: &str) -> bool {
        self.skip_ws();
        let end = self.pos + expected.chars().count();
        if end > self.chars.len() {
            return false;
        }
        let matches = self.chars[self.pos..end].iter().copied().eq(expected.chars());
        if matches {
            self.pos = end;
        }
        matches
    }

    fn expect(&mut self, expected: &str) -> Result<(), String> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(format!("expected `{expected}` at offset {}", self.pos))
        }
    }

    fn ident(&mut self) -> Result<String, String> {
        self.skip_ws();
        let start = self.pos;
        while self
            .chars
            .get(self.pos)
            .is_some_and(|c| c.is_alphanumeric() || *c == '_')
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(format!("expected identifier at offset {start}"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn type_spec(&mut self) -> Result<TypeSpec, String> {
        let is_async = self.keyword("async");
        if is_async || self.keyword("fn") {
            if is_async && !self.keyword("fn") {
                return Err("expected `fn` after `async`".to_string());
            }
            self.expect("(")?;
            let mut params = Vec::new();
            if !self.eat(")") {
                loop {
                    params.push(self.type_spec()?);
                    if self.eat(")") {
                        break;
                    }
                    self.expect(",")?;
                }
            }
            let ret = if self.eat("->") {
                self.type_spec()?
            } else {
                TypeSpec::named("void")
            };
            return Ok(TypeSpec::Function {
                params,
                ret: Box::new(ret),
                is_async,
            });
        }

        let mut path = self.ident()?;
        while self.eat(".") {
            path.push('.');
            path.push_str(&self.ident()?);
        }
        let mut args = Vec::new();
        if self.eat("<") {
            loop {
                args.push(self.type_spec()?);
                if self.eat(">") {
                    break;
                }
                self.expect(",")?;
            }
        }
        Ok(TypeSpec::Named { path, args })
    }

    fn keyword(&mut self, word: &str) -> bool {
        let save = self.pos;
        if !self.eat(word) {
            return false;
        }
        let boundary = self
            .chars
            .get(self.pos)
            .map_or(true, |c| !(c.is_alphanumeric() || *c == '_'));
        if !boundary {
            self.pos = save;
        }
        boundary
    }
}

// Construction helpers.

impl Program {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }
}

impl Param {
    pub fn new(name: impl Into<String>, ty: &str) -> Self {
        Self {
            name: name.into(),
            ty: TypeSpec::from_text(ty),
            readonly: true,
            loc: SourceLocation::default(),
        }
    }

    pub fn mutable(mut self) -> Self {
        self.readonly = false;
        self
    }
}

impl FnDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generics: Vec::new(),
            params: Vec::new(),
            ret: None,
            is_async: false,
            is_static: false,
            is_extern: false,
            body: None,
            loc: SourceLocation::default(),
        }
    }

    pub fn generic(mut self, name: impl Into<String>) -> Self {
        self.generics.push(name.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, ty: &str) -> Self {
        self.params.push(Param::new(name, ty));
        self
    }

    pub fn mut_param(mut self, name: impl Into<String>, ty: &str) -> Self {
        self.params.push(Param::new(name, ty).mutable());
        self
    }

    pub fn returns(mut self, ty: &str) -> Self {
        self.ret = Some(TypeSpec::from_text(ty));
        self
    }

    pub fn asynchronous(mut self) -> Self {
        self.is_async = true;
        self
    }

    pub fn statik(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn external(mut self) -> Self {
        self.is_extern = true;
        self
    }

    pub fn body(mut self, stmts: Vec<Stmt>) -> Self {
        self.body = Some(stmts);
        self
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.loc = SourceLocation::new(line, column);
        self
    }
}

impl ClassDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generics: Vec::new(),
            members: Vec::new(),
            loc: SourceLocation::default(),
        }
    }

    pub fn generic(mut self, name: impl Into<String>) -> Self {
        self.generics.push(name.into());
        self
    }

    fn push_field(mut self, name: String, ty: &str, readonly: bool, init: Option<Expr>) -> Self {
        self.members.push(ClassMember::Field(FieldDecl {
            name,
            ty: TypeSpec::from_text(ty),
            readonly,
            is_static: false,
            init,
            loc: SourceLocation::default(),
        }));
        self
    }

    pub fn field(self, name: impl Into<String>, ty: &str) -> Self {
        self.push_field(name.into(), ty, false, None)
    }

    pub fn field_init(self, name: impl Into<String>, ty: &str, init: Expr) -> Self {
        self.push_field(name.into(), ty, false, Some(init))
    }

    pub fn readonly_field(self, name: impl Into<String>, ty: &str) -> Self {
        self.push_field(name.into(), ty, true, None)
    }

    pub fn static_field(mut self, name: impl Into<String>, ty: &str, init: Option<Expr>) -> Self {
        self.members.push(ClassMember::Field(FieldDecl {
            name: name.into(),
            ty: TypeSpec::from_text(ty),
            readonly: false,
            is_static: true,
            init,
            loc: SourceLocation::default(),
        }));
        self
    }

    pub fn method(mut self, method: FnDecl) -> Self {
        self.members.push(ClassMember::Method(method));
        self
    }

    pub fn implements(mut self, interface: &str, methods: Vec<FnDecl>) -> Self {
        self.members.push(ClassMember::Implements(ImplBlock {
            interface: TypeSpec::from_text(interface),
            methods,
            loc: SourceLocation::default(),
        }));
        self
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.loc = SourceLocation::new(line, column);
        self
    }
}

impl InterfaceDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generics: Vec::new(),
            supers: Vec::new(),
            methods: Vec::new(),
            loc: SourceLocation::default(),
        }
    }

    pub fn generic(mut self, name: impl Into<String>) -> Self {
        self.generics.push(name.into());
        self
    }

    pub fn extends(mut self, interface: &str) -> Self {
        self.supers.push(TypeSpec::from_text(interface));
        self
    }

    pub fn method(mut self, method: FnDecl) -> Self {
        self.methods.push(method);
        self
    }
}

impl EnumDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generics: Vec::new(),
            variants: Vec::new(),
            loc: SourceLocation::default(),
        }
    }

    pub fn generic(mut self, name: impl Into<String>) -> Self {
        self.generics.push(name.into());
        self
    }

    pub fn variant(mut self, name: impl Into<String>) -> Self {
        self.variants.push(VariantDecl {
            name: name.into(),
            value: None,
            payload: None,
            loc: SourceLocation::default(),
        });
        self
    }

    pub fn variant_with(mut self, name: impl Into<String>, payload: &str) -> Self {
        self.variants.push(VariantDecl {
            name: name.into(),
            value: None,
            payload: Some(TypeSpec::from_text(payload)),
            loc: SourceLocation::default(),
        });
        self
    }

    pub fn variant_valued(mut self, name: impl Into<String>, value: i64) -> Self {
        self.variants.push(VariantDecl {
            name: name.into(),
            value: Some(value),
            payload: None,
            loc: SourceLocation::default(),
        });
        self
    }
}

impl RoutineDecl {
    pub fn new(name: impl Into<String>, body: Vec<Stmt>) -> Self {
        Self {
            name: name.into(),
            body,
            loc: SourceLocation::default(),
        }
    }
}

impl GlobalDecl {
    pub fn new(name: impl Into<String>, ty: Option<&str>, init: Option<Expr>) -> Self {
        Self {
            name: name.into(),
            ty: ty.map(TypeSpec::from_text),
            readonly: false,
            init,
            loc: SourceLocation::default(),
        }
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }
}

impl EventDecl {
    pub fn new(name: impl Into<String>, payload: Option<&str>) -> Self {
        Self {
            name: name.into(),
            payload: payload.map(TypeSpec::from_text),
            loc: SourceLocation::default(),
        }
    }
}

impl NamespaceDecl {
    pub fn new(name: impl Into<String>, items: Vec<Item>) -> Self {
        Self {
            name: name.into(),
            items,
            loc: SourceLocation::default(),
        }
    }
}

impl ImportDecl {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            loc: SourceLocation::default(),
        }
    }
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Self {
            kind,
            loc: SourceLocation::default(),
        }
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.loc = SourceLocation::new(line, column);
        self
    }

    /// `let name = init;` (readonly).
    pub fn let_(name: impl Into<String>, init: Expr) -> Self {
        Self::new(StmtKind::Let {
            name: name.into(),
            readonly: true,
            ty: None,
            init: Some(init),
        })
    }

    /// `var name = init;` (mutable).
    pub fn var(name: impl Into<String>, init: Expr) -> Self {
        Self::new(StmtKind::Let {
            name: name.into(),
            readonly: false,
            ty: None,
            init: Some(init),
        })
    }

    /// `var name: ty = init;`
    pub fn var_typed(name: impl Into<String>, ty: &str, init: Option<Expr>) -> Self {
        Self::new(StmtKind::Let {
            name: name.into(),
            readonly: false,
            ty: Some(TypeSpec::from_text(ty)),
            init,
        })
    }

    /// `let name: ty = init;`
    pub fn let_typed(name: impl Into<String>, ty: &str, init: Expr) -> Self {
        Self::new(StmtKind::Let {
            name: name.into(),
            readonly: true,
            ty: Some(TypeSpec::from_text(ty)),
            init: Some(init),
        })
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Self::new(StmtKind::Assign { target, value })
    }

    pub fn expr(expr: Expr) -> Self {
        Self::new(StmtKind::Expr(expr))
    }

    pub fn if_(cond: Expr, then_block: Vec<Stmt>, else_block: Option<Vec<Stmt>>) -> Self {
        Self::new(StmtKind::If {
            cond,
            then_block,
            else_block,
        })
    }

    pub fn while_(cond: Expr, body: Vec<Stmt>) -> Self {
        Self::new(StmtKind::While { cond, body })
    }

    pub fn for_(var: impl Into<String>, iter: Expr, body: Vec<Stmt>) -> Self {
        Self::new(StmtKind::For {
            var: var.into(),
            iter,
            body,
        })
    }

    pub fn break_() -> Self {
        Self::new(StmtKind::Break)
    }

    pub fn continue_() -> Self {
        Self::new(StmtKind::Continue)
    }

    pub fn ret(value: Option<Expr>) -> Self {
        Self::new(StmtKind::Return(value))
    }

    pub fn yield_(value: Option<Expr>) -> Self {
        Self::new(StmtKind::Yield(value))
    }

    pub fn wait(value: Option<Expr>) -> Self {
        Self::new(StmtKind::Wait(value))
    }

    pub fn emit(event: Expr, arg: Option<Expr>) -> Self {
        Self::new(StmtKind::Emit { event, arg })
    }

    pub fn block(stmts: Vec<Stmt>) -> Self {
        Self::new(StmtKind::Block(stmts))
    }
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self {
            kind,
            loc: SourceLocation::default(),
        }
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.loc = SourceLocation::new(line, column);
        self
    }

    pub fn bool(value: bool) -> Self {
        Self::new(ExprKind::Literal(LiteralExpr::Bool(value)))
    }

    pub fn int(value: u64) -> Self {
        Self::new(ExprKind::Literal(LiteralExpr::Int { value, ty: None }))
    }

    pub fn typed_int(value: u64, ty: Primitive) -> Self {
        Self::new(ExprKind::Literal(LiteralExpr::Int {
            value,
            ty: Some(ty),
        }))
    }

    pub fn float(value: f64) -> Self {
        Self::new(ExprKind::Literal(LiteralExpr::Float { value, ty: None }))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(ExprKind::Literal(LiteralExpr::Str(value.into())))
    }

    pub fn char(value: char) -> Self {
        Self::new(ExprKind::Literal(LiteralExpr::Char(value)))
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self::new(ExprKind::Name(name.into()))
    }

    pub fn this() -> Self {
        Self::new(ExprKind::This)
    }

    pub fn member(self, name: impl Into<String>) -> Self {
        let loc = self.loc;
        Self {
            kind: ExprKind::Member {
                object: Box::new(self),
                name: name.into(),
            },
            loc,
        }
    }

    pub fn call(self, args: Vec<Expr>) -> Self {
        self.call_generic(Vec::new(), args)
    }

    pub fn call_generic(self, generic_args: Vec<TypeSpec>, args: Vec<Expr>) -> Self {
        let loc = self.loc;
        Self {
            kind: ExprKind::Call {
                callee: Box::new(self),
                generic_args,
                args,
            },
            loc,
        }
    }

    /// `self.name(args)`
    pub fn method(self, name: impl Into<String>, args: Vec<Expr>) -> Self {
        self.member(name).call(args)
    }

    pub fn new_object(ty: &str, fields: Vec<(&str, Expr)>) -> Self {
        Self::new(ExprKind::New {
            ty: TypeSpec::from_text(ty),
            fields: fields
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        })
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        let loc = lhs.loc;
        Self {
            kind: ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            loc,
        }
    }

    pub fn unary(op: UnOp, operand: Expr) -> Self {
        let loc = operand.loc;
        Self {
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            loc,
        }
    }

    pub fn cast(self, ty: &str) -> Self {
        let loc = self.loc;
        Self {
            kind: ExprKind::Cast {
                value: Box::new(self),
                ty: TypeSpec::from_text(ty),
            },
            loc,
        }
    }

    pub fn is(self, target: &str) -> Self {
        let loc = self.loc;
        Self {
            kind: ExprKind::Is {
                value: Box::new(self),
                target: TypeSpec::from_text(target),
            },
            loc,
        }
    }

    pub fn asynchronous(call: Expr) -> Self {
        let loc = call.loc;
        Self {
            kind: ExprKind::Async(Box::new(call)),
            loc,
        }
    }

    pub fn wait(value: Expr) -> Self {
        let loc = value.loc;
        Self {
            kind: ExprKind::Wait(Box::new(value)),
            loc,
        }
    }

    pub fn lambda(params: Vec<Param>, ret: Option<&str>, body: Vec<Stmt>) -> Self {
        Self::new(ExprKind::Lambda(LambdaExpr {
            params,
            ret: ret.map(TypeSpec::from_text),
            body,
        }))
    }
}
