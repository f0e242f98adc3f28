#![forbid(unsafe_code)]

//! The frozen program representation shared by the Strand compiler and virtual machine.
//!
//! A [`Program`] is produced once by lowering and never mutated afterwards. Every table is
//! addressed by a dense newtype index so the interpreter never performs string lookups on hot
//! paths.

use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod dump;

#[cfg(feature = "serde")]
mod artifact;
#[cfg(feature = "serde")]
pub use artifact::{load_program, to_bytes, LoadError, SaveError};

/// Discriminant of the built-in `Option` enum's `none` variant.
pub const OPTION_NONE_TAG: i64 = 0;
/// Discriminant of the built-in `Option` enum's `some` variant.
pub const OPTION_SOME_TAG: i64 = 1;

/// A stable identifier for a type within a [`Program`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TypeId(pub u32);

/// A stable identifier for a symbol within a [`Program`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SymbolId(pub u32);

/// A stable identifier for a code container (function, method, routine, lambda, initializer).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContainerId(pub u32);

/// A stable identifier for a (class, interface) dispatch table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VTableId(pub u32);

/// A jump target name, unique within its code container.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Label(pub String);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A position in the source text the AST was built from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Built-in value types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Primitive {
    Void,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Str,
    Char,
}

impl Primitive {
    pub const ALL: [Primitive; 14] = [
        Primitive::Void,
        Primitive::Bool,
        Primitive::I8,
        Primitive::I16,
        Primitive::I32,
        Primitive::I64,
        Primitive::U8,
        Primitive::U16,
        Primitive::U32,
        Primitive::U64,
        Primitive::F32,
        Primitive::F64,
        Primitive::Str,
        Primitive::Char,
    ];

    /// The source spelling of this primitive.
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Void => "void",
            Primitive::Bool => "bool",
            Primitive::I8 => "i8",
            Primitive::I16 => "i16",
            Primitive::I32 => "i32",
            Primitive::I64 => "i64",
            Primitive::U8 => "u8",
            Primitive::U16 => "u16",
            Primitive::U32 => "u32",
            Primitive::U64 => "u64",
            Primitive::F32 => "f32",
            Primitive::F64 => "f64",
            Primitive::Str => "string",
            Primitive::Char => "char",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            Primitive::I8 | Primitive::I16 | Primitive::I32 | Primitive::I64
        )
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            Primitive::U8 | Primitive::U16 | Primitive::U32 | Primitive::U64
        )
    }

    pub fn is_integer(self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub fn is_float(self) -> bool {
        matches!(self, Primitive::F32 | Primitive::F64)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Storage width in bits for numeric primitives, `0` otherwise.
    pub fn bit_width(self) -> u32 {
        match self {
            Primitive::I8 | Primitive::U8 => 8,
            Primitive::I16 | Primitive::U16 => 16,
            Primitive::I32 | Primitive::U32 | Primitive::F32 => 32,
            Primitive::I64 | Primitive::U64 | Primitive::F64 => 64,
            _ => 0,
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parameter/return signature for function types.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FunctionSig {
    pub params: Vec<TypeId>,
    pub ret: TypeId,
    pub is_async: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldInfo {
    pub name: String,
    pub ty: TypeId,
    pub readonly: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClassInfo {
    /// Instance fields in storage order.
    pub fields: Vec<FieldInfo>,
    /// Every interface the class implements, including those reached transitively.
    pub interfaces: Vec<TypeId>,
    /// One dispatch table per entry in `interfaces`.
    pub vtables: Vec<(TypeId, VTableId)>,
    /// Runs the field initializers of a freshly allocated instance.
    pub initializer: Option<ContainerId>,
}

impl ClassInfo {
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// One dispatch slot of an interface.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InterfaceMethod {
    pub name: String,
    /// Function type of the method, excluding the receiver.
    pub sig: TypeId,
    /// The interface whose declaration supplies this slot's current definition.
    pub declared_in: TypeId,
    /// Default body, if the declaring interface provides one.
    pub default: Option<ContainerId>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InterfaceInfo {
    /// Every interface this one implements, including those reached transitively.
    pub supers: Vec<TypeId>,
    /// Dispatch slots; inherited slots come first.
    pub methods: Vec<InterfaceMethod>,
}

impl InterfaceInfo {
    pub fn slot(&self, name: &str) -> Option<usize> {
        self.methods.iter().position(|m| m.name == name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnumVariant {
    pub name: String,
    pub tag: i64,
    pub payload: Option<TypeId>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnumInfo {
    pub variants: Vec<EnumVariant>,
}

impl EnumInfo {
    pub fn variant(&self, name: &str) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.name == name)
    }

    pub fn variant_by_tag(&self, tag: i64) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.tag == tag)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TypeKind {
    Primitive(Primitive),
    Function(FunctionSig),
    Class(ClassInfo),
    Interface(InterfaceInfo),
    Enum(EnumInfo),
    /// A type used as a value, e.g. the `Color` in `Color.red`.
    TypeRef(TypeId),
    Generator(TypeId),
    Future(TypeId),
    Event(TypeId),
    /// A generic declaration that has not been specialized; never a value type.
    Template,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TypeDef {
    /// Fully-qualified name; specialized types encode their argument list (`Box<i32>`).
    pub name: String,
    pub kind: TypeKind,
    pub generic_params: Vec<String>,
    pub generic_args: Vec<TypeId>,
    pub generic_origin: Option<TypeId>,
}

impl TypeDef {
    pub fn primitive(&self) -> Option<Primitive> {
        match self.kind {
            TypeKind::Primitive(p) => Some(p),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SymbolKind {
    Variable,
    Function,
    EnumMember,
    TypeReference,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SymbolFlags {
    pub local: bool,
    pub member: bool,
    pub is_static: bool,
    pub param: bool,
    pub temporary: bool,
}

/// Where a symbol's runtime value lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Storage {
    /// Slot in the owning container's frame.
    Local(u32),
    /// Slot in the program-wide global table.
    Global(u32),
    /// The code of a function or method.
    Code(ContainerId),
    /// Field index within the owner class.
    Field(u32),
    /// Discriminant of an enum member.
    Variant(i64),
    /// A named type.
    Type(TypeId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Symbol {
    pub kind: SymbolKind,
    pub full_name: String,
    /// Name as written in source, before shadowing renames.
    pub origin_name: String,
    pub scope_depth: u32,
    pub container: Option<ContainerId>,
    pub owner_type: Option<TypeId>,
    pub ty: TypeId,
    pub readonly: bool,
    pub flags: SymbolFlags,
    pub param_index: Option<u32>,
    pub storage: Storage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ContainerKind {
    Function,
    Method,
    Routine,
    Lambda,
    Initializer,
}

impl ContainerKind {
    pub fn name(self) -> &'static str {
        match self {
            ContainerKind::Function => "function",
            ContainerKind::Method => "method",
            ContainerKind::Routine => "routine",
            ContainerKind::Lambda => "lambda",
            ContainerKind::Initializer => "initializer",
        }
    }
}

/// An ordered instruction list plus the frame layout it executes against.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CodeContainer {
    pub name: String,
    pub kind: ContainerKind,
    pub symbol: Option<SymbolId>,
    pub owner: Option<TypeId>,
    /// Parameter symbols; they occupy the first local slots (the receiver is parameter 0).
    pub params: Vec<SymbolId>,
    /// Local slots that receive a closure's captured values, in capture order.
    pub captures: Vec<SymbolId>,
    /// Every frame slot, indexed by [`Storage::Local`].
    pub locals: Vec<SymbolId>,
    pub ret: TypeId,
    pub is_async: bool,
    pub is_generator: bool,
    /// Host-registry key for bodiless extern functions.
    pub extern_name: Option<String>,
    pub instructions: Vec<Instruction>,
    /// Label → instruction index.
    #[cfg_attr(feature = "serde", serde(default))]
    pub labels: BTreeMap<Label, usize>,
}

impl CodeContainer {
    pub fn new(name: impl Into<String>, kind: ContainerKind, ret: TypeId) -> Self {
        Self {
            name: name.into(),
            kind,
            symbol: None,
            owner: None,
            params: Vec::new(),
            captures: Vec::new(),
            locals: Vec::new(),
            ret,
            is_async: false,
            is_generator: false,
            extern_name: None,
            instructions: Vec::new(),
            labels: BTreeMap::new(),
        }
    }

    pub fn is_extern(&self) -> bool {
        self.extern_name.is_some()
    }

    pub fn label_target(&self, label: &Label) -> Option<usize> {
        self.labels.get(label).copied()
    }

    /// Rebuilds the label index from the labels attached to each instruction.
    pub fn index_labels(&mut self) {
        self.labels.clear();
        for (idx, inst) in self.instructions.iter().enumerate() {
            for label in &inst.labels {
                self.labels.insert(label.clone(), idx);
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Instruction {
    pub op: Op,
    /// Labels naming this instruction as a jump target.
    pub labels: Vec<Label>,
    pub location: SourceLocation,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Literal {
    Void,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Char(char),
    Str(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Void => f.write_str("void"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Int(v) => write!(f, "{v}"),
            Literal::UInt(v) => write!(f, "{v}"),
            Literal::Float(v) => write!(f, "{v:?}"),
            Literal::Char(c) => write!(f, "{c:?}"),
            Literal::Str(s) => write!(f, "{s:?}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BinaryOp {
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
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinaryOp {
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Rem => "rem",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "le",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "ge",
            BinaryOp::BitAnd => "and",
            BinaryOp::BitOr => "or",
            BinaryOp::BitXor => "xor",
            BinaryOp::Shl => "shl",
            BinaryOp::Shr => "shr",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

impl UnaryOp {
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Neg => "neg",
            UnaryOp::Not => "not",
            UnaryOp::BitNot => "bitnot",
        }
    }
}

/// Operand category of a [`BinaryOp`]: either a primitive or reference identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OperandKind {
    Primitive(Primitive),
    Reference,
}

impl fmt::Display for OperandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperandKind::Primitive(p) => write!(f, "{p}"),
            OperandKind::Reference => f.write_str("ref"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldRef {
    pub index: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CastKind {
    /// Numeric conversion, including `char` ↔ integer.
    Numeric { from: Primitive, to: Primitive },
    ToString { from: Primitive },
    /// Class value → interface value through a statically known table.
    Upcast { vtable: VTableId },
    /// Interface value → another interface; the table is looked up from the object's class.
    Reinterface { target: TypeId },
    /// Interface value → concrete class, checked at run time.
    Downcast { class: TypeId },
    /// `value is T` for interface values; produces `bool`.
    Test { target: TypeId },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Intrinsic {
    /// `generator.next()`; produces the given `Option` specialization.
    GeneratorNext { option: TypeId },
    /// `future.poll()`; produces the given `Option` specialization.
    FuturePoll { option: TypeId },
    /// Drives a future once if needed and reports whether it holds a value.
    FutureReady,
    /// Reads a ready future's value.
    FutureResult,
    /// Registers a listener on an event, producing a future of its payload.
    EventListen,
    EventEmit,
    /// Builds a function value from a lambda container and its captured values.
    Closure(ContainerId),
    /// Builds a function value bound to a receiver object.
    BindMethod(ContainerId),
    /// Builds a function value for an interface slot bound to a receiver.
    BindVirtual { slot: u32 },
}

impl Intrinsic {
    pub fn name(self) -> &'static str {
        match self {
            Intrinsic::GeneratorNext { .. } => "generator_next",
            Intrinsic::FuturePoll { .. } => "future_poll",
            Intrinsic::FutureReady => "future_ready",
            Intrinsic::FutureResult => "future_result",
            Intrinsic::EventListen => "event_listen",
            Intrinsic::EventEmit => "event_emit",
            Intrinsic::Closure(_) => "closure",
            Intrinsic::BindMethod(_) => "bind_method",
            Intrinsic::BindVirtual { .. } => "bind_virtual",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Callee {
    Direct(ContainerId),
    /// Dispatch through the interface value passed as the first argument.
    Virtual { slot: u32 },
    /// Invoke the function value held by a symbol.
    Indirect(SymbolId),
    Intrinsic(Intrinsic),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CallMode {
    /// Run the callee to completion, propagating `Blocked` to the caller.
    Sync,
    /// Produce a lazily started future.
    Async,
    /// Produce a generator handle without running the body.
    Generator,
}

/// How a frame finished one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ReturnStatus {
    Finished,
    YieldNotFinished,
    YieldFinished,
    Blocked,
}

impl ReturnStatus {
    pub fn name(self) -> &'static str {
        match self {
            ReturnStatus::Finished => "finished",
            ReturnStatus::YieldNotFinished => "yield",
            ReturnStatus::YieldFinished => "yield_finished",
            ReturnStatus::Blocked => "blocked",
        }
    }

    /// `true` when the frame may be resumed.
    pub fn is_suspended(self) -> bool {
        matches!(self, ReturnStatus::YieldNotFinished | ReturnStatus::Blocked)
    }
}

/// The closed IR operation set.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Op {
    Assign {
        dst: SymbolId,
        src: SymbolId,
    },
    Literal {
        dst: SymbolId,
        value: Literal,
    },
    Binary {
        dst: SymbolId,
        op: BinaryOp,
        lhs: SymbolId,
        rhs: SymbolId,
        operand: OperandKind,
    },
    Unary {
        dst: SymbolId,
        op: UnaryOp,
        src: SymbolId,
        operand: Primitive,
    },
    MemberRead {
        dst: SymbolId,
        object: SymbolId,
        field: FieldRef,
    },
    MemberWrite {
        object: SymbolId,
        field: FieldRef,
        src: SymbolId,
    },
    EnumTagRead {
        dst: SymbolId,
        value: SymbolId,
    },
    /// Sets the discriminant and clears any live payload.
    EnumTagWrite {
        value: SymbolId,
        tag: i64,
    },
    EnumPayloadRead {
        dst: SymbolId,
        value: SymbolId,
        tag: i64,
    },
    EnumPayloadWrite {
        value: SymbolId,
        tag: i64,
        src: SymbolId,
    },
    Cast {
        dst: SymbolId,
        src: SymbolId,
        kind: CastKind,
    },
    Call {
        dst: Option<SymbolId>,
        callee: Callee,
        args: Vec<SymbolId>,
        mode: CallMode,
    },
    Jump {
        target: Label,
    },
    /// Jumps to `target` when `cond` equals `when`.
    Branch {
        cond: SymbolId,
        when: bool,
        target: Label,
    },
    Return {
        value: Option<SymbolId>,
        status: ReturnStatus,
    },
    /// Allocates a class instance, enum cell, or event.
    New {
        dst: SymbolId,
        ty: TypeId,
    },
}

impl Op {
    /// The symbol this operation writes, if any.
    pub fn result(&self) -> Option<SymbolId> {
        match self {
            Op::Assign { dst, .. }
            | Op::Literal { dst, .. }
            | Op::Binary { dst, .. }
            | Op::Unary { dst, .. }
            | Op::MemberRead { dst, .. }
            | Op::EnumTagRead { dst, .. }
            | Op::EnumPayloadRead { dst, .. }
            | Op::Cast { dst, .. }
            | Op::New { dst, .. } => Some(*dst),
            Op::Call { dst, .. } => *dst,
            _ => None,
        }
    }

    /// Every symbol this operation reads.
    pub fn inputs(&self) -> Vec<SymbolId> {
        match self {
            Op::Assign { src, .. } => vec![*src],
            Op::Literal { .. } | Op::Jump { .. } | Op::New { .. } => Vec::new(),
            Op::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            Op::Unary { src, .. } => vec![*src],
            Op::MemberRead { object, .. } => vec![*object],
            Op::MemberWrite { object, src, .. } => vec![*object, *src],
            Op::EnumTagRead { value, .. }
            | Op::EnumTagWrite { value, .. }
            | Op::EnumPayloadRead { value, .. } => vec![*value],
            Op::EnumPayloadWrite { value, src, .. } => vec![*value, *src],
            Op::Cast { src, .. } => vec![*src],
            Op::Call { callee, args, .. } => {
                let mut inputs = Vec::with_capacity(args.len() + 1);
                if let Callee::Indirect(f) = callee {
                    inputs.push(*f);
                }
                inputs.extend(args.iter().copied());
                inputs
            }
            Op::Branch { cond, .. } => vec![*cond],
            Op::Return { value, .. } => value.iter().copied().collect(),
        }
    }
}

/// One slot of a [`VTable`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VTableSlot {
    pub method: String,
    pub target: ContainerId,
    pub receiver: SlotReceiver,
}

/// What the slot's target expects as its receiver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SlotReceiver {
    /// The class instance itself.
    Object,
    /// The instance viewed through the interface that declares a default body.
    Interface(VTableId),
}

/// Dispatch table for one (class, interface) pair, ordered like the interface's slots.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VTable {
    pub class: TypeId,
    pub interface: TypeId,
    pub slots: Vec<VTableSlot>,
}

/// A fully lowered, frozen program.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Program {
    pub types: Vec<TypeDef>,
    pub symbols: Vec<Symbol>,
    pub containers: Vec<CodeContainer>,
    pub vtables: Vec<VTable>,
    /// Global slots, indexed by [`Storage::Global`].
    pub globals: Vec<SymbolId>,
    /// Runs once before any routine.
    pub initializer: Option<ContainerId>,
    /// Top-level routines in declaration order.
    pub routines: Vec<ContainerId>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub container_ids: BTreeMap<String, ContainerId>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub type_ids: BTreeMap<String, TypeId>,
}

impl Program {
    pub fn type_def(&self, id: TypeId) -> Option<&TypeDef> {
        self.types.get(id.0 as usize)
    }

    pub fn type_name(&self, id: TypeId) -> &str {
        self.type_def(id).map_or("<unknown type>", |t| t.name.as_str())
    }

    pub fn type_id(&self, name: &str) -> Option<TypeId> {
        self.type_ids.get(name).copied()
    }

    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.0 as usize)
    }

    pub fn symbol_name(&self, id: SymbolId) -> &str {
        self.symbol(id)
            .map_or("<unknown symbol>", |s| s.full_name.as_str())
    }

    pub fn container(&self, id: ContainerId) -> Option<&CodeContainer> {
        self.containers.get(id.0 as usize)
    }

    pub fn container_id(&self, name: &str) -> Option<ContainerId> {
        self.container_ids.get(name).copied()
    }

    pub fn vtable(&self, id: VTableId) -> Option<&VTable> {
        self.vtables.get(id.0 as usize)
    }

    /// Looks up the dispatch table of `class` for `interface`.
    pub fn vtable_for(&self, class: TypeId, interface: TypeId) -> Option<VTableId> {
        match &self.type_def(class)?.kind {
            TypeKind::Class(info) => info
                .vtables
                .iter()
                .find(|(iface, _)| *iface == interface)
                .map(|(_, vt)| *vt),
            _ => None,
        }
    }

    /// Routine containers paired with their names, in declaration order.
    pub fn routine_names(&self) -> impl Iterator<Item = (ContainerId, &str)> + '_ {
        self.routines.iter().filter_map(move |id| {
            self.container(*id)
                .map(|container| (*id, container.name.as_str()))
        })
    }
}
