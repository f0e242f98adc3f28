//! Runtime values.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use strand_ir::{ContainerId, Primitive, TypeId, VTableId};

use crate::task::Task;

/// A runtime value.
///
/// Primitive values are stored widened: signed integers as `Int`, unsigned integers as `UInt`
/// and both float widths as `Float`, each already wrapped or rounded to its declared width.
#[derive(Clone)]
pub enum Value {
    Void,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Char(char),
    Str(Rc<str>),
    Function(FunctionValue),
    Object(ObjectRef),
    Interface(InterfaceValue),
    Enum(EnumRef),
    Task(TaskRef),
    Event(EventRef),
}

impl Value {
    pub fn str(text: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(text.as_ref()))
    }

    /// The value a primitive field holds before anything is written to it.
    pub fn zero(prim: Primitive) -> Option<Self> {
        Some(match prim {
            Primitive::Bool => Value::Bool(false),
            p if p.is_signed() => Value::Int(0),
            p if p.is_unsigned() => Value::UInt(0),
            p if p.is_float() => Value::Float(0.0),
            Primitive::Char => Value::Char('\0'),
            Primitive::Str => Value::str(""),
            _ => return None,
        })
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::UInt(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            Value::Interface(i) => Some(&i.object),
            _ => None,
        }
    }

    /// Short description used in fault messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Void => "void",
            Value::Bool(_) => "bool",
            Value::Int(_) => "signed integer",
            Value::UInt(_) => "unsigned integer",
            Value::Float(_) => "float",
            Value::Char(_) => "char",
            Value::Str(_) => "string",
            Value::Function(_) => "function",
            Value::Object(_) => "object",
            Value::Interface(_) => "interface",
            Value::Enum(_) => "enum",
            Value::Task(_) => "task",
            Value::Event(_) => "event",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "void"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}u"),
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Char(c) => write!(f, "{c:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Function(func) => match &func.receiver {
                Some(_) => write!(f, "fn#{}(bound)", func.container.0),
                None => write!(f, "fn#{}", func.container.0),
            },
            Value::Object(o) => write!(f, "object(type#{})", o.class().0),
            Value::Interface(i) => write!(
                f,
                "interface(type#{}, vtable#{})",
                i.object.class().0,
                i.vtable.0
            ),
            Value::Enum(e) => {
                let cell = e.0.borrow();
                match &cell.payload {
                    Some(payload) => write!(f, "enum(type#{}, {}, {payload:?})", cell.ty.0, cell.tag),
                    None => write!(f, "enum(type#{}, {})", cell.ty.0, cell.tag),
                }
            }
            Value::Task(_) => write!(f, "task(..)"),
            Value::Event(_) => write!(f, "event(..)"),
        }
    }
}

/// Identity for references, structural equality for primitives and enums.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Void, Value::Void) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => {
                a.container == b.container
                    && a.receiver == b.receiver
                    && Rc::ptr_eq(&a.captures, &b.captures)
            }
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Interface(a), Value::Interface(b)) => a.object.ptr_eq(&b.object),
            (Value::Enum(a), Value::Enum(b)) => {
                if Rc::ptr_eq(&a.0, &b.0) {
                    return true;
                }
                let (a, b) = (a.0.borrow(), b.0.borrow());
                a.ty == b.ty && a.tag == b.tag && a.payload == b.payload
            }
            (Value::Task(a), Value::Task(b)) => Rc::ptr_eq(&a.0, &b.0),
            (Value::Event(a), Value::Event(b)) => Rc::ptr_eq(&a.0, &b.0),
            _ => false,
        }
    }
}

/// A callable value: a container plus what it was bound to.
#[derive(Clone)]
pub struct FunctionValue {
    pub container: ContainerId,
    /// Passed as parameter 0 for bound methods.
    pub receiver: Option<Box<Value>>,
    /// Written into the container's capture slots.
    pub captures: Rc<[Value]>,
}

impl FunctionValue {
    pub fn plain(container: ContainerId) -> Self {
        Self {
            container,
            receiver: None,
            captures: Rc::from(Vec::new()),
        }
    }
}

pub struct Object {
    class: TypeId,
    fields: RefCell<Vec<Option<Value>>>,
}

/// A shared class instance.
#[derive(Clone)]
pub struct ObjectRef(Rc<Object>);

impl ObjectRef {
    pub fn new(class: TypeId, fields: Vec<Option<Value>>) -> Self {
        ObjectRef(Rc::new(Object {
            class,
            fields: RefCell::new(fields),
        }))
    }

    pub fn class(&self) -> TypeId {
        self.0.class
    }

    /// `None` when the index is out of range or the field was never written.
    pub fn field(&self, index: usize) -> Option<Value> {
        self.0.fields.borrow().get(index).cloned().flatten()
    }

    pub fn set_field(&self, index: usize, value: Value) -> bool {
        match self.0.fields.borrow_mut().get_mut(index) {
            Some(slot) => {
                *slot = Some(value);
                true
            }
            None => false,
        }
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// A class instance viewed through one of its interfaces.
#[derive(Clone)]
pub struct InterfaceValue {
    pub object: ObjectRef,
    pub vtable: VTableId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumCell {
    pub ty: TypeId,
    pub tag: i64,
    pub payload: Option<Value>,
}

/// Enum values are shared cells; assignment aliases them.
#[derive(Clone)]
pub struct EnumRef(pub(crate) Rc<RefCell<EnumCell>>);

impl EnumRef {
    pub fn new(ty: TypeId, tag: i64, payload: Option<Value>) -> Self {
        EnumRef(Rc::new(RefCell::new(EnumCell { ty, tag, payload })))
    }

    pub fn ty(&self) -> TypeId {
        self.0.borrow().ty
    }

    pub fn tag(&self) -> i64 {
        self.0.borrow().tag
    }

    pub fn payload(&self) -> Option<Value> {
        self.0.borrow().payload.clone()
    }

    /// A fresh cell with the same tag; enum payloads are copied recursively.
    pub fn deep_copy(&self) -> EnumRef {
        let cell = self.0.borrow();
        let payload = cell.payload.as_ref().map(|payload| match payload {
            Value::Enum(inner) => Value::Enum(inner.deep_copy()),
            other => other.clone(),
        });
        EnumRef::new(cell.ty, cell.tag, payload)
    }
}

/// A future or generator.
#[derive(Clone)]
pub struct TaskRef(pub(crate) Rc<RefCell<Task>>);

impl TaskRef {
    pub(crate) fn new(task: Task) -> Self {
        TaskRef(Rc::new(RefCell::new(task)))
    }
}

/// The listeners registered on an event and not yet completed.
#[derive(Clone, Default)]
pub struct EventRef(pub(crate) Rc<RefCell<Vec<TaskRef>>>);

impl EventRef {
    pub fn listener_count(&self) -> usize {
        self.0.borrow().len()
    }
}
