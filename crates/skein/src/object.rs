//! The guest object representation: attribute table, type link, base chain.
//!
//! Every heap-allocated runtime entity is a [`GuestObject`]. The attribute
//! table doubles as instance state and method table; the optional `base` link
//! forms the singly-linked "super" chain built by attribute-copy inheritance.

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::{
    exception::{ExcType, RunError, RunResult},
    frame::FrameId,
    function::FuncDef,
    heap::{Heap, HeapId},
    native::NativeFunction,
    value::Value,
};
use std::rc::Rc;

/// A heap-allocated guest value.
#[derive(Debug)]
pub struct GuestObject {
    /// Name -> value attribute table. Acts as both instance state and a
    /// vtable-like method table.
    pub attrs: AHashMap<String, Value>,
    /// The value's type descriptor. Reading the reserved `__type__` attribute
    /// reflects this field; writing `__type__` re-points it.
    pub type_id: HeapId,
    /// Optional "super" instance installed by `inherit`. A chain, never a DAG:
    /// multiple bases are reconciled by attribute copying.
    pub base: Option<HeapId>,
    /// Process-unique monotonically increasing identity. Used for default
    /// equality and default string conversion.
    pub id: u64,
    /// Native payload for built-in kinds; `Plain` for user instances.
    pub kind: ObjKind,
}

/// Native payload of a guest object.
#[derive(Debug)]
pub enum ObjKind {
    /// A user-defined instance with no native payload.
    Plain,
    Str(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Dict(IndexMap<DictKey, Value>),
    /// A plain function: compiled code unit plus parameter metadata.
    Function(Rc<FuncDef>),
    /// A function (or closure) paired with a fixed receiver.
    BoundMethod {
        /// The underlying callable, a `Function` or `Closure` object.
        func: Value,
        /// Bound as the frame receiver on invocation. Rebindable.
        receiver: Value,
    },
    /// A function paired with a captured frame. Invocation duplicates the
    /// captured frame at its current state for write-through semantics.
    Closure { func: Rc<FuncDef>, captured: FrameId },
    /// A suspended function invocation satisfying the iterator protocol.
    Generator(GeneratorData),
    /// Index-walking iterator over a built-in sequence.
    SeqIter {
        /// The sequence being iterated (list, tuple or string snapshot).
        target: Value,
        /// Next element index.
        index: usize,
        /// Value produced by the most recent advance.
        current: Value,
    },
    /// A type descriptor. Invoking it constructs an instance.
    Type(TypeData),
    /// A module: globals live in the attribute table.
    Module {
        /// Dotted module path used in stack traces.
        name: String,
    },
    /// Host-provided callable participating in the invocation protocol.
    Native(NativeFunction),
    /// A get/set hook pair mediating attribute access.
    Property {
        getter: Value,
        setter: Option<Value>,
    },
}

/// Generator resumption state machine.
///
/// `Fresh` means never advanced: the first `advance()` only primes the
/// iterator, because the frame already ran to its first yield at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenState {
    Fresh,
    Suspended,
    Exhausted,
}

/// Resumption bookkeeping for a generator: the held frame, the arguments
/// originally supplied, and the last yielded value.
#[derive(Debug)]
pub struct GeneratorData {
    /// The callable the generator was created from.
    pub func: Value,
    /// The held, resumable frame.
    pub frame: FrameId,
    /// Arguments supplied at the original invocation.
    pub args: Vec<Value>,
    pub state: GenState,
    /// Last yielded value, returned by `current()`.
    pub last: Value,
}

/// Metaobject payload of a type descriptor.
#[derive(Debug)]
pub struct TypeData {
    pub name: String,
    /// Set for built-in types; `None` for user-defined classes.
    pub builtin: Option<BuiltinType>,
    /// Declared base type, consulted when constructing an instance of a
    /// derived class with no constructor of its own.
    pub base: Option<HeapId>,
}

/// Discriminant for built-in type descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinType {
    NoneType,
    Bool,
    Int,
    Float,
    Str,
    List,
    Tuple,
    Dict,
    Function,
    BoundMethod,
    Closure,
    Generator,
    SeqIter,
    Type,
    Module,
    Native,
    Property,
    /// A built-in exception class; invoking it constructs an exception instance.
    Exception(ExcType),
}

/// Hashable key for the guest dictionary type.
///
/// Insertion order is preserved by the backing `IndexMap`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DictKey {
    None,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl DictKey {
    /// Converts a guest value into a dictionary key.
    ///
    /// Floats and mutable containers are not hashable.
    pub fn from_value(value: Value, heap: &Heap) -> RunResult<Self> {
        match value {
            Value::None => Ok(Self::None),
            Value::Bool(b) => Ok(Self::Bool(b)),
            Value::Int(i) => Ok(Self::Int(i)),
            Value::Ref(id) => match &heap.get(id).kind {
                ObjKind::Str(s) => Ok(Self::Str(s.clone())),
                _ => Err(ExcType::type_error(format!(
                    "unhashable key type '{}'",
                    heap.type_name(value)
                ))),
            },
            Value::Float(_) => Err(RunError::new(
                ExcType::TypeError,
                "unhashable key type 'float'",
            )),
        }
    }

    /// Materializes the key back into a guest value.
    pub fn to_value(&self, heap: &mut Heap) -> Value {
        match self {
            Self::None => Value::None,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::Int(*i),
            Self::Str(s) => heap.alloc_str(s.clone()),
        }
    }
}

impl GuestObject {
    /// Looks up an attribute on this object only (no base-chain walk).
    #[must_use]
    pub fn get_own_attr(&self, name: &str) -> Option<Value> {
        self.attrs.get(name).copied()
    }

    /// Returns the type descriptor payload, or a `TypeError` if this object
    /// is not a type.
    pub fn as_type(&self) -> RunResult<&TypeData> {
        match &self.kind {
            ObjKind::Type(data) => Ok(data),
            _ => Err(ExcType::type_error("a type descriptor is required here")),
        }
    }
}
