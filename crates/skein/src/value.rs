//! The universal runtime value and the centralized binary-operator tags.
//!
//! Small immediate values (ints, floats, bools, none) are stored inline;
//! everything else lives in the arena and is referenced via `Ref(HeapId)`.
//! Built-in operators short-circuit to native implementations for these
//! kinds, but every operation remains overridable through the dunder
//! attribute protocol (see `bytecode::vm::binary`).

use strum::{Display, IntoStaticStr};

use crate::{
    heap::{Heap, HeapId},
    object::ObjKind,
};

/// Primary value type representing guest objects at runtime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Heap-allocated value (string, collection, callable, type, instance).
    Ref(HeapId),
}

/// Binary operator tags dispatched by the engine.
///
/// The engine calls exactly one virtual method per tag; the string-keyed
/// dunder fallback lives inside each method's default path, never on the
/// hot path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    /// The reserved attribute name consulted by the override tier.
    #[must_use]
    pub fn dunder(self) -> &'static str {
        match self {
            Self::Add => "__add__",
            Self::Sub => "__sub__",
            Self::Mul => "__mul__",
            Self::Div => "__div__",
            Self::Mod => "__mod__",
            Self::Eq => "__eq__",
            Self::Ne => "__ne__",
            Self::Lt => "__lt__",
            Self::Le => "__le__",
            Self::Gt => "__gt__",
            Self::Ge => "__ge__",
        }
    }

    /// Source-level symbol, used in error messages.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// Decodes an opcode operand back into a tag.
    #[must_use]
    pub fn from_u32(raw: u32) -> Option<Self> {
        const ALL: [BinaryOp; 11] = [
            BinaryOp::Add,
            BinaryOp::Sub,
            BinaryOp::Mul,
            BinaryOp::Div,
            BinaryOp::Mod,
            BinaryOp::Eq,
            BinaryOp::Ne,
            BinaryOp::Lt,
            BinaryOp::Le,
            BinaryOp::Gt,
            BinaryOp::Ge,
        ];
        ALL.get(raw as usize).copied()
    }
}

impl Value {
    /// Guest truthiness: none and zero are false, empty collections are
    /// false, everything else is true.
    #[must_use]
    pub fn is_truthy(self, heap: &Heap) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => b,
            Self::Int(i) => i != 0,
            Self::Float(f) => f != 0.0,
            Self::Ref(id) => match &heap.get(id).kind {
                ObjKind::Str(s) => !s.is_empty(),
                ObjKind::List(items) | ObjKind::Tuple(items) => !items.is_empty(),
                ObjKind::Dict(map) => !map.is_empty(),
                _ => true,
            },
        }
    }

    /// Structural equality for built-in kinds; identity for everything else.
    ///
    /// User-defined `__eq__` overrides are applied by the VM dispatch layer,
    /// not here.
    #[must_use]
    pub fn native_eq(self, other: Self, heap: &Heap) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Int(a), Self::Float(b)) | (Self::Float(b), Self::Int(a)) => (a as f64) == b,
            (Self::Ref(a), Self::Ref(b)) => {
                if a == b {
                    return true;
                }
                match (&heap.get(a).kind, &heap.get(b).kind) {
                    (ObjKind::Str(x), ObjKind::Str(y)) => x == y,
                    (ObjKind::List(x), ObjKind::List(y)) | (ObjKind::Tuple(x), ObjKind::Tuple(y)) => {
                        x.len() == y.len() && x.iter().zip(y).all(|(l, r)| l.native_eq(*r, heap))
                    }
                    // Default equality for instances is identity.
                    _ => heap.get(a).id == heap.get(b).id,
                }
            }
            _ => false,
        }
    }

    /// Native string conversion without dunder dispatch.
    ///
    /// The VM's display path tries the `__str__` override first and falls
    /// back here.
    #[must_use]
    pub fn native_str(self, heap: &Heap) -> String {
        match self {
            Self::None => "none".to_owned(),
            Self::Bool(b) => if b { "true" } else { "false" }.to_owned(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => {
                if f.fract() == 0.0 && f.is_finite() {
                    format!("{f:.1}")
                } else {
                    f.to_string()
                }
            }
            Self::Ref(id) => {
                let obj = heap.get(id);
                match &obj.kind {
                    ObjKind::Str(s) => s.clone(),
                    ObjKind::List(items) => {
                        let parts: Vec<String> = items.iter().map(|v| v.native_str(heap)).collect();
                        format!("[{}]", parts.join(", "))
                    }
                    ObjKind::Tuple(items) => {
                        let parts: Vec<String> = items.iter().map(|v| v.native_str(heap)).collect();
                        format!("({})", parts.join(", "))
                    }
                    ObjKind::Dict(map) => {
                        let parts: Vec<String> = map
                            .iter()
                            .map(|(k, v)| format!("{}: {}", k.to_value_display(), v.native_str(heap)))
                            .collect();
                        format!("{{{}}}", parts.join(", "))
                    }
                    ObjKind::Function(func) => format!("<function {}>", func.name),
                    ObjKind::Closure { func, .. } => format!("<closure {}>", func.name),
                    ObjKind::BoundMethod { func, .. } => {
                        format!("<bound method {}>", func.native_str(heap))
                    }
                    ObjKind::Generator(_) => format!("<generator #{}>", obj.id),
                    ObjKind::SeqIter { .. } => format!("<iterator #{}>", obj.id),
                    ObjKind::Type(data) => format!("<type {}>", data.name),
                    ObjKind::Module { name } => format!("<module {name}>"),
                    ObjKind::Native(native) => format!("<native {}>", native.name),
                    ObjKind::Property { .. } => format!("<property #{}>", obj.id),
                    ObjKind::Plain => format!("<{} #{}>", heap.type_name(self), obj.id),
                }
            }
        }
    }
}

impl crate::object::DictKey {
    fn to_value_display(&self) -> String {
        match self {
            Self::None => "none".to_owned(),
            Self::Bool(b) => if *b { "true" } else { "false" }.to_owned(),
            Self::Int(i) => i.to_string(),
            Self::Str(s) => s.clone(),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_of_immediates() {
        let heap = Heap::new();
        assert!(!Value::None.is_truthy(&heap));
        assert!(!Value::Int(0).is_truthy(&heap));
        assert!(Value::Int(-1).is_truthy(&heap));
        assert!(!Value::Float(0.0).is_truthy(&heap));
        assert!(Value::Bool(true).is_truthy(&heap));
    }

    #[test]
    fn string_equality_is_structural() {
        let mut heap = Heap::new();
        let a = heap.alloc_str("abc");
        let b = heap.alloc_str("abc");
        assert_ne!(a, b);
        assert!(a.native_eq(b, &heap));
    }

    #[test]
    fn mixed_numeric_equality() {
        let heap = Heap::new();
        assert!(Value::Int(2).native_eq(Value::Float(2.0), &heap));
        assert!(!Value::Int(2).native_eq(Value::Float(2.5), &heap));
    }
}
