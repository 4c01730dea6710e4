//! Arena storage for guest objects.
//!
//! Values reference heap slots via [`HeapId`]. Reclamation strategy: the arena
//! lives as long as the owning VM; slots are never recycled. Call frames,
//! which churn far faster, live in their own slab (see [`crate::frame`]).

use ahash::AHashMap;
use strum::IntoEnumIterator;

use crate::{
    exception::ExcType,
    object::{BuiltinType, GuestObject, ObjKind, TypeData},
    value::Value,
};

/// Index of an object in the heap arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapId(u32);

impl HeapId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Heap ids of the built-in type descriptors, allocated once at VM startup.
///
/// Built-in types and user-defined classes are both ordinary heap objects;
/// this registry only provides O(1) access to the shared built-ins.
#[derive(Debug)]
pub struct TypeRegistry {
    pub type_type: HeapId,
    pub none_type: HeapId,
    pub bool_type: HeapId,
    pub int_type: HeapId,
    pub float_type: HeapId,
    pub str_type: HeapId,
    pub list_type: HeapId,
    pub tuple_type: HeapId,
    pub dict_type: HeapId,
    pub function_type: HeapId,
    pub bound_method_type: HeapId,
    pub closure_type: HeapId,
    pub generator_type: HeapId,
    pub seq_iter_type: HeapId,
    pub module_type: HeapId,
    pub native_type: HeapId,
    pub property_type: HeapId,
    /// One invocable descriptor per built-in exception type.
    pub exceptions: AHashMap<ExcType, HeapId>,
}

/// Arena of guest objects plus the shared type registry.
#[derive(Debug)]
pub struct Heap {
    slots: Vec<GuestObject>,
    /// Next process-unique object identity.
    next_object_id: u64,
    pub types: TypeRegistry,
}

impl Heap {
    /// Creates a heap with all built-in type descriptors pre-allocated.
    #[must_use]
    pub fn new() -> Self {
        let mut heap = Self {
            slots: Vec::with_capacity(64),
            next_object_id: 1,
            types: TypeRegistry {
                type_type: HeapId(0),
                none_type: HeapId(0),
                bool_type: HeapId(0),
                int_type: HeapId(0),
                float_type: HeapId(0),
                str_type: HeapId(0),
                list_type: HeapId(0),
                tuple_type: HeapId(0),
                dict_type: HeapId(0),
                function_type: HeapId(0),
                bound_method_type: HeapId(0),
                closure_type: HeapId(0),
                generator_type: HeapId(0),
                seq_iter_type: HeapId(0),
                module_type: HeapId(0),
                native_type: HeapId(0),
                property_type: HeapId(0),
                exceptions: AHashMap::new(),
            },
        };

        // `type` comes first and is its own type; the placeholder self-link
        // written during allocation is already correct (slot 0).
        let type_type = heap.alloc_builtin_type("type", BuiltinType::Type, HeapId(0));
        heap.types.type_type = type_type;

        heap.types.none_type = heap.alloc_builtin_type("none", BuiltinType::NoneType, type_type);
        heap.types.bool_type = heap.alloc_builtin_type("bool", BuiltinType::Bool, type_type);
        heap.types.int_type = heap.alloc_builtin_type("int", BuiltinType::Int, type_type);
        heap.types.float_type = heap.alloc_builtin_type("float", BuiltinType::Float, type_type);
        heap.types.str_type = heap.alloc_builtin_type("str", BuiltinType::Str, type_type);
        heap.types.list_type = heap.alloc_builtin_type("list", BuiltinType::List, type_type);
        heap.types.tuple_type = heap.alloc_builtin_type("tuple", BuiltinType::Tuple, type_type);
        heap.types.dict_type = heap.alloc_builtin_type("dict", BuiltinType::Dict, type_type);
        heap.types.function_type = heap.alloc_builtin_type("function", BuiltinType::Function, type_type);
        heap.types.bound_method_type = heap.alloc_builtin_type("method", BuiltinType::BoundMethod, type_type);
        heap.types.closure_type = heap.alloc_builtin_type("closure", BuiltinType::Closure, type_type);
        heap.types.generator_type = heap.alloc_builtin_type("generator", BuiltinType::Generator, type_type);
        heap.types.seq_iter_type = heap.alloc_builtin_type("iterator", BuiltinType::SeqIter, type_type);
        heap.types.module_type = heap.alloc_builtin_type("module", BuiltinType::Module, type_type);
        heap.types.native_type = heap.alloc_builtin_type("native", BuiltinType::Native, type_type);
        heap.types.property_type = heap.alloc_builtin_type("property", BuiltinType::Property, type_type);

        for exc_type in ExcType::iter() {
            let name: &'static str = exc_type.into();
            let id = heap.alloc_builtin_type(name, BuiltinType::Exception(exc_type), type_type);
            heap.types.exceptions.insert(exc_type, id);
        }

        heap
    }

    fn alloc_builtin_type(&mut self, name: &str, builtin: BuiltinType, type_type: HeapId) -> HeapId {
        self.allocate(
            ObjKind::Type(TypeData {
                name: name.to_owned(),
                builtin: Some(builtin),
                base: None,
            }),
            type_type,
        )
    }

    /// Allocates a new object, assigning the next monotonic identity.
    pub fn allocate(&mut self, kind: ObjKind, type_id: HeapId) -> HeapId {
        let id = self.next_object_id;
        self.next_object_id += 1;
        let heap_id = HeapId(u32::try_from(self.slots.len()).expect("heap exceeds u32 slots"));
        self.slots.push(GuestObject {
            attrs: AHashMap::new(),
            type_id,
            base: None,
            id,
            kind,
        });
        heap_id
    }

    #[must_use]
    pub fn get(&self, id: HeapId) -> &GuestObject {
        &self.slots[id.index()]
    }

    pub fn get_mut(&mut self, id: HeapId) -> &mut GuestObject {
        &mut self.slots[id.index()]
    }

    /// Number of live objects (diagnostics only).
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Allocates a guest string.
    pub fn alloc_str(&mut self, s: impl Into<String>) -> Value {
        let type_id = self.types.str_type;
        Value::Ref(self.allocate(ObjKind::Str(s.into()), type_id))
    }

    /// Allocates a guest list.
    pub fn alloc_list(&mut self, items: Vec<Value>) -> Value {
        let type_id = self.types.list_type;
        Value::Ref(self.allocate(ObjKind::List(items), type_id))
    }

    /// Allocates a guest tuple.
    pub fn alloc_tuple(&mut self, items: Vec<Value>) -> Value {
        let type_id = self.types.tuple_type;
        Value::Ref(self.allocate(ObjKind::Tuple(items), type_id))
    }

    /// Allocates an empty guest dict.
    pub fn alloc_dict(&mut self) -> Value {
        let type_id = self.types.dict_type;
        Value::Ref(self.allocate(ObjKind::Dict(indexmap::IndexMap::new()), type_id))
    }

    /// Returns the display name of a value's type.
    #[must_use]
    pub fn type_name(&self, value: Value) -> &str {
        let type_id = self.type_of(value);
        match &self.get(type_id).kind {
            ObjKind::Type(data) => &data.name,
            _ => "object",
        }
    }

    /// Resolves the type descriptor of any value, immediate or heap.
    #[must_use]
    pub fn type_of(&self, value: Value) -> HeapId {
        match value {
            Value::None => self.types.none_type,
            Value::Bool(_) => self.types.bool_type,
            Value::Int(_) => self.types.int_type,
            Value::Float(_) => self.types.float_type,
            Value::Ref(id) => self.get(id).type_id,
        }
    }

    /// Extracts string content, or `None` if the value is not a guest string.
    #[must_use]
    pub fn as_str(&self, value: Value) -> Option<&str> {
        if let Value::Ref(id) = value
            && let ObjKind::Str(s) = &self.get(id).kind
        {
            return Some(s);
        }
        None
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}
