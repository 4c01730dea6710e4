//! Built-in type support and the prelude module.
//!
//! Built-in numeric/string/collection types and user-defined classes are both
//! type descriptors; the distinction is only in what invoking and inheriting
//! them does. This module seeds the prelude (the implicit outer global scope)
//! with the shared descriptors.

pub mod class;

use crate::{
    exception::{ExcType, RunError},
    heap::{Heap, HeapId},
    module::alloc_module,
    native::NativeFunction,
    object::ObjKind,
    value::Value,
};
use strum::IntoEnumIterator;

/// Builds the prelude module: type descriptors, exception classes, and the
/// handful of universal natives. Consulted by global loads after the current
/// module's own table.
pub fn make_builtins_module(heap: &mut Heap) -> HeapId {
    let module = alloc_module(heap, "builtins");

    let entries = [
        ("type", heap.types.type_type),
        ("none", heap.types.none_type),
        ("bool", heap.types.bool_type),
        ("int", heap.types.int_type),
        ("float", heap.types.float_type),
        ("str", heap.types.str_type),
        ("list", heap.types.list_type),
        ("tuple", heap.types.tuple_type),
        ("dict", heap.types.dict_type),
    ];
    for (name, id) in entries {
        heap.get_mut(module).attrs.insert(name.to_owned(), Value::Ref(id));
    }

    for exc_type in ExcType::iter() {
        let name: &'static str = exc_type.into();
        let id = heap.types.exceptions[&exc_type];
        heap.get_mut(module).attrs.insert(name.to_owned(), Value::Ref(id));
    }

    let len = NativeFunction::new("len", |heap, args| {
        let [value] = args else {
            return Err(RunError::new(ExcType::ArgumentError, "len() takes exactly 1 argument"));
        };
        let length = match value {
            Value::Ref(id) => match &heap.get(*id).kind {
                ObjKind::Str(s) => Some(s.chars().count()),
                ObjKind::List(items) | ObjKind::Tuple(items) => Some(items.len()),
                ObjKind::Dict(map) => Some(map.len()),
                _ => None,
            },
            _ => None,
        };
        match length {
            Some(n) => Ok(Value::Int(i64::try_from(n).unwrap_or(i64::MAX))),
            None => Err(ExcType::not_supported(heap.type_name(*value), "len()")),
        }
    });
    let native_type = heap.types.native_type;
    let len_value = Value::Ref(heap.allocate(ObjKind::Native(len), native_type));
    heap.get_mut(module).attrs.insert("len".to_owned(), len_value);

    module
}

/// Maps a guest value to the built-in exception type it represents, walking
/// the base chain of inherited instances. `None` when the value does not
/// derive from `Exception`.
#[must_use]
pub fn exception_type_of(heap: &Heap, value: Value) -> Option<ExcType> {
    let Value::Ref(mut id) = value else { return None };
    loop {
        let obj = heap.get(id);
        if let ObjKind::Type(data) = &heap.get(obj.type_id).kind
            && let Some(crate::object::BuiltinType::Exception(exc_type)) = data.builtin
        {
            return Some(exc_type);
        }
        match obj.base {
            Some(base) => id = base,
            None => return None,
        }
    }
}

/// Maps a type-descriptor value to its built-in exception type, walking the
/// declared base chain of user-defined exception classes.
#[must_use]
pub fn exception_type_of_class(heap: &Heap, value: Value) -> Option<ExcType> {
    let Value::Ref(mut id) = value else { return None };
    loop {
        let ObjKind::Type(data) = &heap.get(id).kind else { return None };
        if let Some(crate::object::BuiltinType::Exception(exc_type)) = data.builtin {
            return Some(exc_type);
        }
        match data.base {
            Some(base) => id = base,
            None => return None,
        }
    }
}
