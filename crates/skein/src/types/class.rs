//! User-defined type descriptors: attribute-copy inheritance and mixins.
//!
//! Inheritance copies a base type's attributes onto the derived target and
//! rebinds the copied methods, rather than sharing a dispatch table. Runtime
//! lookup cost stays O(1) plus at most one delegation hop through the base
//! chain. Mixins are structural: whether an object satisfies a trait is
//! checked by name+arity against its current attribute table, not by a
//! registered "implements" relationship.

use crate::{
    exception::{ExcType, RunError, RunResult},
    heap::{Heap, HeapId},
    object::{ObjKind, TypeData},
    value::Value,
};

/// Allocates a fresh user type descriptor.
pub fn alloc_user_type(heap: &mut Heap, name: impl Into<String>, base: Option<HeapId>) -> HeapId {
    let type_type = heap.types.type_type;
    heap.allocate(
        ObjKind::Type(TypeData {
            name: name.into(),
            builtin: None,
            base,
        }),
        type_type,
    )
}

/// Wraps a callable as a method bound to `receiver`.
///
/// Functions and closures get a fresh `BoundMethod` wrapper; existing bound
/// methods are re-wrapped around their underlying callable. Non-callable
/// values pass through unchanged.
pub fn bind_callable(heap: &mut Heap, value: Value, receiver: Value) -> Value {
    let Value::Ref(id) = value else { return value };
    let func = match &heap.get(id).kind {
        ObjKind::Function(_) | ObjKind::Closure { .. } | ObjKind::Native(_) => value,
        ObjKind::BoundMethod { func, .. } => *func,
        _ => return value,
    };
    let method_type = heap.types.bound_method_type;
    Value::Ref(heap.allocate(ObjKind::BoundMethod { func, receiver }, method_type))
}

/// Copies a class's attribute table onto a freshly allocated instance,
/// binding callables to the instance. Called during construction, before the
/// constructor body runs.
pub fn seed_instance_attrs(heap: &mut Heap, class_id: HeapId, instance: Value) {
    let attrs: Vec<(String, Value)> = heap
        .get(class_id)
        .attrs
        .iter()
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    let Value::Ref(instance_id) = instance else { return };
    for (name, value) in attrs {
        let bound = bind_callable(heap, value, instance);
        heap.get_mut(instance_id).attrs.insert(name, bound);
    }
}

/// Step 1 of `inherit`: copies every attribute of the base type descriptor
/// into `target` (skipping names the target already defines) and into the
/// fresh base instance. Callables copied onto the target are bound to it.
pub fn copy_base_type_attrs(heap: &mut Heap, base_type: HeapId, target: Value, base_instance: Value) {
    let attrs: Vec<(String, Value)> = heap
        .get(base_type)
        .attrs
        .iter()
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    let Value::Ref(target_id) = target else { return };
    for (name, value) in attrs {
        if !heap.get(target_id).attrs.contains_key(&name) {
            let bound = bind_callable(heap, value, target);
            heap.get_mut(target_id).attrs.insert(name.clone(), bound);
        }
        if let Value::Ref(base_id) = base_instance
            && !heap.get(base_id).attrs.contains_key(&name)
        {
            let bound = bind_callable(heap, value, base_instance);
            heap.get_mut(base_id).attrs.insert(name, bound);
        }
    }
}

/// Step 2 of `inherit`: re-points every bound method among the fresh base
/// instance's attributes at the derived target, so inherited methods operate
/// on the derived instance rather than the discarded base one.
pub fn rebind_instance_methods(heap: &mut Heap, base_instance: Value, target: Value) {
    let Value::Ref(base_id) = base_instance else { return };
    let method_ids: Vec<HeapId> = heap
        .get(base_id)
        .attrs
        .values()
        .filter_map(|v| match v {
            Value::Ref(id) if matches!(heap.get(*id).kind, ObjKind::BoundMethod { .. }) => Some(*id),
            _ => None,
        })
        .collect();
    for id in method_ids {
        if let ObjKind::BoundMethod { receiver, .. } = &mut heap.get_mut(id).kind {
            *receiver = target;
        }
    }
}

/// Copies a mixin type's attributes onto a target after its type is fixed.
///
/// An attribute already defined on the target shadows the mixin's — unless
/// both sides are callables of differing arity, which is a contract mismatch
/// and fails hard with a `TypeError`.
pub fn apply_mixin(heap: &mut Heap, target: Value, mixin_type: HeapId) -> RunResult<()> {
    let mixin_name = heap.get(mixin_type).as_type()?.name.clone();
    let attrs: Vec<(String, Value)> = heap
        .get(mixin_type)
        .attrs
        .iter()
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    let Value::Ref(target_id) = target else {
        return Err(ExcType::type_error("mixins can only be applied to heap values"));
    };
    for (name, value) in attrs {
        match heap.get(target_id).attrs.get(&name).copied() {
            Some(existing) => {
                let mixin_arity = callable_arity(heap, value);
                let target_arity = callable_arity(heap, existing);
                if let (Some(a), Some(b)) = (mixin_arity, target_arity)
                    && a != b
                {
                    return Err(RunError::new(
                        ExcType::TypeError,
                        format!(
                            "mixin '{mixin_name}' method '{name}' expects {a} parameters but the target defines {b}"
                        ),
                    ));
                }
            }
            None => {
                let bound = bind_callable(heap, value, target);
                heap.get_mut(target_id).attrs.insert(name, bound);
            }
        }
    }
    Ok(())
}

/// Structural trait check: `value` satisfies `trait_type` when, for every
/// callable attribute the trait declares, the value's current attribute
/// table has a callable of the same name and arity (natives match any
/// arity), and every non-callable trait attribute exists by name.
#[must_use]
pub fn satisfies_trait(heap: &Heap, value: Value, trait_type: HeapId) -> bool {
    let Value::Ref(value_id) = value else { return false };
    for (name, declared) in &heap.get(trait_type).attrs {
        let Some(found) = lookup_with_base(heap, value_id, name) else {
            return false;
        };
        if let Some(want) = callable_arity(heap, *declared) {
            match callable_arity(heap, found) {
                Some(have) if have == want => {}
                // Natives have no declared parameter list; accept them.
                None if is_callable(heap, found) => {}
                _ => return false,
            }
        }
    }
    true
}

fn lookup_with_base(heap: &Heap, mut id: HeapId, name: &str) -> Option<Value> {
    loop {
        let obj = heap.get(id);
        if let Some(value) = obj.get_own_attr(name) {
            return Some(value);
        }
        id = obj.base?;
    }
}

/// Declared parameter count of a callable, or `None` for natives and
/// non-callables.
#[must_use]
pub fn callable_arity(heap: &Heap, value: Value) -> Option<usize> {
    let Value::Ref(id) = value else { return None };
    match &heap.get(id).kind {
        ObjKind::Function(func) | ObjKind::Closure { func, .. } => Some(func.params.len()),
        ObjKind::BoundMethod { func, .. } => callable_arity(heap, *func),
        _ => None,
    }
}

fn is_callable(heap: &Heap, value: Value) -> bool {
    let Value::Ref(id) = value else { return false };
    matches!(
        heap.get(id).kind,
        ObjKind::Function(_) | ObjKind::Closure { .. } | ObjKind::BoundMethod { .. } | ObjKind::Native(_) | ObjKind::Type(_)
    )
}
