//! Attribute and index access.
//!
//! Attribute lookup checks the object's own table first, then walks the base
//! chain installed by inheritance. Values found to be property descriptors
//! are mediated through their get/set hooks. The reserved `__type__` name
//! reflects (and re-points) the object's type link.

use crate::{
    exception::{ExcType, RunError, RunResult},
    object::{DictKey, ObjKind},
    tracer::VmTracer,
    value::Value,
};

use super::Vm;

impl<Tr: VmTracer> Vm<Tr> {
    /// Chain lookup without property mediation or `__type__` handling.
    pub(crate) fn lookup_attr_raw(&self, value: Value, name: &str) -> Option<Value> {
        let Value::Ref(mut id) = value else { return None };
        loop {
            let obj = self.heap.get(id);
            if let Some(found) = obj.get_own_attr(name) {
                return Some(found);
            }
            id = obj.base?;
        }
    }

    /// Reads an attribute, invoking the getter when a property mediates it.
    pub(crate) fn get_attr(&mut self, object: Value, name: &str) -> RunResult<Value> {
        if name == "__type__" {
            return Ok(Value::Ref(self.heap.type_of(object)));
        }
        let Some(found) = self.lookup_attr_raw(object, name) else {
            return Err(ExcType::attribute_error(self.heap.type_name(object), name));
        };
        if let Some(getter) = self.as_property_getter(found) {
            return self.invoke(getter, Vec::new(), Vec::new(), Some(object));
        }
        Ok(found)
    }

    /// Writes an attribute. A name that currently resolves to a property is
    /// routed through its setter; a property without one is read-only.
    pub(crate) fn set_attr(&mut self, object: Value, name: &str, value: Value) -> RunResult<()> {
        let Value::Ref(object_id) = object else {
            return Err(ExcType::type_error(format!(
                "cannot set attributes on '{}' value",
                self.heap.type_name(object)
            )));
        };
        if name == "__type__" {
            let Value::Ref(type_id) = value else {
                return Err(ExcType::type_error("__type__ must be set to a type descriptor"));
            };
            self.heap.get(type_id).as_type()?;
            self.heap.get_mut(object_id).type_id = type_id;
            return Ok(());
        }
        if let Some(found) = self.lookup_attr_raw(object, name)
            && let Some(setter) = self.as_property_setter(found)?
        {
            self.invoke(setter, vec![value], Vec::new(), Some(object))?;
            return Ok(());
        }
        self.heap.get_mut(object_id).attrs.insert(name.to_owned(), value);
        Ok(())
    }

    fn as_property_getter(&self, value: Value) -> Option<Value> {
        let Value::Ref(id) = value else { return None };
        match &self.heap.get(id).kind {
            ObjKind::Property { getter, .. } => Some(*getter),
            _ => None,
        }
    }

    /// `Ok(None)` when the value is not a property; an error when it is a
    /// property with no setter.
    fn as_property_setter(&self, value: Value) -> RunResult<Option<Value>> {
        let Value::Ref(id) = value else { return Ok(None) };
        match &self.heap.get(id).kind {
            ObjKind::Property { setter: Some(setter), .. } => Ok(Some(*setter)),
            ObjKind::Property { setter: None, .. } => Err(RunError::new(
                ExcType::AttributeError,
                "property has no setter",
            )),
            _ => Ok(None),
        }
    }

    /// Indexed read: native paths for the built-in containers, then the
    /// `__getitem__` override.
    pub(crate) fn get_index(&mut self, object: Value, index: Value) -> RunResult<Value> {
        let Value::Ref(id) = object else {
            return Err(ExcType::type_error(format!(
                "'{}' value is not indexable",
                self.heap.type_name(object)
            )));
        };
        enum Plan {
            Char(Option<char>),
            Item(Option<Value>),
            DictHit(Option<Value>),
            Other,
        }
        let plan = match &self.heap.get(id).kind {
            ObjKind::Str(s) => {
                let i = int_index(index, s.chars().count())?;
                Plan::Char(i.and_then(|i| s.chars().nth(i)))
            }
            ObjKind::List(items) | ObjKind::Tuple(items) => {
                let i = int_index(index, items.len())?;
                Plan::Item(i.and_then(|i| items.get(i).copied()))
            }
            ObjKind::Dict(map) => {
                let key = DictKey::from_value(index, &self.heap)?;
                Plan::DictHit(map.get(&key).copied())
            }
            _ => Plan::Other,
        };
        match plan {
            Plan::Char(Some(c)) => Ok(self.heap.alloc_str(c.to_string())),
            Plan::Item(Some(value)) => Ok(value),
            Plan::Char(None) | Plan::Item(None) => Err(RunError::new(
                ExcType::IndexError,
                format!("{} index out of range", self.heap.type_name(object)),
            )),
            Plan::DictHit(Some(value)) => Ok(value),
            Plan::DictHit(None) => Err(RunError::new(
                ExcType::KeyError,
                index.native_str(&self.heap),
            )),
            Plan::Other => match self.lookup_attr_raw(object, "__getitem__") {
                Some(hook) => self.invoke(hook, vec![index], Vec::new(), Some(object)),
                None => Err(ExcType::not_supported(self.heap.type_name(object), "indexing")),
            },
        }
    }

    /// Indexed write: lists and dicts natively, `__setitem__` otherwise.
    /// Strings and tuples are immutable.
    pub(crate) fn set_index(&mut self, object: Value, index: Value, value: Value) -> RunResult<()> {
        let Value::Ref(id) = object else {
            return Err(ExcType::type_error(format!(
                "'{}' value is not indexable",
                self.heap.type_name(object)
            )));
        };
        enum Plan {
            List(Option<usize>),
            Dict(DictKey),
            Immutable,
            Other,
        }
        let plan = match &self.heap.get(id).kind {
            ObjKind::List(items) => Plan::List(int_index(index, items.len())?),
            ObjKind::Dict(_) => Plan::Dict(DictKey::from_value(index, &self.heap)?),
            ObjKind::Str(_) | ObjKind::Tuple(_) => Plan::Immutable,
            _ => Plan::Other,
        };
        match plan {
            Plan::List(Some(i)) => {
                if let ObjKind::List(items) = &mut self.heap.get_mut(id).kind {
                    items[i] = value;
                }
                Ok(())
            }
            Plan::List(None) => Err(RunError::new(
                ExcType::IndexError,
                "list assignment index out of range",
            )),
            Plan::Dict(key) => {
                if let ObjKind::Dict(map) = &mut self.heap.get_mut(id).kind {
                    map.insert(key, value);
                }
                Ok(())
            }
            Plan::Immutable => Err(ExcType::type_error(format!(
                "'{}' value does not support item assignment",
                self.heap.type_name(object)
            ))),
            Plan::Other => match self.lookup_attr_raw(object, "__setitem__") {
                Some(hook) => {
                    self.invoke(hook, vec![index, value], Vec::new(), Some(object))?;
                    Ok(())
                }
                None => Err(ExcType::not_supported(
                    self.heap.type_name(object),
                    "item assignment",
                )),
            },
        }
    }

    /// String conversion with the `__str__` override, falling back to the
    /// native rendering.
    pub fn display(&mut self, value: Value) -> RunResult<String> {
        if let Some(hook) = self.lookup_attr_raw(value, "__str__") {
            let result = self.invoke(hook, Vec::new(), Vec::new(), Some(value))?;
            return match self.heap.as_str(result) {
                Some(s) => Ok(s.to_owned()),
                None => Err(ExcType::type_error("__str__ must return a string")),
            };
        }
        Ok(value.native_str(&self.heap))
    }
}

/// Resolves an integer index against a sequence length, supporting negative
/// indices counted from the end. `Ok(None)` means out of range.
fn int_index(index: Value, len: usize) -> RunResult<Option<usize>> {
    let Value::Int(raw) = index else {
        return Err(ExcType::type_error("sequence indices must be integers"));
    };
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    let resolved = if raw < 0 { raw.saturating_add(len) } else { raw };
    if resolved < 0 || resolved >= len {
        return Ok(None);
    }
    Ok(Some(usize::try_from(resolved).unwrap_or(usize::MAX)))
}
