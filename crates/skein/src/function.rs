//! Runtime function definitions and argument binding.
//!
//! A [`FuncDef`] is the runtime instantiation of a compile-time
//! `FuncConst`: the code unit, the parameter metadata, defaults materialized
//! to values, and the defining module. Binding validates argument counts and
//! distributes positionals, keywords, the variadic tail, and defaults into a
//! frame's locals.

use std::rc::Rc;

use ahash::AHashMap;

use crate::{
    bytecode::{Code, Param},
    exception::{ExcType, RunError, RunResult},
    heap::{Heap, HeapId},
    object::{DictKey, ObjKind},
    value::Value,
};

/// A plain function: compiled code plus parameter metadata and defining module.
#[derive(Debug)]
pub struct FuncDef {
    pub name: String,
    pub code: Rc<Code>,
    pub params: Vec<Param>,
    /// Default values for the trailing parameters, materialized at
    /// `MakeFunction` time.
    pub defaults: Vec<Value>,
    pub varargs: Option<String>,
    pub kwargs: Option<String>,
    /// Module supplying this function's global scope.
    pub module: HeapId,
}

impl FuncDef {
    /// Minimum number of positional-or-keyword arguments a call must supply.
    #[must_use]
    pub fn required(&self) -> usize {
        self.params.len() - self.defaults.len()
    }

    /// Binds a call's arguments into `locals`.
    ///
    /// Order of precedence per parameter: positional argument, keyword
    /// argument, declared default. The variadic tail collects surplus
    /// positionals into a tuple; the keyword-dict parameter collects surplus
    /// keywords into a dict. Parameter bindings are written directly (no
    /// closure write-through; they are new bindings in the callee scope).
    pub fn bind_arguments(
        &self,
        args: &[Value],
        kwargs: &[(String, Value)],
        heap: &mut Heap,
        locals: &mut AHashMap<String, Value>,
    ) -> RunResult<()> {
        let fixed = self.params.len();
        let required = self.required();

        if args.len() > fixed && self.varargs.is_none() {
            return Err(RunError::new(
                ExcType::ArgumentError,
                format!(
                    "{}() takes at most {fixed} arguments ({} given)",
                    self.name,
                    args.len()
                ),
            ));
        }

        let mut kw_used = vec![false; kwargs.len()];

        for (i, param) in self.params.iter().enumerate() {
            if i < args.len() {
                bind_param(param, args[i], heap, locals)?;
                continue;
            }
            // Keyword arguments only reach plain named parameters.
            if let Param::Name(name) = param
                && let Some(pos) = kwargs.iter().position(|(k, _)| k == name)
            {
                kw_used[pos] = true;
                locals.insert(name.clone(), kwargs[pos].1);
                continue;
            }
            if i >= required {
                bind_param(param, self.defaults[i - required], heap, locals)?;
                continue;
            }
            return Err(RunError::new(
                ExcType::ArgumentError,
                format!(
                    "{}() takes at least {required} arguments ({} given)",
                    self.name,
                    args.len()
                ),
            ));
        }

        if let Some(varargs) = &self.varargs {
            let tail: Vec<Value> = args.get(fixed..).unwrap_or(&[]).to_vec();
            let tuple = heap.alloc_tuple(tail);
            locals.insert(varargs.clone(), tuple);
        }

        if let Some(kwargs_name) = &self.kwargs {
            let dict = heap.alloc_dict();
            let Value::Ref(dict_id) = dict else { unreachable!() };
            for (pos, (key, value)) in kwargs.iter().enumerate() {
                if !kw_used[pos] {
                    kw_used[pos] = true;
                    if let ObjKind::Dict(map) = &mut heap.get_mut(dict_id).kind {
                        map.insert(DictKey::Str(key.clone()), *value);
                    }
                }
            }
            locals.insert(kwargs_name.clone(), dict);
        }

        if let Some(pos) = kw_used.iter().position(|used| !used) {
            return Err(RunError::new(
                ExcType::ArgumentError,
                format!("{}() got an unexpected keyword argument '{}'", self.name, kwargs[pos].0),
            ));
        }

        Ok(())
    }
}

/// Binds one parameter, recursively unpacking destructuring groups.
fn bind_param(
    param: &Param,
    value: Value,
    heap: &mut Heap,
    locals: &mut AHashMap<String, Value>,
) -> RunResult<()> {
    match param {
        Param::Name(name) => {
            locals.insert(name.clone(), value);
            Ok(())
        }
        Param::Group(parts) => {
            let Value::Ref(id) = value else {
                return Err(shape_error(param, value, heap));
            };
            let items = match &heap.get(id).kind {
                ObjKind::Tuple(items) if items.len() == parts.len() => items.clone(),
                _ => return Err(shape_error(param, value, heap)),
            };
            for (part, item) in parts.iter().zip(items) {
                bind_param(part, item, heap, locals)?;
            }
            Ok(())
        }
    }
}

fn shape_error(param: &Param, value: Value, heap: &Heap) -> RunError {
    ExcType::type_error(format!(
        "cannot unpack '{}' value into parameter shape {}",
        heap.type_name(value),
        param.shape()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::CodeBuilder;

    fn make_func(params: Vec<Param>, defaults: Vec<Value>, varargs: Option<&str>, kwargs: Option<&str>) -> FuncDef {
        let heap = Heap::new();
        let module = heap.types.type_type; // placeholder, binding never reads it
        FuncDef {
            name: "f".to_owned(),
            code: CodeBuilder::new("f").build(),
            params,
            defaults,
            varargs: varargs.map(str::to_owned),
            kwargs: kwargs.map(str::to_owned),
            module,
        }
    }

    #[test]
    fn defaults_fill_missing_trailing_arguments() {
        let mut heap = Heap::new();
        let func = make_func(
            vec![Param::Name("a".to_owned()), Param::Name("b".to_owned())],
            vec![Value::Int(9)],
            None,
            None,
        );
        let mut locals = AHashMap::new();
        func.bind_arguments(&[Value::Int(1)], &[], &mut heap, &mut locals).unwrap();
        assert_eq!(locals["a"], Value::Int(1));
        assert_eq!(locals["b"], Value::Int(9));
    }

    #[test]
    fn too_few_arguments_is_argument_error() {
        let mut heap = Heap::new();
        let func = make_func(vec![Param::Name("a".to_owned())], vec![], None, None);
        let mut locals = AHashMap::new();
        let err = func.bind_arguments(&[], &[], &mut heap, &mut locals).unwrap_err();
        assert_eq!(err.exc_type(), ExcType::ArgumentError);
    }

    #[test]
    fn variadic_tail_collects_surplus() {
        let mut heap = Heap::new();
        let func = make_func(vec![Param::Name("a".to_owned())], vec![], Some("rest"), None);
        let mut locals = AHashMap::new();
        func.bind_arguments(&[Value::Int(1), Value::Int(2), Value::Int(3)], &[], &mut heap, &mut locals)
            .unwrap();
        let Value::Ref(id) = locals["rest"] else { panic!("rest should be a tuple") };
        let ObjKind::Tuple(items) = &heap.get(id).kind else {
            panic!("rest should be a tuple")
        };
        assert_eq!(items.as_slice(), &[Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn group_shape_mismatch_is_type_error() {
        let mut heap = Heap::new();
        let func = make_func(
            vec![Param::Group(vec![Param::Name("x".to_owned()), Param::Name("y".to_owned())])],
            vec![],
            None,
            None,
        );
        let mut locals = AHashMap::new();
        let pair = heap.alloc_tuple(vec![Value::Int(1)]);
        let err = func.bind_arguments(&[pair], &[], &mut heap, &mut locals).unwrap_err();
        assert_eq!(err.exc_type(), ExcType::TypeError);
    }

    #[test]
    fn group_unpacks_nested_tuples() {
        let mut heap = Heap::new();
        let func = make_func(
            vec![Param::Group(vec![Param::Name("x".to_owned()), Param::Name("y".to_owned())])],
            vec![],
            None,
            None,
        );
        let mut locals = AHashMap::new();
        let pair = heap.alloc_tuple(vec![Value::Int(4), Value::Int(5)]);
        func.bind_arguments(&[pair], &[], &mut heap, &mut locals).unwrap();
        assert_eq!(locals["x"], Value::Int(4));
        assert_eq!(locals["y"], Value::Int(5));
    }
}
