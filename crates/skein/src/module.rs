//! Module objects and the per-VM host context.
//!
//! A module is an ordinary guest object whose attribute table supplies
//! global-variable storage. The host context owns the module table and the
//! caller-supplied import resolver; it is explicit per-VM state, never a
//! process-wide singleton.

use std::{fmt, rc::Rc};

use ahash::AHashMap;

use crate::{
    exception::RunResult,
    heap::{Heap, HeapId},
    object::ObjKind,
    value::Value,
};

/// Callback mapping a module path to a module value.
///
/// Consulted lazily by the import instruction on the first unresolved path;
/// results are cached in the module table. Returning `Ok(None)` means the
/// path is unknown (an `ImportError` is raised).
pub type ImportResolver = dyn Fn(&mut Heap, &str) -> RunResult<Option<Value>>;

/// VM-wide mutable state owned by a single VM instance.
pub struct HostContext {
    /// Resolved modules by path.
    modules: AHashMap<String, Value>,
    resolver: Option<Rc<ImportResolver>>,
}

impl HostContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            modules: AHashMap::new(),
            resolver: None,
        }
    }

    /// Installs the import resolver callback.
    #[must_use]
    pub fn with_resolver(mut self, resolver: impl Fn(&mut Heap, &str) -> RunResult<Option<Value>> + 'static) -> Self {
        self.resolver = Some(Rc::new(resolver));
        self
    }

    /// Registers a pre-resolved module under a path.
    pub fn register_module(&mut self, path: impl Into<String>, module: Value) {
        self.modules.insert(path.into(), module);
    }

    /// Returns the cached module for a path, if already resolved.
    #[must_use]
    pub fn cached(&self, path: &str) -> Option<Value> {
        self.modules.get(path).copied()
    }

    /// Resolves a path through the callback, caching the result.
    pub fn resolve(&mut self, heap: &mut Heap, path: &str) -> RunResult<Option<Value>> {
        if let Some(module) = self.modules.get(path) {
            return Ok(Some(*module));
        }
        let Some(resolver) = self.resolver.clone() else {
            return Ok(None);
        };
        let resolved = resolver(heap, path)?;
        if let Some(module) = resolved {
            self.modules.insert(path.to_owned(), module);
        }
        Ok(resolved)
    }
}

impl Default for HostContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HostContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostContext")
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .field("has_resolver", &self.resolver.is_some())
            .finish()
    }
}

/// Allocates a fresh module object.
pub fn alloc_module(heap: &mut Heap, name: impl Into<String>) -> HeapId {
    let type_id = heap.types.module_type;
    heap.allocate(ObjKind::Module { name: name.into() }, type_id)
}

/// Returns a module's dotted name.
#[must_use]
pub fn module_name(heap: &Heap, module: HeapId) -> &str {
    match &heap.get(module).kind {
        ObjKind::Module { name } => name,
        _ => "<module>",
    }
}
