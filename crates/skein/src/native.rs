//! The native callable bridge.
//!
//! Host functions wrapped as guest callables participate identically in the
//! invocation and exception protocols. Host-runtime faults (panics) inside a
//! wrapped callable are caught at this boundary and re-wrapped as a guest
//! `InternalError` so guest handlers can intercept them uniformly.

use std::{fmt, panic::AssertUnwindSafe, rc::Rc};

use crate::{
    exception::{ExcType, RunError, RunResult},
    heap::Heap,
    value::Value,
};

/// Signature of a host function exposed to the guest.
///
/// Natives receive the heap (to allocate results) and the call's positional
/// arguments. They cannot re-enter guest code.
pub type NativeImpl = dyn Fn(&mut Heap, &[Value]) -> RunResult<Value>;

/// A host-provided callable value.
#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    func: Rc<NativeImpl>,
}

impl NativeFunction {
    pub fn new(name: impl Into<String>, func: impl Fn(&mut Heap, &[Value]) -> RunResult<Value> + 'static) -> Self {
        Self {
            name: name.into(),
            func: Rc::new(func),
        }
    }

    /// Invokes the wrapped host function, converting panics into a guest
    /// `InternalError` exception.
    pub fn call(&self, heap: &mut Heap, args: &[Value]) -> RunResult<Value> {
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| (self.func)(heap, args)));
        match result {
            Ok(guest_result) => guest_result,
            Err(payload) => {
                let detail = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_owned())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "host panic".to_owned());
                Err(RunError::new(
                    ExcType::InternalError,
                    format!("native function '{}' failed: {detail}", self.name),
                ))
            }
        }
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction").field("name", &self.name).finish()
    }
}
