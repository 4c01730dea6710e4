//! Binary and unary operator dispatch.
//!
//! One method per operator tag. Each method short-circuits to a native
//! implementation for the built-in kinds and falls back to the dunder
//! attribute override in its default path, so user-defined types participate
//! identically. Equality checks the override first: the native default for
//! instances is identity, which an `__eq__` must be able to replace.

use std::cmp::Ordering;

use crate::{
    exception::{ExcType, RunError, RunResult},
    object::ObjKind,
    tracer::VmTracer,
    value::{BinaryOp, Value},
};

use super::Vm;

impl<Tr: VmTracer> Vm<Tr> {
    /// Dispatches one binary operator tag.
    pub(crate) fn binary_op(&mut self, op: BinaryOp, lhs: Value, rhs: Value) -> RunResult<Value> {
        match op {
            BinaryOp::Add => self.op_add(lhs, rhs),
            BinaryOp::Sub => self.op_sub(lhs, rhs),
            BinaryOp::Mul => self.op_mul(lhs, rhs),
            BinaryOp::Div => self.op_div(lhs, rhs),
            BinaryOp::Mod => self.op_mod(lhs, rhs),
            BinaryOp::Eq => self.op_eq(lhs, rhs, false),
            BinaryOp::Ne => self.op_eq(lhs, rhs, true),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => self.op_compare(op, lhs, rhs),
        }
    }

    fn op_add(&mut self, lhs: Value, rhs: Value) -> RunResult<Value> {
        match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_add(b)
                .map(Value::Int)
                .ok_or_else(|| overflow(BinaryOp::Add)),
            (Value::Int(a), Value::Float(b)) => Ok(Value::Float(a as f64 + b)),
            (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a + b as f64)),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
            _ => {
                if let (Some(a), Some(b)) = (self.heap.as_str(lhs), self.heap.as_str(rhs)) {
                    let joined = format!("{a}{b}");
                    return Ok(self.heap.alloc_str(joined));
                }
                if let Some(joined) = self.concat_lists(lhs, rhs) {
                    return Ok(self.heap.alloc_list(joined));
                }
                self.binary_fallback(BinaryOp::Add, lhs, rhs)
            }
        }
    }

    fn op_sub(&mut self, lhs: Value, rhs: Value) -> RunResult<Value> {
        match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_sub(b)
                .map(Value::Int)
                .ok_or_else(|| overflow(BinaryOp::Sub)),
            (Value::Int(a), Value::Float(b)) => Ok(Value::Float(a as f64 - b)),
            (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a - b as f64)),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a - b)),
            _ => self.binary_fallback(BinaryOp::Sub, lhs, rhs),
        }
    }

    fn op_mul(&mut self, lhs: Value, rhs: Value) -> RunResult<Value> {
        match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_mul(b)
                .map(Value::Int)
                .ok_or_else(|| overflow(BinaryOp::Mul)),
            (Value::Int(a), Value::Float(b)) => Ok(Value::Float(a as f64 * b)),
            (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a * b as f64)),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a * b)),
            _ => {
                if let (Some(s), Value::Int(n)) = (self.heap.as_str(lhs), rhs) {
                    let repeated = s.repeat(usize::try_from(n).unwrap_or(0));
                    return Ok(self.heap.alloc_str(repeated));
                }
                if let (Value::Ref(id), Value::Int(n)) = (lhs, rhs)
                    && let ObjKind::List(items) = &self.heap.get(id).kind
                {
                    let mut repeated = Vec::new();
                    for _ in 0..n.max(0) {
                        repeated.extend_from_slice(items);
                    }
                    return Ok(self.heap.alloc_list(repeated));
                }
                self.binary_fallback(BinaryOp::Mul, lhs, rhs)
            }
        }
    }

    /// Division always produces a float, matching the guest language's `/`.
    fn op_div(&mut self, lhs: Value, rhs: Value) -> RunResult<Value> {
        let pair = match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => Some((a as f64, b as f64)),
            (Value::Int(a), Value::Float(b)) => Some((a as f64, b)),
            (Value::Float(a), Value::Int(b)) => Some((a, b as f64)),
            (Value::Float(a), Value::Float(b)) => Some((a, b)),
            _ => None,
        };
        match pair {
            Some((_, b)) if b == 0.0 => Err(RunError::new(ExcType::ZeroDivisionError, "division by zero")),
            Some((a, b)) => Ok(Value::Float(a / b)),
            None => self.binary_fallback(BinaryOp::Div, lhs, rhs),
        }
    }

    fn op_mod(&mut self, lhs: Value, rhs: Value) -> RunResult<Value> {
        match (lhs, rhs) {
            (Value::Int(_), Value::Int(0)) => {
                Err(RunError::new(ExcType::ZeroDivisionError, "modulo by zero"))
            }
            (Value::Int(a), Value::Int(b)) => a
                .checked_rem(b)
                .map(Value::Int)
                .ok_or_else(|| overflow(BinaryOp::Mod)),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a % b)),
            (Value::Int(a), Value::Float(b)) => Ok(Value::Float(a as f64 % b)),
            (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a % b as f64)),
            _ => self.binary_fallback(BinaryOp::Mod, lhs, rhs),
        }
    }

    /// Equality and inequality. The override tier runs first: the native
    /// default for instances is identity, and `__eq__`/`__ne__` must win
    /// over it. An `__eq__` without `__ne__` also serves negated.
    fn op_eq(&mut self, lhs: Value, rhs: Value, negate: bool) -> RunResult<Value> {
        let dunder = if negate { "__ne__" } else { "__eq__" };
        if let Some(hook) = self.lookup_attr_raw(lhs, dunder) {
            return self.invoke(hook, vec![rhs], Vec::new(), Some(lhs));
        }
        if negate && let Some(hook) = self.lookup_attr_raw(lhs, "__eq__") {
            let result = self.invoke(hook, vec![rhs], Vec::new(), Some(lhs))?;
            return Ok(Value::Bool(!result.is_truthy(&self.heap)));
        }
        let eq = lhs.native_eq(rhs, &self.heap);
        Ok(Value::Bool(if negate { !eq } else { eq }))
    }

    fn op_compare(&mut self, op: BinaryOp, lhs: Value, rhs: Value) -> RunResult<Value> {
        match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Bool(ord_holds(op, a.cmp(&b)))),
            (Value::Int(a), Value::Float(b)) => Ok(Value::Bool(float_holds(op, a as f64, b))),
            (Value::Float(a), Value::Int(b)) => Ok(Value::Bool(float_holds(op, a, b as f64))),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Bool(float_holds(op, a, b))),
            _ => {
                if let (Some(a), Some(b)) = (self.heap.as_str(lhs), self.heap.as_str(rhs)) {
                    return Ok(Value::Bool(ord_holds(op, a.cmp(b))));
                }
                self.binary_fallback(op, lhs, rhs)
            }
        }
    }

    /// The default tier: the dunder override on the left operand, else a
    /// type-dependent error.
    fn binary_fallback(&mut self, op: BinaryOp, lhs: Value, rhs: Value) -> RunResult<Value> {
        if let Some(hook) = self.lookup_attr_raw(lhs, op.dunder()) {
            return self.invoke(hook, vec![rhs], Vec::new(), Some(lhs));
        }
        let lhs_name = self.heap.type_name(lhs).to_owned();
        if is_instance(self, lhs) {
            return Err(ExcType::not_supported(
                &lhs_name,
                &format!("operator '{}'", op.symbol()),
            ));
        }
        Err(ExcType::type_error(format!(
            "unsupported operand type(s) for {}: '{lhs_name}' and '{}'",
            op.symbol(),
            self.heap.type_name(rhs)
        )))
    }

    fn concat_lists(&self, lhs: Value, rhs: Value) -> Option<Vec<Value>> {
        let (Value::Ref(a), Value::Ref(b)) = (lhs, rhs) else { return None };
        match (&self.heap.get(a).kind, &self.heap.get(b).kind) {
            (ObjKind::List(x), ObjKind::List(y)) => {
                let mut joined = x.clone();
                joined.extend_from_slice(y);
                Some(joined)
            }
            _ => None,
        }
    }

    /// Arithmetic negation with the `__neg__` override.
    pub(crate) fn unary_neg(&mut self, value: Value) -> RunResult<Value> {
        match value {
            Value::Int(i) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| RunError::new(ExcType::OverflowError, "integer negation overflowed")),
            Value::Float(f) => Ok(Value::Float(-f)),
            Value::Bool(b) => Ok(Value::Int(-i64::from(b))),
            _ => match self.lookup_attr_raw(value, "__neg__") {
                Some(hook) => self.invoke(hook, Vec::new(), Vec::new(), Some(value)),
                None => Err(ExcType::not_supported(self.heap.type_name(value), "unary '-'")),
            },
        }
    }
}

fn overflow(op: BinaryOp) -> RunError {
    RunError::new(
        ExcType::OverflowError,
        format!("integer overflow in '{}'", op.symbol()),
    )
}

fn ord_holds(op: BinaryOp, ordering: Ordering) -> bool {
    match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::Ge => ordering != Ordering::Less,
        _ => false,
    }
}

fn float_holds(op: BinaryOp, a: f64, b: f64) -> bool {
    match op {
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        BinaryOp::Ge => a >= b,
        _ => false,
    }
}

fn is_instance<Tr: VmTracer>(vm: &Vm<Tr>, value: Value) -> bool {
    matches!(value, Value::Ref(id) if matches!(vm.heap.get(id).kind, ObjKind::Plain))
}
