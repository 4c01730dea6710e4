//! The compiled code unit consumed by the VM.
//!
//! A `Code` is a flat instruction sequence plus a constant pool and a name
//! pool, with a parallel source-line table for stack traces. The engine
//! treats it as opaque input; how it was produced (compiler front end,
//! hand-assembly in tests) is not this module's concern.

use std::rc::Rc;

use super::op::Instr;

/// Compile-time constant pool entry.
#[derive(Debug, Clone)]
pub enum Const {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Function template instantiated by `MakeFunction`/`MakeClosure`.
    Func(Rc<FuncConst>),
}

/// Compile-time description of a function: code unit plus parameter metadata.
#[derive(Debug)]
pub struct FuncConst {
    pub name: String,
    pub code: Rc<Code>,
    /// Declared parameters in order; groups unpack tuple arguments.
    pub params: Vec<Param>,
    /// Default values for the trailing parameters. `defaults[i]` belongs to
    /// `params[params.len() - defaults.len() + i]`.
    pub defaults: Vec<Const>,
    /// Name binding the collected positional tail, if declared.
    pub varargs: Option<String>,
    /// Name binding the collected keyword mapping, if declared.
    pub kwargs: Option<String>,
}

/// A declared parameter: a plain name or a nested destructuring group.
#[derive(Debug, Clone)]
pub enum Param {
    Name(String),
    /// Tuple-destructuring parameter; the argument must be a tuple of
    /// matching shape.
    Group(Vec<Param>),
}

impl Param {
    /// Renders the parameter shape for error messages.
    #[must_use]
    pub fn shape(&self) -> String {
        match self {
            Self::Name(name) => name.clone(),
            Self::Group(parts) => {
                let inner: Vec<String> = parts.iter().map(Self::shape).collect();
                format!("({})", inner.join(", "))
            }
        }
    }
}

/// A compiled code unit: instructions, pools, and line table.
#[derive(Debug)]
pub struct Code {
    /// Function name, or `<module>` for module-level code.
    pub name: String,
    pub instrs: Vec<Instr>,
    pub consts: Vec<Const>,
    /// Local/global/attribute names referenced by instruction operands.
    pub names: Vec<String>,
    /// Source line per instruction, parallel to `instrs`.
    pub lines: Vec<u32>,
}

impl Code {
    /// Source line of the instruction at `ip`, or 0 past the end.
    #[must_use]
    pub fn line_at(&self, ip: usize) -> u32 {
        self.lines.get(ip).copied().unwrap_or(0)
    }
}
