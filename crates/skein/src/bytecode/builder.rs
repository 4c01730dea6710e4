//! Code builder used by the compiler front end and by tests.
//!
//! Emits instructions with forward-label patching for the absolute jump
//! operands. Labels are cheap indices; binding a label records the current
//! instruction offset and patches every emission site that referenced it.

use std::rc::Rc;

use super::{
    code::{Code, Const, FuncConst, Param},
    op::{Instr, Opcode},
};
use crate::value::BinaryOp;

/// A forward-patchable jump target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

/// Incremental builder for a [`Code`] unit.
#[derive(Debug)]
pub struct CodeBuilder {
    name: String,
    instrs: Vec<Instr>,
    consts: Vec<Const>,
    names: Vec<String>,
    lines: Vec<u32>,
    current_line: u32,
    /// Bound offset per label, `None` while unbound.
    labels: Vec<Option<u32>>,
    /// (instruction index, label) pairs awaiting a bind.
    patches: Vec<(usize, Label)>,
}

impl CodeBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instrs: Vec::new(),
            consts: Vec::new(),
            names: Vec::new(),
            lines: Vec::new(),
            current_line: 1,
            labels: Vec::new(),
            patches: Vec::new(),
        }
    }

    /// Sets the source line attributed to subsequently emitted instructions.
    pub fn set_line(&mut self, line: u32) -> &mut Self {
        self.current_line = line;
        self
    }

    /// Interns a name in the name pool, deduplicating.
    pub fn name_index(&mut self, name: &str) -> u32 {
        if let Some(pos) = self.names.iter().position(|n| n == name) {
            return u32::try_from(pos).expect("name pool exceeds u32");
        }
        self.names.push(name.to_owned());
        u32::try_from(self.names.len() - 1).expect("name pool exceeds u32")
    }

    /// Adds a constant to the pool (no deduplication; pools stay small).
    pub fn const_index(&mut self, value: Const) -> u32 {
        self.consts.push(value);
        u32::try_from(self.consts.len() - 1).expect("const pool exceeds u32")
    }

    /// Emits an instruction with a raw operand.
    pub fn emit(&mut self, op: Opcode, arg: u32) -> &mut Self {
        self.instrs.push(Instr::new(op, arg));
        self.lines.push(self.current_line);
        self
    }

    /// Emits an instruction with no meaningful operand.
    pub fn op(&mut self, op: Opcode) -> &mut Self {
        self.emit(op, 0)
    }

    /// Creates an unbound label.
    pub fn label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Binds a label to the current instruction offset.
    pub fn bind(&mut self, label: Label) -> &mut Self {
        let offset = u32::try_from(self.instrs.len()).expect("code exceeds u32 instructions");
        self.labels[label.0] = Some(offset);
        self
    }

    /// Emits a jump-family instruction targeting a label.
    pub fn jump_op(&mut self, op: Opcode, target: Label) -> &mut Self {
        let index = self.instrs.len();
        self.emit(op, u32::MAX);
        self.patches.push((index, target));
        self
    }

    // Convenience emitters, named after the opcodes they produce.

    pub fn load_const(&mut self, value: Const) -> &mut Self {
        let idx = self.const_index(value);
        self.emit(Opcode::LoadConst, idx)
    }

    pub fn load_int(&mut self, value: i64) -> &mut Self {
        self.load_const(Const::Int(value))
    }

    pub fn load_str(&mut self, value: &str) -> &mut Self {
        self.load_const(Const::Str(value.to_owned()))
    }

    pub fn load_local(&mut self, name: &str) -> &mut Self {
        let idx = self.name_index(name);
        self.emit(Opcode::LoadLocal, idx)
    }

    pub fn store_local(&mut self, name: &str) -> &mut Self {
        let idx = self.name_index(name);
        self.emit(Opcode::StoreLocal, idx)
    }

    pub fn load_global(&mut self, name: &str) -> &mut Self {
        let idx = self.name_index(name);
        self.emit(Opcode::LoadGlobal, idx)
    }

    pub fn store_global(&mut self, name: &str) -> &mut Self {
        let idx = self.name_index(name);
        self.emit(Opcode::StoreGlobal, idx)
    }

    pub fn load_attr(&mut self, name: &str) -> &mut Self {
        let idx = self.name_index(name);
        self.emit(Opcode::LoadAttr, idx)
    }

    pub fn store_attr(&mut self, name: &str) -> &mut Self {
        let idx = self.name_index(name);
        self.emit(Opcode::StoreAttr, idx)
    }

    pub fn binary(&mut self, op: BinaryOp) -> &mut Self {
        const TAGS: [BinaryOp; 11] = [
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
        let tag = TAGS.iter().position(|t| *t == op).expect("tag table is exhaustive");
        self.emit(Opcode::Binary, u32::try_from(tag).expect("tag fits u32"))
    }

    pub fn jump(&mut self, target: Label) -> &mut Self {
        self.jump_op(Opcode::Jump, target)
    }

    pub fn jump_if_false(&mut self, target: Label) -> &mut Self {
        self.jump_op(Opcode::JumpIfFalse, target)
    }

    pub fn jump_if_true(&mut self, target: Label) -> &mut Self {
        self.jump_op(Opcode::JumpIfTrue, target)
    }

    pub fn call(&mut self, nargs: u32) -> &mut Self {
        self.emit(Opcode::Call, nargs)
    }

    /// Keyword call: positional count in the low half, keyword count in the high.
    pub fn call_kw(&mut self, npos: u32, nkw: u32) -> &mut Self {
        assert!(npos <= 0xFFFF && nkw <= 0xFFFF, "call argument counts exceed u16");
        self.emit(Opcode::CallKw, npos | (nkw << 16))
    }

    pub fn make_function(&mut self, func: FuncConst) -> &mut Self {
        let idx = self.const_index(Const::Func(Rc::new(func)));
        self.emit(Opcode::MakeFunction, idx)
    }

    pub fn make_closure(&mut self, func: FuncConst) -> &mut Self {
        let idx = self.const_index(Const::Func(Rc::new(func)));
        self.emit(Opcode::MakeClosure, idx)
    }

    pub fn make_type(&mut self, name: &str) -> &mut Self {
        let idx = self.name_index(name);
        self.emit(Opcode::MakeType, idx)
    }

    pub fn make_subtype(&mut self, name: &str) -> &mut Self {
        let idx = self.name_index(name);
        self.emit(Opcode::MakeSubtype, idx)
    }

    pub fn push_handler(&mut self, resume: Label) -> &mut Self {
        self.jump_op(Opcode::PushHandler, resume)
    }

    pub fn iter_advance(&mut self, exhausted: Label) -> &mut Self {
        self.jump_op(Opcode::IterAdvance, exhausted)
    }

    pub fn import(&mut self, path: &str) -> &mut Self {
        let idx = self.name_index(path);
        self.emit(Opcode::Import, idx)
    }

    /// Finalizes the unit, patching all label references.
    ///
    /// Panics when a referenced label was never bound; that is a builder
    /// usage bug, not a runtime condition.
    #[must_use]
    pub fn build(mut self) -> Rc<Code> {
        for (index, label) in std::mem::take(&mut self.patches) {
            let offset = self.labels[label.0].expect("jump references an unbound label");
            self.instrs[index].arg = offset;
        }
        Rc::new(Code {
            name: self.name,
            instrs: self.instrs,
            consts: self.consts,
            names: self.names,
            lines: self.lines,
        })
    }
}

/// Shorthand for a function template with plain named parameters and no
/// defaults or variadics.
#[must_use]
pub fn func_const(name: &str, params: &[&str], code: Rc<Code>) -> FuncConst {
    FuncConst {
        name: name.to_owned(),
        code,
        params: params.iter().map(|p| Param::Name((*p).to_owned())).collect(),
        defaults: Vec::new(),
        varargs: None,
        kwargs: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_patch_forward_references() {
        let mut b = CodeBuilder::new("<test>");
        let end = b.label();
        b.load_int(1);
        b.jump_if_false(end);
        b.load_int(2);
        b.bind(end);
        b.op(Opcode::Return);
        let code = b.build();
        assert_eq!(code.instrs[1].op, Opcode::JumpIfFalse);
        assert_eq!(code.instrs[1].arg, 3);
    }

    #[test]
    fn name_pool_deduplicates() {
        let mut b = CodeBuilder::new("<test>");
        b.load_local("x");
        b.store_local("x");
        b.load_local("y");
        let code = b.build();
        assert_eq!(code.names, vec!["x".to_owned(), "y".to_owned()]);
        assert_eq!(code.instrs[0].arg, code.instrs[1].arg);
    }

    #[test]
    fn line_table_tracks_set_line() {
        let mut b = CodeBuilder::new("<test>");
        b.set_line(10).load_int(1);
        b.set_line(11).op(Opcode::Return);
        let code = b.build();
        assert_eq!(code.lines, vec![10, 11]);
        assert_eq!(code.line_at(1), 11);
        assert_eq!(code.line_at(99), 0);
    }
}
