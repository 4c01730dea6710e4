//! Heap-allocated activation records.
//!
//! Frames are independently-owned structures rather than native stack frames,
//! which is what makes closure capture and generator suspend/resume across
//! arbitrary call depth tractable. They live in a slab with free-list reuse;
//! a frame survives its pop only while a closure or generator retains it.

use std::rc::Rc;

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::{bytecode::Code, heap::HeapId, value::Value};

/// Index of a frame in the slab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(u32);

impl FrameId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A registered exception handler.
///
/// Captures enough state at registration to restore the frame on catch: the
/// operand-stack and disposer depths to truncate to, and the absolute
/// instruction offset to resume at.
#[derive(Debug, Clone, Copy)]
pub struct HandlerRecord {
    pub stack_depth: usize,
    pub disposer_depth: usize,
    pub resume: usize,
}

/// One activation record per function invocation.
#[derive(Debug)]
pub struct Frame {
    /// Code unit being executed.
    pub code: Rc<Code>,
    /// Instruction index within `code`.
    pub ip: usize,
    /// Named local bindings, private to this frame unless it is a closure
    /// duplicate (see `parent_locals`).
    pub locals: AHashMap<String, Value>,
    /// Operand stack used by the instruction loop as working storage.
    pub stack: Vec<Value>,
    /// LIFO stack of registered exception handlers.
    pub handlers: SmallVec<[HandlerRecord; 4]>,
    /// LIFO stack of scoped resources whose exit hook runs on frame exit or
    /// on unwind, in reverse acquisition order.
    pub disposables: Vec<Value>,
    /// Bound "self" for instance methods.
    pub receiver: Option<Value>,
    /// The calling frame; `None` for the topmost frame.
    pub parent: Option<FrameId>,
    /// Set on closure duplicate frames: stores to a name that exists in this
    /// frame's locals also write through to the origin frame.
    pub parent_locals: Option<FrameId>,
    /// Module supplying global-variable storage.
    pub module: HeapId,
    /// The callable that created this frame; wrapped into the generator when
    /// the frame suspends at its first yield.
    pub callee: Value,
    /// Original positional arguments, recorded on the generator.
    pub args: Vec<Value>,
    /// Generator that holds this frame, once one has been created.
    pub generator: Option<HeapId>,
    /// True when execution suspended via a yield rather than returning.
    pub yielded: bool,
    /// Set during unwinding to stop the instruction loop stepping this frame.
    pub aborting: bool,
    /// Retained by a closure capture; the slot outlives every pop, including
    /// generator exhaustion.
    pub retained: bool,
    /// Pinned by a suspended generator; cleared when the generator exhausts.
    pub pinned: bool,
}

impl Frame {
    /// Creates a frame for a fresh invocation.
    pub fn new(code: Rc<Code>, module: HeapId, parent: Option<FrameId>) -> Self {
        Self {
            code,
            ip: 0,
            locals: AHashMap::new(),
            stack: Vec::new(),
            handlers: SmallVec::new(),
            disposables: Vec::new(),
            receiver: None,
            parent,
            parent_locals: None,
            module,
            callee: Value::None,
            args: Vec::new(),
            generator: None,
            yielded: false,
            aborting: false,
            retained: false,
            pinned: false,
        }
    }
}

/// Slab of frames with free-list reuse.
#[derive(Debug, Default)]
pub struct FrameArena {
    slots: Vec<Option<Frame>>,
    free: Vec<FrameId>,
}

impl FrameArena {
    pub fn alloc(&mut self, frame: Frame) -> FrameId {
        if let Some(id) = self.free.pop() {
            self.slots[id.index()] = Some(frame);
            id
        } else {
            let id = FrameId(u32::try_from(self.slots.len()).expect("frame slab exceeds u32 slots"));
            self.slots.push(Some(frame));
            id
        }
    }

    #[must_use]
    pub fn get(&self, id: FrameId) -> &Frame {
        self.slots[id.index()].as_ref().expect("frame slot is vacant")
    }

    pub fn get_mut(&mut self, id: FrameId) -> &mut Frame {
        self.slots[id.index()].as_mut().expect("frame slot is vacant")
    }

    /// Releases a popped frame unless a closure or generator keeps it alive.
    pub fn release(&mut self, id: FrameId) {
        let frame = self.get(id);
        if !frame.retained && !frame.pinned {
            self.slots[id.index()] = None;
            self.free.push(id);
        }
    }

    /// Drops a generator's pin (exhaustion path). The slot is freed unless a
    /// closure created inside the generator body still retains the frame.
    pub fn unpin(&mut self, id: FrameId) {
        let Some(frame) = self.slots[id.index()].as_mut() else {
            return;
        };
        frame.pinned = false;
        if frame.retained {
            return;
        }
        self.slots[id.index()] = None;
        self.free.push(id);
    }

    /// Number of live frames (diagnostics only).
    #[must_use]
    pub fn live(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}
