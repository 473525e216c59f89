//! Abstract frames: local variables and operand stack.

use crate::value::Value;

/// Locals and operand stack before an instruction.
///
/// Locals are indexed by slot; a long or double occupies its slot and the
/// next, which holds [`Value::Top`]. The stack holds one entry per value
/// regardless of its size; [`stack_depth`](Self::stack_depth) counts slots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    locals: Vec<Value>,
    stack: Vec<Value>,
}

impl Frame {
    /// A frame with `max_locals` unset locals and an empty stack.
    pub fn new(max_locals: usize) -> Self {
        Self {
            locals: vec![Value::Top; max_locals],
            stack: Vec::new(),
        }
    }

    #[inline]
    pub fn locals(&self) -> &[Value] {
        &self.locals
    }

    #[inline]
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    #[inline]
    pub fn local(&self, slot: u16) -> Option<&Value> {
        self.locals.get(usize::from(slot))
    }

    /// Store `value` at `slot`. Returns `false` if the value does not fit.
    pub fn set_local(&mut self, slot: u16, value: Value) -> bool {
        let slot = usize::from(slot);
        let size = value.slot_size();
        if slot + size > self.locals.len() {
            return false;
        }
        // Overwriting the second half of a wide value kills the whole value.
        if slot > 0 && self.locals[slot - 1].is_category2() {
            self.locals[slot - 1] = Value::Top;
        }
        if size == 2 {
            self.locals[slot + 1] = Value::Top;
        }
        self.locals[slot] = value;
        true
    }

    #[inline]
    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    #[inline]
    pub fn pop(&mut self) -> Option<Value> {
        self.stack.pop()
    }

    /// The value `depth` entries below the top (0 is the top).
    pub fn peek(&self, depth: usize) -> Option<&Value> {
        self.stack.len().checked_sub(depth + 1).map(|i| &self.stack[i])
    }

    /// Number of stack entries.
    #[inline]
    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    /// Stack height in slots.
    pub fn stack_depth(&self) -> usize {
        self.stack.iter().map(Value::slot_size).sum()
    }

    /// A copy of this frame's locals with `value` as the only stack entry,
    /// as seen on entry to an exception handler.
    pub fn with_single_stack_entry(&self, value: Value) -> Self {
        Self {
            locals: self.locals.clone(),
            stack: vec![value],
        }
    }

    /// Join `other` into `self`. Returns whether `self` changed, or the two
    /// stack lengths if they differ.
    pub fn merge(&mut self, other: &Frame) -> Result<bool, (usize, usize)> {
        if self.stack.len() != other.stack.len() {
            return Err((self.stack.len(), other.stack.len()));
        }
        let mut changed = false;
        for (mine, theirs) in self.locals.iter_mut().zip(&other.locals) {
            changed |= mine.merge(theirs);
        }
        for (mine, theirs) in self.stack.iter_mut().zip(&other.stack) {
            changed |= mine.merge(theirs);
        }
        Ok(changed)
    }
}
