use thiserror::Error;

/// The abstract execution state at one instruction position: a fixed set of
/// local slots and a growable operand stack. The slot count is fixed at
/// creation, the stack grows and shrinks as instructions execute.
///
/// Each position of a method owns at most one frame; the solver creates it
/// the first time the position is reached and mutates it in place on every
/// later visit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame<V> {
    locals: Vec<V>,
    stack: Vec<V>,
}

/// Two frames with differing slot counts or stack heights met at a merge
/// point. With a validated graph and a well-behaved domain this cannot
/// happen; it indicates a bug in the domain, not bad user input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error(
    "cannot merge a frame with {found_locals} locals and {found_stack} stack values \
     into one with {expected_locals} locals and {expected_stack} stack values"
)]
pub struct ShapeMismatch {
    pub expected_locals: usize,
    pub expected_stack: usize,
    pub found_locals: usize,
    pub found_stack: usize,
}

impl<V> Frame<V> {
    pub fn new(locals: Vec<V>, max_stack: usize) -> Self {
        Self {
            locals,
            stack: Vec::with_capacity(max_stack),
        }
    }

    pub fn local(&self, slot: usize) -> &V {
        &self.locals[slot]
    }

    pub fn set_local(&mut self, slot: usize, value: V) {
        self.locals[slot] = value;
    }

    pub fn locals(&self) -> &[V] {
        &self.locals
    }

    pub fn push(&mut self, value: V) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Option<V> {
        self.stack.pop()
    }

    pub fn stack(&self) -> &[V] {
        &self.stack
    }

    pub fn clear_stack(&mut self) {
        self.stack.clear();
    }
}

impl<V: Clone + PartialEq> Frame<V> {
    /// Overwrite this frame with the contents of `other`.
    pub fn init_from(&mut self, other: &Self) {
        self.locals.clone_from(&other.locals);
        self.stack.clone_from(&other.stack);
    }

    /// Merge `other` into this frame slot by slot and stack position by
    /// stack position through the supplied value join. Reports whether any
    /// value moved.
    pub fn merge_from(
        &mut self,
        other: &Self,
        mut join: impl FnMut(&V, &V) -> V,
    ) -> Result<bool, ShapeMismatch> {
        if self.locals.len() != other.locals.len() || self.stack.len() != other.stack.len() {
            return Err(ShapeMismatch {
                expected_locals: self.locals.len(),
                expected_stack: self.stack.len(),
                found_locals: other.locals.len(),
                found_stack: other.stack.len(),
            });
        }
        let mut changed = false;
        let current = self.locals.iter_mut().chain(self.stack.iter_mut());
        let incoming = other.locals.iter().chain(other.stack.iter());
        for (current, incoming) in current.zip(incoming) {
            let joined = join(current, incoming);
            if joined != *current {
                *current = joined;
                changed = true;
            }
        }
        Ok(changed)
    }
}
