use core::fmt::Debug;

use crate::frame::Frame;
use crate::graph::Insn;

/// The pluggable abstract value domain driving the solver. `Op` is the
/// instruction payload the domain can execute, `T` the declared shape of a
/// parameter slot or exception type (a type annotation in most front ends).
///
/// The solver only ever manipulates whole frames; values are opaque to it.
/// Two requirements make the fixed-point iteration sound:
/// * [`Domain::merge`] must be a commutative join that is monotone over a
///   partial order of finite height (or must widen internally to bound the
///   iteration).
/// * [`Domain::execute`] must not have effects observable outside the
///   returned frame. The solver overwrites frames in single-predecessor
///   regions instead of merging, which is only valid when re-executing an
///   instruction is indistinguishable from the first execution.
pub trait Domain<Op, T> {
    type Value: Clone + PartialEq + Debug;
    type Error: std::error::Error + 'static;

    /// Produce the initial abstract value for a slot. The hint is the
    /// declared parameter shape, the declared exception type of a protected
    /// region, or `None` for a padding slot or the universal throwable.
    fn fresh(&mut self, hint: Option<&T>) -> Self::Value;

    /// Compute the post-state of executing one instruction against `pre`.
    /// The engine installs the result into the successor positions; `pre`
    /// must not be observably mutated.
    fn execute(
        &mut self,
        pos: usize,
        insn: &Insn<Op>,
        pre: &Frame<Self::Value>,
    ) -> Result<Frame<Self::Value>, Self::Error>;

    /// Join two abstract values. Repeated merges must converge to the same
    /// fixed point regardless of arrival order.
    fn merge(&mut self, lhs: &Self::Value, rhs: &Self::Value) -> Self::Value;
}
