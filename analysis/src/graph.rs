use core::fmt::Display;

use thiserror::Error;

/// A resolved instruction position within a method.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Target(pub usize);

/// The control-flow shape of one instruction. Everything else about an
/// instruction lives in its opaque payload and is only interpreted by the
/// domain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InsnKind {
    /// Executes and falls through to the next position.
    Plain,

    /// A label or other pseudo instruction. Never executes, never throws.
    Marker,

    /// Transfers control to `target`; a conditional jump additionally falls
    /// through.
    Jump { target: Target, conditional: bool },

    /// Multi-way branch. Case values are payload; the engine only cares
    /// about the set of targets.
    Switch { default: Target, cases: Vec<Target> },

    /// Raises an exception; no fall through.
    Throw,

    /// Leaves the method; no fall through.
    Return,

    /// Legacy subroutine-call construct. Rejected during validation.
    Subroutine,
}

impl InsnKind {
    pub fn falls_through(&self) -> bool {
        matches!(
            self,
            InsnKind::Plain
                | InsnKind::Marker
                | InsnKind::Jump {
                    conditional: true,
                    ..
                }
        )
    }
}

/// One instruction: its control-flow kind and the payload the domain
/// executes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Insn<Op> {
    pub kind: InsnKind,
    pub op: Op,
}

impl<Op: Display> Display for Insn<Op> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.op)
    }
}

/// A protected `[start, end)` instruction range with its handler entry.
/// Regions may overlap and multiple regions may share a handler. A missing
/// exception tag stands for the universal throwable type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Region<T> {
    pub start: usize,
    pub end: usize,
    pub handler: usize,
    pub exception: Option<T>,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("jump target {target} at position {pos} is outside the method (length {len})")]
    TargetOutOfRange { pos: usize, target: usize, len: usize },
    #[error("protected region {index} has invalid range [{start}, {end}) in a method of length {len}")]
    MalformedRegion {
        index: usize,
        start: usize,
        end: usize,
        len: usize,
    },
    #[error("protected region {index} has handler {handler} outside the method (length {len})")]
    HandlerOutOfRange {
        index: usize,
        handler: usize,
        len: usize,
    },
    #[error("{params} parameters do not fit into {locals} local slots")]
    TooManyParams { params: usize, locals: usize },
    #[error("position {pos} can fall through the end of the method")]
    FallsOffEnd { pos: usize },
    #[error("unsupported legacy control flow at position {pos}")]
    UnsupportedInsn { pos: usize },
}

/// The unit of analysis: an instruction sequence with its protected regions
/// and the declared frame shape. Immutable once constructed; all targets are
/// validated up front so the solver never has to range-check an edge.
#[derive(Clone, Debug)]
pub struct Method<Op, T> {
    insns: Vec<Insn<Op>>,
    regions: Vec<Region<T>>,
    params: Vec<T>,
    locals: usize,
    max_stack: usize,
}

impl<Op, T> Method<Op, T> {
    pub fn new(
        insns: Vec<Insn<Op>>,
        regions: Vec<Region<T>>,
        params: Vec<T>,
        locals: usize,
        max_stack: usize,
    ) -> Result<Self, GraphError> {
        let len = insns.len();
        let check = |pos: usize, target: &Target| {
            if target.0 >= len {
                return Err(GraphError::TargetOutOfRange {
                    pos,
                    target: target.0,
                    len,
                });
            }
            Ok(())
        };
        for (pos, insn) in insns.iter().enumerate() {
            match &insn.kind {
                InsnKind::Jump { target, .. } => check(pos, target)?,
                InsnKind::Switch { default, cases } => {
                    check(pos, default)?;
                    for case in cases {
                        check(pos, case)?;
                    }
                }
                InsnKind::Subroutine => return Err(GraphError::UnsupportedInsn { pos }),
                _ => (),
            }
            if insn.kind.falls_through() && pos + 1 == len {
                return Err(GraphError::FallsOffEnd { pos });
            }
        }
        for (index, region) in regions.iter().enumerate() {
            if region.start > region.end || region.end > len {
                return Err(GraphError::MalformedRegion {
                    index,
                    start: region.start,
                    end: region.end,
                    len,
                });
            }
            if region.handler >= len {
                return Err(GraphError::HandlerOutOfRange {
                    index,
                    handler: region.handler,
                    len,
                });
            }
        }
        if params.len() > locals {
            return Err(GraphError::TooManyParams {
                params: params.len(),
                locals,
            });
        }
        Ok(Self {
            insns,
            regions,
            params,
            locals,
            max_stack,
        })
    }

    pub fn len(&self) -> usize {
        self.insns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insns.is_empty()
    }

    pub fn insn(&self, pos: usize) -> &Insn<Op> {
        &self.insns[pos]
    }

    pub fn insns(&self) -> &[Insn<Op>] {
        &self.insns
    }

    pub fn regions(&self) -> &[Region<T>] {
        &self.regions
    }

    pub fn params(&self) -> &[T] {
        &self.params
    }

    /// Total number of local slots, parameters included.
    pub fn local_count(&self) -> usize {
        self.locals
    }

    pub fn max_stack(&self) -> usize {
        self.max_stack
    }
}
