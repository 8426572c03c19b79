use core::fmt::Display;

use fixedbitset::FixedBitSet;
use log::trace;
use thiserror::Error;

use crate::domain::Domain;
use crate::frame::{Frame, ShapeMismatch};
use crate::graph::{Insn, InsnKind, Method};
use crate::spb::SpbIndex;

/// A failure aborting a whole analysis run. No partial results are
/// produced; the offending position and a rendering of its instruction are
/// attached so the failure is actionable without re-deriving it.
#[derive(Debug, Error)]
pub enum AnalysisError<E: std::error::Error + 'static> {
    #[error("failed to execute '{insn}' at position {pos}")]
    Domain {
        pos: usize,
        insn: String,
        #[source]
        source: E,
    },
    #[error("mismatched frames reaching '{insn}' at position {pos}")]
    Shape {
        pos: usize,
        insn: String,
        #[source]
        source: ShapeMismatch,
    },
}

/// The fixed-point solver. Starting from the entry frame built out of the
/// declared parameter shapes, it repeatedly executes pending positions and
/// propagates the resulting frames along fall-through, jump, switch, and
/// exception edges until nothing changes.
///
/// Termination is the domain's obligation: the value join has to be
/// monotone over a finite-height order, or widen internally. The solver
/// performs no iteration counting of its own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SolveFrames {
    /// Route every propagated edge through the domain's merge, ignoring the
    /// single-predecessor index. The results must be identical either way;
    /// the switch exists so that equivalence is testable.
    pub always_merge: bool,
}

impl SolveFrames {
    /// Run the solver returning one frame per instruction position.
    /// Positions no control path reaches stay `None`.
    pub fn solve<Op, T, D>(
        self,
        method: &Method<Op, T>,
        domain: &mut D,
    ) -> Result<Vec<Option<Frame<D::Value>>>, AnalysisError<D::Error>>
    where
        Op: Display,
        D: Domain<Op, T>,
    {
        let mut frames = vec![None; method.len()];
        self.solve_in_place(method, domain, &mut frames)?;
        Ok(frames)
    }

    /// Run the solver against an existing frame assignment. Re-running
    /// against the result of a previous run changes nothing; this is the
    /// fixed-point property.
    pub fn solve_in_place<Op, T, D>(
        self,
        method: &Method<Op, T>,
        domain: &mut D,
        frames: &mut [Option<Frame<D::Value>>],
    ) -> Result<(), AnalysisError<D::Error>>
    where
        Op: Display,
        D: Domain<Op, T>,
    {
        if method.is_empty() {
            return Ok(());
        }
        assert_eq!(frames.len(), method.len());

        let covering = covering_regions(method);

        // The entry frame: parameters in the leading slots, the remaining
        // declared locals padded with the unknown value, empty stack.
        let mut locals: Vec<_> = method
            .params()
            .iter()
            .map(|shape| domain.fresh(Some(shape)))
            .collect();
        locals.extend((method.params().len()..method.local_count()).map(|_| domain.fresh(None)));
        let entry = Frame::new(locals, method.max_stack());
        match &mut frames[0] {
            slot @ None => *slot = Some(entry),
            Some(existing) => {
                existing
                    .merge_from(&entry, |lhs, rhs| domain.merge(lhs, rhs))
                    .map_err(|source| AnalysisError::Shape {
                        pos: 0,
                        insn: method.insn(0).to_string(),
                        source,
                    })?;
            }
        }

        let mut queued = FixedBitSet::with_capacity(method.len());
        queued.insert(0);
        let mut engine = Engine {
            method,
            domain,
            frames,
            spb: SpbIndex::build(method),
            worklist: vec![0],
            queued,
            always_merge: self.always_merge,
        };
        engine.run(&covering)
    }
}

/// The mutable state of a single solver run.
struct Engine<'a, Op, T, D: Domain<Op, T>> {
    method: &'a Method<Op, T>,
    domain: &'a mut D,
    frames: &'a mut [Option<Frame<D::Value>>],
    spb: SpbIndex,
    worklist: Vec<usize>,
    queued: FixedBitSet,
    always_merge: bool,
}

impl<Op, T, D> Engine<'_, Op, T, D>
where
    Op: Display,
    D: Domain<Op, T>,
{
    fn run(&mut self, covering: &[Vec<usize>]) -> Result<(), AnalysisError<D::Error>> {
        let mut switch_seen = FixedBitSet::with_capacity(self.method.len());
        while let Some(pos) = self.worklist.pop() {
            self.queued.set(pos, false);
            // Queued positions always carry a frame; it was installed before
            // the position was enqueued.
            let Some(pre) = self.frames[pos].clone() else {
                continue;
            };
            let insn = self.method.insn(pos);
            match &insn.kind {
                InsnKind::Marker => {
                    self.propagate(pos, pos + 1, &pre)?;
                }
                InsnKind::Plain => {
                    let post = self.execute(pos, insn, &pre)?;
                    self.propagate(pos, pos + 1, &post)?;
                }
                InsnKind::Jump {
                    target,
                    conditional,
                } => {
                    let post = self.execute(pos, insn, &pre)?;
                    self.propagate(pos, target.0, &post)?;
                    if *conditional {
                        self.propagate(pos, pos + 1, &post)?;
                    }
                }
                InsnKind::Switch { default, cases } => {
                    let post = self.execute(pos, insn, &pre)?;
                    // Visit every distinct target exactly once per firing.
                    switch_seen.clear();
                    switch_seen.insert(default.0);
                    self.propagate(pos, default.0, &post)?;
                    for case in cases {
                        if switch_seen.put(case.0) {
                            continue;
                        }
                        self.propagate(pos, case.0, &post)?;
                    }
                }
                InsnKind::Throw | InsnKind::Return => {
                    // No normal successors; execution still runs so the
                    // domain can check the operands.
                    self.execute(pos, insn, &pre)?;
                }
                // Method::new rejects subroutines.
                InsnKind::Subroutine => panic!("Unexpected subroutine instruction."),
            }

            // Exception edges: the handler inherits the locals of the
            // pre-state and starts with the thrown value as its only stack
            // entry. Markers are never covered; they cannot throw.
            for &index in &covering[pos] {
                let region = &self.method.regions()[index];
                let mut handler = pre.clone();
                handler.clear_stack();
                handler.push(self.domain.fresh(region.exception.as_ref()));
                self.propagate(pos, region.handler, &handler)?;
            }
        }
        Ok(())
    }

    fn execute(
        &mut self,
        pos: usize,
        insn: &Insn<Op>,
        pre: &Frame<D::Value>,
    ) -> Result<Frame<D::Value>, AnalysisError<D::Error>> {
        self.domain
            .execute(pos, insn, pre)
            .map_err(|source| AnalysisError::Domain {
                pos,
                insn: insn.to_string(),
                source,
            })
    }

    fn propagate(
        &mut self,
        from: usize,
        to: usize,
        frame: &Frame<D::Value>,
    ) -> Result<(), AnalysisError<D::Error>> {
        let method = self.method;
        let domain = &mut *self.domain;
        let overwrite = !self.always_merge && to == from + 1 && self.spb.same_block(from, to);
        let changed = match &mut self.frames[to] {
            slot @ None => {
                trace!("edge {from} -> {to}: install");
                *slot = Some(frame.clone());
                true
            }
            Some(existing) => {
                if overwrite {
                    // Inside a single-predecessor block the successor has no
                    // predecessor other than `from`, so the incoming frame
                    // simply replaces the old one.
                    trace!("edge {from} -> {to}: overwrite");
                    existing.init_from(frame);
                    true
                } else {
                    trace!("edge {from} -> {to}: merge");
                    existing
                        .merge_from(frame, |lhs, rhs| domain.merge(lhs, rhs))
                        .map_err(|source| AnalysisError::Shape {
                            pos: to,
                            insn: method.insn(to).to_string(),
                            source,
                        })?
                }
            }
        };
        if changed && !self.queued.contains(to) {
            trace!("enqueue {to}");
            self.queued.insert(to);
            self.worklist.push(to);
        }
        Ok(())
    }
}

/// For every position, the indices of the protected regions covering it.
/// Markers cannot throw and contribute no coverage.
fn covering_regions<Op, T>(method: &Method<Op, T>) -> Vec<Vec<usize>> {
    let mut covering = vec![Vec::new(); method.len()];
    for (index, region) in method.regions().iter().enumerate() {
        for pos in region.start..region.end {
            if matches!(method.insn(pos).kind, InsnKind::Marker) {
                continue;
            }
            covering[pos].push(index);
        }
    }
    covering
}
