use crate::graph::{InsnKind, Method};

/// A partition of the instruction sequence into maximal regions that
/// provably have exactly one control-flow predecessor, computed once from
/// static graph shape before any frame exists.
///
/// A position's tag is 0 when nothing can be assumed about its predecessors
/// and a shared nonzero tag otherwise. The sole client is the solver's
/// overwrite-vs-merge decision: inside one block a successor has no
/// predecessor other than the position before it, so a merge is provably
/// redundant. The index is an optimization only and must never change the
/// final fixed point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpbIndex {
    tags: Vec<u32>,
}

fn mark(entries: &mut [u32], next_tag: &mut u32, pos: usize) {
    if entries[pos] == 0 {
        entries[pos] = *next_tag;
        *next_tag += 1;
    }
}

impl SpbIndex {
    pub fn build<Op, T>(method: &Method<Op, T>) -> Self {
        let len = method.len();
        let mut entries = vec![0_u32; len];
        let mut next_tag = 1_u32;

        // Pass 1: block entries. The method entry, every jump and switch
        // target, and every handler entry can have predecessors the linear
        // walk does not see.
        if len > 0 {
            mark(&mut entries, &mut next_tag, 0);
        }
        for insn in method.insns() {
            match &insn.kind {
                InsnKind::Jump { target, .. } => mark(&mut entries, &mut next_tag, target.0),
                InsnKind::Switch { default, cases } => {
                    mark(&mut entries, &mut next_tag, default.0);
                    for case in cases {
                        mark(&mut entries, &mut next_tag, case.0);
                    }
                }
                _ => (),
            }
        }
        for region in method.regions() {
            mark(&mut entries, &mut next_tag, region.handler);
        }

        // Pass 2: block bodies. Propagate the entry tag forward; after an
        // instruction that never falls through the following position is not
        // reachable from the code before it, so its tag drops to 0 unless it
        // is an entry itself.
        let mut tags = vec![0_u32; len];
        let mut current = 0_u32;
        for pos in 0..len {
            if entries[pos] != 0 {
                current = entries[pos];
            }
            tags[pos] = current;
            if !method.insn(pos).kind.falls_through() {
                current = 0;
            }
        }
        Self { tags }
    }

    pub fn tag(&self, pos: usize) -> u32 {
        self.tags[pos]
    }

    /// True only when both positions carry the same nonzero tag.
    pub fn same_block(&self, p: usize, q: usize) -> bool {
        self.tags[p] != 0 && self.tags[p] == self.tags[q]
    }
}
