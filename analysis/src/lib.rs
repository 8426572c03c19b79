//! This crate implements a generic fixed-point
//! [abstract interpretation](https://en.wikipedia.org/wiki/Abstract_interpretation)
//! engine over linear sequences of low-level instructions. Given a method's
//! instruction list, its declared locals, and its protected regions, the
//! solver computes for every instruction an abstract frame (locals plus an
//! operand stack) summarizing every control path reaching that position.
//!
//! The engine knows nothing about the values it tracks. Clients plug in a
//! [`domain::Domain`] describing how to execute a single instruction against
//! a frame and how to merge two abstract values; type trackers and constant
//! propagation lattices are two such plug-ins (see the svm-lib crate for
//! both).
//!
//! Some resources to learn more about the underlying techniques:
//! * [Static Program Analysis, Anders Møller and Michael I. Schwartzbach](https://cs.au.dk/~amoeller/spa/)
//! * [Introduction to Static Analysis, Xavier Rival and Kwangkeun Yi](https://mitpress.mit.edu/9780262043410/introduction-to-static-analysis/)
//! * [Data flow analysis: an informal introduction](https://clang.llvm.org/docs/DataFlowAnalysisIntro.html)

/// The contract between the engine and a pluggable abstract value domain.
pub mod domain;

/// Abstract frames: the per-position analysis state.
pub mod frame;

/// The instruction graph model: instructions, control-flow kinds, protected
/// regions, and up-front validation.
pub mod graph;

/// Single-predecessor block index used to skip redundant merges.
pub mod spb;

/// The worklist-driven fixed-point solver.
pub mod solver;



#[cfg(test)]
mod spb_tests;
