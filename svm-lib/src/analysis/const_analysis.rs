use core::fmt::Display;

use analysis::domain::Domain;
use analysis::frame::Frame;
use analysis::graph::Insn;
use analysis::solver::SolveFrames;
use thiserror::Error;

use crate::ir::{Annotations, Function, Opcode, Ty, Unit};

use super::{Analysis, annotate_frames, render_error};

/// Flat constant lattice: a known integer, an object reference, or
/// anything.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConstValue {
    Num(i64),
    Obj,
    Any,
}

use ConstValue::*;

impl Display for ConstValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Num(value) => write!(f, "{value}"),
            Obj => write!(f, "obj"),
            Any => write!(f, "?"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConstError {
    #[error("stack underflow")]
    StackUnderflow,
    #[error("local slot {slot} is out of range ({locals} slots)")]
    SlotOutOfRange { slot: u32, locals: usize },
}

/// Constant propagation over the operand stack and locals. Arithmetic on
/// two known integers folds; everything else degrades to [`ConstValue::Any`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ConstDomain;

impl ConstDomain {
    fn pop(frame: &mut Frame<ConstValue>) -> Result<ConstValue, ConstError> {
        frame.pop().ok_or(ConstError::StackUnderflow)
    }

    fn check_slot(frame: &Frame<ConstValue>, slot: u32) -> Result<usize, ConstError> {
        let locals = frame.locals().len();
        if (slot as usize) < locals {
            Ok(slot as usize)
        } else {
            Err(ConstError::SlotOutOfRange { slot, locals })
        }
    }

    fn fold(op: &Opcode, lhs: i64, rhs: i64) -> i64 {
        match op {
            Opcode::Add => lhs.wrapping_add(rhs),
            Opcode::Sub => lhs.wrapping_sub(rhs),
            Opcode::Mul => lhs.wrapping_mul(rhs),
            _ => panic!("Unexpected arithmetic opcode."),
        }
    }
}

impl Domain<Opcode, Ty> for ConstDomain {
    type Value = ConstValue;
    type Error = ConstError;

    fn fresh(&mut self, hint: Option<&Ty>) -> ConstValue {
        match hint {
            Some(Ty::Obj(_)) => Obj,
            _ => Any,
        }
    }

    fn execute(
        &mut self,
        _pos: usize,
        insn: &Insn<Opcode>,
        pre: &Frame<ConstValue>,
    ) -> Result<Frame<ConstValue>, ConstError> {
        let mut post = pre.clone();
        match &insn.op {
            Opcode::Const(value) => post.push(Num(*value)),
            Opcode::Load(slot) => {
                let slot = Self::check_slot(&post, *slot)?;
                let value = post.local(slot).clone();
                post.push(value);
            }
            Opcode::Store(slot) => {
                let value = Self::pop(&mut post)?;
                let slot = Self::check_slot(&post, *slot)?;
                post.set_local(slot, value);
            }
            op @ (Opcode::Add | Opcode::Sub | Opcode::Mul) => {
                let rhs = Self::pop(&mut post)?;
                let lhs = Self::pop(&mut post)?;
                post.push(match (lhs, rhs) {
                    (Num(lhs), Num(rhs)) => Num(Self::fold(op, lhs, rhs)),
                    _ => Any,
                });
            }
            Opcode::New(_) => post.push(Obj),
            Opcode::Discard | Opcode::Branch | Opcode::Switch(_) | Opcode::Throw => {
                Self::pop(&mut post)?;
            }
            Opcode::Jump | Opcode::Return | Opcode::Label(_) | Opcode::Nop => (),
        }
        Ok(post)
    }

    fn merge(&mut self, lhs: &ConstValue, rhs: &ConstValue) -> ConstValue {
        if lhs == rhs { lhs.clone() } else { Any }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstAnalysis;

impl Analysis for ConstAnalysis {
    fn analyze(&self, function: &Function, _unit: &Unit) -> Result<Annotations, String> {
        let frames = SolveFrames::default()
            .solve(&function.method, &mut ConstDomain)
            .map_err(|err| render_error(&err))?;
        Ok(annotate_frames(&frames, |v| v.to_string()))
    }
}
