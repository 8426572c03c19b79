use analysis::domain::Domain;
use analysis::frame::Frame;
use analysis::graph::Insn;
use analysis::solver::SolveFrames;
use thiserror::Error;

use crate::ir::{Annotations, Function, Opcode, Ty, Unit};
use crate::lexer::{Identifier, IdentifierTable};

use super::{Analysis, annotate_frames, render_error};

/// Flat type lattice: every concrete type below the single unknown top.
/// There is no class hierarchy; merging two distinct object types loses all
/// type information.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeValue {
    Int,
    Obj(Identifier),
    Unknown,
}

impl TypeValue {
    pub fn print(&self, ids: &IdentifierTable) -> String {
        match self {
            TypeValue::Int => "int".to_owned(),
            TypeValue::Obj(id) => ids.get_name(*id).to_owned(),
            TypeValue::Unknown => "?".to_owned(),
        }
    }

    fn from_ty(ty: &Ty) -> Self {
        match ty {
            Ty::Int => TypeValue::Int,
            Ty::Obj(id) => TypeValue::Obj(*id),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("stack underflow")]
    StackUnderflow,
    #[error("stack overflow (limit {0})")]
    StackOverflow(usize),
    #[error("local slot {slot} is out of range ({locals} slots)")]
    SlotOutOfRange { slot: u32, locals: usize },
    #[error("expected {expected}, found {found}")]
    Mismatch {
        expected: &'static str,
        found: String,
    },
}

/// Tracks the type of every local slot and stack value, verifying slot
/// indices, the stack budget, and operand kinds along the way.
pub struct TypeDomain<'u> {
    ids: &'u IdentifierTable,
    max_stack: usize,
}

impl<'u> TypeDomain<'u> {
    pub fn new(ids: &'u IdentifierTable, max_stack: usize) -> Self {
        Self { ids, max_stack }
    }

    fn push(&self, frame: &mut Frame<TypeValue>, value: TypeValue) -> Result<(), TypeError> {
        if frame.stack().len() >= self.max_stack {
            return Err(TypeError::StackOverflow(self.max_stack));
        }
        frame.push(value);
        Ok(())
    }

    fn pop(&self, frame: &mut Frame<TypeValue>) -> Result<TypeValue, TypeError> {
        frame.pop().ok_or(TypeError::StackUnderflow)
    }

    fn pop_int(&self, frame: &mut Frame<TypeValue>) -> Result<(), TypeError> {
        match self.pop(frame)? {
            TypeValue::Int | TypeValue::Unknown => Ok(()),
            found => Err(TypeError::Mismatch {
                expected: "int",
                found: found.print(self.ids),
            }),
        }
    }

    fn pop_obj(&self, frame: &mut Frame<TypeValue>) -> Result<(), TypeError> {
        match self.pop(frame)? {
            TypeValue::Obj(_) | TypeValue::Unknown => Ok(()),
            found => Err(TypeError::Mismatch {
                expected: "an object",
                found: found.print(self.ids),
            }),
        }
    }

    fn check_slot(&self, frame: &Frame<TypeValue>, slot: u32) -> Result<usize, TypeError> {
        let locals = frame.locals().len();
        if (slot as usize) < locals {
            Ok(slot as usize)
        } else {
            Err(TypeError::SlotOutOfRange { slot, locals })
        }
    }
}

impl Domain<Opcode, Ty> for TypeDomain<'_> {
    type Value = TypeValue;
    type Error = TypeError;

    fn fresh(&mut self, hint: Option<&Ty>) -> TypeValue {
        hint.map_or(TypeValue::Unknown, TypeValue::from_ty)
    }

    fn execute(
        &mut self,
        _pos: usize,
        insn: &Insn<Opcode>,
        pre: &Frame<TypeValue>,
    ) -> Result<Frame<TypeValue>, TypeError> {
        let mut post = pre.clone();
        match &insn.op {
            Opcode::Const(_) => self.push(&mut post, TypeValue::Int)?,
            Opcode::Load(slot) => {
                let slot = self.check_slot(&post, *slot)?;
                let value = post.local(slot).clone();
                self.push(&mut post, value)?;
            }
            Opcode::Store(slot) => {
                let value = self.pop(&mut post)?;
                let slot = self.check_slot(&post, *slot)?;
                post.set_local(slot, value);
            }
            Opcode::Add | Opcode::Sub | Opcode::Mul => {
                self.pop_int(&mut post)?;
                self.pop_int(&mut post)?;
                self.push(&mut post, TypeValue::Int)?;
            }
            Opcode::New(id) => self.push(&mut post, TypeValue::Obj(*id))?,
            Opcode::Discard => {
                self.pop(&mut post)?;
            }
            Opcode::Branch | Opcode::Switch(_) => self.pop_int(&mut post)?,
            Opcode::Throw => self.pop_obj(&mut post)?,
            Opcode::Jump | Opcode::Return | Opcode::Label(_) | Opcode::Nop => (),
        }
        Ok(post)
    }

    fn merge(&mut self, lhs: &TypeValue, rhs: &TypeValue) -> TypeValue {
        if lhs == rhs {
            lhs.clone()
        } else {
            TypeValue::Unknown
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeAnalysis;

impl Analysis for TypeAnalysis {
    fn analyze(&self, function: &Function, unit: &Unit) -> Result<Annotations, String> {
        let mut domain = TypeDomain::new(&unit.identifiers, function.method.max_stack());
        let frames = SolveFrames::default()
            .solve(&function.method, &mut domain)
            .map_err(|err| render_error(&err))?;
        Ok(annotate_frames(&frames, |v| v.print(&unit.identifiers)))
    }
}
