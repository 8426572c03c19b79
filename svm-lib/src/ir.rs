use core::fmt::Display;
use std::collections::HashMap;
use std::fmt::Write;

use analysis::graph::{Insn, InsnKind, Method};
use itertools::Itertools;

use crate::lexer::{Identifier, IdentifierTable};

/// The declared shape of a value slot: a machine integer or a reference to
/// an instance of a named class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ty {
    Int,
    Obj(Identifier),
}

pub fn print_ty(ty: &Ty, ids: &IdentifierTable) -> String {
    match ty {
        Ty::Int => "int".to_owned(),
        Ty::Obj(id) => ids.get_name(*id).to_owned(),
    }
}

/// The SVM instruction payloads. Control flow lives in the surrounding
/// [`InsnKind`]; jump, branch, and switch payloads only exist so the
/// abstract domains can see which operands the instruction consumes.
/// The case values of a switch are carried here for printing, the engine
/// only ever looks at the targets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Opcode {
    Const(i64),
    Load(u32),
    Store(u32),
    Add,
    Sub,
    Mul,
    New(Identifier),
    Discard,
    Jump,
    Branch,
    Switch(Vec<i64>),
    Throw,
    Return,
    Label(Identifier),
    Nop,
}

impl Display for Opcode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Opcode::Const(value) => write!(f, "const {value}"),
            Opcode::Load(slot) => write!(f, "load {slot}"),
            Opcode::Store(slot) => write!(f, "store {slot}"),
            Opcode::Add => write!(f, "add"),
            Opcode::Sub => write!(f, "sub"),
            Opcode::Mul => write!(f, "mul"),
            Opcode::New(id) => write!(f, "new id_{}", id.0),
            Opcode::Discard => write!(f, "discard"),
            Opcode::Jump => write!(f, "jmp"),
            Opcode::Branch => write!(f, "br"),
            Opcode::Switch(_) => write!(f, "switch"),
            Opcode::Throw => write!(f, "throw"),
            Opcode::Return => write!(f, "ret"),
            Opcode::Label(id) => write!(f, "label_{}:", id.0),
            Opcode::Nop => write!(f, "nop"),
        }
    }
}

pub type SvmMethod = Method<Opcode, Ty>;

/// A named method of the unit.
#[derive(Clone, Debug)]
pub struct Function {
    pub name: Identifier,
    pub method: SvmMethod,
}

#[derive(Clone, Debug)]
pub struct Unit {
    pub functions: Vec<Function>,
    pub identifiers: IdentifierTable,
}

/// Per-position annotation text rendered into the listing.
#[derive(Clone, Debug, Default)]
pub struct Annotations(pub HashMap<usize, String>);

pub type AnnotationMap = HashMap<Identifier, Annotations>;

/// Render one instruction with resolved positions as targets.
pub fn print_insn(insn: &Insn<Opcode>, ids: &IdentifierTable) -> String {
    match (&insn.kind, &insn.op) {
        (InsnKind::Jump { target, .. }, Opcode::Jump) => format!("jmp {}", target.0),
        (InsnKind::Jump { target, .. }, Opcode::Branch) => format!("br {}", target.0),
        (InsnKind::Switch { default, cases }, Opcode::Switch(values)) => {
            let cases = values
                .iter()
                .zip(cases.iter())
                .map(|(value, target)| format!("{value}: {}", target.0))
                .join(", ");
            format!("switch [{cases}, default: {}]", default.0)
        }
        (_, Opcode::New(id)) => format!("new {}", ids.get_name(*id)),
        (_, Opcode::Label(id)) => format!("{}:", ids.get_name(*id)),
        (_, op) => op.to_string(),
    }
}

pub fn print_function(function: &Function, unit: &Unit, anns: Option<&Annotations>) -> String {
    let method = &function.method;
    let params = method
        .params()
        .iter()
        .map(|ty| print_ty(ty, &unit.identifiers))
        .join(", ");
    let mut result = format!(
        ".method @{}({params}) {{\n",
        unit.identifiers.get_name(function.name)
    );
    writeln!(result, "  .locals {}", method.local_count()).unwrap();
    writeln!(result, "  .stack {}", method.max_stack()).unwrap();
    for region in method.regions() {
        let exception = match &region.exception {
            Some(ty) => format!(" {}", print_ty(ty, &unit.identifiers)),
            None => String::new(),
        };
        writeln!(
            result,
            "  .catch {} {} {}{exception}",
            region.start, region.end, region.handler
        )
        .unwrap();
    }
    for (pos, insn) in method.insns().iter().enumerate() {
        write!(result, "  {pos}: {}", print_insn(insn, &unit.identifiers)).unwrap();
        if let Some(text) = anns.and_then(|anns| anns.0.get(&pos)) {
            write!(result, "  # {text}").unwrap();
        }
        result.push('\n');
    }
    result.push_str("}\n");
    result
}

pub fn print(unit: &Unit, anns: &AnnotationMap) -> String {
    let mut result = String::new();
    for function in &unit.functions {
        result.push_str(&print_function(function, unit, anns.get(&function.name)));
    }
    result
}
