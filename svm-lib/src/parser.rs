use std::collections::HashMap;

use analysis::graph::{Insn, InsnKind, Region, Target};
use utils::DiagnosticEmitter;

use crate::{
    ir::{Function, Opcode, SvmMethod, Ty, Unit},
    lexer::{Identifier, IdentifierTable, LexResult, Token, TokenValue},
};

pub struct Parser<'src> {
    current_tok: usize,
    tokens: Vec<Token>,
    unit: Unit,
    diag: &'src mut DiagnosticEmitter,
}

use TokenValue::*;

/// An unresolved `.catch` directive; the labels turn into positions once
/// the whole body is parsed.
struct PendingCatch {
    token: Token,
    start: Identifier,
    end: Identifier,
    handler: Identifier,
    exception: Option<Identifier>,
}

impl<'src> Parser<'src> {
    pub fn new(lexed: LexResult, diag: &'src mut DiagnosticEmitter) -> Self {
        let LexResult {
            tokens,
            identifiers,
        } = lexed;

        Parser {
            current_tok: 0,
            tokens,
            unit: Unit {
                functions: Vec::new(),
                identifiers,
            },
            diag,
        }
    }

    pub fn parse(mut self) -> Option<Unit> {
        while !self.check(EndOfFile) {
            let function = self.parse_method()?;
            if self
                .unit
                .functions
                .iter()
                .any(|f| f.name == function.name)
            {
                let name = self.unit.identifiers.get_name(function.name).to_owned();
                self.error(self.peek(), &format!("Method '@{name}' redefined."));
                return None;
            }
            self.unit.functions.push(function);
        }
        Some(self.unit)
    }

    fn parse_method(&mut self) -> Option<Function> {
        self.consume(Method, "")?;
        let (name_tok, name) = self.consume_global()?;

        self.consume(LeftParen, "")?;
        let mut params = Vec::new();
        if !self.check(RightParen) {
            loop {
                params.push(self.parse_type()?);
                if self.try_consume(Comma).is_none() {
                    break;
                }
            }
        }
        self.consume(RightParen, "")?;
        self.consume(LeftBrace, "")?;

        self.consume(Locals, "Every method declares its local slot count.")?;
        let locals = self.consume_count()?;
        self.consume(Stack, "Every method declares its stack limit.")?;
        let max_stack = self.consume_count()?;

        let mut catches = Vec::new();
        while self.try_consume(Catch).is_some() {
            catches.push(self.parse_catch()?);
        }

        let mut insns = Vec::new();
        let mut insn_tokens = Vec::new();
        let mut labels = HashMap::new();
        while self.try_consume(RightBrace).is_none() {
            if self.check(EndOfFile) {
                self.error(self.peek(), "'}' expected.");
                return None;
            }
            let token = self.peek();
            let insn = self.parse_insn(&mut labels, insns.len())?;
            insns.push(insn);
            insn_tokens.push(token);
        }

        // Jump and switch targets hold label identifiers until this point;
        // rewrite them to positions.
        for (insn, token) in insns.iter_mut().zip(insn_tokens.iter()) {
            match &mut insn.kind {
                InsnKind::Jump { target, .. } => {
                    *target = resolve(self.diag, &self.unit.identifiers, &labels, *token, *target)?;
                }
                InsnKind::Switch { default, cases } => {
                    *default =
                        resolve(self.diag, &self.unit.identifiers, &labels, *token, *default)?;
                    for case in cases {
                        *case =
                            resolve(self.diag, &self.unit.identifiers, &labels, *token, *case)?;
                    }
                }
                _ => (),
            }
        }

        let mut regions = Vec::new();
        for catch in catches {
            let lookup = |parser: &mut Self, label: Identifier| {
                resolve(
                    parser.diag,
                    &parser.unit.identifiers,
                    &labels,
                    catch.token,
                    Target(label.0),
                )
            };
            let start = lookup(self, catch.start)?.0;
            let end = lookup(self, catch.end)?.0;
            let handler = lookup(self, catch.handler)?.0;
            regions.push(Region {
                start,
                end,
                handler,
                exception: catch.exception.map(Ty::Obj),
            });
        }

        match SvmMethod::new(insns, regions, params, locals, max_stack) {
            Ok(method) => Some(Function { name, method }),
            Err(err) => {
                self.error(name_tok, &err.to_string());
                None
            }
        }
    }

    fn parse_insn(
        &mut self,
        labels: &mut HashMap<Identifier, usize>,
        pos: usize,
    ) -> Option<Insn<Opcode>> {
        if let Label(id) = self.peek().value {
            let token = self.advance();
            self.consume(Colon, "")?;
            if labels.insert(id, pos).is_some() {
                let name = self.unit.identifiers.get_name(id).to_owned();
                self.error(token, &format!("Label '.{name}' redefined."));
                return None;
            }
            return Some(insn(InsnKind::Marker, Opcode::Label(id)));
        }

        let token = self.advance();
        let insn = match token.value {
            Const => insn(InsnKind::Plain, Opcode::Const(self.consume_integer()?)),
            Load => insn(InsnKind::Plain, Opcode::Load(self.consume_slot()?)),
            Store => insn(InsnKind::Plain, Opcode::Store(self.consume_slot()?)),
            Add => insn(InsnKind::Plain, Opcode::Add),
            Sub => insn(InsnKind::Plain, Opcode::Sub),
            Mul => insn(InsnKind::Plain, Opcode::Mul),
            New => insn(InsnKind::Plain, Opcode::New(self.consume_id()?)),
            Discard => insn(InsnKind::Plain, Opcode::Discard),
            Nop => insn(InsnKind::Plain, Opcode::Nop),
            Jump => insn(
                InsnKind::Jump {
                    target: Target(self.consume_label()?.0),
                    conditional: false,
                },
                Opcode::Jump,
            ),
            Branch => insn(
                InsnKind::Jump {
                    target: Target(self.consume_label()?.0),
                    conditional: true,
                },
                Opcode::Branch,
            ),
            Switch => self.parse_switch()?,
            Throw => insn(InsnKind::Throw, Opcode::Throw),
            Return => insn(InsnKind::Return, Opcode::Return),
            _ => {
                self.error(token, "Instruction expected.");
                return None;
            }
        };
        Some(insn)
    }

    fn parse_switch(&mut self) -> Option<Insn<Opcode>> {
        self.consume(LeftBracket, "")?;
        let mut values = Vec::new();
        let mut cases = Vec::new();
        loop {
            if self.try_consume(Default).is_some() {
                self.consume(Colon, "")?;
                let default = Target(self.consume_label()?.0);
                self.consume(RightBracket, "")?;
                return Some(insn(
                    InsnKind::Switch { default, cases },
                    Opcode::Switch(values),
                ));
            }
            values.push(self.consume_integer()?);
            self.consume(Colon, "")?;
            cases.push(Target(self.consume_label()?.0));
            self.consume(Comma, "Switch cases end with the default target.")?;
        }
    }

    fn parse_catch(&mut self) -> Option<PendingCatch> {
        let token = self.peek();
        let start = self.consume_label()?;
        let end = self.consume_label()?;
        let handler = self.consume_label()?;
        let exception = if let Id(id) = self.peek().value {
            self.advance();
            Some(id)
        } else {
            None
        };
        Some(PendingCatch {
            token,
            start,
            end,
            handler,
            exception,
        })
    }

    fn parse_type(&mut self) -> Option<Ty> {
        let token = self.advance();
        match token.value {
            Int => Some(Ty::Int),
            Id(id) => Some(Ty::Obj(id)),
            _ => {
                self.error(token, "Type expected.");
                None
            }
        }
    }

    fn consume_count(&mut self) -> Option<usize> {
        let value = self.consume_integer()?;
        match usize::try_from(value) {
            Ok(count) => Some(count),
            Err(_) => {
                self.error(self.previous(), "Non-negative count expected.");
                None
            }
        }
    }

    fn consume_slot(&mut self) -> Option<u32> {
        let value = self.consume_integer()?;
        match u32::try_from(value) {
            Ok(slot) => Some(slot),
            Err(_) => {
                self.error(self.previous(), "Non-negative slot index expected.");
                None
            }
        }
    }

    fn consume_integer(&mut self) -> Option<i64> {
        if let Integer(value) = self.peek().value {
            self.advance();
            return Some(value);
        }
        self.error(self.peek(), "Number expected.");
        None
    }

    fn consume_label(&mut self) -> Option<Identifier> {
        if let Label(id) = self.peek().value {
            self.advance();
            return Some(id);
        }
        self.error(self.peek(), "Label expected.");
        None
    }

    fn consume_id(&mut self) -> Option<Identifier> {
        if let Id(id) = self.peek().value {
            self.advance();
            return Some(id);
        }
        self.error(self.peek(), "Identifier expected.");
        None
    }

    fn consume_global(&mut self) -> Option<(Token, Identifier)> {
        if let Global(id) = self.peek().value {
            return Some((self.advance(), id));
        }
        self.error(self.peek(), "Method name expected.");
        None
    }

    fn consume(&mut self, tok_val: TokenValue, s: &str) -> Option<Token> {
        if self.check(tok_val) {
            return Some(self.advance());
        }
        let msg = if s.is_empty() {
            format!("'{tok_val}' expected.")
        } else {
            s.to_owned()
        };
        self.error(self.peek(), &msg);
        None
    }

    fn try_consume(&mut self, tok_val: TokenValue) -> Option<Token> {
        if self.check(tok_val) {
            return Some(self.advance());
        }
        None
    }

    fn check(&self, tok_val: TokenValue) -> bool {
        self.peek().value == tok_val
    }

    fn peek(&self) -> Token {
        self.tokens[self.current_tok]
    }

    fn previous(&self) -> Token {
        self.tokens[self.current_tok - 1]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek();
        if !self.check(EndOfFile) {
            self.current_tok += 1;
        }
        token
    }

    fn error(&mut self, tok: Token, s: &str) {
        if tok.value == EndOfFile {
            self.diag.report(tok.line_num.0, "at end of file", s);
        } else {
            self.diag.report(tok.line_num.0, &format!("at '{tok}'"), s);
        }
    }
}

fn insn(kind: InsnKind, op: Opcode) -> Insn<Opcode> {
    Insn { kind, op }
}

fn resolve(
    diag: &mut DiagnosticEmitter,
    identifiers: &IdentifierTable,
    labels: &HashMap<Identifier, usize>,
    token: Token,
    target: Target,
) -> Option<Target> {
    let id = Identifier(target.0);
    match labels.get(&id) {
        Some(&pos) => Some(Target(pos)),
        None => {
            let name = identifiers.get_name(id).to_owned();
            diag.report(
                token.line_num.0,
                &format!("at '{token}'"),
                &format!("Undefined label '.{name}'."),
            );
            None
        }
    }
}
