use std::collections::HashMap;

use lazy_static::lazy_static;
use utils::DiagnosticEmitter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identifier(pub usize);

#[derive(Clone, Debug, Copy, Eq, PartialEq, Hash)]
pub struct Location(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenValue {
    /// A bare identifier, e.g. an exception type name.
    Id(Identifier),
    /// A method name, e.g. `@main`.
    Global(Identifier),
    /// A jump label, e.g. `.loop`.
    Label(Identifier),
    Integer(i64),

    // Directives
    Method,
    Locals,
    Stack,
    Catch,

    // Opcodes
    Const,
    Load,
    Store,
    Add,
    Sub,
    Mul,
    New,
    Discard,
    Jump,
    Branch,
    Switch,
    Throw,
    Return,
    Nop,

    // Separators
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Colon,
    Comma,

    // Builtin types
    Int,

    // Misc
    Default,

    EndOfFile,
}

use TokenValue::*;

fn from_char(c: char) -> Option<TokenValue> {
    match c {
        '(' => Some(LeftParen),
        ')' => Some(RightParen),
        '{' => Some(LeftBrace),
        '}' => Some(RightBrace),
        '[' => Some(LeftBracket),
        ']' => Some(RightBracket),
        ':' => Some(Colon),
        ',' => Some(Comma),
        _ => None,
    }
}

impl core::fmt::Display for TokenValue {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match *self {
            Id(i) => write!(f, "id_{}", i.0),
            Global(i) => write!(f, "global_{}", i.0),
            Label(i) => write!(f, "label_{}", i.0),
            Integer(i) => write!(f, "{i}"),

            Method => write!(f, ".method"),
            Locals => write!(f, ".locals"),
            Stack => write!(f, ".stack"),
            Catch => write!(f, ".catch"),

            Const => write!(f, "const"),
            Load => write!(f, "load"),
            Store => write!(f, "store"),
            Add => write!(f, "add"),
            Sub => write!(f, "sub"),
            Mul => write!(f, "mul"),
            New => write!(f, "new"),
            Discard => write!(f, "discard"),
            Jump => write!(f, "jmp"),
            Branch => write!(f, "br"),
            Switch => write!(f, "switch"),
            Throw => write!(f, "throw"),
            Return => write!(f, "ret"),
            Nop => write!(f, "nop"),

            LeftParen => write!(f, "("),
            RightParen => write!(f, ")"),
            LeftBrace => write!(f, "{{"),
            RightBrace => write!(f, "}}"),
            LeftBracket => write!(f, "["),
            RightBracket => write!(f, "]"),
            Colon => write!(f, ":"),
            Comma => write!(f, ","),

            Int => write!(f, "int"),

            Default => write!(f, "default"),

            EndOfFile => write!(f, "END_OF_FILE"),
        }
    }
}

lazy_static! {
    static ref KEYWORDS: HashMap<String, TokenValue> = {
        let mut m = HashMap::new();
        for kw in [
            Const, Load, Store, Add, Sub, Mul, New, Discard, Jump, Branch, Switch, Throw, Return,
            Nop,
        ] {
            m.insert(kw.to_string(), kw);
        }

        for kw in [Int, Default] {
            m.insert(kw.to_string(), kw);
        }
        m
    };

    /// Directive names without the leading dot; any other dotted word is a
    /// label.
    static ref DIRECTIVES: HashMap<&'static str, TokenValue> = {
        let mut m = HashMap::new();
        m.insert("method", Method);
        m.insert("locals", Locals);
        m.insert("stack", Stack);
        m.insert("catch", Catch);
        m
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub value: TokenValue,

    pub line_num: Location,
}

impl core::fmt::Display for Token {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[derive(Debug, Clone, Default)]
pub struct IdentifierTable(pub Vec<String>);

impl IdentifierTable {
    pub fn lookup(&self, ident: &str) -> Option<Identifier> {
        self.0.iter().position(|str| str == ident).map(Identifier)
    }

    fn get_identifier(&mut self, ident: &str) -> Identifier {
        if let Some(id) = self.lookup(ident) {
            id
        } else {
            self.0.push(ident.to_owned());
            Identifier(self.0.len() - 1)
        }
    }

    pub fn get_name(&self, id: Identifier) -> &str {
        &self.0[id.0]
    }
}

pub struct Lexer<'src> {
    source: &'src str,
    start: usize,
    current: usize,
    line_num: u32,
    has_error: bool,
    diagnostic_emitter: &'src mut DiagnosticEmitter,
    identifiers: IdentifierTable,
}

#[derive(Debug, Clone, Default)]
pub struct LexResult {
    pub tokens: Vec<Token>,
    pub identifiers: IdentifierTable,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str, diagnostic_emitter: &'src mut DiagnosticEmitter) -> Self {
        Lexer {
            source,
            start: 0,
            current: 0,
            line_num: 1,
            has_error: false,
            diagnostic_emitter,
            identifiers: IdentifierTable::default(),
        }
    }

    pub fn lex_all(mut self) -> LexResult {
        if !self.source.is_ascii() {
            self.diagnostic_emitter
                .error(self.line_num, "Only ASCII input is supported.");
            return LexResult::default();
        }

        let mut tokens = Vec::new();
        while !self.is_at_end() {
            if let Some(tok) = self.lex() {
                tokens.push(tok);
            } else if self.has_error {
                return LexResult::default();
            }
        }

        tokens.push(Token {
            value: EndOfFile,
            line_num: Location(self.line_num),
        });

        LexResult {
            tokens,
            identifiers: self.identifiers,
        }
    }

    fn lex(&mut self) -> Option<Token> {
        loop {
            if self.is_at_end() {
                return None;
            }

            self.start = self.current;
            match self.advance() {
                // Unambiguous single character tokens.
                c @ ('(' | ')' | '{' | '}' | '[' | ']' | ':' | ',') => {
                    return Some(Token {
                        value: from_char(c).unwrap(),
                        line_num: Location(self.line_num),
                    });
                }

                // Whitespace
                '\n' => {
                    self.line_num += 1;
                    continue;
                }
                ' ' | '\t' | '\r' => continue,

                // Comments
                '#' => {
                    while self.advance() != '\n' && !self.is_at_end() {}
                    continue;
                }
                '/' => {
                    if self.match_char('/') {
                        while self.advance() != '\n' && !self.is_at_end() {}
                        continue;
                    }
                    self.diagnostic_emitter
                        .error(self.line_num, "Unexpected token: '/'.");
                    self.has_error = true;
                    return None;
                }

                // Negative numbers
                '-' => {
                    if let n @ Some(_) = self.lex_number() {
                        return n;
                    }
                    self.diagnostic_emitter
                        .error(self.line_num, "Expected number after '-'.");
                    self.has_error = true;
                    return None;
                }

                // Method names, directives, and labels.
                c @ ('@' | '.') => {
                    if self.peek().is_ascii_alphabetic() {
                        // Skip the sigil so it does not become part of the
                        // name.
                        self.start = self.current;
                        let ident = self.lex_identifier();
                        let line_num = Location(self.line_num);
                        if c == '@' {
                            return Some(Token {
                                value: Global(self.identifiers.get_identifier(ident)),
                                line_num,
                            });
                        }
                        if let Some(&directive) = DIRECTIVES.get(ident) {
                            return Some(Token {
                                value: directive,
                                line_num,
                            });
                        }
                        return Some(Token {
                            value: Label(self.identifiers.get_identifier(ident)),
                            line_num,
                        });
                    }
                    self.diagnostic_emitter
                        .error(self.line_num, &format!("Unexpected token: '{c}'."));
                    self.has_error = true;
                    return None;
                }
                c => {
                    if c.is_ascii_digit() {
                        return self.lex_number();
                    }
                    if c.is_ascii_alphabetic() {
                        let ident = self.lex_identifier();
                        let line_num = self.line_num;
                        return Some(KEYWORDS.get(ident).map_or_else(
                            || Token {
                                value: Id(self.identifiers.get_identifier(ident)),
                                line_num: Location(line_num),
                            },
                            |value| Token {
                                value: *value,
                                line_num: Location(line_num),
                            },
                        ));
                    }
                    self.diagnostic_emitter.error(
                        self.line_num,
                        &format!(
                            "Unexpected token: '{}'.",
                            &self.source[self.start..self.current]
                        ),
                    );
                    self.has_error = true;
                    return None;
                }
            }
        }
    }

    fn lex_number(&mut self) -> Option<Token> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        let value: i64 = self.source[self.start..self.current].parse().ok()?;

        Some(Token {
            value: Integer(value),
            line_num: Location(self.line_num),
        })
    }

    fn lex_identifier(&mut self) -> &'src str {
        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        &self.source[self.start..self.current]
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn peek(&self) -> char {
        self.source.as_bytes().get(self.current).map_or('\0', |&b| b as char)
    }

    fn advance(&mut self) -> char {
        let prev = self.peek();
        self.current += 1;
        prev
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == expected {
            self.current += 1;
            true
        } else {
            false
        }
    }
}
