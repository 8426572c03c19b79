use std::collections::HashMap;

use analysis::graph::{InsnKind, Target};
use utils::DiagnosticEmitter;

use super::ir::{self, Ty};
use super::lexer::Lexer;
use super::parser::Parser;

pub fn parse_string(source: &str) -> Result<ir::Unit, String> {
    let mut diag = DiagnosticEmitter::log_to_buffer();
    let lexer = Lexer::new(source, &mut diag);
    let tokens = lexer.lex_all();
    if tokens.tokens.is_empty() {
        return Err(diag.out_buffer() + &diag.err_buffer());
    }
    let parser = Parser::new(tokens, &mut diag);
    let Some(unit) = parser.parse() else {
        return Err(diag.out_buffer() + &diag.err_buffer());
    };
    Ok(unit)
}

fn print_parsed(source: &str) -> Result<String, String> {
    let unit = parse_string(source)?;
    Ok(ir::print(&unit, &HashMap::new()))
}

#[test]
fn parse_empty() {
    let unit = parse_string("").expect("An empty unit is valid.");
    assert!(unit.functions.is_empty());
}

#[test]
fn parse_straight_line_method() -> Result<(), String> {
    let source = r"
.method @main(int, int) {
  .locals 3
  .stack 2
  load 0
  load 1
  add
  store 2
  ret
}";
    let expected = r".method @main(int, int) {
  .locals 3
  .stack 2
  0: load 0
  1: load 1
  2: add
  3: store 2
  4: ret
}
";
    assert_eq!(print_parsed(source)?, expected);
    Ok(())
}

#[test]
fn parse_labels_and_jumps() -> Result<(), String> {
    let source = r"
.method @count() {
  .locals 1
  .stack 2
.loop:
  load 0
  const 1
  add
  store 0
  load 0
  br .loop
  ret
}";
    let unit = parse_string(source)?;
    let method = &unit.functions[0].method;
    // The label becomes a marker at position 0 and the branch resolves to
    // it.
    assert!(matches!(method.insn(0).kind, InsnKind::Marker));
    assert_eq!(
        method.insn(6).kind,
        InsnKind::Jump {
            target: Target(0),
            conditional: true
        }
    );
    Ok(())
}

#[test]
fn parse_switch() -> Result<(), String> {
    let source = r"
.method @dispatch(int) {
  .locals 1
  .stack 1
  load 0
  switch [0: .a, 1: .b, default: .c]
.a:
  ret
.b:
  ret
.c:
  ret
}";
    let expected = r".method @dispatch(int) {
  .locals 1
  .stack 1
  0: load 0
  1: switch [0: 2, 1: 4, default: 6]
  2: a:
  3: ret
  4: b:
  5: ret
  6: c:
  7: ret
}
";
    assert_eq!(print_parsed(source)?, expected);
    Ok(())
}

#[test]
fn parse_catch_directive() -> Result<(), String> {
    let source = r"
.method @guarded(MyError) {
  .locals 1
  .stack 1
  .catch .try .done .handle MyError
.try:
  new MyError
  throw
.done:
  ret
.handle:
  discard
  ret
}";
    let unit = parse_string(source)?;
    let method = &unit.functions[0].method;
    assert_eq!(method.regions().len(), 1);
    let region = &method.regions()[0];
    assert_eq!((region.start, region.end, region.handler), (0, 3, 5));
    let Some(Ty::Obj(id)) = &region.exception else {
        panic!("Expected a typed region.");
    };
    assert_eq!(unit.identifiers.get_name(*id), "MyError");
    Ok(())
}

#[test]
fn parse_untyped_catch() -> Result<(), String> {
    let source = r"
.method @guarded() {
  .locals 0
  .stack 1
  .catch .try .done .handle
.try:
  nop
.done:
  ret
.handle:
  discard
  ret
}";
    let unit = parse_string(source)?;
    assert_eq!(unit.functions[0].method.regions()[0].exception, None);
    Ok(())
}

#[test]
fn parse_multiple_methods() -> Result<(), String> {
    let source = r"
.method @one() {
  .locals 0
  .stack 0
  ret
}
.method @two() {
  .locals 0
  .stack 0
  ret
}";
    let unit = parse_string(source)?;
    assert_eq!(unit.functions.len(), 2);
    Ok(())
}

#[test]
fn undefined_label() {
    let source = r"
.method @main() {
  .locals 0
  .stack 0
  jmp .nowhere
}";
    let err = parse_string(source).unwrap_err();
    assert_eq!(err, "[line 5] Error at 'jmp': Undefined label '.nowhere'.\n");
}

#[test]
fn redefined_label() {
    let source = r"
.method @main() {
  .locals 0
  .stack 0
.here:
  nop
.here:
  ret
}";
    let err = parse_string(source).unwrap_err();
    assert_eq!(err, "[line 7] Error at 'label_1': Label '.here' redefined.\n");
}

#[test]
fn redefined_method() {
    let source = r"
.method @main() {
  .locals 0
  .stack 0
  ret
}
.method @main() {
  .locals 0
  .stack 0
  ret
}";
    let err = parse_string(source).unwrap_err();
    assert_eq!(err, "[line 11] Error at end of file: Method '@main' redefined.\n");
}

#[test]
fn missing_locals_directive() {
    let source = r"
.method @main() {
  ret
}";
    let err = parse_string(source).unwrap_err();
    assert_eq!(
        err,
        "[line 3] Error at 'ret': Every method declares its local slot count.\n"
    );
}

#[test]
fn fallthrough_off_the_end_rejected() {
    let source = r"
.method @main() {
  .locals 0
  .stack 0
  nop
}";
    let err = parse_string(source).unwrap_err();
    assert_eq!(
        err,
        "[line 2] Error at 'global_0': position 0 can fall through the end of the method\n"
    );
}

#[test]
fn params_must_fit_declared_locals() {
    let source = r"
.method @main(int, int) {
  .locals 1
  .stack 0
  ret
}";
    let err = parse_string(source).unwrap_err();
    assert_eq!(
        err,
        "[line 2] Error at 'global_0': 2 parameters do not fit into 1 local slots\n"
    );
}
