use super::test_utils::{check_expected_results, expect_analysis_error};
use super::type_analysis::TypeAnalysis;

#[test]
fn straight_line_types() {
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
  0: load 0  # locals: [int, int, ?], stack: []
  1: load 1  # locals: [int, int, ?], stack: [int]
  2: add  # locals: [int, int, ?], stack: [int, int]
  3: store 2  # locals: [int, int, ?], stack: [int]
  4: ret  # locals: [int, int, int], stack: []
}
";
    check_expected_results(TypeAnalysis, source, expected);
}

#[test]
fn join_of_distinct_types_is_unknown() {
    let source = r"
.method @main(int) {
  .locals 1
  .stack 1
  load 0
  br .obj
  const 1
  jmp .join
.obj:
  new Thing
.join:
  discard
  ret
}";
    let expected = r".method @main(int) {
  .locals 1
  .stack 1
  0: load 0  # locals: [int], stack: []
  1: br 4  # locals: [int], stack: [int]
  2: const 1  # locals: [int], stack: []
  3: jmp 6  # locals: [int], stack: [int]
  4: obj:  # locals: [int], stack: []
  5: new Thing  # locals: [int], stack: []
  6: join:  # locals: [int], stack: [?]
  7: discard  # locals: [int], stack: [?]
  8: ret  # locals: [int], stack: []
}
";
    check_expected_results(TypeAnalysis, source, expected);
}

#[test]
fn handler_sees_the_thrown_type() {
    let source = r"
.method @guarded() {
  .locals 0
  .stack 2
  .catch .try .done .handle MyError
.try:
  const 1
  const 2
  add
.done:
  discard
  ret
.handle:
  throw
}";
    let expected = r".method @guarded() {
  .locals 0
  .stack 2
  .catch 0 4 7 MyError
  0: try:  # locals: [], stack: []
  1: const 1  # locals: [], stack: []
  2: const 2  # locals: [], stack: [int]
  3: add  # locals: [], stack: [int, int]
  4: done:  # locals: [], stack: [int]
  5: discard  # locals: [], stack: [int]
  6: ret  # locals: [], stack: []
  7: handle:  # locals: [], stack: [MyError]
  8: throw  # locals: [], stack: [MyError]
}
";
    check_expected_results(TypeAnalysis, source, expected);
}

#[test]
fn unreachable_positions_are_reported() {
    let source = r"
.method @main() {
  .locals 0
  .stack 0
  jmp .end
  nop
.end:
  ret
}";
    let expected = r".method @main() {
  .locals 0
  .stack 0
  0: jmp 2  # locals: [], stack: []
  1: nop  # unreachable
  2: end:  # locals: [], stack: []
  3: ret  # locals: [], stack: []
}
";
    check_expected_results(TypeAnalysis, source, expected);
}

#[test]
fn stack_underflow_is_reported() {
    let source = r"
.method @main() {
  .locals 0
  .stack 1
  add
  ret
}";
    expect_analysis_error(
        TypeAnalysis,
        source,
        "failed to execute 'add' at position 0: stack underflow",
    );
}

#[test]
fn stack_overflow_is_reported() {
    let source = r"
.method @main() {
  .locals 0
  .stack 1
  const 1
  const 2
  ret
}";
    expect_analysis_error(
        TypeAnalysis,
        source,
        "failed to execute 'const 2' at position 1: stack overflow (limit 1)",
    );
}

#[test]
fn bad_slot_is_reported() {
    let source = r"
.method @main() {
  .locals 1
  .stack 1
  load 3
  ret
}";
    expect_analysis_error(
        TypeAnalysis,
        source,
        "failed to execute 'load 3' at position 0: local slot 3 is out of range (1 slots)",
    );
}

#[test]
fn throwing_an_int_is_reported() {
    let source = r"
.method @main() {
  .locals 0
  .stack 1
  const 1
  throw
}";
    expect_analysis_error(
        TypeAnalysis,
        source,
        "failed to execute 'throw' at position 1: expected an object, found int",
    );
}
