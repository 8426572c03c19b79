use super::const_analysis::ConstAnalysis;
use super::test_utils::{check_expected_results, expect_analysis_error};

#[test]
fn constants_fold() {
    let source = r"
.method @main() {
  .locals 1
  .stack 2
  const 2
  const 3
  mul
  store 0
  ret
}";
    let expected = r".method @main() {
  .locals 1
  .stack 2
  0: const 2  # locals: [?], stack: []
  1: const 3  # locals: [?], stack: [2]
  2: mul  # locals: [?], stack: [2, 3]
  3: store 0  # locals: [?], stack: [6]
  4: ret  # locals: [6], stack: []
}
";
    check_expected_results(ConstAnalysis, source, expected);
}

#[test]
fn subtraction_uses_operand_order() {
    let source = r"
.method @main() {
  .locals 0
  .stack 2
  const 5
  const 3
  sub
  discard
  ret
}";
    let expected = r".method @main() {
  .locals 0
  .stack 2
  0: const 5  # locals: [], stack: []
  1: const 3  # locals: [], stack: [5]
  2: sub  # locals: [], stack: [5, 3]
  3: discard  # locals: [], stack: [2]
  4: ret  # locals: [], stack: []
}
";
    check_expected_results(ConstAnalysis, source, expected);
}

#[test]
fn loop_carried_constant_degrades() {
    let source = r"
.method @main(int) {
  .locals 2
  .stack 2
  const 0
  store 1
.loop:
  load 1
  const 1
  add
  store 1
  load 0
  br .loop
  ret
}";
    let expected = r".method @main(int) {
  .locals 2
  .stack 2
  0: const 0  # locals: [?, ?], stack: []
  1: store 1  # locals: [?, ?], stack: [0]
  2: loop:  # locals: [?, ?], stack: []
  3: load 1  # locals: [?, ?], stack: []
  4: const 1  # locals: [?, ?], stack: [?]
  5: add  # locals: [?, ?], stack: [?, 1]
  6: store 1  # locals: [?, ?], stack: [?]
  7: load 0  # locals: [?, ?], stack: []
  8: br 2  # locals: [?, ?], stack: [?]
  9: ret  # locals: [?, ?], stack: []
}
";
    // The counter in slot 1 is 0 on entry to the loop and 1 after the
    // first trip, so the join degrades it to unknown.
    check_expected_results(ConstAnalysis, source, expected);
}

#[test]
fn objects_are_tracked_as_references() {
    let source = r"
.method @main(Thing) {
  .locals 1
  .stack 1
  load 0
  throw
}";
    let expected = r".method @main(Thing) {
  .locals 1
  .stack 1
  0: load 0  # locals: [obj], stack: []
  1: throw  # locals: [obj], stack: [obj]
}
";
    check_expected_results(ConstAnalysis, source, expected);
}

#[test]
fn underflow_is_reported() {
    let source = r"
.method @main() {
  .locals 0
  .stack 1
  discard
  ret
}";
    expect_analysis_error(
        ConstAnalysis,
        source,
        "failed to execute 'discard' at position 0: stack underflow",
    );
}
