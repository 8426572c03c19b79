use super::graph::*;
use super::spb::SpbIndex;

fn insn(kind: InsnKind) -> Insn<&'static str> {
    Insn { kind, op: "op" }
}

fn build(kinds: Vec<InsnKind>, regions: Vec<Region<()>>) -> SpbIndex {
    let insns = kinds.into_iter().map(insn).collect();
    let method = Method::new(insns, regions, vec![], 0, 0).unwrap();
    SpbIndex::build(&method)
}

#[test]
fn straight_line_is_one_block() {
    let index = build(
        vec![InsnKind::Plain, InsnKind::Plain, InsnKind::Return],
        vec![],
    );
    assert_eq!(index.tag(0), index.tag(1));
    assert_eq!(index.tag(1), index.tag(2));
    assert!(index.same_block(0, 1));
    assert!(index.same_block(1, 2));
}

#[test]
fn jump_target_starts_a_block() {
    // 0: br 3; 1: plain; 2: ret; 3: ret
    let index = build(
        vec![
            InsnKind::Jump {
                target: Target(3),
                conditional: true,
            },
            InsnKind::Plain,
            InsnKind::Return,
            InsnKind::Return,
        ],
        vec![],
    );
    // The fall-through successor of a conditional jump stays in the block.
    assert!(index.same_block(0, 1));
    assert!(index.same_block(1, 2));
    assert!(!index.same_block(2, 3));
}

#[test]
fn tag_resets_after_terminators() {
    // 0: jmp 0; 1: plain; 2: ret
    let index = build(
        vec![
            InsnKind::Jump {
                target: Target(0),
                conditional: false,
            },
            InsnKind::Plain,
            InsnKind::Return,
        ],
        vec![],
    );
    // Position 1 follows an unconditional jump and is not a target itself;
    // nothing can be assumed about its predecessors.
    assert_eq!(index.tag(1), 0);
    assert_eq!(index.tag(2), 0);
    assert!(!index.same_block(1, 2));
}

#[test]
fn handler_entry_starts_a_block() {
    let region = Region {
        start: 0,
        end: 1,
        handler: 2,
        exception: None,
    };
    let index = build(
        vec![InsnKind::Plain, InsnKind::Plain, InsnKind::Plain, InsnKind::Return],
        vec![region],
    );
    assert!(index.same_block(0, 1));
    assert!(!index.same_block(1, 2));
    assert!(index.same_block(2, 3));
}

#[test]
fn switch_targets_start_blocks() {
    // 0: switch default 2, cases 1, 3; the rest return.
    let index = build(
        vec![
            InsnKind::Switch {
                default: Target(2),
                cases: vec![Target(1), Target(3)],
            },
            InsnKind::Return,
            InsnKind::Return,
            InsnKind::Return,
        ],
        vec![],
    );
    let tags: Vec<_> = (0..4).map(|pos| index.tag(pos)).collect();
    assert!(tags.iter().all(|&tag| tag != 0));
    for p in 0..4 {
        for q in 0..4 {
            assert_eq!(index.same_block(p, q), p == q);
        }
    }
}
