use smallvec::SmallVec;

use super::{BranchOp, Code, Condition, ExceptionHandler, Instruction, SimpleOp, ValueKind};

fn targets(instr: &Instruction, offset: usize) -> Vec<usize> {
    let succs: SmallVec<[usize; 2]> = instr.successors(offset);
    succs.into_vec()
}

#[test]
fn conditional_branch_has_target_and_fall_through() {
    let instr = Instruction::Branch {
        op: BranchOp::If(Condition::Eq),
        target: 7,
    };
    assert_eq!(targets(&instr, 3), vec![7, 4]);
}

#[test]
fn goto_and_return_do_not_fall_through() {
    let goto = Instruction::Branch {
        op: BranchOp::Goto,
        target: 0,
    };
    assert_eq!(targets(&goto, 5), vec![0]);

    let ret = Instruction::Simple(SimpleOp::Return(Some(ValueKind::Int)));
    assert!(ret.is_return());
    assert!(targets(&ret, 5).is_empty());

    let throw = Instruction::Simple(SimpleOp::Throw);
    assert!(!throw.falls_through());
}

#[test]
fn switch_lists_default_then_cases() {
    let switch = Instruction::Switch {
        default: 9,
        cases: vec![(1, 4), (2, 6)],
    };
    assert_eq!(targets(&switch, 2), vec![9, 4, 6]);
}

#[test]
fn handler_range_is_end_exclusive() {
    let handler = ExceptionHandler {
        start: 2,
        end: 5,
        handler: 8,
        catch_type: None,
    };
    assert!(!handler.covers(1));
    assert!(handler.covers(2));
    assert!(handler.covers(4));
    assert!(!handler.covers(5));

    let code = Code {
        max_locals: 1,
        instructions: vec![Instruction::Simple(SimpleOp::Nop); 9],
        exception_table: vec![handler],
    };
    assert_eq!(code.handlers_covering(3).count(), 1);
    assert_eq!(code.handlers_covering(6).count(), 0);
}

#[test]
fn category2_kinds_take_two_slots() {
    assert_eq!(ValueKind::Long.slot_size(), 2);
    assert_eq!(ValueKind::Double.slot_size(), 2);
    assert_eq!(ValueKind::Reference.slot_size(), 1);
}
