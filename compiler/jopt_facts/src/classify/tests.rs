use jopt_ir::{ArrayKind, FieldAccess, Instruction, MethodAccess, Program, ValueKind, VariableOp};
use pretty_assertions::assert_eq;

use super::*;
use crate::test_helpers::{default_constructor, program, Harness};

const ALL_OFF: SideEffectOptions = SideEffectOptions {
    include_returns: false,
    include_array_stores: false,
    include_builtin_exceptions: false,
};

const ALL_ON: SideEffectOptions = SideEffectOptions {
    include_returns: true,
    include_array_stores: true,
    include_builtin_exceptions: true,
};

/// `app/Main` with a handful of small static and instance methods.
fn main_program() -> Program {
    program(|b| {
        b.class("app/Config", |c| {
            c.field("x", "I", FieldAccess::STATIC);
            c.method("<clinit>", "()V", MethodAccess::STATIC, |code| {
                code.iconst(1)
                    .putstatic("app/Config", "x", "I")
                    .return_void();
            });
        });
        b.class("app/Main", |c| {
            c.field("count", "I", FieldAccess::STATIC);
            c.field("value", "I", FieldAccess::empty());
            default_constructor(c);
            // 0 aload_0, 1 iconst_0, 2 iconst_1, 3 iastore, 4 return
            c.method("store", "([I)V", MethodAccess::STATIC, |code| {
                code.aload(0)
                    .iconst(0)
                    .iconst(1)
                    .array_store(ArrayKind::Int)
                    .return_void();
            });
            // 0 iconst_3, 1 newarray, 2 iconst_0, 3 iconst_1, 4 iastore, 5 return
            c.method("scratch", "()V", MethodAccess::STATIC, |code| {
                code.iconst(3)
                    .newarray(ArrayKind::Int)
                    .iconst(0)
                    .iconst(1)
                    .array_store(ArrayKind::Int)
                    .return_void();
            });
            // 0 aload_0, 1 iconst_1, 2 putfield, 3 return
            c.method("setSelf", "()V", MethodAccess::PUBLIC, |code| {
                code.aload(0)
                    .iconst(1)
                    .putfield("app/Main", "value", "I")
                    .return_void();
            });
            // 0 aload_1, 1 iconst_1, 2 putfield, 3 return
            c.method("setOther", "(Lapp/Main;)V", MethodAccess::PUBLIC, |code| {
                code.aload(1)
                    .iconst(1)
                    .putfield("app/Main", "value", "I")
                    .return_void();
            });
            c.method("helper", "()V", MethodAccess::PUBLIC, |code| {
                code.return_void();
            });
            // 0 aload_0, 1 invokevirtual helper, 2 return
            c.method("callSelf", "()V", MethodAccess::PUBLIC, |code| {
                code.aload(0)
                    .invokevirtual("app/Main", "helper", "()V")
                    .return_void();
            });
            // 0 aload_0, 1 invokevirtual helper, 2 return
            c.method("callOther", "(Lapp/Main;)V", MethodAccess::STATIC, |code| {
                code.aload(0)
                    .invokevirtual("app/Main", "helper", "()V")
                    .return_void();
            });
            // 0 getstatic Config.x, 1 ireturn
            c.method("readConfig", "()I", MethodAccess::STATIC, |code| {
                code.getstatic("app/Config", "x", "I").ireturn();
            });
            // 0 iload_0, 1 iload_1, 2 idiv, 3 ireturn
            c.method("divide", "(II)I", MethodAccess::STATIC, |code| {
                code.iload(0).iload(1).idiv().ireturn();
            });
            c.method("lock", "(Ljava/lang/Object;)V", MethodAccess::STATIC, |code| {
                code.aload(0).monitorenter().aload(0).monitorexit().return_void();
            });
        });
    })
}

// ── Side effects ────────────────────────────────────────────────────

#[test]
fn array_stores_and_returns_follow_options() {
    let program = main_program();
    let harness = Harness::converged(&program);
    let ctx = harness.ctx();
    let view = harness.view("app/Main", "store", "([I)V");

    assert!(may_have_side_effect(&ctx, &view, 3, SideEffectOptions::default()));
    assert!(!may_have_side_effect(&ctx, &view, 3, ALL_OFF));
    assert!(may_have_side_effect(&ctx, &view, 4, ALL_ON));
    assert!(!may_have_side_effect(&ctx, &view, 4, SideEffectOptions::default()));
    // Constants and loads never have side effects.
    assert!(!may_have_side_effect(&ctx, &view, 0, ALL_ON));
    assert!(!may_have_side_effect(&ctx, &view, 1, ALL_ON));
}

#[test]
fn field_stores_and_monitors_always_count() {
    let program = main_program();
    let harness = Harness::converged(&program);
    let ctx = harness.ctx();

    let set = harness.view("app/Main", "setSelf", "()V");
    assert!(may_have_side_effect(&ctx, &set, 2, ALL_OFF));

    let lock = harness.view("app/Main", "lock", "(Ljava/lang/Object;)V");
    assert!(has_side_effect(&ctx, &lock, 1));
    assert!(has_side_effect(&ctx, &lock, 3));
}

#[test]
fn calls_count_only_when_the_callee_has_side_effects() {
    let program = main_program();
    let harness = Harness::converged(&program);
    let ctx = harness.ctx();

    let call = harness.view("app/Main", "callSelf", "()V");
    assert!(!has_side_effect(&ctx, &call, 1));

    let other = harness.view("app/Main", "setOther", "(Lapp/Main;)V");
    assert!(has_side_effect(&ctx, &other, 2));
}

#[test]
fn static_reads_trigger_side_effecting_initialization() {
    let program = main_program();
    let harness = Harness::converged(&program);
    let ctx = harness.ctx();
    let view = harness.view("app/Main", "readConfig", "()I");
    assert!(has_side_effect(&ctx, &view, 0));
    assert!(instruction_may_throw(&ctx, &view, 0));
}

#[test]
fn builtin_exceptions_are_optional_side_effects() {
    let program = main_program();
    let harness = Harness::converged(&program);
    let ctx = harness.ctx();
    let view = harness.view("app/Main", "divide", "(II)I");
    assert!(!may_have_side_effect(&ctx, &view, 2, ALL_OFF));
    assert!(may_have_side_effect(&ctx, &view, 2, ALL_ON));
}

#[test]
fn writes_to_receiver_and_fresh_objects_are_not_external() {
    let program = main_program();
    let harness = Harness::converged(&program);
    let ctx = harness.ctx();
    let options = SideEffectOptions::default();

    let own = harness.view("app/Main", "setSelf", "()V");
    assert!(!has_external_side_effect(&ctx, &own, 2, options));

    let other = harness.view("app/Main", "setOther", "(Lapp/Main;)V");
    assert!(has_external_side_effect(&ctx, &other, 2, options));

    let param_array = harness.view("app/Main", "store", "([I)V");
    assert!(has_external_side_effect(&ctx, &param_array, 3, options));

    let fresh_array = harness.view("app/Main", "scratch", "()V");
    assert!(!has_external_side_effect(&ctx, &fresh_array, 4, options));
}

// ── Exceptions ──────────────────────────────────────────────────────

#[test]
fn virtual_calls_on_this_cannot_throw_null_pointer() {
    let program = main_program();
    let harness = Harness::converged(&program);
    let ctx = harness.ctx();

    let own = harness.view("app/Main", "callSelf", "()V");
    assert!(!may_throw(&ctx, &own, 1));

    let other = harness.view("app/Main", "callOther", "(Lapp/Main;)V");
    assert!(may_throw(&ctx, &other, 1));
}

#[test]
fn catch_all_handlers_that_return_absorb_exceptions() {
    let program = program(|b| {
        b.class("app/Safe", |c| {
            c.method("divide", "(II)I", MethodAccess::STATIC, |code| {
                let start = code.label();
                let end = code.label();
                let handler = code.label();
                code.try_catch(start, end, handler, None);
                code.bind(start).iload(0).iload(1).idiv().ireturn();
                code.bind(end).bind(handler).pop().iconst(0).ireturn();
            });
            c.method("narrow", "(II)I", MethodAccess::STATIC, |code| {
                let start = code.label();
                let end = code.label();
                let handler = code.label();
                code.try_catch(start, end, handler, Some("java/lang/RuntimeException"));
                code.bind(start).iload(0).iload(1).idiv().ireturn();
                code.bind(end).bind(handler).pop().iconst(0).ireturn();
            });
        });
    });
    let harness = Harness::converged(&program);
    let ctx = harness.ctx();

    let absorbed = harness.view("app/Safe", "divide", "(II)I");
    assert!(instruction_may_throw(&ctx, &absorbed, 2));
    assert!(!may_throw(&ctx, &absorbed, 2));

    let typed = harness.view("app/Safe", "narrow", "(II)I");
    assert!(may_throw(&ctx, &typed, 2));
}

#[test]
fn unreachable_instructions_never_throw() {
    let program = program(|b| {
        b.class("app/Dead", |c| {
            c.method("run", "(II)I", MethodAccess::STATIC, |code| {
                let end = code.label();
                code.goto(end).iload(0).iload(1).idiv().pop();
                code.bind(end).iconst(0).ireturn();
            });
        });
    });
    let harness = Harness::converged(&program);
    let ctx = harness.ctx();
    let view = harness.view("app/Dead", "run", "(II)I");
    assert!(instruction_may_throw(&ctx, &view, 3));
    assert!(!may_throw(&ctx, &view, 3));
}

// ── Range scans ─────────────────────────────────────────────────────

#[test]
fn range_scans_find_first_and_last() {
    let program = main_program();
    let harness = Harness::converged(&program);
    let ctx = harness.ctx();
    let view = harness.view("app/Main", "lock", "(Ljava/lang/Object;)V");
    let options = SideEffectOptions::default();

    assert_eq!(first_side_effect_in(&ctx, &view, 0..5, options), Some(1));
    assert_eq!(last_side_effect_in(&ctx, &view, 0..5, options), Some(3));
    assert_eq!(first_side_effect_in(&ctx, &view, 4..5, options), None);
    // Out-of-range ends are clamped.
    assert_eq!(last_side_effect_in(&ctx, &view, 2..100, options), Some(3));

    let divide = harness.view("app/Main", "divide", "(II)I");
    assert_eq!(first_throwing_in(&ctx, &divide, 0..4), Some(2));
    assert_eq!(last_throwing_in(&ctx, &divide, 0..2), None);
}

// ── Variables ───────────────────────────────────────────────────────

#[test]
fn wide_loads_and_stores_cover_two_slots() {
    let load = Instruction::Variable {
        op: VariableOp::Load(ValueKind::Long),
        slot: 2,
    };
    assert!(reads_variable(&load, 2));
    assert!(reads_variable(&load, 3));
    assert!(!reads_variable(&load, 4));
    assert!(!writes_variable(&load, 2));

    let store = Instruction::Variable {
        op: VariableOp::Store(ValueKind::Int),
        slot: 1,
    };
    assert!(writes_variable(&store, 1));
    assert!(!writes_variable(&store, 2));

    let iinc = Instruction::Variable {
        op: VariableOp::Iinc(1),
        slot: 5,
    };
    assert!(reads_variable(&iinc, 5) && writes_variable(&iinc, 5));
}
