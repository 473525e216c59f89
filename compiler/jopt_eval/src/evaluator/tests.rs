use jopt_ir::{CodeBuilder, Condition, MethodAccess, MethodId, Program, ProgramBuilder};
use pretty_assertions::assert_eq;

use crate::{
    BasicInvocationUnit, EvalError, Evaluation, EvaluatorConfig, InvocationUnit, InvokeSite,
    Origin, OriginSet, PartialEvaluator, PrimitiveConstant, Value,
};

const OBJ: &str = "Ljava/lang/Object;";

fn single_method(descriptor: &str, body: impl FnOnce(&mut CodeBuilder<'_>)) -> (Program, MethodId) {
    let mut builder = ProgramBuilder::with_java_lang();
    builder.class("t/T", |c| {
        c.method("m", descriptor, MethodAccess::STATIC, body);
    });
    let program = builder.build().unwrap();
    let method = program.method_by_name("t/T", "m", descriptor).unwrap();
    (program, method)
}

fn evaluate(program: &Program, method: MethodId) -> Evaluation {
    PartialEvaluator::default()
        .evaluate(program, method, &BasicInvocationUnit)
        .unwrap()
}

fn origins(eval: &Evaluation, offset: usize, depth: usize) -> Vec<Origin> {
    eval.stack_top(offset, depth)
        .and_then(Value::origins)
        .map(|set| set.iter().collect())
        .unwrap_or_default()
}

#[test]
fn parameters_flow_through_locals() {
    let (program, m) = single_method(&format!("({OBJ}){OBJ}"), |code| {
        code.aload(0).astore(1).aload(1).areturn();
    });
    let eval = evaluate(&program, m);
    assert_eq!(origins(&eval, 3, 0), vec![Origin::Parameter(0)]);
}

#[test]
fn allocation_is_tagged_with_its_offset() {
    let (program, m) = single_method(&format!("(){OBJ}"), |code| {
        code.new_instance("t/T")
            .dup()
            .invokespecial("t/T", "<init>", "()V")
            .areturn();
    });
    let eval = evaluate(&program, m);
    assert_eq!(origins(&eval, 3, 0), vec![Origin::Produced(0)]);
    assert_eq!(eval.stack_depth_before(2), Some(2));
    assert_eq!(eval.stack_depth_after(2), Some(1));
}

#[test]
fn join_points_union_origins() {
    let (program, m) = single_method(&format!("(I{OBJ}){OBJ}"), |code| {
        let other = code.label();
        let done = code.label();
        code.iload(0).if_(Condition::Eq, other);
        code.aload(1).goto(done);
        code.bind(other).new_instance("t/T");
        code.bind(done).areturn();
    });
    let eval = evaluate(&program, m);
    // Static method: `I` is parameter 0, the object parameter 1.
    assert_eq!(
        origins(&eval, 5, 0),
        vec![Origin::Parameter(1), Origin::Produced(4)]
    );
}

#[test]
fn code_after_unconditional_jump_is_unreachable() {
    let (program, m) = single_method("()V", |code| {
        let end = code.label();
        code.goto(end).nop();
        code.bind(end).return_void();
    });
    let eval = evaluate(&program, m);
    assert!(eval.is_reachable(0));
    assert!(!eval.is_reachable(1));
    assert!(eval.is_reachable(2));
    assert_eq!(eval.reachable_offsets().collect::<Vec<_>>(), vec![0, 2]);
}

#[test]
fn handler_sees_caught_exception_and_prior_locals() {
    let (program, m) = single_method(&format!("({OBJ})V"), |code| {
        let (start, end, handler) = (code.label(), code.label(), code.label());
        code.bind(start)
            .aload(0)
            .astore(1)
            .invokestatic("t/T", "work", "()V")
            .bind(end)
            .return_void();
        code.bind(handler).astore(2).return_void();
        code.try_catch(start, end, handler, None);
    });
    let eval = evaluate(&program, m);
    assert!(eval.is_reachable(4));
    assert_eq!(origins(&eval, 4, 0), vec![Origin::CaughtException(4)]);

    let frame = eval.frame_before(4).unwrap();
    // Slot 1 is unset on the edge from offset 0 and set on the later ones.
    assert_eq!(frame.local(1), Some(&Value::Top));
}

#[test]
fn handlers_can_be_skipped() {
    let (program, m) = single_method("()V", |code| {
        let (start, end, handler) = (code.label(), code.label(), code.label());
        code.bind(start)
            .invokestatic("t/T", "work", "()V")
            .bind(end)
            .return_void();
        code.bind(handler).pop().return_void();
        code.try_catch(start, end, handler, None);
    });
    let config = EvaluatorConfig {
        evaluate_exception_handlers: false,
    };
    let eval = PartialEvaluator::new(config)
        .evaluate(&program, m, &BasicInvocationUnit)
        .unwrap();
    assert!(!eval.is_reachable(2));
}

#[test]
fn wide_values_count_two_slots() {
    let (program, m) = single_method("(J)J", |code| {
        code.lload(0).lconst(1).ladd();
        code.simple(jopt_ir::SimpleOp::Stack(jopt_ir::StackOp::Dup2))
            .pop2()
            .simple(jopt_ir::SimpleOp::Return(Some(jopt_ir::ValueKind::Long)));
    });
    let eval = evaluate(&program, m);
    assert_eq!(eval.stack_depth_before(2), Some(4));
    assert_eq!(eval.stack_depth_before(4), Some(4));
    assert_eq!(eval.stack_depth_before(5), Some(2));
}

#[test]
fn integer_constants_are_tracked_through_locals() {
    let (program, m) = single_method("()I", |code| {
        code.iconst(5).istore(0).iinc(0, 1).iload(0).ireturn();
    });
    let eval = evaluate(&program, m);
    assert_eq!(
        eval.stack_top(4, 0).and_then(Value::constant_value),
        Some(PrimitiveConstant::Int(6))
    );
}

struct ReturnsFirstArgument;

impl InvocationUnit for ReturnsFirstArgument {
    fn invocation_result(&self, site: &InvokeSite<'_>, args: &[Value]) -> Value {
        let mut origins = OriginSet::single(Origin::Produced(site.offset));
        if let Some(first) = args.first().and_then(Value::origins) {
            origins.union_with(first);
        }
        Value::Reference { origins }
    }
}

#[test]
fn invocation_unit_decides_call_results() {
    let descriptor = format!("({OBJ}){OBJ}");
    let (program, m) = single_method(&descriptor, |code| {
        code.aload(0)
            .invokestatic("t/T", "id", &format!("({OBJ}){OBJ}"))
            .areturn();
    });
    let eval = PartialEvaluator::default()
        .evaluate(&program, m, &ReturnsFirstArgument)
        .unwrap();
    assert_eq!(
        origins(&eval, 2, 0),
        vec![Origin::Parameter(0), Origin::Produced(1)]
    );
}

#[test]
fn stack_underflow_is_reported() {
    let (program, m) = single_method("()V", |code| {
        code.pop().return_void();
    });
    let result = PartialEvaluator::default().evaluate(&program, m, &BasicInvocationUnit);
    assert!(matches!(
        result,
        Err(EvalError::StackUnderflow { offset: 0, .. })
    ));
}

#[test]
fn methods_without_code_cannot_be_evaluated() {
    let program = ProgramBuilder::with_java_lang().build().unwrap();
    let hash = program
        .method_by_name("java/lang/Object", "hashCode", "()I")
        .unwrap();
    assert!(matches!(
        PartialEvaluator::default().evaluate(&program, hash, &BasicInvocationUnit),
        Err(EvalError::NoBody { .. })
    ));
}
