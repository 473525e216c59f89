//! Property-based tests for the fact engine.
//!
//! Random programs are built from small stack-neutral snippets that call
//! each other (cycles included) and verify:
//! 1. Monotonicity: no marker ever lowers a fact, checked after every step
//! 2. Convergence: a rerun on converged facts changes nothing
//! 3. Soundness: side effects, escapes, and call counts seen in the code
//!    show up in the converged facts

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use jopt_facts::{AnalysisConfig, FactStore, FixedPointDriver, InvocationCount};
use jopt_ir::{Condition, FieldAccess, MethodAccess, MethodId, Program, ProgramBuilder};
use proptest::prelude::*;

const CLASS: &str = "app/P";
const DESCRIPTOR: &str = "(Ljava/lang/Object;)Ljava/lang/Object;";

// -- Program Generation Strategies --

#[derive(Clone, Debug)]
enum Snippet {
    /// Call `m{index}` with the parameter and drop the result.
    Call(usize),
    WriteInt(i32),
    ReadInt,
    /// Store the parameter in a static field.
    StoreParam,
    /// Allocate an instance and drop it.
    Alloc,
    /// A conditional branch around nothing.
    Branch,
    Divide(i32),
}

#[derive(Clone, Copy, Debug)]
enum Exit {
    Param,
    Null,
    Field,
}

#[derive(Clone, Debug)]
struct Body {
    snippets: Vec<Snippet>,
    exit: Exit,
}

fn snippet_strategy(methods: usize) -> impl Strategy<Value = Snippet> {
    prop_oneof![
        (0..methods).prop_map(Snippet::Call),
        (-1i32..3).prop_map(Snippet::WriteInt),
        Just(Snippet::ReadInt),
        Just(Snippet::StoreParam),
        Just(Snippet::Alloc),
        Just(Snippet::Branch),
        (0i32..3).prop_map(Snippet::Divide),
    ]
}

fn body_strategy(methods: usize) -> impl Strategy<Value = Body> {
    let exit = prop_oneof![Just(Exit::Param), Just(Exit::Null), Just(Exit::Field)];
    (prop::collection::vec(snippet_strategy(methods), 0..6), exit)
        .prop_map(|(snippets, exit)| Body { snippets, exit })
}

fn program_strategy() -> impl Strategy<Value = Vec<Body>> {
    (1usize..5).prop_flat_map(|n| prop::collection::vec(body_strategy(n), n))
}

fn method_name(index: usize) -> String {
    format!("m{index}")
}

fn build(bodies: &[Body]) -> Program {
    let mut builder = ProgramBuilder::with_java_lang();
    builder.class(CLASS, |c| {
        c.field("f", "I", FieldAccess::STATIC);
        c.field("o", "Ljava/lang/Object;", FieldAccess::STATIC);
        c.method("<init>", "()V", MethodAccess::PUBLIC, |code| {
            code.aload(0)
                .invokespecial("java/lang/Object", "<init>", "()V")
                .return_void();
        });
        for (index, body) in bodies.iter().enumerate() {
            c.method(&method_name(index), DESCRIPTOR, MethodAccess::STATIC, |code| {
                for snippet in &body.snippets {
                    match snippet {
                        Snippet::Call(target) => {
                            code.aload(0)
                                .invokestatic(CLASS, &method_name(*target), DESCRIPTOR)
                                .pop();
                        }
                        Snippet::WriteInt(value) => {
                            code.iconst(*value).putstatic(CLASS, "f", "I");
                        }
                        Snippet::ReadInt => {
                            code.getstatic(CLASS, "f", "I").pop();
                        }
                        Snippet::StoreParam => {
                            code.aload(0).putstatic(CLASS, "o", "Ljava/lang/Object;");
                        }
                        Snippet::Alloc => {
                            code.new_instance(CLASS)
                                .dup()
                                .invokespecial(CLASS, "<init>", "()V")
                                .pop();
                        }
                        Snippet::Branch => {
                            let join = code.label();
                            code.iconst(0).if_(Condition::Eq, join);
                            code.bind(join);
                        }
                        Snippet::Divide(divisor) => {
                            code.iconst(1).iconst(*divisor).idiv().pop();
                        }
                    }
                }
                match body.exit {
                    Exit::Param => code.aload(0).areturn(),
                    Exit::Null => code.aconst_null().areturn(),
                    Exit::Field => code
                        .getstatic(CLASS, "o", "Ljava/lang/Object;")
                        .areturn(),
                };
            });
        }
    });
    builder.build().expect("generated programs are well formed")
}

fn method_ids(program: &Program, bodies: &[Body]) -> Vec<MethodId> {
    (0..bodies.len())
        .map(|index| {
            program
                .method_by_name(CLASS, &method_name(index), DESCRIPTOR)
                .expect("generated method exists")
        })
        .collect()
}

fn config() -> AnalysisConfig {
    AnalysisConfig {
        verify_monotonicity: true,
        ..AnalysisConfig::default()
    }
}

fn converged(program: &Program) -> FactStore {
    jopt_facts::analyze(program, config()).expect("analysis converges")
}

// -- Properties --

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        max_shrink_iters: 500,
        ..ProptestConfig::default()
    })]

    /// Every step ends with facts at or above those it started with.
    #[test]
    fn prop_steps_never_demote(bodies in program_strategy()) {
        let program = build(&bodies);
        let mut driver = FixedPointDriver::new(&program, config()).unwrap();
        let mut store = driver.initial_store().unwrap();
        loop {
            let before = store.clone();
            let state = driver.step(&mut store).unwrap();
            prop_assert_eq!(store.find_demotion(&before), None);
            if state.is_converged() {
                prop_assert_eq!(&store, &before);
                break;
            }
        }
    }

    /// Converged facts are a fixed point.
    #[test]
    fn prop_rerun_is_stable(bodies in program_strategy()) {
        let program = build(&bodies);
        let store = converged(&program);
        let mut again = store.clone();
        let mut driver = FixedPointDriver::new(&program, config()).unwrap();
        prop_assert_eq!(driver.run(&mut again).unwrap(), 1);
        prop_assert_eq!(again, store);
    }

    /// Direct effects in a body are never missed, and callers inherit the
    /// effects of their callees.
    #[test]
    fn prop_side_effects_are_sound(bodies in program_strategy()) {
        let program = build(&bodies);
        let store = converged(&program);
        let ids = method_ids(&program, &bodies);

        for (index, body) in bodies.iter().enumerate() {
            let facts = store.method(ids[index]);
            let writes = body
                .snippets
                .iter()
                .any(|s| matches!(s, Snippet::WriteInt(_) | Snippet::StoreParam));
            if writes {
                prop_assert!(facts.has_side_effects(), "m{} writes a field", index);
            }
            if body.snippets.iter().any(|s| matches!(s, Snippet::StoreParam)) {
                prop_assert!(facts.has_parameter_escaped(0), "m{} stores its parameter", index);
            }
            for snippet in &body.snippets {
                if let Snippet::Call(target) = snippet {
                    if store.method(ids[*target]).has_side_effects() {
                        prop_assert!(facts.has_side_effects(), "m{} calls m{}", index, target);
                    }
                    if store.method(ids[*target]).may_throw_exceptions() {
                        prop_assert!(facts.may_throw_exceptions(), "m{} calls m{}", index, target);
                    }
                }
            }
            if matches!(body.exit, Exit::Field) {
                prop_assert!(facts.returns_external_values());
            }
        }
    }

    /// Invocation counts equal the number of call sites.
    #[test]
    fn prop_call_sites_are_counted(bodies in program_strategy()) {
        let program = build(&bodies);
        let store = converged(&program);
        let ids = method_ids(&program, &bodies);

        let mut expected = vec![0u32; bodies.len()];
        for body in &bodies {
            for snippet in &body.snippets {
                if let Snippet::Call(target) = snippet {
                    expected[*target] += 1;
                }
            }
        }
        for (index, &count) in expected.iter().enumerate() {
            prop_assert_eq!(
                store.method(ids[index]).invocation_count(),
                InvocationCount::Counted(count)
            );
        }
    }
}
