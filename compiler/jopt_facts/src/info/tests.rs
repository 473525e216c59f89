use jopt_ir::{ClassId, FieldId, MethodId, ProgramBuilder};
use pretty_assertions::assert_eq;

use super::*;
use crate::AnalysisError;

// ── Library records ─────────────────────────────────────────────────

#[test]
fn library_records_answer_pessimistically() {
    let method = MethodFacts::Library;
    assert!(method.is_kept());
    assert!(method.has_side_effects());
    assert!(!method.has_no_side_effects());
    assert!(!method.has_no_external_side_effects());
    assert!(!method.has_no_external_return_values());
    assert_eq!(method.escaping_parameters(), ParameterMask::ALL);
    assert_eq!(method.used_parameters(), ParameterMask::ALL);
    assert!(method.has_parameter_escaped(70));
    assert_eq!(method.invocation_count(), InvocationCount::Unbounded);
    assert!(!method.can_be_made_private());
    assert!(method.is_variable_used(12));

    let class = ClassFacts::Library;
    assert!(class.is_kept());
    assert!(class.has_side_effects());
    assert!(!class.is_simple_enum());
    assert!(!class.may_be_merged());

    let field = FieldFacts::Library;
    assert!(field.is_read() && field.is_written());
    assert_eq!(field.value(), &FieldValue::Unknown);
    assert_eq!(field.referenced_class(), ReferencedClass::Unknown);
    assert!(!field.can_be_made_private());
}

#[test]
fn program_records_start_optimistic() {
    let method = MethodFacts::Program(ProgramMethodFacts::new());
    assert!(!method.is_kept());
    assert!(method.has_no_side_effects());
    assert!(method.has_no_external_side_effects());
    assert_eq!(method.escaping_parameters(), ParameterMask::NONE);
    assert_eq!(method.invocation_count(), InvocationCount::Counted(0));
    assert!(method.can_be_made_private());

    let class = ClassFacts::Program(ProgramClassFacts::new());
    assert!(!class.has_side_effects());
    assert!(class.may_be_merged());
}

// ── Promotion ───────────────────────────────────────────────────────

#[test]
fn promoters_latch_and_report_change() {
    let mut facts = ProgramMethodFacts::new();
    assert!(facts.promote(MethodFlags::HAS_SIDE_EFFECTS));
    assert!(!facts.promote(MethodFlags::HAS_SIDE_EFFECTS));
    assert!(facts.add_escaping_parameters(ParameterMask::single(1)));
    assert!(!facts.add_escaping_parameters(ParameterMask::single(1)));
    assert!(facts.raise_invocation_count(InvocationCount::Counted(3)));
    assert!(!facts.raise_invocation_count(InvocationCount::Counted(2)));
    assert!(facts.raise_invocation_count(InvocationCount::Unbounded));
    assert!(!facts.raise_invocation_count(InvocationCount::Counted(9)));
}

#[test]
fn escaping_parameters_imply_side_effects() {
    let mut facts = ProgramMethodFacts::new();
    facts.add_escaping_parameters(ParameterMask::single(0));
    let method = MethodFacts::Program(facts);
    assert!(!method.has_no_side_effects());
    assert!(!method.has_no_external_side_effects());
}

#[test]
fn simple_enum_rejection_is_final() {
    let mut facts = ProgramClassFacts::new();
    facts.promote(ClassFlags::SIMPLE_ENUM_CANDIDATE);
    assert!(ClassFacts::Program(facts.clone()).is_simple_enum());
    facts.promote(ClassFlags::SIMPLE_ENUM_REJECTED);
    assert!(!ClassFacts::Program(facts.clone()).is_simple_enum());
    facts.promote(ClassFlags::SIMPLE_ENUM_CANDIDATE);
    assert!(!ClassFacts::Program(facts).is_simple_enum());
}

// ── Masks and lattices ──────────────────────────────────────────────

#[test]
fn high_parameters_share_the_last_bit() {
    let mut mask = ParameterMask::NONE;
    assert!(mask.insert(100));
    assert!(mask.contains(63));
    assert!(mask.contains(64));
    assert!(!mask.contains(62));
    assert_eq!(mask.without_receiver(), mask);
    assert_eq!(ParameterMask::single(0).without_receiver(), ParameterMask::NONE);
}

#[test]
fn variable_set_grows() {
    let mut vars = VariableSet::new();
    assert!(vars.insert(3));
    assert!(vars.insert(130));
    assert!(!vars.insert(3));
    assert_eq!(vars.iter().collect::<Vec<_>>(), vec![3, 130]);
    assert_eq!(vars.len(), 2);

    let mut small = VariableSet::new();
    small.insert(3);
    assert!(vars.covers(&small));
    assert!(!small.covers(&vars));
    assert!(small.union_with(&vars));
    assert_eq!(small, vars);
}

#[test]
fn invocation_count_saturates() {
    assert_eq!(InvocationCount::from_tally(3, 10), InvocationCount::Counted(3));
    assert_eq!(InvocationCount::from_tally(10, 10), InvocationCount::Counted(10));
    assert_eq!(InvocationCount::from_tally(11, 10), InvocationCount::Unbounded);
    assert_eq!(
        InvocationCount::from_tally(usize::MAX, u32::MAX),
        InvocationCount::Unbounded
    );
    assert_eq!(InvocationCount::Unbounded.get(), None);
}

#[test]
fn field_value_lattice_moves_up() {
    let mut value = FieldValue::Unset;
    assert!(!value.join(&FieldValue::Unset));
    assert!(value.join(&FieldValue::Constant(FieldConstant::Int(0))));
    assert!(!value.join(&FieldValue::Constant(FieldConstant::Int(0))));
    assert_eq!(value.constant(), Some(&FieldConstant::Int(0)));
    assert!(value.join(&FieldValue::Constant(FieldConstant::Int(1))));
    assert_eq!(value, FieldValue::Unknown);
    assert!(!value.join(&FieldValue::Constant(FieldConstant::Null)));

    assert!(FieldValue::Unknown.covers(&FieldValue::Constant(FieldConstant::Null)));
    assert!(!FieldValue::Constant(FieldConstant::Int(1))
        .covers(&FieldValue::Constant(FieldConstant::Int(2))));
}

#[test]
fn referenced_class_lattice_moves_up() {
    let a = ClassId::new(1);
    let b = ClassId::new(2);
    let mut class = ReferencedClass::Unset;
    assert!(class.join(ReferencedClass::Class(a)));
    assert!(!class.join(ReferencedClass::Class(a)));
    assert!(!class.join(ReferencedClass::Unset));
    assert_eq!(class.class(), Some(a));
    assert!(class.join(ReferencedClass::Class(b)));
    assert_eq!(class, ReferencedClass::Unknown);
}

// ── Merge ───────────────────────────────────────────────────────────

#[test]
fn merge_unions_program_records() {
    let mut a = ProgramMethodFacts::new();
    a.promote(MethodFlags::CATCHES_EXCEPTIONS);
    a.add_used_parameters(ParameterMask::single(0));
    a.raise_invocation_count(InvocationCount::Counted(2));
    let mut b = ProgramMethodFacts::new();
    b.promote(MethodFlags::BRANCHES_BACKWARD);
    b.add_used_parameters(ParameterMask::single(2));
    b.raise_invocation_count(InvocationCount::Counted(5));

    let merged = MethodFacts::Program(a).merge(&MethodFacts::Program(b));
    assert!(merged.catches_exceptions());
    assert!(merged.branches_backward());
    assert_eq!(merged.used_parameters(), ParameterMask::from_bits(0b101));
    assert_eq!(merged.invocation_count(), InvocationCount::Counted(5));
}

#[test]
fn merge_with_library_is_library() {
    let program = MethodFacts::Program(ProgramMethodFacts::new());
    assert_eq!(program.merge(&MethodFacts::Library), MethodFacts::Library);
    assert_eq!(
        ClassFacts::Library.merge(&ClassFacts::Program(ProgramClassFacts::new())),
        ClassFacts::Library
    );

    let mut a = ProgramFieldFacts::new();
    a.join_value(&FieldValue::Constant(FieldConstant::Int(1)));
    let mut b = ProgramFieldFacts::new();
    b.join_value(&FieldValue::Constant(FieldConstant::Int(2)));
    let merged = FieldFacts::Program(a).merge(&FieldFacts::Program(b));
    assert_eq!(merged.value(), &FieldValue::Unknown);
}

// ── Store ───────────────────────────────────────────────────────────

fn small_program() -> jopt_ir::Program {
    let mut builder = ProgramBuilder::with_java_lang();
    builder.class("app/Main", |c| {
        c.field("count", "I", jopt_ir::FieldAccess::PRIVATE);
        c.method("run", "()V", jopt_ir::MethodAccess::PUBLIC, |code| {
            code.return_void();
        });
    });
    builder.build().unwrap()
}

#[test]
fn absent_records_read_as_library() {
    let program = small_program();
    let store = FactStore::new(&program);
    let run = program.method_by_name("app/Main", "run", "()V").unwrap();
    assert_eq!(store.method(run), &MethodFacts::Library);
    assert_eq!(store.method(MethodId::new(10_000)), &MethodFacts::Library);
    assert_eq!(store.field(FieldId::new(10_000)), &FieldFacts::Library);
}

#[test]
fn facts_are_installed_once() {
    let program = small_program();
    let mut store = FactStore::new(&program);
    let run = program.method_by_name("app/Main", "run", "()V").unwrap();
    store
        .set_method_facts(run, MethodFacts::Program(ProgramMethodFacts::new()))
        .unwrap();
    let err = store
        .set_method_facts(run, MethodFacts::Library)
        .unwrap_err();
    assert!(matches!(err, AnalysisError::AlreadyInitialized { .. }));
    assert!(store.method(run).program().is_some());
}

#[test]
fn library_records_cannot_be_promoted() {
    let program = small_program();
    let mut store = FactStore::new(&program);
    let main = program.class_by_name("app/Main").unwrap();
    store.set_class_facts(main, ClassFacts::Library).unwrap();
    assert!(store.class_mut(main).is_none());
}

#[test]
fn find_demotion_spots_lowered_facts() {
    let program = small_program();
    let run = program.method_by_name("app/Main", "run", "()V").unwrap();
    let mut store = FactStore::new(&program);
    store
        .set_method_facts(run, MethodFacts::Program(ProgramMethodFacts::new()))
        .unwrap();
    store
        .method_mut(run)
        .unwrap()
        .promote(MethodFlags::HAS_SIDE_EFFECTS);

    let earlier = store.clone();
    store
        .method_mut(run)
        .unwrap()
        .add_used_parameters(ParameterMask::single(0));
    assert_eq!(store.find_demotion(&earlier), None);

    store.method_mut(run).unwrap().flags = MethodFlags::empty();
    assert_eq!(store.find_demotion(&earlier), Some(EntityId::Method(run)));
    assert_eq!(
        EntityId::Method(run).display(&program),
        "app/Main.run()V"
    );
}
