//! Initial fact records.
//!
//! Installs exactly one record per entity before the first marker runs.
//! Program classes, program fields, and program methods with a body get
//! optimistic `Program` records; everything else gets `Library`. Facts
//! known up front are set here: entry points from the keep set, simple enum
//! candidates, callers outside the program, and initial field values.

use jopt_ir::{
    ClassAccess, ClassHierarchy, ClassId, Constant, Field, FieldAccess, FieldId, MethodId,
    Program, ValueKind,
};

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::info::{
    ClassFacts, ClassFlags, FactStore, FieldConstant, FieldFacts, FieldFlags, FieldValue,
    InvocationCount, MethodFacts, MethodFlags, ParameterMask, ProgramClassFacts,
    ProgramFieldFacts, ProgramMethodFacts, ReferencedClass,
};

const JAVA_LANG_ENUM: &str = "java/lang/Enum";

/// A fresh store with one record per entity of `program`.
pub fn initialize(
    program: &Program,
    hierarchy: &ClassHierarchy,
    config: &AnalysisConfig,
) -> Result<FactStore, AnalysisError> {
    let mut store = FactStore::new(program);
    for id in program.class_ids() {
        store.set_class_facts(id, class_facts(program, config, id))?;
    }
    for id in program.method_ids() {
        store.set_method_facts(id, method_facts(program, hierarchy, config, id))?;
    }
    for id in program.field_ids() {
        store.set_field_facts(id, field_facts(program, config, id))?;
    }
    tracing::debug!(
        classes = program.class_count(),
        methods = program.method_count(),
        fields = program.field_count(),
        "installed initial facts",
    );
    Ok(store)
}

fn class_facts(program: &Program, config: &AnalysisConfig, id: ClassId) -> ClassFacts {
    let class = program.class(id);
    if !class.is_program() {
        return ClassFacts::Library;
    }
    let mut facts = ProgramClassFacts::new();
    let mut flags = ClassFlags::empty();
    if config.keep.contains_class(&class.name) {
        flags |= ClassFlags::KEPT;
    }
    if class.access.contains(ClassAccess::ENUM)
        && class.super_name.as_deref() == Some(JAVA_LANG_ENUM)
    {
        flags |= ClassFlags::SIMPLE_ENUM_CANDIDATE;
    }
    let _ = facts.promote(flags);
    ClassFacts::Program(facts)
}

fn method_facts(
    program: &Program,
    hierarchy: &ClassHierarchy,
    config: &AnalysisConfig,
    id: MethodId,
) -> MethodFacts {
    if !program.has_inspectable_body(id) {
        return MethodFacts::Library;
    }
    let method = program.method(id);
    let class = &program.class(method.class).name;
    let mut facts = ProgramMethodFacts::new();

    let kept = config
        .keep
        .contains_member(class, &method.name, &method.descriptor);
    // Library code may call overrides of library methods any number of times.
    let called_from_library = hierarchy
        .overriding_group(id)
        .iter()
        .any(|&m| !program.class(program.method(m).class).is_program());
    if kept {
        let _ = facts.promote(MethodFlags::KEPT);
        // The signature of an entry point is fixed.
        let _ = facts.add_used_parameters(ParameterMask::ALL);
    }
    if kept || called_from_library || method.is_class_initializer() {
        let _ = facts.raise_invocation_count(InvocationCount::Unbounded);
    }
    MethodFacts::Program(facts)
}

fn field_facts(program: &Program, config: &AnalysisConfig, id: FieldId) -> FieldFacts {
    let field = program.field(id);
    let class = program.class(field.class);
    if !class.is_program() {
        return FieldFacts::Library;
    }
    let mut facts = ProgramFieldFacts::new();
    let kept = config
        .keep
        .contains_member(&class.name, &field.name, &field.descriptor);
    if kept {
        let _ = facts.promote(FieldFlags::KEPT);
    }
    // Kept and volatile fields can change behind the program's back.
    if kept || field.access.contains(FieldAccess::VOLATILE) {
        let _ = facts.join_value(&FieldValue::Unknown);
        let _ = facts.join_referenced_class(ReferencedClass::Unknown);
    } else {
        let _ = facts.join_value(&FieldValue::Constant(initial_value(program, field)));
    }
    FieldFacts::Program(facts)
}

/// The value a field holds before any store: its `ConstantValue`, or the
/// default for its type.
fn initial_value(program: &Program, field: &Field) -> FieldConstant {
    let pool = &program.class(field.class).constant_pool;
    let constant = field.constant_value.and_then(|index| pool.get(index));
    match constant {
        Some(Constant::Integer(v)) => return FieldConstant::Int(*v),
        Some(Constant::Long(v)) => return FieldConstant::Long(*v),
        Some(Constant::Float(v)) => return FieldConstant::Float(*v),
        Some(Constant::Double(v)) => return FieldConstant::Double(*v),
        Some(Constant::String(s)) => return FieldConstant::String(s.clone()),
        _ => {}
    }
    match field.ty.value_kind() {
        ValueKind::Int => FieldConstant::Int(0),
        ValueKind::Long => FieldConstant::Long(0),
        ValueKind::Float => FieldConstant::Float(0),
        ValueKind::Double => FieldConstant::Double(0),
        ValueKind::Reference => FieldConstant::Null,
    }
}
