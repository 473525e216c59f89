//! Who reaches into whom: access levels used by each method, and members
//! that are referenced from outside their own class.

use jopt_ir::{ClassId, Constant, ConstantOp, FieldId, MethodId, Visibility};
use rustc_hash::FxHashMap;

use super::{class_named, Change, FactMarker};
use crate::context::{Environment, MethodView};
use crate::error::AnalysisError;
use crate::info::{ClassFlags, FactStore, FieldFlags, MethodFlags};

pub struct AccessMarker;

/// The entity one instruction refers to.
enum Target {
    Class(ClassId),
    Method(MethodId),
    Field(FieldId),
}

#[derive(Default)]
struct Findings {
    methods: FxHashMap<MethodId, MethodFlags>,
    fields: FxHashMap<FieldId, FieldFlags>,
    classes: FxHashMap<ClassId, ClassFlags>,
}

impl Findings {
    fn method(&mut self, id: MethodId, flags: MethodFlags) {
        *self.methods.entry(id).or_default() |= flags;
    }

    fn field(&mut self, id: FieldId, flags: FieldFlags) {
        *self.fields.entry(id).or_default() |= flags;
    }

    fn class(&mut self, id: ClassId, flags: ClassFlags) {
        *self.classes.entry(id).or_default() |= flags;
    }
}

impl FactMarker for AccessMarker {
    fn name(&self) -> &'static str {
        "access"
    }

    fn mark(&self, env: &Environment<'_>, store: &mut FactStore) -> Result<Change, AnalysisError> {
        let mut findings = Findings::default();
        for view in env.views() {
            for offset in 0..view.code.len() {
                if let Some(target) = target_at(env, &view, offset) {
                    record(env, &view, &target, &mut findings);
                }
            }
        }

        // Overridden or overriding methods are reachable through dispatch
        // from any caller.
        for id in env.program.method_ids() {
            if env.hierarchy.may_have_implementations(id) {
                findings.method(id, MethodFlags::CANNOT_BE_MADE_PRIVATE);
            }
        }

        let mut change = Change::Unchanged;
        for (id, flags) in findings.methods {
            if let Some(facts) = store.method_mut(id) {
                change |= facts.promote(flags);
            }
        }
        for (id, flags) in findings.fields {
            if let Some(facts) = store.field_mut(id) {
                change |= facts.promote(flags);
            }
        }
        for (id, flags) in findings.classes {
            if let Some(facts) = store.class_mut(id) {
                change |= facts.promote(flags);
            }
        }
        Ok(change)
    }
}

fn target_at(env: &Environment<'_>, view: &MethodView<'_>, offset: usize) -> Option<Target> {
    let program = env.program;
    let (op, index) = view.code.instruction(offset)?.constant_operand()?;
    match op {
        ConstantOp::GetField
        | ConstantOp::GetStatic
        | ConstantOp::PutField
        | ConstantOp::PutStatic => {
            let member = view.pool.member_ref(index)?;
            env.hierarchy
                .resolve_field_ref(program, member)
                .map(Target::Field)
        }
        ConstantOp::InvokeVirtual
        | ConstantOp::InvokeSpecial
        | ConstantOp::InvokeStatic
        | ConstantOp::InvokeInterface => {
            let member = view.pool.member_ref(index)?;
            env.hierarchy
                .resolve_method_ref(program, member)
                .map(Target::Method)
        }
        ConstantOp::New
        | ConstantOp::ANewArray
        | ConstantOp::CheckCast
        | ConstantOp::InstanceOf
        | ConstantOp::MultiANewArray(_) => {
            class_named(program, view.pool.class_name(index)?).map(Target::Class)
        }
        ConstantOp::Ldc => match view.pool.get(index)? {
            Constant::Class(name) => class_named(program, name).map(Target::Class),
            Constant::MethodHandle { kind, reference } => {
                let member = view.pool.member_ref(*reference)?;
                if kind.is_field() {
                    env.hierarchy
                        .resolve_field_ref(program, member)
                        .map(Target::Field)
                } else {
                    env.hierarchy
                        .resolve_method_ref(program, member)
                        .map(Target::Method)
                }
            }
            _ => None,
        },
        ConstantOp::InvokeDynamic => None,
    }
}

fn record(env: &Environment<'_>, view: &MethodView<'_>, target: &Target, findings: &mut Findings) {
    let program = env.program;
    let (owner, visibility) = match *target {
        Target::Class(id) => (id, program.class(id).access.visibility()),
        Target::Method(id) => {
            let method = program.method(id);
            (method.class, method.access.visibility())
        }
        Target::Field(id) => {
            let field = program.field(id);
            (field.class, field.access.visibility())
        }
    };

    let accessed = match visibility {
        Visibility::Private => MethodFlags::ACCESSES_PRIVATE_CODE,
        Visibility::Package => MethodFlags::ACCESSES_PACKAGE_CODE,
        Visibility::Protected => MethodFlags::ACCESSES_PROTECTED_CODE,
        Visibility::Public => MethodFlags::empty(),
    };
    findings.method(view.id, accessed);

    if owner == view.class {
        return;
    }
    match *target {
        Target::Method(id) => findings.method(id, MethodFlags::CANNOT_BE_MADE_PRIVATE),
        Target::Field(id) => findings.field(id, FieldFlags::ACCESSED_EXTERNALLY),
        Target::Class(_) => {}
    }
    if visibility.is_package_visible() {
        findings.class(view.class, ClassFlags::INVOKES_PACKAGE_VISIBLE_MEMBERS);
    }
}
