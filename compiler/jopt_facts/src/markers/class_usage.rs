//! How classes are used: instantiated, named by `.class`, tested, caught;
//! and which shapes keep them from being merged.

use jopt_ir::{ClassAccess, ClassId, ConstantOp, Instruction, MethodAccess};
use rustc_hash::FxHashMap;

use super::{class_named, Change, FactMarker};
use crate::context::Environment;
use crate::error::AnalysisError;
use crate::info::{ClassFlags, FactStore};

pub struct ClassUsageMarker;

impl FactMarker for ClassUsageMarker {
    fn name(&self) -> &'static str {
        "class-usage"
    }

    fn mark(&self, env: &Environment<'_>, store: &mut FactStore) -> Result<Change, AnalysisError> {
        let program = env.program;
        let mut found: FxHashMap<ClassId, ClassFlags> = FxHashMap::default();
        let mut add = |class: Option<ClassId>, flag: ClassFlags| {
            if let Some(class) = class {
                *found.entry(class).or_default() |= flag;
            }
        };

        for view in env.views() {
            for handler in &view.code.exception_table {
                let caught = handler
                    .catch_type
                    .and_then(|index| view.pool.class_name(index))
                    .and_then(|name| class_named(program, name));
                add(caught, ClassFlags::CAUGHT);
            }
            for instruction in &view.code.instructions {
                let Instruction::Constant { op, index } = instruction else {
                    continue;
                };
                let flag = match op {
                    ConstantOp::New => ClassFlags::INSTANTIATED,
                    ConstantOp::InstanceOf => ClassFlags::INSTANCEOF_TESTED,
                    ConstantOp::Ldc => ClassFlags::DOT_CLASSED,
                    _ => continue,
                };
                let class = view
                    .pool
                    .class_name(*index)
                    .and_then(|name| class_named(program, name));
                add(class, flag);
            }
        }

        for class in program.program_classes() {
            add(Some(class), structural_flags(env, store, class));
        }

        let mut change = Change::Unchanged;
        for (class, flags) in found {
            if let Some(facts) = store.class_mut(class) {
                change |= facts.promote(flags);
            }
        }
        Ok(change)
    }
}

/// Flags that follow from the class declaration itself.
fn structural_flags(env: &Environment<'_>, store: &FactStore, id: ClassId) -> ClassFlags {
    let program = env.program;
    let class = program.class(id);
    let mut flags = ClassFlags::empty();

    let methods = class.methods.iter().map(|&m| program.method(m));
    for method in methods {
        if method.is_initializer() {
            flags |= ClassFlags::CONTAINS_CONSTRUCTORS;
        }
        if method.access.visibility().is_package_visible() {
            flags |= ClassFlags::CONTAINS_PACKAGE_VISIBLE_MEMBERS;
        }
        if method.access.contains(MethodAccess::NATIVE) {
            flags |= ClassFlags::MERGE_BLOCKED;
        }
    }
    let package_fields = class
        .fields
        .iter()
        .any(|&f| program.field(f).access.visibility().is_package_visible());
    if package_fields {
        flags |= ClassFlags::CONTAINS_PACKAGE_VISIBLE_MEMBERS;
    }

    let invokes_dynamically = class
        .methods
        .iter()
        .any(|&m| store.method(m).program().is_some() && store.method(m).invokes_dynamically());
    if invokes_dynamically
        || class
            .access
            .intersects(ClassAccess::ENUM | ClassAccess::ANNOTATION)
        || env.hierarchy.has_incomplete_supertypes(id)
    {
        flags |= ClassFlags::MERGE_BLOCKED;
    }
    flags
}
