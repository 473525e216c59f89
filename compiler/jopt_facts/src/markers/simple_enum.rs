//! Simple enums: enums whose instances can be replaced by their ordinals.
//!
//! Candidates are chosen when facts are installed. This marker rejects a
//! candidate on the first use that needs a real object: reflection,
//! type tests, instance state, subclassing, or any virtual call other
//! than `ordinal()`.

use jopt_ir::{ClassId, ConstantOp};
use rustc_hash::FxHashSet;

use super::{Change, FactMarker};
use crate::context::Environment;
use crate::error::AnalysisError;
use crate::info::{ClassFlags, FactStore};

pub struct SimpleEnumMarker;

impl FactMarker for SimpleEnumMarker {
    fn name(&self) -> &'static str {
        "simple-enum"
    }

    fn mark(&self, env: &Environment<'_>, store: &mut FactStore) -> Result<Change, AnalysisError> {
        let candidates: Vec<ClassId> = env
            .program
            .program_classes()
            .filter(|&c| {
                store.class(c).program().is_some_and(|facts| {
                    let flags = facts.flags();
                    flags.contains(ClassFlags::SIMPLE_ENUM_CANDIDATE)
                        && !flags.contains(ClassFlags::SIMPLE_ENUM_REJECTED)
                })
            })
            .collect();
        if candidates.is_empty() {
            return Ok(Change::Unchanged);
        }

        let mut rejected: FxHashSet<ClassId> = candidates
            .iter()
            .copied()
            .filter(|&c| rejected_by_shape(env, store, c))
            .collect();
        rejected.extend(rejected_by_use(env, &candidates));

        let mut change = Change::Unchanged;
        for class in rejected {
            tracing::debug!(class = %env.program.class(class).name, "not a simple enum");
            if let Some(facts) = store.class_mut(class) {
                change |= facts.promote(ClassFlags::SIMPLE_ENUM_REJECTED);
            }
        }
        Ok(change)
    }
}

fn rejected_by_shape(env: &Environment<'_>, store: &FactStore, id: ClassId) -> bool {
    let program = env.program;
    let class = program.class(id);
    let facts = store.class(id);
    facts.is_kept()
        || facts.is_dot_classed()
        || facts.is_instanceof_tested()
        || facts.is_caught()
        || !class.interfaces.is_empty()
        || !env.hierarchy.direct_subtypes(id).is_empty()
        || env.hierarchy.has_incomplete_supertypes(id)
        || class.fields.iter().any(|&f| !program.field(f).is_static())
}

/// Candidates used in a way that needs an object: a virtual call other than
/// `ordinal()`, or an instantiation outside the enum itself.
fn rejected_by_use(env: &Environment<'_>, candidates: &[ClassId]) -> FxHashSet<ClassId> {
    let program = env.program;
    let mut rejected = FxHashSet::default();
    for view in env.views() {
        for offset in 0..view.code.len() {
            let Some((op, index)) = view
                .code
                .instruction(offset)
                .and_then(|i| i.constant_operand())
            else {
                continue;
            };
            let named = match op {
                ConstantOp::InvokeVirtual | ConstantOp::InvokeInterface => view
                    .pool
                    .member_ref(index)
                    .filter(|m| m.name != "ordinal")
                    .and_then(|m| program.class_by_name(&m.class)),
                ConstantOp::New => view
                    .pool
                    .class_name(index)
                    .and_then(|name| program.class_by_name(name))
                    .filter(|&c| c != view.class),
                _ => None,
            };
            if let Some(class) = named.filter(|c| candidates.contains(c)) {
                rejected.insert(class);
            }
        }
    }
    rejected
}
