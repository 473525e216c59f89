//! Side-effect markers for classes and methods.

use jopt_ir::{ClassId, MethodAccess, MethodId};

use super::{Change, FactMarker};
use crate::classify::{has_external_side_effect, has_side_effect};
use crate::context::{Context, Environment, MethodView};
use crate::error::AnalysisError;
use crate::info::{ClassFlags, FactStore, MethodFlags};

/// Marks classes whose initialization may have side effects, through their
/// own static initializer or a superclass's.
pub struct ClassSideEffectMarker;

impl FactMarker for ClassSideEffectMarker {
    fn name(&self) -> &'static str {
        "class-side-effect"
    }

    fn mark(&self, env: &Environment<'_>, store: &mut FactStore) -> Result<Change, AnalysisError> {
        let found: Vec<ClassId> = {
            let ctx = Context::new(env, store);
            env.program
                .program_classes()
                .filter(|&class| ctx.class_initialization_has_side_effects(class))
                .collect()
        };

        let mut change = Change::Unchanged;
        for class in found {
            if let Some(facts) = store.class_mut(class) {
                change |= facts.promote(ClassFlags::HAS_SIDE_EFFECTS);
            }
        }
        Ok(change)
    }
}

/// Marks methods containing an instruction with a side effect, and those
/// whose side effects may reach state they did not create.
pub struct MethodSideEffectMarker;

impl FactMarker for MethodSideEffectMarker {
    fn name(&self) -> &'static str {
        "method-side-effect"
    }

    fn mark(&self, env: &Environment<'_>, store: &mut FactStore) -> Result<Change, AnalysisError> {
        let found: Vec<(MethodId, MethodFlags)> = {
            let ctx = Context::new(env, store);
            env.views()
                .map(|view| (view.id, side_effect_flags(&ctx, &view)))
                .filter(|(_, flags)| !flags.is_empty())
                .collect()
        };

        let mut change = Change::Unchanged;
        for (id, flags) in found {
            if let Some(facts) = store.method_mut(id) {
                change |= facts.promote(flags);
            }
        }
        Ok(change)
    }
}

fn side_effect_flags(ctx: &Context<'_>, view: &MethodView<'_>) -> MethodFlags {
    // Acquiring the monitor of a shared object is visible to every thread.
    if view.method.access.contains(MethodAccess::SYNCHRONIZED) {
        return MethodFlags::HAS_SIDE_EFFECTS | MethodFlags::HAS_EXTERNAL_SIDE_EFFECTS;
    }
    let options = ctx.config().side_effects;
    let mut flags = MethodFlags::empty();
    for offset in 0..view.code.len() {
        if !flags.contains(MethodFlags::HAS_SIDE_EFFECTS) && has_side_effect(ctx, view, offset) {
            flags |= MethodFlags::HAS_SIDE_EFFECTS;
        }
        if has_external_side_effect(ctx, view, offset, options) {
            flags |= MethodFlags::HAS_SIDE_EFFECTS | MethodFlags::HAS_EXTERNAL_SIDE_EFFECTS;
            break;
        }
    }
    flags
}
