//! Methods that may throw.

use jopt_ir::MethodId;

use super::{Change, FactMarker};
use crate::classify::may_throw;
use crate::context::{Context, Environment};
use crate::error::AnalysisError;
use crate::info::{FactStore, MethodFlags};

/// Marks methods with a reachable instruction whose exception may leave
/// the method.
pub struct ExceptionMarker;

impl FactMarker for ExceptionMarker {
    fn name(&self) -> &'static str {
        "exception"
    }

    fn mark(&self, env: &Environment<'_>, store: &mut FactStore) -> Result<Change, AnalysisError> {
        let throwing: Vec<MethodId> = {
            let ctx = Context::new(env, store);
            env.views()
                .filter(|view| (0..view.code.len()).any(|offset| may_throw(&ctx, view, offset)))
                .map(|view| view.id)
                .collect()
        };

        let mut change = Change::Unchanged;
        for id in throwing {
            if let Some(facts) = store.method_mut(id) {
                change |= facts.promote(MethodFlags::MAY_THROW_EXCEPTIONS);
            }
        }
        Ok(change)
    }
}
