//! Parameter escape, modification, and return facts.

use jopt_ir::MethodId;

use super::{Change, FactMarker};
use crate::context::{Context, Environment};
use crate::error::AnalysisError;
use crate::escape::EscapeTracer;
use crate::info::{FactStore, MethodFlags, ParameterMask};

/// Runs the escape tracer over every method body and promotes its
/// parameter masks and external-return flag.
pub struct EscapeMarker;

struct Escapes {
    id: MethodId,
    escaping: ParameterMask,
    modified: ParameterMask,
    returned: ParameterMask,
    returns_external_values: bool,
}

impl FactMarker for EscapeMarker {
    fn name(&self) -> &'static str {
        "escape"
    }

    fn mark(&self, env: &Environment<'_>, store: &mut FactStore) -> Result<Change, AnalysisError> {
        let mut found = Vec::new();
        {
            let tracer = EscapeTracer::new(Context::new(env, store));
            for view in env.views() {
                let trace = tracer.trace(&view)?;
                found.push(Escapes {
                    id: view.id,
                    escaping: trace.escaping_parameters(),
                    modified: trace.modified_parameters(),
                    returned: trace.returned_parameters(),
                    returns_external_values: trace.returns_external_values(),
                });
            }
        }

        let mut change = Change::Unchanged;
        for escapes in found {
            let Some(facts) = store.method_mut(escapes.id) else {
                continue;
            };
            let escaped = facts.add_escaping_parameters(escapes.escaping);
            if escaped {
                tracing::debug!(
                    method = %env.program.method_display(escapes.id),
                    escaping = ?facts.escaping_parameters,
                    "parameters escape",
                );
            }
            change |= escaped;
            change |= facts.add_modified_parameters(escapes.modified);
            change |= facts.add_returned_parameters(escapes.returned);
            if escapes.returns_external_values {
                change |= facts.promote(MethodFlags::RETURNS_EXTERNAL_VALUES);
            }
        }
        Ok(change)
    }
}
