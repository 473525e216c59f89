//! Call-site counting.

use jopt_ir::{CallTargets, Constant, ConstantOp, InvokeKind, MethodId};
use rustc_hash::FxHashMap;

use super::{Change, FactMarker};
use crate::context::Environment;
use crate::error::AnalysisError;
use crate::info::{FactStore, InvocationCount};

/// Counts the call sites that may invoke each method. A virtual call site
/// counts once for every override it may dispatch to.
pub struct InvocationCounter;

impl FactMarker for InvocationCounter {
    fn name(&self) -> &'static str {
        "invocation-counter"
    }

    fn mark(&self, env: &Environment<'_>, store: &mut FactStore) -> Result<Change, AnalysisError> {
        let program = env.program;
        let mut tallies: FxHashMap<MethodId, usize> = FxHashMap::default();
        let mut unbounded: Vec<MethodId> = Vec::new();

        for view in env.views() {
            for instruction in &view.code.instructions {
                let Some((op, index)) = instruction.constant_operand() else {
                    continue;
                };
                if op == ConstantOp::Ldc {
                    // A method handle can be invoked any number of times.
                    if let Some(Constant::MethodHandle { kind, reference }) = view.pool.get(index) {
                        let handled = (!kind.is_field())
                            .then(|| view.pool.member_ref(*reference))
                            .flatten()
                            .and_then(|m| env.hierarchy.resolve_method_ref(program, m));
                        unbounded.extend(handled);
                    }
                    continue;
                }
                let (Some(kind), Some(member)) = (InvokeKind::from_op(op), view.pool.member_ref(index))
                else {
                    continue;
                };
                if let CallTargets::Known(targets) = env.hierarchy.call_targets(program, kind, member) {
                    for target in targets {
                        *tallies.entry(target).or_default() += 1;
                    }
                }
            }
        }

        let limit = env.config.invocation_count_limit;
        let mut change = Change::Unchanged;
        for (id, tally) in tallies {
            if let Some(facts) = store.method_mut(id) {
                change |= facts.raise_invocation_count(InvocationCount::from_tally(tally, limit));
            }
        }
        for id in unbounded {
            if let Some(facts) = store.method_mut(id) {
                change |= facts.raise_invocation_count(InvocationCount::Unbounded);
            }
        }
        Ok(change)
    }
}
