//! Parameter and local variable usage.
//!
//! A parameter is used when some reachable instruction loads its entry
//! slot. The receiver counts as used: dispatch needs it even when the body
//! never loads it.
//!
//! Overridable methods share usage across their overriding group, since a
//! caller cannot drop an argument that some implementation reads.

use jopt_ir::{Instruction, MethodId, VariableOp};
use rustc_hash::FxHashMap;

use super::{Change, FactMarker};
use crate::context::{Environment, MethodView};
use crate::error::AnalysisError;
use crate::info::{FactStore, ParameterMask, VariableSet};

pub struct UsageMarker;

impl FactMarker for UsageMarker {
    fn name(&self) -> &'static str {
        "usage"
    }

    fn mark(&self, env: &Environment<'_>, store: &mut FactStore) -> Result<Change, AnalysisError> {
        let own: FxHashMap<MethodId, (ParameterMask, VariableSet)> = env
            .views()
            .map(|view| (view.id, direct_usage(&view)))
            .collect();

        let mut change = Change::Unchanged;
        for (&id, (mask, variables)) in &own {
            let mask = env
                .hierarchy
                .overriding_group(id)
                .iter()
                .filter(|&&other| other != id)
                .fold(*mask, |acc, &other| acc.union(implementation_usage(env, &own, other)));
            if let Some(facts) = store.method_mut(id) {
                change |= facts.add_used_parameters(mask);
                change |= facts.add_used_variables(variables);
            }
        }
        Ok(change)
    }
}

/// Usage contributed by another member of an overriding group.
fn implementation_usage(
    env: &Environment<'_>,
    own: &FxHashMap<MethodId, (ParameterMask, VariableSet)>,
    other: MethodId,
) -> ParameterMask {
    if let Some((mask, _)) = own.get(&other) {
        return *mask;
    }
    let method = env.program.method(other);
    // Abstract program methods have no body to read anything; library
    // and native implementations may read every argument.
    if env.program.class(method.class).is_program() && method.is_abstract() {
        ParameterMask::NONE
    } else {
        ParameterMask::ALL
    }
}

fn direct_usage(view: &MethodView<'_>) -> (ParameterMask, VariableSet) {
    let mut mask = ParameterMask::NONE;
    let mut variables = VariableSet::new();
    if !view.method.is_static() {
        mask.insert(0);
    }
    for (offset, instruction) in view.code.instructions.iter().enumerate() {
        if !view.is_reachable(offset) {
            continue;
        }
        let Instruction::Variable { op, slot } = instruction else {
            continue;
        };
        let width = match op {
            VariableOp::Load(kind) => kind.slot_size(),
            VariableOp::Iinc(_) => 1,
            VariableOp::Store(_) => continue,
        };
        for s in *slot..slot.saturating_add(width) {
            variables.insert(s);
        }
        if let Some(parameter) = view.method.parameter_at_slot(*slot) {
            mask.insert(parameter.index);
        }
    }
    (mask, variables)
}
