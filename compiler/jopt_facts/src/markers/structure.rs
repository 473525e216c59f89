//! Structural method facts read straight off the instructions.

use jopt_ir::{ConstantOp, Instruction, SimpleOp, INIT};

use super::{Change, FactMarker};
use crate::context::{Environment, MethodView};
use crate::error::AnalysisError;
use crate::info::{FactStore, MethodFlags};

/// Marks `catches_exceptions`, `branches_backward`, `invokes_dynamically`,
/// `assigns_final_field`, `returns_with_non_empty_stack`,
/// `has_synchronized_block`, and `invokes_super`.
pub struct StructureMarker;

impl FactMarker for StructureMarker {
    fn name(&self) -> &'static str {
        "structure"
    }

    fn mark(&self, env: &Environment<'_>, store: &mut FactStore) -> Result<Change, AnalysisError> {
        let mut change = Change::Unchanged;
        for view in env.views() {
            let flags = structural_flags(env, &view);
            if let Some(facts) = store.method_mut(view.id) {
                change |= facts.promote(flags);
            }
        }
        Ok(change)
    }
}

fn structural_flags(env: &Environment<'_>, view: &MethodView<'_>) -> MethodFlags {
    let program = env.program;
    let own_class = &program.class(view.class).name;
    let mut flags = MethodFlags::empty();
    if !view.code.exception_table.is_empty() {
        flags |= MethodFlags::CATCHES_EXCEPTIONS;
    }

    for (offset, instruction) in view.code.instructions.iter().enumerate() {
        if instruction.branch_targets().iter().any(|&t| t <= offset) {
            flags |= MethodFlags::BRANCHES_BACKWARD;
        }
        match instruction {
            Instruction::Simple(SimpleOp::MonitorEnter | SimpleOp::MonitorExit) => {
                flags |= MethodFlags::HAS_SYNCHRONIZED_BLOCK;
            }
            Instruction::Simple(SimpleOp::Return(_)) => {
                let leftover = view
                    .evaluation
                    .and_then(|e| e.stack_depth_after(offset))
                    .unwrap_or(0);
                if view.is_reachable(offset) && leftover > 0 {
                    flags |= MethodFlags::RETURNS_WITH_NON_EMPTY_STACK;
                }
            }
            Instruction::Constant { op, .. } => match op {
                ConstantOp::InvokeDynamic => flags |= MethodFlags::INVOKES_DYNAMICALLY,
                ConstantOp::PutField | ConstantOp::PutStatic => {
                    let is_final = view
                        .member_at(offset)
                        .and_then(|(_, member)| env.hierarchy.resolve_field_ref(program, member))
                        .is_some_and(|f| {
                            program.field(f).access.contains(jopt_ir::FieldAccess::FINAL)
                        });
                    if is_final {
                        flags |= MethodFlags::ASSIGNS_FINAL_FIELD;
                    }
                }
                ConstantOp::InvokeSpecial => {
                    // Constructor chaining counts as a super call.
                    let is_super = view
                        .member_at(offset)
                        .is_some_and(|(_, m)| m.name == INIT || m.class != *own_class);
                    if is_super {
                        flags |= MethodFlags::INVOKES_SUPER;
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }
    flags
}
