//! Field reads, writes, and the values stored into fields.

use jopt_eval::{Origin, Value};
use jopt_ir::{Constant, ConstantOp, FieldId, Instruction, ReferenceKind};

use super::{Change, FactMarker};
use crate::context::{Environment, MethodView};
use crate::error::AnalysisError;
use crate::info::{FactStore, FieldConstant, FieldFlags, FieldValue, ReferencedClass};

pub struct FieldMarker;

/// What one instruction tells about one field.
struct FieldUse {
    field: FieldId,
    flags: FieldFlags,
    value: FieldValue,
    class: ReferencedClass,
}

impl FactMarker for FieldMarker {
    fn name(&self) -> &'static str {
        "field"
    }

    fn mark(&self, env: &Environment<'_>, store: &mut FactStore) -> Result<Change, AnalysisError> {
        let mut uses = Vec::new();
        for view in env.views() {
            for offset in 0..view.code.len() {
                if let Some(found) = field_use(env, &view, offset) {
                    uses.push(found);
                }
            }
        }

        let mut change = Change::Unchanged;
        for found in uses {
            if let Some(facts) = store.field_mut(found.field) {
                change |= facts.promote(found.flags);
                change |= facts.join_value(&found.value);
                change |= facts.join_referenced_class(found.class);
            }
        }
        Ok(change)
    }
}

fn field_use(env: &Environment<'_>, view: &MethodView<'_>, offset: usize) -> Option<FieldUse> {
    let program = env.program;
    let Instruction::Constant { op, index } = view.code.instruction(offset)? else {
        return None;
    };
    match op {
        ConstantOp::GetField | ConstantOp::GetStatic => {
            let member = view.pool.member_ref(*index)?;
            Some(FieldUse {
                field: env.hierarchy.resolve_field_ref(program, member)?,
                flags: FieldFlags::READ,
                value: FieldValue::Unset,
                class: ReferencedClass::Unset,
            })
        }
        ConstantOp::PutField | ConstantOp::PutStatic => {
            let member = view.pool.member_ref(*index)?;
            let field = env.hierarchy.resolve_field_ref(program, member)?;
            // Unreachable stores never run and contribute no value.
            let (value, class) = match view.evaluation.and_then(|e| e.stack_top(offset, 0)) {
                Some(stored) => (stored_value(view, stored), stored_class(env, view, stored)),
                None if view.is_reachable(offset) => {
                    (FieldValue::Unknown, ReferencedClass::Unknown)
                }
                None => (FieldValue::Unset, ReferencedClass::Unset),
            };
            Some(FieldUse {
                field,
                flags: FieldFlags::WRITTEN,
                value,
                class,
            })
        }
        ConstantOp::Ldc => {
            // A field method handle can read and write the field anywhere.
            let Some(Constant::MethodHandle { kind, reference }) = view.pool.get(*index) else {
                return None;
            };
            if !ReferenceKind::is_field(*kind) {
                return None;
            }
            let member = view.pool.member_ref(*reference)?;
            Some(FieldUse {
                field: env.hierarchy.resolve_field_ref(program, member)?,
                flags: FieldFlags::READ | FieldFlags::WRITTEN,
                value: FieldValue::Unknown,
                class: ReferencedClass::Unknown,
            })
        }
        _ => None,
    }
}

/// The constant a stored value is known to be, if any.
fn stored_value(view: &MethodView<'_>, stored: &Value) -> FieldValue {
    match stored {
        Value::Primitive {
            constant: Some(c), ..
        } => FieldValue::Constant(FieldConstant::from(*c)),
        Value::Reference { origins } if origins.is_empty() => {
            FieldValue::Constant(FieldConstant::Null)
        }
        Value::Reference { origins } if origins.len() == 1 => {
            let string = origins.iter().find_map(|origin| match origin {
                Origin::Produced(at) => match view.code.instruction(at)? {
                    Instruction::Constant {
                        op: ConstantOp::Ldc,
                        index,
                    } => match view.pool.get(*index)? {
                        Constant::String(s) => Some(s.clone()),
                        _ => None,
                    },
                    _ => None,
                },
                _ => None,
            });
            string.map_or(FieldValue::Unknown, |s| {
                FieldValue::Constant(FieldConstant::String(s))
            })
        }
        _ => FieldValue::Unknown,
    }
}

/// The exact class of every object a stored value may be.
fn stored_class(env: &Environment<'_>, view: &MethodView<'_>, stored: &Value) -> ReferencedClass {
    let Value::Reference { origins } = stored else {
        return ReferencedClass::Unset;
    };
    let mut class = ReferencedClass::Unset;
    for origin in origins.iter() {
        let allocated = match origin {
            Origin::Produced(at) => match view.code.instruction(at) {
                Some(Instruction::Constant {
                    op: ConstantOp::New,
                    index,
                }) => view
                    .pool
                    .class_name(*index)
                    .and_then(|name| env.program.class_by_name(name)),
                _ => None,
            },
            _ => None,
        };
        match allocated {
            Some(id) => {
                class.join(ReferencedClass::Class(id));
            }
            None => return ReferencedClass::Unknown,
        }
    }
    class
}
