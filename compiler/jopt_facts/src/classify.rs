//! Instruction classifiers: may-throw, side effects, and variable access.
//!
//! Classifiers read the current facts through a [`Context`] but never change
//! them. They are total over well-formed code; an instruction whose operand
//! cannot be resolved is classified pessimistically.
//!
//! # Side effects
//!
//! Stores into fields, monitors, and throws always count. Array stores,
//! returns, and instructions that may raise a JVM exception count depending
//! on [`SideEffectOptions`]. Calls count unless every possible target is
//! known to have no side effects, and instructions that trigger class
//! initialization count when that initialization may have side effects.
//!
//! Classification is flow-insensitive: an instruction the evaluator proves
//! unreachable still has its side effects.

use std::ops::Range;

use jopt_eval::{Origin, Value};
use jopt_ir::{
    ArithOp, ConstantOp, CpIndex, Instruction, MethodDescriptor, SimpleOp, ValueKind, VariableOp,
};

use crate::config::SideEffectOptions;
use crate::context::{Context, MethodView};

// ── Side effects ────────────────────────────────────────────────────

/// Whether the instruction at `offset` may have a side effect under
/// `options`.
pub fn may_have_side_effect(
    ctx: &Context<'_>,
    view: &MethodView<'_>,
    offset: usize,
    options: SideEffectOptions,
) -> bool {
    let Some(instruction) = view.code.instruction(offset) else {
        return false;
    };
    let builtin = options.include_builtin_exceptions;
    match instruction {
        Instruction::Simple(op) => match op {
            SimpleOp::ArrayStore(_) => options.include_array_stores || builtin,
            SimpleOp::Return(_) => options.include_returns,
            SimpleOp::Throw | SimpleOp::MonitorEnter | SimpleOp::MonitorExit => true,
            SimpleOp::Arith(ArithOp::Div | ArithOp::Rem, kind) => builtin && kind.is_integral(),
            SimpleOp::ArrayLoad(_) | SimpleOp::ArrayLength | SimpleOp::NewArray(_) => builtin,
            _ => false,
        },
        Instruction::Variable { .. } | Instruction::Branch { .. } | Instruction::Switch { .. } => {
            false
        }
        Instruction::Constant { op, index } => match op {
            ConstantOp::PutField | ConstantOp::PutStatic => true,
            ConstantOp::GetField | ConstantOp::CheckCast | ConstantOp::ANewArray => builtin,
            ConstantOp::MultiANewArray(_) => builtin,
            ConstantOp::GetStatic => {
                builtin || member_initialization_has_side_effects(ctx, view, offset)
            }
            ConstantOp::New => {
                builtin
                    || view.pool.class_name(*index).map_or(true, |class| {
                        ctx.initialization_has_side_effects(view.class, class)
                    })
            }
            ConstantOp::InvokeDynamic => true,
            ConstantOp::InvokeVirtual
            | ConstantOp::InvokeSpecial
            | ConstantOp::InvokeStatic
            | ConstantOp::InvokeInterface => {
                let member = view.pool.member_ref(*index);
                if *op == ConstantOp::InvokeStatic
                    && member_initialization_has_side_effects(ctx, view, offset)
                {
                    return true;
                }
                let summary = ctx.callee_summary(*op, member);
                summary.has_side_effects || (builtin && summary.may_throw)
            }
            ConstantOp::Ldc | ConstantOp::InstanceOf => false,
        },
    }
}

/// Side effect under the configured default options.
pub fn has_side_effect(ctx: &Context<'_>, view: &MethodView<'_>, offset: usize) -> bool {
    may_have_side_effect(ctx, view, offset, ctx.config().side_effects)
}

fn member_initialization_has_side_effects(
    ctx: &Context<'_>,
    view: &MethodView<'_>,
    offset: usize,
) -> bool {
    view.member_at(offset).map_or(true, |(_, member)| {
        ctx.initialization_has_side_effects(view.class, &member.class)
    })
}

/// Whether a side effect of the instruction at `offset` may reach state the
/// method did not create itself. Writes into the receiver and into objects
/// allocated by the method are local.
pub fn has_external_side_effect(
    ctx: &Context<'_>,
    view: &MethodView<'_>,
    offset: usize,
    options: SideEffectOptions,
) -> bool {
    if !may_have_side_effect(ctx, view, offset, options) {
        return false;
    }
    let Some(instruction) = view.code.instruction(offset) else {
        return false;
    };
    match instruction {
        Instruction::Simple(SimpleOp::Return(_)) => false,
        Instruction::Simple(SimpleOp::ArrayStore(_)) => !is_local_object(view, offset, 2),
        Instruction::Constant {
            op: ConstantOp::PutField,
            ..
        } => !is_local_object(view, offset, 1),
        Instruction::Constant {
            op:
                op @ (ConstantOp::InvokeVirtual
                | ConstantOp::InvokeSpecial
                | ConstantOp::InvokeStatic
                | ConstantOp::InvokeInterface),
            index,
        } => {
            let Some(member) = view.pool.member_ref(*index) else {
                return true;
            };
            if *op == ConstantOp::InvokeStatic
                && ctx.initialization_has_side_effects(view.class, &member.class)
            {
                return true;
            }
            let summary = ctx.callee_summary(*op, Some(member));
            if summary.has_external_side_effects {
                return true;
            }
            let Ok(descriptor) = MethodDescriptor::parse(&member.descriptor) else {
                return true;
            };
            let count = descriptor.params.len() + usize::from(*op != ConstantOp::InvokeStatic);
            (0..count).any(|i| {
                summary.modified.contains(i) && !is_local_object(view, offset, count - 1 - i)
            })
        }
        _ => true,
    }
}

/// Whether the stack entry `depth` below the top before `offset` is the
/// receiver or an object allocated in this method.
fn is_local_object(view: &MethodView<'_>, offset: usize, depth: usize) -> bool {
    let Some(Value::Reference { origins }) = view
        .evaluation
        .and_then(|e| e.stack_top(offset, depth))
    else {
        return false;
    };
    !origins.is_empty()
        && origins.iter().all(|origin| match origin {
            Origin::Parameter(0) => !view.method.is_static(),
            Origin::Produced(at) => matches!(
                view.code.instruction(at),
                Some(Instruction::Constant {
                    op: ConstantOp::New | ConstantOp::ANewArray | ConstantOp::MultiANewArray(_),
                    ..
                }) | Some(Instruction::Simple(SimpleOp::NewArray(_)))
            ),
            _ => false,
        })
}

// ── Exceptions ──────────────────────────────────────────────────────

/// Whether the instruction at `offset` may raise an exception, looked at in
/// isolation.
pub fn instruction_may_throw(ctx: &Context<'_>, view: &MethodView<'_>, offset: usize) -> bool {
    let Some(instruction) = view.code.instruction(offset) else {
        return false;
    };
    match instruction {
        Instruction::Simple(op) => match op {
            SimpleOp::ArrayLoad(_)
            | SimpleOp::ArrayStore(_)
            | SimpleOp::ArrayLength
            | SimpleOp::NewArray(_)
            | SimpleOp::Throw
            | SimpleOp::MonitorEnter
            | SimpleOp::MonitorExit => true,
            SimpleOp::Arith(ArithOp::Div | ArithOp::Rem, kind) => kind.is_integral(),
            _ => false,
        },
        Instruction::Variable { .. } | Instruction::Branch { .. } | Instruction::Switch { .. } => {
            false
        }
        Instruction::Constant { op, index } => match op {
            ConstantOp::Ldc | ConstantOp::InstanceOf => false,
            ConstantOp::GetField
            | ConstantOp::PutField
            | ConstantOp::CheckCast
            | ConstantOp::ANewArray
            | ConstantOp::MultiANewArray(_)
            | ConstantOp::InvokeDynamic => true,
            ConstantOp::GetStatic | ConstantOp::PutStatic => {
                member_initialization_has_side_effects(ctx, view, offset)
            }
            ConstantOp::New => view.pool.class_name(*index).map_or(true, |class| {
                ctx.initialization_has_side_effects(view.class, class)
            }),
            ConstantOp::InvokeStatic => {
                member_initialization_has_side_effects(ctx, view, offset)
                    || ctx
                        .callee_summary(*op, view.pool.member_ref(*index))
                        .may_throw
            }
            ConstantOp::InvokeVirtual | ConstantOp::InvokeSpecial | ConstantOp::InvokeInterface => {
                let Some(member) = view.pool.member_ref(*index) else {
                    return true;
                };
                if ctx.callee_summary(*op, Some(member)).may_throw {
                    return true;
                }
                let receiver_depth = MethodDescriptor::parse(&member.descriptor)
                    .map(|d| d.params.len());
                // A null receiver raises NullPointerException.
                receiver_depth.map_or(true, |depth| !is_local_object(view, offset, depth))
            }
        },
    }
}

/// Whether the instruction at `offset` may raise an exception that leaves
/// the method or reaches a handler that can rethrow.
///
/// Unreachable instructions never throw. An exception caught by a catch-all
/// handler whose code runs straight to a return without anything that may
/// throw is absorbed.
pub fn may_throw(ctx: &Context<'_>, view: &MethodView<'_>, offset: usize) -> bool {
    if !view.is_reachable(offset) || !instruction_may_throw(ctx, view, offset) {
        return false;
    }
    !view.code.handlers_covering(offset).any(|handler| {
        catches_everything(view, handler.catch_type) && absorbs(ctx, view, handler.handler)
    })
}

fn catches_everything(view: &MethodView<'_>, catch_type: Option<CpIndex>) -> bool {
    match catch_type {
        None => true,
        Some(index) => view
            .pool
            .class_name(index)
            .is_some_and(|name| name == "java/lang/Throwable"),
    }
}

/// Whether the handler at `start` runs straight to a return without any
/// instruction that may throw.
fn absorbs(ctx: &Context<'_>, view: &MethodView<'_>, start: usize) -> bool {
    for offset in start..view.code.len() {
        let Some(instruction) = view.code.instruction(offset) else {
            return false;
        };
        if instruction_may_throw(ctx, view, offset) {
            return false;
        }
        if instruction.is_return() {
            return true;
        }
        if matches!(instruction, Instruction::Branch { .. } | Instruction::Switch { .. }) {
            return false;
        }
    }
    false
}

// ── Range scans ─────────────────────────────────────────────────────

/// First offset in `range` with a side effect under `options`.
pub fn first_side_effect_in(
    ctx: &Context<'_>,
    view: &MethodView<'_>,
    range: Range<usize>,
    options: SideEffectOptions,
) -> Option<usize> {
    clamp(view, range).find(|&o| may_have_side_effect(ctx, view, o, options))
}

/// Last offset in `range` with a side effect under `options`.
pub fn last_side_effect_in(
    ctx: &Context<'_>,
    view: &MethodView<'_>,
    range: Range<usize>,
    options: SideEffectOptions,
) -> Option<usize> {
    clamp(view, range).rev().find(|&o| may_have_side_effect(ctx, view, o, options))
}

pub fn first_throwing_in(
    ctx: &Context<'_>,
    view: &MethodView<'_>,
    range: Range<usize>,
) -> Option<usize> {
    clamp(view, range).find(|&o| may_throw(ctx, view, o))
}

pub fn last_throwing_in(
    ctx: &Context<'_>,
    view: &MethodView<'_>,
    range: Range<usize>,
) -> Option<usize> {
    clamp(view, range).rev().find(|&o| may_throw(ctx, view, o))
}

fn clamp(view: &MethodView<'_>, range: Range<usize>) -> Range<usize> {
    let end = range.end.min(view.code.len());
    range.start.min(end)..end
}

// ── Variables ───────────────────────────────────────────────────────

fn slot_range(slot: u16, kind: ValueKind) -> Range<u32> {
    let start = u32::from(slot);
    start..start + u32::from(kind.slot_size())
}

/// Whether `instruction` reads local `slot`. A long or double load reads
/// both of its slots.
pub fn reads_variable(instruction: &Instruction, slot: u16) -> bool {
    match instruction {
        Instruction::Variable {
            op: VariableOp::Load(kind),
            slot: s,
        } => slot_range(*s, *kind).contains(&u32::from(slot)),
        Instruction::Variable {
            op: VariableOp::Iinc(_),
            slot: s,
        } => *s == slot,
        _ => false,
    }
}

/// Whether `instruction` writes local `slot`.
pub fn writes_variable(instruction: &Instruction, slot: u16) -> bool {
    match instruction {
        Instruction::Variable {
            op: VariableOp::Store(kind),
            slot: s,
        } => slot_range(*s, *kind).contains(&u32::from(slot)),
        Instruction::Variable {
            op: VariableOp::Iinc(_),
            slot: s,
        } => *s == slot,
        _ => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests panic on unexpected state")]
mod tests;
