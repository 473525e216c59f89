//! Worklist abstract interpretation of a single method body.
//!
//! # Algorithm
//!
//! 1. Seed offset 0 with the entry frame: each parameter in its slot,
//!    references tagged [`Origin::Parameter`], everything else unset.
//! 2. Pop an offset, apply the instruction's transfer function to the frame
//!    before it, and merge the result into every normal successor.
//! 3. Every exception handler covering the offset receives the locals in
//!    effect before the instruction, with the caught exception as the only
//!    stack entry.
//! 4. Successors whose frame grew go back on the worklist.
//!
//! Values form a finite-height lattice (origins are drawn from a finite set,
//! constants only degrade to unknown), so the worklist drains.

use jopt_ir::{
    BranchOp, Code, Constant, ConstantOp, ConstantPool, CpIndex, FieldType, Instruction,
    MemberRef, MethodDescriptor, MethodId, Program, SimpleOp, StackOp, ValueKind, VariableOp,
};

use crate::error::EvalError;
use crate::frame::Frame;
use crate::value::{Origin, PrimitiveConstant, Value};

// ── Invocation units ────────────────────────────────────────────────

/// A call site as seen by an [`InvocationUnit`].
#[derive(Clone, Copy, Debug)]
pub struct InvokeSite<'a> {
    /// The method being evaluated.
    pub caller: MethodId,
    pub offset: usize,
    pub op: ConstantOp,
    /// The referenced method; `None` for `invokedynamic`.
    pub member: Option<&'a MemberRef>,
    pub descriptor: &'a MethodDescriptor,
}

/// Decides what a call pushes.
///
/// Analyses that know something about callees (for example which
/// parameters a callee returns) plug in here.
pub trait InvocationUnit {
    /// The value a non-void call leaves on the stack. `args` lists the
    /// arguments in declaration order, receiver first.
    fn invocation_result(&self, site: &InvokeSite<'_>, args: &[Value]) -> Value;
}

/// Treats every call result as a fresh value produced by the call.
#[derive(Clone, Copy, Debug, Default)]
pub struct BasicInvocationUnit;

impl InvocationUnit for BasicInvocationUnit {
    fn invocation_result(&self, site: &InvokeSite<'_>, _args: &[Value]) -> Value {
        let kind = site
            .descriptor
            .ret
            .as_ref()
            .map_or(ValueKind::Int, FieldType::value_kind);
        Value::produced(kind, site.offset)
    }
}

// ── Results ─────────────────────────────────────────────────────────

/// Per-offset frames of one evaluated method.
#[derive(Clone, Debug)]
pub struct Evaluation {
    before: Vec<Option<Frame>>,
    depth_after: Vec<Option<usize>>,
}

impl Evaluation {
    /// Number of instructions in the evaluated body.
    #[inline]
    pub fn len(&self) -> usize {
        self.before.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.before.is_empty()
    }

    /// Whether any path from the method entry reaches `offset`.
    #[inline]
    pub fn is_reachable(&self, offset: usize) -> bool {
        matches!(self.before.get(offset), Some(Some(_)))
    }

    pub fn reachable_offsets(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.before.len()).filter(|&o| self.is_reachable(o))
    }

    /// Locals and stack before the instruction at `offset` executes.
    pub fn frame_before(&self, offset: usize) -> Option<&Frame> {
        self.before.get(offset)?.as_ref()
    }

    /// Stack height in slots before `offset`.
    pub fn stack_depth_before(&self, offset: usize) -> Option<usize> {
        self.frame_before(offset).map(Frame::stack_depth)
    }

    /// Stack height in slots after `offset` completes normally.
    pub fn stack_depth_after(&self, offset: usize) -> Option<usize> {
        self.depth_after.get(offset).copied().flatten()
    }

    /// The stack entry `depth` values below the top before `offset`.
    pub fn stack_top(&self, offset: usize, depth: usize) -> Option<&Value> {
        self.frame_before(offset)?.peek(depth)
    }
}

// ── Evaluator ───────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug)]
pub struct EvaluatorConfig {
    /// Follow exception edges into handlers. When off, handler code is only
    /// reachable if normal flow reaches it.
    pub evaluate_exception_handlers: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            evaluate_exception_handlers: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PartialEvaluator {
    config: EvaluatorConfig,
}

impl PartialEvaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    /// Evaluate the body of `method`.
    pub fn evaluate<U: InvocationUnit + ?Sized>(
        &self,
        program: &Program,
        method: MethodId,
        unit: &U,
    ) -> Result<Evaluation, EvalError> {
        let m = program.method(method);
        let Some(code) = m.code.as_ref() else {
            return Err(EvalError::NoBody {
                method: program.method_display(method),
            });
        };
        let ctx = Context {
            program,
            method,
            pool: &program.class(m.class).constant_pool,
            unit,
        };

        let n = code.len();
        let mut before: Vec<Option<Frame>> = vec![None; n];
        let mut depth_after = vec![None; n];
        if n == 0 {
            return Ok(Evaluation {
                before,
                depth_after,
            });
        }

        let locals = usize::from(code.max_locals.max(m.parameter_slots()));
        let mut entry = Frame::new(locals);
        for param in m.parameters() {
            let value = match param.kind {
                ValueKind::Reference => Value::reference(Origin::Parameter(param.index)),
                kind => Value::unknown(kind),
            };
            entry.set_local(param.slot, value);
        }
        before[0] = Some(entry);

        let mut worklist = vec![0usize];
        let mut queued = vec![false; n];
        queued[0] = true;
        let mut visits = 0usize;

        while let Some(offset) = worklist.pop() {
            queued[offset] = false;
            visits += 1;
            let Some(frame) = before[offset].clone() else {
                continue;
            };
            let instruction = &code.instructions[offset];

            if self.config.evaluate_exception_handlers {
                for handler in code.handlers_covering(offset) {
                    let caught = Value::reference(Origin::CaughtException(handler.handler));
                    let entry = frame.with_single_stack_entry(caught);
                    ctx.propagate(
                        offset,
                        handler.handler,
                        entry,
                        &mut before,
                        &mut worklist,
                        &mut queued,
                    )?;
                }
            }

            let mut after = frame;
            ctx.execute(offset, instruction, &mut after)?;
            depth_after[offset] = Some(after.stack_depth());

            for succ in instruction.successors(offset) {
                ctx.propagate(
                    offset,
                    succ,
                    after.clone(),
                    &mut before,
                    &mut worklist,
                    &mut queued,
                )?;
            }
        }

        tracing::trace!(
            method = %program.method_display(method),
            instructions = n,
            visits,
            "evaluated method body"
        );

        check_handlers(code, &ctx)?;
        Ok(Evaluation {
            before,
            depth_after,
        })
    }
}

/// Reject handler entries pointing outside the code even when unreachable.
fn check_handlers<U: ?Sized>(code: &Code, ctx: &Context<'_, U>) -> Result<(), EvalError> {
    for handler in &code.exception_table {
        if handler.handler >= code.len() || handler.end > code.len() {
            return Err(EvalError::TargetOutOfRange {
                method: ctx.name(),
                offset: handler.start,
                target: handler.handler.max(handler.end),
            });
        }
    }
    Ok(())
}

// ── Transfer functions ──────────────────────────────────────────────

struct Context<'a, U: ?Sized> {
    program: &'a Program,
    method: MethodId,
    pool: &'a ConstantPool,
    unit: &'a U,
}

impl<U: InvocationUnit + ?Sized> Context<'_, U> {
    fn propagate(
        &self,
        from: usize,
        target: usize,
        frame: Frame,
        before: &mut [Option<Frame>],
        worklist: &mut Vec<usize>,
        queued: &mut [bool],
    ) -> Result<(), EvalError> {
        let Some(slot) = before.get_mut(target) else {
            return Err(EvalError::TargetOutOfRange {
                method: self.name(),
                offset: from,
                target,
            });
        };
        let changed = match slot {
            None => {
                *slot = Some(frame);
                true
            }
            Some(existing) => existing.merge(&frame).map_err(|(left, right)| {
                EvalError::StackMismatch {
                    method: self.name(),
                    offset: target,
                    left,
                    right,
                }
            })?,
        };
        if changed && !queued[target] {
            queued[target] = true;
            worklist.push(target);
        }
        Ok(())
    }

    fn execute(
        &self,
        offset: usize,
        instruction: &Instruction,
        frame: &mut Frame,
    ) -> Result<(), EvalError> {
        match instruction {
            Instruction::Simple(op) => self.simple(offset, *op, frame),
            Instruction::Variable { op, slot } => self.variable(offset, *op, *slot, frame),
            Instruction::Constant { op, index } => self.constant(offset, *op, *index, frame),
            Instruction::Branch { op, .. } => {
                let operands = match op {
                    BranchOp::Goto => 0,
                    BranchOp::If(_) | BranchOp::IfNull | BranchOp::IfNonNull => 1,
                    BranchOp::IfICmp(_) | BranchOp::IfACmpEq | BranchOp::IfACmpNe => 2,
                };
                self.pop_n(offset, frame, operands)?;
                Ok(())
            }
            Instruction::Switch { .. } => {
                self.pop(offset, frame)?;
                Ok(())
            }
        }
    }

    fn simple(&self, offset: usize, op: SimpleOp, frame: &mut Frame) -> Result<(), EvalError> {
        match op {
            SimpleOp::Nop | SimpleOp::Return(None) => {}
            SimpleOp::PushNull => frame.push(Value::null()),
            SimpleOp::PushInt(v) => frame.push(Value::constant(PrimitiveConstant::Int(v))),
            SimpleOp::PushLong(v) => frame.push(Value::constant(PrimitiveConstant::Long(v))),
            SimpleOp::PushFloat(v) => frame.push(Value::constant(PrimitiveConstant::Float(v))),
            SimpleOp::PushDouble(v) => frame.push(Value::constant(PrimitiveConstant::Double(v))),
            SimpleOp::ArrayLoad(kind) => {
                self.pop_n(offset, frame, 2)?;
                frame.push(Value::produced(kind.element_kind(), offset));
            }
            SimpleOp::ArrayStore(_) => {
                self.pop_n(offset, frame, 3)?;
            }
            SimpleOp::Stack(op) => self.stack(offset, op, frame)?,
            SimpleOp::Arith(_, kind) => {
                self.pop_n(offset, frame, 2)?;
                frame.push(Value::unknown(kind.value_kind()));
            }
            SimpleOp::Neg(kind) => {
                self.pop(offset, frame)?;
                frame.push(Value::unknown(kind.value_kind()));
            }
            SimpleOp::Convert { to, .. } => {
                self.pop(offset, frame)?;
                frame.push(Value::unknown(to.value_kind()));
            }
            SimpleOp::Compare(_) => {
                self.pop_n(offset, frame, 2)?;
                frame.push(Value::unknown(ValueKind::Int));
            }
            SimpleOp::Return(Some(_))
            | SimpleOp::Throw
            | SimpleOp::MonitorEnter
            | SimpleOp::MonitorExit => {
                self.pop(offset, frame)?;
            }
            SimpleOp::ArrayLength => {
                self.pop(offset, frame)?;
                frame.push(Value::unknown(ValueKind::Int));
            }
            SimpleOp::NewArray(_) => {
                self.pop(offset, frame)?;
                frame.push(Value::reference(Origin::Produced(offset)));
            }
        }
        Ok(())
    }

    fn stack(&self, offset: usize, op: StackOp, frame: &mut Frame) -> Result<(), EvalError> {
        match op {
            StackOp::Pop => {
                self.pop(offset, frame)?;
            }
            StackOp::Pop2 => {
                if !self.pop(offset, frame)?.is_category2() {
                    self.pop(offset, frame)?;
                }
            }
            StackOp::Dup => {
                let top = self.pop(offset, frame)?;
                frame.push(top.clone());
                frame.push(top);
            }
            StackOp::DupX1 => {
                let v1 = self.pop(offset, frame)?;
                let v2 = self.pop(offset, frame)?;
                push_all(frame, [v1.clone(), v2, v1]);
            }
            StackOp::DupX2 => {
                let v1 = self.pop(offset, frame)?;
                let v2 = self.pop(offset, frame)?;
                if v2.is_category2() {
                    push_all(frame, [v1.clone(), v2, v1]);
                } else {
                    let v3 = self.pop(offset, frame)?;
                    push_all(frame, [v1.clone(), v3, v2, v1]);
                }
            }
            StackOp::Dup2 => {
                let v1 = self.pop(offset, frame)?;
                if v1.is_category2() {
                    push_all(frame, [v1.clone(), v1]);
                } else {
                    let v2 = self.pop(offset, frame)?;
                    push_all(frame, [v2.clone(), v1.clone(), v2, v1]);
                }
            }
            StackOp::Dup2X1 => {
                let v1 = self.pop(offset, frame)?;
                let v2 = self.pop(offset, frame)?;
                if v1.is_category2() {
                    push_all(frame, [v1.clone(), v2, v1]);
                } else {
                    let v3 = self.pop(offset, frame)?;
                    push_all(frame, [v2.clone(), v1.clone(), v3, v2, v1]);
                }
            }
            StackOp::Dup2X2 => {
                let v1 = self.pop(offset, frame)?;
                let v2 = self.pop(offset, frame)?;
                match (v1.is_category2(), v2.is_category2()) {
                    (true, true) => push_all(frame, [v1.clone(), v2, v1]),
                    (true, false) => {
                        let v3 = self.pop(offset, frame)?;
                        push_all(frame, [v1.clone(), v3, v2, v1]);
                    }
                    (false, _) => {
                        let v3 = self.pop(offset, frame)?;
                        if v3.is_category2() {
                            push_all(frame, [v2.clone(), v1.clone(), v3, v2, v1]);
                        } else {
                            let v4 = self.pop(offset, frame)?;
                            push_all(frame, [v2.clone(), v1.clone(), v4, v3, v2, v1]);
                        }
                    }
                }
            }
            StackOp::Swap => {
                let v1 = self.pop(offset, frame)?;
                let v2 = self.pop(offset, frame)?;
                push_all(frame, [v1, v2]);
            }
        }
        Ok(())
    }

    fn variable(
        &self,
        offset: usize,
        op: VariableOp,
        slot: u16,
        frame: &mut Frame,
    ) -> Result<(), EvalError> {
        match op {
            VariableOp::Load(kind) => {
                let local = frame
                    .local(slot)
                    .ok_or_else(|| self.invalid_slot(offset, slot))?;
                let value = if kind_matches(local, kind) {
                    local.clone()
                } else {
                    Value::unknown(kind)
                };
                frame.push(value);
            }
            VariableOp::Store(_) => {
                let value = self.pop(offset, frame)?;
                if !frame.set_local(slot, value) {
                    return Err(self.invalid_slot(offset, slot));
                }
            }
            VariableOp::Iinc(delta) => {
                let value = match frame.local(slot) {
                    Some(Value::Primitive {
                        constant: Some(PrimitiveConstant::Int(c)),
                        ..
                    }) => Value::constant(PrimitiveConstant::Int(c.wrapping_add(i32::from(delta)))),
                    Some(_) => Value::unknown(ValueKind::Int),
                    None => return Err(self.invalid_slot(offset, slot)),
                };
                frame.set_local(slot, value);
            }
        }
        Ok(())
    }

    fn constant(
        &self,
        offset: usize,
        op: ConstantOp,
        index: CpIndex,
        frame: &mut Frame,
    ) -> Result<(), EvalError> {
        match op {
            ConstantOp::Ldc => {
                let value = match self.pool.get(index) {
                    Some(Constant::Integer(v)) => Value::constant(PrimitiveConstant::Int(*v)),
                    Some(Constant::Long(v)) => Value::constant(PrimitiveConstant::Long(*v)),
                    Some(Constant::Float(v)) => Value::constant(PrimitiveConstant::Float(*v)),
                    Some(Constant::Double(v)) => Value::constant(PrimitiveConstant::Double(*v)),
                    Some(c) if c.is_reference() => Value::reference(Origin::Produced(offset)),
                    _ => return Err(self.bad_constant(offset, index)),
                };
                frame.push(value);
            }
            ConstantOp::GetStatic | ConstantOp::GetField => {
                let ty = self.field_type(offset, index)?;
                if op == ConstantOp::GetField {
                    self.pop(offset, frame)?;
                }
                frame.push(Value::produced(ty.value_kind(), offset));
            }
            ConstantOp::PutStatic => {
                self.field_type(offset, index)?;
                self.pop(offset, frame)?;
            }
            ConstantOp::PutField => {
                self.field_type(offset, index)?;
                self.pop_n(offset, frame, 2)?;
            }
            ConstantOp::InvokeVirtual
            | ConstantOp::InvokeSpecial
            | ConstantOp::InvokeStatic
            | ConstantOp::InvokeInterface => {
                let member = self
                    .pool
                    .member_ref(index)
                    .ok_or_else(|| self.bad_constant(offset, index))?;
                let descriptor = MethodDescriptor::parse(&member.descriptor)?;
                let receiver = usize::from(op != ConstantOp::InvokeStatic);
                self.invoke(offset, op, Some(member), &descriptor, receiver, frame)?;
            }
            ConstantOp::InvokeDynamic => {
                let Some(Constant::InvokeDynamic { descriptor, .. }) = self.pool.get(index) else {
                    return Err(self.bad_constant(offset, index));
                };
                let descriptor = MethodDescriptor::parse(descriptor)?;
                self.invoke(offset, op, None, &descriptor, 0, frame)?;
            }
            ConstantOp::New => {
                self.class_operand(offset, index)?;
                frame.push(Value::reference(Origin::Produced(offset)));
            }
            ConstantOp::ANewArray => {
                self.class_operand(offset, index)?;
                self.pop(offset, frame)?;
                frame.push(Value::reference(Origin::Produced(offset)));
            }
            ConstantOp::MultiANewArray(dimensions) => {
                self.class_operand(offset, index)?;
                self.pop_n(offset, frame, usize::from(dimensions))?;
                frame.push(Value::reference(Origin::Produced(offset)));
            }
            ConstantOp::CheckCast => {
                self.class_operand(offset, index)?;
                let value = self.pop(offset, frame)?;
                frame.push(value);
            }
            ConstantOp::InstanceOf => {
                self.class_operand(offset, index)?;
                self.pop(offset, frame)?;
                frame.push(Value::unknown(ValueKind::Int));
            }
        }
        Ok(())
    }

    fn invoke(
        &self,
        offset: usize,
        op: ConstantOp,
        member: Option<&MemberRef>,
        descriptor: &MethodDescriptor,
        receiver: usize,
        frame: &mut Frame,
    ) -> Result<(), EvalError> {
        let count = descriptor.params.len() + receiver;
        let mut args = self.pop_n(offset, frame, count)?;
        args.reverse();
        if descriptor.ret.is_some() {
            let site = InvokeSite {
                caller: self.method,
                offset,
                op,
                member,
                descriptor,
            };
            frame.push(self.unit.invocation_result(&site, &args));
        }
        Ok(())
    }

    // ── Operand helpers ─────────────────────────────────────────────

    fn pop(&self, offset: usize, frame: &mut Frame) -> Result<Value, EvalError> {
        frame.pop().ok_or_else(|| EvalError::StackUnderflow {
            method: self.name(),
            offset,
        })
    }

    /// Pop `count` values, top first.
    fn pop_n(
        &self,
        offset: usize,
        frame: &mut Frame,
        count: usize,
    ) -> Result<Vec<Value>, EvalError> {
        (0..count).map(|_| self.pop(offset, frame)).collect()
    }

    fn field_type(&self, offset: usize, index: CpIndex) -> Result<FieldType, EvalError> {
        let member = match self.pool.get(index) {
            Some(Constant::FieldRef(member)) => member,
            _ => return Err(self.bad_constant(offset, index)),
        };
        Ok(FieldType::parse(&member.descriptor)?)
    }

    fn class_operand(&self, offset: usize, index: CpIndex) -> Result<(), EvalError> {
        match self.pool.class_name(index) {
            Some(_) => Ok(()),
            None => Err(self.bad_constant(offset, index)),
        }
    }

    fn bad_constant(&self, offset: usize, index: CpIndex) -> EvalError {
        EvalError::BadConstant {
            method: self.name(),
            offset,
            index: index.raw(),
        }
    }

    fn invalid_slot(&self, offset: usize, slot: u16) -> EvalError {
        EvalError::InvalidSlot {
            method: self.name(),
            offset,
            slot,
        }
    }
}

impl<U: ?Sized> Context<'_, U> {
    fn name(&self) -> String {
        self.program.method_display(self.method)
    }
}

fn kind_matches(value: &Value, kind: ValueKind) -> bool {
    match value {
        Value::Reference { .. } => kind == ValueKind::Reference,
        Value::Primitive { kind: k, .. } => *k == kind,
        Value::Top => false,
    }
}

fn push_all<const N: usize>(frame: &mut Frame, values: [Value; N]) {
    for value in values {
        frame.push(value);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests panic on unexpected state")]
mod tests;
