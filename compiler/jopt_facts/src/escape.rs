//! Escape tracing for one method body.
//!
//! Follows every reference the method creates or receives to find out
//! whether it escapes, is modified, is returned, or came from outside.
//!
//! # Algorithm
//!
//! 1. Evaluate the body with [`TracingInvocationUnit`], which tags each
//!    produced reference with its origin offset and lets call results alias
//!    every argument the callee may return.
//! 2. Walk the reachable instructions once. Each instruction marks the
//!    origins of the operands it consumes:
//!    - field stores, array stores, `athrow`, `areturn`, and arguments of
//!      escaping callee parameters mark their value **escaping**;
//!    - field stores, array stores, and arguments of modified callee
//!      parameters mark the target object **modified**;
//!    - `areturn` marks its value **returned**.
//! 3. Instructions that push a value from outside (field and array reads,
//!    `ldc`, `invokedynamic`, calls returning external values) mark their own
//!    offset **external**.
//!
//! Origins that are parameters go into the parameter masks instead of the
//! per-offset arrays. Callee facts are read as they currently stand; the
//! fixed-point driver reruns tracing until they settle.

use jopt_eval::{Evaluation, InvocationUnit, InvokeSite, Origin, PartialEvaluator, Value};
use jopt_ir::{
    ArrayKind, Constant, ConstantOp, FieldType, Instruction, MethodDescriptor, SimpleOp, ValueKind,
};

use crate::context::{Context, MethodView};
use crate::error::AnalysisError;
use crate::info::ParameterMask;

// ── Invocation unit ─────────────────────────────────────────────────

/// Produces call results that alias the arguments the callee may return.
pub struct TracingInvocationUnit<'a> {
    ctx: Context<'a>,
}

impl<'a> TracingInvocationUnit<'a> {
    pub fn new(ctx: Context<'a>) -> Self {
        Self { ctx }
    }
}

impl InvocationUnit for TracingInvocationUnit<'_> {
    fn invocation_result(&self, site: &InvokeSite<'_>, args: &[Value]) -> Value {
        let kind = site
            .descriptor
            .ret
            .as_ref()
            .map_or(ValueKind::Int, FieldType::value_kind);
        let mut result = Value::produced(kind, site.offset);
        if let Value::Reference { origins } = &mut result {
            let summary = self.ctx.callee_summary(site.op, site.member);
            let returned = args
                .iter()
                .enumerate()
                .filter(|(i, _)| summary.returned.contains(*i))
                .filter_map(|(_, arg)| arg.origins());
            for arg_origins in returned {
                origins.union_with(arg_origins);
            }
        }
        result
    }
}

// ── Trace ───────────────────────────────────────────────────────────

/// Escape facts of one method body.
#[derive(Clone, Debug)]
pub struct EscapeTrace {
    marks: Marks,
    returns_external_values: bool,
    evaluation: Evaluation,
}

impl EscapeTrace {
    /// Whether the reference produced at `offset` escapes the method.
    pub fn is_instance_escaping(&self, offset: usize) -> bool {
        flag(&self.marks.escaping, offset)
    }

    /// Whether the reference produced at `offset` is written to after
    /// creation.
    pub fn is_instance_modified(&self, offset: usize) -> bool {
        flag(&self.marks.modified, offset)
    }

    pub fn is_instance_returned(&self, offset: usize) -> bool {
        flag(&self.marks.returned, offset)
    }

    /// Whether the reference pushed at `offset` comes from outside the method.
    pub fn is_instance_external(&self, offset: usize) -> bool {
        flag(&self.marks.external, offset)
    }

    pub fn escaping_parameters(&self) -> ParameterMask {
        self.marks.escaping_parameters
    }

    pub fn modified_parameters(&self) -> ParameterMask {
        self.marks.modified_parameters
    }

    pub fn returned_parameters(&self) -> ParameterMask {
        self.marks.returned_parameters
    }

    /// Whether the method may return a value that it neither created nor
    /// received as a parameter.
    pub fn returns_external_values(&self) -> bool {
        self.returns_external_values
    }

    /// The evaluation the trace was computed from.
    pub fn evaluation(&self) -> &Evaluation {
        &self.evaluation
    }
}

/// Per-offset and per-parameter marks collected by the walk.
#[derive(Clone, Debug)]
struct Marks {
    escaping: Vec<bool>,
    modified: Vec<bool>,
    returned: Vec<bool>,
    external: Vec<bool>,
    escaping_parameters: ParameterMask,
    modified_parameters: ParameterMask,
    returned_parameters: ParameterMask,
    /// Origins of every returned reference.
    returned_origins: Vec<Origin>,
}

impl Marks {
    fn new(len: usize) -> Self {
        Self {
            escaping: vec![false; len],
            modified: vec![false; len],
            returned: vec![false; len],
            external: vec![false; len],
            escaping_parameters: ParameterMask::NONE,
            modified_parameters: ParameterMask::NONE,
            returned_parameters: ParameterMask::NONE,
            returned_origins: Vec::new(),
        }
    }

    fn mark_escaping(&mut self, value: Option<&Value>) {
        for origin in origins(value) {
            match origin {
                Origin::Produced(at) => set(&mut self.escaping, at),
                Origin::Parameter(index) => {
                    self.escaping_parameters.insert(index);
                }
                Origin::CaughtException(_) => {}
            }
        }
    }

    fn mark_modified(&mut self, value: Option<&Value>) {
        for origin in origins(value) {
            match origin {
                Origin::Produced(at) => set(&mut self.modified, at),
                Origin::Parameter(index) => {
                    self.modified_parameters.insert(index);
                }
                Origin::CaughtException(_) => {}
            }
        }
    }

    fn mark_returned(&mut self, value: Option<&Value>) {
        for origin in origins(value) {
            match origin {
                Origin::Produced(at) => {
                    set(&mut self.escaping, at);
                    set(&mut self.returned, at);
                }
                Origin::Parameter(index) => {
                    self.returned_parameters.insert(index);
                }
                Origin::CaughtException(_) => {}
            }
            self.returned_origins.push(origin);
        }
    }
}

fn flag(flags: &[bool], offset: usize) -> bool {
    flags.get(offset).copied().unwrap_or(false)
}

fn set(flags: &mut [bool], offset: usize) {
    if let Some(slot) = flags.get_mut(offset) {
        *slot = true;
    }
}

fn origins(value: Option<&Value>) -> Vec<Origin> {
    value
        .and_then(Value::origins)
        .map(|set| set.iter().collect())
        .unwrap_or_default()
}

// ── Tracer ──────────────────────────────────────────────────────────

/// Computes [`EscapeTrace`]s against the facts in a [`Context`].
pub struct EscapeTracer<'a> {
    ctx: Context<'a>,
}

impl<'a> EscapeTracer<'a> {
    pub fn new(ctx: Context<'a>) -> Self {
        Self { ctx }
    }

    pub fn trace(&self, view: &MethodView<'_>) -> Result<EscapeTrace, AnalysisError> {
        let unit = TracingInvocationUnit::new(self.ctx);
        let evaluator = PartialEvaluator::new(self.ctx.config().evaluator);
        let evaluation = evaluator.evaluate(self.ctx.program(), view.id, &unit)?;

        let mut marks = Marks::new(evaluation.len());
        for offset in evaluation.reachable_offsets() {
            if let Some(instruction) = view.code.instruction(offset) {
                self.visit(view, &evaluation, offset, instruction, &mut marks);
            }
        }

        let returns_external_values = marks.returned_origins.iter().any(|origin| match origin {
            Origin::Produced(at) => flag(&marks.external, *at),
            Origin::CaughtException(_) => true,
            Origin::Parameter(_) => false,
        });
        Ok(EscapeTrace {
            marks,
            returns_external_values,
            evaluation,
        })
    }

    fn visit(
        &self,
        view: &MethodView<'_>,
        evaluation: &Evaluation,
        offset: usize,
        instruction: &Instruction,
        marks: &mut Marks,
    ) {
        let top = |depth: usize| evaluation.stack_top(offset, depth);
        match instruction {
            Instruction::Simple(SimpleOp::ArrayStore(kind)) => {
                if *kind == ArrayKind::Reference {
                    marks.mark_escaping(top(0));
                }
                marks.mark_modified(top(2));
            }
            Instruction::Simple(SimpleOp::ArrayLoad(ArrayKind::Reference)) => {
                set(&mut marks.external, offset);
            }
            Instruction::Simple(SimpleOp::Throw) => marks.mark_escaping(top(0)),
            Instruction::Simple(SimpleOp::Return(Some(ValueKind::Reference))) => {
                marks.mark_returned(top(0));
            }
            Instruction::Constant { op, index } => match op {
                ConstantOp::PutField => {
                    marks.mark_escaping(top(0));
                    marks.mark_modified(top(1));
                }
                ConstantOp::PutStatic => marks.mark_escaping(top(0)),
                ConstantOp::GetField | ConstantOp::GetStatic => {
                    let reference = view
                        .pool
                        .member_ref(*index)
                        .and_then(|m| FieldType::parse(&m.descriptor).ok())
                        .is_some_and(|ty| ty.is_reference());
                    if reference {
                        set(&mut marks.external, offset);
                    }
                }
                ConstantOp::Ldc => {
                    if view.pool.get(*index).is_some_and(Constant::is_reference) {
                        set(&mut marks.external, offset);
                    }
                }
                ConstantOp::InvokeDynamic => {
                    let descriptor = match view.pool.get(*index) {
                        Some(Constant::InvokeDynamic { descriptor, .. }) => {
                            MethodDescriptor::parse(descriptor).ok()
                        }
                        _ => None,
                    };
                    if let Some(descriptor) = descriptor {
                        // Bootstrap results capture their arguments without writing to them.
                        for depth in 0..descriptor.params.len() {
                            marks.mark_escaping(top(depth));
                        }
                        if descriptor.returns_reference() {
                            set(&mut marks.external, offset);
                        }
                    }
                }
                ConstantOp::InvokeVirtual
                | ConstantOp::InvokeSpecial
                | ConstantOp::InvokeStatic
                | ConstantOp::InvokeInterface => {
                    let member = view.pool.member_ref(*index);
                    let Some(descriptor) =
                        member.and_then(|m| MethodDescriptor::parse(&m.descriptor).ok())
                    else {
                        return;
                    };
                    let summary = self.ctx.callee_summary(*op, member);
                    let count =
                        descriptor.params.len() + usize::from(*op != ConstantOp::InvokeStatic);
                    for i in 0..count {
                        let arg = top(count - 1 - i);
                        if summary.escaping.contains(i) {
                            marks.mark_escaping(arg);
                        }
                        if summary.modified.contains(i) {
                            marks.mark_modified(arg);
                        }
                    }
                    if descriptor.returns_reference() && summary.returns_external_values {
                        set(&mut marks.external, offset);
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }
}
