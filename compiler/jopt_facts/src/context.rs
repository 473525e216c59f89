//! Shared analysis state and call-site summaries.
//!
//! [`Environment`] holds everything that stays fixed for a run: the program,
//! its hierarchy, the configuration, and one base evaluation per method
//! body. [`Context`] pairs it with a read-only view of the current facts.

use jopt_eval::{BasicInvocationUnit, Evaluation, PartialEvaluator};
use jopt_ir::{
    ClassHierarchy, ClassId, Code, ConstantOp, ConstantPool, InvokeKind, MemberRef, Method,
    MethodId, Program,
};

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::info::{FactStore, MethodFacts, ParameterMask};

// ── Environment ─────────────────────────────────────────────────────

/// Fixed inputs of one analysis run.
pub struct Environment<'p> {
    pub program: &'p Program,
    pub hierarchy: ClassHierarchy,
    pub config: AnalysisConfig,
    /// Base evaluation per method, `None` for methods without a body.
    evaluations: Vec<Option<Evaluation>>,
}

impl<'p> Environment<'p> {
    /// Build the hierarchy and evaluate every inspectable method body.
    pub fn new(program: &'p Program, config: AnalysisConfig) -> Result<Self, AnalysisError> {
        let hierarchy = ClassHierarchy::new(program);
        let evaluator = PartialEvaluator::new(config.evaluator);
        let mut evaluations = Vec::with_capacity(program.method_count());
        for id in program.method_ids() {
            let evaluation = if program.has_inspectable_body(id) {
                Some(evaluator.evaluate(program, id, &BasicInvocationUnit)?)
            } else {
                None
            };
            evaluations.push(evaluation);
        }
        Ok(Self {
            program,
            hierarchy,
            config,
            evaluations,
        })
    }

    /// The body of `id`, if it is a program method with code.
    pub fn view(&self, id: MethodId) -> Option<MethodView<'_>> {
        if !self.program.has_inspectable_body(id) {
            return None;
        }
        let method = self.program.method(id);
        let code = method.code.as_ref()?;
        Some(MethodView {
            id,
            method,
            class: method.class,
            code,
            pool: &self.program.class(method.class).constant_pool,
            evaluation: self.evaluations.get(id.index()).and_then(Option::as_ref),
        })
    }

    /// Every program method with an inspectable body.
    pub fn views(&self) -> impl Iterator<Item = MethodView<'_>> + '_ {
        self.program.method_ids().filter_map(|id| self.view(id))
    }

    /// Whether the library method `target` is configured as pure.
    fn assumed_pure(&self, target: MethodId) -> bool {
        let method = self.program.method(target);
        let class = &self.program.class(method.class).name;
        self.config
            .assume_no_side_effects
            .contains_member(class, &method.name, &method.descriptor)
    }
}

/// One method body with everything needed to classify its instructions.
#[derive(Clone, Copy)]
pub struct MethodView<'a> {
    pub id: MethodId,
    pub method: &'a Method,
    pub class: ClassId,
    pub code: &'a Code,
    pub pool: &'a ConstantPool,
    /// Base evaluation; call results are fresh values.
    pub evaluation: Option<&'a Evaluation>,
}

impl MethodView<'_> {
    /// The member an instruction at `offset` refers to, with its opcode.
    pub fn member_at(&self, offset: usize) -> Option<(ConstantOp, &MemberRef)> {
        let (op, index) = self.code.instruction(offset)?.constant_operand()?;
        Some((op, self.pool.member_ref(index)?))
    }

    /// Whether `offset` can execute. Without an evaluation, every offset can.
    pub fn is_reachable(&self, offset: usize) -> bool {
        self.evaluation.map_or(true, |e| e.is_reachable(offset))
    }
}

// ── Callee summaries ────────────────────────────────────────────────

/// What a call site may do, joined over every possible target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalleeSummary {
    pub has_side_effects: bool,
    pub has_external_side_effects: bool,
    pub may_throw: bool,
    pub returns_external_values: bool,
    pub escaping: ParameterMask,
    pub modified: ParameterMask,
    pub returned: ParameterMask,
}

impl CalleeSummary {
    /// A call that does nothing observable.
    pub const PURE: Self = Self {
        has_side_effects: false,
        has_external_side_effects: false,
        may_throw: false,
        returns_external_values: false,
        escaping: ParameterMask::NONE,
        modified: ParameterMask::NONE,
        returned: ParameterMask::NONE,
    };

    /// A call about which nothing is known.
    pub const PESSIMISTIC: Self = Self {
        has_side_effects: true,
        has_external_side_effects: true,
        may_throw: true,
        returns_external_values: true,
        escaping: ParameterMask::ALL,
        modified: ParameterMask::ALL,
        returned: ParameterMask::ALL,
    };

    pub fn from_facts(facts: &MethodFacts) -> Self {
        Self {
            has_side_effects: !facts.has_no_side_effects(),
            has_external_side_effects: !facts.has_no_external_side_effects(),
            may_throw: facts.may_throw_exceptions(),
            returns_external_values: facts.returns_external_values(),
            escaping: facts.escaping_parameters(),
            modified: facts.modified_parameters(),
            returned: facts.returned_parameters(),
        }
    }

    fn join(&mut self, other: &CalleeSummary) {
        self.has_side_effects |= other.has_side_effects;
        self.has_external_side_effects |= other.has_external_side_effects;
        self.may_throw |= other.may_throw;
        self.returns_external_values |= other.returns_external_values;
        self.escaping = self.escaping.union(other.escaping);
        self.modified = self.modified.union(other.modified);
        self.returned = self.returned.union(other.returned);
    }
}

// ── Context ─────────────────────────────────────────────────────────

/// The environment together with the facts as they stand.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub env: &'a Environment<'a>,
    pub store: &'a FactStore,
}

impl<'a> Context<'a> {
    pub fn new(env: &'a Environment<'a>, store: &'a FactStore) -> Self {
        Self { env, store }
    }

    #[inline]
    pub fn program(&self) -> &'a Program {
        self.env.program
    }

    #[inline]
    pub fn hierarchy(&self) -> &'a ClassHierarchy {
        &self.env.hierarchy
    }

    #[inline]
    pub fn config(&self) -> &'a AnalysisConfig {
        &self.env.config
    }

    /// Methods a call may execute; `None` when they cannot all be found.
    pub fn call_targets(&self, op: ConstantOp, member: &MemberRef) -> Option<Vec<MethodId>> {
        let kind = InvokeKind::from_op(op)?;
        match self.hierarchy().call_targets(self.program(), kind, member) {
            jopt_ir::CallTargets::Known(targets) => Some(targets.into_vec()),
            jopt_ir::CallTargets::Unknown => None,
        }
    }

    /// Summary of one possible target.
    pub fn target_summary(&self, target: MethodId) -> CalleeSummary {
        if self.program().has_inspectable_body(target) {
            CalleeSummary::from_facts(self.store.method(target))
        } else if self.env.assumed_pure(target) {
            CalleeSummary::PURE
        } else {
            CalleeSummary::PESSIMISTIC
        }
    }

    /// Summary of a call site, joined over every target.
    ///
    /// Virtual calls may reach any override, so the summary is the union
    /// over all of them. Unresolvable calls are pessimistic.
    pub fn callee_summary(&self, op: ConstantOp, member: Option<&MemberRef>) -> CalleeSummary {
        let Some(targets) = member.and_then(|m| self.call_targets(op, m)) else {
            return CalleeSummary::PESSIMISTIC;
        };
        let mut summary = CalleeSummary::PURE;
        for target in targets {
            summary.join(&self.target_summary(target));
        }
        summary
    }

    /// Whether a library class or its superclasses may run side-effecting
    /// initializers.
    fn library_initialization_has_side_effects(&self, class: ClassId) -> bool {
        let program = self.program();
        !self
            .config()
            .assume_no_side_effects
            .contains_class(&program.class(class).name)
    }

    /// Whether initializing `class` (and its superclasses) may have side
    /// effects. Classes the hierarchy cannot fully resolve are assumed to.
    pub fn class_initialization_has_side_effects(&self, class: ClassId) -> bool {
        if self.hierarchy().has_incomplete_supertypes(class) {
            return true;
        }
        std::iter::once(class)
            .chain(self.hierarchy().superclasses(class))
            .any(|c| self.own_initializer_has_side_effects(c))
    }

    /// Whether the initializer declared by `class` itself may have side
    /// effects.
    pub fn own_initializer_has_side_effects(&self, class: ClassId) -> bool {
        let program = self.program();
        if !program.class(class).is_program() {
            return self.library_initialization_has_side_effects(class);
        }
        program
            .class(class)
            .methods
            .iter()
            .copied()
            .find(|&m| program.method(m).is_class_initializer())
            .is_some_and(|clinit| self.target_summary(clinit).has_side_effects)
    }

    /// Whether code in `from` naming `target` may trigger a side-effecting
    /// class initialization. `from` and its superclasses are already
    /// initialized when its code runs.
    pub fn initialization_has_side_effects(&self, from: ClassId, target: &str) -> bool {
        let program = self.program();
        let Some(target) = program.class_by_name(target) else {
            return true;
        };
        if target == from || self.hierarchy().superclasses(from).any(|c| c == target) {
            return false;
        }
        if self.hierarchy().has_incomplete_supertypes(target) {
            return true;
        }
        let initialized: Vec<ClassId> = std::iter::once(from)
            .chain(self.hierarchy().superclasses(from))
            .collect();
        std::iter::once(target)
            .chain(self.hierarchy().superclasses(target))
            .take_while(|c| !initialized.contains(c))
            .any(|c| {
                if program.class(c).is_program() {
                    self.store.class(c).has_side_effects()
                } else {
                    self.library_initialization_has_side_effects(c)
                }
            })
    }
}
