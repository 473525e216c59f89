//! Shared fixtures for fact analysis tests. Only compiled in test builds.

use jopt_ir::{
    ClassBuilder, ClassId, FieldAccess, FieldId, MethodAccess, MethodId, Program, ProgramBuilder,
};

use crate::config::AnalysisConfig;
use crate::context::{Context, Environment, MethodView};
use crate::info::FactStore;

pub(crate) const OBJ: &str = "Ljava/lang/Object;";

/// Build a program on top of the `java/lang` library classes.
pub(crate) fn program(build: impl FnOnce(&mut ProgramBuilder)) -> Program {
    let mut builder = ProgramBuilder::with_java_lang();
    build(&mut builder);
    builder.build().unwrap()
}

/// Add a public `<init>()V` that only calls `Object.<init>`.
pub(crate) fn default_constructor(c: &mut ClassBuilder<'_>) {
    c.method("<init>", "()V", MethodAccess::PUBLIC, |code| {
        code.aload(0)
            .invokespecial("java/lang/Object", "<init>", "()V")
            .return_void();
    });
}

/// A plain class `name` with a default constructor and an `Object` field
/// `f`.
pub(crate) fn holder_class(builder: &mut ProgramBuilder, name: &str) {
    builder.class(name, |c| {
        c.field("f", OBJ, FieldAccess::PUBLIC);
        default_constructor(c);
    });
}

pub(crate) fn method_id(program: &Program, class: &str, name: &str, descriptor: &str) -> MethodId {
    program.method_by_name(class, name, descriptor).unwrap()
}

pub(crate) fn field_id(program: &Program, class: &str, name: &str, descriptor: &str) -> FieldId {
    program.field_by_name(class, name, descriptor).unwrap()
}

pub(crate) fn class_id(program: &Program, name: &str) -> ClassId {
    program.class_by_name(name).unwrap()
}

/// Converged facts under the default configuration.
pub(crate) fn converged(program: &Program) -> FactStore {
    converged_with(program, test_config())
}

pub(crate) fn converged_with(program: &Program, config: AnalysisConfig) -> FactStore {
    crate::analyze(program, config).unwrap()
}

/// Default configuration with monotonicity checks on.
pub(crate) fn test_config() -> AnalysisConfig {
    AnalysisConfig {
        verify_monotonicity: true,
        ..AnalysisConfig::default()
    }
}

/// An environment plus a store, for tests that query classifiers or the
/// tracer directly.
pub(crate) struct Harness<'p> {
    pub env: Environment<'p>,
    pub store: FactStore,
}

impl<'p> Harness<'p> {
    /// Initial facts only; no marker has run.
    pub fn initial(program: &'p Program) -> Self {
        let env = Environment::new(program, test_config()).unwrap();
        let store = crate::setter::initialize(program, &env.hierarchy, &env.config).unwrap();
        Self { env, store }
    }

    /// Facts after convergence.
    pub fn converged(program: &'p Program) -> Self {
        let env = Environment::new(program, test_config()).unwrap();
        let store = converged(program);
        Self { env, store }
    }

    pub fn ctx(&self) -> Context<'_> {
        Context::new(&self.env, &self.store)
    }

    pub fn view(&self, class: &str, name: &str, descriptor: &str) -> MethodView<'_> {
        let id = method_id(self.env.program, class, name, descriptor);
        self.env.view(id).unwrap()
    }
}
