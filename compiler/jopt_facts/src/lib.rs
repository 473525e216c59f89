//! Whole-program optimization facts for the jopt bytecode optimizer.
//!
//! Computes, for every class, method, and field, the facts optimization
//! passes need to justify a transformation: side effects, escaping and
//! modified parameters, parameter usage, invocation counts, access levels,
//! and propagated field values.
//!
//! - **Fact store** ([`FactStore`]): one record per entity. Program records
//!   start optimistic and are only ever promoted; library records answer
//!   every query pessimistically.
//!
//! - **Classifiers** ([`classify`]): per-instruction side-effect, may-throw,
//!   and variable access predicates over the current facts.
//!
//! - **Escape tracing** ([`EscapeTracer`]): follows references through a
//!   partial evaluation of one method body.
//!
//! - **Markers** ([`markers`]): single-purpose passes that promote facts.
//!
//! - **Driver** ([`FixedPointDriver`]): reruns the markers until nothing
//!   changes.
//!
//! # Usage
//!
//! ```ignore
//! let store = jopt_facts::analyze(&program, AnalysisConfig::default())?;
//! if store.method(id).has_no_side_effects() { /* remove the call */ }
//! ```
//!
//! Facts are only meaningful once the driver has converged; [`analyze`]
//! returns them only then.
//!
//! # Crate Dependencies
//!
//! `jopt_ir` for the program model and class hierarchy, `jopt_eval` for the
//! partial evaluator the escape tracer and classifiers read stack values
//! from.

pub mod classify;
mod config;
mod context;
mod driver;
mod error;
mod escape;
mod info;
pub mod markers;
mod setter;

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests panic on unexpected state")]
mod test_helpers;

use std::sync::Once;

use jopt_ir::Program;

pub use config::{AnalysisConfig, MemberSet, SideEffectOptions};
pub use context::{CalleeSummary, Context, Environment, MethodView};
pub use driver::{DriverState, FixedPointDriver};
pub use error::AnalysisError;
pub use escape::{EscapeTrace, EscapeTracer, TracingInvocationUnit};
pub use info::{
    ClassFacts, ClassFlags, EntityId, FactStore, FieldConstant, FieldFacts, FieldFlags,
    FieldValue, InvocationCount, MethodFacts, MethodFlags, ParameterMask, ProgramClassFacts,
    ProgramFieldFacts, ProgramMethodFacts, ReferencedClass, VariableSet,
};
pub use markers::{Change, FactMarker};
pub use setter::initialize;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing from `RUST_LOG`.
///
/// Does nothing when `RUST_LOG` is unset, so analyses embedded in other
/// tools stay silent by default. Safe to call more than once.
///
/// ```bash
/// RUST_LOG=jopt_facts=debug          # iterations and promoted masks
/// RUST_LOG=jopt_facts::driver=trace  # every marker run
/// ```
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

/// Compute converged facts for every entity of `program`.
pub fn analyze(program: &Program, config: AnalysisConfig) -> Result<FactStore, AnalysisError> {
    let mut driver = FixedPointDriver::new(program, config)?;
    let mut store = driver.initial_store()?;
    driver.run(&mut store)?;
    Ok(store)
}
