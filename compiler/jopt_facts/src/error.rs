//! Analysis errors.
//!
//! Nothing here is a recoverable analysis outcome: unknown code resolves to
//! pessimistic facts, never to an error. These variants report malformed
//! input or a broken marker, and abort the run.

use jopt_eval::EvalError;
use jopt_ir::ProgramError;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error(transparent)]
    Program(#[from] ProgramError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    /// The driver hit its iteration cap. Facts are monotone, so this means a
    /// marker keeps reporting changes it did not make.
    #[error("fact analysis did not converge within {iterations} iterations")]
    NoConvergence { iterations: usize },

    /// A marker lowered a fact that was already promoted.
    #[error("marker `{marker}` demoted facts of {entity}")]
    Demoted { marker: &'static str, entity: String },

    /// A marker changed facts but reported no change.
    #[error("marker `{marker}` changed facts without reporting it")]
    UnreportedChange { marker: &'static str },

    /// Facts for an entity were installed twice.
    #[error("facts for {entity} are already initialized")]
    AlreadyInitialized { entity: String },

    /// A keep or assumption pattern could not be parsed.
    #[error("invalid member pattern `{pattern}`: {reason}")]
    BadPattern {
        pattern: String,
        reason: &'static str,
    },
}
