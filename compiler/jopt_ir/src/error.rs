//! Errors raised while assembling a [`Program`](crate::Program).
//!
//! Everything here is a structural defect of the input. Analyses assume a
//! program that built successfully is well formed.

use thiserror::Error;

/// Structural error in a program under construction.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProgramError {
    /// A field or method descriptor does not follow the descriptor grammar.
    #[error("malformed descriptor `{descriptor}`: {reason}")]
    MalformedDescriptor {
        descriptor: String,
        reason: &'static str,
    },

    /// Two classes share a name.
    #[error("class `{0}` is defined more than once")]
    DuplicateClass(String),

    /// Two members of one class share a name and descriptor.
    #[error("member `{name}{descriptor}` is declared twice in `{class}`")]
    DuplicateMember {
        class: String,
        name: String,
        descriptor: String,
    },

    /// A branch or handler refers to a label that was never bound.
    #[error("unbound label {label} in `{class}.{method}`")]
    UnboundLabel {
        class: String,
        method: String,
        label: usize,
    },

    /// A branch, switch, or handler offset lies outside the code array.
    #[error("offset {offset} is outside `{class}.{method}` ({len} instructions)")]
    OffsetOutOfRange {
        class: String,
        method: String,
        offset: usize,
        len: usize,
    },

    /// A method with code was declared in a library class, or abstract/native
    /// with a body.
    #[error("method `{class}.{method}` {reason}")]
    InvalidBody {
        class: String,
        method: String,
        reason: &'static str,
    },
}
