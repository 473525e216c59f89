//! Evaluation errors.
//!
//! Each variant is a contract violation: the method body is not well formed
//! bytecode. Upstream verification is expected to rule these out.

use jopt_ir::ProgramError;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    /// The method has no code to evaluate.
    #[error("`{method}` has no body")]
    NoBody { method: String },

    #[error("operand stack underflow at {method}+{offset}")]
    StackUnderflow { method: String, offset: usize },

    /// Two paths reach an instruction with different stack heights.
    #[error("inconsistent stack height at {method}+{offset}: {left} vs {right}")]
    StackMismatch {
        method: String,
        offset: usize,
        left: usize,
        right: usize,
    },

    #[error("local variable {slot} out of range at {method}+{offset}")]
    InvalidSlot {
        method: String,
        offset: usize,
        slot: u16,
    },

    /// A branch, switch, handler, or fall-through leaves the code array.
    #[error("control transfer from {method}+{offset} to {target} leaves the code")]
    TargetOutOfRange {
        method: String,
        offset: usize,
        target: usize,
    },

    /// A constant pool operand is missing or of the wrong kind.
    #[error("bad constant pool operand #{index} at {method}+{offset}")]
    BadConstant {
        method: String,
        offset: usize,
        index: u16,
    },

    #[error(transparent)]
    Descriptor(#[from] ProgramError),
}
