//! Partial evaluator for the jopt bytecode optimizer.
//!
//! Symbolically executes one method body at a time and records, for every
//! reachable instruction, the abstract operand stack and local variables in
//! effect before it executes.
//!
//! - **Values** ([`Value`]): primitives with an optional known constant, and
//!   references tagged with the set of [`Origin`]s they may come from.
//!
//! - **Frames** ([`Frame`]): locals plus operand stack; long and double
//!   values are one stack entry but two slots.
//!
//! - **Evaluator** ([`PartialEvaluator`]): worklist fixed point over
//!   instruction offsets, including exception handler edges. What a call
//!   pushes is decided by a pluggable [`InvocationUnit`].
//!
//! # Crate Dependencies
//!
//! `jopt_eval` depends on `jopt_ir` for the program model only. It knows
//! nothing about optimization facts; analyses inject what they know about
//! callees through [`InvocationUnit`].

mod error;
mod evaluator;
mod frame;
mod value;

pub use error::EvalError;
pub use evaluator::{
    BasicInvocationUnit, Evaluation, EvaluatorConfig, InvocationUnit, InvokeSite,
    PartialEvaluator,
};
pub use frame::Frame;
pub use value::{Origin, OriginSet, PrimitiveConstant, Value};
