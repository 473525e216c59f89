//! Optimization facts per entity.
//!
//! Every record is either `Library` (nothing can be inspected, every answer
//! is the pessimistic one) or `Program` (answers start optimistic and are
//! promoted by evidence). The variant of an entity is decided once, by the
//! setter pass, and never changes.
//!
//! # Monotonicity
//!
//! Program records only move one way: flags are latches, masks only gain
//! bits, lattices only move up, counts only grow. Predicates phrased
//! negatively (`has_no_side_effects`, `can_be_made_private`, `may_be_merged`,
//! `is_simple_enum`) are complements of latches and therefore only move from
//! true to false.

mod class;
mod field;
mod mask;
mod method;
mod store;
mod value;

pub use class::{ClassFacts, ClassFlags, ProgramClassFacts};
pub use field::{FieldFacts, FieldFlags, ProgramFieldFacts};
pub use mask::{InvocationCount, ParameterMask, VariableSet};
pub use method::{MethodFacts, MethodFlags, ProgramMethodFacts};
pub use store::{EntityId, FactStore};
pub use value::{FieldConstant, FieldValue, ReferencedClass};

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests panic on unexpected state")]
mod tests;
