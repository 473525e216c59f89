//! Fact markers: single-purpose passes that promote facts.
//!
//! Each marker reads the program, the instruction classifiers, and the
//! current facts, and promotes what it finds. Markers never lower a fact,
//! and rerunning one on facts it already promoted reports no change.
//!
//! [`default_markers`] lists the markers of one driver iteration in order.
//! Later markers read what earlier ones promoted in the same iteration;
//! anything they miss is picked up in the next.

mod access;
mod class_usage;
mod escape;
mod exception;
mod field;
mod invocation;
mod side_effect;
mod simple_enum;
mod structure;
mod usage;

use std::ops::{BitOr, BitOrAssign};

use jopt_ir::{ClassId, Program};

use crate::context::Environment;
use crate::error::AnalysisError;
use crate::info::FactStore;

pub use access::AccessMarker;
pub use class_usage::ClassUsageMarker;
pub use escape::EscapeMarker;
pub use exception::ExceptionMarker;
pub use field::FieldMarker;
pub use invocation::InvocationCounter;
pub use side_effect::{ClassSideEffectMarker, MethodSideEffectMarker};
pub use simple_enum::SimpleEnumMarker;
pub use structure::StructureMarker;
pub use usage::UsageMarker;

/// Whether a marker promoted anything.
#[must_use]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Change {
    #[default]
    Unchanged,
    Changed,
}

impl Change {
    #[inline]
    pub fn is_changed(self) -> bool {
        self == Change::Changed
    }
}

impl From<bool> for Change {
    #[inline]
    fn from(changed: bool) -> Self {
        if changed {
            Change::Changed
        } else {
            Change::Unchanged
        }
    }
}

impl BitOr for Change {
    type Output = Change;

    #[inline]
    fn bitor(self, rhs: Change) -> Change {
        Change::from(self.is_changed() || rhs.is_changed())
    }
}

impl BitOrAssign for Change {
    #[inline]
    fn bitor_assign(&mut self, rhs: Change) {
        *self = *self | rhs;
    }
}

impl BitOrAssign<bool> for Change {
    #[inline]
    fn bitor_assign(&mut self, rhs: bool) {
        *self = *self | Change::from(rhs);
    }
}

/// A pass that promotes one family of facts.
pub trait FactMarker {
    /// Short name for logs and errors.
    fn name(&self) -> &'static str;

    /// Run over the whole program, promoting facts in `store`.
    fn mark(&self, env: &Environment<'_>, store: &mut FactStore) -> Result<Change, AnalysisError>;
}

/// The markers of one driver iteration, in order.
pub fn default_markers() -> Vec<Box<dyn FactMarker>> {
    vec![
        Box::new(StructureMarker),
        Box::new(ClassUsageMarker),
        Box::new(FieldMarker),
        Box::new(AccessMarker),
        Box::new(InvocationCounter),
        Box::new(ClassSideEffectMarker),
        Box::new(MethodSideEffectMarker),
        Box::new(ExceptionMarker),
        Box::new(EscapeMarker),
        Box::new(UsageMarker),
        Box::new(SimpleEnumMarker),
    ]
}

/// The class a class constant names; arrays name their element class.
fn class_named(program: &Program, name: &str) -> Option<ClassId> {
    let element = name.trim_start_matches('[');
    if element.len() == name.len() {
        return program.class_by_name(name);
    }
    let class = element.strip_prefix('L')?.strip_suffix(';')?;
    program.class_by_name(class)
}
