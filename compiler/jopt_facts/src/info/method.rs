//! Method facts.

use bitflags::bitflags;

use super::mask::{InvocationCount, ParameterMask, VariableSet};

bitflags! {
    /// Promotable method facts. Every flag is a latch.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    #[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
    pub struct MethodFlags: u32 {
        const KEPT = 1 << 0;
        const CATCHES_EXCEPTIONS = 1 << 1;
        const BRANCHES_BACKWARD = 1 << 2;
        const INVOKES_DYNAMICALLY = 1 << 3;
        const ASSIGNS_FINAL_FIELD = 1 << 4;
        const RETURNS_WITH_NON_EMPTY_STACK = 1 << 5;
        const HAS_SYNCHRONIZED_BLOCK = 1 << 6;
        /// Calls a superclass implementation through `invokespecial`.
        const INVOKES_SUPER = 1 << 7;
        /// Something outside the declaring class needs to see the method.
        const CANNOT_BE_MADE_PRIVATE = 1 << 8;
        const ACCESSES_PRIVATE_CODE = 1 << 9;
        const ACCESSES_PACKAGE_CODE = 1 << 10;
        const ACCESSES_PROTECTED_CODE = 1 << 11;
        const HAS_SIDE_EFFECTS = 1 << 12;
        /// Side effects on state not created by the method itself (its receiver
        /// excepted).
        const HAS_EXTERNAL_SIDE_EFFECTS = 1 << 13;
        const RETURNS_EXTERNAL_VALUES = 1 << 14;
        const MAY_THROW_EXCEPTIONS = 1 << 15;
    }
}

/// Facts of a program method with an inspectable body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct ProgramMethodFacts {
    pub(crate) flags: MethodFlags,
    pub(crate) invocation_count: InvocationCount,
    pub(crate) escaping_parameters: ParameterMask,
    pub(crate) modified_parameters: ParameterMask,
    pub(crate) used_parameters: ParameterMask,
    pub(crate) returned_parameters: ParameterMask,
    pub(crate) used_variables: VariableSet,
}

impl ProgramMethodFacts {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn flags(&self) -> MethodFlags {
        self.flags
    }

    /// Promote `flags`; return whether any was newly set.
    pub fn promote(&mut self, flags: MethodFlags) -> bool {
        let before = self.flags;
        self.flags |= flags;
        self.flags != before
    }

    /// Raise the invocation count to at least `count`.
    pub fn raise_invocation_count(&mut self, count: InvocationCount) -> bool {
        if count > self.invocation_count {
            self.invocation_count = count;
            true
        } else {
            false
        }
    }

    pub fn add_escaping_parameters(&mut self, mask: ParameterMask) -> bool {
        union_into(&mut self.escaping_parameters, mask)
    }

    pub fn add_modified_parameters(&mut self, mask: ParameterMask) -> bool {
        union_into(&mut self.modified_parameters, mask)
    }

    pub fn add_used_parameters(&mut self, mask: ParameterMask) -> bool {
        union_into(&mut self.used_parameters, mask)
    }

    pub fn add_returned_parameters(&mut self, mask: ParameterMask) -> bool {
        union_into(&mut self.returned_parameters, mask)
    }

    pub fn add_used_variables(&mut self, variables: &VariableSet) -> bool {
        self.used_variables.union_with(variables)
    }

    /// Whether `self` has every fact `other` has.
    pub fn covers(&self, other: &ProgramMethodFacts) -> bool {
        self.flags.contains(other.flags)
            && self.invocation_count >= other.invocation_count
            && self.escaping_parameters.covers(other.escaping_parameters)
            && self.modified_parameters.covers(other.modified_parameters)
            && self.used_parameters.covers(other.used_parameters)
            && self.returned_parameters.covers(other.returned_parameters)
            && self.used_variables.covers(&other.used_variables)
    }
}

fn union_into(mask: &mut ParameterMask, other: ParameterMask) -> bool {
    let before = *mask;
    *mask = mask.union(other);
    *mask != before
}

/// Facts of one method.
///
/// Abstract, native, and library methods have no body to inspect and get
/// [`MethodFacts::Library`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum MethodFacts {
    #[default]
    Library,
    Program(ProgramMethodFacts),
}

impl MethodFacts {
    pub fn program(&self) -> Option<&ProgramMethodFacts> {
        match self {
            MethodFacts::Program(facts) => Some(facts),
            MethodFacts::Library => None,
        }
    }

    pub fn program_mut(&mut self) -> Option<&mut ProgramMethodFacts> {
        match self {
            MethodFacts::Program(facts) => Some(facts),
            MethodFacts::Library => None,
        }
    }

    fn has(&self, flag: MethodFlags) -> bool {
        self.program().map_or(true, |f| f.flags.contains(flag))
    }

    fn mask(&self, get: impl FnOnce(&ProgramMethodFacts) -> ParameterMask) -> ParameterMask {
        self.program().map_or(ParameterMask::ALL, get)
    }

    // ── Flags ───────────────────────────────────────────────────────

    pub fn is_kept(&self) -> bool {
        self.has(MethodFlags::KEPT)
    }

    pub fn catches_exceptions(&self) -> bool {
        self.has(MethodFlags::CATCHES_EXCEPTIONS)
    }

    pub fn branches_backward(&self) -> bool {
        self.has(MethodFlags::BRANCHES_BACKWARD)
    }

    pub fn invokes_dynamically(&self) -> bool {
        self.has(MethodFlags::INVOKES_DYNAMICALLY)
    }

    pub fn assigns_final_field(&self) -> bool {
        self.has(MethodFlags::ASSIGNS_FINAL_FIELD)
    }

    pub fn returns_with_non_empty_stack(&self) -> bool {
        self.has(MethodFlags::RETURNS_WITH_NON_EMPTY_STACK)
    }

    pub fn has_synchronized_block(&self) -> bool {
        self.has(MethodFlags::HAS_SYNCHRONIZED_BLOCK)
    }

    pub fn invokes_super(&self) -> bool {
        self.has(MethodFlags::INVOKES_SUPER)
    }

    pub fn accesses_private_code(&self) -> bool {
        self.has(MethodFlags::ACCESSES_PRIVATE_CODE)
    }

    pub fn accesses_package_code(&self) -> bool {
        self.has(MethodFlags::ACCESSES_PACKAGE_CODE)
    }

    pub fn accesses_protected_code(&self) -> bool {
        self.has(MethodFlags::ACCESSES_PROTECTED_CODE)
    }

    pub fn may_throw_exceptions(&self) -> bool {
        self.has(MethodFlags::MAY_THROW_EXCEPTIONS)
    }

    pub fn returns_external_values(&self) -> bool {
        self.has(MethodFlags::RETURNS_EXTERNAL_VALUES)
    }

    /// Whether the method may become private without breaking callers.
    pub fn can_be_made_private(&self) -> bool {
        self.program().is_some_and(|f| {
            !f.flags
                .intersects(MethodFlags::CANNOT_BE_MADE_PRIVATE | MethodFlags::KEPT)
        })
    }

    // ── Derived predicates ──────────────────────────────────────────
    //
    // Each is the complement of latches, so it only ever goes from true to
    // false during a run.

    pub fn has_side_effects(&self) -> bool {
        !self.has_no_side_effects()
    }

    pub fn has_no_side_effects(&self) -> bool {
        self.program().is_some_and(|f| {
            !f.flags.contains(MethodFlags::HAS_SIDE_EFFECTS) && f.escaping_parameters.is_empty()
        })
    }

    pub fn has_no_external_side_effects(&self) -> bool {
        self.program().is_some_and(|f| {
            !f.flags.contains(MethodFlags::HAS_EXTERNAL_SIDE_EFFECTS)
                && f.escaping_parameters.is_empty()
        })
    }

    pub fn has_no_external_return_values(&self) -> bool {
        !self.returns_external_values()
    }

    // ── Counters and masks ──────────────────────────────────────────

    pub fn invocation_count(&self) -> InvocationCount {
        self.program()
            .map_or(InvocationCount::Unbounded, |f| f.invocation_count)
    }

    pub fn escaping_parameters(&self) -> ParameterMask {
        self.mask(|f| f.escaping_parameters)
    }

    pub fn modified_parameters(&self) -> ParameterMask {
        self.mask(|f| f.modified_parameters)
    }

    pub fn used_parameters(&self) -> ParameterMask {
        self.mask(|f| f.used_parameters)
    }

    pub fn returned_parameters(&self) -> ParameterMask {
        self.mask(|f| f.returned_parameters)
    }

    pub fn has_parameter_escaped(&self, index: usize) -> bool {
        self.escaping_parameters().contains(index)
    }

    pub fn is_parameter_modified(&self, index: usize) -> bool {
        self.modified_parameters().contains(index)
    }

    pub fn is_parameter_used(&self, index: usize) -> bool {
        self.used_parameters().contains(index)
    }

    pub fn is_parameter_returned(&self, index: usize) -> bool {
        self.returned_parameters().contains(index)
    }

    /// Whether local `slot` is ever read. Library methods use every slot.
    pub fn is_variable_used(&self, slot: u16) -> bool {
        self.program()
            .map_or(true, |f| f.used_variables.contains(slot))
    }

    /// Union of two records. Anything merged with a library record is a
    /// library record.
    #[must_use]
    pub fn merge(&self, other: &MethodFacts) -> MethodFacts {
        match (self, other) {
            (MethodFacts::Program(a), MethodFacts::Program(b)) => {
                let mut merged = a.clone();
                merged.flags |= b.flags;
                merged.raise_invocation_count(b.invocation_count);
                merged.add_escaping_parameters(b.escaping_parameters);
                merged.add_modified_parameters(b.modified_parameters);
                merged.add_used_parameters(b.used_parameters);
                merged.add_returned_parameters(b.returned_parameters);
                merged.add_used_variables(&b.used_variables);
                MethodFacts::Program(merged)
            }
            _ => MethodFacts::Library,
        }
    }
}
