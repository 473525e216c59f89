//! Class facts.

use bitflags::bitflags;
use jopt_ir::ClassId;

bitflags! {
    /// Promotable class facts. Every flag is a latch.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    #[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
    pub struct ClassFlags: u16 {
        const KEPT = 1 << 0;
        const INSTANTIATED = 1 << 1;
        /// A `.class` literal names the class.
        const DOT_CLASSED = 1 << 2;
        const INSTANCEOF_TESTED = 1 << 3;
        /// The class appears as a caught exception type.
        const CAUGHT = 1 << 4;
        const HAS_SIDE_EFFECTS = 1 << 5;
        const CONTAINS_CONSTRUCTORS = 1 << 6;
        const CONTAINS_PACKAGE_VISIBLE_MEMBERS = 1 << 7;
        const INVOKES_PACKAGE_VISIBLE_MEMBERS = 1 << 8;
        /// An enum whose shape allows replacing instances by ordinals.
        const SIMPLE_ENUM_CANDIDATE = 1 << 9;
        /// A use was found that requires real enum objects.
        const SIMPLE_ENUM_REJECTED = 1 << 10;
        /// Some structural reason forbids merging this class into another.
        const MERGE_BLOCKED = 1 << 11;
    }
}

/// Facts of a program class.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct ProgramClassFacts {
    pub(crate) flags: ClassFlags,
    pub(crate) target_class: Option<ClassId>,
    pub(crate) wrapped_class: Option<ClassId>,
}

impl ProgramClassFacts {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn flags(&self) -> ClassFlags {
        self.flags
    }

    /// Promote `flags`; return whether any was newly set.
    pub fn promote(&mut self, flags: ClassFlags) -> bool {
        let before = self.flags;
        self.flags |= flags;
        self.flags != before
    }

    /// The class this one is being merged into (set by class merging).
    pub fn set_target_class(&mut self, target: ClassId) {
        self.target_class = Some(target);
    }

    /// The class this one wraps (set by wrapper elimination).
    pub fn set_wrapped_class(&mut self, wrapped: ClassId) {
        self.wrapped_class = Some(wrapped);
    }

    /// Whether `self` has every fact `other` has.
    pub fn covers(&self, other: &ProgramClassFacts) -> bool {
        self.flags.contains(other.flags)
    }
}

/// Facts of one class.
///
/// Library classes cannot be inspected; every answer about them is the
/// pessimistic one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum ClassFacts {
    #[default]
    Library,
    Program(ProgramClassFacts),
}

impl ClassFacts {
    pub fn program(&self) -> Option<&ProgramClassFacts> {
        match self {
            ClassFacts::Program(facts) => Some(facts),
            ClassFacts::Library => None,
        }
    }

    pub fn program_mut(&mut self) -> Option<&mut ProgramClassFacts> {
        match self {
            ClassFacts::Program(facts) => Some(facts),
            ClassFacts::Library => None,
        }
    }

    fn has(&self, flag: ClassFlags) -> bool {
        self.program().map_or(true, |f| f.flags.contains(flag))
    }

    pub fn is_kept(&self) -> bool {
        self.has(ClassFlags::KEPT)
    }

    pub fn is_instantiated(&self) -> bool {
        self.has(ClassFlags::INSTANTIATED)
    }

    pub fn is_dot_classed(&self) -> bool {
        self.has(ClassFlags::DOT_CLASSED)
    }

    pub fn is_instanceof_tested(&self) -> bool {
        self.has(ClassFlags::INSTANCEOF_TESTED)
    }

    pub fn is_caught(&self) -> bool {
        self.has(ClassFlags::CAUGHT)
    }

    pub fn has_side_effects(&self) -> bool {
        self.has(ClassFlags::HAS_SIDE_EFFECTS)
    }

    pub fn contains_constructors(&self) -> bool {
        self.has(ClassFlags::CONTAINS_CONSTRUCTORS)
    }

    pub fn contains_package_visible_members(&self) -> bool {
        self.has(ClassFlags::CONTAINS_PACKAGE_VISIBLE_MEMBERS)
    }

    pub fn invokes_package_visible_members(&self) -> bool {
        self.has(ClassFlags::INVOKES_PACKAGE_VISIBLE_MEMBERS)
    }

    /// An enum whose instances can be replaced by their ordinals.
    pub fn is_simple_enum(&self) -> bool {
        self.program().is_some_and(|f| {
            f.flags.contains(ClassFlags::SIMPLE_ENUM_CANDIDATE)
                && !f.flags.contains(ClassFlags::SIMPLE_ENUM_REJECTED)
        })
    }

    /// Whether class merging may fold this class into another.
    pub fn may_be_merged(&self) -> bool {
        self.program().is_some_and(|f| {
            !f.flags.intersects(
                ClassFlags::KEPT
                    | ClassFlags::DOT_CLASSED
                    | ClassFlags::INSTANCEOF_TESTED
                    | ClassFlags::CAUGHT
                    | ClassFlags::MERGE_BLOCKED,
            )
        })
    }

    pub fn target_class(&self) -> Option<ClassId> {
        self.program().and_then(|f| f.target_class)
    }

    pub fn wrapped_class(&self) -> Option<ClassId> {
        self.program().and_then(|f| f.wrapped_class)
    }

    /// Union of two records. Anything merged with a library record is a
    /// library record.
    #[must_use]
    pub fn merge(&self, other: &ClassFacts) -> ClassFacts {
        match (self, other) {
            (ClassFacts::Program(a), ClassFacts::Program(b)) => {
                ClassFacts::Program(ProgramClassFacts {
                    flags: a.flags | b.flags,
                    target_class: a.target_class.or(b.target_class),
                    wrapped_class: a.wrapped_class.or(b.wrapped_class),
                })
            }
            _ => ClassFacts::Library,
        }
    }
}
