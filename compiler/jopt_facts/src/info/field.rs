//! Field facts.

use bitflags::bitflags;

use super::value::{FieldValue, ReferencedClass};

bitflags! {
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    #[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
    pub struct FieldFlags: u8 {
        const KEPT = 1 << 0;
        const READ = 1 << 1;
        const WRITTEN = 1 << 2;
        /// Accessed from a class other than the declaring one.
        const ACCESSED_EXTERNALLY = 1 << 3;
    }
}

/// Facts of a program field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct ProgramFieldFacts {
    pub(crate) flags: FieldFlags,
    pub(crate) value: FieldValue,
    pub(crate) referenced_class: ReferencedClass,
}

impl ProgramFieldFacts {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn flags(&self) -> FieldFlags {
        self.flags
    }

    pub fn promote(&mut self, flags: FieldFlags) -> bool {
        let before = self.flags;
        self.flags |= flags;
        self.flags != before
    }

    /// Join a value the field may hold.
    pub fn join_value(&mut self, value: &FieldValue) -> bool {
        self.value.join(value)
    }

    pub fn join_referenced_class(&mut self, class: ReferencedClass) -> bool {
        self.referenced_class.join(class)
    }

    pub fn covers(&self, other: &ProgramFieldFacts) -> bool {
        self.flags.contains(other.flags)
            && self.value.covers(&other.value)
            && self.referenced_class.covers(other.referenced_class)
    }
}

/// Facts of one field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldFacts {
    #[default]
    Library,
    Program(ProgramFieldFacts),
}

impl FieldFacts {
    pub fn program(&self) -> Option<&ProgramFieldFacts> {
        match self {
            FieldFacts::Program(facts) => Some(facts),
            FieldFacts::Library => None,
        }
    }

    pub fn program_mut(&mut self) -> Option<&mut ProgramFieldFacts> {
        match self {
            FieldFacts::Program(facts) => Some(facts),
            FieldFacts::Library => None,
        }
    }

    fn has(&self, flag: FieldFlags) -> bool {
        self.program().map_or(true, |f| f.flags.contains(flag))
    }

    pub fn is_kept(&self) -> bool {
        self.has(FieldFlags::KEPT)
    }

    pub fn is_read(&self) -> bool {
        self.has(FieldFlags::READ)
    }

    pub fn is_written(&self) -> bool {
        self.has(FieldFlags::WRITTEN)
    }

    pub fn can_be_made_private(&self) -> bool {
        self.program().is_some_and(|f| {
            !f.flags
                .intersects(FieldFlags::ACCESSED_EXTERNALLY | FieldFlags::KEPT)
        })
    }

    /// The single constant the field always holds, if proven.
    pub fn constant_value(&self) -> Option<&super::value::FieldConstant> {
        self.program().and_then(|f| f.value.constant())
    }

    pub fn value(&self) -> &FieldValue {
        static UNKNOWN: FieldValue = FieldValue::Unknown;
        self.program().map_or(&UNKNOWN, |f| &f.value)
    }

    pub fn referenced_class(&self) -> ReferencedClass {
        self.program()
            .map_or(ReferencedClass::Unknown, |f| f.referenced_class)
    }

    #[must_use]
    pub fn merge(&self, other: &FieldFacts) -> FieldFacts {
        match (self, other) {
            (FieldFacts::Program(a), FieldFacts::Program(b)) => {
                let mut merged = a.clone();
                merged.flags |= b.flags;
                merged.value.join(&b.value);
                merged.referenced_class.join(b.referenced_class);
                FieldFacts::Program(merged)
            }
            _ => FieldFacts::Library,
        }
    }
}
