//! Abstract values.
//!
//! References carry the set of places they may have come from. Two
//! references are never compared for identity; analyses only ask "could this
//! value be the one produced at offset N, or parameter P?".

use std::fmt;

use jopt_ir::ValueKind;
use smallvec::SmallVec;

/// Where a reference value may have come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Origin {
    /// The logical parameter with this index (0 is the receiver of an
    /// instance method).
    Parameter(usize),
    /// Pushed by the instruction at this offset: an allocation, a field or
    /// array read, a constant, or a call result.
    Produced(usize),
    /// The exception caught by the handler starting at this offset.
    CaughtException(usize),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Parameter(i) => write!(f, "P{i}"),
            Origin::Produced(offset) => write!(f, "@{offset}"),
            Origin::CaughtException(handler) => write!(f, "catch@{handler}"),
        }
    }
}

/// A sorted, duplicate-free set of origins.
///
/// Most references have one origin; merges at join points rarely grow a set
/// past a handful.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct OriginSet(SmallVec<[Origin; 2]>);

impl OriginSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(origin: Origin) -> Self {
        let mut set = SmallVec::new();
        set.push(origin);
        Self(set)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn contains(&self, origin: Origin) -> bool {
        self.0.binary_search(&origin).is_ok()
    }

    /// Add `origin`; return whether it was new.
    pub fn insert(&mut self, origin: Origin) -> bool {
        match self.0.binary_search(&origin) {
            Ok(_) => false,
            Err(pos) => {
                self.0.insert(pos, origin);
                true
            }
        }
    }

    /// Add every origin of `other`; return whether anything was new.
    pub fn union_with(&mut self, other: &OriginSet) -> bool {
        let mut changed = false;
        for &origin in &other.0 {
            changed |= self.insert(origin);
        }
        changed
    }

    pub fn iter(&self) -> impl Iterator<Item = Origin> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Origin> for OriginSet {
    fn from_iter<I: IntoIterator<Item = Origin>>(iter: I) -> Self {
        let mut set = Self::new();
        for origin in iter {
            set.insert(origin);
        }
        set
    }
}

/// A known primitive constant. Floating point values are raw bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveConstant {
    Int(i32),
    Long(i64),
    Float(u32),
    Double(u64),
}

/// An abstract stack or local variable value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    Primitive {
        kind: ValueKind,
        /// `None` when the value is not a single known constant.
        constant: Option<PrimitiveConstant>,
    },
    /// `null` is a reference with no origins.
    Reference { origins: OriginSet },
    /// Unusable: an unset local, the second slot of a long or double, or
    /// the merge of incompatible values.
    Top,
}

impl Value {
    pub fn unknown(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Reference => Value::Reference {
                origins: OriginSet::new(),
            },
            kind => Value::Primitive {
                kind,
                constant: None,
            },
        }
    }

    pub fn constant(constant: PrimitiveConstant) -> Self {
        let kind = match constant {
            PrimitiveConstant::Int(_) => ValueKind::Int,
            PrimitiveConstant::Long(_) => ValueKind::Long,
            PrimitiveConstant::Float(_) => ValueKind::Float,
            PrimitiveConstant::Double(_) => ValueKind::Double,
        };
        Value::Primitive {
            kind,
            constant: Some(constant),
        }
    }

    pub fn reference(origin: Origin) -> Self {
        Value::Reference {
            origins: OriginSet::single(origin),
        }
    }

    /// The value an instruction at `offset` pushes when nothing more is known:
    /// a reference originating there, or an unknown primitive.
    pub fn produced(kind: ValueKind, offset: usize) -> Self {
        match kind {
            ValueKind::Reference => Value::reference(Origin::Produced(offset)),
            kind => Value::unknown(kind),
        }
    }

    pub fn null() -> Self {
        Value::Reference {
            origins: OriginSet::new(),
        }
    }

    #[inline]
    pub fn is_reference(&self) -> bool {
        matches!(self, Value::Reference { .. })
    }

    /// Long and double values take two slots.
    #[inline]
    pub fn is_category2(&self) -> bool {
        matches!(self, Value::Primitive { kind, .. } if kind.is_category2())
    }

    #[inline]
    pub fn slot_size(&self) -> usize {
        if self.is_category2() {
            2
        } else {
            1
        }
    }

    /// Origins of a reference; `None` for primitives and `Top`.
    pub fn origins(&self) -> Option<&OriginSet> {
        match self {
            Value::Reference { origins } => Some(origins),
            _ => None,
        }
    }

    /// Known constant of a primitive.
    pub fn constant_value(&self) -> Option<PrimitiveConstant> {
        match self {
            Value::Primitive { constant, .. } => *constant,
            _ => None,
        }
    }

    /// Join `other` into `self`; return whether `self` changed.
    pub fn merge(&mut self, other: &Value) -> bool {
        match (&mut *self, other) {
            (Value::Top, _) => false,
            (Value::Reference { origins }, Value::Reference { origins: theirs }) => {
                origins.union_with(theirs)
            }
            (
                Value::Primitive { kind, constant },
                Value::Primitive {
                    kind: their_kind,
                    constant: their_constant,
                },
            ) if *kind == *their_kind => {
                if constant.is_some() && *constant != *their_constant {
                    *constant = None;
                    true
                } else {
                    false
                }
            }
            _ => {
                *self = Value::Top;
                true
            }
        }
    }
}

#[cfg(test)]
mod tests;
