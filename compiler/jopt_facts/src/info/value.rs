//! Lattices for field contents.
//!
//! Both lattices have three levels and only ever move up:
//!
//! ```text
//! Unset  <  one known value  <  Unknown
//! ```

use jopt_eval::PrimitiveConstant;
use jopt_ir::ClassId;

/// A constant a field can be proven to hold.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldConstant {
    Int(i32),
    Long(i64),
    /// Raw IEEE-754 bits.
    Float(u32),
    /// Raw IEEE-754 bits.
    Double(u64),
    Null,
    String(String),
}

impl From<PrimitiveConstant> for FieldConstant {
    fn from(constant: PrimitiveConstant) -> Self {
        match constant {
            PrimitiveConstant::Int(v) => FieldConstant::Int(v),
            PrimitiveConstant::Long(v) => FieldConstant::Long(v),
            PrimitiveConstant::Float(v) => FieldConstant::Float(v),
            PrimitiveConstant::Double(v) => FieldConstant::Double(v),
        }
    }
}

/// Every value a field may hold, as far as the analysis can tell.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldValue {
    /// No value seen yet.
    #[default]
    Unset,
    /// Every value ever stored (and the initial value) is this constant.
    Constant(FieldConstant),
    Unknown,
}

impl FieldValue {
    fn rank(&self) -> u8 {
        match self {
            FieldValue::Unset => 0,
            FieldValue::Constant(_) => 1,
            FieldValue::Unknown => 2,
        }
    }

    /// Join `other` in; return whether `self` moved up.
    pub fn join(&mut self, other: &FieldValue) -> bool {
        let joined = match (&*self, other) {
            (_, FieldValue::Unset) | (FieldValue::Unknown, _) => return false,
            (FieldValue::Unset, _) => other.clone(),
            (FieldValue::Constant(a), FieldValue::Constant(b)) if a == b => return false,
            _ => FieldValue::Unknown,
        };
        *self = joined;
        true
    }

    /// Whether `self` is at or above `other` in the lattice.
    pub fn covers(&self, other: &FieldValue) -> bool {
        self == other || self.rank() > other.rank()
    }

    /// The propagated constant, if exactly one is possible.
    pub fn constant(&self) -> Option<&FieldConstant> {
        match self {
            FieldValue::Constant(c) => Some(c),
            _ => None,
        }
    }
}

/// The class of every non-null object a field may reference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum ReferencedClass {
    /// Only `null` (or nothing) stored so far.
    #[default]
    Unset,
    /// Every stored object is an instance of exactly this class.
    Class(ClassId),
    Unknown,
}

impl ReferencedClass {
    fn rank(self) -> u8 {
        match self {
            ReferencedClass::Unset => 0,
            ReferencedClass::Class(_) => 1,
            ReferencedClass::Unknown => 2,
        }
    }

    /// Join `other` in; return whether `self` moved up.
    pub fn join(&mut self, other: ReferencedClass) -> bool {
        let joined = match (*self, other) {
            (_, ReferencedClass::Unset) | (ReferencedClass::Unknown, _) => return false,
            (ReferencedClass::Unset, other) => other,
            (ReferencedClass::Class(a), ReferencedClass::Class(b)) if a == b => return false,
            _ => ReferencedClass::Unknown,
        };
        *self = joined;
        true
    }

    pub fn covers(self, other: ReferencedClass) -> bool {
        self == other || self.rank() > other.rank()
    }

    pub fn class(self) -> Option<ClassId> {
        match self {
            ReferencedClass::Class(id) => Some(id),
            _ => None,
        }
    }
}
