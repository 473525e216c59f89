//! Per-class constant pools.
//!
//! Instructions with a symbolic operand (`ldc`, field access, calls, `new`,
//! type checks) carry a [`CpIndex`] into the constant pool of the class that
//! declares the method. Indices are dense and start at 0; the class file's
//! 1-based numbering and the unused slot after long/double entries are a
//! loader concern.

use rustc_hash::FxHashMap;

/// Index into a [`ConstantPool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct CpIndex(u16);

impl CpIndex {
    #[inline]
    pub fn new(raw: u16) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(self) -> u16 {
        self.0
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A symbolic reference to a field or method: owner class, name, descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct MemberRef {
    /// Internal name of the class the reference names (not necessarily the
    /// declaring class; resolution walks supertypes).
    pub class: String,
    pub name: String,
    pub descriptor: String,
}

/// Method handle reference kinds, numbered as in the class file format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum ReferenceKind {
    GetField = 1,
    GetStatic = 2,
    PutField = 3,
    PutStatic = 4,
    InvokeVirtual = 5,
    InvokeStatic = 6,
    InvokeSpecial = 7,
    NewInvokeSpecial = 8,
    InvokeInterface = 9,
}

impl ReferenceKind {
    /// Whether the handle refers to a field rather than a method.
    #[inline]
    pub fn is_field(self) -> bool {
        matches!(
            self,
            Self::GetField | Self::GetStatic | Self::PutField | Self::PutStatic
        )
    }
}

/// A constant pool entry.
///
/// Floating point constants are stored as raw bits so entries can be hashed
/// and interned.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Constant {
    Integer(i32),
    Long(i64),
    Float(u32),
    Double(u64),
    String(String),
    /// A class reference, by internal name (arrays use descriptor syntax).
    Class(String),
    FieldRef(MemberRef),
    MethodRef(MemberRef),
    InterfaceMethodRef(MemberRef),
    MethodHandle {
        kind: ReferenceKind,
        reference: CpIndex,
    },
    MethodType(String),
    InvokeDynamic {
        bootstrap: u16,
        name: String,
        descriptor: String,
    },
}

impl Constant {
    /// Whether `ldc` of this constant pushes a reference.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Constant::String(_)
                | Constant::Class(_)
                | Constant::MethodHandle { .. }
                | Constant::MethodType(_)
        )
    }
}

/// The constant pool of one class.
#[derive(Clone, Debug, Default)]
pub struct ConstantPool {
    entries: Vec<Constant>,
    interned: FxHashMap<Constant, CpIndex>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn get(&self, index: CpIndex) -> Option<&Constant> {
        self.entries.get(index.index())
    }

    /// Return the index of `constant`, adding it if not yet present.
    pub fn intern(&mut self, constant: Constant) -> CpIndex {
        if let Some(&index) = self.interned.get(&constant) {
            return index;
        }
        let raw = u16::try_from(self.entries.len()).unwrap_or(u16::MAX);
        let index = CpIndex::new(raw);
        self.entries.push(constant.clone());
        self.interned.insert(constant, index);
        index
    }

    /// The class name of a `Class` entry.
    pub fn class_name(&self, index: CpIndex) -> Option<&str> {
        match self.get(index)? {
            Constant::Class(name) => Some(name),
            _ => None,
        }
    }

    /// The member reference of a field, method, or interface method entry.
    pub fn member_ref(&self, index: CpIndex) -> Option<&MemberRef> {
        match self.get(index)? {
            Constant::FieldRef(member)
            | Constant::MethodRef(member)
            | Constant::InterfaceMethodRef(member) => Some(member),
            _ => None,
        }
    }

    /// Iterate entries with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (CpIndex, &Constant)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, c)| (CpIndex::new(u16::try_from(i).unwrap_or(u16::MAX)), c))
    }
}
