//! Classes, members, and the program that owns them.
//!
//! All entities live in flat arenas inside [`Program`] and refer to each other
//! by id. A [`Class`] lists its members by id; a member points back at its
//! class. Ids are only meaningful for the program that issued them.

use rustc_hash::FxHashMap;

use crate::access::{ClassAccess, FieldAccess, MethodAccess};
use crate::code::{Code, ValueKind};
use crate::constant::{ConstantPool, CpIndex};
use crate::descriptor::{FieldType, MethodDescriptor};
use crate::{CLINIT, INIT};

// ── ID newtypes ─────────────────────────────────────────────────────

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub fn new(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            pub fn raw(self) -> u32 {
                self.0
            }

            /// Get the index as `usize` (for indexing into `Vec`s).
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

entity_id!(
    /// Class ID within a [`Program`].
    ClassId
);
entity_id!(
    /// Method ID within a [`Program`].
    MethodId
);
entity_id!(
    /// Field ID within a [`Program`].
    FieldId
);

fn next_id(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

// ── Classes ─────────────────────────────────────────────────────────

/// Where a class comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum ClassKind {
    /// Part of the program being optimized; method bodies are available.
    Program,
    /// Referenced from the program but not optimized; signatures only.
    Library,
}

#[derive(Clone, Debug)]
pub struct Class {
    /// Internal name (`java/lang/Object`).
    pub name: String,
    pub kind: ClassKind,
    pub access: ClassAccess,
    /// `None` only for `java/lang/Object`.
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub constant_pool: ConstantPool,
    pub methods: Vec<MethodId>,
    pub fields: Vec<FieldId>,
}

impl Class {
    #[inline]
    pub fn is_program(&self) -> bool {
        self.kind == ClassKind::Program
    }

    #[inline]
    pub fn is_interface(&self) -> bool {
        self.access.contains(ClassAccess::INTERFACE)
    }

    /// Package part of the internal name (`java/lang` for `java/lang/Object`).
    pub fn package(&self) -> &str {
        package_of(&self.name)
    }
}

/// Package part of an internal class name.
pub(crate) fn package_of(name: &str) -> &str {
    name.rfind('/').map_or("", |i| &name[..i])
}

// ── Methods ─────────────────────────────────────────────────────────

/// A logical method parameter.
///
/// Parameter 0 is the receiver of an instance method. Long and double
/// parameters take two slots but remain one parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Parameter {
    pub index: usize,
    /// First local variable slot holding the parameter on entry.
    pub slot: u16,
    pub kind: ValueKind,
}

#[derive(Clone, Debug)]
pub struct Method {
    pub class: ClassId,
    pub name: String,
    pub descriptor: String,
    /// Parsed form of `descriptor`.
    pub signature: MethodDescriptor,
    pub access: MethodAccess,
    /// `None` for abstract and native methods and for library methods.
    pub code: Option<Code>,
}

impl Method {
    #[inline]
    pub fn is_static(&self) -> bool {
        self.access.contains(MethodAccess::STATIC)
    }

    #[inline]
    pub fn is_initializer(&self) -> bool {
        self.name == INIT
    }

    #[inline]
    pub fn is_class_initializer(&self) -> bool {
        self.name == CLINIT
    }

    #[inline]
    pub fn is_abstract(&self) -> bool {
        self.access.contains(MethodAccess::ABSTRACT)
    }

    /// Whether the method can take part in virtual dispatch.
    pub fn is_virtual(&self) -> bool {
        !self.is_static()
            && !self.access.contains(MethodAccess::PRIVATE)
            && !self.is_initializer()
            && !self.is_class_initializer()
    }

    /// Number of logical parameters, receiver included.
    pub fn parameter_count(&self) -> usize {
        self.signature.params.len() + usize::from(!self.is_static())
    }

    /// Logical parameters with their entry slots, receiver first.
    pub fn parameters(&self) -> Vec<Parameter> {
        let mut params = Vec::with_capacity(self.parameter_count());
        let mut slot = 0u16;
        if !self.is_static() {
            params.push(Parameter {
                index: 0,
                slot: 0,
                kind: ValueKind::Reference,
            });
            slot = 1;
        }
        for ty in &self.signature.params {
            params.push(Parameter {
                index: params.len(),
                slot,
                kind: ty.value_kind(),
            });
            slot = slot.saturating_add(ty.slot_size());
        }
        params
    }

    /// Slots occupied by parameters on entry, receiver included.
    pub fn parameter_slots(&self) -> u16 {
        self.signature
            .param_slots()
            .saturating_add(u16::from(!self.is_static()))
    }

    /// The logical parameter whose entry slot range contains `slot`.
    pub fn parameter_at_slot(&self, slot: u16) -> Option<Parameter> {
        self.parameters()
            .into_iter()
            .find(|p| slot >= p.slot && slot < p.slot + p.kind.slot_size())
    }
}

// ── Fields ──────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct Field {
    pub class: ClassId,
    pub name: String,
    pub descriptor: String,
    /// Parsed form of `descriptor`.
    pub ty: FieldType,
    pub access: FieldAccess,
    /// `ConstantValue` attribute of a static field.
    pub constant_value: Option<CpIndex>,
}

impl Field {
    #[inline]
    pub fn is_static(&self) -> bool {
        self.access.contains(FieldAccess::STATIC)
    }
}

// ── Program ─────────────────────────────────────────────────────────

/// A fully loaded program: program classes plus the library classes they
/// reference.
#[derive(Clone, Debug, Default)]
pub struct Program {
    classes: Vec<Class>,
    methods: Vec<Method>,
    fields: Vec<Field>,
    by_name: FxHashMap<String, ClassId>,
}

impl Program {
    #[inline]
    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.index()]
    }

    #[inline]
    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.index()]
    }

    #[inline]
    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.index()]
    }

    #[inline]
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    #[inline]
    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    #[inline]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn class_ids(&self) -> impl Iterator<Item = ClassId> {
        (0..next_id(self.classes.len())).map(ClassId::new)
    }

    pub fn method_ids(&self) -> impl Iterator<Item = MethodId> {
        (0..next_id(self.methods.len())).map(MethodId::new)
    }

    pub fn field_ids(&self) -> impl Iterator<Item = FieldId> {
        (0..next_id(self.fields.len())).map(FieldId::new)
    }

    /// Program classes only (bodies available), in definition order.
    pub fn program_classes(&self) -> impl Iterator<Item = ClassId> + '_ {
        self.class_ids().filter(|&id| self.class(id).is_program())
    }

    #[inline]
    pub fn class_by_name(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    /// A method declared directly in `class` (supertypes are not searched).
    pub fn declared_method(&self, class: ClassId, name: &str, descriptor: &str) -> Option<MethodId> {
        self.class(class).methods.iter().copied().find(|&m| {
            let method = self.method(m);
            method.name == name && method.descriptor == descriptor
        })
    }

    /// A field declared directly in `class` (supertypes are not searched).
    pub fn declared_field(&self, class: ClassId, name: &str, descriptor: &str) -> Option<FieldId> {
        self.class(class).fields.iter().copied().find(|&f| {
            let field = self.field(f);
            field.name == name && field.descriptor == descriptor
        })
    }

    /// Look up a declared method by class name.
    pub fn method_by_name(&self, class: &str, name: &str, descriptor: &str) -> Option<MethodId> {
        self.declared_method(self.class_by_name(class)?, name, descriptor)
    }

    /// Look up a declared field by class name.
    pub fn field_by_name(&self, class: &str, name: &str, descriptor: &str) -> Option<FieldId> {
        self.declared_field(self.class_by_name(class)?, name, descriptor)
    }

    /// Whether the method's body can be analyzed: a program method with code.
    pub fn has_inspectable_body(&self, id: MethodId) -> bool {
        let method = self.method(id);
        method.code.is_some() && self.class(method.class).is_program()
    }

    /// Fully qualified `Class.name(descriptor)` for diagnostics.
    pub fn method_display(&self, id: MethodId) -> String {
        let method = self.method(id);
        format!(
            "{}.{}{}",
            self.class(method.class).name,
            method.name,
            method.descriptor
        )
    }

    // ── Construction (used by the builder) ──────────────────────────

    pub(crate) fn push_class(&mut self, class: Class) -> ClassId {
        let id = ClassId::new(next_id(self.classes.len()));
        self.by_name.insert(class.name.clone(), id);
        self.classes.push(class);
        id
    }

    pub(crate) fn class_mut(&mut self, id: ClassId) -> &mut Class {
        &mut self.classes[id.index()]
    }

    pub(crate) fn push_method(&mut self, method: Method) -> MethodId {
        let id = MethodId::new(next_id(self.methods.len()));
        let class = method.class;
        self.methods.push(method);
        self.classes[class.index()].methods.push(id);
        id
    }

    pub(crate) fn push_field(&mut self, field: Field) -> FieldId {
        let id = FieldId::new(next_id(self.fields.len()));
        let class = field.class;
        self.fields.push(field);
        self.classes[class.index()].fields.push(id);
        id
    }

    pub(crate) fn contains_class(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }
}
