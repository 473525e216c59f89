//! The fact store: one record per class, method, and field.

use jopt_ir::{ClassId, FieldId, MethodId, Program};

use super::class::{ClassFacts, ProgramClassFacts};
use super::field::{FieldFacts, ProgramFieldFacts};
use super::method::{MethodFacts, ProgramMethodFacts};
use crate::error::AnalysisError;

static LIBRARY_CLASS: ClassFacts = ClassFacts::Library;
static LIBRARY_METHOD: MethodFacts = MethodFacts::Library;
static LIBRARY_FIELD: FieldFacts = FieldFacts::Library;

/// Any entity the store keeps facts for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityId {
    Class(ClassId),
    Method(MethodId),
    Field(FieldId),
}

impl EntityId {
    /// Human-readable name for diagnostics.
    pub fn display(self, program: &Program) -> String {
        match self {
            EntityId::Class(id) => program.class(id).name.clone(),
            EntityId::Method(id) => program.method_display(id),
            EntityId::Field(id) => {
                let field = program.field(id);
                format!(
                    "{}.{}:{}",
                    program.class(field.class).name,
                    field.name,
                    field.descriptor
                )
            }
        }
    }
}

/// Fact records for every entity of a program, indexed by id.
///
/// Each slot is filled at most once, by the initial setter pass. A slot that
/// was never filled reads as the library record, so lookups never fail.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct FactStore {
    classes: Vec<Option<ClassFacts>>,
    methods: Vec<Option<MethodFacts>>,
    fields: Vec<Option<FieldFacts>>,
}

impl FactStore {
    /// An empty store sized for `program`.
    pub fn new(program: &Program) -> Self {
        Self {
            classes: vec![None; program.class_count()],
            methods: vec![None; program.method_count()],
            fields: vec![None; program.field_count()],
        }
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub fn class(&self, id: ClassId) -> &ClassFacts {
        self.classes
            .get(id.index())
            .and_then(Option::as_ref)
            .unwrap_or(&LIBRARY_CLASS)
    }

    pub fn method(&self, id: MethodId) -> &MethodFacts {
        self.methods
            .get(id.index())
            .and_then(Option::as_ref)
            .unwrap_or(&LIBRARY_METHOD)
    }

    pub fn field(&self, id: FieldId) -> &FieldFacts {
        self.fields
            .get(id.index())
            .and_then(Option::as_ref)
            .unwrap_or(&LIBRARY_FIELD)
    }

    // ── Initialization ──────────────────────────────────────────────

    /// Install the record of `id`. Fails if one was installed before.
    pub fn set_class_facts(&mut self, id: ClassId, facts: ClassFacts) -> Result<(), AnalysisError> {
        install(&mut self.classes, id.index(), facts, || EntityId::Class(id))
    }

    pub fn set_method_facts(
        &mut self,
        id: MethodId,
        facts: MethodFacts,
    ) -> Result<(), AnalysisError> {
        install(&mut self.methods, id.index(), facts, || EntityId::Method(id))
    }

    pub fn set_field_facts(&mut self, id: FieldId, facts: FieldFacts) -> Result<(), AnalysisError> {
        install(&mut self.fields, id.index(), facts, || EntityId::Field(id))
    }

    // ── Promotion ───────────────────────────────────────────────────

    /// The promotable record of a program class; `None` for library records.
    pub fn class_mut(&mut self, id: ClassId) -> Option<&mut ProgramClassFacts> {
        self.classes.get_mut(id.index())?.as_mut()?.program_mut()
    }

    pub fn method_mut(&mut self, id: MethodId) -> Option<&mut ProgramMethodFacts> {
        self.methods.get_mut(id.index())?.as_mut()?.program_mut()
    }

    pub fn field_mut(&mut self, id: FieldId) -> Option<&mut ProgramFieldFacts> {
        self.fields.get_mut(id.index())?.as_mut()?.program_mut()
    }

    // ── Monotonicity ────────────────────────────────────────────────

    /// The first entity whose facts in `self` are lower than in `earlier`,
    /// or whose record changed variant.
    pub fn find_demotion(&self, earlier: &FactStore) -> Option<EntityId> {
        let classes = self.classes.iter().zip(&earlier.classes).enumerate();
        for (i, (now, then)) in classes {
            let ok = match (now, then) {
                (Some(ClassFacts::Program(a)), Some(ClassFacts::Program(b))) => a.covers(b),
                (a, b) => a == b || b.is_none(),
            };
            if !ok {
                return Some(EntityId::Class(ClassId::new(raw(i))));
            }
        }
        let methods = self.methods.iter().zip(&earlier.methods).enumerate();
        for (i, (now, then)) in methods {
            let ok = match (now, then) {
                (Some(MethodFacts::Program(a)), Some(MethodFacts::Program(b))) => a.covers(b),
                (a, b) => a == b || b.is_none(),
            };
            if !ok {
                return Some(EntityId::Method(MethodId::new(raw(i))));
            }
        }
        let fields = self.fields.iter().zip(&earlier.fields).enumerate();
        for (i, (now, then)) in fields {
            let ok = match (now, then) {
                (Some(FieldFacts::Program(a)), Some(FieldFacts::Program(b))) => a.covers(b),
                (a, b) => a == b || b.is_none(),
            };
            if !ok {
                return Some(EntityId::Field(FieldId::new(raw(i))));
            }
        }
        None
    }
}

fn install<T>(
    slots: &mut Vec<Option<T>>,
    index: usize,
    facts: T,
    entity: impl FnOnce() -> EntityId,
) -> Result<(), AnalysisError> {
    if slots.len() <= index {
        slots.resize_with(index + 1, || None);
    }
    match &mut slots[index] {
        Some(_) => Err(AnalysisError::AlreadyInitialized {
            entity: format!("{:?}", entity()),
        }),
        slot => {
            *slot = Some(facts);
            Ok(())
        }
    }
}

fn raw(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}
