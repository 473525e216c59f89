//! Class hierarchy queries: supertypes, subtypes, member resolution, and
//! call target sets.
//!
//! # Call targets
//!
//! A call site names a method reference. Static, special, and private calls
//! have exactly one target. Virtual and interface calls may dispatch to any
//! concrete implementation reachable by virtual lookup from a subtype of the
//! referenced class; [`ClassHierarchy::call_targets`] returns all of them.
//! When the referenced class or method cannot be found the result is
//! [`CallTargets::Unknown`] and callers must assume the worst.
//!
//! # Overriding groups
//!
//! Methods with the same name and descriptor that can stand in for one
//! another under dispatch form an overriding group. Two virtual methods are in
//! the same group when some class sees both among its supertypes (itself
//! included). Facts that constrain the signature, such as which parameters
//! are used, must agree across a group.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::access::{ClassAccess, MethodAccess};
use crate::code::ConstantOp;
use crate::constant::MemberRef;
use crate::program::{ClassId, FieldId, MethodId, Program};

/// How a call site dispatches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    Virtual,
    Special,
    Static,
    Interface,
}

impl InvokeKind {
    /// The dispatch kind of a method invocation opcode.
    pub fn from_op(op: ConstantOp) -> Option<Self> {
        match op {
            ConstantOp::InvokeVirtual => Some(Self::Virtual),
            ConstantOp::InvokeSpecial => Some(Self::Special),
            ConstantOp::InvokeStatic => Some(Self::Static),
            ConstantOp::InvokeInterface => Some(Self::Interface),
            _ => None,
        }
    }
}

/// The methods a call site may execute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallTargets {
    Known(SmallVec<[MethodId; 4]>),
    Unknown,
}

/// Precomputed hierarchy of a [`Program`].
pub struct ClassHierarchy {
    superclass: Vec<Option<ClassId>>,
    interfaces: Vec<SmallVec<[ClassId; 2]>>,
    direct_subtypes: Vec<SmallVec<[ClassId; 4]>>,
    /// A supertype name did not resolve to a class in the program.
    incomplete: Vec<bool>,
    /// Overriding group index per method.
    group_of: Vec<usize>,
    groups: Vec<SmallVec<[MethodId; 2]>>,
}

impl ClassHierarchy {
    pub fn new(program: &Program) -> Self {
        let n = program.class_count();
        let mut superclass = vec![None; n];
        let mut interfaces = vec![SmallVec::new(); n];
        let mut direct_subtypes: Vec<SmallVec<[ClassId; 4]>> = vec![SmallVec::new(); n];
        let mut incomplete = vec![false; n];

        for id in program.class_ids() {
            let class = program.class(id);
            if let Some(name) = &class.super_name {
                match program.class_by_name(name) {
                    Some(sup) => {
                        superclass[id.index()] = Some(sup);
                        direct_subtypes[sup.index()].push(id);
                    }
                    None => incomplete[id.index()] = true,
                }
            }
            for name in &class.interfaces {
                match program.class_by_name(name) {
                    Some(iface) => {
                        interfaces[id.index()].push(iface);
                        direct_subtypes[iface.index()].push(id);
                    }
                    None => incomplete[id.index()] = true,
                }
            }
        }

        let mut hierarchy = Self {
            superclass,
            interfaces,
            direct_subtypes,
            incomplete,
            group_of: Vec::new(),
            groups: Vec::new(),
        };
        hierarchy.compute_groups(program);

        tracing::debug!(
            classes = n,
            groups = hierarchy.groups.len(),
            "built class hierarchy"
        );

        hierarchy
    }

    #[inline]
    pub fn superclass(&self, class: ClassId) -> Option<ClassId> {
        self.superclass[class.index()]
    }

    #[inline]
    pub fn interfaces(&self, class: ClassId) -> &[ClassId] {
        &self.interfaces[class.index()]
    }

    /// Classes that directly extend or implement `class`.
    #[inline]
    pub fn direct_subtypes(&self, class: ClassId) -> &[ClassId] {
        &self.direct_subtypes[class.index()]
    }

    /// Whether some supertype of `class` (transitively) is missing.
    pub fn has_incomplete_supertypes(&self, class: ClassId) -> bool {
        self.supertypes(class)
            .into_iter()
            .any(|c| self.incomplete[c.index()])
    }

    /// The superclass chain above `class`, nearest first.
    pub fn superclasses(&self, class: ClassId) -> impl Iterator<Item = ClassId> + '_ {
        std::iter::successors(self.superclass(class), move |&c| self.superclass(c))
    }

    /// `class` and every class and interface above it.
    pub fn supertypes(&self, class: ClassId) -> Vec<ClassId> {
        let mut seen = FxHashSet::default();
        let mut order = Vec::new();
        let mut stack = vec![class];
        while let Some(c) = stack.pop() {
            if !seen.insert(c) {
                continue;
            }
            order.push(c);
            stack.extend(self.interfaces(c).iter().rev().copied());
            if let Some(sup) = self.superclass(c) {
                stack.push(sup);
            }
        }
        order
    }

    /// `class` and every class and interface below it.
    pub fn subtypes(&self, class: ClassId) -> Vec<ClassId> {
        let mut seen = FxHashSet::default();
        let mut order = Vec::new();
        let mut stack = vec![class];
        while let Some(c) = stack.pop() {
            if !seen.insert(c) {
                continue;
            }
            order.push(c);
            stack.extend(self.direct_subtypes(c).iter().copied());
        }
        order
    }

    pub fn is_subtype_of(&self, class: ClassId, ancestor: ClassId) -> bool {
        class == ancestor || self.supertypes(class).contains(&ancestor)
    }

    // ── Resolution ──────────────────────────────────────────────────

    /// Resolve a method reference the way the JVM does: the class and its
    /// superclasses first, then superinterfaces (non-abstract preferred).
    pub fn resolve_method(
        &self,
        program: &Program,
        class: ClassId,
        name: &str,
        descriptor: &str,
    ) -> Option<MethodId> {
        let found = std::iter::once(class)
            .chain(self.superclasses(class))
            .find_map(|c| program.declared_method(c, name, descriptor));
        if found.is_some() {
            return found;
        }

        let mut abstract_match = None;
        for c in self.supertypes(class) {
            if let Some(m) = program.declared_method(c, name, descriptor) {
                if !program.method(m).is_abstract() {
                    return Some(m);
                }
                abstract_match.get_or_insert(m);
            }
        }
        abstract_match
    }

    /// Resolve a field reference: the class, its superinterfaces, then its
    /// superclass, recursively.
    pub fn resolve_field(
        &self,
        program: &Program,
        class: ClassId,
        name: &str,
        descriptor: &str,
    ) -> Option<FieldId> {
        if let Some(f) = program.declared_field(class, name, descriptor) {
            return Some(f);
        }
        for &iface in self.interfaces(class) {
            if let Some(f) = self.resolve_field(program, iface, name, descriptor) {
                return Some(f);
            }
        }
        self.superclass(class)
            .and_then(|sup| self.resolve_field(program, sup, name, descriptor))
    }

    /// Resolve a field reference by its symbolic form.
    pub fn resolve_field_ref(&self, program: &Program, member: &MemberRef) -> Option<FieldId> {
        let class = program.class_by_name(&member.class)?;
        self.resolve_field(program, class, &member.name, &member.descriptor)
    }

    /// Resolve a method reference by its symbolic form.
    pub fn resolve_method_ref(&self, program: &Program, member: &MemberRef) -> Option<MethodId> {
        let class = program.class_by_name(&member.class)?;
        self.resolve_method(program, class, &member.name, &member.descriptor)
    }

    /// The concrete method a virtual call on an instance of exactly `class`
    /// executes, if any.
    pub fn lookup_virtual(
        &self,
        program: &Program,
        class: ClassId,
        name: &str,
        descriptor: &str,
    ) -> Option<MethodId> {
        for c in std::iter::once(class).chain(self.superclasses(class)) {
            if let Some(m) = program.declared_method(c, name, descriptor) {
                let method = program.method(m);
                if method.is_static() {
                    continue;
                }
                if !method.is_abstract() {
                    return Some(m);
                }
                break;
            }
        }
        // Default methods from superinterfaces.
        self.supertypes(class).into_iter().find_map(|c| {
            let m = program.declared_method(c, name, descriptor)?;
            let method = program.method(m);
            (program.class(c).is_interface() && !method.is_abstract() && !method.is_static())
                .then_some(m)
        })
    }

    /// All methods a call through `member` with dispatch `kind` may execute.
    pub fn call_targets(&self, program: &Program, kind: InvokeKind, member: &MemberRef) -> CallTargets {
        let Some(class) = program.class_by_name(&member.class) else {
            return CallTargets::Unknown;
        };
        let Some(resolved) = self.resolve_method(program, class, &member.name, &member.descriptor)
        else {
            return CallTargets::Unknown;
        };

        let method = program.method(resolved);
        let single = matches!(kind, InvokeKind::Static | InvokeKind::Special)
            || !method.is_virtual()
            || method.access.contains(MethodAccess::FINAL)
            || program.class(class).access.contains(ClassAccess::FINAL);
        if single {
            return CallTargets::Known(SmallVec::from_slice(&[resolved]));
        }

        let mut targets: SmallVec<[MethodId; 4]> = SmallVec::new();
        if !program.class(class).is_program() && !method.is_abstract() {
            // Library subclasses we cannot see may inherit this body.
            targets.push(resolved);
        }
        for sub in self.subtypes(class) {
            if program.class(sub).is_interface() {
                continue;
            }
            if let Some(m) = self.lookup_virtual(program, sub, &member.name, &member.descriptor) {
                if !targets.contains(&m) {
                    targets.push(m);
                }
            }
        }

        if targets.is_empty() {
            CallTargets::Unknown
        } else {
            CallTargets::Known(targets)
        }
    }

    // ── Overriding groups ───────────────────────────────────────────

    /// The overriding group of `method`; a singleton for non-virtual methods.
    #[inline]
    pub fn overriding_group(&self, method: MethodId) -> &[MethodId] {
        &self.groups[self.group_of[method.index()]]
    }

    /// Whether other methods can stand in for `method` under dispatch.
    #[inline]
    pub fn may_have_implementations(&self, method: MethodId) -> bool {
        self.overriding_group(method).len() > 1
    }

    fn compute_groups(&mut self, program: &Program) {
        let mut parent: Vec<usize> = (0..program.method_count()).collect();

        for class in program.class_ids() {
            let mut first: FxHashMap<(&str, &str), usize> = FxHashMap::default();
            for sup in self.supertypes(class) {
                for &m in &program.class(sup).methods {
                    let method = program.method(m);
                    if !method.is_virtual() {
                        continue;
                    }
                    let key = (method.name.as_str(), method.descriptor.as_str());
                    match first.get(&key) {
                        Some(&root) => union(&mut parent, root, m.index()),
                        None => {
                            first.insert(key, m.index());
                        }
                    }
                }
            }
        }

        let mut group_index: FxHashMap<usize, usize> = FxHashMap::default();
        let mut groups: Vec<SmallVec<[MethodId; 2]>> = Vec::new();
        let mut group_of = Vec::with_capacity(parent.len());
        for (i, m) in program.method_ids().enumerate() {
            let root = find(&mut parent, i);
            let g = *group_index.entry(root).or_insert_with(|| {
                groups.push(SmallVec::new());
                groups.len() - 1
            });
            groups[g].push(m);
            group_of.push(g);
        }

        self.group_of = group_of;
        self.groups = groups;
    }
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        parent[rb] = ra;
    }
}
