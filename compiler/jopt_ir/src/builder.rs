//! Programmatic construction of [`Program`]s.
//!
//! Used by embedders that already hold a decoded class model, and by tests.
//! Constant pool entries are interned on demand as instructions name them,
//! and branch targets are expressed with [`Label`]s resolved when the method
//! body is finished.
//!
//! ```
//! use jopt_ir::{MethodAccess, ProgramBuilder};
//!
//! let mut builder = ProgramBuilder::with_java_lang();
//! builder.class("app/Counter", |c| {
//!     c.field("count", "I", Default::default());
//!     c.method("bump", "()V", MethodAccess::PUBLIC, |code| {
//!         code.aload(0)
//!             .aload(0)
//!             .getfield("app/Counter", "count", "I")
//!             .iconst(1)
//!             .iadd()
//!             .putfield("app/Counter", "count", "I")
//!             .return_void();
//!     });
//! });
//! let program = builder.build().unwrap();
//! assert!(program.method_by_name("app/Counter", "bump", "()V").is_some());
//! ```

use crate::access::{ClassAccess, FieldAccess, MethodAccess};
use crate::code::{
    ArithOp, ArrayKind, BranchOp, Code, Condition, ConstantOp, ExceptionHandler, Instruction,
    NumKind, SimpleOp, StackOp, ValueKind, VariableOp,
};
use crate::constant::{Constant, ConstantPool, MemberRef, ReferenceKind};
use crate::descriptor::{FieldType, MethodDescriptor};
use crate::error::ProgramError;
use crate::program::{Class, ClassId, ClassKind, Field, Method, Program};
use crate::JAVA_LANG_OBJECT;

// ── Program ─────────────────────────────────────────────────────────

/// Accumulates classes into a [`Program`].
///
/// The first structural error is remembered and reported by
/// [`build`](Self::build); later calls are still accepted so construction
/// code can stay linear.
#[derive(Default)]
pub struct ProgramBuilder {
    program: Program,
    error: Option<ProgramError>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder preloaded with the `java/lang` library classes most code
    /// references: `Object`, `String`, `Class`, `Enum`, and the common
    /// throwables.
    pub fn with_java_lang() -> Self {
        let mut builder = Self::new();
        let public = MethodAccess::PUBLIC;
        builder
            .library_class(JAVA_LANG_OBJECT, |c| {
                c.access(ClassAccess::PUBLIC)
                    .declare_method("<init>", "()V", public)
                    .declare_method("hashCode", "()I", public | MethodAccess::NATIVE)
                    .declare_method("equals", "(Ljava/lang/Object;)Z", public)
                    .declare_method("toString", "()Ljava/lang/String;", public)
                    .declare_method(
                        "getClass",
                        "()Ljava/lang/Class;",
                        public | MethodAccess::FINAL | MethodAccess::NATIVE,
                    );
            })
            .library_class("java/lang/String", |c| {
                c.access(ClassAccess::PUBLIC | ClassAccess::FINAL)
                    .declare_method("length", "()I", public)
                    .declare_method("equals", "(Ljava/lang/Object;)Z", public);
            })
            .library_class("java/lang/Class", |c| {
                c.access(ClassAccess::PUBLIC | ClassAccess::FINAL)
                    .declare_method("getName", "()Ljava/lang/String;", public);
            })
            .library_class("java/lang/Enum", |c| {
                c.access(ClassAccess::PUBLIC | ClassAccess::ABSTRACT)
                    .declare_method("<init>", "(Ljava/lang/String;I)V", MethodAccess::PROTECTED)
                    .declare_method("ordinal", "()I", public | MethodAccess::FINAL);
            })
            .library_class("java/lang/Throwable", |c| {
                c.access(ClassAccess::PUBLIC)
                    .declare_method("<init>", "()V", public)
                    .declare_method("getMessage", "()Ljava/lang/String;", public);
            })
            .library_class("java/lang/Exception", |c| {
                c.access(ClassAccess::PUBLIC)
                    .extends("java/lang/Throwable")
                    .declare_method("<init>", "()V", public);
            })
            .library_class("java/lang/RuntimeException", |c| {
                c.access(ClassAccess::PUBLIC)
                    .extends("java/lang/Exception")
                    .declare_method("<init>", "()V", public);
            });
        builder
    }

    /// Add a program class (method bodies allowed).
    pub fn class(&mut self, name: &str, build: impl FnOnce(&mut ClassBuilder<'_>)) -> &mut Self {
        self.add_class(name, ClassKind::Program, build)
    }

    /// Add a library class (signatures only).
    pub fn library_class(
        &mut self,
        name: &str,
        build: impl FnOnce(&mut ClassBuilder<'_>),
    ) -> &mut Self {
        self.add_class(name, ClassKind::Library, build)
    }

    pub fn build(self) -> Result<Program, ProgramError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.program),
        }
    }

    fn add_class(
        &mut self,
        name: &str,
        kind: ClassKind,
        build: impl FnOnce(&mut ClassBuilder<'_>),
    ) -> &mut Self {
        if self.program.contains_class(name) {
            record(&mut self.error, ProgramError::DuplicateClass(name.to_owned()));
            return self;
        }
        let id = self.program.push_class(Class {
            name: name.to_owned(),
            kind,
            access: ClassAccess::PUBLIC | ClassAccess::SUPER,
            super_name: (name != JAVA_LANG_OBJECT).then(|| JAVA_LANG_OBJECT.to_owned()),
            interfaces: Vec::new(),
            constant_pool: ConstantPool::new(),
            methods: Vec::new(),
            fields: Vec::new(),
        });
        let mut class = ClassBuilder {
            program: &mut self.program,
            error: &mut self.error,
            id,
        };
        build(&mut class);
        self
    }
}

fn record(slot: &mut Option<ProgramError>, error: ProgramError) {
    if slot.is_none() {
        *slot = Some(error);
    }
}

// ── Classes ─────────────────────────────────────────────────────────

/// Adds members to one class. Obtained from [`ProgramBuilder::class`].
pub struct ClassBuilder<'p> {
    program: &'p mut Program,
    error: &'p mut Option<ProgramError>,
    id: ClassId,
}

impl ClassBuilder<'_> {
    #[inline]
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Replace the access flags (default: `PUBLIC | SUPER`).
    pub fn access(&mut self, access: ClassAccess) -> &mut Self {
        self.class_mut().access = access;
        self
    }

    pub fn extends(&mut self, super_name: &str) -> &mut Self {
        self.class_mut().super_name = Some(super_name.to_owned());
        self
    }

    pub fn implements(&mut self, interface: &str) -> &mut Self {
        self.class_mut().interfaces.push(interface.to_owned());
        self
    }

    pub fn field(&mut self, name: &str, descriptor: &str, access: FieldAccess) -> &mut Self {
        self.add_field(name, descriptor, access, None)
    }

    /// A static field with a `ConstantValue` attribute.
    pub fn constant_field(
        &mut self,
        name: &str,
        descriptor: &str,
        access: FieldAccess,
        value: Constant,
    ) -> &mut Self {
        self.add_field(name, descriptor, access, Some(value))
    }

    /// A method without a body: abstract, native, or any library method.
    pub fn declare_method(&mut self, name: &str, descriptor: &str, access: MethodAccess) -> &mut Self {
        self.add_method::<fn(&mut CodeBuilder<'_>)>(name, descriptor, access, None)
    }

    /// A method with a body produced by `build`.
    pub fn method(
        &mut self,
        name: &str,
        descriptor: &str,
        access: MethodAccess,
        build: impl FnOnce(&mut CodeBuilder<'_>),
    ) -> &mut Self {
        self.add_method(name, descriptor, access, Some(build))
    }

    fn class_mut(&mut self) -> &mut Class {
        self.program.class_mut(self.id)
    }

    fn class_name(&self) -> String {
        self.program.class(self.id).name.clone()
    }

    fn add_field(
        &mut self,
        name: &str,
        descriptor: &str,
        access: FieldAccess,
        value: Option<Constant>,
    ) -> &mut Self {
        let ty = match FieldType::parse(descriptor) {
            Ok(ty) => ty,
            Err(e) => {
                record(self.error, e);
                return self;
            }
        };
        if self.program.declared_field(self.id, name, descriptor).is_some() {
            let class = self.class_name();
            record(
                self.error,
                ProgramError::DuplicateMember {
                    class,
                    name: name.to_owned(),
                    descriptor: descriptor.to_owned(),
                },
            );
            return self;
        }
        let constant_value = value.map(|v| self.class_mut().constant_pool.intern(v));
        self.program.push_field(Field {
            class: self.id,
            name: name.to_owned(),
            descriptor: descriptor.to_owned(),
            ty,
            access,
            constant_value,
        });
        self
    }

    fn add_method<F>(
        &mut self,
        name: &str,
        descriptor: &str,
        access: MethodAccess,
        build: Option<F>,
    ) -> &mut Self
    where
        F: FnOnce(&mut CodeBuilder<'_>),
    {
        let signature = match MethodDescriptor::parse(descriptor) {
            Ok(sig) => sig,
            Err(e) => {
                record(self.error, e);
                return self;
            }
        };
        let class_name = self.class_name();
        if self.program.declared_method(self.id, name, descriptor).is_some() {
            record(
                self.error,
                ProgramError::DuplicateMember {
                    class: class_name,
                    name: name.to_owned(),
                    descriptor: descriptor.to_owned(),
                },
            );
            return self;
        }

        let code = match build {
            None => None,
            Some(build) => {
                let reason = if !self.program.class(self.id).is_program() {
                    Some("has a body but belongs to a library class")
                } else if access.intersects(MethodAccess::ABSTRACT | MethodAccess::NATIVE) {
                    Some("is abstract or native but has a body")
                } else {
                    None
                };
                if let Some(reason) = reason {
                    record(
                        self.error,
                        ProgramError::InvalidBody {
                            class: class_name,
                            method: name.to_owned(),
                            reason,
                        },
                    );
                    return self;
                }

                let receiver = u16::from(!access.contains(MethodAccess::STATIC));
                let param_slots = signature.param_slots().saturating_add(receiver);
                let mut code = CodeBuilder::new(&mut self.class_mut().constant_pool, param_slots);
                build(&mut code);
                match code.finish(&class_name, name) {
                    Ok(code) => Some(code),
                    Err(e) => {
                        record(self.error, e);
                        return self;
                    }
                }
            }
        };

        self.program.push_method(Method {
            class: self.id,
            name: name.to_owned(),
            descriptor: descriptor.to_owned(),
            signature,
            access,
            code,
        });
        self
    }
}

// ── Code ────────────────────────────────────────────────────────────

/// A branch target placeholder, bound to an offset with [`CodeBuilder::bind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Label(usize);

struct PendingHandler {
    start: Label,
    end: Label,
    handler: Label,
    catch_type: Option<String>,
}

/// Appends instructions to one method body.
///
/// Branch and switch instructions emitted through the builder hold label
/// numbers until [`finish`](Self::finish) rewrites them into offsets.
pub struct CodeBuilder<'p> {
    pool: &'p mut ConstantPool,
    instructions: Vec<Instruction>,
    labels: Vec<Option<usize>>,
    /// Offsets of instructions whose targets are label numbers.
    fixups: Vec<usize>,
    handlers: Vec<PendingHandler>,
    max_locals: u16,
}

impl<'p> CodeBuilder<'p> {
    fn new(pool: &'p mut ConstantPool, param_slots: u16) -> Self {
        Self {
            pool,
            instructions: Vec::new(),
            labels: Vec::new(),
            fixups: Vec::new(),
            handlers: Vec::new(),
            max_locals: param_slots,
        }
    }

    /// Offset the next instruction will get.
    #[inline]
    pub fn offset(&self) -> usize {
        self.instructions.len()
    }

    pub fn label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Bind `label` to the next instruction's offset.
    pub fn bind(&mut self, label: Label) -> &mut Self {
        self.labels[label.0] = Some(self.instructions.len());
        self
    }

    /// Append a raw instruction. Branch targets must already be offsets.
    pub fn instruction(&mut self, instruction: Instruction) -> &mut Self {
        if let Instruction::Variable { op, slot } = &instruction {
            let size = match op {
                VariableOp::Load(kind) | VariableOp::Store(kind) => kind.slot_size(),
                VariableOp::Iinc(_) => 1,
            };
            self.max_locals = self.max_locals.max(slot.saturating_add(size));
        }
        self.instructions.push(instruction);
        self
    }

    /// Register an exception handler covering `start..end`.
    pub fn try_catch(
        &mut self,
        start: Label,
        end: Label,
        handler: Label,
        catch_type: Option<&str>,
    ) -> &mut Self {
        self.handlers.push(PendingHandler {
            start,
            end,
            handler,
            catch_type: catch_type.map(str::to_owned),
        });
        self
    }

    // ── Shapes ──────────────────────────────────────────────────────

    pub fn simple(&mut self, op: SimpleOp) -> &mut Self {
        self.instruction(Instruction::Simple(op))
    }

    pub fn variable(&mut self, op: VariableOp, slot: u16) -> &mut Self {
        self.instruction(Instruction::Variable { op, slot })
    }

    pub fn constant(&mut self, op: ConstantOp, constant: Constant) -> &mut Self {
        let index = self.pool.intern(constant);
        self.instruction(Instruction::Constant { op, index })
    }

    pub fn branch(&mut self, op: BranchOp, target: Label) -> &mut Self {
        self.fixups.push(self.instructions.len());
        self.instructions.push(Instruction::Branch {
            op,
            target: target.0,
        });
        self
    }

    pub fn switch(&mut self, default: Label, cases: &[(i32, Label)]) -> &mut Self {
        self.fixups.push(self.instructions.len());
        self.instructions.push(Instruction::Switch {
            default: default.0,
            cases: cases.iter().map(|&(key, label)| (key, label.0)).collect(),
        });
        self
    }

    // ── Constants ───────────────────────────────────────────────────

    pub fn nop(&mut self) -> &mut Self {
        self.simple(SimpleOp::Nop)
    }

    pub fn aconst_null(&mut self) -> &mut Self {
        self.simple(SimpleOp::PushNull)
    }

    pub fn iconst(&mut self, value: i32) -> &mut Self {
        self.simple(SimpleOp::PushInt(value))
    }

    pub fn lconst(&mut self, value: i64) -> &mut Self {
        self.simple(SimpleOp::PushLong(value))
    }

    pub fn dconst(&mut self, value: f64) -> &mut Self {
        self.simple(SimpleOp::PushDouble(value.to_bits()))
    }

    pub fn ldc(&mut self, constant: Constant) -> &mut Self {
        self.constant(ConstantOp::Ldc, constant)
    }

    pub fn ldc_string(&mut self, value: &str) -> &mut Self {
        self.ldc(Constant::String(value.to_owned()))
    }

    /// `ldc` of a class literal (`Foo.class`).
    pub fn ldc_class(&mut self, class: &str) -> &mut Self {
        self.ldc(Constant::Class(class.to_owned()))
    }

    /// `ldc` of a method handle to a field or method.
    pub fn ldc_method_handle(
        &mut self,
        kind: ReferenceKind,
        class: &str,
        name: &str,
        descriptor: &str,
    ) -> &mut Self {
        let member = member_ref(class, name, descriptor);
        let reference = self.pool.intern(if kind.is_field() {
            Constant::FieldRef(member)
        } else {
            Constant::MethodRef(member)
        });
        self.ldc(Constant::MethodHandle { kind, reference })
    }

    // ── Locals ──────────────────────────────────────────────────────

    pub fn load(&mut self, kind: ValueKind, slot: u16) -> &mut Self {
        self.variable(VariableOp::Load(kind), slot)
    }

    pub fn store(&mut self, kind: ValueKind, slot: u16) -> &mut Self {
        self.variable(VariableOp::Store(kind), slot)
    }

    pub fn iload(&mut self, slot: u16) -> &mut Self {
        self.load(ValueKind::Int, slot)
    }

    pub fn lload(&mut self, slot: u16) -> &mut Self {
        self.load(ValueKind::Long, slot)
    }

    pub fn aload(&mut self, slot: u16) -> &mut Self {
        self.load(ValueKind::Reference, slot)
    }

    pub fn istore(&mut self, slot: u16) -> &mut Self {
        self.store(ValueKind::Int, slot)
    }

    pub fn lstore(&mut self, slot: u16) -> &mut Self {
        self.store(ValueKind::Long, slot)
    }

    pub fn astore(&mut self, slot: u16) -> &mut Self {
        self.store(ValueKind::Reference, slot)
    }

    pub fn iinc(&mut self, slot: u16, delta: i16) -> &mut Self {
        self.variable(VariableOp::Iinc(delta), slot)
    }

    // ── Stack and arithmetic ────────────────────────────────────────

    pub fn stack(&mut self, op: StackOp) -> &mut Self {
        self.simple(SimpleOp::Stack(op))
    }

    pub fn pop(&mut self) -> &mut Self {
        self.stack(StackOp::Pop)
    }

    pub fn pop2(&mut self) -> &mut Self {
        self.stack(StackOp::Pop2)
    }

    pub fn dup(&mut self) -> &mut Self {
        self.stack(StackOp::Dup)
    }

    pub fn dup_x1(&mut self) -> &mut Self {
        self.stack(StackOp::DupX1)
    }

    pub fn swap(&mut self) -> &mut Self {
        self.stack(StackOp::Swap)
    }

    pub fn arith(&mut self, op: ArithOp, kind: NumKind) -> &mut Self {
        self.simple(SimpleOp::Arith(op, kind))
    }

    pub fn iadd(&mut self) -> &mut Self {
        self.arith(ArithOp::Add, NumKind::Int)
    }

    pub fn idiv(&mut self) -> &mut Self {
        self.arith(ArithOp::Div, NumKind::Int)
    }

    pub fn ladd(&mut self) -> &mut Self {
        self.arith(ArithOp::Add, NumKind::Long)
    }

    pub fn convert(&mut self, from: NumKind, to: NumKind) -> &mut Self {
        self.simple(SimpleOp::Convert { from, to })
    }

    // ── Arrays ──────────────────────────────────────────────────────

    pub fn array_load(&mut self, kind: ArrayKind) -> &mut Self {
        self.simple(SimpleOp::ArrayLoad(kind))
    }

    pub fn array_store(&mut self, kind: ArrayKind) -> &mut Self {
        self.simple(SimpleOp::ArrayStore(kind))
    }

    pub fn arraylength(&mut self) -> &mut Self {
        self.simple(SimpleOp::ArrayLength)
    }

    /// `newarray` of a primitive element kind.
    pub fn newarray(&mut self, kind: ArrayKind) -> &mut Self {
        self.simple(SimpleOp::NewArray(kind))
    }

    pub fn anewarray(&mut self, class: &str) -> &mut Self {
        self.constant(ConstantOp::ANewArray, Constant::Class(class.to_owned()))
    }

    // ── Objects and fields ──────────────────────────────────────────

    /// `new`: allocate an uninitialized instance of `class`.
    pub fn new_instance(&mut self, class: &str) -> &mut Self {
        self.constant(ConstantOp::New, Constant::Class(class.to_owned()))
    }

    pub fn checkcast(&mut self, class: &str) -> &mut Self {
        self.constant(ConstantOp::CheckCast, Constant::Class(class.to_owned()))
    }

    pub fn instanceof(&mut self, class: &str) -> &mut Self {
        self.constant(ConstantOp::InstanceOf, Constant::Class(class.to_owned()))
    }

    pub fn getstatic(&mut self, class: &str, name: &str, descriptor: &str) -> &mut Self {
        self.field_op(ConstantOp::GetStatic, class, name, descriptor)
    }

    pub fn putstatic(&mut self, class: &str, name: &str, descriptor: &str) -> &mut Self {
        self.field_op(ConstantOp::PutStatic, class, name, descriptor)
    }

    pub fn getfield(&mut self, class: &str, name: &str, descriptor: &str) -> &mut Self {
        self.field_op(ConstantOp::GetField, class, name, descriptor)
    }

    pub fn putfield(&mut self, class: &str, name: &str, descriptor: &str) -> &mut Self {
        self.field_op(ConstantOp::PutField, class, name, descriptor)
    }

    fn field_op(&mut self, op: ConstantOp, class: &str, name: &str, descriptor: &str) -> &mut Self {
        self.constant(op, Constant::FieldRef(member_ref(class, name, descriptor)))
    }

    // ── Calls ───────────────────────────────────────────────────────

    pub fn invokevirtual(&mut self, class: &str, name: &str, descriptor: &str) -> &mut Self {
        let member = Constant::MethodRef(member_ref(class, name, descriptor));
        self.constant(ConstantOp::InvokeVirtual, member)
    }

    pub fn invokespecial(&mut self, class: &str, name: &str, descriptor: &str) -> &mut Self {
        let member = Constant::MethodRef(member_ref(class, name, descriptor));
        self.constant(ConstantOp::InvokeSpecial, member)
    }

    pub fn invokestatic(&mut self, class: &str, name: &str, descriptor: &str) -> &mut Self {
        let member = Constant::MethodRef(member_ref(class, name, descriptor));
        self.constant(ConstantOp::InvokeStatic, member)
    }

    pub fn invokeinterface(&mut self, class: &str, name: &str, descriptor: &str) -> &mut Self {
        let member = Constant::InterfaceMethodRef(member_ref(class, name, descriptor));
        self.constant(ConstantOp::InvokeInterface, member)
    }

    pub fn invokedynamic(&mut self, name: &str, descriptor: &str) -> &mut Self {
        let site = Constant::InvokeDynamic {
            bootstrap: 0,
            name: name.to_owned(),
            descriptor: descriptor.to_owned(),
        };
        self.constant(ConstantOp::InvokeDynamic, site)
    }

    // ── Control flow ────────────────────────────────────────────────

    /// Compare the int on top of the stack against zero.
    pub fn if_(&mut self, condition: Condition, target: Label) -> &mut Self {
        self.branch(BranchOp::If(condition), target)
    }

    pub fn if_icmp(&mut self, condition: Condition, target: Label) -> &mut Self {
        self.branch(BranchOp::IfICmp(condition), target)
    }

    pub fn ifnull(&mut self, target: Label) -> &mut Self {
        self.branch(BranchOp::IfNull, target)
    }

    pub fn ifnonnull(&mut self, target: Label) -> &mut Self {
        self.branch(BranchOp::IfNonNull, target)
    }

    pub fn goto(&mut self, target: Label) -> &mut Self {
        self.branch(BranchOp::Goto, target)
    }

    pub fn athrow(&mut self) -> &mut Self {
        self.simple(SimpleOp::Throw)
    }

    pub fn monitorenter(&mut self) -> &mut Self {
        self.simple(SimpleOp::MonitorEnter)
    }

    pub fn monitorexit(&mut self) -> &mut Self {
        self.simple(SimpleOp::MonitorExit)
    }

    pub fn return_void(&mut self) -> &mut Self {
        self.simple(SimpleOp::Return(None))
    }

    pub fn return_value(&mut self, kind: ValueKind) -> &mut Self {
        self.simple(SimpleOp::Return(Some(kind)))
    }

    pub fn ireturn(&mut self) -> &mut Self {
        self.return_value(ValueKind::Int)
    }

    pub fn areturn(&mut self) -> &mut Self {
        self.return_value(ValueKind::Reference)
    }

    // ── Finishing ───────────────────────────────────────────────────

    fn finish(self, class: &str, method: &str) -> Result<Code, ProgramError> {
        let Self {
            pool,
            mut instructions,
            labels,
            fixups,
            handlers,
            max_locals,
        } = self;
        let len = instructions.len();

        let resolve = |label: usize| -> Result<usize, ProgramError> {
            match labels.get(label).copied().flatten() {
                Some(offset) => Ok(offset),
                None => Err(ProgramError::UnboundLabel {
                    class: class.to_owned(),
                    method: method.to_owned(),
                    label,
                }),
            }
        };

        for offset in fixups {
            match &mut instructions[offset] {
                Instruction::Branch { target, .. } => *target = resolve(*target)?,
                Instruction::Switch { default, cases } => {
                    *default = resolve(*default)?;
                    for (_, target) in cases.iter_mut() {
                        *target = resolve(*target)?;
                    }
                }
                _ => {}
            }
        }

        let out_of_range = |offset: usize| ProgramError::OffsetOutOfRange {
            class: class.to_owned(),
            method: method.to_owned(),
            offset,
            len,
        };
        for instruction in &instructions {
            for target in instruction.branch_targets() {
                if target >= len {
                    return Err(out_of_range(target));
                }
            }
        }

        let mut exception_table = Vec::with_capacity(handlers.len());
        for pending in handlers {
            let start = resolve(pending.start.0)?;
            let end = resolve(pending.end.0)?;
            let handler = resolve(pending.handler.0)?;
            if start > end || end > len {
                return Err(out_of_range(end));
            }
            if handler >= len {
                return Err(out_of_range(handler));
            }
            let catch_type = pending.catch_type.map(|name| pool.intern(Constant::Class(name)));
            exception_table.push(ExceptionHandler {
                start,
                end,
                handler,
                catch_type,
            });
        }

        Ok(Code {
            max_locals,
            instructions,
            exception_table,
        })
    }
}

fn member_ref(class: &str, name: &str, descriptor: &str) -> MemberRef {
    MemberRef {
        class: class.to_owned(),
        name: name.to_owned(),
        descriptor: descriptor.to_owned(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests panic on unexpected state")]
mod tests;
