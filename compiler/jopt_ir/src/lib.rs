//! Program model for the jopt bytecode optimizer.
//!
//! This crate provides the read-only structural view of a loaded program that
//! every analysis in `jopt_eval` and `jopt_facts` traverses:
//!
//! - **Entities** ([`Program`], [`Class`], [`Method`], [`Field`]): arena-owned
//!   and addressed by [`ClassId`], [`MethodId`], [`FieldId`].
//!
//! - **Code** ([`Code`], [`Instruction`], [`ExceptionHandler`]): a closed set of
//!   five instruction shapes. Offsets are instruction indices.
//!
//! - **Constant pools** ([`ConstantPool`], [`Constant`], [`MemberRef`]): the
//!   symbolic references instructions resolve through.
//!
//! - **Hierarchy** ([`ClassHierarchy`]): supertypes, subtypes, member
//!   resolution, and the conservative set of call targets for a call site.
//!
//! - **Builders** ([`ProgramBuilder`]): assemble programs in code.
//!
//! # Crate Dependencies
//!
//! None internal. Parsing and writing binary class files is the job of an
//! upstream loader; this crate only models what such a loader produces.

mod access;
mod builder;
mod code;
mod constant;
mod descriptor;
mod error;
mod hierarchy;
mod program;

pub use access::{ClassAccess, FieldAccess, MethodAccess, Visibility};
pub use builder::{ClassBuilder, CodeBuilder, Label, ProgramBuilder};
pub use code::{
    ArithOp, ArrayKind, BranchOp, Code, CompareOp, Condition, ConstantOp, ExceptionHandler,
    Instruction, NumKind, SimpleOp, StackOp, ValueKind, VariableOp,
};
pub use constant::{Constant, ConstantPool, CpIndex, MemberRef, ReferenceKind};
pub use descriptor::{BaseType, FieldType, MethodDescriptor};
pub use error::ProgramError;
pub use hierarchy::{CallTargets, ClassHierarchy, InvokeKind};
pub use program::{
    Class, ClassId, ClassKind, Field, FieldId, Method, MethodId, Parameter, Program,
};

/// Name of the root class every other class extends.
pub const JAVA_LANG_OBJECT: &str = "java/lang/Object";

/// Name of instance initializer methods.
pub const INIT: &str = "<init>";

/// Name of the class initializer method.
pub const CLINIT: &str = "<clinit>";
