//! Method bodies: instructions and exception tables.
//!
//! # Architecture
//!
//! Instructions form a closed tagged union of five shapes, following the way
//! bytecode operands are laid out:
//!
//! - **[`Instruction::Simple`]**: opcode only (or an inline immediate)
//! - **[`Instruction::Variable`]**: local variable slot operand
//! - **[`Instruction::Constant`]**: constant pool operand
//! - **[`Instruction::Branch`]**: single jump target
//! - **[`Instruction::Switch`]**: multi-way jump
//!
//! An **offset** is an index into [`Code::instructions`]. Branch targets and
//! exception table ranges are expressed in offsets. Subroutines (`jsr`/`ret`)
//! are not modeled; loaders inline them before handing code over.

use smallvec::{smallvec, SmallVec};

use crate::constant::CpIndex;

// ── Value and operand kinds ─────────────────────────────────────────

/// Computational kind of a value on the operand stack or in a local.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueKind {
    Int,
    Long,
    Float,
    Double,
    Reference,
}

impl ValueKind {
    /// Long and double values take two stack/local slots.
    #[inline]
    pub fn is_category2(self) -> bool {
        matches!(self, ValueKind::Long | ValueKind::Double)
    }

    #[inline]
    pub fn slot_size(self) -> u16 {
        if self.is_category2() {
            2
        } else {
            1
        }
    }
}

/// Numeric kind of an arithmetic or conversion operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum NumKind {
    Int,
    Long,
    Float,
    Double,
}

impl NumKind {
    #[inline]
    pub fn value_kind(self) -> ValueKind {
        match self {
            NumKind::Int => ValueKind::Int,
            NumKind::Long => ValueKind::Long,
            NumKind::Float => ValueKind::Float,
            NumKind::Double => ValueKind::Double,
        }
    }

    /// Integral division and remainder throw on a zero divisor.
    #[inline]
    pub fn is_integral(self) -> bool {
        matches!(self, NumKind::Int | NumKind::Long)
    }
}

/// Element kind of an array access or primitive array creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum ArrayKind {
    Int,
    Long,
    Float,
    Double,
    Reference,
    /// `byte[]` and `boolean[]` share `baload`/`bastore`.
    Byte,
    Char,
    Short,
}

impl ArrayKind {
    /// Kind of the value an element load pushes.
    #[inline]
    pub fn element_kind(self) -> ValueKind {
        match self {
            ArrayKind::Long => ValueKind::Long,
            ArrayKind::Float => ValueKind::Float,
            ArrayKind::Double => ValueKind::Double,
            ArrayKind::Reference => ValueKind::Reference,
            ArrayKind::Int | ArrayKind::Byte | ArrayKind::Char | ArrayKind::Short => {
                ValueKind::Int
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    Ushr,
    And,
    Or,
    Xor,
}

impl ArithOp {
    /// Shifts take an int shift distance regardless of the value kind.
    #[inline]
    pub fn is_shift(self) -> bool {
        matches!(self, ArithOp::Shl | ArithOp::Shr | ArithOp::Ushr)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum CompareOp {
    Lcmp,
    Fcmpl,
    Fcmpg,
    Dcmpl,
    Dcmpg,
}

impl CompareOp {
    /// Kind of both operands.
    #[inline]
    pub fn operand_kind(self) -> ValueKind {
        match self {
            CompareOp::Lcmp => ValueKind::Long,
            CompareOp::Fcmpl | CompareOp::Fcmpg => ValueKind::Float,
            CompareOp::Dcmpl | CompareOp::Dcmpg => ValueKind::Double,
        }
    }
}

/// Untyped operand stack manipulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum StackOp {
    Pop,
    Pop2,
    Dup,
    DupX1,
    DupX2,
    Dup2,
    Dup2X1,
    Dup2X2,
    Swap,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Condition {
    Eq,
    Ne,
    Lt,
    Ge,
    Gt,
    Le,
}

// ── Opcodes by shape ────────────────────────────────────────────────

/// Instructions without a pool, slot, or branch operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum SimpleOp {
    Nop,
    PushNull,
    /// `iconst_*`, `bipush`, `sipush`.
    PushInt(i32),
    PushLong(i64),
    /// Raw IEEE-754 bits.
    PushFloat(u32),
    /// Raw IEEE-754 bits.
    PushDouble(u64),
    ArrayLoad(ArrayKind),
    ArrayStore(ArrayKind),
    Stack(StackOp),
    Arith(ArithOp, NumKind),
    Neg(NumKind),
    /// Numeric conversion; `i2b`/`i2c`/`i2s` are `Int -> Int`.
    Convert { from: NumKind, to: NumKind },
    Compare(CompareOp),
    /// `None` for `return`.
    Return(Option<ValueKind>),
    ArrayLength,
    Throw,
    MonitorEnter,
    MonitorExit,
    /// `newarray` of a primitive element kind.
    NewArray(ArrayKind),
}

/// Instructions with a local variable slot operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum VariableOp {
    Load(ValueKind),
    Store(ValueKind),
    Iinc(i16),
}

/// Instructions with a constant pool operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstantOp {
    /// `ldc`, `ldc_w`, `ldc2_w`.
    Ldc,
    GetStatic,
    PutStatic,
    GetField,
    PutField,
    InvokeVirtual,
    InvokeSpecial,
    InvokeStatic,
    InvokeInterface,
    InvokeDynamic,
    New,
    ANewArray,
    CheckCast,
    InstanceOf,
    /// Dimension count.
    MultiANewArray(u8),
}

impl ConstantOp {
    /// Calls through a method reference (not `invokedynamic`).
    #[inline]
    pub fn is_method_invocation(self) -> bool {
        matches!(
            self,
            ConstantOp::InvokeVirtual
                | ConstantOp::InvokeSpecial
                | ConstantOp::InvokeStatic
                | ConstantOp::InvokeInterface
        )
    }

    #[inline]
    pub fn is_invocation(self) -> bool {
        self.is_method_invocation() || self == ConstantOp::InvokeDynamic
    }

    #[inline]
    pub fn is_field_access(self) -> bool {
        matches!(
            self,
            ConstantOp::GetStatic | ConstantOp::PutStatic | ConstantOp::GetField | ConstantOp::PutField
        )
    }

    #[inline]
    pub fn is_field_store(self) -> bool {
        matches!(self, ConstantOp::PutStatic | ConstantOp::PutField)
    }
}

/// Instructions with a single jump target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum BranchOp {
    /// Compare an int against zero.
    If(Condition),
    /// Compare two ints.
    IfICmp(Condition),
    IfACmpEq,
    IfACmpNe,
    IfNull,
    IfNonNull,
    Goto,
}

// ── Instructions ────────────────────────────────────────────────────

/// A single bytecode instruction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Instruction {
    Simple(SimpleOp),
    Variable { op: VariableOp, slot: u16 },
    Constant { op: ConstantOp, index: CpIndex },
    Branch { op: BranchOp, target: usize },
    Switch { default: usize, cases: Vec<(i32, usize)> },
}

impl Instruction {
    /// Whether control can continue at `offset + 1`.
    pub fn falls_through(&self) -> bool {
        match self {
            Instruction::Simple(SimpleOp::Return(_) | SimpleOp::Throw)
            | Instruction::Branch {
                op: BranchOp::Goto,
                ..
            }
            | Instruction::Switch { .. } => false,
            _ => true,
        }
    }

    /// Explicit jump targets (fall-through excluded).
    pub fn branch_targets(&self) -> SmallVec<[usize; 2]> {
        match self {
            Instruction::Branch { target, .. } => smallvec![*target],
            Instruction::Switch { default, cases } => {
                let mut targets: SmallVec<[usize; 2]> = smallvec![*default];
                targets.extend(cases.iter().map(|&(_, t)| t));
                targets
            }
            _ => SmallVec::new(),
        }
    }

    /// Normal-flow successors of the instruction at `offset`.
    pub fn successors(&self, offset: usize) -> SmallVec<[usize; 2]> {
        let mut succs = self.branch_targets();
        if self.falls_through() {
            succs.push(offset + 1);
        }
        succs
    }

    #[inline]
    pub fn is_return(&self) -> bool {
        matches!(self, Instruction::Simple(SimpleOp::Return(_)))
    }

    /// The constant pool operand of a constant instruction.
    #[inline]
    pub fn constant_operand(&self) -> Option<(ConstantOp, CpIndex)> {
        match self {
            Instruction::Constant { op, index } => Some((*op, *index)),
            _ => None,
        }
    }
}

// ── Exception table ─────────────────────────────────────────────────

/// One exception table entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct ExceptionHandler {
    /// First covered offset.
    pub start: usize,
    /// First offset past the covered range.
    pub end: usize,
    /// Offset of the handler's first instruction.
    pub handler: usize,
    /// Caught class; `None` catches everything (`finally`).
    pub catch_type: Option<CpIndex>,
}

impl ExceptionHandler {
    #[inline]
    pub fn covers(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

// ── Code ────────────────────────────────────────────────────────────

/// A method body.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct Code {
    /// Number of local variable slots, parameters included.
    pub max_locals: u16,
    pub instructions: Vec<Instruction>,
    pub exception_table: Vec<ExceptionHandler>,
}

impl Code {
    #[inline]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    #[inline]
    pub fn instruction(&self, offset: usize) -> Option<&Instruction> {
        self.instructions.get(offset)
    }

    /// Handlers whose range covers `offset`, in table order.
    pub fn handlers_covering(&self, offset: usize) -> impl Iterator<Item = &ExceptionHandler> {
        self.exception_table.iter().filter(move |h| h.covers(offset))
    }
}

#[cfg(test)]
mod tests;
