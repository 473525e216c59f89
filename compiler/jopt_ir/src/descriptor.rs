//! Field and method descriptors.
//!
//! Descriptors are parsed once when a member is added to a program; call
//! sites parse the descriptor of the member reference they name.

use crate::code::ValueKind;
use crate::error::ProgramError;

/// A primitive field type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

/// The type of a field, parameter, or return value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldType {
    Base(BaseType),
    /// A class or interface, by internal name.
    Object(String),
    Array(Box<FieldType>),
}

impl FieldType {
    /// Parse a complete field descriptor such as `I` or `[Ljava/lang/String;`.
    pub fn parse(descriptor: &str) -> Result<Self, ProgramError> {
        let (ty, rest) = parse_field_type(descriptor, descriptor)?;
        if rest.is_empty() {
            Ok(ty)
        } else {
            Err(malformed(descriptor, "trailing characters"))
        }
    }

    #[inline]
    pub fn is_reference(&self) -> bool {
        matches!(self, FieldType::Object(_) | FieldType::Array(_))
    }

    /// Long and double values take two local variable slots.
    #[inline]
    pub fn is_category2(&self) -> bool {
        matches!(self, FieldType::Base(BaseType::Long | BaseType::Double))
    }

    #[inline]
    pub fn slot_size(&self) -> u16 {
        if self.is_category2() {
            2
        } else {
            1
        }
    }

    /// The computational kind the JVM uses for values of this type.
    pub fn value_kind(&self) -> ValueKind {
        match self {
            FieldType::Base(BaseType::Long) => ValueKind::Long,
            FieldType::Base(BaseType::Float) => ValueKind::Float,
            FieldType::Base(BaseType::Double) => ValueKind::Double,
            FieldType::Base(_) => ValueKind::Int,
            FieldType::Object(_) | FieldType::Array(_) => ValueKind::Reference,
        }
    }

    /// The class name for object types; `None` for primitives and arrays.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            FieldType::Object(name) => Some(name),
            _ => None,
        }
    }
}

/// A parsed method descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct MethodDescriptor {
    pub params: Vec<FieldType>,
    /// `None` for `void`.
    pub ret: Option<FieldType>,
}

impl MethodDescriptor {
    /// Parse a method descriptor such as `(IJLjava/lang/Object;)V`.
    pub fn parse(descriptor: &str) -> Result<Self, ProgramError> {
        let Some(mut rest) = descriptor.strip_prefix('(') else {
            return Err(malformed(descriptor, "expected `(`"));
        };

        let mut params = Vec::new();
        loop {
            if let Some(after) = rest.strip_prefix(')') {
                rest = after;
                break;
            }
            if rest.is_empty() {
                return Err(malformed(descriptor, "unterminated parameter list"));
            }
            let (ty, after) = parse_field_type(rest, descriptor)?;
            params.push(ty);
            rest = after;
        }

        let ret = if rest == "V" {
            None
        } else {
            let (ty, after) = parse_field_type(rest, descriptor)?;
            if !after.is_empty() {
                return Err(malformed(descriptor, "trailing characters"));
            }
            Some(ty)
        };

        Ok(Self { params, ret })
    }

    /// Local variable slots taken by the declared parameters (receiver excluded).
    pub fn param_slots(&self) -> u16 {
        self.params.iter().map(FieldType::slot_size).sum()
    }

    #[inline]
    pub fn returns_reference(&self) -> bool {
        self.ret.as_ref().is_some_and(FieldType::is_reference)
    }
}

fn malformed(descriptor: &str, reason: &'static str) -> ProgramError {
    ProgramError::MalformedDescriptor {
        descriptor: descriptor.to_owned(),
        reason,
    }
}

/// Parse one field type from the front of `input`; return it and the rest.
fn parse_field_type<'a>(
    input: &'a str,
    whole: &str,
) -> Result<(FieldType, &'a str), ProgramError> {
    let mut chars = input.chars();
    let Some(first) = chars.next() else {
        return Err(malformed(whole, "expected a type"));
    };
    let rest = chars.as_str();
    let base = |b| -> Result<(FieldType, &'a str), ProgramError> {
        Ok((FieldType::Base(b), rest))
    };
    match first {
        'B' => base(BaseType::Byte),
        'C' => base(BaseType::Char),
        'D' => base(BaseType::Double),
        'F' => base(BaseType::Float),
        'I' => base(BaseType::Int),
        'J' => base(BaseType::Long),
        'S' => base(BaseType::Short),
        'Z' => base(BaseType::Boolean),
        'L' => {
            let Some(end) = rest.find(';') else {
                return Err(malformed(whole, "unterminated class name"));
            };
            if end == 0 {
                return Err(malformed(whole, "empty class name"));
            }
            Ok((FieldType::Object(rest[..end].to_owned()), &rest[end + 1..]))
        }
        '[' => {
            let (element, after) = parse_field_type(rest, whole)?;
            Ok((FieldType::Array(Box::new(element)), after))
        }
        _ => Err(malformed(whole, "unknown type character")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests panic on unexpected state")]
mod tests;
