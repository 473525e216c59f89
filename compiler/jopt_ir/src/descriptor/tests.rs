use pretty_assertions::assert_eq;

use super::{BaseType, FieldType, MethodDescriptor};
use crate::{ProgramError, ValueKind};

#[test]
fn parses_primitive_and_object_fields() {
    assert_eq!(FieldType::parse("I"), Ok(FieldType::Base(BaseType::Int)));
    assert_eq!(
        FieldType::parse("Ljava/lang/String;"),
        Ok(FieldType::Object("java/lang/String".into()))
    );
    assert_eq!(
        FieldType::parse("[[J"),
        Ok(FieldType::Array(Box::new(FieldType::Array(Box::new(
            FieldType::Base(BaseType::Long)
        )))))
    );
}

#[test]
fn rejects_trailing_characters() {
    assert!(matches!(
        FieldType::parse("II"),
        Err(ProgramError::MalformedDescriptor { .. })
    ));
}

#[test]
fn rejects_unterminated_class_name() {
    assert!(FieldType::parse("Ljava/lang/Object").is_err());
    assert!(FieldType::parse("L;").is_err());
}

#[test]
fn method_descriptor_counts_category2_slots() {
    // (int, long, Object, double) -> void
    let desc = MethodDescriptor::parse("(IJLjava/lang/Object;D)V").unwrap();
    assert_eq!(desc.params.len(), 4);
    assert_eq!(desc.param_slots(), 6);
    assert_eq!(desc.ret, None);
    assert!(!desc.returns_reference());
}

#[test]
fn method_descriptor_return_types() {
    let desc = MethodDescriptor::parse("()[I").unwrap();
    assert!(desc.returns_reference());
    let desc = MethodDescriptor::parse("()J").unwrap();
    assert_eq!(desc.ret.as_ref().map(FieldType::value_kind), Some(ValueKind::Long));
}

#[test]
fn method_descriptor_requires_parentheses() {
    assert!(MethodDescriptor::parse("I)V").is_err());
    assert!(MethodDescriptor::parse("(I").is_err());
    assert!(MethodDescriptor::parse("(I)VV").is_err());
}

#[test]
fn value_kinds_widen_small_integers() {
    for d in ["B", "C", "S", "Z", "I"] {
        assert_eq!(FieldType::parse(d).unwrap().value_kind(), ValueKind::Int);
    }
    assert_eq!(
        FieldType::parse("[I").unwrap().value_kind(),
        ValueKind::Reference
    );
}
