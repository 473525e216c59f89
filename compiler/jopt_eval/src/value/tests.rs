use jopt_ir::ValueKind;

use super::{Origin, OriginSet, PrimitiveConstant, Value};

#[test]
fn origin_set_stays_sorted_and_unique() {
    let mut set = OriginSet::new();
    assert!(set.insert(Origin::Produced(4)));
    assert!(set.insert(Origin::Parameter(1)));
    assert!(!set.insert(Origin::Produced(4)));
    assert_eq!(
        set.iter().collect::<Vec<_>>(),
        vec![Origin::Parameter(1), Origin::Produced(4)]
    );
    assert!(set.contains(Origin::Parameter(1)));
    assert!(!set.contains(Origin::CaughtException(4)));
}

#[test]
fn references_merge_by_union() {
    let mut a = Value::reference(Origin::Produced(0));
    let b = Value::reference(Origin::Parameter(2));
    assert!(a.merge(&b));
    assert!(!a.merge(&b));
    let origins = a.origins().map(OriginSet::len);
    assert_eq!(origins, Some(2));
}

#[test]
fn null_merges_into_reference_without_change() {
    let mut a = Value::reference(Origin::Produced(3));
    assert!(!a.merge(&Value::null()));
}

#[test]
fn disagreeing_constants_become_unknown() {
    let mut a = Value::constant(PrimitiveConstant::Int(1));
    assert!(!a.merge(&Value::constant(PrimitiveConstant::Int(1))));
    assert!(a.merge(&Value::constant(PrimitiveConstant::Int(2))));
    assert_eq!(a, Value::unknown(ValueKind::Int));
    assert!(!a.merge(&Value::constant(PrimitiveConstant::Int(3))));
}

#[test]
fn incompatible_kinds_become_top() {
    let mut a = Value::unknown(ValueKind::Int);
    assert!(a.merge(&Value::null()));
    assert_eq!(a, Value::Top);
    assert!(!a.merge(&Value::unknown(ValueKind::Long)));
}

#[test]
fn wide_values_take_two_slots() {
    assert_eq!(Value::unknown(ValueKind::Long).slot_size(), 2);
    assert_eq!(Value::unknown(ValueKind::Double).slot_size(), 2);
    assert_eq!(Value::null().slot_size(), 1);
}
