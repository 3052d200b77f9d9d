use crate::repository::{AuditEntry, Customer, Order, Tier};
use docrepo::common::{Convertible, Document, ObjectId, Value};
use docrepo::errors::ErrorKind;
use docrepo::repository::{Capability, Entity};

#[test]
fn test_entity_metadata() {
    assert_eq!(Order::entity_name(), "orders");
    assert_eq!(Order::id_field(), "id");
    assert_eq!(
        Order::field_names(),
        &["id", "customer", "total", "status", "tags", "placed_at"]
    );
    assert!(Order::capability().is_auto_increment());

    assert_eq!(Customer::entity_name(), "customers");
    assert_eq!(Customer::id_field(), "code");
    assert!(matches!(Customer::capability(), Capability::Plain));

    // default name is the type name
    assert_eq!(AuditEntry::entity_name(), "AuditEntry");
}

#[test]
fn test_typed_field_handles() {
    let fields = Order::fields();
    assert_eq!(fields.customer.name(), "customer");
    assert_eq!(fields.placed_at.name(), "placed_at");
    assert_eq!(Customer::fields().code.name(), "code");
}

#[test]
fn test_entity_keys() {
    let mut order = Order::default();
    assert_eq!(order.key(), None);
    order.set_key(7);
    assert_eq!(order.key(), Some(7));

    let mut customer = Customer::default();
    assert_eq!(customer.key(), None);
    customer.set_key("C-1".to_string());
    assert_eq!(customer.code, "C-1");

    let mut entry = AuditEntry::default();
    assert_eq!(entry.key(), None);
    let id = ObjectId::new();
    entry.set_key(id);
    assert_eq!(entry.id, Some(id));
}

#[test]
fn test_ignored_field_is_not_converted() {
    let order = Order {
        id: 1,
        customer: "alice".to_string(),
        cached_label: "label".to_string(),
        ..Default::default()
    };

    let value = order.to_value().unwrap();
    let document = value.as_document().unwrap();
    assert!(!document.contains_key("cached_label"));
    assert_eq!(document.get("status").unwrap(), Value::Null);

    let back = Order::from_value(&value).unwrap();
    assert_eq!(back.cached_label, "");
    assert_eq!(back.customer, "alice");
}

#[test]
fn test_missing_fields_take_defaults() {
    let mut document = Document::new();
    document.insert("customer", "bob");
    let order = Order::from_value(&Value::Document(document)).unwrap();
    assert_eq!(order.customer, "bob");
    assert_eq!(order.total, 0.0);
    assert!(order.tags.is_empty());
    assert_eq!(order.placed_at, None);
}

#[test]
fn test_enum_round_trip() {
    for tier in [Tier::Basic, Tier::Gold { since: 2020 }, Tier::Custom("partner".to_string())] {
        let value = tier.to_value().unwrap();
        assert_eq!(Tier::from_value(&value).unwrap(), tier);
    }

    let value = Tier::Gold { since: 2020 }.to_value().unwrap();
    let document = value.as_document().unwrap();
    assert_eq!(document.get("variant").unwrap(), Value::from("Gold"));
}

#[test]
fn test_unknown_enum_variant_fails() {
    let mut document = Document::new();
    document.insert("variant", "Platinum");
    document.insert("value", Value::Null);
    let err = Tier::from_value(&Value::Document(document)).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::ObjectMappingError);
}

#[test]
fn test_non_document_fails_mapping() {
    let err = Customer::from_value(&Value::from(42)).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::ObjectMappingError);
}
