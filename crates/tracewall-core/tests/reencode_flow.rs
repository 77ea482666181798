//! Cross-namespace re-encoding tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::{Arc, Barrier};

use prost_reflect::{DynamicMessage, Value};
use serde_json::json;

use tracewall_core::schema::{RawMessage, ReencodeOptions, Reencoder, SchemaBridge, SchemaMessage, SourceFile};

mod fixtures;
use fixtures::{host_pool, order_bytes, sample_order, service_pool, CUSTOMER_FILE, ORDER_FILE, ORDER_TYPE};

fn reencoder() -> Reencoder {
    Reencoder::new(Arc::new(SchemaBridge::new()))
}

#[test]
fn generic_message_keeps_every_populated_field() {
    let pool = host_pool();
    let order = sample_order(&pool);

    let generic = reencoder().reencode(&order).unwrap();

    assert_eq!(generic.type_name(), ORDER_TYPE);
    assert_eq!(generic.field("id").unwrap().as_str(), Some("o-1"));
    assert_eq!(generic.field("quantity").unwrap().as_i64(), Some(3));
    assert_eq!(generic.field("tags").unwrap().as_list().unwrap().len(), 2);
    let customer = generic.field("customer").unwrap();
    let customer = customer.as_message().unwrap();
    assert_eq!(customer.get_field_by_name("name").unwrap().as_str(), Some("Ada"));
}

#[test]
fn text_form_uses_proto3_json_mapping() {
    let pool = host_pool();
    let text = reencoder().reencode_to_text(&sample_order(&pool));

    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        parsed,
        json!({
            "id": "o-1",
            "quantity": "3",
            "tags": ["gift", "rush"],
            "customer": { "name": "Ada", "tier": 2 },
            "gift": true,
            "total": 12.5
        })
    );
}

#[test]
fn text_parses_back_against_the_source_schema() {
    let pool = host_pool();
    let original = sample_order(&pool);
    let text = reencoder().reencode_to_text(&original);

    let desc = pool.get_message_by_name(ORDER_TYPE).unwrap();
    let mut de = serde_json::Deserializer::from_str(&text);
    let back = DynamicMessage::deserialize(desc, &mut de).unwrap();
    de.end().unwrap();

    for name in ["id", "quantity", "tags", "gift", "total", "customer"] {
        assert_eq!(
            back.get_field_by_name(name).unwrap(),
            original.get_field_by_name(name).unwrap(),
            "field {name}"
        );
    }
}

#[test]
fn default_fields_are_printed_on_request() {
    let pool = host_pool();
    let empty = DynamicMessage::new(pool.get_message_by_name(ORDER_TYPE).unwrap());

    let quiet = reencoder().reencode_to_text(&empty);
    assert_eq!(quiet, "{}");

    let loud = Reencoder::with_options(
        Arc::new(SchemaBridge::new()),
        ReencodeOptions { use_proto_field_names: true, emit_default_fields: true },
    )
    .reencode_to_text(&empty);
    let parsed: serde_json::Value = serde_json::from_str(&loud).unwrap();
    assert_eq!(parsed["quantity"], json!("0"));
    assert_eq!(parsed["gift"], json!(false));
}

#[test]
fn reflect_adapter_matches_dynamic_path() {
    let pool = host_pool();
    let order = sample_order(&pool);
    let raw = RawMessage::from_reflect(&order);

    assert_eq!(raw.type_name(), ORDER_TYPE);
    assert_eq!(raw.source_file().name(), ORDER_FILE);
    assert_eq!(raw.source_file().dependencies()[0].name(), CUSTOMER_FILE);

    let r = reencoder();
    assert_eq!(r.reencode_to_text(&raw), r.reencode_to_text(&order));
}

#[test]
fn missing_dependency_is_descriptor_not_found() {
    let pool = host_pool();
    let order = sample_order(&pool);
    let orphan = RawMessage::new(
        ORDER_TYPE,
        SourceFile::new(ORDER_FILE, order_bytes(), vec![]),
        order.encode_wire(),
    );

    let r = reencoder();
    let err = r.reencode(&orphan).unwrap_err();
    assert_eq!(err.kind().as_str(), "DESCRIPTOR_NOT_FOUND");
    assert_eq!(r.reencode_to_text(&orphan), "");
    assert_eq!(r.bridge().cached_files(), 0);
}

#[test]
fn unknown_type_name_is_descriptor_not_found() {
    let pool = host_pool();
    let mut raw = RawMessage::from_reflect(&sample_order(&pool));
    raw.type_name = "acme.shop.Refund".into();

    let err = reencoder().reencode(&raw).unwrap_err();
    assert_eq!(err.kind().as_str(), "DESCRIPTOR_NOT_FOUND");
}

#[test]
fn malformed_wire_bytes_are_a_serialization_error() {
    let pool = host_pool();
    let mut raw = RawMessage::from_reflect(&sample_order(&pool));
    // field 1, length 5, only one byte follows
    raw.wire = bytes::Bytes::from_static(&[0x0a, 0x05, 0x61]);

    let r = reencoder();
    let err = r.reencode(&raw).unwrap_err();
    assert_eq!(err.kind().as_str(), "SERIALIZATION");
    assert_eq!(r.reencode_to_text(&raw), "");
}

#[test]
fn repeated_reencoding_reuses_the_cached_rebuild() {
    let pool = host_pool();
    let r = reencoder();
    for _ in 0..5 {
        r.reencode(&sample_order(&pool)).unwrap();
    }
    assert_eq!(r.bridge().builds(), 2);
    assert_eq!(r.bridge().cached_files(), 2);
}

#[test]
fn concurrent_first_rebuild_stores_one_entry() {
    let pool = host_pool();
    let source = RawMessage::from_reflect(&sample_order(&pool)).file;
    let bridge = Arc::new(SchemaBridge::new());
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let bridge = Arc::clone(&bridge);
            let barrier = Arc::clone(&barrier);
            let source = source.clone();
            std::thread::spawn(move || {
                barrier.wait();
                bridge.rebuild(&source)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect();

    assert!(Arc::ptr_eq(&results[0], &results[1]));
    assert_eq!(bridge.cached_files(), 2);
    assert_eq!(bridge.builds(), 2);

    let again = bridge.rebuild(&source).unwrap();
    assert!(Arc::ptr_eq(&again, &results[0]));
    assert!(again.find_message(ORDER_TYPE).is_ok());
}

#[test]
fn diverging_versions_of_a_shared_import_both_reencode() {
    let pool_a = service_pool("a", "A", false);
    let pool_b = service_pool("b", "B", true);

    let mut a = DynamicMessage::new(pool_a.get_message_by_name("svc.A").unwrap());
    a.set_field_by_name("id", Value::String("a".into()));

    let meta_desc = pool_b.get_message_by_name("common.Meta").unwrap();
    let mut meta = DynamicMessage::new(meta_desc);
    meta.set_field_by_name("region", Value::String("eu".into()));
    let mut b = DynamicMessage::new(pool_b.get_message_by_name("svc.B").unwrap());
    b.set_field_by_name("id", Value::String("b".into()));
    b.set_field_by_name("meta", Value::Message(meta));

    let r = reencoder();
    assert_eq!(r.reencode_to_text(&a), r#"{"id":"a"}"#);
    let b_text: serde_json::Value = serde_json::from_str(&r.reencode_to_text(&b)).unwrap();
    assert_eq!(b_text, json!({ "id": "b", "meta": { "region": "eu" } }));

    // two meta versions, two service graphs
    assert_eq!(r.bridge().cached_files(), 4);
}
