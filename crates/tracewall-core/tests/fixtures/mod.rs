//! Schema fixtures shared by the re-encoding tests.
//!
//! `acme/shop/order.proto` imports `acme/common/customer.proto`; both are loaded
//! into a host pool that plays the source namespace.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use prost::Message;
use prost_reflect::{DescriptorPool, DynamicMessage, Value};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet};

pub const CUSTOMER_FILE: &str = "acme/common/customer.proto";
pub const ORDER_FILE: &str = "acme/shop/order.proto";
pub const ORDER_TYPE: &str = "acme.shop.Order";

fn field(name: &str, number: i32, ty: Type, label: Label) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.into()),
        number: Some(number),
        label: Some(label as i32),
        r#type: Some(ty as i32),
        json_name: Some(name.into()),
        ..Default::default()
    }
}

pub fn customer_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(CUSTOMER_FILE.into()),
        package: Some("acme.common".into()),
        syntax: Some("proto3".into()),
        message_type: vec![DescriptorProto {
            name: Some("Customer".into()),
            field: vec![
                field("name", 1, Type::String, Label::Optional),
                field("tier", 2, Type::Uint32, Label::Optional),
            ],
            ..Default::default()
        }],
        ..Default::default()
    }
}

pub fn order_file() -> FileDescriptorProto {
    let mut customer = field("customer", 4, Type::Message, Label::Optional);
    customer.type_name = Some(".acme.common.Customer".into());

    FileDescriptorProto {
        name: Some(ORDER_FILE.into()),
        package: Some("acme.shop".into()),
        syntax: Some("proto3".into()),
        dependency: vec![CUSTOMER_FILE.into()],
        message_type: vec![DescriptorProto {
            name: Some("Order".into()),
            field: vec![
                field("id", 1, Type::String, Label::Optional),
                field("quantity", 2, Type::Int64, Label::Optional),
                field("tags", 3, Type::String, Label::Repeated),
                customer,
                field("gift", 5, Type::Bool, Label::Optional),
                field("total", 6, Type::Double, Label::Optional),
            ],
            ..Default::default()
        }],
        ..Default::default()
    }
}

/// The source namespace: a pool owned by the "host".
pub fn host_pool() -> DescriptorPool {
    DescriptorPool::from_file_descriptor_set(FileDescriptorSet {
        file: vec![customer_file(), order_file()],
    })
    .expect("fixture schema must build")
}

pub fn order_bytes() -> Vec<u8> {
    order_file().encode_to_vec()
}

/// Populated `acme.shop.Order` built in the host pool.
pub fn sample_order(pool: &DescriptorPool) -> DynamicMessage {
    let customer_desc = pool.get_message_by_name("acme.common.Customer").unwrap();
    let mut customer = DynamicMessage::new(customer_desc);
    customer.set_field_by_name("name", Value::String("Ada".into()));
    customer.set_field_by_name("tier", Value::U32(2));

    let order_desc = pool.get_message_by_name(ORDER_TYPE).unwrap();
    let mut order = DynamicMessage::new(order_desc);
    order.set_field_by_name("id", Value::String("o-1".into()));
    order.set_field_by_name("quantity", Value::I64(3));
    order.set_field_by_name(
        "tags",
        Value::List(vec![Value::String("gift".into()), Value::String("rush".into())]),
    );
    order.set_field_by_name("customer", Value::Message(customer));
    order.set_field_by_name("gift", Value::Bool(true));
    order.set_field_by_name("total", Value::F64(12.5));
    order
}

pub const META_FILE: &str = "common/meta.proto";

/// `common.Meta`; `v2` adds a `region` field, as a second library build would.
pub fn meta_file(v2: bool) -> FileDescriptorProto {
    let mut fields = vec![field("trace_id", 1, Type::String, Label::Optional)];
    if v2 {
        fields.push(field("region", 2, Type::String, Label::Optional));
    }
    FileDescriptorProto {
        name: Some(META_FILE.into()),
        package: Some("common".into()),
        syntax: Some("proto3".into()),
        message_type: vec![DescriptorProto {
            name: Some("Meta".into()),
            field: fields,
            ..Default::default()
        }],
        ..Default::default()
    }
}

/// `svc.<message>` in `svc/<file>.proto`, importing `common/meta.proto`.
pub fn service_pool(file: &str, message: &str, meta_v2: bool) -> DescriptorPool {
    let mut meta = field("meta", 2, Type::Message, Label::Optional);
    meta.type_name = Some(".common.Meta".into());

    let svc = FileDescriptorProto {
        name: Some(format!("svc/{file}.proto")),
        package: Some("svc".into()),
        syntax: Some("proto3".into()),
        dependency: vec![META_FILE.into()],
        message_type: vec![DescriptorProto {
            name: Some(message.into()),
            field: vec![field("id", 1, Type::String, Label::Optional), meta],
            ..Default::default()
        }],
        ..Default::default()
    };
    DescriptorPool::from_file_descriptor_set(FileDescriptorSet {
        file: vec![meta_file(meta_v2), svc],
    })
    .expect("service fixture must build")
}
