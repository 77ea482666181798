//! Message re-encoder: source message -> generic target-namespace message -> JSON.

use std::borrow::Cow;
use std::sync::Arc;

use prost_reflect::{DynamicMessage, MessageDescriptor, ReflectMessage, SerializeOptions, Value};
use serde::Deserialize;

use crate::error::{Result, TraceWallError};
use crate::schema::bridge::SchemaBridge;
use crate::schema::source::SchemaMessage;

/// Message built purely from a target-namespace descriptor and field values.
#[derive(Debug, Clone)]
pub struct GenericMessage {
    inner: DynamicMessage,
}

impl GenericMessage {
    pub fn descriptor(&self) -> MessageDescriptor {
        self.inner.descriptor()
    }

    pub fn type_name(&self) -> String {
        self.inner.descriptor().full_name().to_string()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.inner.has_field_by_name(name)
    }

    pub fn field(&self, name: &str) -> Option<Cow<'_, Value>> {
        self.inner.get_field_by_name(name)
    }

    pub fn as_dynamic(&self) -> &DynamicMessage {
        &self.inner
    }

    pub fn into_dynamic(self) -> DynamicMessage {
        self.inner
    }
}

/// Printer options for the textual form.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ReencodeOptions {
    /// Print `snake_case` proto names instead of lowerCamelCase JSON names.
    #[serde(default)]
    pub use_proto_field_names: bool,
    /// Print fields holding their default value.
    #[serde(default)]
    pub emit_default_fields: bool,
}

pub struct Reencoder {
    bridge: Arc<SchemaBridge>,
    options: ReencodeOptions,
}

impl Reencoder {
    pub fn new(bridge: Arc<SchemaBridge>) -> Self {
        Self::with_options(bridge, ReencodeOptions::default())
    }

    pub fn with_options(bridge: Arc<SchemaBridge>, options: ReencodeOptions) -> Self {
        Self { bridge, options }
    }

    pub fn bridge(&self) -> &Arc<SchemaBridge> {
        &self.bridge
    }

    /// Rebuild `message` as a generic message in the target namespace.
    pub fn reencode<M: SchemaMessage + ?Sized>(&self, message: &M) -> Result<GenericMessage> {
        let wire = message.encode_wire();
        let type_name = message.type_name();

        let file = self.bridge.rebuild(&message.source_file())?;
        let desc = file.find_message(&type_name)?;

        let inner = DynamicMessage::decode(desc, wire.as_ref())
            .map_err(|e| TraceWallError::Serialization(format!("cannot decode {type_name}: {e}")))?;
        Ok(GenericMessage { inner })
    }

    /// Render a generic message with the schema-driven JSON printer.
    pub fn render(&self, message: &GenericMessage) -> Result<String> {
        let options = SerializeOptions::new()
            .use_proto_field_name(self.options.use_proto_field_names)
            .skip_default_fields(!self.options.emit_default_fields);

        let mut out = Vec::new();
        let mut ser = serde_json::Serializer::new(&mut out);
        message
            .as_dynamic()
            .serialize_with_options(&mut ser, &options)
            .map_err(|e| TraceWallError::Serialization(format!("cannot print {}: {e}", message.type_name())))?;

        String::from_utf8(out).map_err(|e| TraceWallError::Serialization(format!("printer emitted invalid utf-8: {e}")))
    }

    /// Best-effort text form. Failures are logged and yield an empty string.
    pub fn reencode_to_text<M: SchemaMessage + ?Sized>(&self, message: &M) -> String {
        match self.reencode(message).and_then(|m| self.render(&m)) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(
                    type_name = %message.type_name(),
                    code = e.kind().as_str(),
                    error = %e,
                    "failed to re-encode message in target namespace"
                );
                String::new()
            }
        }
    }
}
