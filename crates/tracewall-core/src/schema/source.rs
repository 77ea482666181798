//! Namespace-neutral description of a source message and its schema file.
//!
//! The source side is whatever schema system the host links against. The only
//! things crossing into the target namespace are bytes: the serialized
//! `FileDescriptorProto` of each file and the message's wire encoding.

use bytes::Bytes;
use prost::Message;
use prost_reflect::{DynamicMessage, FileDescriptor, ReflectMessage};
use sha2::{Digest, Sha256};

/// Identity of a file graph: the file's bytes plus, recursively, its imports.
pub type Fingerprint = [u8; 32];

/// Fingerprint of `proto` built against dependencies with the given fingerprints.
pub fn graph_fingerprint<'a>(proto: &[u8], deps: impl IntoIterator<Item = &'a Fingerprint>) -> Fingerprint {
    let mut h = Sha256::new();
    h.update((proto.len() as u64).to_be_bytes());
    h.update(proto);
    for dep in deps {
        h.update(dep);
    }
    h.finalize().into()
}

/// Serialized schema file plus the source files it imports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    name: String,
    proto: Bytes,
    dependencies: Vec<SourceFile>,
    fingerprint: Fingerprint,
}

impl SourceFile {
    /// `proto` must be an encoded `google.protobuf.FileDescriptorProto`.
    pub fn new(name: impl Into<String>, proto: impl Into<Bytes>, dependencies: Vec<SourceFile>) -> Self {
        let proto = proto.into();
        let fingerprint = graph_fingerprint(&proto, dependencies.iter().map(|d| &d.fingerprint));
        Self {
            name: name.into(),
            proto,
            dependencies,
            fingerprint,
        }
    }

    /// Describe a file loaded in the host's own descriptor pool.
    pub fn from_descriptor(file: &FileDescriptor) -> Self {
        Self::new(
            file.name(),
            file.file_descriptor_proto().encode_to_vec(),
            file.dependencies().map(|d| Self::from_descriptor(&d)).collect(),
        )
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn proto_bytes(&self) -> &Bytes {
        &self.proto
    }

    pub fn dependencies(&self) -> &[SourceFile] {
        &self.dependencies
    }
}

/// A message from the source namespace that can describe itself as bytes.
pub trait SchemaMessage {
    /// Fully qualified type name (`package.Message`).
    fn type_name(&self) -> String;
    /// The schema file owning this message type.
    fn source_file(&self) -> SourceFile;
    /// Wire encoding, produced by the source namespace's own encoder.
    fn encode_wire(&self) -> Bytes;
}

impl SchemaMessage for DynamicMessage {
    fn type_name(&self) -> String {
        self.descriptor().full_name().to_string()
    }

    fn source_file(&self) -> SourceFile {
        SourceFile::from_descriptor(&self.descriptor().parent_file())
    }

    fn encode_wire(&self) -> Bytes {
        Bytes::from(self.encode_to_vec())
    }
}

/// Captured wire payload with an externally supplied schema
/// (e.g. a gRPC frame plus the service's descriptor set).
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub type_name: String,
    pub file: SourceFile,
    pub wire: Bytes,
}

impl RawMessage {
    pub fn new(type_name: impl Into<String>, file: SourceFile, wire: impl Into<Bytes>) -> Self {
        Self {
            type_name: type_name.into(),
            file,
            wire: wire.into(),
        }
    }

    /// Adapt any generated message that carries reflection data.
    pub fn from_reflect<T: ReflectMessage>(message: &T) -> Self {
        let desc = message.descriptor();
        Self {
            type_name: desc.full_name().to_string(),
            file: SourceFile::from_descriptor(&desc.parent_file()),
            wire: Bytes::from(message.encode_to_vec()),
        }
    }
}

impl SchemaMessage for RawMessage {
    fn type_name(&self) -> String {
        self.type_name.clone()
    }

    fn source_file(&self) -> SourceFile {
        self.file.clone()
    }

    fn encode_wire(&self) -> Bytes {
        self.wire.clone()
    }
}
