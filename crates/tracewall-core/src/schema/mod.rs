//! Cross-namespace protobuf re-encoding.
//!
//! Two schema universes are joined only by bytes: the source side describes a
//! message as (serialized file descriptor, type name, wire bytes), and the
//! target side rebuilds descriptors in its own pool and decodes generically.
//! No descriptor or message object is ever shared between the two.

pub mod bridge;
pub mod reencode;
pub mod source;

pub use bridge::{RebuiltFile, SchemaBridge};
pub use reencode::{GenericMessage, ReencodeOptions, Reencoder};
pub use source::{Fingerprint, RawMessage, SchemaMessage, SourceFile};
