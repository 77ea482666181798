//! Schema registry bridge: rebuilds source schema files inside isolated
//! target descriptor pools.
//!
//! A file is rebuilt by parsing its serialized `FileDescriptorProto` with the
//! target namespace's own parser. Every distinct file graph (the file plus its
//! transitive imports) gets its own pool, so two hosts linking different
//! versions of a shared import never collide. Results are cached per graph
//! fingerprint for the lifetime of the bridge and never evicted.
//!
//! Concurrency: lookups go through `DashMap`; builds are serialized on one
//! mutex and re-check the cache, so each graph is built once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use prost::Message;
use prost_reflect::{DescriptorPool, FileDescriptor, MessageDescriptor};
use prost_types::{DescriptorProto, FileDescriptorProto};

use crate::error::{Result, TraceWallError};
use crate::schema::source::{graph_fingerprint, Fingerprint, SourceFile};

/// A schema file as it exists in the target namespace.
#[derive(Debug, Clone)]
pub struct RebuiltFile {
    file: FileDescriptor,
    pool: DescriptorPool,
    fingerprint: Fingerprint,
}

impl RebuiltFile {
    pub fn name(&self) -> &str {
        self.file.name()
    }

    pub fn descriptor(&self) -> &FileDescriptor {
        &self.file
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Resolve a message type owned by this file by its full name.
    pub fn find_message(&self, full_name: &str) -> Result<MessageDescriptor> {
        self.pool
            .get_message_by_name(full_name)
            .filter(|m| m.parent_file().name() == self.file.name())
            .ok_or_else(|| {
                TraceWallError::DescriptorNotFound(format!(
                    "message type {full_name} not found in rebuilt file {}",
                    self.file.name()
                ))
            })
    }
}

#[derive(Default)]
pub struct SchemaBridge {
    build_lock: Mutex<()>,
    cache: DashMap<Fingerprint, Arc<RebuiltFile>>,
    builds: AtomicU64,
}

impl SchemaBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a source file and, transitively, everything it imports.
    pub fn rebuild(&self, source: &SourceFile) -> Result<Arc<RebuiltFile>> {
        if let Some(hit) = self.cache.get(source.fingerprint()) {
            return Ok(Arc::clone(hit.value()));
        }

        let deps = source
            .dependencies()
            .iter()
            .map(|d| self.rebuild(d))
            .collect::<Result<Vec<_>>>()?;

        self.rebuild_with(source.proto_bytes(), &deps)
    }

    /// Rebuild one serialized file against an already-built dependency list.
    /// Every import must be present in `deps`.
    pub fn rebuild_with(&self, proto: &[u8], deps: &[Arc<RebuiltFile>]) -> Result<Arc<RebuiltFile>> {
        let key = graph_fingerprint(proto, deps.iter().map(|d| d.fingerprint()));
        if let Some(hit) = self.cache.get(&key) {
            return Ok(Arc::clone(hit.value()));
        }

        let _build = self
            .build_lock
            .lock()
            .map_err(|_| TraceWallError::Internal("schema build lock poisoned".into()))?;
        if let Some(hit) = self.cache.get(&key) {
            return Ok(Arc::clone(hit.value()));
        }

        let parsed = FileDescriptorProto::decode(proto)
            .map_err(|e| TraceWallError::Serialization(format!("invalid file descriptor bytes: {e}")))?;
        let name = parsed.name().to_string();

        for import in &parsed.dependency {
            if !deps.iter().any(|d| d.name() == import) {
                return Err(TraceWallError::DescriptorNotFound(format!(
                    "{name} imports {import}, which is not among the rebuilt dependencies"
                )));
            }
        }

        let expected = message_names(&parsed);
        let pool = build_pool(parsed, deps)?;
        let file = pool.get_file_by_name(&name).ok_or_else(|| {
            TraceWallError::DescriptorNotFound(format!("{name} missing from target pool after build"))
        })?;
        let rebuilt = RebuiltFile {
            file,
            pool,
            fingerprint: key,
        };
        for full_name in &expected {
            rebuilt.find_message(full_name)?;
        }

        self.builds.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(file = %name, "rebuilt schema file in target namespace");

        let rebuilt = Arc::new(rebuilt);
        self.cache.insert(key, Arc::clone(&rebuilt));
        Ok(rebuilt)
    }

    /// Number of distinct file graphs cached.
    pub fn cached_files(&self) -> usize {
        self.cache.len()
    }

    /// Number of file graphs actually built.
    pub fn builds(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }
}

/// Fresh pool holding `root` and every file its dependencies were built with.
fn build_pool(root: FileDescriptorProto, deps: &[Arc<RebuiltFile>]) -> Result<DescriptorPool> {
    let mut pool = DescriptorPool::new();
    let name = root.name().to_string();

    for dep in deps {
        // dependency pools list files imports-first
        for file in dep.pool.files() {
            if let Some(existing) = pool.get_file_by_name(file.name()) {
                if existing.file_descriptor_proto() != file.file_descriptor_proto() {
                    return Err(TraceWallError::SchemaConflict(format!(
                        "{name} depends on two different versions of {}",
                        file.name()
                    )));
                }
                continue;
            }
            pool.add_file_descriptor_proto(file.file_descriptor_proto().clone())
                .map_err(|e| {
                    TraceWallError::Serialization(format!("cannot build {} in target namespace: {e}", file.name()))
                })?;
        }
    }

    pool.add_file_descriptor_proto(root)
        .map_err(|e| TraceWallError::Serialization(format!("cannot build {name} in target namespace: {e}")))?;
    Ok(pool)
}

/// Full names of every message (nested included) declared in a file.
fn message_names(file: &FileDescriptorProto) -> Vec<String> {
    fn walk(prefix: &str, msgs: &[DescriptorProto], out: &mut Vec<String>) {
        for m in msgs {
            let full = if prefix.is_empty() {
                m.name().to_string()
            } else {
                format!("{prefix}.{}", m.name())
            };
            walk(&full, &m.nested_type, out);
            out.push(full);
        }
    }

    let mut out = Vec::new();
    walk(file.package(), &file.message_type, &mut out);
    out
}
