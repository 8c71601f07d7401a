//! Integration tests for the definition store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use defs_core::error::{Error, Result, StoreError};
use defs_core::types::{Definition, ModuleDefinition, TypeTag};
use defs_core::DefId;
use defs_store::*;
use tempfile::TempDir;

/// Wraps a backend and counts reads.
#[derive(Default)]
struct CountingStorage {
    inner: MemoryStorage,
    reads: AtomicUsize,
}

impl CountingStorage {
    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageBackend for CountingStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, data: &[u8]) -> Result<()> {
        self.inner.set(key, data).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key).await
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.keys(prefix).await
    }
}

fn stringify() -> NewDefinition {
    let mut def = NewDefinition::new(
        "exports = fn stringify(args) {\n    return json(args);\n};\n",
        TypeTag::String,
    );
    def.name = Some("stringify".to_string());
    def
}

#[tokio::test]
async fn test_resolve_token_read_counts() {
    let storage = Arc::new(CountingStorage::default());
    let store = DefinitionStore::new(storage.clone());
    let id = store.create(stringify()).await.unwrap();

    let before = storage.reads();
    assert_eq!(store.resolve_token(id.as_str()).await.unwrap(), id);
    assert_eq!(storage.reads(), before);

    // An id-shaped token is not checked for existence
    let unknown = store.resolve_token("defs_doesNotExist").await.unwrap();
    assert_eq!(unknown.as_str(), "defs_doesNotExist");
    assert_eq!(storage.reads(), before);

    assert_eq!(store.resolve_token("stringify").await.unwrap(), id);
    assert_eq!(storage.reads(), before + 1);

    let err = store.resolve_token("unknown").await.unwrap_err();
    assert!(matches!(err, Error::Store(StoreError::NotFound(ref name)) if name == "unknown"));
    assert_eq!(storage.reads(), before + 2);
}

#[tokio::test]
async fn test_requires_collide_and_last_write_wins() {
    let store = DefinitionStore::new(Arc::new(MemoryStorage::new()));

    let mut first = stringify();
    first
        .requires
        .insert("helper".to_string(), DefId::parse("defs_one").unwrap());
    let mut second = stringify();
    second
        .requires
        .insert("helper".to_string(), DefId::parse("defs_two").unwrap());

    let a = store.create(first).await.unwrap();
    let b = store.create(second).await.unwrap();
    assert_eq!(a, b);

    let stored = store.get(&a).await.unwrap().into_function().unwrap();
    assert_eq!(stored.requires["helper"].as_str(), "defs_two");
}

#[tokio::test]
async fn test_file_backed_store_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let id = {
        let store = DefinitionStore::new(Arc::new(FileStorage::new(temp_dir.path())));
        store.create(stringify()).await.unwrap()
    };

    // A fresh store over the same directory sees the same data
    let store = DefinitionStore::new(Arc::new(FileStorage::new(temp_dir.path())));
    let def = store.get(&id).await.unwrap().into_function().unwrap();

    assert_eq!(def.output_type, TypeTag::String);
    assert_eq!(store.resolve_token("stringify").await.unwrap(), id);
    assert_eq!(store.names().await.unwrap().len(), 1);
    assert!(temp_dir.path().join("defs").join(id.as_str()).is_file());
}

#[tokio::test]
async fn test_module_records() {
    let store = DefinitionStore::new(Arc::new(MemoryStorage::new()));
    let id = DefId::parse("defs_module").unwrap();
    let module = Definition::Module(ModuleDefinition {
        exports: [("add".to_string(), DefId::parse("defs_add").unwrap())]
            .into_iter()
            .collect(),
        implementation: String::new(),
        requires: Vec::new(),
    });

    store.put(&id, &module).await.unwrap();

    assert_eq!(store.get(&id).await.unwrap(), module);
}

#[tokio::test]
async fn test_id_shaped_name_is_not_aliased() {
    let store = DefinitionStore::new(Arc::new(MemoryStorage::new()));
    let mut def = NewDefinition::new(
        "exports = fn defs_helper() {\n    return null;\n};\n",
        TypeTag::Null,
    );
    def.name = Some("defs_helper".to_string());

    let id = store.create(def).await.unwrap();

    let stored = store.get(&id).await.unwrap().into_function().unwrap();
    assert_eq!(stored.name.as_deref(), Some("defs_helper"));
    assert!(store.names().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unstorable_token_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let store = DefinitionStore::new(Arc::new(FileStorage::new(temp_dir.path())));
    store.create(stringify()).await.unwrap();

    for token in ["", "a//b"] {
        let err = store.resolve_token(token).await.unwrap_err();
        assert!(
            matches!(&err, Error::Store(StoreError::NotFound(missing)) if missing == token),
            "{token:?}: {err}"
        );
    }
}
