use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fixity_types::Ref;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectKind, StoredObject};
use crate::traits::ObjectStore;

/// Durable object store laid out as a two-level hex fan-out directory.
///
/// ```text
/// <root>/objects/
/// └── ab/
///     └── cd/
///         └── abcd1234...  # [kind tag byte][object data]
/// ```
///
/// Writes go to a temp file in the target directory and are renamed into
/// place, so a reader never observes a half-written object. Every read
/// re-hashes the bytes and reports [`StoreError::HashMismatch`] on corruption.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Open (or create) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("objects"))?;
        Ok(Self { root })
    }

    /// The root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn objects_dir(&self) -> PathBuf {
        self.root.join("objects")
    }

    fn object_path(&self, id: &Ref) -> PathBuf {
        let hex = id.to_hex();
        self.objects_dir().join(&hex[..2]).join(&hex[2..4]).join(hex)
    }
}

impl ObjectStore for LocalObjectStore {
    fn read(&self, id: &Ref) -> StoreResult<Option<StoredObject>> {
        let path = self.object_path(id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let Some((&tag, data)) = bytes.split_first() else {
            return Err(StoreError::CorruptObject {
                id: *id,
                reason: "empty object file".into(),
            });
        };
        let kind = ObjectKind::from_tag(tag).ok_or_else(|| StoreError::CorruptObject {
            id: *id,
            reason: format!("unknown kind tag {tag}"),
        })?;

        let object = StoredObject::new(kind, data.to_vec());
        let computed = object.compute_id();
        if computed != *id {
            warn!(%id, %computed, "stored object failed hash verification");
            return Err(StoreError::HashMismatch {
                expected: *id,
                computed,
            });
        }
        Ok(Some(object))
    }

    fn write(&self, object: &StoredObject) -> StoreResult<Ref> {
        let id = object.compute_id();
        if id.is_null() {
            return Err(StoreError::NullObjectId);
        }

        let path = self.object_path(&id);
        if path.exists() {
            return Ok(id);
        }
        let dir = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&[object.kind.tag()])?;
        tmp.write_all(&object.data)?;
        tmp.as_file().sync_all()?;

        if let Err(e) = tmp.persist(&path) {
            // Another writer may have won the race with identical bytes.
            if !path.exists() {
                return Err(StoreError::Io(e.error));
            }
        }

        debug!(%id, kind = %object.kind, size = object.size, "stored object");
        Ok(id)
    }

    fn exists(&self, id: &Ref) -> StoreResult<bool> {
        Ok(self.object_path(id).is_file())
    }

    fn list(&self) -> StoreResult<Box<dyn Iterator<Item = StoreResult<Ref>> + '_>> {
        let walker = walkdir::WalkDir::new(self.objects_dir())
            .min_depth(3)
            .max_depth(3)
            .into_iter();

        Ok(Box::new(walker.filter_map(|entry| match entry {
            Err(e) => Some(Err(StoreError::Io(io::Error::from(e)))),
            Ok(entry) if !entry.file_type().is_file() => None,
            // Temp files and strays do not parse as refs.
            Ok(entry) => entry.file_name().to_str().and_then(|name| Ref::from_hex(name).ok()).map(Ok),
        })))
    }
}
