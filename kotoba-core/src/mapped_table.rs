//! Read-only memory-mapped byte regions with typed views.
//!
//! `MappedTable` is the single place in the crate that touches a raw file
//! descriptor. Every other component (trie, dictionary, connector, char
//! property) receives a bounds-checked `&[u8]` from it and never sees a
//! pointer.

use std::fs::File;
use std::ops::Deref;
use std::path::Path;

use crate::error::{KotobaError, KotobaErrorKind};

/// The backing storage for a `MappedTable`.
///
/// `Mapped` is used whenever the platform supports shared mmap; `Owned` is
/// the fallback for platforms (or files) where mmap isn't available, filled
/// by one sequential read.
enum Storage {
    #[cfg(feature = "mmap")]
    Mapped(memmap2::Mmap),
    Owned(Vec<u8>),
}

impl Deref for Storage {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            #[cfg(feature = "mmap")]
            Storage::Mapped(m) => m.as_ref(),
            Storage::Owned(v) => v.as_slice(),
        }
    }
}

/// A read-only, bounds-checked view over a dictionary table file.
pub struct MappedTable {
    storage: Storage,
    path: String,
}

impl MappedTable {
    /// Opens `path` read-only. Fails with `KotobaErrorKind::Resource` if the
    /// file is missing or cannot be mapped/read.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<MappedTable, KotobaError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let file = File::open(path).map_err(|err| {
            KotobaErrorKind::Resource
                .with_error(anyhow::anyhow!(err))
                .add_context(format!("OpenFailed({display})"))
        })?;

        let storage = Self::map_or_read(&file, &display)?;

        Ok(MappedTable {
            storage,
            path: display,
        })
    }

    #[cfg(feature = "mmap")]
    fn map_or_read(file: &File, display: &str) -> Result<Storage, KotobaError> {
        match unsafe { memmap2::Mmap::map(file) } {
            Ok(mmap) => Ok(Storage::Mapped(mmap)),
            Err(err) => {
                log::warn!("mmap failed for {display}, falling back to a heap read: {err}");
                Self::read_fallback(file, display)
            }
        }
    }

    #[cfg(not(feature = "mmap"))]
    fn map_or_read(file: &File, display: &str) -> Result<Storage, KotobaError> {
        Self::read_fallback(file, display)
    }

    fn read_fallback(mut file: &File, display: &str) -> Result<Storage, KotobaError> {
        use std::io::Read;

        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer).map_err(|err| {
            KotobaErrorKind::Resource
                .with_error(anyhow::anyhow!(err))
                .add_context(format!("OpenFailed({display})"))
        })?;
        Ok(Storage::Owned(buffer))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn size(&self) -> usize {
        self.storage.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.storage
    }

    /// Returns `self.as_slice()[offset..offset+len]`, failing with
    /// `KotobaErrorKind::Resource` ("trailing bytes or short files MUST be
    /// rejected") rather than panicking on an out-of-range slice.
    pub fn slice(&self, offset: usize, len: usize) -> Result<&[u8], KotobaError> {
        self.storage.get(offset..offset + len).ok_or_else(|| {
            KotobaErrorKind::Resource.with_error(anyhow::anyhow!(
                "{}: requested [{}, {}) but file is only {} bytes",
                self.path,
                offset,
                offset + len,
                self.storage.len()
            ))
        })
    }
}
