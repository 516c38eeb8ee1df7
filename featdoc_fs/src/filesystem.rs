//! File-system access used by the loader.
//!
//! [`OsFileSystem`] talks to the real disk. [`MemoryFileSystem`] keeps files
//! in memory and counts open readers, which makes handle release observable.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Minimal read-only file-system capability.
pub trait FileSystem {
    /// Open `path` for reading. The handle is released when the box is dropped.
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + '_>>;

    /// Resolve `path` to an absolute path without touching the disk. `.` and
    /// `..` components are folded lexically.
    fn full_path(&self, path: &Path) -> io::Result<PathBuf>;
}

impl<F: FileSystem + ?Sized> FileSystem for &F {
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
        (**self).open_read(path)
    }

    fn full_path(&self, path: &Path) -> io::Result<PathBuf> {
        (**self).full_path(path)
    }
}

/// The host operating system's file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(File::open(path)?))
    }

    fn full_path(&self, path: &Path) -> io::Result<PathBuf> {
        let absolute = std::path::absolute(path)?;
        Ok(normalize(Path::new("/"), &absolute))
    }
}

/// In-memory file system rooted at a fixed working directory.
#[derive(Debug, Clone)]
pub struct MemoryFileSystem {
    files: Arc<RwLock<HashMap<PathBuf, Arc<[u8]>>>>,
    current_dir: PathBuf,
    open_handles: Arc<AtomicUsize>,
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new("/")
    }
}

impl MemoryFileSystem {
    /// Create an empty file system whose relative paths resolve against `current_dir`.
    pub fn new<P: AsRef<Path>>(current_dir: P) -> Self {
        MemoryFileSystem {
            files: Arc::new(RwLock::new(HashMap::new())),
            current_dir: normalize(Path::new("/"), current_dir.as_ref()),
            open_handles: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Add or replace a file.
    pub fn add_file<P: AsRef<Path>, B: Into<Vec<u8>>>(&self, path: P, contents: B) {
        let key = self.resolve(path.as_ref());
        let contents: Arc<[u8]> = Arc::from(contents.into());
        self.write_files().insert(key, contents);
    }

    /// Builder form of [`MemoryFileSystem::add_file`].
    pub fn with_file<P: AsRef<Path>, B: Into<Vec<u8>>>(self, path: P, contents: B) -> Self {
        self.add_file(path, contents);
        self
    }

    /// Remove a file, returning whether it existed.
    pub fn remove_file<P: AsRef<Path>>(&self, path: P) -> bool {
        let key = self.resolve(path.as_ref());
        self.write_files().remove(&key).is_some()
    }

    pub fn exists<P: AsRef<Path>>(&self, path: P) -> bool {
        let key = self.resolve(path.as_ref());
        self.read_files().contains_key(&key)
    }

    /// Number of readers handed out by `open_read` that are still alive.
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        normalize(&self.current_dir, path)
    }

    fn read_files(&self) -> std::sync::RwLockReadGuard<'_, HashMap<PathBuf, Arc<[u8]>>> {
        self.files.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_files(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<PathBuf, Arc<[u8]>>> {
        self.files.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FileSystem for MemoryFileSystem {
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
        let key = self.resolve(path);
        let contents = self.read_files().get(&key).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("could not find file '{}'", key.display()),
            )
        })?;

        self.open_handles.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryFile {
            cursor: Cursor::new(contents),
            open_handles: Arc::clone(&self.open_handles),
        }))
    }

    fn full_path(&self, path: &Path) -> io::Result<PathBuf> {
        Ok(self.resolve(path))
    }
}

struct MemoryFile {
    cursor: Cursor<Arc<[u8]>>,
    open_handles: Arc<AtomicUsize>,
}

impl Read for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Drop for MemoryFile {
    fn drop(&mut self) {
        self.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Join `path` onto `base` and fold `.` and `..` lexically.
fn normalize(base: &Path, path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in base.join(path).components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}
