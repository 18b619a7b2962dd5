use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Source of file bytes for `#include` resolution.
///
/// Implementations may virtualise, cache, or mock; the compiler only ever
/// reads. Canonicalisation is part of the interface so the in-memory
/// implementation can deduplicate paths without touching a real disk.
pub trait FileSystem: Send + Sync {
    fn read_file(&self, path: &Path) -> io::Result<String>;

    /// Stable identity for a path, used to deduplicate opened files.
    fn canonicalize(&self, path: &Path) -> Option<PathBuf>;

    fn exists(&self, path: &Path) -> bool {
        self.canonicalize(path).is_some()
    }
}

/// Reads from the operating system.
#[derive(Debug, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn canonicalize(&self, path: &Path) -> Option<PathBuf> {
        std::fs::canonicalize(path).ok()
    }
}

/// In-memory file tree, used by tests and editor overlays.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: HashMap<PathBuf, String>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(normalize(&path.into()), content.into());
    }

    pub fn into_arc(self) -> Arc<dyn FileSystem> {
        Arc::new(self)
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(&normalize(path))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{}", path.display())))
    }

    fn canonicalize(&self, path: &Path) -> Option<PathBuf> {
        let normalized = normalize(path);
        self.files.contains_key(&normalized).then_some(normalized)
    }
}

/// Lexical normalisation: resolves `.` and `..` without consulting a disk.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_fs_round_trips_content() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/shaders/common.h", "int x;");
        assert_eq!(fs.read_file(Path::new("/shaders/common.h")).unwrap(), "int x;");
        assert!(fs.read_file(Path::new("/shaders/missing.h")).is_err());
    }

    #[test]
    fn memory_fs_normalizes_dot_segments() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/a/b.h", "x");
        assert!(fs.exists(Path::new("/a/./b.h")));
        assert!(fs.exists(Path::new("/a/c/../b.h")));
        assert_eq!(fs.canonicalize(Path::new("/a/./b.h")), Some(PathBuf::from("/a/b.h")));
    }

    #[test]
    fn os_fs_reads_real_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.glsl");
        std::fs::write(&path, "void main() {}").unwrap();

        let fs = OsFileSystem;
        assert_eq!(fs.read_file(&path).unwrap(), "void main() {}");
        assert!(fs.canonicalize(&path).is_some());
        assert!(!fs.exists(&dir.path().join("missing.glsl")));
    }
}
