use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::fs::FileSystem;
use crate::source::FileId;

#[derive(Debug, Clone)]
struct SourceFileEntry {
    path: Option<PathBuf>,
    content: Arc<str>,
}

/// Owns every source buffer of one compilation and hands out stable
/// [`FileId`]s. Opening the same canonical path twice returns the first
/// handle. Buffers are shared `Arc<str>` so a nested tokenizer can hold one
/// while new files are opened.
pub struct SourceManager {
    fs: Arc<dyn FileSystem>,
    system_preamble: Arc<str>,
    user_preamble: Arc<str>,
    entries: Vec<SourceFileEntry>,
    by_canonical: FxHashMap<PathBuf, FileId>,
}

impl SourceManager {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            system_preamble: Arc::from(""),
            user_preamble: Arc::from(""),
            entries: Vec::new(),
            by_canonical: FxHashMap::default(),
        }
    }

    pub fn set_system_preamble(&mut self, content: impl Into<Arc<str>>) {
        self.system_preamble = content.into();
    }

    pub fn set_user_preamble(&mut self, content: impl Into<Arc<str>>) {
        self.user_preamble = content.into();
    }

    /// Register an in-memory buffer (the main file, usually).
    pub fn open_buffer(&mut self, content: impl Into<Arc<str>>) -> FileId {
        self.entries.push(SourceFileEntry { path: None, content: content.into() });
        FileId::from_user_index(self.entries.len() - 1)
    }

    /// Open a file through the file-system provider, deduplicating by
    /// canonical path.
    pub fn open_file(&mut self, path: &Path) -> Option<FileId> {
        let canonical = self.fs.canonicalize(path)?;
        if let Some(&id) = self.by_canonical.get(&canonical) {
            return Some(id);
        }

        let content = self.fs.read_file(&canonical).ok()?;
        self.entries.push(SourceFileEntry {
            path: Some(canonical.clone()),
            content: Arc::from(content.as_str()),
        });
        let id = FileId::from_user_index(self.entries.len() - 1);
        self.by_canonical.insert(canonical, id);
        Some(id)
    }

    pub fn content(&self, file: FileId) -> Arc<str> {
        if file.is_system_preamble() {
            self.system_preamble.clone()
        } else if file.is_user_preamble() {
            self.user_preamble.clone()
        } else if let Some(index) = file.user_index() {
            self.entries[index].content.clone()
        } else {
            Arc::from("")
        }
    }

    pub fn path(&self, file: FileId) -> Option<&Path> {
        let index = file.user_index()?;
        self.entries[index].path.as_deref()
    }

    pub fn file_count(&self) -> usize {
        self.entries.len()
    }

    /// Paths of every user file, index-aligned with user file ids.
    pub fn file_paths(&self) -> Vec<Option<PathBuf>> {
        self.entries.iter().map(|e| e.path.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    fn manager_with(files: &[(&str, &str)]) -> SourceManager {
        let mut fs = MemoryFileSystem::new();
        for (path, content) in files {
            fs.add_file(*path, *content);
        }
        SourceManager::new(fs.into_arc())
    }

    #[test]
    fn buffers_get_sequential_user_ids() {
        let mut sources = manager_with(&[]);
        let a = sources.open_buffer("int a;");
        let b = sources.open_buffer("int b;");
        assert_ne!(a, b);
        assert_eq!(&*sources.content(a), "int a;");
        assert_eq!(&*sources.content(b), "int b;");
    }

    #[test]
    fn opening_same_canonical_path_is_deduplicated() {
        let mut sources = manager_with(&[("/inc/h.glsl", "int x;")]);
        let first = sources.open_file(Path::new("/inc/h.glsl")).unwrap();
        let second = sources.open_file(Path::new("/inc/./h.glsl")).unwrap();
        assert_eq!(first, second);
        assert_eq!(sources.file_count(), 1);
    }

    #[test]
    fn missing_file_returns_none() {
        let mut sources = manager_with(&[]);
        assert!(sources.open_file(Path::new("/nope.glsl")).is_none());
    }

    #[test]
    fn preamble_contents_are_reachable_by_id() {
        let mut sources = manager_with(&[]);
        sources.set_system_preamble("vec4 gl_Position;");
        assert_eq!(&*sources.content(FileId::SYSTEM_PREAMBLE), "vec4 gl_Position;");
        assert_eq!(&*sources.content(FileId::USER_PREAMBLE), "");
    }
}
