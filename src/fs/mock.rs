use super::FileSystem;
use super::patterns::normalize;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { content: Vec<u8>, mtime: SystemTime },
    Dir(Vec<String>), // List of child names
}

#[derive(Debug, Default)]
struct MockState {
    entries: HashMap<PathBuf, MockEntry>,
    /// Logical clock in seconds; every write advances it by one.
    clock: u64,
}

impl MockState {
    fn tick(&mut self) -> SystemTime {
        self.clock += 1;
        UNIX_EPOCH + Duration::from_secs(self.clock)
    }
}

/// In-memory filesystem with a logical clock for modification times.
///
/// Each write or [`MockFileSystem::touch`] stamps the file with a strictly
/// later mtime than any previous write, so ordering-based staleness can be
/// tested deterministically.
#[derive(Debug, Clone)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut state = MockState::default();
        // Ensure root exists
        state
            .entries
            .insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));

        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = normalize(path.as_ref());
        let mut state = self.state.lock().unwrap();
        let mtime = state.tick();
        state.entries.insert(
            path.clone(),
            MockEntry::File {
                content: content.into(),
                mtime,
            },
        );
        link_into_parent(&mut state.entries, &path);
    }

    /// Bump the modification time of an existing file, creating it empty if
    /// it does not exist.
    pub fn touch(&self, path: impl AsRef<Path>) {
        let path = normalize(path.as_ref());
        let mut state = self.state.lock().unwrap();
        if !matches!(state.entries.get(&path), Some(MockEntry::File { .. })) {
            drop(state);
            self.add_file(&path, Vec::new());
            return;
        }
        let now = state.tick();
        if let Some(MockEntry::File { mtime, .. }) = state.entries.get_mut(&path) {
            *mtime = now;
        }
    }

    /// Contents of a file, if present.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        match state.entries.get(&normalize(path.as_ref())) {
            Some(MockEntry::File { content, .. }) => Some(content.clone()),
            _ => None,
        }
    }
}

fn normalized_parent(path: &Path) -> Option<&Path> {
    let parent = path.parent()?;
    if parent.as_os_str().is_empty() {
        Some(Path::new("."))
    } else {
        Some(parent)
    }
}

/// Register `path` as a child of its parent directory, creating parent
/// directories as needed.
fn link_into_parent(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    let Some(parent) = normalized_parent(path) else {
        return;
    };
    if parent == path {
        return;
    }

    if !entries.contains_key(parent) {
        entries.insert(parent.to_path_buf(), MockEntry::Dir(Vec::new()));
        link_into_parent(entries, parent);
    }

    if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if !children.iter().any(|c| c == name) {
                children.push(name.to_string());
            }
        }
    }
}

impl FileSystem for MockFileSystem {
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        state.entries.contains_key(&normalize(path))
    }

    fn is_file(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        matches!(state.entries.get(&normalize(path)), Some(MockEntry::File { .. }))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        matches!(state.entries.get(&normalize(path)), Some(MockEntry::Dir(_)))
    }

    fn modified(&self, path: &Path) -> Option<SystemTime> {
        let state = self.state.lock().unwrap();
        match state.entries.get(&normalize(path)) {
            Some(MockEntry::File { mtime, .. }) => Some(*mtime),
            _ => None,
        }
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let path = normalize(path);
        let path = path.as_path();
        let mut state = self.state.lock().unwrap();
        if matches!(state.entries.get(path), Some(MockEntry::Dir(_))) {
            return Err(anyhow!("Is a directory: {:?}", path));
        }
        if state.entries.remove(path).is_none() {
            return Ok(());
        }

        if let (Some(parent), Some(name)) = (
            normalized_parent(path),
            path.file_name().and_then(|n| n.to_str()),
        ) {
            if let Some(MockEntry::Dir(children)) = state.entries.get_mut(parent) {
                children.retain(|c| c != name);
            }
        }
        Ok(())
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let path = normalize(path);
        let state = self.state.lock().unwrap();
        match state.entries.get(&path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| normalize(&path.join(name))).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}
