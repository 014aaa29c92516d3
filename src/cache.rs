use std::collections::HashMap;

/// Per-client mirror of file contents, keyed by file name. This is the
/// client's belief about the session, not the authoritative value: the last
/// content-change applied for a file fully replaces the entry, no merging.
#[derive(Debug, Default)]
pub struct FileCache {
    contents: HashMap<String, String>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file_name: &str, content: &str) {
        self.contents.insert(file_name.to_string(), content.to_string());
    }

    pub fn get(&self, file_name: &str) -> Option<&str> {
        self.contents.get(file_name).map(|s| s.as_str())
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.contents.contains_key(file_name)
    }

    pub fn remove(&mut self, file_name: &str) -> Option<String> {
        self.contents.remove(file_name)
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}
