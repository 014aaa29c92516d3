use ropey::Rope;

use crate::language::mode_for_file;

/// What the editor currently shows: at most one active file, the open tabs,
/// and the visible text buffer. Owned exclusively by the local client; remote
/// events only reach it through the sync coordinator.
pub struct EditorState {
    buffer: Rope,
    active: Option<String>,
    tabs: Vec<String>,
    mode: String,
    default_mode: String,
}

impl EditorState {
    pub fn new(default_mode: &str) -> Self {
        Self {
            buffer: Rope::new(),
            active: None,
            tabs: Vec::new(),
            mode: default_mode.to_string(),
            default_mode: default_mode.to_string(),
        }
    }

    pub fn active_file(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn open_tabs(&self) -> &[String] {
        &self.tabs
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    /// Make `file_name` the active file, showing `content`, and add it to the
    /// open tabs if it is not there yet.
    pub fn activate(&mut self, file_name: &str, content: &str) {
        self.mode = mode_for_file(file_name, &self.default_mode);
        self.buffer = Rope::from_str(content);
        self.active = Some(file_name.to_string());
        if !self.tabs.iter().any(|t| t == file_name) {
            self.tabs.push(file_name.to_string());
        }
    }

    /// Replace the visible buffer wholesale. Used for local keystrokes and
    /// for remote changes that target the active file (or carry no file
    /// qualifier at all).
    pub fn set_text(&mut self, content: &str) {
        self.buffer = Rope::from_str(content);
    }

    /// Drop `file_name` from the open tabs. Returns the tab the editor
    /// should fail over to when the removed file was the active one.
    pub fn remove_tab(&mut self, file_name: &str) -> Option<String> {
        self.tabs.retain(|t| t != file_name);

        if self.active.as_deref() == Some(file_name) {
            match self.tabs.first().cloned() {
                Some(next) => return Some(next),
                None => self.clear(),
            }
        }
        None
    }

    /// No active file: empty buffer, default mode. The legacy whole-session
    /// content may be loaded into this state.
    pub fn clear(&mut self) {
        self.active = None;
        self.buffer = Rope::new();
        self.mode = self.default_mode.clone();
    }
}

#[cfg(test)]
mod editor_tests {
    use super::*;

    #[test]
    fn test_activate_sets_mode_and_tab() {
        let mut editor = EditorState::new("javascript");
        editor.activate("main.py", "print(1)");
        assert_eq!(editor.active_file(), Some("main.py"));
        assert_eq!(editor.mode(), "python");
        assert_eq!(editor.text(), "print(1)");
        assert_eq!(editor.open_tabs(), &["main.py".to_string()]);

        // activating again must not duplicate the tab
        editor.activate("main.py", "print(2)");
        assert_eq!(editor.open_tabs().len(), 1);
    }

    #[test]
    fn test_remove_inactive_tab_keeps_editor() {
        let mut editor = EditorState::new("javascript");
        editor.activate("a.js", "a");
        editor.activate("b.js", "b");
        assert_eq!(editor.remove_tab("a.js"), None);
        assert_eq!(editor.active_file(), Some("b.js"));
        assert_eq!(editor.text(), "b");
    }

    #[test]
    fn test_remove_active_tab_fails_over() {
        let mut editor = EditorState::new("javascript");
        editor.activate("a.js", "a");
        editor.activate("b.py", "b");
        assert_eq!(editor.remove_tab("b.py"), Some("a.js".to_string()));
    }

    #[test]
    fn test_remove_last_tab_clears() {
        let mut editor = EditorState::new("javascript");
        editor.activate("only.py", "x");
        assert_eq!(editor.remove_tab("only.py"), None);
        assert_eq!(editor.active_file(), None);
        assert_eq!(editor.text(), "");
        assert_eq!(editor.mode(), "javascript");
    }
}
