use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cache::FileCache;
use crate::config::Config;
use crate::editor::EditorState;
use crate::error::SyncError;
use crate::events::{ContentChange, FileEvent, FileEventKind, SessionEvent, TypingEvent};
use crate::files::FileStore;
use crate::language::{completion_language, file_template, mode_for_file};
use crate::presence::PresenceTracker;
use crate::suggest::{CompletionService, SuggestionPipeline, SuggestionUpdate};

/// One client's view of a session. Consumes local edits and remote channel
/// events, keeps the file cache and the visible editor state consistent, and
/// republishes everything the rest of the session needs to see.
///
/// Conflict policy is last-write-wins throughout: the last content-change
/// physically applied replaces the state, no merging. Concurrent edits to
/// the same file interleave rather than converge.
pub struct SyncCoordinator<S, C: CompletionService> {
    session_id: String,
    user_name: String,
    default_entry_file: String,
    store: S,
    files: Vec<String>,
    cache: FileCache,
    editor: EditorState,
    presence: PresenceTracker,
    suggestions: SuggestionPipeline<C>,
    outbound: mpsc::UnboundedSender<SessionEvent>,
}

impl<S: FileStore, C: CompletionService> SyncCoordinator<S, C> {
    pub fn new(
        config: &Config,
        session_id: &str,
        user_name: &str,
        store: S,
        completion: Arc<C>,
        outbound: mpsc::UnboundedSender<SessionEvent>,
        suggestion_updates: mpsc::UnboundedSender<SuggestionUpdate>,
    ) -> Self {
        let default_mode = mode_for_file(&config.default_entry_file, "javascript");
        Self {
            session_id: session_id.to_string(),
            user_name: user_name.to_string(),
            default_entry_file: config.default_entry_file.clone(),
            store,
            files: Vec::new(),
            cache: FileCache::new(),
            editor: EditorState::new(&default_mode),
            presence: PresenceTracker::new(config.typing_silence()),
            suggestions: SuggestionPipeline::new(
                completion,
                config.suggestion_debounce(),
                config.suggestion_min_chars,
                suggestion_updates,
            ),
            outbound,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn cache(&self) -> &FileCache {
        &self.cache
    }

    pub fn active_file(&self) -> Option<&str> {
        self.editor.active_file()
    }

    pub fn open_tabs(&self) -> &[String] {
        self.editor.open_tabs()
    }

    pub fn visible_text(&self) -> String {
        self.editor.text()
    }

    fn publish(&self, event: SessionEvent) {
        if self.outbound.send(event).is_err() {
            warn!("session channel closed, event dropped");
        }
    }

    /// Initial state after joining: fetch the file list; an empty session
    /// gets the configured default entry file. When nothing ends up open the
    /// legacy whole-session document is shown instead, if one exists.
    pub async fn bootstrap(&mut self) -> Result<(), SyncError> {
        self.refresh_files().await?;

        if self.files.is_empty() {
            let name = self.default_entry_file.clone();
            self.create_file(&name).await?;
            return Ok(());
        }

        if self.editor.active_file().is_none() {
            match self.store.legacy_code(&self.session_id).await {
                Ok(code) if !code.is_empty() => self.editor.set_text(&code),
                _ => debug!("no legacy code for session {}, using files", self.session_id),
            }
        }
        Ok(())
    }

    /// A keystroke-driven local change: the buffer and the cache take it
    /// unconditionally, everyone else hears about it, and the suggestion
    /// pipeline gets a (debounced) look. With no file open the change is
    /// published without a file qualifier, the legacy mode every receiver
    /// applies to its visible buffer.
    pub fn on_local_edit(&mut self, content: &str) {
        self.editor.set_text(content);

        let file_name = self.editor.active_file().map(str::to_string);
        if let Some(name) = &file_name {
            self.cache.insert(name, content);
        }

        self.publish(SessionEvent::ContentChange(ContentChange {
            file_name,
            content: content.to_string(),
            user_name: Some(self.user_name.clone()),
        }));
        self.publish(SessionEvent::Typing(TypingEvent {
            user_name: self.user_name.clone(),
        }));

        let language = completion_language(self.editor.mode()).to_string();
        self.suggestions.request(content, &language);
    }

    /// Remote content-change: the cache entry is always overwritten; the
    /// visible buffer only when the event carries no file qualifier or names
    /// the active file. An edit to a file the viewer is not looking at must
    /// not disturb the visible buffer, yet opening that file later must show
    /// it without a round trip.
    pub fn on_remote_content_change(&mut self, ev: &ContentChange) {
        if let Some(name) = &ev.file_name {
            self.cache.insert(name, &ev.content);
        }

        let applies = match &ev.file_name {
            None => true,
            Some(name) => self.editor.active_file() == Some(name.as_str()),
        };
        if applies {
            self.editor.set_text(&ev.content);
        }
        if let Some(user) = &ev.user_name {
            debug!("{} changed {:?}", user, ev.file_name);
        }
    }

    /// Remote file-created / file-deleted. File metadata is never merged
    /// locally; the list is re-fetched from the store. A delete additionally
    /// evicts the cache entry and fails the active file over.
    pub async fn on_remote_file_event(
        &mut self,
        kind: FileEventKind,
        file_name: &str,
    ) -> Result<(), SyncError> {
        info!("remote file event {:?}: {}", kind, file_name);
        if kind == FileEventKind::Deleted {
            self.evict_file(file_name).await?;
        }
        self.refresh_files().await
    }

    pub async fn on_remote_typing(&self, user_name: &str) {
        self.presence.user_typing(user_name).await;
    }

    pub async fn on_remote_stop_typing(&self, user_name: &str) {
        self.presence.user_stopped(user_name).await;
    }

    pub async fn typing_users(&self) -> Vec<String> {
        self.presence.typing_users().await
    }

    /// Tell the session this client is done typing.
    pub fn notify_stopped_typing(&self) {
        self.publish(SessionEvent::StopTyping(TypingEvent {
            user_name: self.user_name.clone(),
        }));
    }

    /// Dispatch one event received from the session channel.
    pub async fn handle_remote(&mut self, event: SessionEvent) -> Result<(), SyncError> {
        match event {
            SessionEvent::ContentChange(ev) => {
                self.on_remote_content_change(&ev);
                Ok(())
            }
            SessionEvent::FileCreated(ev) => {
                self.on_remote_file_event(FileEventKind::Created, &ev.file_name).await
            }
            SessionEvent::FileDeleted(ev) => {
                self.on_remote_file_event(FileEventKind::Deleted, &ev.file_name).await
            }
            SessionEvent::Typing(ev) => {
                self.on_remote_typing(&ev.user_name).await;
                Ok(())
            }
            SessionEvent::StopTyping(ev) => {
                self.on_remote_stop_typing(&ev.user_name).await;
                Ok(())
            }
        }
    }

    /// Open a file in the editor: cached content is shown without a network
    /// round trip, anything else is fetched and cached.
    pub async fn open_file(&mut self, file_name: &str) -> Result<(), SyncError> {
        self.show_file(file_name).await
    }

    /// Close a tab, failing the active file over to another open tab or a
    /// cleared editor. The cache entry survives a close.
    pub async fn close_tab(&mut self, file_name: &str) -> Result<(), SyncError> {
        if let Some(next) = self.editor.remove_tab(file_name) {
            self.show_file(&next).await?;
        }
        Ok(())
    }

    /// Create a file (with starter content for its extension), announce it,
    /// and open it.
    pub async fn create_file(&mut self, file_name: &str) -> Result<(), SyncError> {
        let template = file_template(file_name);
        self.store.create(&self.session_id, file_name, &template).await?;

        self.publish(SessionEvent::FileCreated(FileEvent {
            file_name: file_name.to_string(),
        }));

        self.cache.insert(file_name, &template);
        self.refresh_files().await?;
        self.show_file(file_name).await
    }

    /// Delete a file. Local state is only touched once the store accepted
    /// the delete.
    pub async fn delete_file(&mut self, file_name: &str) -> Result<(), SyncError> {
        self.store.delete(&self.session_id, file_name).await?;

        self.publish(SessionEvent::FileDeleted(FileEvent {
            file_name: file_name.to_string(),
        }));

        self.evict_file(file_name).await?;
        self.refresh_files().await
    }

    /// Persist the visible buffer. With an active file this updates the
    /// store, the cache, and the session; with none it falls back to the
    /// legacy whole-session document.
    pub async fn save_active(&mut self) -> Result<(), SyncError> {
        let content = self.editor.text();
        match self.editor.active_file().map(str::to_string) {
            Some(name) => {
                self.store.update(&self.session_id, &name, &content).await?;
                self.cache.insert(&name, &content);
                self.publish(SessionEvent::ContentChange(ContentChange {
                    file_name: Some(name),
                    content,
                    user_name: Some(self.user_name.clone()),
                }));
                Ok(())
            }
            None => self.store.update_legacy_code(&self.session_id, &content).await,
        }
    }

    /// Session teardown: every presence timer and any pending debounce is
    /// cancelled so nothing fires into a torn-down session.
    pub async fn shutdown(&mut self) {
        self.presence.shutdown().await;
        self.suggestions.shutdown();
    }

    async fn refresh_files(&mut self) -> Result<(), SyncError> {
        self.files = self.store.list(&self.session_id).await?;
        Ok(())
    }

    async fn show_file(&mut self, file_name: &str) -> Result<(), SyncError> {
        let content = match self.cache.get(file_name) {
            Some(cached) => cached.to_string(),
            None => {
                let fetched = self.store.fetch(&self.session_id, file_name).await?;
                self.cache.insert(file_name, &fetched);
                fetched
            }
        };
        self.editor.activate(file_name, &content);
        Ok(())
    }

    async fn evict_file(&mut self, file_name: &str) -> Result<(), SyncError> {
        self.cache.remove(file_name);
        if let Some(next) = self.editor.remove_tab(file_name) {
            self.show_file(&next).await?;
        }
        Ok(())
    }
}
