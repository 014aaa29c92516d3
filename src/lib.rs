pub mod app_state;
pub mod cache;
pub mod config;
pub mod editor;
pub mod error;
pub mod events;
pub mod files;
pub mod handlers;
pub mod language;
pub mod presence;
pub mod suggest;
pub mod sync;

pub use cache::FileCache;
pub use editor::EditorState;
pub use error::{SuggestError, SyncError};
pub use events::{ContentChange, FileEvent, FileEventKind, SessionEvent, TypingEvent};
pub use files::{FileStore, HttpFileStore, MemoryFileStore};
pub use presence::PresenceTracker;
pub use suggest::{CompletionService, SuggestionPipeline, SuggestionUpdate, WsCompletionClient};
pub use sync::SyncCoordinator;
