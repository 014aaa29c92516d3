use serde::{Deserialize, Serialize};

/// Wire payloads of the session channel. Field names are part of the
/// contract with existing clients, hence the camelCase renames.

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub session_id: String,
    #[serde(default)]
    pub user_name: Option<String>,
}

/// A whole-content update for one file. `file_name` is absent in legacy
/// mode, when a client edits the session before any file exists; such an
/// update applies to every receiver's visible buffer.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ContentChange {
    #[serde(default)]
    pub file_name: Option<String>,
    pub content: String,
    #[serde(default)]
    pub user_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FileEvent {
    pub file_name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TypingEvent {
    pub user_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    Created,
    Deleted,
}

/// The five broadcast events a session member can publish or receive.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    ContentChange(ContentChange),
    FileCreated(FileEvent),
    FileDeleted(FileEvent),
    Typing(TypingEvent),
    StopTyping(TypingEvent),
}

impl SessionEvent {
    /// socket.io event name this variant travels under.
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::ContentChange(_) => "content-change",
            SessionEvent::FileCreated(_) => "file-created",
            SessionEvent::FileDeleted(_) => "file-deleted",
            SessionEvent::Typing(_) => "typing",
            SessionEvent::StopTyping(_) => "stop-typing",
        }
    }
}
