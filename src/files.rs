use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::SyncError;

/// The external file collaborator: persistent storage for a session's files
/// plus the legacy whole-session code document. Every call carries the
/// caller's opaque authorization token.
pub trait FileStore: Send + Sync {
    fn list(&self, session_id: &str)
        -> impl Future<Output = Result<Vec<String>, SyncError>> + Send;
    fn fetch(&self, session_id: &str, file_name: &str)
        -> impl Future<Output = Result<String, SyncError>> + Send;
    fn create(&self, session_id: &str, file_name: &str, content: &str)
        -> impl Future<Output = Result<(), SyncError>> + Send;
    fn update(&self, session_id: &str, file_name: &str, content: &str)
        -> impl Future<Output = Result<(), SyncError>> + Send;
    fn delete(&self, session_id: &str, file_name: &str)
        -> impl Future<Output = Result<(), SyncError>> + Send;

    /// Single-document path from before files existed. Still read at
    /// bootstrap and written when a save happens with no active file.
    fn legacy_code(&self, session_id: &str)
        -> impl Future<Output = Result<String, SyncError>> + Send;
    fn update_legacy_code(&self, session_id: &str, code: &str)
        -> impl Future<Output = Result<(), SyncError>> + Send;
}

// Clients share a store handle; delegate through Arc.
impl<T: FileStore> FileStore for std::sync::Arc<T> {
    fn list(&self, session_id: &str)
        -> impl Future<Output = Result<Vec<String>, SyncError>> + Send {
        (**self).list(session_id)
    }
    fn fetch(&self, session_id: &str, file_name: &str)
        -> impl Future<Output = Result<String, SyncError>> + Send {
        (**self).fetch(session_id, file_name)
    }
    fn create(&self, session_id: &str, file_name: &str, content: &str)
        -> impl Future<Output = Result<(), SyncError>> + Send {
        (**self).create(session_id, file_name, content)
    }
    fn update(&self, session_id: &str, file_name: &str, content: &str)
        -> impl Future<Output = Result<(), SyncError>> + Send {
        (**self).update(session_id, file_name, content)
    }
    fn delete(&self, session_id: &str, file_name: &str)
        -> impl Future<Output = Result<(), SyncError>> + Send {
        (**self).delete(session_id, file_name)
    }
    fn legacy_code(&self, session_id: &str)
        -> impl Future<Output = Result<String, SyncError>> + Send {
        (**self).legacy_code(session_id)
    }
    fn update_legacy_code(&self, session_id: &str, code: &str)
        -> impl Future<Output = Result<(), SyncError>> + Send {
        (**self).update_legacy_code(session_id, code)
    }
}

#[derive(Debug, Deserialize)]
struct FileMeta {
    name: String,
}

#[derive(Debug, Deserialize)]
struct FilesResponse {
    #[serde(default)]
    files: Vec<FileMeta>,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LegacyCodeResponse {
    #[serde(default)]
    code: Option<String>,
}

/// REST client for the file collaborator.
pub struct HttpFileStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpFileStore {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn files_url(&self, session_id: &str) -> String {
        format!("{}/session/{}/files", self.base_url, session_id)
    }
}

impl FileStore for HttpFileStore {
    async fn list(&self, session_id: &str) -> Result<Vec<String>, SyncError> {
        let resp: FilesResponse = self
            .client
            .get(self.files_url(session_id))
            .header(AUTHORIZATION, &self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.files.into_iter().map(|f| f.name).collect())
    }

    async fn fetch(&self, session_id: &str, file_name: &str) -> Result<String, SyncError> {
        let resp: ContentResponse = self
            .client
            .get(format!("{}/{}", self.files_url(session_id), file_name))
            .header(AUTHORIZATION, &self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.content.unwrap_or_default())
    }

    async fn create(&self, session_id: &str, file_name: &str, content: &str) -> Result<(), SyncError> {
        self.client
            .post(self.files_url(session_id))
            .header(AUTHORIZATION, &self.token)
            .json(&json!({ "fileName": file_name, "content": content }))
            .send()
            .await?
            .error_for_status()?;
        debug!("created {} in session {}", file_name, session_id);
        Ok(())
    }

    async fn update(&self, session_id: &str, file_name: &str, content: &str) -> Result<(), SyncError> {
        self.client
            .put(format!("{}/{}/content", self.files_url(session_id), file_name))
            .header(AUTHORIZATION, &self.token)
            .json(&json!({ "content": content }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn delete(&self, session_id: &str, file_name: &str) -> Result<(), SyncError> {
        self.client
            .delete(format!("{}/{}", self.files_url(session_id), file_name))
            .header(AUTHORIZATION, &self.token)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn legacy_code(&self, session_id: &str) -> Result<String, SyncError> {
        let resp: LegacyCodeResponse = self
            .client
            .get(format!("{}/code/getCode/{}", self.base_url, session_id))
            .header(AUTHORIZATION, &self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.code.unwrap_or_default())
    }

    async fn update_legacy_code(&self, session_id: &str, code: &str) -> Result<(), SyncError> {
        self.client
            .put(format!("{}/code/update/{}", self.base_url, session_id))
            .header(AUTHORIZATION, &self.token)
            .json(&json!({ "code": code }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// In-memory store used by tests and local demos. Counts fetches so tests
/// can assert that cached opens skip the round trip.
#[derive(Default)]
pub struct MemoryFileStore {
    sessions: Mutex<HashMap<String, HashMap<String, String>>>,
    legacy: Mutex<HashMap<String, String>>,
    fetches: Mutex<u64>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetch_count(&self) -> u64 {
        *self.fetches.lock().unwrap()
    }

    pub fn seed(&self, session_id: &str, file_name: &str, content: &str) {
        self.sessions
            .lock()
            .unwrap()
            .entry(session_id.to_string())
            .or_default()
            .insert(file_name.to_string(), content.to_string());
    }
}

impl FileStore for MemoryFileStore {
    async fn list(&self, session_id: &str) -> Result<Vec<String>, SyncError> {
        let sessions = self.sessions.lock().unwrap();
        let mut names: Vec<String> = sessions
            .get(session_id)
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        Ok(names)
    }

    async fn fetch(&self, session_id: &str, file_name: &str) -> Result<String, SyncError> {
        *self.fetches.lock().unwrap() += 1;
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .and_then(|files| files.get(file_name))
            .cloned()
            .ok_or_else(|| SyncError::UnknownFile(file_name.to_string()))
    }

    async fn create(&self, session_id: &str, file_name: &str, content: &str) -> Result<(), SyncError> {
        self.seed(session_id, file_name, content);
        Ok(())
    }

    async fn update(&self, session_id: &str, file_name: &str, content: &str) -> Result<(), SyncError> {
        let mut sessions = self.sessions.lock().unwrap();
        let files = sessions
            .get_mut(session_id)
            .ok_or_else(|| SyncError::FileOp(format!("no session {}", session_id)))?;
        match files.get_mut(file_name) {
            Some(existing) => {
                *existing = content.to_string();
                Ok(())
            }
            None => Err(SyncError::UnknownFile(file_name.to_string())),
        }
    }

    async fn delete(&self, session_id: &str, file_name: &str) -> Result<(), SyncError> {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(files) = sessions.get_mut(session_id) {
            files.remove(file_name);
        }
        Ok(())
    }

    async fn legacy_code(&self, session_id: &str) -> Result<String, SyncError> {
        self.legacy
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or_else(|| SyncError::FileOp("legacy code not found".to_string()))
    }

    async fn update_legacy_code(&self, session_id: &str, code: &str) -> Result<(), SyncError> {
        self.legacy
            .lock()
            .unwrap()
            .insert(session_id.to_string(), code.to_string());
        Ok(())
    }
}
