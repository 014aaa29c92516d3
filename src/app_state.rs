use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub socket2session: Arc<Mutex<HashMap<String, Membership>>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            socket2session: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

/// Which session a connected socket belongs to. Relays route by this record,
/// never by anything the payload claims, so events can only reach the room
/// the sender actually joined.
#[derive(Clone, Debug)]
pub struct Membership {
    pub session_id: String,
    pub user_name: Option<String>,
}
