use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

struct UserEntry {
    last_seen: Instant,
    expiry: CancellationToken,
}

/// The set of users currently typing in one session. Each typing event
/// refreshes the user's silence timer; an explicit stop or a full silence
/// window removes the user. One authoritative window, no secondary sweep.
pub struct PresenceTracker {
    silence: Duration,
    users: Arc<Mutex<HashMap<String, UserEntry>>>,
}

impl PresenceTracker {
    pub fn new(silence: Duration) -> Self {
        Self {
            silence,
            users: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// A typing event arrived for `user_name`: add or refresh the entry and
    /// restart its silence timer, cancelling any previous one.
    pub async fn user_typing(&self, user_name: &str) {
        let expiry = CancellationToken::new();

        {
            let mut users = self.users.lock().await;
            if let Some(old) = users.insert(
                user_name.to_string(),
                UserEntry { last_seen: Instant::now(), expiry: expiry.clone() },
            ) {
                old.expiry.cancel();
            }
        }

        let users = self.users.clone();
        let silence = self.silence;
        let name = user_name.to_string();

        tokio::spawn(async move {
            tokio::select! {
                _ = expiry.cancelled() => {}
                _ = tokio::time::sleep(silence) => {
                    let mut users = users.lock().await;
                    // The timer may have been refreshed between firing and
                    // taking the lock; only remove a genuinely silent entry.
                    if let Some(entry) = users.get(&name) {
                        if entry.last_seen.elapsed() >= silence {
                            users.remove(&name);
                            debug!("presence: {} expired after silence", name);
                        }
                    }
                }
            }
        });
    }

    /// An explicit stop-typing event: remove immediately and cancel the timer.
    pub async fn user_stopped(&self, user_name: &str) {
        let mut users = self.users.lock().await;
        if let Some(entry) = users.remove(user_name) {
            entry.expiry.cancel();
        }
    }

    pub async fn typing_users(&self) -> Vec<String> {
        let users = self.users.lock().await;
        let mut names: Vec<String> = users.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn count(&self) -> usize {
        self.users.lock().await.len()
    }

    /// Session teardown: cancel every pending timer so no callback outlives
    /// the session context.
    pub async fn shutdown(&self) {
        let mut users = self.users.lock().await;
        for (_, entry) in users.drain() {
            entry.expiry.cancel();
        }
    }
}

#[cfg(test)]
mod presence_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_user_expires_after_silence_window() {
        let tracker = PresenceTracker::new(Duration::from_secs(3));
        tracker.user_typing("ada").await;
        assert_eq!(tracker.count().await, 1);

        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert_eq!(tracker.count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_refreshes_the_timer() {
        let tracker = PresenceTracker::new(Duration::from_secs(3));
        tracker.user_typing("ada").await;

        tokio::time::sleep(Duration::from_secs(2)).await;
        tracker.user_typing("ada").await;

        // 2s after the refresh the original window has long passed, but the
        // user must still be present.
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(tracker.typing_users().await, vec!["ada".to_string()]);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(tracker.count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_stop_removes_immediately() {
        let tracker = PresenceTracker::new(Duration::from_secs(3));
        tracker.user_typing("ada").await;
        tracker.user_typing("grace").await;

        tracker.user_stopped("ada").await;
        assert_eq!(tracker.typing_users().await, vec!["grace".to_string()]);

        // And the cancelled timer must not resurrect or double-remove anyone.
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(tracker.count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_is_keyed_by_user_name() {
        let tracker = PresenceTracker::new(Duration::from_secs(3));
        tracker.user_typing("ada").await;
        tracker.user_typing("ada").await;
        tracker.user_typing("ada").await;
        assert_eq!(tracker.count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_all_timers() {
        let tracker = PresenceTracker::new(Duration::from_secs(3));
        tracker.user_typing("ada").await;
        tracker.user_typing("grace").await;
        tracker.shutdown().await;
        assert_eq!(tracker.count().await, 0);
    }
}
