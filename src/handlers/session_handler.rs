use serde_json::json;
use socketioxide::extract::{AckSender, Data, SocketRef, State};
use tracing::{info, warn};

use crate::app_state::{AppState, Membership};
use crate::events::{ContentChange, FileEvent, JoinRequest, SessionEvent, TypingEvent};

/// Resolve the session the socket has joined. Events arriving before a join
/// have nowhere safe to go and are dropped.
async fn member_session(socket: &SocketRef, state: &AppState) -> Option<String> {
    let members = state.socket2session.lock().await;
    members.get(socket.id.as_str()).map(|m| m.session_id.clone())
}

/// Re-broadcast one event to the rest of the sender's room, under the wire
/// name its variant travels as.
async fn relay(socket: &SocketRef, session_id: String, event: SessionEvent) {
    let name = event.name();
    match event {
        SessionEvent::ContentChange(payload) => {
            socket.to(session_id).emit(name, &payload).await.ok();
        }
        SessionEvent::FileCreated(payload) | SessionEvent::FileDeleted(payload) => {
            socket.to(session_id).emit(name, &payload).await.ok();
        }
        SessionEvent::Typing(payload) | SessionEvent::StopTyping(payload) => {
            socket.to(session_id).emit(name, &payload).await.ok();
        }
    }
}

pub async fn handle_join(
    socket: SocketRef,
    Data(request): Data<JoinRequest>,
    ack: AckSender,
    state: State<AppState>,
) {
    info!("Received join: {} from {}", request.session_id, socket.id);

    let sid = socket.id.as_str().to_string();
    let mut members = state.socket2session.lock().await;

    // A socket subscribes to exactly one session at a time; re-joining moves
    // it out of the old room first.
    if let Some(previous) = members.get(&sid) {
        socket.leave(previous.session_id.clone());
    }
    socket.join(request.session_id.clone());

    members.insert(
        sid,
        Membership {
            session_id: request.session_id.clone(),
            user_name: request.user_name.clone(),
        },
    );

    ack.send(&json!({ "success": true, "sessionId": request.session_id })).ok();
}

pub async fn handle_content_change(
    socket: SocketRef,
    Data(change): Data<ContentChange>,
    state: State<AppState>,
) {
    let Some(session_id) = member_session(&socket, &state).await else {
        warn!("content-change from {} before join, dropped", socket.id);
        return;
    };

    info!(
        "Relaying content-change in {} (file {:?})",
        session_id, change.file_name
    );
    relay(&socket, session_id, SessionEvent::ContentChange(change)).await;
}

pub async fn handle_file_created(
    socket: SocketRef,
    Data(event): Data<FileEvent>,
    state: State<AppState>,
) {
    let Some(session_id) = member_session(&socket, &state).await else {
        warn!("file-created from {} before join, dropped", socket.id);
        return;
    };

    info!("Relaying file-created in {}: {}", session_id, event.file_name);
    relay(&socket, session_id, SessionEvent::FileCreated(event)).await;
}

pub async fn handle_file_deleted(
    socket: SocketRef,
    Data(event): Data<FileEvent>,
    state: State<AppState>,
) {
    let Some(session_id) = member_session(&socket, &state).await else {
        warn!("file-deleted from {} before join, dropped", socket.id);
        return;
    };

    info!("Relaying file-deleted in {}: {}", session_id, event.file_name);
    relay(&socket, session_id, SessionEvent::FileDeleted(event)).await;
}

pub async fn handle_typing(
    socket: SocketRef,
    Data(event): Data<TypingEvent>,
    state: State<AppState>,
) {
    let Some(session_id) = member_session(&socket, &state).await else {
        return;
    };
    relay(&socket, session_id, SessionEvent::Typing(event)).await;
}

pub async fn handle_stop_typing(
    socket: SocketRef,
    Data(event): Data<TypingEvent>,
    state: State<AppState>,
) {
    let Some(session_id) = member_session(&socket, &state).await else {
        return;
    };
    relay(&socket, session_id, SessionEvent::StopTyping(event)).await;
}

pub async fn on_disconnect(socket: SocketRef, state: State<AppState>) {
    info!("Socket.IO disconnected: {}", socket.id);
    let mut members = state.socket2session.lock().await;
    members.remove(socket.id.as_str());
}
