use anyhow::Result;
use socketioxide::{
    SocketIo,
    extract::{SocketRef, State},
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::info;

use codeshare::app_state::AppState;
use codeshare::config;
use codeshare::handlers::session_handler::*;

async fn on_connect(socket: SocketRef, _state: State<AppState>) {
    info!("Socket.IO connected: {:?} {:?}", socket.ns(), socket.id);

    socket.on("join", handle_join);
    socket.on("content-change", handle_content_change);
    socket.on("file-created", handle_file_created);
    socket.on("file-deleted", handle_file_deleted);
    socket.on("typing", handle_typing);
    socket.on("stop-typing", handle_stop_typing);

    socket.on_disconnect(on_disconnect)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
        .init();

    let config = config::get();
    let state = AppState::new(config.clone());

    let (layer, io) = SocketIo::builder().with_state(state).build_layer();
    let cors = ServiceBuilder::new().layer(CorsLayer::permissive()).layer(layer);

    io.ns("/", on_connect);

    let app = axum::Router::new()
        .route("/health", axum::routing::get(|| async { "ok" }))
        .layer(cors);

    let port = std::env::var("CODESHARE_PORT").unwrap_or(config.port.to_string());
    let url = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(url).await?;

    println!("Starting codeshare relay at http://localhost:{}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
