//! HTTP/WebSocket routing and the idle-room reaping watchdog, mirroring the
//! relay server's `Router` setup with static-file fallback.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::ws::WebSocket;
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use tower_http::services::{ServeDir, ServeFile};

use crate::rooms_controller::RoomsController;
use crate::session;

/// Builds the application's router: a single `/ws` upgrade endpoint plus a
/// static-file fallback serving the web client out of `web_dir`.
pub fn build_router(controller: Arc<RoomsController>, web_dir: &str) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(controller)
        .fallback_service(
            ServeDir::new(web_dir).not_found_service(ServeFile::new(format!("{web_dir}/index.html"))),
        )
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(controller): State<Arc<RoomsController>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, controller))
}

async fn handle_socket(socket: WebSocket, controller: Arc<RoomsController>) {
    session::run(socket, controller).await;
}

/// Rooms reap themselves once empty past their idle timeout (see
/// [`crate::room::Room::run`]); this background sweep exists purely as a
/// fallback for a room whose task wedged without ever noticing, the same
/// role the relay server's `cleanup_dead_rooms` watchdog plays.
pub fn spawn_idle_watchdog(controller: Arc<RoomsController>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1200));
        loop {
            interval.tick().await;
            controller.sweep_dead_rooms().await;
        }
    });
}
