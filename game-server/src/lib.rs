use std::sync::Arc;
use warp::Filter;
use warp::http::StatusCode;
use warp::reply::Reply;

use crate::room_registry::RoomRegistry;
use game_types::{ConnectParams, CreateRoomRequest, ErrorResponse, JoinRoomRequest, RoomError};

pub mod broadcast;
pub mod config;
pub mod room;
pub mod room_registry;
pub mod websocket;

const MAX_BODY_BYTES: u64 = 16 * 1024;

pub fn create_routes(
    registry: Arc<RoomRegistry>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let registry_filter = warp::any().map({
        let registry = registry.clone();
        move || registry.clone()
    });

    // Room creation
    let create_room = warp::path!("rooms")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(registry_filter.clone())
        .and_then(handle_create_room);

    // Join or rejoin
    let join_room = warp::path!("rooms" / "join")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(registry_filter.clone())
        .and_then(handle_join_room);

    // Player session
    let websocket = warp::path!("rooms" / String / "ws")
        .and(warp::get())
        .and(warp::ws())
        .and(warp::query::<ConnectParams>())
        .and(registry_filter.clone())
        .and_then(handle_room_connection);

    // Health check endpoint
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", StatusCode::OK));

    // CORS configuration
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET", "POST", "OPTIONS"]);

    create_room
        .or(join_room)
        .or(websocket)
        .or(health)
        .with(cors)
        .with(warp::log("dice_rooms"))
}

fn status_for(error: &RoomError) -> StatusCode {
    match error {
        RoomError::RoomNotFound(_) => StatusCode::NOT_FOUND,
        RoomError::RoomFull(_) => StatusCode::FORBIDDEN,
        RoomError::Unauthorized => StatusCode::UNAUTHORIZED,
    }
}

fn error_reply(error: &RoomError) -> warp::reply::Response {
    warp::reply::with_status(
        warp::reply::json(&ErrorResponse {
            error: error.to_string(),
        }),
        status_for(error),
    )
    .into_response()
}

async fn handle_create_room(
    request: CreateRoomRequest,
    registry: Arc<RoomRegistry>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let created = registry.create_room(&request.player_name).await;
    Ok(warp::reply::json(&created))
}

async fn handle_join_room(
    request: JoinRoomRequest,
    registry: Arc<RoomRegistry>,
) -> Result<warp::reply::Response, warp::Rejection> {
    match registry.join_room(request).await {
        Ok(joined) => Ok(warp::reply::json(&joined).into_response()),
        Err(e) => {
            tracing::debug!("Join rejected: {}", e);
            Ok(error_reply(&e))
        }
    }
}

async fn handle_room_connection(
    room_code: String,
    ws: warp::ws::Ws,
    params: ConnectParams,
    registry: Arc<RoomRegistry>,
) -> Result<warp::reply::Response, warp::Rejection> {
    let room = match registry.lookup(&room_code).await {
        Ok(room) => room,
        Err(e) => return Ok(error_reply(&e)),
    };

    if !room.authenticate(&params.player_id, &params.token).await {
        tracing::warn!(%room_code, player_id = %params.player_id, "Rejected connection with bad credentials");
        return Ok(error_reply(&RoomError::Unauthorized));
    }

    let player_id = params.player_id;
    Ok(ws
        .on_upgrade(move |socket| websocket::handle_connection(socket, registry, room, player_id))
        .into_response())
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use game_types::{CreateRoomResponse, JoinRoomResponse};
    use serde_json::json;

    fn create_test_app() -> (
        Arc<RoomRegistry>,
        impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone,
    ) {
        let registry = Arc::new(RoomRegistry::new());
        (registry.clone(), create_routes(registry))
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (_registry, app) = create_test_app();

        let response = warp::test::request()
            .method("GET")
            .path("/health")
            .reply(&app)
            .await;

        assert_eq!(response.status(), 200);
        assert_eq!(response.body(), "OK");
    }

    #[tokio::test]
    async fn test_create_room_returns_credentials() {
        let (registry, app) = create_test_app();

        let response = warp::test::request()
            .method("POST")
            .path("/rooms")
            .json(&json!({ "player_name": "Ana" }))
            .reply(&app)
            .await;
        assert_eq!(response.status(), 200);
        let created: CreateRoomResponse = serde_json::from_slice(response.body()).unwrap();

        assert_eq!(created.room_code.len(), 6);
        assert_eq!(created.player_id.len(), 32);
        assert_eq!(created.token.len(), 64);
        assert_eq!(created.last_event_id, 0);
        assert!(registry.lookup(&created.room_code).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_room_rejects_malformed_body() {
        let (_registry, app) = create_test_app();

        let response = warp::test::request()
            .method("POST")
            .path("/rooms")
            .header("content-type", "application/json")
            .body("{not json")
            .reply(&app)
            .await;

        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn test_join_room_seats_player() {
        let (registry, app) = create_test_app();
        let created = registry.create_room("Ana").await;

        let response = warp::test::request()
            .method("POST")
            .path("/rooms/join")
            .json(&json!({ "room_code": created.room_code, "player_name": "Ben" }))
            .reply(&app)
            .await;

        assert_eq!(response.status(), 200);
        let joined: JoinRoomResponse = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(joined.room_code, created.room_code);
        assert_ne!(joined.player_id, created.player_id);
        assert!(!joined.is_viewer);
        assert_eq!(joined.last_event_id, 0);
    }

    #[tokio::test]
    async fn test_rejoin_with_credentials_keeps_identity() {
        let (registry, app) = create_test_app();
        let created = registry.create_room("Ana").await;

        let response = warp::test::request()
            .method("POST")
            .path("/rooms/join")
            .json(&json!({
                "room_code": created.room_code,
                "player_name": "Ana again",
                "player_id": created.player_id,
                "token": created.token,
            }))
            .reply(&app)
            .await;

        let joined: JoinRoomResponse = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(joined.player_id, created.player_id);
        assert_eq!(joined.token, created.token);
    }

    #[tokio::test]
    async fn test_join_unknown_room_is_not_found() {
        let (_registry, app) = create_test_app();

        let response = warp::test::request()
            .method("POST")
            .path("/rooms/join")
            .json(&json!({ "room_code": "NOPE99", "player_name": "Ben" }))
            .reply(&app)
            .await;

        assert_eq!(response.status(), 404);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert!(body["error"].as_str().unwrap().contains("NOPE99"));
    }

    #[tokio::test]
    async fn test_join_full_room_is_forbidden() {
        let (registry, app) = create_test_app();
        let created = registry.create_room("Host").await;

        for i in 0..5 {
            let response = warp::test::request()
                .method("POST")
                .path("/rooms/join")
                .json(&json!({ "room_code": created.room_code, "player_name": format!("P{}", i) }))
                .reply(&app)
                .await;
            assert_eq!(response.status(), 200);
        }

        let response = warp::test::request()
            .method("POST")
            .path("/rooms/join")
            .json(&json!({ "room_code": created.room_code, "player_name": "Seventh" }))
            .reply(&app)
            .await;
        assert_eq!(response.status(), 403);
    }

    #[tokio::test]
    async fn test_websocket_unknown_room_rejected() {
        let (_registry, app) = create_test_app();

        let result = warp::test::ws()
            .path("/rooms/NOPE99/ws?player_id=a&token=b")
            .handshake(app)
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_websocket_bad_token_rejected() {
        let (registry, app) = create_test_app();
        let created = registry.create_room("Ana").await;

        let result = warp::test::ws()
            .path(&format!(
                "/rooms/{}/ws?player_id={}&token=wrong",
                created.room_code, created.player_id
            ))
            .handshake(app)
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_http_endpoints_cors() {
        let (_registry, app) = create_test_app();

        let response = warp::test::request()
            .method("OPTIONS")
            .path("/rooms")
            .header("origin", "http://localhost:3000")
            .header("access-control-request-method", "POST")
            .reply(&app)
            .await;

        assert_eq!(response.status(), 200);
        assert!(
            response
                .headers()
                .contains_key("access-control-allow-origin")
        );
    }

    #[tokio::test]
    async fn test_invalid_routes() {
        let (_registry, app) = create_test_app();

        let response = warp::test::request()
            .method("GET")
            .path("/invalid")
            .reply(&app)
            .await;

        assert_eq!(response.status(), 404);
    }
}
