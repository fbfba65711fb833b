//! Session HTTP Surface
//!
//! `POST /join` and `GET /status`, plus the CORS headers the browser
//! client expects on every response.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::game::player::PlayerId;
use crate::network::hub::HubHandle;

/// Body of `POST /join`.
#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    /// Display name
    pub nickname: String,
}

/// Error status with `{"error": reason}`.
pub(crate) fn error(status: StatusCode, reason: impl Into<String>) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": reason.into() })))
}

/// Seat a new player under a server-generated identity.
pub async fn join(
    State(hub): State<HubHandle>,
    payload: Result<Json<JoinRequest>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            debug!("Bad join body: {}", rejection);
            return error(StatusCode::BAD_REQUEST, "invalid JSON payload");
        }
    };

    let now = hub.clock().now();
    let result = hub.game().write().await.join(PlayerId::generate(), request.nickname, now);

    match result {
        Ok(outcome) => {
            info!("HTTP join seated {} in slot {}", outcome.player_id, outcome.slot);
            (
                StatusCode::OK,
                Json(json!({
                    "playerId": outcome.player_id,
                    "status": "joined",
                })),
            )
        }
        Err(e) => {
            debug!("HTTP join refused ({:?}): {}", e.kind(), e);
            error(StatusCode::BAD_REQUEST, e.to_string())
        }
    }
}

/// Current phase code and seated player count.
pub async fn status(State(hub): State<HubHandle>) -> Json<Value> {
    let game = hub.game().read().await;
    Json(json!({
        "state": game.phase(),
        "playerCount": game.player_count(),
    }))
}

/// Allow any origin. Preflight requests are answered here with 204.
pub async fn cors(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Content-Type"));
    response
}
