use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::state::AppState;
use crate::api::ApiError;

/// `POST /compute-stats`
///
/// The body is decoded by the service rather than an extractor so malformed
/// JSON still gets the response envelope (with a 400).
pub async fn compute_stats(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let body = body.map_err(|rejection| {
        if rejection.status().is_server_error() {
            ApiError::Internal(rejection.body_text())
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    })?;

    let response = state.service.compute_from_slice(&body).await;
    let status = if response.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };

    Ok((status, Json(response)).into_response())
}

#[cfg(test)]
mod tests {
    use crate::api::build_router;
    use crate::api::state::AppState;
    use crate::config::StatsConfig;
    use crate::service::StatsService;
    use crate::storage::{CacheWriter, InMemoryStore};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::util::ServiceExt;

    fn setup_test_state() -> (AppState, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let writer = CacheWriter::new(
            store.clone(),
            Duration::from_secs(600),
            Duration::from_secs(5),
        );
        let state = AppState::new(StatsService::new(StatsConfig::default(), writer));
        (state, store)
    }

    async fn post_json(app: axum::Router, uri: &str, body: &str) -> (StatusCode, Value) {
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    fn duel(me: &str, race: i32, won: bool, opp_mmr: i32) -> Value {
        json!({
            "startTime": "2025-12-02T18:30:00Z",
            "gameMode": 1,
            "teams": [
                {"won": won, "players": [{"battleTag": me, "race": race, "oldMmr": 1500, "currentMmr": 1510}]},
                {"won": !won, "players": [{"battleTag": "opp#9", "race": 4, "oldMmr": opp_mmr, "currentMmr": 0}]}
            ]
        })
    }

    #[tokio::test]
    async fn test_compute_stats_ok() {
        let (state, store) = setup_test_state();
        let body = json!({
            "players": [
                {"battleTag": "me#1", "name": "Me", "currentMmr": 1510, "matchData": [
                    duel("me#1", 1, true, 1600),
                    duel("me#1", 1, false, 1400),
                ]}
            ]
        });

        let (status, json) =
            post_json(build_router(state), "/compute-stats", &body.to_string()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Processed 1 players");
        let result = &json["results"][0];
        assert_eq!(result["battleTag"], "me#1");
        assert_eq!(result["wins"], 1);
        assert_eq!(result["losses"], 1);
        // +70 for beating a stronger opponent, -70 for losing to a weaker one
        assert_eq!(result["points"], 0);
        assert_eq!(result["raceProfiles"][0]["race"], 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_compute_stats_invalid_json() {
        let (state, store) = setup_test_state();
        let (status, json) = post_json(build_router(state), "/compute-stats", "{not json").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert!(json["message"].as_str().unwrap().starts_with("Invalid JSON: "));
        assert_eq!(json["results"], json!([]));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_compute_stats_no_players() {
        let (state, store) = setup_test_state();
        let (status, json) =
            post_json(build_router(state), "/compute-stats", r#"{"players":[]}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "No players provided");
        assert_eq!(json["processingTimeMs"], 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_compute_stats_rejects_get() {
        let (state, _) = setup_test_state();
        let resp = build_router(state)
            .oneshot(
                Request::builder()
                    .uri("/compute-stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
