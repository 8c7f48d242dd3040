use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheHealth>,
}

#[derive(Debug, Serialize)]
pub struct CacheHealth {
    pub store: &'static str,
    pub reachable: bool,
}

/// Liveness probe. Always `ok`; cache reachability is reported but does not
/// change the status.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let cache = match state.service.cache() {
        Some(writer) => {
            let store = writer.store();
            let reachable = match store.health_check().await {
                Ok(ok) => ok,
                Err(e) => {
                    tracing::warn!("Cache health check failed: {}", e);
                    false
                }
            };
            Some(CacheHealth {
                store: store.name(),
                reachable,
            })
        }
        None => None,
    };

    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        cache,
    })
}
