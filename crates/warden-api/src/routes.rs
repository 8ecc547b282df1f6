use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use warden_core::export::render_json_export;
use warden_core::{
    AddOutcome, Applied, CheckOutcome, ConnectionInfo, DataSource, Entry, LibSqlBackend,
    RegistryStats, RegistryStore, RemoveOutcome, RenameOutcome, Snapshot,
};

use crate::config::AppConfig;
use crate::error::AppError;

pub type Registry = RegistryStore<LibSqlBackend>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    registry: Arc<Registry>,
}

impl AppState {
    pub const fn new(config: Arc<AppConfig>, registry: Arc<Registry>) -> Self {
        Self { config, registry }
    }
}

pub fn app_router(state: AppState) -> Router {
    let whitelist_routes = Router::new()
        .route("/", get(list_entries).post(add_entry))
        .route("/entries/{game_id}", delete(remove_entry).patch(rename_entry))
        .route("/check", get(check_entry_query).post(check_entry_body))
        .route("/stats", get(get_stats))
        .route("/info", get(get_info))
        .route("/export", get(export_snapshot))
        .route("/import", post(import_snapshot))
        .route("/sync", post(sync_snapshot))
        .route("/clear", post(clear_entries));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/v1/whitelist", whitelist_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

/// Response body of a call that may have been served by either store
#[derive(Debug, Serialize)]
struct Served<T> {
    #[serde(flatten)]
    data: T,
    source: DataSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

impl<T> From<Applied<T>> for Served<T> {
    fn from(applied: Applied<T>) -> Self {
        Self {
            data: applied.outcome,
            source: applied.source,
            warning: applied.warning,
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
    connection: ConnectionInfo,
}

async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
        connection: state.registry.connection_info(),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(flatten)]
    snapshot: Snapshot,
    stats: RegistryStats,
    source: DataSource,
}

async fn list_entries(State(state): State<AppState>) -> Json<ListResponse> {
    let source = state.registry.refresh().await;
    Json(ListResponse {
        snapshot: state.registry.list().await,
        stats: state.registry.stats().await,
        source,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddRequest {
    game_id: String,
    #[serde(default, alias = "gameName")]
    display_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct EntryResponse {
    entry: Entry,
}

async fn add_entry(
    State(state): State<AppState>,
    Json(request): Json<AddRequest>,
) -> Result<(StatusCode, Json<Served<EntryResponse>>), AppError> {
    let applied = state
        .registry
        .add(&request.game_id, request.display_name)
        .await?;
    let game_id = request.game_id.trim();

    let Applied {
        outcome,
        source,
        warning,
    } = applied;
    let served = match outcome {
        AddOutcome::Created(entry) => {
            tracing::info!(game_id, ?source, "Whitelisted game");
            Served {
                data: EntryResponse { entry },
                source,
                warning,
            }
        }
        AddOutcome::AlreadyExists => {
            return Err(AppError::conflict(format!(
                "game {game_id} is already whitelisted"
            )));
        }
    };
    Ok((StatusCode::CREATED, Json(served)))
}

async fn remove_entry(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> Result<Json<Served<EntryResponse>>, AppError> {
    let Applied {
        outcome,
        source,
        warning,
    } = state.registry.remove(&game_id).await?;
    match outcome {
        RemoveOutcome::Removed(entry) => {
            tracing::info!(game_id = %entry.game_id, ?source, "Removed game");
            Ok(Json(Served {
                data: EntryResponse { entry },
                source,
                warning,
            }))
        }
        RemoveOutcome::NotFound => Err(AppError::not_found(format!(
            "game {} is not whitelisted",
            game_id.trim()
        ))),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenameRequest {
    #[serde(default, alias = "gameName")]
    display_name: Option<String>,
}

async fn rename_entry(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
    Json(request): Json<RenameRequest>,
) -> Result<Json<Served<EntryResponse>>, AppError> {
    let Applied {
        outcome,
        source,
        warning,
    } = state
        .registry
        .rename(&game_id, request.display_name)
        .await?;
    match outcome {
        RenameOutcome::Renamed(entry) => Ok(Json(Served {
            data: EntryResponse { entry },
            source,
            warning,
        })),
        RenameOutcome::NotFound => Err(AppError::not_found(format!(
            "game {} is not whitelisted",
            game_id.trim()
        ))),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckRequest {
    game_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckResponse {
    game_id: String,
    whitelisted: bool,
    server_name: Option<String>,
    timestamp: DateTime<Utc>,
}

async fn check_entry_query(
    State(state): State<AppState>,
    Query(request): Query<CheckRequest>,
) -> Result<Json<Served<CheckResponse>>, AppError> {
    check_entry(&state, &request.game_id).await
}

async fn check_entry_body(
    State(state): State<AppState>,
    Json(request): Json<CheckRequest>,
) -> Result<Json<Served<CheckResponse>>, AppError> {
    check_entry(&state, &request.game_id).await
}

async fn check_entry(
    state: &AppState,
    game_id: &str,
) -> Result<Json<Served<CheckResponse>>, AppError> {
    let applied = state.registry.check(game_id).await?;
    let game_id = game_id.trim().to_string();

    Ok(Json(Served::from(applied.map(|outcome| {
        let server_name = match &outcome {
            CheckOutcome::Found(entry) => entry.display_name.clone(),
            CheckOutcome::NotFound => None,
        };
        CheckResponse {
            game_id,
            whitelisted: outcome.is_whitelisted(),
            server_name,
            timestamp: Utc::now(),
        }
    }))))
}

async fn get_stats(State(state): State<AppState>) -> Json<RegistryStats> {
    state.registry.refresh().await;
    Json(state.registry.stats().await)
}

#[derive(Debug, Serialize)]
struct InfoResponse {
    connection: ConnectionInfo,
    stats: RegistryStats,
    timestamp: DateTime<Utc>,
}

async fn get_info(State(state): State<AppState>) -> Json<InfoResponse> {
    state.registry.refresh().await;
    Json(InfoResponse {
        connection: state.registry.connection_info(),
        stats: state.registry.stats().await,
        timestamp: Utc::now(),
    })
}

async fn export_snapshot(State(state): State<AppState>) -> Result<Response, AppError> {
    state.registry.refresh().await;
    let snapshot = state.registry.export().await;
    let body = render_json_export(&snapshot, Utc::now())
        .map_err(|error| AppError::internal(error.to_string()))?;
    tracing::info!(entries = snapshot.len(), "Exported snapshot");
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

#[derive(Debug, Serialize)]
struct ImportResponse {
    changed: bool,
    snapshot: Snapshot,
    stats: RegistryStats,
}

async fn import_snapshot(
    State(state): State<AppState>,
    payload: Result<Json<Snapshot>, JsonRejection>,
) -> Result<Json<Served<ImportResponse>>, AppError> {
    let Json(incoming) = payload?;
    let applied = state.registry.import(incoming).await;
    let stats = state.registry.stats().await;
    Ok(Json(Served::from(applied.map(|outcome| ImportResponse {
        changed: outcome.changed,
        snapshot: outcome.snapshot,
        stats,
    }))))
}

#[derive(Debug, Serialize)]
struct SyncResponse {
    synced: bool,
    snapshot: Snapshot,
    stats: RegistryStats,
}

async fn sync_snapshot(
    State(state): State<AppState>,
    payload: Result<Json<Snapshot>, JsonRejection>,
) -> Result<Json<Served<SyncResponse>>, AppError> {
    let Json(incoming) = payload?;
    let applied = state.registry.sync(incoming).await;
    let stats = state.registry.stats().await;
    Ok(Json(Served::from(applied.map(|outcome| SyncResponse {
        synced: outcome.changed,
        snapshot: outcome.snapshot,
        stats,
    }))))
}

#[derive(Debug, Serialize)]
struct ClearResponse {
    removed: usize,
}

async fn clear_entries(State(state): State<AppState>) -> Json<Served<ClearResponse>> {
    let applied = state.registry.clear().await;
    tracing::info!(removed = applied.outcome, "Cleared whitelist");
    Json(Served::from(applied.map(|removed| ClearResponse { removed })))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Method, Request};
    use pretty_assertions::assert_eq;
    use tower_service::Service;
    use warden_core::{BackendConfig, MemoryCache, RegistryOptions};

    use super::*;

    fn test_state() -> AppState {
        let config = Arc::new(AppConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            cache_path: None,
            backend: BackendConfig::Memory,
            connect_timeout: Duration::from_secs(5),
        });
        let registry = RegistryStore::new(
            LibSqlBackend::new(config.backend.clone()),
            Box::new(MemoryCache::new()),
            RegistryOptions::default().with_connect_timeout(config.connect_timeout),
        )
        .unwrap();
        AppState::new(config, Arc::new(registry))
    }

    async fn send(state: AppState, method: Method, uri: &str, body: Option<&str>) -> Response {
        let mut router = app_router(state);
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();
        router.call(request).await.unwrap()
    }

    fn add_request(game_id: &str, name: Option<&str>) -> Json<AddRequest> {
        Json(AddRequest {
            game_id: game_id.to_string(),
            display_name: name.map(str::to_string),
        })
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn add_then_check_reports_whitelisted() {
        let state = test_state();
        let (status, Json(added)) =
            add_entry(State(state.clone()), add_request("123", Some("Game A")))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(added.source, DataSource::Primary);

        let Json(checked) = check_entry_query(
            State(state),
            Query(CheckRequest {
                game_id: "123".to_string(),
            }),
        )
        .await
        .unwrap();
        assert!(checked.data.whitelisted);
        assert_eq!(checked.data.server_name.as_deref(), Some("Game A"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn duplicate_add_is_conflict() {
        let state = test_state();
        add_entry(State(state.clone()), add_request("123", None))
            .await
            .unwrap();
        let err = add_entry(State(state), add_request("123", None))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn blank_game_id_is_bad_request() {
        let state = test_state();
        let err = add_entry(State(state), add_request("  ", None))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn remove_missing_is_not_found() {
        let state = test_state();
        let err = remove_entry(State(state), Path("404".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn check_unknown_game_is_not_whitelisted() {
        let state = test_state();
        let Json(checked) = check_entry_body(
            State(state),
            Json(CheckRequest {
                game_id: "999".to_string(),
            }),
        )
        .await
        .unwrap();
        assert!(!checked.data.whitelisted);
        assert_eq!(checked.data.server_name, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sync_response_uses_synced_flag() {
        let state = test_state();
        add_entry(State(state.clone()), add_request("1", None))
            .await
            .unwrap();

        let stale = Snapshot::empty(DateTime::from_timestamp(0, 0).unwrap());
        let Json(response) = sync_snapshot(State(state.clone()), Ok(Json(stale)))
            .await
            .unwrap();
        assert!(!response.data.synced);
        assert_eq!(response.data.stats.total, 1);

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["source"], "primary");
        assert!(value.get("synced").is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn clear_then_list_is_empty() {
        let state = test_state();
        add_entry(State(state.clone()), add_request("1", None))
            .await
            .unwrap();
        add_entry(State(state.clone()), add_request("2", None))
            .await
            .unwrap();

        let Json(cleared) = clear_entries(State(state.clone())).await;
        assert_eq!(cleared.data.removed, 2);

        let Json(listed) = list_entries(State(state)).await;
        assert!(listed.snapshot.is_empty());
        assert_eq!(listed.stats, RegistryStats::default());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn info_reports_primary_mode() {
        let state = test_state();
        let Json(info) = get_info(State(state)).await;
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["connection"]["mode"], "primary");
        assert_eq!(value["connection"]["pendingReconciliation"], false);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn entries_named_like_static_routes_are_reachable() {
        let state = test_state();
        for id in ["stats", "check"] {
            add_entry(State(state.clone()), add_request(id, None))
                .await
                .unwrap();
        }

        let renamed = send(
            state.clone(),
            Method::PATCH,
            "/v1/whitelist/entries/check",
            Some(r#"{"displayName":"Checker"}"#),
        )
        .await;
        assert_eq!(renamed.status(), StatusCode::OK);

        let removed = send(
            state.clone(),
            Method::DELETE,
            "/v1/whitelist/entries/stats",
            None,
        )
        .await;
        assert_eq!(removed.status(), StatusCode::OK);

        let stats = send(state.clone(), Method::GET, "/v1/whitelist/stats", None).await;
        assert_eq!(stats.status(), StatusCode::OK);

        let missing = send(state, Method::DELETE, "/v1/whitelist/entries/stats", None).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn submitted_snapshot_with_invalid_game_id_is_bad_request() {
        let state = test_state();
        let body = r#"{"entries":[{"gameId":"   ","addedAt":"2024-01-01T00:00:00Z"}],"savedAt":"2030-01-01T00:00:00Z"}"#;

        for uri in ["/v1/whitelist/import", "/v1/whitelist/sync"] {
            let response = send(state.clone(), Method::POST, uri, Some(body)).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        let Json(listed) = list_entries(State(state)).await;
        assert!(listed.snapshot.is_empty());
    }
}
