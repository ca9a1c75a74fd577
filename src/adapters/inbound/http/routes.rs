use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::adapters::outbound::deploy::ContainerProvisioner;
use crate::adapters::outbound::rpc::StubRpcClient;
use crate::application::SyncEngine;
use crate::domain::models::{MappingStatus, SlaveConfigUpdate};

use super::dtos::*;
use super::error::ApiError;

/// Shared state handed to every handler (§6): a single `Arc` to the Sync Engine, matching the
/// teacher's `AppState` pattern in `api/mod.rs`.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SyncEngine>,
    pub provisioner: Arc<ContainerProvisioner>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/ready", get(ready))
        .route("/accounts", get(list_accounts))
        .route("/accounts/slaves", get(list_slaves).post(create_slave))
        .route("/accounts/slaves/:name", put(update_slave).delete(remove_slave))
        .route("/accounts/slaves/:name/enable", post(enable_slave))
        .route("/accounts/slaves/:name/disable", post(disable_slave))
        .route("/accounts/:name", get(get_account))
        .route("/accounts/:name/reconnect", post(reconnect_account))
        .route("/positions", get(list_positions))
        .route("/positions/master/:ticket", get(positions_for_master_ticket))
        .route("/positions/stats", get(position_stats))
        .route("/deploy/slave", post(deploy_slave))
        .route("/deploy/slave/:name", delete(undeploy_slave))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let running = state.engine.is_running();
    let master_connected = state.engine.master_state().await.connected;
    let slaves_total = state.engine.slave_names().await.len();
    let slaves_connected = state.engine.slaves_connected().await;
    let active_mappings = state.engine.mapping_count().await;

    let status = if !running {
        "unhealthy"
    } else if master_connected && slaves_connected == slaves_total {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        running,
        master_connected,
        slaves_connected,
        slaves_total,
        active_mappings,
    })
}

async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let running = state.engine.is_running();
    let master_connected = state.engine.master_state().await.connected;
    let slaves_connected = state.engine.slaves_connected().await;

    if running && master_connected && slaves_connected >= 1 {
        Json(ReadyResponse { ready: true, reason: None })
    } else if !running {
        Json(ReadyResponse { ready: false, reason: Some("engine not running") })
    } else if !master_connected {
        Json(ReadyResponse { ready: false, reason: Some("master not connected") })
    } else {
        Json(ReadyResponse { ready: false, reason: Some("no slave connected") })
    }
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let master = state.engine.master_state().await;
    let active_mappings = state.engine.mapping_count().await;

    let mut slaves = Vec::new();
    for name in state.engine.slave_names().await {
        if let Some(account_state) = state.engine.slave_state(&name).await {
            slaves.push(AccountStateResponse { name, state: account_state });
        }
    }

    Json(StatusResponse { running: state.engine.is_running(), master, slaves, active_mappings })
}

async fn list_accounts(State(state): State<AppState>) -> Json<StatusResponse> {
    status(State(state)).await
}

async fn list_slaves(State(state): State<AppState>) -> Result<Json<Vec<SlaveDetailResponse>>, ApiError> {
    let mut out = Vec::new();
    for name in state.engine.slave_names().await {
        let config = state.engine.slave_config(&name).await;
        let account_state = state.engine.slave_state(&name).await;
        if let (Some(config), Some(account_state)) = (config, account_state) {
            out.push(SlaveDetailResponse { config, state: account_state });
        }
    }
    Ok(Json(out))
}

async fn create_slave(
    State(state): State<AppState>,
    Json(body): Json<CreateSlaveRequest>,
) -> Result<axum::http::StatusCode, ApiError> {
    let config: crate::domain::models::SlaveConfig = body.into();
    let client = Arc::new(StubRpcClient::new(config.host.clone(), config.port));
    state
        .engine
        .add_slave(config, client)
        .await
        .map_err(ApiError::from)?;
    Ok(axum::http::StatusCode::CREATED)
}

async fn update_slave(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(update): Json<SlaveConfigUpdate>,
) -> Result<axum::http::StatusCode, ApiError> {
    if update.is_empty() {
        return Ok(axum::http::StatusCode::OK);
    }
    state
        .engine
        .update_slave(&name, update)
        .await
        .map_err(|e| ApiError::not_found(e.to_string()))?;
    Ok(axum::http::StatusCode::OK)
}

async fn remove_slave(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ClosePositionsQuery>,
) -> Result<axum::http::StatusCode, ApiError> {
    state
        .engine
        .remove_slave(&name, query.close_positions)
        .await
        .map_err(|e| ApiError::not_found(e.to_string()))?;
    Ok(axum::http::StatusCode::OK)
}

async fn enable_slave(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<axum::http::StatusCode, ApiError> {
    state.engine.enable_slave(&name).await.map_err(|e| ApiError::not_found(e.to_string()))?;
    Ok(axum::http::StatusCode::OK)
}

async fn disable_slave(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ClosePositionsQuery>,
) -> Result<axum::http::StatusCode, ApiError> {
    state
        .engine
        .disable_slave(&name, query.close_positions)
        .await
        .map_err(|e| ApiError::not_found(e.to_string()))?;
    Ok(axum::http::StatusCode::OK)
}

async fn get_account(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<AccountStateResponse>, ApiError> {
    if name == "master" {
        return Ok(Json(AccountStateResponse { name, state: state.engine.master_state().await }));
    }
    state
        .engine
        .slave_state(&name)
        .await
        .map(|account_state| Json(AccountStateResponse { name: name.clone(), state: account_state }))
        .ok_or_else(|| ApiError::not_found(format!("unknown account '{name}'")))
}

async fn reconnect_account(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<axum::http::StatusCode, ApiError> {
    if name == "master" {
        return Ok(axum::http::StatusCode::OK);
    }
    state.engine.enable_slave(&name).await.map_err(|e| ApiError::not_found(e.to_string()))?;
    Ok(axum::http::StatusCode::OK)
}

async fn list_positions(State(state): State<AppState>) -> Json<Vec<PositionMappingResponse>> {
    Json(state.engine.all_mappings().await.into_iter().map(Into::into).collect())
}

async fn positions_for_master_ticket(
    State(state): State<AppState>,
    Path(ticket): Path<i64>,
) -> Json<Vec<PositionMappingResponse>> {
    Json(
        state
            .engine
            .mappings_for_master_ticket(ticket)
            .await
            .into_iter()
            .map(Into::into)
            .collect(),
    )
}

async fn position_stats(State(state): State<AppState>) -> Json<PositionStatsResponse> {
    let all = state.engine.all_mappings().await;
    let open_mappings = all.iter().filter(|m| m.status == MappingStatus::Open).count();
    Json(PositionStatsResponse {
        total_mappings: all.len(),
        open_mappings,
        closed_mappings: all.len() - open_mappings,
    })
}

async fn deploy_slave(
    State(state): State<AppState>,
    Json(body): Json<DeploySlaveRequest>,
) -> Result<Json<DeploySlaveResponse>, ApiError> {
    let port = state
        .provisioner
        .next_available_port(9000)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let deployed = state
        .provisioner
        .create_slave_container(&body.name, port, body.login, body.password.as_deref(), body.server.as_deref())
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Json(DeploySlaveResponse {
        container_name: deployed.container_name,
        host: deployed.host,
        port: deployed.port,
    }))
}

async fn undeploy_slave(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<axum::http::StatusCode, ApiError> {
    state
        .provisioner
        .remove_slave_container(&name)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(axum::http::StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::outbound::persistence::SqliteStore;
    use crate::adapters::outbound::rpc::TestRpcClient;
    use crate::application::MasterMonitor;
    use crate::domain::models::{EngineSettings, MasterConfig};
    use crate::ports::rpc::AccountInfo;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn test_app() -> Router {
        let master_client = Arc::new(TestRpcClient::new());
        master_client.set_positions(vec![]);
        master_client.set_account_info(AccountInfo { login: 1, balance: 1000.0, equity: 1000.0, margin_level: None });

        let monitor = MasterMonitor::new(
            MasterConfig { name: "master".into(), host: "mt5-master".into(), port: 8001, login: None, password: None, server: None },
            master_client,
        );
        let store = Arc::new(SqliteStore::new("sqlite::memory:").await.unwrap());
        let engine = Arc::new(SyncEngine::new(monitor, store, EngineSettings::default()));
        engine.start(std::time::Duration::from_millis(1)).await.unwrap();

        router(AppState {
            engine,
            provisioner: Arc::new(ContainerProvisioner::new("mt5-net", "mt5-slave-image:latest")),
        })
    }

    #[tokio::test]
    async fn health_reports_unhealthy_details_for_a_fresh_engine() {
        let app = test_app().await;
        let response = app
            .oneshot(axum::http::Request::builder().uri("/health").body(axum::body::Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["slaves_total"], 0);
    }

    #[tokio::test]
    async fn removing_an_unknown_slave_is_a_404() {
        let app = test_app().await;
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .method("DELETE")
                    .uri("/accounts/slaves/does-not-exist")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
    }
}
