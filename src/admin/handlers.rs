use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::admin::AdminState;
use crate::health::HealthSnapshot;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub total_pools: usize,
    pub healthy_pools: usize,
    pub excluded_pools: Vec<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (status, Json(ErrorBody { error: error.to_string() })).into_response()
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let snapshot = state.invoker.health_snapshot();
    let status = if snapshot.healthy_pools == snapshot.total_pools {
        "operational"
    } else {
        "degraded"
    };
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status,
        total_pools: snapshot.total_pools,
        healthy_pools: snapshot.healthy_pools,
        excluded_pools: state.invoker.registry().excluded(),
    })
}

pub async fn get_pool_health(State(state): State<AdminState>) -> Json<HealthSnapshot> {
    Json(state.invoker.health_snapshot())
}

pub async fn get_replica_route(
    State(state): State<AdminState>,
    Path(tenant_id): Path<i64>,
) -> Response {
    let Some(router) = &state.replicas else {
        return error_response(StatusCode::NOT_FOUND, "no replica pools configured");
    };
    match router.describe(tenant_id) {
        Ok(route) => Json(route).into_response(),
        Err(e) => error_response(StatusCode::SERVICE_UNAVAILABLE, e),
    }
}
