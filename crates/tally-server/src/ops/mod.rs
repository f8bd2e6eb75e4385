//! HTTP handlers.
//!
//! - `/`            : home page (counted like every routed request)
//! - `/healthz`     : liveness
//! - `metrics_path` : Prometheus text format
//! - `/admin/gauge` : set `custom_gauge` from a JSON body

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use tally_core::error::{ClientCode, TallyError};

use crate::app_state::AppState;

pub async fn index() -> impl IntoResponse {
    (StatusCode::OK, "Hello, this is the home page!")
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, tally_core::CONTENT_TYPE)],
        state.render_metrics(),
    )
        .into_response()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct GaugeValue {
    pub value: f64,
}

pub async fn set_gauge(
    State(state): State<AppState>,
    body: std::result::Result<Json<GaugeValue>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(b) => b,
        Err(rej) => {
            tracing::warn!(error = %rej, "rejected gauge update");
            return error_response(&TallyError::BadRequest(rej.body_text()));
        }
    };

    match state.set_custom_gauge(req.value) {
        Ok(()) => {
            tracing::info!(value = req.value, "custom_gauge updated");
            (StatusCode::OK, Json(req)).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "gauge update failed");
            error_response(&e)
        }
    }
}

fn status_for(code: ClientCode) -> StatusCode {
    match code {
        ClientCode::BadRequest | ClientCode::UnsupportedVersion => StatusCode::BAD_REQUEST,
        ClientCode::InvalidMutation => StatusCode::UNPROCESSABLE_ENTITY,
        ClientCode::InvalidDeclaration => StatusCode::CONFLICT,
        ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn error_response(err: &TallyError) -> Response {
    let code = err.client_code();
    (
        status_for(code),
        Json(json!({ "code": code.as_str(), "msg": err.to_string() })),
    )
        .into_response()
}
