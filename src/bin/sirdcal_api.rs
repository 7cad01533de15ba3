use std::net::SocketAddr;

use axum::{http::StatusCode, response::IntoResponse, routing::{get, post}, Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use sirdcal::{CalibrationConfig, CalibrationError, Driver, ObservedSeries, SegmentResult};

#[derive(Debug, Deserialize)]
struct ObservedRow {
    susceptible: f64,
    infected: f64,
    recovered: f64,
    deceased: f64,
}

#[derive(Debug, Deserialize)]
struct CalibrateRequest {
    rows: Vec<ObservedRow>,
    config: Option<CalibrationConfig>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sirdcal=info")))
        .init();

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8000);

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/calibrate", post(calibrate));

    let addr: SocketAddr = format!("{}:{}", host, port).parse().expect("invalid HOST/PORT");
    tracing::info!(%addr, "sirdcal-api listening");

    let listener = tokio::net::TcpListener::bind(addr).await.expect("bind failed");
    axum::serve(listener, app).await.expect("server failed");
}

async fn healthz() -> impl IntoResponse {
    Json(json!({"ok": true}))
}

async fn calibrate(Json(req): Json<CalibrateRequest>) -> impl IntoResponse {
    // The swarm is CPU-bound; keep it off the async workers.
    let join = tokio::task::spawn_blocking(move || calibrate_sync(req));

    match join.await {
        Ok(Ok(segments)) => (StatusCode::OK, Json(json!({"return_code": 0, "segments": segments}))).into_response(),
        Ok(Err((code, body))) => (code, Json(body)).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"return_code": 2, "error": format!("join error: {e}")})),
        )
            .into_response(),
    }
}

fn calibrate_sync(req: CalibrateRequest) -> Result<Vec<SegmentResult>, (StatusCode, serde_json::Value)> {
    let cfg = req.config.unwrap_or_default();
    let bad_request = |e: CalibrationError| {
        let kind = match e {
            CalibrationError::ConservationViolation { .. } => "conservation_violation",
            CalibrationError::InvalidConfiguration(_) => "invalid_configuration",
            CalibrationError::InsufficientData { .. } => "insufficient_data",
        };
        (
            StatusCode::BAD_REQUEST,
            json!({"return_code": 1, "kind": kind, "error": e.to_string()}),
        )
    };

    let series = ObservedSeries::new(
        req.rows.iter().map(|r| r.susceptible).collect(),
        req.rows.iter().map(|r| r.infected).collect(),
        req.rows.iter().map(|r| r.recovered).collect(),
        req.rows.iter().map(|r| r.deceased).collect(),
    )
    .map_err(bad_request)?;

    let driver = Driver::new(cfg).map_err(bad_request)?;
    driver.run(&series).map_err(bad_request)
}
