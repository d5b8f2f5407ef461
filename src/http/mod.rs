//! HTTP surface of the broker.
//!
//! Thin mapping from routes to [`Broker`] operations. Every error is turned
//! into a structured response here and goes no further.

pub mod body;
pub mod cors;
pub mod response;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;

use crate::broker::Broker;
use crate::error::Result;
use crate::model::{Job, QueueSnapshot};

use self::body::FieldMap;
use self::response::{Ack, ApiResponse};

/// Build the router over a broker instance.
pub fn router(broker: Broker, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/new", post(submit_job))
        .route("/check-result/{id}", get(check_result))
        .route("/consume", get(consume))
        .route("/submit", post(submit_report))
        .route("/queues", get(queues))
        .layer(cors)
        .with_state(broker)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Hey" }))
}

async fn submit_job(State(broker): State<Broker>, body: FieldMap) -> Result<Json<Ack>> {
    broker.submit(body.into_new_job())?;
    Ok(Json(Ack::ok("Request added to queue successfully!")))
}

async fn check_result(
    State(broker): State<Broker>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Job>>> {
    let job = broker.fetch_result(&id)?;
    Ok(Json(ApiResponse::with_data("Result found", job)))
}

async fn consume(State(broker): State<Broker>) -> Result<Json<ApiResponse<Job>>> {
    let job = broker.claim()?;
    Ok(Json(ApiResponse::with_data("Request found to work on", job)))
}

async fn submit_report(State(broker): State<Broker>, body: FieldMap) -> Result<Json<Ack>> {
    broker.report(body.into_report())?;
    Ok(Json(Ack::ok("Response recorded")))
}

async fn queues(State(broker): State<Broker>) -> Json<ApiResponse<QueueSnapshot>> {
    Json(ApiResponse::with_data("Queues", broker.summaries()))
}
