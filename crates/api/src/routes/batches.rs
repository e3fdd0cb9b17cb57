//! Inventory batch routes: intake and per-product lookups.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use tracing::error;
use uuid::Uuid;

use crate::AppState;
use crate::routes::error_response;
use tally_db::entities::batches;
use tally_db::repositories::batch::{BatchRepoError, BatchRepository, CreateBatchInput};

/// Creates the batch routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/batches", post(create_batch))
        .route("/batches/{batch_id}", get(get_batch))
        .route("/products/{product_id}/batches", get(list_product_batches))
}

/// Request body for registering a received batch.
#[derive(Debug, Deserialize)]
pub struct CreateBatchRequest {
    /// The product the batch holds.
    pub product_id: Uuid,
    /// Human-readable lot label.
    pub label: String,
    /// Initial on-hand quantity (decimal string).
    pub on_hand: String,
    /// When the batch was received; defaults to now.
    pub received_at: Option<DateTime<Utc>>,
}

/// Response for a batch.
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    /// Batch ID.
    pub id: Uuid,
    /// Product ID.
    pub product_id: Uuid,
    /// Lot label.
    pub label: String,
    /// Physical quantity on hand.
    pub on_hand: String,
    /// Quantity held for pending orders.
    pub reserved: String,
    /// `on_hand - reserved`.
    pub available: String,
    /// When the batch was received.
    pub received_at: String,
}

/// POST `/batches` - Register a received batch.
async fn create_batch(
    State(state): State<AppState>,
    Json(payload): Json<CreateBatchRequest>,
) -> impl IntoResponse {
    let repo = BatchRepository::new((*state.db).clone());

    let on_hand = match Decimal::from_str(&payload.on_hand) {
        Ok(value) => value,
        Err(_) => {
            return error_response(
                400,
                "INVALID_DECIMAL",
                format!("Field 'on_hand' is not a valid decimal: {}", payload.on_hand),
            );
        }
    };

    let input = CreateBatchInput {
        product_id: payload.product_id,
        label: payload.label,
        on_hand,
        received_at: payload.received_at,
    };

    match repo.create_batch(input).await {
        Ok(batch) => (
            StatusCode::CREATED,
            Json(json!({ "batch": batch_response(&batch) })),
        )
            .into_response(),
        Err(e) => repo_error(&e),
    }
}

/// GET `/batches/{batch_id}` - Fetch one batch.
async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = BatchRepository::new((*state.db).clone());

    match repo.get_batch(batch_id).await {
        Ok(batch) => (
            StatusCode::OK,
            Json(json!({ "batch": batch_response(&batch) })),
        )
            .into_response(),
        Err(e) => repo_error(&e),
    }
}

/// GET `/products/{product_id}/batches` - A product's batches in
/// allocation order.
async fn list_product_batches(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = BatchRepository::new((*state.db).clone());

    match repo.list_by_product(product_id).await {
        Ok(batches) => {
            let items: Vec<BatchResponse> = batches.iter().map(batch_response).collect();
            (StatusCode::OK, Json(json!({ "batches": items }))).into_response()
        }
        Err(e) => repo_error(&e),
    }
}

fn repo_error(e: &BatchRepoError) -> Response {
    if matches!(e, BatchRepoError::Database(_)) {
        error!(error = %e, "database error");
        return error_response(500, "DATABASE_ERROR", "An internal error occurred".into());
    }
    error_response(e.http_status_code(), e.error_code(), e.to_string())
}

fn batch_response(batch: &batches::Model) -> BatchResponse {
    BatchResponse {
        id: batch.id,
        product_id: batch.product_id,
        label: batch.label.clone(),
        on_hand: batch.on_hand.to_string(),
        reserved: batch.reserved.to_string(),
        available: (batch.on_hand - batch.reserved).to_string(),
        received_at: batch.received_at.to_rfc3339(),
    }
}
