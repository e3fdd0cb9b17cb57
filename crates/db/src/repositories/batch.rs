//! Batch repository for inventory intake and lookups.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use tally_shared::types::BatchId;

use crate::entities::batches;

/// Error types for batch operations.
#[derive(Debug, thiserror::Error)]
pub enum BatchRepoError {
    /// Batch not found.
    #[error("Batch not found: {0}")]
    NotFound(Uuid),

    /// Initial on-hand cannot be negative.
    #[error("Batch on-hand quantity cannot be negative")]
    NegativeOnHand,

    /// A batch needs a label.
    #[error("Batch label cannot be empty")]
    EmptyLabel,

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl BatchRepoError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "BATCH_NOT_FOUND",
            Self::NegativeOnHand => "NEGATIVE_ON_HAND",
            Self::EmptyLabel => "EMPTY_LABEL",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::NegativeOnHand | Self::EmptyLabel => 400,
            Self::Database(_) => 500,
        }
    }
}

/// Input for registering a received batch.
#[derive(Debug, Clone)]
pub struct CreateBatchInput {
    /// The product the batch holds.
    pub product_id: Uuid,
    /// Human-readable lot label.
    pub label: String,
    /// Initial on-hand quantity.
    pub on_hand: Decimal,
    /// When the batch was received; defaults to now.
    pub received_at: Option<DateTime<Utc>>,
}

/// Batch repository for intake and per-product lookups.
#[derive(Debug, Clone)]
pub struct BatchRepository {
    db: DatabaseConnection,
}

impl BatchRepository {
    /// Creates a new batch repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Registers a received batch with zero reservations.
    ///
    /// # Errors
    ///
    /// Returns a validation error or a database error.
    pub async fn create_batch(
        &self,
        input: CreateBatchInput,
    ) -> Result<batches::Model, BatchRepoError> {
        if input.on_hand < Decimal::ZERO {
            return Err(BatchRepoError::NegativeOnHand);
        }
        if input.label.trim().is_empty() {
            return Err(BatchRepoError::EmptyLabel);
        }

        let now = Utc::now();
        let model = batches::ActiveModel {
            id: Set(BatchId::new().into_inner()),
            product_id: Set(input.product_id),
            label: Set(input.label),
            on_hand: Set(input.on_hand),
            reserved: Set(Decimal::ZERO),
            received_at: Set(input.received_at.unwrap_or(now).into()),
            version: Set(0),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&self.db)
        .await?;

        Ok(model)
    }

    /// Fetches one batch.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or a database error.
    pub async fn get_batch(&self, batch_id: Uuid) -> Result<batches::Model, BatchRepoError> {
        batches::Entity::find_by_id(batch_id)
            .one(&self.db)
            .await?
            .ok_or(BatchRepoError::NotFound(batch_id))
    }

    /// Lists a product's batches in allocation order (earliest received
    /// first, ties broken by id).
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub async fn list_by_product(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<batches::Model>, BatchRepoError> {
        Ok(batches::Entity::find()
            .filter(batches::Column::ProductId.eq(product_id))
            .order_by_asc(batches::Column::ReceivedAt)
            .order_by_asc(batches::Column::Id)
            .all(&self.db)
            .await?)
    }
}
