//! Read-only notification projection over the order book.

use std::collections::HashMap;

use chrono::NaiveDate;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder};
use tracing::error;
use uuid::Uuid;

use tally_core::notify::{notification_for, DueNotification};
use tally_core::order::OrderError;

use crate::entities::{orders, payment_entries, sea_orm_active_enums as db_enums};
use crate::repositories::support;

/// Error types for the notification projection.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// A ledger was internally inconsistent.
    #[error(transparent)]
    Ledger(OrderError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<OrderError> for NotificationError {
    fn from(err: OrderError) -> Self {
        if err.is_invariant_violation() {
            error!(error = %err, "order invariant violated");
        }
        Self::Ledger(err)
    }
}

impl NotificationError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Ledger(inner) => inner.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Ledger(inner) => inner.http_status_code(),
            Self::Database(_) => 500,
        }
    }
}

/// Repository producing the pending-collection notification feed.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    db: DatabaseConnection,
}

impl NotificationRepository {
    /// Creates a new notification repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Builds the notification feed as of `today`: every non-cancelled
    /// order with money still to collect, soonest due first.
    ///
    /// # Errors
    ///
    /// Returns a ledger invariant error or a database error.
    pub async fn due_notifications(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<DueNotification>, NotificationError> {
        let order_models = orders::Entity::find()
            .filter(orders::Column::Status.ne(db_enums::OrderStatus::Cancelled))
            .order_by_asc(orders::Column::DueDate)
            .all(&self.db)
            .await?;

        let order_ids: Vec<Uuid> = order_models.iter().map(|o| o.id).collect();
        let entry_models = payment_entries::Entity::find()
            .filter(payment_entries::Column::OrderId.is_in(order_ids))
            .all(&self.db)
            .await?;

        let mut entries_by_order: HashMap<Uuid, Vec<_>> = HashMap::new();
        for model in &entry_models {
            entries_by_order
                .entry(model.order_id)
                .or_default()
                .push(support::to_core_entry(model));
        }

        let mut notifications = Vec::new();
        for model in &order_models {
            let order = support::to_core_order(model);
            let entries = entries_by_order.remove(&model.id).unwrap_or_default();
            if let Some(notification) = notification_for(&order, &entries, today)? {
                notifications.push(notification);
            }
        }
        Ok(notifications)
    }
}
