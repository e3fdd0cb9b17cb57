//! Pending-collection notification feed.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::AppState;
use crate::routes::error_response;
use tally_core::notify::DueNotification;
use tally_core::order::OrderKind;
use tally_db::repositories::notification::{NotificationError, NotificationRepository};

/// Creates the notification routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/notifications", get(list_notifications))
}

/// Response for one pending-collection notification.
#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    /// The order concerned.
    pub order_id: Uuid,
    /// "sales" or "purchase".
    pub kind: String,
    /// Amount still to collect.
    pub remaining_amount: String,
    /// Days until the due date; negative once overdue.
    pub days_until_due: i64,
}

/// GET `/notifications` - Orders with money still to collect, soonest
/// due first.
async fn list_notifications(State(state): State<AppState>) -> impl IntoResponse {
    let repo = NotificationRepository::new((*state.db).clone());
    let today = Utc::now().date_naive();

    match repo.due_notifications(today).await {
        Ok(notifications) => {
            let items: Vec<NotificationResponse> =
                notifications.iter().map(notification_response).collect();
            (StatusCode::OK, Json(json!({ "notifications": items }))).into_response()
        }
        Err(e) => {
            if matches!(e, NotificationError::Database(_)) {
                error!(error = %e, "database error");
                return error_response(
                    500,
                    "DATABASE_ERROR",
                    "An internal error occurred".into(),
                );
            }
            error_response(e.http_status_code(), e.error_code(), e.to_string())
        }
    }
}

fn notification_response(notification: &DueNotification) -> NotificationResponse {
    NotificationResponse {
        order_id: notification.order_id.into_inner(),
        kind: match notification.kind {
            OrderKind::Sales => "sales".into(),
            OrderKind::Purchase => "purchase".into(),
        },
        remaining_amount: notification.remaining_amount.to_string(),
        days_until_due: notification.days_until_due,
    }
}
