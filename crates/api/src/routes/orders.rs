//! Order management routes: creation, payments, refunds, lifecycle.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use tracing::error;
use uuid::Uuid;

use crate::AppState;
use crate::routes::error_response;
use tally_core::order::{
    CreateOrderInput, DerivedState, OrderKind, OrderLineInput, OrderStatus, PaymentInput,
    PaymentMethod, TaxConfig,
};
use tally_core::refund::{RefundLineRequest, RefundRequest};
use tally_core::stock::BatchBinding;
use tally_db::entities::{order_lines, orders, payment_entries, sea_orm_active_enums as db_enums};
use tally_db::repositories::order::{OrderDetails, OrderRepoError, OrderRepository};
use tally_shared::types::{
    BatchId, CounterpartyId, PageRequest, ProductId, UserId,
};

/// Creates the order routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders", post(create_order))
        .route("/orders/{order_id}", get(get_order))
        .route("/orders/{order_id}/payments", post(add_payment))
        .route("/orders/{order_id}/refunds", post(refund))
        .route("/orders/{order_id}/status", post(transition_status))
        .route("/orders/{order_id}/cancel", post(cancel))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for a single order line.
#[derive(Debug, Deserialize)]
pub struct CreateLineRequest {
    /// Product ID.
    pub product_id: Uuid,
    /// Explicit batch; omitted means auto-allocation.
    pub batch_id: Option<Uuid>,
    /// Quantity (decimal string).
    pub quantity: String,
    /// Unit price before tax (decimal string).
    pub unit_price: String,
}

/// Request body for a payment collected at order creation.
#[derive(Debug, Deserialize)]
pub struct InitialPaymentRequest {
    /// Amount (decimal string).
    pub amount: String,
    /// Payment method: "cash", "bank_transfer", or "check".
    pub method: String,
    /// Optional external reference.
    pub reference: Option<String>,
    /// Check number when method is "check".
    pub check_number: Option<String>,
}

/// Request body for creating an order.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// "sales" or "purchase".
    pub kind: String,
    /// Customer or supplier ID.
    pub counterparty_id: Uuid,
    /// VAT rate as a decimal string (e.g. "0.14").
    pub vat_rate: String,
    /// Manufacturing tax rate as a decimal string.
    pub manufacturing_tax_rate: String,
    /// Due date (YYYY-MM-DD).
    pub due_date: NaiveDate,
    /// Order lines.
    pub lines: Vec<CreateLineRequest>,
    /// Optional payment collected at creation.
    pub initial_payment: Option<InitialPaymentRequest>,
    /// Acting user.
    pub created_by: Uuid,
}

/// Request body for recording a payment.
#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    /// Amount (decimal string).
    pub amount: String,
    /// Payment method: "cash", "bank_transfer", or "check".
    pub method: String,
    /// Optional external reference.
    pub reference: Option<String>,
    /// Check number when method is "check".
    pub check_number: Option<String>,
    /// Acting user.
    pub recorded_by: Uuid,
}

/// Request body for one returned line in a refund.
#[derive(Debug, Deserialize)]
pub struct RefundLineBody {
    /// Order line ID.
    pub line_id: Uuid,
    /// Returned quantity (decimal string).
    pub quantity: String,
}

/// Request body for a refund.
#[derive(Debug, Deserialize)]
pub struct RefundBody {
    /// Money to return (decimal string); omitted means stock-only.
    pub amount: Option<String>,
    /// Disbursement method for the money component.
    pub method: String,
    /// Check number when method is "check".
    pub check_number: Option<String>,
    /// Why the refund is issued.
    pub reason: String,
    /// Returned line items; empty means money-only.
    #[serde(default)]
    pub lines: Vec<RefundLineBody>,
    /// Acting user.
    pub requested_by: Uuid,
}

/// Request body for a status transition.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    /// Target status: "completed".
    pub status: String,
    /// Acting user.
    pub actor: Uuid,
}

/// Request body for cancellation.
#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    /// Acting user.
    pub actor: Uuid,
}

/// Query parameters for listing orders.
#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Items per page.
    pub per_page: Option<u32>,
}

/// Response for an order line.
#[derive(Debug, Serialize)]
pub struct LineResponse {
    /// Line ID.
    pub id: Uuid,
    /// Product ID.
    pub product_id: Uuid,
    /// Bound batch, when explicitly bound.
    pub batch_id: Option<Uuid>,
    /// Ordered quantity.
    pub quantity: String,
    /// Unit price before tax.
    pub unit_price: String,
    /// VAT on the line.
    pub vat_amount: String,
    /// Manufacturing tax on the line.
    pub manufacturing_tax_amount: String,
    /// Quantity already returned.
    pub refunded_quantity: String,
}

/// Response for a payment ledger entry.
#[derive(Debug, Serialize)]
pub struct EntryResponse {
    /// Entry ID.
    pub id: Uuid,
    /// "payment" or "refund".
    pub entry_type: String,
    /// Amount moved.
    pub amount: String,
    /// Payment method.
    pub method: String,
    /// External reference.
    pub reference: Option<String>,
    /// Check number.
    pub check_number: Option<String>,
    /// When the entry was recorded.
    pub recorded_at: String,
}

/// Response for an order header.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    /// Order ID.
    pub id: Uuid,
    /// "sales" or "purchase".
    pub kind: String,
    /// Lifecycle status.
    pub status: String,
    /// Customer or supplier ID.
    pub counterparty_id: Uuid,
    /// Pre-tax subtotal.
    pub subtotal: String,
    /// Total VAT.
    pub vat_total: String,
    /// Total manufacturing tax.
    pub manufacturing_tax_total: String,
    /// Grand total.
    pub total: String,
    /// Due date.
    pub due_date: String,
    /// Created at timestamp.
    pub created_at: String,
}

/// Response for the derived financial state.
#[derive(Debug, Serialize)]
pub struct DerivedStateResponse {
    /// Collection status.
    pub payment_status: String,
    /// Sum of payments.
    pub paid_total: String,
    /// Sum of refunds.
    pub refunded_total: String,
    /// Money currently held.
    pub net_cash: String,
    /// Collection still outstanding.
    pub pending_amount: String,
    /// Money held above the total.
    pub refund_due: String,
    /// Whether collection is overdue.
    pub is_overdue: bool,
    /// Overdue portion of the pending amount.
    pub deserved_amount: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST `/orders` - Create an order with reserved stock.
async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> impl IntoResponse {
    let repo = OrderRepository::new((*state.db).clone());

    let kind = match parse_kind(&payload.kind) {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    let vat_rate = match parse_decimal(&payload.vat_rate, "vat_rate") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let manufacturing_tax_rate =
        match parse_decimal(&payload.manufacturing_tax_rate, "manufacturing_tax_rate") {
            Ok(value) => value,
            Err(response) => return response,
        };

    let mut lines = Vec::with_capacity(payload.lines.len());
    for line in &payload.lines {
        let quantity = match parse_decimal(&line.quantity, "quantity") {
            Ok(value) => value,
            Err(response) => return response,
        };
        let unit_price = match parse_decimal(&line.unit_price, "unit_price") {
            Ok(value) => value,
            Err(response) => return response,
        };
        lines.push(OrderLineInput {
            product_id: ProductId::from_uuid(line.product_id),
            binding: line.batch_id.map_or(BatchBinding::AutoAllocate, |id| {
                BatchBinding::ExplicitBatch(BatchId::from_uuid(id))
            }),
            quantity,
            unit_price,
        });
    }

    let initial_payment = match &payload.initial_payment {
        Some(payment) => match parse_initial_payment(payment) {
            Ok(input) => Some(input),
            Err(response) => return response,
        },
        None => None,
    };

    let input = CreateOrderInput {
        kind,
        counterparty_id: CounterpartyId::from_uuid(payload.counterparty_id),
        tax: TaxConfig {
            vat_rate,
            manufacturing_tax_rate,
        },
        lines,
        due_date: payload.due_date,
        initial_payment,
        created_by: UserId::from_uuid(payload.created_by),
    };

    match repo.create_order(input).await {
        Ok(details) => (
            StatusCode::CREATED,
            Json(json!({
                "order": order_response(&details.order),
                "lines": details.lines.iter().map(line_response).collect::<Vec<_>>(),
                "entries": details.entries.iter().map(entry_response).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => repo_error(&e),
    }
}

/// GET `/orders` - List orders, newest first.
async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> impl IntoResponse {
    let repo = OrderRepository::new((*state.db).clone());
    let page = PageRequest {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    };

    match repo.list_orders(page).await {
        Ok(page) => {
            let items: Vec<OrderResponse> = page.data.iter().map(order_response).collect();
            (
                StatusCode::OK,
                Json(json!({ "data": items, "meta": page.meta })),
            )
                .into_response()
        }
        Err(e) => repo_error(&e),
    }
}

/// GET `/orders/{order_id}` - Order with lines, ledger, and derived state.
async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = OrderRepository::new((*state.db).clone());
    let today = Utc::now().date_naive();

    let details = match repo.get_order(order_id).await {
        Ok(details) => details,
        Err(e) => return repo_error(&e),
    };
    match repo.get_derived_state(order_id, today).await {
        Ok(state) => (StatusCode::OK, Json(order_details_response(&details, &state)))
            .into_response(),
        Err(e) => repo_error(&e),
    }
}

/// POST `/orders/{order_id}/payments` - Append a payment to the ledger.
async fn add_payment(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<PaymentRequest>,
) -> impl IntoResponse {
    let repo = OrderRepository::new((*state.db).clone());

    let amount = match parse_decimal(&payload.amount, "amount") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let method = match parse_method(&payload.method) {
        Ok(method) => method,
        Err(response) => return response,
    };

    let payment = PaymentInput {
        amount,
        method,
        reference: payload.reference.clone(),
        check_number: payload.check_number.clone(),
    };

    match repo.add_payment(order_id, payment, payload.recorded_by).await {
        Ok(entry) => (StatusCode::CREATED, Json(json!({ "entry": entry_response(&entry) })))
            .into_response(),
        Err(e) => repo_error(&e),
    }
}

/// POST `/orders/{order_id}/refunds` - Apply a money and/or stock refund.
async fn refund(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<RefundBody>,
) -> impl IntoResponse {
    let repo = OrderRepository::new((*state.db).clone());

    let amount = match payload.amount.as_deref() {
        Some(raw) => match parse_decimal(raw, "amount") {
            Ok(value) => value,
            Err(response) => return response,
        },
        None => Decimal::ZERO,
    };
    let method = match parse_method(&payload.method) {
        Ok(method) => method,
        Err(response) => return response,
    };

    let mut lines = Vec::with_capacity(payload.lines.len());
    for line in &payload.lines {
        let quantity = match parse_decimal(&line.quantity, "quantity") {
            Ok(value) => value,
            Err(response) => return response,
        };
        lines.push(RefundLineRequest {
            line_id: tally_shared::types::OrderLineId::from_uuid(line.line_id),
            quantity,
        });
    }

    let request = RefundRequest {
        amount,
        method,
        check_number: payload.check_number.clone(),
        reason: payload.reason.clone(),
        lines,
        requested_by: UserId::from_uuid(payload.requested_by),
    };

    match repo.refund(order_id, request).await {
        Ok(outcome) => (
            StatusCode::CREATED,
            Json(json!({
                "refund": {
                    "id": outcome.transaction.id,
                    "order_id": outcome.transaction.order_id,
                    "amount": outcome.transaction.amount.to_string(),
                    "reason": outcome.transaction.reason,
                    "created_at": outcome.transaction.created_at.to_rfc3339(),
                    "lines": outcome.lines.iter().map(|line| json!({
                        "id": line.id,
                        "order_line_id": line.order_line_id,
                        "quantity": line.quantity.to_string(),
                        "amount": line.amount.to_string(),
                    })).collect::<Vec<_>>(),
                }
            })),
        )
            .into_response(),
        Err(e) => repo_error(&e),
    }
}

/// POST `/orders/{order_id}/status` - Lifecycle transition.
async fn transition_status(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<StatusRequest>,
) -> impl IntoResponse {
    let repo = OrderRepository::new((*state.db).clone());

    let target = match parse_status(&payload.status) {
        Ok(status) => status,
        Err(response) => return response,
    };

    match repo.transition_status(order_id, target, payload.actor).await {
        Ok(order) => (StatusCode::OK, Json(json!({ "order": order_response(&order) })))
            .into_response(),
        Err(e) => repo_error(&e),
    }
}

/// POST `/orders/{order_id}/cancel` - Cancel after the guard passes.
async fn cancel(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<CancelRequest>,
) -> impl IntoResponse {
    let repo = OrderRepository::new((*state.db).clone());

    match repo.cancel(order_id, payload.actor).await {
        Ok(order) => (StatusCode::OK, Json(json!({ "order": order_response(&order) })))
            .into_response(),
        Err(e) => repo_error(&e),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn repo_error(e: &OrderRepoError) -> Response {
    if matches!(e, OrderRepoError::Database(_)) {
        error!(error = %e, "database error");
        return error_response(500, "DATABASE_ERROR", "An internal error occurred".into());
    }
    error_response(e.http_status_code(), e.error_code(), e.to_string())
}

fn parse_decimal(raw: &str, field: &str) -> Result<Decimal, Response> {
    Decimal::from_str(raw).map_err(|_| {
        error_response(
            400,
            "INVALID_DECIMAL",
            format!("Field '{field}' is not a valid decimal: {raw}"),
        )
    })
}

fn parse_kind(raw: &str) -> Result<OrderKind, Response> {
    match raw {
        "sales" => Ok(OrderKind::Sales),
        "purchase" => Ok(OrderKind::Purchase),
        other => Err(error_response(
            400,
            "INVALID_ORDER_KIND",
            format!("Unknown order kind: {other}"),
        )),
    }
}

fn parse_method(raw: &str) -> Result<PaymentMethod, Response> {
    match raw {
        "cash" => Ok(PaymentMethod::Cash),
        "bank_transfer" => Ok(PaymentMethod::BankTransfer),
        "check" => Ok(PaymentMethod::Check),
        other => Err(error_response(
            400,
            "INVALID_PAYMENT_METHOD",
            format!("Unknown payment method: {other}"),
        )),
    }
}

fn parse_status(raw: &str) -> Result<OrderStatus, Response> {
    match raw {
        "pending" => Ok(OrderStatus::Pending),
        "completed" => Ok(OrderStatus::Completed),
        "cancelled" => Ok(OrderStatus::Cancelled),
        other => Err(error_response(
            400,
            "INVALID_ORDER_STATUS",
            format!("Unknown order status: {other}"),
        )),
    }
}

fn parse_initial_payment(payment: &InitialPaymentRequest) -> Result<PaymentInput, Response> {
    let amount = parse_decimal(&payment.amount, "amount")?;
    let method = parse_method(&payment.method)?;
    Ok(PaymentInput {
        amount,
        method,
        reference: payment.reference.clone(),
        check_number: payment.check_number.clone(),
    })
}

fn kind_to_string(kind: &db_enums::OrderKind) -> String {
    match kind {
        db_enums::OrderKind::Sales => "sales".into(),
        db_enums::OrderKind::Purchase => "purchase".into(),
    }
}

fn status_to_string(status: &db_enums::OrderStatus) -> String {
    match status {
        db_enums::OrderStatus::Pending => "pending".into(),
        db_enums::OrderStatus::Completed => "completed".into(),
        db_enums::OrderStatus::Cancelled => "cancelled".into(),
    }
}

fn method_to_string(method: &db_enums::PaymentMethod) -> String {
    match method {
        db_enums::PaymentMethod::Cash => "cash".into(),
        db_enums::PaymentMethod::BankTransfer => "bank_transfer".into(),
        db_enums::PaymentMethod::Check => "check".into(),
    }
}

fn entry_type_to_string(entry_type: &db_enums::PaymentEntryType) -> String {
    match entry_type {
        db_enums::PaymentEntryType::Payment => "payment".into(),
        db_enums::PaymentEntryType::Refund => "refund".into(),
    }
}

fn order_response(order: &orders::Model) -> OrderResponse {
    OrderResponse {
        id: order.id,
        kind: kind_to_string(&order.kind),
        status: status_to_string(&order.status),
        counterparty_id: order.counterparty_id,
        subtotal: order.subtotal.to_string(),
        vat_total: order.vat_total.to_string(),
        manufacturing_tax_total: order.manufacturing_tax_total.to_string(),
        total: order.total.to_string(),
        due_date: order.due_date.to_string(),
        created_at: order.created_at.to_rfc3339(),
    }
}

fn line_response(line: &order_lines::Model) -> LineResponse {
    LineResponse {
        id: line.id,
        product_id: line.product_id,
        batch_id: line.bound_batch_id,
        quantity: line.quantity.to_string(),
        unit_price: line.unit_price.to_string(),
        vat_amount: line.vat_amount.to_string(),
        manufacturing_tax_amount: line.manufacturing_tax_amount.to_string(),
        refunded_quantity: line.refunded_quantity.to_string(),
    }
}

fn entry_response(entry: &payment_entries::Model) -> EntryResponse {
    EntryResponse {
        id: entry.id,
        entry_type: entry_type_to_string(&entry.entry_type),
        amount: entry.amount.to_string(),
        method: method_to_string(&entry.method),
        reference: entry.reference.clone(),
        check_number: entry.check_number.clone(),
        recorded_at: entry.recorded_at.to_rfc3339(),
    }
}

fn derived_state_response(state: &DerivedState) -> DerivedStateResponse {
    let payment_status = match state.payment_status {
        tally_core::order::PaymentStatus::Pending => "pending",
        tally_core::order::PaymentStatus::PartiallyPaid => "partially_paid",
        tally_core::order::PaymentStatus::Paid => "paid",
    };
    DerivedStateResponse {
        payment_status: payment_status.into(),
        paid_total: state.paid_total.to_string(),
        refunded_total: state.refunded_total.to_string(),
        net_cash: state.net_cash.to_string(),
        pending_amount: state.pending_amount.to_string(),
        refund_due: state.refund_due.to_string(),
        is_overdue: state.is_overdue,
        deserved_amount: state.deserved_amount.to_string(),
    }
}

fn order_details_response(details: &OrderDetails, state: &DerivedState) -> serde_json::Value {
    json!({
        "order": order_response(&details.order),
        "lines": details.lines.iter().map(line_response).collect::<Vec<_>>(),
        "entries": details.entries.iter().map(entry_response).collect::<Vec<_>>(),
        "derived_state": derived_state_response(state),
    })
}
