//! Order repository: the atomic unit-of-work orchestrations.
//!
//! Each public operation loads a snapshot, runs the pure core validation
//! against it, and applies the outcome inside one database transaction.
//! Nothing is ever partially applied: any error rolls the whole unit of
//! work back.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::error;
use uuid::Uuid;

use tally_core::finance::mirror_entry;
use tally_core::order::{
    derive_state, CreateOrderInput, DerivedState, OrderError, OrderService, OrderStatus,
    PaymentInput,
};
use tally_core::refund::{RefundError, RefundRequest};
use tally_core::stock::{
    plan_reservations, AllocationRequest, BatchAllocation, StockError, StockMovementKind,
    StockService,
};
use tally_shared::types::{
    BatchId, OrderId, OrderLineId, PaymentEntryId, RefundLineId,
};
use tally_shared::types::{PageRequest, PageResponse};

use crate::entities::{
    batches, financial_transactions, inventory_transactions, order_line_allocations, order_lines,
    orders, payment_entries, refund_lines, refund_transactions,
    sea_orm_active_enums as db_enums,
};
use crate::repositories::support;

/// Error types for order operations.
#[derive(Debug, thiserror::Error)]
pub enum OrderRepoError {
    /// Order not found.
    #[error("Order not found: {0}")]
    NotFound(Uuid),

    /// A version-guarded update matched no rows. Retryable.
    #[error("Concurrent modification detected for {0}, please retry")]
    Conflict(Uuid),

    /// Order domain rule failed.
    #[error(transparent)]
    Order(OrderError),

    /// Stock domain rule failed.
    #[error(transparent)]
    Stock(StockError),

    /// Refund domain rule failed.
    #[error(transparent)]
    Refund(RefundError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<OrderError> for OrderRepoError {
    fn from(err: OrderError) -> Self {
        if err.is_invariant_violation() {
            error!(error = %err, "order invariant violated");
        }
        Self::Order(err)
    }
}

impl From<StockError> for OrderRepoError {
    fn from(err: StockError) -> Self {
        if err.is_invariant_violation() {
            error!(error = %err, "stock invariant violated");
        }
        Self::Stock(err)
    }
}

impl From<RefundError> for OrderRepoError {
    fn from(err: RefundError) -> Self {
        if err.is_invariant_violation() {
            error!(error = %err, "refund invariant violated");
        }
        Self::Refund(err)
    }
}

impl OrderRepoError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "ORDER_NOT_FOUND",
            Self::Conflict(_) => "CONCURRENT_MODIFICATION",
            Self::Order(inner) => inner.error_code(),
            Self::Stock(inner) => inner.error_code(),
            Self::Refund(inner) => inner.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Order(inner) => inner.http_status_code(),
            Self::Stock(inner) => inner.http_status_code(),
            Self::Refund(inner) => inner.http_status_code(),
            Self::Database(_) => 500,
        }
    }

    /// Returns true when retrying the whole operation may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// An order with its lines and payment ledger.
#[derive(Debug, Clone)]
pub struct OrderDetails {
    /// Order header.
    pub order: orders::Model,
    /// Order lines.
    pub lines: Vec<order_lines::Model>,
    /// Payment ledger entries, oldest first.
    pub entries: Vec<payment_entries::Model>,
}

/// A recorded refund with its lines.
#[derive(Debug, Clone)]
pub struct RefundOutcome {
    /// Refund header.
    pub transaction: refund_transactions::Model,
    /// Per-line return records.
    pub lines: Vec<refund_lines::Model>,
}

/// Working copies of batch rows, flushed with version-guarded updates.
struct StockLedger {
    batches: HashMap<Uuid, batches::Model>,
    loaded_versions: HashMap<Uuid, i64>,
    dirty: Vec<Uuid>,
}

impl StockLedger {
    fn from_models(models: Vec<batches::Model>) -> Self {
        let loaded_versions = models.iter().map(|b| (b.id, b.version)).collect();
        let batches = models.into_iter().map(|b| (b.id, b)).collect();
        Self {
            batches,
            loaded_versions,
            dirty: Vec::new(),
        }
    }

    async fn load_for_products(
        txn: &DatabaseTransaction,
        product_ids: Vec<Uuid>,
    ) -> Result<Self, DbErr> {
        let models = batches::Entity::find()
            .filter(batches::Column::ProductId.is_in(product_ids))
            .all(txn)
            .await?;
        Ok(Self::from_models(models))
    }

    async fn load_for_batches(
        txn: &DatabaseTransaction,
        batch_ids: Vec<Uuid>,
    ) -> Result<Self, DbErr> {
        let models = batches::Entity::find()
            .filter(batches::Column::Id.is_in(batch_ids))
            .all(txn)
            .await?;
        Ok(Self::from_models(models))
    }

    fn core_batches(&self) -> Vec<tally_core::stock::Batch> {
        self.batches.values().map(support::to_core_batch).collect()
    }

    /// Applies one counter movement to the working copy and records the
    /// inventory transaction.
    async fn apply(
        &mut self,
        txn: &DatabaseTransaction,
        batch_id: Uuid,
        kind: StockMovementKind,
        quantity: rust_decimal::Decimal,
        order_id: Option<Uuid>,
        recorded_by: Uuid,
    ) -> Result<(), OrderRepoError> {
        let model = self
            .batches
            .get(&batch_id)
            .ok_or_else(|| StockError::BatchNotFound(BatchId::from_uuid(batch_id)))?;

        let (updated, movement) = StockService::apply(&support::to_core_batch(model), kind, quantity)?;

        let entry = inventory_transactions::ActiveModel {
            id: Set(Uuid::now_v7()),
            batch_id: Set(batch_id),
            product_id: Set(model.product_id),
            kind: Set(movement.kind.into()),
            quantity: Set(movement.quantity),
            on_hand_delta: Set(movement.on_hand_delta),
            reserved_delta: Set(movement.reserved_delta),
            order_id: Set(order_id),
            recorded_by: Set(recorded_by),
            recorded_at: Set(Utc::now().into()),
        };
        entry.insert(txn).await?;

        let model = self
            .batches
            .get_mut(&batch_id)
            .ok_or_else(|| StockError::BatchNotFound(BatchId::from_uuid(batch_id)))?;
        model.on_hand = updated.on_hand;
        model.reserved = updated.reserved;
        if !self.dirty.contains(&batch_id) {
            self.dirty.push(batch_id);
        }
        Ok(())
    }

    /// Writes all touched batches back with version-guarded updates.
    async fn flush(self, txn: &DatabaseTransaction) -> Result<(), OrderRepoError> {
        let now = Utc::now();
        for batch_id in self.dirty {
            let model = &self.batches[&batch_id];
            let loaded_version = self.loaded_versions[&batch_id];

            let result = batches::Entity::update_many()
                .col_expr(batches::Column::OnHand, Expr::value(model.on_hand))
                .col_expr(batches::Column::Reserved, Expr::value(model.reserved))
                .col_expr(batches::Column::Version, Expr::value(loaded_version + 1))
                .col_expr(batches::Column::UpdatedAt, Expr::value(now))
                .filter(batches::Column::Id.eq(batch_id))
                .filter(batches::Column::Version.eq(loaded_version))
                .exec(txn)
                .await?;

            if result.rows_affected == 0 {
                return Err(OrderRepoError::Conflict(batch_id));
            }
        }
        Ok(())
    }
}

/// Order repository owning the unit-of-work orchestrations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    db: DatabaseConnection,
}

impl OrderRepository {
    /// Creates a new order repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an order: validates input, computes totals, reserves stock,
    /// and optionally records an initial payment. All inside one database
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns a validation error, `InsufficientStock`, `Conflict` on a
    /// concurrent batch update, or a database error.
    pub async fn create_order(
        &self,
        input: CreateOrderInput,
    ) -> Result<OrderDetails, OrderRepoError> {
        let (totals, resolved) = OrderService::validate_and_total(&input)?;

        let txn = self.db.begin().await?;
        let now = Utc::now();

        // Plan reservations against the current batch snapshot.
        let product_ids: Vec<Uuid> = resolved
            .iter()
            .map(|line| line.product_id.into_inner())
            .collect();
        let mut ledger = StockLedger::load_for_products(&txn, product_ids).await?;

        let line_ids: Vec<OrderLineId> = resolved.iter().map(|_| OrderLineId::new()).collect();
        let requests: Vec<AllocationRequest> = resolved
            .iter()
            .zip(&line_ids)
            .map(|(line, line_id)| AllocationRequest {
                line_id: *line_id,
                product_id: line.product_id,
                binding: line.binding,
                quantity: line.quantity,
            })
            .collect();
        let plans = plan_reservations(&requests, &ledger.core_batches())?;

        let order_id = OrderId::new().into_inner();
        let order_model = orders::ActiveModel {
            id: Set(order_id),
            kind: Set(input.kind.into()),
            counterparty_id: Set(input.counterparty_id.into_inner()),
            status: Set(db_enums::OrderStatus::Pending),
            subtotal: Set(totals.subtotal),
            vat_total: Set(totals.vat),
            manufacturing_tax_total: Set(totals.manufacturing_tax),
            total: Set(totals.total),
            due_date: Set(input.due_date),
            version: Set(0),
            created_by: Set(input.created_by.into_inner()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        let mut line_models = Vec::with_capacity(resolved.len());
        for (line, line_id) in resolved.iter().zip(&line_ids) {
            let (binding_mode, bound_batch_id) = match line.binding {
                tally_core::stock::BatchBinding::ExplicitBatch(batch_id) => {
                    (db_enums::BindingMode::ExplicitBatch, Some(batch_id.into_inner()))
                }
                tally_core::stock::BatchBinding::AutoAllocate => {
                    (db_enums::BindingMode::AutoAllocate, None)
                }
            };

            let model = order_lines::ActiveModel {
                id: Set(line_id.into_inner()),
                order_id: Set(order_id),
                product_id: Set(line.product_id.into_inner()),
                binding_mode: Set(binding_mode),
                bound_batch_id: Set(bound_batch_id),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                vat_amount: Set(line.vat_amount),
                manufacturing_tax_amount: Set(line.manufacturing_tax_amount),
                refunded_quantity: Set(rust_decimal::Decimal::ZERO),
                created_at: Set(now.into()),
            }
            .insert(&txn)
            .await?;
            line_models.push(model);
        }

        // Record the planned allocations and reserve the stock.
        for plan in &plans {
            for (position, allocation) in plan.allocations.iter().enumerate() {
                order_line_allocations::ActiveModel {
                    id: Set(Uuid::now_v7()),
                    order_line_id: Set(plan.line_id.into_inner()),
                    batch_id: Set(allocation.batch_id.into_inner()),
                    quantity: Set(allocation.quantity),
                    position: Set(i32::try_from(position).unwrap_or(i32::MAX)),
                    created_at: Set(now.into()),
                }
                .insert(&txn)
                .await?;

                ledger
                    .apply(
                        &txn,
                        allocation.batch_id.into_inner(),
                        StockMovementKind::Reserve,
                        allocation.quantity,
                        Some(order_id),
                        input.created_by.into_inner(),
                    )
                    .await?;
            }
        }
        ledger.flush(&txn).await?;

        let mut entry_models = Vec::new();
        if let Some(payment) = &input.initial_payment {
            let order = support::to_core_order(&order_model);
            OrderService::accept_payment(&order, &[], payment)?;
            let entry = Self::insert_entry(
                &txn,
                &order_model,
                db_enums::PaymentEntryType::Payment,
                payment,
                input.created_by.into_inner(),
            )
            .await?;
            entry_models.push(entry);
        }

        txn.commit().await?;

        Ok(OrderDetails {
            order: order_model,
            lines: line_models,
            entries: entry_models,
        })
    }

    /// Appends a payment to the order's ledger and mirrors it.
    ///
    /// The version-guarded order touch serializes concurrent payments: of
    /// two payments that together exceed the total, at most one commits.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, an acceptance error, `Conflict`, or a database
    /// error.
    pub async fn add_payment(
        &self,
        order_id: Uuid,
        payment: PaymentInput,
        recorded_by: Uuid,
    ) -> Result<payment_entries::Model, OrderRepoError> {
        let txn = self.db.begin().await?;

        let order_model = Self::load_order(&txn, order_id).await?;
        let entry_models = Self::load_entries(&txn, order_id).await?;
        let order = support::to_core_order(&order_model);
        let entries: Vec<_> = entry_models.iter().map(support::to_core_entry).collect();

        OrderService::accept_payment(&order, &entries, &payment)?;

        let entry = Self::insert_entry(
            &txn,
            &order_model,
            db_enums::PaymentEntryType::Payment,
            &payment,
            recorded_by,
        )
        .await?;

        Self::guarded_touch(&txn, &order_model).await?;
        txn.commit().await?;
        Ok(entry)
    }

    /// Applies a refund: money entry, stock returns, line bookkeeping, and
    /// the refund record, all in one unit of work.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, a refund validation error, `Conflict`, or a
    /// database error.
    pub async fn refund(
        &self,
        order_id: Uuid,
        request: RefundRequest,
    ) -> Result<RefundOutcome, OrderRepoError> {
        let txn = self.db.begin().await?;

        let order_model = Self::load_order(&txn, order_id).await?;
        let entry_models = Self::load_entries(&txn, order_id).await?;
        let line_models = Self::load_lines(&txn, order_id).await?;

        let order = support::to_core_order(&order_model);
        let entries: Vec<_> = entry_models.iter().map(support::to_core_entry).collect();
        let lines: Vec<_> = line_models.iter().map(support::to_core_line).collect();
        let allocations = Self::load_allocations(&txn, &line_models).await?;

        let plan = tally_core::refund::RefundService::validate_and_plan(
            &order,
            &entries,
            &lines,
            &request,
            |line_id| allocations.get(&line_id).cloned().unwrap_or_default(),
        )?;

        let now = Utc::now();

        if plan.has_money_component() {
            let refund_payment = PaymentInput {
                amount: plan.transaction.amount,
                method: request.method,
                reference: None,
                check_number: request.check_number.clone(),
            };
            Self::insert_entry(
                &txn,
                &order_model,
                db_enums::PaymentEntryType::Refund,
                &refund_payment,
                request.requested_by.into_inner(),
            )
            .await?;
        }

        if plan.has_stock_component() {
            let batch_ids: Vec<Uuid> = plan
                .returns
                .iter()
                .map(|r| r.batch_id.into_inner())
                .collect();
            let mut ledger = StockLedger::load_for_batches(&txn, batch_ids).await?;
            for batch_return in &plan.returns {
                ledger
                    .apply(
                        &txn,
                        batch_return.batch_id.into_inner(),
                        StockMovementKind::RefundReturn,
                        batch_return.quantity,
                        Some(order_id),
                        request.requested_by.into_inner(),
                    )
                    .await?;
            }
            ledger.flush(&txn).await?;
        }

        // Bump per-line returned quantities.
        for refund_line in &plan.lines {
            let line_model = line_models
                .iter()
                .find(|l| l.id == refund_line.order_line_id.into_inner())
                .ok_or(RefundError::LineNotFound(refund_line.order_line_id))?;

            order_lines::ActiveModel {
                id: Set(line_model.id),
                refunded_quantity: Set(line_model.refunded_quantity + refund_line.quantity),
                ..Default::default()
            }
            .update(&txn)
            .await?;
        }

        let transaction = refund_transactions::ActiveModel {
            id: Set(plan.transaction.id.into_inner()),
            order_id: Set(order_id),
            amount: Set(plan.transaction.amount),
            reason: Set(plan.transaction.reason.clone()),
            requested_by: Set(plan.transaction.requested_by.into_inner()),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        let mut refund_line_models = Vec::with_capacity(plan.lines.len());
        for refund_line in &plan.lines {
            let model = refund_lines::ActiveModel {
                id: Set(RefundLineId::new().into_inner()),
                refund_transaction_id: Set(transaction.id),
                order_line_id: Set(refund_line.order_line_id.into_inner()),
                quantity: Set(refund_line.quantity),
                amount: Set(refund_line.amount),
                created_at: Set(now.into()),
            }
            .insert(&txn)
            .await?;
            refund_line_models.push(model);
        }

        Self::guarded_touch(&txn, &order_model).await?;
        txn.commit().await?;

        Ok(RefundOutcome {
            transaction,
            lines: refund_line_models,
        })
    }

    /// Transitions an order's lifecycle status. Pending → Completed issues
    /// every recorded reservation.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, a transition error (Cancelled is always
    /// rejected as a target), `Conflict`, or a database error.
    pub async fn transition_status(
        &self,
        order_id: Uuid,
        target: OrderStatus,
        actor: Uuid,
    ) -> Result<orders::Model, OrderRepoError> {
        let txn = self.db.begin().await?;

        let order_model = Self::load_order(&txn, order_id).await?;
        let order = support::to_core_order(&order_model);
        OrderService::validate_transition(&order, target)?;

        // The only transition that survives validation is Pending →
        // Completed: issue all reservations.
        let line_models = Self::load_lines(&txn, order_id).await?;
        let allocations = Self::load_allocations(&txn, &line_models).await?;

        let batch_ids: Vec<Uuid> = allocations
            .values()
            .flatten()
            .map(|a| a.batch_id.into_inner())
            .collect();
        let mut ledger = StockLedger::load_for_batches(&txn, batch_ids).await?;
        for allocation in allocations.values().flatten() {
            ledger
                .apply(
                    &txn,
                    allocation.batch_id.into_inner(),
                    StockMovementKind::Issue,
                    allocation.quantity,
                    Some(order_id),
                    actor,
                )
                .await?;
        }
        ledger.flush(&txn).await?;

        let updated =
            Self::guarded_status_update(&txn, &order_model, db_enums::OrderStatus::Completed)
                .await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Cancels an order after the cancellation guard passes. Pending
    /// reservations are released as part of the cancellation itself.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, a guard error, `Conflict`, or a database error.
    pub async fn cancel(
        &self,
        order_id: Uuid,
        actor: Uuid,
    ) -> Result<orders::Model, OrderRepoError> {
        let txn = self.db.begin().await?;

        let order_model = Self::load_order(&txn, order_id).await?;
        let entry_models = Self::load_entries(&txn, order_id).await?;
        let line_models = Self::load_lines(&txn, order_id).await?;

        let order = support::to_core_order(&order_model);
        let entries: Vec<_> = entry_models.iter().map(support::to_core_entry).collect();
        let lines: Vec<_> = line_models.iter().map(support::to_core_line).collect();

        OrderService::validate_cancellation(&order, &entries, &lines)?;

        if order.status == OrderStatus::Pending {
            let allocations = Self::load_allocations(&txn, &line_models).await?;
            let batch_ids: Vec<Uuid> = allocations
                .values()
                .flatten()
                .map(|a| a.batch_id.into_inner())
                .collect();
            let mut ledger = StockLedger::load_for_batches(&txn, batch_ids).await?;
            for allocation in allocations.values().flatten() {
                ledger
                    .apply(
                        &txn,
                        allocation.batch_id.into_inner(),
                        StockMovementKind::Release,
                        allocation.quantity,
                        Some(order_id),
                        actor,
                    )
                    .await?;
            }
            ledger.flush(&txn).await?;
        }

        let updated =
            Self::guarded_status_update(&txn, &order_model, db_enums::OrderStatus::Cancelled)
                .await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Loads an order with its lines and payment ledger.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or a database error.
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderDetails, OrderRepoError> {
        let order = orders::Entity::find_by_id(order_id)
            .one(&self.db)
            .await?
            .ok_or(OrderRepoError::NotFound(order_id))?;

        let lines = order_lines::Entity::find()
            .filter(order_lines::Column::OrderId.eq(order_id))
            .order_by_asc(order_lines::Column::CreatedAt)
            .all(&self.db)
            .await?;

        let entries = payment_entries::Entity::find()
            .filter(payment_entries::Column::OrderId.eq(order_id))
            .order_by_asc(payment_entries::Column::RecordedAt)
            .all(&self.db)
            .await?;

        Ok(OrderDetails {
            order,
            lines,
            entries,
        })
    }

    /// Derives the order's financial state as of `today`. Read-only and
    /// idempotent: reading twice without a mutation in between yields the
    /// same result.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `NegativeNetCash` on a corrupt ledger, or a
    /// database error.
    pub async fn get_derived_state(
        &self,
        order_id: Uuid,
        today: NaiveDate,
    ) -> Result<DerivedState, OrderRepoError> {
        let details = self.get_order(order_id).await?;
        let order = support::to_core_order(&details.order);
        let entries: Vec<_> = details.entries.iter().map(support::to_core_entry).collect();
        Ok(derive_state(&order, &entries, today)?)
    }

    /// Lists orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub async fn list_orders(
        &self,
        page: PageRequest,
    ) -> Result<PageResponse<orders::Model>, OrderRepoError> {
        let total = orders::Entity::find().count(&self.db).await?;
        let items = orders::Entity::find()
            .order_by_desc(orders::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;
        Ok(PageResponse::new(items, page.page, page.per_page, total))
    }

    async fn load_order(
        txn: &DatabaseTransaction,
        order_id: Uuid,
    ) -> Result<orders::Model, OrderRepoError> {
        orders::Entity::find_by_id(order_id)
            .one(txn)
            .await?
            .ok_or(OrderRepoError::NotFound(order_id))
    }

    async fn load_entries(
        txn: &DatabaseTransaction,
        order_id: Uuid,
    ) -> Result<Vec<payment_entries::Model>, OrderRepoError> {
        Ok(payment_entries::Entity::find()
            .filter(payment_entries::Column::OrderId.eq(order_id))
            .order_by_asc(payment_entries::Column::RecordedAt)
            .all(txn)
            .await?)
    }

    async fn load_lines(
        txn: &DatabaseTransaction,
        order_id: Uuid,
    ) -> Result<Vec<order_lines::Model>, OrderRepoError> {
        Ok(order_lines::Entity::find()
            .filter(order_lines::Column::OrderId.eq(order_id))
            .order_by_asc(order_lines::Column::CreatedAt)
            .all(txn)
            .await?)
    }

    /// Loads recorded reservation allocations per line, in draw order.
    async fn load_allocations(
        txn: &DatabaseTransaction,
        line_models: &[order_lines::Model],
    ) -> Result<HashMap<OrderLineId, Vec<BatchAllocation>>, OrderRepoError> {
        let line_ids: Vec<Uuid> = line_models.iter().map(|l| l.id).collect();
        let models = order_line_allocations::Entity::find()
            .filter(order_line_allocations::Column::OrderLineId.is_in(line_ids))
            .order_by_asc(order_line_allocations::Column::Position)
            .all(txn)
            .await?;

        let mut allocations: HashMap<OrderLineId, Vec<BatchAllocation>> = HashMap::new();
        for model in models {
            allocations
                .entry(OrderLineId::from_uuid(model.order_line_id))
                .or_default()
                .push(BatchAllocation {
                    batch_id: BatchId::from_uuid(model.batch_id),
                    quantity: model.quantity,
                });
        }
        Ok(allocations)
    }

    /// Appends a ledger entry and writes its financial mirror.
    async fn insert_entry(
        txn: &DatabaseTransaction,
        order_model: &orders::Model,
        entry_type: db_enums::PaymentEntryType,
        payment: &PaymentInput,
        recorded_by: Uuid,
    ) -> Result<payment_entries::Model, OrderRepoError> {
        let now = Utc::now();
        let entry = payment_entries::ActiveModel {
            id: Set(PaymentEntryId::new().into_inner()),
            order_id: Set(order_model.id),
            entry_type: Set(entry_type),
            amount: Set(payment.amount),
            method: Set(payment.method.into()),
            reference: Set(payment.reference.clone()),
            check_number: Set(payment.check_number.clone()),
            recorded_by: Set(recorded_by),
            recorded_at: Set(now.into()),
        }
        .insert(txn)
        .await?;

        let order = support::to_core_order(order_model);
        let mirror = mirror_entry(&order, &support::to_core_entry(&entry));
        financial_transactions::ActiveModel {
            id: Set(mirror.id.into_inner()),
            order_id: Set(mirror.order_id.into_inner()),
            payment_entry_id: Set(mirror.payment_entry_id.into_inner()),
            counterparty_id: Set(mirror.counterparty_id.into_inner()),
            kind: Set(mirror.kind.into()),
            amount: Set(mirror.amount),
            created_at: Set(now.into()),
        }
        .insert(txn)
        .await?;

        Ok(entry)
    }

    /// Version-guarded touch: bumps the order version or fails with a
    /// retryable Conflict. Holding the updated row for the rest of the
    /// transaction serializes concurrent ledger mutations.
    async fn guarded_touch(
        txn: &DatabaseTransaction,
        model: &orders::Model,
    ) -> Result<(), OrderRepoError> {
        let result = orders::Entity::update_many()
            .col_expr(orders::Column::Version, Expr::value(model.version + 1))
            .col_expr(orders::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(orders::Column::Id.eq(model.id))
            .filter(orders::Column::Version.eq(model.version))
            .exec(txn)
            .await?;

        if result.rows_affected == 0 {
            return Err(OrderRepoError::Conflict(model.id));
        }
        Ok(())
    }

    /// Version-guarded status update.
    async fn guarded_status_update(
        txn: &DatabaseTransaction,
        model: &orders::Model,
        status: db_enums::OrderStatus,
    ) -> Result<orders::Model, OrderRepoError> {
        Self::guarded_touch(txn, model).await?;

        // The guard above succeeded inside this transaction, so the row is
        // locked until commit and the plain update cannot race.
        let updated = orders::ActiveModel {
            id: Set(model.id),
            status: Set(status),
            ..Default::default()
        }
        .update(txn)
        .await?;

        Ok(updated)
    }
}
