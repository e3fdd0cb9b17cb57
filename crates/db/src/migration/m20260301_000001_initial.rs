//! Initial database migration.
//!
//! Creates all enums and tables for the order, stock, refund, and finance
//! domains.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: INVENTORY
        // ============================================================
        db.execute_unprepared(BATCHES_SQL).await?;

        // ============================================================
        // PART 3: ORDERS & PAYMENT LEDGER
        // ============================================================
        db.execute_unprepared(ORDERS_SQL).await?;
        db.execute_unprepared(ORDER_LINES_SQL).await?;
        db.execute_unprepared(ORDER_LINE_ALLOCATIONS_SQL).await?;
        db.execute_unprepared(PAYMENT_ENTRIES_SQL).await?;

        // ============================================================
        // PART 4: AUDIT & REFUNDS
        // ============================================================
        db.execute_unprepared(INVENTORY_TRANSACTIONS_SQL).await?;
        db.execute_unprepared(REFUNDS_SQL).await?;

        // ============================================================
        // PART 5: FINANCIAL MIRROR
        // ============================================================
        db.execute_unprepared(FINANCIAL_TRANSACTIONS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
-- Order direction
CREATE TYPE order_kind AS ENUM ('sales', 'purchase');

-- Order lifecycle
CREATE TYPE order_status AS ENUM ('pending', 'completed', 'cancelled');

-- Payment methods
CREATE TYPE payment_method AS ENUM ('cash', 'bank_transfer', 'check');

-- Ledger entry direction
CREATE TYPE payment_entry_type AS ENUM ('payment', 'refund');

-- Line batch binding
CREATE TYPE binding_mode AS ENUM ('explicit_batch', 'auto_allocate');

-- Inventory counter movements
CREATE TYPE stock_movement_kind AS ENUM (
    'reserve',
    'release',
    'issue',
    'refund_return'
);

-- Financial mirror classification
CREATE TYPE financial_kind AS ENUM ('revenue', 'expense');
";

const BATCHES_SQL: &str = r"
CREATE TABLE batches (
    id UUID PRIMARY KEY,
    product_id UUID NOT NULL,
    label VARCHAR(100) NOT NULL,
    on_hand NUMERIC(20, 4) NOT NULL,
    reserved NUMERIC(20, 4) NOT NULL DEFAULT 0,
    received_at TIMESTAMPTZ NOT NULL,
    version BIGINT NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_batch_counters CHECK (
        reserved >= 0 AND on_hand >= 0 AND reserved <= on_hand
    )
);

CREATE INDEX idx_batches_product_received ON batches(product_id, received_at);
";

const ORDERS_SQL: &str = r"
CREATE TABLE orders (
    id UUID PRIMARY KEY,
    kind order_kind NOT NULL,
    counterparty_id UUID NOT NULL,
    status order_status NOT NULL DEFAULT 'pending',
    subtotal NUMERIC(20, 2) NOT NULL,
    vat_total NUMERIC(20, 2) NOT NULL,
    manufacturing_tax_total NUMERIC(20, 2) NOT NULL,
    total NUMERIC(20, 2) NOT NULL,
    due_date DATE NOT NULL,
    version BIGINT NOT NULL DEFAULT 0,
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_orders_status_due ON orders(status, due_date);
CREATE INDEX idx_orders_counterparty ON orders(counterparty_id);
";

const ORDER_LINES_SQL: &str = r"
CREATE TABLE order_lines (
    id UUID PRIMARY KEY,
    order_id UUID NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
    product_id UUID NOT NULL,
    binding_mode binding_mode NOT NULL,
    bound_batch_id UUID REFERENCES batches(id),
    quantity NUMERIC(20, 4) NOT NULL,
    unit_price NUMERIC(20, 2) NOT NULL,
    vat_amount NUMERIC(20, 2) NOT NULL,
    manufacturing_tax_amount NUMERIC(20, 2) NOT NULL,
    refunded_quantity NUMERIC(20, 4) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_line_quantities CHECK (
        quantity > 0 AND refunded_quantity >= 0 AND refunded_quantity <= quantity
    )
);

CREATE INDEX idx_order_lines_order ON order_lines(order_id);
CREATE INDEX idx_order_lines_product ON order_lines(product_id);
";

const ORDER_LINE_ALLOCATIONS_SQL: &str = r"
CREATE TABLE order_line_allocations (
    id UUID PRIMARY KEY,
    order_line_id UUID NOT NULL REFERENCES order_lines(id) ON DELETE CASCADE,
    batch_id UUID NOT NULL REFERENCES batches(id),
    quantity NUMERIC(20, 4) NOT NULL,
    position INTEGER NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (order_line_id, position)
);

CREATE INDEX idx_line_allocations_batch ON order_line_allocations(batch_id);
";

const PAYMENT_ENTRIES_SQL: &str = r"
CREATE TABLE payment_entries (
    id UUID PRIMARY KEY,
    order_id UUID NOT NULL REFERENCES orders(id),
    entry_type payment_entry_type NOT NULL,
    amount NUMERIC(20, 2) NOT NULL CHECK (amount > 0),
    method payment_method NOT NULL,
    reference VARCHAR(200),
    check_number VARCHAR(100),
    recorded_by UUID NOT NULL,
    recorded_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_payment_entries_order ON payment_entries(order_id, recorded_at);
";

const INVENTORY_TRANSACTIONS_SQL: &str = r"
CREATE TABLE inventory_transactions (
    id UUID PRIMARY KEY,
    batch_id UUID NOT NULL REFERENCES batches(id),
    product_id UUID NOT NULL,
    kind stock_movement_kind NOT NULL,
    quantity NUMERIC(20, 4) NOT NULL CHECK (quantity > 0),
    on_hand_delta NUMERIC(20, 4) NOT NULL,
    reserved_delta NUMERIC(20, 4) NOT NULL,
    order_id UUID REFERENCES orders(id),
    recorded_by UUID NOT NULL,
    recorded_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_inventory_txn_batch ON inventory_transactions(batch_id, recorded_at);
CREATE INDEX idx_inventory_txn_order ON inventory_transactions(order_id);
";

const REFUNDS_SQL: &str = r"
CREATE TABLE refund_transactions (
    id UUID PRIMARY KEY,
    order_id UUID NOT NULL REFERENCES orders(id),
    amount NUMERIC(20, 2) NOT NULL CHECK (amount >= 0),
    reason TEXT NOT NULL,
    requested_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_refund_txn_order ON refund_transactions(order_id);

CREATE TABLE refund_lines (
    id UUID PRIMARY KEY,
    refund_transaction_id UUID NOT NULL REFERENCES refund_transactions(id) ON DELETE CASCADE,
    order_line_id UUID NOT NULL REFERENCES order_lines(id),
    quantity NUMERIC(20, 4) NOT NULL CHECK (quantity > 0),
    amount NUMERIC(20, 2) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_refund_lines_order_line ON refund_lines(order_line_id);
";

const FINANCIAL_TRANSACTIONS_SQL: &str = r"
CREATE TABLE financial_transactions (
    id UUID PRIMARY KEY,
    order_id UUID NOT NULL REFERENCES orders(id),
    payment_entry_id UUID NOT NULL REFERENCES payment_entries(id),
    counterparty_id UUID NOT NULL,
    kind financial_kind NOT NULL,
    amount NUMERIC(20, 2) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (payment_entry_id)
);

CREATE INDEX idx_financial_txn_order ON financial_transactions(order_id);
CREATE INDEX idx_financial_txn_counterparty ON financial_transactions(counterparty_id);
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS financial_transactions;
DROP TABLE IF EXISTS refund_lines;
DROP TABLE IF EXISTS refund_transactions;
DROP TABLE IF EXISTS inventory_transactions;
DROP TABLE IF EXISTS payment_entries;
DROP TABLE IF EXISTS order_line_allocations;
DROP TABLE IF EXISTS order_lines;
DROP TABLE IF EXISTS orders;
DROP TABLE IF EXISTS batches;

DROP TYPE IF EXISTS financial_kind;
DROP TYPE IF EXISTS stock_movement_kind;
DROP TYPE IF EXISTS binding_mode;
DROP TYPE IF EXISTS payment_entry_type;
DROP TYPE IF EXISTS payment_method;
DROP TYPE IF EXISTS order_status;
DROP TYPE IF EXISTS order_kind;
";
