use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::order::{Order, OrderInWay, OrderStatus};

use super::order_store::{OrderStore, TrackingStore};

// ============================================================================
// Postgres Storage
// ============================================================================
//
// Orders live in the `orders` table with the status held as text; transit
// tracking records live in `orders_in_way`. The single-active-trip rule is
// enforced twice:
// - the IN_TRANSIT update re-checks every precondition inside one statement,
// - a partial unique index on (driver_id) WHERE status = 'IN_TRANSIT'
//   backstops it at the schema level.
//
// ============================================================================

/// Create the tables and the invariant-backing index if they are missing.
/// The storefront migrations own this schema in production; having it here
/// keeps a fresh checkout runnable against a blank local database.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS orders (
            id UUID PRIMARY KEY,
            status TEXT NOT NULL,
            driver_id UUID,
            customer_id UUID NOT NULL,
            order_number TEXT,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS orders_in_way (
            order_id UUID PRIMARY KEY,
            driver_id UUID NOT NULL,
            started_at TIMESTAMPTZ NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS customer_notifications (
            id UUID PRIMARY KEY,
            customer_id UUID NOT NULL,
            order_id UUID NOT NULL,
            kind TEXT NOT NULL,
            body TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    // No driver holds two IN_TRANSIT orders, whatever the guard does.
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS one_active_trip_per_driver
         ON orders (driver_id)
         WHERE status = 'IN_TRANSIT'",
    )
    .execute(pool)
    .await?;

    tracing::info!("Delivery schema is in place");
    Ok(())
}

fn order_from_row(row: &PgRow) -> Result<Order> {
    let status_text: String = row.try_get("status")?;
    Ok(Order {
        id: row.try_get("id")?,
        status: status_text.parse()?,
        driver_id: row.try_get("driver_id")?,
        customer_id: row.try_get("customer_id")?,
        order_number: row.try_get("order_number")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a fully-formed order row. Order creation belongs to the
    /// storefront; this exists so the demo binary can stage data.
    pub async fn insert(&self, order: &Order) -> Result<()> {
        sqlx::query(
            "INSERT INTO orders (id, status, driver_id, customer_id, order_number, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(order.id)
        .bind(order.status.as_str())
        .bind(order.driver_id)
        .bind(order.customer_id)
        .bind(order.order_number.as_deref())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn find_by_id(&self, order_id: Uuid) -> Result<Option<Order>> {
        let row = sqlx::query(
            "SELECT id, status, driver_id, customer_id, order_number, created_at, updated_at
             FROM orders
             WHERE id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(order_from_row).transpose()
    }

    async fn find_active_trip(
        &self,
        driver_id: Uuid,
        exclude_order: Uuid,
    ) -> Result<Option<Order>> {
        let row = sqlx::query(
            "SELECT id, status, driver_id, customer_id, order_number, created_at, updated_at
             FROM orders
             WHERE driver_id = $1 AND status = $2 AND id <> $3
             LIMIT 1",
        )
        .bind(driver_id)
        .bind(OrderStatus::InTransit.as_str())
        .bind(exclude_order)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(order_from_row).transpose()
    }

    async fn mark_in_transit(&self, order_id: Uuid, driver_id: Uuid) -> Result<Option<Order>> {
        // One statement, so the precondition re-check and the write cannot
        // interleave with a competing call. The partial unique index from
        // ensure_schema backstops this under any isolation level.
        let result = sqlx::query(
            "UPDATE orders
             SET status = $1, updated_at = $2
             WHERE id = $3
               AND driver_id = $4
               AND status = $5
               AND NOT EXISTS (
                   SELECT 1 FROM orders other
                   WHERE other.driver_id = $4
                     AND other.status = $1
                     AND other.id <> $3
               )
             RETURNING id, status, driver_id, customer_id, order_number, created_at, updated_at",
        )
        .bind(OrderStatus::InTransit.as_str())
        .bind(Utc::now())
        .bind(order_id)
        .bind(driver_id)
        .bind(OrderStatus::Assigned.as_str())
        .fetch_optional(&self.pool)
        .await;

        let row = match result {
            Ok(row) => row,
            // Under READ COMMITTED two competing updates can both pass the
            // NOT EXISTS probe; the index stops the loser. Report that as a
            // refused write, not a storage failure, so the caller can name
            // the competing trip.
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        row.as_ref().map(order_from_row).transpose()
    }

    async fn mark_delivered(&self, order_id: Uuid) -> Result<Order> {
        let row = sqlx::query(
            "UPDATE orders
             SET status = $1, updated_at = $2
             WHERE id = $3
             RETURNING id, status, driver_id, customer_id, order_number, created_at, updated_at",
        )
        .bind(OrderStatus::Delivered.as_str())
        .bind(Utc::now())
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => order_from_row(&row),
            None => anyhow::bail!("order {order_id} does not exist"),
        }
    }
}

pub struct PgTrackingStore {
    pool: PgPool,
}

impl PgTrackingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stage a tracking record. The trip tracker files these in production;
    /// this exists so the demo binary can stage data.
    pub async fn insert(&self, record: &OrderInWay) -> Result<()> {
        sqlx::query(
            "INSERT INTO orders_in_way (order_id, driver_id, started_at)
             VALUES ($1, $2, $3)",
        )
        .bind(record.order_id)
        .bind(record.driver_id)
        .bind(record.started_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl TrackingStore for PgTrackingStore {
    async fn delete(&self, order_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM orders_in_way WHERE order_id = $1")
            .bind(order_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

// ============================================================================
// Integration Test Notes
// ============================================================================
//
// The Postgres paths need a live database and are covered by integration
// runs rather than unit tests:
// - mark_in_transit refusing a second trip for a busy driver
// - the one_active_trip_per_driver index stopping a raced second IN_TRANSIT
//   row and surfacing as a refused write rather than an error
// - mark_delivered on a missing id surfacing as an error
// - orders_in_way delete reporting false on a repeat delete
//
// ============================================================================
