use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::sender::{CustomerNotice, NotificationSender};

/// Writes the notice into the storefront's notification feed table. The
/// web app reads these rows to populate the customer's in-app bell.
pub struct InAppNotifier {
    pool: PgPool,
}

impl InAppNotifier {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationSender for InAppNotifier {
    fn channel(&self) -> &'static str {
        "in_app"
    }

    async fn notify_customer(&self, notice: &CustomerNotice) -> Result<()> {
        sqlx::query(
            "INSERT INTO customer_notifications (id, customer_id, order_id, kind, body, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4())
        .bind(notice.customer_id)
        .bind(notice.order_id)
        .bind(notice.kind.as_str())
        .bind(notice.message())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            customer_id = %notice.customer_id,
            order_id = %notice.order_id,
            "In-app notification stored"
        );

        Ok(())
    }
}
