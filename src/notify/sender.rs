use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::order::Order;

// ============================================================================
// Customer Notices
// ============================================================================
//
// Delivery-completion messages fan out through NotificationSender
// implementations. Senders are best-effort collaborators: the guard treats
// every failure here as loggable, never as a reason to fail the delivery.
//
// ============================================================================

/// Template selector for customer-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    OrderDelivered,
}

impl NoticeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeKind::OrderDelivered => "order_delivered",
        }
    }
}

/// One message addressed to the customer who owns an order.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerNotice {
    pub customer_id: Uuid,
    pub order_id: Uuid,
    pub order_label: String,
    pub kind: NoticeKind,
}

impl CustomerNotice {
    pub fn order_delivered(order: &Order) -> Self {
        Self {
            customer_id: order.customer_id,
            order_id: order.id,
            order_label: order.display_label(),
            kind: NoticeKind::OrderDelivered,
        }
    }

    /// Rendered message body for this notice.
    pub fn message(&self) -> String {
        match self.kind {
            NoticeKind::OrderDelivered => {
                format!("Your order {} has been delivered. Enjoy!", self.order_label)
            }
        }
    }
}

/// A channel able to deliver a notice to a customer.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Short channel name for logs and metrics.
    fn channel(&self) -> &'static str;

    async fn notify_customer(&self, notice: &CustomerNotice) -> Result<()>;
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderStatus;
    use chrono::Utc;

    fn delivered_order(order_number: Option<&str>) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4(),
            status: OrderStatus::Delivered,
            driver_id: Some(Uuid::new_v4()),
            customer_id: Uuid::new_v4(),
            order_number: order_number.map(str::to_string),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_delivered_notice_uses_the_order_number() {
        let order = delivered_order(Some("SF-1042"));
        let notice = CustomerNotice::order_delivered(&order);

        assert_eq!(notice.customer_id, order.customer_id);
        assert_eq!(notice.order_label, "SF-1042");
        assert_eq!(notice.message(), "Your order SF-1042 has been delivered. Enjoy!");
    }

    #[test]
    fn test_delivered_notice_falls_back_to_id_suffix() {
        let order = delivered_order(None);
        let notice = CustomerNotice::order_delivered(&order);

        let hex = order.id.simple().to_string();
        assert!(notice.order_label.starts_with('#'));
        assert!(hex.ends_with(&notice.order_label[1..]));
        assert!(notice.message().contains(&notice.order_label));
    }

    #[test]
    fn test_notice_kind_wire_name() {
        assert_eq!(NoticeKind::OrderDelivered.as_str(), "order_delivered");
        let json = serde_json::to_string(&NoticeKind::OrderDelivered).unwrap();
        assert_eq!(json, "\"order_delivered\"");
    }
}
