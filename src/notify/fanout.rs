use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::future::join_all;

use crate::metrics::Metrics;

use super::sender::{CustomerNotice, NotificationSender};

// ============================================================================
// Notification Fan-out
// ============================================================================
//
// Dispatches one notice to every configured channel. Channels are
// independent: a failing push gateway must never block the in-app feed, so
// each failure is logged and counted and the fan-out itself always reports
// success to the guard.
//
// ============================================================================

pub struct NotificationFanout {
    channels: Vec<Arc<dyn NotificationSender>>,
    metrics: Arc<Metrics>,
}

impl NotificationFanout {
    pub fn new(channels: Vec<Arc<dyn NotificationSender>>, metrics: Arc<Metrics>) -> Self {
        Self { channels, metrics }
    }
}

#[async_trait]
impl NotificationSender for NotificationFanout {
    fn channel(&self) -> &'static str {
        "fanout"
    }

    async fn notify_customer(&self, notice: &CustomerNotice) -> Result<()> {
        let attempts = join_all(
            self.channels
                .iter()
                .map(|channel| channel.notify_customer(notice)),
        )
        .await;

        for (channel, attempt) in self.channels.iter().zip(attempts) {
            match attempt {
                Ok(()) => {
                    tracing::debug!(
                        channel = channel.channel(),
                        order_id = %notice.order_id,
                        "Notification delivered"
                    );
                }
                Err(err) => {
                    self.metrics.record_notification_failure(channel.channel());
                    tracing::warn!(
                        channel = channel.channel(),
                        order_id = %notice.order_id,
                        error = %err,
                        "Notification channel failed; other channels unaffected"
                    );
                }
            }
        }

        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::sender::NoticeKind;
    use std::sync::atomic::{AtomicU32, Ordering};
    use uuid::Uuid;

    struct CountingChannel {
        name: &'static str,
        calls: AtomicU32,
        healthy: bool,
    }

    impl CountingChannel {
        fn new(name: &'static str, healthy: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: AtomicU32::new(0),
                healthy,
            })
        }
    }

    #[async_trait]
    impl NotificationSender for CountingChannel {
        fn channel(&self) -> &'static str {
            self.name
        }

        async fn notify_customer(&self, _notice: &CustomerNotice) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.healthy {
                Ok(())
            } else {
                anyhow::bail!("{} is down", self.name)
            }
        }
    }

    fn notice() -> CustomerNotice {
        CustomerNotice {
            customer_id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            order_label: "SF-9".to_string(),
            kind: NoticeKind::OrderDelivered,
        }
    }

    #[tokio::test]
    async fn test_every_channel_gets_the_notice() {
        let in_app = CountingChannel::new("in_app", true);
        let push = CountingChannel::new("push", true);
        let metrics = Arc::new(Metrics::new().unwrap());
        let fanout = NotificationFanout::new(vec![in_app.clone(), push.clone()], metrics);

        fanout.notify_customer(&notice()).await.unwrap();

        assert_eq!(in_app.calls.load(Ordering::SeqCst), 1);
        assert_eq!(push.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_one_dead_channel_does_not_block_the_others() {
        let in_app = CountingChannel::new("in_app", true);
        let push = CountingChannel::new("push", false);
        let metrics = Arc::new(Metrics::new().unwrap());
        let fanout =
            NotificationFanout::new(vec![in_app.clone(), push.clone()], metrics.clone());

        let result = fanout.notify_customer(&notice()).await;

        assert!(result.is_ok());
        assert_eq!(in_app.calls.load(Ordering::SeqCst), 1);
        assert_eq!(push.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            metrics
                .notification_failures
                .with_label_values(&["push"])
                .get(),
            1
        );
        assert_eq!(
            metrics
                .notification_failures
                .with_label_values(&["in_app"])
                .get(),
            0
        );
    }
}
