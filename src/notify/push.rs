use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::utils::{
    retry_with_backoff, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, RetryPolicy,
    RetryResult,
};

use super::sender::{CustomerNotice, NotificationSender};

/// Client for the external push gateway, the service that owns device
/// tokens and delivers to customers' phones. Wrapped in a circuit breaker
/// so a dead gateway cannot stall delivery completion, and retried a small
/// number of times because pushes are best-effort anyway.
pub struct PushGatewayClient {
    http: reqwest::Client,
    endpoint: String,
    breaker: CircuitBreaker,
    retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct PushPayload<'a> {
    user_id: Uuid,
    order_id: Uuid,
    order_number: &'a str,
    template: &'static str,
    message: String,
}

impl PushGatewayClient {
    pub fn new(endpoint: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;

        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
            success_threshold: 2,
        });

        Ok(Self {
            http,
            endpoint,
            breaker,
            retry: RetryPolicy::conservative(),
        })
    }

    async fn post_notice(&self, notice: &CustomerNotice) -> Result<()> {
        let payload = PushPayload {
            user_id: notice.customer_id,
            order_id: notice.order_id,
            order_number: &notice.order_label,
            template: notice.kind.as_str(),
            message: notice.message(),
        };

        self.http
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    async fn send_once(&self, notice: &CustomerNotice) -> Result<()> {
        match self.breaker.call(self.post_notice(notice)).await {
            Ok(()) => Ok(()),
            Err(CircuitBreakerError::CircuitOpen) => Err(anyhow!("push gateway circuit is open")),
            Err(CircuitBreakerError::OperationFailed(err)) => Err(err),
        }
    }
}

#[async_trait]
impl NotificationSender for PushGatewayClient {
    fn channel(&self) -> &'static str {
        "push"
    }

    async fn notify_customer(&self, notice: &CustomerNotice) -> Result<()> {
        let outcome =
            retry_with_backoff(self.retry.clone(), |_attempt| self.send_once(notice)).await;

        match outcome {
            RetryResult::Success(()) => {
                tracing::debug!(
                    order_id = %notice.order_id,
                    "Push notification accepted by gateway"
                );
                Ok(())
            }
            RetryResult::Failed(err) => {
                Err(err.context("push gateway rejected the delivered notice"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::sender::NoticeKind;

    fn notice() -> CustomerNotice {
        CustomerNotice {
            customer_id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            order_label: "SF-7".to_string(),
            kind: NoticeKind::OrderDelivered,
        }
    }

    #[test]
    fn test_payload_matches_the_gateway_contract() {
        let notice = notice();
        let payload = PushPayload {
            user_id: notice.customer_id,
            order_id: notice.order_id,
            order_number: &notice.order_label,
            template: notice.kind.as_str(),
            message: notice.message(),
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["template"], "order_delivered");
        assert_eq!(json["order_number"], "SF-7");
        assert_eq!(json["user_id"], notice.customer_id.to_string());
        assert!(json["message"].as_str().unwrap().contains("SF-7"));
    }

    #[tokio::test]
    async fn test_unreachable_gateway_fails_after_bounded_retries() {
        // Nothing listens on the discard port; every attempt errors and the
        // retry budget bounds the call instead of hanging it.
        let client = PushGatewayClient::new("http://127.0.0.1:9/notify".to_string()).unwrap();

        let result = client.notify_customer(&notice()).await;

        assert!(result.is_err());
    }
}
