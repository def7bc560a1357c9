use std::sync::Arc;

use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

mod config;
mod domain;
mod metrics;
mod notify;
mod store;
mod utils;

use config::Settings;
use domain::order::{DeliveryGuard, Order, OrderInWay, OrderStatus, TransitReply};
use notify::{InAppNotifier, NotificationFanout, NotificationSender, PushGatewayClient};
use store::{ensure_schema, PgOrderStore, PgTrackingStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=delivery_guard=trace cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,delivery_guard=debug")),
        )
        .init();

    tracing::info!("🚚 Starting delivery transition guard");

    let settings = Settings::from_env();

    // === 1. Storage ===
    tracing::info!("Connecting to Postgres...");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&settings.database_url)
        .await?;
    ensure_schema(&pool).await?;

    let orders = Arc::new(PgOrderStore::new(pool.clone()));
    let tracking = Arc::new(PgTrackingStore::new(pool.clone()));

    // === 2. Metrics exporter ===
    tracing::info!("Initializing metrics");
    let metrics = Arc::new(metrics::Metrics::new()?);

    // Run the exporter on its own runtime so a wedged scrape can never
    // touch the guard's request path
    let metrics_registry = Arc::new(metrics.registry().clone());
    let metrics_port = settings.metrics_port;
    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().expect("metrics runtime");
        rt.block_on(async {
            if let Err(err) = metrics::start_metrics_server(metrics_registry, metrics_port).await {
                tracing::error!("Metrics server error: {}", err);
            }
        });
    });

    // === 3. Notification channels ===
    let mut channels: Vec<Arc<dyn NotificationSender>> =
        vec![Arc::new(InAppNotifier::new(pool.clone()))];
    match &settings.push_gateway_url {
        Some(endpoint) => {
            channels.push(Arc::new(PushGatewayClient::new(endpoint.clone())?));
            tracing::info!(endpoint = %endpoint, "Push channel enabled");
        }
        None => {
            tracing::info!("PUSH_GATEWAY_URL unset; push channel disabled");
        }
    }
    let notifier = Arc::new(NotificationFanout::new(channels, metrics.clone()));

    // === 4. The guard ===
    let guard = DeliveryGuard::new(orders.clone(), tracking.clone(), notifier, metrics.clone());

    // === 5. Walk two orders through the delivery lifecycle ===
    // Staging plays the parts that live outside this core: the storefront
    // created and assigned these orders, and the trip tracker files the
    // transit record once the driver leaves.
    tracing::info!("📝 Demonstrating the delivery lifecycle");

    let driver_id = Uuid::new_v4();
    let first = demo_order(driver_id, Some("SF-1042"));
    let second = demo_order(driver_id, None);
    orders.insert(&first).await?;
    orders.insert(&second).await?;

    let reply = TransitReply::from(guard.begin_transit(first.id, driver_id).await);
    tracing::info!("➡️  First transit: {}", serde_json::to_string(&reply)?);

    tracking
        .insert(&OrderInWay {
            order_id: first.id,
            driver_id,
            started_at: Utc::now(),
        })
        .await?;

    // The same driver asking for a second trip gets refused
    let reply = TransitReply::from(guard.begin_transit(second.id, driver_id).await);
    tracing::info!("➡️  Second transit while busy: {}", serde_json::to_string(&reply)?);

    guard.complete_delivery(first.id).await?;
    tracing::info!("✅ First order delivered: {}", first.id);

    // Now the driver is free again
    let reply = TransitReply::from(guard.begin_transit(second.id, driver_id).await);
    tracing::info!("➡️  Second transit after delivery: {}", serde_json::to_string(&reply)?);

    // No tracking record was staged for this one; completion tolerates
    // that and says so in the logs
    guard.complete_delivery(second.id).await?;
    tracing::info!("✅ Second order delivered: {}", second.id);

    tracing::info!("🎉 Demo complete! /metrics stays up for a moment...");
    tokio::time::sleep(tokio::time::Duration::from_secs(10)).await;

    Ok(())
}

fn demo_order(driver_id: Uuid, order_number: Option<&str>) -> Order {
    let now = Utc::now();
    Order {
        id: Uuid::new_v4(),
        status: OrderStatus::Assigned,
        driver_id: Some(driver_id),
        customer_id: Uuid::new_v4(),
        order_number: order_number.map(str::to_string),
        created_at: now,
        updated_at: now,
    }
}
