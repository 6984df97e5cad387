use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bakery_fulfillment::domain::order::{CustomerIdentity, DeliveryMethod, NewOrder, OrderLineItem};
use bakery_fulfillment::messaging::LogPublisher;
use bakery_fulfillment::metrics::{self, Metrics};
use bakery_fulfillment::{CommandOutcome, EngineConfig, FulfillmentCommand, OrderFulfillmentEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO, override with RUST_LOG
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,bakery_fulfillment=debug")),
        )
        .init();

    tracing::info!("🚀 Starting bakery fulfillment engine");

    // === 1. Configuration ===
    let config = match std::env::var("BAKERY_CONFIG") {
        Ok(path) => EngineConfig::from_file(&path)?,
        Err(_) => EngineConfig::default(),
    };
    tracing::info!(?config, "Loaded engine config");

    // === 2. Metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    let server_metrics = metrics.clone();
    let port = config.metrics_port;
    std::thread::spawn(move || {
        let result = actix_web::rt::System::new()
            .block_on(metrics::start_metrics_server(server_metrics, port));
        if let Err(e) = result {
            tracing::error!("Metrics server error: {}", e);
        }
    });

    // === 3. Engine ===
    let engine = OrderFulfillmentEngine::new(config, metrics);

    // Evict idle rate-limit windows once per window
    let cleanup_every = engine.config().rate_limit_window().max(std::time::Duration::from_secs(1));
    let _cleanup = engine.rate_limiter().spawn_cleanup(cleanup_every);

    let publisher = LogPublisher::new("order-events");

    // === 4. A morning at the bakery ===
    tracing::info!("📝 Placing demo orders");
    let demo_orders = [
        ("o1", vec![("Chip", 2)]),
        ("o2", vec![("Chip", 1), ("Brownie", 3)]),
        ("o3", vec![("Brownie", 5)]),
    ];

    let mut order_ids = Vec::new();
    for (customer, items) in demo_orders {
        let new_order = NewOrder {
            customer: CustomerIdentity::new(customer, format!("{customer}@example.com")),
            items: items
                .into_iter()
                .map(|(product, quantity)| OrderLineItem::new(product, quantity, 350))
                .collect(),
            delivery_method: DeliveryMethod::Pickup,
        };
        let order = engine.place_order(new_order, "checkout").await?;
        engine.confirm_payment(order.id, "payment_webhook").await?;
        order_ids.push(order.id);
    }

    for (product, entry) in engine.baking_queue().await {
        tracing::info!(
            product = %product,
            quantity = entry.total_quantity,
            orders = entry.order_count,
            "Baking queue"
        );
    }

    for product in ["Chip", "Brownie"] {
        let command = FulfillmentCommand::MarkBakingComplete { product_name: product.to_string() };
        if let CommandOutcome::Promotion(outcome) = engine.execute(command, "auto-baking-system").await? {
            tracing::info!(product = product, promoted = outcome.promoted.len(), "✅ Baking complete");
        }
    }

    if let Some(first) = order_ids.first() {
        engine.execute(FulfillmentCommand::Advance { order_id: *first }, "admin").await?;
        let history = engine.status_history(*first).await?;
        tracing::info!(order_id = %first, entries = history.len(), "Status history recorded");
    }

    let published = engine.publish_pending(&publisher).await?;
    tracing::info!("📤 Published {} events from the outbox", published);

    tracing::info!("⏳ Serving metrics, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!("👋 Shutting down");

    Ok(())
}
