use std::sync::Arc;
use tonic::Request;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use event_kv::config::{Backend, Config};
use event_kv::event_sourcing::{EventLog, EventLogStore, MemoryEventLog, ScyllaEventLog, StoreConfig};
use event_kv::metrics::{start_metrics_server, Metrics};
use event_kv::service::proto::{
    CreateRequest, DeleteRequest, GetHistoryRequest, GetRequest, UpdateRequest,
};
use event_kv::service::{gateway_status, http_status, KeyValueServer};
use event_kv::utils::{retry_with_backoff, RetryConfig, RetryResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,event_kv=debug"))
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(backend = ?config.backend, "🚀 Starting event-sourced KV store");

    // === 1. Metrics registry and HTTP endpoint ===
    let metrics = Arc::new(Metrics::new()?);
    if config.metrics_port != 0 {
        let registry = Arc::new(metrics.registry().clone());
        let port = config.metrics_port;
        std::thread::spawn(move || {
            let system = actix_web::rt::System::new();
            if let Err(e) = system.block_on(start_metrics_server(registry, port)) {
                tracing::error!("Metrics server error: {}", e);
            }
        });
    }

    // === 2. Open the event log (one session for the whole process) ===
    match config.backend {
        Backend::Memory => run(Arc::new(MemoryEventLog::new()), &config, metrics).await,
        Backend::Scylla => {
            let scylla = config.scylla();
            let connected = retry_with_backoff(RetryConfig::conservative(), |_attempt| {
                ScyllaEventLog::connect(scylla.clone())
            })
            .await;

            let log = match connected {
                RetryResult::Success(log) => log,
                RetryResult::Failed { error, .. } | RetryResult::PermanentFailure(error) => {
                    return Err(error.into());
                }
            };

            run(Arc::new(log), &config, metrics).await
        }
    }
}

async fn run<L: EventLog + 'static>(
    log: Arc<L>,
    config: &Config,
    metrics: Arc<Metrics>,
) -> anyhow::Result<()> {
    let store_config = StoreConfig {
        max_transaction_attempts: config.tx_max_attempts,
        ..StoreConfig::default()
    };
    let store = Arc::new(EventLogStore::with_config(log, store_config, metrics));

    // === 3. Schema and index setup ===
    store.ensure_schema().await?;
    if config.reset_on_start {
        tracing::warn!("RESET_ON_START set, dropping all events");
        store.reset().await?;
    }

    // === 4. Demonstrate a key lifecycle through the RPC surface ===
    if config.demo_enabled() {
        let server = KeyValueServer::new(store.clone());
        demo_lifecycle(&server).await;
    }

    tracing::info!("⏳ Store ready, press Ctrl-C to shut down");
    tokio::signal::ctrl_c().await?;

    store.close().await?;
    tracing::info!("👋 Shutdown complete");
    Ok(())
}

async fn demo_lifecycle<L: EventLog>(server: &KeyValueServer<L>) {
    let key = format!("demo-{}", chrono::Utc::now().timestamp_millis());
    tracing::info!(key = %key, "📝 Demonstrating key lifecycle");

    let steps = vec![
        ("create", server.create(Request::new(CreateRequest { key: key.clone(), value: "1".into() })).await.map(|_| ())),
        ("create again", server.create(Request::new(CreateRequest { key: key.clone(), value: "1".into() })).await.map(|_| ())),
        ("update", server.update(Request::new(UpdateRequest { key: key.clone(), value: "2".into() })).await.map(|_| ())),
        ("delete", server.delete(Request::new(DeleteRequest { key: key.clone() })).await.map(|_| ())),
        ("get deleted", server.get(Request::new(GetRequest { key: key.clone() })).await.map(|_| ())),
        ("create again", server.create(Request::new(CreateRequest { key: key.clone(), value: "3".into() })).await.map(|_| ())),
    ];

    for (step, result) in steps {
        match result {
            Ok(()) => tracing::info!(key = %key, step = step, "✅ ok"),
            Err(status) => {
                let status = gateway_status(status);
                tracing::info!(
                    key = %key,
                    step = step,
                    code = ?status.code(),
                    http = http_status(status.code()),
                    detail = status.message(),
                    "❌ rejected"
                );
            }
        }
    }

    match server.get_history(Request::new(GetHistoryRequest { key: key.clone() })).await {
        Ok(resp) => {
            for event in resp.into_inner().events {
                let value = event.item.map(|item| item.value).unwrap_or_default();
                tracing::info!(key = %key, op = %event.op, value = %value, "📜 history");
            }
        }
        Err(status) => tracing::error!(key = %key, status = %status, "History failed"),
    }
}
