use crate::config::Environment;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default `EnvFilter` directives when `RUST_LOG` is unset. Sync and snapshot
/// modules get their own levels, separate from the rest of the engine.
fn default_directives(env: &Environment) -> String {
    let (engine, sync, store, http) = match env {
        Environment::Dev => ("debug", "trace", "debug", "debug"),
        Environment::Staging => ("info", "debug", "debug", "info"),
        Environment::Prod => ("info", "info", "warn", "warn"),
    };

    let fallback = if env.is_prod() { "warn" } else { "info" };
    [
        format!("bidsync_backend={engine}"),
        format!("bidsync_backend::services::sync={sync}"),
        format!("bidsync_backend::services::catalog={sync}"),
        format!("bidsync_backend::services::store={store}"),
        format!("bidsync_backend::services::local_cache={store}"),
        format!("tower_http={http}"),
        // the redis connection manager reconnects noisily
        "redis=warn".to_string(),
        fallback.to_string(),
    ]
    .join(",")
}

pub fn init_logging(env: &Environment) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(env)));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(env.is_dev())
        .with_line_number(env.is_dev());

    if env.is_prod() {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.pretty())
            .init();
    }

    tracing::info!("Logging initialized for {:?} environment", env);
}
