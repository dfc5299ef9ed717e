mod handlers;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use clap::Parser;
use tower_http::compression::CompressionLayer;
use tracing::{error, info};

use pbspro_core::retriever::{QstatConfig, QstatRetriever, Retriever};
use pbspro_core::{Collector, CollectorConfig, SessionMode};

use state::AppState;

// ============================================================
// CLI
// ============================================================

#[derive(Parser)]
#[command(
    name = "pbspro-exporter",
    about = "Prometheus exporter for PBS Professional",
    version = pbspro_core::VERSION
)]
struct Args {
    /// Listen address.
    #[arg(long, default_value = "0.0.0.0:9307", env = "PBSPRO_EXPORTER_LISTEN")]
    listen: String,

    /// Path under which metrics are exposed.
    #[arg(long, default_value = "/metrics", env = "PBSPRO_EXPORTER_TELEMETRY_PATH")]
    telemetry_path: String,

    /// PBS server to query.
    #[arg(long, default_value = "localhost", env = "PBS_SERVER")]
    pbs_server: String,

    /// PBS server port.
    #[arg(long, default_value_t = pbspro_core::retriever::DEFAULT_PBS_PORT)]
    pbs_port: u16,

    /// Path to the qstat command.
    #[arg(long, default_value = "qstat")]
    qstat_bin: PathBuf,

    /// Path to the pbsnodes command.
    #[arg(long, default_value = "pbsnodes")]
    pbsnodes_bin: PathBuf,

    /// Timeout for establishing a scheduler session, in seconds.
    #[arg(long, default_value = "5")]
    connect_timeout: u64,

    /// Upper bound for one collection cycle, in seconds.
    #[arg(long, default_value = "10")]
    cycle_timeout: u64,

    /// "per-category" opens one session per category, "shared" one per scrape.
    #[arg(long, default_value = "per-category", env = "PBSPRO_EXPORTER_SESSION_MODE")]
    session_mode: SessionMode,

    /// Metric namespace.
    #[arg(long, default_value = "pbspro")]
    namespace: String,

    /// Maximum number of samples per scrape.
    #[arg(long, default_value = "500000")]
    max_samples: usize,
}

// ============================================================
// Main
// ============================================================

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pbspro_exporter=info,pbspro_core=info".into()),
        )
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to build tokio runtime");
            process::exit(1);
        }
    };
    runtime.block_on(async_main(args));
}

async fn async_main(args: Args) {
    if let Err(msg) = validate_telemetry_path(&args.telemetry_path) {
        error!(path = %args.telemetry_path, "{}", msg);
        process::exit(2);
    }
    if let Err(msg) = validate_namespace(&args.namespace) {
        error!(namespace = %args.namespace, "{}", msg);
        process::exit(2);
    }
    let addr: SocketAddr = match args.listen.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!(listen = %args.listen, error = %e, "invalid listen address");
            process::exit(2);
        }
    };

    let retriever = QstatRetriever::new(QstatConfig {
        server: args.pbs_server.clone(),
        port: args.pbs_port,
        qstat_bin: args.qstat_bin.clone(),
        pbsnodes_bin: args.pbsnodes_bin.clone(),
        connect_timeout: Duration::from_secs(args.connect_timeout),
    });
    let collector = Collector::new(
        retriever,
        CollectorConfig {
            cycle_timeout: Duration::from_secs(args.cycle_timeout),
            session_mode: args.session_mode,
        },
    );

    info!(
        version = pbspro_core::VERSION,
        server = %args.pbs_server,
        port = args.pbs_port,
        session_mode = %args.session_mode,
        "starting"
    );

    let state = AppState::new(collector)
        .with_namespace(&args.namespace)
        .with_telemetry_path(&args.telemetry_path)
        .with_max_samples(args.max_samples);
    let app = router(state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "failed to bind");
            process::exit(1);
        }
    };
    info!(%addr, path = %args.telemetry_path, "listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "server error");
        process::exit(1);
    }
    info!("shut down");
}

pub(crate) fn router<R: Retriever + 'static>(state: AppState<R>) -> Router {
    let telemetry_path = state.telemetry_path.to_string();
    Router::new()
        .route("/", get(handlers::handle_index::<R>))
        .route("/health", get(handlers::handle_health))
        .route(&telemetry_path, get(handlers::handle_metrics::<R>))
        .with_state(state)
        .layer(CompressionLayer::new())
}

fn validate_telemetry_path(path: &str) -> Result<(), &'static str> {
    if !path.starts_with('/') {
        return Err("telemetry path must start with '/'");
    }
    if path == "/" || path == "/health" {
        return Err("telemetry path collides with a built-in route");
    }
    Ok(())
}

/// Namespaces must be valid metric-name prefixes: `[a-zA-Z_:][a-zA-Z0-9_:]*`.
fn validate_namespace(namespace: &str) -> Result<(), &'static str> {
    let mut chars = namespace.chars();
    match chars.next() {
        None => return Err("namespace must not be empty"),
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        Some(_) => return Err("namespace must start with a letter, '_' or ':'"),
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':') {
        Ok(())
    } else {
        Err("namespace may only contain letters, digits, '_' and ':'")
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("received shutdown signal");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documentation() {
        let args = Args::try_parse_from(["pbspro-exporter"]).unwrap();
        assert_eq!(args.telemetry_path, "/metrics");
        assert_eq!(args.pbs_port, 15001);
        assert_eq!(args.connect_timeout, 5);
        assert_eq!(args.cycle_timeout, 10);
        assert_eq!(args.session_mode, SessionMode::PerCategory);
        assert_eq!(args.namespace, "pbspro");
        assert_eq!(args.max_samples, 500_000);
    }

    #[test]
    fn session_mode_is_parsed() {
        let args = Args::try_parse_from(["pbspro-exporter", "--session-mode", "shared"]).unwrap();
        assert_eq!(args.session_mode, SessionMode::Shared);
        assert!(Args::try_parse_from(["pbspro-exporter", "--session-mode", "pooled"]).is_err());
    }

    #[test]
    fn telemetry_path_must_not_shadow_builtin_routes() {
        assert!(validate_telemetry_path("/metrics").is_ok());
        assert!(validate_telemetry_path("metrics").is_err());
        assert!(validate_telemetry_path("/").is_err());
        assert!(validate_telemetry_path("/health").is_err());
    }

    #[test]
    fn namespace_must_be_a_metric_name_prefix() {
        for ok in ["pbspro", "pbs_pro", "_hpc", "site:pbs", "pbs2"] {
            assert!(validate_namespace(ok).is_ok(), "{ok} should be accepted");
        }
        for bad in ["", "pbs-pro", "2pbs", "pbs pro", "pbs.pro"] {
            assert!(validate_namespace(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn accepted_namespace_exports_metrics() {
        use pbspro_core::MetricSink;
        use pbspro_core::{BatchStatus, Category, PrometheusSink, SUBSYSTEM};

        let namespace = "site:pbs_2";
        assert!(validate_namespace(namespace).is_ok());

        let record = BatchStatus::new("workq").with("total_jobs", "3");
        let mut sink = PrometheusSink::new(namespace, SUBSYSTEM);
        for sample in pbspro_core::mapper::map(Category::Queue, &record).unwrap() {
            sink.push(sample).unwrap();
        }
        assert!(sink.encode().unwrap().contains("site:pbs_2_qstat_queue_total_jobs{"));
    }
}
