use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use scope2_assess::config::AppConfig;
use scope2_assess::error::AppError;
use scope2_assess::telemetry;
use scope2_assess::workflows::scope2::emissions::{
    kilojoules_to_megawatt_hours, round2, EmissionsSnapshot, DEFAULT_GRID_EMISSION_FACTOR,
};
use scope2_assess::workflows::scope2::{
    scope2_router, ConfiguredMailer, JsonFileStore, NotifySettings, Scope2AssessmentService,
};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Scope 2 Assessment Service",
    about = "Run the Scope 2 emissions self-assessment service or compute snapshots from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Compute an emissions snapshot from raw energy quantities
    Snapshot(SnapshotArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct SnapshotArgs {
    /// Renewable energy quantity (kWh, or kJ with --kilojoules)
    #[arg(long)]
    renewable: f64,
    /// Total energy quantity (kWh, or kJ with --kilojoules)
    #[arg(long)]
    total: f64,
    /// Grid emission factor in kg CO2e/kWh (defaults to the national grid average)
    #[arg(long)]
    factor: Option<f64>,
    /// Interpret quantities as kilojoules instead of kilowatt-hours
    #[arg(long)]
    kilojoules: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Snapshot(args) => {
            run_snapshot(args);
            Ok(())
        }
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let store = Arc::new(JsonFileStore::new(config.storage.data_file.clone()));
    let mailer = Arc::new(ConfiguredMailer::from_config(&config.mail)?);
    let settings = NotifySettings::from_config(&config.mail, config.emissions.grid_factor);
    let service = Arc::new(Scope2AssessmentService::new(store, mailer, settings));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(scope2_router(service))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "scope 2 assessment service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_snapshot(args: SnapshotArgs) {
    let SnapshotArgs {
        renewable,
        total,
        factor,
        kilojoules,
    } = args;

    let (renewable_kwh, total_kwh) = if kilojoules {
        (
            kilojoules_to_megawatt_hours(renewable) * 1_000.0,
            kilojoules_to_megawatt_hours(total) * 1_000.0,
        )
    } else {
        (renewable, total)
    };

    let factor = factor.unwrap_or(DEFAULT_GRID_EMISSION_FACTOR);
    let snapshot = EmissionsSnapshot::compute(renewable_kwh, total_kwh, factor);

    println!("Scope 2 emissions snapshot");
    println!(
        "Consumption: {} kWh total, {} kWh renewable",
        round2(total_kwh),
        round2(renewable_kwh)
    );
    println!("Grid emission factor: {factor} kg CO2e/kWh");
    println!("Renewable share: {:.2}%", snapshot.renewable_percentage);
    println!(
        "Location-based emissions: {} kg CO2e",
        round2(snapshot.location_based_kg)
    );
    println!(
        "Market-based emissions: {} kg CO2e",
        round2(snapshot.market_based_kg)
    );
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(payload) = healthcheck().await;
        assert_eq!(payload, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn readiness_flips_with_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let (_, handle) = PrometheusMetricLayer::pair();
        let state = AppState {
            readiness: flag.clone(),
            metrics: handle,
        };

        let response = readiness_endpoint(State(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        flag.store(true, Ordering::Release);
        let response = readiness_endpoint(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
