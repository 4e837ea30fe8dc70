//! Monitoring Service - Main Entry Point

use anyhow::Result;
use clap::{Arg, Command};
use perf_metrics::{
    EventType, MetricEvent, MetricsAggregator, Subscription, SystemClock, TokioScheduler,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use monitoring::{AppState, MonitoringConfig, router, simulation};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "monitoring=info,perf_metrics=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command line arguments
    let matches = Command::new("monitoring")
        .version(env!("CARGO_PKG_VERSION"))
        .author("ShrivenQuant Team")
        .about("Dashboard performance metrics service")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("monitoring.toml"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Override the configured port")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("no-simulation")
                .long("no-simulation")
                .help("Do not generate synthetic dashboard load")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    // Load configuration
    let default_config = "monitoring.toml".to_string();
    let config_path = matches
        .get_one::<String>("config")
        .unwrap_or(&default_config);
    let mut config = match MonitoringConfig::from_file(config_path) {
        Ok(config) => {
            info!("Loaded configuration from: {}", config_path);
            config
        }
        Err(e) => {
            error!("Failed to load config from {}: {:#}", config_path, e);
            info!("Using default configuration");
            MonitoringConfig::default()
        }
    };
    if let Some(port) = matches.get_one::<u16>("port") {
        config.server.port = *port;
    }
    if matches.get_flag("no-simulation") {
        config.simulation.enabled = false;
    }

    let metrics = MetricsAggregator::with_runtime(
        config.metrics.clone(),
        Arc::new(TokioScheduler::current()?),
        Arc::new(SystemClock),
    );
    let _subscriptions = log_slow_events(&metrics);

    if config.simulation.enabled {
        simulation::spawn(metrics.clone(), config.simulation.clone());
    }

    let app = router(AppState::new(metrics));
    let addr = config.server_address();
    info!(
        "Starting Monitoring Service v{} on {}",
        env!("CARGO_PKG_VERSION"),
        addr
    );
    info!("Summary: http://{}/api/summary", addr);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Monitoring Service stopped");
    Ok(())
}

/// Surface slow-sample notifications in the service log
fn log_slow_events(metrics: &MetricsAggregator) -> Vec<Subscription> {
    [EventType::SlowRender, EventType::SlowDataProcessing]
        .into_iter()
        .map(|event_type| {
            metrics.subscribe(event_type, |event| match event {
                MetricEvent::SlowRender {
                    component_id,
                    render_time_ms,
                    ..
                } => info!(component_id = %component_id, render_time_ms, "Slow render observed"),
                MetricEvent::SlowDataProcessing {
                    operation_id,
                    processing_time_ms,
                    ..
                } => info!(
                    operation_id = %operation_id,
                    processing_time_ms,
                    "Slow processing observed"
                ),
                other => warn!(
                    event_type = %other.event_type(),
                    "Unexpected event on slow channel"
                ),
            })
        })
        .collect()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
